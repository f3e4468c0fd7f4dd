use serde::Serialize;
use sha2::{Digest, Sha256};

use crate::generators::GeneratedValue;

pub type Row = Vec<GeneratedValue>;

/// Role of an output table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TableKind {
    /// One entity, possibly widened with inlined ancestors.
    Entity,
    /// Denormalized fact table.
    Fact,
    /// Junction table of a many-to-many relation.
    Link,
}

impl TableKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            TableKind::Entity => "entity",
            TableKind::Fact => "fact",
            TableKind::Link => "link",
        }
    }
}

/// Ordered rows under an ordered column list.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Table {
    pub name: String,
    pub kind: TableKind,
    pub columns: Vec<String>,
    pub rows: Vec<Row>,
}

impl Table {
    pub fn new(name: impl Into<String>, kind: TableKind, columns: Vec<String>) -> Self {
        Self {
            name: name.into(),
            kind,
            columns,
            rows: Vec::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn column_index(&self, column: &str) -> Option<usize> {
        self.columns.iter().position(|name| name == column)
    }

    pub fn has_column(&self, column: &str) -> bool {
        self.column_index(column).is_some()
    }

    /// All values of `column`, in row order.
    pub fn column(&self, column: &str) -> Option<Vec<&GeneratedValue>> {
        let idx = self.column_index(column)?;
        Some(self.rows.iter().map(|row| &row[idx]).collect())
    }

    pub fn value(&self, row: usize, column: &str) -> Option<&GeneratedValue> {
        let idx = self.column_index(column)?;
        self.rows.get(row).map(|row| &row[idx])
    }

    fn digest_into(&self, hasher: &mut Sha256) {
        hasher.update(self.name.as_bytes());
        hasher.update([0_u8]);
        hasher.update(self.kind.as_str().as_bytes());
        hasher.update([0_u8]);
        for column in &self.columns {
            hasher.update(column.as_bytes());
            hasher.update([0x1f_u8]);
        }
        for row in &self.rows {
            hasher.update([0x1e_u8]);
            for value in row {
                match value {
                    GeneratedValue::Null => hasher.update([b'N']),
                    GeneratedValue::Int(value) => {
                        hasher.update([b'I']);
                        hasher.update(value.to_le_bytes());
                    }
                    GeneratedValue::Float(value) => {
                        hasher.update([b'F']);
                        hasher.update(value.to_bits().to_le_bytes());
                    }
                    GeneratedValue::Text(value) => {
                        hasher.update([b'T']);
                        hasher.update((value.len() as u64).to_le_bytes());
                        hasher.update(value.as_bytes());
                    }
                }
            }
        }
    }
}

/// Entity tables in topological order plus link tables.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NormalizedDataset {
    pub tables: Vec<Table>,
    pub links: Vec<Table>,
}

/// Wide fact table plus whatever partial denormalization left behind.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DenormalizedDataset {
    pub fact: Table,
    /// Inlined relations as `<entity>.<relation>`, in selection order.
    pub inlined: Vec<String>,
    /// Entity tables still referenced by a relation that was not inlined.
    pub residual: Vec<Table>,
    pub links: Vec<Table>,
}

/// Output of a generation run.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum GeneratedDataset {
    Normalized(NormalizedDataset),
    Denormalized(DenormalizedDataset),
}

impl GeneratedDataset {
    pub fn is_normalized(&self) -> bool {
        matches!(self, GeneratedDataset::Normalized(_))
    }

    /// Every output table: entity or fact tables first, then link tables.
    pub fn tables(&self) -> Vec<&Table> {
        match self {
            GeneratedDataset::Normalized(dataset) => {
                dataset.tables.iter().chain(&dataset.links).collect()
            }
            GeneratedDataset::Denormalized(dataset) => std::iter::once(&dataset.fact)
                .chain(&dataset.residual)
                .chain(&dataset.links)
                .collect(),
        }
    }

    pub fn table(&self, name: &str) -> Option<&Table> {
        self.tables().into_iter().find(|table| table.name == name)
    }

    pub fn fact(&self) -> Option<&Table> {
        match self {
            GeneratedDataset::Normalized(_) => None,
            GeneratedDataset::Denormalized(dataset) => Some(&dataset.fact),
        }
    }

    pub fn inlined(&self) -> &[String] {
        match self {
            GeneratedDataset::Normalized(_) => &[],
            GeneratedDataset::Denormalized(dataset) => &dataset.inlined,
        }
    }

    pub fn total_rows(&self) -> usize {
        self.tables().iter().map(|table| table.len()).sum()
    }

    /// Hex SHA-256 of the canonical dataset contents.
    pub fn fingerprint(&self) -> String {
        let mut hasher = Sha256::new();
        hasher.update(if self.is_normalized() {
            b"normalized".as_slice()
        } else {
            b"denormalized".as_slice()
        });
        for table in self.tables() {
            hasher.update([0x1d_u8]);
            table.digest_into(&mut hasher);
        }
        hex::encode(hasher.finalize())
    }
}
