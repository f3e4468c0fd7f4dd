use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use tracing::info;

use crate::dataset::{GeneratedDataset, Table};
use crate::errors::GenerationError;

/// Write every table of `dataset` as `<dir>/<table>.csv`. Returns the total
/// number of bytes written.
pub fn write_dataset_csv(dir: &Path, dataset: &GeneratedDataset) -> Result<u64, GenerationError> {
    std::fs::create_dir_all(dir)?;

    let mut bytes_written = 0_u64;
    for table in dataset.tables() {
        let path = dir.join(format!("{}.csv", table.name));
        let bytes = write_table_csv(&path, table)?;
        info!(
            table = %table.name,
            rows = table.len(),
            bytes,
            path = %path.display(),
            "table written"
        );
        bytes_written += bytes;
    }

    Ok(bytes_written)
}

/// Write a table as CSV: header row first, columns in table order, NULL as
/// an empty field.
pub fn write_table_csv(path: &Path, table: &Table) -> Result<u64, csv::Error> {
    let writer = BufWriter::new(File::create(path).map_err(csv::Error::from)?);
    let counting = CountingWriter::new(writer);
    let mut writer = csv::WriterBuilder::new()
        .has_headers(false)
        .from_writer(counting);

    writer.write_record(&table.columns)?;

    for row in &table.rows {
        let record: Vec<String> = row.iter().map(|value| value.to_csv()).collect();
        writer.write_record(&record)?;
    }

    writer.flush()?;
    let counting = writer.into_inner().map_err(|err| err.into_error())?;
    Ok(counting.bytes_written())
}

struct CountingWriter<W: Write> {
    inner: W,
    bytes: u64,
}

impl<W: Write> CountingWriter<W> {
    fn new(inner: W) -> Self {
        Self { inner, bytes: 0 }
    }

    fn bytes_written(&self) -> u64 {
        self.bytes
    }
}

impl<W: Write> Write for CountingWriter<W> {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        let size = self.inner.write(buf)?;
        self.bytes = self.bytes.saturating_add(size as u64);
        Ok(size)
    }

    fn flush(&mut self) -> std::io::Result<()> {
        self.inner.flush()
    }
}
