//! Built-in entity models.

use rand::SeedableRng;
use rand::seq::index;
use rand_chacha::ChaCha8Rng;

use crate::entity::{AttributeSpec, EntitySpec, RelationSpec};
use crate::error::{ModelError, Result};
use crate::model::EntityModel;
use crate::types::{DEFAULT_TEXT_LEN, Distribution, FanOut, ValueDomain};

/// Names accepted by [`preset`].
pub const PRESET_NAMES: &[&str] = &["retail", "concepts"];

const INT_MIN: i64 = -99_999;
const INT_MAX: i64 = 99_999;

const TERMS: &[&str] = &[
    "acetylation", "adenosine", "allele", "amino acid", "antibody", "antigen", "apoptosis",
    "bacteria", "biomarker", "carcinoma", "cartilage", "chromosome", "cytokine", "dendrite",
    "enzyme", "epithelium", "fibroblast", "gene expression", "genome", "glucose", "hemoglobin",
    "histone", "hormone", "insulin", "keratin", "kinase", "ligand", "lipid", "lymphocyte",
    "macrophage", "membrane", "metabolism", "mitochondria", "mutation", "neuron", "nucleotide",
    "organelle", "pathogen", "peptide", "phenotype", "plasma", "protein", "receptor",
    "ribosome", "stem cell", "synapse", "transcription", "tumor", "vaccine", "virus",
];

/// Scalar column types of the `concepts` preset.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConceptColumn {
    Text,
    Int,
    Float,
}

impl ConceptColumn {
    pub const ALL: [ConceptColumn; 3] = [
        ConceptColumn::Text,
        ConceptColumn::Int,
        ConceptColumn::Float,
    ];

    fn prefix(&self) -> &'static str {
        match self {
            ConceptColumn::Text => "text",
            ConceptColumn::Int => "int",
            ConceptColumn::Float => "float",
        }
    }

    fn attribute(&self, idx: usize) -> AttributeSpec {
        let domain = match self {
            ConceptColumn::Text => ValueDomain::text(DEFAULT_TEXT_LEN),
            ConceptColumn::Int => ValueDomain::IntRange {
                min: INT_MIN,
                max: INT_MAX,
            },
            ConceptColumn::Float => ValueDomain::FloatRange { min: 0.0, max: 1.0 },
        };
        AttributeSpec::new(format!("{}_{idx}", self.prefix()), domain)
    }
}

/// Knobs for the `concepts` preset.
#[derive(Debug, Clone, PartialEq)]
pub struct ConceptOptions {
    /// Name of the fact entity.
    pub fact_name: String,
    /// Number of sub-concept entities referenced by the fact entity.
    pub sub_concepts: usize,
    /// Scalar columns of every concept entity, in order.
    pub column_types: Vec<ConceptColumn>,
    /// Number of term columns per entity.
    pub term_columns: usize,
    /// Vocabulary the term sets are sampled from.
    pub terms: Vec<String>,
    /// Distinct terms sampled into each term set.
    pub terms_sample_size: usize,
    /// Seed of the term set sampling.
    pub seed: u64,
}

impl ConceptOptions {
    /// Term set size used when none is given: a tenth of the rows, at
    /// least ten.
    pub fn sample_size_for_rows(rows: u64) -> usize {
        let tenth = (rows as f64 / 10.0).round() as usize;
        tenth.max(10)
    }
}

impl Default for ConceptOptions {
    fn default() -> Self {
        Self {
            fact_name: "data".to_string(),
            sub_concepts: 1,
            column_types: ConceptColumn::ALL.to_vec(),
            term_columns: 1,
            terms: TERMS.iter().map(|term| term.to_string()).collect(),
            terms_sample_size: 10,
            seed: 42,
        }
    }
}

/// Look up a preset by name with default options.
pub fn preset(name: &str) -> Result<EntityModel> {
    match name {
        "retail" => retail(),
        "concepts" => concepts(ConceptOptions::default()),
        other => Err(ModelError::invalid(
            "preset",
            format!(
                "unknown preset '{other}', expected one of: {}",
                PRESET_NAMES.join(", ")
            ),
        )),
    }
}

/// Star-ish retail schema: customers place orders, orders hold line items,
/// line items reference products and link to promotions.
pub fn retail() -> Result<EntityModel> {
    EntityModel::new()
        .with_entity(
            EntitySpec::new("Customer")
                .attribute(
                    AttributeSpec::new(
                        "region",
                        ValueDomain::enumerated(["north", "south", "east", "west", "central"]),
                    )
                    .with_distribution(Distribution::Zipf { exponent: 1.2 }),
                )
                .attribute(AttributeSpec::new(
                    "segment",
                    ValueDomain::enumerated(["consumer", "corporate", "home_office"]),
                ))
                .attribute(AttributeSpec::new(
                    "name",
                    ValueDomain::pattern("[A-Z][a-z]{3,8} [A-Z][a-z]{4,10}"),
                )),
        )?
        .with_entity(
            EntitySpec::new("Product")
                .attribute(
                    AttributeSpec::new(
                        "category",
                        ValueDomain::enumerated([
                            "books", "games", "garden", "grocery", "kitchen", "music", "sports",
                            "toys",
                        ]),
                    )
                    .with_distribution(Distribution::Categorical { cardinality: 5 }),
                )
                .attribute(AttributeSpec::new(
                    "price",
                    ValueDomain::FloatRange {
                        min: 1.0,
                        max: 500.0,
                    },
                ))
                .attribute(AttributeSpec::new("sku", ValueDomain::pattern("SKU-[0-9]{6}"))),
        )?
        .with_entity(
            EntitySpec::new("Promotion")
                .attribute(AttributeSpec::new("code", ValueDomain::pattern("PROMO[0-9]{4}")))
                .attribute(AttributeSpec::new(
                    "discount",
                    ValueDomain::FloatRange {
                        min: 0.05,
                        max: 0.5,
                    },
                )),
        )?
        .with_entity(
            EntitySpec::new("Order")
                .attribute(AttributeSpec::new(
                    "amount",
                    ValueDomain::FloatRange {
                        min: 5.0,
                        max: 2000.0,
                    },
                ))
                .attribute(
                    AttributeSpec::new(
                        "status",
                        ValueDomain::enumerated(["delivered", "shipped", "pending", "returned"]),
                    )
                    .with_distribution(Distribution::Zipf { exponent: 1.0 }),
                )
                .attribute(
                    AttributeSpec::new("channel", ValueDomain::enumerated(["web", "store", "phone"]))
                        .nullable(0.05),
                )
                .relation(RelationSpec::one_to_many(
                    "Customer",
                    FanOut::Poisson { mean: 5.0 },
                )),
        )?
        .with_entity(
            EntitySpec::new("LineItem")
                .attribute(
                    AttributeSpec::new("quantity", ValueDomain::IntRange { min: 1, max: 10 })
                        .with_distribution(Distribution::Zipf { exponent: 1.5 }),
                )
                .relation(RelationSpec::one_to_many(
                    "Order",
                    FanOut::Uniform { min: 1, max: 4 },
                ))
                .relation(RelationSpec::one_to_many(
                    "Product",
                    FanOut::Zipf {
                        max: 50,
                        exponent: 1.2,
                    },
                ))
                .relation(RelationSpec::many_to_many(
                    "Promotion",
                    FanOut::Poisson { mean: 1.0 },
                )),
        )
}

/// Concept/sub-concept shape: a wide fact entity whose sub-concept columns
/// can be normalized out into `subc<i>` entities. Each term column draws
/// from one sampled term set shared by every concept entity, so term values
/// line up across the joins; values are mangled per row.
pub fn concepts(options: ConceptOptions) -> Result<EntityModel> {
    if options.terms_sample_size == 0 || options.terms_sample_size > options.terms.len() {
        return Err(ModelError::invalid(
            "concepts.terms_sample_size",
            format!(
                "must be within 1..={}, got {}",
                options.terms.len(),
                options.terms_sample_size
            ),
        ));
    }

    let mut rng = ChaCha8Rng::seed_from_u64(options.seed);
    let term_sets: Vec<Vec<String>> = (0..options.term_columns)
        .map(|_| {
            index::sample(&mut rng, options.terms.len(), options.terms_sample_size)
                .into_iter()
                .map(|idx| options.terms[idx].clone())
                .collect()
        })
        .collect();

    let mut model = EntityModel::new();
    for idx in 0..options.sub_concepts {
        model.add_entity(concept_entity(&format!("subc{idx}"), &options, &term_sets))?;
    }

    let fact = (0..options.sub_concepts).fold(
        concept_entity(&options.fact_name, &options, &term_sets),
        |spec, idx| {
            spec.relation(RelationSpec::one_to_many(
                format!("subc{idx}"),
                FanOut::Fixed { count: 2 },
            ))
        },
    );
    model.add_entity(fact)?;

    Ok(model)
}

fn concept_entity(name: &str, options: &ConceptOptions, term_sets: &[Vec<String>]) -> EntitySpec {
    let spec = options
        .column_types
        .iter()
        .enumerate()
        .fold(EntitySpec::new(name), |spec, (idx, column)| {
            spec.attribute(column.attribute(idx))
        });

    term_sets.iter().enumerate().fold(spec, |spec, (idx, terms)| {
        spec.attribute(
            AttributeSpec::new(
                format!("term_{idx}"),
                ValueDomain::enumerated(terms.iter().cloned()),
            )
            .mangled(),
        )
    })
}
