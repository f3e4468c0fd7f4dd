mod registry;

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{Args, Parser, Subcommand, ValueEnum};
use schemars::schema_for;
use thiserror::Error;
use tracing::info;
use uuid::Uuid;

use benchgen_core::{
    ConceptColumn, ConceptOptions, EntityModel, ModelDocument, ModelError, concepts, preset,
};
use benchgen_generate::{
    GenerationConfig, GenerationEngine, GenerationError, write_dataset_csv, write_dataset_json,
};
use registry::{RunContext, init_logging, start_run, write_report};

#[derive(Debug, Error)]
enum CliError {
    #[error("registry error: {0}")]
    Registry(#[from] registry::RegistryError),
    #[error(transparent)]
    Model(#[from] ModelError),
    #[error(transparent)]
    Generation(#[from] GenerationError),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("toml error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

impl CliError {
    fn kind(&self) -> &'static str {
        match self {
            CliError::Registry(_) => "RegistryError",
            CliError::Model(err) => err.kind(),
            CliError::Generation(err) => err.kind(),
            CliError::Io(_) => "IoError",
            CliError::Json(_) => "JsonError",
            CliError::Toml(_) => "TomlError",
            CliError::InvalidConfig(_) => "InvalidConfigError",
        }
    }
}

#[derive(Parser, Debug)]
#[command(name = "benchgen", version, about = "Denormalization benchmark dataset generator")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Generate a dataset into a new run directory.
    Generate(GenerateArgs),
    /// Print the topological generation order and the fact entity.
    Order(ModelArgs),
    /// Print the JSON schema of model files.
    Schema,
}

#[derive(Args, Debug)]
struct ModelArgs {
    /// Built-in model (`retail` or `concepts`).
    #[arg(long, conflicts_with = "model")]
    preset: Option<String>,
    /// Model file (`.json` or `.toml`).
    #[arg(long, value_name = "PATH")]
    model: Option<PathBuf>,
    /// Sub-concept entities for the `concepts` preset.
    #[arg(long, default_value_t = 1)]
    sub_concepts: usize,
    /// Term columns per entity for the `concepts` preset.
    #[arg(long, default_value_t = 1)]
    term_columns: usize,
    /// Fact entity name for the `concepts` preset.
    #[arg(long, default_value = "data")]
    name: String,
    /// Scalar column types for the `concepts` preset.
    #[arg(
        long,
        value_enum,
        num_args = 1..,
        default_values_t = [ColumnType::Str, ColumnType::Int, ColumnType::Float]
    )]
    ctypes: Vec<ColumnType>,
    /// Terms file for the `concepts` preset, one term per line.
    #[arg(long, value_name = "PATH")]
    terms: Option<PathBuf>,
    /// Terms sampled per term set; defaults to a tenth of the rows, at least ten.
    #[arg(long)]
    terms_sample_size: Option<usize>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum ColumnType {
    Str,
    Int,
    Float,
}

impl From<ColumnType> for ConceptColumn {
    fn from(column: ColumnType) -> Self {
        match column {
            ColumnType::Str => ConceptColumn::Text,
            ColumnType::Int => ConceptColumn::Int,
            ColumnType::Float => ConceptColumn::Float,
        }
    }
}

#[derive(Args, Debug)]
struct GenerateArgs {
    #[command(flatten)]
    source: ModelArgs,
    /// Rows requested for the fact entity.
    #[arg(long)]
    rows: Option<u64>,
    /// Fraction of candidate relations to inline, in [0, 1].
    #[arg(long)]
    denormalization: Option<f64>,
    #[arg(long)]
    seed: Option<u64>,
    /// Row count for an independent entity, as `Entity=ROWS`.
    #[arg(long = "override", value_name = "ENTITY=ROWS", value_parser = parse_override)]
    overrides: Vec<(String, u64)>,
    /// Fact entity; defaults to the last unreferenced entity.
    #[arg(long)]
    fact: Option<String>,
    /// Generation config file (`.json` or `.toml`); flags override its fields.
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,
    /// Output directory for runs.
    #[arg(long, default_value = "runs")]
    run_dir: PathBuf,
    #[arg(long, value_enum, default_value_t = OutputFormat::Csv)]
    format: OutputFormat,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    Csv,
    Json,
}

impl OutputFormat {
    fn as_str(&self) -> &'static str {
        match self {
            OutputFormat::Csv => "csv",
            OutputFormat::Json => "json",
        }
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let outcome = match cli.command {
        Command::Generate(args) => run_generate(args),
        Command::Order(args) => run_order(args),
        Command::Schema => run_schema(),
    };

    match outcome {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error[{}]: {err}", err.kind());
            ExitCode::FAILURE
        }
    }
}

fn run_generate(args: GenerateArgs) -> Result<(), CliError> {
    let config = resolve_config(&args)?;
    let model = load_model(&args.source, &config)?;

    let run_id = Uuid::new_v4().to_string();
    let run_ctx = RunContext {
        run_id: run_id.clone(),
        started_at: chrono::Utc::now(),
        run_dir: args.run_dir.clone(),
        model_source: model_source(&args.source),
        format: args.format.as_str().to_string(),
    };

    let run_paths = start_run(&run_ctx, &config, &model)?;
    init_logging(Some(&run_paths.logs_path))?;

    info!(
        event = "run_started",
        run_id = %run_id,
        model = %run_ctx.model_source,
        entities = model.len()
    );

    let result = GenerationEngine::new(config).run(&model)?;

    match args.format {
        OutputFormat::Csv => {
            let bytes = write_dataset_csv(&run_paths.data_dir, &result.dataset)?;
            info!(event = "dataset_written", format = "csv", bytes);
        }
        OutputFormat::Json => {
            let path = run_paths.data_dir.join("dataset.json");
            write_dataset_json(&path, &result.dataset)?;
            info!(event = "dataset_written", format = "json", path = %path.display());
        }
    }

    write_report(&run_paths, &result.report)?;
    info!(
        event = "run_finished",
        run_id = %run_id,
        fingerprint = %result.report.fingerprint
    );

    println!("run_dir={}", run_paths.root.display());
    Ok(())
}

fn run_order(args: ModelArgs) -> Result<(), CliError> {
    init_logging(None)?;
    let model = load_model(&args, &GenerationConfig::default())?;
    model.validate()?;

    let order = model.topological_order()?;
    println!("order: {}", order.join(" -> "));
    println!("fact: {}", model.fact_entity()?);
    Ok(())
}

fn run_schema() -> Result<(), CliError> {
    let schema = schema_for!(ModelDocument);
    println!("{}", serde_json::to_string_pretty(&schema)?);
    Ok(())
}

/// Model file, or a preset sized by the generation config.
fn load_model(args: &ModelArgs, config: &GenerationConfig) -> Result<EntityModel, CliError> {
    if let Some(path) = &args.model {
        return read_document(path);
    }

    match args.preset.as_deref().unwrap_or("retail") {
        "concepts" => Ok(concepts(concept_options(args, config)?)?),
        name => Ok(preset(name)?),
    }
}

fn concept_options(args: &ModelArgs, config: &GenerationConfig) -> Result<ConceptOptions, CliError> {
    let defaults = ConceptOptions::default();
    let terms = match &args.terms {
        Some(path) => read_terms(path)?,
        None => defaults.terms,
    };
    let terms_sample_size = args.terms_sample_size.unwrap_or_else(|| {
        ConceptOptions::sample_size_for_rows(config.row_count).min(terms.len())
    });

    Ok(ConceptOptions {
        fact_name: args.name.clone(),
        sub_concepts: args.sub_concepts,
        column_types: args.ctypes.iter().copied().map(ConceptColumn::from).collect(),
        term_columns: args.term_columns,
        terms,
        terms_sample_size,
        seed: config.seed,
    })
}

/// Non-empty lines of a terms file.
fn read_terms(path: &Path) -> Result<Vec<String>, CliError> {
    let terms: Vec<String> = std::fs::read_to_string(path)?
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect();
    if terms.is_empty() {
        return Err(CliError::InvalidConfig(format!(
            "terms file '{}' contains no terms",
            path.display()
        )));
    }
    Ok(terms)
}

fn model_source(args: &ModelArgs) -> String {
    match (&args.model, &args.preset) {
        (Some(path), _) => path.display().to_string(),
        (None, Some(name)) => format!("preset:{name}"),
        (None, None) => "preset:retail".to_string(),
    }
}

/// Config file (or defaults) with command-line flags applied on top.
fn resolve_config(args: &GenerateArgs) -> Result<GenerationConfig, CliError> {
    let mut config = match &args.config {
        Some(path) => read_document(path)?,
        None => GenerationConfig::default(),
    };

    if let Some(rows) = args.rows {
        config.row_count = rows;
    }
    if let Some(factor) = args.denormalization {
        config.denormalization = factor;
    }
    if let Some(seed) = args.seed {
        config.seed = seed;
    }
    if let Some(fact) = &args.fact {
        config.fact_entity = Some(fact.clone());
    }
    for (entity, rows) in &args.overrides {
        config.row_overrides.insert(entity.clone(), *rows);
    }

    Ok(config)
}

/// Parse a JSON or TOML document, chosen by file extension.
fn read_document<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T, CliError> {
    let contents = std::fs::read_to_string(path)?;
    match path.extension().and_then(|ext| ext.to_str()) {
        Some("toml") => Ok(toml::from_str(&contents)?),
        Some("json") => Ok(serde_json::from_str(&contents)?),
        _ => Err(CliError::InvalidConfig(format!(
            "unsupported file extension for '{}', expected .json or .toml",
            path.display()
        ))),
    }
}

fn parse_override(value: &str) -> Result<(String, u64), String> {
    let (entity, rows) = value
        .split_once('=')
        .ok_or_else(|| format!("expected ENTITY=ROWS, got '{value}'"))?;
    let entity = entity.trim();
    if entity.is_empty() {
        return Err(format!("missing entity name in '{value}'"));
    }
    let rows = rows
        .trim()
        .parse::<u64>()
        .map_err(|err| format!("invalid row count in '{value}': {err}"))?;
    Ok((entity.to_string(), rows))
}
