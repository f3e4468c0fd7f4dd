use std::env;
use std::path::PathBuf;

use benchgen_core::preset;
use benchgen_generate::{GenerationConfig, GenerationEngine, write_dataset_csv};
use tracing_subscriber::EnvFilter;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let mut args = env::args().skip(1);
    let mut preset_name = "retail".to_string();
    let mut out_dir = PathBuf::from("out");
    let mut config = GenerationConfig::default();

    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--preset" => preset_name = args.next().ok_or("missing --preset value")?,
            "--out" => out_dir = args.next().map(PathBuf::from).ok_or("missing --out value")?,
            "--rows" => config.row_count = args.next().ok_or("missing --rows value")?.parse()?,
            "--denormalization" => {
                config.denormalization = args.next().ok_or("missing --denormalization value")?.parse()?
            }
            "--seed" => config.seed = args.next().ok_or("missing --seed value")?.parse()?,
            _ => return Err(format!("unexpected argument '{arg}'").into()),
        }
    }

    let model = preset(&preset_name)?;
    let result = GenerationEngine::new(config).run(&model)?;
    let bytes = write_dataset_csv(&out_dir, &result.dataset)?;

    println!(
        "out_dir={} bytes={} fingerprint={}",
        out_dir.display(),
        bytes,
        result.report.fingerprint
    );
    Ok(())
}
