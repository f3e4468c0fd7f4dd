use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use crate::dataset::GeneratedDataset;
use crate::errors::GenerationError;

/// Serialize the whole dataset to a pretty-printed JSON document.
pub fn write_dataset_json(path: &Path, dataset: &GeneratedDataset) -> Result<(), GenerationError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let mut writer = BufWriter::new(File::create(path)?);
    serde_json::to_writer_pretty(&mut writer, dataset)?;
    writer.write_all(b"\n")?;
    writer.flush()?;
    Ok(())
}
