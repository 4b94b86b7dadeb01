//! CLI command implementations.

pub mod stats;
pub mod validate;

use std::path::Path;

use cldf::Dataset;
use tracing::debug;

/// Load a dataset from a metadata file or a bare core data file.
pub fn load_dataset(path: &Path) -> Result<Dataset, Box<dyn std::error::Error>> {
    if !path.exists() {
        return Err(format!("Dataset not found: {}", path.display()).into());
    }
    let is_metadata = path.extension().map(|e| e == "json").unwrap_or(false);
    debug!(path = %path.display(), is_metadata, "loading dataset");
    let dataset = if is_metadata {
        Dataset::from_metadata(path)?
    } else {
        Dataset::from_data(path)?
    };
    Ok(dataset)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_dataset() {
        let dir = tempfile::tempdir().unwrap();
        let err = load_dataset(&dir.path().join("nope-metadata.json")).unwrap_err();
        assert!(err.to_string().contains("not found"));
    }

    #[test]
    fn test_load_data_file() {
        let dir = tempfile::tempdir().unwrap();
        let forms = dir.path().join("forms.csv");
        std::fs::write(&forms, "ID,Language_ID,Parameter_ID,Form\n1,l,p,tatu\n").unwrap();
        let ds = load_dataset(&forms).unwrap();
        assert_eq!(ds.module(), "Wordlist");
        assert!(validate::run(forms, false).unwrap());
    }
}
