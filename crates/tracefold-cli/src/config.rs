//! Config file loading for the CLI

use anyhow::{Context, Result};
use std::path::Path;
use tracefold_reduce::ReduceConfig;

/// Load a [`ReduceConfig`] from a `.toml` or `.json` file and validate it.
pub fn from_file(path: &Path) -> Result<ReduceConfig> {
    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("reading config {}", path.display()))?;
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or_default();

    let config: ReduceConfig = match ext.to_lowercase().as_str() {
        "toml" => toml::from_str(&contents)?,
        "json" => serde_json::from_str(&contents)?,
        _ => anyhow::bail!("Unsupported config file extension: {}", ext),
    };
    config.validate()?;
    Ok(config)
}

/// Load `path` if given and present, else defaults.
pub fn load(path: Option<&Path>) -> Result<ReduceConfig> {
    match path {
        Some(p) if p.exists() => from_file(p),
        Some(p) => {
            tracing::warn!("Config file not found, using defaults: {}", p.display());
            Ok(ReduceConfig::default())
        }
        None => Ok(ReduceConfig::default()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_load_toml() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(file, "[codec]\ncode_width = 16\n\n[segmenter]\nwindow_size = 32").unwrap();
        let config = from_file(file.path()).unwrap();
        assert_eq!(config.codec.code_width, 16);
        assert_eq!(config.segmenter.window_size, 32);
        assert_eq!(config.segmenter.boundary_mask, 0xFF);
    }

    #[test]
    fn test_load_json() {
        let mut file = tempfile::Builder::new().suffix(".json").tempfile().unwrap();
        writeln!(file, r#"{{"segmenter": {{"boundary_mask": 1023}}}}"#).unwrap();
        let config = from_file(file.path()).unwrap();
        assert_eq!(config.segmenter.boundary_mask, 1023);
        assert_eq!(config.codec.code_width, 12);
    }

    #[test]
    fn test_invalid_config_rejected() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(file, "[codec]\nprimed_tokens = [\"<span>\"]").unwrap();
        assert!(from_file(file.path()).is_err());
    }

    #[test]
    fn test_unsupported_extension() {
        let file = tempfile::Builder::new().suffix(".yaml").tempfile().unwrap();
        assert!(from_file(file.path()).is_err());
    }

    #[test]
    fn test_missing_file_uses_defaults() {
        let config = load(Some(Path::new("/nonexistent/tracefold.toml"))).unwrap();
        assert_eq!(config, ReduceConfig::default());
        assert_eq!(load(None).unwrap(), ReduceConfig::default());
    }
}
