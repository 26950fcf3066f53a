// Bundler configuration

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

fn default_filename() -> String {
    "bundle.js".to_string()
}

/// Output location for emitted assets.
#[derive(Debug, Clone, Deserialize)]
pub struct OutputConfig {
    /// Directory assets are written to, created recursively if absent
    pub path: PathBuf,

    /// Name of the bundle asset
    #[serde(default = "default_filename")]
    pub filename: String,
}

/// Top-level bundler configuration.
///
/// Loaded from a TOML file or assembled from CLI flags. `plugins` names
/// built-in plugins to apply, in order.
#[derive(Debug, Clone, Deserialize)]
pub struct BundlerConfig {
    /// Entry source file the graph is seeded from
    pub entry: PathBuf,

    pub output: OutputConfig,

    #[serde(default)]
    pub plugins: Vec<String>,
}

impl BundlerConfig {
    /// Load configuration from a TOML file.
    ///
    /// Relative `entry` and `output.path` are interpreted against the
    /// directory containing the config file.
    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config file {}", path.display()))?;
        let mut config: BundlerConfig = toml::from_str(&raw)
            .with_context(|| format!("failed to parse config file {}", path.display()))?;

        if let Some(base) = path.parent() {
            config.entry = absolutize(base, &config.entry);
            config.output.path = absolutize(base, &config.output.path);
        }
        Ok(config)
    }
}

fn absolutize(base: &Path, path: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        base.join(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn load_full_config() {
        let dir = TempDir::new().unwrap();
        let config_path = dir.path().join("minipack.toml");
        fs::write(
            &config_path,
            r#"
entry = "src/index.js"
plugins = ["logger", "banner"]

[output]
path = "dist"
filename = "out.js"
"#,
        )
        .unwrap();

        let config = BundlerConfig::load(&config_path).unwrap();
        assert_eq!(config.entry, dir.path().join("src/index.js"));
        assert_eq!(config.output.path, dir.path().join("dist"));
        assert_eq!(config.output.filename, "out.js");
        assert_eq!(config.plugins, vec!["logger", "banner"]);
    }

    #[test]
    fn filename_and_plugins_default() {
        let dir = TempDir::new().unwrap();
        let config_path = dir.path().join("minipack.toml");
        fs::write(
            &config_path,
            r#"
entry = "/abs/index.js"

[output]
path = "/abs/dist"
"#,
        )
        .unwrap();

        let config = BundlerConfig::load(&config_path).unwrap();
        assert_eq!(config.entry, PathBuf::from("/abs/index.js"));
        assert_eq!(config.output.filename, "bundle.js");
        assert!(config.plugins.is_empty());
    }

    #[test]
    fn malformed_config_errors() {
        let dir = TempDir::new().unwrap();
        let config_path = dir.path().join("minipack.toml");
        fs::write(&config_path, "entry = [not toml").unwrap();

        let err = BundlerConfig::load(&config_path).unwrap_err();
        assert!(err.to_string().contains("failed to parse"));
    }

    #[test]
    fn missing_config_errors() {
        let err = BundlerConfig::load(Path::new("/nonexistent/minipack.toml")).unwrap_err();
        assert!(err.to_string().contains("failed to read"));
    }
}
