//! Application configuration for Folio.
//!
//! Config lives in `folio.toml` in the working directory (or a path given
//! with `--config`). CLI flags override config file values, which override
//! defaults. Structural marker classes are intentionally not configurable.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{FolioError, Result};

/// Default configuration file name, resolved against the working directory.
pub const CONFIG_FILE_NAME: &str = "folio.toml";

// ---------------------------------------------------------------------------
// Config structs (matching folio.toml schema)
// ---------------------------------------------------------------------------

/// Top-level application config, deserialized from TOML.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Where source documents are read from.
    #[serde(default)]
    pub input: InputConfig,

    /// Where the manifest is written.
    #[serde(default)]
    pub output: OutputConfig,

    /// Section ordering rules.
    #[serde(default)]
    pub sections: SectionsConfig,
}

/// `[input]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InputConfig {
    /// Directory scanned (non-recursively) for source documents.
    #[serde(default = "default_input_dir")]
    pub dir: String,

    /// File extension of source documents, without the leading dot.
    #[serde(default = "default_extension")]
    pub extension: String,
}

impl Default for InputConfig {
    fn default() -> Self {
        Self {
            dir: default_input_dir(),
            extension: default_extension(),
        }
    }
}

fn default_input_dir() -> String {
    "content/writings".into()
}
fn default_extension() -> String {
    "html".into()
}

/// `[output]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputConfig {
    /// Path of the generated manifest file.
    #[serde(default = "default_output_path")]
    pub path: String,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            path: default_output_path(),
        }
    }
}

fn default_output_path() -> String {
    "generated/writings.json".into()
}

/// `[sections]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SectionsConfig {
    /// Section titles that are moved to the front, in this order.
    #[serde(default = "default_canonical_order")]
    pub canonical_order: Vec<String>,
}

impl Default for SectionsConfig {
    fn default() -> Self {
        Self {
            canonical_order: default_canonical_order(),
        }
    }
}

fn default_canonical_order() -> Vec<String> {
    ["Foreword", "Preface", "Introduction", "Notes"]
        .into_iter()
        .map(String::from)
        .collect()
}

// ---------------------------------------------------------------------------
// Build config (runtime, merged from config + CLI flags)
// ---------------------------------------------------------------------------

/// Runtime build configuration, merged from config file and CLI flags.
#[derive(Debug, Clone)]
pub struct BuildConfig {
    /// Directory containing source documents.
    pub input_dir: PathBuf,
    /// Lowercased extension of source documents.
    pub extension: String,
    /// Manifest output file.
    pub output_path: PathBuf,
    /// Canonical section title order.
    pub canonical_order: Vec<String>,
}

impl From<&AppConfig> for BuildConfig {
    fn from(config: &AppConfig) -> Self {
        Self {
            input_dir: PathBuf::from(&config.input.dir),
            extension: config
                .input
                .extension
                .trim_start_matches('.')
                .to_ascii_lowercase(),
            output_path: PathBuf::from(&config.output.path),
            canonical_order: config.sections.canonical_order.clone(),
        }
    }
}

impl BuildConfig {
    /// Apply CLI overrides on top of file/default values.
    pub fn with_overrides(mut self, input: Option<&Path>, output: Option<&Path>) -> Self {
        if let Some(dir) = input {
            self.input_dir = dir.to_path_buf();
        }
        if let Some(path) = output {
            self.output_path = path.to_path_buf();
        }
        self
    }
}

// ---------------------------------------------------------------------------
// Config loading
// ---------------------------------------------------------------------------

/// Resolve the config file path: an explicit path, or `folio.toml` in the
/// working directory.
pub fn config_file_path(explicit: Option<&Path>) -> PathBuf {
    explicit
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from(CONFIG_FILE_NAME))
}

/// Load the application config. Returns defaults if the default file does
/// not exist; an explicitly requested file must exist.
pub fn load_config(explicit: Option<&Path>) -> Result<AppConfig> {
    let path = config_file_path(explicit);

    if !path.exists() {
        if explicit.is_some() {
            return Err(FolioError::config(format!(
                "config file {} does not exist",
                path.display()
            )));
        }
        tracing::debug!(?path, "config file not found, using defaults");
        return Ok(AppConfig::default());
    }

    load_config_from(&path)
}

/// Load the application config from a specific file path.
pub fn load_config_from(path: &Path) -> Result<AppConfig> {
    let content = std::fs::read_to_string(path).map_err(|e| FolioError::io(path, e))?;

    toml::from_str(&content)
        .map_err(|e| FolioError::config(format!("failed to parse {}: {e}", path.display())))
}

/// Write a default config file. Refuses to overwrite an existing file.
/// Returns the path to the created file.
pub fn init_config(explicit: Option<&Path>) -> Result<PathBuf> {
    let path = config_file_path(explicit);

    if path.exists() {
        return Err(FolioError::config(format!(
            "{} already exists, not overwriting",
            path.display()
        )));
    }

    let content = to_toml(&AppConfig::default())?;
    std::fs::write(&path, content).map_err(|e| FolioError::io(&path, e))?;
    tracing::info!(?path, "created default config file");

    Ok(path)
}

/// Render a config as pretty TOML.
pub fn to_toml(config: &AppConfig) -> Result<String> {
    toml::to_string_pretty(config).map_err(|e| FolioError::config(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_path(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("folio-config-test-{}", uuid::Uuid::now_v7()));
        std::fs::create_dir_all(&dir).unwrap();
        dir.join(name)
    }

    #[test]
    fn default_config_serializes() {
        let toml_str = to_toml(&AppConfig::default()).expect("serialize default config");
        assert!(toml_str.contains("content/writings"));
        assert!(toml_str.contains("canonical_order"));
    }

    #[test]
    fn partial_config_fills_defaults() {
        let toml_str = r#"
[input]
dir = "/srv/texts"

[sections]
canonical_order = ["Preface", "Notes"]
"#;
        let config: AppConfig = toml::from_str(toml_str).expect("parse");
        assert_eq!(config.input.dir, "/srv/texts");
        assert_eq!(config.input.extension, "html");
        assert_eq!(config.output.path, "generated/writings.json");
        assert_eq!(config.sections.canonical_order, vec!["Preface", "Notes"]);
    }

    #[test]
    fn build_config_from_app_config() {
        let mut app = AppConfig::default();
        app.input.extension = ".XHTML".into();
        let build = BuildConfig::from(&app);
        assert_eq!(build.extension, "xhtml");
        assert_eq!(build.input_dir, PathBuf::from("content/writings"));
        assert_eq!(build.canonical_order.len(), 4);
    }

    #[test]
    fn cli_overrides_win() {
        let build = BuildConfig::from(&AppConfig::default())
            .with_overrides(Some(Path::new("in")), Some(Path::new("out/m.json")));
        assert_eq!(build.input_dir, PathBuf::from("in"));
        assert_eq!(build.output_path, PathBuf::from("out/m.json"));
    }

    #[test]
    fn explicit_missing_config_is_an_error() {
        let path = temp_path("nope.toml");
        let err = load_config(Some(&path)).unwrap_err();
        assert!(err.to_string().contains("does not exist"));
    }

    #[test]
    fn init_then_load_roundtrip() {
        let path = temp_path(CONFIG_FILE_NAME);
        init_config(Some(&path)).expect("init");
        let loaded = load_config(Some(&path)).expect("load");
        assert_eq!(loaded.input.extension, "html");

        // second init refuses to clobber
        assert!(init_config(Some(&path)).is_err());
    }

    #[test]
    fn malformed_config_reports_path() {
        let path = temp_path("broken.toml");
        std::fs::write(&path, "[input\ndir = 3").unwrap();
        let err = load_config_from(&path).unwrap_err();
        assert!(err.to_string().contains("broken.toml"));
    }
}
