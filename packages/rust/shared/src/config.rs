//! Application configuration for docmine.
//!
//! User config lives at `~/.docmine/docmine.toml`.
//! CLI flags override config file values, which override defaults.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{DocmineError, Result};

/// Default configuration file name.
const CONFIG_FILE_NAME: &str = "docmine.toml";

/// Default config directory name under the user's home.
const CONFIG_DIR_NAME: &str = ".docmine";

// ---------------------------------------------------------------------------
// Config structs (matching docmine.toml schema)
// ---------------------------------------------------------------------------

/// Top-level application config, deserialized from TOML.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Global defaults.
    #[serde(default)]
    pub defaults: DefaultsConfig,

    /// Tag inference settings.
    #[serde(default)]
    pub tagging: TaggingConfig,

    /// Legacy `.doc` conversion settings.
    #[serde(default)]
    pub conversion: ConversionConfig,
}

/// `[defaults]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DefaultsConfig {
    /// Root directory corpora are written under.
    #[serde(default = "default_output_dir")]
    pub output_dir: String,

    /// Number of neighboring blocks searched on each side for context.
    #[serde(default = "default_context_radius")]
    pub context_radius: usize,
}

impl Default for DefaultsConfig {
    fn default() -> Self {
        Self {
            output_dir: default_output_dir(),
            context_radius: default_context_radius(),
        }
    }
}

fn default_output_dir() -> String {
    "var/corpus".into()
}
fn default_context_radius() -> usize {
    1
}

/// How text Objects pick up tags minted from tables.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TaggingMode {
    /// Texts are tagged as their file is processed; later tables never
    /// retroactively tag earlier texts.
    #[default]
    SinglePass,
    /// Texts are tagged after every file's tables have minted their tags.
    TwoPass,
}

impl TaggingMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::SinglePass => "single-pass",
            Self::TwoPass => "two-pass",
        }
    }
}

/// `[tagging]` section.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TaggingConfig {
    /// JSON file holding an array of seed tag names.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vocabulary_path: Option<String>,

    #[serde(default)]
    pub mode: TaggingMode,
}

/// `[conversion]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversionConfig {
    /// Whether `.doc` files are converted (otherwise they are skipped).
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Headless office converter executable.
    #[serde(default = "default_converter_command")]
    pub command: String,
}

impl Default for ConversionConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            command: default_converter_command(),
        }
    }
}

fn default_true() -> bool {
    true
}
fn default_converter_command() -> String {
    "soffice".into()
}

// ---------------------------------------------------------------------------
// Build config (runtime, merged from config + CLI flags)
// ---------------------------------------------------------------------------

/// Runtime build settings, merged from config file + CLI flags.
#[derive(Debug, Clone, Serialize)]
pub struct BuildSettings {
    /// Context radius used by the context resolver.
    pub context_radius: usize,
    /// Text tagging mode.
    pub tagging_mode: TaggingMode,
    /// Seed vocabulary file, if any.
    pub vocabulary_path: Option<PathBuf>,
    /// Converter executable, or `None` to skip legacy documents.
    pub converter_command: Option<String>,
}

impl From<&AppConfig> for BuildSettings {
    fn from(config: &AppConfig) -> Self {
        Self {
            context_radius: config.defaults.context_radius,
            tagging_mode: config.tagging.mode,
            vocabulary_path: config.tagging.vocabulary_path.as_ref().map(PathBuf::from),
            converter_command: config
                .conversion
                .enabled
                .then(|| config.conversion.command.clone()),
        }
    }
}

// ---------------------------------------------------------------------------
// Config loading
// ---------------------------------------------------------------------------

/// Get the path to the config directory (`~/.docmine/`).
pub fn config_dir() -> Result<PathBuf> {
    let home =
        dirs::home_dir().ok_or_else(|| DocmineError::config("could not determine home directory"))?;
    Ok(home.join(CONFIG_DIR_NAME))
}

/// Get the path to the config file (`~/.docmine/docmine.toml`).
pub fn config_file_path() -> Result<PathBuf> {
    Ok(config_dir()?.join(CONFIG_FILE_NAME))
}

/// Load the application config from disk. Returns defaults if the file does not exist.
pub fn load_config() -> Result<AppConfig> {
    let path = config_file_path()?;

    if !path.exists() {
        tracing::debug!(?path, "config file not found, using defaults");
        return Ok(AppConfig::default());
    }

    load_config_from(&path)
}

/// Load the application config from a specific file path.
pub fn load_config_from(path: &Path) -> Result<AppConfig> {
    let content = std::fs::read_to_string(path).map_err(|e| DocmineError::io(path, e))?;

    let config: AppConfig = toml::from_str(&content)
        .map_err(|e| DocmineError::config(format!("failed to parse {}: {e}", path.display())))?;
    validate_config(&config)?;
    Ok(config)
}

/// Create the config directory and write a default config file.
/// Returns the path to the created file.
pub fn init_config() -> Result<PathBuf> {
    let dir = config_dir()?;
    std::fs::create_dir_all(&dir).map_err(|e| DocmineError::io(&dir, e))?;

    let path = dir.join(CONFIG_FILE_NAME);
    let config = AppConfig::default();
    let content = toml::to_string_pretty(&config).map_err(|e| DocmineError::config(e.to_string()))?;

    std::fs::write(&path, content).map_err(|e| DocmineError::io(&path, e))?;
    tracing::info!(?path, "created default config file");

    Ok(path)
}

/// Reject settings the build cannot honor.
pub fn validate_config(config: &AppConfig) -> Result<()> {
    if config.conversion.enabled && config.conversion.command.trim().is_empty() {
        return Err(DocmineError::config(
            "conversion is enabled but conversion.command is empty",
        ));
    }
    Ok(())
}
