//! Service settings with env-var overrides.
//!
//! Reads `config/default.toml` relative to the current working directory
//! (or an explicit path), then applies `ZEROSHOT_BIND`, `ZEROSHOT_LOG_LEVEL`
//! and `ZEROSHOT_LABELS_PATH` overrides. The candidate labels themselves live
//! in a separate JSON file, see [`crate::labels`].

use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::error::AppError;

const DEFAULT_CONFIG_PATH: &str = "config/default.toml";

/// HTTP listener and logging settings.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Socket address to bind the HTTP listener to.
    pub bind: String,
    pub log_level: String,
    /// Append logs to this file instead of stderr.
    pub log_file: Option<PathBuf>,
}

/// Inference engine settings. Populated from `[engine]` in the TOML.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Which backend to build (`"onnx"` or `"uniform"`).
    pub provider: String,
    /// Directory holding `model.onnx`, `tokenizer.json` and `config.json`.
    pub model_dir: PathBuf,
    /// NLI hypothesis; `{}` is replaced by each candidate label.
    pub hypothesis_template: String,
    /// Token limit for each premise/hypothesis pair.
    pub max_length: usize,
    /// Index of the entailment logit. Read from the model's `config.json`
    /// when unset.
    pub entailment_index: Option<usize>,
}

/// Fully-resolved service configuration.
#[derive(Debug, Clone)]
pub struct Config {
    pub server: ServerConfig,
    /// Path of the JSON label file.
    pub labels_path: PathBuf,
    pub engine: EngineConfig,
}

/// Values that take precedence over the TOML file.
#[derive(Debug, Default, Clone)]
pub struct Overrides {
    pub bind: Option<String>,
    pub log_level: Option<String>,
    pub labels_path: Option<String>,
}

impl Overrides {
    /// Collect overrides from `ZEROSHOT_*` env vars.
    pub fn from_env() -> Self {
        Self {
            bind: env::var("ZEROSHOT_BIND").ok(),
            log_level: env::var("ZEROSHOT_LOG_LEVEL").ok(),
            labels_path: env::var("ZEROSHOT_LABELS_PATH").ok(),
        }
    }
}

/// Raw TOML shape — `serde` target before resolution.
#[derive(Deserialize, Default)]
struct RawConfig {
    #[serde(default)]
    server: RawServer,
    #[serde(default)]
    labels: RawLabels,
    #[serde(default)]
    engine: RawEngine,
}

#[derive(Deserialize)]
struct RawServer {
    #[serde(default = "default_bind")]
    bind: String,
    #[serde(default = "default_log_level")]
    log_level: String,
    #[serde(default)]
    log_file: Option<String>,
}

#[derive(Deserialize)]
struct RawLabels {
    #[serde(default = "default_labels_path")]
    path: String,
}

#[derive(Deserialize)]
struct RawEngine {
    #[serde(default = "default_provider")]
    provider: String,
    #[serde(default = "default_model_dir")]
    model_dir: String,
    #[serde(default = "default_hypothesis_template")]
    hypothesis_template: String,
    #[serde(default = "default_max_length")]
    max_length: usize,
    #[serde(default)]
    entailment_index: Option<usize>,
}

impl Default for RawServer {
    fn default() -> Self {
        Self {
            bind: default_bind(),
            log_level: default_log_level(),
            log_file: None,
        }
    }
}

impl Default for RawLabels {
    fn default() -> Self {
        Self { path: default_labels_path() }
    }
}

impl Default for RawEngine {
    fn default() -> Self {
        Self {
            provider: default_provider(),
            model_dir: default_model_dir(),
            hypothesis_template: default_hypothesis_template(),
            max_length: default_max_length(),
            entailment_index: None,
        }
    }
}

fn default_bind() -> String { "0.0.0.0:8000".to_string() }
fn default_log_level() -> String { "info".to_string() }
fn default_labels_path() -> String { "classifiers.config".to_string() }
fn default_provider() -> String { "onnx".to_string() }
fn default_model_dir() -> String { "~/models/bart-large-mnli".to_string() }
fn default_hypothesis_template() -> String { "This example is {}.".to_string() }
fn default_max_length() -> usize { 512 }

/// Load config from the given path, or `config/default.toml`, then apply
/// env-var overrides.
///
/// If no path is given and `config/default.toml` does not exist, built-in
/// defaults are used. An explicit path that cannot be read is an error.
pub fn load(config_path: Option<&Path>) -> Result<Config, AppError> {
    let overrides = Overrides::from_env();

    if let Some(path) = config_path {
        return load_from(path, &overrides);
    }

    let default_path = Path::new(DEFAULT_CONFIG_PATH);
    if default_path.exists() {
        load_from(default_path, &overrides)
    } else {
        resolve(RawConfig::default(), &overrides)
    }
}

/// Internal loader — accepts an explicit path and overrides.
/// Tests pass overrides directly instead of mutating env vars.
pub fn load_from(path: &Path, overrides: &Overrides) -> Result<Config, AppError> {
    let raw = fs::read_to_string(path)
        .map_err(|e| AppError::Config(format!("cannot read {}: {e}", path.display())))?;

    let parsed: RawConfig = toml::from_str(&raw)
        .map_err(|e| AppError::Config(format!("parse error in {}: {e}", path.display())))?;

    resolve(parsed, overrides)
}

fn resolve(raw: RawConfig, overrides: &Overrides) -> Result<Config, AppError> {
    let e = raw.engine;

    if e.max_length == 0 {
        return Err(AppError::Config("engine.max_length must be positive".into()));
    }
    if !e.hypothesis_template.contains("{}") {
        return Err(AppError::Config(format!(
            "engine.hypothesis_template must contain '{{}}': {:?}",
            e.hypothesis_template
        )));
    }

    let labels_path = overrides
        .labels_path
        .clone()
        .unwrap_or(raw.labels.path);

    Ok(Config {
        server: ServerConfig {
            bind: overrides.bind.clone().unwrap_or(raw.server.bind),
            log_level: overrides.log_level.clone().unwrap_or(raw.server.log_level),
            log_file: raw.server.log_file.map(|p| expand_home(&p)),
        },
        labels_path: expand_home(&labels_path),
        engine: EngineConfig {
            provider: e.provider,
            model_dir: expand_home(&e.model_dir),
            hypothesis_template: e.hypothesis_template,
            max_length: e.max_length,
            entailment_index: e.entailment_index,
        },
    })
}

/// Expand a leading `~` to the user's home directory.
/// Absolute or relative paths without `~` are returned unchanged.
pub fn expand_home(path: &str) -> PathBuf {
    if let Some(rest) = path.strip_prefix("~/") {
        if let Some(home) = dirs::home_dir() {
            return home.join(rest);
        }
    }
    if path == "~" {
        if let Some(home) = dirs::home_dir() {
            return home;
        }
    }
    PathBuf::from(path)
}

// ── test helpers ──────────────────────────────────────────────────────────────

impl Config {
    /// `Config` pointing at `labels_path` with the `uniform` engine — no model
    /// files, no network.
    pub fn test_default(labels_path: &Path) -> Self {
        Self {
            server: ServerConfig {
                bind: "127.0.0.1:0".into(),
                log_level: "info".into(),
                log_file: None,
            },
            labels_path: labels_path.to_path_buf(),
            engine: EngineConfig {
                provider: "uniform".into(),
                model_dir: PathBuf::from("/nonexistent/model"),
                hypothesis_template: default_hypothesis_template(),
                max_length: default_max_length(),
                entailment_index: None,
            },
        }
    }
}
