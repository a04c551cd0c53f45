//! TOML configuration file loading
//!
//! Supports `~/.config/grafit-chat/config.toml` as a persistent config source.
//! All fields are optional; the file is a partial overlay on top of defaults.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::{Error, Result};

/// Top-level TOML configuration file schema
#[derive(Debug, Default, Deserialize)]
pub struct GrafitConfigFile {
    /// Chat completion configuration
    #[serde(default)]
    pub llm: LlmFileConfig,

    /// Voice dictation configuration
    #[serde(default)]
    pub voice: VoiceFileConfig,

    /// API keys for external services
    #[serde(default)]
    pub api_keys: ApiKeysFileConfig,

    /// Path to a file replacing the built-in system instruction
    pub system_prompt_file: Option<PathBuf>,
}

/// Chat completion settings
#[derive(Debug, Default, Deserialize)]
pub struct LlmFileConfig {
    /// Model identifier (e.g. "gpt-4o-mini")
    pub model: Option<String>,

    /// `OpenAI`-compatible API base URL
    pub base_url: Option<String>,

    /// Whole-reply timeout in seconds, 0 disables
    pub timeout_secs: Option<u64>,
}

/// Voice dictation settings
#[derive(Debug, Default, Deserialize)]
pub struct VoiceFileConfig {
    /// STT backend ("whisper" or "deepgram")
    pub provider: Option<String>,

    /// STT model (e.g. "whisper-1")
    pub stt_model: Option<String>,
}

/// API keys
#[derive(Debug, Default, Deserialize)]
pub struct ApiKeysFileConfig {
    pub openai: Option<String>,
    pub deepgram: Option<String>,
}

/// Load the TOML config file from the standard path
///
/// Returns `GrafitConfigFile::default()` if the file doesn't exist or can't be parsed.
#[must_use]
pub fn load_config_file() -> GrafitConfigFile {
    let Some(path) = config_file_path() else {
        return GrafitConfigFile::default();
    };

    if !path.exists() {
        return GrafitConfigFile::default();
    }

    match read_config_file(&path) {
        Ok(config) => config,
        Err(e) => {
            tracing::warn!(
                path = %path.display(),
                error = %e,
                "failed to load config file, using defaults"
            );
            GrafitConfigFile::default()
        }
    }
}

/// Read and parse a config file at an explicit path
///
/// # Errors
///
/// Returns error if the file cannot be read or is not valid TOML
pub fn read_config_file(path: &Path) -> Result<GrafitConfigFile> {
    let content = std::fs::read_to_string(path)?;
    let config = toml::from_str(&content)?;
    tracing::info!(path = %path.display(), "loaded config file");
    Ok(config)
}

/// Load variables from a `.env` file in the working directory or its parents
///
/// Returns an empty map when there is no `.env` file or it cannot be parsed.
/// Nothing is written to the process environment.
#[must_use]
pub fn load_dotenv() -> HashMap<String, String> {
    let iter = match dotenvy::dotenv_iter() {
        Ok(iter) => iter,
        Err(e) if e.not_found() => return HashMap::new(),
        Err(e) => {
            tracing::warn!(error = %e, "failed to open .env file, ignoring it");
            return HashMap::new();
        }
    };

    match iter.collect::<std::result::Result<HashMap<_, _>, _>>() {
        Ok(vars) => {
            tracing::debug!(count = vars.len(), "loaded .env file");
            vars
        }
        Err(e) => {
            tracing::warn!(error = %e, "failed to parse .env file, ignoring it");
            HashMap::new()
        }
    }
}

/// Read variables from a `.env` file at an explicit path
///
/// # Errors
///
/// Returns [`Error::Config`] if the file cannot be read or parsed
pub fn read_dotenv(path: &Path) -> Result<HashMap<String, String>> {
    let invalid = |e: dotenvy::Error| {
        Error::Config(format!("invalid .env file {}: {e}", path.display()))
    };

    dotenvy::from_path_iter(path)
        .map_err(invalid)?
        .collect::<std::result::Result<HashMap<_, _>, _>>()
        .map_err(invalid)
}

/// Return the config file path: `~/.config/grafit-chat/config.toml`
#[must_use]
pub fn config_file_path() -> Option<PathBuf> {
    directories::ProjectDirs::from("", "", "grafit-chat")
        .map(|d| d.config_dir().join("config.toml"))
}
