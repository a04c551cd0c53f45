//! Configuration management for grafit-chat
//!
//! Resolution order for every setting is env > TOML file > default. The
//! `OpenAI` key is the one hard requirement; it is checked once here so the
//! rest of the crate can assume it exists.

pub mod file;

use std::path::{Path, PathBuf};
use std::time::Duration;

use secrecy::SecretString;

use crate::voice::SttProvider;
use crate::{Error, Result, prompt};

/// Default chat model
pub const DEFAULT_MODEL: &str = "gpt-4o-mini";

/// Default `OpenAI`-compatible API base URL
pub const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";

/// Default whole-reply timeout
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(120);

/// grafit-chat configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// API keys
    pub api_keys: ApiKeys,

    /// Chat completion configuration
    pub llm: LlmConfig,

    /// Voice dictation configuration
    pub voice: VoiceConfig,

    /// System instruction seeded into each session
    pub system_prompt: String,
}

/// API keys for external services
#[derive(Debug, Clone)]
pub struct ApiKeys {
    /// `OpenAI` API key (chat completion and Whisper)
    pub openai: SecretString,

    /// `Deepgram` API key (optional STT)
    pub deepgram: Option<SecretString>,
}

/// Chat completion configuration
#[derive(Debug, Clone)]
pub struct LlmConfig {
    /// Model identifier
    pub model: String,

    /// `OpenAI`-compatible API base URL, without trailing slash
    pub base_url: String,

    /// Bound on one whole streamed reply; `None` waits indefinitely
    pub timeout: Option<Duration>,
}

/// Voice dictation configuration
#[derive(Debug, Clone)]
pub struct VoiceConfig {
    /// STT backend
    pub provider: SttProvider,

    /// STT model (e.g. "whisper-1", "nova-2")
    pub stt_model: String,
}

impl Config {
    /// Load configuration from the environment, a `.env` file and an optional TOML file
    ///
    /// Process environment wins over `.env`, which wins over the TOML file.
    /// With `path` set the file must exist and parse; otherwise the standard
    /// config path is tried and silently skipped when absent.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if `OPENAI_API_KEY` is missing or a setting
    /// is invalid, and IO/TOML errors for an explicit config file
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let fc = match path {
            Some(p) => file::read_config_file(p)?,
            None => file::load_config_file(),
        };

        let dotenv = file::load_dotenv();
        let dotenv_lookup = |key: &str| dotenv.get(key).cloned();
        Self::from_sources(fc, layered(|key| std::env::var(key).ok(), dotenv_lookup))
    }

    /// Build configuration from a parsed file and an env lookup
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if a required key is missing or a setting is invalid
    pub fn from_sources<F>(fc: file::GrafitConfigFile, env: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        // Blank values count as unset
        let env = |key: &str| env(key).filter(|v| !v.trim().is_empty());

        let openai = env("OPENAI_API_KEY")
            .or(fc.api_keys.openai)
            .filter(|k| !k.trim().is_empty())
            .ok_or_else(|| {
                Error::Config(
                    "OpenAI API key not found; set OPENAI_API_KEY in the environment or a .env file"
                        .to_string(),
                )
            })?;
        let api_keys = ApiKeys {
            openai: SecretString::from(openai),
            deepgram: env("DEEPGRAM_API_KEY")
                .or(fc.api_keys.deepgram)
                .map(SecretString::from),
        };

        let timeout_secs = match env("GRAFIT_TIMEOUT_SECS") {
            Some(raw) => Some(raw.trim().parse::<u64>().map_err(|e| {
                Error::Config(format!("invalid GRAFIT_TIMEOUT_SECS {raw:?}: {e}"))
            })?),
            None => fc.llm.timeout_secs,
        };
        let llm = LlmConfig {
            model: env("GRAFIT_MODEL")
                .or(fc.llm.model)
                .unwrap_or_else(|| DEFAULT_MODEL.to_string()),
            base_url: env("GRAFIT_BASE_URL")
                .or(fc.llm.base_url)
                .unwrap_or_else(|| DEFAULT_BASE_URL.to_string())
                .trim_end_matches('/')
                .to_string(),
            timeout: match timeout_secs {
                Some(0) => None,
                Some(secs) => Some(Duration::from_secs(secs)),
                None => Some(DEFAULT_TIMEOUT),
            },
        };

        let provider = env("GRAFIT_STT_PROVIDER")
            .or(fc.voice.provider)
            .map(|p| p.parse::<SttProvider>())
            .transpose()?
            .unwrap_or_default();
        if provider == SttProvider::Deepgram && api_keys.deepgram.is_none() {
            return Err(Error::Config(
                "Deepgram STT selected but DEEPGRAM_API_KEY is not set".to_string(),
            ));
        }
        let voice = VoiceConfig {
            provider,
            stt_model: env("GRAFIT_STT_MODEL")
                .or(fc.voice.stt_model)
                .unwrap_or_else(|| provider.default_model().to_string()),
        };

        let prompt_file = env("GRAFIT_SYSTEM_PROMPT_FILE")
            .map(PathBuf::from)
            .or(fc.system_prompt_file);
        let system_prompt = match prompt_file {
            Some(path) => prompt::load_instruction(&path)?,
            None => prompt::GRAFIT_INSTRUCTION.to_string(),
        };

        tracing::debug!(
            model = %llm.model,
            base_url = %llm.base_url,
            timeout = ?llm.timeout,
            stt = %voice.provider,
            stt_model = %voice.stt_model,
            "resolved configuration"
        );

        Ok(Self {
            api_keys,
            llm,
            voice,
            system_prompt,
        })
    }
}

/// Env lookup that falls back to `fallback` for unset or blank keys
fn layered<P, F>(primary: P, fallback: F) -> impl Fn(&str) -> Option<String>
where
    P: Fn(&str) -> Option<String>,
    F: Fn(&str) -> Option<String>,
{
    move |key| {
        primary(key)
            .filter(|v| !v.trim().is_empty())
            .or_else(|| fallback(key))
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use secrecy::ExposeSecret;

    use super::file::GrafitConfigFile;
    use super::*;

    fn env_of(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn missing_api_key_is_config_error() {
        let err = Config::from_sources(GrafitConfigFile::default(), env_of(&[])).unwrap_err();
        assert!(matches!(err, Error::Config(msg) if msg.contains("OPENAI_API_KEY")));
    }

    #[test]
    fn blank_api_key_is_config_error() {
        let result = Config::from_sources(
            GrafitConfigFile::default(),
            env_of(&[("OPENAI_API_KEY", "   ")]),
        );
        assert!(matches!(result, Err(Error::Config(_))));
    }

    #[test]
    fn defaults_apply_with_only_api_key() {
        let config = Config::from_sources(
            GrafitConfigFile::default(),
            env_of(&[("OPENAI_API_KEY", "sk-test")]),
        )
        .unwrap();

        assert_eq!(config.api_keys.openai.expose_secret(), "sk-test");
        assert_eq!(config.llm.model, DEFAULT_MODEL);
        assert_eq!(config.llm.base_url, DEFAULT_BASE_URL);
        assert_eq!(config.llm.timeout, Some(DEFAULT_TIMEOUT));
        assert_eq!(config.voice.provider, SttProvider::Whisper);
        assert_eq!(config.voice.stt_model, "whisper-1");
        assert_eq!(config.system_prompt, prompt::GRAFIT_INSTRUCTION);
    }

    #[test]
    fn env_overrides_file() {
        let mut fc = GrafitConfigFile::default();
        fc.api_keys.openai = Some("sk-file".to_string());
        fc.llm.model = Some("gpt-4o".to_string());
        fc.llm.base_url = Some("http://file.local/v1/".to_string());

        let config = Config::from_sources(
            fc,
            env_of(&[
                ("GRAFIT_MODEL", "gpt-4.1-mini"),
                ("OPENAI_API_KEY", "sk-env"),
            ]),
        )
        .unwrap();

        assert_eq!(config.api_keys.openai.expose_secret(), "sk-env");
        assert_eq!(config.llm.model, "gpt-4.1-mini");
        assert_eq!(config.llm.base_url, "http://file.local/v1");
    }

    #[test]
    fn zero_timeout_disables_limit() {
        let config = Config::from_sources(
            GrafitConfigFile::default(),
            env_of(&[("OPENAI_API_KEY", "sk"), ("GRAFIT_TIMEOUT_SECS", "0")]),
        )
        .unwrap();
        assert_eq!(config.llm.timeout, None);
    }

    #[test]
    fn bad_timeout_is_rejected() {
        let result = Config::from_sources(
            GrafitConfigFile::default(),
            env_of(&[("OPENAI_API_KEY", "sk"), ("GRAFIT_TIMEOUT_SECS", "soon")]),
        );
        assert!(matches!(result, Err(Error::Config(_))));
    }

    #[test]
    fn deepgram_requires_its_key() {
        let result = Config::from_sources(
            GrafitConfigFile::default(),
            env_of(&[
                ("OPENAI_API_KEY", "sk"),
                ("GRAFIT_STT_PROVIDER", "deepgram"),
            ]),
        );
        assert!(matches!(result, Err(Error::Config(_))));

        let config = Config::from_sources(
            GrafitConfigFile::default(),
            env_of(&[
                ("OPENAI_API_KEY", "sk"),
                ("GRAFIT_STT_PROVIDER", "deepgram"),
                ("DEEPGRAM_API_KEY", "dg"),
            ]),
        )
        .unwrap();
        assert_eq!(config.voice.provider, SttProvider::Deepgram);
        assert_eq!(config.voice.stt_model, "nova-2");
    }

    #[test]
    fn dotenv_supplies_missing_keys() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(".env");
        std::fs::write(&path, "OPENAI_API_KEY=sk-dotenv\nGRAFIT_MODEL=gpt-4o\n").unwrap();
        let dotenv = file::read_dotenv(&path).unwrap();

        let process = env_of(&[("GRAFIT_MODEL", "gpt-4.1"), ("OPENAI_API_KEY", " ")]);
        let config = Config::from_sources(
            GrafitConfigFile::default(),
            layered(process, |key| dotenv.get(key).cloned()),
        )
        .unwrap();

        // Blank process value falls through, set process value wins
        assert_eq!(config.api_keys.openai.expose_secret(), "sk-dotenv");
        assert_eq!(config.llm.model, "gpt-4.1");
    }

    #[test]
    fn missing_key_message_mentions_dotenv() {
        let err = Config::from_sources(GrafitConfigFile::default(), env_of(&[])).unwrap_err();
        assert!(err.to_string().contains(".env file"));
    }

    #[test]
    fn system_prompt_file_replaces_instruction() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("prompt.txt");
        std::fs::write(&path, "Custom instruction").unwrap();

        let mut fc = GrafitConfigFile::default();
        fc.system_prompt_file = Some(path);

        let config = Config::from_sources(fc, env_of(&[("OPENAI_API_KEY", "sk")])).unwrap();
        assert_eq!(config.system_prompt, "Custom instruction");
    }
}
