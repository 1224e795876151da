//! Load configuration via `config` crate with env-override support.

use std::{ops::Deref, path::PathBuf, sync::Arc};

use serde::Deserialize;
use serde_with::{StringWithSeparator, formats::CommaSeparator, serde_as};

use crate::base::prompts;

use super::types::Res;

/// Default OpenAI model used by both agents.
fn default_openai_model() -> String {
    "gpt-4o".to_string()
}

/// Default sampling temperature for the relevance agent.
fn default_openai_relevance_temperature() -> f32 {
    0.1
}

/// Default max output tokens for the relevance agent.
fn default_openai_relevance_max_tokens() -> u32 {
    50
}

/// Default sampling temperature for the assistant agent.
fn default_openai_assistant_temperature() -> f32 {
    1.0
}

/// Default max output tokens for the assistant agent.
fn default_openai_assistant_max_tokens() -> u32 {
    500
}

/// Default timeout for a single OpenAI call.
fn default_openai_timeout_secs() -> u64 {
    60
}

/// Default system directive for the assistant agent.
fn default_assistant_agent_system_directive() -> String {
    prompts::ASSISTANT_AGENT_SYSTEM_DIRECTIVE.to_string()
}

/// Default system directive for the relevance agent.
fn default_relevance_agent_system_directive() -> String {
    prompts::RELEVANCE_AGENT_SYSTEM_DIRECTIVE.to_string()
}

fn default_data_dir() -> PathBuf {
    PathBuf::from("./patient_data")
}

fn default_bind_address() -> String {
    "127.0.0.1:5000".to_string()
}

/// Configuration for the patient-assist application.
#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub inner: Arc<ConfigInner>,
}

impl Deref for Config {
    type Target = ConfigInner;

    fn deref(&self) -> &Self::Target {
        &self.inner
    }
}

#[serde_as]
#[derive(Debug, Deserialize, Clone, Default)]
pub struct ConfigInner {
    /// OpenAI API key (`PATIENT_ASSIST_OPENAI_API_KEY`).
    pub openai_api_key: String,
    /// Optional OpenAI-compatible API base URL (`PATIENT_ASSIST_OPENAI_API_BASE`).
    #[serde(default)]
    pub openai_api_base: Option<String>,
    /// OpenAI model used by both agents (`PATIENT_ASSIST_OPENAI_MODEL`).
    #[serde(default = "default_openai_model")]
    pub openai_model: String,
    /// Sampling temperature for the relevance agent (`PATIENT_ASSIST_OPENAI_RELEVANCE_TEMPERATURE`).
    /// Kept low so the agent answers with a bare filename.
    #[serde(default = "default_openai_relevance_temperature")]
    pub openai_relevance_temperature: f32,
    /// Max output tokens for the relevance agent (`PATIENT_ASSIST_OPENAI_RELEVANCE_MAX_TOKENS`).
    #[serde(default = "default_openai_relevance_max_tokens")]
    pub openai_relevance_max_tokens: u32,
    /// Sampling temperature for the assistant agent (`PATIENT_ASSIST_OPENAI_ASSISTANT_TEMPERATURE`).
    /// Value between 0 and 2.
    #[serde(default = "default_openai_assistant_temperature")]
    pub openai_assistant_temperature: f32,
    /// Max output tokens for the assistant agent (`PATIENT_ASSIST_OPENAI_ASSISTANT_MAX_TOKENS`).
    /// Needs headroom for embedded form specifications.
    #[serde(default = "default_openai_assistant_max_tokens")]
    pub openai_assistant_max_tokens: u32,
    /// Timeout in seconds for a single OpenAI call (`PATIENT_ASSIST_OPENAI_TIMEOUT_SECS`).
    #[serde(default = "default_openai_timeout_secs")]
    pub openai_timeout_secs: u64,
    /// Optional custom assistant directive to override the default (`PATIENT_ASSIST_ASSISTANT_AGENT_SYSTEM_DIRECTIVE`).
    #[serde(default = "default_assistant_agent_system_directive")]
    pub assistant_agent_system_directive: String,
    /// Optional custom relevance directive to override the default (`PATIENT_ASSIST_RELEVANCE_AGENT_SYSTEM_DIRECTIVE`).
    #[serde(default = "default_relevance_agent_system_directive")]
    pub relevance_agent_system_directive: String,
    /// Directory holding patient records and `index.json` (`PATIENT_ASSIST_DATA_DIR`).
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,
    /// Address the HTTP server binds to (`PATIENT_ASSIST_BIND_ADDRESS`).
    #[serde(default = "default_bind_address")]
    pub bind_address: String,
    /// Comma separated CORS origins; empty allows any origin (`PATIENT_ASSIST_CORS_ALLOWED_ORIGINS`).
    #[serde_as(as = "StringWithSeparator::<CommaSeparator, String>")]
    #[serde(default)]
    pub cors_allowed_origins: Vec<String>,
}

impl Config {
    pub fn load(explicit_path: Option<&std::path::Path>) -> Res<Self> {
        let mut cfg = config::Config::builder().add_source(config::Environment::default().prefix("PATIENT_ASSIST"));

        if let Some(p) = explicit_path {
            cfg = cfg.add_source(config::File::from(p.to_path_buf()));
        } else if std::path::Path::new(".hidden/config.toml").exists() {
            cfg = cfg.add_source(config::File::with_name(".hidden/config.toml"));
        }

        let result = Config {
            inner: Arc::new(cfg.build()?.try_deserialize()?),
        };

        result.validate()?;

        Ok(result)
    }

    /// Check value ranges that serde cannot express.
    pub fn validate(&self) -> Res<()> {
        if self.openai_relevance_temperature < 0.0 || self.openai_relevance_temperature > 2.0 {
            return Err(anyhow::anyhow!("OpenAI relevance temperature must be between 0 and 2."));
        }

        if self.openai_assistant_temperature < 0.0 || self.openai_assistant_temperature > 2.0 {
            return Err(anyhow::anyhow!("OpenAI assistant temperature must be between 0 and 2."));
        }

        if self.openai_relevance_max_tokens < 1 || self.openai_relevance_max_tokens > 128000 {
            return Err(anyhow::anyhow!("OpenAI relevance max tokens must be between 1 and 128000."));
        }

        if self.openai_assistant_max_tokens < 1 || self.openai_assistant_max_tokens > 128000 {
            return Err(anyhow::anyhow!("OpenAI assistant max tokens must be between 1 and 128000."));
        }

        if self.openai_timeout_secs == 0 {
            return Err(anyhow::anyhow!("OpenAI timeout must be greater than zero."));
        }

        Ok(())
    }
}

// Tests.
