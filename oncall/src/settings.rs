//! Runtime settings read from `SP_ONCALL_*` environment variables.
//!
//! The CLI loads `.env` and the XDG config first (see the `config` crate), so
//! every value here can come from the shell, `.env` or `config.toml`. CLI flags
//! override the result field by field.

use std::path::PathBuf;

use thiserror::Error;

use crate::llm::DEFAULT_MODEL;
use crate::plans::{DEFAULT_PLANS_DIR, PLANS_DIR_ENV};
use crate::state::DEFAULT_MAX_RETRIES;
use crate::tool_source::MCP_CONFIG_FILE;

pub const MODEL_ENV: &str = "SP_ONCALL_MODEL";
pub const MAX_RETRIES_ENV: &str = "SP_ONCALL_MAX_RETRIES";
pub const MCP_CONFIG_ENV: &str = "SP_ONCALL_MCP_CONFIG";
pub const TEMPERATURE_ENV: &str = "SP_ONCALL_TEMPERATURE";
/// When truthy, MCP server stderr is passed through instead of discarded.
pub const MCP_STDERR_ENV: &str = "SP_ONCALL_MCP_STDERR";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SettingsError {
    #[error("invalid value for {key}: {value:?} ({reason})")]
    Invalid {
        key: &'static str,
        value: String,
        reason: String,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    /// `provider/model`.
    pub model: String,
    pub max_retries: u32,
    /// File name looked up from the working directory upwards, or an absolute path.
    pub mcp_config: PathBuf,
    pub plans_dir: PathBuf,
    pub temperature: Option<f32>,
    pub mcp_stderr_verbose: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            model: DEFAULT_MODEL.to_string(),
            max_retries: DEFAULT_MAX_RETRIES,
            mcp_config: PathBuf::from(MCP_CONFIG_FILE),
            plans_dir: PathBuf::from(DEFAULT_PLANS_DIR),
            temperature: None,
            mcp_stderr_verbose: false,
        }
    }
}

impl Settings {
    /// Reads settings from the process environment.
    pub fn from_env() -> Result<Self, SettingsError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Reads settings through `lookup`; unset or blank values keep their defaults.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, SettingsError> {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let mut settings = Self::default();
        if let Some(model) = get(MODEL_ENV) {
            settings.model = model.trim().to_string();
        }
        if let Some(value) = get(MAX_RETRIES_ENV) {
            settings.max_retries = value.trim().parse().map_err(|e: std::num::ParseIntError| {
                SettingsError::Invalid {
                    key: MAX_RETRIES_ENV,
                    value: value.clone(),
                    reason: e.to_string(),
                }
            })?;
        }
        if let Some(path) = get(MCP_CONFIG_ENV) {
            settings.mcp_config = PathBuf::from(path);
        }
        if let Some(dir) = get(PLANS_DIR_ENV) {
            settings.plans_dir = PathBuf::from(dir);
        }
        if let Some(value) = get(TEMPERATURE_ENV) {
            let t: f32 = value.trim().parse().map_err(|e: std::num::ParseFloatError| {
                SettingsError::Invalid {
                    key: TEMPERATURE_ENV,
                    value: value.clone(),
                    reason: e.to_string(),
                }
            })?;
            settings.temperature = Some(t);
        }
        if let Some(value) = get(MCP_STDERR_ENV) {
            settings.mcp_stderr_verbose = is_truthy(&value);
        }
        Ok(settings)
    }
}

fn is_truthy(value: &str) -> bool {
    matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}
