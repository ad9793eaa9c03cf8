//! `mcp_config.json` loading.
//!
//! Accepts `{"mcpServers": {name: server}}` or the bare `{name: server}` map.
//! A server is either stdio (`command`, `args`, `env`) or HTTP (`url`,
//! optional `transport` and `headers`).

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use thiserror::Error;

/// File name searched for when no explicit path is given.
pub const MCP_CONFIG_FILE: &str = "mcp_config.json";

/// One MCP server entry.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum McpServerConfig {
    Http {
        url: String,
        /// `streamable_http` (default) or `sse`; both use the Streamable HTTP client.
        #[serde(default)]
        transport: Option<String>,
        #[serde(default)]
        headers: BTreeMap<String, String>,
    },
    Stdio {
        command: String,
        #[serde(default)]
        args: Vec<String>,
        #[serde(default)]
        env: BTreeMap<String, String>,
    },
}

/// Parsed config: server name to server entry, in name order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct McpConfig {
    pub servers: BTreeMap<String, McpServerConfig>,
}

#[derive(Deserialize)]
struct Wrapped {
    #[serde(rename = "mcpServers")]
    mcp_servers: BTreeMap<String, McpServerConfig>,
}

#[derive(Debug, Error)]
pub enum McpConfigError {
    #[error("{0} not found (searched upward from {1})")]
    NotFound(String, PathBuf),
    #[error("read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("parse {path}: {message}")]
    Parse { path: PathBuf, message: String },
}

impl McpConfig {
    /// Parses the JSON text of an `mcp_config.json`.
    pub fn from_json(text: &str) -> Result<Self, serde_json::Error> {
        let value: serde_json::Value = serde_json::from_str(text)?;
        let servers = if value.get("mcpServers").is_some() {
            serde_json::from_value::<Wrapped>(value)?.mcp_servers
        } else {
            serde_json::from_value(value)?
        };
        Ok(Self { servers })
    }
}

/// Resolves `file_name` to a path.
///
/// Absolute paths are returned as given. Otherwise `start` and each of its
/// ancestors is checked for `file_name`; the first hit wins.
pub fn find_mcp_config(file_name: &str, start: &Path) -> Result<PathBuf, McpConfigError> {
    let candidate = Path::new(file_name);
    if candidate.is_absolute() {
        return Ok(candidate.to_path_buf());
    }
    start
        .ancestors()
        .map(|dir| dir.join(candidate))
        .find(|p| p.is_file())
        .ok_or_else(|| McpConfigError::NotFound(file_name.to_string(), start.to_path_buf()))
}

/// Reads and parses the config file at `path`.
pub fn load_mcp_config(path: &Path) -> Result<McpConfig, McpConfigError> {
    let text = std::fs::read_to_string(path).map_err(|source| McpConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    McpConfig::from_json(&text).map_err(|e| McpConfigError::Parse {
        path: path.to_path_buf(),
        message: e.to_string(),
    })
}
