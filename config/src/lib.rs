//! Load configuration from XDG `config.toml` and project `.env`, then apply it to the process
//! environment with priority: **existing env > .env > XDG**.
//!
//! With feature `tracing-init`, [`logging`] turns the `SP_ONCALL_*` logging variables into an
//! `EnvFilter` and an optional rolling file appender.

mod dotenv_file;
#[cfg(feature = "tracing-init")]
pub mod logging;
mod xdg_toml;

use std::collections::HashSet;
use std::path::Path;

use thiserror::Error;

/// App name used for `$XDG_CONFIG_HOME/<app>/config.toml`.
pub const APP_NAME: &str = "sp-oncall";

#[derive(Error, Debug)]
pub enum LoadError {
    #[error("xdg config path: {0}")]
    XdgPath(String),
    #[error("read xdg config: {0}")]
    XdgRead(std::io::Error),
    #[error("parse xdg toml: {0}")]
    XdgParse(#[from] toml::de::Error),
    #[error("read .env: {0}")]
    Dotenv(#[from] dotenv::Error),
}

/// Loads XDG `config.toml` and the optional project `.env`, then sets environment variables
/// only for keys that are **not** already set.
///
/// For a key missing from the process environment:
/// 1. Value from project `.env` (current directory or `override_dir`)
/// 2. Value from `$XDG_CONFIG_HOME/<app_name>/config.toml` `[env]` table
pub fn load_and_apply(app_name: &str, override_dir: Option<&Path>) -> Result<(), LoadError> {
    let xdg_map = xdg_toml::load_env_map(app_name)?;
    let dotenv_map = dotenv_file::load_env_map(override_dir)?;

    let keys: HashSet<&String> = xdg_map.keys().chain(dotenv_map.keys()).collect();
    for key in keys {
        if std::env::var_os(key).is_some() {
            continue;
        }
        if let Some(v) = dotenv_map.get(key).or_else(|| xdg_map.get(key)) {
            std::env::set_var(key, v);
        }
    }

    Ok(())
}
