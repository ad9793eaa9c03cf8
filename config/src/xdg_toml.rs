//! Load the `[env]` table from `$XDG_CONFIG_HOME/<app>/config.toml`.

use std::collections::HashMap;
use std::path::PathBuf;

use crate::LoadError;

/// `$XDG_CONFIG_HOME` when set and non-empty, else the platform config dir.
fn config_home() -> Result<PathBuf, LoadError> {
    match std::env::var_os("XDG_CONFIG_HOME") {
        Some(dir) if !dir.is_empty() => Ok(PathBuf::from(dir)),
        _ => dirs::config_dir()
            .ok_or_else(|| LoadError::XdgPath("no config directory for this platform".to_string())),
    }
}

fn xdg_config_path(app_name: &str) -> Result<Option<PathBuf>, LoadError> {
    let path = config_home()?.join(app_name).join("config.toml");
    Ok(path.is_file().then_some(path))
}

#[derive(serde::Deserialize, Default)]
struct ConfigFile {
    #[serde(default)]
    env: HashMap<String, String>,
}

/// Key-value pairs from the `[env]` section. Missing file or section returns an empty map.
pub fn load_env_map(app_name: &str) -> Result<HashMap<String, String>, LoadError> {
    let Some(path) = xdg_config_path(app_name)? else {
        return Ok(HashMap::new());
    };
    let content = std::fs::read_to_string(&path).map_err(LoadError::XdgRead)?;
    let config: ConfigFile = toml::from_str(&content)?;
    Ok(config.env)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::env;

    /// Runs `f` with `XDG_CONFIG_HOME` pointing at a temp dir holding `<app>/config.toml`.
    fn with_config<T>(app: &str, toml: &str, f: impl FnOnce() -> T) -> T {
        let _guard = crate::tests::env_lock();
        let dir = tempfile::tempdir().unwrap();
        let app_dir = dir.path().join(app);
        std::fs::create_dir_all(&app_dir).unwrap();
        std::fs::write(app_dir.join("config.toml"), toml).unwrap();

        let prev = env::var("XDG_CONFIG_HOME").ok();
        env::set_var("XDG_CONFIG_HOME", dir.path());
        let out = f();
        match prev {
            Some(p) => env::set_var("XDG_CONFIG_HOME", p),
            None => env::remove_var("XDG_CONFIG_HOME"),
        }
        out
    }

    #[test]
    fn missing_config_returns_empty_map() {
        let map = load_env_map("sp-oncall-test-nonexistent-12345").unwrap();
        assert!(map.is_empty());
    }

    #[test]
    fn reads_env_table() {
        let map = with_config(
            "xdgread",
            "[env]\nSP_ONCALL_MODEL = \"openai/gpt-5-nano\"\nSP_ONCALL_PLANS_DIR = \"/srv/plans\"\n",
            || load_env_map("xdgread"),
        )
        .unwrap();
        assert_eq!(map.get("SP_ONCALL_MODEL").map(String::as_str), Some("openai/gpt-5-nano"));
        assert_eq!(map.get("SP_ONCALL_PLANS_DIR").map(String::as_str), Some("/srv/plans"));
    }

    #[test]
    fn empty_or_missing_env_section_returns_empty_map() {
        let empty = with_config("xdgempty", "[env]\n", || load_env_map("xdgempty")).unwrap();
        assert!(empty.is_empty());
        let other = with_config("xdgother", "[other]\nkey = \"ignored\"\n", || {
            load_env_map("xdgother")
        })
        .unwrap();
        assert!(other.is_empty());
    }

    #[test]
    fn invalid_toml_returns_xdg_parse_error() {
        let result = with_config("xdgbad", "not valid toml [[[\n", || load_env_map("xdgbad"));
        assert!(matches!(result, Err(LoadError::XdgParse(_))));
    }
}
