//! Read a project `.env` file into a key-value map; applying it is done in lib.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// `.env` in `override_dir` if given, else in the current directory.
fn dotenv_path(override_dir: Option<&Path>) -> Option<PathBuf> {
    let dir = override_dir
        .map(Path::to_path_buf)
        .or_else(|| std::env::current_dir().ok())?;
    let path = dir.join(".env");
    path.is_file().then_some(path)
}

/// Parses `.env` without touching the process environment. Missing file returns an empty map.
///
/// Parsing (quotes, comments, `export` prefix, `${VAR}` substitution) is the `dotenv` crate's.
pub fn load_env_map(override_dir: Option<&Path>) -> Result<HashMap<String, String>, dotenv::Error> {
    let Some(path) = dotenv_path(override_dir) else {
        return Ok(HashMap::new());
    };
    dotenv::from_path_iter(&path)?.collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write_env(content: &str) -> tempfile::TempDir {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join(".env"), content).unwrap();
        dir
    }

    #[test]
    fn missing_file_returns_empty_map() {
        let dir = tempfile::tempdir().unwrap();
        let m = load_env_map(Some(dir.path())).unwrap();
        assert!(m.is_empty());
    }

    #[test]
    fn reads_simple_pairs() {
        let dir = write_env("SP_ONCALL_MODEL=openai/gpt-5-nano\nSP_ONCALL_MAX_RETRIES=2\n");
        let m = load_env_map(Some(dir.path())).unwrap();
        assert_eq!(m.get("SP_ONCALL_MODEL").map(String::as_str), Some("openai/gpt-5-nano"));
        assert_eq!(m.get("SP_ONCALL_MAX_RETRIES").map(String::as_str), Some("2"));
        assert_eq!(m.len(), 2);
    }

    #[test]
    fn skips_comments_and_blank_lines() {
        let dir = write_env("\n# logging\nSP_ONCALL_LOG_LEVEL=debug\n\n");
        let m = load_env_map(Some(dir.path())).unwrap();
        assert_eq!(m.get("SP_ONCALL_LOG_LEVEL").map(String::as_str), Some("debug"));
        assert_eq!(m.len(), 1);
    }

    #[test]
    fn strips_quotes() {
        let dir = write_env("DOUBLE=\"hello world\"\nSINGLE='single quoted'\n");
        let m = load_env_map(Some(dir.path())).unwrap();
        assert_eq!(m.get("DOUBLE").map(String::as_str), Some("hello world"));
        assert_eq!(m.get("SINGLE").map(String::as_str), Some("single quoted"));
    }

    #[test]
    fn directory_named_dotenv_is_ignored() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir(dir.path().join(".env")).unwrap();
        let m = load_env_map(Some(dir.path())).unwrap();
        assert!(m.is_empty());
    }
}
