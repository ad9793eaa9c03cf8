//! `SP_ONCALL_*` logging settings: global and per-module levels, optional log file,
//! structured (JSON) output and how loudly external crates may log.
//!
//! `RUST_LOG`, when set, replaces the computed filter entirely.

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use tracing_appender::rolling::{self, RollingFileAppender};
use tracing_subscriber::EnvFilter;

pub const LOG_LEVEL_ENV: &str = "SP_ONCALL_LOG_LEVEL";
pub const MODULE_LEVELS_ENV: &str = "SP_ONCALL_MODULE_LEVELS";
pub const LOG_FILE_ENV: &str = "SP_ONCALL_LOG_FILE";
pub const STRUCTURED_LOGGING_ENV: &str = "SP_ONCALL_STRUCTURED_LOGGING";
pub const DEBUG_MODE_ENV: &str = "SP_ONCALL_DEBUG_MODE";
pub const EXTERNAL_SUPPRESSION_MODE_ENV: &str = "SP_ONCALL_EXTERNAL_SUPPRESSION_MODE";

pub const DEFAULT_LOG_LEVEL: &str = "info";

/// Tracing targets of the application, listed by `sp-oncall loggers`.
pub const APP_TARGETS: &[&str] = &[
    "oncall",
    "oncall::graph",
    "oncall::llm",
    "oncall::tool_source::mcp",
    "oncall::react",
    "oncall::nodes::input_validator",
    "oncall::nodes::planner",
    "oncall::nodes::executor",
    "oncall::nodes::assessor",
    "oncall::nodes::reporter",
    "oncall::workflow",
    "oncall::plans",
    "oncall::settings",
    "cli",
];

/// Levels applied to noisy dependency crates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SuppressionMode {
    /// HTTP, TLS and model-client crates only log errors.
    #[default]
    Production,
    /// HTTP crates keep info so requests can be followed.
    Development,
    /// External crates are silenced.
    Testing,
}

const EXTERNAL_TARGETS: &[&str] = &[
    "hyper",
    "hyper_util",
    "h2",
    "reqwest",
    "rustls",
    "tower",
    "mio",
    "async_openai",
];

impl SuppressionMode {
    fn external_level(self, target: &str) -> &'static str {
        match self {
            SuppressionMode::Production => "error",
            SuppressionMode::Development => match target {
                "hyper" | "reqwest" | "async_openai" => "info",
                _ => "warn",
            },
            SuppressionMode::Testing => "off",
        }
    }
}

impl FromStr for SuppressionMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "production" | "prod" => Ok(SuppressionMode::Production),
            "development" | "dev" => Ok(SuppressionMode::Development),
            "testing" | "test" => Ok(SuppressionMode::Testing),
            other => Err(format!("unknown suppression mode: {other}")),
        }
    }
}

impl fmt::Display for SuppressionMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            SuppressionMode::Production => "production",
            SuppressionMode::Development => "development",
            SuppressionMode::Testing => "testing",
        })
    }
}

/// Normalizes `warning`/`critical` and rejects anything tracing has no level for.
fn normalize_level(level: &str) -> Option<String> {
    let level = level.trim().to_ascii_lowercase();
    match level.as_str() {
        "trace" | "debug" | "info" | "warn" | "error" | "off" => Some(level),
        "warning" => Some("warn".to_string()),
        "critical" | "fatal" => Some("error".to_string()),
        _ => None,
    }
}

/// `sp_oncall.nodes.executor` and `oncall::nodes::executor` both name the same target.
fn normalize_target(module: &str) -> String {
    let module = module.trim().replace('.', "::");
    match module.strip_prefix("sp_oncall") {
        Some(rest) => format!("oncall{rest}"),
        None => module,
    }
}

fn is_truthy(value: &str) -> bool {
    matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}

/// Logging settings read from the environment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoggingSettings {
    pub level: String,
    /// `(target, level)` pairs from `module=level,…`; malformed entries are skipped.
    pub module_levels: Vec<(String, String)>,
    pub log_file: Option<PathBuf>,
    pub structured: bool,
    /// Forces `debug` for application targets.
    pub debug_mode: bool,
    pub suppression: SuppressionMode,
    /// Raw `RUST_LOG`; takes precedence over everything above.
    pub rust_log: Option<String>,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: DEFAULT_LOG_LEVEL.to_string(),
            module_levels: Vec::new(),
            log_file: None,
            structured: false,
            debug_mode: false,
            suppression: SuppressionMode::default(),
            rust_log: None,
        }
    }
}

impl LoggingSettings {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds settings from `lookup`; blank or invalid values fall back to defaults.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let mut settings = Self::default();

        if let Some(level) = get(LOG_LEVEL_ENV).and_then(|v| normalize_level(&v)) {
            settings.level = level;
        }
        if let Some(spec) = get(MODULE_LEVELS_ENV) {
            settings.module_levels = spec
                .split(',')
                .filter_map(|entry| {
                    let (module, level) = entry.split_once('=')?;
                    let target = normalize_target(module);
                    let level = normalize_level(level)?;
                    (!target.is_empty()).then_some((target, level))
                })
                .collect();
        }
        settings.log_file = get(LOG_FILE_ENV).map(PathBuf::from);
        settings.structured = get(STRUCTURED_LOGGING_ENV).is_some_and(|v| is_truthy(&v));
        settings.debug_mode = get(DEBUG_MODE_ENV).is_some_and(|v| is_truthy(&v));
        if let Some(mode) = get(EXTERNAL_SUPPRESSION_MODE_ENV).and_then(|v| v.parse().ok()) {
            settings.suppression = mode;
        }
        settings.rust_log = get("RUST_LOG");
        settings
    }

    fn base_level(&self) -> &str {
        if self.debug_mode {
            "debug"
        } else {
            &self.level
        }
    }

    /// Filter directives without `RUST_LOG`: base level, external crates, then module overrides.
    pub fn directives(&self) -> String {
        let mut parts = vec![self.base_level().to_string()];
        parts.extend(EXTERNAL_TARGETS.iter().map(|target| {
            format!("{}={}", target, self.suppression.external_level(target))
        }));
        parts.extend(
            self.module_levels
                .iter()
                .map(|(target, level)| format!("{target}={level}")),
        );
        parts.join(",")
    }

    /// `RUST_LOG` when set and valid, else [`LoggingSettings::directives`].
    pub fn env_filter(&self) -> EnvFilter {
        if let Some(filter) = self
            .rust_log
            .as_deref()
            .and_then(|spec| EnvFilter::try_new(spec).ok())
        {
            return filter;
        }
        EnvFilter::try_new(self.directives()).unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_LEVEL))
    }

    /// Level `target` ends up with: the longest matching module override, else the base level.
    pub fn effective_level(&self, target: &str) -> &str {
        self.module_levels
            .iter()
            .filter(|(module, _)| {
                target == module || target.starts_with(&format!("{module}::"))
            })
            .max_by_key(|(module, _)| module.len())
            .map(|(_, level)| level.as_str())
            .unwrap_or_else(|| self.base_level())
    }

    /// Daily-rolled appender for `log_file`: files are `<name>.YYYY-MM-DD` next to it.
    pub fn rolling_appender(&self) -> Option<RollingFileAppender> {
        let path = self.log_file.as_ref()?;
        let file_name = path.file_name()?;
        let dir = match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };
        Some(rolling::daily(dir, file_name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn settings(pairs: &[(&str, &str)]) -> LoggingSettings {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        LoggingSettings::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn defaults_when_nothing_set() {
        let s = settings(&[]);
        assert_eq!(s, LoggingSettings::default());
        assert!(s.directives().starts_with("info,hyper=error,"));
        assert_eq!(s.effective_level("oncall::nodes::executor"), "info");
    }

    #[test]
    fn levels_are_normalized() {
        let s = settings(&[
            (LOG_LEVEL_ENV, "WARNING"),
            (MODULE_LEVELS_ENV, "sp_oncall.nodes.executor=debug, oncall::graph=critical,broken,x=loud"),
        ]);
        assert_eq!(s.level, "warn");
        assert_eq!(
            s.module_levels,
            vec![
                ("oncall::nodes::executor".to_string(), "debug".to_string()),
                ("oncall::graph".to_string(), "error".to_string()),
            ]
        );
        assert!(s.directives().ends_with("oncall::nodes::executor=debug,oncall::graph=error"));
    }

    #[test]
    fn invalid_level_keeps_default() {
        let s = settings(&[(LOG_LEVEL_ENV, "chatty")]);
        assert_eq!(s.level, DEFAULT_LOG_LEVEL);
    }

    #[test]
    fn debug_mode_overrides_base_level() {
        let s = settings(&[(LOG_LEVEL_ENV, "error"), (DEBUG_MODE_ENV, "true")]);
        assert!(s.directives().starts_with("debug,"));
        assert_eq!(s.effective_level("oncall::plans"), "debug");
    }

    #[test]
    fn suppression_modes_set_external_levels() {
        let dev = settings(&[(EXTERNAL_SUPPRESSION_MODE_ENV, "development")]);
        assert_eq!(dev.suppression, SuppressionMode::Development);
        assert!(dev.directives().contains("reqwest=info"));
        assert!(dev.directives().contains("h2=warn"));

        let testing = settings(&[(EXTERNAL_SUPPRESSION_MODE_ENV, "Testing")]);
        assert!(testing.directives().contains("hyper=off"));

        let unknown = settings(&[(EXTERNAL_SUPPRESSION_MODE_ENV, "loud")]);
        assert_eq!(unknown.suppression, SuppressionMode::Production);
    }

    #[test]
    fn effective_level_uses_longest_prefix() {
        let s = settings(&[(MODULE_LEVELS_ENV, "oncall=warn,oncall::nodes=debug")]);
        assert_eq!(s.effective_level("oncall::nodes::planner"), "debug");
        assert_eq!(s.effective_level("oncall::graph"), "warn");
        assert_eq!(s.effective_level("oncall_extra"), "info");
        assert_eq!(s.effective_level("cli"), "info");
    }

    #[test]
    fn flags_and_file() {
        let s = settings(&[
            (STRUCTURED_LOGGING_ENV, "1"),
            (LOG_FILE_ENV, "/var/log/sp-oncall/oncall.log"),
            ("RUST_LOG", "oncall=trace"),
        ]);
        assert!(s.structured);
        assert_eq!(s.log_file, Some(PathBuf::from("/var/log/sp-oncall/oncall.log")));
        assert_eq!(s.rust_log.as_deref(), Some("oncall=trace"));
        let filter = s.env_filter().to_string();
        assert!(filter.contains("oncall"));
        assert!(!filter.contains("hyper"));
    }

    #[test]
    fn rolling_appender_only_with_log_file() {
        assert!(settings(&[]).rolling_appender().is_none());
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("oncall.log");
        let s = settings(&[(LOG_FILE_ENV, path.to_str().unwrap())]);
        assert!(s.rolling_appender().is_some());
    }
}
