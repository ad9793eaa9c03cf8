//! Plan templates offered to the planner.
//!
//! Every `*.json` file in the plans directory is handed to the model verbatim,
//! wrapped in `--- plan: <file> ---` / `--- end plan: <file> ---` markers.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use glob::Pattern;
use tracing::{debug, warn};

/// Overrides the plans directory.
pub const PLANS_DIR_ENV: &str = "SP_ONCALL_PLANS_DIR";
pub const DEFAULT_PLANS_DIR: &str = "plans";

const PLAN_FILE_PATTERN: &str = "*.json";

/// `$SP_ONCALL_PLANS_DIR`, else `plans/` under the working directory.
pub fn default_plans_dir() -> PathBuf {
    std::env::var(PLANS_DIR_ENV)
        .ok()
        .filter(|s| !s.trim().is_empty())
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(DEFAULT_PLANS_DIR))
}

/// Loads plan files keyed by file name.
///
/// A missing directory yields an empty map; unreadable files are skipped.
pub fn load_plans(dir: &Path) -> BTreeMap<String, String> {
    let mut plans = BTreeMap::new();
    let entries = match std::fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) => {
            debug!(dir = %dir.display(), error = %e, "plans directory not readable");
            return plans;
        }
    };
    let pattern = match Pattern::new(PLAN_FILE_PATTERN) {
        Ok(p) => p,
        Err(_) => return plans,
    };

    for entry in entries.flatten() {
        let path = entry.path();
        if !path.is_file() {
            continue;
        }
        let Some(file_name) = path.file_name().and_then(|n| n.to_str()) else {
            continue;
        };
        if !pattern.matches(file_name) {
            continue;
        }
        match std::fs::read_to_string(&path) {
            Ok(content) => {
                plans.insert(
                    file_name.to_string(),
                    format!(
                        "--- plan: {name} ---\n{content}\n--- end plan: {name} ---",
                        name = file_name,
                        content = content
                    ),
                );
            }
            Err(e) => warn!(plan = %path.display(), error = %e, "skipping unreadable plan"),
        }
    }
    debug!(dir = %dir.display(), count = plans.len(), "plans loaded");
    plans
}

/// All plan blocks separated by blank lines, in file-name order.
pub fn plans_to_string(plans: &BTreeMap<String, String>) -> String {
    plans.values().cloned().collect::<Vec<_>>().join("\n\n")
}
