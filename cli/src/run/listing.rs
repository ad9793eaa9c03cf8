//! `sp-oncall tools` and `sp-oncall loggers`.

use config::logging::{LoggingSettings, APP_TARGETS};
use oncall::{ToolSource, ToolSpec};

use super::RunError;

/// Tools from `source`, sorted by name.
pub async fn list_tools(source: &dyn ToolSource) -> Result<Vec<ToolSpec>, RunError> {
    let mut tools = source.list_tools().await?;
    tools.sort_by(|a, b| a.name.cmp(&b.name));
    Ok(tools)
}

/// JSON array of full specs, or one `name  description` line per tool.
pub fn format_tools(tools: &[ToolSpec], json: bool) -> Result<String, RunError> {
    if json {
        return Ok(serde_json::to_string_pretty(tools)?);
    }
    if tools.is_empty() {
        return Ok("No MCP tools available.".to_string());
    }
    let width = tools.iter().map(|t| t.name.len()).max().unwrap_or(0);
    let lines: Vec<String> = tools
        .iter()
        .map(|t| {
            let description = t
                .description
                .as_deref()
                .and_then(|d| d.lines().next())
                .unwrap_or("");
            format!("{:width$}  {}", t.name, description, width = width)
                .trim_end()
                .to_string()
        })
        .collect();
    Ok(lines.join("\n"))
}

/// Logging targets with their effective levels, plus the global settings.
pub fn format_loggers(settings: &LoggingSettings) -> String {
    let mut lines = vec![
        format!("global level: {}", if settings.debug_mode { "debug" } else { settings.level.as_str() }),
        format!("external suppression: {}", settings.suppression),
        format!(
            "log file: {}",
            settings
                .log_file
                .as_ref()
                .map(|p| p.display().to_string())
                .unwrap_or_else(|| "stderr".to_string())
        ),
        format!("structured: {}", settings.structured),
    ];
    if let Some(rust_log) = settings.rust_log.as_deref() {
        lines.push(format!("RUST_LOG overrides the levels below: {}", rust_log));
    }
    lines.push(String::new());
    let width = APP_TARGETS.iter().map(|t| t.len()).max().unwrap_or(0);
    lines.extend(APP_TARGETS.iter().map(|target| {
        format!(
            "{:width$}  {}",
            target,
            settings.effective_level(target),
            width = width
        )
    }));
    lines.join("\n")
}
