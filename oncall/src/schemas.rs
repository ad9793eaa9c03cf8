//! Structured outputs the workflow asks the model for.
//!
//! Each type deserializes leniently: missing fields take defaults and loosely
//! typed fields are normalized, so a partially correct reply still yields a
//! usable value.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::llm::JsonSchemaHint;
use crate::state::{AssessmentOutput, Priority};

/// One device found by the input validator.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct DeviceToInvestigate {
    pub device_name: String,
    /// Normalized by [`normalize_device_profile`]; the model may send text, an object or null.
    #[serde(default = "unknown_profile", deserialize_with = "device_profile_from_value")]
    pub device_profile: String,
    #[serde(default)]
    pub role: String,
    #[serde(default, deserialize_with = "priority_from_value")]
    pub priority: Priority,
    #[serde(default)]
    pub dependencies: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct InvestigationPlanningResponse {
    #[serde(default)]
    pub devices: Vec<DeviceToInvestigate>,
}

impl JsonSchemaHint for InvestigationPlanningResponse {
    const NAME: &'static str = "InvestigationPlanningResponse";

    fn schema_hint() -> &'static str {
        r#"{"devices": [{"device_name": "string", "device_profile": "string", "role": "string", "priority": "high | medium | low", "dependencies": ["device_name"]}]}"#
    }
}

/// Profile text for any JSON value: null, blank or `{}` is `"unknown"`, strings
/// are trimmed, objects become JSON with sorted keys and `", "` / `": "`
/// separators (`{"os": "ios-xr", "vendor": "cisco"}`), anything else its JSON text.
///
/// Idempotent on its own output.
pub fn normalize_device_profile(value: &Value) -> String {
    match value {
        Value::Null => "unknown".to_string(),
        Value::String(s) if s.trim().is_empty() => "unknown".to_string(),
        Value::String(s) => s.trim().to_string(),
        Value::Object(map) if map.is_empty() => "unknown".to_string(),
        Value::Object(_) => {
            let mut out = String::new();
            write_sorted_json(value, &mut out);
            out
        }
        other => other.to_string(),
    }
}

/// Spaced JSON with object keys sorted at every depth, independent of how
/// `serde_json::Map` orders its entries.
fn write_sorted_json(value: &Value, out: &mut String) {
    match value {
        Value::Object(map) => {
            let sorted: BTreeMap<&str, &Value> = map.iter().map(|(k, v)| (k.as_str(), v)).collect();
            out.push('{');
            for (i, (key, item)) in sorted.into_iter().enumerate() {
                if i > 0 {
                    out.push_str(", ");
                }
                out.push_str(&Value::from(key).to_string());
                out.push_str(": ");
                write_sorted_json(item, out);
            }
            out.push('}');
        }
        Value::Array(items) => {
            out.push('[');
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    out.push_str(", ");
                }
                write_sorted_json(item, out);
            }
            out.push(']');
        }
        scalar => out.push_str(&scalar.to_string()),
    }
}

fn unknown_profile() -> String {
    "unknown".to_string()
}

fn device_profile_from_value<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(normalize_device_profile(&value))
}

fn priority_from_value<'de, D>(deserializer: D) -> Result<Priority, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(match value.as_str().map(|s| s.trim().to_lowercase()).as_deref() {
        Some("high") => Priority::High,
        Some("low") => Priority::Low,
        _ => Priority::Medium,
    })
}

/// Plan for one device from the planner.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct DevicePlan {
    pub device_name: String,
    #[serde(default)]
    pub role: String,
    #[serde(default)]
    pub objective: String,
    #[serde(default, deserialize_with = "steps_from_value")]
    pub working_plan_steps: String,
}

/// Steps may arrive as markdown text or as a list of step strings.
fn steps_from_value<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(match value {
        Value::Null => String::new(),
        Value::String(s) => s,
        Value::Array(items) => items
            .iter()
            .enumerate()
            .map(|(i, item)| match item {
                Value::String(s) => format!("{}. {}", i + 1, s),
                other => format!("{}. {}", i + 1, other),
            })
            .collect::<Vec<_>>()
            .join("\n"),
        other => other.to_string(),
    })
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct PlanningResponse {
    #[serde(default)]
    pub plan: Vec<DevicePlan>,
}

impl JsonSchemaHint for PlanningResponse {
    const NAME: &'static str = "PlanningResponse";

    fn schema_hint() -> &'static str {
        r#"{"plan": [{"device_name": "string", "role": "string", "objective": "string", "working_plan_steps": "markdown string"}]}"#
    }
}

impl JsonSchemaHint for AssessmentOutput {
    const NAME: &'static str = "AssessmentOutput";

    fn schema_hint() -> &'static str {
        r#"{"is_objective_achieved": true, "notes_for_final_report": "string", "feedback_for_retry": "string or null"}"#
    }
}

/// Insights kept in session history for later queries.
///
/// Each field may arrive as markdown text or as a map of named entries, which
/// is rendered to markdown (`## Title`, then `### Entry Name` per key).
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(try_from = "RawLearningInsights")]
pub struct LearningInsights {
    pub learned_patterns: String,
    pub device_relationships: String,
}

#[derive(Deserialize)]
struct RawLearningInsights {
    #[serde(default)]
    learned_patterns: Value,
    #[serde(default)]
    device_relationships: Value,
}

impl TryFrom<RawLearningInsights> for LearningInsights {
    type Error = String;

    fn try_from(raw: RawLearningInsights) -> Result<Self, Self::Error> {
        Ok(Self {
            learned_patterns: insight_text(raw.learned_patterns, "learned_patterns", "Learned Patterns")?,
            device_relationships: insight_text(
                raw.device_relationships,
                "device_relationships",
                "Device Relationships",
            )?,
        })
    }
}

fn insight_text(value: Value, field: &str, title: &str) -> Result<String, String> {
    match value {
        Value::Null => Ok(String::new()),
        Value::String(s) => Ok(s),
        Value::Object(map) => Ok(format_map_as_markdown(&map, title)),
        other => Err(format!("{} must be a string or an object, got {}", field, other)),
    }
}

/// `snake_case_key` -> `Snake Case Key`.
fn clean_key(key: &str) -> String {
    key.split(|c: char| c == '_' || c.is_whitespace())
        .filter(|w| !w.is_empty())
        .map(|w| {
            let mut chars = w.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars.flat_map(|c| c.to_lowercase())).collect(),
                None => String::new(),
            }
        })
        .collect::<Vec<String>>()
        .join(" ")
}

fn format_map_as_markdown(map: &serde_json::Map<String, Value>, title: &str) -> String {
    if map.is_empty() {
        return String::new();
    }
    let mut lines = vec![format!("## {}", title), String::new()];
    for (key, value) in map {
        lines.push(format!("### {}", clean_key(key)));
        lines.push(match value {
            Value::String(s) => s.clone(),
            other => other.to_string(),
        });
        lines.push(String::new());
    }
    lines.join("\n").trim().to_string()
}

impl JsonSchemaHint for LearningInsights {
    const NAME: &'static str = "LearningInsights";

    fn schema_hint() -> &'static str {
        r#"{"learned_patterns": "markdown string", "device_relationships": "markdown string"}"#
    }
}
