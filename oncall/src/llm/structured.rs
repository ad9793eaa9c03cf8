//! Structured output over plain chat completions.
//!
//! The model is asked to answer with one JSON object shaped by the target type's
//! [`JsonSchemaHint`]; the first object in the reply is then deserialized. Works
//! the same for OpenAI and Ollama models since nothing provider-specific is used.

use serde::de::DeserializeOwned;
use tracing::{debug, warn};

use crate::error::AgentError;
use crate::llm::LlmClient;
use crate::message::Message;

/// Describes the JSON shape a structured output type expects.
pub trait JsonSchemaHint {
    /// Short type name used in logs and error messages.
    const NAME: &'static str;

    /// JSON example or schema sketch shown to the model.
    fn schema_hint() -> &'static str;
}

/// Invokes `llm` and deserializes the reply into `T`.
///
/// An instruction with `T`'s schema hint is appended as the last user message.
/// Errors when the call fails, the reply holds no JSON object, or serde rejects it.
pub async fn invoke_structured<T>(llm: &dyn LlmClient, messages: &[Message]) -> Result<T, AgentError>
where
    T: DeserializeOwned + JsonSchemaHint,
{
    let mut request = messages.to_vec();
    request.push(Message::user(format!(
        "Respond with a single JSON object only, no prose and no code fences. \
         It must match this shape:\n{}",
        T::schema_hint()
    )));

    let response = llm.invoke(&request).await?;
    let json = extract_json_object(&response.content).ok_or_else(|| {
        warn!(output = T::NAME, "structured reply contained no JSON object");
        AgentError::ExecutionFailed(format!(
            "{}: no JSON object in model reply",
            T::NAME
        ))
    })?;
    debug!(output = T::NAME, len = json.len(), "structured reply extracted");

    serde_json::from_str(json).map_err(|e| {
        AgentError::ExecutionFailed(format!("{}: invalid JSON in model reply: {}", T::NAME, e))
    })
}

/// Returns the first balanced `{...}` in `text`, skipping braces inside strings.
///
/// Tolerates code fences and prose around the object.
pub fn extract_json_object(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;
    for (offset, ch) in text[start..].char_indices() {
        if in_string {
            match ch {
                _ if escaped => escaped = false,
                '\\' => escaped = true,
                '"' => in_string = false,
                _ => {}
            }
            continue;
        }
        match ch {
            '"' => in_string = true,
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(&text[start..start + offset + 1]);
                }
            }
            _ => {}
        }
    }
    None
}
