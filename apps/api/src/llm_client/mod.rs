/// LLM Client — the single point of entry for all model calls in the survey.
///
/// ARCHITECTURAL RULE: No other module may call the Anthropic API directly.
/// The orchestrator only sees the `LlmCollaborator` trait.
///
/// Model: claude-sonnet-4-5 (hardcoded — do not make configurable to prevent drift)
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;
use tracing::debug;

pub mod prompts;

const ANTHROPIC_API_URL: &str = "https://api.anthropic.com/v1/messages";
const ANTHROPIC_VERSION: &str = "2023-06-01";
/// The model used for all LLM calls.
/// This is intentionally hardcoded to prevent accidental drift.
pub const MODEL: &str = "claude-sonnet-4-5";
const MAX_TOKENS: u32 = 4096;
const REQUEST_TIMEOUT_SECS: u64 = 120;

#[derive(Debug, Error)]
pub enum LlmError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("JSON parse error: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("LLM returned empty content")]
    EmptyContent,

    #[error("LLM did not return structured output for '{0}'")]
    MissingStructuredOutput(String),
}

// ────────────────────────────────────────────────────────────────────────────
// Collaborator contract
// ────────────────────────────────────────────────────────────────────────────

/// JSON schema the reply must satisfy in structured mode.
#[derive(Debug, Clone, PartialEq)]
pub struct OutputSchema {
    pub name: String,
    pub description: String,
    pub schema: Value,
}

/// One generation request: free text or transcript content, a system
/// instruction, and an optional output schema (structured mode).
#[derive(Debug, Clone, PartialEq)]
pub struct LlmRequest {
    pub content: String,
    pub system: String,
    pub schema: Option<OutputSchema>,
}

impl LlmRequest {
    pub fn prose(content: impl Into<String>, system: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            system: system.into(),
            schema: None,
        }
    }

    pub fn structured(
        content: impl Into<String>,
        system: impl Into<String>,
        schema: OutputSchema,
    ) -> Self {
        Self {
            content: content.into(),
            system: system.into(),
            schema: Some(schema),
        }
    }
}

/// The external text generator. Prose mode returns the generated text;
/// structured mode returns JSON text that should match the requested schema
/// (callers still validate it).
///
/// Carried by the survey service as `Arc<dyn LlmCollaborator>`.
#[async_trait]
pub trait LlmCollaborator: Send + Sync {
    async fn generate(&self, request: &LlmRequest) -> Result<String, LlmError>;
}

// ────────────────────────────────────────────────────────────────────────────
// Anthropic wire types
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
struct AnthropicRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    #[serde(skip_serializing_if = "is_empty_str")]
    system: &'a str,
    messages: Vec<AnthropicMessage<'a>>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    tools: Vec<AnthropicTool<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tool_choice: Option<ToolChoice<'a>>,
}

fn is_empty_str(s: &&str) -> bool {
    s.is_empty()
}

#[derive(Debug, Serialize)]
struct AnthropicMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Serialize)]
struct AnthropicTool<'a> {
    name: &'a str,
    description: &'a str,
    input_schema: &'a Value,
}

#[derive(Debug, Serialize)]
struct ToolChoice<'a> {
    #[serde(rename = "type")]
    choice_type: &'a str,
    name: &'a str,
}

#[derive(Debug, Deserialize)]
pub struct LlmResponse {
    pub content: Vec<ContentBlock>,
    pub usage: Usage,
}

#[derive(Debug, Deserialize)]
pub struct ContentBlock {
    #[serde(rename = "type")]
    pub block_type: String,
    pub text: Option<String>,
    pub name: Option<String>,
    pub input: Option<Value>,
}

#[derive(Debug, Deserialize)]
pub struct Usage {
    pub input_tokens: u32,
    pub output_tokens: u32,
}

impl LlmResponse {
    /// Extracts the text content from the first text block.
    pub fn text(&self) -> Option<&str> {
        self.content
            .iter()
            .find(|b| b.block_type == "text")
            .and_then(|b| b.text.as_deref())
    }

    /// Extracts the input of the first `tool_use` block for the named tool.
    pub fn tool_input(&self, tool: &str) -> Option<&Value> {
        self.content
            .iter()
            .find(|b| b.block_type == "tool_use" && b.name.as_deref() == Some(tool))
            .and_then(|b| b.input.as_ref())
    }
}

#[derive(Debug, Deserialize)]
struct AnthropicError {
    error: AnthropicErrorBody,
}

#[derive(Debug, Deserialize)]
struct AnthropicErrorBody {
    message: String,
}

// ────────────────────────────────────────────────────────────────────────────
// Client
// ────────────────────────────────────────────────────────────────────────────

/// Wraps the Anthropic Messages API. Structured mode forces a single tool
/// call whose `input_schema` is the requested output schema.
///
/// No retries: every failure goes back to the caller, and the user decides
/// whether to try again.
#[derive(Clone)]
pub struct LlmClient {
    client: Client,
    api_key: String,
}

impl LlmClient {
    pub fn new(api_key: String) -> Result<Self, LlmError> {
        Ok(Self {
            client: Client::builder()
                .timeout(std::time::Duration::from_secs(REQUEST_TIMEOUT_SECS))
                .build()?,
            api_key,
        })
    }

    /// Makes a raw call to the Claude API, returning the full response object.
    pub async fn call(&self, request: &LlmRequest) -> Result<LlmResponse, LlmError> {
        let (tools, tool_choice) = match &request.schema {
            Some(schema) => (
                vec![AnthropicTool {
                    name: &schema.name,
                    description: &schema.description,
                    input_schema: &schema.schema,
                }],
                Some(ToolChoice {
                    choice_type: "tool",
                    name: &schema.name,
                }),
            ),
            None => (Vec::new(), None),
        };

        let request_body = AnthropicRequest {
            model: MODEL,
            max_tokens: MAX_TOKENS,
            system: &request.system,
            messages: vec![AnthropicMessage {
                role: "user",
                content: &request.content,
            }],
            tools,
            tool_choice,
        };

        let response = self
            .client
            .post(ANTHROPIC_API_URL)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .header("content-type", "application/json")
            .json(&request_body)
            .send()
            .await?;

        let status = response.status();

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            // Try to parse error message
            let message = serde_json::from_str::<AnthropicError>(&body)
                .map(|e| e.error.message)
                .unwrap_or(body);
            return Err(LlmError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let llm_response: LlmResponse = response.json().await?;

        debug!(
            "LLM call succeeded: input_tokens={}, output_tokens={}",
            llm_response.usage.input_tokens, llm_response.usage.output_tokens
        );

        Ok(llm_response)
    }
}

#[async_trait]
impl LlmCollaborator for LlmClient {
    async fn generate(&self, request: &LlmRequest) -> Result<String, LlmError> {
        let response = self.call(request).await?;

        match &request.schema {
            Some(schema) => {
                // Fall back to a JSON text block if the model answered in prose
                if let Some(input) = response.tool_input(&schema.name) {
                    return Ok(serde_json::to_string(input)?);
                }
                response
                    .text()
                    .map(|t| strip_json_fences(t).to_string())
                    .ok_or_else(|| LlmError::MissingStructuredOutput(schema.name.clone()))
            }
            None => match response.text() {
                Some(text) if !text.trim().is_empty() => Ok(text.to_string()),
                _ => Err(LlmError::EmptyContent),
            },
        }
    }
}

/// Strips ```json ... ``` or ``` ... ``` code fences from LLM output.
pub fn strip_json_fences(text: &str) -> &str {
    let text = text.trim();
    if let Some(stripped) = text.strip_prefix("```json") {
        stripped
            .trim_start()
            .strip_suffix("```")
            .map(|s| s.trim())
            .unwrap_or(stripped.trim_start())
    } else if let Some(stripped) = text.strip_prefix("```") {
        stripped
            .trim_start()
            .strip_suffix("```")
            .map(|s| s.trim())
            .unwrap_or(stripped.trim_start())
    } else {
        text
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_strip_json_fences_with_json_tag() {
        let input = "```json\n{\"key\": \"value\"}\n```";
        assert_eq!(strip_json_fences(input), "{\"key\": \"value\"}");
    }

    #[test]
    fn test_strip_json_fences_without_tag() {
        let input = "```\n{\"key\": \"value\"}\n```";
        assert_eq!(strip_json_fences(input), "{\"key\": \"value\"}");
    }

    #[test]
    fn test_strip_json_fences_no_fences() {
        let input = "{\"key\": \"value\"}";
        assert_eq!(strip_json_fences(input), "{\"key\": \"value\"}");
    }

    #[test]
    fn test_structured_request_forces_tool_choice() {
        let schema = json!({"type": "object"});
        let body = AnthropicRequest {
            model: MODEL,
            max_tokens: MAX_TOKENS,
            system: "Respond in French.",
            messages: vec![AnthropicMessage {
                role: "user",
                content: "hello",
            }],
            tools: vec![AnthropicTool {
                name: "submit_report",
                description: "d",
                input_schema: &schema,
            }],
            tool_choice: Some(ToolChoice {
                choice_type: "tool",
                name: "submit_report",
            }),
        };
        let value = serde_json::to_value(&body).unwrap();
        assert_eq!(value["tool_choice"]["type"], "tool");
        assert_eq!(value["tool_choice"]["name"], "submit_report");
        assert_eq!(value["tools"][0]["input_schema"]["type"], "object");
        assert_eq!(value["system"], "Respond in French.");
    }

    #[test]
    fn test_prose_request_omits_tools() {
        let body = AnthropicRequest {
            model: MODEL,
            max_tokens: MAX_TOKENS,
            system: "",
            messages: vec![],
            tools: vec![],
            tool_choice: None,
        };
        let value = serde_json::to_value(&body).unwrap();
        assert!(value.get("tools").is_none());
        assert!(value.get("tool_choice").is_none());
        assert!(value.get("system").is_none());
    }

    #[test]
    fn test_tool_input_extraction() {
        let response: LlmResponse = serde_json::from_value(json!({
            "content": [
                {"type": "text", "text": "Here you go"},
                {"type": "tool_use", "id": "t1", "name": "submit_report", "input": {"title": "T"}}
            ],
            "usage": {"input_tokens": 10, "output_tokens": 20}
        }))
        .unwrap();
        assert_eq!(response.text(), Some("Here you go"));
        assert_eq!(response.tool_input("submit_report"), Some(&json!({"title": "T"})));
        assert!(response.tool_input("other").is_none());
    }
}
