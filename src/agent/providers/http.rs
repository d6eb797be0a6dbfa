//! Raw OpenAI-compatible provider over `reqwest`.
//!
//! Speaks the chat-completions wire protocol directly, for endpoints the
//! SDK does not cover. Transport failures, 429 and 5xx responses are
//! retried immediately up to `max_retries` times.
//!
//! The configured timeout bounds connecting and each whole non-streaming
//! request. Streams have no total deadline; instead the gap between two
//! body chunks may not exceed it.

use std::collections::VecDeque;
use std::pin::Pin;
use std::time::Duration;

use async_trait::async_trait;
use futures_util::{Stream, StreamExt, stream};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tracing::{debug, warn};

use crate::agent::config::ChatConfig;
use crate::agent::message::{ChatMessage, ChatRequest, ModelResponse, Role, TokenUsage};
use crate::agent::provider::{LlmProvider, TextStream};
use crate::agent::sse::{SseDecoder, SseFrame};
use crate::agent::tool::{ToolCall, ToolChoice};
use crate::error::AgentError;

#[derive(Debug, Serialize, Deserialize)]
struct WireFunction {
    name: String,
    #[serde(default)]
    arguments: String,
}

#[derive(Debug, Serialize, Deserialize)]
struct WireToolCall {
    id: String,
    #[serde(rename = "type", default = "function_type")]
    kind: String,
    function: WireFunction,
}

fn function_type() -> String {
    "function".to_string()
}

#[derive(Debug, Serialize)]
struct WireMessage<'a> {
    role: Role,
    #[serde(skip_serializing_if = "Option::is_none")]
    content: Option<&'a str>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    tool_calls: Vec<WireToolCall>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tool_call_id: Option<&'a str>,
}

#[derive(Debug, Serialize)]
struct WireRequest<'a> {
    model: &'a str,
    messages: Vec<WireMessage<'a>>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    tools: Vec<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tool_choice: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_format: Option<Value>,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    stream: bool,
}

#[derive(Debug, Deserialize)]
struct WireReply {
    #[serde(default)]
    content: Option<String>,
    #[serde(default)]
    tool_calls: Option<Vec<WireToolCall>>,
}

#[derive(Debug, Deserialize)]
struct WireChoice {
    message: WireReply,
    #[serde(default)]
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct WireResponse {
    #[serde(default)]
    choices: Vec<WireChoice>,
    #[serde(default)]
    usage: Option<TokenUsage>,
}

#[derive(Debug, Deserialize)]
struct WireDelta {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct WireStreamChoice {
    delta: WireDelta,
}

#[derive(Debug, Deserialize)]
struct WireStreamChunk {
    #[serde(default)]
    choices: Vec<WireStreamChoice>,
}

fn wire_message(msg: &ChatMessage) -> WireMessage<'_> {
    let content = match msg.role {
        Role::Assistant if msg.content.is_empty() => None,
        _ => Some(msg.content.as_str()),
    };
    WireMessage {
        role: msg.role,
        content,
        tool_calls: msg
            .tool_calls
            .iter()
            .map(|tc| WireToolCall {
                id: tc.id.clone(),
                kind: function_type(),
                function: WireFunction {
                    name: tc.name.clone(),
                    arguments: tc.arguments.clone(),
                },
            })
            .collect(),
        tool_call_id: msg.tool_call_id.as_deref(),
    }
}

fn wire_tool_choice(choice: &ToolChoice) -> Value {
    match choice {
        ToolChoice::Auto => json!("auto"),
        ToolChoice::None => json!("none"),
        ToolChoice::Function(name) => json!({"type": "function", "function": {"name": name}}),
    }
}

fn build_body(request: &ChatRequest, stream: bool) -> WireRequest<'_> {
    let tools: Vec<Value> = request
        .tools
        .iter()
        .map(|td| {
            json!({
                "type": "function",
                "function": {
                    "name": td.name,
                    "description": td.description,
                    "parameters": td.parameters,
                }
            })
        })
        .collect();
    let tool_choice = (!tools.is_empty()).then(|| wire_tool_choice(&request.tool_choice));

    WireRequest {
        model: &request.model,
        messages: request.messages.iter().map(wire_message).collect(),
        tools,
        tool_choice,
        temperature: request.temperature,
        max_tokens: request.max_tokens,
        response_format: request
            .json_mode
            .then(|| json!({"type": "json_object"})),
        stream,
    }
}

fn parse_response(body: &str) -> Result<ModelResponse, AgentError> {
    let response: WireResponse =
        serde_json::from_str(body).map_err(|e| AgentError::ResponseParse {
            message: e.to_string(),
            content: body.chars().take(500).collect(),
        })?;
    let choice = response
        .choices
        .into_iter()
        .next()
        .ok_or_else(|| AgentError::ResponseParse {
            message: "response has no choices".to_string(),
            content: body.chars().take(500).collect(),
        })?;

    Ok(ModelResponse {
        content: choice.message.content.unwrap_or_default(),
        usage: response.usage.unwrap_or_default(),
        tool_calls: choice
            .message
            .tool_calls
            .unwrap_or_default()
            .into_iter()
            .map(|tc| ToolCall {
                id: tc.id,
                name: tc.function.name,
                arguments: tc.function.arguments,
            })
            .collect(),
        finish_reason: choice.finish_reason,
    })
}

fn delta_text(data: &str) -> Result<Option<String>, AgentError> {
    let chunk: WireStreamChunk = serde_json::from_str(data).map_err(|e| AgentError::Stream {
        message: format!("malformed stream frame: {e}"),
    })?;
    Ok(chunk
        .choices
        .into_iter()
        .next()
        .and_then(|c| c.delta.content)
        .filter(|s| !s.is_empty()))
}

type ByteStream = Pin<Box<dyn Stream<Item = Result<Vec<u8>, String>> + Send>>;

struct DecodeState {
    bytes: ByteStream,
    idle: Duration,
    decoder: SseDecoder,
    queue: VecDeque<Result<String, AgentError>>,
    finished: bool,
}

impl DecodeState {
    fn enqueue(&mut self, frames: Vec<SseFrame>) {
        for frame in frames {
            if self.finished {
                return;
            }
            match frame {
                SseFrame::Done => self.finished = true,
                SseFrame::Data(data) => match delta_text(&data) {
                    Ok(Some(text)) => self.queue.push_back(Ok(text)),
                    Ok(None) => {}
                    Err(e) => {
                        self.queue.push_back(Err(e));
                        self.finished = true;
                    }
                },
            }
        }
    }
}

/// Turns a raw SSE byte stream into content deltas. A wait longer than
/// `idle` for the next chunk ends the stream with an error.
fn decode_stream(bytes: ByteStream, idle: Duration) -> TextStream {
    let state = DecodeState {
        bytes,
        idle,
        decoder: SseDecoder::new(),
        queue: VecDeque::new(),
        finished: false,
    };
    Box::pin(stream::unfold(state, |mut st| async move {
        loop {
            if let Some(item) = st.queue.pop_front() {
                return Some((item, st));
            }
            if st.finished {
                return None;
            }
            let Ok(next) = tokio::time::timeout(st.idle, st.bytes.next()).await else {
                st.queue.push_back(Err(AgentError::Stream {
                    message: format!("no data received for {}s", st.idle.as_secs_f32()),
                }));
                st.finished = true;
                continue;
            };
            match next {
                Some(Ok(chunk)) => {
                    let frames = st.decoder.push(&chunk);
                    st.enqueue(frames);
                }
                Some(Err(message)) => {
                    st.queue.push_back(Err(AgentError::Stream { message }));
                    st.finished = true;
                }
                None => {
                    let tail: Vec<SseFrame> = st.decoder.finish().into_iter().collect();
                    st.enqueue(tail);
                    st.finished = true;
                }
            }
        }
    }))
}

/// Provider for any OpenAI-compatible endpoint, via plain HTTP.
#[derive(Debug, Clone)]
pub struct HttpProvider {
    client: reqwest::Client,
    endpoint: String,
    api_key: Option<String>,
    max_retries: u32,
    timeout: Duration,
}

impl HttpProvider {
    /// Creates a provider posting to `{base_url}/chat/completions`.
    ///
    /// # Errors
    ///
    /// Returns [`AgentError::InvalidConfig`] without a base URL or if the
    /// HTTP client cannot be built.
    pub fn new(config: &ChatConfig) -> Result<Self, AgentError> {
        let base_url = config
            .base_url
            .as_deref()
            .filter(|u| !u.trim().is_empty())
            .ok_or_else(|| AgentError::InvalidConfig {
                message: "the http provider requires a base URL".to_string(),
            })?;
        let client = reqwest::Client::builder()
            .connect_timeout(config.timeout)
            .build()
            .map_err(|e| AgentError::InvalidConfig {
                message: format!("http client: {e}"),
            })?;

        Ok(Self {
            client,
            endpoint: format!("{}/chat/completions", base_url.trim_end_matches('/')),
            api_key: config.api_key.clone(),
            max_retries: config.max_retries,
            timeout: config.timeout,
        })
    }

    /// Target URL.
    #[must_use]
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    fn is_retryable(status: reqwest::StatusCode) -> bool {
        status.as_u16() == 429 || status.is_server_error()
    }

    async fn send(&self, body: &WireRequest<'_>) -> Result<reqwest::Response, AgentError> {
        let mut attempt = 0;
        loop {
            let mut builder = self.client.post(&self.endpoint).json(body);
            if !body.stream {
                builder = builder.timeout(self.timeout);
            }
            if let Some(key) = &self.api_key {
                builder = builder.bearer_auth(key);
            }

            let error = match builder.send().await {
                Ok(response) if response.status().is_success() => return Ok(response),
                Ok(response) => {
                    let status = response.status();
                    let text = response.text().await.unwrap_or_default();
                    let error = AgentError::ApiRequest {
                        message: format!("{status}: {}", text.chars().take(300).collect::<String>()),
                        status: Some(status.as_u16()),
                    };
                    if !Self::is_retryable(status) {
                        return Err(error);
                    }
                    error
                }
                Err(e) => AgentError::ApiRequest {
                    message: e.to_string(),
                    status: e.status().map(|s| s.as_u16()),
                },
            };

            if attempt >= self.max_retries {
                return Err(error);
            }
            attempt += 1;
            warn!(attempt, max_retries = self.max_retries, error = %error, "retrying request");
        }
    }
}

#[async_trait]
impl LlmProvider for HttpProvider {
    fn name(&self) -> &'static str {
        "http"
    }

    async fn chat(&self, request: &ChatRequest) -> Result<ModelResponse, AgentError> {
        let response = self.send(&build_body(request, false)).await?;
        let body = response.text().await.map_err(|e| AgentError::ApiRequest {
            message: e.to_string(),
            status: None,
        })?;
        let parsed = parse_response(&body)?;
        debug!(
            model = %request.model,
            total_tokens = parsed.usage.total_tokens,
            tool_calls = parsed.tool_calls.len(),
            "completion received"
        );
        Ok(parsed)
    }

    async fn chat_stream(&self, request: &ChatRequest) -> Result<TextStream, AgentError> {
        let response = self.send(&build_body(request, true)).await?;
        let bytes = response
            .bytes_stream()
            .map(|chunk| chunk.map(|b| b.to_vec()).map_err(|e| e.to_string()));
        Ok(decode_stream(Box::pin(bytes), self.timeout))
    }
}
