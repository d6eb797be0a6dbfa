//! Shared fixtures for unit tests: the fixture dataset, a pinned "today",
//! and a scripted LLM provider.

#![allow(clippy::panic)]

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::NaiveDate;
use futures_util::stream;
use serde_json::Value;

use crate::agent::message::{ChatRequest, ModelResponse};
use crate::agent::provider::{LlmProvider, TextStream};
use crate::agent::tool::ToolCall;
use crate::core::{Contact, Event, Lead, Partnership, Task};
use crate::data::{DataSource, MemoryDataSource, Page, Snapshot};
use crate::error::{AgentError, DataError};

/// Reference date of the fixture dataset (a Wednesday).
pub const TODAY: NaiveDate = match NaiveDate::from_ymd_opt(2025, 1, 1) {
    Some(d) => d,
    None => NaiveDate::MIN,
};

const DATASET: &str = include_str!("../tests/fixtures/dataset.json");

pub fn fixture_snapshot() -> Snapshot {
    serde_json::from_str(DATASET).unwrap_or_else(|e| panic!("fixture dataset: {e}"))
}

pub fn fixture_source() -> MemoryDataSource {
    MemoryDataSource::from_snapshot(fixture_snapshot())
}

/// Fixture data whose contact listing is down.
#[derive(Debug)]
pub struct ContactsOutage(pub MemoryDataSource);

#[async_trait]
impl DataSource for ContactsOutage {
    async fn list_events(&self) -> Result<Vec<Event>, DataError> {
        self.0.list_events().await
    }

    async fn list_archived_events(&self) -> Result<Vec<Event>, DataError> {
        self.0.list_archived_events().await
    }

    async fn list_tasks(&self) -> Result<Vec<Task>, DataError> {
        self.0.list_tasks().await
    }

    async fn list_contacts(&self, _page: Page) -> Result<Vec<Contact>, DataError> {
        Err(DataError::Unavailable {
            message: "contacts service timed out".to_string(),
        })
    }

    async fn list_partnerships(&self, page: Page) -> Result<Vec<Partnership>, DataError> {
        self.0.list_partnerships(page).await
    }

    async fn list_leads(&self) -> Result<Vec<Lead>, DataError> {
        self.0.list_leads().await
    }
}

/// One scripted provider turn.
#[derive(Debug, Clone)]
pub enum Step {
    /// A completion (text and/or tool calls). Streams split the text by word.
    Reply(ModelResponse),
    /// The request fails before any output.
    Fail(String),
    /// Streams `text` then breaks with an error. `chat` fails outright.
    BrokenStream(String),
}

impl Step {
    pub fn text(content: &str) -> Self {
        Self::Reply(ModelResponse {
            content: content.to_string(),
            finish_reason: Some("stop".to_string()),
            ..ModelResponse::default()
        })
    }

    pub fn tool_calls(calls: &[(&str, Value)]) -> Self {
        Self::Reply(ModelResponse {
            tool_calls: calls
                .iter()
                .enumerate()
                .map(|(i, (name, args))| ToolCall {
                    id: format!("call_{i}"),
                    name: (*name).to_string(),
                    arguments: args.to_string(),
                })
                .collect(),
            finish_reason: Some("tool_calls".to_string()),
            ..ModelResponse::default()
        })
    }

    pub fn fail() -> Self {
        Self::Fail("connection refused".to_string())
    }
}

/// Scripted provider. Steps are consumed in order; the last one repeats.
#[derive(Debug)]
pub struct MockProvider {
    steps: Mutex<VecDeque<Step>>,
    requests: Arc<Mutex<Vec<ChatRequest>>>,
}

impl MockProvider {
    pub fn new(steps: Vec<Step>) -> Self {
        Self {
            steps: Mutex::new(steps.into()),
            requests: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn tool_call(name: &str, args: Value) -> Self {
        Self::new(vec![Step::tool_calls(&[(name, args)])])
    }

    pub fn text(content: &str) -> Self {
        Self::new(vec![Step::text(content)])
    }

    pub fn failing() -> Self {
        Self::new(vec![Step::fail()])
    }

    /// Every request received so far.
    pub fn requests(&self) -> Arc<Mutex<Vec<ChatRequest>>> {
        Arc::clone(&self.requests)
    }

    fn next(&self, request: &ChatRequest) -> Step {
        self.requests
            .lock()
            .unwrap_or_else(|e| panic!("poisoned: {e}"))
            .push(request.clone());
        let mut steps = self.steps.lock().unwrap_or_else(|e| panic!("poisoned: {e}"));
        if steps.len() > 1 {
            steps.pop_front().unwrap_or_else(Step::fail)
        } else {
            steps.front().cloned().unwrap_or_else(Step::fail)
        }
    }
}

fn words(text: &str) -> Vec<Result<String, AgentError>> {
    text.split_inclusive(' ').map(|w| Ok(w.to_string())).collect()
}

#[async_trait]
impl LlmProvider for MockProvider {
    fn name(&self) -> &'static str {
        "mock"
    }

    async fn chat(&self, request: &ChatRequest) -> Result<ModelResponse, AgentError> {
        match self.next(request) {
            Step::Reply(response) => Ok(response),
            Step::Fail(message) | Step::BrokenStream(message) => Err(AgentError::ApiRequest {
                message,
                status: None,
            }),
        }
    }

    async fn chat_stream(&self, request: &ChatRequest) -> Result<TextStream, AgentError> {
        match self.next(request) {
            Step::Reply(response) => Ok(Box::pin(stream::iter(words(&response.content)))),
            Step::Fail(message) => Err(AgentError::ApiRequest {
                message,
                status: None,
            }),
            Step::BrokenStream(text) => {
                let mut items = words(&text);
                items.push(Err(AgentError::Stream {
                    message: "connection reset".to_string(),
                }));
                Ok(Box::pin(stream::iter(items)))
            }
        }
    }
}
