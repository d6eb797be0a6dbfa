//! Orchestrator for the query pipeline and the agentic loop.
//!
//! Pipeline mode: parse → select tools → concurrent tool fan-out → format
//! context → answer. Agentic mode hands the tool catalog to the model and
//! lets it drive. Streaming runs the pipeline in a producer task that
//! writes [`StreamingChunk`]s into a channel.
//!
//! Every entry point returns an answer: provider and tool failures are
//! absorbed by the fallback paths and reported in the metadata.

use std::sync::Arc;
use std::time::Instant;

use futures_util::StreamExt;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_stream::wrappers::ReceiverStream;
use tracing::{debug, info, warn};

use super::agentic_loop::{MAX_ITERATIONS, agentic_loop};
use super::answer::{AnswerGenerator, FALLBACK_MODEL, fallback_answer};
use super::client::create_provider;
use super::config::ChatConfig;
use super::executor::ToolExecutor;
use super::format::{collect_sources, format_context};
use super::message::{ChatRequest, system_message, user_message};
use super::parser::QueryParser;
use super::prompt::{PromptSet, build_system_prompt};
use super::provider::LlmProvider;
use super::response::{ChatResponse, ResponseMetadata};
use super::schema::ParsedQuery;
use super::selector::select;
use super::stream::StreamingChunk;
use super::tool::ToolChoice;
use crate::error::AgentError;
use crate::tools::{ToolName, ToolRegistry, ToolResult};

/// Longest accepted question, in bytes.
const MAX_QUERY_LEN: usize = 10_000;
/// Buffered chunks between the stream producer and its consumer.
const STREAM_BUFFER: usize = 32;

/// Tool results plus everything derived from them.
struct Retrieval {
    parsed: ParsedQuery,
    parse_error: Option<String>,
    results: Vec<(ToolName, ToolResult)>,
    context: String,
}

impl Retrieval {
    fn tools_used(&self) -> Vec<String> {
        self.results
            .iter()
            .map(|(tool, _)| tool.as_str().to_string())
            .collect()
    }
}

fn elapsed_ms(start: Instant) -> u64 {
    u64::try_from(start.elapsed().as_millis()).unwrap_or(u64::MAX)
}

fn join_errors(errors: impl IntoIterator<Item = Option<String>>) -> Option<String> {
    let errors: Vec<String> = errors.into_iter().flatten().collect();
    (!errors.is_empty()).then(|| errors.join("; "))
}

fn validate(text: &str) -> Result<(), AgentError> {
    if text.trim().is_empty() {
        return Err(AgentError::Orchestration {
            message: "question cannot be empty".to_string(),
        });
    }
    if text.len() > MAX_QUERY_LEN {
        return Err(AgentError::Orchestration {
            message: format!(
                "question exceeds maximum length ({} bytes, max {MAX_QUERY_LEN})",
                text.len()
            ),
        });
    }
    Ok(())
}

/// Answers questions over one tool registry.
///
/// Cheap to clone; clones share the registry and provider.
#[derive(Clone)]
pub struct Orchestrator {
    registry: ToolRegistry,
    provider: Option<Arc<dyn LlmProvider>>,
    config: ChatConfig,
    prompts: PromptSet,
}

impl std::fmt::Debug for Orchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Orchestrator")
            .field("registry", &self.registry)
            .field("provider", &self.provider.as_ref().map(|p| p.name()))
            .field("model", &self.config.model)
            .finish_non_exhaustive()
    }
}

impl Orchestrator {
    /// Creates an orchestrator with an explicit provider (`None` selects
    /// fallback mode).
    ///
    /// Loads prompt templates from [`ChatConfig::prompt_dir`], falling back
    /// to compiled-in defaults.
    #[must_use]
    pub fn new(
        registry: ToolRegistry,
        provider: Option<Arc<dyn LlmProvider>>,
        config: ChatConfig,
    ) -> Self {
        let prompts = PromptSet::load(config.prompt_dir.as_deref());
        Self {
            registry,
            provider,
            config,
            prompts,
        }
    }

    /// Creates an orchestrator with the provider named in `config`.
    ///
    /// # Errors
    ///
    /// Returns [`AgentError::UnsupportedProvider`] or
    /// [`AgentError::InvalidConfig`] from provider construction.
    pub fn from_config(registry: ToolRegistry, config: ChatConfig) -> Result<Self, AgentError> {
        let provider = create_provider(&config)?;
        Ok(Self::new(registry, provider, config))
    }

    /// Replaces the prompt templates.
    #[must_use]
    pub fn with_prompts(mut self, prompts: PromptSet) -> Self {
        self.prompts = prompts;
        self
    }

    /// The tool registry.
    #[must_use]
    pub const fn registry(&self) -> &ToolRegistry {
        &self.registry
    }

    fn parser(&self) -> QueryParser {
        QueryParser::new(
            self.provider.clone(),
            self.config.query_parsing_model.clone(),
            self.prompts.parser.clone(),
        )
    }

    fn answerer(&self) -> AnswerGenerator {
        AnswerGenerator::new(
            self.provider.clone(),
            self.config.model.clone(),
            build_system_prompt(
                &self.prompts.answer,
                self.registry.today(),
                &self.config.language,
            ),
            self.config.temperature,
            self.config.max_tokens,
        )
    }

    /// Parses a question. Never fails; the second value is the reason the
    /// keyword fallback was taken, if it was.
    pub async fn parse(&self, text: &str) -> (ParsedQuery, Option<String>) {
        self.parser()
            .parse_with_reason(text, self.registry.today())
            .await
    }

    async fn execute_tools(&self, parsed: &ParsedQuery) -> Vec<(ToolName, ToolResult)> {
        let calls = select(parsed);
        info!(
            intent = %parsed.intent,
            tools = calls.len(),
            "executing pipeline tools"
        );
        let results = self.registry.execute_all(calls).await;
        let failed = results.iter().filter(|(_, r)| !r.is_success()).count();
        if failed > 0 {
            warn!(failed, "some tools failed");
        }
        results
    }

    async fn retrieve(&self, text: &str) -> Retrieval {
        let (parsed, parse_error) = self.parse(text).await;
        let results = self.execute_tools(&parsed).await;
        let context = format_context(&results);
        Retrieval {
            parsed,
            parse_error,
            results,
            context,
        }
    }

    fn rejected(error: &AgentError, start: Instant) -> ChatResponse {
        ChatResponse {
            message: format!("I can't answer that: {error}."),
            sources: Vec::new(),
            metadata: ResponseMetadata {
                model: FALLBACK_MODEL.to_string(),
                processing_time_ms: elapsed_ms(start),
                error: Some(error.to_string()),
                ..ResponseMetadata::default()
            },
        }
    }

    /// Answers `text` with the single-pass pipeline.
    pub async fn chat(&self, text: &str) -> ChatResponse {
        let start = Instant::now();
        if let Err(e) = validate(text) {
            return Self::rejected(&e, start);
        }

        let retrieval = self.retrieve(text).await;
        let answerer = self.answerer();
        let (message, answer_error) = answerer
            .generate(text, &retrieval.parsed, &retrieval.context)
            .await;
        let model = if answer_error.is_some() {
            FALLBACK_MODEL
        } else {
            answerer.model_label()
        };

        ChatResponse {
            message,
            sources: collect_sources(&retrieval.results),
            metadata: ResponseMetadata {
                model: model.to_string(),
                processing_time_ms: elapsed_ms(start),
                intent: Some(retrieval.parsed.intent),
                tools_used: retrieval.tools_used(),
                iterations: 0,
                error: join_errors([retrieval.parse_error, answer_error]),
            },
        }
    }

    /// Answers `text` by letting the model call tools.
    ///
    /// Without a provider, or with tool use disabled, this is [`chat`].
    /// A provider failure inside the loop degrades to [`chat`] as well,
    /// with the failure recorded in the metadata.
    ///
    /// [`chat`]: Self::chat
    pub async fn agentic_chat(&self, text: &str) -> ChatResponse {
        let start = Instant::now();
        let Some(provider) = self.provider.as_ref().filter(|_| self.config.enable_tool_use) else {
            debug!("agentic mode unavailable, using pipeline");
            return self.chat(text).await;
        };
        if let Err(e) = validate(text) {
            return Self::rejected(&e, start);
        }

        let system = build_system_prompt(
            &self.prompts.agent,
            self.registry.today(),
            &self.config.language,
        );
        let mut request = ChatRequest::new(
            self.config.model.clone(),
            vec![system_message(&system), user_message(text)],
        )
        .temperature(self.config.temperature)
        .max_tokens(self.config.max_tokens)
        .tools(self.registry.definitions(), ToolChoice::Auto);
        let executor = ToolExecutor::new(&self.registry);

        match agentic_loop(provider.as_ref(), &mut request, &executor, MAX_ITERATIONS).await {
            Ok(outcome) => {
                let results: Vec<(ToolName, ToolResult)> = outcome
                    .calls
                    .iter()
                    .filter_map(|c| c.tool.map(|t| (t, c.result.clone())))
                    .collect();
                let message = if outcome.content.trim().is_empty() {
                    fallback_answer(&format_context(&results))
                } else {
                    outcome.content
                };
                info!(
                    iterations = outcome.iterations,
                    forced = outcome.forced,
                    tool_calls = outcome.calls.len(),
                    "agentic chat complete"
                );
                ChatResponse {
                    message,
                    sources: collect_sources(&results),
                    metadata: ResponseMetadata {
                        model: self.config.model.clone(),
                        processing_time_ms: elapsed_ms(start),
                        intent: None,
                        tools_used: results.iter().map(|(t, _)| t.as_str().to_string()).collect(),
                        iterations: outcome.iterations,
                        error: None,
                    },
                }
            }
            Err(e) => {
                warn!(error = %e, "agentic loop failed, using pipeline");
                let mut response = self.chat(text).await;
                response.metadata.error =
                    join_errors([Some(e.to_string()), response.metadata.error.take()]);
                response.metadata.processing_time_ms = elapsed_ms(start);
                response
            }
        }
    }

    /// Streams the pipeline answer as [`StreamingChunk`]s.
    ///
    /// A producer task is spawned on the current Tokio runtime; dropping
    /// the returned stream cancels it at its next send.
    #[must_use]
    pub fn stream_chat_response(&self, text: impl Into<String>) -> ReceiverStream<StreamingChunk> {
        self.spawn_stream(text.into()).0
    }

    /// Spawns the producer. The handle resolves to `false` when the
    /// consumer hung up before the terminal chunk.
    fn spawn_stream(&self, text: String) -> (ReceiverStream<StreamingChunk>, JoinHandle<bool>) {
        let (tx, rx) = mpsc::channel(STREAM_BUFFER);
        let this = self.clone();
        let handle = tokio::spawn(async move {
            let finished = this.produce(&text, &tx).await;
            if !finished {
                debug!("stream consumer went away, producer stopped");
            }
            finished
        });
        (ReceiverStream::new(rx), handle)
    }

    /// Writes the whole stream into `tx`. Returns `false` if the consumer
    /// hung up.
    async fn produce(&self, text: &str, tx: &mpsc::Sender<StreamingChunk>) -> bool {
        let start = Instant::now();
        if !send(tx, StreamingChunk::status("Understanding your question")).await {
            return false;
        }

        if let Err(e) = validate(text) {
            let response = Self::rejected(&e, start);
            return send(tx, StreamingChunk::Sources { sources: Vec::new() }).await
                && send(tx, StreamingChunk::content(response.message)).await
                && send(tx, StreamingChunk::Done { metadata: response.metadata }).await;
        }

        let (parsed, parse_error) = self.parse(text).await;
        if !send(tx, StreamingChunk::status("Searching the data")).await {
            return false;
        }
        let results = self.execute_tools(&parsed).await;
        let context = format_context(&results);
        let sources = collect_sources(&results);
        if !send(tx, StreamingChunk::Sources { sources }).await {
            return false;
        }

        let answerer = self.answerer();
        let mut metadata = ResponseMetadata {
            model: answerer.model_label().to_string(),
            processing_time_ms: 0,
            intent: Some(parsed.intent),
            tools_used: results.iter().map(|(t, _)| t.as_str().to_string()).collect(),
            iterations: 0,
            error: None,
        };
        let mut answer_error = None;

        if !answerer.has_provider() {
            if !send(tx, StreamingChunk::content(fallback_answer(&context))).await {
                return false;
            }
        } else if !self.config.enable_streaming {
            let (message, error) = answerer.generate(text, &parsed, &context).await;
            if error.is_some() {
                FALLBACK_MODEL.clone_into(&mut metadata.model);
            }
            answer_error = error;
            if !send(tx, StreamingChunk::content(message)).await {
                return false;
            }
        } else {
            match answerer.stream(text, &parsed, &context).await {
                Err(e) => {
                    warn!(error = %e, "answer stream failed to open, using template");
                    FALLBACK_MODEL.clone_into(&mut metadata.model);
                    answer_error = Some(e.to_string());
                    if !send(tx, StreamingChunk::content(fallback_answer(&context))).await {
                        return false;
                    }
                }
                Ok(mut stream) => {
                    let mut sent_any = false;
                    while let Some(item) = stream.next().await {
                        match item {
                            Ok(delta) if delta.is_empty() => {}
                            Ok(delta) => {
                                if !send(tx, StreamingChunk::content(delta)).await {
                                    return false;
                                }
                                sent_any = true;
                            }
                            Err(e) if sent_any => {
                                warn!(error = %e, "answer stream broke mid-answer");
                                return send(
                                    tx,
                                    StreamingChunk::Error {
                                        content: e.to_string(),
                                    },
                                )
                                .await;
                            }
                            Err(e) => {
                                warn!(error = %e, "answer stream failed before content");
                                answer_error = Some(e.to_string());
                                break;
                            }
                        }
                    }
                    if !sent_any {
                        FALLBACK_MODEL.clone_into(&mut metadata.model);
                        if !send(tx, StreamingChunk::content(fallback_answer(&context))).await {
                            return false;
                        }
                    }
                }
            }
        }

        metadata.error = join_errors([parse_error, answer_error]);
        metadata.processing_time_ms = elapsed_ms(start);
        send(tx, StreamingChunk::Done { metadata }).await
    }
}

async fn send(tx: &mpsc::Sender<StreamingChunk>, chunk: StreamingChunk) -> bool {
    tx.send(chunk).await.is_ok()
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::core::{EntityType, Intent};
    use crate::test_support::{ContactsOutage, MockProvider, Step, TODAY, fixture_source};

    fn config() -> ChatConfig {
        ChatConfig::builder()
            .model("answer-model")
            .reference_date(TODAY)
            .build()
            .unwrap_or_else(|_| unreachable!())
    }

    fn orchestrator(provider: Option<MockProvider>) -> Orchestrator {
        with_config(provider, config())
    }

    fn with_config(provider: Option<MockProvider>, config: ChatConfig) -> Orchestrator {
        let registry = ToolRegistry::new(Arc::new(fixture_source()), TODAY);
        Orchestrator::new(
            registry,
            provider.map(|p| Arc::new(p) as Arc<dyn LlmProvider>),
            config,
        )
        .with_prompts(PromptSet::defaults())
    }

    async fn collect(stream: ReceiverStream<StreamingChunk>) -> Vec<StreamingChunk> {
        stream.collect().await
    }

    fn kinds(chunks: &[StreamingChunk]) -> Vec<&'static str> {
        chunks
            .iter()
            .map(|c| match c {
                StreamingChunk::Status { .. } => "status",
                StreamingChunk::Sources { .. } => "sources",
                StreamingChunk::Content { .. } => "content",
                StreamingChunk::Done { .. } => "done",
                StreamingChunk::Error { .. } => "error",
            })
            .collect()
    }

    fn assert_stream_shape(chunks: &[StreamingChunk]) {
        let kinds = kinds(chunks);
        assert_eq!(kinds.first(), Some(&"status"), "{kinds:?}");
        assert_eq!(kinds.iter().filter(|k| **k == "sources").count(), 1, "{kinds:?}");
        assert!(kinds.contains(&"content"), "{kinds:?}");
        let terminals = chunks.iter().filter(|c| c.is_terminal()).count();
        assert_eq!(terminals, 1, "{kinds:?}");
        assert!(chunks.last().is_some_and(StreamingChunk::is_terminal));
    }

    #[tokio::test]
    async fn test_chat_without_provider_is_deterministic() {
        let orchestrator = orchestrator(None);
        let first = orchestrator.chat("Which tasks are overdue?").await;
        let second = orchestrator.chat("Which tasks are overdue?").await;
        assert_eq!(first.message, second.message);
        assert_eq!(first.sources, second.sources);
        assert_eq!(first.metadata.model, FALLBACK_MODEL);
        assert_eq!(first.metadata.tools_used, vec!["search_tasks"]);
        assert!(first.metadata.error.is_none());
    }

    #[tokio::test]
    async fn test_chat_with_model() {
        let provider = MockProvider::new(vec![
            Step::tool_calls(&[(
                "parse_query",
                json!({"entityTypes": ["partnerships"], "filters": {"status": ["pending"]}, "intent": "count"}),
            )]),
            Step::text("There are 5 pending partnerships."),
        ]);
        let response = orchestrator(Some(provider))
            .chat("How many partnerships are pending?")
            .await;
        assert_eq!(response.message, "There are 5 pending partnerships.");
        assert_eq!(response.metadata.model, "answer-model");
        assert_eq!(response.metadata.intent, Some(Intent::Count));
        assert_eq!(
            response.metadata.tools_used,
            vec!["search_partnerships", "get_count"]
        );
        assert_eq!(response.sources.len(), 5);
        assert!(
            response
                .sources
                .iter()
                .all(|s| s.entity_type == EntityType::Partnerships)
        );
    }

    #[tokio::test]
    async fn test_provider_down_takes_both_fallbacks() {
        let response = orchestrator(Some(MockProvider::failing()))
            .chat("How many tasks are blocked?")
            .await;
        assert_eq!(response.metadata.model, FALLBACK_MODEL);
        assert_eq!(response.metadata.intent, Some(Intent::Count));
        assert!(response.metadata.error.is_some());
        assert!(response.message.contains("## search_tasks"));
    }

    #[tokio::test]
    async fn test_tool_failure_is_isolated() {
        let registry = ToolRegistry::new(Arc::new(ContactsOutage(fixture_source())), TODAY);
        let orchestrator = Orchestrator::new(registry, None, config());
        let response = orchestrator.chat("events and contacts at the ministry").await;
        assert!(response.message.contains("## search_contacts (Error)"));
        assert!(response.message.contains("## search_events ("));
    }

    #[tokio::test]
    async fn test_empty_question_rejected() {
        let response = orchestrator(None).chat("   ").await;
        assert!(response.metadata.error.is_some());
        assert!(response.sources.is_empty());
    }

    #[tokio::test]
    async fn test_agentic_chat() {
        let provider = MockProvider::new(vec![
            Step::tool_calls(&[("assess_event_risk", json!({"eventId": "evt-idex"}))]),
            Step::text("The defence exhibition is high risk."),
        ]);
        let response = orchestrator(Some(provider))
            .agentic_chat("Is the defence exhibition at risk?")
            .await;
        assert_eq!(response.message, "The defence exhibition is high risk.");
        assert_eq!(response.metadata.iterations, 1);
        assert_eq!(response.metadata.tools_used, vec!["assess_event_risk"]);
        assert_eq!(response.sources[0].id, "evt-idex");
        assert!(response.metadata.intent.is_none());
    }

    #[tokio::test]
    async fn test_agentic_chat_survives_huge_day_window() {
        let provider = MockProvider::new(vec![
            Step::tool_calls(&[("assess_event_risk", json!({"days": 4_000_000_000_u32}))]),
            Step::text("Nothing looks at risk."),
        ]);
        let response = orchestrator(Some(provider))
            .agentic_chat("Any events at risk in the next few millennia?")
            .await;
        assert_eq!(response.message, "Nothing looks at risk.");
        assert_eq!(response.metadata.tools_used, vec!["assess_event_risk"]);
        assert!(response.metadata.error.is_none());
    }

    #[tokio::test]
    async fn test_agentic_chat_caps_iterations() {
        let provider = MockProvider::new(vec![
            Step::tool_calls(&[("search_events", json!({}))]),
            Step::tool_calls(&[("search_tasks", json!({}))]),
            Step::tool_calls(&[("search_leads", json!({}))]),
            Step::text("Summary."),
        ]);
        let requests = provider.requests();
        let response = orchestrator(Some(provider)).agentic_chat("Tell me everything").await;
        assert_eq!(response.message, "Summary.");
        assert_eq!(response.metadata.iterations, MAX_ITERATIONS);
        assert_eq!(requests.lock().map(|r| r.len()).unwrap_or_default(), 4);
    }

    #[tokio::test]
    async fn test_agentic_failure_degrades_to_pipeline() {
        let response = orchestrator(Some(MockProvider::failing()))
            .agentic_chat("Which tasks are overdue?")
            .await;
        assert!(response.metadata.error.is_some());
        assert_eq!(response.metadata.intent, Some(Intent::Search));
        assert!(response.message.contains("## search_tasks"));
    }

    #[tokio::test]
    async fn test_agentic_disabled_uses_pipeline() {
        let config = ChatConfig::builder()
            .enable_tool_use(false)
            .reference_date(TODAY)
            .build()
            .unwrap_or_else(|_| unreachable!());
        let provider = MockProvider::new(vec![
            Step::tool_calls(&[("parse_query", json!({"entityTypes": ["leads"]}))]),
            Step::text("Four leads."),
        ]);
        let response = with_config(Some(provider), config)
            .agentic_chat("show leads")
            .await;
        assert_eq!(response.message, "Four leads.");
        assert_eq!(response.metadata.tools_used, vec!["search_leads"]);
    }

    #[tokio::test]
    async fn test_stream_without_provider() {
        let chunks = collect(orchestrator(None).stream_chat_response("upcoming events")).await;
        assert_stream_shape(&chunks);
        assert_eq!(
            kinds(&chunks),
            vec!["status", "status", "sources", "content", "done"]
        );
    }

    #[tokio::test]
    async fn test_stream_tokens() {
        let provider = MockProvider::new(vec![
            Step::tool_calls(&[("parse_query", json!({"entityTypes": ["events"]}))]),
            Step::text("Five events are scheduled."),
        ]);
        let chunks = collect(orchestrator(Some(provider)).stream_chat_response("events?")).await;
        assert_stream_shape(&chunks);
        let text: String = chunks
            .iter()
            .filter_map(|c| match c {
                StreamingChunk::Content { content } => Some(content.as_str()),
                _ => None,
            })
            .collect();
        assert_eq!(text, "Five events are scheduled.");
        assert!(kinds(&chunks).iter().filter(|k| **k == "content").count() > 1);
        match chunks.last() {
            Some(StreamingChunk::Done { metadata }) => {
                assert_eq!(metadata.model, "answer-model");
                assert_eq!(metadata.tools_used, vec!["search_events"]);
            }
            other => panic!("unexpected terminal chunk: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_stream_failure_before_content_uses_template() {
        let chunks = collect(
            orchestrator(Some(MockProvider::failing())).stream_chat_response("overdue tasks"),
        )
        .await;
        assert_stream_shape(&chunks);
        match chunks.last() {
            Some(StreamingChunk::Done { metadata }) => {
                assert_eq!(metadata.model, FALLBACK_MODEL);
                assert!(metadata.error.is_some());
            }
            other => panic!("unexpected terminal chunk: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_stream_failure_after_content_ends_with_error() {
        let provider = MockProvider::new(vec![
            Step::tool_calls(&[("parse_query", json!({"entityTypes": ["tasks"]}))]),
            Step::BrokenStream("Three tasks".to_string()),
        ]);
        let chunks = collect(orchestrator(Some(provider)).stream_chat_response("tasks")).await;
        assert_stream_shape(&chunks);
        assert!(matches!(chunks.last(), Some(StreamingChunk::Error { .. })));
    }

    #[tokio::test]
    async fn test_stream_disabled_sends_one_content_chunk() {
        let config = ChatConfig::builder()
            .enable_streaming(false)
            .reference_date(TODAY)
            .build()
            .unwrap_or_else(|_| unreachable!());
        let provider = MockProvider::new(vec![
            Step::tool_calls(&[("parse_query", json!({"entityTypes": ["leads"]}))]),
            Step::text("Four leads in the pipeline."),
        ]);
        let chunks = collect(with_config(Some(provider), config).stream_chat_response("leads")).await;
        assert_eq!(
            kinds(&chunks),
            vec!["status", "status", "sources", "content", "done"]
        );
    }

    #[tokio::test]
    async fn test_dropped_consumer_stops_producer() {
        // More deltas than the channel holds, so the producer must block.
        let answer = "word ".repeat(STREAM_BUFFER * 2);
        let provider = MockProvider::new(vec![
            Step::tool_calls(&[("parse_query", json!({"entityTypes": ["events"]}))]),
            Step::text(&answer),
        ]);
        let (mut stream, handle) =
            orchestrator(Some(provider)).spawn_stream("events".to_string());
        let first = stream.next().await;
        assert!(matches!(first, Some(StreamingChunk::Status { .. })));
        drop(stream);

        let finished = tokio::time::timeout(std::time::Duration::from_secs(5), handle)
            .await
            .unwrap_or_else(|_| panic!("producer still running after consumer left"))
            .unwrap_or_else(|e| panic!("producer task failed: {e}"));
        assert!(!finished);
    }

    #[tokio::test]
    async fn test_drained_stream_reports_finished_producer() {
        let (stream, handle) = orchestrator(None).spawn_stream("events".to_string());
        let chunks = collect(stream).await;
        assert!(chunks.last().is_some_and(StreamingChunk::is_terminal));
        assert!(matches!(handle.await, Ok(true)));
    }
}
