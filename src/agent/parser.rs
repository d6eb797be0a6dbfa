//! Natural-language query parser.
//!
//! The model is forced to call `parse_query`; its arguments are validated
//! and normalized into a [`ParsedQuery`]. Any provider failure or unusable
//! output switches to a deterministic keyword scan, so [`QueryParser::parse`]
//! never fails.

use std::sync::Arc;

use chrono::NaiveDate;
use tracing::{debug, warn};

use super::config::PARSING_TEMPERATURE;
use super::message::{ChatRequest, ModelResponse, system_message, user_message};
use super::prompt::build_parser_prompt;
use super::provider::LlmProvider;
use super::schema::{PARSE_FUNCTION, ParsedQuery, QueryArguments, parse_function};
use super::tool::ToolChoice;
use crate::core::{EntityType, Intent};
use crate::error::AgentError;

/// Token budget for the parsing call.
const PARSE_MAX_TOKENS: u32 = 500;

/// Phrases that point at the archive rather than active events.
const ARCHIVE_WORDS: &[&str] = &[
    "archived event",
    "archived",
    "archive",
    "past event",
    "previous event",
];

/// Active event vocabulary.
const EVENT_WORDS: &[&str] = &[
    "event",
    "exhibition",
    "conference",
    "expo",
    "trade show",
    "summit",
    "forum",
];

/// Keyword table for the fallback entity scan. Partnerships and leads
/// match on their own names only.
const ENTITY_KEYWORDS: &[(EntityType, &[&str])] = &[
    (EntityType::ArchivedEvents, ARCHIVE_WORDS),
    (EntityType::Events, EVENT_WORDS),
    (
        EntityType::Tasks,
        &["task", "to-do", "todo", "deadline", "assignment", "overdue"],
    ),
    (
        EntityType::Contacts,
        &["contact", "people", "person", "email", "phone"],
    ),
    (EntityType::Partnerships, &["partnership"]),
    (EntityType::Leads, &["lead"]),
];

/// Keyword table for the fallback intent scan, checked in order.
const INTENT_KEYWORDS: &[(Intent, &[&str])] = &[
    (Intent::Count, &["how many", "count", "number of", "total"]),
    (
        Intent::Summarize,
        &["summary", "summarize", "summarise", "overview", "dashboard"],
    ),
    (Intent::Compare, &["compare", "versus", " vs ", "difference between"]),
    (
        Intent::Analyze,
        &["analyze", "analyse", "analysis", "risk", "workload", "trend"],
    ),
    (
        Intent::Detail,
        &["detail", "tell me about", "information about", "more about"],
    ),
    (Intent::List, &["list", "show all", "show me all", "all the"]),
];

/// Deterministic keyword parse.
///
/// Scans for entity and intent keywords; never sets a date range and keeps
/// the whole question as search text.
#[must_use]
pub fn fallback_parse(text: &str) -> ParsedQuery {
    let lowered = format!(" {} ", text.to_lowercase());
    let mut entity_types: Vec<EntityType> = ENTITY_KEYWORDS
        .iter()
        .filter(|(_, words)| words.iter().any(|w| lowered.contains(w)))
        .map(|(t, _)| *t)
        .collect();
    // "past events" should not also search active events.
    if entity_types.contains(&EntityType::ArchivedEvents) {
        let rest = ARCHIVE_WORDS
            .iter()
            .fold(lowered.clone(), |acc, w| acc.replace(w, ""));
        if !EVENT_WORDS.iter().any(|w| rest.contains(w)) {
            entity_types.retain(|t| *t != EntityType::Events);
        }
    }
    entity_types.sort();

    let intent = INTENT_KEYWORDS
        .iter()
        .find(|(_, words)| words.iter().any(|w| lowered.contains(w)))
        .map_or(Intent::Search, |(i, _)| *i);

    ParsedQuery::new(text.trim(), entity_types, intent)
}

/// Strips a surrounding markdown code fence, if any.
fn strip_fence(content: &str) -> &str {
    let trimmed = content.trim();
    let Some(inner) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let inner = inner.strip_prefix("json").unwrap_or(inner);
    inner.strip_suffix("```").unwrap_or(inner).trim()
}

/// Extracts `parse_query` arguments from a model response: the forced tool
/// call when present, otherwise JSON in the text content.
fn extract_arguments(response: &ModelResponse) -> Result<QueryArguments, AgentError> {
    let raw = response
        .tool_calls
        .iter()
        .find(|c| c.name == PARSE_FUNCTION)
        .map_or_else(|| strip_fence(&response.content), |c| c.arguments.as_str());

    if raw.trim().is_empty() {
        return Err(AgentError::ResponseParse {
            message: "model returned no parse_query call".to_string(),
            content: response.content.clone(),
        });
    }
    serde_json::from_str(raw).map_err(|e| AgentError::ResponseParse {
        message: e.to_string(),
        content: raw.to_string(),
    })
}

/// LLM-backed query parser with keyword fallback.
#[derive(Clone)]
pub struct QueryParser {
    provider: Option<Arc<dyn LlmProvider>>,
    model: String,
    template: String,
}

impl std::fmt::Debug for QueryParser {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QueryParser")
            .field("provider", &self.provider.as_ref().map(|p| p.name()))
            .field("model", &self.model)
            .finish_non_exhaustive()
    }
}

impl QueryParser {
    /// Creates a parser. Without a provider every call takes the fallback.
    #[must_use]
    pub fn new(
        provider: Option<Arc<dyn LlmProvider>>,
        model: impl Into<String>,
        template: impl Into<String>,
    ) -> Self {
        Self {
            provider,
            model: model.into(),
            template: template.into(),
        }
    }

    /// Parses with the model only.
    ///
    /// # Errors
    ///
    /// Returns [`AgentError::InvalidConfig`] without a provider, the
    /// provider's error on failure, and [`AgentError::ResponseParse`] when
    /// the output does not match the `parse_query` schema.
    pub async fn try_parse(&self, text: &str, today: NaiveDate) -> Result<ParsedQuery, AgentError> {
        let provider = self.provider.as_ref().ok_or_else(|| AgentError::InvalidConfig {
            message: "no LLM provider configured".to_string(),
        })?;

        let request = ChatRequest::new(
            self.model.clone(),
            vec![
                system_message(&build_parser_prompt(&self.template, today)),
                user_message(text),
            ],
        )
        .temperature(PARSING_TEMPERATURE)
        .max_tokens(PARSE_MAX_TOKENS)
        .tools(
            vec![parse_function()],
            ToolChoice::Function(PARSE_FUNCTION.to_string()),
        );

        let response = provider.chat(&request).await?;
        let parsed = extract_arguments(&response)?.normalize(today);
        debug!(
            intent = %parsed.intent,
            entity_types = ?parsed.entity_types,
            has_dates = parsed.date_range.is_some(),
            "query parsed"
        );
        Ok(parsed)
    }

    /// Parses `text`, falling back to the keyword scan on any failure.
    ///
    /// Returns the query and, when the fallback was taken, the reason.
    pub async fn parse_with_reason(
        &self,
        text: &str,
        today: NaiveDate,
    ) -> (ParsedQuery, Option<String>) {
        if self.provider.is_none() {
            debug!("no provider, using keyword parse");
            return (fallback_parse(text), None);
        }
        match self.try_parse(text, today).await {
            Ok(parsed) => (parsed, None),
            Err(e) => {
                warn!(error = %e, "query parsing failed, using keyword parse");
                (fallback_parse(text), Some(e.to_string()))
            }
        }
    }

    /// Parses `text`. Never fails.
    pub async fn parse(&self, text: &str, today: NaiveDate) -> ParsedQuery {
        self.parse_with_reason(text, today).await.0
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use proptest::prelude::*;
    use serde_json::json;
    use test_case::test_case;

    use super::*;
    use crate::agent::prompt::PARSER_SYSTEM_PROMPT;
    use crate::test_support::{MockProvider, TODAY};

    fn parser(provider: MockProvider) -> QueryParser {
        QueryParser::new(Some(Arc::new(provider)), "test-model", PARSER_SYSTEM_PROMPT)
    }

    #[test_case("Show me upcoming events" => vec![EntityType::Events])]
    #[test_case("Which tasks are overdue?" => vec![EntityType::Tasks])]
    #[test_case("List contacts at the ministry" => vec![EntityType::Contacts])]
    #[test_case("pending partnership agreements" => vec![EntityType::Partnerships])]
    #[test_case("any new sponsors?" => vec![EntityType::Events, EntityType::Tasks] ; "synonyms not inferred")]
    #[test_case("past events in Abu Dhabi" => vec![EntityType::ArchivedEvents])]
    #[test_case("archived events" => vec![EntityType::ArchivedEvents])]
    #[test_case("archived and upcoming events" => vec![EntityType::Events, EntityType::ArchivedEvents])]
    fn test_fallback_entities(text: &str) -> Vec<EntityType> {
        fallback_parse(text).entity_types
    }

    #[test_case("How many tasks are blocked?" => Intent::Count)]
    #[test_case("Give me an overview" => Intent::Summarize)]
    #[test_case("Compare this year versus last" => Intent::Compare)]
    #[test_case("What is the risk for the expo?" => Intent::Analyze)]
    #[test_case("find the catering vendor" => Intent::Search)]
    fn test_fallback_intent(text: &str) -> Intent {
        fallback_parse(text).intent
    }

    #[test]
    fn test_fallback_shape() {
        let parsed = fallback_parse("What events do we have next week?");
        assert_eq!(parsed.search_text, "What events do we have next week?");
        assert!(parsed.date_range.is_none());
        assert_eq!(parsed.limit, 10);
    }

    #[tokio::test]
    async fn test_forced_function_call_is_used() {
        let provider = MockProvider::tool_call(
            PARSE_FUNCTION,
            json!({
                "entityTypes": ["events"],
                "dateRange": {"start": "2025-01-06", "end": "2025-01-12", "field": "startDate"},
                "intent": "list"
            }),
        );
        let requests = provider.requests();
        let parsed = parser(provider)
            .parse("What events do we have next week?", TODAY)
            .await;
        assert_eq!(parsed.entity_types, vec![EntityType::Events]);
        let range = parsed.date_range.unwrap_or_else(|| panic!("no range"));
        assert_eq!(range.start.to_string(), "2025-01-06");
        assert_eq!(range.end.to_string(), "2025-01-12");

        let sent = requests.lock().unwrap_or_else(|e| panic!("poisoned: {e}"));
        assert_eq!(
            sent[0].tool_choice,
            ToolChoice::Function(PARSE_FUNCTION.to_string())
        );
        assert_eq!(sent[0].temperature, Some(PARSING_TEMPERATURE));
    }

    #[tokio::test]
    async fn test_json_content_is_accepted() {
        let provider = MockProvider::text("```json\n{\"entityTypes\":[\"leads\"],\"intent\":\"count\"}\n```");
        let parsed = parser(provider).parse("how many leads", TODAY).await;
        assert_eq!(parsed.entity_types, vec![EntityType::Leads]);
        assert_eq!(parsed.intent, Intent::Count);
    }

    #[tokio::test]
    async fn test_network_error_falls_back() {
        let provider = MockProvider::failing();
        let (parsed, reason) = parser(provider)
            .parse_with_reason("How many tasks are blocked?", TODAY)
            .await;
        assert_eq!(parsed.entity_types, vec![EntityType::Tasks]);
        assert_eq!(parsed.intent, Intent::Count);
        assert!(reason.is_some());
    }

    #[tokio::test]
    async fn test_malformed_output_falls_back() {
        let provider = MockProvider::text("I think you mean events.");
        let parsed = parser(provider).parse("events please", TODAY).await;
        assert_eq!(parsed.entity_types, vec![EntityType::Events]);
        assert_eq!(parsed.search_text, "events please");
    }

    proptest! {
        #[test]
        fn prop_fallback_always_valid(text in ".{0,200}") {
            let parsed = fallback_parse(&text);
            prop_assert!(!parsed.entity_types.is_empty());
            prop_assert!((1..=50).contains(&parsed.limit));
        }

        #[test]
        fn prop_normalized_arguments_always_valid(
            types in proptest::collection::vec("[a-z_]{0,16}", 0..5),
            limit in proptest::option::of(any::<i64>()),
        ) {
            let args = QueryArguments {
                entity_types: types,
                limit,
                ..QueryArguments::default()
            };
            let parsed = args.normalize(TODAY);
            prop_assert!(!parsed.entity_types.is_empty());
            prop_assert!((1..=50).contains(&parsed.limit));
        }
    }
}
