//! Natural-language to query bridge
//!
//! Forwards the user's question to a chat-completion provider with a fixed
//! schema description and one worked example. The reply is returned as-is:
//! it is not parsed, validated or executed.

use std::sync::Arc;

use tracing::{error, info};

use crate::domain::{DomainError, DomainResult};
use crate::infrastructure::completion::{ChatMessage, CompletionProvider};

pub const MAX_PROMPT_LEN: usize = 2000;

const SYSTEM_PROMPT: &str = "\
You translate questions about recorded operation metrics into a single SQLite query.
Table `metrics` has the columns:
  id TEXT, project_id TEXT, operation TEXT,
  start_time TEXT (RFC 3339), end_time TEXT (RFC 3339),
  duration REAL (milliseconds), tags TEXT (JSON object of scalar values).
Table `projects` has the columns: id TEXT, name TEXT.
Read tags with json_extract(tags, '$.\"<key>\"').
Answer with the query only, no explanation and no code fences.";

const EXAMPLE_QUESTION: &str =
    "Average duration per operation for the checkout project, slowest first";

const EXAMPLE_ANSWER: &str = "\
SELECT m.operation, COUNT(*) AS count, AVG(m.duration) AS durationAvg
FROM metrics m JOIN projects p ON p.id = m.project_id
WHERE p.name = 'checkout'
GROUP BY m.operation
ORDER BY durationAvg DESC;";

pub struct QuerySuggestionService {
    provider: Option<Arc<dyn CompletionProvider>>,
}

impl QuerySuggestionService {
    /// `None` leaves the bridge unconfigured; every call then fails with
    /// `Unavailable`.
    pub fn new(provider: Option<Arc<dyn CompletionProvider>>) -> Self {
        Self { provider }
    }

    pub fn is_configured(&self) -> bool {
        self.provider.is_some()
    }

    fn messages(prompt: &str) -> Vec<ChatMessage> {
        vec![
            ChatMessage::system(SYSTEM_PROMPT),
            ChatMessage::user(EXAMPLE_QUESTION),
            ChatMessage::assistant(EXAMPLE_ANSWER),
            ChatMessage::user(prompt),
        ]
    }

    pub async fn suggest(&self, prompt: &str) -> DomainResult<String> {
        let prompt = prompt.trim();
        if prompt.is_empty() {
            return Err(DomainError::validation("prompt", "must not be empty"));
        }
        if prompt.chars().count() > MAX_PROMPT_LEN {
            return Err(DomainError::validation(
                "prompt",
                format!("must be at most {} characters", MAX_PROMPT_LEN),
            ));
        }

        let provider = self
            .provider
            .as_ref()
            .ok_or_else(|| {
                DomainError::Unavailable("Query suggestions are not configured".into())
            })?;

        match provider.complete(&Self::messages(prompt)).await {
            Ok(query) => {
                info!(prompt_len = prompt.len(), "Query suggestion generated");
                Ok(query)
            }
            Err(e) => {
                error!(error = %e, "Completion provider failed");
                Err(DomainError::Upstream("Failed to generate a query suggestion".into()))
            }
        }
    }
}
