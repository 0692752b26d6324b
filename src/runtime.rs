//! Conversation runtime
//!
//! Drives one request's dialogue: send the conversation to the model, run any
//! tools it asks for, feed the results back, and stop at the first plain
//! answer. The number of model round trips is bounded.

pub mod traits;

#[cfg(test)]
pub mod testing;

pub use traits::ToolExecutor;

use crate::llm::{ContentBlock, LlmError, LlmMessage, LlmRequest, LlmService, MessageRole};
use std::sync::Arc;
use thiserror::Error;

/// Orchestrator wired with production trait objects
pub type ChatOrchestrator = Orchestrator<Arc<dyn LlmService>, Arc<dyn ToolExecutor>>;

#[derive(Debug, Error)]
pub enum ChatError {
    #[error("model request failed: {0}")]
    Llm(#[from] LlmError),

    #[error("model returned neither text nor tool calls")]
    EmptyResponse,

    #[error("model still requesting tools after {0} round trips")]
    RoundLimitExceeded(usize),
}

/// Per-request conversation. Starts with the priming turns, never outlives
/// the request.
#[derive(Debug, Clone)]
pub struct Conversation {
    turns: Vec<LlmMessage>,
}

impl Conversation {
    pub fn primed(priming: &[LlmMessage]) -> Self {
        Self {
            turns: priming.to_vec(),
        }
    }

    pub fn push(&mut self, turn: LlmMessage) {
        self.turns.push(turn);
    }

    pub fn turns(&self) -> &[LlmMessage] {
        &self.turns
    }
}

pub struct Orchestrator<L, T>
where
    L: LlmService,
    T: ToolExecutor,
{
    llm: L,
    tools: T,
    priming: Vec<LlmMessage>,
    max_rounds: usize,
    max_tokens: Option<u32>,
}

impl<L, T> Orchestrator<L, T>
where
    L: LlmService,
    T: ToolExecutor,
{
    pub fn new(llm: L, tools: T, priming: Vec<LlmMessage>, max_rounds: usize) -> Self {
        Self {
            llm,
            tools,
            priming,
            max_rounds,
            max_tokens: None,
        }
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }

    /// Produce the final reply to `message`
    pub async fn respond(&self, message: &str) -> Result<String, ChatError> {
        let mut conversation = Conversation::primed(&self.priming);
        conversation.push(LlmMessage::user(message));
        let tools = self.tools.definitions();

        for round in 1..=self.max_rounds {
            let request = LlmRequest {
                messages: conversation.turns().to_vec(),
                tools: tools.clone(),
                max_tokens: self.max_tokens,
            };
            let response = self.llm.complete(&request).await?;

            if !response.has_tool_use() {
                let reply = response.text();
                if reply.trim().is_empty() {
                    return Err(ChatError::EmptyResponse);
                }
                tracing::debug!(round, "Model produced final reply");
                return Ok(reply);
            }

            // Sequential, in the order the model asked
            let tool_uses = response.tool_uses();
            let mut results = Vec::with_capacity(tool_uses.len());
            for call in &tool_uses {
                let result = self.tools.execute(call.name, call.input.clone()).await;
                results.push(ContentBlock::tool_result(
                    call.id,
                    result.tool_name,
                    result.result_text,
                ));
            }
            tracing::debug!(round, tool_calls = results.len(), "Tool round complete");

            conversation.push(LlmMessage {
                role: MessageRole::Model,
                content: response.content.clone(),
            });
            conversation.push(LlmMessage {
                role: MessageRole::User,
                content: results,
            });
        }

        Err(ChatError::RoundLimitExceeded(self.max_rounds))
    }
}

#[cfg(test)]
mod tests {
    use super::testing::{tool_call_response, MockLlmClient, MockToolExecutor};
    use super::*;
    use crate::llm::LlmResponse;
    use serde_json::json;
    use std::time::Duration;

    fn priming() -> Vec<LlmMessage> {
        vec![LlmMessage::user("You are a test persona."), LlmMessage::model("OK.")]
    }

    fn orchestrator(
        llm: &Arc<MockLlmClient>,
        tools: &Arc<MockToolExecutor>,
    ) -> Orchestrator<Arc<MockLlmClient>, Arc<MockToolExecutor>> {
        Orchestrator::new(llm.clone(), tools.clone(), priming(), 5).with_max_tokens(200)
    }

    #[tokio::test]
    async fn test_plain_reply_returned_unchanged() {
        let llm = Arc::new(MockLlmClient::new());
        llm.queue_response(LlmResponse::from_text("  Hello! How can I help?\n"));
        let tools = Arc::new(MockToolExecutor::new());

        let reply = orchestrator(&llm, &tools).respond("hi").await.unwrap();
        assert_eq!(reply, "  Hello! How can I help?\n");

        let requests = llm.recorded_requests();
        assert_eq!(requests.len(), 1);
        // priming, acknowledgment, user message
        assert_eq!(requests[0].messages.len(), 3);
        assert_eq!(requests[0].messages[2].content, vec![ContentBlock::text("hi")]);
        assert_eq!(requests[0].max_tokens, Some(200));
        assert!(tools.recorded_executions().is_empty());
    }

    #[tokio::test]
    async fn test_tool_results_fed_back_in_order() {
        let llm = Arc::new(MockLlmClient::new());
        llm.queue_response(tool_call_response(&[
            ("getAvailableTimes", json!({})),
            ("bookMeeting", json!({"name": "Jo", "email": "jo@example.com"})),
        ]));
        llm.queue_response(LlmResponse::from_text("All set."));
        let tools = Arc::new(
            MockToolExecutor::new()
                .with_tool("getAvailableTimes", "Mon 10:00")
                .with_tool("bookMeeting", "https://example.com/link"),
        );

        let reply = orchestrator(&llm, &tools).respond("book me").await.unwrap();
        assert_eq!(reply, "All set.");

        let executed: Vec<_> = tools
            .recorded_executions()
            .into_iter()
            .map(|(name, _)| name)
            .collect();
        assert_eq!(executed, vec!["getAvailableTimes", "bookMeeting"]);

        let second = &llm.recorded_requests()[1];
        assert_eq!(second.messages.len(), 5);
        assert_eq!(second.messages[3].role, MessageRole::Model);
        assert_eq!(second.messages[4].role, MessageRole::User);

        let results: Vec<_> = second.messages[4]
            .content
            .iter()
            .map(|block| match block {
                ContentBlock::ToolResult { name, content, .. } => (name.as_str(), content.as_str()),
                other => panic!("expected tool result, got {other:?}"),
            })
            .collect();
        assert_eq!(
            results,
            vec![
                ("getAvailableTimes", "Mon 10:00"),
                ("bookMeeting", "https://example.com/link"),
            ]
        );
    }

    #[tokio::test]
    async fn test_tool_result_ids_match_calls() {
        let llm = Arc::new(MockLlmClient::new());
        llm.queue_response(tool_call_response(&[("getAvailableTimes", json!({}))]));
        llm.queue_response(LlmResponse::from_text("Done"));
        let tools = Arc::new(MockToolExecutor::new().with_tool("getAvailableTimes", "x"));

        orchestrator(&llm, &tools).respond("when?").await.unwrap();

        let second = &llm.recorded_requests()[1];
        let ContentBlock::ToolUse { id: call_id, .. } = &second.messages[3].content[0] else {
            panic!("expected tool use");
        };
        let ContentBlock::ToolResult { tool_use_id, .. } = &second.messages[4].content[0] else {
            panic!("expected tool result");
        };
        assert_eq!(call_id, tool_use_id);
    }

    #[tokio::test]
    async fn test_loop_stops_at_round_limit() {
        let llm = Arc::new(MockLlmClient::always_calling("getAvailableTimes"));
        let tools = Arc::new(MockToolExecutor::new().with_tool("getAvailableTimes", "Mon 10:00"));

        let result = tokio::time::timeout(
            Duration::from_secs(5),
            orchestrator(&llm, &tools).respond("loop forever"),
        )
        .await
        .expect("orchestrator must not hang");

        assert!(matches!(result, Err(ChatError::RoundLimitExceeded(5))));
        assert_eq!(llm.recorded_requests().len(), 5);
        assert_eq!(tools.recorded_executions().len(), 5);
    }

    #[tokio::test]
    async fn test_round_limit_is_configurable() {
        let llm = Arc::new(MockLlmClient::always_calling("getAvailableTimes"));
        let tools = Arc::new(MockToolExecutor::new());

        let orchestrator = Orchestrator::new(llm.clone(), tools, priming(), 2);
        let result = orchestrator.respond("loop").await;
        assert!(matches!(result, Err(ChatError::RoundLimitExceeded(2))));
        assert_eq!(llm.recorded_requests().len(), 2);
    }

    #[tokio::test]
    async fn test_llm_error_propagates() {
        let llm = Arc::new(MockLlmClient::new());
        llm.queue_error(LlmError::server_error("boom"));
        let tools = Arc::new(MockToolExecutor::new());

        let result = orchestrator(&llm, &tools).respond("hi").await;
        assert!(matches!(result, Err(ChatError::Llm(_))));
    }

    #[tokio::test]
    async fn test_empty_response_is_an_error() {
        let llm = Arc::new(MockLlmClient::new());
        llm.queue_response(LlmResponse::from_text("   "));
        let tools = Arc::new(MockToolExecutor::new());

        let result = orchestrator(&llm, &tools).respond("hi").await;
        assert!(matches!(result, Err(ChatError::EmptyResponse)));
    }

    #[tokio::test]
    async fn test_unknown_tool_result_goes_back_to_model() {
        let llm = Arc::new(MockLlmClient::new());
        llm.queue_response(tool_call_response(&[("launchRockets", json!({}))]));
        llm.queue_response(LlmResponse::from_text("Sorry, I can't do that."));
        let tools = Arc::new(MockToolExecutor::new());

        let reply = orchestrator(&llm, &tools).respond("launch").await.unwrap();
        assert_eq!(reply, "Sorry, I can't do that.");

        let second = &llm.recorded_requests()[1];
        assert!(matches!(
            &second.messages[4].content[0],
            ContentBlock::ToolResult { content, .. } if content.contains("unavailable")
        ));
    }

    #[test]
    fn test_conversation_starts_primed() {
        let conversation = Conversation::primed(&priming());
        assert_eq!(conversation.turns().len(), 2);
        assert_eq!(conversation.turns()[1].role, MessageRole::Model);
    }
}
