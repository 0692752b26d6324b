//! Mock implementations for testing
//!
//! These mocks enable testing the orchestrator, tools and HTTP layer without
//! real I/O.

use super::traits::ToolExecutor;
use crate::llm::{
    ContentBlock, LlmError, LlmRequest, LlmResponse, LlmService, ToolDefinition, Usage,
};
use crate::notify::{Notification, Notifier, NotifyError};
use crate::scheduling::{AvailableTime, EventType, SchedulingApi, SchedulingError, SchedulingUser};
use crate::tools::ToolResult;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::{json, Value};
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

/// Build a model response requesting the given tool calls, in order
pub fn tool_call_response(calls: &[(&str, Value)]) -> LlmResponse {
    LlmResponse {
        content: calls
            .iter()
            .enumerate()
            .map(|(i, (name, input))| {
                ContentBlock::tool_use(format!("call_{i}_{name}"), *name, input.clone())
            })
            .collect(),
        usage: Usage::default(),
    }
}

// ============================================================================
// Mock LLM Client
// ============================================================================

enum Script {
    Queue(Mutex<VecDeque<Result<LlmResponse, LlmError>>>),
    /// Request the same tool on every turn
    AlwaysCall(String),
    /// Call `tool` once, then reply with the text of its result
    EchoToolResult(String),
}

/// Mock LLM client that returns scripted responses
pub struct MockLlmClient {
    script: Script,
    /// Record of all requests made
    pub requests: Mutex<Vec<LlmRequest>>,
}

impl MockLlmClient {
    pub fn new() -> Self {
        Self::with_script(Script::Queue(Mutex::new(VecDeque::new())))
    }

    pub fn always_calling(tool: impl Into<String>) -> Self {
        Self::with_script(Script::AlwaysCall(tool.into()))
    }

    pub fn echoing_tool_result(tool: impl Into<String>) -> Self {
        Self::with_script(Script::EchoToolResult(tool.into()))
    }

    fn with_script(script: Script) -> Self {
        Self {
            script,
            requests: Mutex::new(Vec::new()),
        }
    }

    fn queue(&self) -> &Mutex<VecDeque<Result<LlmResponse, LlmError>>> {
        match &self.script {
            Script::Queue(queue) => queue,
            _ => panic!("MockLlmClient is not in queue mode"),
        }
    }

    /// Queue a successful response
    pub fn queue_response(&self, response: LlmResponse) {
        self.queue().lock().unwrap().push_back(Ok(response));
    }

    /// Queue an error response
    pub fn queue_error(&self, error: LlmError) {
        self.queue().lock().unwrap().push_back(Err(error));
    }

    /// Get recorded requests
    pub fn recorded_requests(&self) -> Vec<LlmRequest> {
        self.requests.lock().unwrap().clone()
    }
}

impl Default for MockLlmClient {
    fn default() -> Self {
        Self::new()
    }
}

fn last_tool_result(request: &LlmRequest) -> Option<String> {
    request.messages.last()?.content.iter().find_map(|block| match block {
        ContentBlock::ToolResult { content, .. } => Some(content.clone()),
        _ => None,
    })
}

#[async_trait]
impl LlmService for MockLlmClient {
    async fn complete(&self, request: &LlmRequest) -> Result<LlmResponse, LlmError> {
        self.requests.lock().unwrap().push(request.clone());
        match &self.script {
            Script::Queue(queue) => queue
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Err(LlmError::network("No mock response queued"))),
            Script::AlwaysCall(tool) => Ok(tool_call_response(&[(tool.as_str(), json!({}))])),
            Script::EchoToolResult(tool) => Ok(match last_tool_result(request) {
                Some(result) => {
                    LlmResponse::from_text(format!("You can book a time here: {result}"))
                }
                None => tool_call_response(&[(tool.as_str(), json!({}))]),
            }),
        }
    }

    fn model_id(&self) -> &str {
        "mock-model"
    }
}

// ============================================================================
// Mock Tool Executor
// ============================================================================

/// Mock tool executor with predefined outputs
pub struct MockToolExecutor {
    outputs: HashMap<String, String>,
    definitions: Vec<ToolDefinition>,
    /// Record of tool executions
    pub executions: Mutex<Vec<(String, Value)>>,
}

impl MockToolExecutor {
    pub fn new() -> Self {
        Self {
            outputs: HashMap::new(),
            definitions: Vec::new(),
            executions: Mutex::new(Vec::new()),
        }
    }

    /// Add a tool with a predefined output
    pub fn with_tool(mut self, name: impl Into<String>, output: impl Into<String>) -> Self {
        let name = name.into();
        self.definitions.push(ToolDefinition {
            name: name.clone(),
            description: format!("Mock {name}"),
            input_schema: json!({ "type": "object", "properties": {} }),
        });
        self.outputs.insert(name, output.into());
        self
    }

    /// Get recorded executions
    pub fn recorded_executions(&self) -> Vec<(String, Value)> {
        self.executions.lock().unwrap().clone()
    }
}

impl Default for MockToolExecutor {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ToolExecutor for MockToolExecutor {
    async fn execute(&self, name: &str, input: Value) -> ToolResult {
        self.executions
            .lock()
            .unwrap()
            .push((name.to_string(), input));
        let text = self
            .outputs
            .get(name)
            .cloned()
            .unwrap_or_else(|| format!("The tool {name:?} is unavailable."));
        ToolResult::new(name, text)
    }

    fn definitions(&self) -> Vec<ToolDefinition> {
        self.definitions.clone()
    }
}

// ============================================================================
// Recording Notifier
// ============================================================================

/// Notifier that records what it was asked to send
pub struct RecordingNotifier {
    fail: bool,
    attempts: AtomicUsize,
    sent: Mutex<Vec<Notification>>,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self {
            fail: false,
            attempts: AtomicUsize::new(0),
            sent: Mutex::new(Vec::new()),
        }
    }

    /// A notifier whose every send fails
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::new()
        }
    }

    /// Successfully sent notifications
    pub fn sent(&self) -> Vec<Notification> {
        self.sent.lock().unwrap().clone()
    }

    pub fn attempts(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }
}

impl Default for RecordingNotifier {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn send(&self, notification: &Notification) -> Result<(), NotifyError> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            return Err(NotifyError::Status {
                status: 500,
                body: "mock failure".to_string(),
            });
        }
        self.sent.lock().unwrap().push(notification.clone());
        Ok(())
    }
}

// ============================================================================
// Mock Scheduling API
// ============================================================================

/// In-memory scheduling service: one user with one "intro" event type
pub struct MockSchedulingApi {
    fail_status: Option<u16>,
    fail_event_types: bool,
    fail_bookings: Option<u16>,
    slot_count: usize,
    event_type_lookups: AtomicUsize,
}

impl MockSchedulingApi {
    pub fn healthy() -> Self {
        Self {
            fail_status: None,
            fail_event_types: false,
            fail_bookings: None,
            slot_count: 3,
            event_type_lookups: AtomicUsize::new(0),
        }
    }

    /// Every call answers with a non-success status
    pub fn failing(status: u16) -> Self {
        Self {
            fail_status: Some(status),
            ..Self::healthy()
        }
    }

    pub fn with_slot_count(mut self, count: usize) -> Self {
        self.slot_count = count;
        self
    }

    /// Only the event type listing fails
    pub fn with_failing_event_types(mut self) -> Self {
        self.fail_event_types = true;
        self
    }

    /// Availability and link creation fail; account and event type lookups work
    pub fn with_failing_bookings(mut self, status: u16) -> Self {
        self.fail_bookings = Some(status);
        self
    }

    pub fn event_type_lookups(&self) -> usize {
        self.event_type_lookups.load(Ordering::SeqCst)
    }

    fn check(&self) -> Result<(), SchedulingError> {
        Self::fail_with(self.fail_status)
    }

    fn check_booking(&self) -> Result<(), SchedulingError> {
        self.check()?;
        Self::fail_with(self.fail_bookings)
    }

    fn fail_with(status: Option<u16>) -> Result<(), SchedulingError> {
        match status {
            Some(status) => Err(SchedulingError::Status {
                status,
                body: "mock failure".to_string(),
            }),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl SchedulingApi for MockSchedulingApi {
    async fn current_user(&self) -> Result<SchedulingUser, SchedulingError> {
        self.check()?;
        Ok(SchedulingUser {
            uri: "https://api.calendly.com/users/U1".to_string(),
            scheduling_url: "https://calendly.com/pat".to_string(),
        })
    }

    async fn event_types(&self, _user_uri: &str) -> Result<Vec<EventType>, SchedulingError> {
        self.event_type_lookups.fetch_add(1, Ordering::SeqCst);
        self.check()?;
        if self.fail_event_types {
            return Err(SchedulingError::Status {
                status: 502,
                body: "mock failure".to_string(),
            });
        }
        Ok(vec![EventType {
            uri: "https://api.calendly.com/event_types/E1".to_string(),
            name: "Intro Call".to_string(),
            slug: "intro".to_string(),
            scheduling_url: "https://calendly.com/pat/intro".to_string(),
        }])
    }

    async fn available_times(
        &self,
        _event_type_uri: &str,
        start: DateTime<Utc>,
        _end: DateTime<Utc>,
    ) -> Result<Vec<AvailableTime>, SchedulingError> {
        self.check_booking()?;
        Ok((1..=self.slot_count)
            .map(|i| {
                let hours = i64::try_from(i).unwrap_or(1) * 3;
                let start_time = start + chrono::Duration::hours(hours);
                AvailableTime {
                    start_time,
                    scheduling_url: Some(format!("https://calendly.com/pat/intro/slot-{i}")),
                }
            })
            .collect())
    }

    async fn create_single_use_link(
        &self,
        _event_type_uri: &str,
    ) -> Result<String, SchedulingError> {
        self.check_booking()?;
        Ok("https://calendly.com/d/single-use".to_string())
    }
}
