//! Tools the model may ask the concierge to run
//!
//! The set is closed: every name the model can use is a [`ToolName`] variant,
//! bound to its handler at compile time. Anything else is answered with an
//! "unavailable" result rather than an error.

mod available_times;
mod book_meeting;

pub use available_times::AvailableTimesTool;
pub use book_meeting::BookMeetingTool;

use crate::llm::ToolDefinition;
use crate::notify::AlertDispatcher;
use crate::runtime::ToolExecutor;
use crate::scheduling::Scheduler;
use async_trait::async_trait;
use serde_json::Value;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ToolName {
    GetAvailableTimes,
    BookMeeting,
}

impl ToolName {
    pub const ALL: [ToolName; 2] = [ToolName::GetAvailableTimes, ToolName::BookMeeting];

    pub fn as_str(self) -> &'static str {
        match self {
            ToolName::GetAvailableTimes => "getAvailableTimes",
            ToolName::BookMeeting => "bookMeeting",
        }
    }
}

impl fmt::Display for ToolName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownTool(pub String);

impl FromStr for ToolName {
    type Err = UnknownTool;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|tool| tool.as_str() == s)
            .ok_or_else(|| UnknownTool(s.to_string()))
    }
}

/// Result of one tool call, always readable by the model
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolResult {
    pub tool_name: String,
    pub result_text: String,
}

impl ToolResult {
    pub fn new(tool_name: impl Into<String>, result_text: impl Into<String>) -> Self {
        Self {
            tool_name: tool_name.into(),
            result_text: result_text.into(),
        }
    }
}

/// A single tool. Implementations must turn their own failures into text.
#[async_trait]
pub trait Tool: Send + Sync {
    fn name(&self) -> ToolName;

    /// Tool description for LLM
    fn description(&self) -> String;

    /// JSON schema for tool input
    fn input_schema(&self) -> Value;

    async fn run(&self, input: Value) -> String;
}

/// The concierge's tool set
pub struct ToolRegistry {
    available_times: AvailableTimesTool,
    book_meeting: BookMeetingTool,
}

impl ToolRegistry {
    pub fn new(scheduler: Arc<Scheduler>, alerts: AlertDispatcher) -> Self {
        Self {
            available_times: AvailableTimesTool::new(scheduler.clone()),
            book_meeting: BookMeetingTool::new(scheduler, alerts),
        }
    }

    fn tool(&self, name: ToolName) -> &dyn Tool {
        match name {
            ToolName::GetAvailableTimes => &self.available_times,
            ToolName::BookMeeting => &self.book_meeting,
        }
    }
}

#[async_trait]
impl ToolExecutor for ToolRegistry {
    async fn execute(&self, name: &str, input: Value) -> ToolResult {
        let Ok(tool_name) = name.parse::<ToolName>() else {
            tracing::warn!(tool = name, "Model requested an unknown tool");
            let text = format!(
                "The tool {name:?} is unavailable. Only getAvailableTimes and bookMeeting exist."
            );
            return ToolResult::new(name, text);
        };

        let start = std::time::Instant::now();
        let text = self.tool(tool_name).run(input).await;
        tracing::info!(
            tool = %tool_name,
            duration_ms = %start.elapsed().as_millis(),
            "Tool executed"
        );
        ToolResult::new(tool_name.as_str(), text)
    }

    fn definitions(&self) -> Vec<ToolDefinition> {
        ToolName::ALL
            .into_iter()
            .map(|name| {
                let tool = self.tool(name);
                ToolDefinition {
                    name: tool.name().as_str().to_string(),
                    description: tool.description(),
                    input_schema: tool.input_schema(),
                }
            })
            .collect()
    }
}
