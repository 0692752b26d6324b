//! Trait abstractions for runtime I/O
//!
//! These traits enable testing the orchestrator with mock implementations.

use crate::llm::ToolDefinition;
use crate::tools::ToolResult;
use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;

/// Executor for tools
#[async_trait]
pub trait ToolExecutor: Send + Sync {
    /// Execute a tool by name. Never fails: unknown tools and tool errors
    /// come back as result text.
    async fn execute(&self, name: &str, input: Value) -> ToolResult;

    /// Get tool definitions for LLM
    fn definitions(&self) -> Vec<ToolDefinition>;
}

#[async_trait]
impl<T: ToolExecutor + ?Sized> ToolExecutor for Arc<T> {
    async fn execute(&self, name: &str, input: Value) -> ToolResult {
        (**self).execute(name, input).await
    }

    fn definitions(&self) -> Vec<ToolDefinition> {
        (**self).definitions()
    }
}
