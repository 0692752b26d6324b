//! getAvailableTimes - upcoming open consultation slots

use super::{Tool, ToolName};
use crate::scheduling::Scheduler;
use async_trait::async_trait;
use serde_json::{json, Value};
use std::sync::Arc;

pub struct AvailableTimesTool {
    scheduler: Arc<Scheduler>,
}

impl AvailableTimesTool {
    pub fn new(scheduler: Arc<Scheduler>) -> Self {
        Self { scheduler }
    }
}

#[async_trait]
impl Tool for AvailableTimesTool {
    fn name(&self) -> ToolName {
        ToolName::GetAvailableTimes
    }

    fn description(&self) -> String {
        "Look up upcoming open times for a consultation. Use when the visitor asks about availability or wants to meet. Returns either concrete time slots or a link where the visitor can see open times.".to_string()
    }

    fn input_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {}
        })
    }

    async fn run(&self, _input: Value) -> String {
        self.scheduler.available_times().await
    }
}
