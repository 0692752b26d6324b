//! HTTP API for the concierge

mod handlers;
mod types;

pub use handlers::create_router;
pub use types::*;

use crate::leads::LeadWatcher;
use crate::runtime::ChatOrchestrator;
use crate::scheduling::SchedulingTier;
use std::sync::Arc;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub orchestrator: Arc<ChatOrchestrator>,
    pub leads: LeadWatcher,
    pub scheduling_tier: SchedulingTier,
}

impl AppState {
    pub fn new(
        orchestrator: ChatOrchestrator,
        leads: LeadWatcher,
        scheduling_tier: SchedulingTier,
    ) -> Self {
        Self {
            orchestrator: Arc::new(orchestrator),
            leads,
            scheduling_tier,
        }
    }
}
