//! Outbound notifications to the professional (lead and booking alerts)
//!
//! Sending is fire-and-forget from the caller's point of view: alerts are
//! spawned on a shared [`TaskTracker`] so they never hold up a reply, while
//! shutdown can still wait for them to finish.

mod resend;

pub use resend::{ResendNotifier, DEFAULT_BASE_URL as RESEND_DEFAULT_BASE_URL};

use async_trait::async_trait;
use std::sync::Arc;
use thiserror::Error;
use tokio::task::JoinHandle;
use tokio_util::task::TaskTracker;
use tracing::Instrument;

#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("notification request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("notification service returned HTTP {status}: {body}")]
    Status { status: u16, body: String },
}

/// What kind of alert a notification carries
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AlertKind {
    Lead,
    Booking,
}

/// A formatted message for the professional. Sender and recipient are fixed
/// by the notifier's configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub kind: AlertKind,
    pub subject: String,
    pub html: String,
}

#[async_trait]
pub trait Notifier: Send + Sync {
    async fn send(&self, notification: &Notification) -> Result<(), NotifyError>;
}

/// Spawns notifications in the background and contains their failures
#[derive(Clone)]
pub struct AlertDispatcher {
    notifier: Arc<dyn Notifier>,
    tracker: TaskTracker,
}

impl AlertDispatcher {
    pub fn new(notifier: Arc<dyn Notifier>, tracker: TaskTracker) -> Self {
        Self { notifier, tracker }
    }

    /// Send `notification` without waiting for it. Errors are logged only.
    pub fn dispatch(&self, notification: Notification) -> JoinHandle<()> {
        let notifier = self.notifier.clone();
        self.tracker.spawn(
            async move {
                match notifier.send(&notification).await {
                    Ok(()) => {
                        tracing::info!(kind = ?notification.kind, "Alert sent");
                    }
                    Err(e) => {
                        tracing::warn!(
                            kind = ?notification.kind,
                            error = %e,
                            "Failed to send alert"
                        );
                    }
                }
            }
            .in_current_span(),
        )
    }
}

/// Minimal escaping for user-provided text placed in an HTML body
pub fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}
