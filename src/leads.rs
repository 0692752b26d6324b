//! Lead detection
//!
//! A best-effort heuristic that spots contact details in a visitor's message
//! and alerts the professional. It sits behind [`ContactDetector`] so a
//! stricter validator can replace it without touching callers.

use crate::notify::{escape_html, AlertDispatcher, AlertKind, Notification};
use regex::Regex;
use std::fmt;
use std::sync::{Arc, LazyLock};

static EMAIL_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"[A-Za-z0-9._%+-]+@[A-Za-z0-9.-]+\.[A-Za-z]{2,}").expect("valid email pattern")
});

// Optional +country code, optional parentheses around the area code, and
// space / dash / dot separators.
static PHONE_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?:\+\d{1,3}[\s.-]?)?(?:\(\d{2,4}\)|\d{2,4})[\s.-]?\d{3,4}[\s.-]?\d{3,4}")
        .expect("valid phone pattern")
});

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LeadKind {
    Email,
    Phone,
}

impl fmt::Display for LeadKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LeadKind::Email => f.write_str("email"),
            LeadKind::Phone => f.write_str("phone"),
        }
    }
}

/// Contact information found in a visitor message
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Lead {
    pub contact_value: String,
    pub kind: LeadKind,
    pub source_message: String,
}

impl Lead {
    /// Format the alert sent to the professional
    pub fn alert(&self) -> Notification {
        Notification {
            kind: AlertKind::Lead,
            subject: format!("New lead: {}", self.contact_value),
            html: format!(
                "<h2>New lead from the website assistant</h2>\
                 <p><strong>Contact ({}):</strong> {}</p>\
                 <p><strong>Message:</strong></p>\
                 <blockquote>{}</blockquote>",
                self.kind,
                escape_html(&self.contact_value),
                escape_html(&self.source_message),
            ),
        }
    }
}

pub trait ContactDetector: Send + Sync {
    /// Return at most one lead for `message`
    fn detect(&self, message: &str) -> Option<Lead>;
}

/// Regex heuristic: first email wins, otherwise first phone number
#[derive(Debug, Default, Clone, Copy)]
pub struct PatternDetector;

impl ContactDetector for PatternDetector {
    fn detect(&self, message: &str) -> Option<Lead> {
        let (found, kind) = EMAIL_PATTERN
            .find(message)
            .map(|m| (m, LeadKind::Email))
            .or_else(|| PHONE_PATTERN.find(message).map(|m| (m, LeadKind::Phone)))?;

        Some(Lead {
            contact_value: found.as_str().to_string(),
            kind,
            source_message: message.to_string(),
        })
    }
}

/// Watches inbound messages and alerts on leads without blocking the reply
#[derive(Clone)]
pub struct LeadWatcher {
    detector: Arc<dyn ContactDetector>,
    alerts: AlertDispatcher,
}

impl LeadWatcher {
    pub fn new(detector: Arc<dyn ContactDetector>, alerts: AlertDispatcher) -> Self {
        Self { detector, alerts }
    }

    /// Check `message` for contact details and, if found, spawn the alert.
    ///
    /// The alert runs on the shared tracker, which is drained at shutdown.
    pub fn observe(&self, message: &str) {
        let Some(lead) = self.detector.detect(message) else {
            return;
        };
        tracing::info!(kind = %lead.kind, "Lead detected");
        tracing::debug!(contact = %lead.contact_value, "Lead contact");
        self.alerts.dispatch(lead.alert());
    }
}
