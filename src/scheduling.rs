//! Scheduling adapter
//!
//! The integration tier is picked once, from whichever credentials are
//! configured, and never changes afterwards. A failing external call only
//! degrades that one call: FullApi falls back to LinkOnly, LinkOnly falls back
//! to the static fallback URL. Whenever a FullApi call fails, the degraded
//! answer also names the static fallback URL.

mod calendly;
mod error;

pub use calendly::{CalendlyClient, DEFAULT_BASE_URL as CALENDLY_DEFAULT_BASE_URL};
pub use error::SchedulingError;

use crate::config::SchedulingConfig;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::Url;
use serde::Serialize;
use std::fmt::Write;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::OnceCell;

/// Number of concrete slots offered to the model
const MAX_SLOTS: usize = 5;
/// How far ahead to look for open slots
const LOOKAHEAD_DAYS: i64 = 7;

/// Integration strategy, ordered from least to most capable
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SchedulingTier {
    StaticFallback,
    LinkOnly,
    FullApi,
}

impl SchedulingTier {
    pub fn resolve(has_api: bool, has_event_slug: bool) -> Self {
        match (has_api, has_event_slug) {
            (true, true) => Self::FullApi,
            (true, false) => Self::LinkOnly,
            (false, _) => Self::StaticFallback,
        }
    }
}

/// The account whose calendar we book into
#[derive(Debug, Clone)]
pub struct SchedulingUser {
    pub uri: String,
    pub scheduling_url: String,
}

/// A bookable event type configured on the account
#[derive(Debug, Clone)]
pub struct EventType {
    pub uri: String,
    pub name: String,
    pub slug: String,
    pub scheduling_url: String,
}

/// An open start time for an event type
#[derive(Debug, Clone)]
pub struct AvailableTime {
    pub start_time: DateTime<Utc>,
    pub scheduling_url: Option<String>,
}

/// Operations consumed from the external scheduling service
#[async_trait]
pub trait SchedulingApi: Send + Sync {
    async fn current_user(&self) -> Result<SchedulingUser, SchedulingError>;

    async fn event_types(&self, user_uri: &str) -> Result<Vec<EventType>, SchedulingError>;

    async fn available_times(
        &self,
        event_type_uri: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<AvailableTime>, SchedulingError>;

    async fn create_single_use_link(&self, event_type_uri: &str) -> Result<String, SchedulingError>;
}

/// Outcome of a booking request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Booking {
    /// Text handed back to the model
    pub message: String,
    /// The link the visitor should follow
    pub link: String,
    /// Tier that actually produced the link
    pub served_by: SchedulingTier,
}

pub struct Scheduler {
    tier: SchedulingTier,
    api: Option<Arc<dyn SchedulingApi>>,
    event_slug: Option<String>,
    fallback_url: String,
    user: OnceCell<SchedulingUser>,
    /// `None` once the slug is known not to match any event type
    event_type: OnceCell<Option<EventType>>,
}

impl Scheduler {
    pub fn new(
        api: Option<Arc<dyn SchedulingApi>>,
        event_slug: Option<String>,
        fallback_url: impl Into<String>,
    ) -> Self {
        let tier = SchedulingTier::resolve(api.is_some(), event_slug.is_some());
        Self {
            tier,
            api,
            event_slug,
            fallback_url: fallback_url.into(),
            user: OnceCell::new(),
            event_type: OnceCell::new(),
        }
    }

    pub fn from_config(
        config: &SchedulingConfig,
        timeout: Duration,
    ) -> Result<Self, SchedulingError> {
        let api = match &config.api_token {
            Some(token) => {
                let client = CalendlyClient::new(token.clone(), &config.base_url, timeout)?;
                Some(Arc::new(client) as Arc<dyn SchedulingApi>)
            }
            None => None,
        };
        Ok(Self::new(
            api,
            config.event_slug.clone(),
            config.fallback_url.clone(),
        ))
    }

    pub fn tier(&self) -> SchedulingTier {
        self.tier
    }

    pub fn fallback_url(&self) -> &str {
        &self.fallback_url
    }

    /// Describe upcoming availability. Never fails; degrades instead.
    pub async fn available_times(&self) -> String {
        let mut full_api_failed = false;
        if self.tier >= SchedulingTier::FullApi {
            match self.list_slots().await {
                Ok(text) => return text,
                Err(e) => {
                    log_degraded("getAvailableTimes", SchedulingTier::FullApi, &e);
                    full_api_failed = true;
                }
            }
        }

        if self.tier >= SchedulingTier::LinkOnly {
            match self.generic_link().await {
                Ok(url) => {
                    return format!(
                        "Live availability is not listed here. The visitor can see all open times and pick one at {url}{}",
                        self.alternative(full_api_failed)
                    );
                }
                Err(e) => log_degraded("getAvailableTimes", SchedulingTier::LinkOnly, &e),
            }
        }

        self.fallback_url.clone()
    }

    /// Produce a booking link for the visitor. Never fails; degrades instead.
    pub async fn book_meeting(&self, name: &str, email: &str) -> Booking {
        let mut full_api_failed = false;
        if self.tier >= SchedulingTier::FullApi {
            match self.single_use_link().await {
                Ok(url) => {
                    let link = with_prefill(&url, name, email);
                    return Booking {
                        message: format!(
                            "Created a single-use booking link for {name} ({email}): {link}"
                        ),
                        link,
                        served_by: SchedulingTier::FullApi,
                    };
                }
                Err(e) => {
                    log_degraded("bookMeeting", SchedulingTier::FullApi, &e);
                    full_api_failed = true;
                }
            }
        }

        if self.tier >= SchedulingTier::LinkOnly {
            match self.generic_link().await {
                Ok(url) => {
                    let link = with_prefill(&url, name, email);
                    return Booking {
                        message: format!(
                            "{name} ({email}) can choose a time and confirm the meeting at {link}{}",
                            self.alternative(full_api_failed)
                        ),
                        link,
                        served_by: SchedulingTier::LinkOnly,
                    };
                }
                Err(e) => log_degraded("bookMeeting", SchedulingTier::LinkOnly, &e),
            }
        }

        Booking {
            message: self.fallback_url.clone(),
            link: self.fallback_url.clone(),
            served_by: SchedulingTier::StaticFallback,
        }
    }

    /// Pointer to the static booking page, added after a FullApi failure
    fn alternative(&self, full_api_failed: bool) -> String {
        if full_api_failed {
            format!(" (or book directly at {})", self.fallback_url)
        } else {
            String::new()
        }
    }

    fn api(&self) -> Result<&Arc<dyn SchedulingApi>, SchedulingError> {
        self.api.as_ref().ok_or_else(|| {
            SchedulingError::Malformed("no scheduling client configured".to_string())
        })
    }

    async fn user(&self) -> Result<&SchedulingUser, SchedulingError> {
        let api = self.api()?;
        self.user.get_or_try_init(|| api.current_user()).await
    }

    async fn generic_link(&self) -> Result<String, SchedulingError> {
        let user = self.user().await?;
        if user.scheduling_url.is_empty() {
            return Err(SchedulingError::Malformed(
                "account has no scheduling_url".to_string(),
            ));
        }
        Ok(user.scheduling_url.clone())
    }

    /// Find the configured event type. A slug that matches nothing is
    /// remembered, so the lookup is not repeated on every request.
    async fn event_type(&self) -> Result<&EventType, SchedulingError> {
        let slug = self.event_slug.as_deref().unwrap_or_default();
        let resolved = self
            .event_type
            .get_or_try_init(|| async {
                let user = self.user().await?;
                let candidates = self.api()?.event_types(&user.uri).await?;
                let found = candidates.into_iter().find(|e| e.slug == slug);
                if found.is_none() {
                    tracing::error!(slug, "No event type matches the configured slug");
                }
                Ok::<_, SchedulingError>(found)
            })
            .await?;
        resolved
            .as_ref()
            .ok_or_else(|| SchedulingError::EventTypeNotFound(slug.to_string()))
    }

    async fn list_slots(&self) -> Result<String, SchedulingError> {
        let event_type = self.event_type().await?;
        let start = Utc::now() + chrono::Duration::minutes(1);
        let end = start + chrono::Duration::days(LOOKAHEAD_DAYS) - chrono::Duration::minutes(1);
        let slots = self
            .api()?
            .available_times(&event_type.uri, start, end)
            .await?;
        Ok(format_slots(event_type, &slots))
    }

    async fn single_use_link(&self) -> Result<String, SchedulingError> {
        let event_type = self.event_type().await?;
        self.api()?.create_single_use_link(&event_type.uri).await
    }
}

fn log_degraded(tool: &str, tier: SchedulingTier, e: &SchedulingError) {
    if e.is_configuration() {
        tracing::debug!(tool, ?tier, error = %e, "Scheduling tier misconfigured, degrading");
    } else {
        tracing::warn!(tool, ?tier, error = %e, "Scheduling call failed, degrading");
    }
}

fn format_slots(event_type: &EventType, slots: &[AvailableTime]) -> String {
    if slots.is_empty() {
        return format!(
            "No open {} slots in the next {LOOKAHEAD_DAYS} days. The visitor can check later dates at {}",
            event_type.name, event_type.scheduling_url
        );
    }

    let mut text = format!("Next open times for {} (UTC):", event_type.name);
    for slot in slots.iter().take(MAX_SLOTS) {
        let when = slot.start_time.format("%a %b %-d, %H:%M");
        let _ = write!(text, "\n- {when}");
        if let Some(url) = &slot.scheduling_url {
            let _ = write!(text, " ({url})");
        }
    }
    let _ = write!(
        text,
        "\nTo book, collect the visitor's name and email, then call bookMeeting."
    );
    text
}

/// Append `name`/`email` pre-fill parameters to a booking URL.
///
/// Unparseable URLs are returned unchanged.
fn with_prefill(url: &str, name: &str, email: &str) -> String {
    match Url::parse(url) {
        Ok(mut parsed) => {
            parsed
                .query_pairs_mut()
                .append_pair("name", name)
                .append_pair("email", email);
            parsed.to_string()
        }
        Err(_) => url.to_string(),
    }
}
