//! Calendly v2 API client

use super::{AvailableTime, EventType, SchedulingApi, SchedulingError, SchedulingUser};
use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use reqwest::{Client, RequestBuilder};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::time::Duration;

pub const DEFAULT_BASE_URL: &str = "https://api.calendly.com";

pub struct CalendlyClient {
    client: Client,
    token: String,
    base_url: String,
}

impl CalendlyClient {
    pub fn new(token: String, base_url: &str, timeout: Duration) -> Result<Self, SchedulingError> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            token,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    async fn send<T: DeserializeOwned>(
        &self,
        request: RequestBuilder,
    ) -> Result<T, SchedulingError> {
        let response = request.bearer_auth(&self.token).send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(SchedulingError::Status {
                status: status.as_u16(),
                body,
            });
        }
        response
            .json::<T>()
            .await
            .map_err(|e| SchedulingError::Malformed(e.to_string()))
    }
}

#[async_trait]
impl SchedulingApi for CalendlyClient {
    async fn current_user(&self) -> Result<SchedulingUser, SchedulingError> {
        let body: Resource<UserResource> = self.send(self.client.get(self.url("/users/me"))).await?;
        Ok(SchedulingUser {
            uri: body.resource.uri,
            scheduling_url: body.resource.scheduling_url,
        })
    }

    async fn event_types(&self, user_uri: &str) -> Result<Vec<EventType>, SchedulingError> {
        let request = self.client.get(self.url("/event_types")).query(&[
            ("user", user_uri),
            ("active", "true"),
            ("count", "100"),
        ]);
        let body: Collection<EventTypeResource> = self.send(request).await?;
        Ok(body
            .collection
            .into_iter()
            .filter(|e| e.active)
            .map(|e| EventType {
                uri: e.uri,
                name: e.name,
                slug: e.slug,
                scheduling_url: e.scheduling_url,
            })
            .collect())
    }

    async fn available_times(
        &self,
        event_type_uri: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<AvailableTime>, SchedulingError> {
        let start = start.to_rfc3339_opts(SecondsFormat::Secs, true);
        let end = end.to_rfc3339_opts(SecondsFormat::Secs, true);
        let request = self
            .client
            .get(self.url("/event_type_available_times"))
            .query(&[
                ("event_type", event_type_uri),
                ("start_time", start.as_str()),
                ("end_time", end.as_str()),
            ]);
        let body: Collection<AvailableTimeResource> = self.send(request).await?;
        Ok(body
            .collection
            .into_iter()
            .filter(|t| t.status == "available")
            .map(|t| AvailableTime {
                start_time: t.start_time,
                scheduling_url: t.scheduling_url,
            })
            .collect())
    }

    async fn create_single_use_link(
        &self,
        event_type_uri: &str,
    ) -> Result<String, SchedulingError> {
        let request = self
            .client
            .post(self.url("/scheduling_links"))
            .json(&SchedulingLinkRequest {
                max_event_count: 1,
                owner: event_type_uri,
                owner_type: "EventType",
            });
        let body: Resource<SchedulingLinkResource> = self.send(request).await?;
        if body.resource.booking_url.is_empty() {
            return Err(SchedulingError::Malformed(
                "scheduling link without booking_url".to_string(),
            ));
        }
        Ok(body.resource.booking_url)
    }
}

// Calendly API types

#[derive(Debug, Deserialize)]
struct Resource<T> {
    resource: T,
}

#[derive(Debug, Deserialize)]
struct Collection<T> {
    collection: Vec<T>,
}

#[derive(Debug, Deserialize)]
struct UserResource {
    uri: String,
    scheduling_url: String,
}

#[derive(Debug, Deserialize)]
struct EventTypeResource {
    uri: String,
    name: String,
    slug: String,
    scheduling_url: String,
    #[serde(default = "default_true")]
    active: bool,
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Deserialize)]
struct AvailableTimeResource {
    status: String,
    start_time: DateTime<Utc>,
    scheduling_url: Option<String>,
}

#[derive(Debug, Serialize)]
struct SchedulingLinkRequest<'a> {
    max_event_count: u32,
    owner: &'a str,
    owner_type: &'a str,
}

#[derive(Debug, Deserialize)]
struct SchedulingLinkResource {
    booking_url: String,
}
