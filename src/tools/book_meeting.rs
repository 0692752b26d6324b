//! bookMeeting - hand the visitor a booking link and alert the professional

use super::{Tool, ToolName};
use crate::notify::{escape_html, AlertDispatcher, AlertKind, Notification};
use crate::scheduling::{Booking, Scheduler};
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;

pub struct BookMeetingTool {
    scheduler: Arc<Scheduler>,
    alerts: AlertDispatcher,
}

impl BookMeetingTool {
    pub fn new(scheduler: Arc<Scheduler>, alerts: AlertDispatcher) -> Self {
        Self { scheduler, alerts }
    }
}

#[derive(Debug, Deserialize)]
struct BookMeetingInput {
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    email: Option<String>,
}

/// Required arguments, both present and non-blank
fn required_args(input: BookMeetingInput) -> Result<(String, String), String> {
    let name = input.name.map(|s| s.trim().to_string()).filter(|s| !s.is_empty());
    let email = input.email.map(|s| s.trim().to_string()).filter(|s| !s.is_empty());

    match (name, email) {
        (Some(name), Some(email)) => Ok((name, email)),
        (name, email) => {
            let mut missing = Vec::new();
            if name.is_none() {
                missing.push("name");
            }
            if email.is_none() {
                missing.push("email");
            }
            Err(missing.join(" and "))
        }
    }
}

fn booking_alert(name: &str, email: &str, booking: &Booking) -> Notification {
    Notification {
        kind: AlertKind::Booking,
        subject: format!("Booking requested by {name}"),
        html: format!(
            "<h2>A visitor asked to book a consultation</h2>\
             <p><strong>Name:</strong> {}</p>\
             <p><strong>Email:</strong> {}</p>\
             <p><strong>Booking link sent:</strong> {}</p>",
            escape_html(name),
            escape_html(email),
            escape_html(&booking.link),
        ),
    }
}

#[async_trait]
impl Tool for BookMeetingTool {
    fn name(&self) -> ToolName {
        ToolName::BookMeeting
    }

    fn description(&self) -> String {
        "Create a booking link for a consultation. Only call this once you know the visitor's name and email address; ask for them first if missing. Returns a link the visitor uses to confirm the meeting.".to_string()
    }

    fn input_schema(&self) -> Value {
        json!({
            "type": "object",
            "required": ["name", "email"],
            "properties": {
                "name": {
                    "type": "string",
                    "description": "The visitor's full name"
                },
                "email": {
                    "type": "string",
                    "description": "The visitor's email address"
                }
            }
        })
    }

    async fn run(&self, input: Value) -> String {
        let parsed = match serde_json::from_value::<BookMeetingInput>(input) {
            Ok(parsed) => parsed,
            Err(e) => return format!("Invalid input for bookMeeting: {e}"),
        };

        let (name, email) = match required_args(parsed) {
            Ok(args) => args,
            Err(missing) => {
                tracing::warn!(%missing, "bookMeeting called without required arguments");
                return format!(
                    "Cannot book yet: bookMeeting requires the visitor's {missing}. Ask the visitor for it, then call bookMeeting again."
                );
            }
        };

        let booking = self.scheduler.book_meeting(&name, &email).await;
        tracing::info!(served_by = ?booking.served_by, "Booking link issued");
        self.alerts.dispatch(booking_alert(&name, &email, &booking));
        booking.message
    }
}
