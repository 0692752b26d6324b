//! Persona priming
//!
//! Every conversation opens with a context-setting turn (who the assistant
//! speaks for, what it knows, how to use the tools) and a fixed
//! acknowledgment from the model.

use crate::config::PersonaConfig;
use crate::llm::LlmMessage;
use std::fmt::Write;

const BEHAVIOUR: &str = r"Your goal is to help potential clients understand this person's skills and experience, and to encourage them to book a consultation. Keep your answers concise and helpful.

Scheduling:
- When the visitor asks about availability or wants to meet, call getAvailableTimes.
- Before calling bookMeeting you need the visitor's name and email address. If either is missing, ask for it; never guess.
- Always pass booking links on to the visitor exactly as the tools return them.";

const ACKNOWLEDGMENT: &str = "Understood. I will act as a friendly and professional guide for potential clients, keep my responses concise and helpful, and use the scheduling tools to help them connect.";

/// Build the priming text for `persona`
pub fn priming_text(persona: &PersonaConfig) -> String {
    let mut text = format!(
        "You are a friendly and professional AI assistant for {}, {}.\n\n{BEHAVIOUR}",
        persona.name, persona.description
    );

    let knowledge = persona.knowledge_base.trim();
    if !knowledge.is_empty() {
        let _ = write!(
            text,
            "\n\nAnswer questions using the following background about {}. If something is not covered, say so and suggest booking a consultation.\n\n<knowledge_base>\n{knowledge}\n</knowledge_base>",
            persona.name
        );
    }

    text
}

/// The two turns every conversation starts with
pub fn priming_turns(persona: &PersonaConfig) -> Vec<LlmMessage> {
    vec![
        LlmMessage::user(priming_text(persona)),
        LlmMessage::model(ACKNOWLEDGMENT),
    ]
}
