//! Process configuration, read once from the environment at startup
//!
//! Missing credentials for the minimum scheduling tier are fatal: the server
//! refuses to start rather than failing each request.

use crate::llm::GEMINI_DEFAULT_BASE_URL;
use crate::notify::RESEND_DEFAULT_BASE_URL;
use crate::scheduling::CALENDLY_DEFAULT_BASE_URL;
use reqwest::Url;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;

const DEFAULT_MODEL: &str = "gemini-2.0-flash";
const DEFAULT_FROM: &str = "Concierge <onboarding@resend.dev>";
const DEFAULT_PERSONA_NAME: &str = "the consultant";
const DEFAULT_PERSONA_DESCRIPTION: &str =
    "an independent consultant who helps clients plan and deliver projects";
const DEFAULT_MAX_TOOL_ROUNDS: usize = 5;
const DEFAULT_MAX_OUTPUT_TOKENS: u32 = 200;
const DEFAULT_LLM_TIMEOUT_SECS: u64 = 30;
const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 10;
const DEFAULT_PORT: u16 = 8000;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{0} environment variable not set")]
    Missing(&'static str),

    #[error("{name} has an invalid value {value:?}: {reason}")]
    Invalid {
        name: &'static str,
        value: String,
        reason: String,
    },

    #[error("failed to read knowledge base {path}: {source}")]
    KnowledgeBase {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Language model settings
#[derive(Debug, Clone)]
pub struct LlmConfig {
    pub api_key: String,
    pub model: String,
    pub base_url: String,
    pub timeout: Duration,
    pub max_output_tokens: u32,
}

/// Transactional email settings
#[derive(Debug, Clone)]
pub struct NotifyConfig {
    pub api_key: String,
    pub from: String,
    pub to: String,
    pub base_url: String,
}

/// Scheduling service settings; which fields are present picks the tier
#[derive(Debug, Clone)]
pub struct SchedulingConfig {
    pub api_token: Option<String>,
    pub event_slug: Option<String>,
    pub base_url: String,
    pub fallback_url: String,
}

/// Who the assistant speaks for, and what it knows
#[derive(Debug, Clone)]
pub struct PersonaConfig {
    pub name: String,
    pub description: String,
    pub knowledge_base: String,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub llm: LlmConfig,
    pub notify: NotifyConfig,
    pub scheduling: SchedulingConfig,
    pub persona: PersonaConfig,
    pub max_tool_rounds: usize,
    pub http_timeout: Duration,
    pub port: u16,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build configuration from an arbitrary variable source.
    ///
    /// Blank values are treated as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| {
            lookup(name)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };
        let require = |name: &'static str| get(name).ok_or(ConfigError::Missing(name));

        let fallback_url = require("BOOKING_FALLBACK_URL")?;
        if let Err(e) = Url::parse(&fallback_url) {
            return Err(ConfigError::Invalid {
                name: "BOOKING_FALLBACK_URL",
                value: fallback_url,
                reason: e.to_string(),
            });
        }

        let llm = LlmConfig {
            api_key: require("GEMINI_API_KEY")?,
            model: get("GEMINI_MODEL").unwrap_or_else(|| DEFAULT_MODEL.to_string()),
            base_url: get("GEMINI_BASE_URL")
                .unwrap_or_else(|| GEMINI_DEFAULT_BASE_URL.to_string()),
            timeout: Duration::from_secs(parse_or(
                &get,
                "LLM_TIMEOUT_SECS",
                DEFAULT_LLM_TIMEOUT_SECS,
            )?),
            max_output_tokens: parse_or(&get, "MAX_OUTPUT_TOKENS", DEFAULT_MAX_OUTPUT_TOKENS)?,
        };

        let notify = NotifyConfig {
            api_key: require("RESEND_API_KEY")?,
            from: get("NOTIFY_FROM").unwrap_or_else(|| DEFAULT_FROM.to_string()),
            to: require("NOTIFY_TO")?,
            base_url: get("RESEND_BASE_URL")
                .unwrap_or_else(|| RESEND_DEFAULT_BASE_URL.to_string()),
        };

        let scheduling = SchedulingConfig {
            api_token: get("CALENDLY_API_TOKEN"),
            event_slug: get("CALENDLY_EVENT_SLUG"),
            base_url: get("CALENDLY_BASE_URL")
                .unwrap_or_else(|| CALENDLY_DEFAULT_BASE_URL.to_string()),
            fallback_url,
        };

        let knowledge_base = match get("KNOWLEDGE_BASE_PATH") {
            Some(path) => {
                let path = PathBuf::from(path);
                std::fs::read_to_string(&path)
                    .map_err(|source| ConfigError::KnowledgeBase { path, source })?
            }
            None => String::new(),
        };

        let persona = PersonaConfig {
            name: get("PERSONA_NAME").unwrap_or_else(|| DEFAULT_PERSONA_NAME.to_string()),
            description: get("PERSONA_DESCRIPTION")
                .unwrap_or_else(|| DEFAULT_PERSONA_DESCRIPTION.to_string()),
            knowledge_base,
        };

        let max_tool_rounds = parse_or(&get, "MAX_TOOL_ROUNDS", DEFAULT_MAX_TOOL_ROUNDS)?;
        if max_tool_rounds == 0 {
            return Err(ConfigError::Invalid {
                name: "MAX_TOOL_ROUNDS",
                value: "0".to_string(),
                reason: "must be at least 1".to_string(),
            });
        }

        Ok(Self {
            llm,
            notify,
            scheduling,
            persona,
            max_tool_rounds,
            http_timeout: Duration::from_secs(parse_or(
                &get,
                "HTTP_TIMEOUT_SECS",
                DEFAULT_HTTP_TIMEOUT_SECS,
            )?),
            port: parse_or(&get, "CONCIERGE_PORT", DEFAULT_PORT)?,
        })
    }
}

fn parse_or<T, G>(get: &G, name: &'static str, default: T) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
    G: Fn(&str) -> Option<String>,
{
    match get(name) {
        None => Ok(default),
        Some(raw) => raw.parse().map_err(|e: T::Err| ConfigError::Invalid {
            name,
            value: raw,
            reason: e.to_string(),
        }),
    }
}
