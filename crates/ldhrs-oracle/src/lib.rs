//! ---
//! ldhrs_section: "05-external-integration"
//! ldhrs_subsection: "module"
//! ldhrs_type: "source"
//! ldhrs_scope: "code"
//! ldhrs_description: "Text-generation oracle boundary."
//! ldhrs_version: "v0.0.0-prealpha"
//! ldhrs_owner: "tbd"
//! ---
//! Opaque request/response access to a text-generation service.
//!
//! Responses are free text. Callers may only search them for substrings; no
//! structure is promised.

use std::sync::Arc;

use async_trait::async_trait;
use ldhrs_common::config::{OracleConfig, OracleMode};

mod error;
mod http;
mod offline;
mod scripted;

pub use error::OracleError;
pub use http::HttpOracle;
pub use offline::{OfflineOracle, OFFLINE_AUDIT_REPLY, OFFLINE_WEATHER_REPLY};
pub use scripted::{ScriptedOracle, REQUEST_LOG_LIMIT};

/// What a prompt asks for. The HTTP backend ignores it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RequestPurpose {
    #[default]
    General,
    Weather,
    Audit,
}

/// A single prompt sent to the oracle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OracleRequest {
    pub prompt: String,
    /// Ask the backend to augment the answer with a web search.
    pub web_search: bool,
    pub purpose: RequestPurpose,
}

impl OracleRequest {
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            web_search: false,
            purpose: RequestPurpose::General,
        }
    }

    pub fn with_web_search(mut self, enabled: bool) -> Self {
        self.web_search = enabled;
        self
    }

    pub fn with_purpose(mut self, purpose: RequestPurpose) -> Self {
        self.purpose = purpose;
        self
    }
}

/// Text-completion endpoint.
#[async_trait]
pub trait TextOracle: Send + Sync + std::fmt::Debug {
    async fn generate(&self, request: OracleRequest) -> Result<String, OracleError>;
}

/// Build the oracle selected by configuration.
pub fn from_config(config: &OracleConfig) -> Result<Arc<dyn TextOracle>, OracleError> {
    match config.mode {
        OracleMode::Http => Ok(Arc::new(HttpOracle::from_config(config)?)),
        OracleMode::Offline => Ok(Arc::new(OfflineOracle)),
    }
}
