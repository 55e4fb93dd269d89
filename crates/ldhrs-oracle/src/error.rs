//! ---
//! ldhrs_section: "05-external-integration"
//! ldhrs_subsection: "module"
//! ldhrs_type: "source"
//! ldhrs_scope: "code"
//! ldhrs_description: "Text-generation oracle boundary."
//! ldhrs_version: "v0.0.0-prealpha"
//! ldhrs_owner: "tbd"
//! ---
use std::time::Duration;

use thiserror::Error;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum OracleError {
    #[error("oracle api key missing; set {0}")]
    MissingApiKey(String),
    #[error("oracle transport failure: {0}")]
    Transport(String),
    #[error("oracle returned HTTP {status}: {body}")]
    Status { status: u16, body: String },
    #[error("oracle request timed out after {0:?}")]
    Timeout(Duration),
    #[error("oracle response could not be decoded: {0}")]
    Decode(String),
    #[error("oracle returned no text")]
    EmptyResponse,
}
