//! ---
//! ldhrs_section: "05-external-integration"
//! ldhrs_subsection: "module"
//! ldhrs_type: "source"
//! ldhrs_scope: "code"
//! ldhrs_description: "Built-in oracle for running without network access."
//! ldhrs_version: "v0.0.0-prealpha"
//! ldhrs_owner: "tbd"
//! ---
use async_trait::async_trait;
use tracing::trace;

use crate::{OracleError, OracleRequest, RequestPurpose, TextOracle};

/// Fair-weather reply served to weather polls.
pub const OFFLINE_WEATHER_REPLY: &str = "Current temperature is 31°C. Condition is Clear sky. \
Summary: Offline mode, no live forecast available.";

/// Reply served to audits and any other prompt.
pub const OFFLINE_AUDIT_REPLY: &str = "Offline mode: no live analysis available. Compare the \
dust reading against the 15% cleaning threshold and inspect the array manually.";

/// Stateless oracle answering from fixed text by request purpose.
#[derive(Debug, Clone, Copy, Default)]
pub struct OfflineOracle;

#[async_trait]
impl TextOracle for OfflineOracle {
    async fn generate(&self, request: OracleRequest) -> Result<String, OracleError> {
        trace!(purpose = ?request.purpose, "offline oracle reply");
        let reply = match request.purpose {
            RequestPurpose::Weather => OFFLINE_WEATHER_REPLY,
            RequestPurpose::Audit | RequestPurpose::General => OFFLINE_AUDIT_REPLY,
        };
        Ok(reply.to_owned())
    }
}
