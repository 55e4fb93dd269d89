//! ---
//! ldhrs_section: "04-audit"
//! ldhrs_subsection: "module"
//! ldhrs_type: "source"
//! ldhrs_scope: "code"
//! ldhrs_description: "On-demand system audit through the text oracle."
//! ldhrs_version: "v0.0.0-prealpha"
//! ldhrs_owner: "tbd"
//! ---
use chrono::{DateTime, Utc};
use ldhrs_oracle::{OracleRequest, RequestPurpose, TextOracle};
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::state::SystemState;

/// Stored in place of the audit text when the oracle call fails.
pub const AUDIT_FALLBACK: &str = "Unable to connect to AI core.";

/// Isolated audit result slot. Never read by the safety policy.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum AuditState {
    #[default]
    Idle,
    Pending {
        requested_by: String,
    },
    Ready {
        requested_by: String,
        text: String,
        fallback: bool,
        completed_at: DateTime<Utc>,
    },
}

impl AuditState {
    pub fn is_pending(&self) -> bool {
        matches!(self, AuditState::Pending { .. })
    }

    pub fn text(&self) -> Option<&str> {
        match self {
            AuditState::Ready { text, .. } => Some(text),
            _ => None,
        }
    }
}

/// Answer to [`crate::ControllerHandle::request_audit`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditRequest {
    Started,
    /// Another audit is still in flight; this request was folded into it.
    AlreadyPending,
}

/// Terminal result of one audit call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuditOutcome {
    pub text: String,
    pub fallback: bool,
}

pub fn audit_prompt(state: &SystemState, identity: &str, location: &str) -> String {
    let weather = if state.weather.status_text.is_empty() {
        "unknown"
    } else {
        state.weather.status_text.as_str()
    };
    format!(
        "You are the maintenance analyst for an LDHRS dual-axis solar tracker installed in \
{location}, operated by {identity}. Current readings: voltage {:.2} V, current {:.2} A, \
panel temperature {:.1}°C, dust accumulation {}%. Weather status: {weather}. Give a short \
audit covering whether panel cleaning is needed and how resilient the array is to the \
current weather.",
        state.telemetry.voltage, state.telemetry.current, state.telemetry.temperature, state.dust,
    )
}

/// Run one audit. Oracle failures become [`AUDIT_FALLBACK`].
pub async fn run_audit(
    oracle: &dyn TextOracle,
    state: &SystemState,
    identity: &str,
    location: &str,
    web_search: bool,
) -> AuditOutcome {
    let request = OracleRequest::new(audit_prompt(state, identity, location))
        .with_web_search(web_search)
        .with_purpose(RequestPurpose::Audit);
    match oracle.generate(request).await {
        Ok(text) => AuditOutcome {
            text,
            fallback: false,
        },
        Err(err) => {
            warn!(error = %err, "audit request failed, storing fallback");
            AuditOutcome {
                text: AUDIT_FALLBACK.to_owned(),
                fallback: true,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ldhrs_oracle::{OfflineOracle, OracleError, ScriptedOracle, OFFLINE_WEATHER_REPLY};

    #[test]
    fn prompt_carries_readings_and_identity() {
        let prompt = audit_prompt(&SystemState::default().with_dust(20), "op@ldhrs.io", "Multan");
        assert!(prompt.contains("op@ldhrs.io"));
        assert!(prompt.contains("Multan"));
        assert!(prompt.contains("18.40 V"));
        assert!(prompt.contains("20%"));
        assert!(prompt.contains("Weather status: unknown"));
    }

    #[tokio::test]
    async fn reply_is_stored_verbatim() {
        let oracle = ScriptedOracle::repeating(Ok("  clean the panels  ".into()));
        let outcome = run_audit(&oracle, &SystemState::default(), "a@b.co", "X", false).await;
        assert_eq!(outcome.text, "  clean the panels  ");
        assert!(!outcome.fallback);
    }

    #[tokio::test]
    async fn failure_uses_fallback() {
        let oracle = ScriptedOracle::repeating(Err(OracleError::Transport("reset".into())));
        let outcome = run_audit(&oracle, &SystemState::default(), "a@b.co", "X", true).await;
        assert_eq!(outcome.text, AUDIT_FALLBACK);
        assert!(outcome.fallback);
        let request = &oracle.requests()[0];
        assert!(request.web_search);
        assert_eq!(request.purpose, RequestPurpose::Audit);
    }

    #[tokio::test]
    async fn offline_audit_is_not_a_weather_line() {
        let outcome = run_audit(&OfflineOracle, &SystemState::default(), "a@b.co", "X", false).await;
        assert!(!outcome.fallback);
        assert_ne!(outcome.text, OFFLINE_WEATHER_REPLY);
        assert!(!outcome.text.contains("Current temperature is"));
    }

    #[test]
    fn audit_state_accessors() {
        assert!(!AuditState::Idle.is_pending());
        assert!(AuditState::Pending {
            requested_by: "a".into()
        }
        .is_pending());
        assert_eq!(AuditState::Idle.text(), None);
    }
}
