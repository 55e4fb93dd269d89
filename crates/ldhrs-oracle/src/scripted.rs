//! ---
//! ldhrs_section: "05-external-integration"
//! ldhrs_subsection: "module"
//! ldhrs_type: "source"
//! ldhrs_scope: "code"
//! ldhrs_description: "Text-generation oracle boundary."
//! ldhrs_version: "v0.0.0-prealpha"
//! ldhrs_owner: "tbd"
//! ---
use std::collections::VecDeque;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;

use crate::{OracleError, OracleRequest, TextOracle};

/// Most recent requests kept for inspection.
pub const REQUEST_LOG_LIMIT: usize = 64;

#[derive(Debug, Default)]
struct Script {
    pending: VecDeque<Result<String, OracleError>>,
    last: Option<Result<String, OracleError>>,
    requests: VecDeque<OracleRequest>,
    served: usize,
}

/// Oracle that replays canned replies in order and keeps repeating the last one.
///
/// Only the last [`REQUEST_LOG_LIMIT`] requests are kept; the count covers all.
#[derive(Debug, Default)]
pub struct ScriptedOracle {
    script: Mutex<Script>,
    latency: Option<Duration>,
}

impl ScriptedOracle {
    pub fn new<I>(replies: I) -> Self
    where
        I: IntoIterator<Item = Result<String, OracleError>>,
    {
        Self {
            script: Mutex::new(Script {
                pending: replies.into_iter().collect(),
                ..Script::default()
            }),
            latency: None,
        }
    }

    pub fn repeating(reply: Result<String, OracleError>) -> Self {
        Self::new([reply])
    }

    /// Delay every reply, simulating a slow backend.
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    /// Append a reply to the end of the script.
    pub fn push(&self, reply: Result<String, OracleError>) {
        self.script.lock().pending.push_back(reply);
    }

    /// Recorded requests, oldest first.
    pub fn requests(&self) -> Vec<OracleRequest> {
        self.script.lock().requests.iter().cloned().collect()
    }

    pub fn request_count(&self) -> usize {
        self.script.lock().served
    }
}

#[async_trait]
impl TextOracle for ScriptedOracle {
    async fn generate(&self, request: OracleRequest) -> Result<String, OracleError> {
        let reply = {
            let mut script = self.script.lock();
            if script.requests.len() == REQUEST_LOG_LIMIT {
                script.requests.pop_front();
            }
            script.requests.push_back(request);
            script.served += 1;
            match script.pending.pop_front() {
                Some(reply) => {
                    script.last = Some(reply.clone());
                    reply
                }
                None => script.last.clone().unwrap_or(Err(OracleError::EmptyResponse)),
            }
        };
        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }
        reply
    }
}
