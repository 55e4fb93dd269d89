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

use async_trait::async_trait;
use ldhrs_common::config::OracleConfig;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::debug;

use crate::{OracleError, OracleRequest, TextOracle};

/// Client for a `generateContent` style completion endpoint.
#[derive(Debug, Clone)]
pub struct HttpOracle {
    client: reqwest::Client,
    endpoint: String,
    model: String,
    api_key_env: String,
    api_key: Option<String>,
    timeout: Duration,
}

impl HttpOracle {
    pub fn from_config(config: &OracleConfig) -> Result<Self, OracleError> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout_secs)
            .user_agent(concat!("ldhrsd/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|err| OracleError::Transport(err.to_string()))?;
        Ok(Self {
            client,
            endpoint: config.endpoint.trim_end_matches('/').to_owned(),
            model: config.model.clone(),
            api_key_env: config.api_key_env.clone(),
            api_key: config.api_key(),
            timeout: config.timeout_secs,
        })
    }

    fn url(&self) -> String {
        format!("{}/models/{}:generateContent", self.endpoint, self.model)
    }
}

#[async_trait]
impl TextOracle for HttpOracle {
    async fn generate(&self, request: OracleRequest) -> Result<String, OracleError> {
        let Some(api_key) = self.api_key.as_deref() else {
            return Err(OracleError::MissingApiKey(self.api_key_env.clone()));
        };
        debug!(model = %self.model, web_search = request.web_search, "sending oracle request");
        let response = self
            .client
            .post(self.url())
            .query(&[("key", api_key)])
            .json(&request_body(&request))
            .send()
            .await
            .map_err(|err| self.transport_error(err))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|err| self.transport_error(err))?;
        if !status.is_success() {
            return Err(OracleError::Status {
                status: status.as_u16(),
                body: truncate(&body, 256),
            });
        }
        parse_response(&body)
    }
}

impl HttpOracle {
    fn transport_error(&self, err: reqwest::Error) -> OracleError {
        if err.is_timeout() {
            OracleError::Timeout(self.timeout)
        } else {
            OracleError::Transport(err.to_string())
        }
    }
}

pub(crate) fn request_body(request: &OracleRequest) -> Value {
    let mut body = json!({
        "contents": [{ "parts": [{ "text": request.prompt }] }],
    });
    if request.web_search {
        body["tools"] = json!([{ "google_search": {} }]);
    }
    body
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    #[serde(default)]
    content: Option<Content>,
}

#[derive(Debug, Deserialize)]
struct Content {
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Debug, Deserialize)]
struct Part {
    #[serde(default)]
    text: Option<String>,
}

/// Concatenate the text parts of the first candidate.
pub(crate) fn parse_response(body: &str) -> Result<String, OracleError> {
    let parsed: GenerateResponse =
        serde_json::from_str(body).map_err(|err| OracleError::Decode(err.to_string()))?;
    let text: String = parsed
        .candidates
        .into_iter()
        .next()
        .and_then(|candidate| candidate.content)
        .map(|content| {
            content
                .parts
                .into_iter()
                .filter_map(|part| part.text)
                .collect()
        })
        .unwrap_or_default();
    if text.trim().is_empty() {
        return Err(OracleError::EmptyResponse);
    }
    Ok(text)
}

fn truncate(body: &str, max_chars: usize) -> String {
    body.chars().take(max_chars).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn body_includes_search_tool_only_when_requested() {
        let plain = request_body(&OracleRequest::new("hello"));
        assert_eq!(plain["contents"][0]["parts"][0]["text"], "hello");
        assert!(plain.get("tools").is_none());

        let grounded = request_body(&OracleRequest::new("weather").with_web_search(true));
        assert!(grounded["tools"][0].get("google_search").is_some());
    }

    #[test]
    fn joins_text_parts_of_first_candidate() {
        let body = r#"{
            "candidates": [
                {"content": {"parts": [{"text": "Current temperature is 30°C. "}, {"text": "Condition is Sunny."}]}},
                {"content": {"parts": [{"text": "ignored"}]}}
            ]
        }"#;
        assert_eq!(
            parse_response(body).unwrap(),
            "Current temperature is 30°C. Condition is Sunny."
        );
    }

    #[test]
    fn empty_candidates_are_an_error() {
        assert_eq!(
            parse_response(r#"{"candidates": []}"#),
            Err(OracleError::EmptyResponse)
        );
        assert_eq!(
            parse_response(r#"{"candidates": [{"content": {"parts": [{}]}}]}"#),
            Err(OracleError::EmptyResponse)
        );
    }

    #[test]
    fn malformed_json_is_a_decode_error() {
        assert!(matches!(
            parse_response("<html>bad gateway</html>"),
            Err(OracleError::Decode(_))
        ));
    }

    #[tokio::test]
    async fn missing_api_key_fails_without_network() {
        let config = OracleConfig {
            api_key_env: "LDHRS_TEST_KEY_THAT_IS_NEVER_SET".into(),
            ..OracleConfig::default()
        };
        let oracle = HttpOracle::from_config(&config).unwrap();
        let err = oracle
            .generate(OracleRequest::new("ping"))
            .await
            .expect_err("no key configured");
        assert_eq!(
            err,
            OracleError::MissingApiKey("LDHRS_TEST_KEY_THAT_IS_NEVER_SET".into())
        );
    }
}
