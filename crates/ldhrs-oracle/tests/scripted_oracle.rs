//! ---
//! ldhrs_section: "05-external-integration"
//! ldhrs_subsection: "tests"
//! ldhrs_type: "test"
//! ldhrs_scope: "code"
//! ldhrs_description: "Scripted and offline oracle behaviour."
//! ldhrs_version: "v0.0.0-prealpha"
//! ldhrs_owner: "tbd"
//! ---
use ldhrs_common::config::{OracleConfig, OracleMode};
use ldhrs_oracle::{
    from_config, OracleError, OracleRequest, RequestPurpose, ScriptedOracle, TextOracle,
    OFFLINE_AUDIT_REPLY, OFFLINE_WEATHER_REPLY, REQUEST_LOG_LIMIT,
};

#[tokio::test]
async fn replays_in_order_then_repeats_last() {
    let oracle = ScriptedOracle::new([
        Ok("first".to_owned()),
        Err(OracleError::Transport("down".into())),
        Ok("third".to_owned()),
    ]);
    let ask = || oracle.generate(OracleRequest::new("q"));
    assert_eq!(ask().await.unwrap(), "first");
    assert!(ask().await.is_err());
    assert_eq!(ask().await.unwrap(), "third");
    assert_eq!(ask().await.unwrap(), "third");
    assert_eq!(oracle.request_count(), 4);
}

#[tokio::test]
async fn empty_script_answers_with_empty_response() {
    let oracle = ScriptedOracle::default();
    assert_eq!(
        oracle.generate(OracleRequest::new("q")).await,
        Err(OracleError::EmptyResponse)
    );
}

#[tokio::test]
async fn records_prompts_and_search_flag() {
    let oracle = ScriptedOracle::repeating(Ok("ok".into()));
    oracle
        .generate(OracleRequest::new("forecast please").with_web_search(true))
        .await
        .unwrap();
    let requests = oracle.requests();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].prompt, "forecast please");
    assert!(requests[0].web_search);
}

#[tokio::test]
async fn request_log_keeps_only_the_latest() {
    let oracle = ScriptedOracle::repeating(Ok("ok".into()));
    let total = REQUEST_LOG_LIMIT + 36;
    for index in 0..total {
        oracle
            .generate(OracleRequest::new(format!("prompt {index}")))
            .await
            .unwrap();
    }
    assert_eq!(oracle.request_count(), total);
    let requests = oracle.requests();
    assert_eq!(requests.len(), REQUEST_LOG_LIMIT);
    assert_eq!(requests[0].prompt, format!("prompt {}", total - REQUEST_LOG_LIMIT));
    assert_eq!(requests[REQUEST_LOG_LIMIT - 1].prompt, format!("prompt {}", total - 1));
}

#[tokio::test]
async fn offline_mode_answers_by_purpose() {
    let config = OracleConfig {
        mode: OracleMode::Offline,
        ..OracleConfig::default()
    };
    let oracle = from_config(&config).unwrap();
    let weather = oracle
        .generate(OracleRequest::new("weather").with_purpose(RequestPurpose::Weather))
        .await
        .unwrap();
    assert_eq!(weather, OFFLINE_WEATHER_REPLY);
    let audit = oracle
        .generate(OracleRequest::new("audit").with_purpose(RequestPurpose::Audit))
        .await
        .unwrap();
    assert_eq!(audit, OFFLINE_AUDIT_REPLY);
    assert_ne!(audit, weather);
}
