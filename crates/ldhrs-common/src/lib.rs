//! ---
//! ldhrs_section: "01-core-functionality"
//! ldhrs_subsection: "module"
//! ldhrs_type: "source"
//! ldhrs_scope: "code"
//! ldhrs_description: "Shared primitives and utilities for the controller runtime."
//! ldhrs_version: "v0.0.0-prealpha"
//! ldhrs_owner: "tbd"
//! ---
//! Core shared primitives for the LDHRS controller workspace.
//! This crate exposes configuration loading, tracing setup, and the
//! operator login gate consumed across the workspace.

pub mod config;
pub mod logging;
pub mod session;

pub use config::{
    AppConfig, ControllerConfig, InitialStateConfig, LoggingConfig, MetricsConfig, OracleConfig,
    OracleMode, WeatherConfig,
};
pub use logging::{init_tracing, LogFormat};
pub use session::{OperatorSession, SessionError};
