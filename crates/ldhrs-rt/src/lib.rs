//! ---
//! ldhrs_section: "01-core-functionality"
//! ldhrs_subsection: "module"
//! ldhrs_type: "source"
//! ldhrs_scope: "code"
//! ldhrs_description: "Runtime helpers supporting the controller."
//! ldhrs_version: "v0.0.0-prealpha"
//! ldhrs_owner: "tbd"
//! ---
//! Periodic scheduling helpers for the LDHRS runtime.

pub mod scheduling;

pub use scheduling::{RateLimiter, TaskSet};
