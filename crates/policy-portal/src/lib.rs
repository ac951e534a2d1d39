//! Policy submission orchestration for the insurance portal.
//!
//! The [`workflows::submission`] module holds the portal workflow: input
//! validation, integration modes, the outbound adapter, error
//! classification, progress pacing, and the traffic log.

pub mod config;
pub mod error;
pub mod telemetry;
pub mod workflows;
