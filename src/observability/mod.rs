//! Observability infrastructure
//!
//! Structured logging setup for the orchestrator. All runtime components log
//! through `tracing`; this module owns subscriber initialization and the
//! span macros used around query processing.

pub mod logging;

pub use logging::{init_default_logging, init_logging, LogFormat};
