//! Logging, metrics, and request-context plumbing.
//!
//! This crate is a library, not a service binary: there is no OTLP
//! collector to export spans to, so observability here is deliberately
//! limited to a `tracing-subscriber` logging layer and a Prometheus metrics
//! recorder. A host service composing this crate is expected to layer its
//! own distributed tracing on top.

pub mod logging;
pub mod metrics;
pub mod request_context;

pub use logging::{LogFormat, LoggingConfig};
pub use request_context::{
    RequestContext, current_request_id, enter_request_context, scope_request_context,
};

/// Initializes logging for the process.
///
/// Safe to call more than once; see [`logging::init`].
pub fn init_logging(config: &LoggingConfig) {
    logging::init(config);
}
