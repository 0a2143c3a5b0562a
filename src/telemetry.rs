//! Logging setup and span constructors.

use tracing_subscriber::EnvFilter;

/// Install the global subscriber.
///
/// Logs go to stderr; stdout may be the delivery sink. The filter comes from
/// `RUST_LOG`, falling back to `info`.
pub fn init() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(true)
        .with_writer(std::io::stderr)
        .init();
}

/// Standardized span constructors.
pub mod spans {
    use tracing::{Span, info_span};

    /// Create a span for one server connection.
    pub fn connection(addr: &str, attempt: u32) -> Span {
        info_span!("connection", addr = %addr, attempt = attempt)
    }

    /// Create a span for the registration handshake.
    pub fn handshake(user: &str, channel: &str) -> Span {
        info_span!("handshake", user = %user, channel = %channel)
    }

    /// Create a span for a responder invocation.
    pub fn responder(name: &str, source: Option<&str>) -> Span {
        if let Some(source) = source {
            info_span!("responder", name = %name, source = %source)
        } else {
            info_span!("responder", name = %name)
        }
    }
}
