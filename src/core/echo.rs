use tracing::Span;

use crate::{api::EchoMessage, ports::echo::Echo, tracing_setup};

/// Reflects a message/author pair back to the caller unchanged.
///
/// The only side effect is an info-level log line emitted inside the
/// service's own component span.
#[derive(Debug, Clone)]
pub struct EchoService {
    span: Span,
}

impl EchoService {
    pub fn new() -> Self {
        Self::with_span(tracing_setup::configure_component_tracing("echo_service"))
    }

    /// Build a service that logs under an explicitly provided span
    pub fn with_span(span: Span) -> Self {
        Self { span }
    }
}

impl Default for EchoService {
    fn default() -> Self {
        Self::new()
    }
}

impl Echo for EchoService {
    fn echo(&self, request: EchoMessage) -> EchoMessage {
        self.span.in_scope(|| {
            tracing::info!(
                message = %request.message,
                author = %request.author,
                "Processing echo request"
            );
        });

        EchoMessage {
            message: request.message,
            author: request.author,
        }
    }
}
