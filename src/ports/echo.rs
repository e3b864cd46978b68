use crate::api::EchoMessage;

/// Echo defines the port the HTTP layer uses to reflect a validated message.
///
/// Implementations receive a message whose `message` and `author` are both
/// non-empty; the HTTP adapter rejects anything else before calling in.
pub trait Echo: Send + Sync + 'static {
    /// Return the response for a validated request
    fn echo(&self, request: EchoMessage) -> EchoMessage;
}
