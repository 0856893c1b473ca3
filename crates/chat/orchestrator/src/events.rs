use nothing_store::Message;

use crate::intent::Intent;

/// Receives progress from a running turn
///
/// Every method has an empty default, so sinks implement only what they show.
pub trait ChatEvents: Send {
    /// The turn was routed to `intent` and a request is about to start
    fn on_dispatch(&mut self, _intent: Intent) {}

    /// A streamed fragment of the assistant reply
    fn on_token(&mut self, _token: &str) {}

    /// The finished assistant message, text or image
    fn on_message(&mut self, _message: &Message) {}
}

/// Sink that ignores everything
#[derive(Debug, Default, Clone, Copy)]
pub struct NoEvents;

impl ChatEvents for NoEvents {}
