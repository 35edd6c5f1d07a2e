//! Inbound message handlers.

use crate::schema::InboundFrame;
use chrono::Utc;
use tracing::info;

/// Receives every inbound frame
pub trait MessageHandler: Send {
    /// Observe one frame
    fn on_message(&mut self, frame: &InboundFrame);
}

impl<F> MessageHandler for F
where
    F: FnMut(&InboundFrame) + Send,
{
    fn on_message(&mut self, frame: &InboundFrame) {
        self(frame)
    }
}

/// Default handler: logs each message, its call types and arrival time.
#[derive(Debug, Default, Clone, Copy)]
pub struct LoggingHandler;

impl MessageHandler for LoggingHandler {
    fn on_message(&mut self, frame: &InboundFrame) {
        let received_at = Utc::now().to_rfc3339();
        match &frame.json {
            Some(json) => info!(message = %json, "Incoming WebSocket message"),
            None => info!(raw = %frame.raw, "Incoming non-JSON WebSocket message"),
        }
        if let Some(call_types) = frame.call_types() {
            info!(%call_types, "call types");
        }
        info!(%received_at, "timing");
    }
}
