//! Call dispatcher
//!
//! Serializes accepted requests and cancels and writes them to a transport.
//! Writes are not retried; a failed write is returned to the caller.

use crate::error::ClientError;
use crate::schema::CallTarget;
use crate::transport::Transport;
use crate::types::{CallRequest, CancelRequest};
use tracing::info;

/// Writes call and cancel messages for one building group
#[derive(Debug, Clone)]
pub struct CallDispatcher {
    target: CallTarget,
}

impl CallDispatcher {
    /// Dispatcher addressing `target`
    pub fn new(target: CallTarget) -> Self {
        Self { target }
    }

    /// Wire text of the call message for `request`
    pub fn encode_call(&self, request: &CallRequest) -> Result<String, ClientError> {
        Ok(serde_json::to_string(&self.target.call_message(request))?)
    }

    /// Wire text of the cancel message for `cancel`
    pub fn encode_cancel(&self, cancel: &CancelRequest) -> Result<String, ClientError> {
        Ok(serde_json::to_string(&self.target.cancel_message(cancel))?)
    }

    /// Send an accepted call.
    pub async fn dispatch<T: Transport>(
        &self,
        transport: &mut T,
        request: &CallRequest,
    ) -> Result<(), ClientError> {
        let text = self.encode_call(request)?;
        info!(request_id = request.request_id, payload = %text, "sending call");
        transport.send_text(text).await?;
        Ok(())
    }

    /// Send a cancel for an in-flight call.
    pub async fn dispatch_cancel<T: Transport>(
        &self,
        transport: &mut T,
        cancel: &CancelRequest,
    ) -> Result<(), ClientError> {
        let text = self.encode_cancel(cancel)?;
        info!(session_id = %cancel.session_id, payload = %text, "sending cancel");
        transport.send_text(text).await?;
        Ok(())
    }
}
