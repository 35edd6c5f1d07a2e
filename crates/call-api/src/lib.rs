//! Lift-call API client
//!
//! Places destination calls on a vendor elevator gateway over WebSocket.
//! It handles:
//! - Client-side validation of candidate calls against a local policy
//! - Locally synthesized, gateway-shaped events for refused calls
//! - Call dispatch in the `lift-call-api-v2` wire format
//! - Call/cancel correlation on the gateway's session id
//! - OAuth2 client-credentials token acquisition
//! - The WebSocket transport itself
//!
//! # Pipeline
//!
//! 1. [`RequestValidator`] decides: forward, reject or cancel
//! 2. [`CallDispatcher`] writes accepted calls to a [`Transport`]
//! 3. In cancel-test mode, [`ResponseCorrelator`] waits for the first
//!    session id and cancels that session after a fixed delay
//!
//! A refused call is never written; exactly one synthesized event is logged
//! in its place.
//!
//! # Examples
//!
//! ```no_run
//! use liftcall_api::{CallFlow, CallRequest, LoggingHandler, RunMode, WsTransport};
//! use liftcall_core::Config;
//!
//! # async fn example(token: &str) -> Result<(), liftcall_api::ClientError> {
//! let config = Config::load(None)?;
//! let flow = CallFlow::from_config(&config);
//! let request = CallRequest::destination_call(1000, 3000, 1);
//!
//! if let liftcall_api::ValidationOutcome::Accepted(accepted) = flow.screen(&request) {
//!     let mut transport = WsTransport::open(&config.gateway.api_host, token).await?;
//!     flow.execute(&mut transport, &accepted, RunMode::Observe, LoggingHandler).await?;
//! }
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]

pub mod auth;
pub mod correlator;
pub mod dispatcher;
pub mod error;
pub mod flow;
pub mod handler;
pub mod schema;
pub mod transport;
pub mod types;
pub mod validator;

// Re-export commonly used types
pub use auth::{AccessToken, TokenProvider};
pub use correlator::{CorrelationSummary, CorrelatorState, ResponseCorrelator};
pub use dispatcher::CallDispatcher;
pub use error::{ClientError, TransportError};
pub use flow::{CallFlow, FlowReport, RunMode};
pub use handler::{LoggingHandler, MessageHandler};
pub use schema::{
    migrate_call_payload, CallTarget, InboundFrame, SchemaVersion, SimulatedResponse,
};
pub use transport::{Transport, WsTransport};
pub use types::{CallAction, CallRequest, CancelRequest, SessionHandle};
pub use validator::{RequestValidator, ValidationOutcome, ValidationPolicy};
