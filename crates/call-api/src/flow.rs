//! One call attempt, end to end: validate, dispatch, then observe or cancel.

use crate::correlator::{CorrelationSummary, ResponseCorrelator};
use crate::dispatcher::CallDispatcher;
use crate::error::ClientError;
use crate::handler::MessageHandler;
use crate::schema::{CallTarget, InboundFrame, SimulatedResponse};
use crate::transport::Transport;
use crate::types::CallRequest;
use crate::validator::{RequestValidator, ValidationOutcome, ValidationPolicy};
use liftcall_core::Config;
use std::time::Duration;
use tracing::{info, warn};

/// What to do after the call is written
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RunMode {
    /// Log inbound traffic until the stream closes
    #[default]
    Observe,
    /// Cancel the call once its session id arrives
    CancelTest,
}

/// Result of one call attempt
#[derive(Debug, Clone, PartialEq)]
pub enum FlowReport {
    /// Refused locally; nothing was written
    Refused(ValidationOutcome),
    /// Call written, inbound traffic observed
    Observed {
        /// Inbound frames seen
        frames_seen: usize,
    },
    /// Call written, cancel sequence ran
    CancelTest(CorrelationSummary),
}

/// Validator and dispatcher wired for one building group
#[derive(Debug, Clone)]
pub struct CallFlow {
    validator: RequestValidator,
    dispatcher: CallDispatcher,
    cancel_delay: Duration,
    session_wait_timeout: Option<Duration>,
}

impl CallFlow {
    /// Flow with an explicit policy and target
    pub fn new(policy: ValidationPolicy, target: CallTarget, cancel_delay: Duration) -> Self {
        Self {
            validator: RequestValidator::new(policy),
            dispatcher: CallDispatcher::new(target),
            cancel_delay,
            session_wait_timeout: None,
        }
    }

    /// Flow configured from `config`
    pub fn from_config(config: &Config) -> Self {
        Self::new(
            ValidationPolicy::from(&config.policy),
            CallTarget::from_config(&config.gateway),
            Duration::from_millis(config.call.cancel_delay_ms),
        )
        .with_session_wait_timeout(config.call.session_wait_timeout_ms.map(Duration::from_millis))
    }

    /// Bound the cancel-test wait for a session id
    pub fn with_session_wait_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.session_wait_timeout = timeout;
        self
    }

    /// Validate `request`, logging a synthesized gateway-style event on refusal.
    pub fn screen(&self, request: &CallRequest) -> ValidationOutcome {
        let outcome = self.validator.validate(request);
        if let Some(event) = SimulatedResponse::for_outcome(request.request_id, &outcome) {
            match serde_json::to_string(&event) {
                Ok(json) => info!(message = %json, "Incoming WebSocket message"),
                Err(e) => warn!("could not encode simulated response: {}", e),
            }
        }
        outcome
    }

    /// Validate, then send and follow up per `mode`.
    pub async fn run<T, H>(
        &self,
        transport: &mut T,
        request: &CallRequest,
        mode: RunMode,
        handler: H,
    ) -> Result<FlowReport, ClientError>
    where
        T: Transport,
        H: MessageHandler,
    {
        match self.screen(request) {
            ValidationOutcome::Accepted(accepted) => {
                self.execute(transport, &accepted, mode, handler).await
            }
            refused => Ok(FlowReport::Refused(refused)),
        }
    }

    /// Send an already accepted request and follow up per `mode`.
    pub async fn execute<T, H>(
        &self,
        transport: &mut T,
        accepted: &CallRequest,
        mode: RunMode,
        mut handler: H,
    ) -> Result<FlowReport, ClientError>
    where
        T: Transport,
        H: MessageHandler,
    {
        match mode {
            RunMode::Observe => {
                self.dispatcher.dispatch(transport, accepted).await?;
                let mut frames_seen = 0;
                while let Some(frame) = transport.next_text().await {
                    handler.on_message(&InboundFrame::parse(frame?));
                    frames_seen += 1;
                }
                info!(frames_seen, "gateway stream closed");
                Ok(FlowReport::Observed { frames_seen })
            }
            RunMode::CancelTest => {
                info!("Step 1 - Sending initial call...");
                let mut correlator =
                    ResponseCorrelator::new(self.dispatcher.clone(), handler, self.cancel_delay)
                        .with_session_wait_timeout(self.session_wait_timeout);
                self.dispatcher.dispatch(transport, accepted).await?;
                correlator.mark_dispatched();
                let summary = correlator.run(transport).await?;
                Ok(FlowReport::CancelTest(summary))
            }
        }
    }
}
