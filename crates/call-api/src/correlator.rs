//! Call/cancel correlation.
//!
//! After the initial call is written, the correlator waits for the first
//! inbound message carrying a session id, then cancels that session after a
//! fixed delay. Every inbound frame is forwarded to the pass-through handler
//! whatever the state.
//!
//! ```text
//! Idle -> AwaitingSessionId -> CancelScheduled -> Done
//! ```
//!
//! If the transport closes while a cancel is scheduled, the cancel is dropped.

use crate::dispatcher::CallDispatcher;
use crate::error::ClientError;
use crate::handler::MessageHandler;
use crate::schema::InboundFrame;
use crate::transport::Transport;
use crate::types::{CancelRequest, SessionHandle};
use std::time::Duration;
use tokio::time::{sleep_until, Instant};
use tracing::{debug, info, warn};

/// Correlator state
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CorrelatorState {
    /// Initial call not yet written
    Idle,
    /// Waiting for the first session id
    AwaitingSessionId,
    /// Cancel due at `deadline`
    CancelScheduled {
        /// Session to cancel
        session: SessionHandle,
        /// When the cancel is written
        deadline: Instant,
    },
    /// Cancel written
    Done,
}

/// What a correlation run observed
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CorrelationSummary {
    /// Inbound frames seen
    pub frames_seen: usize,
    /// Session id that was correlated, if any
    pub session_id: Option<String>,
    /// Whether the cancel was written
    pub cancel_sent: bool,
    /// State when the stream ended
    pub final_state: CorrelatorState,
}

/// Session-id correlator for one call attempt
pub struct ResponseCorrelator<H> {
    state: CorrelatorState,
    handler: H,
    dispatcher: CallDispatcher,
    cancel_delay: Duration,
    session_wait_timeout: Option<Duration>,
    frames_seen: usize,
    correlated: Option<String>,
}

impl<H: MessageHandler> ResponseCorrelator<H> {
    /// Correlator forwarding frames to `handler`
    pub fn new(dispatcher: CallDispatcher, handler: H, cancel_delay: Duration) -> Self {
        Self {
            state: CorrelatorState::Idle,
            handler,
            dispatcher,
            cancel_delay,
            session_wait_timeout: None,
            frames_seen: 0,
            correlated: None,
        }
    }

    /// Bound the wait for a session id. `None` waits until the stream closes.
    pub fn with_session_wait_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.session_wait_timeout = timeout;
        self
    }

    /// Current state
    pub fn state(&self) -> &CorrelatorState {
        &self.state
    }

    /// Record that the initial call was written.
    pub fn mark_dispatched(&mut self) {
        if self.state == CorrelatorState::Idle {
            self.state = CorrelatorState::AwaitingSessionId;
        }
    }

    /// Feed one inbound frame. Returns the session when this frame scheduled the cancel.
    pub fn on_frame(&mut self, frame: &InboundFrame, now: Instant) -> Option<SessionHandle> {
        self.frames_seen += 1;
        self.handler.on_message(frame);

        let session_id = frame.session_id()?;
        if self.state != CorrelatorState::AwaitingSessionId {
            debug!(%session_id, "ignoring session id; already correlated");
            return None;
        }

        info!(%session_id, "Session ID received");
        let session = SessionHandle { session_id };
        self.correlated = Some(session.session_id.clone());
        self.state = CorrelatorState::CancelScheduled {
            session: session.clone(),
            deadline: now + self.cancel_delay,
        };
        Some(session)
    }

    /// Take the scheduled cancel once its deadline has passed.
    pub fn take_due_cancel(&mut self, now: Instant) -> Option<CancelRequest> {
        match &self.state {
            CorrelatorState::CancelScheduled { session, deadline } if *deadline <= now => {
                let cancel = CancelRequest::from(session.clone());
                self.state = CorrelatorState::Done;
                Some(cancel)
            }
            _ => None,
        }
    }

    fn cancel_deadline(&self) -> Option<Instant> {
        match &self.state {
            CorrelatorState::CancelScheduled { deadline, .. } => Some(*deadline),
            _ => None,
        }
    }

    fn summary(&self) -> CorrelationSummary {
        CorrelationSummary {
            frames_seen: self.frames_seen,
            session_id: self.correlated.clone(),
            cancel_sent: self.state == CorrelatorState::Done,
            final_state: self.state.clone(),
        }
    }

    /// Drive the correlator until the transport closes.
    ///
    /// The initial call must already have been written; the state moves to
    /// `AwaitingSessionId` on entry if it is still `Idle`.
    pub async fn run<T: Transport>(
        &mut self,
        transport: &mut T,
    ) -> Result<CorrelationSummary, ClientError> {
        self.mark_dispatched();
        let wait_deadline = self.session_wait_timeout.map(|t| (Instant::now() + t, t));

        loop {
            let cancel_at = self.cancel_deadline();
            let awaiting = self.state == CorrelatorState::AwaitingSessionId;
            let give_up_at = wait_deadline.filter(|_| awaiting);

            tokio::select! {
                frame = transport.next_text() => match frame {
                    Some(Ok(raw)) => {
                        self.on_frame(&InboundFrame::parse(raw), Instant::now());
                    }
                    Some(Err(e)) => return Err(e.into()),
                    None => {
                        if let CorrelatorState::CancelScheduled { session, .. } = &self.state {
                            warn!(
                                session_id = %session.session_id,
                                "transport closed before the cancel was due; cancel suppressed"
                            );
                        }
                        break;
                    }
                },
                _ = sleep_until(cancel_at.unwrap_or_else(Instant::now)), if cancel_at.is_some() => {
                    if let Some(cancel) = self.take_due_cancel(Instant::now()) {
                        self.dispatcher.dispatch_cancel(transport, &cancel).await?;
                    }
                }
                _ = sleep_until(give_up_at.map(|(at, _)| at).unwrap_or_else(Instant::now)), if give_up_at.is_some() => {
                    let waited = give_up_at.map(|(_, t)| t).unwrap_or_default();
                    warn!(?waited, "no session id received");
                    return Err(ClientError::SessionIdTimeout(waited));
                }
            }
        }

        Ok(self.summary())
    }
}
