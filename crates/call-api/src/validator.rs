//! Client-side call validation gate.
//!
//! Rules run in a fixed order and the first one that fires decides the
//! outcome. A request that is not [`ValidationOutcome::Accepted`] must never be
//! written to the gateway.

use crate::types::{floor_of, CallRequest};
use liftcall_core::PolicyConfig;
use tracing::{debug, info};

/// Reason used when source and destination share a floor.
pub const SAME_FLOOR_REASON: &str = "SAME_SOURCE_AND_DEST_FLOOR";
/// Reason used for blocked directional actions.
pub const INVALID_DIRECTION_REASON: &str = "INVALID_DIRECTION";

/// Result of validating one request
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationOutcome {
    /// Request may be dispatched
    Accepted(CallRequest),
    /// Request violates local policy
    Rejected {
        /// Human-readable reason
        reason: String,
    },
    /// Request is withdrawn before sending
    Cancelled {
        /// Machine-readable reason
        reason: String,
    },
}

impl ValidationOutcome {
    /// True for [`ValidationOutcome::Accepted`]
    pub fn is_accepted(&self) -> bool {
        matches!(self, ValidationOutcome::Accepted(_))
    }

    /// Refusal reason, `None` when accepted
    pub fn reason(&self) -> Option<&str> {
        match self {
            ValidationOutcome::Accepted(_) => None,
            ValidationOutcome::Rejected { reason } | ValidationOutcome::Cancelled { reason } => {
                Some(reason)
            }
        }
    }

    fn rejected(reason: impl Into<String>) -> Self {
        ValidationOutcome::Rejected { reason: reason.into() }
    }
}

/// Local call policy
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationPolicy {
    /// Action codes refused outright
    pub disabled_actions: Vec<i32>,
    /// Action codes refused as an invalid direction
    pub invalid_direction_actions: Vec<i32>,
    /// Smallest accepted delay
    pub min_delay_seconds: i32,
    /// Largest accepted delay
    pub max_delay_seconds: i32,
    /// Largest accepted group size
    pub max_group_size: i32,
    /// Areas the building defines
    pub valid_areas: Vec<i32>,
}

impl Default for ValidationPolicy {
    fn default() -> Self {
        Self::from(&PolicyConfig::default())
    }
}

impl From<&PolicyConfig> for ValidationPolicy {
    fn from(config: &PolicyConfig) -> Self {
        Self {
            disabled_actions: config.disabled_actions.clone(),
            invalid_direction_actions: config.invalid_direction_actions.clone(),
            min_delay_seconds: config.min_delay_seconds,
            max_delay_seconds: config.max_delay_seconds,
            max_group_size: config.max_group_size,
            valid_areas: config.valid_areas.clone(),
        }
    }
}

/// Pure request validator
#[derive(Debug, Clone, Default)]
pub struct RequestValidator {
    policy: ValidationPolicy,
}

impl RequestValidator {
    /// Validator for the given policy
    pub fn new(policy: ValidationPolicy) -> Self {
        Self { policy }
    }

    /// Decide whether `request` may be sent.
    pub fn validate(&self, request: &CallRequest) -> ValidationOutcome {
        let outcome = self.first_violation(request).unwrap_or_else(|| {
            ValidationOutcome::Accepted(request.clone())
        });

        match outcome.reason() {
            Some(reason) => info!(
                request_id = request.request_id,
                reason, "call refused before dispatch"
            ),
            None => debug!(request_id = request.request_id, "call accepted"),
        }
        outcome
    }

    fn first_violation(&self, request: &CallRequest) -> Option<ValidationOutcome> {
        let policy = &self.policy;
        let code = request.action.code();

        if policy.disabled_actions.contains(&code) {
            return Some(ValidationOutcome::rejected(format!("disabled call action: {code}")));
        }
        if policy.invalid_direction_actions.contains(&code) {
            return Some(ValidationOutcome::rejected(INVALID_DIRECTION_REASON));
        }
        if let Some(delay) = request.delay_seconds {
            if delay < policy.min_delay_seconds || delay > policy.max_delay_seconds {
                return Some(ValidationOutcome::rejected(format!(
                    "invalid delay parameter: {delay}"
                )));
            }
        }
        if let Some(group_size) = request.group_size {
            if group_size > policy.max_group_size {
                return Some(ValidationOutcome::rejected(format!(
                    "invalid group_size parameter: {group_size}"
                )));
            }
        }
        if let Some(destination) = request.destination_area {
            if floor_of(request.source_area) == floor_of(destination) {
                return Some(ValidationOutcome::Cancelled {
                    reason: SAME_FLOOR_REASON.to_string(),
                });
            }
        }
        if !policy.valid_areas.contains(&request.source_area) {
            return Some(ValidationOutcome::rejected(format!(
                "unable to resolve area: area:{}",
                request.source_area
            )));
        }
        // Landing calls carry no destination and skip this check.
        if let Some(destination) = request.destination_area {
            if !policy.valid_areas.contains(&destination) {
                return Some(ValidationOutcome::rejected(format!(
                    "unable to resolve destination: area:{destination}"
                )));
            }
        }
        None
    }
}
