//! Service request workflow engine.
//!
//! Everything in here is pure: operations take the current service row and the
//! acting user, and return the next row plus the audit line to append. The
//! command layer persists both inside one transaction.

pub mod cost;
pub mod engine;
pub mod transitions;

use crate::entities::service::{self, ServiceStatus};
use thiserror::Error;

pub use cost::{parse_cost, CostField};
pub use engine::DetailsUpdate;
pub use transitions::{can_transition_to, ALL_STATUSES};

/// Guard failures raised by workflow operations.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum WorkflowError {
    #[error("Invalid status transition from {from} to {to}")]
    InvalidTransition {
        from: ServiceStatus,
        to: ServiceStatus,
    },

    #[error("Cannot transition to {to} without assigned employee")]
    MissingEmployee { to: ServiceStatus },

    #[error("{} must be a valid number", field.label())]
    CostFormat { field: CostField },

    #[error("Not permitted: {0}")]
    NotPermitted(String),

    #[error("{0}")]
    Rejected(String),
}

/// Outcome of a successful workflow operation. Nothing is persisted yet.
#[derive(Debug, Clone, PartialEq)]
pub struct Transition {
    pub previous_status: ServiceStatus,
    pub service: service::Model,
    /// Text of the history entry that must be written with this change.
    pub entry: String,
}

impl Transition {
    pub fn status_changed(&self) -> bool {
        self.previous_status != self.service.status
    }
}
