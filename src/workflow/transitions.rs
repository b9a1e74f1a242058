//! Status graph for service requests.
//!
//! The table below describes which moves are topologically possible. The
//! role-gated operations in [`super::engine`] narrow it further per actor.

use crate::entities::service::ServiceStatus;

use ServiceStatus::*;

/// Every status, in lifecycle order.
pub const ALL_STATUSES: [ServiceStatus; 18] = [
    Pending,
    Accepted,
    Scheduled,
    ClientConfirmed,
    WaitingForVehicle,
    VehicleReceived,
    DiagnosisPending,
    DiagnosisCompleted,
    ClientConsultation,
    ClientApproved,
    WaitingForParts,
    InProgress,
    Completed,
    ReadyForPayment,
    PaymentReceived,
    ReadyForPickup,
    Finished,
    Cancelled,
];

/// Statuses from which the owning client may cancel.
pub const CLIENT_CANCELLABLE: [ServiceStatus; 3] = [Pending, Scheduled, ClientConfirmed];

/// Statuses from which the client may ask for a different date.
pub const CLIENT_DATE_CHANGE: [ServiceStatus; 2] = [Scheduled, ClientConfirmed];

/// Statuses from which staff may propose a date.
pub const EMPLOYEE_DATE_PROPOSAL: [ServiceStatus; 2] = [Pending, Accepted];

impl ServiceStatus {
    /// Outgoing edges of the status graph.
    pub fn allowed_transitions(self) -> &'static [ServiceStatus] {
        match self {
            Pending => &[Accepted, Cancelled],
            Accepted => &[Scheduled, WaitingForVehicle, Cancelled],
            Scheduled => &[ClientConfirmed, Pending, Cancelled],
            ClientConfirmed => &[WaitingForVehicle, Cancelled],
            WaitingForVehicle => &[VehicleReceived, Cancelled],
            VehicleReceived => &[DiagnosisPending, Cancelled],
            DiagnosisPending => &[DiagnosisCompleted, Cancelled],
            DiagnosisCompleted => &[ClientApproved, ClientConsultation, Cancelled],
            ClientConsultation => &[DiagnosisCompleted, Cancelled],
            ClientApproved => &[WaitingForParts, InProgress, Cancelled],
            WaitingForParts => &[InProgress, Cancelled],
            InProgress => &[Completed, Cancelled],
            Completed => &[ReadyForPayment, Cancelled],
            ReadyForPayment => &[PaymentReceived, Cancelled],
            PaymentReceived => &[ReadyForPickup, InProgress, Cancelled],
            ReadyForPickup => &[Finished, Cancelled],
            Finished | Cancelled => &[],
        }
    }

    pub fn has_edge_to(self, target: ServiceStatus) -> bool {
        self.allowed_transitions().contains(&target)
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, Finished | Cancelled)
    }

    /// A service in this status must carry an assigned employee.
    pub fn requires_employee(self) -> bool {
        !matches!(self, Pending | Cancelled)
    }

    /// Whether the staff bulk edit of service details is permitted.
    pub fn can_be_updated(self) -> bool {
        !matches!(self, Pending | Finished | Cancelled)
    }

    pub fn client_can_cancel(self) -> bool {
        CLIENT_CANCELLABLE.contains(&self)
    }

    pub fn client_can_request_date_change(self) -> bool {
        CLIENT_DATE_CHANGE.contains(&self)
    }

    pub fn employee_can_propose_date(self) -> bool {
        EMPLOYEE_DATE_PROPOSAL.contains(&self)
    }
}

/// Pure guard: an edge exists and, if the target needs one, an employee is
/// already assigned.
pub fn can_transition_to(
    current: ServiceStatus,
    target: ServiceStatus,
    has_employee: bool,
) -> bool {
    current.has_edge_to(target) && (!target.requires_employee() || has_employee)
}
