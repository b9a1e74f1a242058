//! Workflow operations.
//!
//! Each function validates its guard against the current row and the actor,
//! then returns a [`Transition`] built from a clone of the input. The input
//! is never modified, so a rejected call leaves the caller's copy untouched.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::cost::{parse_cost, CostField};
use super::transitions::can_transition_to;
use super::{Transition, WorkflowError};
use crate::entities::service::{self, ServicePriority, ServiceStatus};
use crate::entities::user;

const DATE_FORMAT: &str = "%Y-%m-%d %H:%M";

fn format_date(date: &DateTime<Utc>) -> String {
    date.format(DATE_FORMAT).to_string()
}

fn with_suffix(base: String, sep: &str, extra: Option<&str>) -> String {
    match extra.map(str::trim).filter(|s| !s.is_empty()) {
        Some(extra) => format!("{}{}{}", base, sep, extra),
        None => base,
    }
}

fn require_staff(actor: &user::Model, action: &str) -> Result<(), WorkflowError> {
    if actor.role.is_staff() {
        Ok(())
    } else {
        Err(WorkflowError::NotPermitted(format!(
            "only staff may {}",
            action
        )))
    }
}

fn require_owner(
    service: &service::Model,
    actor: &user::Model,
    action: &str,
) -> Result<(), WorkflowError> {
    if actor.id == service.client_id {
        Ok(())
    } else {
        Err(WorkflowError::NotPermitted(format!(
            "only the owning client may {}",
            action
        )))
    }
}

/// Allow-list guard for the role-gated operations. The reported target is the
/// status the operation would have moved to.
fn require_status(
    service: &service::Model,
    allowed: bool,
    target: ServiceStatus,
) -> Result<(), WorkflowError> {
    if allowed {
        Ok(())
    } else {
        Err(WorkflowError::InvalidTransition {
            from: service.status,
            to: target,
        })
    }
}

fn moved(service: &service::Model, status: ServiceStatus, entry: String) -> Transition {
    let mut next = service.clone();
    next.status = status;
    Transition {
        previous_status: service.status,
        service: next,
        entry,
    }
}

/// Checks the generic table guard, reporting a missing employee before a
/// missing edge so callers can tell the two apart.
pub fn check_transition(
    service: &service::Model,
    target: ServiceStatus,
) -> Result<(), WorkflowError> {
    let has_employee = service.employee_id.is_some();
    if target.requires_employee() && !has_employee {
        return Err(WorkflowError::MissingEmployee { to: target });
    }
    if !can_transition_to(service.status, target, has_employee) {
        return Err(WorkflowError::InvalidTransition {
            from: service.status,
            to: target,
        });
    }
    Ok(())
}

/// Staff moves the service along the status graph.
pub fn update_status(
    service: &service::Model,
    actor: &user::Model,
    new_status: ServiceStatus,
    note: Option<&str>,
) -> Result<Transition, WorkflowError> {
    require_staff(actor, "change the service status")?;
    check_transition(service, new_status)?;

    let entry = with_suffix(
        format!("Status changed from {} to {}", service.status, new_status),
        ": ",
        note,
    );
    Ok(moved(service, new_status, entry))
}

/// Assigns or reassigns the responsible employee.
///
/// A pending service is accepted as a side effect. The status table is not
/// consulted, so terminal services still accept a reassignment.
pub fn assign_employee(
    service: &service::Model,
    actor: &user::Model,
    assignee: &user::Model,
    previous: Option<&user::Model>,
) -> Result<Transition, WorkflowError> {
    require_staff(actor, "assign employees")?;
    if !assignee.role.is_employee() || !assignee.active {
        return Err(WorkflowError::Rejected(format!(
            "{} is not an active employee",
            assignee.username
        )));
    }
    if !actor.role.is_admin() && assignee.id != actor.id {
        return Err(WorkflowError::NotPermitted(
            "employees may only assign services to themselves".into(),
        ));
    }
    if service.employee_id == Some(assignee.id) {
        return Err(WorkflowError::Rejected(
            "Service is already assigned to this employee".into(),
        ));
    }

    let (status, entry) = if service.status == ServiceStatus::Pending {
        (
            ServiceStatus::Accepted,
            format!("Service assigned to {}", assignee.full_name()),
        )
    } else {
        let old = previous
            .map(user::Model::full_name)
            .unwrap_or_else(|| "None".to_string());
        (
            service.status,
            format!(
                "Service reassigned from {} to {}",
                old,
                assignee.full_name()
            ),
        )
    };

    let mut transition = moved(service, status, entry);
    transition.service.employee_id = Some(assignee.id);
    Ok(transition)
}

/// Client withdraws their own request.
pub fn client_cancel(
    service: &service::Model,
    actor: &user::Model,
    reason: &str,
) -> Result<Transition, WorkflowError> {
    require_owner(service, actor, "cancel this service")?;
    require_status(
        service,
        service.status.client_can_cancel(),
        ServiceStatus::Cancelled,
    )?;

    Ok(moved(
        service,
        ServiceStatus::Cancelled,
        format!("Service cancelled by client. Reason: {}", reason.trim()),
    ))
}

/// Staff cancellation, allowed from any non-terminal status.
pub fn staff_cancel(
    service: &service::Model,
    actor: &user::Model,
    reason: Option<&str>,
) -> Result<Transition, WorkflowError> {
    require_staff(actor, "cancel services")?;
    check_transition(service, ServiceStatus::Cancelled)?;

    Ok(moved(
        service,
        ServiceStatus::Cancelled,
        with_suffix("Service cancelled".to_string(), ": ", reason),
    ))
}

/// Staff declines a request that was never accepted.
pub fn reject_request(
    service: &service::Model,
    actor: &user::Model,
    reason: &str,
) -> Result<Transition, WorkflowError> {
    require_staff(actor, "reject service requests")?;
    require_status(
        service,
        service.status == ServiceStatus::Pending,
        ServiceStatus::Cancelled,
    )?;

    Ok(moved(
        service,
        ServiceStatus::Cancelled,
        format!("Service rejected by employee. Reason: {}", reason.trim()),
    ))
}

/// Client asks for another date; the request goes back to pending.
pub fn request_date_change(
    service: &service::Model,
    actor: &user::Model,
    preferred_date: DateTime<Utc>,
    reason: Option<&str>,
) -> Result<Transition, WorkflowError> {
    require_owner(service, actor, "request a date change")?;
    require_status(
        service,
        service.status.client_can_request_date_change(),
        ServiceStatus::Pending,
    )?;

    let entry = with_suffix(
        format!(
            "Client requested date change to {}",
            format_date(&preferred_date)
        ),
        ". Reason: ",
        reason,
    );
    let mut transition = moved(service, ServiceStatus::Pending, entry);
    transition.service.preferred_date = Some(preferred_date);
    Ok(transition)
}

/// Staff proposes an appointment date.
pub fn propose_date(
    service: &service::Model,
    actor: &user::Model,
    scheduled_date: DateTime<Utc>,
) -> Result<Transition, WorkflowError> {
    require_staff(actor, "propose dates")?;
    require_status(
        service,
        service.status.employee_can_propose_date(),
        ServiceStatus::Scheduled,
    )?;
    if service.employee_id.is_none() {
        return Err(WorkflowError::MissingEmployee {
            to: ServiceStatus::Scheduled,
        });
    }

    let entry = format!(
        "Employee proposed new date: {}",
        format_date(&scheduled_date)
    );
    let mut transition = moved(service, ServiceStatus::Scheduled, entry);
    transition.service.scheduled_date = Some(scheduled_date);
    Ok(transition)
}

pub fn confirm_date(
    service: &service::Model,
    actor: &user::Model,
) -> Result<Transition, WorkflowError> {
    require_owner(service, actor, "confirm the date")?;
    require_status(
        service,
        service.status == ServiceStatus::Scheduled,
        ServiceStatus::ClientConfirmed,
    )?;
    if service.employee_id.is_none() {
        return Err(WorkflowError::MissingEmployee {
            to: ServiceStatus::ClientConfirmed,
        });
    }

    Ok(moved(
        service,
        ServiceStatus::ClientConfirmed,
        "Client confirmed the scheduled date".to_string(),
    ))
}

pub fn reject_date(
    service: &service::Model,
    actor: &user::Model,
    reason: Option<&str>,
) -> Result<Transition, WorkflowError> {
    require_owner(service, actor, "reject the date")?;
    require_status(
        service,
        service.status == ServiceStatus::Scheduled,
        ServiceStatus::Pending,
    )?;

    Ok(moved(
        service,
        ServiceStatus::Pending,
        with_suffix(
            "Client rejected the scheduled date".to_string(),
            ": ",
            reason,
        ),
    ))
}

pub fn approve_plan(
    service: &service::Model,
    actor: &user::Model,
) -> Result<Transition, WorkflowError> {
    require_owner(service, actor, "approve the service plan")?;
    require_status(
        service,
        service.status == ServiceStatus::DiagnosisCompleted,
        ServiceStatus::ClientApproved,
    )?;

    Ok(moved(
        service,
        ServiceStatus::ClientApproved,
        "Client approved the service plan".to_string(),
    ))
}

pub fn request_changes(
    service: &service::Model,
    actor: &user::Model,
    changes: &str,
) -> Result<Transition, WorkflowError> {
    require_owner(service, actor, "request plan changes")?;
    require_status(
        service,
        service.status == ServiceStatus::DiagnosisCompleted,
        ServiceStatus::ClientConsultation,
    )?;

    Ok(moved(
        service,
        ServiceStatus::ClientConsultation,
        format!("Client requested changes: {}", changes.trim()),
    ))
}

pub fn record_payment(
    service: &service::Model,
    actor: &user::Model,
    payment_method: &str,
) -> Result<Transition, WorkflowError> {
    require_owner(service, actor, "pay for this service")?;
    require_status(
        service,
        service.status == ServiceStatus::ReadyForPayment,
        ServiceStatus::PaymentReceived,
    )?;

    Ok(moved(
        service,
        ServiceStatus::PaymentReceived,
        format!("Payment received via {}", payment_method.trim()),
    ))
}

pub fn confirm_pickup(
    service: &service::Model,
    actor: &user::Model,
) -> Result<Transition, WorkflowError> {
    require_owner(service, actor, "confirm pickup")?;
    require_status(
        service,
        service.status == ServiceStatus::ReadyForPickup,
        ServiceStatus::Finished,
    )?;

    Ok(moved(
        service,
        ServiceStatus::Finished,
        "Client confirmed vehicle pickup".to_string(),
    ))
}

/// Staff bulk edit. `None` leaves a field as it is; for the cost fields an
/// empty string clears the value.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct DetailsUpdate {
    pub status: Option<ServiceStatus>,
    pub priority: Option<ServicePriority>,
    pub vehicle_id: Option<i32>,
    pub scheduled_date: Option<DateTime<Utc>>,
    pub diagnosis: Option<String>,
    pub service_plan: Option<String>,
    pub estimated_cost: Option<String>,
    pub actual_cost: Option<String>,
    pub parts_needed: Option<String>,
    pub notes: Option<String>,
    pub additional_notes: Option<String>,
}

fn blank_to_none(value: &str) -> Option<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

pub fn update_details(
    service: &service::Model,
    actor: &user::Model,
    update: &DetailsUpdate,
) -> Result<Transition, WorkflowError> {
    require_staff(actor, "edit service details")?;
    if !service.status.can_be_updated() {
        return Err(WorkflowError::Rejected(format!(
            "Service details cannot be edited while the service is {}",
            service.status
        )));
    }

    let mut next = service.clone();
    let mut changed: Vec<&'static str> = Vec::new();

    // Costs first so a malformed value rejects the whole edit.
    if let Some(raw) = update.estimated_cost.as_deref() {
        let value = parse_cost(CostField::Estimated, raw)?;
        if value != next.estimated_cost {
            next.estimated_cost = value;
            changed.push("estimated cost");
        }
    }
    if let Some(raw) = update.actual_cost.as_deref() {
        let value = parse_cost(CostField::Actual, raw)?;
        if value != next.actual_cost {
            next.actual_cost = value;
            changed.push("actual cost");
        }
    }

    if let Some(priority) = update.priority {
        if priority != next.priority {
            next.priority = priority;
            changed.push("priority");
        }
    }
    if let Some(vehicle_id) = update.vehicle_id {
        if vehicle_id != next.vehicle_id {
            next.vehicle_id = vehicle_id;
            changed.push("vehicle");
        }
    }
    if let Some(date) = update.scheduled_date {
        if Some(date) != next.scheduled_date {
            next.scheduled_date = Some(date);
            changed.push("scheduled date");
        }
    }

    let text_fields: [(&Option<String>, &mut Option<String>, &'static str); 5] = [
        (&update.diagnosis, &mut next.diagnosis, "diagnosis"),
        (&update.service_plan, &mut next.service_plan, "service plan"),
        (&update.parts_needed, &mut next.parts_needed, "parts needed"),
        (&update.notes, &mut next.notes, "notes"),
        (
            &update.additional_notes,
            &mut next.additional_notes,
            "additional notes",
        ),
    ];
    for (incoming, current, label) in text_fields {
        if let Some(value) = incoming.as_deref() {
            let value = blank_to_none(value);
            if value != *current {
                *current = value;
                changed.push(label);
            }
        }
    }

    let entry = match update.status.filter(|s| *s != service.status) {
        Some(new_status) => {
            check_transition(service, new_status)?;
            next.status = new_status;
            let line = format!("Status changed from {} to {}", service.status, new_status);
            if changed.is_empty() {
                line
            } else {
                format!("{}: {}", line, changed.join(", "))
            }
        }
        None if changed.is_empty() => {
            return Err(WorkflowError::Rejected("No changes to apply".into()));
        }
        None => format!("Service details updated: {}", changed.join(", ")),
    };

    Ok(Transition {
        previous_status: service.status,
        service: next,
        entry,
    })
}
