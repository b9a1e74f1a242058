//! Commands that drive a service request through its workflow.
//!
//! Every command runs the same way: open a transaction, load the actor and
//! the service, apply a pure operation from [`crate::workflow::engine`], then
//! write the new row and its history entry before committing. Events go out
//! only after the commit succeeded.

pub mod assign_employee_command;
pub mod cancel_service_command;
pub mod client_decision_commands;
pub mod create_service_command;
pub mod date_commands;
pub mod delete_service_command;
pub mod update_service_details_command;
pub mod update_status_command;

pub use assign_employee_command::AssignEmployeeCommand;
pub use cancel_service_command::{CancelServiceCommand, RejectServiceCommand};
pub use client_decision_commands::{
    ApprovePlanCommand, ConfirmPickupCommand, RecordPaymentCommand, RequestChangesCommand,
};
pub use create_service_command::CreateServiceCommand;
pub use date_commands::{
    ConfirmDateCommand, ProposeDateCommand, RejectDateCommand, RequestDateChangeCommand,
};
pub use delete_service_command::DeleteServiceCommand;
pub use update_service_details_command::UpdateServiceDetailsCommand;
pub use update_status_command::UpdateStatusCommand;

use sea_orm::DatabaseTransaction;
use tracing::{debug, error, info, warn};

use crate::{
    db::{self, DbPool},
    entities::{service, user},
    errors::ServiceError,
    events::{Event, EventSender},
    metrics,
    repositories::{history_repository, service_repository, user_repository},
    workflow::{Transition, WorkflowError},
};

/// Open transaction plus the rows every workflow command starts from.
pub(crate) struct Loaded {
    pub txn: DatabaseTransaction,
    pub actor: user::Model,
    pub service: service::Model,
}

/// Begins the transaction and loads the actor and the service through it.
///
/// When the caller sent the version it last saw, a mismatch fails early with
/// [`ServiceError::ConcurrentModification`].
pub(crate) async fn load(
    db_pool: &DbPool,
    actor_id: i32,
    service_id: i32,
    expected_version: Option<i32>,
) -> Result<Loaded, ServiceError> {
    let txn = db::begin(db_pool).await?;
    let actor = user_repository::find_actor(&txn, actor_id).await?;
    let service = service_repository::find(&txn, service_id).await?;

    if let Some(expected) = expected_version {
        if expected != service.version {
            warn!(
                service_id,
                expected,
                actual = service.version,
                "Stale service version supplied"
            );
            return Err(ServiceError::ConcurrentModification(service_id));
        }
    }

    Ok(Loaded {
        txn,
        actor,
        service,
    })
}

/// Writes the transition and its history entry, then commits.
pub(crate) async fn persist(
    txn: DatabaseTransaction,
    actor: &user::Model,
    transition: &Transition,
) -> Result<service::Model, ServiceError> {
    let saved = service_repository::save_versioned(&txn, &transition.service).await?;
    history_repository::append(&txn, saved.id, actor.id, transition.entry.clone()).await?;
    db::commit(txn).await?;
    debug!(service_id = saved.id, version = saved.version, "Service saved");
    Ok(saved)
}

/// Post-commit bookkeeping shared by every workflow command.
pub(crate) async fn announce(
    event_sender: &EventSender,
    operation: &'static str,
    actor: &user::Model,
    transition: &Transition,
    saved: &service::Model,
) {
    metrics::record_workflow(operation);

    if transition.status_changed() {
        info!(
            service_id = saved.id,
            from = %transition.previous_status,
            to = %saved.status,
            actor_id = actor.id,
            operation,
            "Service status changed"
        );
        event_sender
            .send_or_log(Event::ServiceStatusChanged {
                service_id: saved.id,
                old_status: transition.previous_status,
                new_status: saved.status,
                actor_id: actor.id,
            })
            .await;
    } else {
        info!(service_id = saved.id, actor_id = actor.id, operation, "Service updated");
    }
}

/// Runs one pure workflow operation end to end.
pub(crate) async fn run_transition<F>(
    db_pool: &DbPool,
    event_sender: &EventSender,
    operation: &'static str,
    target: Target,
    apply: F,
) -> Result<service::Model, ServiceError>
where
    F: FnOnce(&service::Model, &user::Model) -> Result<Transition, WorkflowError> + Send,
{
    let result = async {
        let loaded = load(
            db_pool,
            target.actor_id,
            target.service_id,
            target.expected_version,
        )
        .await?;
        let transition = apply(&loaded.service, &loaded.actor)?;
        let saved = persist(loaded.txn, &loaded.actor, &transition).await?;
        Ok::<_, ServiceError>((loaded.actor, transition, saved))
    }
    .await;

    match result {
        Ok((actor, transition, saved)) => {
            announce(event_sender, operation, &actor, &transition, &saved).await;
            Ok(saved)
        }
        Err(e) => Err(failed(operation, target.service_id, e)),
    }
}

/// Records and logs a failed operation, handing the error back.
pub(crate) fn failed(operation: &'static str, service_id: i32, err: ServiceError) -> ServiceError {
    metrics::record_workflow_failure(operation, &err);
    match &err {
        ServiceError::DatabaseError(_) | ServiceError::InternalError(_) => {
            error!(service_id, operation, error = %err, "Workflow operation failed")
        }
        _ => warn!(service_id, operation, error = %err, "Workflow operation rejected"),
    }
    err
}

/// Which service a command acts on, and as whom.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Target {
    pub service_id: i32,
    pub actor_id: i32,
    pub expected_version: Option<i32>,
}
