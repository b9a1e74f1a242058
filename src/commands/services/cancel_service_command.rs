use crate::{
    commands::Command,
    db::DbPool,
    entities::service,
    errors::ServiceError,
    events::EventSender,
    workflow::{engine, WorkflowError},
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::instrument;
use validator::Validate;

use super::{run_transition, Target};

/// Cancels a service. The owning client must give a reason and may only
/// cancel before the vehicle is handed over; staff may cancel any
/// non-terminal service.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct CancelServiceCommand {
    pub service_id: i32,
    pub actor_id: i32,
    #[validate(length(max = 1000, message = "Reason must be at most 1000 characters"))]
    pub reason: Option<String>,
    pub expected_version: Option<i32>,
}

#[async_trait::async_trait]
impl Command for CancelServiceCommand {
    type Result = service::Model;

    #[instrument(skip(self, db_pool, event_sender), fields(service_id = self.service_id))]
    async fn execute(
        &self,
        db_pool: Arc<DbPool>,
        event_sender: Arc<EventSender>,
    ) -> Result<Self::Result, ServiceError> {
        self.validate()?;

        run_transition(
            &db_pool,
            &event_sender,
            "cancel_service",
            Target {
                service_id: self.service_id,
                actor_id: self.actor_id,
                expected_version: self.expected_version,
            },
            |service, actor| {
                if actor.role.is_staff() {
                    return engine::staff_cancel(service, actor, self.reason.as_deref());
                }
                let reason = self.reason.as_deref().map(str::trim).unwrap_or_default();
                let transition = engine::client_cancel(service, actor, reason)?;
                if reason.is_empty() {
                    return Err(WorkflowError::Rejected(
                        "A reason is required to cancel a service".into(),
                    ));
                }
                Ok(transition)
            },
        )
        .await
    }
}

/// Staff turns down a pending request.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct RejectServiceCommand {
    pub service_id: i32,
    pub actor_id: i32,
    #[validate(length(
        min = 1,
        max = 1000,
        message = "Reason must be between 1 and 1000 characters"
    ))]
    pub reason: String,
    pub expected_version: Option<i32>,
}

#[async_trait::async_trait]
impl Command for RejectServiceCommand {
    type Result = service::Model;

    #[instrument(skip(self, db_pool, event_sender), fields(service_id = self.service_id))]
    async fn execute(
        &self,
        db_pool: Arc<DbPool>,
        event_sender: Arc<EventSender>,
    ) -> Result<Self::Result, ServiceError> {
        self.validate()?;

        run_transition(
            &db_pool,
            &event_sender,
            "reject_service",
            Target {
                service_id: self.service_id,
                actor_id: self.actor_id,
                expected_version: self.expected_version,
            },
            |service, actor| engine::reject_request(service, actor, &self.reason),
        )
        .await
    }
}
