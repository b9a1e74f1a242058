//! Decisions only the owning client can take: plan approval, change
//! requests, payment and pickup.

use crate::{
    commands::Command,
    db::DbPool,
    entities::service,
    errors::ServiceError,
    events::EventSender,
    workflow::engine,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::instrument;
use validator::Validate;

use super::{run_transition, Target};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApprovePlanCommand {
    pub service_id: i32,
    pub actor_id: i32,
    pub expected_version: Option<i32>,
}

#[async_trait::async_trait]
impl Command for ApprovePlanCommand {
    type Result = service::Model;

    #[instrument(skip(self, db_pool, event_sender), fields(service_id = self.service_id))]
    async fn execute(
        &self,
        db_pool: Arc<DbPool>,
        event_sender: Arc<EventSender>,
    ) -> Result<Self::Result, ServiceError> {
        run_transition(
            &db_pool,
            &event_sender,
            "approve_plan",
            Target {
                service_id: self.service_id,
                actor_id: self.actor_id,
                expected_version: self.expected_version,
            },
            engine::approve_plan,
        )
        .await
    }
}

/// Client sends the plan back for a consultation.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct RequestChangesCommand {
    pub service_id: i32,
    pub actor_id: i32,
    #[validate(length(
        min = 1,
        max = 1000,
        message = "Requested changes must be between 1 and 1000 characters"
    ))]
    pub changes: String,
    pub expected_version: Option<i32>,
}

#[async_trait::async_trait]
impl Command for RequestChangesCommand {
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
            "request_changes",
            Target {
                service_id: self.service_id,
                actor_id: self.actor_id,
                expected_version: self.expected_version,
            },
            |service, actor| engine::request_changes(service, actor, &self.changes),
        )
        .await
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct RecordPaymentCommand {
    pub service_id: i32,
    pub actor_id: i32,
    /// Free-form label such as "card" or "cash"
    #[validate(length(
        min = 1,
        max = 50,
        message = "Payment method must be between 1 and 50 characters"
    ))]
    pub payment_method: String,
    pub expected_version: Option<i32>,
}

#[async_trait::async_trait]
impl Command for RecordPaymentCommand {
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
            "record_payment",
            Target {
                service_id: self.service_id,
                actor_id: self.actor_id,
                expected_version: self.expected_version,
            },
            |service, actor| engine::record_payment(service, actor, &self.payment_method),
        )
        .await
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfirmPickupCommand {
    pub service_id: i32,
    pub actor_id: i32,
    pub expected_version: Option<i32>,
}

#[async_trait::async_trait]
impl Command for ConfirmPickupCommand {
    type Result = service::Model;

    #[instrument(skip(self, db_pool, event_sender), fields(service_id = self.service_id))]
    async fn execute(
        &self,
        db_pool: Arc<DbPool>,
        event_sender: Arc<EventSender>,
    ) -> Result<Self::Result, ServiceError> {
        run_transition(
            &db_pool,
            &event_sender,
            "confirm_pickup",
            Target {
                service_id: self.service_id,
                actor_id: self.actor_id,
                expected_version: self.expected_version,
            },
            engine::confirm_pickup,
        )
        .await
    }
}
