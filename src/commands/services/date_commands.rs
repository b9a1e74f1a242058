//! Appointment negotiation between the client and the assigned employee.

use crate::{
    commands::Command,
    db::DbPool,
    entities::service,
    errors::ServiceError,
    events::EventSender,
    workflow::engine,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::instrument;
use validator::Validate;

use super::{run_transition, Target};

/// Client asks for a different date. The service returns to pending.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct RequestDateChangeCommand {
    pub service_id: i32,
    pub actor_id: i32,
    pub preferred_date: DateTime<Utc>,
    #[validate(length(max = 1000, message = "Reason must be at most 1000 characters"))]
    pub reason: Option<String>,
    pub expected_version: Option<i32>,
}

#[async_trait::async_trait]
impl Command for RequestDateChangeCommand {
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
            "request_date_change",
            Target {
                service_id: self.service_id,
                actor_id: self.actor_id,
                expected_version: self.expected_version,
            },
            |service, actor| {
                engine::request_date_change(
                    service,
                    actor,
                    self.preferred_date,
                    self.reason.as_deref(),
                )
            },
        )
        .await
    }
}

/// Staff proposes an appointment; the service becomes scheduled.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProposeDateCommand {
    pub service_id: i32,
    pub actor_id: i32,
    pub scheduled_date: DateTime<Utc>,
    pub expected_version: Option<i32>,
}

#[async_trait::async_trait]
impl Command for ProposeDateCommand {
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
            "propose_date",
            Target {
                service_id: self.service_id,
                actor_id: self.actor_id,
                expected_version: self.expected_version,
            },
            |service, actor| engine::propose_date(service, actor, self.scheduled_date),
        )
        .await
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfirmDateCommand {
    pub service_id: i32,
    pub actor_id: i32,
    pub expected_version: Option<i32>,
}

#[async_trait::async_trait]
impl Command for ConfirmDateCommand {
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
            "confirm_date",
            Target {
                service_id: self.service_id,
                actor_id: self.actor_id,
                expected_version: self.expected_version,
            },
            engine::confirm_date,
        )
        .await
    }
}

/// Client turns down the proposed date; the service returns to pending.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct RejectDateCommand {
    pub service_id: i32,
    pub actor_id: i32,
    #[validate(length(max = 1000, message = "Reason must be at most 1000 characters"))]
    pub reason: Option<String>,
    pub expected_version: Option<i32>,
}

#[async_trait::async_trait]
impl Command for RejectDateCommand {
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
            "reject_date",
            Target {
                service_id: self.service_id,
                actor_id: self.actor_id,
                expected_version: self.expected_version,
            },
            |service, actor| engine::reject_date(service, actor, self.reason.as_deref()),
        )
        .await
    }
}
