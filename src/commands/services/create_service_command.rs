use crate::{
    commands::Command,
    db::{self, DbPool},
    entities::service::{self, ServicePriority, ServiceStatus},
    errors::ServiceError,
    events::{Event, EventSender},
    metrics,
    repositories::{history_repository, user_repository, vehicle_repository},
};
use chrono::{DateTime, Utc};
use sea_orm::{ActiveModelTrait, Set};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, instrument};
use validator::Validate;

use super::failed;

/// Opens a new service request for a vehicle. Clients file requests for
/// their own vehicles; staff may file one on the owner's behalf.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct CreateServiceCommand {
    pub actor_id: i32,
    pub vehicle_id: i32,
    #[validate(length(
        min = 10,
        max = 1000,
        message = "Description must be between 10 and 1000 characters"
    ))]
    pub description: String,
    #[serde(default)]
    pub priority: ServicePriority,
    pub preferred_date: Option<DateTime<Utc>>,
}

#[async_trait::async_trait]
impl Command for CreateServiceCommand {
    type Result = service::Model;

    #[instrument(skip(self, db_pool, event_sender), fields(vehicle_id = self.vehicle_id))]
    async fn execute(
        &self,
        db_pool: Arc<DbPool>,
        event_sender: Arc<EventSender>,
    ) -> Result<Self::Result, ServiceError> {
        self.validate()
            .map_err(|e| failed("create_service", 0, e.into()))?;

        let created = self
            .create_in_db(&db_pool)
            .await
            .map_err(|e| failed("create_service", 0, e))?;

        metrics::record_workflow("create_service");
        info!(
            service_id = created.id,
            client_id = created.client_id,
            actor_id = self.actor_id,
            "Service request created"
        );
        event_sender
            .send_or_log(Event::ServiceCreated {
                service_id: created.id,
                client_id: created.client_id,
                vehicle_id: created.vehicle_id,
            })
            .await;

        Ok(created)
    }
}

impl CreateServiceCommand {
    async fn create_in_db(&self, db_pool: &DbPool) -> Result<service::Model, ServiceError> {
        let txn = db::begin(db_pool).await?;
        let actor = user_repository::find_actor(&txn, self.actor_id).await?;
        let vehicle = vehicle_repository::find(&txn, self.vehicle_id).await?;

        if vehicle.owner_id != actor.id && !actor.role.is_staff() {
            return Err(ServiceError::Forbidden(
                "clients may only request service for their own vehicles".into(),
            ));
        }

        let created = service::ActiveModel {
            vehicle_id: Set(vehicle.id),
            client_id: Set(vehicle.owner_id),
            employee_id: Set(None),
            description: Set(self.description.trim().to_string()),
            priority: Set(self.priority),
            status: Set(ServiceStatus::Pending),
            preferred_date: Set(self.preferred_date),
            ..Default::default()
        }
        .insert(&txn)
        .await?;

        history_repository::append(&txn, created.id, actor.id, "Service request created").await?;
        db::commit(txn).await?;

        Ok(created)
    }
}
