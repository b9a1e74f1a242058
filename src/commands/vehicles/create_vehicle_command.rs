use crate::{
    commands::Command,
    db::{self, DbPool},
    entities::vehicle,
    errors::ServiceError,
    events::{Event, EventSender},
    metrics,
    repositories::{user_repository, vehicle_repository},
};
use sea_orm::{ActiveModelTrait, Set};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, instrument};
use validator::Validate;

use super::{failed, map_insert_error, validate_vin, validate_year};

fn default_max_vehicles() -> u64 {
    20
}

/// Registers a vehicle. Clients register for themselves; staff name the
/// owning client explicitly.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct CreateVehicleCommand {
    pub actor_id: i32,
    /// Defaults to the actor
    pub owner_id: Option<i32>,
    #[validate(length(min = 2, max = 50, message = "Make must be between 2 and 50 characters"))]
    pub make: String,
    #[validate(length(min = 2, max = 50, message = "Model must be between 2 and 50 characters"))]
    pub model: String,
    #[validate(custom = "validate_year")]
    pub year: i32,
    #[validate(custom = "validate_vin")]
    pub vin: String,
    #[validate(length(
        min = 2,
        max = 20,
        message = "License plate must be between 2 and 20 characters"
    ))]
    pub license_plate: String,
    #[validate(length(max = 30))]
    pub color: Option<String>,
    #[validate(range(min = 0, message = "Mileage cannot be negative"))]
    pub mileage: Option<i32>,
    #[serde(default = "default_max_vehicles")]
    pub max_vehicles_per_owner: u64,
}

#[async_trait::async_trait]
impl Command for CreateVehicleCommand {
    type Result = vehicle::Model;

    #[instrument(skip(self, db_pool, event_sender), fields(vin = %self.vin))]
    async fn execute(
        &self,
        db_pool: Arc<DbPool>,
        event_sender: Arc<EventSender>,
    ) -> Result<Self::Result, ServiceError> {
        self.validate().map_err(|e| failed("create", e.into()))?;

        let created = self
            .create_in_db(&db_pool)
            .await
            .map_err(|e| failed("create", e))?;

        metrics::record_registry("vehicle", "create");
        info!(
            vehicle_id = created.id,
            owner_id = created.owner_id,
            "Vehicle registered"
        );
        event_sender
            .send_or_log(Event::VehicleRegistered {
                vehicle_id: created.id,
                owner_id: created.owner_id,
            })
            .await;

        Ok(created)
    }
}

impl CreateVehicleCommand {
    async fn create_in_db(&self, db_pool: &DbPool) -> Result<vehicle::Model, ServiceError> {
        let txn = db::begin(db_pool).await?;
        let actor = user_repository::find_actor(&txn, self.actor_id).await?;
        let owner_id = self.owner_id.unwrap_or(actor.id);

        if owner_id != actor.id && !actor.role.can_manage_vehicles() {
            return Err(ServiceError::Forbidden(
                "clients may only register their own vehicles".into(),
            ));
        }

        let owner = user_repository::find(&txn, owner_id).await?;
        if !owner.role.is_client() || !owner.active {
            return Err(ServiceError::InvalidOperation(format!(
                "Vehicle owner {} must be an active client",
                owner.username
            )));
        }

        let owned = vehicle_repository::count_by_owner(&txn, owner.id).await?;
        if owned >= self.max_vehicles_per_owner {
            return Err(ServiceError::InvalidOperation(format!(
                "{} already has the maximum of {} vehicles",
                owner.username, self.max_vehicles_per_owner
            )));
        }

        let license_plate = self.license_plate.trim();
        vehicle_repository::ensure_unique(&txn, &self.vin, license_plate, None).await?;

        let created = vehicle::ActiveModel {
            owner_id: Set(owner.id),
            make: Set(self.make.trim().to_string()),
            model: Set(self.model.trim().to_string()),
            year: Set(self.year),
            vin: Set(self.vin.clone()),
            license_plate: Set(license_plate.to_string()),
            color: Set(self.color.clone()),
            mileage: Set(self.mileage),
            ..Default::default()
        }
        .insert(&txn)
        .await
        .map_err(|e| map_insert_error(e, &self.vin, license_plate))?;

        db::commit(txn).await?;
        Ok(created)
    }
}
