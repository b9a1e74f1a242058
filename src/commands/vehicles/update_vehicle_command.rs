use crate::{
    commands::Command,
    db::{self, DbPool},
    entities::vehicle,
    errors::ServiceError,
    events::{Event, EventSender},
    metrics,
    repositories::{user_repository, vehicle_repository},
};
use sea_orm::{ActiveModelTrait, IntoActiveModel, Set};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, instrument};
use validator::Validate;

use super::{ensure_can_manage, failed, map_insert_error, validate_vin, validate_year};

/// Partial edit of a registered vehicle. `None` keeps the stored value.
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
pub struct UpdateVehicleCommand {
    pub vehicle_id: i32,
    pub actor_id: i32,
    #[validate(length(min = 2, max = 50, message = "Make must be between 2 and 50 characters"))]
    pub make: Option<String>,
    #[validate(length(min = 2, max = 50, message = "Model must be between 2 and 50 characters"))]
    pub model: Option<String>,
    #[validate(custom = "validate_year")]
    pub year: Option<i32>,
    #[validate(custom = "validate_vin")]
    pub vin: Option<String>,
    #[validate(length(
        min = 2,
        max = 20,
        message = "License plate must be between 2 and 20 characters"
    ))]
    pub license_plate: Option<String>,
    #[validate(length(max = 30))]
    pub color: Option<String>,
    #[validate(range(min = 0, message = "Mileage cannot be negative"))]
    pub mileage: Option<i32>,
}

#[async_trait::async_trait]
impl Command for UpdateVehicleCommand {
    type Result = vehicle::Model;

    #[instrument(skip(self, db_pool, event_sender), fields(vehicle_id = self.vehicle_id))]
    async fn execute(
        &self,
        db_pool: Arc<DbPool>,
        event_sender: Arc<EventSender>,
    ) -> Result<Self::Result, ServiceError> {
        self.validate().map_err(|e| failed("update", e.into()))?;

        let updated = self
            .update_in_db(&db_pool)
            .await
            .map_err(|e| failed("update", e))?;

        metrics::record_registry("vehicle", "update");
        info!(vehicle_id = updated.id, "Vehicle updated");
        event_sender
            .send_or_log(Event::VehicleUpdated(updated.id))
            .await;

        Ok(updated)
    }
}

impl UpdateVehicleCommand {
    async fn update_in_db(&self, db_pool: &DbPool) -> Result<vehicle::Model, ServiceError> {
        let txn = db::begin(db_pool).await?;
        let actor = user_repository::find_actor(&txn, self.actor_id).await?;
        let current = vehicle_repository::find(&txn, self.vehicle_id).await?;
        ensure_can_manage(&actor, &current)?;

        let vin = self.vin.clone().unwrap_or_else(|| current.vin.clone());
        let license_plate = self
            .license_plate
            .as_deref()
            .map(str::trim)
            .unwrap_or(&current.license_plate)
            .to_string();
        vehicle_repository::ensure_unique(&txn, &vin, &license_plate, Some(current.id)).await?;

        let mut active = current.clone().into_active_model();
        if let Some(make) = &self.make {
            active.make = Set(make.trim().to_string());
        }
        if let Some(model) = &self.model {
            active.model = Set(model.trim().to_string());
        }
        if let Some(year) = self.year {
            active.year = Set(year);
        }
        if vin != current.vin {
            active.vin = Set(vin.clone());
        }
        if license_plate != current.license_plate {
            active.license_plate = Set(license_plate.clone());
        }
        if let Some(color) = &self.color {
            let color = color.trim();
            active.color = Set((!color.is_empty()).then(|| color.to_string()));
        }
        if let Some(mileage) = self.mileage {
            active.mileage = Set(Some(mileage));
        }

        let updated = active
            .update(&txn)
            .await
            .map_err(|e| map_insert_error(e, &vin, &license_plate))?;

        db::commit(txn).await?;
        Ok(updated)
    }
}
