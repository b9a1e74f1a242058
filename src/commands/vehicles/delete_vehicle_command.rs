use crate::{
    commands::Command,
    db::{self, DbPool},
    errors::ServiceError,
    events::{Event, EventSender},
    metrics,
    repositories::{service_repository, user_repository, vehicle_repository},
};
use sea_orm::ModelTrait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, instrument};

use super::{ensure_can_manage, failed};

/// Removes a vehicle together with its closed services and their history.
/// Refused while any of its services is still open.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeleteVehicleCommand {
    pub vehicle_id: i32,
    pub actor_id: i32,
}

#[async_trait::async_trait]
impl Command for DeleteVehicleCommand {
    type Result = ();

    #[instrument(skip(self, db_pool, event_sender), fields(vehicle_id = self.vehicle_id))]
    async fn execute(
        &self,
        db_pool: Arc<DbPool>,
        event_sender: Arc<EventSender>,
    ) -> Result<Self::Result, ServiceError> {
        self.delete_in_db(&db_pool)
            .await
            .map_err(|e| failed("delete", e))?;

        metrics::record_registry("vehicle", "delete");
        info!(vehicle_id = self.vehicle_id, "Vehicle removed");
        event_sender
            .send_or_log(Event::VehicleRemoved(self.vehicle_id))
            .await;

        Ok(())
    }
}

impl DeleteVehicleCommand {
    async fn delete_in_db(&self, db_pool: &DbPool) -> Result<(), ServiceError> {
        let txn = db::begin(db_pool).await?;
        let actor = user_repository::find_actor(&txn, self.actor_id).await?;
        let vehicle = vehicle_repository::find(&txn, self.vehicle_id).await?;
        ensure_can_manage(&actor, &vehicle)?;

        if service_repository::has_open_services(&txn, vehicle.id).await? {
            return Err(ServiceError::InvalidOperation(format!(
                "Vehicle {} still has open service requests",
                vehicle.id
            )));
        }

        let result = vehicle.delete(&txn).await?;
        if result.rows_affected == 0 {
            return Err(ServiceError::not_found("Vehicle", self.vehicle_id));
        }

        db::commit(txn).await?;
        Ok(())
    }
}

