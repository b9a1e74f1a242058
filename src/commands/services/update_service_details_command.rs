use crate::{
    commands::Command,
    db::DbPool,
    entities::service,
    errors::ServiceError,
    events::{Event, EventSender},
    repositories::vehicle_repository,
    workflow::{engine, DetailsUpdate},
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::instrument;

use super::{announce, failed, load, persist};

/// Staff bulk edit of an accepted service. A status change in the same edit
/// goes through the regular transition guard.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdateServiceDetailsCommand {
    pub service_id: i32,
    pub actor_id: i32,
    pub update: DetailsUpdate,
    pub expected_version: Option<i32>,
}

#[async_trait::async_trait]
impl Command for UpdateServiceDetailsCommand {
    type Result = service::Model;

    #[instrument(skip(self, db_pool, event_sender), fields(service_id = self.service_id))]
    async fn execute(
        &self,
        db_pool: Arc<DbPool>,
        event_sender: Arc<EventSender>,
    ) -> Result<Self::Result, ServiceError> {
        let result = async {
            let loaded = load(
                &db_pool,
                self.actor_id,
                self.service_id,
                self.expected_version,
            )
            .await?;

            let transition = engine::update_details(&loaded.service, &loaded.actor, &self.update)?;

            if transition.service.vehicle_id != loaded.service.vehicle_id {
                let vehicle =
                    vehicle_repository::find(&loaded.txn, transition.service.vehicle_id).await?;
                if vehicle.owner_id != loaded.service.client_id {
                    return Err(ServiceError::InvalidOperation(format!(
                        "Vehicle {} does not belong to the service's client",
                        vehicle.id
                    )));
                }
            }

            let saved = persist(loaded.txn, &loaded.actor, &transition).await?;
            Ok::<_, ServiceError>((loaded.actor, transition, saved))
        }
        .await;

        let (actor, transition, saved) =
            result.map_err(|e| failed("update_details", self.service_id, e))?;

        announce(&event_sender, "update_details", &actor, &transition, &saved).await;
        event_sender
            .send_or_log(Event::ServiceDetailsUpdated {
                service_id: saved.id,
                actor_id: actor.id,
            })
            .await;

        Ok(saved)
    }
}
