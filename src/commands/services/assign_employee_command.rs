use crate::{
    commands::Command,
    db::DbPool,
    entities::service,
    errors::ServiceError,
    events::{Event, EventSender},
    repositories::user_repository,
    workflow::engine,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{instrument, warn};

use super::{announce, failed, load, persist};

/// Assigns the responsible employee, accepting the request if it was still
/// pending. Admins may assign anyone; employees only themselves.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssignEmployeeCommand {
    pub service_id: i32,
    pub actor_id: i32,
    pub employee_id: i32,
    pub expected_version: Option<i32>,
}

#[async_trait::async_trait]
impl Command for AssignEmployeeCommand {
    type Result = service::Model;

    #[instrument(skip(self, db_pool, event_sender), fields(service_id = self.service_id, employee_id = self.employee_id))]
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

            let assignee = user_repository::find(&loaded.txn, self.employee_id).await?;
            let previous = match loaded.service.employee_id {
                Some(id) => Some(user_repository::find(&loaded.txn, id).await?),
                None => None,
            };

            let transition = engine::assign_employee(
                &loaded.service,
                &loaded.actor,
                &assignee,
                previous.as_ref(),
            )?;

            if loaded.service.status.is_terminal() {
                warn!(
                    service_id = self.service_id,
                    status = %loaded.service.status,
                    "Reassigning a service that already reached a terminal status"
                );
            }

            let saved = persist(loaded.txn, &loaded.actor, &transition).await?;
            Ok::<_, ServiceError>((loaded.actor, transition, saved, previous))
        }
        .await;

        let (actor, transition, saved, previous) =
            result.map_err(|e| failed("assign_employee", self.service_id, e))?;

        announce(&event_sender, "assign_employee", &actor, &transition, &saved).await;
        event_sender
            .send_or_log(Event::ServiceAssigned {
                service_id: saved.id,
                employee_id: self.employee_id,
                previous_employee_id: previous.map(|p| p.id),
            })
            .await;

        Ok(saved)
    }
}
