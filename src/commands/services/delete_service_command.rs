use crate::{
    commands::Command,
    db::{self, DbPool},
    errors::ServiceError,
    events::{Event, EventSender},
    metrics,
    repositories::{history_repository, service_repository, user_repository},
};
use sea_orm::ModelTrait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, instrument};

use super::failed;

/// Removes a service request outright, history included. Admin only.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeleteServiceCommand {
    pub service_id: i32,
    pub actor_id: i32,
}

#[async_trait::async_trait]
impl Command for DeleteServiceCommand {
    type Result = ();

    #[instrument(skip(self, db_pool, event_sender), fields(service_id = self.service_id))]
    async fn execute(
        &self,
        db_pool: Arc<DbPool>,
        event_sender: Arc<EventSender>,
    ) -> Result<Self::Result, ServiceError> {
        let history_rows = self
            .delete_in_db(&db_pool)
            .await
            .map_err(|e| failed("delete", self.service_id, e))?;

        metrics::record_workflow("delete");
        info!(
            service_id = self.service_id,
            actor_id = self.actor_id,
            history_rows,
            "Service deleted"
        );
        event_sender
            .send_or_log(Event::ServiceDeleted {
                service_id: self.service_id,
                actor_id: self.actor_id,
            })
            .await;

        Ok(())
    }
}

impl DeleteServiceCommand {
    async fn delete_in_db(&self, db_pool: &DbPool) -> Result<u64, ServiceError> {
        let txn = db::begin(db_pool).await?;
        let actor = user_repository::find_actor(&txn, self.actor_id).await?;
        if !actor.role.is_admin() {
            return Err(ServiceError::Forbidden(
                "only admins may delete service requests".into(),
            ));
        }

        let service = service_repository::find(&txn, self.service_id).await?;
        let history_rows = history_repository::delete_for_service(&txn, service.id).await?;

        let result = service.delete(&txn).await?;
        if result.rows_affected == 0 {
            return Err(ServiceError::not_found("Service", self.service_id));
        }

        db::commit(txn).await?;
        Ok(history_rows)
    }
}
