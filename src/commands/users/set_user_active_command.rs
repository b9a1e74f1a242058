use crate::{
    commands::Command,
    db::{self, DbPool},
    entities::user,
    errors::ServiceError,
    events::{Event, EventSender},
    metrics,
    repositories::user_repository,
};
use sea_orm::{ActiveModelTrait, IntoActiveModel, Set};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, instrument};

use super::failed;

/// Soft activation switch. Accounts are never deleted; a deactivated account
/// can no longer act.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SetUserActiveCommand {
    pub user_id: i32,
    pub actor_id: i32,
    pub active: bool,
}

#[async_trait::async_trait]
impl Command for SetUserActiveCommand {
    type Result = user::Model;

    #[instrument(skip(self, db_pool, event_sender), fields(user_id = self.user_id, active = self.active))]
    async fn execute(
        &self,
        db_pool: Arc<DbPool>,
        event_sender: Arc<EventSender>,
    ) -> Result<Self::Result, ServiceError> {
        let updated = self
            .apply_in_db(&db_pool)
            .await
            .map_err(|e| failed("set_active", e))?;

        metrics::record_registry("user", "set_active");
        info!(user_id = updated.id, active = updated.active, "User activation changed");
        event_sender
            .send_or_log(Event::UserActivationChanged {
                user_id: updated.id,
                active: updated.active,
            })
            .await;

        Ok(updated)
    }
}

impl SetUserActiveCommand {
    async fn apply_in_db(&self, db_pool: &DbPool) -> Result<user::Model, ServiceError> {
        let txn = db::begin(db_pool).await?;
        let actor = user_repository::find_actor(&txn, self.actor_id).await?;
        let target = user_repository::find(&txn, self.user_id).await?;

        if !actor.role.can_delete_user(target.role) {
            return Err(ServiceError::Forbidden(
                "only admins may activate or deactivate accounts".into(),
            ));
        }
        if target.id == actor.id && !self.active {
            return Err(ServiceError::InvalidOperation(
                "admins may not deactivate themselves".into(),
            ));
        }
        if target.active == self.active {
            return Ok(target);
        }

        let mut active = target.into_active_model();
        active.active = Set(self.active);
        let updated = active.update(&txn).await?;

        db::commit(txn).await?;
        Ok(updated)
    }
}
