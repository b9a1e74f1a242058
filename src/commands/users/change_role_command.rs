use crate::{
    commands::Command,
    db::{self, DbPool},
    entities::user::{self, UserRole},
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

/// Admin-only role change.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChangeRoleCommand {
    pub user_id: i32,
    pub actor_id: i32,
    pub role: UserRole,
}

#[async_trait::async_trait]
impl Command for ChangeRoleCommand {
    type Result = user::Model;

    #[instrument(skip(self, db_pool, event_sender), fields(user_id = self.user_id, role = %self.role))]
    async fn execute(
        &self,
        db_pool: Arc<DbPool>,
        event_sender: Arc<EventSender>,
    ) -> Result<Self::Result, ServiceError> {
        let (old_role, updated) = self
            .change_in_db(&db_pool)
            .await
            .map_err(|e| failed("change_role", e))?;

        metrics::record_registry("user", "change_role");
        info!(
            user_id = updated.id,
            from = %old_role,
            to = %updated.role,
            actor_id = self.actor_id,
            "User role changed"
        );
        event_sender
            .send_or_log(Event::UserRoleChanged {
                user_id: updated.id,
                old_role,
                new_role: updated.role,
            })
            .await;

        Ok(updated)
    }
}

impl ChangeRoleCommand {
    async fn change_in_db(&self, db_pool: &DbPool) -> Result<(UserRole, user::Model), ServiceError> {
        let txn = db::begin(db_pool).await?;
        let actor = user_repository::find_actor(&txn, self.actor_id).await?;
        if !actor.role.can_change_role() {
            return Err(ServiceError::Forbidden(
                "only admins may change roles".into(),
            ));
        }

        let target = user_repository::find(&txn, self.user_id).await?;
        if target.role == self.role {
            return Err(ServiceError::InvalidOperation(format!(
                "{} already has the {} role",
                target.username, self.role
            )));
        }
        if target.id == actor.id {
            return Err(ServiceError::InvalidOperation(
                "admins may not change their own role".into(),
            ));
        }

        let old_role = target.role;
        let mut active = target.into_active_model();
        active.role = Set(self.role);
        let updated = active.update(&txn).await?;

        db::commit(txn).await?;
        Ok((old_role, updated))
    }
}
