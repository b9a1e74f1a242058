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
use validator::Validate;

use super::{failed, normalize_email, optional_text};

/// Profile edit. Users may edit themselves; staff follow
/// [`crate::entities::user::UserRole::can_modify_user`]. Role and activation
/// have their own commands.
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
pub struct UpdateUserCommand {
    pub user_id: i32,
    pub actor_id: i32,
    #[validate(email(message = "Email must be a valid address"))]
    pub email: Option<String>,
    #[validate(length(max = 50))]
    pub first_name: Option<String>,
    #[validate(length(max = 50))]
    pub last_name: Option<String>,
    #[validate(length(max = 20))]
    pub phone: Option<String>,
    #[validate(length(max = 255))]
    pub address: Option<String>,
}

#[async_trait::async_trait]
impl Command for UpdateUserCommand {
    type Result = user::Model;

    #[instrument(skip(self, db_pool, event_sender), fields(user_id = self.user_id))]
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

        metrics::record_registry("user", "update");
        info!(user_id = updated.id, actor_id = self.actor_id, "User updated");
        event_sender
            .send_or_log(Event::UserUpdated(updated.id))
            .await;

        Ok(updated)
    }
}

impl UpdateUserCommand {
    async fn update_in_db(&self, db_pool: &DbPool) -> Result<user::Model, ServiceError> {
        let txn = db::begin(db_pool).await?;
        let actor = user_repository::find_actor(&txn, self.actor_id).await?;
        let target = user_repository::find(&txn, self.user_id).await?;

        if actor.id != target.id && !actor.role.can_modify_user(target.role) {
            return Err(ServiceError::Forbidden(format!(
                "{} may not edit {} accounts",
                actor.role, target.role
            )));
        }

        let mut active = target.clone().into_active_model();
        if let Some(email) = &self.email {
            let email = normalize_email(email);
            if email != target.email {
                user_repository::ensure_unique(&txn, None, Some(&email), Some(target.id)).await?;
                active.email = Set(email);
            }
        }
        if self.first_name.is_some() {
            active.first_name = Set(optional_text(&self.first_name));
        }
        if self.last_name.is_some() {
            active.last_name = Set(optional_text(&self.last_name));
        }
        if self.phone.is_some() {
            active.phone = Set(optional_text(&self.phone));
        }
        if self.address.is_some() {
            active.address = Set(optional_text(&self.address));
        }

        let updated = active.update(&txn).await?;
        db::commit(txn).await?;
        Ok(updated)
    }
}
