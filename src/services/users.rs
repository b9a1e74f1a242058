use std::sync::Arc;

use tracing::instrument;

use crate::{
    commands::{
        users::{ChangeRoleCommand, CreateUserCommand, SetUserActiveCommand, UpdateUserCommand},
        Command,
    },
    db::DbPool,
    entities::user::{self, UserRole},
    errors::ServiceError,
    events::EventSender,
    repositories::{user_repository, Page},
};

/// Account registry facade.
#[derive(Clone)]
pub struct UserService {
    db_pool: Arc<DbPool>,
    event_sender: Arc<EventSender>,
}

impl UserService {
    pub fn new(db_pool: Arc<DbPool>, event_sender: Arc<EventSender>) -> Self {
        Self {
            db_pool,
            event_sender,
        }
    }

    #[instrument(skip(self, command), err)]
    pub async fn create(&self, command: CreateUserCommand) -> Result<user::Model, ServiceError> {
        command
            .execute(self.db_pool.clone(), self.event_sender.clone())
            .await
    }

    #[instrument(skip(self, command), err)]
    pub async fn update(&self, command: UpdateUserCommand) -> Result<user::Model, ServiceError> {
        command
            .execute(self.db_pool.clone(), self.event_sender.clone())
            .await
    }

    #[instrument(skip(self, command), err)]
    pub async fn change_role(&self, command: ChangeRoleCommand) -> Result<user::Model, ServiceError> {
        command
            .execute(self.db_pool.clone(), self.event_sender.clone())
            .await
    }

    #[instrument(skip(self, command), err)]
    pub async fn set_active(
        &self,
        command: SetUserActiveCommand,
    ) -> Result<user::Model, ServiceError> {
        command
            .execute(self.db_pool.clone(), self.event_sender.clone())
            .await
    }

    /// Users may read themselves; staff may read anyone.
    #[instrument(skip(self, actor), fields(actor_id = actor.id), err)]
    pub async fn get(&self, actor: &user::Model, id: i32) -> Result<user::Model, ServiceError> {
        if actor.id != id && !actor.role.can_manage_users() {
            return Err(ServiceError::Forbidden(
                "only staff may look up other accounts".into(),
            ));
        }
        user_repository::find(self.db_pool.as_ref(), id).await
    }

    #[instrument(skip(self, actor), fields(actor_id = actor.id), err)]
    pub async fn list(
        &self,
        actor: &user::Model,
        role: Option<UserRole>,
        page: u64,
        per_page: u64,
    ) -> Result<Page<user::Model>, ServiceError> {
        if !actor.role.can_manage_users() {
            return Err(ServiceError::Forbidden("only staff may list accounts".into()));
        }
        user_repository::list(self.db_pool.as_ref(), role, page, per_page).await
    }
}
