use crate::{
    commands::Command,
    db::{self, DbPool},
    entities::user::{self, UserRole},
    errors::ServiceError,
    events::{Event, EventSender},
    metrics,
    repositories::user_repository,
};
use sea_orm::{ActiveModelTrait, DbErr, Set, SqlErr};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, instrument};
use validator::Validate;

use super::{failed, normalize_email, optional_text, validate_username};

/// Creates an account. Without an actor this is self-registration and always
/// yields a client; only admins may create staff accounts.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct CreateUserCommand {
    pub actor_id: Option<i32>,
    #[validate(
        length(min = 3, max = 64, message = "Username must be between 3 and 64 characters"),
        custom = "validate_username"
    )]
    pub username: String,
    #[validate(email(message = "Email must be a valid address"))]
    pub email: String,
    /// Opaque credential produced by the authentication layer
    #[validate(length(min = 1, message = "Password hash must not be empty"))]
    pub password_hash: String,
    #[serde(default)]
    pub role: UserRole,
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
impl Command for CreateUserCommand {
    type Result = user::Model;

    #[instrument(skip(self, db_pool, event_sender), fields(username = %self.username, role = %self.role))]
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

        metrics::record_registry("user", "create");
        info!(user_id = created.id, role = %created.role, "User created");
        event_sender
            .send_or_log(Event::UserCreated {
                user_id: created.id,
                role: created.role,
            })
            .await;

        Ok(created)
    }
}

impl CreateUserCommand {
    async fn create_in_db(&self, db_pool: &DbPool) -> Result<user::Model, ServiceError> {
        let txn = db::begin(db_pool).await?;

        let actor_role = match self.actor_id {
            Some(id) => Some(user_repository::find_actor(&txn, id).await?.role),
            None => None,
        };
        if !self.role.is_client() && !actor_role.is_some_and(|r| r.is_admin()) {
            return Err(ServiceError::Forbidden(format!(
                "only admins may create {} accounts",
                self.role
            )));
        }

        let email = normalize_email(&self.email);
        user_repository::ensure_unique(&txn, Some(&self.username), Some(&email), None).await?;

        let created = user::ActiveModel {
            username: Set(self.username.clone()),
            email: Set(email.clone()),
            password_hash: Set(self.password_hash.clone()),
            role: Set(self.role),
            first_name: Set(optional_text(&self.first_name)),
            last_name: Set(optional_text(&self.last_name)),
            phone: Set(optional_text(&self.phone)),
            address: Set(optional_text(&self.address)),
            active: Set(true),
            ..Default::default()
        }
        .insert(&txn)
        .await
        .map_err(|e| map_unique_violation(e, &self.username, &email))?;

        db::commit(txn).await?;
        Ok(created)
    }
}

fn map_unique_violation(err: DbErr, username: &str, email: &str) -> ServiceError {
    match err.sql_err() {
        Some(SqlErr::UniqueConstraintViolation(detail)) if detail.contains("email") => {
            ServiceError::Uniqueness {
                field: "Email",
                value: email.to_string(),
            }
        }
        Some(SqlErr::UniqueConstraintViolation(_)) => ServiceError::Uniqueness {
            field: "Username",
            value: username.to_string(),
        },
        _ => ServiceError::DatabaseError(err),
    }
}
