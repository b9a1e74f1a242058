use crate::{
    commands::Command,
    db::DbPool,
    entities::service::{self, ServiceStatus},
    errors::ServiceError,
    events::EventSender,
    workflow::engine,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::instrument;
use validator::Validate;

use super::{run_transition, Target};

/// Staff moves a service along the status graph, optionally with a note that
/// is appended to the history line.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct UpdateStatusCommand {
    pub service_id: i32,
    pub actor_id: i32,
    pub new_status: ServiceStatus,
    #[validate(length(max = 1000, message = "Note must be at most 1000 characters"))]
    pub note: Option<String>,
    /// Version the caller last saw, for optimistic locking
    pub expected_version: Option<i32>,
}

#[async_trait::async_trait]
impl Command for UpdateStatusCommand {
    type Result = service::Model;

    #[instrument(skip(self, db_pool, event_sender), fields(service_id = self.service_id, to = %self.new_status))]
    async fn execute(
        &self,
        db_pool: Arc<DbPool>,
        event_sender: Arc<EventSender>,
    ) -> Result<Self::Result, ServiceError> {
        self.validate()?;

        run_transition(
            &db_pool,
            &event_sender,
            "update_status",
            Target {
                service_id: self.service_id,
                actor_id: self.actor_id,
                expected_version: self.expected_version,
            },
            |service, actor| {
                engine::update_status(service, actor, self.new_status, self.note.as_deref())
            },
        )
        .await
    }
}
