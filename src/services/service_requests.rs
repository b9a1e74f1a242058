use std::sync::Arc;

use tracing::instrument;

use crate::{
    commands::{
        services::{
            ApprovePlanCommand, AssignEmployeeCommand, CancelServiceCommand, ConfirmDateCommand,
            ConfirmPickupCommand, CreateServiceCommand, DeleteServiceCommand, ProposeDateCommand, RecordPaymentCommand,
            RejectDateCommand, RejectServiceCommand, RequestChangesCommand,
            RequestDateChangeCommand, UpdateServiceDetailsCommand, UpdateStatusCommand,
        },
        Command,
    },
    db::DbPool,
    entities::{service, user},
    errors::ServiceError,
    events::EventSender,
    repositories::{
        history_repository::{self, HistoryEntry, HistoryOrder},
        service_repository::{self, ServiceFilter},
        Page,
    },
};

/// Service request workflow facade.
#[derive(Clone)]
pub struct ServiceRequestService {
    db_pool: Arc<DbPool>,
    event_sender: Arc<EventSender>,
}

impl ServiceRequestService {
    pub fn new(db_pool: Arc<DbPool>, event_sender: Arc<EventSender>) -> Self {
        Self {
            db_pool,
            event_sender,
        }
    }

    async fn run<C>(&self, command: C) -> Result<C::Result, ServiceError>
    where
        C: Command,
    {
        command
            .execute(self.db_pool.clone(), self.event_sender.clone())
            .await
    }

    #[instrument(skip(self, command), err)]
    pub async fn create(&self, command: CreateServiceCommand) -> Result<service::Model, ServiceError> {
        self.run(command).await
    }

    #[instrument(skip(self, command), err)]
    pub async fn update_status(
        &self,
        command: UpdateStatusCommand,
    ) -> Result<service::Model, ServiceError> {
        self.run(command).await
    }

    #[instrument(skip(self, command), err)]
    pub async fn assign_employee(
        &self,
        command: AssignEmployeeCommand,
    ) -> Result<service::Model, ServiceError> {
        self.run(command).await
    }

    #[instrument(skip(self, command), err)]
    pub async fn cancel(&self, command: CancelServiceCommand) -> Result<service::Model, ServiceError> {
        self.run(command).await
    }

    #[instrument(skip(self, command), err)]
    pub async fn reject(&self, command: RejectServiceCommand) -> Result<service::Model, ServiceError> {
        self.run(command).await
    }

    #[instrument(skip(self, command), err)]
    pub async fn request_date_change(
        &self,
        command: RequestDateChangeCommand,
    ) -> Result<service::Model, ServiceError> {
        self.run(command).await
    }

    #[instrument(skip(self, command), err)]
    pub async fn propose_date(
        &self,
        command: ProposeDateCommand,
    ) -> Result<service::Model, ServiceError> {
        self.run(command).await
    }

    #[instrument(skip(self, command), err)]
    pub async fn confirm_date(
        &self,
        command: ConfirmDateCommand,
    ) -> Result<service::Model, ServiceError> {
        self.run(command).await
    }

    #[instrument(skip(self, command), err)]
    pub async fn reject_date(
        &self,
        command: RejectDateCommand,
    ) -> Result<service::Model, ServiceError> {
        self.run(command).await
    }

    #[instrument(skip(self, command), err)]
    pub async fn approve_plan(
        &self,
        command: ApprovePlanCommand,
    ) -> Result<service::Model, ServiceError> {
        self.run(command).await
    }

    #[instrument(skip(self, command), err)]
    pub async fn request_changes(
        &self,
        command: RequestChangesCommand,
    ) -> Result<service::Model, ServiceError> {
        self.run(command).await
    }

    #[instrument(skip(self, command), err)]
    pub async fn record_payment(
        &self,
        command: RecordPaymentCommand,
    ) -> Result<service::Model, ServiceError> {
        self.run(command).await
    }

    #[instrument(skip(self, command), err)]
    pub async fn confirm_pickup(
        &self,
        command: ConfirmPickupCommand,
    ) -> Result<service::Model, ServiceError> {
        self.run(command).await
    }

    #[instrument(skip(self, command), err)]
    pub async fn update_details(
        &self,
        command: UpdateServiceDetailsCommand,
    ) -> Result<service::Model, ServiceError> {
        self.run(command).await
    }

    #[instrument(skip(self, command), err)]
    pub async fn delete(&self, command: DeleteServiceCommand) -> Result<(), ServiceError> {
        self.run(command).await
    }

    /// Clients only see their own requests; staff see everything.
    #[instrument(skip(self, actor), fields(actor_id = actor.id), err)]
    pub async fn get(&self, actor: &user::Model, id: i32) -> Result<service::Model, ServiceError> {
        let service = service_repository::find(self.db_pool.as_ref(), id).await?;
        ensure_visible(actor, &service)?;
        Ok(service)
    }

    #[instrument(skip(self, actor, filter), fields(actor_id = actor.id), err)]
    pub async fn list(
        &self,
        actor: &user::Model,
        mut filter: ServiceFilter,
        page: u64,
        per_page: u64,
    ) -> Result<Page<service::Model>, ServiceError> {
        if !actor.role.is_staff() {
            filter.client_id = Some(actor.id);
        }
        service_repository::list(self.db_pool.as_ref(), &filter, page, per_page).await
    }

    #[instrument(skip(self, actor), fields(actor_id = actor.id), err)]
    pub async fn history(
        &self,
        actor: &user::Model,
        id: i32,
        order: HistoryOrder,
    ) -> Result<Vec<HistoryEntry>, ServiceError> {
        let service = service_repository::find(self.db_pool.as_ref(), id).await?;
        ensure_visible(actor, &service)?;
        history_repository::get_ordered(self.db_pool.as_ref(), id, order).await
    }
}

fn ensure_visible(actor: &user::Model, service: &service::Model) -> Result<(), ServiceError> {
    if actor.role.is_staff() || actor.id == service.client_id {
        Ok(())
    } else {
        Err(ServiceError::Forbidden(format!(
            "service {} belongs to another client",
            service.id
        )))
    }
}
