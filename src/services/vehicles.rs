use std::sync::Arc;

use tracing::instrument;

use crate::{
    commands::{
        vehicles::{CreateVehicleCommand, DeleteVehicleCommand, UpdateVehicleCommand},
        Command,
    },
    db::DbPool,
    entities::{user, vehicle},
    errors::ServiceError,
    events::EventSender,
    repositories::vehicle_repository,
};

/// Vehicle registry facade.
#[derive(Clone)]
pub struct VehicleService {
    db_pool: Arc<DbPool>,
    event_sender: Arc<EventSender>,
    max_vehicles_per_owner: u64,
}

impl VehicleService {
    pub fn new(
        db_pool: Arc<DbPool>,
        event_sender: Arc<EventSender>,
        max_vehicles_per_owner: u64,
    ) -> Self {
        Self {
            db_pool,
            event_sender,
            max_vehicles_per_owner,
        }
    }

    /// Registers a vehicle under the configured per-owner limit.
    #[instrument(skip(self, command), err)]
    pub async fn create(
        &self,
        mut command: CreateVehicleCommand,
    ) -> Result<vehicle::Model, ServiceError> {
        command.max_vehicles_per_owner = self.max_vehicles_per_owner;
        command
            .execute(self.db_pool.clone(), self.event_sender.clone())
            .await
    }

    #[instrument(skip(self, command), err)]
    pub async fn update(&self, command: UpdateVehicleCommand) -> Result<vehicle::Model, ServiceError> {
        command
            .execute(self.db_pool.clone(), self.event_sender.clone())
            .await
    }

    #[instrument(skip(self, command), err)]
    pub async fn delete(&self, command: DeleteVehicleCommand) -> Result<(), ServiceError> {
        command
            .execute(self.db_pool.clone(), self.event_sender.clone())
            .await
    }

    #[instrument(skip(self, actor), fields(actor_id = actor.id), err)]
    pub async fn get(&self, actor: &user::Model, id: i32) -> Result<vehicle::Model, ServiceError> {
        let vehicle = vehicle_repository::find(self.db_pool.as_ref(), id).await?;
        if actor.id != vehicle.owner_id && !actor.role.can_manage_vehicles() {
            return Err(ServiceError::Forbidden(format!(
                "vehicle {} belongs to another client",
                id
            )));
        }
        Ok(vehicle)
    }

    /// Clients get their own vehicles. Staff get one owner's vehicles, or
    /// every vehicle when no owner is given.
    #[instrument(skip(self, actor), fields(actor_id = actor.id), err)]
    pub async fn list(
        &self,
        actor: &user::Model,
        owner_id: Option<i32>,
    ) -> Result<Vec<vehicle::Model>, ServiceError> {
        let db = self.db_pool.as_ref();
        if !actor.role.can_manage_vehicles() {
            return vehicle_repository::list_by_owner(db, actor.id).await;
        }
        match owner_id {
            Some(owner_id) => vehicle_repository::list_by_owner(db, owner_id).await,
            None => vehicle_repository::list_all(db).await,
        }
    }
}
