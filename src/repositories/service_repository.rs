use chrono::Utc;
use sea_orm::{
    sea_query::Expr,
    ActiveValue::{Set, Unchanged},
    ColumnTrait, Condition, ConnectionTrait, DbErr, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder, QuerySelect,
};
use serde::Deserialize;
use utoipa::IntoParams;

use super::Page;
use crate::entities::service::{self, ServiceStatus};
use crate::errors::ServiceError;

/// Filters accepted by the service listing.
#[derive(Debug, Clone, Default, Deserialize, IntoParams)]
pub struct ServiceFilter {
    pub client_id: Option<i32>,
    pub employee_id: Option<i32>,
    pub vehicle_id: Option<i32>,
    pub status: Option<ServiceStatus>,
    /// Only requests nobody has picked up yet.
    #[serde(default)]
    pub unassigned: bool,
}

impl ServiceFilter {
    fn condition(&self) -> Condition {
        let mut cond = Condition::all();
        if let Some(client_id) = self.client_id {
            cond = cond.add(service::Column::ClientId.eq(client_id));
        }
        if let Some(employee_id) = self.employee_id {
            cond = cond.add(service::Column::EmployeeId.eq(employee_id));
        }
        if let Some(vehicle_id) = self.vehicle_id {
            cond = cond.add(service::Column::VehicleId.eq(vehicle_id));
        }
        if let Some(status) = self.status {
            cond = cond.add(service::Column::Status.eq(status));
        }
        if self.unassigned {
            cond = cond.add(service::Column::EmployeeId.is_null());
        }
        cond
    }
}

pub async fn find<C>(conn: &C, id: i32) -> Result<service::Model, ServiceError>
where
    C: ConnectionTrait,
{
    service::Entity::find_by_id(id)
        .one(conn)
        .await?
        .ok_or_else(|| ServiceError::not_found("Service", id))
}

/// Writes every mutable column of `next`, guarded by the version it was
/// loaded with. A concurrent writer that got there first makes this fail with
/// [`ServiceError::ConcurrentModification`].
pub async fn save_versioned<C>(conn: &C, next: &service::Model) -> Result<service::Model, ServiceError>
where
    C: ConnectionTrait,
{
    let expected = next.version;
    let active = service::ActiveModel {
        id: Unchanged(next.id),
        vehicle_id: Set(next.vehicle_id),
        client_id: Unchanged(next.client_id),
        employee_id: Set(next.employee_id),
        description: Set(next.description.clone()),
        priority: Set(next.priority),
        status: Set(next.status),
        preferred_date: Set(next.preferred_date),
        scheduled_date: Set(next.scheduled_date),
        diagnosis: Set(next.diagnosis.clone()),
        service_plan: Set(next.service_plan.clone()),
        estimated_cost: Set(next.estimated_cost),
        actual_cost: Set(next.actual_cost),
        parts_needed: Set(next.parts_needed.clone()),
        notes: Set(next.notes.clone()),
        additional_notes: Set(next.additional_notes.clone()),
        version: Set(expected + 1),
        created_at: Unchanged(next.created_at),
        updated_at: Set(Utc::now()),
    };

    service::Entity::update(active)
        .filter(service::Column::Version.eq(expected))
        .exec(conn)
        .await
        .map_err(|e| match e {
            DbErr::RecordNotUpdated => ServiceError::ConcurrentModification(next.id),
            other => ServiceError::DatabaseError(other),
        })
}

pub async fn list<C>(
    conn: &C,
    filter: &ServiceFilter,
    page: u64,
    per_page: u64,
) -> Result<Page<service::Model>, ServiceError>
where
    C: ConnectionTrait,
{
    let page = page.max(1);
    let paginator = service::Entity::find()
        .filter(filter.condition())
        .order_by_desc(service::Column::CreatedAt)
        .order_by_desc(service::Column::Id)
        .paginate(conn, per_page);

    let total = paginator.num_items().await?;
    let items = paginator.fetch_page(page - 1).await?;

    Ok(Page {
        items,
        total,
        page,
        per_page,
    })
}

/// Whether a vehicle still has work that has not reached a terminal status.
pub async fn has_open_services<C>(conn: &C, vehicle_id: i32) -> Result<bool, ServiceError>
where
    C: ConnectionTrait,
{
    let open = service::Entity::find()
        .filter(service::Column::VehicleId.eq(vehicle_id))
        .filter(
            service::Column::Status
                .is_not_in([ServiceStatus::Finished, ServiceStatus::Cancelled]),
        )
        .count(conn)
        .await?;
    Ok(open > 0)
}

pub async fn count_all<C>(conn: &C) -> Result<u64, ServiceError>
where
    C: ConnectionTrait,
{
    Ok(service::Entity::find().count(conn).await?)
}

/// Number of services per status. Statuses nobody is in are absent.
pub async fn count_by_status<C>(conn: &C) -> Result<Vec<(ServiceStatus, i64)>, ServiceError>
where
    C: ConnectionTrait,
{
    let rows = service::Entity::find()
        .select_only()
        .column(service::Column::Status)
        .column_as(Expr::col(service::Column::Id).count(), "count")
        .group_by(service::Column::Status)
        .into_tuple::<(ServiceStatus, i64)>()
        .all(conn)
        .await?;
    Ok(rows)
}
