use chrono::{DateTime, Utc};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter, QueryOrder, Set,
};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::entities::{service_history, user};
use crate::errors::ServiceError;

/// Read order for a service's history. Newest first is the default.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum HistoryOrder {
    #[default]
    NewestFirst,
    OldestFirst,
}

/// History row joined with its author for display.
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct HistoryEntry {
    pub id: i32,
    pub service_id: i32,
    pub user_id: i32,
    pub author: Option<String>,
    pub description: String,
    pub created_at: DateTime<Utc>,
}

/// Appends one entry. Callers pass their open transaction so the entry
/// commits together with the change it describes.
pub async fn append<C>(
    conn: &C,
    service_id: i32,
    user_id: i32,
    description: impl Into<String>,
) -> Result<service_history::Model, ServiceError>
where
    C: ConnectionTrait,
{
    let entry = service_history::ActiveModel {
        service_id: Set(service_id),
        user_id: Set(user_id),
        description: Set(description.into()),
        created_at: Set(Utc::now()),
        ..Default::default()
    };
    entry.insert(conn).await.map_err(ServiceError::DatabaseError)
}

/// Entries for one service, ordered by creation time with id as tie-breaker.
pub async fn get_ordered<C>(
    conn: &C,
    service_id: i32,
    order: HistoryOrder,
) -> Result<Vec<HistoryEntry>, ServiceError>
where
    C: ConnectionTrait,
{
    let query = service_history::Entity::find()
        .filter(service_history::Column::ServiceId.eq(service_id))
        .find_also_related(user::Entity);

    let query = match order {
        HistoryOrder::NewestFirst => query
            .order_by_desc(service_history::Column::CreatedAt)
            .order_by_desc(service_history::Column::Id),
        HistoryOrder::OldestFirst => query
            .order_by_asc(service_history::Column::CreatedAt)
            .order_by_asc(service_history::Column::Id),
    };

    let rows = query.all(conn).await?;

    Ok(rows
        .into_iter()
        .map(|(entry, author)| HistoryEntry {
            id: entry.id,
            service_id: entry.service_id,
            user_id: entry.user_id,
            author: author.map(|u| u.full_name()),
            description: entry.description,
            created_at: entry.created_at,
        })
        .collect())
}

pub async fn count_for_service<C>(conn: &C, service_id: i32) -> Result<u64, ServiceError>
where
    C: ConnectionTrait,
{
    use sea_orm::PaginatorTrait;

    Ok(service_history::Entity::find()
        .filter(service_history::Column::ServiceId.eq(service_id))
        .count(conn)
        .await?)
}

/// Drops every entry of a service. Only used when the service itself goes.
pub async fn delete_for_service<C>(conn: &C, service_id: i32) -> Result<u64, ServiceError>
where
    C: ConnectionTrait,
{
    let result = service_history::Entity::delete_many()
        .filter(service_history::Column::ServiceId.eq(service_id))
        .exec(conn)
        .await?;
    Ok(result.rows_affected)
}
