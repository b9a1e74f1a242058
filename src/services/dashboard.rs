use std::sync::Arc;

use chrono::{DateTime, Utc};
use sea_orm::Iterable;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};
use utoipa::ToSchema;

use crate::{
    db::DbPool,
    entities::{
        service::ServiceStatus,
        user::{self, UserRole},
    },
    errors::ServiceError,
    repositories::{service_repository, user_repository, vehicle_repository},
    workflow::ALL_STATUSES,
};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct StatusCount {
    pub status: ServiceStatus,
    pub count: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct RoleCount {
    pub role: UserRole,
    pub count: i64,
}

/// Shop-wide totals for the staff dashboard. Every status and role is
/// listed, in workflow order, with zero where nothing matches.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct DashboardStats {
    pub total_users: u64,
    pub total_vehicles: u64,
    pub total_services: u64,
    pub services_by_status: Vec<StatusCount>,
    pub users_by_role: Vec<RoleCount>,
    pub generated_at: DateTime<Utc>,
}

/// Read-only aggregates over the whole shop.
#[derive(Clone)]
pub struct DashboardService {
    db_pool: Arc<DbPool>,
}

impl DashboardService {
    pub fn new(db_pool: Arc<DbPool>) -> Self {
        Self { db_pool }
    }

    #[instrument(skip(self, actor), fields(actor_id = actor.id), err)]
    pub async fn stats(&self, actor: &user::Model) -> Result<DashboardStats, ServiceError> {
        if !actor.role.is_staff() {
            return Err(ServiceError::Forbidden(
                "shop statistics are for staff".into(),
            ));
        }

        let db = self.db_pool.as_ref();
        let total_users = user_repository::count_all(db).await?;
        let total_vehicles = vehicle_repository::count_all(db).await?;
        let total_services = service_repository::count_all(db).await?;
        let by_status = service_repository::count_by_status(db).await?;
        let by_role = user_repository::count_by_role(db).await?;

        debug!(total_users, total_vehicles, total_services, "Dashboard stats computed");

        Ok(DashboardStats {
            total_users,
            total_vehicles,
            total_services,
            services_by_status: ALL_STATUSES
                .iter()
                .map(|status| StatusCount {
                    status: *status,
                    count: lookup(&by_status, status),
                })
                .collect(),
            users_by_role: UserRole::iter()
                .map(|role| RoleCount {
                    count: lookup(&by_role, &role),
                    role,
                })
                .collect(),
            generated_at: Utc::now(),
        })
    }
}

fn lookup<K: PartialEq>(rows: &[(K, i64)], key: &K) -> i64 {
    rows.iter()
        .find(|(k, _)| k == key)
        .map(|(_, count)| *count)
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_groups_count_as_zero() {
        let rows = vec![(UserRole::Client, 4), (UserRole::Admin, 1)];
        assert_eq!(lookup(&rows, &UserRole::Client), 4);
        assert_eq!(lookup(&rows, &UserRole::Employee), 0);
        assert_eq!(lookup(&rows, &UserRole::Admin), 1);
    }
}
