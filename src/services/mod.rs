//! Application services.
//!
//! Thin facades the HTTP layer talks to. Writes are delegated to the
//! commands; reads go through the repositories with role-based scoping.

pub mod dashboard;
pub mod service_requests;
pub mod users;
pub mod vehicles;

use std::sync::Arc;

use crate::{config::AppConfig, db::DbPool, events::EventSender};

pub use dashboard::DashboardService;
pub use service_requests::ServiceRequestService;
pub use users::UserService;
pub use vehicles::VehicleService;

/// Every service, wired to the same pool and event channel.
#[derive(Clone)]
pub struct AppServices {
    pub service_requests: Arc<ServiceRequestService>,
    pub vehicles: Arc<VehicleService>,
    pub users: Arc<UserService>,
    pub dashboard: Arc<DashboardService>,
}

impl AppServices {
    pub fn new(db_pool: Arc<DbPool>, event_sender: Arc<EventSender>, config: &AppConfig) -> Self {
        Self {
            service_requests: Arc::new(ServiceRequestService::new(
                db_pool.clone(),
                event_sender.clone(),
            )),
            vehicles: Arc::new(VehicleService::new(
                db_pool.clone(),
                event_sender.clone(),
                config.max_vehicles_per_owner,
            )),
            users: Arc::new(UserService::new(db_pool.clone(), event_sender)),
            dashboard: Arc::new(DashboardService::new(db_pool)),
        }
    }
}
