//! Query helpers shared by commands and services.
//!
//! Functions take any [`sea_orm::ConnectionTrait`] so the same code runs on the
//! pool for reads and on an open transaction inside commands.

pub mod history_repository;
pub mod service_repository;
pub mod user_repository;
pub mod vehicle_repository;

/// One page of results plus the total row count.
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub total: u64,
    pub page: u64,
    pub per_page: u64,
}

impl<T> Page<T> {
    pub fn total_pages(&self) -> u64 {
        if self.per_page == 0 {
            0
        } else {
            self.total.div_ceil(self.per_page)
        }
    }
}
