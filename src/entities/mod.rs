pub mod service;
pub mod service_history;
pub mod user;
pub mod vehicle;
