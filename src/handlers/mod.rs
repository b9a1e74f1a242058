//! HTTP handlers.
//!
//! Every handler is a thin adapter: it extracts the path, query and body,
//! builds a command or calls a service read, and wraps the result in
//! [`crate::ApiResponse`]. Authorization is decided below this layer.

pub mod health;
pub mod services;
pub mod stats;
pub mod users;
pub mod vehicles;

// Re-export AppState so handler modules can import it as crate::handlers::AppState
pub use crate::AppState;
