//! Car Service API Library
//!
//! Accounts, the vehicle registry and the service request workflow engine of
//! an auto-repair shop, exposed over a versioned HTTP API.
#![forbid(unsafe_code)]
#![deny(rust_2018_idioms)]
#![allow(elided_lifetimes_in_paths)]
#![warn(clippy::all, clippy::perf, clippy::dbg_macro)]

// Core modules
pub mod auth;
pub mod commands;
pub mod config;
pub mod db;
pub mod entities;
pub mod errors;
pub mod events;
pub mod handlers;
pub mod metrics;
pub mod openapi;
pub mod repositories;
pub mod services;
pub mod tracing;
pub mod workflow;

use std::{sync::Arc, time::Duration};

use axum::{
    middleware,
    response::Json,
    routing::{get, post, put},
    Router,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tower_http::{cors::CorsLayer, timeout::TimeoutLayer, trace::TraceLayer};
use utoipa::{IntoParams, ToSchema};

use crate::{
    config::AppConfig, db::DbPool, events::EventSender, repositories::Page,
    services::AppServices,
};

// App state definition
#[derive(Clone)]
pub struct AppState {
    pub db: Arc<DbPool>,
    pub config: Arc<AppConfig>,
    pub event_sender: Arc<EventSender>,
    pub services: AppServices,
}

impl AppState {
    pub fn new(db: Arc<DbPool>, config: Arc<AppConfig>, event_sender: Arc<EventSender>) -> Self {
        let services = AppServices::new(db.clone(), event_sender.clone(), &config);
        Self {
            db,
            config,
            event_sender,
            services,
        }
    }
}

// Common query parameters for list endpoints
#[derive(Debug, Deserialize, IntoParams)]
pub struct ListQuery {
    #[serde(default = "default_page")]
    pub page: u64,
    /// Clamped to the configured maximum
    pub per_page: Option<u64>,
}

fn default_page() -> u64 {
    1
}

// Common response wrappers
#[derive(Serialize, ToSchema)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: Option<T>,
    pub message: Option<String>,
    pub errors: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub meta: Option<ResponseMeta>,
}

#[derive(Serialize, ToSchema)]
pub struct ResponseMeta {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_id: Option<String>,
    pub timestamp: String,
}

impl ResponseMeta {
    fn capture() -> Self {
        Self {
            request_id: crate::tracing::current_request_id().map(|rid| rid.as_str().to_string()),
            timestamp: Utc::now().to_rfc3339(),
        }
    }
}

#[derive(Serialize, ToSchema)]
pub struct PaginatedResponse<T> {
    pub items: Vec<T>,
    pub total: u64,
    pub page: u64,
    pub per_page: u64,
    pub total_pages: u64,
}

impl<T> From<Page<T>> for PaginatedResponse<T> {
    fn from(page: Page<T>) -> Self {
        let total_pages = page.total_pages();
        Self {
            items: page.items,
            total: page.total,
            page: page.page,
            per_page: page.per_page,
            total_pages,
        }
    }
}

impl<T> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            message: None,
            errors: None,
            meta: Some(ResponseMeta::capture()),
        }
    }

    pub fn error(message: String) -> Self {
        Self {
            success: false,
            data: None,
            message: Some(message),
            errors: None,
            meta: Some(ResponseMeta::capture()),
        }
    }

    pub fn validation_errors(errors: Vec<String>) -> Self {
        Self {
            success: false,
            data: None,
            message: Some("Validation failed".to_string()),
            errors: Some(errors),
            meta: Some(ResponseMeta::capture()),
        }
    }
}

#[cfg(test)]
mod response_tests {
    use super::*;
    use chrono::DateTime;

    #[tokio::test]
    async fn success_response_includes_request_metadata() {
        let response =
            crate::tracing::scope_request_id(crate::tracing::RequestId::new("meta-123"), async {
                ApiResponse::success("ok")
            })
            .await;

        let meta = response.meta.expect("metadata expected");
        assert_eq!(meta.request_id.as_deref(), Some("meta-123"));
        DateTime::parse_from_rfc3339(&meta.timestamp).expect("timestamp should parse");
    }

    #[tokio::test]
    async fn error_response_includes_request_metadata() {
        let response =
            crate::tracing::scope_request_id(crate::tracing::RequestId::new("meta-err"), async {
                ApiResponse::<()>::error("oops".into())
            })
            .await;

        let meta = response.meta.expect("metadata expected");
        assert_eq!(meta.request_id.as_deref(), Some("meta-err"));
        assert!(!meta.timestamp.is_empty());
    }

    #[tokio::test]
    async fn validation_errors_response_includes_metadata() {
        let response = crate::tracing::scope_request_id(
            crate::tracing::RequestId::new("meta-validation"),
            async { ApiResponse::<()>::validation_errors(vec!["missing".into()]) },
        )
        .await;

        let meta = response.meta.expect("metadata expected");
        assert_eq!(meta.request_id.as_deref(), Some("meta-validation"));
        DateTime::parse_from_rfc3339(&meta.timestamp).expect("timestamp should parse");
    }

    #[test]
    fn paginated_response_carries_page_count() {
        let page = Page {
            items: vec![1, 2, 3],
            total: 23,
            page: 2,
            per_page: 10,
        };
        let response: PaginatedResponse<i32> = page.into();
        assert_eq!(response.total_pages, 3);
        assert_eq!(response.items, vec![1, 2, 3]);
    }
}

/// Standard API result type for JSON responses
pub type ApiResult<T> = Result<Json<ApiResponse<T>>, errors::ServiceError>;

/// Versioned API. Everything except self-registration requires an actor.
pub fn api_v1_routes(state: AppState) -> Router<AppState> {
    use handlers::{services as svc, stats, users, vehicles};

    let services = Router::new()
        .route("/services", get(svc::list_services).post(svc::create_service))
        .route(
            "/services/:id",
            get(svc::get_service).delete(svc::delete_service),
        )
        .route("/services/:id/history", get(svc::get_history))
        .route("/services/:id/status", put(svc::update_status))
        .route("/services/:id/assign", post(svc::assign_employee))
        .route("/services/:id/cancel", post(svc::cancel_service))
        .route("/services/:id/reject", post(svc::reject_service))
        .route("/services/:id/date-change", post(svc::request_date_change))
        .route("/services/:id/propose-date", post(svc::propose_date))
        .route("/services/:id/confirm-date", post(svc::confirm_date))
        .route("/services/:id/reject-date", post(svc::reject_date))
        .route("/services/:id/approve", post(svc::approve_plan))
        .route("/services/:id/request-changes", post(svc::request_changes))
        .route("/services/:id/payment", post(svc::record_payment))
        .route("/services/:id/pickup", post(svc::confirm_pickup))
        .route(
            "/services/:id/details",
            axum::routing::patch(svc::update_details),
        );

    let vehicle_routes = Router::new()
        .route(
            "/vehicles",
            get(vehicles::list_vehicles).post(vehicles::create_vehicle),
        )
        .route(
            "/vehicles/:id",
            get(vehicles::get_vehicle)
                .put(vehicles::update_vehicle)
                .delete(vehicles::delete_vehicle),
        );

    let user_routes = Router::new()
        .route("/users", get(users::list_users).post(users::create_user))
        .route("/users/me", get(users::current_user))
        .route("/users/:id", get(users::get_user).put(users::update_user))
        .route("/users/:id/role", put(users::change_role))
        .route("/users/:id/active", put(users::set_active));

    let authenticated = Router::new()
        .merge(services)
        .merge(vehicle_routes)
        .merge(user_routes)
        .route("/stats", get(stats::get_stats))
        .route_layer(middleware::from_fn_with_state(state, auth::require_actor));

    Router::new()
        .route("/status", get(api_status))
        .route("/users/register", post(users::register))
        .merge(authenticated)
}

/// Full application router with the HTTP middleware stack applied.
pub fn app(state: AppState) -> Router {
    let timeout = Duration::from_secs(state.config.request_timeout_secs);
    let cors = if state.config.is_production() {
        CorsLayer::new()
    } else {
        CorsLayer::permissive()
    };

    Router::new()
        .route("/", get(|| async { "carservice-api up" }))
        .merge(handlers::health::health_routes())
        .merge(openapi::openapi_routes())
        .nest("/api/v1", api_v1_routes(state.clone()))
        .layer(middleware::from_fn(metrics::track_http_metrics))
        .layer(TimeoutLayer::new(timeout))
        .layer(cors)
        .layer(TraceLayer::new_for_http().make_span_with(crate::tracing::RequestSpanMaker))
        // Outermost so every inner layer sees the request id
        .layer(middleware::from_fn(crate::tracing::request_id_middleware))
        .with_state(state)
}

async fn api_status() -> Result<Json<ApiResponse<Value>>, errors::ServiceError> {
    let status_data = json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
        "service": "carservice-api",
        "timestamp": chrono::Utc::now().to_rfc3339(),
    });

    Ok(Json(ApiResponse::success(status_data)))
}

pub mod prelude {
    pub use crate::auth::Actor;
    pub use crate::commands::Command;
    pub use crate::db::DbPool;
    pub use crate::entities::{
        service::{ServicePriority, ServiceStatus},
        user::UserRole,
    };
    pub use crate::errors::ServiceError;
    pub use crate::events::{Event, EventSender};
    pub use crate::workflow::WorkflowError;
    pub use crate::{ApiResponse, AppState};
}
