use axum::{routing::get, Json, Router};
use utoipa::OpenApi;

use crate::{handlers, AppState};

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Car Service API",
        version = "1.0.0",
        description = r#"
# Car Service API

Backend for an auto-repair shop: client and staff accounts, the vehicle
registry and the service request workflow.

## Acting user

Credentials are checked upstream. Every endpoint except registration and the
health checks expects the authenticated user's id in the `X-Actor-Id` header.

## Optimistic locking

Workflow endpoints accept an optional `expected_version`. When it no longer
matches the stored service the request fails with `409 Conflict` and code
`concurrent_modification`.

## Error Handling

```json
{
  "error": "Unprocessable Entity",
  "message": "Invalid status transition from pending to scheduled",
  "code": "invalid_transition",
  "timestamp": "2024-01-01T00:00:00Z"
}
```
        "#,
        license(
            name = "MIT",
            url = "https://opensource.org/licenses/MIT"
        )
    ),
    servers(
        (url = "http://localhost:8080", description = "Local development")
    ),
    tags(
        (name = "services", description = "Service request workflow"),
        (name = "vehicles", description = "Vehicle registry"),
        (name = "users", description = "Accounts and roles"),
        (name = "stats", description = "Staff dashboard totals"),
        (name = "health", description = "Liveness and readiness checks")
    ),
    paths(
        handlers::services::create_service,
        handlers::services::list_services,
        handlers::services::get_service,
        handlers::services::delete_service,
        handlers::services::get_history,
        handlers::services::update_status,
        handlers::services::assign_employee,
        handlers::services::cancel_service,
        handlers::services::reject_service,
        handlers::services::request_date_change,
        handlers::services::propose_date,
        handlers::services::confirm_date,
        handlers::services::reject_date,
        handlers::services::approve_plan,
        handlers::services::request_changes,
        handlers::services::record_payment,
        handlers::services::confirm_pickup,
        handlers::services::update_details,
        handlers::vehicles::create_vehicle,
        handlers::vehicles::list_vehicles,
        handlers::vehicles::get_vehicle,
        handlers::vehicles::update_vehicle,
        handlers::vehicles::delete_vehicle,
        handlers::users::register,
        handlers::users::create_user,
        handlers::users::list_users,
        handlers::users::current_user,
        handlers::users::get_user,
        handlers::users::update_user,
        handlers::users::change_role,
        handlers::users::set_active,
        handlers::stats::get_stats,
        handlers::health::liveness_check,
        handlers::health::readiness_check
    ),
    components(
        schemas(
            crate::entities::user::Model,
            crate::entities::user::UserRole,
            crate::entities::vehicle::Model,
            crate::entities::service::Model,
            crate::entities::service::ServiceStatus,
            crate::entities::service::ServicePriority,
            crate::entities::service_history::Model,
            crate::repositories::history_repository::HistoryEntry,
            crate::repositories::history_repository::HistoryOrder,
            crate::workflow::DetailsUpdate,
            crate::services::dashboard::DashboardStats,
            crate::services::dashboard::StatusCount,
            crate::services::dashboard::RoleCount,
            handlers::services::CreateServiceRequest,
            handlers::services::StatusChangeRequest,
            handlers::services::AssignRequest,
            handlers::services::ReasonRequest,
            handlers::services::DateChangeRequest,
            handlers::services::ProposeDateRequest,
            handlers::services::VersionRequest,
            handlers::services::ChangesRequest,
            handlers::services::PaymentRequest,
            handlers::services::DetailsRequest,
            handlers::vehicles::CreateVehicleRequest,
            handlers::vehicles::UpdateVehicleRequest,
            handlers::users::RegisterRequest,
            handlers::users::CreateUserRequest,
            handlers::users::UpdateUserRequest,
            handlers::users::RoleRequest,
            handlers::users::ActiveRequest,
            handlers::health::HealthResponse,
            crate::errors::ErrorResponse
        )
    )
)]
pub struct ApiDocV1;

/// Serves the generated document as JSON.
pub fn openapi_routes() -> Router<AppState> {
    Router::new().route(
        "/api-docs/openapi.json",
        get(|| async { Json(ApiDocV1::openapi()) }),
    )
}
