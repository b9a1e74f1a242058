//! Service request endpoints.
//!
//! The acting user comes from the [`Actor`] extension; bodies only carry the
//! operation's own parameters. Mutating endpoints accept an optional
//! `expected_version` for optimistic locking.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Extension, Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use crate::{
    auth::Actor,
    commands::services::{
        ApprovePlanCommand, AssignEmployeeCommand, CancelServiceCommand, ConfirmDateCommand,
        ConfirmPickupCommand, CreateServiceCommand, DeleteServiceCommand, ProposeDateCommand,
        RecordPaymentCommand, RejectDateCommand, RejectServiceCommand, RequestChangesCommand,
        RequestDateChangeCommand, UpdateServiceDetailsCommand, UpdateStatusCommand,
    },
    entities::service::{self, ServicePriority, ServiceStatus},
    errors::ServiceError,
    repositories::{
        history_repository::{HistoryEntry, HistoryOrder},
        service_repository::ServiceFilter,
    },
    workflow::DetailsUpdate,
    ApiResponse, ApiResult, AppState, ListQuery, PaginatedResponse,
};

#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateServiceRequest {
    pub vehicle_id: i32,
    pub description: String,
    #[serde(default)]
    pub priority: ServicePriority,
    pub preferred_date: Option<DateTime<Utc>>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct StatusChangeRequest {
    pub status: ServiceStatus,
    pub note: Option<String>,
    pub expected_version: Option<i32>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct AssignRequest {
    pub employee_id: i32,
    pub expected_version: Option<i32>,
}

#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct ReasonRequest {
    pub reason: Option<String>,
    pub expected_version: Option<i32>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct DateChangeRequest {
    pub preferred_date: DateTime<Utc>,
    pub reason: Option<String>,
    pub expected_version: Option<i32>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct ProposeDateRequest {
    pub scheduled_date: DateTime<Utc>,
    pub expected_version: Option<i32>,
}

#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct VersionRequest {
    pub expected_version: Option<i32>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct ChangesRequest {
    pub changes: String,
    pub expected_version: Option<i32>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct PaymentRequest {
    pub payment_method: String,
    pub expected_version: Option<i32>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct DetailsRequest {
    #[serde(flatten)]
    pub update: DetailsUpdate,
    pub expected_version: Option<i32>,
}

#[derive(Debug, Default, Serialize, Deserialize, IntoParams)]
pub struct HistoryQuery {
    pub order: Option<HistoryOrder>,
}

#[utoipa::path(
    post,
    path = "/api/v1/services",
    request_body = CreateServiceRequest,
    responses(
        (status = 201, description = "Service request created", body = ApiResponse<service::Model>),
        (status = 400, description = "Invalid request", body = crate::errors::ErrorResponse),
        (status = 401, description = "Unauthorized", body = crate::errors::ErrorResponse),
        (status = 403, description = "Forbidden", body = crate::errors::ErrorResponse),
        (status = 404, description = "Vehicle not found", body = crate::errors::ErrorResponse)
    ),
    tag = "services"
)]
pub async fn create_service(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Json(request): Json<CreateServiceRequest>,
) -> Result<(StatusCode, Json<ApiResponse<service::Model>>), ServiceError> {
    let created = state
        .services
        .service_requests
        .create(CreateServiceCommand {
            actor_id: actor.id(),
            vehicle_id: request.vehicle_id,
            description: request.description,
            priority: request.priority,
            preferred_date: request.preferred_date,
        })
        .await?;
    Ok((StatusCode::CREATED, Json(ApiResponse::success(created))))
}

#[utoipa::path(
    get,
    path = "/api/v1/services",
    params(ListQuery, ServiceFilter),
    responses(
        (status = 200, description = "Service requests visible to the actor", body = ApiResponse<PaginatedResponse<service::Model>>),
        (status = 401, description = "Unauthorized", body = crate::errors::ErrorResponse)
    ),
    tag = "services"
)]
pub async fn list_services(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Query(query): Query<ListQuery>,
    Query(filter): Query<ServiceFilter>,
) -> ApiResult<PaginatedResponse<service::Model>> {
    let per_page = state.config.page_size(query.per_page);
    let page = state
        .services
        .service_requests
        .list(&actor, filter, query.page, per_page)
        .await?;
    Ok(Json(ApiResponse::success(page.into())))
}

#[utoipa::path(
    get,
    path = "/api/v1/services/:id",
    params(("id" = i32, Path, description = "Service id")),
    responses(
        (status = 200, description = "Service request", body = ApiResponse<service::Model>),
        (status = 403, description = "Forbidden", body = crate::errors::ErrorResponse),
        (status = 404, description = "Not found", body = crate::errors::ErrorResponse)
    ),
    tag = "services"
)]
pub async fn get_service(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Path(id): Path<i32>,
) -> ApiResult<service::Model> {
    let service = state.services.service_requests.get(&actor, id).await?;
    Ok(Json(ApiResponse::success(service)))
}

#[utoipa::path(
    delete,
    path = "/api/v1/services/:id",
    params(("id" = i32, Path, description = "Service id")),
    responses(
        (status = 204, description = "Service request and its history deleted"),
        (status = 403, description = "Admins only", body = crate::errors::ErrorResponse),
        (status = 404, description = "Not found", body = crate::errors::ErrorResponse)
    ),
    tag = "services"
)]
pub async fn delete_service(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Path(id): Path<i32>,
) -> Result<StatusCode, ServiceError> {
    state
        .services
        .service_requests
        .delete(DeleteServiceCommand {
            service_id: id,
            actor_id: actor.id(),
        })
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

#[utoipa::path(
    get,
    path = "/api/v1/services/:id/history",
    params(("id" = i32, Path, description = "Service id"), HistoryQuery),
    responses(
        (status = 200, description = "History entries, newest first by default", body = ApiResponse<Vec<HistoryEntry>>),
        (status = 403, description = "Forbidden", body = crate::errors::ErrorResponse),
        (status = 404, description = "Not found", body = crate::errors::ErrorResponse)
    ),
    tag = "services"
)]
pub async fn get_history(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Path(id): Path<i32>,
    Query(query): Query<HistoryQuery>,
) -> ApiResult<Vec<HistoryEntry>> {
    let entries = state
        .services
        .service_requests
        .history(&actor, id, query.order.unwrap_or_default())
        .await?;
    Ok(Json(ApiResponse::success(entries)))
}

#[utoipa::path(
    put,
    path = "/api/v1/services/:id/status",
    params(("id" = i32, Path, description = "Service id")),
    request_body = StatusChangeRequest,
    responses(
        (status = 200, description = "Status changed", body = ApiResponse<service::Model>),
        (status = 403, description = "Forbidden", body = crate::errors::ErrorResponse),
        (status = 409, description = "Concurrent modification", body = crate::errors::ErrorResponse),
        (status = 422, description = "Transition not allowed", body = crate::errors::ErrorResponse)
    ),
    tag = "services"
)]
pub async fn update_status(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Path(id): Path<i32>,
    Json(request): Json<StatusChangeRequest>,
) -> ApiResult<service::Model> {
    let service = state
        .services
        .service_requests
        .update_status(UpdateStatusCommand {
            service_id: id,
            actor_id: actor.id(),
            new_status: request.status,
            note: request.note,
            expected_version: request.expected_version,
        })
        .await?;
    Ok(Json(ApiResponse::success(service)))
}

#[utoipa::path(
    post,
    path = "/api/v1/services/:id/assign",
    params(("id" = i32, Path, description = "Service id")),
    request_body = AssignRequest,
    responses(
        (status = 200, description = "Employee assigned", body = ApiResponse<service::Model>),
        (status = 403, description = "Forbidden", body = crate::errors::ErrorResponse),
        (status = 422, description = "Assignment rejected", body = crate::errors::ErrorResponse)
    ),
    tag = "services"
)]
pub async fn assign_employee(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Path(id): Path<i32>,
    Json(request): Json<AssignRequest>,
) -> ApiResult<service::Model> {
    let service = state
        .services
        .service_requests
        .assign_employee(AssignEmployeeCommand {
            service_id: id,
            actor_id: actor.id(),
            employee_id: request.employee_id,
            expected_version: request.expected_version,
        })
        .await?;
    Ok(Json(ApiResponse::success(service)))
}

#[utoipa::path(
    post,
    path = "/api/v1/services/:id/cancel",
    params(("id" = i32, Path, description = "Service id")),
    request_body = ReasonRequest,
    responses(
        (status = 200, description = "Service cancelled", body = ApiResponse<service::Model>),
        (status = 403, description = "Forbidden", body = crate::errors::ErrorResponse),
        (status = 422, description = "Cancellation not allowed", body = crate::errors::ErrorResponse)
    ),
    tag = "services"
)]
pub async fn cancel_service(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Path(id): Path<i32>,
    request: Option<Json<ReasonRequest>>,
) -> ApiResult<service::Model> {
    let Json(request) = request.unwrap_or_default();
    let service = state
        .services
        .service_requests
        .cancel(CancelServiceCommand {
            service_id: id,
            actor_id: actor.id(),
            reason: request.reason,
            expected_version: request.expected_version,
        })
        .await?;
    Ok(Json(ApiResponse::success(service)))
}

#[utoipa::path(
    post,
    path = "/api/v1/services/:id/reject",
    params(("id" = i32, Path, description = "Service id")),
    request_body = ReasonRequest,
    responses(
        (status = 200, description = "Request rejected", body = ApiResponse<service::Model>),
        (status = 400, description = "Reason missing", body = crate::errors::ErrorResponse),
        (status = 422, description = "Service is not pending", body = crate::errors::ErrorResponse)
    ),
    tag = "services"
)]
pub async fn reject_service(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Path(id): Path<i32>,
    Json(request): Json<ReasonRequest>,
) -> ApiResult<service::Model> {
    let service = state
        .services
        .service_requests
        .reject(RejectServiceCommand {
            service_id: id,
            actor_id: actor.id(),
            reason: request.reason.unwrap_or_default().trim().to_string(),
            expected_version: request.expected_version,
        })
        .await?;
    Ok(Json(ApiResponse::success(service)))
}

#[utoipa::path(
    post,
    path = "/api/v1/services/:id/date-change",
    params(("id" = i32, Path, description = "Service id")),
    request_body = DateChangeRequest,
    responses(
        (status = 200, description = "Date change requested", body = ApiResponse<service::Model>),
        (status = 403, description = "Forbidden", body = crate::errors::ErrorResponse),
        (status = 422, description = "Not allowed in the current status", body = crate::errors::ErrorResponse)
    ),
    tag = "services"
)]
pub async fn request_date_change(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Path(id): Path<i32>,
    Json(request): Json<DateChangeRequest>,
) -> ApiResult<service::Model> {
    let service = state
        .services
        .service_requests
        .request_date_change(RequestDateChangeCommand {
            service_id: id,
            actor_id: actor.id(),
            preferred_date: request.preferred_date,
            reason: request.reason,
            expected_version: request.expected_version,
        })
        .await?;
    Ok(Json(ApiResponse::success(service)))
}

#[utoipa::path(
    post,
    path = "/api/v1/services/:id/propose-date",
    params(("id" = i32, Path, description = "Service id")),
    request_body = ProposeDateRequest,
    responses(
        (status = 200, description = "Date proposed", body = ApiResponse<service::Model>),
        (status = 403, description = "Forbidden", body = crate::errors::ErrorResponse),
        (status = 422, description = "Not allowed in the current status", body = crate::errors::ErrorResponse)
    ),
    tag = "services"
)]
pub async fn propose_date(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Path(id): Path<i32>,
    Json(request): Json<ProposeDateRequest>,
) -> ApiResult<service::Model> {
    let service = state
        .services
        .service_requests
        .propose_date(ProposeDateCommand {
            service_id: id,
            actor_id: actor.id(),
            scheduled_date: request.scheduled_date,
            expected_version: request.expected_version,
        })
        .await?;
    Ok(Json(ApiResponse::success(service)))
}

#[utoipa::path(
    post,
    path = "/api/v1/services/:id/confirm-date",
    params(("id" = i32, Path, description = "Service id")),
    request_body = VersionRequest,
    responses(
        (status = 200, description = "Date confirmed", body = ApiResponse<service::Model>),
        (status = 422, description = "No date to confirm", body = crate::errors::ErrorResponse)
    ),
    tag = "services"
)]
pub async fn confirm_date(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Path(id): Path<i32>,
    request: Option<Json<VersionRequest>>,
) -> ApiResult<service::Model> {
    let Json(request) = request.unwrap_or_default();
    let service = state
        .services
        .service_requests
        .confirm_date(ConfirmDateCommand {
            service_id: id,
            actor_id: actor.id(),
            expected_version: request.expected_version,
        })
        .await?;
    Ok(Json(ApiResponse::success(service)))
}

#[utoipa::path(
    post,
    path = "/api/v1/services/:id/reject-date",
    params(("id" = i32, Path, description = "Service id")),
    request_body = ReasonRequest,
    responses(
        (status = 200, description = "Date rejected", body = ApiResponse<service::Model>),
        (status = 422, description = "No date to reject", body = crate::errors::ErrorResponse)
    ),
    tag = "services"
)]
pub async fn reject_date(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Path(id): Path<i32>,
    request: Option<Json<ReasonRequest>>,
) -> ApiResult<service::Model> {
    let Json(request) = request.unwrap_or_default();
    let service = state
        .services
        .service_requests
        .reject_date(RejectDateCommand {
            service_id: id,
            actor_id: actor.id(),
            reason: request.reason,
            expected_version: request.expected_version,
        })
        .await?;
    Ok(Json(ApiResponse::success(service)))
}

#[utoipa::path(
    post,
    path = "/api/v1/services/:id/approve",
    params(("id" = i32, Path, description = "Service id")),
    request_body = VersionRequest,
    responses(
        (status = 200, description = "Plan approved", body = ApiResponse<service::Model>),
        (status = 422, description = "Diagnosis not completed", body = crate::errors::ErrorResponse)
    ),
    tag = "services"
)]
pub async fn approve_plan(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Path(id): Path<i32>,
    request: Option<Json<VersionRequest>>,
) -> ApiResult<service::Model> {
    let Json(request) = request.unwrap_or_default();
    let service = state
        .services
        .service_requests
        .approve_plan(ApprovePlanCommand {
            service_id: id,
            actor_id: actor.id(),
            expected_version: request.expected_version,
        })
        .await?;
    Ok(Json(ApiResponse::success(service)))
}

#[utoipa::path(
    post,
    path = "/api/v1/services/:id/request-changes",
    params(("id" = i32, Path, description = "Service id")),
    request_body = ChangesRequest,
    responses(
        (status = 200, description = "Consultation requested", body = ApiResponse<service::Model>),
        (status = 422, description = "Diagnosis not completed", body = crate::errors::ErrorResponse)
    ),
    tag = "services"
)]
pub async fn request_changes(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Path(id): Path<i32>,
    Json(request): Json<ChangesRequest>,
) -> ApiResult<service::Model> {
    let service = state
        .services
        .service_requests
        .request_changes(RequestChangesCommand {
            service_id: id,
            actor_id: actor.id(),
            changes: request.changes.trim().to_string(),
            expected_version: request.expected_version,
        })
        .await?;
    Ok(Json(ApiResponse::success(service)))
}

#[utoipa::path(
    post,
    path = "/api/v1/services/:id/payment",
    params(("id" = i32, Path, description = "Service id")),
    request_body = PaymentRequest,
    responses(
        (status = 200, description = "Payment recorded", body = ApiResponse<service::Model>),
        (status = 422, description = "Service is not ready for payment", body = crate::errors::ErrorResponse)
    ),
    tag = "services"
)]
pub async fn record_payment(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Path(id): Path<i32>,
    Json(request): Json<PaymentRequest>,
) -> ApiResult<service::Model> {
    let service = state
        .services
        .service_requests
        .record_payment(RecordPaymentCommand {
            service_id: id,
            actor_id: actor.id(),
            payment_method: request.payment_method.trim().to_string(),
            expected_version: request.expected_version,
        })
        .await?;
    Ok(Json(ApiResponse::success(service)))
}

#[utoipa::path(
    post,
    path = "/api/v1/services/:id/pickup",
    params(("id" = i32, Path, description = "Service id")),
    request_body = VersionRequest,
    responses(
        (status = 200, description = "Pickup confirmed", body = ApiResponse<service::Model>),
        (status = 422, description = "Vehicle is not ready for pickup", body = crate::errors::ErrorResponse)
    ),
    tag = "services"
)]
pub async fn confirm_pickup(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Path(id): Path<i32>,
    request: Option<Json<VersionRequest>>,
) -> ApiResult<service::Model> {
    let Json(request) = request.unwrap_or_default();
    let service = state
        .services
        .service_requests
        .confirm_pickup(ConfirmPickupCommand {
            service_id: id,
            actor_id: actor.id(),
            expected_version: request.expected_version,
        })
        .await?;
    Ok(Json(ApiResponse::success(service)))
}

#[utoipa::path(
    patch,
    path = "/api/v1/services/:id/details",
    params(("id" = i32, Path, description = "Service id")),
    request_body = DetailsRequest,
    responses(
        (status = 200, description = "Details updated", body = ApiResponse<service::Model>),
        (status = 400, description = "Malformed cost", body = crate::errors::ErrorResponse),
        (status = 403, description = "Forbidden", body = crate::errors::ErrorResponse),
        (status = 422, description = "Edit not allowed", body = crate::errors::ErrorResponse)
    ),
    tag = "services"
)]
pub async fn update_details(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Path(id): Path<i32>,
    Json(request): Json<DetailsRequest>,
) -> ApiResult<service::Model> {
    let service = state
        .services
        .service_requests
        .update_details(UpdateServiceDetailsCommand {
            service_id: id,
            actor_id: actor.id(),
            update: request.update,
            expected_version: request.expected_version,
        })
        .await?;
    Ok(Json(ApiResponse::success(service)))
}
