use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Extension, Json,
};
use serde::Deserialize;
use utoipa::{IntoParams, ToSchema};

use crate::{
    auth::Actor,
    commands::vehicles::{CreateVehicleCommand, DeleteVehicleCommand, UpdateVehicleCommand},
    entities::vehicle,
    errors::ServiceError,
    ApiResponse, ApiResult, AppState,
};

#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateVehicleRequest {
    /// Staff only; clients always register for themselves
    pub owner_id: Option<i32>,
    pub make: String,
    pub model: String,
    pub year: i32,
    pub vin: String,
    pub license_plate: String,
    pub color: Option<String>,
    pub mileage: Option<i32>,
}

#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct UpdateVehicleRequest {
    pub make: Option<String>,
    pub model: Option<String>,
    pub year: Option<i32>,
    pub vin: Option<String>,
    pub license_plate: Option<String>,
    pub color: Option<String>,
    pub mileage: Option<i32>,
}

#[derive(Debug, Default, Deserialize, IntoParams)]
pub struct VehicleListQuery {
    pub owner_id: Option<i32>,
}

#[utoipa::path(
    post,
    path = "/api/v1/vehicles",
    request_body = CreateVehicleRequest,
    responses(
        (status = 201, description = "Vehicle registered", body = ApiResponse<vehicle::Model>),
        (status = 400, description = "Invalid vehicle data", body = crate::errors::ErrorResponse),
        (status = 409, description = "VIN or license plate already registered", body = crate::errors::ErrorResponse),
        (status = 422, description = "Owner cannot register more vehicles", body = crate::errors::ErrorResponse)
    ),
    tag = "vehicles"
)]
pub async fn create_vehicle(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Json(request): Json<CreateVehicleRequest>,
) -> Result<(StatusCode, Json<ApiResponse<vehicle::Model>>), ServiceError> {
    let created = state
        .services
        .vehicles
        .create(CreateVehicleCommand {
            actor_id: actor.id(),
            owner_id: request.owner_id,
            make: request.make.trim().to_string(),
            model: request.model.trim().to_string(),
            year: request.year,
            vin: request.vin.trim().to_uppercase(),
            license_plate: request.license_plate.trim().to_uppercase(),
            color: request.color,
            mileage: request.mileage,
            max_vehicles_per_owner: state.config.max_vehicles_per_owner,
        })
        .await?;
    Ok((StatusCode::CREATED, Json(ApiResponse::success(created))))
}

#[utoipa::path(
    get,
    path = "/api/v1/vehicles",
    params(VehicleListQuery),
    responses(
        (status = 200, description = "Vehicles visible to the actor", body = ApiResponse<Vec<vehicle::Model>>)
    ),
    tag = "vehicles"
)]
pub async fn list_vehicles(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Query(query): Query<VehicleListQuery>,
) -> ApiResult<Vec<vehicle::Model>> {
    let vehicles = state.services.vehicles.list(&actor, query.owner_id).await?;
    Ok(Json(ApiResponse::success(vehicles)))
}

#[utoipa::path(
    get,
    path = "/api/v1/vehicles/:id",
    params(("id" = i32, Path, description = "Vehicle id")),
    responses(
        (status = 200, description = "Vehicle", body = ApiResponse<vehicle::Model>),
        (status = 403, description = "Forbidden", body = crate::errors::ErrorResponse),
        (status = 404, description = "Not found", body = crate::errors::ErrorResponse)
    ),
    tag = "vehicles"
)]
pub async fn get_vehicle(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Path(id): Path<i32>,
) -> ApiResult<vehicle::Model> {
    let vehicle = state.services.vehicles.get(&actor, id).await?;
    Ok(Json(ApiResponse::success(vehicle)))
}

#[utoipa::path(
    put,
    path = "/api/v1/vehicles/:id",
    params(("id" = i32, Path, description = "Vehicle id")),
    request_body = UpdateVehicleRequest,
    responses(
        (status = 200, description = "Vehicle updated", body = ApiResponse<vehicle::Model>),
        (status = 403, description = "Forbidden", body = crate::errors::ErrorResponse),
        (status = 409, description = "VIN or license plate already registered", body = crate::errors::ErrorResponse)
    ),
    tag = "vehicles"
)]
pub async fn update_vehicle(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Path(id): Path<i32>,
    Json(request): Json<UpdateVehicleRequest>,
) -> ApiResult<vehicle::Model> {
    let updated = state
        .services
        .vehicles
        .update(UpdateVehicleCommand {
            vehicle_id: id,
            actor_id: actor.id(),
            make: request.make.map(|s| s.trim().to_string()),
            model: request.model.map(|s| s.trim().to_string()),
            year: request.year,
            vin: request.vin.map(|s| s.trim().to_uppercase()),
            license_plate: request.license_plate.map(|s| s.trim().to_uppercase()),
            color: request.color,
            mileage: request.mileage,
        })
        .await?;
    Ok(Json(ApiResponse::success(updated)))
}

#[utoipa::path(
    delete,
    path = "/api/v1/vehicles/:id",
    params(("id" = i32, Path, description = "Vehicle id")),
    responses(
        (status = 204, description = "Vehicle removed"),
        (status = 403, description = "Forbidden", body = crate::errors::ErrorResponse),
        (status = 422, description = "Vehicle has open service requests", body = crate::errors::ErrorResponse)
    ),
    tag = "vehicles"
)]
pub async fn delete_vehicle(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Path(id): Path<i32>,
) -> Result<StatusCode, ServiceError> {
    state
        .services
        .vehicles
        .delete(DeleteVehicleCommand {
            vehicle_id: id,
            actor_id: actor.id(),
        })
        .await?;
    Ok(StatusCode::NO_CONTENT)
}
