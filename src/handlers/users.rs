use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Extension, Json,
};
use serde::Deserialize;
use utoipa::{IntoParams, ToSchema};

use crate::{
    auth::Actor,
    commands::users::{
        ChangeRoleCommand, CreateUserCommand, SetUserActiveCommand, UpdateUserCommand,
    },
    entities::user::{self, UserRole},
    errors::ServiceError,
    ApiResponse, ApiResult, AppState, ListQuery, PaginatedResponse,
};

/// Self-registration payload. Passwords never reach this API.
#[derive(Debug, Deserialize, ToSchema)]
pub struct RegisterRequest {
    pub username: String,
    pub email: String,
    /// Opaque credential produced by the upstream authentication layer. It is
    /// stored as given and never returned.
    #[schema(write_only)]
    pub password_hash: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateUserRequest {
    #[serde(flatten)]
    pub account: RegisterRequest,
    #[serde(default)]
    pub role: UserRole,
}

#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct UpdateUserRequest {
    pub email: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct RoleRequest {
    pub role: UserRole,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct ActiveRequest {
    pub active: bool,
}

#[derive(Debug, Default, Deserialize, IntoParams)]
pub struct UserListQuery {
    pub role: Option<UserRole>,
}

fn create_command(actor_id: Option<i32>, account: RegisterRequest, role: UserRole) -> CreateUserCommand {
    CreateUserCommand {
        actor_id,
        username: account.username.trim().to_string(),
        email: account.email,
        password_hash: account.password_hash,
        role,
        first_name: account.first_name,
        last_name: account.last_name,
        phone: account.phone,
        address: account.address,
    }
}

/// Public self-registration. Always creates a client account.
#[utoipa::path(
    post,
    path = "/api/v1/users/register",
    request_body = RegisterRequest,
    responses(
        (status = 201, description = "Account created", body = ApiResponse<user::Model>),
        (status = 400, description = "Invalid account data", body = crate::errors::ErrorResponse),
        (status = 409, description = "Username or email already taken", body = crate::errors::ErrorResponse)
    ),
    tag = "users"
)]
pub async fn register(
    State(state): State<AppState>,
    Json(request): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<ApiResponse<user::Model>>), ServiceError> {
    let created = state
        .services
        .users
        .create(create_command(None, request, UserRole::Client))
        .await?;
    Ok((StatusCode::CREATED, Json(ApiResponse::success(created))))
}

#[utoipa::path(
    post,
    path = "/api/v1/users",
    request_body = CreateUserRequest,
    responses(
        (status = 201, description = "Account created", body = ApiResponse<user::Model>),
        (status = 403, description = "Only admins may create staff accounts", body = crate::errors::ErrorResponse),
        (status = 409, description = "Username or email already taken", body = crate::errors::ErrorResponse)
    ),
    tag = "users"
)]
pub async fn create_user(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Json(request): Json<CreateUserRequest>,
) -> Result<(StatusCode, Json<ApiResponse<user::Model>>), ServiceError> {
    let created = state
        .services
        .users
        .create(create_command(Some(actor.id()), request.account, request.role))
        .await?;
    Ok((StatusCode::CREATED, Json(ApiResponse::success(created))))
}

#[utoipa::path(
    get,
    path = "/api/v1/users",
    params(ListQuery, UserListQuery),
    responses(
        (status = 200, description = "Accounts", body = ApiResponse<PaginatedResponse<user::Model>>),
        (status = 403, description = "Staff only", body = crate::errors::ErrorResponse)
    ),
    tag = "users"
)]
pub async fn list_users(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Query(query): Query<ListQuery>,
    Query(filter): Query<UserListQuery>,
) -> ApiResult<PaginatedResponse<user::Model>> {
    let per_page = state.config.page_size(query.per_page);
    let page = state
        .services
        .users
        .list(&actor, filter.role, query.page, per_page)
        .await?;
    Ok(Json(ApiResponse::success(page.into())))
}

/// The account the request acts as.
#[utoipa::path(
    get,
    path = "/api/v1/users/me",
    responses((status = 200, description = "Current account", body = ApiResponse<user::Model>)),
    tag = "users"
)]
pub async fn current_user(Extension(actor): Extension<Actor>) -> ApiResult<user::Model> {
    Ok(Json(ApiResponse::success(actor.0)))
}

#[utoipa::path(
    get,
    path = "/api/v1/users/:id",
    params(("id" = i32, Path, description = "User id")),
    responses(
        (status = 200, description = "Account", body = ApiResponse<user::Model>),
        (status = 403, description = "Forbidden", body = crate::errors::ErrorResponse),
        (status = 404, description = "Not found", body = crate::errors::ErrorResponse)
    ),
    tag = "users"
)]
pub async fn get_user(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Path(id): Path<i32>,
) -> ApiResult<user::Model> {
    let user = state.services.users.get(&actor, id).await?;
    Ok(Json(ApiResponse::success(user)))
}

#[utoipa::path(
    put,
    path = "/api/v1/users/:id",
    params(("id" = i32, Path, description = "User id")),
    request_body = UpdateUserRequest,
    responses(
        (status = 200, description = "Account updated", body = ApiResponse<user::Model>),
        (status = 403, description = "Forbidden", body = crate::errors::ErrorResponse),
        (status = 409, description = "Email already taken", body = crate::errors::ErrorResponse)
    ),
    tag = "users"
)]
pub async fn update_user(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Path(id): Path<i32>,
    Json(request): Json<UpdateUserRequest>,
) -> ApiResult<user::Model> {
    let updated = state
        .services
        .users
        .update(UpdateUserCommand {
            user_id: id,
            actor_id: actor.id(),
            email: request.email,
            first_name: request.first_name,
            last_name: request.last_name,
            phone: request.phone,
            address: request.address,
        })
        .await?;
    Ok(Json(ApiResponse::success(updated)))
}

#[utoipa::path(
    put,
    path = "/api/v1/users/:id/role",
    params(("id" = i32, Path, description = "User id")),
    request_body = RoleRequest,
    responses(
        (status = 200, description = "Role changed", body = ApiResponse<user::Model>),
        (status = 403, description = "Admins only", body = crate::errors::ErrorResponse),
        (status = 422, description = "Role change not allowed", body = crate::errors::ErrorResponse)
    ),
    tag = "users"
)]
pub async fn change_role(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Path(id): Path<i32>,
    Json(request): Json<RoleRequest>,
) -> ApiResult<user::Model> {
    let updated = state
        .services
        .users
        .change_role(ChangeRoleCommand {
            user_id: id,
            actor_id: actor.id(),
            role: request.role,
        })
        .await?;
    Ok(Json(ApiResponse::success(updated)))
}

#[utoipa::path(
    put,
    path = "/api/v1/users/:id/active",
    params(("id" = i32, Path, description = "User id")),
    request_body = ActiveRequest,
    responses(
        (status = 200, description = "Activation updated", body = ApiResponse<user::Model>),
        (status = 403, description = "Forbidden", body = crate::errors::ErrorResponse),
        (status = 422, description = "Admins cannot deactivate themselves", body = crate::errors::ErrorResponse)
    ),
    tag = "users"
)]
pub async fn set_active(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Path(id): Path<i32>,
    Json(request): Json<ActiveRequest>,
) -> ApiResult<user::Model> {
    let updated = state
        .services
        .users
        .set_active(SetUserActiveCommand {
            user_id: id,
            actor_id: actor.id(),
            active: request.active,
        })
        .await?;
    Ok(Json(ApiResponse::success(updated)))
}
