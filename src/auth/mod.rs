/*!
 * # Authentication and Authorization Module
 *
 * Credential checks happen upstream of this service. Requests arrive with
 * the authenticated user's id in the `X-Actor-Id` header; the middleware
 * here loads that user and rejects unknown or deactivated accounts before
 * any handler runs.
 *
 * Role-based permission predicates live in [`roles`].
 */

use axum::{
    extract::{Request, State},
    http::HeaderMap,
    middleware::Next,
    response::{IntoResponse, Response},
};
use tracing::debug;

use crate::{entities::user, errors::ServiceError, repositories::user_repository, AppState};

pub mod roles;

pub const ACTOR_HEADER: &str = "x-actor-id";

/// The authenticated user a request acts as.
#[derive(Debug, Clone)]
pub struct Actor(pub user::Model);

impl Actor {
    pub fn id(&self) -> i32 {
        self.0.id
    }
}

impl std::ops::Deref for Actor {
    type Target = user::Model;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

/// Reads the actor id from the request headers.
pub fn actor_id_from_headers(headers: &HeaderMap) -> Result<i32, ServiceError> {
    let raw = headers
        .get(ACTOR_HEADER)
        .ok_or_else(|| ServiceError::Unauthorized("missing X-Actor-Id header".into()))?;
    raw.to_str()
        .ok()
        .and_then(|v| v.trim().parse::<i32>().ok())
        .ok_or_else(|| ServiceError::Unauthorized("malformed X-Actor-Id header".into()))
}

/// Middleware that resolves the acting user and stores it as an [`Actor`]
/// request extension.
pub async fn require_actor(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Response {
    let resolved = match actor_id_from_headers(request.headers()) {
        Ok(id) => user_repository::find_actor(state.db.as_ref(), id).await,
        Err(e) => Err(e),
    };

    match resolved {
        Ok(actor) => {
            debug!(actor_id = actor.id, role = %actor.role, "Resolved request actor");
            request.extensions_mut().insert(Actor(actor));
            next.run(request).await
        }
        Err(e) => e.into_response(),
    }
}
