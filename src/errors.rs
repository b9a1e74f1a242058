use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use sea_orm::error::DbErr;
use serde::{Deserialize, Serialize};
use serde_json::json;
use utoipa::ToSchema;

use crate::workflow::WorkflowError;

fn current_request_id() -> Option<String> {
    crate::tracing::current_request_id().map(|rid| rid.as_str().to_string())
}

/// Error body returned by every failing endpoint.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[schema(example = json!({
    "error": "Unprocessable Entity",
    "message": "Invalid status transition from pending to scheduled",
    "code": "invalid_transition",
    "request_id": "req-abc123xyz",
    "timestamp": "2024-12-09T10:30:00.000Z"
}))]
pub struct ErrorResponse {
    /// HTTP status category (e.g., "Not Found", "Conflict")
    pub error: String,
    /// Human-readable error description
    pub message: String,
    /// Machine-readable failure reason
    pub code: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_id: Option<String>,
    /// RFC 3339 timestamp when the error occurred
    pub timestamp: String,
}

#[derive(Debug, thiserror::Error, Serialize)]
pub enum ServiceError {
    #[error("Database error: {0}")]
    DatabaseError(
        #[from]
        #[serde(skip)]
        DbErr,
    ),

    #[error("{0}")]
    Workflow(
        #[from]
        #[serde(skip)]
        WorkflowError,
    ),

    #[error("{field} '{value}' is already in use")]
    Uniqueness { field: &'static str, value: String },

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Invalid operation: {0}")]
    InvalidOperation(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Service {0} was modified concurrently; reload and retry")]
    ConcurrentModification(i32),

    #[error("Internal error: {0}")]
    InternalError(String),
}

impl From<validator::ValidationErrors> for ServiceError {
    fn from(err: validator::ValidationErrors) -> Self {
        ServiceError::ValidationError(err.to_string())
    }
}

impl ServiceError {
    pub fn not_found(kind: &str, id: i32) -> Self {
        ServiceError::NotFound(format!("{} {} not found", kind, id))
    }

    /// Returns the HTTP status code for this error.
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::DatabaseError(_) | Self::InternalError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Workflow(WorkflowError::NotPermitted(_)) | Self::Forbidden(_) => {
                StatusCode::FORBIDDEN
            }
            Self::Workflow(WorkflowError::CostFormat { .. }) | Self::ValidationError(_) => {
                StatusCode::BAD_REQUEST
            }
            Self::Workflow(_) | Self::InvalidOperation(_) => StatusCode::UNPROCESSABLE_ENTITY,
            Self::Uniqueness { .. } | Self::ConcurrentModification(_) => StatusCode::CONFLICT,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Unauthorized(_) => StatusCode::UNAUTHORIZED,
        }
    }

    /// Stable, machine-readable name of the failure reason.
    pub fn code(&self) -> &'static str {
        match self {
            Self::DatabaseError(_) => "database_error",
            Self::Workflow(WorkflowError::InvalidTransition { .. }) => "invalid_transition",
            Self::Workflow(WorkflowError::MissingEmployee { .. }) => "missing_employee",
            Self::Workflow(WorkflowError::CostFormat { .. }) => "cost_format",
            Self::Workflow(WorkflowError::NotPermitted(_)) | Self::Forbidden(_) => "forbidden",
            Self::Workflow(WorkflowError::Rejected(_)) | Self::InvalidOperation(_) => {
                "invalid_operation"
            }
            Self::Uniqueness { .. } => "uniqueness",
            Self::NotFound(_) => "not_found",
            Self::ValidationError(_) => "validation_error",
            Self::Unauthorized(_) => "unauthorized",
            Self::ConcurrentModification(_) => "concurrent_modification",
            Self::InternalError(_) => "internal_error",
        }
    }

    /// Message suitable for HTTP responses. Internal failures are not echoed.
    pub fn response_message(&self) -> String {
        match self {
            Self::DatabaseError(_) => "Database error".to_string(),
            Self::InternalError(_) => "Internal server error".to_string(),
            _ => self.to_string(),
        }
    }
}

impl IntoResponse for ServiceError {
    fn into_response(self) -> Response {
        let status = self.status_code();

        let err = ErrorResponse {
            error: status.canonical_reason().unwrap_or("Error").to_string(),
            message: self.response_message(),
            code: self.code().to_string(),
            request_id: current_request_id(),
            timestamp: chrono::Utc::now().to_rfc3339(),
        };

        (status, Json(err)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::service::ServiceStatus;
    use crate::workflow::CostField;
    use axum::body::to_bytes;

    #[tokio::test]
    async fn error_response_includes_request_id() {
        let response =
            crate::tracing::scope_request_id(crate::tracing::RequestId::new("req-123"), async {
                ServiceError::not_found("Service", 7).into_response()
            })
            .await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);

        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let payload: ErrorResponse = serde_json::from_slice(&body).unwrap();
        assert_eq!(payload.request_id.as_deref(), Some("req-123"));
        assert_eq!(payload.message, "Not found: Service 7 not found");
    }

    #[test]
    fn workflow_failures_keep_distinct_codes() {
        let missing: ServiceError = WorkflowError::MissingEmployee {
            to: ServiceStatus::Scheduled,
        }
        .into();
        let invalid: ServiceError = WorkflowError::InvalidTransition {
            from: ServiceStatus::Pending,
            to: ServiceStatus::Finished,
        }
        .into();
        assert_eq!(missing.code(), "missing_employee");
        assert_eq!(invalid.code(), "invalid_transition");
        assert_eq!(missing.status_code(), StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(invalid.status_code(), StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[test]
    fn status_code_mapping() {
        assert_eq!(
            ServiceError::Uniqueness {
                field: "VIN",
                value: "1HGCM82633A004352".into()
            }
            .status_code(),
            StatusCode::CONFLICT
        );
        assert_eq!(
            ServiceError::ConcurrentModification(3).status_code(),
            StatusCode::CONFLICT
        );
        assert_eq!(
            ServiceError::from(WorkflowError::CostFormat {
                field: CostField::Actual
            })
            .status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ServiceError::from(WorkflowError::NotPermitted("x".into())).status_code(),
            StatusCode::FORBIDDEN
        );
        assert_eq!(
            ServiceError::DatabaseError(DbErr::Custom("boom".into())).response_message(),
            "Database error"
        );
    }

    #[test]
    fn uniqueness_message_names_field() {
        let err = ServiceError::Uniqueness {
            field: "License plate",
            value: "AB-123".into(),
        };
        assert_eq!(err.to_string(), "License plate 'AB-123' is already in use");
    }
}
