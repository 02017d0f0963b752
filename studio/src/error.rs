use axum::{
    response::{IntoResponse, Response},
    Json,
};
use http::StatusCode;

use api::response::ErrorBody;

#[derive(Debug)]
pub enum AppError {
    /// The single broadcast slot is taken
    Conflict(String),
    /// Transition attempted from the wrong state
    InvalidState(String),
    NotFound(String),
    Validation(String),
    PermissionDenied(String),
    DeviceUnavailable(String),
    /// Ingest server or recording storage unreachable or answering non-2xx
    Upstream(String),
    InternalServerError(anyhow::Error),
}

impl AppError {
    pub fn conflict<T: ToString>(t: T) -> Self {
        AppError::Conflict(t.to_string())
    }

    pub fn invalid_state<T: ToString>(t: T) -> Self {
        AppError::InvalidState(t.to_string())
    }

    pub fn not_found<T: ToString>(t: T) -> Self {
        AppError::NotFound(t.to_string())
    }

    pub fn validation<T: ToString>(t: T) -> Self {
        AppError::Validation(t.to_string())
    }

    pub fn permission_denied<T: ToString>(t: T) -> Self {
        AppError::PermissionDenied(t.to_string())
    }

    pub fn device_unavailable<T: ToString>(t: T) -> Self {
        AppError::DeviceUnavailable(t.to_string())
    }

    pub fn upstream<T: ToString>(t: T) -> Self {
        AppError::Upstream(t.to_string())
    }

    pub fn kind(&self) -> &'static str {
        match self {
            AppError::Conflict(_) => "conflict",
            AppError::InvalidState(_) => "invalid_state",
            AppError::NotFound(_) => "not_found",
            AppError::Validation(_) => "validation",
            AppError::PermissionDenied(_) => "permission_denied",
            AppError::DeviceUnavailable(_) => "device_unavailable",
            AppError::Upstream(_) => "upstream",
            AppError::InternalServerError(_) => "internal",
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            AppError::Conflict(_) | AppError::InvalidState(_) => StatusCode::CONFLICT,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
            AppError::PermissionDenied(_) => StatusCode::FORBIDDEN,
            AppError::DeviceUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            AppError::Upstream(_) => StatusCode::BAD_GATEWAY,
            AppError::InternalServerError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Only upstream failures may be retried without re-reading state first
    pub fn is_retryable(&self) -> bool {
        matches!(self, AppError::Upstream(_))
    }
}

impl std::fmt::Display for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AppError::Conflict(msg)
            | AppError::InvalidState(msg)
            | AppError::NotFound(msg)
            | AppError::Validation(msg)
            | AppError::PermissionDenied(msg)
            | AppError::DeviceUnavailable(msg)
            | AppError::Upstream(msg) => write!(f, "{}: {}", self.kind(), msg),
            AppError::InternalServerError(err) => write!(f, "internal: {}", err),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = match &self {
            AppError::InternalServerError(err) => {
                tracing::error!("internal error: {:?}", err);
                err.to_string()
            }
            AppError::Conflict(msg)
            | AppError::InvalidState(msg)
            | AppError::NotFound(msg)
            | AppError::Validation(msg)
            | AppError::PermissionDenied(msg)
            | AppError::DeviceUnavailable(msg)
            | AppError::Upstream(msg) => msg.clone(),
        };
        let body = Json(ErrorBody {
            error: self.kind().to_string(),
            message,
        });
        (status, body).into_response()
    }
}

impl<E> From<E> for AppError
where
    E: Into<anyhow::Error>,
{
    fn from(err: E) -> Self {
        AppError::InternalServerError(err.into())
    }
}
