use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use bastion_assets::AssetError;
use bastion_authz::AuthzError;
use bastion_core::CoreError;
use serde_json::json;

pub type Result<T> = std::result::Result<T, ApiError>;

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error(transparent)]
    Asset(#[from] AssetError),

    #[error(transparent)]
    Authz(#[from] AuthzError),

    #[error(transparent)]
    Core(#[from] CoreError),

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Bad request: {0}")]
    BadRequest(String),
}

impl From<validator::ValidationErrors> for ApiError {
    fn from(errors: validator::ValidationErrors) -> Self {
        ApiError::ValidationError(errors.to_string())
    }
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Asset(e) => match e {
                AssetError::NotFound { .. } => StatusCode::NOT_FOUND,
                AssetError::InvalidInput(_) => StatusCode::BAD_REQUEST,
                AssetError::Conflict(_) => StatusCode::CONFLICT,
                AssetError::Dispatch(_) => StatusCode::INTERNAL_SERVER_ERROR,
            },
            ApiError::Authz(e) => match e {
                AuthzError::NotFound { .. } => StatusCode::NOT_FOUND,
                AuthzError::InvalidInput(_) => StatusCode::BAD_REQUEST,
                AuthzError::Conflict(_) => StatusCode::CONFLICT,
                AuthzError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            },
            ApiError::Core(e) => match e {
                CoreError::NotFound(_) => StatusCode::NOT_FOUND,
                CoreError::Invalid(_) => StatusCode::BAD_REQUEST,
                _ => StatusCode::INTERNAL_SERVER_ERROR,
            },
            ApiError::ValidationError(_) | ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            ApiError::Forbidden(_) => StatusCode::FORBIDDEN,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(error = %self, "Request failed");
        }

        let body = Json(json!({
            "error": self.to_string(),
            "status": status.as_u16(),
        }));

        (status, body).into_response()
    }
}
