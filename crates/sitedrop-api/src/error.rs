use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use sitedrop_relay::RelayError;
use sitedrop_types::api::ErrorBody;
use tracing::error;

pub type ApiResult<T> = Result<T, ApiError>;

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("{0}")]
    BadRequest(String),

    #[error("{0}")]
    Unauthorized(&'static str),

    #[error("{0}")]
    NotFound(&'static str),

    #[error("{0}")]
    Conflict(&'static str),

    #[error("file exceeds the upload limit")]
    PayloadTooLarge,

    /// The hosting API failed or answered with a non-success status.
    #[error("{message}")]
    Upstream {
        message: &'static str,
        #[source]
        source: RelayError,
    },

    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl ApiError {
    pub fn upstream(message: &'static str, source: RelayError) -> Self {
        ApiError::Upstream { message, source }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Conflict(_) => StatusCode::CONFLICT,
            ApiError::PayloadTooLarge => StatusCode::PAYLOAD_TOO_LARGE,
            ApiError::Upstream { .. } | ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = match &self {
            ApiError::Upstream { message, source } => {
                error!("{}: {}", message, source);
                let (upstream_status, details) = match source.upstream() {
                    Some((code, body)) => (Some(code), body.to_string()),
                    None => (None, source.to_string()),
                };
                ErrorBody {
                    error: message.to_string(),
                    details: Some(details),
                    status: upstream_status,
                }
            }
            ApiError::Internal(e) => {
                error!("Internal error: {:#}", e);
                ErrorBody {
                    error: "Internal server error".into(),
                    details: None,
                    status: None,
                }
            }
            other => ErrorBody {
                error: other.to_string(),
                details: None,
                status: None,
            },
        };
        (status, Json(body)).into_response()
    }
}
