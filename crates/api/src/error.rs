//! JSON error responses.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use tracing::{error, warn};

use prism_core::image::{ErrorKind, ImageError};
use prism_shared::AppError;

/// Error returned by handlers, rendered as `{"error": <code>, "message": <text>}`.
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    code: &'static str,
    message: String,
}

impl ApiError {
    /// Missing or malformed request input (400).
    #[must_use]
    pub fn validation(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            code: ErrorKind::Validation.as_str(),
            message: message.into(),
        }
    }

    /// Error with an explicit status, for transport-level rejections.
    #[must_use]
    pub fn with_status(status: StatusCode, message: impl Into<String>) -> Self {
        let code = if status == StatusCode::PAYLOAD_TOO_LARGE {
            "payload_too_large"
        } else {
            ErrorKind::Validation.as_str()
        };
        Self {
            status,
            code,
            message: message.into(),
        }
    }

    /// HTTP status of the response.
    #[must_use]
    pub fn status(&self) -> StatusCode {
        self.status
    }

    /// Stable machine-readable code.
    #[must_use]
    pub fn code(&self) -> &'static str {
        self.code
    }
}

impl From<ImageError> for ApiError {
    fn from(err: ImageError) -> Self {
        let kind = err.kind();
        match kind {
            ErrorKind::Processing | ErrorKind::Adapter => {
                error!(error = %err, kind = kind.as_str(), "Image request failed");
            }
            ErrorKind::NotFound => warn!(error = %err, "Image request failed"),
            ErrorKind::Validation => {}
        }

        let app = AppError::from(err);
        let code = match &app {
            AppError::PayloadTooLarge(_) => "payload_too_large",
            _ => kind.as_str(),
        };

        Self {
            status: StatusCode::from_u16(app.status_code())
                .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR),
            code,
            message: app.public_message(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (
            self.status,
            Json(json!({
                "error": self.code,
                "message": self.message
            })),
        )
            .into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use prism_core::StorageError;
    use prism_shared::types::ImageId;
    use rstest::rstest;

    #[rstest]
    #[case(ImageError::validation("bad spec"), StatusCode::BAD_REQUEST, "validation_error")]
    #[case(
        ImageError::FileTooLarge { size: 2, max: 1 },
        StatusCode::PAYLOAD_TOO_LARGE,
        "payload_too_large"
    )]
    #[case(ImageError::ImageNotFound(ImageId::new()), StatusCode::NOT_FOUND, "not_found")]
    #[case(
        StorageError::operation("reset").into(),
        StatusCode::INTERNAL_SERVER_ERROR,
        "adapter_error"
    )]
    fn test_from_image_error(
        #[case] err: ImageError,
        #[case] status: StatusCode,
        #[case] code: &str,
    ) {
        let api = ApiError::from(err);
        assert_eq!(api.status(), status);
        assert_eq!(api.code(), code);
    }
}
