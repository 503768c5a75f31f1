use axum::response::{IntoResponse, Response};
use http::StatusCode;

#[derive(Debug)]
pub enum AppError {
    ValidationFailure(String),
    TranscodeFailure(String),
    OriginServerFailure(String),
    DeviceNotFound(String),
    ConfirmationTimeout(String),
    StreamNotFound(String),
    InternalServerError(anyhow::Error),
}

impl AppError {
    pub fn validation_failure<T>(t: T) -> Self
    where
        T: ToString,
    {
        AppError::ValidationFailure(t.to_string())
    }

    pub fn transcode_failure<T>(t: T) -> Self
    where
        T: ToString,
    {
        AppError::TranscodeFailure(t.to_string())
    }

    pub fn origin_server_failure<T>(t: T) -> Self
    where
        T: ToString,
    {
        AppError::OriginServerFailure(t.to_string())
    }

    pub fn device_not_found<T>(t: T) -> Self
    where
        T: ToString,
    {
        AppError::DeviceNotFound(t.to_string())
    }

    pub fn confirmation_timeout<T>(t: T) -> Self
    where
        T: ToString,
    {
        AppError::ConfirmationTimeout(t.to_string())
    }

    pub fn stream_not_found<T>(t: T) -> Self
    where
        T: ToString,
    {
        AppError::StreamNotFound(t.to_string())
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        match self {
            AppError::ValidationFailure(err) => (StatusCode::BAD_GATEWAY, err).into_response(),
            AppError::TranscodeFailure(err) => (StatusCode::BAD_GATEWAY, err).into_response(),
            AppError::OriginServerFailure(err) => {
                (StatusCode::INTERNAL_SERVER_ERROR, err).into_response()
            }
            AppError::DeviceNotFound(err) => (StatusCode::NOT_FOUND, err).into_response(),
            AppError::ConfirmationTimeout(err) => {
                (StatusCode::GATEWAY_TIMEOUT, err).into_response()
            }
            AppError::StreamNotFound(err) => (StatusCode::NOT_FOUND, err).into_response(),
            AppError::InternalServerError(err) => {
                (StatusCode::INTERNAL_SERVER_ERROR, err.to_string()).into_response()
            }
        }
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
