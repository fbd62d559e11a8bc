use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use keysync_core::Error;

/// Error type returned by request handlers.
///
/// Validation failures carry their message back to the caller; every other
/// failure is logged with its detail and surfaced as a generic 500 so
/// upstream response bodies never leak to visitors.
#[derive(Debug)]
pub struct ApiError(Error);

impl From<Error> for ApiError {
    fn from(err: Error) -> Self {
        Self(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self.0 {
            Error::Validation(message) => (StatusCode::BAD_REQUEST, message).into_response(),
            err => {
                tracing::error!(code = err.error_code(), error = %err, "request failed");
                (StatusCode::INTERNAL_SERVER_ERROR, "internal server error").into_response()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validation_maps_to_bad_request() {
        let response = ApiError(Error::Validation("key too long".to_string())).into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn upstream_detail_is_not_exposed() {
        let response = ApiError(Error::UpstreamStatus {
            status: 403,
            body: "secret detail".to_string(),
        })
        .into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
