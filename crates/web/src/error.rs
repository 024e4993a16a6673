use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use bracket::BracketError;
use serde_json::json;
use std::fmt;
use storage::error::StorageError;
use validator::ValidationErrors;

/// Web layer errors
#[derive(Debug)]
pub enum WebError {
    Storage(StorageError),
    Bracket(BracketError),
    Validation(ValidationErrors),
    BadRequest(String),
    Unauthorized,
}

impl fmt::Display for WebError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Storage(e) => write!(f, "Storage error: {}", e),
            Self::Bracket(e) => write!(f, "Bracket error: {}", e),
            Self::Validation(e) => write!(f, "Validation error: {}", e),
            Self::BadRequest(msg) => write!(f, "Bad request: {}", msg),
            Self::Unauthorized => write!(f, "Unauthorized"),
        }
    }
}

fn storage_response(error: &StorageError) -> (StatusCode, serde_json::Value) {
    match error {
        StorageError::NotFound => (
            StatusCode::NOT_FOUND,
            json!({
                "error": "Resource not found"
            }),
        ),
        StorageError::ConstraintViolation(msg) | StorageError::Conflict(msg) => (
            StatusCode::CONFLICT,
            json!({
                "error": msg
            }),
        ),
        e => {
            tracing::error!("Storage error: {:?}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                json!({
                    "error": "An internal error occurred"
                }),
            )
        }
    }
}

impl IntoResponse for WebError {
    fn into_response(self) -> Response {
        let (status_code, body) = match &self {
            Self::Storage(e) => storage_response(e),
            Self::Bracket(BracketError::Persistence(e)) => storage_response(e),
            Self::Bracket(e @ BracketError::NotFound(_)) => (
                StatusCode::NOT_FOUND,
                json!({
                    "error": e.to_string()
                }),
            ),
            Self::Bracket(e @ BracketError::InvalidBracket(_)) => {
                tracing::error!("Bracket consistency error: {}", e);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    json!({
                        "error": "An internal error occurred"
                    }),
                )
            }
            Self::Bracket(e) => (
                StatusCode::BAD_REQUEST,
                json!({
                    "error": e.to_string()
                }),
            ),
            Self::Validation(errors) => {
                let field_errors: Vec<String> = errors
                    .field_errors()
                    .iter()
                    .flat_map(|(field, errors)| {
                        errors.iter().map(move |e| {
                            format!(
                                "{}: {}",
                                field,
                                e.message
                                    .as_ref()
                                    .map(|m| m.to_string())
                                    .unwrap_or_else(|| e.code.to_string())
                            )
                        })
                    })
                    .collect();

                (
                    StatusCode::BAD_REQUEST,
                    json!({
                        "error": "Validation failed",
                        "details": field_errors
                    }),
                )
            }
            Self::BadRequest(msg) => (
                StatusCode::BAD_REQUEST,
                json!({
                    "error": msg
                }),
            ),
            Self::Unauthorized => (
                StatusCode::UNAUTHORIZED,
                json!({
                    "error": "Unauthorized"
                }),
            ),
        };

        (status_code, Json(body)).into_response()
    }
}

impl From<StorageError> for WebError {
    fn from(error: StorageError) -> Self {
        Self::Storage(error)
    }
}

impl From<BracketError> for WebError {
    fn from(error: BracketError) -> Self {
        Self::Bracket(error)
    }
}

impl From<ValidationErrors> for WebError {
    fn from(error: ValidationErrors) -> Self {
        Self::Validation(error)
    }
}

pub type WebResult<T> = Result<T, WebError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bracket_errors_map_to_status_codes() {
        let cases = [
            (WebError::from(BracketError::NotFound("Match")), StatusCode::NOT_FOUND),
            (WebError::from(BracketError::NotReady), StatusCode::BAD_REQUEST),
            (WebError::from(BracketError::VotingClosed), StatusCode::BAD_REQUEST),
            (WebError::from(BracketError::AmbiguousResult), StatusCode::BAD_REQUEST),
            (
                WebError::from(BracketError::InvalidBracket("gap".to_string())),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
            (
                WebError::from(BracketError::Persistence(StorageError::Unavailable(
                    "down".to_string(),
                ))),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
            (WebError::from(StorageError::NotFound), StatusCode::NOT_FOUND),
            (WebError::Unauthorized, StatusCode::UNAUTHORIZED),
        ];

        for (error, expected) in cases {
            assert_eq!(error.into_response().status(), expected);
        }
    }
}
