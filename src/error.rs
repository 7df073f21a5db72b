use axum::{
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use std::fmt;

/// Login page that anonymous callers are bounced to.
pub const DEFAULT_LOGIN_URL: &str = "/auth/login/";

#[derive(Debug)]
pub enum AppError {
    Database(anyhow::Error),
    DatabaseError(String),
    NotFound(String),
    BadRequest(String),
    Internal(String),
    Validation(String),
    ConfigurationError(String),
    /// Protected action reached without an identity; `next` is the path to
    /// come back to after logging in.
    Unauthenticated { login_url: String, next: String },
}

impl AppError {
    pub fn unauthenticated(login_url: impl Into<String>, next: impl Into<String>) -> Self {
        AppError::Unauthenticated {
            login_url: login_url.into(),
            next: next.into(),
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, AppError::NotFound(_))
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::Database(err) => write!(f, "Database error: {}", err),
            AppError::DatabaseError(msg) => write!(f, "Database error: {}", msg),
            AppError::NotFound(msg) => write!(f, "Not found: {}", msg),
            AppError::BadRequest(msg) => write!(f, "Bad request: {}", msg),
            AppError::Internal(msg) => write!(f, "Internal error: {}", msg),
            AppError::Validation(msg) => write!(f, "Validation error: {}", msg),
            AppError::ConfigurationError(msg) => write!(f, "Configuration error: {}", msg),
            AppError::Unauthenticated { next, .. } => {
                write!(f, "Authentication required for {}", next)
            }
        }
    }
}

impl std::error::Error for AppError {}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_message) = match &self {
            AppError::Database(err) => {
                tracing::error!("Database error: {}", err);
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error".to_string())
            }
            AppError::DatabaseError(msg) => {
                tracing::error!("Database error: {}", msg);
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error".to_string())
            }
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, msg.clone()),
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            AppError::Internal(msg) => {
                tracing::error!("Internal error: {}", msg);
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error".to_string())
            }
            AppError::Validation(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            AppError::ConfigurationError(msg) => {
                tracing::error!("Configuration error: {}", msg);
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error".to_string())
            }
            AppError::Unauthenticated { login_url, next } => {
                let location = login_redirect_location(login_url, next);
                return (StatusCode::FOUND, [(header::LOCATION, location)]).into_response();
            }
        };

        let body = Json(json!({
            "error": error_message,
            "status": status.as_u16()
        }));

        (status, body).into_response()
    }
}

/// `/auth/login/?next=/create/`. `next` is percent-encoded except for `/`,
/// which is legal in a query value.
pub fn login_redirect_location(login_url: &str, next: &str) -> String {
    let escaped = urlencoding::encode(next).replace("%2F", "/");
    format!("{}?next={}", login_url, escaped)
}

impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        AppError::Database(err)
    }
}

impl From<sqlx::Error> for AppError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => AppError::NotFound("Row not found".to_string()),
            other => AppError::DatabaseError(other.to_string()),
        }
    }
}

pub type AppResult<T> = Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_login_redirect_keeps_plain_paths() {
        assert_eq!(
            login_redirect_location("/auth/login/", "/create/"),
            "/auth/login/?next=/create/"
        );
    }

    #[test]
    fn test_login_redirect_escapes_query() {
        assert_eq!(
            login_redirect_location("/auth/login/", "/follow/?page=2"),
            "/auth/login/?next=/follow/%3Fpage%3D2"
        );
    }

    #[test]
    fn test_login_redirect_escapes_plus() {
        assert_eq!(
            login_redirect_location("/auth/login/", "/profile/a+b/follow/"),
            "/auth/login/?next=/profile/a%2Bb/follow/"
        );
        assert_eq!(
            login_redirect_location("/auth/login/", "/follow/?page=2&x=a+b"),
            "/auth/login/?next=/follow/%3Fpage%3D2%26x%3Da%2Bb"
        );
    }

    #[test]
    fn test_unauthenticated_response_is_redirect() {
        let response = AppError::unauthenticated(DEFAULT_LOGIN_URL, "/follow/").into_response();
        assert_eq!(response.status(), StatusCode::FOUND);
        assert_eq!(
            response.headers().get(header::LOCATION).unwrap(),
            "/auth/login/?next=/follow/"
        );
    }

    #[test]
    fn test_row_not_found_maps_to_not_found() {
        let err: AppError = sqlx::Error::RowNotFound.into();
        assert!(err.is_not_found());
        assert_eq!(err.into_response().status(), StatusCode::NOT_FOUND);
    }
}
