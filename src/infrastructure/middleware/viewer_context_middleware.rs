// ViewerContext Middleware - resolves the caller's identity once per request
// and injects it into request extensions

use async_trait::async_trait;
use axum::{
    extract::{Request, State},
    http::{HeaderMap, HeaderName},
    middleware::Next,
    response::Response,
};
use std::sync::Arc;
use tracing::debug;
use uuid::Uuid;

use crate::{
    error::{AppError, AppResult},
    infrastructure::{sqlite_database::Database, viewer::ViewerContext},
};

/// Identity provider seam. Returns the authenticated username, if any.
#[async_trait]
pub trait Authenticator: Send + Sync {
    async fn authenticate(&self, headers: &HeaderMap) -> AppResult<Option<String>>;
}

/// Trusts a header set by the authenticating reverse proxy in front of the
/// service, e.g. `X-Remote-User: leo`.
#[derive(Debug, Clone)]
pub struct HeaderAuthenticator {
    header: HeaderName,
}

impl HeaderAuthenticator {
    pub fn new(header: &str) -> AppResult<Self> {
        let header = HeaderName::try_from(header).map_err(|e| {
            AppError::ConfigurationError(format!("Invalid auth header '{}': {}", header, e))
        })?;
        Ok(Self { header })
    }
}

#[async_trait]
impl Authenticator for HeaderAuthenticator {
    async fn authenticate(&self, headers: &HeaderMap) -> AppResult<Option<String>> {
        let Some(value) = headers.get(&self.header) else {
            return Ok(None);
        };
        let username = value
            .to_str()
            .map_err(|_| AppError::BadRequest(format!("Malformed {} header", self.header)))?
            .trim();
        Ok((!username.is_empty()).then(|| username.to_string()))
    }
}

/// Trait for application state that can resolve identities
pub trait HasViewerResolution {
    fn authenticator(&self) -> &Arc<dyn Authenticator>;
    fn database(&self) -> &Database;
}

pub async fn viewer_context_middleware<T>(
    State(app_state): State<T>,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError>
where
    T: HasViewerResolution + Clone + Send + Sync + 'static,
{
    let username = app_state
        .authenticator()
        .authenticate(request.headers())
        .await?;

    let viewer_context = create_viewer_context(username, app_state.database()).await?;
    debug!(
        request_id = %viewer_context.request_id,
        viewer = viewer_context.username().unwrap_or("anonymous"),
        "Resolved viewer"
    );

    request.extensions_mut().insert(viewer_context);
    Ok(next.run(request).await)
}

async fn create_viewer_context(
    username: Option<String>,
    database: &Database,
) -> AppResult<Arc<ViewerContext>> {
    let request_id = format!("req-{}", Uuid::new_v4());

    let viewer_context = match username {
        Some(username) => {
            let user = database.ensure_user(&username).await?;
            ViewerContext::authenticated_user(user, request_id)
        }
        None => ViewerContext::anonymous(request_id),
    };

    Ok(Arc::new(viewer_context))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[tokio::test]
    async fn test_header_present() {
        let auth = HeaderAuthenticator::new("x-remote-user").unwrap();
        let mut headers = HeaderMap::new();
        headers.insert("x-remote-user", HeaderValue::from_static("leo"));

        assert_eq!(auth.authenticate(&headers).await.unwrap(), Some("leo".to_string()));
    }

    #[tokio::test]
    async fn test_missing_or_blank_header_is_anonymous() {
        let auth = HeaderAuthenticator::new("x-remote-user").unwrap();
        assert_eq!(auth.authenticate(&HeaderMap::new()).await.unwrap(), None);

        let mut headers = HeaderMap::new();
        headers.insert("x-remote-user", HeaderValue::from_static("  "));
        assert_eq!(auth.authenticate(&headers).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_viewer_context_registers_user() {
        let db = Database::new_in_memory().await.unwrap();
        let vc = create_viewer_context(Some("leo".to_string()), &db).await.unwrap();
        assert!(vc.is_authenticated());
        assert!(vc.request_id.starts_with("req-"));
        assert!(db.get_user_by_username("leo").await.unwrap().is_some());

        let anonymous = create_viewer_context(None, &db).await.unwrap();
        assert!(!anonymous.is_authenticated());
    }

    #[test]
    fn test_invalid_header_name() {
        assert!(HeaderAuthenticator::new("bad header").is_err());
    }
}
