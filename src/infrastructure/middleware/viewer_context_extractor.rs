// Vc extractor - hands the request's ViewerContext to handlers

use axum::{extract::FromRequestParts, http::request::Parts};
use std::sync::Arc;

use crate::error::AppError;
use crate::infrastructure::viewer::ViewerContext;

/// Cheap-to-clone handle on the request's `ViewerContext`.
#[derive(Debug, Clone)]
pub struct Vc(Arc<ViewerContext>);

impl Vc {
    pub fn new(vc: Arc<ViewerContext>) -> Self {
        Self(vc)
    }

    pub fn arc(self) -> Arc<ViewerContext> {
        self.0
    }
}

impl std::ops::Deref for Vc {
    type Target = ViewerContext;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl AsRef<ViewerContext> for Vc {
    fn as_ref(&self) -> &ViewerContext {
        &self.0
    }
}

impl<S> FromRequestParts<S> for Vc
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<Arc<ViewerContext>>()
            .map(|vc| Vc(vc.clone()))
            .ok_or_else(|| AppError::Internal("Viewer context middleware not installed".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::Request;

    #[tokio::test]
    async fn test_extracts_from_extensions() {
        let (mut parts, _) = Request::builder().uri("/").body(()).unwrap().into_parts();
        parts
            .extensions
            .insert(Arc::new(ViewerContext::anonymous("test-request".to_string())));

        let vc = Vc::from_request_parts(&mut parts, &()).await.unwrap();
        assert_eq!(vc.request_id, "test-request");
        assert_eq!(vc.arc().request_id, "test-request");
    }

    #[tokio::test]
    async fn test_missing_context_is_an_error() {
        let (mut parts, _) = Request::builder().uri("/").body(()).unwrap().into_parts();
        assert!(Vc::from_request_parts(&mut parts, &()).await.is_err());
    }
}
