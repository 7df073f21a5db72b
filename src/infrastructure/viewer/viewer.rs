use crate::core::UserId;
use crate::error::{AppError, AppResult};
use crate::models::User;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Viewer {
    Anonymous,
    User(User),
}

/// Request-scoped identity handed explicitly to every service call.
#[derive(Debug, Clone)]
pub struct ViewerContext {
    pub viewer: Viewer,
    pub request_id: String,
}

impl ViewerContext {
    pub fn anonymous(request_id: String) -> Self {
        Self {
            viewer: Viewer::Anonymous,
            request_id,
        }
    }

    pub fn authenticated_user(user: User, request_id: String) -> Self {
        Self {
            viewer: Viewer::User(user),
            request_id,
        }
    }

    pub fn is_authenticated(&self) -> bool {
        matches!(self.viewer, Viewer::User(_))
    }

    pub fn user(&self) -> Option<&User> {
        match &self.viewer {
            Viewer::User(user) => Some(user),
            Viewer::Anonymous => None,
        }
    }

    pub fn user_id(&self) -> Option<UserId> {
        self.user().map(|u| u.id)
    }

    pub fn username(&self) -> Option<&str> {
        self.user().map(|u| u.username.as_str())
    }

    /// The authenticated user, or a login redirect back to `next`.
    pub fn require_user(&self, login_url: &str, next: &str) -> AppResult<&User> {
        self.user()
            .ok_or_else(|| AppError::unauthenticated(login_url, next))
    }
}
