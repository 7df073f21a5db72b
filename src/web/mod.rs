// Web interface - axum routes over the services

pub mod follow;
pub mod forms;
pub mod pages;

use axum::{
    body::Bytes,
    http::{header, StatusCode, Uri},
    middleware,
    response::{IntoResponse, Response},
    routing::{get, post},
    Router,
};
use serde_json::{json, Value};
use tower_http::trace::TraceLayer;

use crate::{
    app_state::AppState,
    error::{AppError, AppResult},
    infrastructure::{middleware::viewer_context_middleware, Vc},
    models::User,
};

pub const TEMPLATE_INDEX: &str = "posts/index.html";
pub const TEMPLATE_GROUP: &str = "posts/group_list.html";
pub const TEMPLATE_PROFILE: &str = "posts/profile.html";
pub const TEMPLATE_POST_DETAIL: &str = "posts/post_detail.html";
pub const TEMPLATE_POST_CREATE: &str = "posts/create_post.html";
pub const TEMPLATE_FOLLOW: &str = "posts/follow.html";

pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(pages::index))
        .route("/group/{slug}/", get(pages::group_posts))
        .route("/profile/{username}/", get(pages::profile))
        .route("/profile/{username}/follow/", get(follow::profile_follow))
        .route("/profile/{username}/unfollow/", get(follow::profile_unfollow))
        .route("/posts/{post_id}/", get(pages::post_detail))
        .route(
            "/posts/{post_id}/edit/",
            get(forms::post_edit_form).post(forms::post_edit),
        )
        .route("/posts/{post_id}/comment/", post(forms::add_comment))
        .route(
            "/create/",
            get(forms::post_create_form).post(forms::post_create),
        )
        .route("/follow/", get(pages::follow_index))
        .fallback(handler_404)
        .layer(middleware::from_fn_with_state(
            state.clone(),
            viewer_context_middleware::<AppState>,
        ))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn handler_404(uri: Uri) -> AppError {
    AppError::NotFound(format!("No route for {}", uri.path()))
}

/// Serialize the context a template would be rendered with.
pub(crate) fn render(template: &str, context: Value) -> AppResult<Bytes> {
    let document = json!({
        "template": template,
        "context": context,
    });
    serde_json::to_vec(&document)
        .map(Bytes::from)
        .map_err(|e| AppError::Internal(format!("Failed to render {}: {}", template, e)))
}

pub(crate) fn rendered(status: StatusCode, body: Bytes) -> Response {
    (status, [(header::CONTENT_TYPE, "application/json")], body).into_response()
}

pub(crate) fn redirect(location: impl Into<String>) -> Response {
    (StatusCode::FOUND, [(header::LOCATION, location.into())]).into_response()
}

/// The authenticated user, or a login redirect back to the requested URL.
pub(crate) fn login_required<'a>(state: &AppState, vc: &'a Vc, uri: &Uri) -> AppResult<&'a User> {
    let next = uri
        .path_and_query()
        .map(|pq| pq.as_str())
        .unwrap_or_else(|| uri.path());
    vc.require_user(state.login_url(), next)
}

pub(crate) fn post_detail_url(post_id: impl std::fmt::Display) -> String {
    format!("/posts/{}/", post_id)
}

pub(crate) fn profile_url(username: &str) -> String {
    format!("/profile/{}/", username)
}
