// Read-only pages: feeds and post detail

use axum::{
    extract::{Path, Query, State},
    http::{StatusCode, Uri},
    response::Response,
};
use serde_json::json;

use super::{login_required, render, rendered};
use super::{TEMPLATE_FOLLOW, TEMPLATE_GROUP, TEMPLATE_INDEX, TEMPLATE_POST_DETAIL, TEMPLATE_PROFILE};
use crate::{
    app_state::AppState,
    core::{PageContext, PageQuery, PostId},
    error::AppResult,
    infrastructure::Vc,
    services::FeedScope,
};

/// GET / - each page number is served from the index cache while it is fresh.
pub async fn index(State(state): State<AppState>, Query(query): Query<PageQuery>) -> AppResult<Response> {
    let number = query.number();
    let feeds = &state.feeds;
    let body = state
        .index_cache
        .get_or_render(number, move || async move {
            let page = feeds.page(FeedScope::Global, number).await?;
            render(TEMPLATE_INDEX, json!({ "page_obj": PageContext::from(page) }))
        })
        .await?;
    Ok(rendered(StatusCode::OK, body))
}

/// GET /group/{slug}/
pub async fn group_posts(
    State(state): State<AppState>,
    Path(slug): Path<String>,
    Query(query): Query<PageQuery>,
) -> AppResult<Response> {
    let group = state.feeds.resolve_group(&slug).await?;
    let page = state.feeds.page(FeedScope::Group(group.id), query.number()).await?;

    let body = render(
        TEMPLATE_GROUP,
        json!({ "group": group, "page_obj": PageContext::from(page) }),
    )?;
    Ok(rendered(StatusCode::OK, body))
}

/// GET /profile/{username}/
pub async fn profile(
    State(state): State<AppState>,
    vc: Vc,
    Path(username): Path<String>,
    Query(query): Query<PageQuery>,
) -> AppResult<Response> {
    let author = state.feeds.resolve_author(&username).await?;
    let page = state.feeds.page(FeedScope::Profile(author.id), query.number()).await?;
    let post_count = page.count;

    let following = match vc.user_id() {
        Some(viewer_id) if viewer_id != author.id => {
            state.follows.is_following(viewer_id, author.id).await?
        }
        _ => false,
    };

    let body = render(
        TEMPLATE_PROFILE,
        json!({
            "user_profile": author,
            "post_count": post_count,
            "following": following,
            "page_obj": PageContext::from(page),
        }),
    )?;
    Ok(rendered(StatusCode::OK, body))
}

/// GET /posts/{post_id}/
pub async fn post_detail(
    State(state): State<AppState>,
    Path(post_id): Path<PostId>,
) -> AppResult<Response> {
    let body = render_post_detail(&state, post_id, None, None).await?;
    Ok(rendered(StatusCode::OK, body))
}

/// Detail context; `errors` and `text` carry a rejected comment submission.
pub(crate) async fn render_post_detail(
    state: &AppState,
    post_id: PostId,
    errors: Option<String>,
    text: Option<&str>,
) -> AppResult<axum::body::Bytes> {
    let post = state.feeds.post_view(post_id).await?;
    let post_count = state.feeds.count(FeedScope::Profile(post.author_id)).await?;
    let comments = state.comments.comments_for(post_id).await?;

    render(
        TEMPLATE_POST_DETAIL,
        json!({
            "post": post,
            "title": post.title(),
            "post_count": post_count,
            "comments": comments,
            "form": {
                "fields": ["text"],
                "text": text.unwrap_or_default(),
                "errors": errors,
            },
        }),
    )
}

/// GET /follow/ - posts by the authors the viewer follows.
pub async fn follow_index(
    State(state): State<AppState>,
    vc: Vc,
    uri: Uri,
    Query(query): Query<PageQuery>,
) -> AppResult<Response> {
    let user = login_required(&state, &vc, &uri)?;
    let page = state.feeds.page(FeedScope::Follow(user.id), query.number()).await?;

    let body = render(TEMPLATE_FOLLOW, json!({ "page_obj": PageContext::from(page) }))?;
    Ok(rendered(StatusCode::OK, body))
}
