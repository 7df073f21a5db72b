// Follow toggles; both redirect back to the author's profile

use axum::{
    extract::{Path, State},
    http::Uri,
    response::Response,
};

use super::{login_required, profile_url, redirect};
use crate::{app_state::AppState, error::AppResult, infrastructure::Vc};

/// GET /profile/{username}/follow/
pub async fn profile_follow(
    State(state): State<AppState>,
    vc: Vc,
    uri: Uri,
    Path(username): Path<String>,
) -> AppResult<Response> {
    login_required(&state, &vc, &uri)?;
    let author = state.follows.follow(&vc, &username).await?;
    Ok(redirect(profile_url(&author.username)))
}

/// GET /profile/{username}/unfollow/
pub async fn profile_unfollow(
    State(state): State<AppState>,
    vc: Vc,
    uri: Uri,
    Path(username): Path<String>,
) -> AppResult<Response> {
    login_required(&state, &vc, &uri)?;
    let author = state.follows.unfollow(&vc, &username).await?;
    Ok(redirect(profile_url(&author.username)))
}
