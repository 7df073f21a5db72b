// Login-gated forms: create/edit post and add comment

use axum::{
    extract::{Path, State},
    http::{StatusCode, Uri},
    response::Response,
    Form,
};
use base64::Engine;
use serde::Deserialize;
use serde_json::json;

use super::pages::render_post_detail;
use super::{login_required, post_detail_url, profile_url, redirect, render, rendered, TEMPLATE_POST_CREATE};
use crate::{
    app_state::AppState,
    core::{GroupId, PostId},
    error::{AppError, AppResult},
    infrastructure::Vc,
    models::Post,
    services::{EditOutcome, PostDraft},
};

/// Urlencoded post form. `group` is a group id or empty; `image` is
/// base64-encoded bytes or empty.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PostForm {
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub group: Option<String>,
    #[serde(default)]
    pub image: Option<String>,
}

impl PostForm {
    fn from_post(post: &Post) -> Self {
        Self {
            text: post.text.clone(),
            group: post.group_id.map(|id| id.to_string()),
            image: None,
        }
    }

    pub fn to_draft(&self) -> AppResult<PostDraft> {
        let group_id = match self.group.as_deref().map(str::trim) {
            None | Some("") => None,
            Some(raw) => Some(GroupId(raw.parse::<i64>().map_err(|_| {
                AppError::Validation(format!("'{}' is not a valid group", raw))
            })?)),
        };

        let image = match self.image.as_deref().map(str::trim) {
            None | Some("") => None,
            Some(encoded) => Some(
                base64::engine::general_purpose::STANDARD
                    .decode(encoded)
                    .map_err(|e| AppError::Validation(format!("Invalid image upload: {}", e)))?,
            ),
        };

        Ok(PostDraft {
            text: self.text.clone(),
            group_id,
            image,
        })
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CommentForm {
    #[serde(default)]
    pub text: String,
}

async fn render_post_form(
    state: &AppState,
    post_id: Option<PostId>,
    form: &PostForm,
    errors: Option<String>,
) -> AppResult<axum::body::Bytes> {
    let groups = state.db.list_groups().await?;
    render(
        TEMPLATE_POST_CREATE,
        json!({
            "is_edit": post_id.is_some(),
            "post_id": post_id,
            "groups": groups,
            "form": {
                "fields": ["text", "group", "image"],
                "text": form.text,
                "group": form.group,
                "errors": errors,
            },
        }),
    )
}

/// GET /create/
pub async fn post_create_form(
    State(state): State<AppState>,
    vc: Vc,
    uri: Uri,
) -> AppResult<Response> {
    login_required(&state, &vc, &uri)?;
    let body = render_post_form(&state, None, &PostForm::default(), None).await?;
    Ok(rendered(StatusCode::OK, body))
}

/// POST /create/ - redirects to the author's profile on success.
pub async fn post_create(
    State(state): State<AppState>,
    vc: Vc,
    uri: Uri,
    Form(form): Form<PostForm>,
) -> AppResult<Response> {
    let user = login_required(&state, &vc, &uri)?;

    let result = match form.to_draft() {
        Ok(draft) => state.posts.create_post(&vc, draft).await,
        Err(e) => Err(e),
    };

    match result {
        Ok(_) => Ok(redirect(profile_url(&user.username))),
        Err(AppError::Validation(msg)) => {
            let body = render_post_form(&state, None, &form, Some(msg)).await?;
            Ok(rendered(StatusCode::BAD_REQUEST, body))
        }
        Err(e) => Err(e),
    }
}

/// GET /posts/{post_id}/edit/ - non-authors are sent to the detail page.
pub async fn post_edit_form(
    State(state): State<AppState>,
    vc: Vc,
    uri: Uri,
    Path(post_id): Path<PostId>,
) -> AppResult<Response> {
    let user = login_required(&state, &vc, &uri)?;
    let post = state.posts.get_post(post_id).await?;
    if post.author_id != user.id {
        return Ok(redirect(post_detail_url(post_id)));
    }

    let body = render_post_form(&state, Some(post_id), &PostForm::from_post(&post), None).await?;
    Ok(rendered(StatusCode::OK, body))
}

/// POST /posts/{post_id}/edit/
pub async fn post_edit(
    State(state): State<AppState>,
    vc: Vc,
    uri: Uri,
    Path(post_id): Path<PostId>,
    Form(form): Form<PostForm>,
) -> AppResult<Response> {
    login_required(&state, &vc, &uri)?;

    let result = match form.to_draft() {
        Ok(draft) => state.posts.edit_post(post_id, &vc, draft).await,
        Err(e) => Err(e),
    };

    match result {
        Ok(EditOutcome::Updated(_)) | Ok(EditOutcome::NotAuthor) => {
            Ok(redirect(post_detail_url(post_id)))
        }
        Err(AppError::Validation(msg)) => {
            let body = render_post_form(&state, Some(post_id), &form, Some(msg)).await?;
            Ok(rendered(StatusCode::BAD_REQUEST, body))
        }
        Err(e) => Err(e),
    }
}

/// POST /posts/{post_id}/comment/
pub async fn add_comment(
    State(state): State<AppState>,
    vc: Vc,
    uri: Uri,
    Path(post_id): Path<PostId>,
    Form(form): Form<CommentForm>,
) -> AppResult<Response> {
    login_required(&state, &vc, &uri)?;

    match state.comments.add_comment(post_id, &vc, &form.text).await {
        Ok(_) => Ok(redirect(post_detail_url(post_id))),
        Err(AppError::Validation(msg)) => {
            let body = render_post_detail(&state, post_id, Some(msg), Some(&form.text)).await?;
            Ok(rendered(StatusCode::BAD_REQUEST, body))
        }
        Err(e) => Err(e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_blank_group_and_image_are_none() {
        let form = PostForm {
            text: "hi".to_string(),
            group: Some(String::new()),
            image: Some("  ".to_string()),
        };
        let draft = form.to_draft().unwrap();
        assert_eq!(draft.group_id, None);
        assert_eq!(draft.image, None);
    }

    #[test]
    fn test_group_and_image_parse() {
        let form = PostForm {
            text: "hi".to_string(),
            group: Some("3".to_string()),
            image: Some("R0lGODlh".to_string()),
        };
        let draft = form.to_draft().unwrap();
        assert_eq!(draft.group_id, Some(GroupId(3)));
        assert_eq!(draft.image.as_deref(), Some(&b"GIF89a"[..]));
    }

    #[test]
    fn test_bad_group_or_image_is_validation_error() {
        let bad_group = PostForm {
            group: Some("cats".to_string()),
            ..PostForm::default()
        };
        assert!(matches!(bad_group.to_draft(), Err(AppError::Validation(_))));

        let bad_image = PostForm {
            image: Some("***".to_string()),
            ..PostForm::default()
        };
        assert!(matches!(bad_image.to_draft(), Err(AppError::Validation(_))));
    }
}
