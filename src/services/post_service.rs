// PostService - create and edit posts on behalf of their authors

use chrono::Utc;
use tracing::{info, instrument};

use crate::{
    core::{GroupId, PostId},
    error::{AppError, AppResult, DEFAULT_LOGIN_URL},
    infrastructure::{sqlite_database::Database, viewer::ViewerContext},
    models::Post,
};

/// Validated post fields.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PostDraft {
    pub text: String,
    pub group_id: Option<GroupId>,
    pub image: Option<Vec<u8>>,
}

impl PostDraft {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            ..Self::default()
        }
    }

    pub fn with_group(mut self, group_id: GroupId) -> Self {
        self.group_id = Some(group_id);
        self
    }

    pub fn with_image(mut self, image: Vec<u8>) -> Self {
        self.image = Some(image);
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EditOutcome {
    Updated(Post),
    /// The viewer does not own the post; nothing was written.
    NotAuthor,
}

#[derive(Debug, Clone)]
pub struct PostService {
    db: Database,
    login_url: String,
}

impl PostService {
    pub fn new(db: Database) -> Self {
        Self {
            db,
            login_url: DEFAULT_LOGIN_URL.to_string(),
        }
    }

    /// Login page that anonymous authors are sent to.
    pub fn with_login_url(mut self, login_url: impl Into<String>) -> Self {
        self.login_url = login_url.into();
        self
    }

    async fn validate(&self, draft: &PostDraft) -> AppResult<()> {
        if draft.text.trim().is_empty() {
            return Err(AppError::Validation("Post text cannot be empty".to_string()));
        }
        if let Some(group_id) = draft.group_id {
            if self.db.get_group(group_id).await?.is_none() {
                return Err(AppError::Validation(format!("Group {} does not exist", group_id)));
            }
        }
        if matches!(&draft.image, Some(bytes) if bytes.is_empty()) {
            return Err(AppError::Validation("Uploaded image is empty".to_string()));
        }
        Ok(())
    }

    pub async fn get_post(&self, id: PostId) -> AppResult<Post> {
        sqlx::query_as::<_, Post>(
            "SELECT id, text, created_at, author_id, group_id, image FROM posts WHERE id = ?",
        )
        .bind(id)
        .fetch_optional(self.db.pool())
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Post {} not found", id)))
    }

    #[instrument(skip(self, vc, draft), fields(request_id = %vc.request_id))]
    pub async fn create_post(&self, vc: &ViewerContext, draft: PostDraft) -> AppResult<Post> {
        let author = vc.require_user(&self.login_url, "/create/")?;
        self.validate(&draft).await?;

        let post = sqlx::query_as::<_, Post>(
            "INSERT INTO posts (text, created_at, author_id, group_id, image) \
             VALUES (?, ?, ?, ?, ?) \
             RETURNING id, text, created_at, author_id, group_id, image",
        )
        .bind(&draft.text)
        .bind(Utc::now())
        .bind(author.id)
        .bind(draft.group_id)
        .bind(draft.image)
        .fetch_one(self.db.pool())
        .await?;

        info!("{} created post {}", author.username, post.id);
        Ok(post)
    }

    /// Overwrite text and group; the image only when a new one is given.
    /// Author and creation time never change.
    #[instrument(skip(self, vc, draft), fields(request_id = %vc.request_id))]
    pub async fn edit_post(
        &self,
        id: PostId,
        vc: &ViewerContext,
        draft: PostDraft,
    ) -> AppResult<EditOutcome> {
        let post = self.get_post(id).await?;
        if vc.user_id() != Some(post.author_id) {
            info!("Rejected edit of post {} by non-author", id);
            return Ok(EditOutcome::NotAuthor);
        }
        self.validate(&draft).await?;

        let updated = sqlx::query_as::<_, Post>(
            "UPDATE posts SET text = ?, group_id = ?, image = COALESCE(?, image) \
             WHERE id = ? AND author_id = ? \
             RETURNING id, text, created_at, author_id, group_id, image",
        )
        .bind(&draft.text)
        .bind(draft.group_id)
        .bind(draft.image)
        .bind(id)
        .bind(post.author_id)
        .fetch_optional(self.db.pool())
        .await?;

        match updated {
            Some(post) => Ok(EditOutcome::Updated(post)),
            None => Err(AppError::NotFound(format!("Post {} not found", id))),
        }
    }
}
