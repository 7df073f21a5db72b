// CommentService - append comments to posts

use chrono::Utc;
use tracing::{debug, info, instrument};

use crate::{
    core::PostId,
    error::{AppError, AppResult},
    infrastructure::{sqlite_database::Database, viewer::ViewerContext},
    models::{Comment, CommentView, COMMENT_MAX_LENGTH},
};

#[derive(Debug, Clone)]
pub struct CommentService {
    db: Database,
}

impl CommentService {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    fn validate(text: &str) -> AppResult<()> {
        if text.trim().is_empty() {
            return Err(AppError::Validation("Comment text cannot be empty".to_string()));
        }
        if text.chars().count() > COMMENT_MAX_LENGTH {
            return Err(AppError::Validation(format!(
                "Comment must be at most {} characters",
                COMMENT_MAX_LENGTH
            )));
        }
        Ok(())
    }

    /// Anonymous viewers get `Ok(None)` and nothing is stored.
    #[instrument(skip(self, vc, text), fields(request_id = %vc.request_id))]
    pub async fn add_comment(
        &self,
        post_id: PostId,
        vc: &ViewerContext,
        text: &str,
    ) -> AppResult<Option<Comment>> {
        let Some(author) = vc.user() else {
            debug!("Ignored anonymous comment on post {}", post_id);
            return Ok(None);
        };
        Self::validate(text)?;

        let exists = sqlx::query("SELECT 1 FROM posts WHERE id = ?")
            .bind(post_id)
            .fetch_optional(self.db.pool())
            .await?
            .is_some();
        if !exists {
            return Err(AppError::NotFound(format!("Post {} not found", post_id)));
        }

        let comment = sqlx::query_as::<_, Comment>(
            "INSERT INTO comments (post_id, author_id, text, created_at) VALUES (?, ?, ?, ?) \
             RETURNING id, post_id, author_id, text, created_at",
        )
        .bind(post_id)
        .bind(author.id)
        .bind(text)
        .bind(Utc::now())
        .fetch_one(self.db.pool())
        .await?;

        info!("{} commented on post {}", author.username, post_id);
        Ok(Some(comment))
    }

    /// Comments on a post, newest first.
    pub async fn comments_for(&self, post_id: PostId) -> AppResult<Vec<CommentView>> {
        let comments = sqlx::query_as::<_, CommentView>(
            "SELECT comments.id, comments.post_id, comments.author_id, \
             users.username AS author_username, comments.text, comments.created_at \
             FROM comments INNER JOIN users ON users.id = comments.author_id \
             WHERE comments.post_id = ? \
             ORDER BY comments.created_at DESC, comments.id DESC",
        )
        .bind(post_id)
        .fetch_all(self.db.pool())
        .await?;
        Ok(comments)
    }

    pub async fn count_for(&self, post_id: PostId) -> AppResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM comments WHERE post_id = ?")
            .bind(post_id)
            .fetch_one(self.db.pool())
            .await?;
        Ok(count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::sqlite_database::Table;
    use crate::services::post_service::{PostDraft, PostService};

    async fn setup() -> (Database, CommentService, ViewerContext, PostId) {
        let db = Database::new_in_memory().await.unwrap();
        let leo = db.ensure_user("leo").await.unwrap();
        let vc = ViewerContext::authenticated_user(leo, "req".to_string());
        let post = PostService::new(db.clone())
            .create_post(&vc, PostDraft::new("post"))
            .await
            .unwrap();
        (db.clone(), CommentService::new(db), vc, post.id)
    }

    #[tokio::test]
    async fn test_anonymous_comment_is_dropped() {
        let (_db, comments, _vc, post_id) = setup().await;
        let anonymous = ViewerContext::anonymous("req".to_string());

        assert!(comments.add_comment(post_id, &anonymous, "hi").await.unwrap().is_none());
        assert_eq!(comments.count_for(post_id).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_authenticated_comment_increments_count() {
        let (_db, comments, vc, post_id) = setup().await;

        let comment = comments.add_comment(post_id, &vc, "first").await.unwrap().unwrap();
        comments.add_comment(post_id, &vc, "second").await.unwrap();
        assert_eq!(comments.count_for(post_id).await.unwrap(), 2);

        let listed = comments.comments_for(post_id).await.unwrap();
        assert_eq!(listed[0].text, "second");
        assert_eq!(listed[1].id, comment.id);
        assert_eq!(listed[1].author_username, "leo");
    }

    #[tokio::test]
    async fn test_comment_validation() {
        let (db, comments, vc, post_id) = setup().await;

        assert!(comments.add_comment(post_id, &vc, "").await.is_err());
        assert!(comments.add_comment(post_id, &vc, &"x".repeat(301)).await.is_err());
        assert!(comments.add_comment(post_id, &vc, &"x".repeat(300)).await.is_ok());
        assert!(comments
            .add_comment(PostId(999), &vc, "orphan")
            .await
            .unwrap_err()
            .is_not_found());
        assert_eq!(db.count(Table::Comments).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_post_deletion_removes_comments() {
        let (db, comments, vc, post_id) = setup().await;
        comments.add_comment(post_id, &vc, "bye").await.unwrap();

        assert!(db.delete_post(post_id).await.unwrap());
        assert_eq!(db.count(Table::Comments).await.unwrap(), 0);
    }
}
