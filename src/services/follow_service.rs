// FollowService - idempotent follow/unfollow between users

use tracing::{info, instrument};

use crate::{
    core::UserId,
    error::{AppError, AppResult, DEFAULT_LOGIN_URL},
    infrastructure::{sqlite_database::Database, viewer::ViewerContext},
    models::User,
};

#[derive(Debug, Clone)]
pub struct FollowService {
    db: Database,
    login_url: String,
}

impl FollowService {
    pub fn new(db: Database) -> Self {
        Self {
            db,
            login_url: DEFAULT_LOGIN_URL.to_string(),
        }
    }

    pub fn with_login_url(mut self, login_url: impl Into<String>) -> Self {
        self.login_url = login_url.into();
        self
    }

    async fn author(&self, username: &str) -> AppResult<User> {
        self.db
            .get_user_by_username(username)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("User '{}' not found", username)))
    }

    fn follower<'a>(&self, vc: &'a ViewerContext, author: &User) -> AppResult<&'a User> {
        let follower =
            vc.require_user(&self.login_url, &format!("/profile/{}/follow/", author.username))?;
        if follower.id == author.id {
            return Err(AppError::Validation("You cannot follow yourself".to_string()));
        }
        Ok(follower)
    }

    /// Creating an edge that already exists is a no-op.
    #[instrument(skip(self, vc), fields(request_id = %vc.request_id))]
    pub async fn follow(&self, vc: &ViewerContext, author_username: &str) -> AppResult<User> {
        let author = self.author(author_username).await?;
        let follower = self.follower(vc, &author)?;

        let result = sqlx::query(
            "INSERT INTO follows (user_id, author_id) VALUES (?, ?) \
             ON CONFLICT(user_id, author_id) DO NOTHING",
        )
        .bind(follower.id)
        .bind(author.id)
        .execute(self.db.pool())
        .await?;

        if result.rows_affected() > 0 {
            info!("{} now follows {}", follower.username, author.username);
        }
        Ok(author)
    }

    /// Removing an edge that does not exist is a no-op.
    #[instrument(skip(self, vc), fields(request_id = %vc.request_id))]
    pub async fn unfollow(&self, vc: &ViewerContext, author_username: &str) -> AppResult<User> {
        let author = self.author(author_username).await?;
        let follower =
            vc.require_user(&self.login_url, &format!("/profile/{}/unfollow/", author.username))?;

        let result = sqlx::query("DELETE FROM follows WHERE user_id = ? AND author_id = ?")
            .bind(follower.id)
            .bind(author.id)
            .execute(self.db.pool())
            .await?;

        if result.rows_affected() > 0 {
            info!("{} unfollowed {}", follower.username, author.username);
        }
        Ok(author)
    }

    pub async fn is_following(&self, user_id: UserId, author_id: UserId) -> AppResult<bool> {
        let row = sqlx::query("SELECT 1 FROM follows WHERE user_id = ? AND author_id = ?")
            .bind(user_id)
            .bind(author_id)
            .fetch_optional(self.db.pool())
            .await?;
        Ok(row.is_some())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::sqlite_database::Table;
    use crate::services::feed_service::{FeedScope, FeedService};
    use crate::services::post_service::{PostDraft, PostService};

    async fn setup() -> (Database, FollowService, ViewerContext, ViewerContext) {
        let db = Database::new_in_memory().await.unwrap();
        let leo = db.ensure_user("leo").await.unwrap();
        let ann = db.ensure_user("ann").await.unwrap();
        (
            db.clone(),
            FollowService::new(db),
            ViewerContext::authenticated_user(leo, "req-leo".to_string()),
            ViewerContext::authenticated_user(ann, "req-ann".to_string()),
        )
    }

    #[tokio::test]
    async fn test_follow_twice_then_unfollow() {
        let (db, follows, leo, ann) = setup().await;
        let leo_id = leo.user_id().unwrap();
        let ann_id = ann.user_id().unwrap();

        follows.follow(&leo, "ann").await.unwrap();
        follows.follow(&leo, "ann").await.unwrap();
        assert_eq!(db.count(Table::Follows).await.unwrap(), 1);
        assert!(follows.is_following(leo_id, ann_id).await.unwrap());

        follows.unfollow(&leo, "ann").await.unwrap();
        assert!(!follows.is_following(leo_id, ann_id).await.unwrap());

        follows.unfollow(&leo, "ann").await.unwrap();
        assert_eq!(db.count(Table::Follows).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_self_follow_and_unknown_author_rejected() {
        let (db, follows, leo, _) = setup().await;

        assert!(matches!(
            follows.follow(&leo, "leo").await,
            Err(AppError::Validation(_))
        ));
        assert!(follows.follow(&leo, "ghost").await.unwrap_err().is_not_found());
        assert!(follows.unfollow(&leo, "ghost").await.unwrap_err().is_not_found());
        assert_eq!(db.count(Table::Follows).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_anonymous_cannot_follow() {
        let (db, follows, _, _) = setup().await;
        let anonymous = ViewerContext::anonymous("req".to_string());

        assert!(matches!(
            follows.follow(&anonymous, "ann").await,
            Err(AppError::Unauthenticated { .. })
        ));

        let follows = follows.with_login_url("/accounts/login/");
        let err = follows.unfollow(&anonymous, "ann").await.unwrap_err();
        let AppError::Unauthenticated { login_url, next } = err else {
            panic!("expected a login redirect, got {:?}", err);
        };
        assert_eq!(login_url, "/accounts/login/");
        assert_eq!(next, "/profile/ann/unfollow/");
        assert_eq!(db.count(Table::Follows).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_new_post_heads_follow_feed() {
        let (db, follows, leo, ann) = setup().await;
        let feeds = FeedService::new(db.clone(), 10);
        let scope = FeedScope::Follow(leo.user_id().unwrap());
        assert!(feeds.posts(scope).await.unwrap().is_empty());

        let posts = PostService::new(db);
        posts.create_post(&ann, PostDraft::new("older")).await.unwrap();
        follows.follow(&leo, "ann").await.unwrap();
        let newest = posts.create_post(&ann, PostDraft::new("newest")).await.unwrap();
        posts.create_post(&leo, PostDraft::new("own post")).await.unwrap();

        let feed = feeds.posts(scope).await.unwrap();
        assert_eq!(feed.len(), 2);
        assert_eq!(feed[0].id, newest.id);
    }

    #[tokio::test]
    async fn test_user_deletion_cascades() {
        let (db, follows, leo, ann) = setup().await;
        follows.follow(&leo, "ann").await.unwrap();
        follows.follow(&ann, "leo").await.unwrap();
        let posts = PostService::new(db.clone());
        let post = posts.create_post(&ann, PostDraft::new("ann's")).await.unwrap();
        let comments = crate::services::comment_service::CommentService::new(db.clone());
        comments.add_comment(post.id, &leo, "leo on ann").await.unwrap();
        let leo_post = posts.create_post(&leo, PostDraft::new("leo's")).await.unwrap();
        comments.add_comment(leo_post.id, &ann, "ann on leo").await.unwrap();

        assert!(db.delete_user(ann.user_id().unwrap()).await.unwrap());
        assert_eq!(db.count(Table::Follows).await.unwrap(), 0);
        assert_eq!(db.count(Table::Posts).await.unwrap(), 1);
        assert_eq!(db.count(Table::Comments).await.unwrap(), 0);
        assert_eq!(db.count(Table::Users).await.unwrap(), 1);
    }
}
