// FeedService - scope-filtered, newest-first post feeds

use sqlx::{QueryBuilder, Sqlite};
use tracing::instrument;

use crate::{
    core::{GroupId, Page, Paginator, PostId, UserId},
    error::{AppError, AppResult},
    infrastructure::sqlite_database::Database,
    models::{Group, PostView, User},
};

const POST_VIEW_SELECT: &str = "SELECT posts.id, posts.text, posts.created_at, posts.author_id, \
     users.username AS author_username, posts.group_id, \
     groups.slug AS group_slug, groups.title AS group_title, \
     (posts.image IS NOT NULL) AS has_image \
     FROM posts \
     INNER JOIN users ON users.id = posts.author_id \
     LEFT JOIN groups ON groups.id = posts.group_id";

/// Which posts a feed contains. Scopes never combine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeedScope {
    Global,
    Group(GroupId),
    Profile(UserId),
    /// Posts by every author `UserId` follows.
    Follow(UserId),
}

impl FeedScope {
    fn push_filter<'a>(&self, qb: &mut QueryBuilder<'a, Sqlite>) {
        match *self {
            FeedScope::Global => {}
            FeedScope::Group(group_id) => {
                qb.push(" WHERE posts.group_id = ").push_bind(group_id);
            }
            FeedScope::Profile(author_id) => {
                qb.push(" WHERE posts.author_id = ").push_bind(author_id);
            }
            FeedScope::Follow(user_id) => {
                qb.push(" WHERE posts.author_id IN (SELECT author_id FROM follows WHERE user_id = ")
                    .push_bind(user_id)
                    .push(")");
            }
        }
    }
}

#[derive(Debug, Clone)]
pub struct FeedService {
    db: Database,
    paginator: Paginator,
}

impl FeedService {
    pub fn new(db: Database, per_page: usize) -> Self {
        Self {
            db,
            paginator: Paginator::new(per_page),
        }
    }

    pub fn paginator(&self) -> Paginator {
        self.paginator
    }

    pub async fn resolve_group(&self, slug: &str) -> AppResult<Group> {
        self.db
            .get_group_by_slug(slug)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Group '{}' not found", slug)))
    }

    pub async fn resolve_author(&self, username: &str) -> AppResult<User> {
        self.db
            .get_user_by_username(username)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("User '{}' not found", username)))
    }

    /// Every post in scope, newest first.
    #[instrument(skip(self))]
    pub async fn posts(&self, scope: FeedScope) -> AppResult<Vec<PostView>> {
        let mut qb = QueryBuilder::<Sqlite>::new(POST_VIEW_SELECT);
        scope.push_filter(&mut qb);
        qb.push(" ORDER BY posts.created_at DESC, posts.id DESC");

        let posts = qb.build_query_as::<PostView>().fetch_all(self.db.pool()).await?;
        Ok(posts)
    }

    pub async fn count(&self, scope: FeedScope) -> AppResult<usize> {
        let mut qb = QueryBuilder::<Sqlite>::new("SELECT COUNT(*) FROM posts");
        scope.push_filter(&mut qb);

        let count: i64 = qb.build_query_scalar::<i64>().fetch_one(self.db.pool()).await?;
        Ok(count.max(0) as usize)
    }

    /// Page `number` of the feed. Pages past the end come back empty.
    #[instrument(skip(self))]
    pub async fn page(&self, scope: FeedScope, number: usize) -> AppResult<Page<PostView>> {
        let count = self.count(scope).await?;
        let (limit, offset) = self.paginator.window(number);

        let object_list = if offset >= count {
            Vec::new()
        } else {
            let mut qb = QueryBuilder::<Sqlite>::new(POST_VIEW_SELECT);
            scope.push_filter(&mut qb);
            qb.push(" ORDER BY posts.created_at DESC, posts.id DESC LIMIT ")
                .push_bind(limit as i64)
                .push(" OFFSET ")
                .push_bind(offset as i64);
            qb.build_query_as::<PostView>()
                .fetch_all(self.db.pool())
                .await?
        };

        Ok(self.paginator.assemble(object_list, number, count))
    }

    pub async fn post_view(&self, id: PostId) -> AppResult<PostView> {
        let mut qb = QueryBuilder::<Sqlite>::new(POST_VIEW_SELECT);
        qb.push(" WHERE posts.id = ").push_bind(id);

        qb.build_query_as::<PostView>()
            .fetch_optional(self.db.pool())
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Post {} not found", id)))
    }
}
