use std::sync::Arc;

use crate::{
    config::Config,
    error::AppResult,
    infrastructure::{
        cache_layer::{Clock, PageCache, SystemClock},
        middleware::{Authenticator, HasViewerResolution, HeaderAuthenticator},
        sqlite_database::Database,
    },
    services::{CommentService, FeedService, FollowService, PostService},
};

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub db: Database,
    pub feeds: FeedService,
    pub posts: PostService,
    pub comments: CommentService,
    pub follows: FollowService,
    pub index_cache: Arc<PageCache>,
    pub authenticator: Arc<dyn Authenticator>,
}

impl AppState {
    pub async fn new(config: Config) -> AppResult<Self> {
        let database = Database::connect(&config.database).await?;
        Self::with_database(config, database, Arc::new(SystemClock))
    }

    /// Build state over an existing database, with the clock the index cache
    /// should use.
    pub fn with_database(config: Config, db: Database, clock: Arc<dyn Clock>) -> AppResult<Self> {
        let authenticator: Arc<dyn Authenticator> =
            Arc::new(HeaderAuthenticator::new(&config.auth.user_header)?);
        let index_cache = Arc::new(PageCache::with_clock(config.cache.index_ttl(), clock));

        Ok(Self {
            feeds: FeedService::new(db.clone(), config.feed.posts_per_page),
            posts: PostService::new(db.clone()).with_login_url(&config.auth.login_url),
            comments: CommentService::new(db.clone()),
            follows: FollowService::new(db.clone()).with_login_url(&config.auth.login_url),
            config: Arc::new(config),
            db,
            index_cache,
            authenticator,
        })
    }

    pub fn login_url(&self) -> &str {
        &self.config.auth.login_url
    }
}

impl HasViewerResolution for AppState {
    fn authenticator(&self) -> &Arc<dyn Authenticator> {
        &self.authenticator
    }

    fn database(&self) -> &Database {
        &self.db
    }
}
