use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use std::str::FromStr;
use tracing::{info, instrument};

use crate::config::DatabaseConfig;
use crate::core::{GroupId, PostId, Slug, UserId};
use crate::error::{AppError, AppResult};
use crate::models::{Group, User, TITLE_MAX_LENGTH};

const SCHEMA: &[&str] = &[
    r#"
    CREATE TABLE IF NOT EXISTS users (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        username TEXT NOT NULL UNIQUE
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS groups (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        title TEXT NOT NULL CHECK (length(title) <= 200),
        slug TEXT NOT NULL UNIQUE,
        description TEXT NOT NULL
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS posts (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        text TEXT NOT NULL,
        created_at TEXT NOT NULL,
        author_id INTEGER NOT NULL REFERENCES users(id),
        group_id INTEGER REFERENCES groups(id),
        image BLOB
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS comments (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        post_id INTEGER NOT NULL REFERENCES posts(id),
        author_id INTEGER NOT NULL REFERENCES users(id),
        text TEXT NOT NULL CHECK (length(text) <= 300),
        created_at TEXT NOT NULL
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS follows (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        user_id INTEGER NOT NULL REFERENCES users(id),
        author_id INTEGER NOT NULL REFERENCES users(id),
        UNIQUE (user_id, author_id)
    )
    "#,
    "CREATE INDEX IF NOT EXISTS idx_posts_created ON posts(created_at DESC, id DESC)",
    "CREATE INDEX IF NOT EXISTS idx_posts_author ON posts(author_id, created_at DESC)",
    "CREATE INDEX IF NOT EXISTS idx_posts_group ON posts(group_id, created_at DESC)",
    "CREATE INDEX IF NOT EXISTS idx_comments_post ON comments(post_id, created_at DESC)",
    "CREATE INDEX IF NOT EXISTS idx_follows_author ON follows(author_id)",
];

/// SQLite storage for the blog schema.
///
/// Foreign keys are enforced by SQLite but declared without referential
/// actions; cascades and SET NULL are carried out here, inside a transaction,
/// by `delete_user`, `delete_group` and `delete_post`.
#[derive(Debug, Clone)]
pub struct Database {
    pool: SqlitePool,
}

impl Database {
    pub async fn connect(config: &DatabaseConfig) -> AppResult<Self> {
        let options = SqliteConnectOptions::from_str(&config.url)
            .map_err(|e| AppError::ConfigurationError(format!("Invalid DATABASE_URL: {}", e)))?
            .foreign_keys(true)
            .create_if_missing(true);

        // Every connection to `:memory:` is a separate database, so an
        // in-memory pool holds exactly one connection for its whole life.
        let pool_options = if config.url.contains(":memory:") {
            SqlitePoolOptions::new()
                .max_connections(1)
                .min_connections(1)
                .idle_timeout(None)
                .max_lifetime(None)
        } else {
            SqlitePoolOptions::new().max_connections(config.max_connections.max(1))
        };

        let pool = pool_options
            .connect_with(options)
            .await
            .map_err(|e| AppError::DatabaseError(format!("Failed to connect to SQLite: {}", e)))?;

        let db = Self { pool };
        db.initialize().await?;
        info!("Database ready at {}", config.url);
        Ok(db)
    }

    pub async fn new_in_memory() -> AppResult<Self> {
        Self::connect(&DatabaseConfig {
            url: "sqlite::memory:".to_string(),
            max_connections: 1,
        })
        .await
    }

    /// Create tables and indexes if they are missing.
    pub async fn initialize(&self) -> AppResult<()> {
        for statement in SCHEMA {
            sqlx::query(statement)
                .execute(&self.pool)
                .await
                .map_err(|e| AppError::DatabaseError(format!("Failed to create schema: {}", e)))?;
        }
        Ok(())
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    // ---- users ----

    /// Register `username` on first sight and return its row.
    pub async fn ensure_user(&self, username: &str) -> AppResult<User> {
        let username = username.trim();
        if username.is_empty() {
            return Err(AppError::Validation("Username cannot be empty".to_string()));
        }

        sqlx::query("INSERT INTO users (username) VALUES (?) ON CONFLICT(username) DO NOTHING")
            .bind(username)
            .execute(&self.pool)
            .await?;

        let user = sqlx::query_as::<_, User>("SELECT id, username FROM users WHERE username = ?")
            .bind(username)
            .fetch_one(&self.pool)
            .await?;
        Ok(user)
    }

    pub async fn get_user_by_username(&self, username: &str) -> AppResult<Option<User>> {
        let user = sqlx::query_as::<_, User>("SELECT id, username FROM users WHERE username = ?")
            .bind(username)
            .fetch_optional(&self.pool)
            .await?;
        Ok(user)
    }

    pub async fn get_user(&self, id: UserId) -> AppResult<Option<User>> {
        let user = sqlx::query_as::<_, User>("SELECT id, username FROM users WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(user)
    }

    // ---- groups ----

    pub async fn create_group(&self, title: &str, slug: &str, description: &str) -> AppResult<Group> {
        if title.trim().is_empty() {
            return Err(AppError::Validation("Group title cannot be empty".to_string()));
        }
        if title.chars().count() > TITLE_MAX_LENGTH {
            return Err(AppError::Validation(format!(
                "Group title must be at most {} characters",
                TITLE_MAX_LENGTH
            )));
        }
        let slug = Slug::new(slug).map_err(|e| AppError::Validation(e.to_string()))?;

        if self.get_group_by_slug(slug.as_str()).await?.is_some() {
            return Err(AppError::Validation(format!(
                "Group with slug '{}' already exists",
                slug
            )));
        }

        let group = sqlx::query_as::<_, Group>(
            "INSERT INTO groups (title, slug, description) VALUES (?, ?, ?) \
             RETURNING id, title, slug, description",
        )
        .bind(title)
        .bind(slug.as_str())
        .bind(description)
        .fetch_one(&self.pool)
        .await?;
        Ok(group)
    }

    pub async fn get_group_by_slug(&self, slug: &str) -> AppResult<Option<Group>> {
        let group = sqlx::query_as::<_, Group>(
            "SELECT id, title, slug, description FROM groups WHERE slug = ?",
        )
        .bind(slug)
        .fetch_optional(&self.pool)
        .await?;
        Ok(group)
    }

    pub async fn get_group(&self, id: GroupId) -> AppResult<Option<Group>> {
        let group = sqlx::query_as::<_, Group>(
            "SELECT id, title, slug, description FROM groups WHERE id = ?",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(group)
    }

    pub async fn list_groups(&self) -> AppResult<Vec<Group>> {
        let groups = sqlx::query_as::<_, Group>(
            "SELECT id, title, slug, description FROM groups ORDER BY title, id",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(groups)
    }

    // ---- referential actions ----

    /// Delete a user together with their posts (and those posts' comments),
    /// their own comments and every follow edge touching them.
    #[instrument(skip(self))]
    pub async fn delete_user(&self, id: UserId) -> AppResult<bool> {
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            "DELETE FROM comments WHERE author_id = ? \
             OR post_id IN (SELECT id FROM posts WHERE author_id = ?)",
        )
        .bind(id)
        .bind(id)
        .execute(&mut *tx)
        .await?;
        sqlx::query("DELETE FROM posts WHERE author_id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        sqlx::query("DELETE FROM follows WHERE user_id = ? OR author_id = ?")
            .bind(id)
            .bind(id)
            .execute(&mut *tx)
            .await?;
        let result = sqlx::query("DELETE FROM users WHERE id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(result.rows_affected() > 0)
    }

    /// Delete a group; its posts stay, ungrouped.
    #[instrument(skip(self))]
    pub async fn delete_group(&self, id: GroupId) -> AppResult<bool> {
        let mut tx = self.pool.begin().await?;

        sqlx::query("UPDATE posts SET group_id = NULL WHERE group_id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        let result = sqlx::query("DELETE FROM groups WHERE id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(result.rows_affected() > 0)
    }

    /// Delete a post and its comments.
    #[instrument(skip(self))]
    pub async fn delete_post(&self, id: PostId) -> AppResult<bool> {
        let mut tx = self.pool.begin().await?;

        sqlx::query("DELETE FROM comments WHERE post_id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        let result = sqlx::query("DELETE FROM posts WHERE id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(result.rows_affected() > 0)
    }

    pub async fn count(&self, table: Table) -> AppResult<i64> {
        let count: i64 = sqlx::query_scalar(table.count_sql())
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }
}

/// Tables whose row counts are observable.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Table {
    Users,
    Groups,
    Posts,
    Comments,
    Follows,
}

impl Table {
    fn count_sql(self) -> &'static str {
        match self {
            Table::Users => "SELECT COUNT(*) FROM users",
            Table::Groups => "SELECT COUNT(*) FROM groups",
            Table::Posts => "SELECT COUNT(*) FROM posts",
            Table::Comments => "SELECT COUNT(*) FROM comments",
            Table::Follows => "SELECT COUNT(*) FROM follows",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_ensure_user_is_idempotent() {
        let db = Database::new_in_memory().await.unwrap();
        let first = db.ensure_user("leo").await.unwrap();
        let second = db.ensure_user("leo").await.unwrap();
        assert_eq!(first, second);
        assert_eq!(db.count(Table::Users).await.unwrap(), 1);
        assert!(db.ensure_user("   ").await.is_err());
    }

    #[tokio::test]
    async fn test_group_validation() {
        let db = Database::new_in_memory().await.unwrap();
        let group = db.create_group("Cats", "cats", "About cats").await.unwrap();
        assert_eq!(db.get_group_by_slug("cats").await.unwrap(), Some(group));

        assert!(db.create_group("Dogs", "cats", "dup").await.is_err());
        assert!(db.create_group("Dogs", "bad slug", "").await.is_err());
        assert!(db.create_group(&"x".repeat(201), "long", "").await.is_err());
        assert!(db.create_group(&"x".repeat(200), "ok", "").await.is_ok());
    }

    #[tokio::test]
    async fn test_file_backed_database_keeps_rows() {
        let dir = tempfile::tempdir().unwrap();
        let config = DatabaseConfig {
            url: format!("sqlite:{}", dir.path().join("yatube.db").display()),
            max_connections: 2,
        };

        let db = Database::connect(&config).await.unwrap();
        db.ensure_user("persisted").await.unwrap();
        db.pool().close().await;

        let reopened = Database::connect(&config).await.unwrap();
        assert!(reopened.get_user_by_username("persisted").await.unwrap().is_some());
    }
}
