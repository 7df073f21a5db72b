use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::FromRow;

use crate::core::{CommentId, PostId, UserId};

pub const COMMENT_MAX_LENGTH: usize = 300;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, FromRow)]
pub struct Comment {
    pub id: CommentId,
    pub post_id: PostId,
    pub author_id: UserId,
    pub text: String,
    pub created_at: DateTime<Utc>,
}

impl std::fmt::Display for Comment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.text)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, FromRow)]
pub struct CommentView {
    pub id: CommentId,
    pub post_id: PostId,
    pub author_id: UserId,
    pub author_username: String,
    pub text: String,
    pub created_at: DateTime<Utc>,
}
