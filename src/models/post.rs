use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::FromRow;

use super::truncate_chars;
use crate::core::{GroupId, PostId, UserId};

/// Length of the short label used when a post is listed by name.
pub const STR_DISPLAYED_CHAR: usize = 15;

/// A stored post, image bytes included.
#[derive(Debug, Clone, PartialEq, Eq, FromRow)]
pub struct Post {
    pub id: PostId,
    pub text: String,
    pub created_at: DateTime<Utc>,
    pub author_id: UserId,
    pub group_id: Option<GroupId>,
    pub image: Option<Vec<u8>>,
}

impl std::fmt::Display for Post {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(truncate_chars(&self.text, STR_DISPLAYED_CHAR))
    }
}

/// Feed row: a post joined with its author and group, without the image.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, FromRow)]
pub struct PostView {
    pub id: PostId,
    pub text: String,
    pub created_at: DateTime<Utc>,
    pub author_id: UserId,
    pub author_username: String,
    pub group_id: Option<GroupId>,
    pub group_slug: Option<String>,
    pub group_title: Option<String>,
    pub has_image: bool,
}

impl PostView {
    pub fn title(&self) -> &str {
        truncate_chars(&self.text, STR_DISPLAYED_CHAR)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_truncates_to_fifteen_chars() {
        let post = Post {
            id: PostId(1),
            text: "Тестовый пост длиннее пятнадцати".to_string(),
            created_at: Utc::now(),
            author_id: UserId(1),
            group_id: None,
            image: None,
        };
        assert_eq!(post.to_string(), "Тестовый пост д");
    }
}
