// Row types for the blog schema

pub mod comment;
pub mod group;
pub mod post;
pub mod user;

pub use comment::{Comment, CommentView, COMMENT_MAX_LENGTH};
pub use group::{Group, TITLE_MAX_LENGTH};
pub use post::{Post, PostView, STR_DISPLAYED_CHAR};
pub use user::User;

/// First `n` characters of `text`, on char boundaries.
pub(crate) fn truncate_chars(text: &str, n: usize) -> &str {
    match text.char_indices().nth(n) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}
