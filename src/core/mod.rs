// Core types and primitives

pub mod paginator;
pub mod strong_types;

pub use paginator::{Page, PageContext, PageQuery, Paginator};
pub use strong_types::{CommentId, GroupId, PostId, Slug, UserId};
