// Services - business rules over the storage layer.
// Every call takes the caller's ViewerContext explicitly.

pub mod comment_service;
pub mod feed_service;
pub mod follow_service;
pub mod post_service;

pub use comment_service::CommentService;
pub use feed_service::{FeedScope, FeedService};
pub use follow_service::FollowService;
pub use post_service::{EditOutcome, PostDraft, PostService};
