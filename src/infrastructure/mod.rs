// Infrastructure - storage, caching and request identity

pub mod cache_layer;
pub mod middleware;
pub mod sqlite_database;
pub mod viewer;

pub use cache_layer::{Clock, ManualClock, PageCache, SystemClock};
pub use middleware::{Authenticator, HeaderAuthenticator, Vc};
pub use sqlite_database::{Database, Table};
pub use viewer::{Viewer, ViewerContext};
