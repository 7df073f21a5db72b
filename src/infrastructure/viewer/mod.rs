#[allow(clippy::module_inception)]
pub mod viewer;

pub use viewer::{Viewer, ViewerContext};
