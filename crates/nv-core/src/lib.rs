pub mod diff;
pub mod error;
pub mod types;

pub use diff::{apply, diff, revert, Change, PathSegment};
pub use error::*;
pub use types::*;
