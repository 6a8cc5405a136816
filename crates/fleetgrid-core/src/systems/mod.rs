//! Systems - logic that operates on ship components

mod collision;
mod motion;
mod sync;

pub use collision::*;
pub use motion::*;
pub use sync::*;
