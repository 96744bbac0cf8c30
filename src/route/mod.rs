//! Route progress: reduce a station-level route to key waypoints and map live
//! positions onto them.

pub mod position;
pub mod reducer;

pub use position::{Progress, ProgressTracker};
pub use reducer::reduce_route;
