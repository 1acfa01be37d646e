//! Algorithm implementations for list diffing.
//!
//! - `diff`: keyed row diff producing a replayable edit script
//! - `myers`: key-level LCS (Myers search with a patience fallback)

mod diff;
mod myers;

pub use diff::{compute_diff, compute_diff_with_config, DiffConfig, DiffResult, DiffStats, ListOp};
pub use myers::DEFAULT_MAX_EDIT_DISTANCE;
