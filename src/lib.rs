//! rowsync - Keyed list diffing with off-thread synchronization
//!
//! ## Core Concepts
//!
//! **Keyed diff**: rows carry an identity key and comparable content.
//! [`compute_diff`] turns an old and a new sequence into an ordered script of
//! `Remove`, `Move`, `Insert` and `Update` operations that a list view can
//! replay one step at a time to animate only what changed.
//!
//! **Superseding delivery**: [`ListSynchronizer`] computes diffs on a worker
//! executor and applies them on a presentation executor. A newer submission
//! makes every older one stale; stale results are never applied.
//!
//! ## Modules
//! - `algo`: Myers LCS and the edit script builder
//! - `item`: the `Item` identity trait
//! - `sync`: `ListSynchronizer`
//! - `executor`: worker and presentation contexts
//! - `completion`: single-assignment completion signal
//! - `presenter`: presentation-side sink
//! - `observable`: observable state with subscription guards
//! - `store`: observable item storage
//! - `sleep`: sleep tracker model built on the above
//!
//! ## Usage
//!
//! ```
//! use std::sync::Arc;
//! use rowsync::{Delivery, Inline, ListSynchronizer, VecPresenter};
//!
//! let sync = ListSynchronizer::new(VecPresenter::default(), Arc::new(Inline), Arc::new(Inline));
//! let outcome = sync.submit(vec![(1u32, "A"), (2, "B")]).wait().unwrap();
//! assert!(outcome.is_applied());
//!
//! let outcome = sync.submit(vec![(2u32, "B"), (1, "a")]).wait().unwrap();
//! let Delivery::Applied(stats) = outcome else { unreachable!() };
//! assert_eq!((stats.moved, stats.updated), (1, 1));
//! ```

/// Algorithms: diff, myers
pub mod algo;

/// Row identity
pub mod item;

/// Off-thread list synchronization
pub mod sync;

/// Execution contexts
pub mod executor;

/// Single-assignment completion signal
pub mod completion;

/// Presentation-side sink
pub mod presenter;

/// Observable state
pub mod observable;

/// Item storage
pub mod store;

/// Sleep tracker model
pub mod sleep;

/// Error types
pub mod error;

/// Prelude for common imports
pub mod prelude;

// =============================================================================
// Re-exports
// =============================================================================

// Algorithms
pub use algo::{compute_diff, compute_diff_with_config, DiffConfig, DiffResult, DiffStats, ListOp};

// Identity
pub use item::Item;

// Synchronization
pub use completion::{signal, Completion, Signal};
pub use executor::{Executor, Inline, MainQueue, Task};
#[cfg(feature = "parallel")]
pub use executor::WorkerPool;
pub use presenter::{ListPresenter, VecPresenter};
pub use sync::{Delivery, ListSynchronizer, Outcome};

// Collaborators
pub use observable::{Observable, Subscription};
pub use store::{ItemStore, MemoryStore, Snapshot};

// Error types
pub use error::{Side, SyncError, SyncResult};
