//! Prelude module for common imports.
//!
//! ```ignore
//! use rowsync::prelude::*;
//! ```

// Algorithms
pub use crate::algo::{compute_diff, compute_diff_with_config, DiffConfig, DiffResult, DiffStats, ListOp};

// Identity
pub use crate::item::Item;

// Synchronization
pub use crate::completion::Completion;
pub use crate::executor::{Executor, Inline, MainQueue};
#[cfg(feature = "parallel")]
pub use crate::executor::WorkerPool;
pub use crate::presenter::{ListPresenter, VecPresenter};
pub use crate::sync::{Delivery, ListSynchronizer, Outcome};

// Collaborators
pub use crate::observable::{Observable, Subscription};
pub use crate::store::{ItemStore, MemoryStore};

// Error
pub use crate::error::{SyncError, SyncResult};
