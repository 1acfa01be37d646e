//! Off-thread list synchronization.
//!
//! [`ListSynchronizer`] owns the "currently accepted" sequence of one list
//! and the presenter showing it. Each [`submit`](ListSynchronizer::submit):
//!
//! ```text
//! caller ── submit(new) ──> worker: compute_diff(current, new)
//!                                 │
//!                                 v
//!                 presentation: latest generation? ── yes ──> accept + dispatch
//!                                 │
//!                                 └──── no ──> Superseded (result dropped)
//! ```
//!
//! Every submission bumps a generation counter. Only a result whose
//! generation is still the latest when it reaches the presentation context
//! is applied, so a stale diff can never reach the presenter even if it
//! finishes last. Failures leave the accepted sequence and presenter as they
//! were.

use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::{debug, warn};

use crate::algo::{compute_diff_with_config, DiffConfig, DiffResult, DiffStats};
use crate::completion::{signal, Completion, Signal};
use crate::error::{SyncError, SyncResult};
use crate::executor::Executor;
use crate::item::Item;
use crate::presenter::ListPresenter;

/// What happened to one submission.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delivery {
    /// The diff was applied to the presenter
    Applied(DiffStats),
    /// A newer submission arrived first; nothing was applied
    Superseded,
}

impl Delivery {
    pub fn is_applied(&self) -> bool {
        matches!(self, Self::Applied(_))
    }
}

/// Outcome carried by a submission's completion.
pub type Outcome = SyncResult<Delivery>;

type Callback = Box<dyn FnOnce(Outcome) + Send + 'static>;

enum Route {
    Signal(Signal<Outcome>),
    Callback(Callback),
}

/// Where the outcome of a submission goes. Dropped without sending (its
/// task was discarded by an executor), it reports `Abandoned`.
struct Reply(Option<Route>);

impl Reply {
    fn signal(signal: Signal<Outcome>) -> Self {
        Self(Some(Route::Signal(signal)))
    }

    fn callback(callback: Callback) -> Self {
        Self(Some(Route::Callback(callback)))
    }

    fn send(mut self, outcome: Outcome) {
        if let Some(route) = self.0.take() {
            route.send(outcome);
        }
    }
}

impl Route {
    fn send(self, outcome: Outcome) {
        match self {
            Self::Signal(signal) => signal.complete(outcome),
            Self::Callback(callback) => callback(outcome),
        }
    }
}

impl Drop for Reply {
    fn drop(&mut self) {
        if let Some(route) = self.0.take() {
            route.send(Err(SyncError::Abandoned));
        }
    }
}

struct State<T> {
    generation: u64,
    current: Arc<Vec<T>>,
}

struct Shared<T, P> {
    state: Mutex<State<T>>,
    presenter: Mutex<P>,
    worker: Arc<dyn Executor>,
    main: Arc<dyn Executor>,
    config: DiffConfig,
}

/// Keeps one presented list in step with submitted snapshots.
///
/// Cloning yields another handle to the same list.
pub struct ListSynchronizer<T, P> {
    shared: Arc<Shared<T, P>>,
}

impl<T, P> Clone for ListSynchronizer<T, P> {
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
        }
    }
}

impl<T, P> ListSynchronizer<T, P>
where
    T: Item + Send + Sync + 'static,
    P: ListPresenter<T> + Send + 'static,
{
    /// Create a synchronizer with an empty accepted list.
    ///
    /// `main` must run tasks one at a time in submission order.
    pub fn new(presenter: P, worker: Arc<dyn Executor>, main: Arc<dyn Executor>) -> Self {
        Self::with_config(presenter, worker, main, DiffConfig::default())
    }

    /// Create a synchronizer with custom diff configuration.
    pub fn with_config(presenter: P, worker: Arc<dyn Executor>, main: Arc<dyn Executor>, config: DiffConfig) -> Self {
        Self {
            shared: Arc::new(Shared {
                state: Mutex::new(State {
                    generation: 0,
                    current: Arc::new(Vec::new()),
                }),
                presenter: Mutex::new(presenter),
                worker,
                main,
                config,
            }),
        }
    }

    /// Submit a new snapshot. The returned completion fires once, on the
    /// presentation context.
    pub fn submit(&self, new: Vec<T>) -> Completion<Outcome> {
        let (tx, rx) = signal();
        self.submit_reply(new, Reply::signal(tx));
        rx
    }

    /// Submit a new snapshot; `callback` runs once on the presentation
    /// context with the outcome. If an executor discards the work instead,
    /// it runs with [`SyncError::Abandoned`] wherever the task is dropped.
    pub fn submit_with<F>(&self, new: Vec<T>, callback: F)
    where
        F: FnOnce(Outcome) + Send + 'static,
    {
        self.submit_reply(new, Reply::callback(Box::new(callback)));
    }

    /// Submit an optional snapshot; `None` clears the list.
    pub fn submit_list(&self, new: Option<Vec<T>>) -> Completion<Outcome> {
        self.submit(new.unwrap_or_default())
    }

    fn submit_reply(&self, new: Vec<T>, reply: Reply) {
        let (generation, old) = {
            let mut state = self.shared.state.lock();
            state.generation += 1;
            (state.generation, Arc::clone(&state.current))
        };

        debug!(generation, old_len = old.len(), new_len = new.len(), "diff submitted");

        let shared = Arc::clone(&self.shared);
        self.shared.worker.execute(Box::new(move || {
            let outcome = if shared.is_latest(generation) {
                Some(compute(&old, &new, shared.config))
            } else {
                None
            };

            let main = Arc::clone(&shared.main);
            main.execute(Box::new(move || shared.deliver(generation, new, outcome, reply)));
        }));
    }

    /// The last accepted sequence.
    pub fn current(&self) -> Arc<Vec<T>> {
        Arc::clone(&self.shared.state.lock().current)
    }

    /// Generation of the most recent submission.
    pub fn generation(&self) -> u64 {
        self.shared.state.lock().generation
    }

    /// Run `f` with the presenter. `f` must not call back into this
    /// synchronizer.
    pub fn with_presenter<R>(&self, f: impl FnOnce(&mut P) -> R) -> R {
        let mut presenter = self.shared.presenter.lock();
        f(&mut presenter)
    }
}

fn compute<T: Item>(old: &[T], new: &[T], config: DiffConfig) -> SyncResult<DiffResult<T>> {
    panic::catch_unwind(AssertUnwindSafe(|| compute_diff_with_config(old, new, config)))
        .unwrap_or_else(|payload| Err(SyncError::from_panic(payload)))
}

impl<T, P> Shared<T, P>
where
    T: Item,
    P: ListPresenter<T>,
{
    fn is_latest(&self, generation: u64) -> bool {
        self.state.lock().generation == generation
    }

    /// Runs on the presentation context. `outcome` is `None` when the
    /// worker skipped an already stale request.
    fn deliver(&self, generation: u64, new: Vec<T>, outcome: Option<SyncResult<DiffResult<T>>>, reply: Reply) {
        let mut state = self.state.lock();

        let diff = match outcome {
            Some(Ok(diff)) if state.generation == generation => diff,
            Some(Err(err)) if state.generation == generation => {
                drop(state);
                warn!(generation, error = %err, "diff failed; keeping current list");
                reply.send(Err(err));
                return;
            }
            _ => {
                let latest = state.generation;
                drop(state);
                debug!(generation, latest, "diff superseded");
                reply.send(Ok(Delivery::Superseded));
                return;
            }
        };

        // Presenter is taken before the state is released so accepted diffs
        // reach it in acceptance order, even from concurrent deliveries
        let mut presenter = self.presenter.lock();
        state.current = Arc::new(new);
        drop(state);

        let stats = diff.stats();
        diff.dispatch(&mut *presenter);
        drop(presenter);
        debug!(generation, ops = stats.op_count(), moved = stats.moved, "diff applied");

        reply.send(Ok(Delivery::Applied(stats)));
    }
}
