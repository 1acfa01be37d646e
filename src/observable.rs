//! Observable state.
//!
//! [`Observable`] holds a value and notifies subscribers on every change.
//! Subscribing returns a [`Subscription`] guard; dropping it unsubscribes,
//! so an owner that keeps its guards gets deterministic teardown when it is
//! dropped.
//!
//! Observers run synchronously on the thread that changed the value, after
//! all internal locks are released. They may read or change observables
//! themselves.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};

use parking_lot::{Mutex, RwLock};
use smallvec::SmallVec;

type Observer<T> = Arc<dyn Fn(&T) + Send + Sync>;

trait Detach: Send + Sync {
    fn detach(&self, id: u64);
}

struct Inner<T> {
    value: RwLock<T>,
    observers: Mutex<SmallVec<[(u64, Observer<T>); 4]>>,
    next_id: AtomicU64,
    /// Keeps a derived observable attached to its source
    upstream: Mutex<Option<Subscription>>,
}

impl<T: Send + Sync> Detach for Inner<T> {
    fn detach(&self, id: u64) {
        self.observers.lock().retain(|(oid, _)| *oid != id);
    }
}

/// A shared, observable value. Clones are handles to the same value.
pub struct Observable<T> {
    inner: Arc<Inner<T>>,
}

impl<T> Clone for Observable<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T: Default + Clone + Send + Sync + 'static> Default for Observable<T> {
    fn default() -> Self {
        Self::new(T::default())
    }
}

impl<T: std::fmt::Debug> std::fmt::Debug for Observable<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("Observable").field(&*self.inner.value.read()).finish()
    }
}

impl<T: Clone + Send + Sync + 'static> Observable<T> {
    pub fn new(value: T) -> Self {
        Self {
            inner: Arc::new(Inner {
                value: RwLock::new(value),
                observers: Mutex::new(SmallVec::new()),
                next_id: AtomicU64::new(0),
                upstream: Mutex::new(None),
            }),
        }
    }

    /// Current value.
    pub fn get(&self) -> T {
        self.inner.value.read().clone()
    }

    /// Read the current value without cloning it.
    pub fn with<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        f(&self.inner.value.read())
    }

    /// Replace the value and notify.
    pub fn set(&self, value: T) {
        *self.inner.value.write() = value;
        self.notify();
    }

    /// Modify the value in place and notify.
    pub fn update(&self, f: impl FnOnce(&mut T)) {
        f(&mut self.inner.value.write());
        self.notify();
    }

    /// Register `observer`. It is called once right away with the current
    /// value, then on every change until the subscription is dropped.
    pub fn subscribe<F>(&self, observer: F) -> Subscription
    where
        F: Fn(&T) + Send + Sync + 'static,
    {
        let id = self.inner.next_id.fetch_add(1, Ordering::Relaxed);
        let observer: Observer<T> = Arc::new(observer);
        self.inner.observers.lock().push((id, Arc::clone(&observer)));

        let current = self.get();
        observer(&current);

        let owner: Weak<dyn Detach> = Arc::downgrade(&self.inner) as Weak<dyn Detach>;
        Subscription { id, owner: Some(owner) }
    }

    /// Number of registered observers.
    pub fn observer_count(&self) -> usize {
        self.inner.observers.lock().len()
    }

    /// Derived observable that tracks `f(value)`.
    ///
    /// The derived value stays attached to `self` for as long as any handle
    /// to it is alive.
    pub fn map<U, F>(&self, f: F) -> Observable<U>
    where
        U: Clone + Send + Sync + 'static,
        F: Fn(&T) -> U + Send + Sync + 'static,
    {
        let derived = Observable::new(self.with(&f));
        let target: Weak<Inner<U>> = Arc::downgrade(&derived.inner);

        let subscription = self.subscribe(move |value| {
            if let Some(inner) = target.upgrade() {
                Observable { inner }.set(f(value));
            }
        });
        *derived.inner.upstream.lock() = Some(subscription);

        derived
    }

    fn notify(&self) {
        let observers: SmallVec<[Observer<T>; 4]> =
            self.inner.observers.lock().iter().map(|(_, o)| Arc::clone(o)).collect();
        if observers.is_empty() {
            return;
        }

        let value = self.get();
        for observer in observers {
            observer(&value);
        }
    }
}

/// Registration guard returned by [`Observable::subscribe`].
#[must_use = "dropping a Subscription unsubscribes immediately"]
pub struct Subscription {
    id: u64,
    owner: Option<Weak<dyn Detach>>,
}

impl Subscription {
    /// Unsubscribe now.
    pub fn unsubscribe(mut self) {
        self.detach();
    }

    /// Whether the observable this came from is still alive.
    pub fn is_attached(&self) -> bool {
        self.owner.as_ref().is_some_and(|w| w.strong_count() > 0)
    }

    fn detach(&mut self) {
        if let Some(owner) = self.owner.take().and_then(|w| w.upgrade()) {
            owner.detach(self.id);
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.detach();
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription")
            .field("id", &self.id)
            .field("attached", &self.is_attached())
            .finish()
    }
}
