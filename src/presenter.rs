//! Presentation-side sink for edit scripts.

use crate::algo::DiffResult;

/// Receives one callback per replayed operation.
///
/// Indices follow [`ListOp`](crate::ListOp) semantics: each refers to the
/// visible rows as left by the previous callback.
pub trait ListPresenter<T> {
    fn on_inserted(&mut self, index: usize, item: &T);
    fn on_removed(&mut self, index: usize);
    fn on_moved(&mut self, from: usize, to: usize);
    fn on_changed(&mut self, index: usize, item: &T);
}

impl<T, P: ListPresenter<T> + ?Sized> ListPresenter<T> for Box<P> {
    fn on_inserted(&mut self, index: usize, item: &T) {
        (**self).on_inserted(index, item);
    }

    fn on_removed(&mut self, index: usize) {
        (**self).on_removed(index);
    }

    fn on_moved(&mut self, from: usize, to: usize) {
        (**self).on_moved(from, to);
    }

    fn on_changed(&mut self, index: usize, item: &T) {
        (**self).on_changed(index, item);
    }
}

/// Presenter that mirrors the visible rows in a `Vec`.
#[derive(Debug, Clone, PartialEq)]
pub struct VecPresenter<T> {
    rows: Vec<T>,
    notifications: usize,
}

impl<T> Default for VecPresenter<T> {
    fn default() -> Self {
        Self {
            rows: Vec::new(),
            notifications: 0,
        }
    }
}

impl<T: Clone> VecPresenter<T> {
    /// Start from the rows currently on screen.
    pub fn new(rows: Vec<T>) -> Self {
        Self { rows, notifications: 0 }
    }

    /// Rows currently visible.
    pub fn rows(&self) -> &[T] {
        &self.rows
    }

    /// Number of callbacks received so far.
    pub fn notifications(&self) -> usize {
        self.notifications
    }

    /// Apply a whole script.
    pub fn present(&mut self, diff: &DiffResult<T>) {
        diff.dispatch(self);
    }

    pub fn into_rows(self) -> Vec<T> {
        self.rows
    }
}

impl<T: Clone> ListPresenter<T> for VecPresenter<T> {
    fn on_inserted(&mut self, index: usize, item: &T) {
        self.rows.insert(index, item.clone());
        self.notifications += 1;
    }

    fn on_removed(&mut self, index: usize) {
        self.rows.remove(index);
        self.notifications += 1;
    }

    fn on_moved(&mut self, from: usize, to: usize) {
        let row = self.rows.remove(from);
        self.rows.insert(to, row);
        self.notifications += 1;
    }

    fn on_changed(&mut self, index: usize, item: &T) {
        self.rows[index] = item.clone();
        self.notifications += 1;
    }
}
