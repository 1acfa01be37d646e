//! Item storage with change observation.
//!
//! [`ItemStore`] is the upstream collaborator of a synchronized list: a
//! keyed collection that republishes its full contents, newest first,
//! after every change. [`MemoryStore`] is the embedded implementation.

use std::sync::Arc;

use parking_lot::RwLock;
use rustc_hash::FxHashMap;
use tracing::debug;

use crate::error::{SyncError, SyncResult};
use crate::item::Item;
use crate::observable::Observable;

/// Snapshot published by a store, newest row first.
pub type Snapshot<T> = Arc<Vec<T>>;

/// Keyed row storage.
pub trait ItemStore<T: Item>: Send + Sync {
    /// Add a row. Fails if the key is taken.
    fn insert(&self, item: T) -> SyncResult<()>;

    /// Replace the row with the same key. Fails if there is none.
    fn update(&self, item: T) -> SyncResult<()>;

    /// Row with `key`.
    fn get(&self, key: &T::Key) -> Option<T>;

    /// Most recently inserted row.
    fn latest(&self) -> Option<T>;

    /// All rows, newest first.
    fn all(&self) -> Snapshot<T>;

    /// Remove every row.
    fn clear(&self);

    /// Observable snapshot of [`all`](ItemStore::all).
    fn observe_all(&self) -> Observable<Snapshot<T>>;
}

struct Table<T: Item> {
    /// Insertion order
    rows: Vec<T>,
    positions: FxHashMap<T::Key, usize>,
}

impl<T: Item> Table<T> {
    fn newest_first(&self) -> Snapshot<T> {
        Arc::new(self.rows.iter().rev().cloned().collect())
    }
}

/// In-memory [`ItemStore`].
///
/// Uses `parking_lot::RwLock`; the snapshot is published after the write
/// lock is released.
pub struct MemoryStore<T: Item> {
    table: RwLock<Table<T>>,
    snapshot: Observable<Snapshot<T>>,
}

impl<T> Default for MemoryStore<T>
where
    T: Item + Send + Sync + 'static,
    T::Key: Send + Sync,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<T> MemoryStore<T>
where
    T: Item + Send + Sync + 'static,
    T::Key: Send + Sync,
{
    /// Create an empty store.
    pub fn new() -> Self {
        Self {
            table: RwLock::new(Table {
                rows: Vec::new(),
                positions: FxHashMap::default(),
            }),
            snapshot: Observable::new(Arc::new(Vec::new())),
        }
    }

    /// Number of rows.
    pub fn len(&self) -> usize {
        self.table.read().rows.len()
    }

    /// Check if the store is empty.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn with_write<R>(&self, f: impl FnOnce(&mut Table<T>) -> SyncResult<R>) -> SyncResult<R> {
        let (result, snapshot) = {
            let mut table = self.table.write();
            let result = f(&mut table)?;
            (result, table.newest_first())
        };
        self.snapshot.set(snapshot);
        Ok(result)
    }
}

impl<T> ItemStore<T> for MemoryStore<T>
where
    T: Item + Send + Sync + 'static,
    T::Key: Send + Sync,
{
    fn insert(&self, item: T) -> SyncResult<()> {
        self.with_write(|table| {
            let key = item.key();
            if table.positions.contains_key(&key) {
                return Err(SyncError::DuplicateKey(format!("{key:?}")));
            }
            debug!(key = ?key, "store insert");
            table.positions.insert(key, table.rows.len());
            table.rows.push(item);
            Ok(())
        })
    }

    fn update(&self, item: T) -> SyncResult<()> {
        self.with_write(|table| {
            let key = item.key();
            let Some(&pos) = table.positions.get(&key) else {
                return Err(SyncError::NotFound(format!("{key:?}")));
            };
            debug!(key = ?key, "store update");
            table.rows[pos] = item;
            Ok(())
        })
    }

    fn get(&self, key: &T::Key) -> Option<T> {
        let table = self.table.read();
        table.positions.get(key).map(|&pos| table.rows[pos].clone())
    }

    fn latest(&self) -> Option<T> {
        self.table.read().rows.last().cloned()
    }

    fn all(&self) -> Snapshot<T> {
        self.snapshot.get()
    }

    fn clear(&self) {
        let cleared = self.with_write(|table| {
            let count = table.rows.len();
            table.rows.clear();
            table.positions.clear();
            Ok(count)
        });
        if let Ok(count) = cleared {
            debug!(count, "store cleared");
        }
    }

    fn observe_all(&self) -> Observable<Snapshot<T>> {
        self.snapshot.clone()
    }
}
