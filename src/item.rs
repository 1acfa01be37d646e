//! Row identity for diffing
//!
//! A row has two notions of equality:
//! - **Identity**: [`Item::key`]. Same key = same logical row across two
//!   snapshots, so a changed position is a `Move` and not Remove + Insert.
//! - **Content**: `PartialEq`. Same key but unequal content = `Update`.
//!
//! Keys must be unique within one sequence. [`check_unique`] enforces it and
//! hands back the key index that the diff reuses.

use std::fmt::Debug;
use std::hash::Hash;

use rustc_hash::FxHashMap;

use crate::error::{Side, SyncError, SyncResult};

/// A row that can be diffed by identity and content.
///
/// # Example
///
/// ```
/// use rowsync::Item;
///
/// #[derive(Clone, PartialEq, Debug)]
/// struct Contact {
///     id: u32,
///     name: String,
/// }
///
/// impl Item for Contact {
///     type Key = u32;
///     fn key(&self) -> u32 {
///         self.id
///     }
/// }
/// ```
pub trait Item: Clone + PartialEq {
    /// Stable identity token
    type Key: Eq + Hash + Clone + Debug;

    /// Identity of this row. Two rows are the same logical row when their
    /// keys are equal.
    fn key(&self) -> Self::Key;

    /// Whether `other` displays identically. Only consulted for rows with
    /// equal keys.
    #[inline]
    fn same_content(&self, other: &Self) -> bool {
        self == other
    }
}

/// Key → position index of one sequence.
pub(crate) type KeyIndex<K> = FxHashMap<K, usize>;

/// Collect the keys of `items` and index them by position, failing on the
/// first duplicate.
pub(crate) fn check_unique<T: Item>(items: &[T], side: Side) -> SyncResult<(Vec<T::Key>, KeyIndex<T::Key>)> {
    let mut keys = Vec::with_capacity(items.len());
    let mut index = FxHashMap::with_capacity_and_hasher(items.len(), Default::default());

    for (i, item) in items.iter().enumerate() {
        let key = item.key();
        if let Some(&first) = index.get(&key) {
            return Err(SyncError::invalid_sequence(side, &key, i, first));
        }
        index.insert(key.clone(), i);
        keys.push(key);
    }

    Ok((keys, index))
}

impl Item for u64 {
    type Key = u64;

    #[inline]
    fn key(&self) -> u64 {
        *self
    }
}

impl Item for i64 {
    type Key = i64;

    #[inline]
    fn key(&self) -> i64 {
        *self
    }
}

impl Item for u32 {
    type Key = u32;

    #[inline]
    fn key(&self) -> u32 {
        *self
    }
}

impl Item for String {
    type Key = String;

    #[inline]
    fn key(&self) -> String {
        self.clone()
    }
}

impl<K, V> Item for (K, V)
where
    K: Eq + Hash + Clone + Debug,
    V: Clone + PartialEq,
{
    type Key = K;

    #[inline]
    fn key(&self) -> K {
        self.0.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pair_identity_vs_content() {
        let a = (1u32, "A");
        let b = (1u32, "B");
        assert_eq!(a.key(), b.key());
        assert!(!a.same_content(&b));
        assert!(a.same_content(&(1u32, "A")));
    }

    #[test]
    fn test_check_unique_indexes_keys() {
        let (keys, index) = check_unique(&[10u64, 20, 30], Side::Old).unwrap();
        assert_eq!(keys, vec![10, 20, 30]);
        assert_eq!(index[&20], 1);
    }

    #[test]
    fn test_check_unique_rejects_duplicate() {
        let err = check_unique(&[(1u32, 'a'), (2, 'b'), (1, 'c')], Side::New).unwrap_err();
        match err {
            SyncError::InvalidSequence { side, index, duplicate_of, .. } => {
                assert_eq!(side, Side::New);
                assert_eq!(index, 2);
                assert_eq!(duplicate_of, 0);
            }
            other => panic!("Expected InvalidSequence, got {other:?}"),
        }
    }

    #[test]
    fn test_check_unique_empty() {
        let (keys, index) = check_unique::<u64>(&[], Side::Old).unwrap();
        assert!(keys.is_empty());
        assert!(index.is_empty());
    }
}
