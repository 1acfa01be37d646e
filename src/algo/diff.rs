//! Keyed List Diff
//!
//! Turns two row sequences into an ordered edit script that a presentation
//! layer replays one operation at a time.
//!
//! # Architecture: Diff/Dispatch Separation
//!
//! ```text
//! compute_diff(old, new) -> DiffResult<T>     // pure data
//!       |
//!       v
//! result.dispatch(&mut presenter)            // per-row UI callbacks
//! ```
//!
//! # Script Order
//!
//! Operations are emitted so that each index refers to the list as left by
//! the operations before it:
//!
//! 1. `Remove`, highest old index first
//! 2. `Move`, by ascending target; each row is placed right after its
//!    nearest already-placed predecessor
//! 3. `Insert`, by ascending new index
//! 4. `Update`, by ascending new index (final positions)
//!
//! A row that both moved and changed gets a `Move` and an `Update`.
//!
//! # Size Bound
//!
//! Removes + moves never exceed `old.len()`, inserts + updates never exceed
//! `new.len()`, so the script is never longer than remove-all/insert-all.

use crate::error::{Side, SyncError, SyncResult};
use crate::item::{check_unique, Item, KeyIndex};
use crate::presenter::ListPresenter;

use super::myers::{longest_common, Lcs, DEFAULT_MAX_EDIT_DISTANCE};

// =============================================================================
// Configuration
// =============================================================================

/// Configuration for diff behavior.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DiffConfig {
    /// Report relocated rows as `Move`. When false they become
    /// `Remove` + `Insert`.
    /// Default: true
    pub detect_moves: bool,
    /// Edit distance past which the Myers search hands the changed middle
    /// of the list to the O(n log n) patience fallback. The search keeps
    /// `(max_edit_distance + 1)²` words of trace at most.
    /// Default: 512
    pub max_edit_distance: usize,
}

impl Default for DiffConfig {
    fn default() -> Self {
        Self {
            detect_moves: true,
            max_edit_distance: DEFAULT_MAX_EDIT_DISTANCE,
        }
    }
}

impl DiffConfig {
    /// Create config with custom values.
    pub fn new(detect_moves: bool, max_edit_distance: usize) -> Self {
        Self {
            detect_moves,
            max_edit_distance,
        }
    }

    /// Config for long lists with heavy churn (higher cutoff).
    pub fn large() -> Self {
        Self {
            detect_moves: true,
            max_edit_distance: 1024,
        }
    }

    /// Config for short lists (lower cutoff, faster fallback).
    pub fn small() -> Self {
        Self {
            detect_moves: true,
            max_edit_distance: 64,
        }
    }

    /// Same limits, relocated rows reported as remove + insert.
    pub fn without_moves(self) -> Self {
        Self {
            detect_moves: false,
            ..self
        }
    }
}

// =============================================================================
// Public Types
// =============================================================================

/// One step of an edit script.
///
/// Indices address the list as it is after every earlier step of the same
/// script has been applied.
#[derive(Debug, Clone, PartialEq)]
pub enum ListOp<T> {
    /// Insert `item` so that it ends up at `index`
    Insert { index: usize, item: T },
    /// Remove the row at `index`
    Remove { index: usize },
    /// Take the row at `from` out and reinsert it so it ends up at `to`
    Move { from: usize, to: usize },
    /// Replace the content of the row at `index`
    Update { index: usize, item: T },
}

impl<T> ListOp<T> {
    /// Index this operation lands on.
    pub fn index(&self) -> usize {
        match self {
            Self::Insert { index, .. } | Self::Remove { index } | Self::Update { index, .. } => *index,
            Self::Move { to, .. } => *to,
        }
    }

    /// Apply this operation to `rows`.
    pub fn apply(&self, rows: &mut Vec<T>) -> SyncResult<()>
    where
        T: Clone,
    {
        let len = rows.len();
        match self {
            Self::Insert { index, item } => {
                check_bounds(*index, len, true)?;
                rows.insert(*index, item.clone());
            }
            Self::Remove { index } => {
                check_bounds(*index, len, false)?;
                rows.remove(*index);
            }
            Self::Move { from, to } => {
                check_bounds(*from, len, false)?;
                check_bounds(*to, len, false)?;
                let row = rows.remove(*from);
                rows.insert(*to, row);
            }
            Self::Update { index, item } => {
                check_bounds(*index, len, false)?;
                rows[*index] = item.clone();
            }
        }
        Ok(())
    }
}

/// `allow_end` admits `index == len` (append position).
fn check_bounds(index: usize, len: usize, allow_end: bool) -> SyncResult<()> {
    if index < len || (allow_end && index == len) {
        Ok(())
    } else {
        Err(SyncError::OutOfBounds { index, len })
    }
}

/// Statistics from a diff
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
#[must_use]
pub struct DiffStats {
    /// Rows left in place with equal content
    pub kept: usize,
    /// Rows inserted
    pub inserted: usize,
    /// Rows removed
    pub removed: usize,
    /// Rows moved
    pub moved: usize,
    /// Rows whose content changed
    pub updated: usize,
}

impl DiffStats {
    /// Number of emitted operations.
    pub fn op_count(&self) -> usize {
        self.inserted + self.removed + self.moved + self.updated
    }
}

/// Ordered edit script from one sequence to another.
#[derive(Debug, Clone, PartialEq)]
#[must_use]
pub struct DiffResult<T> {
    ops: Vec<ListOp<T>>,
    stats: DiffStats,
}

impl<T> Default for DiffResult<T> {
    fn default() -> Self {
        Self {
            ops: Vec::new(),
            stats: DiffStats::default(),
        }
    }
}

impl<T> DiffResult<T> {
    /// Operations in replay order.
    pub fn ops(&self) -> &[ListOp<T>] {
        &self.ops
    }

    /// Consume the result, returning its operations.
    pub fn into_ops(self) -> Vec<ListOp<T>> {
        self.ops
    }

    /// Statistics about the diff
    pub fn stats(&self) -> DiffStats {
        self.stats
    }

    /// Number of operations
    pub fn len(&self) -> usize {
        self.ops.len()
    }

    /// Check if any changes were detected
    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }

    /// Replay every operation onto `rows`, stopping at the first failure.
    pub fn apply_to(&self, rows: &mut Vec<T>) -> SyncResult<()>
    where
        T: Clone,
    {
        self.ops.iter().try_for_each(|op| op.apply(rows))
    }

    /// Feed the script to a presenter, one callback per operation.
    pub fn dispatch<P>(&self, presenter: &mut P)
    where
        P: ListPresenter<T> + ?Sized,
    {
        for op in &self.ops {
            match op {
                ListOp::Insert { index, item } => presenter.on_inserted(*index, item),
                ListOp::Remove { index } => presenter.on_removed(*index),
                ListOp::Move { from, to } => presenter.on_moved(*from, *to),
                ListOp::Update { index, item } => presenter.on_changed(*index, item),
            }
        }
    }
}

// =============================================================================
// Public API
// =============================================================================

/// Diff two sequences with the default configuration.
///
/// Fails with [`SyncError::InvalidSequence`] if either side repeats a key.
///
/// # Example
///
/// ```
/// use rowsync::{compute_diff, ListOp};
///
/// let old = vec![(1u32, "A")];
/// let new = vec![(1u32, "B")];
/// let result = compute_diff(&old, &new).unwrap();
/// assert_eq!(result.ops(), &[ListOp::Update { index: 0, item: (1, "B") }]);
/// ```
pub fn compute_diff<T: Item>(old: &[T], new: &[T]) -> SyncResult<DiffResult<T>> {
    compute_diff_with_config(old, new, DiffConfig::default())
}

/// Diff two sequences with custom configuration.
pub fn compute_diff_with_config<T: Item>(old: &[T], new: &[T], config: DiffConfig) -> SyncResult<DiffResult<T>> {
    let (old_keys, old_map) = check_unique(old, Side::Old)?;
    let (new_keys, new_map) = check_unique(new, Side::New)?;

    let lcs = longest_common(&old_keys, &new_keys, &new_map, config.max_edit_distance);

    let mut script = Script::new(old, new);
    script.classify(&lcs, &old_keys, &new_keys, &old_map, &new_map, config.detect_moves);
    Ok(script.build())
}

// =============================================================================
// Script Builder
// =============================================================================

#[derive(Clone, Copy, PartialEq, Eq)]
enum Fate {
    Removed,
    Kept(usize),
    Moved(usize),
}

struct Script<'a, T> {
    old: &'a [T],
    new: &'a [T],
    /// What happens to each old row
    fates: Vec<Fate>,
    /// New rows that need an `Insert`
    inserted: Vec<bool>,
    ops: Vec<ListOp<T>>,
    stats: DiffStats,
}

impl<'a, T: Item> Script<'a, T> {
    fn new(old: &'a [T], new: &'a [T]) -> Self {
        Self {
            old,
            new,
            fates: vec![Fate::Removed; old.len()],
            inserted: vec![false; new.len()],
            ops: Vec::new(),
            stats: DiffStats::default(),
        }
    }

    fn classify(
        &mut self,
        lcs: &Lcs,
        old_keys: &[T::Key],
        new_keys: &[T::Key],
        old_map: &KeyIndex<T::Key>,
        new_map: &KeyIndex<T::Key>,
        detect_moves: bool,
    ) {
        for &(old_idx, new_idx) in lcs {
            self.fates[old_idx] = Fate::Kept(new_idx);
        }

        for (old_idx, key) in old_keys.iter().enumerate() {
            if matches!(self.fates[old_idx], Fate::Kept(_)) {
                continue;
            }
            match new_map.get(key) {
                Some(&new_idx) if detect_moves => self.fates[old_idx] = Fate::Moved(new_idx),
                // Without move detection the old row stays removed
                Some(&new_idx) => self.inserted[new_idx] = true,
                None => {}
            }
        }

        for (new_idx, key) in new_keys.iter().enumerate() {
            if !old_map.contains_key(key) {
                self.inserted[new_idx] = true;
            }
        }
    }

    fn build(mut self) -> DiffResult<T> {
        self.emit_removes();
        self.emit_moves();
        self.emit_inserts();
        self.emit_updates();

        DiffResult {
            ops: self.ops,
            stats: self.stats,
        }
    }

    fn emit_removes(&mut self) {
        for old_idx in (0..self.old.len()).rev() {
            if self.fates[old_idx] == Fate::Removed {
                self.ops.push(ListOp::Remove { index: old_idx });
                self.stats.removed += 1;
            }
        }
    }

    /// Moved rows are placed by ascending new index, each right after the
    /// closest earlier row already in its final relative position.
    ///
    /// Every survivor gets an order key: `(rank + 1, 0)` for its place in
    /// the old order, and for a mover also `(group, new_idx + 1)` for where
    /// it lands. `group` is one past the rank of the nearest kept row before
    /// it in the new order, or 0 at the head. Movers landing in one group
    /// end up in new-index order right behind that kept row, so a position
    /// is the number of live keys below it.
    fn emit_moves(&mut self) {
        // (new_idx, moved) per survivor, in old order
        let survivors: Vec<(usize, bool)> = self
            .fates
            .iter()
            .filter_map(|fate| match *fate {
                Fate::Kept(new_idx) => Some((new_idx, false)),
                Fate::Moved(new_idx) => Some((new_idx, true)),
                Fate::Removed => None,
            })
            .collect();

        let mut by_new: Vec<Option<(usize, bool)>> = vec![None; self.new.len()];
        for (rank, &(new_idx, moved)) in survivors.iter().enumerate() {
            by_new[new_idx] = Some((rank, moved));
        }

        // (home key, landing key), ascending by new index
        let mut movers: Vec<((usize, usize), (usize, usize))> = Vec::new();
        let mut group = 0;
        for (new_idx, entry) in by_new.iter().enumerate() {
            match *entry {
                Some((rank, false)) => group = rank + 1,
                Some((rank, true)) => movers.push(((rank + 1, 0), (group, new_idx + 1))),
                None => {}
            }
        }
        if movers.is_empty() {
            return;
        }

        let mut keys: Vec<(usize, usize)> = (1..=survivors.len())
            .map(|slot| (slot, 0))
            .chain(movers.iter().map(|&(_, landing)| landing))
            .collect();
        keys.sort_unstable();
        let slot_of = |key: (usize, usize)| keys.binary_search(&key).unwrap_or_else(|slot| slot);

        let mut live = Fenwick::new(keys.len());
        for slot in 1..=survivors.len() {
            live.add(slot_of((slot, 0)), 1);
        }

        for (home, landing) in movers {
            let home = slot_of(home);
            let from = live.count_below(home);
            live.add(home, -1);

            let landing = slot_of(landing);
            let to = live.count_below(landing);
            live.add(landing, 1);

            if from != to {
                self.ops.push(ListOp::Move { from, to });
                self.stats.moved += 1;
            }
        }
    }

    fn emit_inserts(&mut self) {
        for (new_idx, item) in self.new.iter().enumerate() {
            if self.inserted[new_idx] {
                self.ops.push(ListOp::Insert {
                    index: new_idx,
                    item: item.clone(),
                });
                self.stats.inserted += 1;
            }
        }
    }

    fn emit_updates(&mut self) {
        let mut pairs: Vec<(usize, usize)> = self
            .fates
            .iter()
            .enumerate()
            .filter_map(|(old_idx, fate)| match *fate {
                Fate::Kept(new_idx) | Fate::Moved(new_idx) => Some((new_idx, old_idx)),
                Fate::Removed => None,
            })
            .collect();
        pairs.sort_unstable();

        for (new_idx, old_idx) in pairs {
            let new_item = &self.new[new_idx];
            if self.old[old_idx].same_content(new_item) {
                if matches!(self.fates[old_idx], Fate::Kept(_)) {
                    self.stats.kept += 1;
                }
            } else {
                self.ops.push(ListOp::Update {
                    index: new_idx,
                    item: new_item.clone(),
                });
                self.stats.updated += 1;
            }
        }
    }
}

// =============================================================================
// Fenwick
// =============================================================================

/// Binary indexed tree counting live order slots.
struct Fenwick {
    tree: Vec<isize>,
}

impl Fenwick {
    fn new(len: usize) -> Self {
        Self {
            tree: vec![0; len + 1],
        }
    }

    fn add(&mut self, slot: usize, delta: isize) {
        let mut i = slot + 1;
        while i < self.tree.len() {
            self.tree[i] += delta;
            i += i & i.wrapping_neg();
        }
    }

    /// Live slots strictly below `slot`.
    fn count_below(&self, slot: usize) -> usize {
        let mut sum = 0;
        let mut i = slot;
        while i > 0 {
            sum += self.tree[i];
            i -= i & i.wrapping_neg();
        }
        sum.max(0) as usize
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::presenter::VecPresenter;

    fn rows(items: &[(u32, &'static str)]) -> Vec<(u32, &'static str)> {
        items.to_vec()
    }

    fn replay<T: Item>(old: &[T], result: &DiffResult<T>) -> Vec<T> {
        let mut list = old.to_vec();
        result.apply_to(&mut list).unwrap();
        list
    }

    #[test]
    fn test_update_in_place() {
        let old = rows(&[(1, "A")]);
        let new = rows(&[(1, "B")]);

        let result = compute_diff(&old, &new).unwrap();
        assert_eq!(result.ops(), &[ListOp::Update { index: 0, item: (1, "B") }]);
        assert_eq!(result.stats().updated, 1);
    }

    #[test]
    fn test_swap_is_single_move() {
        let old = rows(&[(1, ""), (2, "")]);
        let new = rows(&[(2, ""), (1, "")]);

        let result = compute_diff(&old, &new).unwrap();
        assert_eq!(result.len(), 1);
        assert!(matches!(result.ops()[0], ListOp::Move { .. }));
        assert_eq!(replay(&old, &result), new);
    }

    #[test]
    fn test_insert_into_empty() {
        let new = rows(&[(1, "A")]);

        let result = compute_diff(&[], &new).unwrap();
        assert_eq!(result.ops(), &[ListOp::Insert { index: 0, item: (1, "A") }]);
    }

    #[test]
    fn test_identical_sequences_produce_nothing() {
        let seq = rows(&[(1, "A"), (2, "B"), (3, "C")]);
        let copy = seq.clone();

        let result = compute_diff(&seq, &copy).unwrap();
        assert!(result.is_empty());
        assert_eq!(result.stats().kept, 3);
    }

    #[test]
    fn test_removes_precede_inserts() {
        let old = rows(&[(1, ""), (2, ""), (3, "")]);
        let new = rows(&[(1, ""), (3, ""), (2, ""), (4, "")]);

        let result = compute_diff(&old, &new).unwrap();
        let first_insert = result.ops().iter().position(|op| matches!(op, ListOp::Insert { .. }));
        let last_remove = result.ops().iter().rposition(|op| matches!(op, ListOp::Remove { .. }));
        if let (Some(insert), Some(remove)) = (first_insert, last_remove) {
            assert!(remove < insert, "Removals should come before inserts: {:?}", result.ops());
        }
        assert_eq!(replay(&old, &result), new);
    }

    #[test]
    fn test_removes_descend() {
        let old = rows(&[(1, ""), (2, ""), (3, ""), (4, "")]);
        let new = rows(&[(2, ""), (4, "")]);

        let result = compute_diff(&old, &new).unwrap();
        assert_eq!(result.ops(), &[ListOp::Remove { index: 2 }, ListOp::Remove { index: 0 }]);
    }

    #[test]
    fn test_move_and_update_same_row() {
        let old = rows(&[(1, "A"), (2, "B"), (3, "C")]);
        let new = rows(&[(2, "B"), (3, "C"), (1, "A2")]);

        let result = compute_diff(&old, &new).unwrap();
        assert_eq!(
            result.ops(),
            &[ListOp::Move { from: 0, to: 2 }, ListOp::Update { index: 2, item: (1, "A2") }]
        );
        assert_eq!(replay(&old, &result), new);
    }

    #[test]
    fn test_mover_placed_after_unplaced_neighbour() {
        // 4 and 1 both move; 1 lands behind 3 which is kept
        let old = rows(&[(1, ""), (4, ""), (2, ""), (3, "")]);
        let new = rows(&[(2, ""), (3, ""), (1, ""), (4, "")]);

        let result = compute_diff(&old, &new).unwrap();
        assert_eq!(result.stats().moved, 2);
        assert_eq!(replay(&old, &result), new);
    }

    #[test]
    fn test_without_moves_uses_remove_insert() {
        let old = rows(&[(1, ""), (2, "")]);
        let new = rows(&[(2, ""), (1, "")]);

        let result = compute_diff_with_config(&old, &new, DiffConfig::default().without_moves()).unwrap();
        assert!(result.ops().iter().all(|op| !matches!(op, ListOp::Move { .. })));
        assert_eq!(result.stats().removed, 1);
        assert_eq!(result.stats().inserted, 1);
        assert_eq!(replay(&old, &result), new);
    }

    #[test]
    fn test_duplicate_keys_rejected() {
        let dup = rows(&[(1, "A"), (1, "B")]);
        let ok = rows(&[(1, "A")]);

        let err = compute_diff(&dup, &ok).unwrap_err();
        assert!(matches!(err, SyncError::InvalidSequence { side: Side::Old, .. }));

        let err = compute_diff(&ok, &dup).unwrap_err();
        assert!(matches!(err, SyncError::InvalidSequence { side: Side::New, .. }));
    }

    #[test]
    fn test_disjoint_sequences_hit_baseline() {
        let old = rows(&[(1, ""), (2, ""), (3, "")]);
        let new = rows(&[(7, ""), (8, "")]);

        let result = compute_diff(&old, &new).unwrap();
        assert_eq!(result.len(), old.len() + new.len());
        assert_eq!(replay(&old, &result), new);
    }

    #[test]
    fn test_cutoff_still_replays() {
        let old: Vec<u64> = (0..30).collect();
        let new: Vec<u64> = (0..30).rev().collect();

        let result = compute_diff_with_config(&old, &new, DiffConfig::new(true, 1)).unwrap();
        assert!(result.len() <= old.len() + new.len());
        assert_eq!(replay(&old, &result), new);
    }

    #[test]
    fn test_large_reversal_stays_near_linear() {
        let n = 50_000u64;
        let old: Vec<u64> = (0..n).collect();
        let new: Vec<u64> = (0..n).rev().collect();

        let started = std::time::Instant::now();
        let result = compute_diff(&old, &new).unwrap();
        let elapsed = started.elapsed();

        assert_eq!(result.stats().moved as u64, n - 1);
        assert_eq!(result.len() as u64, n - 1);
        assert!(elapsed < std::time::Duration::from_secs(10), "reversal took {elapsed:?}");
    }

    #[test]
    fn test_interleave_replays() {
        let old: Vec<u64> = (0..2000).collect();
        let new: Vec<u64> = (0..1000).flat_map(|i| [i + 1000, i]).collect();

        let result = compute_diff(&old, &new).unwrap();
        assert!(result.stats().moved <= 1000);
        assert_eq!(replay(&old, &result), new);
    }

    #[test]
    fn test_fenwick_counts_live_slots() {
        let mut live = Fenwick::new(6);
        for slot in [0, 2, 3, 5] {
            live.add(slot, 1);
        }
        assert_eq!(live.count_below(0), 0);
        assert_eq!(live.count_below(3), 2);
        assert_eq!(live.count_below(6), 4);

        live.add(2, -1);
        assert_eq!(live.count_below(4), 2);
    }

    #[test]
    fn test_apply_out_of_bounds() {
        let mut list = vec![1u64];
        let err = ListOp::Remove { index: 3 }.apply(&mut list).unwrap_err();
        assert!(matches!(err, SyncError::OutOfBounds { index: 3, .. }));

        let err = ListOp::Move { from: 0, to: 1 }.apply(&mut list).unwrap_err();
        assert!(matches!(err, SyncError::OutOfBounds { index: 1, .. }));
        assert_eq!(list, vec![1]);
    }

    #[test]
    fn test_dispatch_matches_replay() {
        let old = rows(&[(1, "A"), (2, "B"), (3, "C"), (4, "D")]);
        let new = rows(&[(5, "E"), (3, "C"), (1, "a"), (4, "D")]);

        let result = compute_diff(&old, &new).unwrap();
        let mut presenter = VecPresenter::new(old.clone());
        result.dispatch(&mut presenter);
        assert_eq!(presenter.rows(), new.as_slice());
    }

    #[test]
    fn test_config_presets() {
        assert!(DiffConfig::default().detect_moves);
        assert!(DiffConfig::large().max_edit_distance > DiffConfig::default().max_edit_distance);
        assert!(DiffConfig::small().max_edit_distance < DiffConfig::default().max_edit_distance);
        assert!(!DiffConfig::small().without_moves().detect_moves);
    }
}
