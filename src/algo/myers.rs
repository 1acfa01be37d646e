//! Longest common subsequence of two key sequences.
//!
//! Rows on the LCS stay put; every other shared key has to move.
//!
//! # Algorithm Choice
//!
//! | Algorithm | Time | Space | Best for |
//! |-----------|------|-------|----------|
//! | **Myers** | O((n+m)*d) | O(d²) | **Small edits on long lists** |
//! | Patience (LIS) | O(n log n) | O(n) | Heavy reordering |
//!
//! A list refresh after one row was added or edited has `d` of 1-2, so the
//! Myers pass is effectively linear. Once `d` passes the configured cutoff
//! the search stops and the middle section is solved as a longest
//! increasing subsequence instead. Keys are unique on each side, so both
//! give an LCS of the same length.
//!
//! # References
//!
//! - Myers, E.W. "An O(ND) Difference Algorithm and Its Variations" (1986)

use std::hash::Hash;

use crate::item::KeyIndex;

/// Default edit distance past which the Myers search hands over to the
/// patience fallback.
pub const DEFAULT_MAX_EDIT_DISTANCE: usize = 512;

/// Matched `(old_idx, new_idx)` pairs, ascending on both sides.
pub(crate) type Lcs = Vec<(usize, usize)>;

/// LCS of `old` and `new`. `new_index` maps every key of `new` to its
/// position.
pub(crate) fn longest_common<K: Eq + Hash>(
    old: &[K],
    new: &[K],
    new_index: &KeyIndex<K>,
    max_edit_distance: usize,
) -> Lcs {
    let n = old.len();
    let m = new.len();

    let prefix = old.iter().zip(new).take_while(|(a, b)| a == b).count();
    let suffix = old[prefix..]
        .iter()
        .rev()
        .zip(new[prefix..].iter().rev())
        .take_while(|(a, b)| a == b)
        .count();

    let old_mid = &old[prefix..n - suffix];
    let new_mid = &new[prefix..m - suffix];

    let mut lcs: Lcs = (0..prefix).map(|i| (i, i)).collect();

    if !old_mid.is_empty() && !new_mid.is_empty() {
        let middle = shortest_edit(old_mid, new_mid, max_edit_distance)
            .unwrap_or_else(|| patience(old_mid, new_index, prefix, new_mid.len()));
        lcs.extend(middle.into_iter().map(|(o, n)| (o + prefix, n + prefix)));
    }

    lcs.extend((0..suffix).map(|i| (n - suffix + i, m - suffix + i)));
    lcs
}

// =============================================================================
// Myers
// =============================================================================

/// Furthest-reaching x per diagonal for every edit distance searched.
///
/// Row `d` covers diagonals `-d..=d` and starts at `d * d` in `cells`, so
/// the whole trace takes `(d + 1)²` slots. Only moves that stay inside the
/// `n x m` edit grid are taken; a diagonal no such path reaches holds
/// [`UNREACHED`](Frontier::UNREACHED).
struct Frontier {
    cells: Vec<usize>,
    n: usize,
    m: usize,
}

impl Frontier {
    const UNREACHED: usize = usize::MAX;

    fn new(n: usize, m: usize) -> Self {
        Self { cells: Vec::new(), n, m }
    }

    fn push_row(&mut self, d: usize) {
        self.cells.resize((d + 1) * (d + 1), Self::UNREACHED);
    }

    #[inline]
    fn slot(d: usize, k: isize) -> usize {
        d * d + (k + d as isize) as usize
    }

    #[inline]
    fn get(&self, d: usize, k: isize) -> usize {
        self.cells[Self::slot(d, k)]
    }

    #[inline]
    fn set(&mut self, d: usize, k: isize, x: usize) {
        self.cells[Self::slot(d, k)] = x;
    }

    /// Diagonal that step `d` continued from to reach diagonal `k`, and the
    /// x right after that single edit. Requires `d > 0`.
    fn step(&self, d: usize, k: isize) -> Option<(isize, usize)> {
        let di = d as isize;

        // Down from k + 1 keeps x and needs a row of `new` left
        let down = (k < di)
            .then(|| self.get(d - 1, k + 1))
            .filter(|&x| x != Self::UNREACHED && x as isize - k <= self.m as isize)
            .map(|x| (k + 1, x));

        // Right from k - 1 consumes one row of `old`
        let right = (k > -di)
            .then(|| self.get(d - 1, k - 1))
            .filter(|&x| x != Self::UNREACHED && x < self.n)
            .map(|x| (k - 1, x + 1));

        match (down, right) {
            (Some(down), Some(right)) => Some(if down.1 >= right.1 { down } else { right }),
            (down, right) => down.or(right),
        }
    }
}

/// Myers forward search. `None` once the edit distance passes `limit`.
fn shortest_edit<K: Eq>(old: &[K], new: &[K], limit: usize) -> Option<Lcs> {
    let n = old.len();
    let m = new.len();
    let mut frontier = Frontier::new(n, m);

    for d in 0..=(n + m).min(limit) {
        frontier.push_row(d);
        let di = d as isize;

        for k in (-di..=di).step_by(2) {
            let mut x = if d == 0 {
                0
            } else {
                match frontier.step(d, k) {
                    Some((_, x)) => x,
                    None => continue,
                }
            };
            let mut y = (x as isize - k) as usize;

            while x < n && y < m && old[x] == new[y] {
                x += 1;
                y += 1;
            }
            frontier.set(d, k, x);

            if x == n && y == m {
                return Some(trace_back(&frontier, d));
            }
        }
    }

    None
}

/// Collect the diagonal runs of the path that reached `(n, m)` after
/// `d_end` edits.
fn trace_back(frontier: &Frontier, d_end: usize) -> Lcs {
    let (mut x, mut y) = (frontier.n, frontier.m);
    let mut pairs = Vec::new();

    for d in (1..=d_end).rev() {
        let k = x as isize - y as isize;
        let Some((from, run_start)) = frontier.step(d, k) else {
            break;
        };

        // Diagonal from right after the single edit of step d
        while x > run_start {
            x -= 1;
            y -= 1;
            pairs.push((x, y));
        }

        x = frontier.get(d - 1, from);
        y = (x as isize - from) as usize;
    }

    // Step 0 is a pure diagonal from the origin
    while x > 0 && y > 0 {
        x -= 1;
        y -= 1;
        pairs.push((x, y));
    }

    pairs.reverse();
    pairs
}

// =============================================================================
// Patience fallback
// =============================================================================

/// LCS as the longest increasing run of new positions, taken in old order.
///
/// `old` and the new window are the middle sections starting at `base` in
/// the full sequences; `new_index` still holds full-sequence positions.
fn patience<K: Eq + Hash>(old: &[K], new_index: &KeyIndex<K>, base: usize, new_len: usize) -> Lcs {
    let shared: Vec<(usize, usize)> = old
        .iter()
        .enumerate()
        .filter_map(|(o, key)| {
            let n = new_index.get(key)?.checked_sub(base)?;
            (n < new_len).then_some((o, n))
        })
        .collect();

    // tails[len] = index into `shared` ending the best run of length len + 1
    let mut tails: Vec<usize> = Vec::new();
    let mut parent: Vec<Option<usize>> = vec![None; shared.len()];

    for (i, &(_, n)) in shared.iter().enumerate() {
        let len = tails.partition_point(|&t| shared[t].1 < n);
        parent[i] = len.checked_sub(1).map(|prev| tails[prev]);
        if len == tails.len() {
            tails.push(i);
        } else {
            tails[len] = i;
        }
    }

    let mut run = Vec::with_capacity(tails.len());
    let mut cursor = tails.last().copied();
    while let Some(i) = cursor {
        run.push(shared[i]);
        cursor = parent[i];
    }
    run.reverse();
    run
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn index(keys: &[u64]) -> KeyIndex<u64> {
        keys.iter().enumerate().map(|(i, &k)| (k, i)).collect()
    }

    fn lcs(old: &[u64], new: &[u64]) -> Lcs {
        longest_common(old, new, &index(new), DEFAULT_MAX_EDIT_DISTANCE)
    }

    fn lcs_limited(old: &[u64], new: &[u64], limit: usize) -> Lcs {
        longest_common(old, new, &index(new), limit)
    }

    /// Pairs match keys and ascend on both sides.
    fn assert_valid(old: &[u64], new: &[u64], pairs: &Lcs) {
        for &(o, n) in pairs {
            assert_eq!(old[o], new[n]);
        }
        for w in pairs.windows(2) {
            assert!(w[0].0 < w[1].0 && w[0].1 < w[1].1, "not ascending: {pairs:?}");
        }
    }

    #[test]
    fn test_empty_sides() {
        assert!(lcs(&[], &[]).is_empty());
        assert!(lcs(&[], &[1, 2, 3]).is_empty());
        assert!(lcs(&[1, 2, 3], &[]).is_empty());
    }

    #[test]
    fn test_identical() {
        assert_eq!(lcs(&[1, 2, 3], &[1, 2, 3]), vec![(0, 0), (1, 1), (2, 2)]);
    }

    #[test]
    fn test_single_insert_and_delete() {
        assert_eq!(lcs(&[1, 3], &[1, 2, 3]), vec![(0, 0), (1, 2)]);
        assert_eq!(lcs(&[1, 2, 3], &[1, 3]), vec![(0, 0), (2, 1)]);
    }

    #[test]
    fn test_swap_keeps_one() {
        let pairs = lcs(&[1, 2], &[2, 1]);
        assert_eq!(pairs.len(), 1);
        assert_valid(&[1, 2], &[2, 1], &pairs);
    }

    #[test]
    fn test_rotation_keeps_tail() {
        let old = [1, 2, 3, 4];
        let new = [2, 3, 4, 1];
        assert_eq!(lcs(&old, &new), vec![(1, 0), (2, 1), (3, 2)]);
    }

    #[test]
    fn test_prefix_and_suffix_stripped() {
        let pairs = lcs(&[1, 2, 3, 4, 5, 100], &[1, 2, 3, 4, 5, 200]);
        assert_eq!(pairs, (0..5).map(|i| (i, i)).collect::<Vec<_>>());

        let pairs = lcs(&[100, 1, 2, 3, 4, 5], &[200, 1, 2, 3, 4, 5]);
        assert_eq!(pairs, (1..6).map(|i| (i, i)).collect::<Vec<_>>());
    }

    #[test]
    fn test_sparse_deletes_and_appends() {
        // 40 rows, every 5th removed and two new rows appended
        let old: Vec<u64> = (0..40).collect();
        let mut new: Vec<u64> = old.iter().copied().filter(|k| k % 5 != 0).collect();
        new.push(100);
        new.push(101);

        let pairs = lcs(&old, &new);
        assert_eq!(pairs.len(), 32);
        assert_valid(&old, &new, &pairs);
    }

    #[test]
    fn test_cutoff_falls_back_to_same_length() {
        let old: Vec<u64> = vec![5, 1, 9, 2, 7, 3, 8, 4, 6, 0, 11, 10];
        let new: Vec<u64> = (0..12).collect();

        let searched = lcs(&old, &new);
        let fallback = lcs_limited(&old, &new, 0);
        assert_valid(&old, &new, &fallback);
        assert_eq!(searched.len(), fallback.len());
        // 1 2 3 4 6 10
        assert_eq!(fallback.len(), 6);
    }

    #[test]
    fn test_reversal_keeps_one() {
        let old: Vec<u64> = (0..20).collect();
        let new: Vec<u64> = (0..20).rev().collect();
        assert_eq!(lcs(&old, &new).len(), 1);
        assert_eq!(lcs_limited(&old, &new, 3).len(), 1);
    }

    #[test]
    fn test_interleave_half_kept() {
        let old: Vec<u64> = (0..1000).collect();
        let new: Vec<u64> = (0..500).flat_map(|i| [i + 500, i]).collect();
        let pairs = lcs(&old, &new);
        assert_eq!(pairs.len(), 500);
        assert_valid(&old, &new, &pairs);
    }

    #[test]
    fn test_lopsided_lengths_stay_in_grid() {
        let old: Vec<u64> = vec![3];
        let new: Vec<u64> = (0..10).collect();
        assert_eq!(lcs(&old, &new), vec![(0, 3)]);

        let old: Vec<u64> = vec![90, 7, 91, 92, 93, 94, 95, 96, 97, 98, 99, 2];
        let new: Vec<u64> = vec![2, 7];
        let pairs = lcs(&old, &new);
        assert_eq!(pairs.len(), 1);
        assert_valid(&old, &new, &pairs);
    }

    #[test]
    fn test_frontier_rows_are_triangular() {
        let mut frontier = Frontier::new(3, 3);
        for d in 0..4 {
            frontier.push_row(d);
        }
        assert_eq!(frontier.cells.len(), 16);
        assert!(frontier.cells.iter().all(|&x| x == Frontier::UNREACHED));
        assert_eq!(Frontier::slot(3, -3), 9);
        assert_eq!(Frontier::slot(3, 3), 15);
    }
}
