//! Partition stacks
//!
//! A `PartitionStack` represents a nested sequence of ordered partitions
//! `π_0 ⊑ π_1 ⊑ … ⊑ π_d` of `{0..n-1}`, each refining the previous. Two
//! length-`n` arrays encode the whole tower:
//!
//! - `entries` is a permutation of `0..n` listing the points in cell order;
//! - `levels[i]` is the depth at which the cell boundary after position `i`
//!   first appears: the boundary is active at depth `d` iff `levels[i] <= d`.
//!   `levels[n-1]` is `-1`, the boundary after the final position existing at
//!   every depth.
//!
//! Backtracking pops by assigning a smaller `depth`; boundaries created on an
//! abandoned branch stay in `levels` and are pushed out of the way when their
//! depth is re-entered (`clear_level`).
//!
//! Within every cell of the active partition, the smallest point sits at the
//! cell's first position (the mins-first invariant). The engine relies on it
//! to compare partitions entry-by-entry and to read candidate permutations
//! off discrete stacks without sorting.

use crate::bits::PointSet;
use serde::{Deserialize, Serialize};

/// A stack of ever-finer ordered partitions of `{0..n-1}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PartitionStack {
    /// Points in cell order; a permutation of `0..n`.
    pub entries: Vec<usize>,
    /// Creation depth of the boundary after each position; `-1` after the
    /// last position.
    pub levels: Vec<i64>,
    /// Depth of the active partition.
    pub depth: usize,
}

impl PartitionStack {
    /// The one-cell partition `{0..n-1}` at depth 0. A degree-0 stack is
    /// permitted; the engine answers "not isomorphic" for it immediately.
    pub fn unit(n: usize) -> Self {
        let mut levels = vec![n as i64 + 1; n];
        if n > 0 {
            levels[n - 1] = -1;
        }
        Self {
            entries: (0..n).collect(),
            levels,
            depth: 0,
        }
    }

    /// Build a depth-0 stack from explicit cells.
    ///
    /// The cells must partition `0..n` for `n` the total point count; each
    /// cell is sorted so the mins-first invariant holds on entry to the
    /// search.
    pub fn from_cells(cells: &[Vec<usize>]) -> Self {
        let n: usize = cells.iter().map(|c| c.len()).sum();
        let mut entries = Vec::with_capacity(n);
        let mut levels = vec![n as i64 + 1; n];
        for cell in cells {
            let mut cell = cell.clone();
            cell.sort_unstable();
            entries.extend_from_slice(&cell);
            if !entries.is_empty() {
                levels[entries.len() - 1] = 0;
            }
        }
        debug_assert_eq!(entries.len(), n);
        if n > 0 {
            levels[n - 1] = -1;
        }
        Self {
            entries,
            levels,
            depth: 0,
        }
    }

    /// Number of points.
    #[inline]
    pub fn degree(&self) -> usize {
        self.entries.len()
    }

    /// Overwrite this stack with `other`, reusing the buffers.
    pub fn copy_from(&mut self, other: &PartitionStack) {
        self.entries.copy_from_slice(&other.entries);
        self.levels.copy_from_slice(&other.levels);
        self.depth = other.depth;
    }

    /// `true` iff the boundary after position `i` is active at the current
    /// depth.
    #[inline]
    fn is_boundary(&self, i: usize) -> bool {
        self.levels[i] <= self.depth as i64
    }

    /// Every cell of the active partition is a singleton.
    pub fn is_discrete(&self) -> bool {
        let d = self.depth as i64;
        self.levels.iter().all(|&l| l <= d)
    }

    /// Start position of the cell containing position `pos`.
    fn cell_start(&self, pos: usize) -> usize {
        let mut c = pos;
        while c > 0 && !self.is_boundary(c - 1) {
            c -= 1;
        }
        c
    }

    /// End position (inclusive) of the cell starting at `c`.
    fn cell_end(&self, c: usize) -> usize {
        let mut e = c;
        while !self.is_boundary(e) {
            e += 1;
        }
        e
    }

    /// Locate the earliest non-singleton cell of the active partition.
    ///
    /// Writes the cell's membership into `out` and returns its minimum
    /// element, the splitting point. The stack must not be discrete.
    pub fn first_smallest(&self, out: &mut PointSet) -> usize {
        out.clear();
        let mut c = 0;
        loop {
            let e = self.cell_end(c);
            if e > c {
                let mut min = self.entries[c];
                for &p in &self.entries[c..=e] {
                    out.insert(p);
                    if p < min {
                        min = p;
                    }
                }
                debug_assert_eq!(min, self.entries[c], "mins-first violated");
                return min;
            }
            c = e + 1;
            debug_assert!(c < self.degree(), "no non-singleton cell");
        }
    }

    /// Swap the minimum of every cell to the cell's first position,
    /// re-establishing the mins-first invariant.
    pub fn move_all_mins_to_front(&mut self) {
        let n = self.degree();
        let mut c = 0;
        while c < n {
            let e = self.cell_end(c);
            if e > c {
                let mut min_pos = c;
                for i in c + 1..=e {
                    if self.entries[i] < self.entries[min_pos] {
                        min_pos = i;
                    }
                }
                self.entries.swap(c, min_pos);
            }
            c = e + 1;
        }
    }

    /// Push one depth, deactivating boundaries left behind by abandoned
    /// branches at the new depth.
    pub fn push_level(&mut self) {
        self.depth += 1;
        let d = self.depth as i64;
        for l in self.levels.iter_mut() {
            if *l == d {
                *l += 1;
            }
        }
    }

    /// Isolate `p` into a singleton cell at the front of its current cell.
    ///
    /// Must be preceded by `push_level`. Returns the position of the new
    /// singleton, which is also the start of every cell changed by the
    /// split.
    pub fn split_point(&mut self, p: usize) -> usize {
        let pos = self.entries.iter().position(|&q| q == p).expect("point in range");
        let c = self.cell_start(pos);
        self.entries.swap(c, pos);
        if !self.is_boundary(c) {
            self.levels[c] = self.depth as i64;
        }
        c
    }

    /// Insert a boundary after position `i` at the current depth.
    pub(crate) fn set_boundary(&mut self, i: usize) {
        if !self.is_boundary(i) {
            self.levels[i] = self.depth as i64;
        }
    }

    /// Both stacks have identical cell boundaries at their current depths.
    pub fn equivalent(&self, other: &PartitionStack) -> bool {
        debug_assert_eq!(self.degree(), other.degree());
        (0..self.degree()).all(|i| self.is_boundary(i) == other.is_boundary(i))
    }

    /// With both stacks discrete and cell-equivalent, write the candidate
    /// permutation into `out`: `out[self.entries[i]] = other.entries[i]`.
    pub fn get_perm_from(&self, other: &PartitionStack, out: &mut [usize]) {
        debug_assert!(self.is_discrete() && other.is_discrete());
        for i in 0..self.degree() {
            out[self.entries[i]] = other.entries[i];
        }
    }

    /// Structural fixed-point and minimal-representative predicates of the
    /// active partition.
    ///
    /// `fp` receives the points in singleton cells; `mcr` receives every
    /// cell's minimum. Any permutation respecting the partition fixes the
    /// former and maps cells onto themselves, so these bound what a symmetry
    /// discovered below this node can do.
    pub fn fixed_and_mcr(&self, fp: &mut PointSet, mcr: &mut PointSet) {
        fp.clear();
        mcr.clear();
        let n = self.degree();
        let mut c = 0;
        while c < n {
            let e = self.cell_end(c);
            if e == c {
                fp.insert(self.entries[c]);
            }
            let min = self.entries[c..=e].iter().copied().min().unwrap_or(self.entries[c]);
            mcr.insert(min);
            c = e + 1;
        }
    }

    /// Iterate over `(start, end)` position ranges (inclusive) of the active
    /// partition's cells.
    pub fn cells(&self) -> CellRanges<'_> {
        CellRanges { ps: self, next: 0 }
    }
}

/// Iterator over the cell ranges of a partition stack's active partition.
pub struct CellRanges<'a> {
    ps: &'a PartitionStack,
    next: usize,
}

impl Iterator for CellRanges<'_> {
    type Item = (usize, usize);

    fn next(&mut self) -> Option<(usize, usize)> {
        if self.next >= self.ps.degree() {
            return None;
        }
        let c = self.next;
        let e = self.ps.cell_end(c);
        self.next = e + 1;
        Some((c, e))
    }
}
