//! Orbit partitions
//!
//! A union-find structure over the point set, tracking for every class its
//! minimal element. The engine uses one instance for the automorphism
//! subgroup discovered during search and a scratch instance for stabilizer
//! orbits.
//!
//! Unions always keep the smaller root as the new root, so the root of a
//! class *is* its minimal element; `find` doubles as the minimal-cell-
//! representative lookup. Path halving keeps queries effectively constant.

/// Union-find over `0..n` with minimal class representatives.
#[derive(Debug, Clone)]
pub struct OrbitPartition {
    parent: Vec<usize>,
}

impl OrbitPartition {
    /// Create a partition of `0..n` into singletons.
    pub fn new(n: usize) -> Self {
        Self {
            parent: (0..n).collect(),
        }
    }

    /// Number of points.
    pub fn degree(&self) -> usize {
        self.parent.len()
    }

    /// Reset every class to a singleton.
    pub fn clear(&mut self) {
        for (i, p) in self.parent.iter_mut().enumerate() {
            *p = i;
        }
    }

    /// Root of the class containing `i`, with path halving.
    pub fn find(&mut self, i: usize) -> usize {
        let mut i = i;
        while self.parent[i] != i {
            self.parent[i] = self.parent[self.parent[i]];
            i = self.parent[i];
        }
        i
    }

    /// Minimal element of the class containing `i`.
    ///
    /// The smaller root wins every union, so this is just `find`.
    #[inline]
    pub fn mcr(&mut self, i: usize) -> usize {
        self.find(i)
    }

    /// Merge the classes of `a` and `b`. Returns `true` if they were
    /// distinct.
    pub fn union(&mut self, a: usize, b: usize) -> bool {
        let ra = self.find(a);
        let rb = self.find(b);
        if ra == rb {
            return false;
        }
        let (lo, hi) = if ra < rb { (ra, rb) } else { (rb, ra) };
        self.parent[hi] = lo;
        true
    }

    /// Union `i` with `perm[i]` for every point. Returns `true` if any merge
    /// actually occurred.
    pub fn merge_perm(&mut self, perm: &[usize]) -> bool {
        debug_assert_eq!(perm.len(), self.parent.len());
        let mut merged = false;
        for (i, &j) in perm.iter().enumerate() {
            merged |= self.union(i, j);
        }
        merged
    }

    /// `true` iff `a` and `b` lie in the same class.
    pub fn same_class(&mut self, a: usize, b: usize) -> bool {
        self.find(a) == self.find(b)
    }
}
