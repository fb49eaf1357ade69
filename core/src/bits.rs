//! Point sets as bit vectors
//!
//! The search engine tracks candidate vertices, fixed points and cycle
//! representatives as subsets of `0..n`. `PointSet` wraps a `BitVec` with the
//! handful of queries the engine needs: minimum element, successor scan, and
//! in-place intersection.

use bitvec::prelude::*;

/// A subset of the point set `{0, .., n-1}`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PointSet {
    bits: BitVec,
}

impl PointSet {
    /// Create an empty set with capacity for points `0..n`.
    pub fn new(n: usize) -> Self {
        Self {
            bits: bitvec![0; n],
        }
    }

    /// Number of points the set ranges over (not the cardinality).
    pub fn capacity(&self) -> usize {
        self.bits.len()
    }

    /// Test membership of `p`.
    #[inline]
    pub fn contains(&self, p: usize) -> bool {
        self.bits[p]
    }

    /// Add `p` to the set.
    #[inline]
    pub fn insert(&mut self, p: usize) {
        self.bits.set(p, true);
    }

    /// Remove `p` from the set.
    #[inline]
    pub fn remove(&mut self, p: usize) {
        self.bits.set(p, false);
    }

    /// Remove every point.
    pub fn clear(&mut self) {
        self.bits.fill(false);
    }

    /// The minimum element, if any.
    pub fn first(&self) -> Option<usize> {
        self.bits.first_one()
    }

    /// The minimum element `>= k`, if any.
    pub fn next_at(&self, k: usize) -> Option<usize> {
        if k >= self.bits.len() {
            return None;
        }
        self.bits[k..].first_one().map(|i| i + k)
    }

    /// The minimum element `> k`, if any.
    pub fn next_after(&self, k: usize) -> Option<usize> {
        self.next_at(k + 1)
    }

    /// Cardinality.
    pub fn count(&self) -> usize {
        self.bits.count_ones()
    }

    /// `true` if no point is present.
    pub fn is_empty(&self) -> bool {
        self.bits.not_any()
    }

    /// Intersect in place with `other`.
    pub fn intersect(&mut self, other: &PointSet) {
        debug_assert_eq!(self.bits.len(), other.bits.len());
        for (word, &mask) in self
            .bits
            .as_raw_mut_slice()
            .iter_mut()
            .zip(other.bits.as_raw_slice())
        {
            *word &= mask;
        }
    }

    /// Overwrite this set with the contents of `other`.
    pub fn copy_from(&mut self, other: &PointSet) {
        debug_assert_eq!(self.bits.len(), other.bits.len());
        self.bits.copy_from_bitslice(other.bits.as_bitslice());
    }

    /// Iterate over the members in increasing order.
    pub fn iter(&self) -> impl Iterator<Item = usize> + '_ {
        self.bits.iter_ones()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insert_and_scan() {
        let mut s = PointSet::new(10);
        assert!(s.is_empty());
        s.insert(3);
        s.insert(7);
        s.insert(4);

        assert_eq!(s.first(), Some(3));
        assert_eq!(s.next_after(3), Some(4));
        assert_eq!(s.next_after(4), Some(7));
        assert_eq!(s.next_after(7), None);
        assert_eq!(s.count(), 3);
    }

    #[test]
    fn test_next_at_boundary() {
        let mut s = PointSet::new(4);
        s.insert(3);
        assert_eq!(s.next_at(3), Some(3));
        assert_eq!(s.next_at(4), None);
        assert_eq!(s.next_after(3), None);
    }

    #[test]
    fn test_intersect() {
        let mut a = PointSet::new(8);
        let mut b = PointSet::new(8);
        for p in [1, 2, 5, 6] {
            a.insert(p);
        }
        for p in [2, 3, 6] {
            b.insert(p);
        }
        a.intersect(&b);
        assert_eq!(a.iter().collect::<Vec<_>>(), vec![2, 6]);
    }

    #[test]
    fn test_copy_from_and_clear() {
        let mut a = PointSet::new(5);
        a.insert(0);
        a.insert(4);
        let mut b = PointSet::new(5);
        b.copy_from(&a);
        assert_eq!(b.iter().collect::<Vec<_>>(), vec![0, 4]);
        b.clear();
        assert!(b.is_empty());
        assert_eq!(a.count(), 2);
    }
}
