//! Permutations of `0..n`
//!
//! A `Permutation` is stored by its direct mapping: `map[i]` is the image of
//! `i`. This is the value type exchanged with the stabilizer chain and
//! returned to callers of the search engine; inside the engine itself
//! permutations mostly travel as plain `&[usize]` rows of the workspace.

use crate::bits::PointSet;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Errors raised when constructing a permutation from caller data.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PermutationError {
    #[error("image list of length {len} is not a permutation of 0..{len}")]
    NotAPermutation { len: usize },
}

/// A permutation of `0..n`, stored as its image list.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Permutation {
    map: Vec<usize>,
}

impl Permutation {
    /// The identity permutation on `0..n`.
    pub fn identity(n: usize) -> Self {
        Self {
            map: (0..n).collect(),
        }
    }

    /// Build from an image list; `map[i]` is the image of `i`.
    ///
    /// Fails unless `map` is a bijection of `0..map.len()`.
    pub fn from_map(map: Vec<usize>) -> Result<Self, PermutationError> {
        let n = map.len();
        let mut seen = vec![false; n];
        for &image in &map {
            if image >= n || seen[image] {
                return Err(PermutationError::NotAPermutation { len: n });
            }
            seen[image] = true;
        }
        Ok(Self { map })
    }

    /// Number of points acted on.
    #[inline]
    pub fn degree(&self) -> usize {
        self.map.len()
    }

    /// Image of a single point.
    #[inline]
    pub fn apply(&self, i: usize) -> usize {
        self.map[i]
    }

    /// The image list as a slice.
    #[inline]
    pub fn as_slice(&self) -> &[usize] {
        &self.map
    }

    /// `true` iff every point is fixed.
    pub fn is_identity(&self) -> bool {
        self.map.iter().enumerate().all(|(i, &j)| i == j)
    }

    /// Composition: `a.compose(&b)` applies `b` first, then `a`.
    pub fn compose(&self, other: &Permutation) -> Permutation {
        debug_assert_eq!(self.degree(), other.degree());
        Permutation {
            map: other.map.iter().map(|&i| self.map[i]).collect(),
        }
    }

    /// The inverse permutation.
    pub fn inverse(&self) -> Permutation {
        let mut inv = vec![0; self.map.len()];
        for (i, &j) in self.map.iter().enumerate() {
            inv[j] = i;
        }
        Permutation { map: inv }
    }

    /// Write the fixed points and minimal cycle representatives into `fp`
    /// and `mcr`.
    ///
    /// `fp` receives the points with `map[i] == i`; `mcr` receives every
    /// point that is the minimum of its cycle (fixed points included).
    pub fn fixed_and_cycle_minima(&self, fp: &mut PointSet, mcr: &mut PointSet) {
        fixed_and_cycle_minima_of(&self.map, fp, mcr);
    }
}

/// Fixed points and minimal cycle representatives of an image array.
///
/// Each cycle is walked from its smallest entry point only, so the scan is
/// O(n) across all cycles.
pub fn fixed_and_cycle_minima_of(map: &[usize], fp: &mut PointSet, mcr: &mut PointSet) {
    fp.clear();
    mcr.clear();
    for i in 0..map.len() {
        if map[i] == i {
            fp.insert(i);
            mcr.insert(i);
            continue;
        }
        let mut j = map[i];
        let mut minimal = true;
        while j != i {
            if j < i {
                minimal = false;
                break;
            }
            j = map[j];
        }
        if minimal {
            mcr.insert(i);
        }
    }
}

impl fmt::Display for Permutation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[")?;
        for (i, image) in self.map.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}", image)?;
        }
        write!(f, "]")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identity() {
        let p = Permutation::identity(4);
        assert!(p.is_identity());
        assert_eq!(p.apply(2), 2);
    }

    #[test]
    fn test_from_map_rejects_non_bijections() {
        assert!(Permutation::from_map(vec![0, 0, 1]).is_err());
        assert!(Permutation::from_map(vec![0, 3]).is_err());
        assert!(Permutation::from_map(vec![2, 0, 1]).is_ok());
    }

    #[test]
    fn test_compose_and_inverse() {
        let a = Permutation::from_map(vec![1, 2, 0, 3]).unwrap();
        let b = Permutation::from_map(vec![0, 1, 3, 2]).unwrap();

        // compose applies the right factor first
        let ab = a.compose(&b);
        assert_eq!(ab.as_slice(), &[1, 2, 3, 0]);

        let e = a.compose(&a.inverse());
        assert!(e.is_identity());
    }

    #[test]
    fn test_cycle_minima() {
        // (0 1 2)(3)(4 5)
        let p = Permutation::from_map(vec![1, 2, 0, 3, 5, 4]).unwrap();
        let mut fp = PointSet::new(6);
        let mut mcr = PointSet::new(6);
        p.fixed_and_cycle_minima(&mut fp, &mut mcr);

        assert_eq!(fp.iter().collect::<Vec<_>>(), vec![3]);
        assert_eq!(mcr.iter().collect::<Vec<_>>(), vec![0, 3, 4]);
    }
}
