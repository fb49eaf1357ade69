//! Stabilizer chains
//!
//! A Schreier–Sims representation of a permutation group `G ≤ S_n` as a tower
//! of point stabilizers `G = G_0 ≥ G_1 ≥ …`, where `G_l` stabilizes the base
//! points `base[0..l]` pointwise. Each level keeps a Schreier tree for the
//! orbit of its base point under `G_l`; membership is decided by sifting.
//!
//! The search engine consumes the chain through a narrow contract: the
//! per-level reachability predicate (`in_orbit`), transversal-inverse
//! application for its cumulative permutation rows, orbit partitions of the
//! level stabilizers, membership tests, and base-point insertion. Base-point
//! insertion rebuilds the chain with a prescribed base prefix; prescribed
//! base points are materialized even when their orbit is a singleton, so a
//! trivial stabilizer still answers reachability queries correctly.

use crate::perm::{OrbitPartition, Permutation, PermutationError};
use rustc_hash::FxHashSet;
use std::collections::VecDeque;
use thiserror::Error;

/// Errors raised while building or extending a stabilizer chain.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GroupError {
    #[error("workspace allocation failed")]
    Allocation,

    #[error("generator of degree {found} in a chain of degree {expected}")]
    DegreeMismatch { expected: usize, found: usize },

    #[error(transparent)]
    Permutation(#[from] PermutationError),
}

/// A strong generator together with its inverse and the deepest level whose
/// base prefix it fixes.
#[derive(Debug, Clone)]
struct StrongGen {
    perm: Permutation,
    inv: Permutation,
    level: usize,
}

/// One level of the chain: a base point and the Schreier tree of its orbit
/// under the level's stabilizer.
#[derive(Debug, Clone)]
struct Level {
    base: usize,
    /// `parent[p] == -1` iff `p` is not in the orbit; `parent[base] == base`.
    parent: Vec<i64>,
    /// Index into the chain's generator list of the edge reaching `p` from
    /// `parent[p]`.
    edge: Vec<usize>,
}

/// A stabilizer chain for a subgroup of `S_n`.
#[derive(Debug, Clone)]
pub struct StabilizerChain {
    degree: usize,
    gens: Vec<StrongGen>,
    levels: Vec<Level>,
    /// Image arrays of the stored strong generators, for dedup on insert.
    seen: FxHashSet<Vec<usize>>,
}

fn try_vec<T: Clone>(n: usize, val: T) -> Result<Vec<T>, GroupError> {
    let mut v = Vec::new();
    v.try_reserve_exact(n).map_err(|_| GroupError::Allocation)?;
    v.resize(n, val);
    Ok(v)
}

impl StabilizerChain {
    /// The trivial group on `0..n`.
    pub fn trivial(n: usize) -> Self {
        Self {
            degree: n,
            gens: Vec::new(),
            levels: Vec::new(),
            seen: FxHashSet::default(),
        }
    }

    /// Build a chain for the group generated by `gens`.
    pub fn from_generators(n: usize, gens: Vec<Permutation>) -> Result<Self, GroupError> {
        Self::with_base_prefix(n, gens, &[])
    }

    /// Build a chain whose base starts with the prescribed `prefix`.
    pub fn with_base_prefix(
        n: usize,
        gens: Vec<Permutation>,
        prefix: &[usize],
    ) -> Result<Self, GroupError> {
        let mut chain = Self::trivial(n);
        if n == 0 {
            return Ok(chain);
        }
        for &b in prefix {
            chain.push_level(b)?;
        }
        for g in gens {
            if g.degree() != n {
                return Err(GroupError::DegreeMismatch {
                    expected: n,
                    found: g.degree(),
                });
            }
            chain.insert_generator(g)?;
        }
        chain.close()?;
        Ok(chain)
    }

    /// Number of points acted on.
    pub fn degree(&self) -> usize {
        self.degree
    }

    /// Number of base points.
    pub fn base_size(&self) -> usize {
        self.levels.len()
    }

    /// The level-`l` base point.
    pub fn base(&self, l: usize) -> Option<usize> {
        self.levels.get(l).map(|lv| lv.base)
    }

    /// `true` iff `p` is reachable in the level-`l` Schreier tree.
    ///
    /// Levels past the end of the base have a trivial stabilizer, whose only
    /// reachable point would be the (nonexistent) base; callers treat that
    /// as "nothing reachable", which `false` encodes.
    pub fn in_orbit(&self, l: usize, p: usize) -> bool {
        match self.levels.get(l) {
            Some(level) => level.parent[p] != -1,
            None => false,
        }
    }

    /// Group order: the product of the orbit lengths down the chain.
    pub fn order(&self) -> u128 {
        self.levels
            .iter()
            .map(|lv| lv.parent.iter().filter(|&&p| p != -1).count() as u128)
            .product()
    }

    /// Map `row` through the inverse of the transversal element `u` with
    /// `u(base[l]) = p`, i.e. set `row[x] = u⁻¹(row[x])` for all `x`.
    ///
    /// `p` must be reachable at level `l`. Walks the Schreier tree from `p`
    /// to the base, applying one inverse generator per edge.
    pub fn apply_transversal_inverse(&self, l: usize, p: usize, row: &mut [usize]) {
        let level = &self.levels[l];
        debug_assert!(level.parent[p] != -1);
        let mut q = p;
        while q != level.base {
            let sg = &self.gens[level.edge[q]];
            for v in row.iter_mut() {
                *v = sg.inv.apply(*v);
            }
            q = level.parent[q] as usize;
        }
    }

    /// The transversal element `u` with `u(base[l]) = p`, as a permutation.
    fn transversal(&self, l: usize, p: usize) -> Permutation {
        let level = &self.levels[l];
        debug_assert!(level.parent[p] != -1);
        let mut path = Vec::new();
        let mut q = p;
        while q != level.base {
            path.push(level.edge[q]);
            q = level.parent[q] as usize;
        }
        let mut map: Vec<usize> = (0..self.degree).collect();
        for &gi in path.iter().rev() {
            let g = &self.gens[gi].perm;
            for v in map.iter_mut() {
                *v = g.apply(*v);
            }
        }
        Permutation::from_map(map).expect("transversal is a permutation")
    }

    /// Sift `map` through the levels starting at `from`, reducing it in
    /// place. Returns the level at which sifting got stuck, or `None` if it
    /// passed every level (in which case `map` holds the residue).
    fn sift_map(&self, from: usize, map: &mut [usize]) -> Option<usize> {
        for l in from..self.levels.len() {
            let q = map[self.levels[l].base];
            if self.levels[l].parent[q] == -1 {
                return Some(l);
            }
            self.apply_transversal_inverse(l, q, map);
        }
        None
    }

    /// Membership test by sifting. Arrays of the wrong length are rejected.
    pub fn contains(&self, perm: &[usize]) -> bool {
        if perm.len() != self.degree {
            return false;
        }
        let mut map = perm.to_vec();
        if self.sift_map(0, &mut map).is_some() {
            return false;
        }
        map.iter().enumerate().all(|(i, &x)| i == x)
    }

    /// Explicit generators of the stabilizer of `base[0..l]`: every strong
    /// generator assigned to level `l` or deeper.
    pub fn stabilizer_generators(&self, l: usize) -> impl Iterator<Item = &Permutation> {
        self.gens
            .iter()
            .filter(move |sg| sg.level >= l)
            .map(|sg| &sg.perm)
    }

    /// Merge every strong generator of levels `>= l` into `op`, producing
    /// the orbit partition of the stabilizer of `base[0..l]`.
    pub fn orbits_from_level(&self, l: usize, op: &mut OrbitPartition) {
        debug_assert_eq!(op.degree(), self.degree);
        op.clear();
        for g in self.stabilizer_generators(l) {
            op.merge_perm(g.as_slice());
        }
    }

    /// Produce a chain for the same group whose base is extended so that `b`
    /// is the level-`level` base point. The receiver is untouched; callers
    /// swap the new chain in on success.
    pub fn insert_base_point(&self, level: usize, b: usize) -> Result<StabilizerChain, GroupError> {
        debug_assert!(level <= self.levels.len());
        let mut prefix: Vec<usize> = self.levels[..level].iter().map(|lv| lv.base).collect();
        prefix.push(b);
        let gens = self.gens.iter().map(|sg| sg.perm.clone()).collect();
        Self::with_base_prefix(self.degree, gens, &prefix)
    }

    fn push_level(&mut self, b: usize) -> Result<(), GroupError> {
        let mut parent = try_vec(self.degree, -1i64)?;
        let edge = try_vec(self.degree, 0usize)?;
        parent[b] = b as i64;
        self.levels.push(Level {
            base: b,
            parent,
            edge,
        });
        Ok(())
    }

    /// Insert a generator at the deepest level whose base prefix it fixes,
    /// extending the base when it fixes every existing base point. A
    /// generator already in the strong set is dropped.
    fn insert_generator(&mut self, g: Permutation) -> Result<(), GroupError> {
        if g.is_identity() {
            return Ok(());
        }
        if !self.seen.insert(g.as_slice().to_vec()) {
            return Ok(());
        }
        let mut j = 0;
        while j < self.levels.len() && g.apply(self.levels[j].base) == self.levels[j].base {
            j += 1;
        }
        if j == self.levels.len() {
            let b = (0..self.degree)
                .find(|&i| g.apply(i) != i)
                .expect("non-identity generator moves a point");
            self.push_level(b)?;
        }
        let inv = g.inverse();
        self.gens.push(StrongGen {
            perm: g,
            inv,
            level: j,
        });
        for l in 0..=j {
            self.rebuild_tree(l);
        }
        Ok(())
    }

    /// Recompute the level-`l` Schreier tree by breadth-first search over the
    /// generators of levels `>= l`.
    fn rebuild_tree(&mut self, l: usize) {
        let base = self.levels[l].base;
        let mut parent = vec![-1i64; self.degree];
        let mut edge = vec![0usize; self.degree];
        parent[base] = base as i64;
        let mut queue = VecDeque::with_capacity(self.degree);
        queue.push_back(base);
        while let Some(p) = queue.pop_front() {
            for (gi, sg) in self.gens.iter().enumerate() {
                if sg.level < l {
                    continue;
                }
                let q = sg.perm.apply(p);
                if parent[q] == -1 {
                    parent[q] = p as i64;
                    edge[q] = gi;
                    queue.push_back(q);
                }
            }
        }
        self.levels[l].parent = parent;
        self.levels[l].edge = edge;
    }

    /// Schreier–Sims closure: verify from the deepest level up that every
    /// Schreier generator sifts to the identity, inserting residues until
    /// the strong generating property holds.
    fn close(&mut self) -> Result<(), GroupError> {
        if self.levels.is_empty() {
            return Ok(());
        }
        let mut l = self.levels.len() - 1;
        'verify: loop {
            let orbit: Vec<usize> = (0..self.degree)
                .filter(|&p| self.levels[l].parent[p] != -1)
                .collect();
            for &p in &orbit {
                let up = self.transversal(l, p);
                for gi in 0..self.gens.len() {
                    if self.gens[gi].level < l {
                        continue;
                    }
                    let gp = self.gens[gi].perm.apply(p);
                    // Schreier generator u_{g(p)}⁻¹ ∘ g ∘ u_p
                    let mut s: Vec<usize> = up
                        .as_slice()
                        .iter()
                        .map(|&x| self.gens[gi].perm.apply(x))
                        .collect();
                    self.apply_transversal_inverse(l, gp, &mut s);
                    if s.iter().enumerate().all(|(i, &x)| i == x) {
                        continue;
                    }
                    let stuck = self.sift_map(l + 1, &mut s);
                    if s.iter().enumerate().all(|(i, &x)| i == x) {
                        continue;
                    }
                    let residue = Permutation::from_map(s)?;
                    self.insert_generator(residue)?;
                    l = match stuck {
                        Some(m) => m,
                        None => self.levels.len() - 1,
                    };
                    continue 'verify;
                }
            }
            if l == 0 {
                break;
            }
            l -= 1;
        }
        Ok(())
    }
}
