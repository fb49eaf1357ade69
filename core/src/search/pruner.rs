//! Automorphism pruner
//!
//! Every automorphism discovered during search is boiled down to two bitsets:
//! its fixed points and the minimal representatives of its cycles. When the
//! engine is about to branch at a node, any recorded generator that fixes all
//! previously individualized points still acts within the branch, so only
//! minimal cycle representatives need to be tried — the candidate set is
//! intersected accordingly.
//!
//! The store is bounded: once `MAX_RECORDED` entries are held, further
//! automorphisms are ignored. Retained entries still describe real
//! symmetries, so pruning stays sound.

use crate::bits::PointSet;

/// Upper bound on recorded generators.
pub const MAX_RECORDED: usize = 100;

/// Fixed-point / minimal-cycle-representative store of discovered generators.
#[derive(Debug, Clone)]
pub struct AutomorphismPruner {
    degree: usize,
    fixed: Vec<PointSet>,
    minima: Vec<PointSet>,
}

impl AutomorphismPruner {
    pub fn new(degree: usize) -> Self {
        Self {
            degree,
            fixed: Vec::new(),
            minima: Vec::new(),
        }
    }

    /// Number of recorded generators.
    pub fn len(&self) -> usize {
        self.fixed.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fixed.is_empty()
    }

    /// Drop every recorded generator, keeping the buffers.
    pub fn clear(&mut self) {
        self.fixed.clear();
        self.minima.clear();
    }

    /// Record a generator given as an image array. No-op once full.
    pub fn record_perm(&mut self, perm: &[usize]) {
        if self.fixed.len() >= MAX_RECORDED {
            return;
        }
        debug_assert_eq!(perm.len(), self.degree);
        let mut fp = PointSet::new(self.degree);
        let mut mcr = PointSet::new(self.degree);
        crate::perm::permutation::fixed_and_cycle_minima_of(perm, &mut fp, &mut mcr);
        self.fixed.push(fp);
        self.minima.push(mcr);
    }

    /// Record a pseudo-generator from precomputed predicate sets. No-op once
    /// full.
    pub fn record_sets(&mut self, fp: &PointSet, mcr: &PointSet) {
        if self.fixed.len() >= MAX_RECORDED {
            return;
        }
        self.fixed.push(fp.clone());
        self.minima.push(mcr.clone());
    }

    /// Intersect `candidates` with the minimal-representative set of every
    /// recorded generator whose fixed points contain all of `individualized`.
    pub fn reduce(&self, candidates: &mut PointSet, individualized: &[usize]) {
        for (fp, mcr) in self.fixed.iter().zip(&self.minima) {
            if individualized.iter().all(|&p| fp.contains(p)) {
                candidates.intersect(mcr);
            }
        }
    }
}
