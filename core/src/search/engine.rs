//! Double-coset search engine
//!
//! Decides, for structures `S1` and `S2` of common degree `n` and a group
//! `G ≤ S_n`, whether some `γ ∈ G` carries `S1` onto `S2` under the client's
//! equality, returning one such `γ` when it exists.
//!
//! The search is an individualization/refinement tree walk in the style of
//! McKay and Leon. A *left* partition stack over `S1` is refined once down to
//! a discrete partition, choosing the minimum of the earliest non-singleton
//! cell at every depth; the *current* stack over `S2` then explores matching
//! branches. Candidate branches must reproduce the left stack's refinement
//! invariants and cell structure depth for depth. Discovered automorphisms of
//! `S2` prune sibling branches through cycle-representative sets and an
//! orbit partition; in subgroup mode the walk is additionally intersected
//! with the orbits of a stabilizer chain whose base is grown to follow the
//! left stack's splitting points.

use crate::bits::PointSet;
use crate::group::{GroupError, StabilizerChain};
use crate::partition::PartitionStack;
use crate::perm::{OrbitPartition, Permutation};
use crate::search::pruner::AutomorphismPruner;
use crate::search::refine::{
    refine_at_root, split_point_and_refine, split_point_and_refine_by_orbits, Refiner,
};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use thiserror::Error;

/// Errors surfaced by the search engine.
///
/// These are fatal conditions only; "not isomorphic" is a normal answer and
/// comes back as `Ok(None)`.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CosetError {
    #[error("workspace allocation failed")]
    Allocation,

    #[error(transparent)]
    Group(#[from] GroupError),
}

/// Counters describing one search run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CosetStats {
    /// Tree nodes individualized on the right-hand stack.
    pub nodes_visited: usize,
    /// Discrete leaves compared against the left stack or the first leaf.
    pub leaves_compared: usize,
    /// Automorphisms recorded for pruning.
    pub automorphisms_recorded: usize,
}

/// Reusable buffers for the search; sized once per degree and reset between
/// calls instead of reallocated.
struct Workspace {
    n: usize,
    left_ps: PartitionStack,
    current_ps: PartitionStack,
    first_ps: PartitionStack,
    /// Per-depth refinement invariant of the left stack.
    indicators: Vec<i64>,
    /// Per-depth candidate sets for individualization.
    vts: Vec<PointSet>,
    /// Point individualized at each depth of the current branch.
    determined: Vec<usize>,
    /// Depths whose candidate set has been intersected with the pruner.
    reduced: PointSet,
    pruner: AutomorphismPruner,
    /// Orbits of the automorphism subgroup discovered so far.
    orbits_sub: OrbitPartition,
    orbit_scratch: OrbitPartition,
    /// Row-major `(n+1) x n`; row `d` is the inverse of the group element
    /// aligning the chain base with the points individualized at depths `< d`.
    perm_stack: Vec<usize>,
    cells: Vec<usize>,
    gamma: Vec<usize>,
    id_perm: Vec<usize>,
    ordering: Vec<usize>,
    fp_scratch: PointSet,
    mcr_scratch: PointSet,
}

impl Workspace {
    fn new(n: usize) -> Result<Self, CosetError> {
        let mut perm_stack = Vec::new();
        perm_stack
            .try_reserve_exact((n + 1) * n)
            .map_err(|_| CosetError::Allocation)?;
        perm_stack.resize((n + 1) * n, 0);
        Ok(Self {
            n,
            left_ps: PartitionStack::unit(n),
            current_ps: PartitionStack::unit(n),
            first_ps: PartitionStack::unit(n),
            indicators: vec![0; n + 1],
            vts: (0..=n).map(|_| PointSet::new(n)).collect(),
            determined: vec![0; n + 1],
            reduced: PointSet::new(n + 1),
            pruner: AutomorphismPruner::new(n),
            orbits_sub: OrbitPartition::new(n),
            orbit_scratch: OrbitPartition::new(n),
            perm_stack,
            cells: Vec::with_capacity(n),
            gamma: vec![0; n],
            id_perm: (0..n).collect(),
            ordering: (0..n).collect(),
            fp_scratch: PointSet::new(n),
            mcr_scratch: PointSet::new(n),
        })
    }

    fn reset(&mut self) {
        self.orbits_sub.clear();
        self.reduced.clear();
        self.pruner.clear();
    }
}

enum FirstLeaf {
    /// The first matching leaf is already a valid isomorphism.
    Isomorphic,
    /// A first leaf was found and snapshot; the main loop takes over.
    Entered,
    /// No branch of the current stack matches the left stack.
    Exhausted,
}

enum Outcome {
    Isomorphic,
    NotIsomorphic,
}

/// Double-coset solver with a reusable workspace.
///
/// A solver may be used for any number of calls; buffers are kept between
/// calls of the same degree and only the search flags are reset.
pub struct CosetSolver {
    workspace: Option<Workspace>,
    stats: CosetStats,
}

impl Default for CosetSolver {
    fn default() -> Self {
        Self::new()
    }
}

impl CosetSolver {
    pub fn new() -> Self {
        Self {
            workspace: None,
            stats: CosetStats::default(),
        }
    }

    /// Counters from the most recent call.
    pub fn stats(&self) -> CosetStats {
        self.stats
    }

    /// Decide whether some `γ` in the given group carries `S1` onto `S2`.
    ///
    /// - `partition1` is the starting partition over `S1`, at depth 0 with
    ///   the mins-first invariant.
    /// - `ordering2`, when present, gives the initial ordering of `S2`'s
    ///   points; identity otherwise.
    /// - `group` is the stabilizer chain to intersect the search with;
    ///   `None` means the full symmetric group.
    ///
    /// Returns `Ok(Some(γ))` with `γ[left point] = right point` on success,
    /// `Ok(None)` if no such `γ` exists (always the case for `n == 0`), and
    /// `Err` only for allocation failures.
    pub fn solve<R: Refiner>(
        &mut self,
        refiner: &mut R,
        s1: &R::Structure,
        s2: &R::Structure,
        partition1: &PartitionStack,
        ordering2: Option<&[usize]>,
        group: Option<&StabilizerChain>,
    ) -> Result<Option<Permutation>, CosetError> {
        self.stats = CosetStats::default();
        let n = partition1.degree();
        if n == 0 {
            return Ok(None);
        }
        if let Some(g) = group {
            if g.degree() != n {
                return Err(CosetError::Group(GroupError::DegreeMismatch {
                    expected: n,
                    found: g.degree(),
                }));
            }
        }
        debug_assert!(partition1.depth == 0);
        debug_assert!(ordering2.map_or(true, |o| o.len() == n));

        match &mut self.workspace {
            Some(ws) if ws.n == n => ws.reset(),
            slot => *slot = Some(Workspace::new(n)?),
        }
        let Some(ws) = self.workspace.as_mut() else {
            return Err(CosetError::Allocation);
        };

        // Phase 0 — set up both stacks and refine at the root.
        ws.left_ps.copy_from(partition1);
        ws.current_ps.depth = 0;
        ws.current_ps.levels.copy_from_slice(&partition1.levels);
        for i in 0..n {
            let image = ordering2.map_or(i, |o| o[i]);
            ws.current_ps.entries[i] = image;
            ws.ordering[i] = image;
        }
        let mut chain: Option<StabilizerChain> = group.cloned();
        if chain.is_some() {
            for d in 0..=n {
                for i in 0..n {
                    ws.perm_stack[d * n + i] = i;
                }
            }
        }

        let inv_left = refine_at_root(&mut ws.left_ps, s1, refiner, &mut ws.cells);
        ws.indicators[0] = inv_left;
        let inv_right = refine_at_root(&mut ws.current_ps, s2, refiner, &mut ws.cells);
        if inv_left != inv_right || !ws.left_ps.equivalent(&ws.current_ps) {
            return Ok(None);
        }
        // The children-equivalence frontier starts at the root; the client
        // hint moves it deeper from the first individualization on.
        let ckas = 0;

        // Phase 1 — refine the left stack down to a discrete partition,
        // growing the chain base along the splitting points in subgroup mode.
        while !ws.left_ps.is_discrete() {
            let d = ws.left_ps.depth;
            let k = ws.left_ps.first_smallest(&mut ws.vts[d]);
            let inv = match &mut chain {
                Some(ch) => {
                    ch.orbits_from_level(d, &mut ws.orbit_scratch);
                    let b = ws.orbit_scratch.mcr(ws.perm_stack[d * n + k]);
                    if ch.base(d) != Some(b) {
                        *ch = ch.insert_base_point(d, b)?;
                    }
                    split_point_and_refine_by_orbits(
                        &mut ws.left_ps,
                        k,
                        s1,
                        refiner,
                        &mut ws.cells,
                        ch,
                        d + 1,
                        &ws.perm_stack[(d + 1) * n..(d + 2) * n],
                        &mut ws.orbit_scratch,
                    )
                }
                None => split_point_and_refine(&mut ws.left_ps, k, s1, refiner, &mut ws.cells),
            };
            ws.indicators[ws.left_ps.depth] = inv;
        }
        let max_depth = ws.left_ps.depth;

        // Phases 2 and 3 — walk the current stack.
        let mut stats = CosetStats::default();
        let Workspace {
            left_ps,
            current_ps,
            first_ps,
            indicators,
            vts,
            determined,
            reduced,
            pruner,
            orbits_sub,
            orbit_scratch,
            perm_stack,
            cells,
            gamma,
            id_perm,
            ordering,
            fp_scratch,
            mcr_scratch,
            ..
        } = ws;
        let mut search = Search {
            refiner,
            s1,
            s2,
            chain: chain.as_ref(),
            n,
            max_depth,
            left_ps,
            current_ps,
            first_ps,
            indicators,
            vts,
            determined,
            reduced,
            pruner,
            orbits_sub,
            orbit_scratch,
            perm_stack,
            cells,
            gamma,
            id_perm,
            ordering,
            fp_scratch,
            mcr_scratch,
            stats: &mut stats,
            fmc: max_depth,
            fkas: max_depth,
            ckas,
            mipo: 0,
            spos: 0,
        };
        let outcome = search.run();
        let isom_map = match outcome {
            Outcome::Isomorphic => Some(search.gamma.to_vec()),
            Outcome::NotIsomorphic => None,
        };
        self.stats = stats;
        match isom_map {
            Some(map) => {
                let isom =
                    Permutation::from_map(map).expect("discrete stacks yield a permutation");
                Ok(Some(isom))
            }
            None => Ok(None),
        }
    }
}

/// One-shot convenience wrapper around [`CosetSolver`].
pub fn double_coset<R: Refiner>(
    refiner: &mut R,
    s1: &R::Structure,
    s2: &R::Structure,
    partition1: &PartitionStack,
    ordering2: Option<&[usize]>,
    group: Option<&StabilizerChain>,
) -> Result<Option<Permutation>, CosetError> {
    CosetSolver::new().solve(refiner, s1, s2, partition1, ordering2, group)
}

/// Borrowed view of one running search.
struct Search<'a, R: Refiner> {
    refiner: &'a mut R,
    s1: &'a R::Structure,
    s2: &'a R::Structure,
    chain: Option<&'a StabilizerChain>,
    n: usize,
    max_depth: usize,
    left_ps: &'a mut PartitionStack,
    current_ps: &'a mut PartitionStack,
    first_ps: &'a mut PartitionStack,
    indicators: &'a [i64],
    vts: &'a mut [PointSet],
    determined: &'a mut [usize],
    reduced: &'a mut PointSet,
    pruner: &'a mut AutomorphismPruner,
    orbits_sub: &'a mut OrbitPartition,
    orbit_scratch: &'a mut OrbitPartition,
    perm_stack: &'a mut [usize],
    cells: &'a mut Vec<usize>,
    gamma: &'a mut [usize],
    id_perm: &'a [usize],
    ordering: &'a [usize],
    fp_scratch: &'a mut PointSet,
    mcr_scratch: &'a mut PointSet,
    stats: &'a mut CosetStats,
    /// Highest depth at which the current stack still agrees with the first
    /// leaf's path.
    fmc: usize,
    /// Depth above which all children along the first leaf's path are known
    /// equivalent.
    fkas: usize,
    /// Depth above which all children of the current branch are known
    /// equivalent.
    ckas: usize,
    /// Minimal candidate of the primary orbit at the meet node.
    mipo: usize,
    /// Visited siblings lying in the primary orbit at the meet node.
    spos: usize,
}

impl<R: Refiner> Search<'_, R> {
    fn run(&mut self) -> Outcome {
        match self.find_first_leaf() {
            FirstLeaf::Exhausted => Outcome::NotIsomorphic,
            FirstLeaf::Isomorphic => Outcome::Isomorphic,
            FirstLeaf::Entered => {
                if self.max_depth == 0 {
                    // the only leaf was just rejected
                    Outcome::NotIsomorphic
                } else {
                    self.current_ps.depth = self.max_depth - 1;
                    self.main_loop()
                }
            }
        }
    }

    /// Subgroup reachability filter: `p` can be individualized at depth `d`
    /// only if its chain-coordinate image lies in the level-`d` orbit.
    fn viable(&self, d: usize, p: usize) -> bool {
        match self.chain {
            Some(c) => c.in_orbit(d, self.perm_stack[d * self.n + p]),
            None => true,
        }
    }

    /// First viable candidate at depth `d` that is `>= from`.
    fn next_candidate(&self, d: usize, from: usize) -> Option<usize> {
        let mut cand = self.vts[d].next_at(from);
        while let Some(p) = cand {
            if self.viable(d, p) {
                return Some(p);
            }
            cand = self.vts[d].next_after(p);
        }
        None
    }

    /// Enter the current (fresh, non-discrete) depth: write the candidate
    /// cell and return its first viable candidate.
    fn enter_depth(&mut self) -> Option<usize> {
        let d = self.current_ps.depth;
        let min = self.current_ps.first_smallest(&mut self.vts[d]);
        self.reduced.remove(d);
        self.next_candidate(d, min)
    }

    /// Step up from depth `d`, advancing past the decided point at each
    /// ancestor. Used before any leaf exists; the main loop backtracks
    /// through its own choice step instead.
    fn retreat(&mut self, mut d: usize) -> Option<usize> {
        loop {
            if d == 0 {
                return None;
            }
            d -= 1;
            self.current_ps.depth = d;
            if let Some(p) = self.next_candidate(d, self.determined[d] + 1) {
                return Some(p);
            }
        }
    }

    /// Individualize `p` at the current depth and refine, returning the
    /// client invariant.
    fn individualize(&mut self, p: usize) -> i64 {
        let d = self.current_ps.depth;
        self.determined[d] = p;
        self.stats.nodes_visited += 1;
        match self.chain {
            Some(chain) => {
                let n = self.n;
                let q = self.perm_stack[d * n + p];
                self.perm_stack.copy_within(d * n..(d + 1) * n, (d + 1) * n);
                chain.apply_transversal_inverse(
                    d,
                    q,
                    &mut self.perm_stack[(d + 1) * n..(d + 2) * n],
                );
                split_point_and_refine_by_orbits(
                    self.current_ps,
                    p,
                    self.s2,
                    self.refiner,
                    self.cells,
                    chain,
                    d + 1,
                    &self.perm_stack[(d + 1) * n..(d + 2) * n],
                    self.orbit_scratch,
                )
            }
            None => {
                split_point_and_refine(self.current_ps, p, self.s2, self.refiner, self.cells)
            }
        }
    }

    /// Compare the just-refined level against the left stack; on success,
    /// update the children-equivalence frontier.
    fn step_matches(&mut self, invariant: i64) -> bool {
        let dd = self.current_ps.depth;
        if invariant != self.indicators[dd] {
            return false;
        }
        self.left_ps.depth = dd;
        if !self.left_ps.equivalent(self.current_ps) {
            return false;
        }
        if !self.refiner.all_children_equivalent(self.current_ps, self.s2) {
            self.ckas = dd;
        }
        true
    }

    fn in_group(&self, gamma: &[usize]) -> bool {
        self.chain.map_or(true, |c| c.contains(gamma))
    }

    /// Phase 2: descend the current stack to the first leaf whose path
    /// matches the left stack, snapshot it, and test it for an isomorphism.
    fn find_first_leaf(&mut self) -> FirstLeaf {
        if !self.current_ps.is_discrete() {
            let mut pick = self.enter_depth();
            loop {
                let d = self.current_ps.depth;
                let p = match pick {
                    Some(p) => p,
                    None => match self.retreat(d) {
                        Some(p) => {
                            pick = Some(p);
                            continue;
                        }
                        None => return FirstLeaf::Exhausted,
                    },
                };
                let inv = self.individualize(p);
                if self.step_matches(inv) {
                    if self.current_ps.is_discrete() {
                        break;
                    }
                    pick = self.enter_depth();
                } else {
                    self.current_ps.depth = d;
                    pick = self.next_candidate(d, p + 1);
                }
            }
        }
        self.stats.leaves_compared += 1;
        self.first_ps.copy_from(self.current_ps);
        self.fmc = self.current_ps.depth;
        self.fkas = self.current_ps.depth;
        self.left_ps.depth = self.max_depth;
        self.left_ps.get_perm_from(self.current_ps, self.gamma);
        if self
            .refiner
            .compare(self.gamma, self.ordering, self.s1, self.s2)
            == Ordering::Equal
            && self.in_group(self.gamma)
        {
            return FirstLeaf::Isomorphic;
        }
        FirstLeaf::Entered
    }

    /// Phase 3: explore the remaining branches.
    fn main_loop(&mut self) -> Outcome {
        loop {
            let d = self.current_ps.depth;

            // I. Choose the next vertex to split at this depth.
            let p = if d > self.fmc {
                // off the first leaf's path: prune by recorded generators
                if !self.reduced.contains(d) {
                    self.pruner.reduce(&mut self.vts[d], &self.determined[..d]);
                    self.reduced.insert(d);
                }
                match self.next_candidate(d, self.determined[d] + 1) {
                    Some(p) => p,
                    None => {
                        if d == 0 {
                            return Outcome::NotIsomorphic;
                        }
                        self.current_ps.depth = d - 1;
                        continue;
                    }
                }
            } else {
                // walking along the first leaf's path: primary-orbit
                // accounting
                if d < self.fmc {
                    self.fmc = d;
                    self.mipo = self.vts[d].first().unwrap_or(self.determined[d]);
                    self.spos = 0;
                } else if self
                    .orbits_sub
                    .same_class(self.determined[d], self.mipo)
                {
                    self.spos += 1;
                }
                // only minimal orbit representatives are worth trying here
                let mut cand = self.next_candidate(d, self.determined[d] + 1);
                while let Some(p) = cand {
                    if self.orbits_sub.mcr(p) == p {
                        break;
                    }
                    cand = self.next_candidate(d, p + 1);
                }
                match cand {
                    Some(p) => p,
                    None => {
                        // sound only when every tried sibling lay in the
                        // primary orbit
                        if self.vts[d].count() == self.spos && self.fkas == d + 1 {
                            self.fkas = d;
                        }
                        self.spos = 0;
                        if d == 0 {
                            return Outcome::NotIsomorphic;
                        }
                        self.current_ps.depth = d - 1;
                        continue;
                    }
                }
            };

            // II. Descend until discrete or pruned.
            let mut pick = Some(p);
            let reached_leaf = loop {
                let dd = self.current_ps.depth;
                let p = match pick {
                    Some(p) => p,
                    None => break false,
                };
                let inv = self.individualize(p);
                if self.step_matches(inv) {
                    if self.current_ps.is_discrete() {
                        break true;
                    }
                    pick = self.enter_depth();
                    if pick.is_none() {
                        // dead fresh node; resume sibling choice one level up
                        self.current_ps.depth -= 1;
                        break false;
                    }
                } else {
                    self.current_ps.depth = dd;
                    pick = self.next_candidate(dd, p + 1);
                    if pick.is_none() {
                        if dd == 0 {
                            return Outcome::NotIsomorphic;
                        }
                        self.current_ps.depth = dd - 1;
                        break false;
                    }
                }
            };
            if !reached_leaf {
                continue;
            }

            // III. Leaf handling.
            self.stats.leaves_compared += 1;
            self.first_ps.get_perm_from(self.current_ps, self.gamma);
            if self
                .refiner
                .compare(self.gamma, self.id_perm, self.s2, self.s2)
                == Ordering::Equal
                && self.in_group(self.gamma)
            {
                // an automorphism of S2: prune with it and rejoin the first
                // leaf's path
                self.stats.automorphisms_recorded += 1;
                self.pruner.record_perm(self.gamma);
                self.orbits_sub.merge_perm(self.gamma);
                self.current_ps.depth = self.fmc;
                continue;
            }
            self.left_ps.depth = self.max_depth;
            self.left_ps.get_perm_from(self.current_ps, self.gamma);
            if self
                .refiner
                .compare(self.gamma, self.ordering, self.s1, self.s2)
                == Ordering::Equal
                && self.in_group(self.gamma)
            {
                return Outcome::Isomorphic;
            }
            // Neither: collapse to the deepest frontier whose children are
            // all known equivalent.
            if self.ckas == 0 {
                return Outcome::NotIsomorphic;
            }
            let leaf_depth = self.current_ps.depth;
            if leaf_depth > self.ckas {
                // more than a plain sibling step collapses; describe the
                // surviving symmetry conservatively and record it
                self.current_ps.depth = self.ckas;
                self.current_ps.fixed_and_mcr(self.fp_scratch, self.mcr_scratch);
                self.pruner.record_sets(self.fp_scratch, self.mcr_scratch);
                let ranges: Vec<(usize, usize)> = self.current_ps.cells().collect();
                for (c, e) in ranges {
                    for i in c..e {
                        let a = self.current_ps.entries[i];
                        let b = self.current_ps.entries[i + 1];
                        self.orbits_sub.union(a, b);
                    }
                }
            }
            self.current_ps.depth = self.ckas - 1;
        }
    }
}
