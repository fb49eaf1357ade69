//! Refinement driver
//!
//! The engine is generic over a client-supplied [`Refiner`] that knows the
//! structures being matched. The driver wraps the client hooks with the
//! individualization step and, in subgroup mode, folds stabilizer orbits into
//! every cell so that cells stay unions of group orbits.

use crate::group::StabilizerChain;
use crate::partition::PartitionStack;
use crate::perm::OrbitPartition;
use std::cmp::Ordering;

/// Client hooks driving refinement and leaf comparison.
///
/// All hooks are invoked from the single engine thread and must be pure with
/// respect to their inputs, except that `refine` may mutate the cell list it
/// is handed.
pub trait Refiner {
    /// The structure type acted on by `S_n`.
    type Structure;

    /// Canonically refine the partition and return an invariant.
    ///
    /// `cells` enumerates the start positions of the cells changed since the
    /// last call; the hook may consume and extend it while it works. The
    /// returned value must be invariant under the diagonal `S_n` action on
    /// structure, partition and cell list.
    fn refine(
        &mut self,
        ps: &mut PartitionStack,
        s: &Self::Structure,
        cells: &mut Vec<usize>,
    ) -> i64;

    /// Total order on the structure class.
    ///
    /// `Equal` means `γ₁⁻¹·S1 = γ₂⁻¹·S2`. The permutations arrive in inverse
    /// form: index through them (`S1[gamma1[i]]` against `S2[gamma2[i]]`)
    /// rather than materializing inverses.
    fn compare(
        &self,
        gamma1: &[usize],
        gamma2: &[usize],
        s1: &Self::Structure,
        s2: &Self::Structure,
    ) -> Ordering;

    /// Hint that every child of the current node leads to an equivalent
    /// subtree. May under-report (always `false` is correct, just slower);
    /// must never over-report.
    fn all_children_equivalent(&mut self, _ps: &PartitionStack, _s: &Self::Structure) -> bool {
        false
    }
}

/// Refine at the root of the search, with every starting cell marked changed.
pub fn refine_at_root<R: Refiner>(
    ps: &mut PartitionStack,
    s: &R::Structure,
    refiner: &mut R,
    cells: &mut Vec<usize>,
) -> i64 {
    cells.clear();
    let starts: Vec<usize> = ps.cells().map(|(c, _)| c).collect();
    cells.extend(starts);
    let invariant = refiner.refine(ps, s, cells);
    ps.move_all_mins_to_front();
    invariant
}

/// Push a depth, individualize `p`, run the client refinement, and restore
/// the mins-first invariant. Returns the client invariant.
pub fn split_point_and_refine<R: Refiner>(
    ps: &mut PartitionStack,
    p: usize,
    s: &R::Structure,
    refiner: &mut R,
    cells: &mut Vec<usize>,
) -> i64 {
    ps.push_level();
    cells.clear();
    let loc = ps.split_point(p);
    cells.push(loc);
    let invariant = refiner.refine(ps, s, cells);
    ps.move_all_mins_to_front();
    invariant
}

/// As [`split_point_and_refine`], then split every cell by the orbits of the
/// stabilizer at `level`, with points translated through `row` into chain
/// coordinates.
///
/// Sub-cells are ordered by ascending orbit root, so equivalent branches on
/// the two stacks split identically.
#[allow(clippy::too_many_arguments)]
pub fn split_point_and_refine_by_orbits<R: Refiner>(
    ps: &mut PartitionStack,
    p: usize,
    s: &R::Structure,
    refiner: &mut R,
    cells: &mut Vec<usize>,
    chain: &StabilizerChain,
    level: usize,
    row: &[usize],
    orbits: &mut OrbitPartition,
) -> i64 {
    let invariant = split_point_and_refine(ps, p, s, refiner, cells);
    chain.orbits_from_level(level, orbits);
    refine_cells_by_orbits(ps, row, orbits);
    ps.move_all_mins_to_front();
    invariant
}

/// Split each cell of the active partition into orbit classes.
fn refine_cells_by_orbits(ps: &mut PartitionStack, row: &[usize], orbits: &mut OrbitPartition) {
    let ranges: Vec<(usize, usize)> = ps.cells().collect();
    let mut scratch: Vec<(usize, usize)> = Vec::new();
    for (c, e) in ranges {
        if e == c {
            continue;
        }
        scratch.clear();
        scratch.extend(
            ps.entries[c..=e]
                .iter()
                .map(|&point| (orbits.find(row[point]), point)),
        );
        if scratch.iter().all(|&(root, _)| root == scratch[0].0) {
            continue;
        }
        // stable: members keep their relative order within each class
        scratch.sort_by_key(|&(root, _)| root);
        for (offset, &(_, point)) in scratch.iter().enumerate() {
            ps.entries[c + offset] = point;
        }
        for offset in 0..scratch.len() - 1 {
            if scratch[offset].0 != scratch[offset + 1].0 {
                ps.set_boundary(c + offset);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::perm::Permutation;

    /// Refiner that never refines; lists compared elementwise.
    struct Inert;

    impl Refiner for Inert {
        type Structure = Vec<i64>;

        fn refine(&mut self, _ps: &mut PartitionStack, _s: &Vec<i64>, _c: &mut Vec<usize>) -> i64 {
            0
        }

        fn compare(&self, g1: &[usize], g2: &[usize], s1: &Vec<i64>, s2: &Vec<i64>) -> Ordering {
            for i in 0..s1.len() {
                match s1[g1[i]].cmp(&s2[g2[i]]) {
                    Ordering::Equal => continue,
                    other => return other,
                }
            }
            Ordering::Equal
        }
    }

    #[test]
    fn test_split_point_and_refine_keeps_mins_first() {
        let mut ps = PartitionStack::unit(5);
        let s = vec![0i64; 5];
        let mut cells = Vec::new();
        let inv = split_point_and_refine(&mut ps, 3, &s, &mut Inert, &mut cells);
        assert_eq!(inv, 0);
        assert_eq!(cells, vec![0]);
        assert_eq!(ps.depth, 1);
        // singleton {3} first, remainder with its minimum in front
        assert_eq!(ps.entries[0], 3);
        assert_eq!(ps.entries[1], 0);
    }

    #[test]
    fn test_orbit_folding_splits_cells() {
        // G = <(0 1)(2 3)> stabilizer at level 0: orbits {0,1} and {2,3}
        let g = Permutation::from_map(vec![1, 0, 3, 2]).unwrap();
        let chain = StabilizerChain::from_generators(4, vec![g]).unwrap();
        let mut orbits = OrbitPartition::new(4);
        let row: Vec<usize> = (0..4).collect();

        let mut ps = PartitionStack::unit(4);
        let s = vec![0i64; 4];
        let mut cells = Vec::new();
        split_point_and_refine_by_orbits(
            &mut ps, 0, &s, &mut Inert, &mut cells, &chain, 0, &row, &mut orbits,
        );

        let got: Vec<Vec<usize>> = ps
            .cells()
            .map(|(c, e)| ps.entries[c..=e].to_vec())
            .collect();
        assert_eq!(got, vec![vec![0], vec![1], vec![2, 3]]);
    }
}
