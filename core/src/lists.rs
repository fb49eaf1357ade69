//! Integer lists under the positional `S_n` action
//!
//! The simplest client of the search engine: structures are plain integer
//! lists, permutations act on positions, and comparison is elementwise. No
//! refinement is possible, so every branch survives to a leaf and the engine
//! does all the work. This is the client behind [`coset_eq`], the
//! right-coset equality test.

use crate::group::StabilizerChain;
use crate::partition::PartitionStack;
use crate::perm::Permutation;
use crate::search::engine::{CosetError, CosetSolver};
use crate::search::refine::Refiner;
use std::cmp::Ordering;

/// Refiner for integer lists: no refinement, elementwise total order.
#[derive(Debug, Clone, Copy, Default)]
pub struct ListRefiner;

impl Refiner for ListRefiner {
    type Structure = Vec<i64>;

    fn refine(&mut self, _ps: &mut PartitionStack, _s: &Vec<i64>, _cells: &mut Vec<usize>) -> i64 {
        0
    }

    fn compare(&self, gamma1: &[usize], gamma2: &[usize], s1: &Vec<i64>, s2: &Vec<i64>) -> Ordering {
        for i in 0..s1.len() {
            match s1[gamma1[i]].cmp(&s2[gamma2[i]]) {
                Ordering::Equal => continue,
                other => return other,
            }
        }
        Ordering::Equal
    }
}

/// Decide whether `perm1` and `perm2` lie in the same right coset of the
/// group generated by `gens`, i.e. whether some `γ ∈ ⟨gens⟩` satisfies
/// `perm1[γ⁻¹[i]] = perm2[i]` for all `i`. Returns that `γ` when it exists.
///
/// ```
/// use permsearch_core::lists::coset_eq;
///
/// let gamma = coset_eq(
///     &[0, 1, 2, 3, 4, 5],
///     &[1, 2, 3, 4, 5, 0],
///     &[vec![1, 2, 3, 4, 5, 0]],
/// )
/// .unwrap()
/// .unwrap();
/// assert_eq!(gamma.as_slice(), &[5, 0, 1, 2, 3, 4]);
/// ```
pub fn coset_eq(
    perm1: &[usize],
    perm2: &[usize],
    gens: &[Vec<usize>],
) -> Result<Option<Permutation>, CosetError> {
    let n = perm1.len();
    if n == 0 {
        return Ok(None);
    }
    let s1: Vec<i64> = perm1.iter().map(|&x| x as i64).collect();
    let s2: Vec<i64> = perm2.iter().map(|&x| x as i64).collect();
    let generators = gens
        .iter()
        .map(|g| Permutation::from_map(g.clone()))
        .collect::<Result<Vec<_>, _>>()
        .map_err(crate::group::GroupError::from)?;
    let group = StabilizerChain::from_generators(n, generators)?;
    let partition1 = PartitionStack::unit(n);

    let mut solver = CosetSolver::new();
    let found = solver.solve(&mut ListRefiner, &s1, &s2, &partition1, None, Some(&group))?;
    // the engine pairs points of S1 with points of S2; the coset element
    // multiplying on the left is the inverse pairing
    Ok(found.map(|g| g.inverse()))
}
