//! End-to-end double-coset search tests
//!
//! Exercises the engine through the list client: coset equality literals,
//! right-coset bucketing over S_4, and the quantified search properties.

use permsearch_core::*;

/// All permutations of `0..n`, in lexicographic order.
fn all_perms(n: usize) -> Vec<Vec<usize>> {
    fn rec(prefix: &mut Vec<usize>, used: &mut Vec<bool>, out: &mut Vec<Vec<usize>>) {
        let n = used.len();
        if prefix.len() == n {
            out.push(prefix.clone());
            return;
        }
        for p in 0..n {
            if !used[p] {
                used[p] = true;
                prefix.push(p);
                rec(prefix, used, out);
                prefix.pop();
                used[p] = false;
            }
        }
    }
    let mut out = Vec::new();
    rec(&mut Vec::new(), &mut vec![false; n], &mut out);
    out
}

/// Bucket the elements of S_4 into classes under coset equality and count
/// the classes.
fn count_coset_classes(gens: &[Vec<usize>]) -> usize {
    let perms = all_perms(4);
    let mut representatives: Vec<Vec<usize>> = Vec::new();
    for perm in perms {
        let known = representatives
            .iter()
            .any(|rep| coset_eq(rep, &perm, gens).unwrap().is_some());
        if !known {
            representatives.push(perm);
        }
    }
    representatives.len()
}

#[test]
fn test_cyclic_coset_literal() {
    let gamma = coset_eq(
        &[0, 1, 2, 3, 4, 5],
        &[1, 2, 3, 4, 5, 0],
        &[vec![1, 2, 3, 4, 5, 0]],
    )
    .unwrap()
    .unwrap();
    assert_eq!(gamma.as_slice(), &[5, 0, 1, 2, 3, 4]);
}

#[test]
fn test_coset_representatives_four_cycle() {
    // <(0 1 2 3)> has order 4: 24 / 4 = 6 right cosets
    assert_eq!(count_coset_classes(&[vec![1, 2, 3, 0]]), 6);
}

#[test]
fn test_coset_representatives_two_transpositions() {
    // <(0 1), (2 3)> has order 4
    assert_eq!(
        count_coset_classes(&[vec![1, 0, 2, 3], vec![0, 1, 3, 2]]),
        6
    );
}

#[test]
fn test_coset_representatives_three_cycle() {
    // <(0 1 2)> has order 3: 24 / 3 = 8 right cosets
    assert_eq!(count_coset_classes(&[vec![1, 2, 0, 3]]), 8);
}

#[test]
fn test_degree_zero_is_never_isomorphic() {
    assert!(coset_eq(&[], &[], &[]).unwrap().is_none());

    let partition = PartitionStack::unit(0);
    let result = double_coset(
        &mut ListRefiner,
        &Vec::new(),
        &Vec::new(),
        &partition,
        None,
        None,
    )
    .unwrap();
    assert!(result.is_none());
}

#[test]
fn test_non_isomorphic_lists() {
    // no relabeling turns [0, 1, 2] into [0, 1, 3]
    let s1: Vec<i64> = vec![0, 1, 2];
    let s2: Vec<i64> = vec![0, 1, 3];
    let partition = PartitionStack::unit(3);
    let result = double_coset(&mut ListRefiner, &s1, &s2, &partition, None, None).unwrap();
    assert!(result.is_none());
}

#[test]
fn test_reflexivity() {
    // any structure is isomorphic to itself under the full symmetric group,
    // and the returned map respects the values
    for s in [vec![1i64, 1, 2, 2, 3], vec![7i64, 7, 7, 7, 7], vec![1i64, 2, 3, 4, 5]] {
        let partition = PartitionStack::unit(s.len());
        let isom = double_coset(&mut ListRefiner, &s, &s, &partition, None, None)
            .unwrap()
            .expect("structure must match itself");
        for i in 0..s.len() {
            assert_eq!(s[isom.apply(i)], s[i]);
        }
    }
}

#[test]
fn test_symmetry() {
    let s1: Vec<i64> = vec![4, 4, 1, 3, 1];
    let s2: Vec<i64> = vec![1, 3, 4, 1, 4];
    let partition = PartitionStack::unit(5);

    let fwd = double_coset(&mut ListRefiner, &s1, &s2, &partition, None, None)
        .unwrap()
        .expect("forward direction");
    let bwd = double_coset(&mut ListRefiner, &s2, &s1, &partition, None, None)
        .unwrap()
        .expect("backward direction");

    for i in 0..5 {
        assert_eq!(s1[fwd.apply(i)], s2[i]);
        assert_eq!(s2[bwd.apply(i)], s1[i]);
    }
}

#[test]
fn test_subgroup_monotonicity() {
    // success under H = <(0..5 cycle)> must survive enlarging to G ⊇ H
    let perm1 = [0, 1, 2, 3, 4, 5];
    let perm2 = [1, 2, 3, 4, 5, 0];
    let h_gens = vec![vec![1, 2, 3, 4, 5, 0]];
    let g_gens = vec![vec![1, 2, 3, 4, 5, 0], vec![1, 0, 2, 3, 4, 5]];

    assert!(coset_eq(&perm1, &perm2, &h_gens).unwrap().is_some());
    assert!(coset_eq(&perm1, &perm2, &g_gens).unwrap().is_some());
}

#[test]
fn test_trivial_group_forces_identity_ordering() {
    let s: Vec<i64> = vec![10, 20, 30, 40];
    let partition = PartitionStack::unit(4);
    let trivial = StabilizerChain::trivial(4);

    let with_identity = double_coset(
        &mut ListRefiner,
        &s,
        &s,
        &partition,
        None,
        Some(&trivial),
    )
    .unwrap();
    assert!(with_identity.expect("identity ordering matches").is_identity());

    let swapped: Vec<usize> = vec![1, 0, 2, 3];
    let with_swap = double_coset(
        &mut ListRefiner,
        &s,
        &s,
        &partition,
        Some(swapped.as_slice()),
        Some(&trivial),
    )
    .unwrap();
    assert!(with_swap.is_none());
}

#[test]
fn test_initial_partition_constrains_the_search() {
    // matching within cells {0,1} and {2,3} only
    let partition = PartitionStack::from_cells(&[vec![0, 1], vec![2, 3]]);

    let s1: Vec<i64> = vec![5, 6, 7, 8];
    let s2: Vec<i64> = vec![6, 5, 8, 7];
    let isom = double_coset(&mut ListRefiner, &s1, &s2, &partition, None, None)
        .unwrap()
        .expect("cell-respecting relabeling exists");
    assert_eq!(isom.as_slice(), &[1, 0, 3, 2]);

    // values would have to cross the cell boundary: no match
    let s3: Vec<i64> = vec![8, 7, 6, 5];
    let result = double_coset(&mut ListRefiner, &s1, &s3, &partition, None, None).unwrap();
    assert!(result.is_none());
}

#[test]
fn test_automorphisms_prune_and_search_succeeds() {
    let s1: Vec<i64> = vec![0, 0, 1, 1];
    let s2: Vec<i64> = vec![1, 1, 0, 0];
    let partition = PartitionStack::unit(4);

    let mut solver = CosetSolver::new();
    let isom = solver
        .solve(&mut ListRefiner, &s1, &s2, &partition, None, None)
        .unwrap()
        .expect("blocks can be swapped");
    for i in 0..4 {
        assert_eq!(s1[isom.apply(i)], s2[i]);
    }
    // on the way there the engine sees automorphisms of S2 and keeps them
    let stats = solver.stats();
    assert!(stats.automorphisms_recorded >= 1);
    assert!(stats.leaves_compared >= 2);
}

#[test]
fn test_solver_reuse_across_calls() {
    let partition = PartitionStack::unit(4);
    let mut solver = CosetSolver::new();

    let s1: Vec<i64> = vec![3, 1, 2, 0];
    let s2: Vec<i64> = vec![0, 2, 1, 3];
    let first = solver
        .solve(&mut ListRefiner, &s1, &s2, &partition, None, None)
        .unwrap();
    assert!(first.is_some());

    // a second, unrelated query on the same solver
    let s3: Vec<i64> = vec![1, 1, 1, 2];
    let s4: Vec<i64> = vec![2, 2, 2, 1];
    let second = solver
        .solve(&mut ListRefiner, &s3, &s4, &partition, None, None)
        .unwrap();
    assert!(second.is_none());
}

#[test]
fn test_subgroup_search_respects_membership() {
    // S1 and S2 are relabelings of one another, but only through a
    // permutation outside the allowed group
    let s1: Vec<i64> = vec![9, 1, 1, 1];
    let s2: Vec<i64> = vec![1, 9, 1, 1];
    let partition = PartitionStack::unit(4);

    // (2 3) cannot move the 9 from position 0 to position 1
    let gens = vec![Permutation::from_map(vec![0, 1, 3, 2]).unwrap()];
    let group = StabilizerChain::from_generators(4, gens).unwrap();
    let result =
        double_coset(&mut ListRefiner, &s1, &s2, &partition, None, Some(&group)).unwrap();
    assert!(result.is_none());

    // adding (0 1) makes it possible
    let gens = vec![
        Permutation::from_map(vec![0, 1, 3, 2]).unwrap(),
        Permutation::from_map(vec![1, 0, 2, 3]).unwrap(),
    ];
    let group = StabilizerChain::from_generators(4, gens).unwrap();
    let isom = double_coset(&mut ListRefiner, &s1, &s2, &partition, None, Some(&group))
        .unwrap()
        .expect("the transposition carries S1 onto S2");
    assert!(group.contains(isom.as_slice()));
    for i in 0..4 {
        assert_eq!(s1[isom.apply(i)], s2[i]);
    }
}

#[test]
fn test_stats_serialize() {
    let partition = PartitionStack::unit(3);
    let s: Vec<i64> = vec![1, 2, 3];
    let mut solver = CosetSolver::new();
    solver
        .solve(&mut ListRefiner, &s, &s, &partition, None, None)
        .unwrap();

    let json = serde_json::to_string(&solver.stats()).unwrap();
    let back: CosetStats = serde_json::from_str(&json).unwrap();
    assert_eq!(back, solver.stats());
}

#[test]
fn test_full_group_agrees_with_explicit_symmetric_group() {
    // the sentinel "full symmetric group" and an explicit S_4 chain must
    // answer alike
    let s1: Vec<i64> = vec![2, 0, 0, 1];
    let s2: Vec<i64> = vec![0, 1, 2, 0];
    let partition = PartitionStack::unit(4);

    let sym4 = StabilizerChain::from_generators(
        4,
        vec![
            Permutation::from_map(vec![1, 0, 2, 3]).unwrap(),
            Permutation::from_map(vec![1, 2, 3, 0]).unwrap(),
        ],
    )
    .unwrap();

    let free = double_coset(&mut ListRefiner, &s1, &s2, &partition, None, None).unwrap();
    let chained =
        double_coset(&mut ListRefiner, &s1, &s2, &partition, None, Some(&sym4)).unwrap();
    assert_eq!(free.is_some(), chained.is_some());
    assert!(free.is_some());
}
