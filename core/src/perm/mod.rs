//! Permutations and orbit partitions

pub mod orbit;
pub mod permutation;

pub use orbit::OrbitPartition;
pub use permutation::{fixed_and_cycle_minima_of, Permutation, PermutationError};
