//! permsearch core
//!
//! Double-coset / isomorphism search over combinatorial structures with a
//! symmetric-group action, in the individualization-refinement style of
//! McKay and Leon. Given structures `S1`, `S2` of common degree and a group
//! `G ≤ S_n`, the engine decides whether some `γ ∈ G` carries `S1` onto `S2`
//! under a client-supplied equality, and returns one such `γ`.

pub mod bits; // point subsets as bit vectors
pub mod group; // stabilizer chains (Schreier-Sims)
pub mod lists; // integer-list client and coset equality
pub mod partition; // ordered partition stacks
pub mod perm; // permutations and orbit partitions
pub mod search; // the double-coset search engine

pub use bits::PointSet;
pub use group::{GroupError, StabilizerChain};
pub use lists::{coset_eq, ListRefiner};
pub use partition::PartitionStack;
pub use perm::{OrbitPartition, Permutation, PermutationError};
pub use search::{double_coset, CosetError, CosetSolver, CosetStats, Refiner};
