//! Permutation groups as stabilizer chains

pub mod chain;

pub use chain::{GroupError, StabilizerChain};
