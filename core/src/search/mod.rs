//! Search module - individualization/refinement double-coset search

pub mod engine;
pub mod pruner;
pub mod refine;

pub use engine::{double_coset, CosetError, CosetSolver, CosetStats};
pub use pruner::{AutomorphismPruner, MAX_RECORDED};
pub use refine::Refiner;
