//! Bowtie network math utilities.

pub mod math;

pub use math::combine::*;
pub use math::dirichlet;
pub use math::stable::*;
