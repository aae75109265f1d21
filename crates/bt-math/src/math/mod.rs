//! Core math modules.

pub mod combine;
pub mod dirichlet;
pub mod stable;
