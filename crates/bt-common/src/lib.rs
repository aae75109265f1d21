//! Bowtie network common types, IDs, and errors.
//!
//! This crate provides foundational types shared across bt-core modules:
//! - Bowtie row records as supplied by the data-loading layer
//! - Node types, state domains, and sanitized node identities
//! - The unified error type and its categories

pub mod error;
pub mod id;
pub mod row;

pub use error::{Error, ErrorCategory, Result};
pub use id::{NodeId, NodeType};
pub use row::{BowtieRow, RiskValue};
