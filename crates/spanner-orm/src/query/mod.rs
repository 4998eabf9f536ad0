//! Query building types for the ORM.
//!
//! This module provides Q objects for filtering.

mod filter;

pub use filter::{CompareOp, FilterExpr, Q};
