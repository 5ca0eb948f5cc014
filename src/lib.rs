//! aeroscan - Index scan execution for a deterministic document store
//!
//! Turns a planned index node into a stream of rows: for every outer row it
//! resolves the node's range condition, scans the chosen indexes branch by
//! branch and emits each matching document once.

pub mod condition;
pub mod executor;
pub mod index;
pub mod observability;
pub mod plan;
