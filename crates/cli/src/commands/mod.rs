//! CLI command implementations.

pub mod categories;
pub mod list;
