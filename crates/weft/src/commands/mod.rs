//! CLI command implementations.

pub(crate) mod check;
pub(crate) mod sections;
pub(crate) mod tree;
