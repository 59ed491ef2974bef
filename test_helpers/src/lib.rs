//! Test helpers shared across crates in the workspace.
//!
//! Currently provides RAII guards for mutating process environment
//! variables safely from tests.

pub mod env;
