//! Integration tests for schemeflip
//!
//! These tests drive the controller through its public API with mock
//! collaborators, real stores, and the compiled binary.

#[path = "../common/mod.rs"]
pub mod common;

pub mod cli;
pub mod override_flow;
pub mod persistence;
pub mod properties;
