//! # MPC library.
//!
//! This library allows other crates in the workspace, and the benchmarks, to
//! access items defined inside the MPC exec crate.

// ------------------------------------------------------------------------------------------------
// MODULES
// ------------------------------------------------------------------------------------------------

/// Model predictive control module - computes steering and throttle demands to follow a reference
pub mod mpc_ctrl;

/// Simulated vehicle - kinematic plant and line reference for closed-loop runs
pub mod sim;
