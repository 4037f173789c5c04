//! # Model predictive control module
//!
//! MpcCtrl keeps the vehicle on a reference path given as a polynomial fitted
//! in the vehicle's local frame. On every control tick it builds a finite
//! horizon optimisation problem from the current kinematic state and the
//! reference, solves it, and applies only the first step's actuation
//! (receding horizon control).
//!
//! The problem's unknowns are the predicted states at steps 0..N and the
//! actuations at steps 0..N-1, stacked into one decision vector (see
//! [`Layout`]). The predicted states are tied together by the kinematic
//! bicycle model through one equality constraint per state component per
//! step, the first state is pinned to the observed one, and the actuations
//! are boxed by the actuator limits. The cost is a weighted sum of tracking
//! errors, speed error, actuation effort and actuation rate.
//!
//! The solve is delegated to a [`HorizonSolver`] backend, by default PANOC
//! over the actuations with the states obtained by shooting. The previous tick's
//! commands are kept in a [`WarmStart`] cache which seeds the next initial
//! guess.

// ---------------------------------------------------------------------------
// MODULES
// ---------------------------------------------------------------------------

mod constraints;
mod cost;
mod layout;
mod model;
mod params;
mod problem;
mod solver;
mod state;

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// Internal
pub use constraints::*;
pub use cost::*;
pub use layout::*;
pub use model::*;
pub use params::*;
pub use problem::*;
pub use solver::*;
pub use state::*;

// ---------------------------------------------------------------------------
// CONSTANTS
// ---------------------------------------------------------------------------

/// The number of components in the vehicle state, {x, y, psi, v, cte, epsi}.
pub const STATE_DIM: usize = 6;

/// The number of components in one actuation, {steering, acceleration}.
pub const ACT_DIM: usize = 2;

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// Possible errors that can occur during MpcCtrl operation.
#[derive(Debug, thiserror::Error)]
pub enum MpcCtrlError {
    /// The state or coefficient vector was malformed. The solver was not
    /// invoked.
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// The solver exhausted its iteration budget without meeting its
    /// tolerances.
    #[error(
        "Solver did not converge after {iterations} iterations (max dynamics residual \
        {max_residual:.3e})"
    )]
    NonConvergence {
        iterations: usize,
        max_residual: f64
    },

    /// Non-finite values appeared while propagating the model or evaluating
    /// the cost and constraints.
    #[error("Non-finite value encountered while evaluating the horizon problem")]
    NumericOverflow,

    #[error("Invalid parameters: {0}")]
    InvalidParams(String),

    #[error("Could not load parameters: {0}")]
    ParamLoadError(util::params::LoadError),
}

impl MpcCtrlError {
    /// True if the error means the solve did not produce a usable solution,
    /// which includes numeric overflow.
    ///
    /// Callers should fall back to a previous or safe command in this case.
    pub fn is_non_convergence(&self) -> bool {
        matches!(
            self,
            MpcCtrlError::NonConvergence { .. } | MpcCtrlError::NumericOverflow
        )
    }
}
