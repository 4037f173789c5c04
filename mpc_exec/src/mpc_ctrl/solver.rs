//! Horizon solver backends
//!
//! The controller only depends on the [`HorizonSolver`] trait, so the
//! numerical method can be swapped without touching the model, cost or
//! constraints. The default backend, [`PanocSolver`], eliminates the dynamics
//! constraints by shooting: PANOC from `optimization_engine` searches over the
//! actuations only, inside the actuator box, and the states are always
//! obtained by propagating the model from the observed state. Every iterate is
//! therefore dynamically feasible, and the only stopping tolerance is the
//! optimality of the actuations.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use log::debug;
use optimization_engine::{
    constraints::Rectangle,
    core::ExitStatus,
    panoc::{PANOCCache, PANOCOptimizer},
    FunctionCallResult, Optimizer, Problem, SolverError,
};
use serde::Serialize;
use std::time::Duration;

// Internal
use super::{HorizonProblem, MpcCtrlError, SolverParams};

// ---------------------------------------------------------------------------
// TRAITS
// ---------------------------------------------------------------------------

/// A numerical backend able to solve an assembled horizon problem.
pub trait HorizonSolver {
    /// Solve `problem` starting from `guess`.
    ///
    /// On success `guess` holds the optimised decision vector. On failure its
    /// contents are unspecified.
    fn solve(
        &mut self,
        problem: &HorizonProblem,
        settings: &SolverParams,
        guess: &mut [f64]
    ) -> Result<SolveSummary, MpcCtrlError>;
}

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Summary of a successful solve.
#[derive(Debug, Default, Clone, Copy, PartialEq, Serialize)]
pub struct SolveSummary {
    /// Number of iterations performed
    pub iterations: usize,

    /// Time taken by the solver.
    ///
    /// Units: seconds
    pub solve_time_s: f64,

    /// Cost of the solution
    pub cost: f64,

    /// Largest absolute dynamics residual of the solution
    pub max_residual: f64
}

/// Shooting PANOC solver from `optimization_engine`.
///
/// The solver's workspace is allocated on every solve, so no state is
/// carried between ticks.
#[derive(Debug, Default, Clone, Copy)]
pub struct PanocSolver;

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl HorizonSolver for PanocSolver {
    fn solve(
        &mut self,
        problem: &HorizonProblem,
        settings: &SolverParams,
        guess: &mut [f64]
    ) -> Result<SolveSummary, MpcCtrlError> {
        let offset = problem.layout().num_state_vars();
        let n_act = problem.num_actuations();
        let bounds = problem.bounds();

        let mut panoc_cache = PANOCCache::new(n_act, settings.epsilon_tolerance, settings.lbfgs_memory);

        let set_u = Rectangle::new(
            Some(&bounds.lower[offset..]),
            Some(&bounds.upper[offset..])
        );

        // The cost is normalised by the guess cost so the tolerance is
        // independent of the weights' magnitude
        let scale = problem.cost(guess).abs().max(1.0);
        if !scale.is_finite() {
            return Err(MpcCtrlError::NumericOverflow)
        }

        let f = |u: &[f64], cost: &mut f64| -> FunctionCallResult {
            let z = problem.expand(u).map_err(|_| SolverError::NotFiniteComputation)?;
            *cost = problem.cost(&z) / scale;
            check_finite(std::slice::from_ref(cost))
        };
        let df = |u: &[f64], grad: &mut [f64]| -> FunctionCallResult {
            let z = problem.expand(u).map_err(|_| SolverError::NotFiniteComputation)?;
            problem.reduced_gradient(&z, grad);
            grad.iter_mut().for_each(|g| *g /= scale);
            check_finite(grad)
        };

        let panoc_problem = Problem::new(&set_u, df, f);

        let mut optimizer = PANOCOptimizer::new(panoc_problem, &mut panoc_cache)
            .with_max_iter(settings.max_iterations);

        if let Some(max_s) = settings.max_duration_s {
            optimizer = optimizer.with_max_duration(Duration::from_secs_f64(max_s));
        }

        let mut u = guess[offset..].to_vec();

        // The only errors raised from the callbacks are non-finite values
        let status = optimizer
            .solve(&mut u)
            .map_err(|_: SolverError| MpcCtrlError::NumericOverflow)?;

        let z = problem.expand(&u)?;
        if !bounds.contains(&z) {
            return Err(MpcCtrlError::NumericOverflow)
        }
        guess.copy_from_slice(&z);

        let max_residual = problem.max_residual(guess);

        debug!(
            "PANOC solve: {:?} after {} iterations in {:.3} ms, fpr {:.3e}",
            status.exit_status(),
            status.iterations(),
            status.solve_time().as_secs_f64() * 1e3,
            status.norm_fpr()
        );

        match status.exit_status() {
            ExitStatus::Converged => Ok(SolveSummary {
                iterations: status.iterations(),
                solve_time_s: status.solve_time().as_secs_f64(),
                cost: problem.cost(guess),
                max_residual
            }),
            _ => Err(MpcCtrlError::NonConvergence {
                iterations: status.iterations(),
                max_residual
            })
        }
    }
}

// ---------------------------------------------------------------------------
// FUNCTIONS
// ---------------------------------------------------------------------------

fn check_finite(values: &[f64]) -> FunctionCallResult {
    if values.iter().all(|v| v.is_finite()) {
        Ok(())
    }
    else {
        Err(SolverError::NotFiniteComputation)
    }
}
