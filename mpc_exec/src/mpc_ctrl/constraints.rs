//! Horizon constraints
//!
//! Two kinds of constraint are built over the decision vector:
//!
//! - Dynamics equality constraints, `state(k+1) - model(state(k), act(k)) = 0`
//!   for every step and state component. These are given to the solver as a
//!   mapping whose image must be zero, together with the product of its
//!   transposed Jacobian with a vector.
//! - Box bounds, which pin the first state exactly to the observed state,
//!   limit the actuators, and keep the remaining states inside a wide sanity
//!   range.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use nalgebra::{Vector2, Vector6};

// Internal
use super::{KinematicModel, Layout, Params, StateComponent, VehicleState};

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Equality constraints linking consecutive horizon steps through the
/// kinematic model.
#[derive(Debug, Clone, Copy)]
pub struct DynamicsConstraints<'a> {
    layout: Layout,
    model: KinematicModel,
    coeffs: &'a [f64]
}

/// Lower and upper bounds on every element of the decision vector.
#[derive(Debug, Clone, PartialEq)]
pub struct Bounds {
    pub lower: Vec<f64>,
    pub upper: Vec<f64>
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl<'a> DynamicsConstraints<'a> {
    pub fn new(layout: Layout, model: KinematicModel, coeffs: &'a [f64]) -> Self {
        Self { layout, model, coeffs }
    }

    /// Write the dynamics residuals of `z` into `res`, which must be
    /// `layout.num_constraints()` long.
    pub fn residual(&self, z: &[f64], res: &mut [f64]) {
        let l = &self.layout;

        for k in 0..l.horizon() {
            let (steer, accel) = l.read_actuation(z, k);
            let current = l.read_state(z, k);
            let predicted = self.model.step(&current, steer, accel, self.coeffs).to_array();
            let next = l.read_state(z, k + 1).to_array();

            for (i, c) in StateComponent::ALL.iter().enumerate() {
                res[l.residual(*c, k)] = next[i] - predicted[i];
            }
        }
    }

    /// Write the product of the transposed residual Jacobian at `z` with `d`
    /// into `out`, which must be `layout.len()` long.
    ///
    /// Each step's residual depends on the next state with an identity
    /// Jacobian and on the current state and actuation through the negated
    /// model Jacobian.
    pub fn jacobian_trans_product(&self, z: &[f64], d: &[f64], out: &mut [f64]) {
        let l = &self.layout;

        out.iter_mut().for_each(|o| *o = 0.0);

        for k in 0..l.horizon() {
            let (steer, _) = l.read_actuation(z, k);
            let current = l.read_state(z, k);
            let jac = self.model.jacobian(&current, steer, self.coeffs);

            let mut d_k = Vector6::zeros();
            for (i, c) in StateComponent::ALL.iter().enumerate() {
                d_k[i] = d[l.residual(*c, k)];
            }

            let d_state: Vector6<f64> = jac.wrt_state.transpose() * d_k;
            let d_act: Vector2<f64> = jac.wrt_act.transpose() * d_k;

            for (i, c) in StateComponent::ALL.iter().enumerate() {
                out[l.state(*c, k + 1)] += d_k[i];
                out[l.state(*c, k)] -= d_state[i];
            }
            out[l.steer(k)] -= d_act[0];
            out[l.accel(k)] -= d_act[1];
        }
    }

    /// The largest absolute dynamics residual of `z`.
    pub fn max_residual(&self, z: &[f64]) -> f64 {
        let mut res = vec![0f64; self.layout.num_constraints()];
        self.residual(z, &mut res);
        res.iter().fold(0f64, |acc, r| acc.max(r.abs()))
    }
}

impl Bounds {
    /// Build the bounds for a problem starting from `initial`.
    pub fn build(params: &Params, layout: &Layout, initial: &VehicleState) -> Self {
        let n = layout.len();
        let mut lower = vec![-params.state_bound; n];
        let mut upper = vec![params.state_bound; n];

        // The initial state is fixed exactly
        let values = initial.to_array();
        for (i, c) in StateComponent::ALL.iter().enumerate() {
            lower[layout.state(*c, 0)] = values[i];
            upper[layout.state(*c, 0)] = values[i];
        }

        for k in 0..layout.horizon() {
            lower[layout.steer(k)] = -params.max_steer_rad;
            upper[layout.steer(k)] = params.max_steer_rad;
            lower[layout.accel(k)] = params.min_accel;
            upper[layout.accel(k)] = params.max_accel;
        }

        Self { lower, upper }
    }

    /// True if `z` lies inside the bounds.
    pub fn contains(&self, z: &[f64]) -> bool {
        z.len() == self.lower.len()
            && z.iter()
                .zip(self.lower.iter().zip(self.upper.iter()))
                .all(|(v, (lo, hi))| v >= lo && v <= hi)
    }

    /// Clamp `z` into the bounds.
    pub fn project(&self, z: &mut [f64]) {
        for (v, (lo, hi)) in z.iter_mut().zip(self.lower.iter().zip(self.upper.iter())) {
            *v = v.max(*lo).min(*hi);
        }
    }
}
