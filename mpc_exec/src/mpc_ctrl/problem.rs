//! Assembled horizon problem

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use log::trace;
use nalgebra::Vector6;

// Internal
use super::{
    Bounds, CostFunction, DynamicsConstraints, KinematicModel, Layout, MpcCtrlError, Params,
    StateComponent, VehicleState, WarmStart
};

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// One tick's optimisation problem: the cost, the dynamics constraints and
/// the bounds, all over the same decision vector layout.
///
/// The problem borrows the reference coefficients for the duration of the
/// solve.
#[derive(Debug, Clone)]
pub struct HorizonProblem<'a> {
    layout: Layout,
    model: KinematicModel,
    cost: CostFunction,
    dynamics: DynamicsConstraints<'a>,
    bounds: Bounds,
    initial: VehicleState,
    coeffs: &'a [f64]
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl<'a> HorizonProblem<'a> {
    /// Assemble the problem for the observed `initial` state and reference
    /// `coeffs`.
    ///
    /// The inputs are expected to have been validated already.
    pub fn assemble(params: &Params, initial: VehicleState, coeffs: &'a [f64]) -> Self {
        let layout = Layout::new(params.horizon);
        let model = KinematicModel::new(params.lf_m, params.dt_s);

        Self {
            layout,
            model,
            cost: CostFunction::new(layout, params.weights, params.ref_speed_ms),
            dynamics: DynamicsConstraints::new(layout, model, coeffs),
            bounds: Bounds::build(params, &layout, &initial),
            initial,
            coeffs
        }
    }

    pub fn layout(&self) -> &Layout {
        &self.layout
    }

    pub fn bounds(&self) -> &Bounds {
        &self.bounds
    }

    pub fn initial_state(&self) -> &VehicleState {
        &self.initial
    }

    /// Cost of the decision vector `z`.
    pub fn cost(&self, z: &[f64]) -> f64 {
        self.cost.evaluate(z)
    }

    /// Gradient of the cost at `z`.
    pub fn cost_gradient(&self, z: &[f64], grad: &mut [f64]) {
        self.cost.gradient(z, grad)
    }

    /// Dynamics residuals of `z`.
    pub fn dynamics_residual(&self, z: &[f64], res: &mut [f64]) {
        self.dynamics.residual(z, res)
    }

    /// Transposed dynamics Jacobian at `z` multiplied by `d`.
    pub fn dynamics_jacobian_trans(&self, z: &[f64], d: &[f64], out: &mut [f64]) {
        self.dynamics.jacobian_trans_product(z, d, out)
    }

    /// Largest absolute dynamics residual of `z`.
    pub fn max_residual(&self, z: &[f64]) -> f64 {
        self.dynamics.max_residual(z)
    }

    /// Number of actuation variables, which sit at the end of the decision
    /// vector.
    pub fn num_actuations(&self) -> usize {
        self.layout.len() - self.layout.num_state_vars()
    }

    /// Overwrite the states of `z` by propagating the observed state through
    /// the model under the actuations already in `z`.
    ///
    /// The result satisfies the dynamics and initial condition constraints
    /// exactly.
    pub fn rollout(&self, z: &mut [f64]) -> Result<(), MpcCtrlError> {
        let l = &self.layout;

        let mut state = self.initial;
        l.write_state(z, 0, &state);

        for k in 0..l.horizon() {
            let (steer, accel) = l.read_actuation(z, k);
            state = self.model.step(&state, steer, accel, self.coeffs);

            if !state.is_finite() {
                return Err(MpcCtrlError::NumericOverflow)
            }

            l.write_state(z, k + 1, &state);
        }

        Ok(())
    }

    /// Build the full decision vector from its actuation part.
    pub fn expand(&self, actuations: &[f64]) -> Result<Vec<f64>, MpcCtrlError> {
        let mut z = vec![0f64; self.layout.len()];
        z[self.layout.num_state_vars()..].copy_from_slice(actuations);
        self.rollout(&mut z)?;

        Ok(z)
    }

    /// Gradient of the cost with respect to the actuations of `z` only, with
    /// the states following the model.
    ///
    /// `z` must come from `rollout` or `expand`. The costates are propagated
    /// backwards from the last step through the transposed model Jacobians.
    pub fn reduced_gradient(&self, z: &[f64], grad: &mut [f64]) {
        let l = &self.layout;
        let offset = l.num_state_vars();

        let mut full = vec![0f64; l.len()];
        self.cost.gradient(z, &mut full);
        grad.copy_from_slice(&full[offset..]);

        let state_grad = |k: usize| {
            Vector6::from_fn(|i, _| full[l.state(StateComponent::ALL[i], k)])
        };

        let mut costate = state_grad(l.horizon());

        for k in (0..l.horizon()).rev() {
            let (steer, _) = l.read_actuation(z, k);
            let jac = self.model.jacobian(&l.read_state(z, k), steer, self.coeffs);

            let act = jac.wrt_act.transpose() * costate;
            grad[l.steer(k) - offset] += act[0];
            grad[l.accel(k) - offset] += act[1];

            costate = state_grad(k) + jac.wrt_state.transpose() * costate;
        }
    }

    /// Build the initial guess for the solver.
    ///
    /// The first actuation is taken from the warm start (clamped to the
    /// actuator bounds), the remaining actuations are zero, and the states
    /// are propagated from the observed state through the model. The guess
    /// is therefore dynamically feasible.
    pub fn initial_guess(&self, warm_start: &WarmStart) -> Result<Vec<f64>, MpcCtrlError> {
        let l = &self.layout;
        let mut z = vec![0f64; l.len()];

        z[l.steer(0)] = warm_start.steer_rad;
        z[l.accel(0)] = warm_start.throttle;
        self.bounds.project(&mut z);

        self.rollout(&mut z)?;

        trace!("Initial guess: {:?}", z);

        Ok(z)
    }
}
