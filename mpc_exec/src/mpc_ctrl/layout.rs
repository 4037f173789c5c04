//! Decision vector layout
//!
//! The decision vector of a horizon of N steps is laid out as
//!
//! ```text
//! [ x_0 .. x_N | y_0 .. y_N | psi_0 .. psi_N | v_0 .. v_N | cte_0 .. cte_N |
//!   epsi_0 .. epsi_N | delta_0 .. delta_N-1 | a_0 .. a_N-1 ]
//! ```
//!
//! and the dynamics residuals as
//!
//! ```text
//! [ r_x_0 .. r_x_N-1 | r_y_0 .. r_y_N-1 | ... | r_epsi_0 .. r_epsi_N-1 ]
//! ```
//!
//! where `r_c_k` is the residual of component `c` between steps `k` and
//! `k + 1`.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use super::{VehicleState, ACT_DIM, STATE_DIM};

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Index arithmetic for the decision vector of a given horizon length.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Layout {
    horizon: usize
}

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// The components of the vehicle state, in decision vector order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StateComponent {
    X = 0,
    Y = 1,
    Psi = 2,
    V = 3,
    Cte = 4,
    Epsi = 5
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl StateComponent {
    /// All components in decision vector order.
    pub const ALL: [StateComponent; STATE_DIM] = [
        StateComponent::X,
        StateComponent::Y,
        StateComponent::Psi,
        StateComponent::V,
        StateComponent::Cte,
        StateComponent::Epsi
    ];
}

impl Layout {
    /// Create the layout for a horizon of `horizon` steps.
    pub fn new(horizon: usize) -> Self {
        Self { horizon }
    }

    /// The number of actuation steps (N).
    pub fn horizon(&self) -> usize {
        self.horizon
    }

    /// The number of state variables, which covers steps 0..=N.
    pub fn num_state_vars(&self) -> usize {
        STATE_DIM * (self.horizon + 1)
    }

    /// The total length of the decision vector.
    pub fn len(&self) -> usize {
        self.num_state_vars() + ACT_DIM * self.horizon
    }

    /// The number of dynamics equality constraints.
    pub fn num_constraints(&self) -> usize {
        STATE_DIM * self.horizon
    }

    /// Index of a state component at `step` (0..=N).
    pub fn state(&self, component: StateComponent, step: usize) -> usize {
        debug_assert!(step <= self.horizon);
        component as usize * (self.horizon + 1) + step
    }

    /// Index of the steering angle at actuation `step` (0..N).
    pub fn steer(&self, step: usize) -> usize {
        debug_assert!(step < self.horizon);
        self.num_state_vars() + step
    }

    /// Index of the acceleration at actuation `step` (0..N).
    pub fn accel(&self, step: usize) -> usize {
        debug_assert!(step < self.horizon);
        self.num_state_vars() + self.horizon + step
    }

    /// Index of the dynamics residual of `component` between `step` and
    /// `step + 1`.
    pub fn residual(&self, component: StateComponent, step: usize) -> usize {
        debug_assert!(step < self.horizon);
        component as usize * self.horizon + step
    }

    /// Read the state at `step` out of the decision vector.
    pub fn read_state(&self, z: &[f64], step: usize) -> VehicleState {
        let mut values = [0f64; STATE_DIM];
        for (i, c) in StateComponent::ALL.iter().enumerate() {
            values[i] = z[self.state(*c, step)];
        }
        VehicleState::from_array(values)
    }

    /// Write the state at `step` into the decision vector.
    pub fn write_state(&self, z: &mut [f64], step: usize, state: &VehicleState) {
        for (c, value) in StateComponent::ALL.iter().zip(state.to_array().iter()) {
            z[self.state(*c, step)] = *value;
        }
    }

    /// Read the (steering, acceleration) pair at actuation `step`.
    pub fn read_actuation(&self, z: &[f64], step: usize) -> (f64, f64) {
        (z[self.steer(step)], z[self.accel(step)])
    }
}
