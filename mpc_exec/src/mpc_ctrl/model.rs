//! Kinematic bicycle model of the vehicle

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use nalgebra::{Matrix6, Matrix6x2};
use serde::{Deserialize, Serialize};

// Internal
use super::STATE_DIM;
use util::maths::{poly_deriv, poly_second_deriv, poly_val};

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// The vehicle's kinematic state in its local frame.
#[derive(Debug, Default, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct VehicleState {
    /// Position along the local x axis.
    ///
    /// Units: meters
    pub x_m: f64,

    /// Position along the local y axis.
    ///
    /// Units: meters
    pub y_m: f64,

    /// Heading.
    ///
    /// Units: radians
    pub psi_rad: f64,

    /// Speed.
    ///
    /// Units: meters/second
    pub v_ms: f64,

    /// Cross track error, the reference polynomial minus y.
    ///
    /// Units: meters
    pub cte_m: f64,

    /// Heading error, the heading minus the reference tangent direction.
    ///
    /// Units: radians
    pub epsi_rad: f64
}

/// Discrete time kinematic bicycle model.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct KinematicModel {
    /// Distance from the centre of mass to the front axle.
    pub lf_m: f64,

    /// Step duration.
    pub dt_s: f64
}

/// Partial derivatives of one model step.
#[derive(Debug, Clone, PartialEq)]
pub struct StepJacobian {
    /// Derivative of the next state with respect to the current state.
    pub wrt_state: Matrix6<f64>,

    /// Derivative of the next state with respect to (steering, acceleration).
    pub wrt_act: Matrix6x2<f64>
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl VehicleState {
    /// Build a state from its components in {x, y, psi, v, cte, epsi} order.
    pub fn from_array(values: [f64; STATE_DIM]) -> Self {
        Self {
            x_m: values[0],
            y_m: values[1],
            psi_rad: values[2],
            v_ms: values[3],
            cte_m: values[4],
            epsi_rad: values[5]
        }
    }

    /// Build a state from a slice, or `None` if the slice is not exactly
    /// `STATE_DIM` long.
    pub fn from_slice(values: &[f64]) -> Option<Self> {
        if values.len() != STATE_DIM {
            return None
        }

        let mut array = [0f64; STATE_DIM];
        array.copy_from_slice(values);
        Some(Self::from_array(array))
    }

    /// Build the state of a vehicle sitting at the origin of its local frame,
    /// with the tracking errors derived from the reference polynomial.
    pub fn at_origin(v_ms: f64, coeffs: &[f64]) -> Self {
        Self {
            x_m: 0.0,
            y_m: 0.0,
            psi_rad: 0.0,
            v_ms,
            cte_m: poly_val(0.0, coeffs),
            epsi_rad: -poly_deriv(0.0, coeffs).atan()
        }
    }

    /// The components in {x, y, psi, v, cte, epsi} order.
    pub fn to_array(&self) -> [f64; STATE_DIM] {
        [self.x_m, self.y_m, self.psi_rad, self.v_ms, self.cte_m, self.epsi_rad]
    }

    /// True if every component is finite.
    pub fn is_finite(&self) -> bool {
        self.to_array().iter().all(|v| v.is_finite())
    }
}

impl KinematicModel {
    pub fn new(lf_m: f64, dt_s: f64) -> Self {
        Self { lf_m, dt_s }
    }

    /// Propagate the state by one step under the given actuation.
    ///
    /// The reference polynomial and its derivative are evaluated at the
    /// current x.
    pub fn step(
        &self,
        state: &VehicleState,
        steer_rad: f64,
        accel: f64,
        coeffs: &[f64]
    ) -> VehicleState {
        let dt = self.dt_s;
        let VehicleState { x_m: x, y_m: y, psi_rad: psi, v_ms: v, epsi_rad: epsi, .. } = *state;

        let yaw_step = v / self.lf_m * steer_rad * dt;
        let psi_des = poly_deriv(x, coeffs).atan();

        VehicleState {
            x_m: x + v * psi.cos() * dt,
            y_m: y + v * psi.sin() * dt,
            psi_rad: psi + yaw_step,
            v_ms: v + accel * dt,
            cte_m: (poly_val(x, coeffs) - y) + v * epsi.sin() * dt,
            epsi_rad: (psi - psi_des) + yaw_step
        }
    }

    /// Partial derivatives of `step` at the given state and actuation.
    pub fn jacobian(
        &self,
        state: &VehicleState,
        steer_rad: f64,
        coeffs: &[f64]
    ) -> StepJacobian {
        let dt = self.dt_s;
        let VehicleState { x_m: x, psi_rad: psi, v_ms: v, epsi_rad: epsi, .. } = *state;

        let slope = poly_deriv(x, coeffs);
        // d/dx atan(poly'(x))
        let dpsi_des_dx = poly_second_deriv(x, coeffs) / (1.0 + slope * slope);
        let (sin_psi, cos_psi) = psi.sin_cos();
        let yaw_rate_dv = steer_rad * dt / self.lf_m;
        let yaw_rate_dsteer = v * dt / self.lf_m;

        #[rustfmt::skip]
        let wrt_state = Matrix6::new(
            // x      y     psi                v                  cte  epsi
            1.0,           0.0,  -v * sin_psi * dt, cos_psi * dt,      0.0, 0.0,
            0.0,           1.0,  v * cos_psi * dt,  sin_psi * dt,      0.0, 0.0,
            0.0,           0.0,  1.0,               yaw_rate_dv,       0.0, 0.0,
            0.0,           0.0,  0.0,               1.0,               0.0, 0.0,
            slope,         -1.0, 0.0,               epsi.sin() * dt,   0.0, v * epsi.cos() * dt,
            -dpsi_des_dx,  0.0,  1.0,               yaw_rate_dv,       0.0, 0.0
        );

        #[rustfmt::skip]
        let wrt_act = Matrix6x2::new(
            // steer          accel
            0.0,              0.0,
            0.0,              0.0,
            yaw_rate_dsteer,  0.0,
            0.0,              dt,
            0.0,              0.0,
            yaw_rate_dsteer,  0.0
        );

        StepJacobian { wrt_state, wrt_act }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use approx::assert_relative_eq;

    const LF: f64 = 2.67;
    const DT: f64 = 0.1;

    #[test]
    fn test_straight_line_step() {
        let model = KinematicModel::new(LF, DT);
        let state = VehicleState { v_ms: 10.0, ..Default::default() };

        let next = model.step(&state, 0.0, 1.0, &[0.0]);

        assert_relative_eq!(next.x_m, 1.0);
        assert_relative_eq!(next.y_m, 0.0);
        assert_relative_eq!(next.psi_rad, 0.0);
        assert_relative_eq!(next.v_ms, 10.1);
        assert_relative_eq!(next.cte_m, 0.0);
        assert_relative_eq!(next.epsi_rad, 0.0);
    }

    #[test]
    fn test_step_equations() {
        let model = KinematicModel::new(LF, DT);
        let coeffs = [0.5, 0.1, 0.02];
        let state = VehicleState::from_array([1.0, 0.2, 0.1, 8.0, 0.3, 0.05]);
        let (steer, accel) = (0.2, -0.5);

        let next = model.step(&state, steer, accel, &coeffs);

        let poly = 0.5 + 0.1 * 1.0 + 0.02 * 1.0;
        let slope: f64 = 0.1 + 2.0 * 0.02 * 1.0;
        let yaw = 8.0 / LF * steer * DT;
        assert_relative_eq!(next.x_m, 1.0 + 8.0 * 0.1f64.cos() * DT);
        assert_relative_eq!(next.y_m, 0.2 + 8.0 * 0.1f64.sin() * DT);
        assert_relative_eq!(next.psi_rad, 0.1 + yaw);
        assert_relative_eq!(next.v_ms, 8.0 - 0.05);
        assert_relative_eq!(next.cte_m, poly - 0.2 + 8.0 * 0.05f64.sin() * DT);
        assert_relative_eq!(next.epsi_rad, 0.1 - slope.atan() + yaw);
    }

    #[test]
    fn test_jacobian_matches_finite_differences() {
        let model = KinematicModel::new(LF, DT);
        let coeffs = [0.5, -0.2, 0.03, 0.004];
        let state = VehicleState::from_array([1.5, -0.4, 0.2, 12.0, 0.6, -0.1]);
        let (steer, accel) = (0.15, 0.4);
        let h = 1e-6;

        let jac = model.jacobian(&state, steer, &coeffs);

        for j in 0..STATE_DIM {
            let mut plus = state.to_array();
            let mut minus = state.to_array();
            plus[j] += h;
            minus[j] -= h;
            let f_plus = model.step(&VehicleState::from_array(plus), steer, accel, &coeffs).to_array();
            let f_minus = model.step(&VehicleState::from_array(minus), steer, accel, &coeffs).to_array();

            for i in 0..STATE_DIM {
                let fd = (f_plus[i] - f_minus[i]) / (2.0 * h);
                assert_relative_eq!(jac.wrt_state[(i, j)], fd, epsilon = 1e-6);
            }
        }

        let controls = [(steer + h, accel, steer - h, accel), (steer, accel + h, steer, accel - h)];
        for (j, (sp, ap, sm, am)) in controls.iter().enumerate() {
            let f_plus = model.step(&state, *sp, *ap, &coeffs).to_array();
            let f_minus = model.step(&state, *sm, *am, &coeffs).to_array();

            for i in 0..STATE_DIM {
                let fd = (f_plus[i] - f_minus[i]) / (2.0 * h);
                assert_relative_eq!(jac.wrt_act[(i, j)], fd, epsilon = 1e-6);
            }
        }
    }

    #[test]
    fn test_state_from_slice() {
        assert!(VehicleState::from_slice(&[0.0; 5]).is_none());
        assert!(VehicleState::from_slice(&[0.0; 7]).is_none());

        let state = VehicleState::from_slice(&[1.0, 2.0, 3.0, 4.0, 5.0, 6.0]).unwrap();
        assert_eq!(state.psi_rad, 3.0);
        assert_eq!(state.epsi_rad, 6.0);
    }

    #[test]
    fn test_state_at_origin() {
        let state = VehicleState::at_origin(5.0, &[0.5, 0.1]);

        assert_relative_eq!(state.cte_m, 0.5);
        assert_relative_eq!(state.epsi_rad, -(0.1f64).atan());
        assert_eq!(state.v_ms, 5.0);
    }
}
