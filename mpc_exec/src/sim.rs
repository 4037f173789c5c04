//! # Simulated vehicle
//!
//! A kinematic bicycle plant driven by the controller's actuation, and a
//! straight line reference expressed as polynomial coefficients in the
//! vehicle's local frame. Used by the closed-loop executable and its tests.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use nalgebra::{DVector, Isometry2, Point2, Vector2};
use serde::{Deserialize, Serialize};

// Internal
use crate::mpc_ctrl::VehicleState;
use util::maths::wrap_pi;

// ---------------------------------------------------------------------------
// CONSTANTS
// ---------------------------------------------------------------------------

/// Minimum magnitude of the line's direction along the vehicle's x axis.
/// Below this the line cannot be expressed as y(x) in the local frame.
const MIN_LOCAL_DIRECTION: f64 = 1e-3;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Pose and speed of the simulated vehicle in the world frame.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct PlantState {
    pub x_m: f64,
    pub y_m: f64,

    /// Units: radians
    pub psi_rad: f64,

    /// Units: meters/second
    pub v_ms: f64
}

/// Straight reference line in the world frame, `y = slope * x + intercept`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LineReference {
    pub slope: f64,
    pub intercept_m: f64
}

/// Kinematic bicycle plant.
#[derive(Debug, Clone)]
pub struct VehicleSim {
    state: PlantState,
    lf_m: f64,
    dt_s: f64,
    time_s: f64
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl PlantState {
    /// The pose of the vehicle as a world frame isometry.
    pub fn pose(&self) -> Isometry2<f64> {
        Isometry2::new(Vector2::new(self.x_m, self.y_m), self.psi_rad)
    }
}

impl LineReference {
    /// Coefficients `[c0, c1]` of the line in the local frame of the given
    /// pose.
    ///
    /// Returns `None` if the line is perpendicular to the vehicle's heading.
    pub fn local_coeffs(&self, pose: &Isometry2<f64>) -> Option<DVector<f64>> {
        let origin = pose.inverse_transform_point(&Point2::new(0.0, self.intercept_m));
        let direction = pose.inverse_transform_vector(&Vector2::new(1.0, self.slope));

        if direction.x.abs() < MIN_LOCAL_DIRECTION {
            return None
        }

        let c1 = direction.y / direction.x;
        let c0 = origin.y - c1 * origin.x;

        Some(DVector::from_column_slice(&[c0, c1]))
    }

    /// Perpendicular distance from the point to the line.
    pub fn distance(&self, x_m: f64, y_m: f64) -> f64 {
        (self.slope * x_m - y_m + self.intercept_m).abs()
            / (1.0 + self.slope * self.slope).sqrt()
    }
}

impl VehicleSim {
    pub fn new(initial: PlantState, lf_m: f64, dt_s: f64) -> Self {
        Self {
            state: initial,
            lf_m,
            dt_s,
            time_s: 0.0
        }
    }

    pub fn state(&self) -> &PlantState {
        &self.state
    }

    /// Simulated time elapsed since the start.
    pub fn time_s(&self) -> f64 {
        self.time_s
    }

    /// The controller's view of the vehicle: the local frame state against
    /// the given reference coefficients.
    pub fn observe(&self, coeffs: &DVector<f64>) -> DVector<f64> {
        let local = VehicleState::at_origin(self.state.v_ms, coeffs.as_slice());

        DVector::from_column_slice(&local.to_array())
    }

    /// Apply the actuation for one period. The heading is kept in [-pi, pi).
    pub fn step(&mut self, steer_rad: f64, throttle: f64) {
        let s = self.state;

        self.state = PlantState {
            x_m: s.x_m + s.v_ms * s.psi_rad.cos() * self.dt_s,
            y_m: s.y_m + s.v_ms * s.psi_rad.sin() * self.dt_s,
            psi_rad: wrap_pi(s.psi_rad + s.v_ms / self.lf_m * steer_rad * self.dt_s),
            v_ms: s.v_ms + throttle * self.dt_s
        };
        self.time_s += self.dt_s;
    }
}
