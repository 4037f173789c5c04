//! MPC control parameters

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use serde::{Deserialize, Serialize};

// Internal
use super::MpcCtrlError;

// ---------------------------------------------------------------------------
// CONSTANTS
// ---------------------------------------------------------------------------

/// Default iteration cap of one solve. A solve of the default horizon which
/// runs to the cap takes a few milliseconds, well inside a 0.1 s tick.
pub const DEFAULT_MAX_ITERATIONS: usize = 200;

/// Largest accepted iteration cap.
pub const MAX_ITERATIONS_LIMIT: usize = 2000;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Parameters for MPC control.
///
/// These are fixed when the controller is constructed and are never modified
/// during a solve.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Params {

    // ---- HORIZON ----

    /// Number of steps in the prediction horizon (N).
    pub horizon: usize,

    /// Duration of one horizon step.
    ///
    /// Units: seconds
    pub dt_s: f64,

    // ---- VEHICLE ----

    /// Distance between the vehicle's centre of mass and its front axle.
    ///
    /// Units: meters
    pub lf_m: f64,

    /// Maximum steering angle magnitude. Steering demands lie in
    /// `[-max_steer_rad, max_steer_rad]`.
    ///
    /// Units: radians
    pub max_steer_rad: f64,

    /// Minimum (most negative) acceleration demand.
    pub min_accel: f64,

    /// Maximum acceleration demand.
    pub max_accel: f64,

    /// Magnitude of the sanity bound applied to all predicted state
    /// components. This is not a physical limit, it only keeps the solver
    /// away from unbounded regions.
    pub state_bound: f64,

    // ---- TRACKING ----

    /// Reference speed the controller regulates to.
    ///
    /// Units: meters/second
    pub ref_speed_ms: f64,

    /// Cost function weights
    pub weights: CostWeights,

    /// If true the predicted (x, y) trajectory is returned with each
    /// actuation.
    pub report_predicted_path: bool,

    // ---- SOLVER ----

    /// Numerical solver settings
    pub solver: SolverParams
}

/// Weights of each term in the cost function.
///
/// The rate weights (`steer_rate` in particular) are the main tuning surface,
/// tracking error alone produces oscillatory steering.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq)]
pub struct CostWeights {
    /// Cross track error, applied at every predicted step
    pub cte: f64,

    /// Heading error, applied at every predicted step
    pub epsi: f64,

    /// Speed error to the reference speed, applied at every predicted step
    pub speed: f64,

    /// Steering effort, applied at every actuation step
    pub steer: f64,

    /// Acceleration effort, applied at every actuation step
    pub accel: f64,

    /// Change in steering between consecutive actuation steps
    pub steer_rate: f64,

    /// Change in acceleration between consecutive actuation steps
    pub accel_rate: f64
}

/// Settings for the horizon solver.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct SolverParams {
    /// Maximum number of iterations of one solve. This is what bounds the
    /// solve time, it must be small enough for a solve to fit in one tick.
    pub max_iterations: usize,

    /// Tolerance on the fixed point residual of the normalised problem
    pub epsilon_tolerance: f64,

    /// Memory length of the L-BFGS directions
    pub lbfgs_memory: usize,

    /// Optional wall clock limit on one solve. Disabled by default, the
    /// iteration limits bound the solve deterministically.
    ///
    /// Units: seconds
    #[serde(default)]
    pub max_duration_s: Option<f64>
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Default for Params {
    fn default() -> Self {
        Self {
            horizon: 10,
            dt_s: 0.1,
            lf_m: 2.67,
            max_steer_rad: 25f64.to_radians(),
            min_accel: -1.0,
            max_accel: 1.0,
            state_bound: 1.0e19,
            ref_speed_ms: 40.0,
            weights: CostWeights::default(),
            report_predicted_path: true,
            solver: SolverParams::default()
        }
    }
}

impl Default for CostWeights {
    fn default() -> Self {
        Self {
            cte: 2000.0,
            epsi: 2000.0,
            speed: 1.0,
            steer: 5.0,
            accel: 5.0,
            steer_rate: 200.0,
            accel_rate: 10.0
        }
    }
}

impl Default for SolverParams {
    fn default() -> Self {
        Self {
            max_iterations: DEFAULT_MAX_ITERATIONS,
            epsilon_tolerance: 1e-5,
            lbfgs_memory: 10,
            max_duration_s: None
        }
    }
}

impl Params {
    /// Check that the parameters describe a solvable problem.
    pub fn validate(&self) -> Result<(), MpcCtrlError> {
        if self.horizon < 1 {
            return invalid("horizon must contain at least one step")
        }
        if !(self.dt_s.is_finite() && self.dt_s > 0.0) {
            return invalid("dt_s must be positive")
        }
        if !(self.lf_m.is_finite() && self.lf_m > 0.0) {
            return invalid("lf_m must be positive")
        }
        if !(self.max_steer_rad.is_finite() && self.max_steer_rad > 0.0) {
            return invalid("max_steer_rad must be positive")
        }
        if !(self.min_accel.is_finite()
            && self.max_accel.is_finite()
            && self.min_accel <= self.max_accel)
        {
            return invalid("acceleration bounds must be finite with min_accel <= max_accel")
        }
        if !(self.state_bound > 0.0) {
            return invalid("state_bound must be positive")
        }
        if !self.ref_speed_ms.is_finite() {
            return invalid("ref_speed_ms must be finite")
        }

        self.weights.validate()?;
        self.solver.validate()
    }
}

impl CostWeights {
    fn validate(&self) -> Result<(), MpcCtrlError> {
        let all = [
            self.cte, self.epsi, self.speed, self.steer, self.accel,
            self.steer_rate, self.accel_rate
        ];

        if all.iter().all(|w| w.is_finite() && *w >= 0.0) {
            Ok(())
        }
        else {
            invalid("cost weights must be finite and non-negative")
        }
    }
}

impl SolverParams {
    fn validate(&self) -> Result<(), MpcCtrlError> {
        if self.max_iterations < 1 || self.max_iterations > MAX_ITERATIONS_LIMIT {
            return invalid(&format!("max_iterations must be between 1 and {}", MAX_ITERATIONS_LIMIT))
        }
        if !(self.epsilon_tolerance > 0.0) {
            return invalid("epsilon_tolerance must be positive")
        }
        if self.lbfgs_memory < 1 {
            return invalid("lbfgs_memory must be at least 1")
        }
        match self.max_duration_s {
            Some(d) if !(d.is_finite() && d > 0.0) => {
                invalid("max_duration_s must be positive when set")
            },
            _ => Ok(())
        }
    }
}

// ---------------------------------------------------------------------------
// FUNCTIONS
// ---------------------------------------------------------------------------

fn invalid(reason: &str) -> Result<(), MpcCtrlError> {
    Err(MpcCtrlError::InvalidParams(String::from(reason)))
}

#[cfg(test)]
mod test {
    use super::*;

    const PARAMS_TOML: &str = r#"
        horizon = 12
        dt_s = 0.05
        lf_m = 2.5
        max_steer_rad = 0.4
        min_accel = -2.0
        max_accel = 1.0
        state_bound = 1.0e10
        ref_speed_ms = 20.0
        report_predicted_path = false

        [weights]
        cte = 1000.0
        epsi = 1000.0
        speed = 1.0
        steer = 5.0
        accel = 5.0
        steer_rate = 100.0
        accel_rate = 10.0

        [solver]
        max_iterations = 150
        epsilon_tolerance = 1e-6
        lbfgs_memory = 5
    "#;

    #[test]
    fn test_default_params_valid() {
        Params::default().validate().unwrap();
    }

    #[test]
    fn test_load_params_toml() {
        let params: Params = util::params::load_str(PARAMS_TOML).unwrap();

        assert_eq!(params.horizon, 12);
        assert_eq!(params.dt_s, 0.05);
        assert_eq!(params.weights.steer_rate, 100.0);
        assert_eq!(params.solver.lbfgs_memory, 5);
        assert_eq!(params.solver.max_iterations, 150);
        assert_eq!(params.solver.max_duration_s, None);
        assert!(!params.report_predicted_path);

        params.validate().unwrap();
    }

    #[test]
    fn test_invalid_params() {
        let mut params = Params::default();
        params.horizon = 0;
        assert!(matches!(params.validate(), Err(MpcCtrlError::InvalidParams(_))));

        let mut params = Params::default();
        params.min_accel = 2.0;
        assert!(matches!(params.validate(), Err(MpcCtrlError::InvalidParams(_))));

        let mut params = Params::default();
        params.weights.steer_rate = -1.0;
        assert!(matches!(params.validate(), Err(MpcCtrlError::InvalidParams(_))));

        let mut params = Params::default();
        params.solver.max_iterations = 0;
        assert!(matches!(params.validate(), Err(MpcCtrlError::InvalidParams(_))));

        let mut params = Params::default();
        params.solver.max_iterations = MAX_ITERATIONS_LIMIT + 1;
        assert!(matches!(params.validate(), Err(MpcCtrlError::InvalidParams(_))));

        let mut params = Params::default();
        params.solver.max_duration_s = Some(0.0);
        assert!(matches!(params.validate(), Err(MpcCtrlError::InvalidParams(_))));
    }
}
