//! MPC control module state

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use log::{debug, warn};
use nalgebra::{DVector, Point2};
use serde::{Deserialize, Serialize};

// Internal
use super::*;
use util::{
    archive::{ArchiveError, Archived, Archiver},
    module::State,
    params,
    session::Session
};

// ---------------------------------------------------------------------------
// CONSTANTS
// ---------------------------------------------------------------------------

/// Throttle command assumed before the first solve.
pub const DEFAULT_THROTTLE: f64 = 0.1;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Model predictive controller.
///
/// Solves must be made sequentially, each call to `solve` reads the warm
/// start written by the previous successful call.
pub struct MpcCtrl<S = PanocSolver> {
    params: Params,

    solver: S,

    /// Commands of the last successful solve. Only written by
    /// `extract_actuation`.
    warm_start: WarmStart,

    report: StatusReport,
    arch_report: Archiver
}

/// The previous tick's commands, used to seed the next solve.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WarmStart {
    /// Units: radians
    pub steer_rad: f64,

    pub throttle: f64
}

/// The actuation to apply for this tick.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Actuation {
    /// Steering angle demand.
    ///
    /// Units: radians
    pub steer_rad: f64,

    /// Throttle (acceleration) demand.
    pub throttle: f64,

    /// Predicted vehicle positions at steps 0..=N in the local frame. Empty
    /// unless `Params::report_predicted_path` is set.
    pub predicted: Vec<Point2<f64>>
}

/// Input data to MPC control.
#[derive(Debug, Clone)]
pub struct InputData {
    /// Current state, {x, y, psi, v, cte, epsi}
    pub state: DVector<f64>,

    /// Reference polynomial coefficients, lowest power first
    pub coeffs: DVector<f64>
}

/// Status report for MpcCtrl processing.
#[derive(Debug, Default, Clone, Copy, PartialEq, Serialize)]
pub struct StatusReport {
    /// True if the last solve produced an actuation
    pub solved: bool,

    /// True if the input data was rejected
    pub invalid_input: bool,

    /// True if the solver ran out of iterations or hit non-finite values
    pub non_convergence: bool,

    /// Steering demand of the last successful solve
    pub steer_rad: f64,

    /// Throttle demand of the last successful solve
    pub throttle: f64,

    /// Observed cross track error
    pub cte_m: f64,

    /// Observed heading error
    pub epsi_rad: f64,

    pub cost: f64,
    pub iterations: usize,
    pub solve_time_s: f64,
    pub max_residual: f64
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Default for WarmStart {
    fn default() -> Self {
        Self {
            steer_rad: 0.0,
            throttle: DEFAULT_THROTTLE
        }
    }
}

impl WarmStart {
    /// A warm start with all commands at zero.
    pub fn cold() -> Self {
        Self {
            steer_rad: 0.0,
            throttle: 0.0
        }
    }
}

impl Actuation {
    /// Flatten the actuation into `[steer, throttle, x_0, y_0, x_1, y_1, ...]`.
    ///
    /// The predicted points are interleaved as (x, y) pairs, in step order.
    pub fn to_vec(&self) -> Vec<f64> {
        let mut out = Vec::with_capacity(2 + 2 * self.predicted.len());
        out.push(self.steer_rad);
        out.push(self.throttle);

        for p in self.predicted.iter() {
            out.push(p.x);
            out.push(p.y);
        }

        out
    }
}

impl Default for MpcCtrl<PanocSolver> {
    fn default() -> Self {
        Self {
            params: Params::default(),
            solver: PanocSolver,
            warm_start: WarmStart::default(),
            report: StatusReport::default(),
            arch_report: Archiver::default()
        }
    }
}

impl MpcCtrl<PanocSolver> {
    /// Create a new controller using the default solver backend.
    pub fn new(params: Params) -> Result<Self, MpcCtrlError> {
        Self::with_solver(params, PanocSolver)
    }
}

impl<S: HorizonSolver> MpcCtrl<S> {
    /// Create a new controller using the given solver backend.
    pub fn with_solver(params: Params, solver: S) -> Result<Self, MpcCtrlError> {
        params.validate()?;

        Ok(Self {
            params,
            solver,
            warm_start: WarmStart::default(),
            report: StatusReport::default(),
            arch_report: Archiver::default()
        })
    }

    /// Replace the warm start, for instance to restart from a known command.
    pub fn with_warm_start(mut self, warm_start: WarmStart) -> Self {
        self.warm_start = warm_start;
        self
    }

    pub fn params(&self) -> &Params {
        &self.params
    }

    /// The commands of the last successful solve, or the defaults if there
    /// has been none.
    pub fn warm_start(&self) -> &WarmStart {
        &self.warm_start
    }

    /// The report of the last solve.
    pub fn report(&self) -> &StatusReport {
        &self.report
    }

    /// Compute the actuation for the given state and reference polynomial.
    ///
    /// The state must contain exactly {x, y, psi, v, cte, epsi}, and the
    /// coefficients at least one value, all finite. Otherwise
    /// `InvalidInput` is returned and the solver is not invoked.
    ///
    /// On failure the warm start is left untouched, so the controller can be
    /// called again on the next tick.
    pub fn solve(
        &mut self,
        state: &DVector<f64>,
        coeffs: &DVector<f64>
    ) -> Result<Actuation, MpcCtrlError> {
        self.report = StatusReport::default();

        let initial = match validate_input(state, coeffs) {
            Ok(s) => s,
            Err(e) => {
                warn!("MpcCtrl input rejected: {}", e);
                self.report.invalid_input = true;
                return Err(e)
            }
        };
        self.report.cte_m = initial.cte_m;
        self.report.epsi_rad = initial.epsi_rad;

        let problem = HorizonProblem::assemble(&self.params, initial, coeffs.as_slice());

        let summary = problem
            .initial_guess(&self.warm_start)
            .and_then(|mut z| {
                self.solver
                    .solve(&problem, &self.params.solver, &mut z)
                    .map(|summary| (summary, z))
            });

        let (summary, z) = match summary {
            Ok(s) => s,
            Err(e) => {
                warn!("MpcCtrl solve failed: {}", e);
                self.report.non_convergence = e.is_non_convergence();
                return Err(e)
            }
        };

        let actuation = self.extract_actuation(problem.layout(), &z);

        self.report.solved = true;
        self.report.steer_rad = actuation.steer_rad;
        self.report.throttle = actuation.throttle;
        self.report.cost = summary.cost;
        self.report.iterations = summary.iterations;
        self.report.solve_time_s = summary.solve_time_s;
        self.report.max_residual = summary.max_residual;

        debug!(
            "MpcCtrl output: steer {:.4} rad, throttle {:.4}, cost {:.4}",
            actuation.steer_rad, actuation.throttle, summary.cost
        );

        Ok(actuation)
    }

    /// Read the first actuation out of the solved decision vector and store
    /// it as the next warm start.
    ///
    /// This is the only place the warm start is written.
    fn extract_actuation(&mut self, layout: &Layout, z: &[f64]) -> Actuation {
        let (steer, accel) = layout.read_actuation(z, 0);

        let steer_rad = steer.max(-self.params.max_steer_rad).min(self.params.max_steer_rad);
        let throttle = accel.max(self.params.min_accel).min(self.params.max_accel);

        self.warm_start = WarmStart { steer_rad, throttle };

        let predicted = if self.params.report_predicted_path {
            (0..=layout.horizon())
                .map(|k| {
                    Point2::new(
                        z[layout.state(StateComponent::X, k)],
                        z[layout.state(StateComponent::Y, k)]
                    )
                })
                .collect()
        }
        else {
            Vec::new()
        };

        Actuation { steer_rad, throttle, predicted }
    }
}

impl State for MpcCtrl<PanocSolver> {
    const NAME: &'static str = "mpc_ctrl";

    type InitData = &'static str;
    type InitError = MpcCtrlError;

    type InputData = InputData;
    type OutputData = Actuation;
    type StatusReport = StatusReport;
    type ProcError = MpcCtrlError;

    /// Initialise the MpcCtrl module.
    ///
    /// Expected init data is the path to the parameter file. The warm start
    /// is reset to its defaults.
    fn init(&mut self, init_data: Self::InitData, session: &Session)
        -> Result<(), Self::InitError>
    {
        let params: Params = params::load(init_data)
            .map_err(MpcCtrlError::ParamLoadError)?;

        *self = Self::new(params)?;

        match Archiver::from_path(session, Self::archive_path("status_report.csv")) {
            Ok(a) => self.arch_report = a,
            Err(e) => warn!("{} archiving disabled: {}", Self::NAME, e)
        }

        Ok(())
    }

    /// Perform cyclic processing of MPC control.
    fn proc(&mut self, input_data: &Self::InputData)
        -> Result<(Self::OutputData, Self::StatusReport), Self::ProcError>
    {
        let actuation = self.solve(&input_data.state, &input_data.coeffs)?;

        Ok((actuation, self.report))
    }
}

impl<S> Archived for MpcCtrl<S> {
    fn write(&mut self) -> Result<(), ArchiveError> {
        if self.arch_report.is_initialised() {
            self.arch_report.serialise(self.report)?;
        }

        Ok(())
    }
}

// ---------------------------------------------------------------------------
// FUNCTIONS
// ---------------------------------------------------------------------------

/// Check the shape and values of the input vectors, returning the state.
fn validate_input(
    state: &DVector<f64>,
    coeffs: &DVector<f64>
) -> Result<VehicleState, MpcCtrlError> {
    let state = VehicleState::from_slice(state.as_slice()).ok_or_else(|| {
        MpcCtrlError::InvalidInput(format!(
            "expected a state of {} components, found {}",
            STATE_DIM,
            state.len()
        ))
    })?;

    if !state.is_finite() {
        return Err(MpcCtrlError::InvalidInput(String::from(
            "state contains non-finite values"
        )))
    }

    if coeffs.is_empty() {
        return Err(MpcCtrlError::InvalidInput(String::from(
            "reference polynomial has no coefficients"
        )))
    }

    if !coeffs.iter().all(|c| c.is_finite()) {
        return Err(MpcCtrlError::InvalidInput(String::from(
            "reference polynomial contains non-finite coefficients"
        )))
    }

    Ok(state)
}

#[cfg(test)]
mod test {
    use super::*;
    use approx::assert_relative_eq;
    use std::cell::Cell;
    use std::rc::Rc;
    use std::time::Instant;

    /// Backend which counts calls and always fails.
    struct FailingSolver {
        calls: Rc<Cell<usize>>,
        error: fn() -> MpcCtrlError
    }

    impl HorizonSolver for FailingSolver {
        fn solve(
            &mut self,
            _problem: &HorizonProblem,
            _settings: &SolverParams,
            _guess: &mut [f64]
        ) -> Result<SolveSummary, MpcCtrlError> {
            self.calls.set(self.calls.get() + 1);
            Err((self.error)())
        }
    }

    /// Backend which counts calls and returns the initial guess unchanged.
    struct GuessSolver {
        calls: Rc<Cell<usize>>
    }

    impl HorizonSolver for GuessSolver {
        fn solve(
            &mut self,
            problem: &HorizonProblem,
            _settings: &SolverParams,
            guess: &mut [f64]
        ) -> Result<SolveSummary, MpcCtrlError> {
            self.calls.set(self.calls.get() + 1);
            Ok(SolveSummary {
                cost: problem.cost(guess),
                max_residual: problem.max_residual(guess),
                ..Default::default()
            })
        }
    }

    fn non_convergence() -> MpcCtrlError {
        MpcCtrlError::NonConvergence {
            iterations: 1,
            max_residual: 1.0
        }
    }

    fn vector(values: &[f64]) -> DVector<f64> {
        DVector::from_column_slice(values)
    }

    fn scenario_params(horizon: usize) -> Params {
        Params {
            horizon,
            dt_s: 0.1,
            ref_speed_ms: 20.0,
            ..Params::default()
        }
    }

    #[test]
    fn test_default_warm_start() {
        let ctrl = MpcCtrl::new(Params::default()).unwrap();

        assert_eq!(*ctrl.warm_start(), WarmStart { steer_rad: 0.0, throttle: DEFAULT_THROTTLE });
    }

    #[test]
    fn test_invalid_params_rejected() {
        let mut params = Params::default();
        params.dt_s = 0.0;

        assert!(matches!(MpcCtrl::new(params), Err(MpcCtrlError::InvalidParams(_))));
    }

    #[test]
    fn test_invalid_input_does_not_invoke_solver() {
        let calls = Rc::new(Cell::new(0));
        let mut ctrl = MpcCtrl::with_solver(
            Params::default(),
            GuessSolver { calls: calls.clone() }
        ).unwrap();

        let bad_inputs = [
            (vector(&[0.0, 0.0, 0.0, 10.0, 0.0]), vector(&[0.0])),
            (vector(&[0.0, 0.0, 0.0, 10.0, 0.0, 0.0, 0.0]), vector(&[0.0])),
            (vector(&[0.0, 0.0, 0.0, 10.0, 0.0, 0.0]), vector(&[])),
            (vector(&[0.0, 0.0, std::f64::NAN, 10.0, 0.0, 0.0]), vector(&[0.0])),
            (vector(&[0.0, 0.0, 0.0, 10.0, 0.0, 0.0]), vector(&[0.0, std::f64::INFINITY]))
        ];

        for (state, coeffs) in bad_inputs.iter() {
            match ctrl.solve(state, coeffs) {
                Err(MpcCtrlError::InvalidInput(_)) => (),
                r => panic!("Expected InvalidInput, got {:?}", r)
            }
            assert!(ctrl.report().invalid_input);
        }

        assert_eq!(calls.get(), 0);
        assert_eq!(*ctrl.warm_start(), WarmStart::default());
    }

    #[test]
    fn test_failed_solve_keeps_warm_start() {
        let calls = Rc::new(Cell::new(0));
        let mut ctrl = MpcCtrl::with_solver(
            Params::default(),
            FailingSolver { calls: calls.clone(), error: non_convergence }
        )
        .unwrap()
        .with_warm_start(WarmStart { steer_rad: 0.05, throttle: 0.3 });

        let state = vector(&[0.0, 0.0, 0.0, 10.0, 0.5, 0.05]);
        let coeffs = vector(&[0.0, 0.1]);

        let err = ctrl.solve(&state, &coeffs).unwrap_err();
        assert!(err.is_non_convergence());
        assert!(ctrl.report().non_convergence);
        assert!(!ctrl.report().solved);
        assert_eq!(calls.get(), 1);
        assert_eq!(*ctrl.warm_start(), WarmStart { steer_rad: 0.05, throttle: 0.3 });

        // The controller remains usable on the next tick
        assert!(ctrl.solve(&state, &coeffs).is_err());
        assert_eq!(calls.get(), 2);
    }

    #[test]
    fn test_numeric_overflow_is_non_convergence() {
        let calls = Rc::new(Cell::new(0));
        let mut ctrl = MpcCtrl::with_solver(
            Params::default(),
            FailingSolver { calls: calls.clone(), error: || MpcCtrlError::NumericOverflow }
        ).unwrap();

        let err = ctrl
            .solve(&vector(&[0.0, 0.0, 0.0, 10.0, 0.0, 0.0]), &vector(&[0.0]))
            .unwrap_err();

        assert!(matches!(err, MpcCtrlError::NumericOverflow));
        assert!(err.is_non_convergence());
        assert!(!MpcCtrlError::InvalidInput(String::new()).is_non_convergence());
    }

    #[test]
    fn test_extraction_updates_warm_start() {
        let calls = Rc::new(Cell::new(0));
        let mut ctrl = MpcCtrl::with_solver(
            Params::default(),
            GuessSolver { calls: calls.clone() }
        )
        .unwrap()
        .with_warm_start(WarmStart { steer_rad: -0.2, throttle: 0.4 });

        let actuation = ctrl
            .solve(&vector(&[0.0, 0.0, 0.0, 10.0, 0.0, 0.0]), &vector(&[0.0]))
            .unwrap();

        // The guess solver returns the warm started guess, whose first
        // actuation is the warm start itself
        assert_eq!(actuation.steer_rad, -0.2);
        assert_eq!(actuation.throttle, 0.4);
        assert_eq!(*ctrl.warm_start(), WarmStart { steer_rad: -0.2, throttle: 0.4 });
        assert_eq!(actuation.predicted.len(), Params::default().horizon + 1);
        assert_eq!(actuation.predicted[0], Point2::new(0.0, 0.0));
        assert_relative_eq!(actuation.predicted[1].x, 10.0 * Params::default().dt_s);
        assert!(ctrl.report().solved);
    }

    #[test]
    fn test_actuation_to_vec() {
        let actuation = Actuation {
            steer_rad: 0.1,
            throttle: 0.2,
            predicted: vec![Point2::new(0.0, 0.5), Point2::new(1.0, 1.5)]
        };

        assert_eq!(actuation.to_vec(), vec![0.1, 0.2, 0.0, 0.5, 1.0, 1.5]);

        let bare = Actuation { predicted: Vec::new(), ..actuation };
        assert_eq!(bare.to_vec(), vec![0.1, 0.2]);
    }

    #[test]
    fn test_predicted_path_optional() {
        let mut params = Params::default();
        params.report_predicted_path = false;
        let calls = Rc::new(Cell::new(0));
        let mut ctrl = MpcCtrl::with_solver(params, GuessSolver { calls }).unwrap();

        let actuation = ctrl
            .solve(&vector(&[0.0, 0.0, 0.0, 10.0, 0.0, 0.0]), &vector(&[0.0]))
            .unwrap();

        assert!(actuation.predicted.is_empty());
        assert_eq!(actuation.to_vec().len(), 2);
    }

    #[test]
    fn test_centred_on_straight_reference() {
        let params = Params::default();
        let v_ref = params.ref_speed_ms;
        let mut ctrl = MpcCtrl::new(params).unwrap();

        let actuation = ctrl
            .solve(&vector(&[0.0, 0.0, 0.0, v_ref, 0.0, 0.0]), &vector(&[0.0]))
            .unwrap();

        assert!(actuation.steer_rad.abs() < 1e-3);
        assert!(actuation.throttle.abs() < 1e-2);
    }

    #[test]
    fn test_scenario_shallow_linear_reference() {
        let params = scenario_params(10);
        let max_steer = params.max_steer_rad;
        let mut ctrl = MpcCtrl::new(params).unwrap();

        let state = vector(&[0.0, 0.0, 0.0, 10.0, 0.5, 0.05]);
        let coeffs = vector(&[0.0, 0.1]);

        let actuation = ctrl.solve(&state, &coeffs).unwrap();

        assert!(actuation.steer_rad.abs() <= max_steer);
        assert!(actuation.steer_rad.abs() > 1e-4);
        // Below the reference speed of 20 m/s so the vehicle accelerates
        assert!(actuation.throttle > 0.0);
        assert!(actuation.throttle <= 1.0);
        assert_eq!(actuation.predicted.len(), 11);
        assert_eq!(*ctrl.warm_start(), WarmStart {
            steer_rad: actuation.steer_rad,
            throttle: actuation.throttle
        });
    }

    #[test]
    fn test_actuation_within_bounds() {
        let params = scenario_params(8);
        let max_steer = params.max_steer_rad;
        let (min_accel, max_accel) = (params.min_accel, params.max_accel);
        let mut ctrl = MpcCtrl::new(params).unwrap();

        // Large errors push the unconstrained optimum outside the actuator
        // limits
        let cases = [
            (vec![0.0, 0.0, 0.0, 10.0, 4.0, 0.6], vec![4.0, 0.8]),
            (vec![0.0, 0.0, 0.0, 30.0, -3.0, -0.5], vec![-3.0, -0.5, 0.02]),
            (vec![0.0, 0.0, 0.0, 0.0, 0.0, 0.0], vec![0.0]),
            (vec![0.0, 0.0, 0.0, 45.0, 1.0, 0.1], vec![1.0, -0.1, 0.01, -0.001])
        ];

        for (state, coeffs) in cases.iter() {
            let a = ctrl.solve(&vector(state), &vector(coeffs)).unwrap();

            assert!(a.steer_rad.abs() <= max_steer);
            assert!(a.throttle >= min_accel && a.throttle <= max_accel);
        }

        // Far from the line with a large heading error
        let a = ctrl
            .solve(&vector(&[0.0, 0.0, 0.0, 25.0, 8.0, -0.98]), &vector(&[8.0, 1.5]))
            .unwrap();
        assert!(a.steer_rad.abs() <= max_steer);
        assert!(a.throttle >= min_accel && a.throttle <= max_accel);
    }

    #[test]
    fn test_degenerate_reference_is_reported() {
        let mut ctrl = MpcCtrl::new(scenario_params(8))
            .unwrap()
            .with_warm_start(WarmStart { steer_rad: 0.1, throttle: 0.2 });

        // The reference polynomial overflows one step ahead
        let result = ctrl.solve(
            &vector(&[0.0, 0.0, 0.0, 30.0, 0.0, 0.0]),
            &vector(&[0.0, 0.0, 1.0e307, 1.0e307])
        );

        assert!(matches!(result, Err(MpcCtrlError::NumericOverflow)));
        assert!(ctrl.report().non_convergence);
        assert_eq!(*ctrl.warm_start(), WarmStart { steer_rad: 0.1, throttle: 0.2 });
    }

    #[test]
    fn test_solve_fits_in_one_tick() {
        let mut params = scenario_params(10);
        params.solver.epsilon_tolerance = 1e-14;
        let max_iterations = params.solver.max_iterations;
        let dt_s = params.dt_s;
        let mut ctrl = MpcCtrl::new(params).unwrap();

        let start = Instant::now();
        let result = ctrl.solve(
            &vector(&[0.0, 0.0, 0.0, 10.0, 0.5, 0.05]),
            &vector(&[0.0, 0.1])
        );
        let elapsed_s = start.elapsed().as_secs_f64();

        let iterations = match result {
            Ok(_) => ctrl.report().iterations,
            Err(MpcCtrlError::NonConvergence { iterations, .. }) => iterations,
            Err(e) => panic!("Unexpected error {:?}", e)
        };

        assert!(iterations <= max_iterations);
        assert!(max_iterations <= DEFAULT_MAX_ITERATIONS);
        assert!(elapsed_s < dt_s, "solve took {} s", elapsed_s);
    }

    #[test]
    fn test_deterministic() {
        let state = vector(&[0.0, 0.0, 0.0, 12.0, 0.4, -0.03]);
        let coeffs = vector(&[0.4, 0.05, -0.002]);
        let warm = WarmStart { steer_rad: 0.02, throttle: 0.2 };

        let mut a = MpcCtrl::new(scenario_params(10)).unwrap().with_warm_start(warm);
        let mut b = MpcCtrl::new(scenario_params(10)).unwrap().with_warm_start(warm);

        let out_a = a.solve(&state, &coeffs).unwrap();
        let out_b = b.solve(&state, &coeffs).unwrap();

        assert_relative_eq!(out_a.steer_rad, out_b.steer_rad, epsilon = 1e-12);
        assert_relative_eq!(out_a.throttle, out_b.throttle, epsilon = 1e-12);
        assert_eq!(out_a.predicted.len(), out_b.predicted.len());
    }

    #[test]
    fn test_warm_start_no_worse_than_cold() {
        let state = vector(&[0.0, 0.0, 0.0, 15.0, 0.3, 0.02]);
        let coeffs = vector(&[0.3, 0.02]);

        // Obtain the previous tick's command from a first solve
        let mut first = MpcCtrl::new(scenario_params(10)).unwrap();
        first.solve(&state, &coeffs).unwrap();
        let previous = *first.warm_start();

        let mut warm = MpcCtrl::new(scenario_params(10)).unwrap().with_warm_start(previous);
        let mut cold = MpcCtrl::new(scenario_params(10)).unwrap().with_warm_start(WarmStart::cold());

        warm.solve(&state, &coeffs).unwrap();
        cold.solve(&state, &coeffs).unwrap();

        let warm_cost = warm.report().cost;
        let cold_cost = cold.report().cost;
        assert!(
            warm_cost <= cold_cost * (1.0 + 1e-3) + 1e-6,
            "warm {} cold {}", warm_cost, cold_cost
        );
    }

    #[test]
    fn test_horizon_length_stability() {
        let state = vector(&[0.0, 0.0, 0.0, 15.0, 0.2, 0.0]);
        let coeffs = vector(&[0.2, 0.01]);

        let mut short = MpcCtrl::new(scenario_params(10)).unwrap();
        let mut long = MpcCtrl::new(scenario_params(14)).unwrap();

        let a_short = short.solve(&state, &coeffs).unwrap();
        let a_long = long.solve(&state, &coeffs).unwrap();

        assert!((a_short.steer_rad - a_long.steer_rad).abs() < 0.05);
        assert!((a_short.throttle - a_long.throttle).abs() < 0.2);
    }

    #[test]
    fn test_single_step_horizon() {
        let mut ctrl = MpcCtrl::new(scenario_params(1)).unwrap();

        let actuation = ctrl
            .solve(&vector(&[0.0, 0.0, 0.0, 10.0, 0.2, 0.01]), &vector(&[0.2]))
            .unwrap();

        assert_eq!(actuation.predicted.len(), 2);
        assert!(actuation.steer_rad.abs() <= ctrl.params().max_steer_rad);
        assert!(actuation.throttle > 0.0);
    }

    #[test]
    fn test_proc_returns_report() {
        let mut ctrl = MpcCtrl::default();

        let (actuation, report) = ctrl
            .proc(&InputData {
                state: vector(&[0.0, 0.0, 0.0, 30.0, 0.1, 0.0]),
                coeffs: vector(&[0.1])
            })
            .unwrap();

        assert!(report.solved);
        assert_eq!(report.steer_rad, actuation.steer_rad);
        assert_eq!(report.cte_m, 0.1);
        assert!(report.max_residual < 1e-2);

        // Archiving without a session is a no-op
        ctrl.write().unwrap();
    }
}
