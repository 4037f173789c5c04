//! Main closed-loop executable entry point.
//!
//! # Architecture
//!
//! The exec drives the MPC controller against the simulated vehicle:
//!
//!     - Initialise the session, logging and modules
//!     - Main loop, once per control period:
//!         - Express the reference line in the vehicle's local frame
//!         - Observe the vehicle state
//!         - MpcCtrl processing, with the fallback policy on failure
//!         - Step the simulated vehicle
//!         - Write archives
//!     - Write the run summary
//!
//! # Fallback policy
//!
//! If MpcCtrl does not converge the last successful command is reapplied. If
//! it hits non-finite values, or the input is rejected, the vehicle is brought
//! to a stop with zero steering and full braking.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use color_eyre::{Report, eyre::WrapErr};
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use std::fs::File;

// Internal
use mpc_lib::{
    mpc_ctrl::{self, MpcCtrl, MpcCtrlError},
    sim::{LineReference, PlantState, VehicleSim}
};
use util::{
    archive::{Archived, Archiver},
    logger::{logger_init, LevelFilter},
    module::State,
    session::Session
};

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Parameters of the closed-loop run.
#[derive(Debug, Clone, Deserialize)]
struct ExecParams {
    /// Number of control periods to run for
    num_ticks: usize,

    /// Initial state of the simulated vehicle
    initial_state: PlantState,

    /// Reference line to follow
    reference: LineReference
}

/// Per tick record of the run, archived to CSV.
#[derive(Debug, Clone, Copy, Serialize)]
struct TickRecord {
    tick: usize,
    time_s: f64,
    x_m: f64,
    y_m: f64,
    psi_rad: f64,
    v_ms: f64,
    dist_to_ref_m: f64,
    steer_rad: f64,
    throttle: f64,
    fallback: bool
}

/// Summary of the run, written as JSON into the session directory.
#[derive(Debug, Default, Serialize)]
struct RunSummary {
    num_ticks: usize,
    num_solve_failures: usize,
    num_fallback_brakes: usize,
    max_dist_to_ref_m: f64,
    final_dist_to_ref_m: f64,
    final_speed_ms: f64
}

// ---------------------------------------------------------------------------
// FUNCTIONS
// ---------------------------------------------------------------------------

/// Executable main function, entry point.
fn main() -> Result<(), Report> {

    // ---- EARLY INITIALISATION ----

    color_eyre::install()?;

    // Initialise session
    let session = Session::new(
        "mpc_exec",
        "sessions"
    ).wrap_err("Failed to create the session")?;

    // Initialise logger
    logger_init(LevelFilter::Debug, &session)
        .wrap_err("Failed to initialise logging")?;

    info!("MPC Closed-Loop Executable\n");
    info!("Session directory: {:?}\n", session.session_root);

    // ---- LOAD PARAMETERS ----

    let exec_params: ExecParams = util::params::load(
        "mpc_exec.toml"
    ).wrap_err("Could not load exec params")?;

    info!("Exec parameters loaded");

    // ---- INITIALISE MODULES ----

    info!("Initialising modules...");

    let mut ctrl = MpcCtrl::default();
    ctrl.init("mpc_ctrl.toml", &session)
        .wrap_err("Failed to initialise MpcCtrl")?;
    info!("{} init complete", <MpcCtrl as State>::NAME);

    let mut sim = VehicleSim::new(
        exec_params.initial_state,
        ctrl.params().lf_m,
        ctrl.params().dt_s
    );

    let mut arch_ticks = Archiver::from_path(&session, "mpc_exec/ticks.csv")
        .wrap_err("Failed to initialise the tick archive")?;

    info!("Module initialisation complete\n");

    // ---- MAIN LOOP ----

    info!("Begining main loop\n");

    let mut summary = RunSummary::default();
    let reference = exec_params.reference;

    for tick in 0..exec_params.num_ticks {

        // ---- DATA INPUT ----

        let coeffs = match reference.local_coeffs(&sim.state().pose()) {
            Some(c) => c,
            None => {
                warn!("Reference line is perpendicular to the vehicle, stopping the run");
                break
            }
        };

        let input = mpc_ctrl::InputData {
            state: sim.observe(&coeffs),
            coeffs
        };

        // ---- CONTROL ALGORITHM PROCESSING ----

        let (steer_rad, throttle, fallback) = match ctrl.proc(&input) {
            Ok((actuation, _)) => (actuation.steer_rad, actuation.throttle, false),
            Err(e @ MpcCtrlError::NonConvergence { .. }) => {
                warn!("MpcCtrl did not converge, reapplying the last command: {}", e);
                summary.num_solve_failures += 1;

                let ws = ctrl.warm_start();
                (ws.steer_rad, ws.throttle, true)
            },
            Err(e) => {
                warn!("Error during MpcCtrl processing, braking: {}", e);
                summary.num_solve_failures += 1;
                summary.num_fallback_brakes += 1;

                (0.0, ctrl.params().min_accel, true)
            }
        };

        // ---- PLANT ----

        sim.step(steer_rad, throttle);

        let s = *sim.state();
        let dist_to_ref_m = reference.distance(s.x_m, s.y_m);
        summary.max_dist_to_ref_m = summary.max_dist_to_ref_m.max(dist_to_ref_m);

        debug!(
            "Tick {}: pos ({:.3}, {:.3}) m, v {:.3} m/s, dist to ref {:.4} m",
            tick, s.x_m, s.y_m, s.v_ms, dist_to_ref_m
        );

        // ---- WRITE ARCHIVES ----

        if let Err(e) = ctrl.write() {
            warn!("Could not archive the MpcCtrl status report: {}", e);
        }

        let record = TickRecord {
            tick,
            time_s: sim.time_s(),
            x_m: s.x_m,
            y_m: s.y_m,
            psi_rad: s.psi_rad,
            v_ms: s.v_ms,
            dist_to_ref_m,
            steer_rad,
            throttle,
            fallback
        };
        if let Err(e) = arch_ticks.serialise(record) {
            warn!("Could not archive the tick record: {}", e);
        }

        summary.num_ticks += 1;
        summary.final_dist_to_ref_m = dist_to_ref_m;
        summary.final_speed_ms = s.v_ms;
    }

    // ---- SHUTDOWN ----

    info!("Run complete: {:#?}", summary);

    let mut summary_path = session.session_root.clone();
    summary_path.push("summary.json");
    let summary_file = File::create(&summary_path)
        .wrap_err("Failed to create the summary file")?;
    serde_json::to_writer_pretty(summary_file, &summary)
        .wrap_err("Failed to write the summary")?;

    info!("End of execution");

    Ok(())
}
