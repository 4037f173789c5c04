//! Cyclic module interface
//!
//! A module is initialised once from its parameter file and then processed
//! once per control period by the executable. Its name keys the module's
//! archive directory within the session and prefixes the executable's log
//! records about it.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// Internal imports
use crate::session::Session;

// ---------------------------------------------------------------------------
// MODULE STATE
// ---------------------------------------------------------------------------

/// The module's internal state.
pub trait State {
    /// Name of the module, e.g. `mpc_ctrl`.
    const NAME: &'static str;

    /// Data required during initialisation, usually the parameter file name.
    type InitData;
    type InitError;

    /// Data required for cyclic processing.
    type InputData;
    /// Data produced by cyclic processing.
    type OutputData;
    /// Per period report, archived by the module.
    type StatusReport;
    type ProcError;

    /// Initialise the module, opening its archives in `session`.
    ///
    /// Calling `init` again resets the module.
    fn init(&mut self, init_data: Self::InitData, session: &Session)
        -> Result<(), Self::InitError>;

    /// Process one control period.
    ///
    /// On success returns the output data and the status report of this
    /// period. A failed period leaves the module ready for the next one.
    fn proc(&mut self, input_data: &Self::InputData)
        -> Result<(Self::OutputData, Self::StatusReport), Self::ProcError>;

    /// Path of one of the module's archives relative to the session root.
    fn archive_path(file_name: &str) -> String {
        format!("{}/{}", Self::NAME, file_name)
    }
}
