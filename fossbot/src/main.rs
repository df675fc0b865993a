//! FossBot executable entry point.
//!
//! Opens a robot on the selected backend and runs one of the library's routines on it:
//!
//!     - `drive`: drive forward for a few seconds, then stop
//!     - `self-test`: exercise every operation of the robot once
//!     - `follow-line`: follow a dark line until the process is interrupted
//!
//! Parameters are read from `$FOSSBOT_SW_ROOT/params/fossbot.toml` unless another file is given.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use color_eyre::{eyre::WrapErr, Report};
use log::{debug, info};
use std::path::PathBuf;
use structopt::StructOpt;

// Internal
use fossbot::{
    robot::{self, BackendKind},
    routines::{self, Routine},
    RobotParams,
};
use util::{
    host,
    logger::{logger_init, LevelFilter},
    session::Session,
};

// ---------------------------------------------------------------------------
// CONSTANTS
// ---------------------------------------------------------------------------

/// Parameter file loaded when none is given on the command line.
const DEFAULT_PARAMS_FILE: &str = "fossbot.toml";

/// Duration of the `drive` routine.
///
/// Units: seconds
const DRIVE_DURATION_S: f64 = 10.0;

/// Pause between the steps of the self test.
///
/// Units: seconds
const SELF_TEST_PAUSE_S: f64 = 1.0;

// ---------------------------------------------------------------------------
// STRUCTS
// ---------------------------------------------------------------------------

/// Run a routine on a FossBot.
#[derive(Debug, StructOpt)]
#[structopt(name = "fossbot_exec")]
struct Opts {
    /// The backend driving the robot: real, sim or dummy.
    #[structopt(short, long, default_value = "dummy")]
    backend: BackendKind,

    /// The routine to run: drive, self-test or follow-line.
    #[structopt(short, long, default_value = "self-test")]
    routine: Routine,

    /// Path to the parameter file, overriding the one in the software root.
    #[structopt(short, long, parse(from_os_str))]
    params: Option<PathBuf>,

    /// Minimum level of the messages logged.
    #[structopt(short, long, default_value = "info")]
    log_level: LevelFilter,
}

// ---------------------------------------------------------------------------
// FUNCTIONS
// ---------------------------------------------------------------------------

/// Executable main function, entry point.
fn main() -> Result<(), Report> {
    color_eyre::install()?;

    let opts = Opts::from_args();

    // ---- EARLY INITIALISATION ----

    // Initialise session
    let session =
        Session::new("fossbot_exec", "sessions").wrap_err("Failed to create the session")?;

    // Initialise logger
    logger_init(opts.log_level, &session).wrap_err("Failed to initialise logging")?;

    // Log information on this execution.
    info!("FossBot Executable\n");
    if let Some(hostname) = host::get_hostname() {
        info!("Running on: {}", hostname);
    }
    info!("Session directory: {:?}\n", session.session_root);
    debug!("Options: {:?}", opts);

    // ---- LOAD PARAMETERS ----

    let params: RobotParams = match opts.params {
        Some(ref path) => util::params::load_path(path),
        None => util::params::load(DEFAULT_PARAMS_FILE),
    }
    .wrap_err("Could not load the robot parameters")?;

    info!("Robot parameters loaded");

    // ---- OPEN THE ROBOT ----

    let mut robot = robot::open(opts.backend, params)
        .wrap_err_with(|| format!("Failed to open the {} FossBot", opts.backend))?;

    // ---- RUN THE ROUTINE ----

    info!("Running the {} routine", opts.routine);

    match opts.routine {
        Routine::Drive => routines::drive(robot.as_mut(), DRIVE_DURATION_S)
            .wrap_err("The drive routine failed")?,
        Routine::SelfTest => {
            routines::self_test(robot.as_mut(), SELF_TEST_PAUSE_S)
                .wrap_err("The self test failed")?;
        }
        Routine::FollowLine => routines::follow_line(robot.as_mut(), None)
            .wrap_err("Line following failed")?,
    }

    robot.exit().wrap_err("Failed to release the robot")?;

    info!("End of execution");

    Ok(())
}
