//! # FossBot library
//!
//! Hardware abstraction for the FossBot differential drive educational robot. Application code is
//! written once against the [`Robot`] trait and runs unmodified on the physical robot, on a
//! robot in the simulator or on a dummy robot producing synthetic readings.

// ------------------------------------------------------------------------------------------------
// MODULES
// ------------------------------------------------------------------------------------------------

/// Sound playback
pub mod audio;

/// Capability traits and their shared value types
pub mod control;

/// Dummy backend - synthetic readings, no I/O
pub mod dummy;

/// Session link to the simulator's remote API
pub mod link;

/// Motion controller - turns distance and rotation commands into polling loops
pub mod motion;

/// Robot parameters
pub mod params;

/// Real backend - the physical robot on a Raspberry Pi
pub mod real;

/// The robot interface shared by every backend
pub mod robot;

/// Ready made behaviours
pub mod routines;

/// Simulated backend - a robot in the simulator
pub mod sim;

#[cfg(test)]
mod testing;

// ------------------------------------------------------------------------------------------------
// EXPORTS
// ------------------------------------------------------------------------------------------------

pub use control::{Axis, Color, Direction};
pub use motion::{CancelToken, MotionGuard};
pub use params::RobotParams;
pub use robot::{open, Backend, BackendKind, FossBot, Robot, RobotError};
