//! # Communications interface crate.
//!
//! Provides the communications interfaces between the FossBot software and the simulator.

// ------------------------------------------------------------------------------------------------
// MODULES
// ------------------------------------------------------------------------------------------------

/// Network module
pub mod net;

/// Request and reply definitions for the simulator remote API
pub mod sim;
