//! Host platform utility functions

use std::path::PathBuf;

/// Environment variable pointing at the root of the software tree.
pub const SW_ROOT_ENV_VAR: &str = "FOSSBOT_SW_ROOT";

/// Get the root directory of the software tree.
///
/// The root is read from the `FOSSBOT_SW_ROOT` environment variable.
pub fn get_fossbot_sw_root() -> Result<PathBuf, std::env::VarError> {
    std::env::var(SW_ROOT_ENV_VAR).map(PathBuf::from)
}

/// Name of the machine the software is running on, if it can be determined.
pub fn get_hostname() -> Option<String> {
    std::fs::read_to_string("/etc/hostname")
        .ok()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}
