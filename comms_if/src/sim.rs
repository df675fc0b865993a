//! # Simulator remote API messages
//!
//! The simulator runs a remote API server which accepts JSON encoded [`SimRequest`]s on a REQ/REP
//! socket and answers each one with exactly one [`SimReply`]. A client first opens a session with
//! [`SimRequest::Start`], which assigns it a client id, and then addresses every scripted call to
//! that id. Scripted calls name an object in the simulated scene and a function of the script
//! attached to it.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use serde::{Deserialize, Serialize};

// ------------------------------------------------------------------------------------------------
// CONSTANTS
// ------------------------------------------------------------------------------------------------

/// Client id sentinel returned by the server when a session could not be opened.
pub const INVALID_CLIENT_ID: ClientId = -1;

/// Client id which addresses every session at once, used to close all sessions.
pub const ALL_CLIENTS: ClientId = -1;

// ------------------------------------------------------------------------------------------------
// TYPES
// ------------------------------------------------------------------------------------------------

/// Identifier of a session with the simulator.
pub type ClientId = i32;

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// A call to a function of a script attached to an object in the scene.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct ScriptCall {
    /// The session the call is made within
    pub client_id: ClientId,

    /// Name of the scene object the script is attached to
    pub target: String,

    /// Name of the script function to call
    pub function: String,

    #[serde(default)]
    pub ints: Vec<i32>,

    #[serde(default)]
    pub floats: Vec<f64>,

    #[serde(default)]
    pub strings: Vec<String>,

    #[serde(default)]
    pub buffer: Vec<u8>,
}

/// Result of a scripted call.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
pub struct ScriptResult {
    /// Return code of the remote API, [`ReturnCode::OK`] when the call was delivered and executed.
    pub return_code: ReturnCode,

    #[serde(default)]
    pub ints: Vec<i32>,

    #[serde(default)]
    pub floats: Vec<f64>,

    #[serde(default)]
    pub strings: Vec<String>,

    #[serde(default)]
    pub buffer: Vec<u8>,
}

/// Remote API return code.
///
/// The code is a set of flags, a value of zero means the call succeeded.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
#[serde(transparent)]
pub struct ReturnCode(pub i32);

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

/// Requests sent by the FossBot to the simulator.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub enum SimRequest {
    /// Open a new session.
    Start {
        wait_until_connected: bool,
        do_not_reconnect: bool,
        timeout_ms: i32,
        retry_ms: i32,
    },

    /// Close the session with the given id, or all sessions if the id is [`ALL_CLIENTS`].
    Finish { client_id: ClientId },

    /// Call a script function.
    CallScript(ScriptCall),
}

/// Replies sent by the simulator.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub enum SimReply {
    /// A session was opened, or not if the id is negative.
    Started { client_id: ClientId },

    /// The session(s) were closed.
    Finished,

    /// Result of a scripted call.
    ScriptResult(ScriptResult),
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl ReturnCode {
    pub const OK: ReturnCode = ReturnCode(0);
    pub const NO_VALUE: ReturnCode = ReturnCode(1);
    pub const TIMEOUT: ReturnCode = ReturnCode(2);
    pub const ILLEGAL_OPMODE: ReturnCode = ReturnCode(4);
    pub const REMOTE_ERROR: ReturnCode = ReturnCode(8);
    pub const SPLIT_PROGRESS: ReturnCode = ReturnCode(16);
    pub const LOCAL_ERROR: ReturnCode = ReturnCode(32);
    pub const INITIALIZE_ERROR: ReturnCode = ReturnCode(64);

    /// True if the call was delivered and executed by the server.
    pub fn is_ok(&self) -> bool {
        *self == Self::OK
    }
}

impl std::fmt::Display for ReturnCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match *self {
            Self::OK => "ok",
            Self::NO_VALUE => "no value",
            Self::TIMEOUT => "timeout",
            Self::ILLEGAL_OPMODE => "illegal opmode",
            Self::REMOTE_ERROR => "remote error",
            Self::SPLIT_PROGRESS => "split progress",
            Self::LOCAL_ERROR => "local error",
            Self::INITIALIZE_ERROR => "initialize error",
            _ => "combined flags",
        };
        write!(f, "{} ({})", name, self.0)
    }
}

impl ScriptCall {
    /// Build a call with no arguments.
    pub fn new(client_id: ClientId, target: &str, function: &str) -> Self {
        Self {
            client_id,
            target: target.into(),
            function: function.into(),
            ints: Vec::new(),
            floats: Vec::new(),
            strings: Vec::new(),
            buffer: Vec::new(),
        }
    }

    /// Add string arguments to the call.
    pub fn with_strings<S: Into<String>>(mut self, strings: impl IntoIterator<Item = S>) -> Self {
        self.strings.extend(strings.into_iter().map(Into::into));
        self
    }

    /// Add integer arguments to the call.
    pub fn with_ints(mut self, ints: impl IntoIterator<Item = i32>) -> Self {
        self.ints.extend(ints);
        self
    }
}

impl SimRequest {
    /// Serialize the request to a JSON string.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

impl SimReply {
    /// Parse a reply from a JSON string.
    pub fn from_json(json_str: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json_str)
    }
}
