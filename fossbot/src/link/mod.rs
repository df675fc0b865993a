//! # Session Link
//!
//! The session link is the remote procedure channel between the robot and the simulator. It owns
//! the session with the simulator's remote API and moves through the states
//! `Disconnected -> Connecting -> Connected -> Closed`.
//!
//! Ordinary capability calls go through [`SessionLink::call`], which reports any failure. The
//! simulator state queries go through [`SessionLink::call_until_delivered`], which retries transport
//! failures forever and accepts whatever result is eventually delivered.

// ------------------------------------------------------------------------------------------------
// MODULES
// ------------------------------------------------------------------------------------------------

/// [`Transport`] over a ZMQ REQ socket.
pub mod zmq_transport;

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use log::{debug, info, warn};
use std::{cell::RefCell, rc::Rc};

pub use comms_if::sim::{ClientId, ReturnCode, ScriptCall, ScriptResult, INVALID_CLIENT_ID};
pub use zmq_transport::ZmqTransport;

// ------------------------------------------------------------------------------------------------
// CONSTANTS
// ------------------------------------------------------------------------------------------------

/// Default host of the simulator's remote API server.
pub const DEFAULT_HOST: &str = "127.0.0.1";

/// Default port of the simulator's remote API server.
pub const DEFAULT_PORT: u16 = 19999;

/// Default handshake timeout.
pub const DEFAULT_TIMEOUT_MS: i32 = 5000;

/// Default interval between connection retries.
pub const DEFAULT_RETRY_MS: i32 = 5;

/// Number of failed deliveries between two warnings while retrying.
const RETRY_WARN_INTERVAL: u64 = 100;

// ------------------------------------------------------------------------------------------------
// TYPES
// ------------------------------------------------------------------------------------------------

/// A session link shared between the simulated capabilities of one robot.
pub type SharedLink = Rc<RefCell<SessionLink>>;

// ------------------------------------------------------------------------------------------------
// TRAITS
// ------------------------------------------------------------------------------------------------

/// Transport used by the session link to reach the simulator.
pub trait Transport {
    /// Close any session previously opened through this transport.
    ///
    /// Must be idempotent.
    fn reset_all(&mut self);

    /// Open a new session, returning its id or [`INVALID_CLIENT_ID`] on failure.
    fn start(&mut self, opts: &ConnectOptions) -> ClientId;

    /// Close the given session.
    fn finish(&mut self, client_id: ClientId);

    /// Perform a scripted call.
    ///
    /// An `Err` means the call could not be delivered or its result could not be received.
    fn call_script(&mut self, call: &ScriptCall) -> Result<ScriptResult, TransportError>;
}

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// Options used when opening a session.
#[derive(Debug, Clone, PartialEq)]
pub struct ConnectOptions {
    pub host: String,
    pub port: u16,
    pub wait_until_connected: bool,
    pub do_not_reconnect: bool,

    /// Units: milliseconds
    pub timeout_ms: i32,

    /// Units: milliseconds
    pub retry_ms: i32,
}

/// The session with the simulator.
pub struct SessionLink {
    transport: Box<dyn Transport>,
    opts: ConnectOptions,
    status: LinkStatus,
    client_id: Option<ClientId>,
}

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

/// Lifecycle state of the session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkStatus {
    Disconnected,
    Connecting,
    Connected,
    Closed,
}

#[derive(Debug, thiserror::Error)]
pub enum LinkError {
    #[error("Failed connecting to the remote API server at {host}:{port}")]
    ConnectFailed { host: String, port: u16 },

    #[error("The session link is not connected (status {0:?})")]
    NotConnected(LinkStatus),

    #[error("The session link has been closed and cannot be reopened")]
    Closed,

    #[error("Scripted call {function} on {target} could not be delivered: {source}")]
    Transport {
        target: String,
        function: String,
        source: TransportError,
    },

    #[error("Scripted call {function} on {target} failed with return code {code}")]
    Remote {
        target: String,
        function: String,
        code: ReturnCode,
    },

    #[error("Scripted call {function} on {target} returned no {expected} value")]
    MissingValue {
        target: String,
        function: String,
        expected: &'static str,
    },
}

#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("Socket error: {0}")]
    SocketError(comms_if::net::MonitoredSocketError),

    #[error("No session is open on the transport")]
    NoSession,

    #[error("Could not send the request to the simulator: {0}")]
    SendError(comms_if::net::zmq::Error),

    #[error("Could not recieve a reply from the simulator: {0}")]
    RecvError(comms_if::net::zmq::Error),

    #[error("Could not serialize the request: {0}")]
    SerializationError(serde_json::Error),

    #[error("Could not deserialize the reply from the simulator: {0}")]
    DeserializeError(serde_json::Error),

    #[error("The simulator sent a reply which was not valid UTF-8")]
    NonUtf8Reply,

    #[error("Unexpected reply from the simulator: {0}")]
    UnexpectedReply(String),
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl Default for ConnectOptions {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.into(),
            port: DEFAULT_PORT,
            wait_until_connected: true,
            do_not_reconnect: true,
            timeout_ms: DEFAULT_TIMEOUT_MS,
            retry_ms: DEFAULT_RETRY_MS,
        }
    }
}

impl ConnectOptions {
    /// The zmq endpoint of the simulator.
    pub fn endpoint(&self) -> String {
        format!("tcp://{}:{}", self.host, self.port)
    }
}

impl SessionLink {
    /// Create a disconnected link.
    pub fn new(transport: Box<dyn Transport>, opts: ConnectOptions) -> Self {
        Self {
            transport,
            opts,
            status: LinkStatus::Disconnected,
            client_id: None,
        }
    }

    /// Create a link and connect it.
    pub fn open(transport: Box<dyn Transport>, opts: ConnectOptions) -> Result<Self, LinkError> {
        let mut link = Self::new(transport, opts);
        link.connect()?;
        Ok(link)
    }

    /// Open the session.
    ///
    /// Any session previously opened through the transport is closed first. Connecting an already
    /// connected link returns the current id.
    pub fn connect(&mut self) -> Result<ClientId, LinkError> {
        match self.status {
            LinkStatus::Connected => {
                if let Some(id) = self.client_id {
                    return Ok(id);
                }
            }
            LinkStatus::Closed => return Err(LinkError::Closed),
            _ => (),
        }

        info!("Connecting to the simulator at {}", self.opts.endpoint());

        self.transport.reset_all();
        self.status = LinkStatus::Connecting;

        let id = self.transport.start(&self.opts);
        if id < 0 {
            self.status = LinkStatus::Disconnected;
            warn!("Failed connecting to remote API server");
            return Err(LinkError::ConnectFailed {
                host: self.opts.host.clone(),
                port: self.opts.port,
            });
        }

        self.client_id = Some(id);
        self.status = LinkStatus::Connected;
        info!("Connected to remote API server (client id {})", id);

        Ok(id)
    }

    /// Close the session.
    ///
    /// Only the first call after connecting closes anything, later calls do nothing. Returns
    /// whether a session was closed.
    pub fn close(&mut self) -> bool {
        match (self.status, self.client_id.take()) {
            (LinkStatus::Connected, Some(id)) => {
                self.transport.finish(id);
                self.status = LinkStatus::Closed;
                info!("Session {} with the simulator closed", id);
                true
            }
            (status, _) => {
                debug!("Session close requested in status {:?}, ignoring", status);
                if status != LinkStatus::Closed {
                    self.status = LinkStatus::Closed;
                }
                false
            }
        }
    }

    /// Perform a single scripted call with string arguments.
    ///
    /// Fails if the call cannot be delivered or the server reports an error.
    pub fn call(
        &mut self,
        target: &str,
        function: &str,
        strings: &[&str],
    ) -> Result<ScriptResult, LinkError> {
        self.call_args(target, function, &[], strings)
    }

    /// Perform a single scripted call with integer and string arguments.
    pub fn call_args(
        &mut self,
        target: &str,
        function: &str,
        ints: &[i32],
        strings: &[&str],
    ) -> Result<ScriptResult, LinkError> {
        let call = self
            .build_call(target, function, strings)?
            .with_ints(ints.iter().copied());

        let result = self
            .transport
            .call_script(&call)
            .map_err(|source| LinkError::Transport {
                target: target.into(),
                function: function.into(),
                source,
            })?;

        if !result.return_code.is_ok() {
            return Err(LinkError::Remote {
                target: target.into(),
                function: function.into(),
                code: result.return_code,
            });
        }

        Ok(result)
    }

    /// Perform a scripted call, retrying until it is delivered.
    ///
    /// Transport failures and non-OK return codes are retried immediately and without limit, so
    /// an unreachable simulator blocks the caller forever. A delivered result is returned as is,
    /// even if it is empty. Only fails if the link is not connected.
    pub fn call_until_delivered(
        &mut self,
        target: &str,
        function: &str,
        strings: &[&str],
    ) -> Result<ScriptResult, LinkError> {
        let call = self.build_call(target, function, strings)?;
        let mut failures: u64 = 0;

        loop {
            match self.transport.call_script(&call) {
                Ok(r) if r.return_code.is_ok() => {
                    if failures > 0 {
                        debug!(
                            "{} on {} delivered after {} retries",
                            function, target, failures
                        );
                    }
                    return Ok(r);
                }
                Ok(r) => {
                    if failures % RETRY_WARN_INTERVAL == 0 {
                        warn!(
                            "{} on {} returned {}, retrying",
                            function, target, r.return_code
                        );
                    }
                }
                Err(e) => {
                    if failures % RETRY_WARN_INTERVAL == 0 {
                        warn!("{} on {} not delivered ({}), retrying", function, target, e);
                    }
                }
            }
            failures = failures.wrapping_add(1);
        }
    }

    pub fn status(&self) -> LinkStatus {
        self.status
    }

    /// Id of the open session, if connected.
    pub fn client_id(&self) -> Option<ClientId> {
        self.client_id
    }

    pub fn options(&self) -> &ConnectOptions {
        &self.opts
    }

    fn build_call(
        &self,
        target: &str,
        function: &str,
        strings: &[&str],
    ) -> Result<ScriptCall, LinkError> {
        match (self.status, self.client_id) {
            (LinkStatus::Connected, Some(id)) => Ok(ScriptCall::new(id, target, function)
                .with_strings(strings.iter().copied())),
            (status, _) => Err(LinkError::NotConnected(status)),
        }
    }
}

impl Drop for SessionLink {
    fn drop(&mut self) {
        self.close();
    }
}

/// Typed access to the values returned by a scripted call.
pub trait ScriptResultExt {
    /// First integer of the result.
    fn first_int(&self, target: &str, function: &str) -> Result<i32, LinkError>;

    /// First float of the result.
    fn first_float(&self, target: &str, function: &str) -> Result<f64, LinkError>;
}

impl ScriptResultExt for ScriptResult {
    fn first_int(&self, target: &str, function: &str) -> Result<i32, LinkError> {
        self.ints.first().copied().ok_or_else(|| LinkError::MissingValue {
            target: target.into(),
            function: function.into(),
            expected: "integer",
        })
    }

    fn first_float(&self, target: &str, function: &str) -> Result<f64, LinkError> {
        self.floats.first().copied().ok_or_else(|| LinkError::MissingValue {
            target: target.into(),
            function: function.into(),
            expected: "float",
        })
    }
}

// ------------------------------------------------------------------------------------------------
// TESTS
// ------------------------------------------------------------------------------------------------

#[cfg(test)]
pub(crate) mod test {
    use super::*;
    use std::collections::VecDeque;

    /// Everything the fake transport has been asked to do, and the outcomes it will replay.
    #[derive(Debug, Default)]
    pub(crate) struct TransportLog {
        pub resets: usize,
        pub starts: usize,
        pub finished: Vec<ClientId>,
        pub calls: Vec<ScriptCall>,

        /// Replayed in order by `call_script`, an empty OK result is returned once exhausted
        pub outcomes: VecDeque<Result<ScriptResult, TransportError>>,
    }

    /// In-memory transport replaying scripted outcomes.
    pub(crate) struct FakeTransport {
        log: Rc<RefCell<TransportLog>>,
        start_id: ClientId,
    }

    impl FakeTransport {
        pub fn new(start_id: ClientId) -> (Self, Rc<RefCell<TransportLog>>) {
            let log = Rc::new(RefCell::new(TransportLog::default()));
            (
                Self {
                    log: log.clone(),
                    start_id,
                },
                log,
            )
        }
    }

    impl TransportLog {
        pub fn push(&mut self, outcome: Result<ScriptResult, TransportError>) {
            self.outcomes.push_back(outcome);
        }
    }

    impl Transport for FakeTransport {
        fn reset_all(&mut self) {
            self.log.borrow_mut().resets += 1;
        }

        fn start(&mut self, _opts: &ConnectOptions) -> ClientId {
            self.log.borrow_mut().starts += 1;
            self.start_id
        }

        fn finish(&mut self, client_id: ClientId) {
            self.log.borrow_mut().finished.push(client_id);
        }

        fn call_script(&mut self, call: &ScriptCall) -> Result<ScriptResult, TransportError> {
            let mut log = self.log.borrow_mut();
            log.calls.push(call.clone());
            log.outcomes
                .pop_front()
                .unwrap_or_else(|| Ok(ScriptResult::default()))
        }
    }

    pub(crate) fn ints(v: &[i32]) -> ScriptResult {
        ScriptResult {
            ints: v.to_vec(),
            ..Default::default()
        }
    }

    #[test]
    fn test_connect_and_close_once() {
        let (t, log) = FakeTransport::new(7);
        let mut link = SessionLink::open(Box::new(t), ConnectOptions::default()).unwrap();

        assert_eq!(link.status(), LinkStatus::Connected);
        assert_eq!(link.client_id(), Some(7));
        assert_eq!(log.borrow().resets, 1);

        assert!(link.close());
        assert!(!link.close());
        drop(link);

        assert_eq!(log.borrow().finished, vec![7]);
    }

    #[test]
    fn test_connect_failure_sentinel() {
        let (t, log) = FakeTransport::new(INVALID_CLIENT_ID);
        let mut link = SessionLink::new(Box::new(t), ConnectOptions::default());

        match link.connect() {
            Err(LinkError::ConnectFailed { host, port }) => {
                assert_eq!(host, DEFAULT_HOST);
                assert_eq!(port, DEFAULT_PORT);
            }
            r => panic!("Expected connection failure, got {:?}", r),
        }
        assert_eq!(link.status(), LinkStatus::Disconnected);

        // Nothing was opened so nothing is finished on drop
        drop(link);
        assert!(log.borrow().finished.is_empty());
    }

    #[test]
    fn test_closed_link_rejects_calls() {
        let (t, _log) = FakeTransport::new(0);
        let mut link = SessionLink::open(Box::new(t), ConnectOptions::default()).unwrap();
        link.close();

        assert!(matches!(
            link.call("fossbot", "check_orientation", &[]),
            Err(LinkError::NotConnected(LinkStatus::Closed))
        ));
        assert!(matches!(link.connect(), Err(LinkError::Closed)));
    }

    #[test]
    fn test_call_reports_failures() {
        let (t, log) = FakeTransport::new(0);
        log.borrow_mut().push(Err(TransportError::NoSession));
        log.borrow_mut().push(Ok(ScriptResult {
            return_code: ReturnCode::REMOTE_ERROR,
            ..Default::default()
        }));
        let mut link = SessionLink::open(Box::new(t), ConnectOptions::default()).unwrap();

        assert!(matches!(
            link.call("left_motor", "stop", &[]),
            Err(LinkError::Transport { .. })
        ));
        assert!(matches!(
            link.call("left_motor", "stop", &[]),
            Err(LinkError::Remote {
                code: ReturnCode::REMOTE_ERROR,
                ..
            })
        ));
        assert!(link.call("left_motor", "stop", &[]).is_ok());
    }

    #[test]
    fn test_call_until_delivered_retries_transport_only() {
        let (t, log) = FakeTransport::new(2);
        for _ in 0..5 {
            log.borrow_mut().push(Err(TransportError::NoSession));
        }
        log.borrow_mut().push(Ok(ScriptResult {
            return_code: ReturnCode::TIMEOUT,
            ..Default::default()
        }));
        // Delivered but empty, accepted as is
        log.borrow_mut().push(Ok(ScriptResult::default()));
        log.borrow_mut().push(Ok(ints(&[1])));
        let mut link = SessionLink::open(Box::new(t), ConnectOptions::default()).unwrap();

        let r = link
            .call_until_delivered("fossbot", "check_in_bounds", &["/Floor"])
            .unwrap();
        assert!(r.ints.is_empty());
        let log = log.borrow();
        assert_eq!(log.calls.len(), 7);

        let call = &log.calls[0];
        assert_eq!(call.client_id, 2);
        assert_eq!(call.strings, vec!["/Floor".to_string()]);
    }

    #[test]
    fn test_missing_values() {
        let r = ints(&[]);
        assert!(matches!(
            r.first_int("a", "b"),
            Err(LinkError::MissingValue { .. })
        ));
        assert!(r.first_float("a", "b").is_err());
        assert_eq!(ints(&[4]).first_int("a", "b").unwrap(), 4);
    }
}
