// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use log::{debug, warn};

use super::{ConnectOptions, Transport, TransportError};
use comms_if::{
    net::{zmq, MonitoredSocket, SocketOptions},
    sim::{ClientId, ScriptCall, ScriptResult, SimReply, SimRequest, ALL_CLIENTS, INVALID_CLIENT_ID},
};

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// Transport reaching the simulator's remote API server through a ZMQ REQ socket carrying JSON
/// encoded [`SimRequest`]s.
pub struct ZmqTransport {
    ctx: zmq::Context,
    socket: Option<MonitoredSocket>,

    /// Set by `reset_all` when no socket is open yet, the reset is then sent as soon as the next
    /// session is started.
    reset_pending: bool,
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl ZmqTransport {
    pub fn new() -> Self {
        Self {
            ctx: zmq::Context::new(),
            socket: None,
            reset_pending: false,
        }
    }

    fn socket_options(opts: &ConnectOptions) -> SocketOptions {
        SocketOptions {
            block_on_first_connect: opts.wait_until_connected,
            connect_timeout: opts.timeout_ms,
            reconnect_ivl: opts.retry_ms,
            linger: 1,
            recv_timeout: opts.timeout_ms,
            send_timeout: opts.timeout_ms,
            req_correlate: true,
            req_relaxed: true,
            ..Default::default()
        }
    }

    /// Send a request and wait for its reply.
    fn request(&mut self, request: &SimRequest) -> Result<SimReply, TransportError> {
        let socket = self.socket.as_mut().ok_or(TransportError::NoSession)?;

        let req_str = request
            .to_json()
            .map_err(TransportError::SerializationError)?;

        socket
            .send(&req_str, 0)
            .map_err(TransportError::SendError)?;

        let msg = socket.recv_msg(0).map_err(TransportError::RecvError)?;
        let rep_str = msg.as_str().ok_or(TransportError::NonUtf8Reply)?;

        SimReply::from_json(rep_str).map_err(TransportError::DeserializeError)
    }
}

impl Default for ZmqTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl Transport for ZmqTransport {
    fn reset_all(&mut self) {
        if self.socket.is_none() {
            self.reset_pending = true;
            return;
        }

        match self.request(&SimRequest::Finish {
            client_id: ALL_CLIENTS,
        }) {
            Ok(SimReply::Finished) => debug!("All simulator sessions closed"),
            Ok(r) => warn!("Unexpected reply to session reset: {:?}", r),
            Err(e) => warn!("Could not reset simulator sessions: {}", e),
        }
        self.reset_pending = false;
    }

    fn start(&mut self, opts: &ConnectOptions) -> ClientId {
        let socket = match MonitoredSocket::new(
            &self.ctx,
            zmq::REQ,
            Self::socket_options(opts),
            &opts.endpoint(),
        ) {
            Ok(s) => s,
            Err(e) => {
                warn!("Could not connect to {}: {}", opts.endpoint(), e);
                return INVALID_CLIENT_ID;
            }
        };
        self.socket = Some(socket);

        if self.reset_pending {
            self.reset_all();
        }

        let request = SimRequest::Start {
            wait_until_connected: opts.wait_until_connected,
            do_not_reconnect: opts.do_not_reconnect,
            timeout_ms: opts.timeout_ms,
            retry_ms: opts.retry_ms,
        };

        match self.request(&request) {
            Ok(SimReply::Started { client_id }) => client_id,
            Ok(r) => {
                warn!("Unexpected reply to session start: {:?}", r);
                INVALID_CLIENT_ID
            }
            Err(e) => {
                warn!("Could not start a simulator session: {}", e);
                INVALID_CLIENT_ID
            }
        }
    }

    fn finish(&mut self, client_id: ClientId) {
        match self.request(&SimRequest::Finish { client_id }) {
            Ok(SimReply::Finished) => (),
            Ok(r) => warn!("Unexpected reply to session finish: {:?}", r),
            Err(e) => warn!("Could not finish simulator session {}: {}", client_id, e),
        }
        self.socket = None;
    }

    fn call_script(&mut self, call: &ScriptCall) -> Result<ScriptResult, TransportError> {
        match self.request(&SimRequest::CallScript(call.clone()))? {
            SimReply::ScriptResult(r) => Ok(r),
            r => Err(TransportError::UnexpectedReply(format!("{:?}", r))),
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_socket_options_follow_connect_options() {
        let opts = ConnectOptions {
            timeout_ms: 1234,
            retry_ms: 7,
            ..Default::default()
        };
        let so = ZmqTransport::socket_options(&opts);

        assert_eq!(so.connect_timeout, 1234);
        assert_eq!(so.reconnect_ivl, 7);
        assert!(so.block_on_first_connect);
        assert!(so.req_correlate && so.req_relaxed);
    }

    #[test]
    fn test_calls_without_session_fail() {
        let mut t = ZmqTransport::new();
        let call = ScriptCall::new(0, "left_motor", "stop");

        assert!(matches!(
            t.call_script(&call),
            Err(TransportError::NoSession)
        ));
    }
}
