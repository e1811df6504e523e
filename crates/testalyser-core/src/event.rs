use std::fmt;
use std::net::SocketAddr;

use testalyser_decode::{DecodeError, DriftReport};

#[derive(Debug, Clone, PartialEq)]
pub enum ControlEvent {
    Listening(SocketAddr),
    Connected(SocketAddr),
    Handshake(SocketAddr),
    Drift { peer: SocketAddr, report: DriftReport },
    DecodeFailed { peer: SocketAddr, error: DecodeError },
    StopRequested(SocketAddr),
    Disconnected { peer: SocketAddr, reason: CloseReason },
    Shutdown,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CloseReason {
    PeerClosed,
    StopRequested,
    Shutdown,
    Failed(String),
}

impl fmt::Display for CloseReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CloseReason::PeerClosed => f.write_str("closed by peer"),
            CloseReason::StopRequested => f.write_str("stop requested"),
            CloseReason::Shutdown => f.write_str("server shutting down"),
            CloseReason::Failed(e) => write!(f, "i/o error: {e}"),
        }
    }
}
