use std::io;

use testalyser_decode::RateError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("cannot resolve {addr}: {source}")]
    Resolve {
        addr: String,
        #[source]
        source: io::Error,
    },
    #[error("failed to bind {addr}: {source}")]
    Bind {
        addr: String,
        #[source]
        source: io::Error,
    },
    #[error("accept failed: {0}")]
    Accept(#[source] io::Error),
    #[error("invalid timing configuration: {0}")]
    Rate(#[from] RateError),
    #[error("failed to spawn listener thread: {0}")]
    Spawn(#[source] io::Error),
    #[error("listener thread panicked")]
    Panicked,
}

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("connection to control server failed: {0}")]
    Connect(#[source] io::Error),
    #[error("failed to send frame: {0}")]
    Send(#[source] io::Error),
}
