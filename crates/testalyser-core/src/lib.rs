//! Core functionalities: control listener, device-side client, drift log.

pub mod capture;
pub mod client;
pub mod drift_log;
pub mod error;
pub mod event;
pub mod server;
pub mod shutdown;

pub use capture::CaptureControl;
pub use client::ControlClient;
pub use drift_log::{DriftEntry, DriftLog, DriftSummary};
pub use error::{ClientError, ServerError};
pub use event::{CloseReason, ControlEvent};
pub use server::{start, ControlServer, ServerConfig, ServerHandle};
pub use shutdown::{shutdown_pair, ShutdownSignal, ShutdownTrigger};
