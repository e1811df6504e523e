//! Device-side end of the control channel.

use std::io::Write;
use std::net::{Shutdown, TcpStream, ToSocketAddrs};

use log::debug;
use testalyser_decode::{Frame, HANDSHAKE, STOP};

use crate::error::ClientError;

pub struct ControlClient {
    stream: TcpStream,
}

impl ControlClient {
    /// Connects and announces itself with a handshake frame.
    pub fn connect<A: ToSocketAddrs>(addr: A) -> Result<Self, ClientError> {
        let stream = TcpStream::connect(addr).map_err(ClientError::Connect)?;
        let peer = stream.peer_addr().map_err(ClientError::Connect)?;
        stream.set_nodelay(true).map_err(ClientError::Connect)?;
        let mut client = Self { stream };
        client.send_frame(HANDSHAKE)?;
        debug!("control client connected to {peer}");
        Ok(client)
    }

    pub fn send_frame(&mut self, frame: Frame) -> Result<(), ClientError> {
        self.stream
            .write_all(&frame.encode())
            .map_err(ClientError::Send)
    }

    /// Shortest and longest clock interval seen, in raw counter ticks
    /// (half the analyzer's sample resolution).
    pub fn report(&mut self, min_ticks: u64, max_ticks: u64) -> Result<(), ClientError> {
        self.send_frame(Frame::new(min_ticks, max_ticks))
    }

    pub fn request_stop(&mut self) -> Result<(), ClientError> {
        self.send_frame(STOP)
    }

    pub fn close(self) {
        let _ = self.stream.shutdown(Shutdown::Both);
    }
}
