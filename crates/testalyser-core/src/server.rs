use std::io::{self, Read};
use std::net::{SocketAddr, TcpListener, TcpStream, ToSocketAddrs};
use std::ops::ControlFlow;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crossbeam_channel::Sender;
use log::{debug, info, trace, warn};
use socket2::{Domain, Protocol, Socket, Type};
use testalyser_decode::{
    classify, ClockFrequency, DriftCalculator, Frame, FrameAssembler, Message, SampleRate,
};

use crate::capture::CaptureControl;
use crate::error::ServerError;
use crate::event::{CloseReason, ControlEvent};
use crate::shutdown::ShutdownSignal;

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Wait between accept attempts, also used as the read timeout on
    /// accepted connections.
    pub poll_interval: Duration,
    pub sample_rate: SampleRate,
    pub clock_frequency: ClockFrequency,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 65432,
            poll_interval: Duration::from_secs(1),
            sample_rate: SampleRate::default(),
            clock_frequency: ClockFrequency::default(),
        }
    }
}

impl ServerConfig {
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Listens for control frames from the device under test.
///
/// Each accepted connection is read frame by frame on its own thread until
/// the peer closes, a stop frame arrives, or shutdown is signalled.
pub struct ControlServer {
    listener: TcpListener,
    local_addr: SocketAddr,
    shared: Shared,
}

/// What every connection thread needs from the server.
#[derive(Clone)]
struct Shared {
    poll_interval: Duration,
    calc: DriftCalculator,
    capture: Arc<dyn CaptureControl>,
    shutdown: ShutdownSignal,
    /// Set when the accept loop dies so handlers wind down with it.
    closing: Arc<AtomicBool>,
    events: Option<Sender<ControlEvent>>,
}

impl Shared {
    fn stopping(&self) -> bool {
        self.shutdown.is_triggered() || self.closing.load(Ordering::Acquire)
    }

    fn emit(&self, evt: ControlEvent) {
        if let Some(tx) = &self.events {
            let _ = tx.send(evt);
        }
    }
}

impl ControlServer {
    pub fn bind(
        cfg: &ServerConfig,
        capture: Arc<dyn CaptureControl>,
        shutdown: ShutdownSignal,
    ) -> Result<Self, ServerError> {
        let calc = DriftCalculator::new(cfg.sample_rate, cfg.clock_frequency)?;
        let addr = resolve(cfg)?;
        let listener = listen(addr).map_err(|source| ServerError::Bind {
            addr: cfg.addr(),
            source,
        })?;
        let local_addr = listener.local_addr().map_err(|source| ServerError::Bind {
            addr: cfg.addr(),
            source,
        })?;

        Ok(Self {
            listener,
            local_addr,
            shared: Shared {
                poll_interval: cfg.poll_interval,
                calc,
                capture,
                shutdown,
                closing: Arc::new(AtomicBool::new(false)),
                events: None,
            },
        })
    }

    pub fn with_events(mut self, tx: Sender<ControlEvent>) -> Self {
        self.shared.events = Some(tx);
        self
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Accept loop. Returns once shutdown is signalled and every connection
    /// thread has finished, or with an error if the listening socket fails.
    pub fn run(self) -> Result<(), ServerError> {
        info!("control server listening on {}", self.local_addr);
        self.shared.emit(ControlEvent::Listening(self.local_addr));

        let mut workers: Vec<JoinHandle<()>> = Vec::new();
        let result = self.accept_loop(&mut workers);
        if result.is_err() {
            self.shared.closing.store(true, Ordering::Release);
        }

        for worker in workers {
            if worker.join().is_err() {
                warn!("connection handler panicked");
            }
        }

        if result.is_ok() {
            info!("control server on {} shut down", self.local_addr);
            self.shared.emit(ControlEvent::Shutdown);
        }
        result
    }

    fn accept_loop(&self, workers: &mut Vec<JoinHandle<()>>) -> Result<(), ServerError> {
        while !self.shared.shutdown.is_triggered() {
            match self.listener.accept() {
                Ok((stream, peer)) => {
                    workers.retain(|w| !w.is_finished());
                    workers.extend(self.serve(stream, peer));
                }
                Err(ref e) if e.kind() == io::ErrorKind::WouldBlock => {
                    thread::sleep(self.shared.poll_interval);
                }
                Err(ref e) if e.kind() == io::ErrorKind::Interrupted => {}
                Err(e) => return Err(ServerError::Accept(e)),
            }
        }
        Ok(())
    }

    pub fn spawn(self) -> Result<ServerHandle, ServerError> {
        let thread = thread::Builder::new()
            .name("control-server".to_string())
            .spawn(move || self.run())
            .map_err(ServerError::Spawn)?;
        Ok(ServerHandle { thread })
    }

    fn serve(&self, stream: TcpStream, peer: SocketAddr) -> Option<JoinHandle<()>> {
        info!("connected by {peer}");
        self.shared.emit(ControlEvent::Connected(peer));

        let shared = self.shared.clone();
        let spawned = thread::Builder::new()
            .name(format!("control-conn-{peer}"))
            .spawn(move || handle_connection(stream, peer, &shared));
        match spawned {
            Ok(worker) => Some(worker),
            Err(e) => {
                warn!("connection with {peer} failed: cannot spawn handler: {e}");
                self.shared.emit(ControlEvent::Disconnected {
                    peer,
                    reason: CloseReason::Failed(e.to_string()),
                });
                None
            }
        }
    }
}

fn handle_connection(stream: TcpStream, peer: SocketAddr, shared: &Shared) {
    let reason = match Connection::open(stream, peer, shared) {
        Ok(conn) => conn.run(),
        Err(e) => CloseReason::Failed(e.to_string()),
    };

    match &reason {
        CloseReason::Failed(e) => warn!("connection with {peer} failed: {e}"),
        other => info!("connection with {peer} ended: {other}"),
    }
    shared.emit(ControlEvent::Disconnected { peer, reason });
}

/// Bind and serve until shutdown, on the calling thread.
pub fn start(
    cfg: &ServerConfig,
    capture: Arc<dyn CaptureControl>,
    shutdown: ShutdownSignal,
) -> Result<(), ServerError> {
    ControlServer::bind(cfg, capture, shutdown)?.run()
}

pub struct ServerHandle {
    thread: JoinHandle<Result<(), ServerError>>,
}

impl ServerHandle {
    pub fn join(self) -> Result<(), ServerError> {
        self.thread.join().map_err(|_| ServerError::Panicked)?
    }
}

struct Connection<'a> {
    stream: TcpStream,
    peer: SocketAddr,
    asm: FrameAssembler,
    shared: &'a Shared,
}

impl<'a> Connection<'a> {
    fn open(stream: TcpStream, peer: SocketAddr, shared: &'a Shared) -> io::Result<Self> {
        // Accepted sockets inherit O_NONBLOCK on some platforms.
        stream.set_nonblocking(false)?;
        stream.set_read_timeout(Some(shared.poll_interval))?;
        Ok(Self {
            stream,
            peer,
            asm: FrameAssembler::new(),
            shared,
        })
    }

    fn run(mut self) -> CloseReason {
        loop {
            match self.stream.read(self.asm.spare()) {
                Ok(0) => {
                    if self.asm.held() > 0 {
                        debug!("{}: dropping {} bytes of partial frame", self.peer, self.asm.held());
                    }
                    return CloseReason::PeerClosed;
                }
                Ok(n) => {
                    trace!("{}: read {n} bytes, {} held", self.peer, self.asm.held() + n);
                    let Some(result) = self.asm.advance(n) else {
                        continue;
                    };
                    match result {
                        Ok(frame) => {
                            if self.dispatch(frame).is_break() {
                                return CloseReason::StopRequested;
                            }
                        }
                        // Only full buffers are decoded, so this guards a
                        // length invariant rather than handling peer input.
                        Err(error) => {
                            warn!("{}: deserialization error: {error}", self.peer);
                            self.shared.emit(ControlEvent::DecodeFailed {
                                peer: self.peer,
                                error,
                            });
                        }
                    }
                }
                Err(ref e)
                    if e.kind() == io::ErrorKind::WouldBlock
                        || e.kind() == io::ErrorKind::TimedOut =>
                {
                    if self.shared.stopping() {
                        return CloseReason::Shutdown;
                    }
                }
                Err(ref e) if e.kind() == io::ErrorKind::Interrupted => {}
                Err(e) => return CloseReason::Failed(e.to_string()),
            }
        }
    }

    fn dispatch(&self, frame: Frame) -> ControlFlow<()> {
        trace!("{}: frame {}", self.peer, hex::encode(frame.encode()));
        let peer = self.peer;
        match classify(frame) {
            Message::Stop => {
                self.shared.capture.stop();
                info!("capture stopped by external command from {peer}");
                self.shared.emit(ControlEvent::StopRequested(peer));
                ControlFlow::Break(())
            }
            Message::Handshake => {
                info!("handshake from {peer}");
                self.shared.emit(ControlEvent::Handshake(peer));
                ControlFlow::Continue(())
            }
            Message::SampleReport {
                min_samples,
                max_samples,
            } => {
                let report = self.shared.calc.compute(min_samples, max_samples);
                info!(
                    "drift from {peer}: min {:.3} ppm, max {:.3} ppm",
                    report.min_ppm, report.max_ppm
                );
                self.shared.emit(ControlEvent::Drift { peer, report });
                ControlFlow::Continue(())
            }
        }
    }
}

fn resolve(cfg: &ServerConfig) -> Result<SocketAddr, ServerError> {
    let addr = cfg.addr();
    (cfg.host.as_str(), cfg.port)
        .to_socket_addrs()
        .and_then(|mut addrs| {
            addrs.next().ok_or_else(|| {
                io::Error::new(io::ErrorKind::AddrNotAvailable, "no address found")
            })
        })
        .map_err(|source| ServerError::Resolve { addr, source })
}

fn listen(addr: SocketAddr) -> io::Result<TcpListener> {
    let socket = Socket::new(Domain::for_address(addr), Type::STREAM, Some(Protocol::TCP))?;
    socket.set_reuse_address(true)?;
    socket.bind(&addr.into())?;
    socket.listen(128)?;
    let listener: TcpListener = socket.into();
    listener.set_nonblocking(true)?;
    Ok(listener)
}
