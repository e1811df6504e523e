mod args;
mod capture;
mod config;
mod logger;

use std::sync::Arc;
use std::thread::{self, JoinHandle};

use anyhow::{Context, Result};
use log::{debug, info, warn};
use parking_lot::Mutex;
use testalyser_core::{
    shutdown_pair, CaptureControl, ControlClient, ControlEvent, ControlServer, DriftLog,
};

use crate::args::Command;
use crate::capture::{CaptureEnd, TimedCapture};
use crate::config::AppConfig;

fn main() -> Result<()> {
    let args = args::parse_args()?;
    logger::init(args.verbosity, args.log_file.as_deref())?;

    let mut cfg = AppConfig::load(args.config.as_deref())?;
    cfg.apply(&args);
    cfg.validate()?;

    match args.command {
        Command::Run => run(&cfg),
        Command::Stop => {
            let mut client = connect(&cfg)?;
            client.request_stop()?;
            client.close();
            info!("stop sent");
            Ok(())
        }
        Command::Ping => {
            connect(&cfg)?.close();
            info!("handshake sent");
            Ok(())
        }
    }
}

fn connect(cfg: &AppConfig) -> Result<ControlClient> {
    let addr = (cfg.server.host.as_str(), cfg.server.port);
    ControlClient::connect(addr)
        .with_context(|| format!("connecting to {}:{}", cfg.server.host, cfg.server.port))
}

fn run(cfg: &AppConfig) -> Result<()> {
    let device = cfg.capture.device.clone().unwrap_or_else(|| "simulated".to_string());
    let capture = Arc::new(TimedCapture::start(device, cfg.capture_duration()?));

    let (trigger, signal) = shutdown_pair();
    let (tx, rx) = crossbeam_channel::unbounded();
    let server = ControlServer::bind(&cfg.server_config(), capture.clone(), trigger.signal())
        .context("starting control server")?
        .with_events(tx);
    let handle = server.spawn()?;

    let drift_log = Arc::new(Mutex::new(DriftLog::new(cfg.capture.max_drift_entries)));
    let collector = {
        let drift_log = drift_log.clone();
        let capture = capture.clone();
        thread::spawn(move || {
            for evt in rx.iter() {
                if let ControlEvent::Drift { peer, report } = evt {
                    drift_log.lock().push(peer, report);
                }
            }
            // The server only drops its sender on exit; exiting before
            // shutdown means it failed, so release the orchestrator.
            if !signal.is_triggered() {
                warn!("control server exited unexpectedly, stopping capture");
                capture.stop();
            }
        })
    };

    capture.wait();
    trigger.trigger();
    let served = handle.join();
    if !join_logged(collector, "drift collector") {
        warn!("drift summary may be incomplete");
    }
    served.context("control server failed")?;

    if capture.end() == Some(CaptureEnd::Stopped) {
        info!("capture on {} ended by stop command", capture.device());
    }

    let drift = drift_log.lock();
    match drift.summary() {
        Some(s) => info!(
            "{} drift reports: lowest min {:.3} ppm, highest max {:.3} ppm",
            s.count, s.lowest_min_ppm, s.highest_max_ppm
        ),
        None => info!("no drift reports received"),
    }
    if !drift.is_empty() {
        debug!("drift log:\n{}", drift.to_text(true));
    }

    info!("completed and exited gracefully");
    Ok(())
}

/// Joins a helper thread, logging instead of discarding a panic.
fn join_logged(handle: JoinHandle<()>, name: &str) -> bool {
    match handle.join() {
        Ok(()) => true,
        Err(_) => {
            warn!("{name} thread panicked");
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn join_logged_reports_panics() {
        assert!(join_logged(thread::spawn(|| {}), "quiet"));
        let panicking: JoinHandle<()> = thread::spawn(|| panic!("collector failed"));
        assert!(!join_logged(panicking, "collector"));
    }
}
