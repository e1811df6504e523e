//! Stand-in for the vendor capture device.

use std::time::{Duration, Instant};

use log::info;
use parking_lot::{Condvar, Mutex};
use testalyser_core::CaptureControl;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaptureEnd {
    Stopped,
    Elapsed,
}

/// Capture that runs until stopped, or until `duration` elapses if set.
pub struct TimedCapture {
    device: String,
    deadline: Option<Instant>,
    end: Mutex<Option<CaptureEnd>>,
    done: Condvar,
}

impl TimedCapture {
    pub fn start(device: impl Into<String>, duration: Option<Duration>) -> Self {
        let device = device.into();
        match duration {
            Some(d) => info!("capture started on device {device} for {:.1}s", d.as_secs_f64()),
            None => info!("capture started on device {device} (manual mode)"),
        }
        Self {
            device,
            deadline: duration.map(|d| Instant::now() + d),
            end: Mutex::new(None),
            done: Condvar::new(),
        }
    }

    pub fn device(&self) -> &str {
        &self.device
    }

    pub fn end(&self) -> Option<CaptureEnd> {
        *self.end.lock()
    }
}

impl CaptureControl for TimedCapture {
    fn stop(&self) {
        let mut end = self.end.lock();
        if end.is_none() {
            *end = Some(CaptureEnd::Stopped);
            info!("capture on device {} stopped", self.device);
            self.done.notify_all();
        }
    }

    fn wait(&self) {
        let mut end = self.end.lock();
        while end.is_none() {
            match self.deadline {
                Some(deadline) => {
                    if self.done.wait_until(&mut end, deadline).timed_out() && end.is_none() {
                        *end = Some(CaptureEnd::Elapsed);
                        info!("capture on device {} completed", self.device);
                        self.done.notify_all();
                    }
                }
                None => self.done.wait(&mut end),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn stop_wakes_waiter() {
        let capture = Arc::new(TimedCapture::start("test", None));
        let waiter = {
            let capture = capture.clone();
            thread::spawn(move || capture.wait())
        };
        thread::sleep(Duration::from_millis(20));
        capture.stop();
        capture.stop();
        waiter.join().unwrap();
        assert_eq!(capture.end(), Some(CaptureEnd::Stopped));
    }

    #[test]
    fn duration_elapses() {
        let capture = TimedCapture::start("test", Some(Duration::from_millis(20)));
        capture.wait();
        assert_eq!(capture.end(), Some(CaptureEnd::Elapsed));
        capture.stop();
        assert_eq!(capture.end(), Some(CaptureEnd::Elapsed));
    }
}
