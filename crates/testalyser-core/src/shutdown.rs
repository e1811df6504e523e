use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Creates the write side, held by the orchestrator, and the read side
/// handed to the listener.
pub fn shutdown_pair() -> (ShutdownTrigger, ShutdownSignal) {
    let flag = Arc::new(AtomicBool::new(false));
    (ShutdownTrigger(flag.clone()), ShutdownSignal(flag))
}

/// The only handle that can set the flag. Deliberately not `Clone`.
#[derive(Debug)]
pub struct ShutdownTrigger(Arc<AtomicBool>);

impl ShutdownTrigger {
    pub fn trigger(&self) {
        self.0.store(true, Ordering::Release);
    }

    pub fn signal(&self) -> ShutdownSignal {
        ShutdownSignal(self.0.clone())
    }
}

#[derive(Debug, Clone)]
pub struct ShutdownSignal(Arc<AtomicBool>);

impl ShutdownSignal {
    pub fn is_triggered(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }
}
