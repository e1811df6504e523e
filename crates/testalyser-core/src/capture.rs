/// Handle on the running logic capture.
///
/// `stop` may be called from the listener thread while the orchestrator is
/// blocked in `wait`; implementations must tolerate that and repeated stops.
pub trait CaptureControl: Send + Sync {
    fn stop(&self);

    /// Block until the capture has finished, either on its own or via `stop`.
    fn wait(&self);
}
