use thiserror::Error;

/// Errors that can surface from [`crate::BeepEngine::start`]. Mid-run
/// failures (e.g. a submit error) stop the worker rather than propagating
/// here — see the worker module.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("failed to initialize audio sink: {0}")]
    SinkInit(String),
    #[error("failed to start worker thread")]
    ThreadStart,
    #[error("failed to submit audio buffer: {0}")]
    Submit(String),
}
