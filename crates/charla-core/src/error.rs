use thiserror::Error;

/// Errors surfaced by the relay and session layers. All of them are
/// recovered into a user-visible error string; none abort the process.
#[derive(Debug, Error)]
pub enum ChatError {
    /// Connecting to the inference server failed, or it answered with a
    /// non-success status before any output was produced.
    #[error("failed to connect to Ollama: {0}")]
    UpstreamUnavailable(String),
    /// The connection dropped after streaming had started. Deltas delivered
    /// before the drop are kept by the caller.
    #[error("stream interrupted: {0}")]
    StreamInterrupted(String),
    /// The caller supplied an unusable request.
    #[error("{0}")]
    InvalidInput(String),
}
