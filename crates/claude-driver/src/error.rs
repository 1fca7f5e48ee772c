use thiserror::Error;

#[derive(Debug, Error)]
pub enum AgentError {
    /// The binary could not be started at all (missing executable, pipe
    /// creation failure). Surfaced before any event is delivered.
    #[error("failed to spawn agent binary '{binary}': {source}")]
    Spawn {
        binary: String,
        #[source]
        source: std::io::Error,
    },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("process error: {0}")]
    Process(String),
}
