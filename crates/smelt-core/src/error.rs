/// Core error type for smelt.
///
/// Transforms themselves never fail on structurally valid input — the
/// variants here cover module loading and host-side plumbing.
#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error("malformed module: {0}")]
    Malformed(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}
