use thiserror::Error;

/// Application-level error type.
///
/// `Validation` covers bad input and always names the offending field path or
/// block key. `Internal` covers layout-algorithm invariant violations — a
/// defect in the packer or renderer, not in the input — and is logged
/// separately so the two never get conflated in diagnostics.
#[derive(Debug, Error)]
pub enum SheetError {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Internal layout error: {0}")]
    Internal(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl SheetError {
    pub fn validation(msg: impl Into<String>) -> Self {
        SheetError::Validation(msg.into())
    }

    /// Constructs an `Internal` error and logs it at error level immediately,
    /// since internal faults indicate a bug worth surfacing even when the
    /// caller only prints the top-level message.
    pub fn internal(msg: impl Into<String>) -> Self {
        let msg = msg.into();
        tracing::error!("internal layout error: {msg}");
        SheetError::Internal(msg)
    }
}
