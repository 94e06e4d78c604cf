use thiserror::Error;

/// Errors raised at the edges of the engine: loading input, exporting
/// results and validating user-supplied bounds.
///
/// The analytics operations themselves never fail; they degrade to empty
/// or unconstrained results instead.
#[derive(Debug, Error)]
pub enum FeedbackError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("CSV error on line {line}: {message}")]
    Csv { line: usize, message: String },

    #[error("score {0} is outside 0..=10")]
    InvalidScore(i64),

    #[error("unreadable score: {0}")]
    UnreadableScore(String),

    #[error("{bound} bound {value} is outside {min}..={max}")]
    BoundOutOfRange {
        bound: &'static str,
        value: i32,
        min: i32,
        max: i32,
    },

    #[error("unrecognised date: {0:?}")]
    InvalidDate(String),

    #[error("unsupported format: {0}")]
    UnsupportedFormat(String),

    #[error("unknown {option} {value:?}")]
    UnknownOption { option: &'static str, value: String },

    #[cfg(feature = "xlsx")]
    #[error("XLSX export failed: {0}")]
    Xlsx(String),
}

pub type Result<T> = std::result::Result<T, FeedbackError>;
