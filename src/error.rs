use http::StatusCode;
use thiserror::Error;

#[derive(Error, Debug, Clone)]
pub enum KontrastError {
    #[error("Invalid request: {0}")]
    NotValid(String),

    #[error("Group not found: {0}")]
    GroupNotFound(String),

    #[error("Test not found: {0}")]
    TestNotFound(String),

    #[error("Comparison result not found: {0}")]
    ResultNotFound(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Groups reference different tests: {group1_test} vs {group2_test}")]
    TestMismatch {
        group1_test: String,
        group2_test: String,
    },

    #[error("Insufficient data: {0}")]
    InsufficientData(String),

    #[error("Comparison result already exists: {0}")]
    AlreadyExists(String),

    #[error("IO error: {0}")]
    Io(String),

    #[error("JSON error: {0}")]
    Json(String),
}

pub type Result<T> = std::result::Result<T, KontrastError>;

impl From<std::io::Error> for KontrastError {
    fn from(e: std::io::Error) -> Self {
        KontrastError::Io(e.to_string())
    }
}

impl From<serde_json::Error> for KontrastError {
    fn from(e: serde_json::Error) -> Self {
        KontrastError::Json(e.to_string())
    }
}

impl KontrastError {
    /// HTTP status the calling layer should map this error to.
    ///
    /// The engine itself has no HTTP surface; this keeps the taxonomy →
    /// status contract in one place for whichever layer embeds it.
    pub fn status_code(&self) -> StatusCode {
        match self {
            KontrastError::NotValid(_) => StatusCode::BAD_REQUEST,
            KontrastError::GroupNotFound(_) => StatusCode::NOT_FOUND,
            KontrastError::TestNotFound(_) => StatusCode::NOT_FOUND,
            KontrastError::ResultNotFound(_) => StatusCode::NOT_FOUND,
            KontrastError::Forbidden(_) => StatusCode::FORBIDDEN,
            KontrastError::TestMismatch { .. } => StatusCode::CONFLICT,
            KontrastError::InsufficientData(_) => StatusCode::UNPROCESSABLE_ENTITY,
            KontrastError::AlreadyExists(_) => StatusCode::CONFLICT,
            KontrastError::Io(_) => StatusCode::INTERNAL_SERVER_ERROR,
            KontrastError::Json(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}
