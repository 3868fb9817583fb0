use thiserror::Error;

#[derive(Error, Debug)]
pub enum RankError {
    #[error("Owner not found: {owner_id}")]
    OwnerNotFound { owner_id: String },

    #[error("Course not found: {item_id}")]
    ItemNotFound { item_id: String },

    #[error("Invalid bounds: low={low}, high={high}, snapshot size={len}")]
    InvalidBounds { low: usize, high: usize, len: usize },

    #[error("Invalid position {position}: must be between 0 and {max}")]
    InvalidPosition { position: usize, max: usize },

    #[error("Comparison session is already complete")]
    SessionComplete,

    #[error("Comparison session is not complete yet")]
    SessionIncomplete,

    #[error("Comparison session has no pending comparison")]
    NoPendingComparison,

    #[error("Comparison session does not belong to this owner: {message}")]
    SessionMismatch { message: String },

    #[error("Ranking changed since snapshot (expected version {expected}, found {actual})")]
    Conflict { expected: u64, actual: u64 },

    #[error("Course code already exists: {code}")]
    DuplicateCourseCode { code: String },

    #[error("Email already registered: {email}")]
    DuplicateEmail { email: String },

    #[error("Stored ranking for owner {owner_id} is corrupt: {reason}")]
    CorruptRanking { owner_id: String, reason: String },

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("CSV processing error: {0}")]
    CsvError(#[from] csv::Error),

    #[error("API request failed: {0}")]
    ApiError(#[from] reqwest::Error),

    #[error("Server returned {status}: {message}")]
    RemoteError {
        status: u16,
        code: Option<String>,
        message: String,
    },

    #[error("Configuration validation error in '{field}': {message}")]
    ConfigValidationError { field: String, message: String },

    #[error("Invalid value '{value}' for '{field}': {reason}")]
    InvalidConfigValueError {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Missing required field: {field}")]
    MissingConfigError { field: String },

    #[error("Validation error: {message}")]
    ValidationError { message: String },
}

impl RankError {
    /// 是否可以重試 (版本衝突、IO 等暫時性錯誤)
    pub fn is_retryable(&self) -> bool {
        match self {
            RankError::Conflict { .. }
            | RankError::IoError(_)
            | RankError::SerializationError(_)
            | RankError::ApiError(_) => true,
            RankError::RemoteError { status, code, .. } => match code.as_deref() {
                Some(code) => code == "VERSION_CONFLICT" || *status >= 500,
                None => *status == 409 || *status >= 500,
            },
            _ => false,
        }
    }

    /// The server's error code carried by a `RemoteError`, if it sent one.
    pub fn remote_code(&self) -> Option<&str> {
        match self {
            RankError::RemoteError { code, .. } => code.as_deref(),
            _ => None,
        }
    }

    /// HTTP status code
    pub fn status_code(&self) -> u16 {
        match self {
            RankError::OwnerNotFound { .. } | RankError::ItemNotFound { .. } => 404,
            RankError::InvalidBounds { .. }
            | RankError::InvalidPosition { .. }
            | RankError::NoPendingComparison
            | RankError::SessionIncomplete
            | RankError::SessionMismatch { .. }
            | RankError::ValidationError { .. }
            | RankError::ConfigValidationError { .. }
            | RankError::InvalidConfigValueError { .. }
            | RankError::MissingConfigError { .. } => 400,
            RankError::SessionComplete
            | RankError::Conflict { .. }
            | RankError::DuplicateCourseCode { .. }
            | RankError::DuplicateEmail { .. } => 409,
            RankError::RemoteError { status, .. } => *status,
            _ => 500,
        }
    }

    /// Stable machine-readable code for API responses.
    pub fn code(&self) -> &'static str {
        match self {
            RankError::OwnerNotFound { .. } => "OWNER_NOT_FOUND",
            RankError::ItemNotFound { .. } => "ITEM_NOT_FOUND",
            RankError::InvalidBounds { .. } => "INVALID_BOUNDS",
            RankError::InvalidPosition { .. } => "INVALID_POSITION",
            RankError::SessionComplete => "SESSION_COMPLETE",
            RankError::NoPendingComparison => "NO_PENDING_COMPARISON",
            RankError::SessionIncomplete => "SESSION_INCOMPLETE",
            RankError::SessionMismatch { .. } => "SESSION_MISMATCH",
            RankError::Conflict { .. } => "VERSION_CONFLICT",
            RankError::DuplicateCourseCode { .. } => "DUPLICATE_COURSE_CODE",
            RankError::DuplicateEmail { .. } => "DUPLICATE_EMAIL",
            RankError::CorruptRanking { .. } => "CORRUPT_RANKING",
            RankError::ValidationError { .. }
            | RankError::ConfigValidationError { .. }
            | RankError::InvalidConfigValueError { .. }
            | RankError::MissingConfigError { .. } => "INVALID_REQUEST",
            RankError::RemoteError { .. } | RankError::ApiError(_) => "UPSTREAM_ERROR",
            RankError::IoError(_) | RankError::SerializationError(_) => "STORAGE_ERROR",
            RankError::CsvError(_) => "EXPORT_ERROR",
        }
    }

    pub fn recovery_suggestion(&self) -> &'static str {
        match self {
            RankError::Conflict { .. } => {
                "Ranking was modified concurrently; restart the comparison session"
            }
            RankError::OwnerNotFound { .. } => "Check the user id or create the user first",
            RankError::ItemNotFound { .. } => "Check the course id or create the course first",
            RankError::SessionComplete => "Commit the session instead of answering again",
            RankError::ConfigValidationError { .. }
            | RankError::InvalidConfigValueError { .. }
            | RankError::MissingConfigError { .. } => "Fix the configuration file or CLI flags",
            RankError::ApiError(_) => "Check that the server is running and reachable",
            _ => "Retry the request; if it keeps failing check the server logs",
        }
    }
}

pub type Result<T> = std::result::Result<T, RankError>;
