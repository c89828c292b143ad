//! Error types for swc-core
//!
//! Provides a unified error type that can be converted to appropriate exit codes.

use thiserror::Error;

/// Result type alias for swc-core operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for swc-core operations
#[derive(Error, Debug)]
pub enum Error {
    /// Configuration file error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Invalid object path or prefix
    #[error("Invalid path: {0}")]
    InvalidPath(String),

    /// Profile not found
    #[error("Profile not found: {0}")]
    ProfileNotFound(String),

    /// Profile already exists
    #[error("Profile already exists: {0}")]
    ProfileExists(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// TOML parsing error
    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    /// TOML serialization error
    #[error("TOML serialization error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),

    /// JSON error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// URL parsing error
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// Identity exchange failed or produced an unusable session
    #[error("Authentication failed: {0}")]
    Auth(String),

    /// Resource not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// Connection, DNS or timeout failure
    #[error("Network error: {0}")]
    Network(String),

    /// The service answered with an unexpected status
    #[error("Remote error ({status}): {message}")]
    Remote { status: u16, message: String },

    /// Malformed listing or identity payload
    #[error("Decode error: {0}")]
    Decode(String),

    /// Local file missing, unreadable or empty
    #[error("File error: {0}")]
    File(String),

    /// At least one segment of a segmented upload failed
    #[error("{failed} of {total} segment(s) failed to upload")]
    SegmentUploadFailed { failed: usize, total: usize },

    /// General error
    #[error("{0}")]
    General(String),
}

impl Error {
    /// Get the appropriate exit code for this error
    pub const fn exit_code(&self) -> i32 {
        match self {
            Error::InvalidPath(_) => 2,                          // UsageError
            Error::Config(_) => 2,                               // UsageError
            Error::Network(_) => 3,                              // NetworkError
            Error::Remote { status, .. } if *status >= 500 => 3, // NetworkError
            Error::Auth(_) => 4,                                 // AuthError
            Error::NotFound(_) | Error::ProfileNotFound(_) => 5, // NotFound
            Error::File(_) => 5,                                 // NotFound
            Error::ProfileExists(_) => 6,                        // Conflict
            _ => 1,                                              // GeneralError
        }
    }

    /// Whether the error means the addressed object does not exist
    pub const fn is_not_found(&self) -> bool {
        matches!(self, Error::NotFound(_))
    }
}
