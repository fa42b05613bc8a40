use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;
use uuid::Uuid;

// --- Domain/Infrastructure Errors ---

/// A clip upload that failed one of the intake rules. Carries which
/// constraint failed and for which file.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ValidationError {
    #[error("invalid audio file type '{content_type}' for '{filename}'")]
    InvalidFileType {
        filename: String,
        content_type: String,
    },
    #[error("'{filename}' exceeds the 15MB limit ({size} bytes)")]
    FileTooLarge { filename: String, size: u64 },
    #[error("'{filename}' should be between 0 and 15 seconds (got {duration:.1}s)")]
    ClipTooLong { filename: String, duration: f64 },
}

#[derive(Error, Debug)]
pub enum RepoError {
    #[error("soundboard not found with ID: {0}")]
    NotFound(Uuid),

    #[error("item already exists for key: {0}")]
    Conflict(String),

    #[error("stored item could not be parsed: {0}")]
    DataCorruption(String),

    #[error("database backend error: {0}")]
    BackendError(#[from] anyhow::Error),
}

#[derive(Error, Debug)]
pub enum StorageError {
    /// A conditional put found the key already taken. Surfaced when a
    /// freshly generated clip token collides with an existing object.
    #[error("object already exists with key: {0}")]
    AlreadyExists(String),

    #[error("object not found with key: {0}")]
    NotFound(String),

    #[error("storage backend error: {0}")]
    BackendError(#[from] anyhow::Error),
}

#[derive(Error, Debug)]
pub enum AuthError {
    #[error("identity provider rejected the login: {0}")]
    ExchangeFailed(String),

    #[error("identity provider backend error: {0}")]
    BackendError(#[from] anyhow::Error),
}

// --- Web Layer Error ---

#[derive(Error, Debug)]
pub enum AppError {
    // Input validation / request parsing errors
    #[error("invalid input: {0}")]
    InvalidInput(String),
    #[error("missing form field: {0}")]
    MissingFormField(String),
    #[error("error processing multipart form data: {0}")]
    MultipartError(#[from] axum::extract::multipart::MultipartError),
    #[error("invalid ID format: {0}")]
    InvalidUuid(#[from] uuid::Error),
    #[error(transparent)]
    Validation(#[from] ValidationError),

    // Auth / ownership
    #[error("login required")]
    Unauthenticated,
    #[error("only the soundboard's creator may do that")]
    Forbidden,

    // Domain-level lookups
    #[error("soundboard not found with ID: {0}")]
    SoundboardNotFound(Uuid),
    #[error("sound not found: {0}")]
    SoundNotFound(String),
    #[error("no image for soundboard: {0}")]
    ImageNotFound(Uuid),

    // Infrastructure (mapped from RepoError/StorageError/AuthError)
    #[error("could not save soundboard data")]
    RepositoryError(#[source] RepoError),
    #[error("could not perform clip storage operation")]
    StorageError(#[source] StorageError),
    #[error("login failed")]
    AuthError(#[source] AuthError),

    // Configuration / Startup errors
    #[error("configuration error: {0}")]
    ConfigError(String),
    #[error("initialization error: {0}")]
    InitError(String),

    #[error("internal server error: {0}")]
    InternalServerError(String),
}

// --- Conversions from Domain Errors to AppError ---

impl From<RepoError> for AppError {
    fn from(err: RepoError) -> Self {
        match err {
            RepoError::NotFound(id) => AppError::SoundboardNotFound(id),
            e => AppError::RepositoryError(e),
        }
    }
}

// Deliberately no NotFound special case: the storage key scheme is an
// internal detail, and callers that can name the missing resource map it
// themselves (see get_sound/get_image).
impl From<StorageError> for AppError {
    fn from(err: StorageError) -> Self {
        AppError::StorageError(err)
    }
}

impl From<AuthError> for AppError {
    fn from(err: AuthError) -> Self {
        AppError::AuthError(err)
    }
}

impl From<crate::config::ConfigError> for AppError {
    fn from(err: crate::config::ConfigError) -> Self {
        AppError::ConfigError(err.to_string())
    }
}

// --- Axum Response Implementation ---

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_message) = match &self {
            // 4xx Client Errors
            AppError::InvalidInput(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            AppError::MissingFormField(field) => (
                StatusCode::BAD_REQUEST,
                format!("Missing form field: {}", field),
            ),
            AppError::MultipartError(e) => (
                StatusCode::BAD_REQUEST,
                format!("Invalid multipart form data: {}", e),
            ),
            AppError::InvalidUuid(e) => {
                (StatusCode::BAD_REQUEST, format!("Invalid ID format: {}", e))
            }
            AppError::Validation(e) => (StatusCode::BAD_REQUEST, e.to_string()),
            AppError::Unauthenticated => (StatusCode::UNAUTHORIZED, self.to_string()),
            AppError::Forbidden => (StatusCode::FORBIDDEN, self.to_string()),
            AppError::SoundboardNotFound(_)
            | AppError::SoundNotFound(_)
            | AppError::ImageNotFound(_) => (StatusCode::NOT_FOUND, self.to_string()),

            // 5xx Server Errors
            AppError::RepositoryError(e) => {
                tracing::error!(error.source = ?e, "Repository error occurred");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Database operation failed".to_string(),
                )
            }
            AppError::StorageError(e) => {
                tracing::error!(error.source = ?e, "Storage error occurred");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "File storage operation failed".to_string(),
                )
            }
            AppError::AuthError(e) => {
                tracing::error!(error.source = ?e, "Identity provider error occurred");
                (StatusCode::INTERNAL_SERVER_ERROR, "Login failed".to_string())
            }
            AppError::ConfigError(msg) => {
                tracing::error!("Configuration error: {}", msg);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Server configuration error".to_string(),
                )
            }
            AppError::InitError(msg) => {
                tracing::error!("Initialization error: {}", msg);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Server initialization error".to_string(),
                )
            }
            AppError::InternalServerError(msg) => {
                tracing::error!("Internal server error: {}", msg);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "An internal server error occurred".to_string(),
                )
            }
        };

        tracing::debug!(error.message = %error_message, error.detail = %self, "Responding with error");

        let body = Json(serde_json::json!({ "error": error_message }));
        (status, body).into_response()
    }
}
