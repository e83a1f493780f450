use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

/// Application error type
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Database error: {0}")]
    Database(#[from] redb::Error),

    #[error("Transaction error: {0}")]
    Transaction(#[from] redb::TransactionError),

    #[error("Table error: {0}")]
    Table(#[from] redb::TableError),

    #[error("Storage error: {0}")]
    Storage(#[from] redb::StorageError),

    #[error("Commit error: {0}")]
    Commit(#[from] redb::CommitError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] bincode::error::EncodeError),

    #[error("Deserialization error: {0}")]
    Deserialization(#[from] bincode::error::DecodeError),

    #[error("Task join error: {0}")]
    TaskJoin(#[from] tokio::task::JoinError),

    #[error("Password hashing error: {0}")]
    PasswordHash(#[from] bcrypt::BcryptError),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Unauthorized")]
    Unauthorized,

    #[error("Invalid login credentials")]
    InvalidCredentials,

    #[error("Username is already taken")]
    UsernameTaken,

    #[error("Email is already registered")]
    EmailTaken,

    #[error("Folder name is already in use")]
    FolderNameTaken,

    #[error("{0} not found")]
    NotFound(&'static str),

    #[error("{0} is disabled")]
    FeatureDisabled(&'static str),

    #[error("Invalid signature")]
    InvalidSignature,

    #[error("GUEST_EMAIL belongs to a regular account; pick an unused address")]
    GuestEmailInUse,
}

/// Implement IntoResponse to convert AppError into HTTP responses
impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_message) = match self {
            AppError::Database(ref e) => internal("Database", e),
            AppError::Transaction(ref e) => internal("Transaction", e),
            AppError::Table(ref e) => internal("Table", e),
            AppError::Storage(ref e) => internal("Storage", e),
            AppError::Commit(ref e) => internal("Commit", e),
            AppError::Serialization(ref e) => internal("Serialization", e),
            AppError::Deserialization(ref e) => internal("Deserialization", e),
            AppError::TaskJoin(ref e) => internal("Task join", e),
            AppError::PasswordHash(ref e) => internal("Password hashing", e),
            AppError::InvalidInput(msg) => (StatusCode::BAD_REQUEST, msg),
            AppError::Unauthorized => (
                StatusCode::UNAUTHORIZED,
                "Authentication required".to_string(),
            ),
            AppError::InvalidCredentials => (
                StatusCode::UNAUTHORIZED,
                "Invalid login credentials".to_string(),
            ),
            AppError::UsernameTaken => (
                StatusCode::CONFLICT,
                "Username is already taken.".to_string(),
            ),
            AppError::EmailTaken => (
                StatusCode::CONFLICT,
                "Email is already registered.".to_string(),
            ),
            AppError::FolderNameTaken => (
                StatusCode::CONFLICT,
                "A folder with this name already exists".to_string(),
            ),
            AppError::NotFound(what) => (StatusCode::NOT_FOUND, format!("{} not found", what)),
            AppError::FeatureDisabled(what) => {
                (StatusCode::FORBIDDEN, format!("{} is disabled", what))
            }
            AppError::InvalidSignature => {
                (StatusCode::UNAUTHORIZED, "Invalid signature".to_string())
            }
            AppError::GuestEmailInUse => internal("Guest provisioning", &"guest email in use"),
        };

        let body = Json(json!({
            "error": error_message
        }));

        (status, body).into_response()
    }
}

fn internal(kind: &str, err: &dyn std::fmt::Debug) -> (StatusCode, String) {
    tracing::error!("{} error: {:?}", kind, err);
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        "Internal server error".to_string(),
    )
}

/// Result type alias for application results
pub type Result<T> = std::result::Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_codes() {
        let cases = [
            (AppError::InvalidInput("bad".into()), StatusCode::BAD_REQUEST),
            (AppError::Unauthorized, StatusCode::UNAUTHORIZED),
            (AppError::InvalidCredentials, StatusCode::UNAUTHORIZED),
            (AppError::UsernameTaken, StatusCode::CONFLICT),
            (AppError::NotFound("Snippet"), StatusCode::NOT_FOUND),
            (AppError::FeatureDisabled("Guest sign-in"), StatusCode::FORBIDDEN),
        ];

        for (err, expected) in cases {
            assert_eq!(err.into_response().status(), expected);
        }
    }
}
