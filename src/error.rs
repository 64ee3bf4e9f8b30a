use axum::{
    http::StatusCode,
    response::{Html, IntoResponse, Response},
};
use thiserror::Error;

/// AppError
///
/// Every failure a store, the auth service, or the ownership guard can report.
/// Handlers either render `DuplicateKey`/`AuthFailure` back into a form, or let the
/// error convert itself into an HTTP response.
#[derive(Error, Debug)]
pub enum AppError {
    /// A unique column (`username` or `email`) already holds this value.
    #[error("duplicate {field}")]
    DuplicateKey { field: &'static str },

    #[error("invalid username/password")]
    AuthFailure,

    #[error("unauthorized")]
    Unauthorized,

    #[error("not found")]
    NotFound,

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("password hashing error: {0}")]
    PasswordHash(#[from] bcrypt::BcryptError),

    #[error("session token error: {0}")]
    Session(#[from] jsonwebtoken::errors::Error),

    #[error("session lifetime out of range")]
    SessionLifetime,
}

impl AppError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::DuplicateKey { .. } => StatusCode::CONFLICT,
            AppError::AuthFailure | AppError::Unauthorized => StatusCode::UNAUTHORIZED,
            AppError::NotFound => StatusCode::NOT_FOUND,
            AppError::Database(_)
            | AppError::PasswordHash(_)
            | AppError::Session(_)
            | AppError::SessionLifetime => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();

        // Internal causes are logged, never echoed to the client.
        let message = if status.is_server_error() {
            tracing::error!(error = %self, "request failed");
            "Something went wrong".to_string()
        } else {
            tracing::debug!(error = %self, "request rejected");
            self.to_string()
        };

        let body = crate::views::error_page(status, &message);
        (status, Html(body)).into_response()
    }
}
