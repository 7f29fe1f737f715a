//! Error handling helpers for route handlers
//!
//! Handlers return `Result<_, StatusCode>`; this trait logs the underlying
//! error with context before mapping it, so nothing is dropped silently.

use axum::http::StatusCode;

/// Extension trait for logging an error and converting it to a StatusCode
pub trait LogErr<T> {
    /// Log with context and return the given StatusCode
    fn log_status(self, context: &str, status: StatusCode) -> Result<T, StatusCode>;

    /// Log with context and return INTERNAL_SERVER_ERROR
    fn log_500(self, context: &str) -> Result<T, StatusCode>
    where
        Self: Sized,
    {
        self.log_status(context, StatusCode::INTERNAL_SERVER_ERROR)
    }
}

impl<T, E: std::fmt::Display> LogErr<T> for Result<T, E> {
    fn log_status(self, context: &str, status: StatusCode) -> Result<T, StatusCode> {
        self.map_err(|e| {
            eprintln!("{}: {}", context, e);
            status
        })
    }
}
