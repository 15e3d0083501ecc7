//! Domain error types for the print-queue server.
//!
//! Uses thiserror for ergonomic error handling with automatic Display implementations.

use actix_web::{HttpResponse, ResponseError};
use std::fmt;

/// A lifecycle or queue guard that rejected an operation.
///
/// Each variant maps to a machine-readable error code so dashboard clients
/// can branch on the reason instead of parsing messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PolicyViolation {
    /// Job must be paid before it can start printing.
    Unpaid,
    /// Job is not the earliest pending job for its printer.
    OutOfOrder,
    /// Another job is already printing on the same printer.
    PrinterBusy,
    /// Batch has already been skipped the maximum number of times.
    SkipLimitReached,
    /// Counter-payment job requires presence confirmation before printing.
    PresenceRequired,
    /// Job is in a terminal state and cannot transition further.
    AlreadyTerminal,
    /// Requested status change is not a legal transition.
    InvalidTransition,
    /// Job is currently printing and cannot be deleted or reassigned.
    PrintingLocked,
}

impl PolicyViolation {
    pub fn code(&self) -> &'static str {
        match self {
            Self::Unpaid => "UNPAID",
            Self::OutOfOrder => "OUT_OF_ORDER",
            Self::PrinterBusy => "PRINTER_BUSY",
            Self::SkipLimitReached => "SKIP_LIMIT_REACHED",
            Self::PresenceRequired => "PRESENCE_REQUIRED",
            Self::AlreadyTerminal => "ALREADY_TERMINAL",
            Self::InvalidTransition => "INVALID_TRANSITION",
            Self::PrintingLocked => "PRINTING_LOCKED",
        }
    }
}

impl fmt::Display for PolicyViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let msg = match self {
            Self::Unpaid => "Cannot start printing: job is unpaid",
            Self::OutOfOrder => "Job is not next in line for its printer",
            Self::PrinterBusy => "Another job is already printing on this printer",
            Self::SkipLimitReached => "Maximum skip limit reached for this batch",
            Self::PresenceRequired => "Presence must be confirmed before printing",
            Self::AlreadyTerminal => "Job is already in a terminal state",
            Self::InvalidTransition => "Requested status change is not allowed",
            Self::PrintingLocked => "Job is currently printing",
        };
        write!(f, "{}", msg)
    }
}

/// Application-level errors.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// Database operation failed
    #[error("Database error: {0}")]
    Database(String),

    /// Resource not found
    #[error("{0} not found")]
    NotFound(String),

    /// Invalid input data
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Authentication or ownership check failed
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// A lifecycle/queue guard rejected the operation
    #[error("{0}")]
    Policy(PolicyViolation),

    /// Payment gateway unreachable or reported an unexpected state
    #[error("Payment service error: {0}")]
    ExternalService(String),
}

impl ResponseError for AppError {
    fn error_response(&self) -> HttpResponse {
        let (status, error_code, response_message) = match self {
            AppError::Database(err_str) => {
                tracing::error!("Database error: {}", err_str);
                (
                    actix_web::http::StatusCode::INTERNAL_SERVER_ERROR,
                    "DATABASE_ERROR",
                    "An internal database error occurred".to_string(),
                )
            }
            AppError::NotFound(_) => (
                actix_web::http::StatusCode::NOT_FOUND,
                "NOT_FOUND",
                self.to_string(),
            ),
            AppError::InvalidInput(_) => (
                actix_web::http::StatusCode::BAD_REQUEST,
                "INVALID_INPUT",
                self.to_string(),
            ),
            AppError::Unauthorized(_) => (
                actix_web::http::StatusCode::UNAUTHORIZED,
                "UNAUTHORIZED",
                self.to_string(),
            ),
            AppError::Policy(violation) => (
                actix_web::http::StatusCode::CONFLICT,
                violation.code(),
                self.to_string(),
            ),
            AppError::ExternalService(_) => (
                actix_web::http::StatusCode::BAD_GATEWAY,
                "EXTERNAL_SERVICE_ERROR",
                self.to_string(),
            ),
        };

        HttpResponse::build(status).json(ErrorResponse {
            error: error_code.to_string(),
            message: response_message,
        })
    }
}

/// Error response body matching OpenAPI schema.
#[derive(Debug, serde::Serialize, utoipa::ToSchema)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
}

impl fmt::Display for ErrorResponse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.error, self.message)
    }
}

/// Convenience type alias for Results with AppError.
pub type AppResult<T> = Result<T, AppError>;

// Conversion implementations for common error types

impl From<PolicyViolation> for AppError {
    fn from(violation: PolicyViolation) -> Self {
        AppError::Policy(violation)
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::InvalidInput(format!("JSON parsing error: {}", err))
    }
}

impl From<sea_orm::DbErr> for AppError {
    fn from(err: sea_orm::DbErr) -> Self {
        AppError::Database(err.to_string())
    }
}

impl From<uuid::Error> for AppError {
    fn from(err: uuid::Error) -> Self {
        AppError::InvalidInput(format!("Invalid UUID: {}", err))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn policy_codes_are_stable() {
        assert_eq!(PolicyViolation::Unpaid.code(), "UNPAID");
        assert_eq!(PolicyViolation::PrinterBusy.code(), "PRINTER_BUSY");
        assert_eq!(
            PolicyViolation::SkipLimitReached.code(),
            "SKIP_LIMIT_REACHED"
        );
    }

    #[test]
    fn policy_rejection_maps_to_conflict() {
        let err = AppError::Policy(PolicyViolation::Unpaid);
        let resp = err.error_response();
        assert_eq!(resp.status(), actix_web::http::StatusCode::CONFLICT);
    }

    #[test]
    fn not_found_maps_to_404() {
        let err = AppError::NotFound("Job abc".to_string());
        let resp = err.error_response();
        assert_eq!(resp.status(), actix_web::http::StatusCode::NOT_FOUND);
    }
}
