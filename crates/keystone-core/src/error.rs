//! # Error Types
//!
//! Domain-specific error types for keystone-core.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Error Types                                     │
//! │                                                                         │
//! │  keystone-core errors (this file)                                      │
//! │  ├── CoreError        - Business rule violations                       │
//! │  └── ValidationError  - Input validation failures                      │
//! │                                                                         │
//! │  keystone-db errors (separate crate)                                   │
//! │  └── DbError          - Database operation failures                    │
//! │                                                                         │
//! │  keystone-server errors                                                │
//! │  └── ApiError         - What HTTP clients see (serialized)             │
//! │                                                                         │
//! │  Flow: ValidationError → CoreError → DbError → ApiError → Client       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use thiserror::Error;

// =============================================================================
// Core Error
// =============================================================================

/// Core business logic errors.
#[derive(Debug, Error)]
pub enum CoreError {
    /// A journal entry's debits and credits do not match.
    ///
    /// ## When This Occurs
    /// - Posting a journal entry whose lines do not balance
    #[error("Journal entry {entry_number} is unbalanced: debit {debit_cents}, credit {credit_cents}")]
    UnbalancedEntry {
        entry_number: String,
        debit_cents: i64,
        credit_cents: i64,
    },

    /// The document is not in a state that allows the requested operation.
    ///
    /// ## When This Occurs
    /// - Adding items to a posted journal entry
    /// - Applying a stock adjustment twice
    /// - Receiving goods against a cancelled purchase order
    #[error("{entity} {number} is {status}, cannot perform operation")]
    InvalidStatus {
        entity: String,
        number: String,
        status: String,
    },

    /// A supplied code does not match the series it is stored under.
    #[error("Code '{code}' does not match the {series} format")]
    CodeMismatch { code: String, series: String },

    /// The user's role does not allow the operation.
    #[error("Role {role} is not permitted to {action}")]
    Forbidden { role: String, action: String },

    /// Username or password did not match.
    #[error("Invalid username or password")]
    InvalidCredentials,

    /// Validation error (wraps ValidationError).
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),
}

// =============================================================================
// Validation Error
// =============================================================================

/// Input validation errors.
///
/// These errors occur when user input doesn't meet requirements.
/// Used for early validation before anything touches the database.
#[derive(Debug, Error)]
pub enum ValidationError {
    /// A required field is missing or empty.
    #[error("{field} is required")]
    Required { field: String },

    /// Field value is too short.
    #[error("{field} must be at least {min} characters")]
    TooShort { field: String, min: usize },

    /// Field value is too long.
    #[error("{field} must be at most {max} characters")]
    TooLong { field: String, max: usize },

    /// Numeric value is out of range.
    #[error("{field} must be between {min} and {max}")]
    OutOfRange { field: String, min: i64, max: i64 },

    /// Value must be positive.
    #[error("{field} must be positive")]
    MustBePositive { field: String },

    /// Value must not be negative.
    #[error("{field} must not be negative")]
    MustNotBeNegative { field: String },

    /// Invalid format (e.g., malformed email, bad code).
    #[error("{field} has invalid format: {reason}")]
    InvalidFormat { field: String, reason: String },

    /// Value is not in allowed set.
    #[error("{field} must be one of: {allowed:?}")]
    NotAllowed { field: String, allowed: Vec<String> },

    /// Two fields that may not both be set were both set.
    #[error("{first} and {second} cannot both be set")]
    MutuallyExclusive { first: String, second: String },

    /// A date range ends before it starts.
    #[error("{field} ends before it starts")]
    InvalidRange { field: String },
}

impl ValidationError {
    /// Shorthand for [`ValidationError::Required`].
    pub fn required(field: impl Into<String>) -> Self {
        ValidationError::Required {
            field: field.into(),
        }
    }
}

// =============================================================================
// Result Type Alias
// =============================================================================

/// Convenience type alias for Results with CoreError.
pub type CoreResult<T> = Result<T, CoreError>;

// =============================================================================
// Unit Tests
// =============================================================================
