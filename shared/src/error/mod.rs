//! Unified error system for keyforge
//!
//! - [`ErrorCode`]: Standardized numeric error codes
//! - [`ErrorCategory`]: Classification of errors by code range
//! - [`AppError`]: Error with code, message and optional details
//!
//! # Error Code Ranges
//!
//! - 0xxx: General errors
//! - 1xxx: Webhook authentication errors
//! - 2xxx: Billing (subscription reconciliation) errors
//! - 9xxx: System errors
//!
//! # Example
//!
//! ```
//! use shared::error::{AppError, ErrorCode};
//!
//! let err = AppError::new(ErrorCode::SignatureMissing);
//! assert_eq!(err.http_status(), http::StatusCode::BAD_REQUEST);
//!
//! let err = AppError::with_message(ErrorCode::UserUnresolved, "checkout has no user")
//!     .with_detail("session_id", "cs_123");
//! assert!(err.details.is_some());
//! ```

mod category;
mod codes;
mod http;
mod types;

pub use category::ErrorCategory;
pub use codes::{ErrorCode, InvalidErrorCode};
pub use types::{AppError, ErrorBody};
