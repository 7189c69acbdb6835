//! Unified error codes
//!
//! Codes are grouped by range:
//! - 0xxx: General errors
//! - 1xxx: Webhook authentication errors
//! - 2xxx: Billing errors
//! - 9xxx: System errors

use serde::{Deserialize, Serialize};
use std::fmt;

/// Unified error code enum, serialized as its `u16` value
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "u16", try_from = "u16")]
#[repr(u16)]
pub enum ErrorCode {
    // ==================== 0xxx: General ====================
    /// Payload could not be decoded
    InvalidFormat = 6,

    // ==================== 1xxx: Webhook auth ====================
    /// Signature header absent
    SignatureMissing = 1001,
    /// Signature does not match the signing secret
    SignatureInvalid = 1002,
    /// Signature timestamp outside the tolerance window
    SignatureExpired = 1003,

    // ==================== 2xxx: Billing ====================
    /// No user could be resolved for the event
    UserUnresolved = 2002,
    /// No product name could be resolved for the event
    ProductUnresolved = 2003,

    // ==================== 9xxx: System ====================
    /// Database error
    DatabaseError = 9002,
    /// Payment processor returned an error
    PaymentProviderError = 9006,
}

impl ErrorCode {
    #[inline]
    pub const fn code(&self) -> u16 {
        *self as u16
    }

    /// Default human-readable message
    pub const fn message(&self) -> &'static str {
        match self {
            ErrorCode::InvalidFormat => "Invalid format",

            ErrorCode::SignatureMissing => "Missing webhook signature",
            ErrorCode::SignatureInvalid => "Invalid webhook signature",
            ErrorCode::SignatureExpired => "Webhook signature timestamp outside tolerance",

            ErrorCode::UserUnresolved => "Unable to resolve user for event",
            ErrorCode::ProductUnresolved => "Unable to resolve product for event",

            ErrorCode::DatabaseError => "Database error",
            ErrorCode::PaymentProviderError => "Payment provider error",
        }
    }
}

impl From<ErrorCode> for u16 {
    fn from(code: ErrorCode) -> Self {
        code.code()
    }
}

/// Returned when a `u16` does not name a known [`ErrorCode`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InvalidErrorCode(pub u16);

impl fmt::Display for InvalidErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid error code: {}", self.0)
    }
}

impl std::error::Error for InvalidErrorCode {}

impl TryFrom<u16> for ErrorCode {
    type Error = InvalidErrorCode;

    fn try_from(value: u16) -> Result<Self, Self::Error> {
        match value {
            6 => Ok(ErrorCode::InvalidFormat),

            1001 => Ok(ErrorCode::SignatureMissing),
            1002 => Ok(ErrorCode::SignatureInvalid),
            1003 => Ok(ErrorCode::SignatureExpired),

            2002 => Ok(ErrorCode::UserUnresolved),
            2003 => Ok(ErrorCode::ProductUnresolved),

            9002 => Ok(ErrorCode::DatabaseError),
            9006 => Ok(ErrorCode::PaymentProviderError),

            _ => Err(InvalidErrorCode(value)),
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}
