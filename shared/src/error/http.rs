//! HTTP status code mapping for error codes

use super::codes::ErrorCode;
use http::StatusCode;

impl ErrorCode {
    /// Get the appropriate HTTP status code for this error code
    ///
    /// Webhook authentication failures map to 400, not 401.
    pub fn http_status(&self) -> StatusCode {
        match self {
            Self::DatabaseError | Self::PaymentProviderError => {
                StatusCode::INTERNAL_SERVER_ERROR
            }

            // 400 Bad Request (signature, payload and business-data errors)
            Self::InvalidFormat
            | Self::SignatureMissing
            | Self::SignatureInvalid
            | Self::SignatureExpired
            | Self::UserUnresolved
            | Self::ProductUnresolved => StatusCode::BAD_REQUEST,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        assert_eq!(ErrorCode::SignatureMissing.http_status(), StatusCode::BAD_REQUEST);
        assert_eq!(ErrorCode::SignatureInvalid.http_status(), StatusCode::BAD_REQUEST);
        assert_eq!(ErrorCode::InvalidFormat.http_status(), StatusCode::BAD_REQUEST);
        assert_eq!(ErrorCode::UserUnresolved.http_status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            ErrorCode::DatabaseError.http_status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            ErrorCode::PaymentProviderError.http_status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(ErrorCode::ProductUnresolved.http_status(), StatusCode::BAD_REQUEST);
    }
}
