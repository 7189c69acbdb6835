//! Stripe webhook signature verification (HMAC-SHA256)
//!
//! Header format: `t=<unix seconds>,v1=<hex>[,v1=<hex>...]`. The signed
//! payload is `"{t}.{raw body}"`.

use hmac::{Hmac, Mac};
use sha2::Sha256;
use thiserror::Error;

type HmacSha256 = Hmac<Sha256>;

/// Request header carrying the signature
pub const SIGNATURE_HEADER: &str = "stripe-signature";

/// Default timestamp tolerance in seconds
pub const DEFAULT_TOLERANCE_SECS: i64 = 300;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SignatureError {
    #[error("invalid Stripe-Signature header")]
    MalformedHeader,
    #[error("invalid signature timestamp")]
    InvalidTimestamp,
    #[error("webhook signature mismatch")]
    Mismatch,
    #[error("webhook timestamp outside tolerance")]
    TimestampOutsideTolerance,
    #[error("HMAC key error")]
    Key,
}

/// Verify a webhook signature against the signing secret using the current time
pub fn verify_webhook_signature(
    payload: &[u8],
    sig_header: &str,
    secret: &str,
    tolerance_secs: i64,
) -> Result<(), SignatureError> {
    verify_webhook_signature_at(
        payload,
        sig_header,
        secret,
        tolerance_secs,
        chrono::Utc::now().timestamp(),
    )
}

/// Verify a webhook signature as of `now` (unix seconds)
pub fn verify_webhook_signature_at(
    payload: &[u8],
    sig_header: &str,
    secret: &str,
    tolerance_secs: i64,
    now: i64,
) -> Result<(), SignatureError> {
    let mut timestamp = "";
    let mut signatures = Vec::new();
    for part in sig_header.split(',') {
        let part = part.trim();
        if let Some(t) = part.strip_prefix("t=") {
            timestamp = t;
        } else if let Some(v) = part.strip_prefix("v1=") {
            signatures.push(v);
        }
    }

    if timestamp.is_empty() || signatures.is_empty() {
        return Err(SignatureError::MalformedHeader);
    }

    let mac = signed_mac(payload, secret, timestamp)?;

    // Several v1 entries appear while the signing secret is being rolled
    let matched = signatures.iter().any(|sig| {
        hex::decode(sig)
            .map(|bytes| mac.clone().verify_slice(&bytes).is_ok())
            .unwrap_or(false)
    });
    if !matched {
        return Err(SignatureError::Mismatch);
    }

    let ts: i64 = timestamp
        .parse()
        .map_err(|_| SignatureError::InvalidTimestamp)?;
    // Timestamps near i64::MIN overflow the subtraction
    match now.checked_sub(ts).map(i64::unsigned_abs) {
        Some(skew) if skew <= tolerance_secs.unsigned_abs() => {}
        _ => return Err(SignatureError::TimestampOutsideTolerance),
    }

    Ok(())
}

/// Hex signature for `payload` at `timestamp`
pub fn compute_signature(payload: &[u8], secret: &str, timestamp: i64) -> String {
    match signed_mac(payload, secret, &timestamp.to_string()) {
        Ok(mac) => hex::encode(mac.finalize().into_bytes()),
        Err(_) => String::new(),
    }
}

/// Full `Stripe-Signature` header value for `payload` at `timestamp`
pub fn signature_header(payload: &[u8], secret: &str, timestamp: i64) -> String {
    format!(
        "t={timestamp},v1={}",
        compute_signature(payload, secret, timestamp)
    )
}

fn signed_mac(payload: &[u8], secret: &str, timestamp: &str) -> Result<HmacSha256, SignatureError> {
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes()).map_err(|_| SignatureError::Key)?;
    mac.update(timestamp.as_bytes());
    mac.update(b".");
    mac.update(payload);
    Ok(mac)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &str = "whsec_test123secret456";
    const NOW: i64 = 1_700_000_000;

    /// Independent reference implementation over the concatenated string
    fn reference_signature(payload: &[u8], secret: &str, timestamp: i64) -> String {
        let signed_payload = format!("{}.{}", timestamp, String::from_utf8_lossy(payload));
        let mut mac = HmacSha256::new_from_slice(secret.as_bytes()).unwrap();
        mac.update(signed_payload.as_bytes());
        hex::encode(mac.finalize().into_bytes())
    }

    #[test]
    fn accepts_valid_signature() {
        let payload = br#"{"type":"checkout.session.completed"}"#;
        let header = format!("t={NOW},v1={}", reference_signature(payload, SECRET, NOW));
        assert_eq!(
            verify_webhook_signature_at(payload, &header, SECRET, 300, NOW),
            Ok(())
        );
        assert_eq!(signature_header(payload, SECRET, NOW), header);
    }

    #[test]
    fn rejects_wrong_secret() {
        let payload = br#"{"type":"checkout.session.completed"}"#;
        let header = format!("t={NOW},v1={}", reference_signature(payload, "wrong", NOW));
        assert_eq!(
            verify_webhook_signature_at(payload, &header, SECRET, 300, NOW),
            Err(SignatureError::Mismatch)
        );
    }

    #[test]
    fn rejects_modified_payload() {
        let header = signature_header(br#"{"amount":100}"#, SECRET, NOW);
        assert_eq!(
            verify_webhook_signature_at(br#"{"amount":999}"#, &header, SECRET, 300, NOW),
            Err(SignatureError::Mismatch)
        );
    }

    #[test]
    fn rejects_malformed_headers() {
        let payload = b"{}";
        for header in ["", "garbage", "t=123", "v1=abcd", "t=,v1="] {
            assert_eq!(
                verify_webhook_signature_at(payload, header, SECRET, 300, NOW),
                Err(SignatureError::MalformedHeader),
                "header {header:?}"
            );
        }
        let bad_hex = format!("t={NOW},v1=zzzz");
        assert_eq!(
            verify_webhook_signature_at(payload, &bad_hex, SECRET, 300, NOW),
            Err(SignatureError::Mismatch)
        );
    }

    #[test]
    fn rejects_stale_and_future_timestamps() {
        let payload = b"{}";
        let old = signature_header(payload, SECRET, NOW - 600);
        assert_eq!(
            verify_webhook_signature_at(payload, &old, SECRET, 300, NOW),
            Err(SignatureError::TimestampOutsideTolerance)
        );
        let future = signature_header(payload, SECRET, NOW + 600);
        assert_eq!(
            verify_webhook_signature_at(payload, &future, SECRET, 300, NOW),
            Err(SignatureError::TimestampOutsideTolerance)
        );
        let edge = signature_header(payload, SECRET, NOW - 300);
        assert_eq!(
            verify_webhook_signature_at(payload, &edge, SECRET, 300, NOW),
            Ok(())
        );
    }

    #[test]
    fn extreme_timestamps_are_rejected_without_overflow() {
        let payload = b"{}";
        for ts in [i64::MIN, i64::MIN + 1, i64::MAX] {
            let header = signature_header(payload, SECRET, ts);
            assert_eq!(
                verify_webhook_signature_at(payload, &header, SECRET, 300, NOW),
                Err(SignatureError::TimestampOutsideTolerance),
                "timestamp {ts}"
            );
        }
    }

    #[test]
    fn accepts_any_matching_v1_during_secret_rotation() {
        let payload = b"{\"id\":\"evt_1\"}";
        let stale = compute_signature(payload, "whsec_old", NOW);
        let current = compute_signature(payload, SECRET, NOW);
        let header = format!("t={NOW},v1={stale},v1={current}");
        assert_eq!(
            verify_webhook_signature_at(payload, &header, SECRET, 300, NOW),
            Ok(())
        );
    }
}
