//! License key format: `CODE-XXXXXX-XXXXXX-XXXXXX`

use rand::Rng;

/// Prefix used when a product name has no ASCII alphanumerics
pub const FALLBACK_PRODUCT_CODE: &str = "LIC";

const SEGMENTS: usize = 3;
const SEGMENT_BYTES: usize = 3;

/// First three ASCII-alphanumeric characters of `product_name`, uppercased
///
/// Distinct products may share a code; key uniqueness is enforced by the store.
pub fn product_code(product_name: &str) -> String {
    let code: String = product_name
        .chars()
        .filter(char::is_ascii_alphanumeric)
        .take(3)
        .map(|c| c.to_ascii_uppercase())
        .collect();
    if code.is_empty() {
        FALLBACK_PRODUCT_CODE.to_string()
    } else {
        code
    }
}

/// Random key for `code`; callers check uniqueness
pub fn random_license_key(code: &str) -> String {
    let mut rng = rand::thread_rng();
    let mut key = code.to_string();
    for _ in 0..SEGMENTS {
        let bytes: [u8; SEGMENT_BYTES] = rng.r#gen();
        key.push('-');
        key.push_str(&hex::encode_upper(bytes));
    }
    key
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn code_takes_first_three_alphanumerics() {
        assert_eq!(product_code("Autovoter"), "AUT");
        assert_eq!(product_code("x-ray vision"), "XRA");
        assert_eq!(product_code("  9 lives"), "9LI");
        assert_eq!(product_code("Go"), "GO");
    }

    #[test]
    fn code_falls_back_when_nothing_usable() {
        assert_eq!(product_code(""), "LIC");
        assert_eq!(product_code("---"), "LIC");
        assert_eq!(product_code("Ünï"), "N");
    }

    #[test]
    fn key_has_expected_shape() {
        let key = random_license_key("AUT");
        let parts: Vec<&str> = key.split('-').collect();
        assert_eq!(parts.len(), 4);
        assert_eq!(parts[0], "AUT");
        for segment in &parts[1..] {
            assert_eq!(segment.len(), 6);
            assert!(segment
                .chars()
                .all(|c| c.is_ascii_digit() || ('A'..='F').contains(&c)));
        }
    }
}
