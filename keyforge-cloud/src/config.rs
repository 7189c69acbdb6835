//! Service configuration from environment variables

use std::time::Duration;

use crate::stripe::signature::DEFAULT_TOLERANCE_SECS;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

#[derive(Debug, Clone)]
pub struct Config {
    /// PostgreSQL connection URL
    pub database_url: String,
    pub http_port: u16,
    /// Environment: development | staging | production
    pub environment: String,
    /// Stripe secret key
    pub stripe_secret_key: String,
    /// Stripe webhook signing secret
    pub stripe_webhook_secret: String,
    pub stripe_api_base: String,
    pub stripe_timeout: Duration,
    /// Accepted clock skew for webhook signatures, in seconds
    pub webhook_tolerance_secs: i64,
    /// Extra price id → product name entries (env: PRICE_PRODUCT_MAP)
    pub price_product_map: Vec<(String, String)>,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, BoxError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Load configuration through `lookup` (env var name → value)
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, BoxError> {
        let environment = lookup("ENVIRONMENT").unwrap_or_else(|| "development".into());

        Ok(Self {
            database_url: lookup("DATABASE_URL").ok_or("DATABASE_URL must be set")?,
            http_port: parse_or(&lookup, "HTTP_PORT", 8080)?,
            stripe_secret_key: require_secret(&lookup, "STRIPE_SECRET_KEY", &environment)?,
            stripe_webhook_secret: require_secret(&lookup, "STRIPE_WEBHOOK_SECRET", &environment)?,
            stripe_api_base: lookup("STRIPE_API_BASE")
                .filter(|s| !s.is_empty())
                .unwrap_or_else(|| "https://api.stripe.com".into()),
            stripe_timeout: Duration::from_secs(parse_or(&lookup, "STRIPE_TIMEOUT_SECS", 20)?),
            webhook_tolerance_secs: parse_or(
                &lookup,
                "WEBHOOK_TOLERANCE_SECS",
                DEFAULT_TOLERANCE_SECS,
            )?,
            price_product_map: match lookup("PRICE_PRODUCT_MAP") {
                Some(raw) => parse_price_map(&raw)?,
                None => Vec::new(),
            },
            environment,
        })
    }

    pub fn is_development(&self) -> bool {
        self.environment == "development"
    }
}

/// Require a secret env var: must be set and non-empty outside development.
fn require_secret(
    lookup: &impl Fn(&str) -> Option<String>,
    name: &str,
    environment: &str,
) -> Result<String, BoxError> {
    let val = match lookup(name) {
        Some(v) => v,
        None => {
            if environment != "development" {
                return Err(format!("{name} must be set in {environment} environment").into());
            }
            format!("dev-{name}-not-for-production")
        }
    };
    if val.is_empty() && environment != "development" {
        return Err(format!("{name} must not be empty in {environment} environment").into());
    }
    Ok(val)
}

fn parse_or<T>(
    lookup: &impl Fn(&str) -> Option<String>,
    name: &str,
    default: T,
) -> Result<T, BoxError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match lookup(name).filter(|v| !v.trim().is_empty()) {
        Some(v) => v
            .trim()
            .parse()
            .map_err(|e| format!("{name}: invalid value {v:?}: {e}").into()),
        None => Ok(default),
    }
}

/// Parse `price_a=Product A,price_b=Product B`
pub fn parse_price_map(raw: &str) -> Result<Vec<(String, String)>, BoxError> {
    raw.split(',')
        .map(str::trim)
        .filter(|entry| !entry.is_empty())
        .map(|entry| -> Result<(String, String), BoxError> {
            let (price, product) = entry
                .split_once('=')
                .ok_or_else(|| format!("PRICE_PRODUCT_MAP: expected price=name, got {entry:?}"))?;
            let (price, product) = (price.trim(), product.trim());
            if price.is_empty() || product.is_empty() {
                return Err(format!("PRICE_PRODUCT_MAP: empty side in {entry:?}").into());
            }
            Ok((price.to_string(), product.to_string()))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn load(vars: &[(&str, &str)]) -> Result<Config, BoxError> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|name| vars.get(name).cloned())
    }

    #[test]
    fn development_defaults() {
        let config = load(&[("DATABASE_URL", "postgres://localhost/keyforge")]).unwrap();
        assert!(config.is_development());
        assert_eq!(config.http_port, 8080);
        assert_eq!(config.stripe_api_base, "https://api.stripe.com");
        assert_eq!(config.stripe_timeout, Duration::from_secs(20));
        assert_eq!(config.webhook_tolerance_secs, 300);
        assert_eq!(
            config.stripe_webhook_secret,
            "dev-STRIPE_WEBHOOK_SECRET-not-for-production"
        );
        assert!(config.price_product_map.is_empty());
    }

    #[test]
    fn database_url_is_required() {
        assert!(load(&[]).is_err());
    }

    #[test]
    fn secrets_required_outside_development() {
        let err = load(&[
            ("DATABASE_URL", "postgres://db/keyforge"),
            ("ENVIRONMENT", "production"),
            ("STRIPE_SECRET_KEY", "sk_live_x"),
        ])
        .unwrap_err();
        assert!(err.to_string().contains("STRIPE_WEBHOOK_SECRET"));

        let err = load(&[
            ("DATABASE_URL", "postgres://db/keyforge"),
            ("ENVIRONMENT", "staging"),
            ("STRIPE_SECRET_KEY", "sk_test_x"),
            ("STRIPE_WEBHOOK_SECRET", ""),
        ])
        .unwrap_err();
        assert!(err.to_string().contains("must not be empty"));
    }

    #[test]
    fn overrides_are_parsed() {
        let config = load(&[
            ("DATABASE_URL", "postgres://db/keyforge"),
            ("HTTP_PORT", "9000"),
            ("WEBHOOK_TOLERANCE_SECS", "60"),
            ("PRICE_PRODUCT_MAP", "price_a=Raid Helper, price_b = Autovoter Pro ,"),
        ])
        .unwrap();
        assert_eq!(config.http_port, 9000);
        assert_eq!(config.webhook_tolerance_secs, 60);
        assert_eq!(
            config.price_product_map,
            vec![
                ("price_a".to_string(), "Raid Helper".to_string()),
                ("price_b".to_string(), "Autovoter Pro".to_string()),
            ]
        );
    }

    #[test]
    fn invalid_values_are_rejected() {
        assert!(load(&[("DATABASE_URL", "x"), ("HTTP_PORT", "eighty")]).is_err());
        assert!(parse_price_map("price_a").is_err());
        assert!(parse_price_map("=Autovoter").is_err());
    }
}
