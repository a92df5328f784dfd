//! Server configuration

use crate::fulfillment::RetryPolicy;
use crate::ledger::split::{Beneficiary, parse_split};

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Server configuration, loaded once at startup
#[derive(Debug, Clone)]
pub struct Config {
    /// SQLite database file
    pub database_path: String,
    pub http_port: u16,
    /// Environment: development | staging | production
    pub environment: String,
    pub log_level: String,
    /// JSON console/file logs (production)
    pub log_json: bool,
    /// Rolling file logs go here when set
    pub log_dir: Option<String>,
    /// HS256 secret for operator bearer tokens
    pub jwt_secret: String,
    /// Stripe secret key (fee lookup)
    pub stripe_secret_key: String,
    /// Stripe webhook signing secret
    pub stripe_webhook_secret: String,
    /// Shared token for cron-triggered endpoints and storefront intake
    pub cron_token: String,
    /// Tracking dashboard base URL; sync is disabled when unset
    pub tracking_url: Option<String>,
    /// Operations alert webhook (Slack-compatible); alerts are only logged when unset
    pub alert_webhook_url: Option<String>,
    /// Timeout for every outbound HTTP call
    pub outbound_timeout_secs: u64,
    pub retry_policy: RetryPolicy,
    /// Pending fulfillment orders older than this are reported as stuck
    pub stale_pending_minutes: i64,
    /// Campaign marker that attributes an order to `attribution_partner_code`
    pub attribution_marker: String,
    pub attribution_partner_code: String,
    /// Gross profit split, basis points per beneficiary
    pub profit_split: Vec<Beneficiary>,
}

impl Config {
    /// Require a secret env var: must be set and non-empty in non-development environments.
    fn require_secret(name: &str, environment: &str) -> Result<String, BoxError> {
        let val = match std::env::var(name) {
            Ok(v) => v,
            Err(_) => {
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

    /// Parse an optional env var; set but unparsable is an error, not the default
    fn parse_or<T>(name: &str, default: T) -> Result<T, BoxError>
    where
        T: std::str::FromStr,
        T::Err: std::fmt::Display,
    {
        parse_value(name, std::env::var(name).ok(), default)
    }

    fn optional(name: &str) -> Option<String> {
        std::env::var(name).ok().filter(|s| !s.is_empty())
    }

    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, BoxError> {
        let environment = std::env::var("ENVIRONMENT").unwrap_or_else(|_| "development".into());

        let profit_split = parse_split(
            &std::env::var("PROFIT_SPLIT").unwrap_or_else(|_| "owner:10000".into()),
        )?;

        let defaults = RetryPolicy::default();
        let retry_policy = RetryPolicy {
            max_attempts: Self::parse_or("DISPATCH_MAX_ATTEMPTS", defaults.max_attempts)?,
            base_delay_secs: Self::parse_or("DISPATCH_RETRY_BASE_SECS", defaults.base_delay_secs)?,
            max_delay_secs: Self::parse_or("DISPATCH_RETRY_MAX_SECS", defaults.max_delay_secs)?,
        };
        if retry_policy.max_attempts == 0 {
            return Err("DISPATCH_MAX_ATTEMPTS must be at least 1".into());
        }

        Ok(Self {
            database_path: std::env::var("DATABASE_PATH")
                .unwrap_or_else(|_| "./data/shop.db".into()),
            http_port: Self::parse_or("HTTP_PORT", 8080)?,
            environment: environment.clone(),
            log_level: std::env::var("LOG_LEVEL").unwrap_or_else(|_| "info".into()),
            log_json: Self::parse_or("LOG_JSON", environment != "development")?,
            log_dir: Self::optional("LOG_DIR"),
            jwt_secret: Self::require_secret("JWT_SECRET", &environment)?,
            stripe_secret_key: Self::require_secret("STRIPE_SECRET_KEY", &environment)?,
            stripe_webhook_secret: Self::require_secret("STRIPE_WEBHOOK_SECRET", &environment)?,
            cron_token: Self::require_secret("CRON_TOKEN", &environment)?,
            tracking_url: Self::optional("TRACKING_URL"),
            alert_webhook_url: Self::optional("ALERT_WEBHOOK_URL"),
            outbound_timeout_secs: Self::parse_or("OUTBOUND_TIMEOUT_SECS", 10)?,
            retry_policy,
            stale_pending_minutes: Self::parse_or("STALE_PENDING_MINUTES", 60)?,
            attribution_marker: std::env::var("ATTRIBUTION_MARKER")
                .unwrap_or_else(|_| "mkt-engine".into()),
            attribution_partner_code: std::env::var("ATTRIBUTION_PARTNER_CODE")
                .unwrap_or_else(|_| "HOUSE".into()),
            profit_split,
        })
    }

    pub fn is_development(&self) -> bool {
        self.environment == "development"
    }
}

fn parse_value<T>(name: &str, raw: Option<String>, default: T) -> Result<T, BoxError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match raw.as_deref().map(str::trim) {
        None | Some("") => Ok(default),
        Some(v) => v
            .parse()
            .map_err(|e| format!("{name}={v:?} is invalid: {e}").into()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unset_or_empty_uses_default() {
        assert_eq!(parse_value("HTTP_PORT", None, 8080u16).unwrap(), 8080);
        assert_eq!(parse_value("HTTP_PORT", Some("  ".into()), 8080u16).unwrap(), 8080);
        assert_eq!(parse_value("HTTP_PORT", Some("9090".into()), 8080u16).unwrap(), 9090);
    }

    #[test]
    fn malformed_value_is_an_error() {
        let err = parse_value("HTTP_PORT", Some("80a".into()), 8080u16).unwrap_err();
        assert!(err.to_string().contains("HTTP_PORT"));
        assert!(parse_value("HTTP_PORT", Some("70000".into()), 8080u16).is_err());
        assert!(parse_value("LOG_JSON", Some("yes".into()), false).is_err());
        assert!(parse_value("DISPATCH_MAX_ATTEMPTS", Some("-1".into()), 5u32).is_err());
    }
}
