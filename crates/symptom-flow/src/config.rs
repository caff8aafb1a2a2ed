use std::str::FromStr;
use std::time::Duration;

use diagnosis_common::client::DiagnosisClientConfig;

use crate::error::AppError;
use crate::service::SuggestSource;

const DEFAULT_CATALOG_TTL_SECS: u64 = 3600;

/// Application configuration loaded from environment variables.
///
/// Everything has a default, so the server starts against a local service
/// (`http://localhost:8000/api`) with no configuration at all.
#[derive(Debug, Clone)]
pub struct Config {
    pub client: DiagnosisClientConfig,
    /// Redis connection URL. `None` disables caching.
    pub redis_url: Option<String>,
    pub suggest_source: SuggestSource,
    pub catalog_ttl_secs: u64,
    /// Serve MCP over TCP on this address instead of stdio.
    pub tcp_listen_addr: Option<String>,
}

impl Config {
    /// Optional:
    /// - `SDX_API_BASE_URL` (default: `http://localhost:8000/api`)
    /// - `SDX_TIMEOUT_SECS` (default: 30), `SDX_MAX_ERROR_BODY_BYTES` (default: 8192)
    /// - `SDX_SUGGEST_SOURCE`: `remote` (default) or `catalog`
    /// - `SDX_CATALOG_TTL_SECS` (default: 3600)
    /// - `REDIS_URL`
    /// - `MCP_TCP_LISTEN_ADDR`
    ///
    /// Numeric values must be positive integers.
    pub fn from_env() -> Result<Self, AppError> {
        let defaults = DiagnosisClientConfig::default();
        let client = DiagnosisClientConfig {
            base_url: std::env::var("SDX_API_BASE_URL")
                .map(|url| url.trim_end_matches('/').to_string())
                .unwrap_or(defaults.base_url),
            default_timeout: match std::env::var("SDX_TIMEOUT_SECS") {
                Ok(raw) => Duration::from_secs(parse_positive("SDX_TIMEOUT_SECS", &raw)?),
                Err(_) => defaults.default_timeout,
            },
            max_error_body_bytes: match std::env::var("SDX_MAX_ERROR_BODY_BYTES") {
                Ok(raw) => parse_positive("SDX_MAX_ERROR_BODY_BYTES", &raw)?,
                Err(_) => defaults.max_error_body_bytes,
            },
        };

        let suggest_source = match std::env::var("SDX_SUGGEST_SOURCE") {
            Ok(raw) => raw.parse::<SuggestSource>()?,
            Err(_) => SuggestSource::default(),
        };

        let catalog_ttl_secs = match std::env::var("SDX_CATALOG_TTL_SECS") {
            Ok(raw) => parse_positive("SDX_CATALOG_TTL_SECS", &raw)?,
            Err(_) => DEFAULT_CATALOG_TTL_SECS,
        };

        Ok(Self {
            client,
            redis_url: std::env::var("REDIS_URL").ok().filter(|s| !s.trim().is_empty()),
            suggest_source,
            catalog_ttl_secs,
            tcp_listen_addr: std::env::var("MCP_TCP_LISTEN_ADDR").ok(),
        })
    }
}

fn parse_positive<T>(name: &str, raw: &str) -> Result<T, AppError>
where
    T: FromStr + PartialOrd + Default,
{
    raw.trim()
        .parse::<T>()
        .ok()
        .filter(|n| *n > T::default())
        .ok_or_else(|| AppError::Config(format!("{name} must be a positive integer, got {raw:?}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ttl_must_be_positive() {
        assert_eq!(parse_positive::<u64>("SDX_CATALOG_TTL_SECS", "600").unwrap(), 600);
        assert_eq!(parse_positive::<u64>("SDX_CATALOG_TTL_SECS", " 60 ").unwrap(), 60);
        assert!(matches!(
            parse_positive::<u64>("SDX_CATALOG_TTL_SECS", "soon"),
            Err(AppError::Config(_))
        ));
    }

    #[test]
    fn zero_timeout_is_rejected() {
        match parse_positive::<u64>("SDX_TIMEOUT_SECS", "0") {
            Err(AppError::Config(msg)) => {
                assert_eq!(msg, "SDX_TIMEOUT_SECS must be a positive integer, got \"0\"")
            }
            other => panic!("unexpected result: {other:?}"),
        }
        assert!(parse_positive::<u64>("SDX_TIMEOUT_SECS", "-5").is_err());
        assert_eq!(parse_positive::<usize>("SDX_MAX_ERROR_BODY_BYTES", "4096").unwrap(), 4096);
    }
}
