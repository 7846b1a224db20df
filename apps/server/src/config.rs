use std::{net::SocketAddr, str::FromStr, time::Duration};

use anyhow::{anyhow, Context};
use eventwise_core::PipelineConfig;
use eventwise_upstream::provider::{cbr, kudago};

#[derive(Debug)]
pub struct Config {
    pub listen_addr: SocketAddr,
    pub kudago_base_url: String,
    pub cbr_daily_url: String,
    pub cors_allow: Vec<String>,
    pub request_timeout: Duration,
    pub pipeline: PipelineConfig,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build the configuration from `lookup`, which returns the raw value of
    /// an `EW_*` key when it is set.
    pub fn from_lookup<F>(lookup: F) -> anyhow::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = PipelineConfig::default();

        let listen_addr = parse_or(&lookup, "EW_LISTEN_ADDR", "0.0.0.0:8080".parse()?)?;
        let kudago_base_url = lookup("EW_KUDAGO_BASE_URL")
            .unwrap_or_else(|| kudago::DEFAULT_BASE_URL.to_string());
        let cbr_daily_url =
            lookup("EW_CBR_DAILY_URL").unwrap_or_else(|| cbr::DEFAULT_DAILY_URL.to_string());
        let cors_allow = lookup("EW_CORS_ALLOW_ORIGINS")
            .unwrap_or_else(|| "*".into())
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();
        let request_timeout_ms: u64 = parse_or(&lookup, "EW_REQUEST_TIMEOUT_MS", 30_000)?;

        let mut pipeline = PipelineConfig {
            max_concurrent_requests: parse_or(
                &lookup,
                "EW_MAX_CONCURRENT_REQUESTS",
                defaults.max_concurrent_requests,
            )?,
            upstream_timeout: Duration::from_millis(parse_or(
                &lookup,
                "EW_UPSTREAM_TIMEOUT_MS",
                defaults.upstream_timeout.as_millis() as u64,
            )?),
            rates_cache_ttl: Duration::from_secs(parse_or(
                &lookup,
                "EW_RATES_CACHE_TTL_SECS",
                defaults.rates_cache_ttl.as_secs(),
            )?),
            query_span_days: match lookup("EW_QUERY_SPAN_DAYS") {
                Some(raw) => Some(
                    raw.trim()
                        .parse()
                        .with_context(|| format!("Invalid EW_QUERY_SPAN_DAYS '{}'", raw))?,
                ),
                None => defaults.query_span_days,
            },
            ..defaults
        };
        pipeline.circuit_breaker.failure_threshold = parse_or(
            &lookup,
            "EW_BREAKER_FAILURE_THRESHOLD",
            pipeline.circuit_breaker.failure_threshold,
        )?;
        pipeline.circuit_breaker.recovery_timeout = Duration::from_secs(parse_or(
            &lookup,
            "EW_BREAKER_COOLDOWN_SECS",
            pipeline.circuit_breaker.recovery_timeout.as_secs(),
        )?);
        pipeline.circuit_breaker.failure_window = Duration::from_secs(parse_or(
            &lookup,
            "EW_BREAKER_WINDOW_SECS",
            pipeline.circuit_breaker.failure_window.as_secs(),
        )?);

        pipeline
            .validate()
            .map_err(|e| anyhow!("Invalid pipeline configuration: {}", e))?;

        Ok(Self {
            listen_addr,
            kudago_base_url,
            cbr_daily_url,
            cors_allow,
            request_timeout: Duration::from_millis(request_timeout_ms),
            pipeline,
        })
    }
}

fn parse_or<F, T>(lookup: &F, key: &str, default: T) -> anyhow::Result<T>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match lookup(key) {
        Some(raw) => raw
            .trim()
            .parse()
            .with_context(|| format!("Invalid {} '{}'", key, raw)),
        None => Ok(default),
    }
}
