use anyhow::{ Context, Result };
use dotenv::dotenv;
use serde::{ Deserialize, Serialize };
use std::env;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;
use tracing::Level;

use crate::exchange::feed::{ FeedSettings, ALL_TICKERS_TOPIC };
use crate::exchange::kucoin::KUCOIN_REST_URL;
use crate::scheduler::rate_limiter::RateLimitConfig;
use crate::utils::serde_helpers::{ serialize_level, deserialize_level };

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub debug: bool,

    pub rest_url: String,
    pub ticker_topic: String,

    pub rate_limit_requests: usize,
    pub rate_limit_interval_ms: u64,

    /// Seconds between full ticker re-syncs, 0 disables them
    pub resync_interval_secs: u64,
    pub reconnect_delay_ms: u64,
    pub max_connection_attempts: usize,
    pub event_buffer: usize,

    /// Opportunities below this value (percent) are not printed
    pub min_profit: f64,
    pub display_top: usize,
    pub display_interval_ms: u64,

    #[serde(serialize_with = "serialize_level", deserialize_with = "deserialize_level")]
    pub log_level: Level,
    pub log_config: LogConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogConfig {
    pub directory: PathBuf,
    pub filename_prefix: String,
    pub rotation: LogRotation,
    pub max_files: Option<usize>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LogRotation {
    Hourly,
    Daily,
    Never,
}

impl LogRotation {
    /// Unknown values fall back to daily
    pub fn parse(value: &str) -> Self {
        match value.to_lowercase().as_str() {
            "hourly" => LogRotation::Hourly,
            "never" => LogRotation::Never,
            _ => LogRotation::Daily,
        }
    }
}

/// Unknown values fall back to info
pub fn parse_level(value: &str) -> Level {
    match value.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    }
}

/// Read `name`, falling back to `default` when unset
fn var_or<T>(name: &str, default: &str) -> Result<T>
    where T: FromStr, <T as FromStr>::Err: std::error::Error + Send + Sync + 'static
{
    env::var(name)
        .unwrap_or_else(|_| default.to_string())
        .trim()
        .parse::<T>()
        .with_context(|| format!("Failed to parse {} environment variable", name))
}

impl Config {
    pub fn from_env() -> Result<Self> {
        if let Err(e) = dotenv() {
            eprintln!("Warning: could not load .env file ({}), using environment only", e);
        }

        let debug = var_or::<bool>("KTA_DEBUG", "false")?;

        let rest_url = env::var("KTA_REST_URL").unwrap_or_else(|_| KUCOIN_REST_URL.to_string());
        let ticker_topic = env
            ::var("KTA_TICKER_TOPIC")
            .unwrap_or_else(|_| ALL_TICKERS_TOPIC.to_string());

        let rate_limit_requests = var_or::<usize>("KTA_RATE_LIMIT_REQUESTS", "3")?;
        let rate_limit_interval_ms = var_or::<u64>("KTA_RATE_LIMIT_INTERVAL_MS", "1000")?;

        let resync_interval_secs = var_or::<u64>("KTA_RESYNC_INTERVAL_SECS", "300")?;
        let reconnect_delay_ms = var_or::<u64>("KTA_RECONNECT_DELAY_MS", "5000")?;
        let max_connection_attempts = var_or::<usize>("KTA_MAX_CONNECTION_ATTEMPTS", "30")?;
        let event_buffer = var_or::<usize>("KTA_EVENT_BUFFER", "1024")?;

        let min_profit = var_or::<f64>("KTA_MIN_PROFIT", "0.0")?;
        let display_top = var_or::<usize>("KTA_DISPLAY_TOP", "20")?;
        let display_interval_ms = var_or::<u64>("KTA_DISPLAY_INTERVAL_MS", "1000")?;

        let log_level = parse_level(
            &env::var("KTA_LOG_LEVEL").unwrap_or_else(|_| "info".to_string())
        );

        // Set up logging configuration
        let log_dir = env::var("KTA_LOG_DIRECTORY").unwrap_or_else(|_| "logs".to_string());

        let log_prefix = env
            ::var("KTA_LOG_FILENAME_PREFIX")
            .unwrap_or_else(|_| "kucoin_tri_arb".to_string());

        let log_rotation = LogRotation::parse(
            &env::var("KTA_LOG_ROTATION").unwrap_or_else(|_| "daily".to_string())
        );

        let max_files = env
            ::var("KTA_LOG_MAX_FILES")
            .ok()
            .and_then(|s| s.parse::<usize>().ok());

        let log_config = LogConfig {
            directory: PathBuf::from(log_dir),
            filename_prefix: log_prefix,
            rotation: log_rotation,
            max_files,
        };

        Ok(Config {
            debug,
            rest_url,
            ticker_topic,
            rate_limit_requests,
            rate_limit_interval_ms,
            resync_interval_secs,
            reconnect_delay_ms,
            max_connection_attempts,
            event_buffer: event_buffer.max(1),
            min_profit,
            display_top,
            display_interval_ms,
            log_level,
            log_config,
        })
    }

    pub fn rate_limit(&self) -> RateLimitConfig {
        RateLimitConfig {
            max_requests: self.rate_limit_requests,
            window: Duration::from_millis(self.rate_limit_interval_ms),
        }
    }

    pub fn feed_settings(&self) -> FeedSettings {
        FeedSettings {
            topic: self.ticker_topic.clone(),
            reconnect_delay: Duration::from_millis(self.reconnect_delay_ms),
        }
    }

    #[inline]
    pub fn resync_interval(&self) -> Duration {
        Duration::from_secs(self.resync_interval_secs)
    }

    #[inline]
    pub fn display_interval(&self) -> Duration {
        Duration::from_millis(self.display_interval_ms)
    }
}
