//! Command-line and environment configuration.
//!
//! 引数がなければ環境変数、それもなければ既定値。
//! 期間は humantime 形式（`1h`, `90s`, `15m`）で受け取ります。

use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use clap::{Parser, ValueEnum};
use imgpack_core::app::settings::{DEFAULT_FETCH_CONCURRENCY, Settings};
use imgpack_core::app::RetryPolicy;
use url::Url;

use crate::logging::Profile;

/// Base delay of the first retry when retries are enabled.
const RETRY_BASE_DELAY: Duration = Duration::from_millis(200);

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogFormat {
    /// Human-readable lines.
    Pretty,
    /// One JSON object per event.
    Json,
}

/// imgpack: bundle remote images into short-lived ZIP downloads.
#[derive(Debug, Clone, Parser)]
#[command(name = "imgpack", version, about)]
pub struct Args {
    /// Address to listen on.
    #[arg(long, env = "IMGPACK_BIND", default_value = "127.0.0.1:3000")]
    pub bind: SocketAddr,

    /// Directory holding finished archives.
    #[arg(long, env = "IMGPACK_STORAGE_DIR", default_value = "./storage")]
    pub storage_dir: PathBuf,

    /// Base URL used in returned download links. Defaults to `http://<bind>`.
    #[arg(long, env = "IMGPACK_PUBLIC_URL")]
    pub public_url: Option<Url>,

    /// Minimum time an archive stays downloadable.
    #[arg(long, env = "IMGPACK_TTL", default_value = "1h", value_parser = parse_duration)]
    pub ttl: Duration,

    /// Time between two garbage-collection sweeps.
    #[arg(long, env = "IMGPACK_SWEEP_INTERVAL", default_value = "1h", value_parser = parse_duration)]
    pub sweep_interval: Duration,

    /// Fetches running at once within one batch.
    #[arg(
        long,
        env = "IMGPACK_FETCH_CONCURRENCY",
        default_value_t = DEFAULT_FETCH_CONCURRENCY,
        value_parser = parse_concurrency
    )]
    pub fetch_concurrency: usize,

    /// Timeout of a single image request, body included.
    #[arg(long, env = "IMGPACK_FETCH_TIMEOUT", default_value = "30s", value_parser = parse_duration)]
    pub fetch_timeout: Duration,

    /// Extra attempts for transient fetch failures (0 disables retries).
    #[arg(long, env = "IMGPACK_FETCH_RETRIES", default_value_t = 0)]
    pub fetch_retries: u32,

    #[arg(long, env = "IMGPACK_LOG_FORMAT", value_enum, default_value_t = LogFormat::Pretty)]
    pub log_format: LogFormat,
}

impl Args {
    pub fn settings(&self) -> Settings {
        let retry = if self.fetch_retries == 0 {
            RetryPolicy::no_retry()
        } else {
            RetryPolicy::exponential(self.fetch_retries, RETRY_BASE_DELAY)
        };

        Settings {
            ttl: self.ttl,
            sweep_interval: self.sweep_interval,
            fetch_concurrency: self.fetch_concurrency,
            fetch_timeout: self.fetch_timeout,
            retry,
        }
    }

    pub fn public_base(&self) -> Result<Url, url::ParseError> {
        match &self.public_url {
            Some(url) => Ok(url.clone()),
            None => default_public_url(self.bind),
        }
    }

    pub fn log_profile(&self) -> Profile {
        match self.log_format {
            LogFormat::Pretty => Profile::Development,
            LogFormat::Json => Profile::Production,
        }
    }
}

/// `0.0.0.0` / `::` are not reachable addresses, so links point at localhost instead.
fn default_public_url(bind: SocketAddr) -> Result<Url, url::ParseError> {
    let host = if bind.ip().is_unspecified() {
        "localhost".to_string()
    } else if bind.is_ipv6() {
        format!("[{}]", bind.ip())
    } else {
        bind.ip().to_string()
    };
    Url::parse(&format!("http://{host}:{}", bind.port()))
}

fn parse_duration(raw: &str) -> Result<Duration, String> {
    let duration = humantime::parse_duration(raw).map_err(|e| e.to_string())?;
    if duration.is_zero() {
        return Err("must be greater than zero".to_string());
    }
    Ok(duration)
}

fn parse_concurrency(raw: &str) -> Result<usize, String> {
    match raw.parse::<usize>() {
        Ok(0) => Err("must be at least 1".to_string()),
        Ok(n) => Ok(n),
        Err(e) => Err(e.to_string()),
    }
}
