use std::fmt::{Display, Formatter};
use std::net::SocketAddr;
use std::time::Duration;

use clap::builder::RangedU64ValueParser;
use clap::{ArgAction, Parser, ValueEnum};
use shortlane_cache::redis::DEFAULT_KEY_PREFIX;
use shortlane_core::shortcode::{MAX_LENGTH, MIN_LENGTH};
use shortlane_shortener::CachePolicy;
use shortlane_telemetry::LogFormat;

pub const LISTEN_ADDR_ENV: &str = "SHORTLANE_LISTEN_ADDR";
pub const PUBLIC_BASE_URL_ENV: &str = "SHORTLANE_PUBLIC_BASE_URL";
pub const STORAGE_BACKEND_ENV: &str = "SHORTLANE_STORAGE_BACKEND";
pub const POSTGRES_DSN_ENV: &str = "SHORTLANE_POSTGRES_DSN";
pub const CACHE_BACKEND_ENV: &str = "SHORTLANE_CACHE_BACKEND";
pub const REDIS_URL_ENV: &str = "SHORTLANE_REDIS_URL";
pub const REDIS_KEY_PREFIX_ENV: &str = "SHORTLANE_REDIS_KEY_PREFIX";
pub const CODE_LENGTH_ENV: &str = "SHORTLANE_CODE_LENGTH";
pub const MAX_MINT_ATTEMPTS_ENV: &str = "SHORTLANE_MAX_MINT_ATTEMPTS";
pub const INITIAL_TTL_SECS_ENV: &str = "SHORTLANE_INITIAL_TTL_SECS";
pub const REPAIR_TTL_SECS_ENV: &str = "SHORTLANE_REPAIR_TTL_SECS";
pub const REPAIR_REFRESHES_CREATED_AT_ENV: &str = "SHORTLANE_REPAIR_REFRESHES_CREATED_AT";
pub const LOG_FORMAT_ENV: &str = "SHORTLANE_LOG_FORMAT";
pub const OTLP_ENDPOINT_ENV: &str = "SHORTLANE_OTLP_ENDPOINT";

pub const DEFAULT_LISTEN_ADDR: &str = "127.0.0.1:8080";
pub const DEFAULT_PUBLIC_BASE_URL: &str = "http://localhost:8080";

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum StorageBackendArg {
    #[value(name = "in-memory")]
    InMemory,
    #[value(name = "postgres")]
    Postgres,
}

impl Display for StorageBackendArg {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            StorageBackendArg::InMemory => write!(f, "in-memory"),
            StorageBackendArg::Postgres => write!(f, "postgres"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum CacheBackendArg {
    #[value(name = "in-memory")]
    InMemory,
    #[value(name = "redis")]
    Redis,
}

impl Display for CacheBackendArg {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            CacheBackendArg::InMemory => write!(f, "in-memory"),
            CacheBackendArg::Redis => write!(f, "redis"),
        }
    }
}

#[derive(Debug, Parser)]
#[command(name = "shortlane-gateway")]
#[command(about = "Shortlane URL shortener HTTP gateway")]
#[command(version)]
pub struct CLI {
    #[arg(long, env = LISTEN_ADDR_ENV, default_value = DEFAULT_LISTEN_ADDR)]
    pub listen_addr: SocketAddr,

    /// Base URL short codes are appended to in responses
    #[arg(long, env = PUBLIC_BASE_URL_ENV, default_value = DEFAULT_PUBLIC_BASE_URL)]
    pub public_base_url: String,

    #[arg(
        long,
        env = STORAGE_BACKEND_ENV,
        value_enum,
        default_value_t = StorageBackendArg::InMemory
    )]
    pub storage: StorageBackendArg,

    #[arg(long, env = POSTGRES_DSN_ENV, required_if_eq("storage", "postgres"))]
    pub postgres_dsn: Option<String>,

    #[arg(
        long,
        env = CACHE_BACKEND_ENV,
        value_enum,
        default_value_t = CacheBackendArg::InMemory
    )]
    pub cache: CacheBackendArg,

    #[arg(long, env = REDIS_URL_ENV, required_if_eq("cache", "redis"))]
    pub redis_url: Option<String>,

    #[arg(long, env = REDIS_KEY_PREFIX_ENV, default_value = DEFAULT_KEY_PREFIX)]
    pub redis_key_prefix: String,

    /// Number of symbols in generated short codes
    #[arg(
        long,
        env = CODE_LENGTH_ENV,
        default_value_t = 8,
        value_parser = RangedU64ValueParser::<usize>::new().range(MIN_LENGTH as u64..=MAX_LENGTH as u64)
    )]
    pub code_length: usize,

    /// Candidate draws per shorten call before giving up
    #[arg(long, env = MAX_MINT_ATTEMPTS_ENV, default_value_t = 16)]
    pub max_mint_attempts: u32,

    /// Cache TTL of a newly created code, in seconds
    #[arg(long, env = INITIAL_TTL_SECS_ENV, default_value_t = 604_800)]
    pub initial_ttl_secs: u64,

    /// Cache TTL of a record repaired from the durable store, in seconds
    #[arg(long, env = REPAIR_TTL_SECS_ENV, default_value_t = 86_400)]
    pub repair_ttl_secs: u64,

    /// Stamp repaired cache records with the repair time
    #[arg(
        long,
        env = REPAIR_REFRESHES_CREATED_AT_ENV,
        default_value_t = true,
        action = ArgAction::Set
    )]
    pub repair_refreshes_created_at: bool,

    #[arg(long, env = LOG_FORMAT_ENV, value_enum, default_value_t = LogFormat::Pretty)]
    pub log_format: LogFormat,

    /// OTLP gRPC endpoint for span export
    #[arg(long, env = OTLP_ENDPOINT_ENV)]
    pub otlp_endpoint: Option<String>,
}

impl CLI {
    pub fn cache_policy(&self) -> CachePolicy {
        CachePolicy::builder()
            .initial_ttl(Duration::from_secs(self.initial_ttl_secs))
            .repair_ttl(Duration::from_secs(self.repair_ttl_secs))
            .repair_refreshes_created_at(self.repair_refreshes_created_at)
            .build()
    }
}
