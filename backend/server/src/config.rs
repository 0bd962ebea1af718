use std::{env, fmt::Display, fs::read_to_string, str::FromStr, time::Duration};

use anyhow::{Context, Result};
use tracing::{info, warn};

pub const MEMORY_STORE: &str = "memory";

#[derive(Clone, Debug)]
pub struct Config {
    pub port: u16,
    pub redis_url: String,
    pub meili_url: Option<String>,
    pub meili_key: Option<String>,
    pub credential_pepper: String,
    pub exec_timeout: Duration,
    pub exec_max_output_bytes: usize,
    pub tab_switch_limit: u32,
    pub heartbeat_window: Duration,
    pub allowed_origin: String,
}

impl Config {
    pub fn load() -> Result<Self> {
        let meili_url: String = try_load("MEILI_URL", "")?;

        Ok(Self {
            port: try_load("RUST_PORT", "1111")?,
            redis_url: try_load("REDIS_URL", "redis://127.0.0.1:6379")?,
            meili_key: read_secret("MEILI_ADMIN_KEY"),
            meili_url: Some(meili_url).filter(|url| !url.is_empty()),
            credential_pepper: read_secret("CREDENTIAL_PEPPER").unwrap_or_default(),
            exec_timeout: Duration::from_millis(try_load("EXEC_TIMEOUT_MS", "10000")?),
            exec_max_output_bytes: try_load("EXEC_MAX_OUTPUT_BYTES", "65536")?,
            tab_switch_limit: try_load("TAB_SWITCH_LIMIT", "5")?,
            heartbeat_window: Duration::from_secs(try_load("HEARTBEAT_WINDOW_SECS", "60")?),
            allowed_origin: try_load("ALLOWED_ORIGIN", "*")?,
        })
    }

    /// In-memory store, no search index, short execution timeout.
    pub fn for_tests() -> Self {
        Self {
            port: 0,
            redis_url: MEMORY_STORE.to_string(),
            meili_url: None,
            meili_key: None,
            credential_pepper: "test-pepper".to_string(),
            exec_timeout: Duration::from_secs(5),
            exec_max_output_bytes: 64 * 1024,
            tab_switch_limit: 5,
            heartbeat_window: Duration::from_secs(60),
            allowed_origin: "*".to_string(),
        }
    }
}

fn var(key: &str) -> Option<String> {
    env::var(key).ok()
}

fn try_load<T: FromStr>(key: &str, default: &str) -> Result<T>
where
    T::Err: Display,
{
    let raw = var(key).unwrap_or_else(|| {
        info!("{key} not set, using default: {default}");
        default.to_string()
    });

    raw.parse().map_err(|e| {
        warn!("Invalid {key} value: {e}");
        anyhow::anyhow!("Environment misconfigured: {key}={raw}: {e}")
    })
}

fn read_secret(secret_name: &str) -> Option<String> {
    let path = format!("/run/secrets/{secret_name}");

    read_to_string(&path)
        .map(|s| s.trim().to_string())
        .with_context(|| format!("reading {path}"))
        .map_err(|e| {
            warn!("Failed to read {secret_name} from file: {e}");
        })
        .ok()
}
