use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use gobhar_axum::id_codec::DEFAULT_SECRET;
use gobhar_blob::GatewayConfig;

/// Process settings, read from the environment (and `.env`)
#[derive(Debug, Clone, PartialEq)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub store_dir: PathBuf,
    /// Key for obfuscated link ids; `None` serves path ids verbatim (file names)
    pub secret: Option<u64>,
    pub base_url: String,
    pub gateway: GatewayConfig,
}

impl ServerConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let host = var("HTTP_HOST").unwrap_or_else(|| "127.0.0.1".to_string());
        let port = parse_or(&var, "HTTP_PORT", 9090_u16)?;
        let store_dir = var("STORE_DIR").map_or_else(|| PathBuf::from("files"), PathBuf::from);

        let secret = match var("SECRET_KEY") {
            None => None,
            Some(v) if v.eq_ignore_ascii_case("none") => None,
            Some(v) if v.eq_ignore_ascii_case("default") => Some(DEFAULT_SECRET),
            Some(v) => Some(
                v.trim()
                    .parse()
                    .with_context(|| format!("SECRET_KEY must be an integer, got {v:?}"))?,
            ),
        };

        let base_url = match (var("BASE_URL"), var("VERCEL_URL")) {
            (Some(url), _) => url.trim_end_matches('/').to_string(),
            (None, Some(host)) => format!("https://{}", host.trim_end_matches('/')),
            (None, None) => format!("http://{host}:{port}"),
        };

        let defaults = GatewayConfig::new();
        let chunk_kb = parse_or(&var, "CHUNK_SIZE_KB", defaults.chunk_size / 1024)?;
        let attempts = parse_or(&var, "FETCH_MAX_ATTEMPTS", defaults.max_attempts)?;
        let timeout = parse_or(&var, "FETCH_TIMEOUT_SECS", defaults.fetch_timeout.as_secs())?;
        let gateway = defaults
            .with_chunk_size(chunk_kb.saturating_mul(1024))
            .with_max_attempts(attempts)
            .with_fetch_timeout(Duration::from_secs(timeout));
        gateway.validate().context("invalid gateway settings")?;

        Ok(Self {
            host,
            port,
            store_dir,
            secret,
            base_url,
            gateway,
        })
    }

    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

fn parse_or<T, F>(var: &F, key: &str, default: T) -> Result<T>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
    F: Fn(&str) -> Option<String>,
{
    match var(key) {
        Some(raw) => raw
            .trim()
            .parse()
            .with_context(|| format!("{key} has invalid value {raw:?}")),
        None => Ok(default),
    }
}
