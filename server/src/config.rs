use std::net::SocketAddr;

use anyhow::{Context, Result};

const DEFAULT_BIND: &str = "127.0.0.1:8080";
const DEFAULT_CORS_ORIGINS: &str = "http://localhost:5173";

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub bind: SocketAddr,
    pub cors_allowed_origins: Vec<String>,
}

impl AppConfig {
    pub fn load() -> Result<Self> {
        let bind = std::env::var("BIND").ok();
        let origins = std::env::var("CORS_ALLOWED_ORIGINS").ok();
        Self::from_values(bind.as_deref(), origins.as_deref())
    }

    fn from_values(bind: Option<&str>, origins: Option<&str>) -> Result<Self> {
        let raw_bind = bind
            .map(str::trim)
            .filter(|value| !value.is_empty())
            .unwrap_or(DEFAULT_BIND);
        let bind = raw_bind
            .parse::<SocketAddr>()
            .with_context(|| format!("invalid BIND address {raw_bind}"))?;

        let cors_allowed_origins = origins
            .unwrap_or(DEFAULT_CORS_ORIGINS)
            .split(',')
            .filter_map(|s| {
                let trimmed = s.trim();
                if trimmed.is_empty() {
                    None
                } else {
                    Some(trimmed.to_string())
                }
            })
            .collect::<Vec<_>>();

        Ok(Self {
            bind,
            cors_allowed_origins,
        })
    }
}
