use std::net::SocketAddr;
use std::path::PathBuf;

use anyhow::{Context, Result, bail};

use sitedrop_relay::RelayConfig;

/// Placeholder JWT secrets that MUST NOT be used.
const PLACEHOLDER_SECRETS: &[&str] = &[
    "your_secret_key",
    "change-me-to-a-random-string",
    "dev-secret-change-me",
];

pub struct Config {
    pub db_path: PathBuf,
    pub jwt_secret: String,
    pub relay: RelayConfig,
    pub addr: SocketAddr,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build the config from any key lookup. Empty values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let required = |key: &str| get(key).with_context(|| format!("{} environment variable is required", key));
        let or_default = |key: &str, default: &str| get(key).unwrap_or_else(|| default.to_string());

        let jwt_secret = required("SITEDROP_JWT_SECRET")?;
        if PLACEHOLDER_SECRETS.contains(&jwt_secret.as_str()) {
            bail!("SITEDROP_JWT_SECRET is still a placeholder; set a random secret");
        }

        let host = or_default("SITEDROP_HOST", "0.0.0.0");
        let port: u16 = or_default("PORT", "8080")
            .parse()
            .context("PORT must be a port number")?;
        let addr: SocketAddr = format!("{}:{}", host, port)
            .parse()
            .with_context(|| format!("invalid listen address {}:{}", host, port))?;

        Ok(Self {
            db_path: required("DATABASE_URL")?.into(),
            jwt_secret,
            relay: RelayConfig {
                api_url: or_default("GITHUB_API_URL", "https://api.github.com"),
                raw_url: or_default("GITHUB_RAW_URL", "https://raw.githubusercontent.com"),
                web_url: or_default("GITHUB_WEB_URL", "https://github.com"),
                owner: required("SITEDROP_REPO_OWNER")?,
                repo: required("SITEDROP_REPO_NAME")?,
                branch: or_default("SITEDROP_REPO_BRANCH", "main"),
                token: required("GITHUB_TOKEN")?,
            },
            addr,
        })
    }
}
