use std::path::PathBuf;

use anyhow::{Context, Result, bail};
use chrono_tz::Tz;
use kindred_companion::groq::{DEFAULT_BASE_URL, DEFAULT_MODEL};

/// Placeholder JWT secrets that MUST NOT be used.
const PLACEHOLDER_SECRETS: &[&str] = &["change-me-to-a-random-string", "dev-secret-change-me"];

#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub db_path: PathBuf,
    pub jwt_secret: String,
    pub timezone: Tz,
    pub groq_api_key: String,
    pub groq_base_url: String,
    pub model: String,
    pub deepgram_api_key: Option<String>,
    pub policy_path: Option<PathBuf>,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(get: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| get(key).filter(|v| !v.trim().is_empty());

        let jwt_secret = var("KINDRED_JWT_SECRET").unwrap_or_default();
        if jwt_secret.is_empty() || PLACEHOLDER_SECRETS.contains(&jwt_secret.as_str()) {
            bail!("KINDRED_JWT_SECRET is unset or still a placeholder");
        }

        let groq_api_key = var("GROQ_API_KEY").context("GROQ_API_KEY is not set")?;

        let port = var("KINDRED_PORT")
            .unwrap_or_else(|| "3000".into())
            .parse()
            .context("KINDRED_PORT is not a valid port")?;

        let timezone_name = var("KINDRED_TIMEZONE").unwrap_or_else(|| "UTC".into());
        let timezone: Tz = timezone_name
            .parse()
            .map_err(|e| anyhow::anyhow!("KINDRED_TIMEZONE '{}' is not an IANA zone: {}", timezone_name, e))?;

        Ok(Self {
            host: var("KINDRED_HOST").unwrap_or_else(|| "0.0.0.0".into()),
            port,
            db_path: var("KINDRED_DB_PATH").unwrap_or_else(|| "kindred.db".into()).into(),
            jwt_secret,
            timezone,
            groq_api_key,
            groq_base_url: var("GROQ_BASE_URL").unwrap_or_else(|| DEFAULT_BASE_URL.into()),
            model: var("KINDRED_MODEL").unwrap_or_else(|| DEFAULT_MODEL.into()),
            deepgram_api_key: var("DEEPGRAM_API_KEY"),
            policy_path: var("KINDRED_POLICY_PATH").map(PathBuf::from),
        })
    }
}
