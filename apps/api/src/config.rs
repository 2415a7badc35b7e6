use std::fmt::Display;
use std::str::FromStr;

use anyhow::{anyhow, Context, Result};

use crate::intelligence::{ProviderKind, TagLimits};

/// Signing secret used when `SECRET_KEY` is not set. Fine for local runs only.
pub const DEFAULT_SECRET_KEY: &str = "insecure-development-secret";
/// Upper bound for `ACCESS_TOKEN_EXPIRE_MINUTES`: one year.
pub const MAX_TOKEN_TTL_MINUTES: i64 = 60 * 24 * 365;

/// S3 settings. Present only when `S3_BUCKET` is set; uploads go to the local
/// filesystem otherwise.
#[derive(Debug, Clone)]
pub struct S3Settings {
    pub bucket: String,
    pub endpoint: Option<String>,
    pub region: String,
    pub access_key_id: String,
    pub secret_access_key: String,
}

/// Application configuration loaded from environment variables.
/// Fails at startup if a variable required by the selected backends is missing.
#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub port: u16,
    pub rust_log: String,
    /// Chosen once per process. `MOCK_SERVICES=true` or `ENV=test` selects the offline provider.
    pub provider: ProviderKind,
    pub anthropic_api_key: Option<String>,
    pub llm_model: String,
    pub llm_api_url: String,
    pub llm_timeout_secs: u64,
    pub tag_limits: TagLimits,
    pub storage_path: String,
    pub s3: Option<S3Settings>,
    pub secret_key: String,
    pub token_ttl_minutes: i64,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds a config from any key lookup. `from_env` is this over the process environment.
    pub fn from_lookup<F>(get: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mock_services = get("MOCK_SERVICES")
            .map(|v| v.trim().eq_ignore_ascii_case("true"))
            .unwrap_or(false);
        let test_env = get("ENV").map(|v| v.trim() == "test").unwrap_or(false);
        let provider = if mock_services || test_env {
            ProviderKind::Offline
        } else {
            ProviderKind::Live
        };

        let anthropic_api_key = match provider {
            ProviderKind::Live => Some(require(&get, "ANTHROPIC_API_KEY")?),
            ProviderKind::Offline => non_blank(&get, "ANTHROPIC_API_KEY"),
        };

        let s3 = match non_blank(&get, "S3_BUCKET") {
            Some(bucket) => Some(S3Settings {
                bucket,
                endpoint: non_blank(&get, "S3_ENDPOINT"),
                region: non_blank(&get, "S3_REGION").unwrap_or_else(|| "us-east-1".to_string()),
                access_key_id: require(&get, "AWS_ACCESS_KEY_ID")?,
                secret_access_key: require(&get, "AWS_SECRET_ACCESS_KEY")?,
            }),
            None => None,
        };

        let defaults = TagLimits::default();
        let tag_limits = TagLimits {
            resume: parse_or(&get, "RESUME_TAG_LIMIT", defaults.resume)?,
            job: parse_or(&get, "JOB_TAG_LIMIT", defaults.job)?,
        };
        if tag_limits.resume == 0 || tag_limits.job == 0 {
            return Err(anyhow!("RESUME_TAG_LIMIT and JOB_TAG_LIMIT must be at least 1"));
        }

        let token_ttl_minutes = parse_or(&get, "ACCESS_TOKEN_EXPIRE_MINUTES", 60 * 24 * 8)?;
        if !(1..=MAX_TOKEN_TTL_MINUTES).contains(&token_ttl_minutes) {
            return Err(anyhow!(
                "ACCESS_TOKEN_EXPIRE_MINUTES must be between 1 and {MAX_TOKEN_TTL_MINUTES}, got {token_ttl_minutes}"
            ));
        }

        Ok(Config {
            database_url: non_blank(&get, "DATABASE_URL")
                .unwrap_or_else(|| "sqlite://recruitment.db?mode=rwc".to_string()),
            port: parse_or(&get, "PORT", 8080u16)?,
            rust_log: non_blank(&get, "RUST_LOG").unwrap_or_else(|| "info".to_string()),
            provider,
            anthropic_api_key,
            llm_model: non_blank(&get, "LLM_MODEL")
                .unwrap_or_else(|| crate::llm_client::DEFAULT_MODEL.to_string()),
            llm_api_url: non_blank(&get, "LLM_API_URL")
                .unwrap_or_else(|| crate::llm_client::ANTHROPIC_API_URL.to_string()),
            llm_timeout_secs: parse_or(&get, "LLM_TIMEOUT_SECS", 60u64)?,
            tag_limits,
            storage_path: non_blank(&get, "STORAGE_PATH").unwrap_or_else(|| "./uploads".to_string()),
            s3,
            secret_key: non_blank(&get, "SECRET_KEY").unwrap_or_else(|| DEFAULT_SECRET_KEY.to_string()),
            token_ttl_minutes,
        })
    }
}

fn non_blank<F>(get: &F, key: &str) -> Option<String>
where
    F: Fn(&str) -> Option<String>,
{
    get(key).filter(|v| !v.trim().is_empty())
}

fn require<F>(get: &F, key: &str) -> Result<String>
where
    F: Fn(&str) -> Option<String>,
{
    non_blank(get, key).with_context(|| format!("Required environment variable '{key}' is not set"))
}

fn parse_or<F, T>(get: &F, key: &str, default: T) -> Result<T>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
    T::Err: Display,
{
    match non_blank(get, key) {
        Some(raw) => raw
            .trim()
            .parse::<T>()
            .map_err(|e| anyhow!("{key} has an invalid value '{raw}': {e}")),
        None => Ok(default),
    }
}
