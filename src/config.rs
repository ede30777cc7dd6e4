use std::num::NonZeroUsize;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use crate::acquire::RetryPolicy;
use crate::error::{AppError, Result};

pub const DEFAULT_API_BASE: &str = "https://kick.com/api/v1";
pub const DEFAULT_USER_AGENT: &str = "Kick-Persian-Streams/1.0";
pub const DEFAULT_CANDIDATES_FILE: &str = "assets/persian-streamers.json";
pub const DEFAULT_CANDIDATE_LIMIT: usize = 20;

#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub api_base: String,
    pub user_agent: String,
    pub timeout: Duration,
}

#[derive(Debug, Clone)]
pub struct CandidateConfig {
    pub file: Option<PathBuf>,
    pub limit: usize,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub client: ClientConfig,
    pub retry: RetryPolicy,
    pub candidates: CandidateConfig,
}

impl Config {
    pub fn builtin() -> Self {
        Self {
            client: ClientConfig {
                api_base: DEFAULT_API_BASE.to_string(),
                user_agent: DEFAULT_USER_AGENT.to_string(),
                timeout: Duration::from_secs(10),
            },
            retry: RetryPolicy::default(),
            candidates: CandidateConfig {
                file: Some(PathBuf::from(DEFAULT_CANDIDATES_FILE)),
                limit: DEFAULT_CANDIDATE_LIMIT,
            },
        }
    }

    /// Built-in defaults overridden by `KICK_*` environment variables.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::builtin();
        let value = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        if let Some(base) = value("KICK_API_BASE") {
            config.client.api_base = base;
        }
        if let Some(agent) = value("KICK_USER_AGENT") {
            config.client.user_agent = agent;
        }
        if let Some(secs) = value("KICK_TIMEOUT_SECS") {
            config.client.timeout = Duration::from_secs(parse_number("KICK_TIMEOUT_SECS", &secs)?);
        }
        if let Some(rounds) = value("KICK_RETRY_ROUNDS") {
            config.retry.max_retry_rounds = parse_number("KICK_RETRY_ROUNDS", &rounds)?;
        }
        if let Some(millis) = value("KICK_RETRY_DELAY_MS") {
            config.retry.retry_delay =
                Duration::from_millis(parse_number("KICK_RETRY_DELAY_MS", &millis)?);
        }
        if let Some(limit) = value("KICK_FIRST_PASS_CONCURRENCY") {
            // 0 means "no cap", matching the default
            let limit: usize = parse_number("KICK_FIRST_PASS_CONCURRENCY", &limit)?;
            config.retry.first_pass_concurrency = NonZeroUsize::new(limit);
        }
        if let Some(limit) = value("KICK_CANDIDATE_LIMIT") {
            config.candidates.limit = parse_number("KICK_CANDIDATE_LIMIT", &limit)?;
        }
        if let Some(file) = value("KICK_CANDIDATES_FILE") {
            config.candidates.file = Some(PathBuf::from(file));
        }

        Ok(config)
    }
}

fn parse_number<T: FromStr>(key: &str, raw: &str) -> Result<T> {
    raw.parse::<T>().map_err(|_| {
        AppError::message(format!(
            "Environment variable {} must be a non-negative integer, got `{}`",
            key, raw
        ))
    })
}
