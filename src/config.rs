use std::time::Duration;

use anyhow::Context;

pub const URL_VAR: &str = "WELLBEING_SCRIPT_URL";
pub const TIMEOUT_VAR: &str = "WELLBEING_TIMEOUT_SECS";
const DEFAULT_TIMEOUT_SECS: u64 = 30;

#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub script_url: String,
    pub timeout: Duration,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let script_url = lookup(URL_VAR)
            .filter(|url| !url.trim().is_empty())
            .with_context(|| format!("{URL_VAR} must be set to the measurement service URL"))?;

        let timeout_secs = match lookup(TIMEOUT_VAR) {
            Some(raw) => raw
                .trim()
                .parse::<u64>()
                .with_context(|| format!("{TIMEOUT_VAR} must be a whole number of seconds"))?,
            None => DEFAULT_TIMEOUT_SECS,
        };

        Ok(Self {
            script_url: script_url.trim().to_string(),
            timeout: Duration::from_secs(timeout_secs),
        })
    }
}
