use crate::error::{IngestError, Result};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

pub const DEFAULT_CONFIG_PATH: &str = "config.toml";

/// Upper bound SQS places on a single ReceiveMessage call.
pub const MAX_BATCH_CEILING: u32 = 10;

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub queue: QueueConfig,
    pub store: StoreConfig,
    pub poll: PollConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct QueueConfig {
    pub endpoint: String,
    pub queue_url: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    pub path: PathBuf,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PollConfig {
    pub max_batch: u32,
    pub visibility_timeout_secs: u32,
    pub poll_wait_secs: u32,
    pub poll_interval_secs: u64,
    pub idle_ceiling_secs: u64,
    /// Treat fetch failures as empty batches instead of ending the run.
    pub fetch_fail_soft: bool,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            endpoint: "http://localstack:4566".to_string(),
            queue_url: "http://localstack:4566/000000000000/login-queue".to_string(),
        }
    }
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("data").join("user_logins.db"),
        }
    }
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            max_batch: 10,
            visibility_timeout_secs: 30,
            poll_wait_secs: 1,
            poll_interval_secs: 5,
            idle_ceiling_secs: 90,
            fetch_fail_soft: true,
        }
    }
}

impl PollConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }

    pub fn idle_ceiling(&self) -> Duration {
        Duration::from_secs(self.idle_ceiling_secs)
    }

    fn check(&self) -> Result<()> {
        if self.max_batch == 0 || self.max_batch > MAX_BATCH_CEILING {
            return Err(IngestError::Config(format!(
                "poll.max_batch must be within 1..={MAX_BATCH_CEILING}, got {}",
                self.max_batch
            )));
        }
        // With a zero interval empty polls never accumulate idle time.
        if self.poll_interval_secs == 0 {
            return Err(IngestError::Config(
                "poll.poll_interval_secs must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }
}

impl Config {
    /// Defaults, then the TOML file, then environment overrides.
    ///
    /// An explicitly given path must exist; the default path is optional.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = match path {
            Some(p) => Self::from_file(p)?,
            None if Path::new(DEFAULT_CONFIG_PATH).exists() => {
                Self::from_file(Path::new(DEFAULT_CONFIG_PATH))?
            }
            None => Self::default(),
        };
        config.apply_env(|key| std::env::var(key).ok())?;
        config.poll.check()?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|e| {
            IngestError::Config(format!(
                "Failed to read config file '{}': {}",
                path.display(),
                e
            ))
        })?;
        Self::from_toml(&content)
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        let config: Config = toml::from_str(content)?;
        Ok(config)
    }

    pub fn apply_env<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(v) = lookup("LOGIN_QUEUE_ENDPOINT") {
            self.queue.endpoint = v;
        }
        if let Some(v) = lookup("LOGIN_QUEUE_URL") {
            self.queue.queue_url = v;
        }
        if let Some(v) = lookup("LOGIN_DB_PATH") {
            self.store.path = PathBuf::from(v);
        }
        override_parsed(&lookup, "LOGIN_MAX_BATCH", &mut self.poll.max_batch)?;
        override_parsed(&lookup, "LOGIN_VISIBILITY_TIMEOUT", &mut self.poll.visibility_timeout_secs)?;
        override_parsed(&lookup, "LOGIN_POLL_WAIT", &mut self.poll.poll_wait_secs)?;
        override_parsed(&lookup, "LOGIN_POLL_INTERVAL", &mut self.poll.poll_interval_secs)?;
        override_parsed(&lookup, "LOGIN_IDLE_CEILING", &mut self.poll.idle_ceiling_secs)?;
        override_parsed(&lookup, "LOGIN_FETCH_FAIL_SOFT", &mut self.poll.fetch_fail_soft)?;
        Ok(())
    }
}

fn override_parsed<F, T>(lookup: &F, key: &str, slot: &mut T) -> Result<()>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
    T::Err: std::fmt::Display,
{
    if let Some(raw) = lookup(key) {
        *slot = raw
            .trim()
            .parse()
            .map_err(|e| IngestError::Config(format!("{key}='{raw}': {e}")))?;
    }
    Ok(())
}
