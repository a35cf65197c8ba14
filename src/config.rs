use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct MonitorConfig {
    pub sites: Vec<Site>,
    pub interval_in_minutes: f64,
    #[serde(default)]
    pub rotate_logs_after_sets: i64,
    #[serde(default = "default_log_path")]
    pub log_path: PathBuf,
    pub probe_timeout_ms: Option<u64>,
    pub api_port: Option<u16>,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Site {
    pub title: String,
    pub targets: Vec<Target>,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct Target {
    pub title: String,
    pub url: String,
    pub status_should_be: Option<u16>,
    pub see: Option<String>,
}

fn default_log_path() -> PathBuf { PathBuf::from("output.json") }

impl MonitorConfig {
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        let config: MonitorConfig = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse {}", path.display()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        self.checked_interval()?;
        Ok(())
    }

    fn checked_interval(&self) -> Result<Duration> {
        if !self.interval_in_minutes.is_finite() || self.interval_in_minutes <= 0.0 {
            bail!("intervalInMinutes must be a positive number, got {}", self.interval_in_minutes);
        }
        Duration::try_from_secs_f64(self.interval_in_minutes * 60.0)
            .with_context(|| format!("intervalInMinutes is too large, got {}", self.interval_in_minutes))
    }

    /// Fixed delay between the end of one tick and the start of the next.
    /// Saturates for a config that skipped validation.
    pub fn interval(&self) -> Duration {
        self.checked_interval().unwrap_or(Duration::MAX)
    }

    pub fn probe_timeout(&self) -> Option<Duration> {
        self.probe_timeout_ms.map(Duration::from_millis)
    }

    pub fn target_count(&self) -> usize {
        self.sites.iter().map(|s| s.targets.len()).sum()
    }
}

impl Target {
    /// Expected status, with `0` treated as unset.
    pub fn expected_status(&self) -> Option<u16> {
        self.status_should_be.filter(|s| *s != 0)
    }

    /// Required substring, with an empty string treated as unset.
    pub fn expected_text(&self) -> Option<&str> {
        self.see.as_deref().filter(|s| !s.is_empty())
    }
}
