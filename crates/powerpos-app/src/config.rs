//! Application configuration.
//!
//! Loaded from TOML, then overridden field by field from the command line.

use crate::error::{AppError, AppResult};
use chrono::{DateTime, NaiveDateTime};
use chrono_tz::Tz;
use powerpos_calc::AggregationConfig;
use powerpos_core::{parse_local, FailureKind};
use powerpos_retry::RetryPolicy;
use powerpos_source::SimulatedSourceConfig;
use powerpos_telemetry::LoggingConfig;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::info;

/// Format of the start time override, after trimming to 16 characters.
const START_TIME_FORMAT: &str = "%Y-%m-%d %H:%M";

/// Scheduling configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ScheduleConfig {
    /// Minutes between ticks. Default: 25.
    #[serde(default = "default_interval_minutes")]
    pub interval_minutes: u64,
    /// First target time, `YYYY-MM-DD HH:MM`. Defaults to now.
    #[serde(default)]
    pub start_time: Option<String>,
    /// IANA timezone all local times are expressed in.
    #[serde(default = "default_timezone")]
    pub timezone: String,
}

fn default_interval_minutes() -> u64 {
    25
}

fn default_timezone() -> String {
    "Europe/London".to_string()
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            interval_minutes: default_interval_minutes(),
            start_time: None,
            timezone: default_timezone(),
        }
    }
}

/// Retry configuration shared by the calculation and the CSV write.
#[derive(Debug, Clone, Deserialize)]
pub struct RetryConfig {
    /// Attempts per operation, including the first. Default: 3.
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    /// Pause between attempts (ms). Default: 1000.
    #[serde(default = "default_delay_ms")]
    pub delay_ms: u64,
}

fn default_max_attempts() -> u32 {
    3
}

fn default_delay_ms() -> u64 {
    1_000
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            delay_ms: default_delay_ms(),
        }
    }
}

/// Output configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct OutputConfig {
    /// Directory CSV files are written to.
    #[serde(default = "default_csv_dir")]
    pub csv_dir: PathBuf,
}

fn default_csv_dir() -> PathBuf {
    PathBuf::from("./output")
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            csv_dir: default_csv_dir(),
        }
    }
}

/// Main application configuration.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub schedule: ScheduleConfig,
    #[serde(default)]
    pub retry: RetryConfig,
    #[serde(default)]
    pub aggregation: AggregationConfig,
    #[serde(default)]
    pub output: OutputConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
    /// Simulated trade service.
    #[serde(default)]
    pub source: SimulatedSourceConfig,
}

/// Values given on the command line; each one replaces its config field.
#[derive(Debug, Clone, Default)]
pub struct CliOverrides {
    pub csv_dir: Option<PathBuf>,
    pub interval_minutes: Option<u64>,
    pub start_time: Option<String>,
    pub max_attempts: Option<u32>,
    pub delay_ms: Option<u64>,
}

impl AppConfig {
    /// Load from `path`, falling back to defaults when the file is missing.
    pub fn load(path: &str) -> AppResult<Self> {
        if Path::new(path).exists() {
            Self::from_file(path)
        } else {
            Ok(Self::default())
        }
    }

    /// Load from a specific file.
    pub fn from_file(path: &str) -> AppResult<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| AppError::Config(format!("Failed to read config: {e}")))?;

        Self::from_toml(&content)
    }

    /// Parse from TOML text.
    pub fn from_toml(content: &str) -> AppResult<Self> {
        toml::from_str(content)
            .map_err(|e| AppError::Config(format!("Failed to parse config: {e}")))
    }

    /// Apply command line overrides.
    pub fn apply_overrides(&mut self, overrides: &CliOverrides) {
        if let Some(dir) = &overrides.csv_dir {
            self.output.csv_dir = dir.clone();
        }
        if let Some(minutes) = overrides.interval_minutes {
            self.schedule.interval_minutes = minutes;
        }
        if let Some(start) = &overrides.start_time {
            self.schedule.start_time = Some(start.clone());
        }
        if let Some(attempts) = overrides.max_attempts {
            self.retry.max_attempts = attempts;
        }
        if let Some(delay) = overrides.delay_ms {
            self.retry.delay_ms = delay;
        }
    }

    /// Check the configuration is usable.
    pub fn validate(&self) -> AppResult<()> {
        if self.schedule.interval_minutes == 0 {
            return Err(AppError::Config(
                "schedule.interval_minutes must be > 0".to_string(),
            ));
        }
        if self.retry.max_attempts == 0 {
            return Err(AppError::Config("retry.max_attempts must be >= 1".to_string()));
        }
        if self.output.csv_dir.as_os_str().is_empty() {
            return Err(AppError::Config("output.csv_dir is required".to_string()));
        }
        if self.aggregation.periods == 0 || self.aggregation.worker_pool_size == 0 {
            return Err(AppError::Config(
                "aggregation.periods and aggregation.worker_pool_size must be > 0".to_string(),
            ));
        }
        let tz = self.timezone()?;
        self.start_time(tz)?;
        Ok(())
    }

    /// Reference timezone.
    pub fn timezone(&self) -> AppResult<Tz> {
        self.schedule
            .timezone
            .parse::<Tz>()
            .map_err(|_| AppError::Config(format!("unknown timezone '{}'", self.schedule.timezone)))
    }

    /// Configured start time in `tz`, if any.
    pub fn start_time(&self, tz: Tz) -> AppResult<Option<DateTime<Tz>>> {
        self.schedule
            .start_time
            .as_deref()
            .map(|raw| parse_start_time(raw, tz))
            .transpose()
    }

    #[must_use]
    pub fn retry_delay(&self) -> Duration {
        Duration::from_millis(self.retry.delay_ms)
    }

    /// Policy for fetch + aggregate: only source outages are retried.
    pub fn calculation_policy(&self) -> AppResult<RetryPolicy> {
        Ok(RetryPolicy::new(
            self.retry.max_attempts,
            self.retry_delay(),
            [FailureKind::TransientSource],
        )?)
    }

    /// Policy for the CSV write: I/O failures are retried.
    pub fn persistence_policy(&self) -> AppResult<RetryPolicy> {
        Ok(RetryPolicy::new(
            self.retry.max_attempts,
            self.retry_delay(),
            [FailureKind::TransientSink],
        )?)
    }

    /// Log the effective configuration.
    pub fn log_summary(&self) {
        info!(
            interval_minutes = self.schedule.interval_minutes,
            start_time = self.schedule.start_time.as_deref().unwrap_or("now"),
            timezone = %self.schedule.timezone,
            csv_dir = %self.output.csv_dir.display(),
            max_attempts = self.retry.max_attempts,
            retry_delay_ms = self.retry.delay_ms,
            periods = self.aggregation.periods,
            worker_pool_size = self.aggregation.worker_pool_size,
            "Effective configuration"
        );
    }
}

/// Parse `YYYY-MM-DD HH:MM[...]` in `tz`; anything after the minutes is ignored.
pub fn parse_start_time(raw: &str, tz: Tz) -> AppResult<DateTime<Tz>> {
    let trimmed: String = raw.trim().chars().take(16).collect();
    let naive = NaiveDateTime::parse_from_str(&trimmed, START_TIME_FORMAT)
        .map_err(|e| AppError::Config(format!("invalid start time '{raw}': {e}")))?;
    Ok(parse_local(tz, naive)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Timelike};
    use chrono_tz::Europe::London;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.schedule.interval_minutes, 25);
        assert_eq!(config.retry.max_attempts, 3);
        assert_eq!(config.aggregation.worker_pool_size, 10);
        assert_eq!(config.aggregation.periods, 24);
        assert_eq!(config.timezone().unwrap(), London);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config = AppConfig::from_toml(
            r#"
            [schedule]
            interval_minutes = 5

            [output]
            csv_dir = "/tmp/positions"
            "#,
        )
        .unwrap();

        assert_eq!(config.schedule.interval_minutes, 5);
        assert_eq!(config.output.csv_dir, PathBuf::from("/tmp/positions"));
        assert_eq!(config.retry.delay_ms, 1_000);
        assert_eq!(config.source.max_trades, 10);
    }

    #[test]
    fn test_invalid_toml_is_config_error() {
        let err = AppConfig::from_toml("[schedule]\ninterval_minutes = \"soon\"").unwrap_err();
        assert!(matches!(err, AppError::Config(_)));
    }

    #[test]
    fn test_missing_file_uses_defaults() {
        let config = AppConfig::load("/nonexistent/powerpos.toml").unwrap();
        assert_eq!(config.schedule.interval_minutes, 25);
    }

    #[test]
    fn test_overrides_win() {
        let mut config = AppConfig::default();
        config.apply_overrides(&CliOverrides {
            csv_dir: Some(PathBuf::from("out")),
            interval_minutes: Some(1),
            start_time: Some("2024-05-01 10:15".to_string()),
            max_attempts: Some(7),
            delay_ms: None,
        });

        assert_eq!(config.output.csv_dir, PathBuf::from("out"));
        assert_eq!(config.schedule.interval_minutes, 1);
        assert_eq!(config.retry.max_attempts, 7);
        assert_eq!(config.retry.delay_ms, 1_000);
        assert_eq!(
            config.start_time(London).unwrap(),
            Some(London.with_ymd_and_hms(2024, 5, 1, 10, 15, 0).unwrap())
        );
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let mut config = AppConfig::default();
        config.schedule.interval_minutes = 0;
        assert!(config.validate().is_err());

        let mut config = AppConfig::default();
        config.retry.max_attempts = 0;
        assert!(config.validate().is_err());

        let mut config = AppConfig::default();
        config.schedule.timezone = "Mars/Olympus".to_string();
        assert!(config.validate().is_err());

        let mut config = AppConfig::default();
        config.schedule.start_time = Some("tomorrow".to_string());
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_start_time_seconds_trimmed() {
        let parsed = parse_start_time("2024-05-01 10:15:42", London).unwrap();
        assert_eq!(parsed.hour(), 10);
        assert_eq!(parsed.minute(), 15);
        assert_eq!(parsed.second(), 0);
    }

    #[test]
    fn test_start_time_in_dst_gap_rejected() {
        let err = parse_start_time("2024-03-31 01:30", London).unwrap_err();
        assert!(matches!(err, AppError::Core(_)));
    }

    #[test]
    fn test_policies_retry_the_right_kinds() {
        let config = AppConfig::default();
        let calc = config.calculation_policy().unwrap();
        assert!(calc.is_retryable(FailureKind::TransientSource));
        assert!(!calc.is_retryable(FailureKind::TransientSink));

        let sink = config.persistence_policy().unwrap();
        assert!(sink.is_retryable(FailureKind::TransientSink));
        assert!(!sink.is_retryable(FailureKind::BoundsViolation));
    }
}
