use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Cities swept when the config file names none
pub const DEFAULT_LOCATIONS: [&str; 12] = [
    "Delhi",
    "Mumbai",
    "Chennai",
    "Bangalore",
    "Kolkata",
    "Hyderabad",
    "Indore",
    "Pune",
    "Gurgaon",
    "Noida",
    "Rajasthan",
    "Bihar",
];

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ScheduleConfig {
    pub sweep_interval_secs: Option<u64>,
    pub stagger_ms: Option<u64>,
    /// 5-field (or 6-field with seconds) cron expression, local time
    pub daily_summary_cron: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct RetryConfig {
    pub max_attempts: Option<u32>,
    pub backoff_ms: Option<u64>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct AlertsConfig {
    pub threshold_celsius: Option<f64>,
    pub recipient: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ProviderConfig {
    pub base_url: Option<String>,
    pub timeout_secs: Option<u64>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct StoreConfig {
    /// "upsert" or "append"
    pub summary_mode: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct HttpConfig {
    pub bind: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct AppConfig {
    pub locations: Option<Vec<String>>,
    pub schedule: Option<ScheduleConfig>,
    pub retry: Option<RetryConfig>,
    pub alerts: Option<AlertsConfig>,
    pub provider: Option<ProviderConfig>,
    pub store: Option<StoreConfig>,
    pub http: Option<HttpConfig>,
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid TOML: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Invalid value for {field}: {reason}")]
    Invalid { field: &'static str, reason: String },
}

impl AppConfig {
    /// Load configuration from WXWATCH_CONFIG path (TOML) if present, with reasonable defaults
    pub fn load() -> Result<Self, ConfigError> {
        let path = std::env::var("WXWATCH_CONFIG").unwrap_or_else(|_| "config.toml".to_string());
        Self::load_from(path)
    }

    /// Load from an explicit path; a missing file yields the defaults
    pub fn load_from<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let cfg = if path.exists() {
            let s = fs::read_to_string(path)?;
            Self::from_toml(&s)?
        } else {
            AppConfig::default()
        };
        Ok(cfg)
    }

    pub fn from_toml(s: &str) -> Result<Self, ConfigError> {
        let cfg = toml::from_str::<AppConfig>(s)?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_attempts() == 0 {
            return Err(ConfigError::Invalid {
                field: "retry.max_attempts",
                reason: "must be at least 1".into(),
            });
        }
        if self.sweep_interval_secs() == 0 {
            return Err(ConfigError::Invalid {
                field: "schedule.sweep_interval_secs",
                reason: "must be at least 1".into(),
            });
        }
        if !self.threshold_celsius().is_finite() {
            return Err(ConfigError::Invalid {
                field: "alerts.threshold_celsius",
                reason: "must be a finite number".into(),
            });
        }
        if self.locations().is_empty() {
            return Err(ConfigError::Invalid {
                field: "locations",
                reason: "at least one location is required".into(),
            });
        }
        Ok(())
    }

    pub fn locations(&self) -> Vec<String> {
        self.locations
            .clone()
            .unwrap_or_else(|| DEFAULT_LOCATIONS.iter().map(|s| s.to_string()).collect())
    }

    /// Period between sweeps (default 180s)
    pub fn sweep_interval_secs(&self) -> u64 {
        self.schedule
            .as_ref()
            .and_then(|s| s.sweep_interval_secs)
            .unwrap_or(180)
    }

    /// Spacing between fetches inside a sweep (default 2000ms)
    pub fn stagger_ms(&self) -> u64 {
        self.schedule
            .as_ref()
            .and_then(|s| s.stagger_ms)
            .unwrap_or(2000)
    }

    /// When the daily summary runs (default 23:59 local)
    pub fn daily_summary_cron(&self) -> String {
        self.schedule
            .as_ref()
            .and_then(|s| s.daily_summary_cron.clone())
            .unwrap_or_else(|| "59 23 * * *".to_string())
    }

    pub fn max_attempts(&self) -> u32 {
        self.retry.as_ref().and_then(|r| r.max_attempts).unwrap_or(3)
    }

    /// Base delay between attempts (default 0, immediate retry)
    pub fn backoff_ms(&self) -> u64 {
        self.retry.as_ref().and_then(|r| r.backoff_ms).unwrap_or(0)
    }

    pub fn threshold_celsius(&self) -> f64 {
        self.alerts
            .as_ref()
            .and_then(|a| a.threshold_celsius)
            .unwrap_or(30.0)
    }

    pub fn alert_recipient(&self) -> String {
        self.alerts
            .as_ref()
            .and_then(|a| a.recipient.clone())
            .unwrap_or_else(|| "alerts@localhost".to_string())
    }

    pub fn provider_base_url(&self) -> String {
        self.provider
            .as_ref()
            .and_then(|p| p.base_url.clone())
            .unwrap_or_else(|| "http://api.openweathermap.org/data/2.5/weather".to_string())
    }

    pub fn provider_timeout_secs(&self) -> u64 {
        self.provider
            .as_ref()
            .and_then(|p| p.timeout_secs)
            .unwrap_or(10)
    }

    pub fn summary_mode(&self) -> String {
        self.store
            .as_ref()
            .and_then(|s| s.summary_mode.clone())
            .unwrap_or_else(|| "upsert".to_string())
    }

    /// Get HTTP bind address (default 0.0.0.0:3000)
    pub fn http_bind(&self) -> String {
        self.http
            .as_ref()
            .and_then(|h| h.bind.clone())
            .unwrap_or_else(|| "0.0.0.0:3000".to_string())
    }
}
