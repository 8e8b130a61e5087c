//! Application configuration
//!
//! Defaults are compiled in from `config/subtrack.toml`. A user copy at
//! `~/.config/subtrack/config.toml` (or an explicit path) overrides them
//! section by section. Secrets never live in the file; see [`Secrets`].

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

use crate::error::{Error, Result};

/// Embedded default config (compiled into binary)
const DEFAULT_CONFIG: &str = include_str!("../../../config/subtrack.toml");

pub const DB_KEY_ENV: &str = "SUBTRACK_DB_KEY";
pub const API_KEYS_ENV: &str = "SUBTRACK_API_KEYS";
pub const CRON_SECRET_ENV: &str = "SUBTRACK_CRON_SECRET";
pub const EMAIL_API_KEY_ENV: &str = "SUBTRACK_EMAIL_API_KEY";
pub const SMTP_USER_ENV: &str = "SUBTRACK_SMTP_USER";
pub const SMTP_PASSWORD_ENV: &str = "SUBTRACK_SMTP_PASSWORD";

/// Alert job settings
#[derive(Debug, Clone)]
pub struct AlertSettings {
    /// Upper bound for one transport send
    pub send_timeout: Duration,
    /// UTC hour for the built-in daily run; `None` disables it
    pub daily_run_hour_utc: Option<u32>,
    /// Manual sends allowed per user per window
    pub manual_limit: u32,
    pub manual_window: Duration,
    pub upcoming_days: i64,
    pub top_n: usize,
}

impl Default for AlertSettings {
    fn default() -> Self {
        Self {
            send_timeout: Duration::from_secs(10),
            daily_run_hour_utc: Some(9),
            manual_limit: 5,
            manual_window: Duration::from_secs(3600),
            upcoming_days: 7,
            top_n: 5,
        }
    }
}

/// Which notification transport to use
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportKind {
    /// Log messages instead of sending them
    Log,
    /// Transactional email HTTP API
    Http,
    Smtp,
}

impl TransportKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Log => "log",
            Self::Http => "http",
            Self::Smtp => "smtp",
        }
    }
}

impl std::str::FromStr for TransportKind {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "log" => Ok(Self::Log),
            "http" => Ok(Self::Http),
            "smtp" => Ok(Self::Smtp),
            _ => Err(format!(
                "Unknown transport kind: {} (valid: log, http, smtp)",
                s
            )),
        }
    }
}

#[derive(Debug, Clone)]
pub struct TransportSettings {
    pub kind: TransportKind,
    pub api_url: String,
    pub from_email: String,
    pub from_name: String,
    pub smtp_host: String,
    pub smtp_port: u16,
}

impl Default for TransportSettings {
    fn default() -> Self {
        Self {
            kind: TransportKind::Log,
            api_url: "https://api.resend.com/emails".to_string(),
            from_email: "alerts@subtrack.local".to_string(),
            from_name: "Subtrack".to_string(),
            smtp_host: "localhost".to_string(),
            smtp_port: 587,
        }
    }
}

/// Static exchange rates relative to `base`
#[derive(Debug, Clone)]
pub struct CurrencySettings {
    pub base: String,
    /// Units of each currency per one unit of `base`
    pub rates: HashMap<String, f64>,
}

impl Default for CurrencySettings {
    fn default() -> Self {
        let mut rates = HashMap::new();
        rates.insert("USD".to_string(), 1.0);
        Self {
            base: "USD".to_string(),
            rates,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct AppConfig {
    pub alerts: AlertSettings,
    pub transport: TransportSettings,
    pub currency: CurrencySettings,
}

impl AppConfig {
    /// Compiled-in defaults only
    pub fn embedded() -> Result<Self> {
        parse_config(DEFAULT_CONFIG)
    }
}

/// Default config override path
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("subtrack").join("config.toml"))
}

/// Load configuration (explicit path, then user override, then embedded)
///
/// An explicit path that does not exist is an error; a missing user
/// override silently falls back to the embedded defaults.
pub fn load_config(path: Option<&Path>) -> Result<AppConfig> {
    let content = match path {
        Some(path) => fs::read_to_string(path).map_err(|e| {
            Error::Config(format!("Failed to read config {}: {}", path.display(), e))
        })?,
        None => match default_config_path() {
            Some(default_path) if default_path.exists() => fs::read_to_string(&default_path)
                .map_err(|e| Error::Config(format!("Failed to read config: {}", e)))?,
            _ => DEFAULT_CONFIG.to_string(),
        },
    };

    parse_config(&content)
}

#[derive(Debug, Deserialize)]
struct RawConfig {
    alerts: Option<RawAlerts>,
    transport: Option<RawTransport>,
    currency: Option<RawCurrency>,
}

#[derive(Debug, Deserialize)]
struct RawAlerts {
    send_timeout_secs: Option<u64>,
    daily_run_hour_utc: Option<u32>,
    manual_limit: Option<u32>,
    manual_window_secs: Option<u64>,
    upcoming_days: Option<i64>,
    top_n: Option<usize>,
}

#[derive(Debug, Deserialize)]
struct RawTransport {
    kind: Option<String>,
    api_url: Option<String>,
    from_email: Option<String>,
    from_name: Option<String>,
    smtp_host: Option<String>,
    smtp_port: Option<u16>,
}

#[derive(Debug, Deserialize)]
struct RawCurrency {
    base: Option<String>,
    rates: Option<HashMap<String, f64>>,
}

/// Parse config from TOML content, applied over the defaults
pub fn parse_config(content: &str) -> Result<AppConfig> {
    let raw: RawConfig = toml::from_str(content)
        .map_err(|e| Error::Config(format!("Invalid config TOML: {}", e)))?;

    let mut config = AppConfig::default();

    if let Some(alerts) = raw.alerts {
        if let Some(secs) = alerts.send_timeout_secs {
            config.alerts.send_timeout = Duration::from_secs(secs.max(1));
        }
        if let Some(hour) = alerts.daily_run_hour_utc {
            if hour > 23 {
                return Err(Error::Config(format!(
                    "daily_run_hour_utc must be 0-23, got {}",
                    hour
                )));
            }
            config.alerts.daily_run_hour_utc = Some(hour);
        } else {
            config.alerts.daily_run_hour_utc = None;
        }
        if let Some(limit) = alerts.manual_limit {
            config.alerts.manual_limit = limit;
        }
        if let Some(secs) = alerts.manual_window_secs {
            config.alerts.manual_window = Duration::from_secs(secs.max(1));
        }
        if let Some(days) = alerts.upcoming_days {
            config.alerts.upcoming_days = days.max(0);
        }
        if let Some(n) = alerts.top_n {
            config.alerts.top_n = n;
        }
    }

    if let Some(transport) = raw.transport {
        if let Some(kind) = transport.kind {
            config.transport.kind = kind.parse().map_err(Error::Config)?;
        }
        if let Some(url) = transport.api_url {
            config.transport.api_url = url;
        }
        if let Some(email) = transport.from_email {
            config.transport.from_email = email;
        }
        if let Some(name) = transport.from_name {
            config.transport.from_name = name;
        }
        if let Some(host) = transport.smtp_host {
            config.transport.smtp_host = host;
        }
        if let Some(port) = transport.smtp_port {
            config.transport.smtp_port = port;
        }
    }

    if let Some(currency) = raw.currency {
        if let Some(base) = currency.base {
            config.currency.base = base.to_uppercase();
        }
        if let Some(rates) = currency.rates {
            for (code, rate) in &rates {
                if !rate.is_finite() || *rate <= 0.0 {
                    return Err(Error::Config(format!(
                        "Exchange rate for {} must be positive, got {}",
                        code, rate
                    )));
                }
            }
            config.currency.rates = rates
                .into_iter()
                .map(|(code, rate)| (code.to_uppercase(), rate))
                .collect();
        }
        let base = config.currency.base.clone();
        config.currency.rates.entry(base).or_insert(1.0);
    }

    Ok(config)
}

/// Secrets read from the environment
#[derive(Clone, Default)]
pub struct Secrets {
    pub db_key: Option<String>,
    pub api_keys: Vec<String>,
    pub cron_secret: Option<String>,
    pub email_api_key: Option<String>,
    pub smtp_user: Option<String>,
    pub smtp_password: Option<String>,
}

impl Secrets {
    pub fn from_env() -> Self {
        let var = |name: &str| std::env::var(name).ok().filter(|v| !v.trim().is_empty());
        Self {
            db_key: var(DB_KEY_ENV),
            api_keys: var(API_KEYS_ENV)
                .map(|keys| {
                    keys.split(',')
                        .map(|k| k.trim().to_string())
                        .filter(|k| !k.is_empty())
                        .collect()
                })
                .unwrap_or_default(),
            cron_secret: var(CRON_SECRET_ENV),
            email_api_key: var(EMAIL_API_KEY_ENV),
            smtp_user: var(SMTP_USER_ENV),
            smtp_password: var(SMTP_PASSWORD_ENV),
        }
    }
}

impl std::fmt::Debug for Secrets {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Secrets")
            .field("db_key", &self.db_key.as_ref().map(|_| "***"))
            .field("api_keys", &self.api_keys.len())
            .field("cron_secret", &self.cron_secret.as_ref().map(|_| "***"))
            .field("email_api_key", &self.email_api_key.as_ref().map(|_| "***"))
            .field("smtp_user", &self.smtp_user)
            .field("smtp_password", &self.smtp_password.as_ref().map(|_| "***"))
            .finish()
    }
}
