//! Runtime-tunable settings, persisted in the store's key/value table
//!
//! Settings load at boot (env-derived defaults, overridden by stored
//! values, normalized values written back) and can be updated at runtime
//! through the API. Only `monitor_interval_secs` feeds the engine; the
//! rest tune the presentation layer. Some keys take effect only after a
//! restart and are flagged as such.

use std::collections::HashMap;
use std::fmt;

use serde::Serialize;
use tracing::warn;

use crate::storage::{MonitorStore, StorageResult};

/// All known setting keys, in display order
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SettingKey {
    AppPort,
    DebugMode,
    MonitorIntervalSecs,
    AutoStartMonitor,
    DashboardEventsLimit,
    DashboardFailuresLimit,
    ApiDefaultLimit,
    ApiMaxLimit,
    HistoryDefaultLimit,
}

impl SettingKey {
    pub const ALL: [SettingKey; 9] = [
        SettingKey::AppPort,
        SettingKey::DebugMode,
        SettingKey::MonitorIntervalSecs,
        SettingKey::AutoStartMonitor,
        SettingKey::DashboardEventsLimit,
        SettingKey::DashboardFailuresLimit,
        SettingKey::ApiDefaultLimit,
        SettingKey::ApiMaxLimit,
        SettingKey::HistoryDefaultLimit,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            SettingKey::AppPort => "app_port",
            SettingKey::DebugMode => "debug_mode",
            SettingKey::MonitorIntervalSecs => "monitor_interval_secs",
            SettingKey::AutoStartMonitor => "auto_start_monitor",
            SettingKey::DashboardEventsLimit => "dashboard_events_limit",
            SettingKey::DashboardFailuresLimit => "dashboard_failures_limit",
            SettingKey::ApiDefaultLimit => "api_default_limit",
            SettingKey::ApiMaxLimit => "api_max_limit",
            SettingKey::HistoryDefaultLimit => "history_default_limit",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            SettingKey::AppPort => "Web port",
            SettingKey::DebugMode => "Debug mode",
            SettingKey::MonitorIntervalSecs => "Monitor interval (seconds)",
            SettingKey::AutoStartMonitor => "Auto-start monitor",
            SettingKey::DashboardEventsLimit => "Dashboard events limit",
            SettingKey::DashboardFailuresLimit => "Dashboard failures limit",
            SettingKey::ApiDefaultLimit => "API default limit",
            SettingKey::ApiMaxLimit => "API max limit",
            SettingKey::HistoryDefaultLimit => "History default limit",
        }
    }

    /// Whether a change takes effect only after a restart
    pub fn restart_required(&self) -> bool {
        matches!(
            self,
            SettingKey::AppPort | SettingKey::DebugMode | SettingKey::AutoStartMonitor
        )
    }

    pub fn parse(key: &str) -> Option<SettingKey> {
        Self::ALL.iter().copied().find(|k| k.as_str() == key)
    }
}

/// A rejected setting value or update
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SettingsError(String);

impl fmt::Display for SettingsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::error::Error for SettingsError {}

/// The full typed settings state
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Settings {
    pub app_port: u16,
    pub debug_mode: bool,
    pub monitor_interval_secs: u64,
    pub auto_start_monitor: bool,
    pub dashboard_events_limit: usize,
    pub dashboard_failures_limit: usize,
    pub api_default_limit: usize,
    pub api_max_limit: usize,
    pub history_default_limit: usize,
}

/// Outcome of a validated settings update
#[derive(Debug, Clone)]
pub struct SettingsUpdate {
    pub settings: Settings,
    /// Labels of changed keys that only apply after a restart
    pub restart_required: Vec<&'static str>,
}

fn env_bool(name: &str, default: bool) -> bool {
    match std::env::var(name) {
        Ok(value) => parse_bool(&value),
        Err(_) => default,
    }
}

fn env_u64(name: &str, default: u64) -> u64 {
    std::env::var(name)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

fn parse_bool(raw: &str) -> bool {
    matches!(raw.trim().to_lowercase().as_str(), "1" | "true" | "yes" | "on")
}

fn parse_ranged(key: SettingKey, raw: &str, min: i64, max: i64) -> Result<i64, SettingsError> {
    let parsed: i64 = raw
        .trim()
        .parse()
        .map_err(|_| SettingsError(format!("{} must be a valid integer.", key.label())))?;
    if parsed < min || parsed > max {
        return Err(SettingsError(format!(
            "{} must be between {} and {}.",
            key.label(),
            min,
            max
        )));
    }
    Ok(parsed)
}

impl Default for Settings {
    fn default() -> Self {
        Self::from_env()
    }
}

impl Settings {
    /// Built-in defaults, with the env overrides the original deployment
    /// knobs allow (`PORT`, `DEBUG`, `MONITOR_INTERVAL_SECONDS`,
    /// `AUTO_START_MONITOR`)
    pub fn from_env() -> Self {
        Self {
            app_port: env_u64("PORT", 8000).try_into().unwrap_or(8000),
            debug_mode: env_bool("DEBUG", true),
            monitor_interval_secs: env_u64("MONITOR_INTERVAL_SECONDS", 900).clamp(30, 86_400),
            auto_start_monitor: env_bool("AUTO_START_MONITOR", true),
            dashboard_events_limit: 30,
            dashboard_failures_limit: 20,
            api_default_limit: 100,
            api_max_limit: 500,
            history_default_limit: 100,
        }
    }

    /// Load settings: stored values override defaults, invalid stored
    /// values fall back, and the normalized values are written back
    pub async fn load(store: &dyn MonitorStore) -> StorageResult<Settings> {
        let mut settings = Settings::from_env();

        for key in SettingKey::ALL {
            if let Some(raw) = store.get_setting(key.as_str()).await? {
                if let Err(e) = settings.set_from_str(key, &raw) {
                    warn!(
                        "stored setting {} is invalid ({}), using default",
                        key.as_str(),
                        e
                    );
                }
            }
            store
                .set_setting(key.as_str(), &settings.serialized(key))
                .await?;
        }

        Ok(settings)
    }

    /// The stored string form of one setting
    pub fn serialized(&self, key: SettingKey) -> String {
        fn bool_str(value: bool) -> String {
            if value { "1".to_string() } else { "0".to_string() }
        }

        match key {
            SettingKey::AppPort => self.app_port.to_string(),
            SettingKey::DebugMode => bool_str(self.debug_mode),
            SettingKey::MonitorIntervalSecs => self.monitor_interval_secs.to_string(),
            SettingKey::AutoStartMonitor => bool_str(self.auto_start_monitor),
            SettingKey::DashboardEventsLimit => self.dashboard_events_limit.to_string(),
            SettingKey::DashboardFailuresLimit => self.dashboard_failures_limit.to_string(),
            SettingKey::ApiDefaultLimit => self.api_default_limit.to_string(),
            SettingKey::ApiMaxLimit => self.api_max_limit.to_string(),
            SettingKey::HistoryDefaultLimit => self.history_default_limit.to_string(),
        }
    }

    /// Parse and validate one raw value into this settings state
    pub fn set_from_str(&mut self, key: SettingKey, raw: &str) -> Result<(), SettingsError> {
        match key {
            SettingKey::AppPort => {
                self.app_port = parse_ranged(key, raw, 1, 65_535)? as u16;
            }
            SettingKey::DebugMode => self.debug_mode = parse_bool(raw),
            SettingKey::MonitorIntervalSecs => {
                self.monitor_interval_secs = parse_ranged(key, raw, 30, 86_400)? as u64;
            }
            SettingKey::AutoStartMonitor => self.auto_start_monitor = parse_bool(raw),
            SettingKey::DashboardEventsLimit => {
                self.dashboard_events_limit = parse_ranged(key, raw, 1, 500)? as usize;
            }
            SettingKey::DashboardFailuresLimit => {
                self.dashboard_failures_limit = parse_ranged(key, raw, 1, 500)? as usize;
            }
            SettingKey::ApiDefaultLimit => {
                self.api_default_limit = parse_ranged(key, raw, 1, 2_000)? as usize;
            }
            SettingKey::ApiMaxLimit => {
                self.api_max_limit = parse_ranged(key, raw, 1, 5_000)? as usize;
            }
            SettingKey::HistoryDefaultLimit => {
                self.history_default_limit = parse_ranged(key, raw, 1, 2_000)? as usize;
            }
        }
        Ok(())
    }

    fn validate_cross_fields(&self) -> Result<(), SettingsError> {
        if self.api_default_limit > self.api_max_limit {
            return Err(SettingsError(
                "API default limit cannot be greater than API max limit.".to_string(),
            ));
        }
        if self.history_default_limit > self.api_max_limit {
            return Err(SettingsError(
                "History default limit cannot be greater than API max limit.".to_string(),
            ));
        }
        Ok(())
    }

    /// Validate a partial update against the current state
    ///
    /// Unknown keys and out-of-range values are rejected; the returned
    /// update lists the restart-required labels that changed.
    pub fn apply_update(
        &self,
        updates: &HashMap<String, String>,
    ) -> Result<SettingsUpdate, SettingsError> {
        let mut next = self.clone();

        for (key, raw) in updates {
            let key = SettingKey::parse(key)
                .ok_or_else(|| SettingsError(format!("unknown setting: {}", key)))?;
            next.set_from_str(key, raw)?;
        }

        next.validate_cross_fields()?;

        let restart_required = SettingKey::ALL
            .iter()
            .filter(|k| k.restart_required() && next.serialized(**k) != self.serialized(**k))
            .map(|k| k.label())
            .collect();

        Ok(SettingsUpdate {
            settings: next,
            restart_required,
        })
    }

    /// Persist the full state into the store
    pub async fn persist(&self, store: &dyn MonitorStore) -> StorageResult<()> {
        for key in SettingKey::ALL {
            store
                .set_setting(key.as_str(), &self.serialized(key))
                .await?;
        }
        Ok(())
    }
}
