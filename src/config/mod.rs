use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

const DEFAULT_PORT: u16 = 4400;
const DEFAULT_PAGE_SIZE: i64 = 10;
const DEFAULT_RECURRENCE_INTERVAL_SECS: u64 = 86_400;
const DEFAULT_REMINDER_INTERVAL_SECS: u64 = 3_600;

fn default_bind_address() -> String {
    "127.0.0.1".to_string()
}

// ─── SchedulerConfig ─────────────────────────────────────────────────────────

/// Background scheduler cadence (`[scheduler]` in config.toml).
///
/// The intervals are tunables, not contracts: the recurrence and reminder
/// passes run on independent timers and may overlap in-flight API requests.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct SchedulerConfig {
    /// Seconds between recurring-task generation passes (default: 86400).
    pub recurrence_interval_secs: u64,
    /// Seconds between pending-task reminder passes (default: 3600).
    pub reminder_interval_secs: u64,
    /// Disable both background jobs entirely (useful for tests and one-off
    /// maintenance runs).
    pub disabled: bool,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            recurrence_interval_secs: DEFAULT_RECURRENCE_INTERVAL_SECS,
            reminder_interval_secs: DEFAULT_REMINDER_INTERVAL_SECS,
            disabled: false,
        }
    }
}

// ─── DaemonConfig ────────────────────────────────────────────────────────────

/// Daemon configuration, merged from `config.toml` in the data directory and
/// CLI/env overrides (CLI wins).
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct DaemonConfig {
    /// HTTP API port.
    pub port: u16,
    /// Bind address (default: 127.0.0.1; use 0.0.0.0 for LAN access).
    #[serde(default = "default_bind_address")]
    pub bind_address: String,
    /// Data directory holding the SQLite database and config file.
    pub data_dir: PathBuf,
    /// Log level filter (trace, debug, info, warn, error).
    pub log_level: String,
    /// Queries slower than this many milliseconds are logged at WARN.
    /// 0 disables slow-query logging.
    pub slow_query_ms: u64,
    /// Default page size for `GET /api/tasks` when `size` is absent.
    pub default_page_size: i64,
    pub scheduler: SchedulerConfig,
}

impl Default for DaemonConfig {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT,
            bind_address: default_bind_address(),
            data_dir: default_data_dir(),
            log_level: "info".to_string(),
            slow_query_ms: 0,
            default_page_size: DEFAULT_PAGE_SIZE,
            scheduler: SchedulerConfig::default(),
        }
    }
}

fn default_data_dir() -> PathBuf {
    dirs_home()
        .map(|h| h.join(".taskd"))
        .unwrap_or_else(|| PathBuf::from(".taskd"))
}

fn dirs_home() -> Option<PathBuf> {
    std::env::var_os("HOME").map(PathBuf::from)
}

impl DaemonConfig {
    /// Build the effective config: start from defaults, layer the config file
    /// if present, then apply explicit overrides.
    pub fn load(
        port: Option<u16>,
        data_dir: Option<PathBuf>,
        log_level: Option<String>,
        bind_address: Option<String>,
    ) -> Self {
        let data_dir = data_dir.unwrap_or_else(default_data_dir);
        let mut config = Self::from_file(&data_dir.join("config.toml"));
        config.data_dir = data_dir;
        if let Some(p) = port {
            config.port = p;
        }
        if let Some(level) = log_level {
            config.log_level = level;
        }
        if let Some(bind) = bind_address {
            config.bind_address = bind;
        }
        config
    }

    /// Parse a config file, falling back to defaults when it is missing or
    /// malformed. A malformed file logs a warning rather than aborting —
    /// the daemon should still come up.
    fn from_file(path: &Path) -> Self {
        match std::fs::read_to_string(path) {
            Ok(raw) => match toml::from_str::<DaemonConfig>(&raw) {
                Ok(config) => {
                    info!("loaded config from {}", path.display());
                    config
                }
                Err(e) => {
                    warn!("invalid config at {}: {e} — using defaults", path.display());
                    DaemonConfig::default()
                }
            },
            Err(_) => DaemonConfig::default(),
        }
    }

    pub fn db_path(&self) -> PathBuf {
        self.data_dir.join("taskd.db")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_sane() {
        let config = DaemonConfig::default();
        assert_eq!(config.port, DEFAULT_PORT);
        assert_eq!(config.scheduler.recurrence_interval_secs, 86_400);
        assert_eq!(config.scheduler.reminder_interval_secs, 3_600);
        assert!(!config.scheduler.disabled);
    }

    #[test]
    fn overrides_beat_file_defaults() {
        let config = DaemonConfig::load(
            Some(9000),
            Some(PathBuf::from("/tmp/taskd-test")),
            Some("debug".to_string()),
            None,
        );
        assert_eq!(config.port, 9000);
        assert_eq!(config.log_level, "debug");
        assert_eq!(config.bind_address, "127.0.0.1");
        assert_eq!(config.db_path(), PathBuf::from("/tmp/taskd-test/taskd.db"));
    }

    #[test]
    fn partial_toml_fills_defaults() {
        let parsed: DaemonConfig =
            toml::from_str("port = 8080\n[scheduler]\nreminder_interval_secs = 60\n").unwrap();
        assert_eq!(parsed.port, 8080);
        assert_eq!(parsed.scheduler.reminder_interval_secs, 60);
        assert_eq!(parsed.scheduler.recurrence_interval_secs, 86_400);
    }
}
