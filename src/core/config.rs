//! Configuration system: TOML file + env var overrides + smart defaults.

#![allow(missing_docs)]

use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::core::errors::{Result, SlaError};
use crate::milestone::aggregator::RepresentativeRule;
use crate::milestone::gauge::CounterColors;
use crate::milestone::threshold::Thresholds;
use crate::table::columns::CASE_ID_FIELD;
use crate::table::export::DEFAULT_EXPORT_ROW_CAP;
use crate::table::normalize::DisplayTimezone;

/// Full dashboard configuration model.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(default)]
pub struct Config {
    /// Account scope passed through to the data source untouched.
    pub scope_id: Option<String>,
    pub polling: PollingConfig,
    pub thresholds: Thresholds,
    pub table: TableConfig,
    pub display: CounterColors,
    pub aggregation: AggregationConfig,
    pub logging: LoggingConfig,
    pub paths: PathsConfig,
}

/// Refresh cadence.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct PollingConfig {
    pub interval_secs: u64,
    /// Period of the red-zone flash toggle.
    pub flash_interval_ms: u64,
}

/// Drill-down table knobs.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct TableConfig {
    /// `field[:widthPx], ...` column specification.
    pub column_spec: String,
    pub page_size: usize,
    pub export_row_cap: usize,
    /// Ticket URL prefix; the ticket key is appended.
    pub jira_base_url: String,
    pub display_timezone: DisplayTimezone,
}

/// Priority-mode behavior.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(default)]
pub struct AggregationConfig {
    pub representative: RepresentativeRule,
}

/// Activity log settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(default)]
pub struct LoggingConfig {
    /// Informational events are written only when set.
    pub verbose: bool,
    /// Overrides `paths.jsonl_log`.
    pub jsonl_path: Option<PathBuf>,
}

/// Filesystem paths used by slad.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct PathsConfig {
    pub config_file: PathBuf,
    pub jsonl_log: PathBuf,
}

impl Default for PollingConfig {
    fn default() -> Self {
        Self {
            interval_secs: 60,
            flash_interval_ms: 500,
        }
    }
}

impl Default for TableConfig {
    fn default() -> Self {
        Self {
            column_spec: format!("{CASE_ID_FIELD}:100, Subject, Priority, Status"),
            page_size: 50,
            export_row_cap: DEFAULT_EXPORT_ROW_CAP,
            jira_base_url: "https://aviobook.atlassian.net/browse/".to_string(),
            display_timezone: DisplayTimezone::Local,
        }
    }
}

impl Default for PathsConfig {
    fn default() -> Self {
        let home_dir = env::var_os("HOME").map_or_else(
            || {
                eprintln!("[SLAD-CONFIG] WARNING: HOME not set, falling back to /tmp for data paths");
                PathBuf::from("/tmp")
            },
            PathBuf::from,
        );
        let cfg = home_dir.join(".config").join("slad").join("config.toml");
        let data = home_dir.join(".local").join("share").join("slad");
        Self {
            config_file: cfg,
            jsonl_log: data.join("activity.jsonl"),
        }
    }
}

impl Config {
    /// Default configuration path.
    #[must_use]
    pub fn default_path() -> PathBuf {
        PathsConfig::default().config_file
    }

    /// Load config from default or explicit path, then apply env overrides.
    ///
    /// Missing config file is not an error when loading from default path; defaults are used.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        Self::load_with(path, env_var)
    }

    /// [`Self::load`] with an explicit env lookup.
    pub fn load_with<F>(path: Option<&Path>, lookup: F) -> Result<Self>
    where
        F: FnMut(&str) -> Option<String>,
    {
        let path_buf = path.map_or_else(Self::default_path, Path::to_path_buf);
        let is_explicit_path = path.is_some();

        let mut cfg = if path_buf.exists() {
            let raw = fs::read_to_string(&path_buf).map_err(|source| SlaError::Io {
                path: path_buf.clone(),
                source,
            })?;
            let parsed: Self = toml::from_str(&raw)?;
            parsed
        } else if is_explicit_path {
            return Err(SlaError::MissingConfig { path: path_buf });
        } else {
            Self::default()
        };

        cfg.paths.config_file = path_buf;
        cfg.apply_env_overrides_from(lookup)?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Deterministic hash of the effective config for the activity log.
    ///
    /// FNV-1a, so the value is stable across processes and toolchains.
    pub fn stable_hash(&self) -> Result<String> {
        let canonical = serde_json::to_string(self)?;
        let mut hash: u64 = 0xcbf2_9ce4_8422_2325;
        for byte in canonical.as_bytes() {
            hash ^= u64::from(*byte);
            hash = hash.wrapping_mul(0x0100_0000_01b3);
        }
        Ok(format!("{hash:016x}"))
    }

    /// Activity log destination.
    #[must_use]
    pub fn jsonl_path(&self) -> PathBuf {
        self.logging
            .jsonl_path
            .clone()
            .unwrap_or_else(|| self.paths.jsonl_log.clone())
    }

    fn apply_env_overrides_from<F>(&mut self, mut lookup: F) -> Result<()>
    where
        F: FnMut(&str) -> Option<String>,
    {
        let mut get = |name: &str| lookup(name).filter(|raw| !raw.trim().is_empty());

        if let Some(raw) = get("SLAD_POLLING_INTERVAL_SECS") {
            self.polling.interval_secs = parse_env("SLAD_POLLING_INTERVAL_SECS", &raw)?;
        }
        if let Some(raw) = get("SLAD_THRESHOLD_GREEN_MIN_HOURS") {
            self.thresholds.green_min_hours = parse_env("SLAD_THRESHOLD_GREEN_MIN_HOURS", &raw)?;
        }
        if let Some(raw) = get("SLAD_THRESHOLD_YELLOW_MIN_HOURS") {
            self.thresholds.yellow_min_hours = parse_env("SLAD_THRESHOLD_YELLOW_MIN_HOURS", &raw)?;
        }
        if let Some(raw) = get("SLAD_THRESHOLD_ORANGE_MIN_HOURS") {
            self.thresholds.orange_min_hours = parse_env("SLAD_THRESHOLD_ORANGE_MIN_HOURS", &raw)?;
        }
        if let Some(raw) = get("SLAD_TABLE_COLUMN_SPEC") {
            self.table.column_spec = raw;
        }
        if let Some(raw) = get("SLAD_TABLE_PAGE_SIZE") {
            self.table.page_size = parse_env("SLAD_TABLE_PAGE_SIZE", &raw)?;
        }
        if let Some(raw) = get("SLAD_LOGGING_VERBOSE") {
            self.logging.verbose = parse_env("SLAD_LOGGING_VERBOSE", &raw)?;
        }
        if let Some(raw) = get("SLAD_SCOPE_ID") {
            self.scope_id = Some(raw);
        }
        Ok(())
    }

    /// Reject configurations the dashboard cannot run with.
    pub fn validate(&self) -> Result<()> {
        if self.polling.interval_secs == 0 {
            return Err(SlaError::InvalidConfig {
                details: "polling.interval_secs must be > 0".to_string(),
            });
        }
        if self.polling.flash_interval_ms == 0 {
            return Err(SlaError::InvalidConfig {
                details: "polling.flash_interval_ms must be > 0".to_string(),
            });
        }

        let t = &self.thresholds;
        for (name, val) in [
            ("green_min_hours", t.green_min_hours),
            ("yellow_min_hours", t.yellow_min_hours),
            ("orange_min_hours", t.orange_min_hours),
        ] {
            if !val.is_finite() || val < 0.0 {
                return Err(SlaError::InvalidConfig {
                    details: format!("thresholds.{name} must be a finite value >= 0, got {val}"),
                });
            }
        }
        if !(t.green_min_hours > t.yellow_min_hours && t.yellow_min_hours > t.orange_min_hours) {
            return Err(SlaError::InvalidConfig {
                details: "thresholds must strictly descend: green > yellow > orange".to_string(),
            });
        }

        if self.table.page_size == 0 {
            return Err(SlaError::InvalidConfig {
                details: "table.page_size must be > 0".to_string(),
            });
        }
        if self.table.export_row_cap < self.table.page_size {
            return Err(SlaError::InvalidConfig {
                details: format!(
                    "table.export_row_cap ({}) must be >= table.page_size ({})",
                    self.table.export_row_cap, self.table.page_size
                ),
            });
        }
        if self.table.column_spec.trim().is_empty() {
            return Err(SlaError::InvalidConfig {
                details: format!("table.column_spec must name at least {CASE_ID_FIELD}"),
            });
        }
        if !(self.table.jira_base_url.starts_with("https://")
            || self.table.jira_base_url.starts_with("http://"))
        {
            return Err(SlaError::InvalidConfig {
                details: format!(
                    "table.jira_base_url must be an http(s) URL, got {:?}",
                    self.table.jira_base_url
                ),
            });
        }

        for (name, color) in [
            ("threshold_color", &self.display.threshold_color),
            ("normal_color", &self.display.normal_color),
        ] {
            if !is_hex_color(color) {
                return Err(SlaError::InvalidConfig {
                    details: format!("display.{name} must be #rgb or #rrggbb, got {color:?}"),
                });
            }
        }
        Ok(())
    }
}

fn is_hex_color(raw: &str) -> bool {
    raw.strip_prefix('#').is_some_and(|hex| {
        matches!(hex.len(), 3 | 6) && hex.bytes().all(|b| b.is_ascii_hexdigit())
    })
}

fn env_var(name: &str) -> Option<String> {
    env::var(name).ok()
}

fn parse_env<T>(name: &str, raw: &str) -> Result<T>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    raw.trim().parse::<T>().map_err(|error| SlaError::ConfigParse {
        context: "env",
        details: format!("{name}={raw:?}: {error}"),
    })
}
