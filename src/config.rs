use std::path::PathBuf;

use tracing::warn;

use crate::engine::ConflictPolicy;

pub const JOURNAL_FILE: &str = "editbay.journal";

/// Process settings, read once from `EDITBAY_*` environment variables.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub bind: String,
    pub port: u16,
    pub data_dir: PathBuf,
    pub max_connections: usize,
    /// Journal appends between compactions. 0 disables compaction.
    pub compact_threshold: u64,
    pub metrics_port: Option<u16>,
    /// Tenant to load demo fixtures into.
    pub demo_tenant: Option<String>,
    /// Used when a request does not name a policy.
    pub series_policy: ConflictPolicy,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bind: "0.0.0.0".into(),
            port: 7433,
            data_dir: PathBuf::from("./data"),
            max_connections: 256,
            compact_threshold: 1000,
            metrics_port: None,
            demo_tenant: None,
            series_policy: ConflictPolicy::Skip,
        }
    }
}

impl Config {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Unparseable values fall back to the default.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        let series_policy = match lookup("EDITBAY_SERIES_POLICY") {
            Some(raw) => raw.parse().unwrap_or_else(|e| {
                warn!("EDITBAY_SERIES_POLICY: {e}, using {:?}", defaults.series_policy);
                defaults.series_policy
            }),
            None => defaults.series_policy,
        };
        Self {
            bind: lookup("EDITBAY_BIND").unwrap_or(defaults.bind),
            port: lookup("EDITBAY_PORT")
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.port),
            data_dir: lookup("EDITBAY_DATA_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.data_dir),
            max_connections: lookup("EDITBAY_MAX_CONNECTIONS")
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.max_connections),
            compact_threshold: lookup("EDITBAY_COMPACT_THRESHOLD")
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.compact_threshold),
            metrics_port: lookup("EDITBAY_METRICS_PORT").and_then(|s| s.parse().ok()),
            demo_tenant: lookup("EDITBAY_DEMO_TENANT").filter(|s| !s.is_empty()),
            series_policy,
        }
    }

    pub fn journal_path(&self) -> PathBuf {
        self.data_dir.join(JOURNAL_FILE)
    }

    pub fn addr(&self) -> String {
        format!("{}:{}", self.bind, self.port)
    }
}
