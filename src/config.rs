//! Minimal runtime configuration helpers.
//! Without `DATABASE_URL` everything lives in memory for the life of the process.

use std::time::Duration;

use crate::services::dashboard::DEFAULT_RECENT_READINGS;

pub const DEFAULT_SIMULATION_SECS: u64 = 60;
pub const DEFAULT_HISTORY_HOURS: u32 = 24;

#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    /// PostgreSQL connection string; `None` selects the in-memory store.
    pub database_url: Option<String>,
    /// Drift facility temperatures on a timer.
    pub simulation_enabled: bool,
    /// Simulation cadence.
    pub simulation_interval: Duration,
    /// Create the default facilities when the store is empty.
    pub seed_default_data: bool,
    /// Readings listed per facility in display views.
    pub recent_readings_limit: usize,
    /// Window reported in the startup history summary.
    pub history_hours: u32,
}

impl Config {
    pub fn from_env() -> Result<Self, String> {
        Config::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from any key lookup; empty values count as unset.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, String> {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let simulation_secs = match get("SIMULATION_INTERVAL_SECS") {
            Some(s) => s
                .parse::<u64>()
                .ok()
                .filter(|v| *v > 0)
                .ok_or_else(|| "SIMULATION_INTERVAL_SECS must be a positive integer".to_string())?,
            None => DEFAULT_SIMULATION_SECS,
        };

        let recent_readings_limit = match get("RECENT_READINGS_LIMIT") {
            Some(s) => s
                .parse::<usize>()
                .map_err(|_| "RECENT_READINGS_LIMIT must be a non-negative integer".to_string())?,
            None => DEFAULT_RECENT_READINGS,
        };

        let history_hours = match get("HISTORY_HOURS") {
            Some(s) => s
                .parse::<u32>()
                .map_err(|_| "HISTORY_HOURS must be a non-negative integer".to_string())?,
            None => DEFAULT_HISTORY_HOURS,
        };

        Ok(Config {
            database_url: get("DATABASE_URL"),
            simulation_enabled: get("SIMULATION_ENABLED").map(|s| parse_flag(&s)).unwrap_or(true),
            simulation_interval: Duration::from_secs(simulation_secs),
            seed_default_data: get("SEED_DEFAULT_DATA").map(|s| parse_flag(&s)).unwrap_or(true),
            recent_readings_limit,
            history_hours,
        })
    }
}

fn parse_flag(s: &str) -> bool {
    matches!(s, "1" | "true" | "TRUE" | "yes")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn from_pairs(pairs: &[(&str, &str)]) -> Result<Config, String> {
        let map: HashMap<String, String> = pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        Config::from_lookup(|key| map.get(key).cloned())
    }

    #[test]
    fn defaults_select_memory_store() {
        let cfg = from_pairs(&[]).unwrap();
        assert_eq!(cfg.database_url, None);
        assert!(cfg.simulation_enabled);
        assert!(cfg.seed_default_data);
        assert_eq!(cfg.simulation_interval, Duration::from_secs(60));
        assert_eq!(cfg.recent_readings_limit, 5);
        assert_eq!(cfg.history_hours, 24);
    }

    #[test]
    fn overrides_are_parsed() {
        let cfg = from_pairs(&[
            ("DATABASE_URL", "postgres://localhost/spa"),
            ("SIMULATION_ENABLED", "false"),
            ("SIMULATION_INTERVAL_SECS", "5"),
            ("SEED_DEFAULT_DATA", "0"),
            ("RECENT_READINGS_LIMIT", "3"),
            ("HISTORY_HOURS", "6"),
        ])
        .unwrap();
        assert_eq!(cfg.database_url.as_deref(), Some("postgres://localhost/spa"));
        assert!(!cfg.simulation_enabled);
        assert!(!cfg.seed_default_data);
        assert_eq!(cfg.simulation_interval, Duration::from_secs(5));
        assert_eq!(cfg.recent_readings_limit, 3);
        assert_eq!(cfg.history_hours, 6);
    }

    #[test]
    fn blank_database_url_counts_as_unset() {
        let cfg = from_pairs(&[("DATABASE_URL", "   ")]).unwrap();
        assert_eq!(cfg.database_url, None);
    }

    #[test]
    fn invalid_numbers_are_rejected() {
        assert!(from_pairs(&[("SIMULATION_INTERVAL_SECS", "0")]).is_err());
        assert!(from_pairs(&[("SIMULATION_INTERVAL_SECS", "soon")]).is_err());
        assert!(from_pairs(&[("RECENT_READINGS_LIMIT", "-1")]).is_err());
    }
}
