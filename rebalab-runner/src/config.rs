//! Serializable run configuration (TOML files, JSON for hashing).

use chrono::NaiveDate;
use rebalab_core::calendar::{CalendarError, RebalanceRule};
use rebalab_core::engine::{CustomSchedule, EngineConfig, DEFAULT_IRREGULAR_COOLDOWN};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Unique identifier for a run (content-addressable hash).
pub type RunId = String;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("failed to serialize config: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("invalid rebalancing rule: {0}")]
    Rule(#[from] CalendarError),

    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Rebalancing moment as written in a config file: `"first"`, `"last"`, or a day number.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MomentSpec {
    Day(u32),
    Name(String),
}

impl Default for MomentSpec {
    fn default() -> Self {
        MomentSpec::Name("first".into())
    }
}

impl fmt::Display for MomentSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MomentSpec::Day(day) => write!(f, "{day}"),
            MomentSpec::Name(name) => f.write_str(name),
        }
    }
}

/// Periodicity, moment and close day policy, kept as text until the run starts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScheduleSpec {
    #[serde(default = "default_periodicity")]
    pub periodicity: String,
    #[serde(default)]
    pub moment: MomentSpec,
    #[serde(default = "default_close_day_policy")]
    pub close_day_policy: String,
}

impl Default for ScheduleSpec {
    fn default() -> Self {
        Self {
            periodicity: default_periodicity(),
            moment: MomentSpec::default(),
            close_day_policy: default_close_day_policy(),
        }
    }
}

impl ScheduleSpec {
    pub fn rule(&self) -> Result<RebalanceRule, CalendarError> {
        RebalanceRule::parse(&self.periodicity, &self.moment.to_string(), &self.close_day_policy)
    }
}

/// Override schedule section of a run file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CustomScheduleConfig {
    pub start_date: NaiveDate,
    #[serde(flatten)]
    pub schedule: ScheduleSpec,
    #[serde(default)]
    pub buy_delay: usize,
    #[serde(default)]
    pub sell_delay: usize,
    #[serde(default)]
    pub liquidation_date: Option<NaiveDate>,
}

/// Serializable configuration for a single run.
///
/// Captures everything needed to reproduce a run apart from the price data:
/// date range, rebalancing rule, settlement delays, fee, initial cash, and
/// the optional override schedule.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunConfig {
    pub name: String,
    /// First simulated date (inclusive)
    pub start_date: NaiveDate,
    /// Last simulated date (inclusive)
    pub end_date: NaiveDate,
    #[serde(flatten)]
    pub schedule: ScheduleSpec,
    #[serde(default)]
    pub buy_delay: usize,
    #[serde(default)]
    pub sell_delay: usize,
    #[serde(default)]
    pub transaction_fee: f64,
    #[serde(default = "default_initial_cash")]
    pub initial_cash: f64,
    #[serde(default = "default_irregular_cooldown")]
    pub irregular_cooldown: u32,
    #[serde(default)]
    pub custom_schedule: Option<CustomScheduleConfig>,
}

fn default_periodicity() -> String {
    "monthly".into()
}

fn default_close_day_policy() -> String {
    "after".into()
}

fn default_initial_cash() -> f64 {
    100.0
}

fn default_irregular_cooldown() -> u32 {
    DEFAULT_IRREGULAR_COOLDOWN
}

impl RunConfig {
    pub fn new(name: impl Into<String>, start_date: NaiveDate, end_date: NaiveDate) -> Self {
        Self {
            name: name.into(),
            start_date,
            end_date,
            schedule: ScheduleSpec::default(),
            buy_delay: 0,
            sell_delay: 0,
            transaction_fee: 0.0,
            initial_cash: default_initial_cash(),
            irregular_cooldown: DEFAULT_IRREGULAR_COOLDOWN,
            custom_schedule: None,
        }
    }

    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(content)?)
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&content)
    }

    /// Deterministic hash of the canonical JSON form.
    ///
    /// Two runs with identical configs share a RunId.
    pub fn run_id(&self) -> Result<RunId, ConfigError> {
        let json = serde_json::to_string(self)?;
        Ok(blake3::hash(json.as_bytes()).to_hex().to_string())
    }

    /// Parse the rule strings and build the engine configuration.
    pub fn engine_config(&self) -> Result<EngineConfig, ConfigError> {
        let mut config = EngineConfig::new(self.start_date, self.end_date, self.initial_cash)
            .with_rule(self.schedule.rule()?)
            .with_delays(self.buy_delay, self.sell_delay)
            .with_fee(self.transaction_fee)
            .with_irregular_cooldown(self.irregular_cooldown);

        if let Some(custom) = &self.custom_schedule {
            let mut schedule = CustomSchedule::new(custom.start_date, custom.schedule.rule()?)
                .with_delays(custom.buy_delay, custom.sell_delay);
            if let Some(date) = custom.liquidation_date {
                schedule = schedule.with_liquidation_date(date);
            }
            config = config.with_custom_schedule(schedule);
        }

        config
            .validate()
            .map_err(|e| ConfigError::Invalid(e.to_string()))?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rebalab_core::calendar::{Magnet, Moment, Periodicity};

    const FULL: &str = r#"
name = "80/20 quarterly"
start_date = "2020-01-01"
end_date = "2020-12-31"
periodicity = "monthly"
moment = 15
close_day_policy = "before"
buy_delay = 2
sell_delay = 1
transaction_fee = 0.001
initial_cash = 10000.0

[custom_schedule]
start_date = "2020-07-01"
periodicity = "weekly"
moment = "last"
buy_delay = 1
sell_delay = 1
liquidation_date = "2020-12-01"
"#;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    #[test]
    fn minimal_config_uses_defaults() {
        let config = RunConfig::from_toml_str(
            "name = \"x\"\nstart_date = \"2020-01-01\"\nend_date = \"2020-03-31\"\n",
        )
        .unwrap();
        assert_eq!(config.schedule.periodicity, "monthly");
        assert_eq!(config.schedule.moment, MomentSpec::Name("first".into()));
        assert_eq!(config.initial_cash, 100.0);
        assert_eq!(config.irregular_cooldown, 7);
        assert!(config.custom_schedule.is_none());

        let engine = config.engine_config().unwrap();
        assert_eq!(engine.rule, RebalanceRule::new(Periodicity::Monthly, Moment::First));
    }

    #[test]
    fn full_config_builds_engine_config() {
        let config = RunConfig::from_toml_str(FULL).unwrap();
        let engine = config.engine_config().unwrap();
        assert_eq!(engine.rule.moment, Moment::DayOfMonth(15));
        assert_eq!(engine.rule.close_day_policy, Magnet::Before);
        assert_eq!((engine.buy_delay, engine.sell_delay), (2, 1));
        assert_eq!(engine.initial_cash, 10_000.0);

        let custom = engine.custom_schedule.unwrap();
        assert_eq!(custom.start_date, d(2020, 7, 1));
        assert_eq!(custom.rule.periodicity, Periodicity::Weekly);
        assert_eq!(custom.rule.moment, Moment::Last);
        assert_eq!(custom.liquidation_date, Some(d(2020, 12, 1)));
    }

    #[test]
    fn unknown_periodicity_fails_when_building() {
        let mut config = RunConfig::new("x", d(2020, 1, 1), d(2020, 2, 1));
        config.schedule.periodicity = "hourly".into();
        assert!(matches!(
            config.engine_config(),
            Err(ConfigError::Rule(CalendarError::UnknownPeriodicity(_)))
        ));
    }

    #[test]
    fn invalid_fee_rejected() {
        let mut config = RunConfig::new("x", d(2020, 1, 1), d(2020, 2, 1));
        config.transaction_fee = 1.0;
        assert!(matches!(config.engine_config(), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn run_id_is_deterministic_and_sensitive() {
        let a = RunConfig::from_toml_str(FULL).unwrap();
        let b = a.clone();
        assert_eq!(a.run_id().unwrap(), b.run_id().unwrap());
        assert_eq!(a.run_id().unwrap().len(), 64);

        let mut c = a.clone();
        c.buy_delay = 3;
        assert_ne!(a.run_id().unwrap(), c.run_id().unwrap());
    }

    #[test]
    fn toml_roundtrip() {
        let config = RunConfig::from_toml_str(FULL).unwrap();
        let text = toml::to_string(&config).unwrap();
        assert_eq!(RunConfig::from_toml_str(&text).unwrap(), config);
    }

    #[test]
    fn missing_file_reports_path() {
        let err = RunConfig::load(Path::new("/nonexistent/run.toml")).unwrap_err();
        assert!(err.to_string().contains("/nonexistent/run.toml"));
    }
}
