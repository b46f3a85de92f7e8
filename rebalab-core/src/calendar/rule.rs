//! Rebalancing rule vocabulary: periodicity, moment, and snap direction.
//!
//! All three parse from the lowercase strings used in run configuration.
//! Parsing happens at call time, so an unrecognized value surfaces as a
//! `CalendarError` from whichever operation first needs it.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Errors raised while building a calendar or resolving a rebalancing rule.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CalendarError {
    #[error("trading calendar needs at least one date")]
    Empty,

    #[error("unrecognized rebalancing periodicity: '{0}'")]
    UnknownPeriodicity(String),

    #[error("unrecognized rebalancing moment: '{0}'")]
    UnknownMoment(String),

    #[error("unrecognized close day policy: '{0}' (expected 'after' or 'before')")]
    UnknownMagnet(String),

    #[error("moment {moment} is not supported for {periodicity} rebalancing")]
    MomentNotSupported {
        periodicity: Periodicity,
        moment: Moment,
    },
}

/// How often the portfolio is rebalanced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Periodicity {
    None,
    Daily,
    Weekly,
    Monthly,
    Quarterly,
    Yearly,
}

impl Periodicity {
    pub const ALL: [Periodicity; 6] = [
        Periodicity::None,
        Periodicity::Daily,
        Periodicity::Weekly,
        Periodicity::Monthly,
        Periodicity::Quarterly,
        Periodicity::Yearly,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Periodicity::None => "none",
            Periodicity::Daily => "daily",
            Periodicity::Weekly => "weekly",
            Periodicity::Monthly => "monthly",
            Periodicity::Quarterly => "quarterly",
            Periodicity::Yearly => "yearly",
        }
    }
}

impl fmt::Display for Periodicity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Periodicity {
    type Err = CalendarError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Periodicity::ALL
            .into_iter()
            .find(|p| p.as_str() == s)
            .ok_or_else(|| CalendarError::UnknownPeriodicity(s.to_string()))
    }
}

/// Which occurrence within a period triggers rebalancing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Moment {
    First,
    Last,
    /// Explicit calendar day of the month (1..=31). Monthly only.
    DayOfMonth(u32),
}

impl fmt::Display for Moment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Moment::First => f.write_str("first"),
            Moment::Last => f.write_str("last"),
            Moment::DayOfMonth(day) => write!(f, "{day}"),
        }
    }
}

impl FromStr for Moment {
    type Err = CalendarError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "first" => Ok(Moment::First),
            "last" => Ok(Moment::Last),
            other => match other.parse::<u32>() {
                Ok(day) if (1..=31).contains(&day) => Ok(Moment::DayOfMonth(day)),
                _ => Err(CalendarError::UnknownMoment(other.to_string())),
            },
        }
    }
}

/// Snap direction when mapping a calendar anchor onto a trading day.
///
/// `After` picks the earliest trading day on or after the anchor, `Before`
/// the latest trading day on or before it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Magnet {
    #[default]
    After,
    Before,
}

impl FromStr for Magnet {
    type Err = CalendarError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "after" => Ok(Magnet::After),
            "before" => Ok(Magnet::Before),
            other => Err(CalendarError::UnknownMagnet(other.to_string())),
        }
    }
}

/// A complete rebalancing rule: periodicity, moment, and the close day policy
/// used when an explicit day-of-month lands on a non-trading day.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RebalanceRule {
    pub periodicity: Periodicity,
    pub moment: Moment,
    pub close_day_policy: Magnet,
}

impl RebalanceRule {
    pub fn new(periodicity: Periodicity, moment: Moment) -> Self {
        Self {
            periodicity,
            moment,
            close_day_policy: Magnet::After,
        }
    }

    pub fn with_close_day_policy(mut self, policy: Magnet) -> Self {
        self.close_day_policy = policy;
        self
    }

    /// Parse a rule from its configuration strings.
    pub fn parse(periodicity: &str, moment: &str, close_day_policy: &str) -> Result<Self, CalendarError> {
        Ok(Self {
            periodicity: periodicity.parse()?,
            moment: moment.parse()?,
            close_day_policy: close_day_policy.parse()?,
        })
    }

    pub fn never() -> Self {
        Self::new(Periodicity::None, Moment::First)
    }
}
