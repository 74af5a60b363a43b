//! Core track-and-field charting library: event aggregation, PR progressions and
//! keyed time-series chart panels.

use std::fmt;
use std::str::FromStr;

use serde::de::{self, Deserializer};
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub mod aggregate;
pub mod config;
pub mod mark;
pub mod panel;
pub mod pr;
pub mod roster;
pub mod scale;
pub mod scene;
pub mod tooltip;
pub mod transition;

pub use aggregate::{aggregate, AthleteSeries, Event};
pub use config::{ChartConfig, Margin};
pub use mark::{mark_to_seconds, normalize_date, parse_date, race_date, seconds_to_mark, short_mark};
pub use panel::{ChartPanel, PanelSet, PanelState, UpdateSummary};
pub use pr::extract_prs;
pub use roster::{Roster, CATEGORY10};
pub use scene::Scene;
pub use tooltip::Tooltip;

/// Sentinel mark recorded when a performance has no time.
pub const NO_TIME: &str = "NT";

#[derive(Error, Debug)]
pub enum TrackrError {
    #[error("invalid mark: {0:?}")]
    InvalidMark(String),
    #[error("invalid panel state: {0}")]
    PanelState(String),
    #[error("unknown line type: {0:?}")]
    InvalidLineType(String),
    #[error("invalid chart config: {0}")]
    InvalidConfig(String),
    #[error("malformed JSON input: {0}")]
    Json(#[from] serde_json::Error),
}

/// External athlete identifier; the results site hands out either numbers or strings.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AthleteId {
    Number(u64),
    Text(String),
}

impl AthleteId {
    /// Compare against a user-supplied label regardless of the JSON type the id came in as.
    pub fn matches(&self, label: &str) -> bool {
        match self {
            AthleteId::Number(n) => label.trim().parse::<u64>().map_or(false, |v| v == *n),
            AthleteId::Text(s) => s == label.trim(),
        }
    }
}

impl fmt::Display for AthleteId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AthleteId::Number(n) => write!(f, "{}", n),
            AthleteId::Text(s) => f.write_str(s),
        }
    }
}

/// Colour token (`#rrggbb`) linking a series back to its athlete across panels.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Color(pub String);

impl Color {
    pub fn new(hex: impl Into<String>) -> Self {
        Self(hex.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Decode `#rrggbb`; anything else yields `None`.
    pub fn rgb(&self) -> Option<(u8, u8, u8)> {
        let hex = self.0.strip_prefix('#')?;
        if hex.len() != 6 || !hex.is_ascii() {
            return None;
        }
        let channel = |i: usize| u8::from_str_radix(&hex[i..i + 2], 16).ok();
        Some((channel(0)?, channel(2)?, channel(4)?))
    }
}

impl Default for Color {
    fn default() -> Self {
        Self("#000000".to_string())
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A single scraped performance as it arrives from the results site.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RaceRecord {
    pub event: String,
    pub date: String,
    pub mark: String,
    #[serde(default)]
    pub meet: String,
    #[serde(default, deserialize_with = "string_or_number")]
    pub place: String,
}

impl RaceRecord {
    pub fn is_no_time(&self) -> bool {
        self.mark.trim() == NO_TIME
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Athlete {
    pub id: AthleteId,
    pub name: String,
    /// Most recent performance first.
    #[serde(default)]
    pub races: Vec<RaceRecord>,
    #[serde(default = "default_active")]
    pub active: bool,
    #[serde(default)]
    pub color: Color,
}

fn default_active() -> bool {
    true
}

fn string_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    match serde_json::Value::deserialize(deserializer)? {
        serde_json::Value::String(s) => Ok(s),
        serde_json::Value::Number(n) => Ok(n.to_string()),
        serde_json::Value::Null => Ok(String::new()),
        other => Err(de::Error::custom(format!(
            "expected string or number, found {}",
            other
        ))),
    }
}

/// Rendering identity of one race instance, stable across re-aggregation of unchanged data.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RaceKey(pub String);

impl RaceKey {
    pub fn compose(athlete_id: &AthleteId, record: &RaceRecord) -> Self {
        Self(format!(
            "{}|{}|{}|{}",
            athlete_id, record.event, record.date, record.mark
        ))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RaceKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A qualifying race after aggregation, carrying its owner's identity and colour.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Race {
    pub key: RaceKey,
    pub athlete_id: AthleteId,
    pub athlete_name: String,
    pub event: String,
    pub date: String,
    pub mark: String,
    pub meet: String,
    pub place: String,
    pub color: Color,
}

impl Race {
    pub fn seconds(&self) -> Result<f64, TrackrError> {
        mark_to_seconds(&self.mark)
    }

    pub fn day(&self) -> Option<chrono::NaiveDate> {
        race_date(&self.date)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum LineType {
    #[default]
    #[serde(rename = "all connected")]
    AllConnected,
    #[serde(rename = "PRs")]
    Prs,
}

impl FromStr for LineType {
    type Err = TrackrError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "all connected" | "all" => Ok(LineType::AllConnected),
            "prs" | "pr" => Ok(LineType::Prs),
            _ => Err(TrackrError::InvalidLineType(s.to_string())),
        }
    }
}

impl fmt::Display for LineType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LineType::AllConnected => f.write_str("all connected"),
            LineType::Prs => f.write_str("PRs"),
        }
    }
}
