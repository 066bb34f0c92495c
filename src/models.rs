use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::ops::RangeInclusive;

/// Production line. Stored as the integer `1` or `2`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum Line {
    One,
    Two,
}

impl Line {
    pub const ALL: [Line; 2] = [Line::One, Line::Two];

    pub fn number(self) -> u8 {
        match self {
            Line::One => 1,
            Line::Two => 2,
        }
    }

    /// Bodymaker machine ids installed on this line.
    pub fn machines(self) -> RangeInclusive<u32> {
        match self {
            Line::One => 11..=18,
            Line::Two => 21..=28,
        }
    }

    pub fn has_machine(self, machine_id: u32) -> bool {
        self.machines().contains(&machine_id)
    }
}

impl TryFrom<u8> for Line {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(Line::One),
            2 => Ok(Line::Two),
            other => Err(format!("line must be 1 or 2, got {other}")),
        }
    }
}

impl From<Line> for u8 {
    fn from(line: Line) -> Self {
        line.number()
    }
}

/// Womack reading as stored in the daily collection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DailyReading {
    pub id: String,
    pub date: NaiveDate,
    pub line: Line,
    pub water_consumption: f64,
    pub oil_consumption_total: f64,
    pub oil_consumption_partial: f64,
    pub created_at: DateTime<Utc>,
}

/// Validated daily fields, before the store assigns `id` and `createdAt`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NewDailyReading {
    pub date: NaiveDate,
    pub line: Line,
    pub water_consumption: f64,
    pub oil_consumption_total: f64,
    pub oil_consumption_partial: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MachineReading {
    pub machine_id: u32,
    pub consumption: f64,
}

/// Bodymaker weekly reading. Several may exist for the same line and week.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WeeklyReading {
    pub id: String,
    pub week_start_date: NaiveDate,
    pub line: Line,
    pub readings: Vec<MachineReading>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NewWeeklyReading {
    pub week_start_date: NaiveDate,
    pub line: Line,
    pub readings: Vec<MachineReading>,
}

/// A raw form value. Browsers post strings, API clients may post numbers.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum FieldInput {
    Text(String),
    Number(f64),
}

impl FieldInput {
    /// Trimmed text, `None` when blank.
    pub fn text(&self) -> Option<String> {
        match self {
            FieldInput::Text(value) => {
                let trimmed = value.trim();
                (!trimmed.is_empty()).then(|| trimmed.to_string())
            }
            FieldInput::Number(value) => Some(value.to_string()),
        }
    }
}

impl From<&str> for FieldInput {
    fn from(value: &str) -> Self {
        FieldInput::Text(value.to_string())
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DailyForm {
    #[serde(default)]
    pub date: Option<FieldInput>,
    #[serde(default)]
    pub line: Option<FieldInput>,
    #[serde(default)]
    pub water_consumption: Option<FieldInput>,
    #[serde(default)]
    pub oil_consumption_total: Option<FieldInput>,
    #[serde(default)]
    pub oil_consumption_partial: Option<FieldInput>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WeeklyForm {
    #[serde(default)]
    pub week_start_date: Option<FieldInput>,
    #[serde(default)]
    pub line: Option<FieldInput>,
    #[serde(default)]
    pub consumptions_by_machine: BTreeMap<String, FieldInput>,
}

/// One x-axis point of the daily chart.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DailyChartRow {
    pub name: String,
    pub date: NaiveDate,
    #[serde(rename = "Agua L1")]
    pub water_line1: f64,
    #[serde(rename = "Agua L2")]
    pub water_line2: f64,
    #[serde(rename = "Aceite L1")]
    pub oil_line1: f64,
    #[serde(rename = "Aceite L2")]
    pub oil_line2: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MachineComparisonRow {
    pub machine_id: u32,
    pub consumption_line1: f64,
    pub consumption_line2: f64,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardResponse {
    pub daily: Vec<DailyChartRow>,
    pub weekly: Vec<MachineComparisonRow>,
    pub line1_week: Option<NaiveDate>,
    pub line2_week: Option<NaiveDate>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryResponse<T> {
    pub line1: Vec<T>,
    pub line2: Vec<T>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionResponse {
    pub ready: bool,
    pub session_id: Option<String>,
    pub anonymous: Option<bool>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitResponse {
    pub id: String,
    pub message: String,
}

#[derive(Debug, Serialize)]
pub struct MachinesResponse {
    pub line: Line,
    pub machines: Vec<u32>,
}

#[derive(Debug, Deserialize)]
pub struct LineQuery {
    pub line: u8,
}
