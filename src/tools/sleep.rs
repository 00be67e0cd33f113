//! Sleep-cycle calculator.

use crate::config::{Constraints, OptionSpec};
use crate::error::{ToolError, ValidationError};
use crate::request::ToolRequest;
use crate::result::Artifact;
use crate::tool::Tool;
use async_trait::async_trait;
use chrono::{NaiveTime, Timelike};
use serde::Serialize;

pub const NAME: &str = "sleep-calculator";

pub const CYCLE_MINUTES: i64 = 90;
pub const FALL_ASLEEP_MINUTES: i64 = 14;

/// Cycle counts suggested, best first.
pub const CYCLES: [i64; 4] = [6, 5, 4, 3];

const MINUTES_PER_DAY: i64 = 24 * 60;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SleepMode {
    /// The input is the wake-up time; suggest bedtimes.
    WakeAt,
    /// The input is the bedtime; suggest wake-up times.
    BedAt,
}

impl SleepMode {
    fn parse(raw: &str) -> Self {
        if raw == "bed_at" {
            SleepMode::BedAt
        } else {
            SleepMode::WakeAt
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SleepSuggestion {
    pub cycles: i64,
    /// `HH:MM`, 24 h.
    pub time: String,
    pub sleep_minutes: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SleepPlan {
    pub mode: SleepMode,
    pub reference: String,
    pub suggestions: Vec<SleepSuggestion>,
}

impl Artifact for SleepPlan {
    fn summary(&self) -> Vec<String> {
        let headline = match self.mode {
            SleepMode::WakeAt => format!("To wake up at {}, go to bed at:", self.reference),
            SleepMode::BedAt => format!("Going to bed at {}, wake up at:", self.reference),
        };
        let mut lines = vec![headline];
        lines.extend(self.suggestions.iter().map(|s| {
            format!(
                "{}  ({} cycles, {}h{:02} of sleep)",
                s.time,
                s.cycles,
                s.sleep_minutes / 60,
                s.sleep_minutes % 60
            )
        }));
        lines
    }
}

fn format_minutes(total: i64) -> String {
    let m = total.rem_euclid(MINUTES_PER_DAY);
    format!("{:02}:{:02}", m / 60, m % 60)
}

pub fn parse_time(raw: &str) -> Result<NaiveTime, ValidationError> {
    NaiveTime::parse_from_str(raw.trim(), "%H:%M")
        .map_err(|_| ValidationError::invalid_input(format!("'{}' is not an HH:MM time", raw.trim())))
}

/// Suggested times for `reference` in `mode`, wrapping at midnight.
pub fn plan(reference: NaiveTime, mode: SleepMode) -> SleepPlan {
    let base = i64::from(reference.hour() * 60 + reference.minute());
    let suggestions = CYCLES
        .iter()
        .map(|&cycles| {
            let sleep_minutes = cycles * CYCLE_MINUTES;
            let time = match mode {
                SleepMode::WakeAt => base - FALL_ASLEEP_MINUTES - sleep_minutes,
                SleepMode::BedAt => base + FALL_ASLEEP_MINUTES + sleep_minutes,
            };
            SleepSuggestion {
                cycles,
                time: format_minutes(time),
                sleep_minutes,
            }
        })
        .collect();
    SleepPlan {
        mode,
        reference: format_minutes(base),
        suggestions,
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SleepCalculatorTool;

#[async_trait]
impl Tool for SleepCalculatorTool {
    type Output = SleepPlan;

    fn name(&self) -> &'static str {
        NAME
    }

    fn constraints(&self) -> Constraints {
        Constraints::text("a time (HH:MM)", 16)
    }

    fn options(&self) -> Vec<OptionSpec> {
        vec![OptionSpec::choice("mode", &["wake_at", "bed_at"], "wake_at")]
    }

    fn validate(&self, request: &ToolRequest) -> Result<(), ValidationError> {
        parse_time(request.payload.as_text().unwrap_or_default()).map(|_| ())
    }

    async fn process(&self, request: &ToolRequest) -> Result<SleepPlan, ToolError> {
        let time = parse_time(request.payload.as_text().unwrap_or_default())?;
        let mode = SleepMode::parse(request.parameters.require("mode")?);
        Ok(plan(time, mode))
    }
}
