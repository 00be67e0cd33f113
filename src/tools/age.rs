//! Age calculator: exact calendar difference between two dates.

use crate::config::{Constraints, OptionSpec};
use crate::error::{ToolError, ValidationError};
use crate::request::{Parameters, ToolRequest};
use crate::result::Artifact;
use crate::tool::Tool;
use async_trait::async_trait;
use chrono::{Datelike, Local, Months, NaiveDate};
use serde::Serialize;

pub const NAME: &str = "age-calculator";

const DATE_FORMAT: &str = "%Y-%m-%d";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct AgeBreakdown {
    pub years: u32,
    pub months: u32,
    pub days: u32,
    pub total_days: i64,
    /// 0 when today is the birthday.
    pub days_until_next_birthday: i64,
}

impl Artifact for AgeBreakdown {
    fn summary(&self) -> Vec<String> {
        vec![
            format!(
                "{} years, {} months, {} days",
                self.years, self.months, self.days
            ),
            format!("{} days old", self.total_days),
            match self.days_until_next_birthday {
                0 => "Happy birthday!".to_string(),
                n => format!("Next birthday in {n} days"),
            },
        ]
    }
}

fn add_months(date: NaiveDate, months: u32) -> NaiveDate {
    date.checked_add_months(Months::new(months)).unwrap_or(NaiveDate::MAX)
}

/// The birthday in `year`; Feb 29 falls back to Feb 28 outside leap years.
fn birthday_in(birth: NaiveDate, year: i32) -> Option<NaiveDate> {
    NaiveDate::from_ymd_opt(year, birth.month(), birth.day())
        .or_else(|| NaiveDate::from_ymd_opt(year, birth.month(), birth.day() - 1))
}

/// Age at `today`.
///
/// Whole months are counted up to the last monthly anniversary on or before
/// `today` (clamped to month end); the remainder is days, so a short
/// preceding month lends only its real length.
pub fn age_between(birth: NaiveDate, today: NaiveDate) -> Result<AgeBreakdown, ValidationError> {
    if birth > today {
        return Err(ValidationError::invalid_input(
            "Birth date cannot be in the future",
        ));
    }

    let mut months = (today.year() - birth.year()) as u32 * 12 + today.month() - birth.month();
    let mut anchor = add_months(birth, months);
    if anchor > today {
        months -= 1;
        anchor = add_months(birth, months);
    }
    let days = (today - anchor).num_days() as u32;

    let mut next = birthday_in(birth, today.year());
    if next.is_some_and(|d| d < today) {
        next = birthday_in(birth, today.year() + 1);
    }
    let days_until_next_birthday = next.map(|d| (d - today).num_days()).unwrap_or(0);

    Ok(AgeBreakdown {
        years: months / 12,
        months: months % 12,
        days,
        total_days: (today - birth).num_days(),
        days_until_next_birthday,
    })
}

fn parse_date(raw: &str) -> Result<NaiveDate, ValidationError> {
    NaiveDate::parse_from_str(raw.trim(), DATE_FORMAT).map_err(|_| {
        ValidationError::invalid_input(format!("'{}' is not a YYYY-MM-DD date", raw.trim()))
    })
}

fn today(params: &Parameters) -> Result<NaiveDate, ValidationError> {
    match params.get("today") {
        Some(raw) => parse_date(raw),
        None => Ok(Local::now().date_naive()),
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct AgeCalculatorTool;

#[async_trait]
impl Tool for AgeCalculatorTool {
    type Output = AgeBreakdown;

    fn name(&self) -> &'static str {
        NAME
    }

    fn constraints(&self) -> Constraints {
        Constraints::text("your date of birth", 32)
    }

    fn options(&self) -> Vec<OptionSpec> {
        vec![OptionSpec::date("today")]
    }

    fn validate(&self, request: &ToolRequest) -> Result<(), ValidationError> {
        let birth = parse_date(request.payload.as_text().unwrap_or_default())?;
        age_between(birth, today(&request.parameters)?).map(|_| ())
    }

    async fn process(&self, request: &ToolRequest) -> Result<AgeBreakdown, ToolError> {
        let birth = parse_date(request.payload.as_text().unwrap_or_default())?;
        Ok(age_between(birth, today(&request.parameters)?)?)
    }
}
