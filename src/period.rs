use chrono::{Datelike, Duration, NaiveDate};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Size of the time bucket commits are grouped into.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Granularity {
    #[default]
    Day,
    Week,
    Month,
}

impl Granularity {
    /// Parses a granularity name. Anything unrecognized means `Day`.
    pub fn from_name(name: &str) -> Self {
        Self::parse_known(name).unwrap_or(Granularity::Day)
    }

    pub fn parse_known(name: &str) -> Option<Self> {
        match name.trim().to_lowercase().as_str() {
            "day" => Some(Granularity::Day),
            "week" => Some(Granularity::Week),
            "month" => Some(Granularity::Month),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Granularity::Day => "day",
            Granularity::Week => "week",
            Granularity::Month => "month",
        }
    }
}

impl fmt::Display for Granularity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// First calendar day of a bucket. Keys order as dates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct PeriodKey(NaiveDate);

impl PeriodKey {
    pub fn date(&self) -> NaiveDate {
        self.0
    }
}

impl fmt::Display for PeriodKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.format("%Y-%m-%d"))
    }
}

/// Heading text for a period.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DisplayLabel {
    Flat(String),
    /// `(year, full month name)`, rendered as a year heading over a month heading.
    YearMonth(String, String),
}

impl fmt::Display for DisplayLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DisplayLabel::Flat(label) => f.write_str(label),
            DisplayLabel::YearMonth(year, month) => write!(f, "{month} {year}"),
        }
    }
}

pub fn derive_key(date: NaiveDate, granularity: Granularity) -> PeriodKey {
    match granularity {
        Granularity::Day => PeriodKey(date),
        Granularity::Week => {
            let offset = date.weekday().num_days_from_monday() as i64;
            PeriodKey(date - Duration::days(offset))
        }
        Granularity::Month => PeriodKey(date.with_day(1).unwrap_or(date)),
    }
}

pub fn format_label(date: NaiveDate, granularity: Granularity) -> DisplayLabel {
    match granularity {
        Granularity::Day => DisplayLabel::Flat(day_label(date)),
        Granularity::Week => {
            let start = derive_key(date, Granularity::Week).date();
            let end = start + Duration::days(6);
            DisplayLabel::Flat(format!("{} - {}", day_label(start), day_label(end)))
        }
        Granularity::Month => DisplayLabel::YearMonth(
            date.format("%Y").to_string(),
            date.format("%B").to_string(),
        ),
    }
}

pub fn day_label(date: NaiveDate) -> String {
    date.format("%d %b %Y").to_string()
}

/// Last calendar day covered by the period containing `date`.
pub fn period_end(date: NaiveDate, granularity: Granularity) -> NaiveDate {
    let start = derive_key(date, granularity).date();
    match granularity {
        Granularity::Day => start,
        Granularity::Week => start + Duration::days(6),
        Granularity::Month => {
            let (year, month) = if start.month() == 12 {
                (start.year() + 1, 1)
            } else {
                (start.year(), start.month() + 1)
            };
            NaiveDate::from_ymd_opt(year, month, 1)
                .map(|next| next - Duration::days(1))
                .unwrap_or(start)
        }
    }
}
