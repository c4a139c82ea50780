//! Cron specs: six-field, seconds-resolution time triggers.
//!
//! Field order is `sec min hour day-of-month month day-of-week`. Each field
//! accepts `*`, a step (`*/5`), an explicit comma list (`0,15,30,45`), or an
//! inclusive range (`8-18`). Day-of-week runs Sunday=0 through Saturday=6,
//! with 7 accepted as an alias for Sunday.

use std::fmt;
use std::str::FromStr;

use chrono::{Datelike, Timelike};

use crate::time::Timestamp;

/// Malformed cron spec.
#[derive(Debug, thiserror::Error)]
#[error("invalid cron spec {spec:?}: {reason}")]
pub struct CronError {
    /// The full spec text that failed to parse.
    pub spec: String,
    /// What went wrong.
    pub reason: String,
}

/// One of the six positions in a spec.
#[derive(Debug, Clone, PartialEq, Eq)]
enum CronField {
    /// `*` matches every value.
    Any,
    /// `*/n` matches values divisible by the step.
    Step(u32),
    /// Explicit list of accepted values (already range-expanded).
    Values(Vec<u32>),
}

impl CronField {
    fn matches(&self, value: u32) -> bool {
        match self {
            Self::Any => true,
            Self::Step(step) => value % step == 0,
            Self::Values(values) => values.contains(&value),
        }
    }

    fn parse(text: &str, min: u32, max: u32) -> Result<Self, String> {
        if text == "*" {
            return Ok(Self::Any);
        }
        if let Some(step) = text.strip_prefix("*/") {
            let step: u32 = step
                .parse()
                .map_err(|_| format!("bad step in {text:?}"))?;
            if step == 0 {
                return Err(format!("zero step in {text:?}"));
            }
            return Ok(Self::Step(step));
        }
        let mut values = Vec::new();
        for part in text.split(',') {
            if let Some((lo, hi)) = part.split_once('-') {
                let lo: u32 = lo.parse().map_err(|_| format!("bad range in {part:?}"))?;
                let hi: u32 = hi.parse().map_err(|_| format!("bad range in {part:?}"))?;
                if lo > hi {
                    return Err(format!("inverted range in {part:?}"));
                }
                values.extend(lo..=hi);
            } else {
                let value: u32 = part.parse().map_err(|_| format!("bad value in {part:?}"))?;
                values.push(value);
            }
        }
        for value in &values {
            if *value < min || *value > max {
                return Err(format!("value {value} out of range {min}..={max}"));
            }
        }
        Ok(Self::Values(values))
    }
}

/// A parsed six-field time-trigger specification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CronSpec {
    source: String,
    second: CronField,
    minute: CronField,
    hour: CronField,
    day_of_month: CronField,
    month: CronField,
    day_of_week: CronField,
}

impl CronSpec {
    /// Whether this spec is due at the given instant (second resolution).
    #[must_use]
    pub fn matches(&self, at: Timestamp) -> bool {
        // chrono reports Sunday as 0 via num_days_from_sunday.
        self.second.matches(at.second())
            && self.minute.matches(at.minute())
            && self.hour.matches(at.hour())
            && self.day_of_month.matches(at.day())
            && self.month.matches(at.month())
            && self.day_of_week.matches(at.weekday().num_days_from_sunday())
    }

    /// The original spec text.
    #[must_use]
    pub fn source(&self) -> &str {
        &self.source
    }
}

impl FromStr for CronSpec {
    type Err = CronError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let err = |reason: String| CronError {
            spec: s.to_string(),
            reason,
        };
        let fields: Vec<&str> = s.split_whitespace().collect();
        if fields.len() != 6 {
            return Err(err(format!("expected 6 fields, got {}", fields.len())));
        }
        let mut day_of_week = CronField::parse(fields[5], 0, 7).map_err(err)?;
        // 7 is an alias for Sunday.
        if let CronField::Values(values) = &mut day_of_week {
            for value in values {
                if *value == 7 {
                    *value = 0;
                }
            }
        }
        Ok(Self {
            source: s.to_string(),
            second: CronField::parse(fields[0], 0, 59).map_err(err)?,
            minute: CronField::parse(fields[1], 0, 59).map_err(err)?,
            hour: CronField::parse(fields[2], 0, 23).map_err(err)?,
            day_of_month: CronField::parse(fields[3], 1, 31).map_err(err)?,
            month: CronField::parse(fields[4], 1, 12).map_err(err)?,
            day_of_week,
        })
    }
}

impl fmt::Display for CronSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.source)
    }
}
