//! Cron expressions for scheduled full revalidations.
//!
//! Accepted forms:
//! - 5 fields, standard cron: `min hour dom month dow` (`*/15 * * * *`)
//! - 6 or 7 fields with leading seconds (and trailing year)
//! - descriptors: `@yearly`, `@annually`, `@monthly`, `@weekly`, `@daily`,
//!   `@midnight`, `@hourly`
//!
//! The 5-field form numbers weekdays 0-7 with Sunday as 0 and 7. The cron
//! crate numbers them 1-7 from Sunday, so numeric weekdays of the 5-field
//! form are rewritten to names before parsing. Ranges ending in 7 (`5-7`)
//! become lists (`Fri,Sat,Sun`).
//!
//! All times are UTC.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use cron::Schedule;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
#[error("invalid revalidate schedule {expression:?}: {reason}")]
pub struct ScheduleParseError {
    pub expression: String,
    pub reason: String,
}

/// A parsed cron schedule, keeping the expression it was written as.
#[derive(Debug, Clone)]
pub struct RevalidateSchedule {
    expression: String,
    schedule: Schedule,
}

impl RevalidateSchedule {
    pub fn expression(&self) -> &str {
        &self.expression
    }

    /// First fire time strictly after `after`.
    pub fn next_after(&self, after: &DateTime<Utc>) -> Option<DateTime<Utc>> {
        self.schedule.after(after).next()
    }
}

impl FromStr for RevalidateSchedule {
    type Err = ScheduleParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let error = |reason: String| ScheduleParseError {
            expression: s.to_string(),
            reason,
        };

        let normalized = normalize(s.trim()).map_err(|reason| error(reason.to_string()))?;
        let schedule = Schedule::from_str(&normalized).map_err(|e| error(e.to_string()))?;

        Ok(Self {
            expression: s.trim().to_string(),
            schedule,
        })
    }
}

impl fmt::Display for RevalidateSchedule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.expression)
    }
}

/// Rewrites an accepted expression into the 6/7-field form of the cron crate.
fn normalize(expression: &str) -> Result<String, &'static str> {
    if let Some(descriptor) = expression.strip_prefix('@') {
        return match descriptor {
            "yearly" | "annually" => Ok("0 0 0 1 1 *".to_string()),
            "monthly" => Ok("0 0 0 1 * *".to_string()),
            "weekly" => Ok("0 0 0 * * Sun".to_string()),
            "daily" | "midnight" => Ok("0 0 0 * * *".to_string()),
            "hourly" => Ok("0 0 * * * *".to_string()),
            _ => Err("unknown descriptor"),
        };
    }

    let fields: Vec<&str> = expression.split_whitespace().collect();
    match fields.len() {
        5 => Ok(format!(
            "0 {} {} {} {} {}",
            fields[0],
            fields[1],
            fields[2],
            fields[3],
            weekday_names(fields[4])
        )),
        6 | 7 => Ok(fields.join(" ")),
        0 => Err("empty expression"),
        _ => Err("expected 5, 6 or 7 fields"),
    }
}

const WEEKDAYS: [&str; 8] = ["Sun", "Mon", "Tue", "Wed", "Thu", "Fri", "Sat", "Sun"];

/// Replaces numeric weekdays (0-7, Sunday = 0 or 7) with names.
fn weekday_names(field: &str) -> String {
    field.split(',').map(weekday_item).collect::<Vec<_>>().join(",")
}

/// Rewrites one list item: a value, a range, or either with a `/step`.
///
/// A range ending in 7 would wrap from Saturday back to Sunday, which the
/// cron crate cannot express as a range, so it is expanded into a list.
fn weekday_item(item: &str) -> String {
    let (range, step) = match item.split_once('/') {
        Some((range, step)) => (range, Some(step)),
        None => (item, None),
    };

    if let Some((start, end)) = range.split_once('-')
        && let (Ok(start), Ok(7)) = (start.parse::<usize>(), end.parse::<usize>())
        && let Some(step) = step.map_or(Some(1), |s| s.parse::<usize>().ok())
        && step > 0
    {
        let mut days: Vec<&str> = (start..=7).step_by(step).map(|n| WEEKDAYS[n]).collect();
        if start == 0 && days.len() > 1 && days.last() == Some(&"Sun") {
            days.pop();
        }
        return days.join(",");
    }

    let mut out = range
        .split('-')
        .map(|value| match value.parse::<usize>() {
            Ok(n) if n < WEEKDAYS.len() => WEEKDAYS[n],
            _ => value,
        })
        .collect::<Vec<_>>()
        .join("-");
    if let Some(step) = step {
        out.push('/');
        out.push_str(step);
    }
    out
}
