//! Minimal cron expression support: "MIN HOUR DOM MON DOW".
//! Minute and hour fields accept *, */N, N, A-B, and comma lists; the
//! date fields are accepted but only * is honored. Parsed once into a
//! `CronSchedule`, then queried per fire.

use chrono::{DateTime, Duration, Timelike, Utc};
use spacebot_core::error::{Result, SpacebotError};
use std::str::FromStr;

/// A parsed notification schedule.
#[derive(Debug, Clone)]
pub struct CronSchedule {
    minutes: Vec<u32>,
    hours: Vec<u32>,
}

impl FromStr for CronSchedule {
    type Err = SpacebotError;

    fn from_str(expression: &str) -> Result<Self> {
        let fields: Vec<&str> = expression.split_whitespace().collect();
        if fields.len() != 5 {
            return Err(SpacebotError::Scheduler(format!(
                "Invalid cron expression '{expression}' (need 5 fields: MIN HOUR DOM MON DOW)"
            )));
        }

        let minutes = expand_field(fields[0], 0, 59).ok_or_else(|| {
            SpacebotError::Scheduler(format!("Bad minute field in '{expression}'"))
        })?;
        let hours = expand_field(fields[1], 0, 23).ok_or_else(|| {
            SpacebotError::Scheduler(format!("Bad hour field in '{expression}'"))
        })?;
        // fields[2..5] (DOM MON DOW): accepted, only * honored

        Ok(Self { minutes, hours })
    }
}

impl CronSchedule {
    /// Next fire time strictly after `after`, scanning at most
    /// `lookahead_hours` ahead.
    pub fn next_after(&self, after: DateTime<Utc>, lookahead_hours: u32) -> Option<DateTime<Utc>> {
        let mut candidate = (after + Duration::minutes(1))
            .with_second(0)
            .and_then(|t| t.with_nanosecond(0))
            .unwrap_or(after);

        for _ in 0..(lookahead_hours as i64 * 60) {
            if self.minutes.contains(&candidate.minute()) && self.hours.contains(&candidate.hour())
            {
                return Some(candidate);
            }
            candidate += Duration::minutes(1);
        }
        None
    }
}

/// Expand one cron field into its matching values.
fn expand_field(field: &str, min: u32, max: u32) -> Option<Vec<u32>> {
    if field == "*" {
        return Some((min..=max).collect());
    }

    if let Some(step) = field.strip_prefix("*/") {
        let n: u32 = step.parse().ok()?;
        if n == 0 {
            return None;
        }
        return Some((min..=max).step_by(n as usize).collect());
    }

    if field.contains(',') {
        let mut values = Vec::new();
        for part in field.split(',') {
            values.extend(expand_field(part.trim(), min, max)?);
        }
        values.sort_unstable();
        values.dedup();
        return Some(values);
    }

    if let Some((lo, hi)) = field.split_once('-') {
        let lo: u32 = lo.parse().ok()?;
        let hi: u32 = hi.parse().ok()?;
        if lo > hi || lo < min || hi > max {
            return None;
        }
        return Some((lo..=hi).collect());
    }

    let n: u32 = field.parse().ok()?;
    (n >= min && n <= max).then(|| vec![n])
}
