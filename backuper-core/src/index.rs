//! Backup index resolution: calendar date → identifier and class.
//!
//! The rotation policy is entirely contained in [`classify`]: day 1 of every
//! month is the monthly baseline, every other day is a daily increment.
//! All functions here are pure apart from [`current_identifier`], which reads
//! the local clock and delegates to [`identifier_on`].

use chrono::{Datelike, Local, NaiveDate};

use crate::error::ConfigError;
use crate::types::{BackupClass, BackupIdentifier, ProjectTitle};

/// Class implied by the day of month when none is given explicitly.
pub fn classify(day: u32) -> BackupClass {
    if day == 1 {
        BackupClass::Monthly
    } else {
        BackupClass::Daily
    }
}

/// Build the identifier for `(project, day, month, year)`.
///
/// `year` defaults to the current calendar year. An explicit `class` wins over
/// [`classify`].
pub fn resolve_identifier(
    project: &str,
    day: u32,
    month: u32,
    year: Option<i32>,
    class: Option<BackupClass>,
) -> Result<BackupIdentifier, ConfigError> {
    let project = ProjectTitle::new(project)?;
    if !(1..=31).contains(&day) {
        return Err(ConfigError::DayOutOfRange(day));
    }
    if !(1..=12).contains(&month) {
        return Err(ConfigError::MonthOutOfRange(month));
    }
    let year = year.unwrap_or_else(|| Local::now().year());
    if !(1..=9999).contains(&year) {
        return Err(ConfigError::YearOutOfRange(year));
    }
    let class = class.unwrap_or_else(|| classify(day));
    Ok(BackupIdentifier::new(project, class, day, month, year))
}

/// Identifier of a run started on `date`.
///
/// A monthly run always names itself after day 1, so each project has exactly
/// one monthly identifier per month.
pub fn identifier_on(
    project: &str,
    date: NaiveDate,
    class: Option<BackupClass>,
) -> Result<BackupIdentifier, ConfigError> {
    let class = class.unwrap_or_else(|| classify(date.day()));
    let day = match class {
        BackupClass::Monthly => 1,
        BackupClass::Daily => date.day(),
    };
    resolve_identifier(project, day, date.month(), Some(date.year()), Some(class))
}

/// Identifier of a run started now (local time).
pub fn current_identifier(
    project: &str,
    class: Option<BackupClass>,
) -> Result<BackupIdentifier, ConfigError> {
    identifier_on(project, Local::now().date_naive(), class)
}

/// The monthly identifier whose manifest is the baseline for `(month, year)`.
pub fn baseline_identifier(
    project: &str,
    month: u32,
    year: i32,
) -> Result<BackupIdentifier, ConfigError> {
    resolve_identifier(project, 1, month, Some(year), Some(BackupClass::Monthly))
}
