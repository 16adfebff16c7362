//! `backuper <project> restore <date>`

use anyhow::{bail, Result};
use chrono::{Datelike, Local, NaiveDate};
use clap::Args;

/// Accepted on the command line; there is no restore procedure.
#[derive(Args, Debug)]
pub struct RestoreArgs {
    /// Day of the backup to restore: dd.mm, dd.mm.yy, dd-mm-yy or yyyy-mm-dd.
    #[arg(value_parser = parse_date)]
    pub date: NaiveDate,
}

impl RestoreArgs {
    pub fn run(self, project: &str) -> Result<()> {
        bail!(
            "restore is not implemented (requested '{project}' as of {})",
            self.date.format("%d-%m-%y")
        )
    }
}

const DATE_FORMATS: [&str; 3] = ["%d.%m.%y", "%d-%m-%y", "%Y-%m-%d"];

fn parse_date(s: &str) -> std::result::Result<NaiveDate, String> {
    parse_date_in(s, Local::now().year())
}

/// `dd.mm` without a year means `current_year`.
fn parse_date_in(s: &str, current_year: i32) -> std::result::Result<NaiveDate, String> {
    DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(s, fmt).ok())
        .or_else(|| {
            NaiveDate::parse_from_str(&format!("{s}.{current_year}"), "%d.%m.%Y").ok()
        })
        .ok_or_else(|| {
            format!("invalid date '{s}'; expected dd.mm, dd.mm.yy, dd-mm-yy or yyyy-mm-dd")
        })
}
