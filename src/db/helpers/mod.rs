use std::convert::TryFrom;

use anyhow::{anyhow, Context, Result};
use chrono::{DateTime, Local, NaiveDate, SecondsFormat, SubsecRound, TimeZone, Utc};

use crate::db::models::{Category, Priority, SessionKind};

pub fn to_u32(value: i64, field: &str) -> Result<u32> {
    u32::try_from(value).map_err(|_| anyhow!("{field} contains out-of-range value {value}"))
}

/// Fixed-width UTC timestamps so that text comparison in SQL orders correctly.
pub fn format_timestamp(value: &DateTime<Utc>) -> String {
    value.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Current time at the precision `format_timestamp` stores, so a value handed
/// back from an insert equals the one read back later.
pub fn stored_now() -> DateTime<Utc> {
    Utc::now().trunc_subsecs(3)
}

pub fn parse_datetime(value: &str, field: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .with_context(|| format!("failed to parse {field}"))
}

pub fn parse_optional_datetime(
    value: Option<String>,
    field: &str,
) -> Result<Option<DateTime<Utc>>> {
    match value {
        Some(raw) => parse_datetime(&raw, field).map(Some),
        None => Ok(None),
    }
}

pub fn format_date(value: &NaiveDate) -> String {
    value.format("%Y-%m-%d").to_string()
}

pub fn parse_date(value: &str, field: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(value, "%Y-%m-%d").with_context(|| format!("failed to parse {field}"))
}

/// UTC bounds `[start, end)` of a calendar day in the local timezone.
pub fn local_day_bounds(date: NaiveDate) -> Result<(DateTime<Utc>, DateTime<Utc>)> {
    let next = date
        .succ_opt()
        .ok_or_else(|| anyhow!("date {date} has no successor"))?;
    Ok((local_midnight(date)?, local_midnight(next)?))
}

fn local_midnight(date: NaiveDate) -> Result<DateTime<Utc>> {
    let naive = date
        .and_hms_opt(0, 0, 0)
        .ok_or_else(|| anyhow!("invalid midnight for {date}"))?;
    Local
        .from_local_datetime(&naive)
        .earliest()
        .map(|dt| dt.with_timezone(&Utc))
        .ok_or_else(|| anyhow!("local midnight of {date} does not exist"))
}

pub fn parse_category(value: &str) -> Result<Category> {
    value.parse().map_err(|err: String| anyhow!(err))
}

pub fn parse_priority(value: &str) -> Result<Priority> {
    value.parse().map_err(|err: String| anyhow!(err))
}

pub fn parse_session_kind(value: &str) -> Result<SessionKind> {
    match value {
        "work" => Ok(SessionKind::Work),
        "short_break" => Ok(SessionKind::ShortBreak),
        "long_break" => Ok(SessionKind::LongBreak),
        other => Err(anyhow!("unknown session type {other}")),
    }
}
