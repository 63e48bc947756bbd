use anyhow::{anyhow, Context, Result};
use chrono::{DateTime, Utc};

use crate::db::models::AttendanceStatus;

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

pub fn parse_status(value: &str) -> Result<AttendanceStatus> {
    match value {
        "Logged In" => Ok(AttendanceStatus::LoggedIn),
        "Logged Out" => Ok(AttendanceStatus::LoggedOut),
        other => Err(anyhow!("unknown attendance status {other}")),
    }
}
