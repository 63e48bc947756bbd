//! Attendance record data model.
//!
//! One row per scan event. Records are created exactly once by the scan
//! decision pipeline and never mutated afterwards; history management may
//! delete them.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Direction of a scan and, once committed, the status of the record.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum AttendanceStatus {
    #[serde(rename = "Logged In")]
    LoggedIn,
    #[serde(rename = "Logged Out")]
    LoggedOut,
}

impl AttendanceStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            AttendanceStatus::LoggedIn => "Logged In",
            AttendanceStatus::LoggedOut => "Logged Out",
        }
    }

    /// Lowercase verb form for operator-facing messages.
    pub fn verb(&self) -> &'static str {
        match self {
            AttendanceStatus::LoggedIn => "logged in",
            AttendanceStatus::LoggedOut => "logged out",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AttendanceRecord {
    pub id: String,
    pub student_name: String,
    pub subject: String,
    pub status: AttendanceStatus,
    /// Whether the scanned payload matched a registered code. Unrecognized
    /// third-party codes still produce a record, flagged invalid for audit.
    pub is_valid: bool,
    pub timestamp: DateTime<Utc>,
}
