//! Scan decision pipeline.
//!
//! Turns a decoded payload plus operator context into a committed attendance
//! record or a typed rejection. At most one decision is in flight at a time:
//! payloads arriving while the busy flag is held are dropped, not queued, and
//! the flag clears only after the configured cooldown so a code held steady
//! in front of the camera cannot produce multiple records.

use std::{
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
    time::Duration,
};

use chrono::{DateTime, Local, TimeZone, Utc};
use uuid::Uuid;

use crate::db::models::{AttendanceRecord, AttendanceStatus};

use super::{
    context::ScanContext,
    notify::NotificationSink,
    outcome::{ScanFailure, ScanOutcome, ScanRejection},
    stores::{AttendanceStore, IdentityStore},
};

/// Matches the cooldown the product has always shipped with.
pub const DEFAULT_COOLDOWN: Duration = Duration::from_millis(1000);

pub struct ScanProcessor<Tz = Local>
where
    Tz: TimeZone,
{
    identity: Arc<dyn IdentityStore>,
    attendance: Arc<dyn AttendanceStore>,
    notifier: Arc<dyn NotificationSink>,
    busy: Arc<AtomicBool>,
    cooldown: Duration,
    zone: Tz,
}

impl ScanProcessor {
    pub fn new(
        identity: Arc<dyn IdentityStore>,
        attendance: Arc<dyn AttendanceStore>,
        notifier: Arc<dyn NotificationSink>,
        cooldown: Duration,
    ) -> Self {
        ScanProcessor::with_zone(identity, attendance, notifier, cooldown, Local)
    }
}

impl<Tz> ScanProcessor<Tz>
where
    Tz: TimeZone + Send + Sync + 'static,
{
    /// The zone decides which calendar day the duplicate guard compares in.
    /// Production uses the device-local zone; tests pin a fixed offset.
    pub fn with_zone(
        identity: Arc<dyn IdentityStore>,
        attendance: Arc<dyn AttendanceStore>,
        notifier: Arc<dyn NotificationSink>,
        cooldown: Duration,
        zone: Tz,
    ) -> Self {
        Self {
            identity,
            attendance,
            notifier,
            busy: Arc::new(AtomicBool::new(false)),
            cooldown,
            zone,
        }
    }

    /// Process one decoded payload. Returns `None` when the payload was
    /// dropped because a prior decision is still in flight (or cooling down);
    /// otherwise the fully determined outcome. Persistence is awaited before
    /// success is reported.
    pub async fn process_scan(&self, payload: &str, context: &ScanContext) -> Option<ScanOutcome> {
        if self
            .busy
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            log::debug!("scan payload dropped, decision already in flight");
            return None;
        }

        let guard = BusyGuard {
            flag: Some(Arc::clone(&self.busy)),
        };

        let outcome = self.decide(payload, context).await;
        self.notifier
            .notify(outcome.notice_kind(), &outcome.operator_message());

        guard.release_after(self.cooldown);
        Some(outcome)
    }

    async fn decide(&self, payload: &str, context: &ScanContext) -> ScanOutcome {
        let subject = context.subject.trim();
        if subject.is_empty() {
            return ScanOutcome::Rejected(ScanRejection::MissingSubject);
        }

        // Unrecognized payloads pass through verbatim as the display name,
        // flagged invalid for later audit.
        let (student_name, is_valid) = match self.identity.find_by_payload(payload).await {
            Ok(Some(code)) => (code.name, true),
            Ok(None) => (payload.to_string(), false),
            Err(err) => {
                return ScanOutcome::Failed(ScanFailure::Persistence(format!(
                    "identity lookup failed: {err:#}"
                )))
            }
        };

        let now = Utc::now();

        if context.direction == AttendanceStatus::LoggedIn {
            let records = match self
                .attendance
                .find_status_records(&student_name, subject, AttendanceStatus::LoggedIn)
                .await
            {
                Ok(records) => records,
                Err(err) => {
                    return ScanOutcome::Failed(ScanFailure::Persistence(format!(
                        "duplicate check failed: {err:#}"
                    )))
                }
            };

            if let Some(existing) = records
                .into_iter()
                .find(|record| same_calendar_day(record.timestamp, now, &self.zone))
            {
                return ScanOutcome::Rejected(ScanRejection::DuplicateLogin {
                    student_name,
                    subject: subject.to_string(),
                    existing_timestamp: existing.timestamp,
                });
            }
        }

        let record = AttendanceRecord {
            id: Uuid::new_v4().to_string(),
            student_name,
            subject: subject.to_string(),
            status: context.direction,
            is_valid,
            timestamp: now,
        };

        match self.attendance.insert_record(&record).await {
            Ok(()) => ScanOutcome::Recorded(record),
            Err(err) => ScanOutcome::Failed(ScanFailure::Persistence(format!("{err:#}"))),
        }
    }
}

/// Calendar-day equality in the given zone, not a rolling 24-hour window.
fn same_calendar_day<Tz: TimeZone>(a: DateTime<Utc>, b: DateTime<Utc>, zone: &Tz) -> bool {
    a.with_timezone(zone).date_naive() == b.with_timezone(zone).date_naive()
}

/// Clears the busy flag on every exit path. `release_after` defers the clear
/// by the cooldown on a spawned timer so callers get the outcome immediately.
struct BusyGuard {
    flag: Option<Arc<AtomicBool>>,
}

impl BusyGuard {
    fn release_after(mut self, cooldown: Duration) {
        if let Some(flag) = self.flag.take() {
            if cooldown.is_zero() {
                flag.store(false, Ordering::SeqCst);
            } else {
                tokio::spawn(async move {
                    tokio::time::sleep(cooldown).await;
                    flag.store(false, Ordering::SeqCst);
                });
            }
        }
    }
}

impl Drop for BusyGuard {
    fn drop(&mut self) {
        if let Some(flag) = self.flag.take() {
            flag.store(false, Ordering::SeqCst);
        }
    }
}
