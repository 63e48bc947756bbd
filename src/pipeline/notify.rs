//! Operator feedback sink.
//!
//! Purely a side-effect target: the pipeline pushes every outcome through it
//! but never consults it for control flow.

use log::{error, info, warn};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum NoticeKind {
    Success,
    Rejected,
    Failed,
}

pub trait NotificationSink: Send + Sync {
    fn notify(&self, kind: NoticeKind, message: &str);
}

/// Default sink: writes notices through the log facade.
pub struct LogNotifier;

impl NotificationSink for LogNotifier {
    fn notify(&self, kind: NoticeKind, message: &str) {
        match kind {
            NoticeKind::Success => info!("{message}"),
            NoticeKind::Rejected => warn!("{message}"),
            NoticeKind::Failed => error!("{message}"),
        }
    }
}
