pub mod context;
pub mod notify;
pub mod outcome;
pub mod processor;
pub mod stores;

pub use context::ScanContext;
pub use notify::{LogNotifier, NoticeKind, NotificationSink};
pub use outcome::{ScanFailure, ScanOutcome, ScanRejection};
pub use processor::{ScanProcessor, DEFAULT_COOLDOWN};
pub use stores::{AttendanceStore, IdentityStore};
