pub mod attendance_record;
pub mod registered_code;
pub mod subject;

pub use attendance_record::{AttendanceRecord, AttendanceStatus};
pub use registered_code::RegisteredCode;
pub use subject::Subject;
