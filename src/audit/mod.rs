pub mod analytics;
pub mod diff;
pub mod events;
mod versions;

pub use analytics::{AnalyticsEntry, AnalyticsLog};
pub use diff::{diff_lines, diff_versions, DiffLine, DiffTag, VersionDiff};
pub use events::{AuditAction, AuditEvent, AuditLog};
pub use versions::{append_version, content_hash, verify_contiguous};
