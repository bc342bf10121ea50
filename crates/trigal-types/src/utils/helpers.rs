//! Helper utilities for common operations.

use chrono::{DateTime, Utc};

/// Current wall-clock time in UTC, used for `createdAt`, `updatedAt` and history entries.
pub fn current_time() -> DateTime<Utc> {
	Utc::now()
}
