//! Storage quota accounting and size formatting.

use serde::Serialize;

use crate::store::UsageTotals;

/// Default quota per account (100 GiB).
pub const DEFAULT_QUOTA_BYTES: u64 = 100 * 1024 * 1024 * 1024;

const SIZE_UNITS: [&str; 5] = ["B", "KB", "MB", "GB", "TB"];

/// How much of the quota an account uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct StorageUsage {
    pub used_bytes: u64,
    pub total_bytes: u64,
    pub file_count: u64,
}

impl StorageUsage {
    /// Empty usage against a quota.
    pub fn empty(total_bytes: u64) -> Self {
        Self {
            used_bytes: 0,
            total_bytes,
            file_count: 0,
        }
    }

    /// Usage built from store totals.
    pub fn from_totals(totals: UsageTotals, total_bytes: u64) -> Self {
        Self {
            used_bytes: totals.used_bytes,
            total_bytes,
            file_count: totals.file_count,
        }
    }

    /// Percentage of the quota in use, 0.0 for a zero quota.
    pub fn percent_used(&self) -> f64 {
        if self.total_bytes == 0 {
            return 0.0;
        }
        self.used_bytes as f64 / self.total_bytes as f64 * 100.0
    }

    /// Bytes left before the quota is reached.
    pub fn remaining_bytes(&self) -> u64 {
        self.total_bytes.saturating_sub(self.used_bytes)
    }
}

impl Default for StorageUsage {
    fn default() -> Self {
        Self::empty(DEFAULT_QUOTA_BYTES)
    }
}

/// Format a byte count with 1024-based units and up to two decimals.
///
/// Zero renders as "-", which is what folders show.
pub fn format_file_size(bytes: u64) -> String {
    if bytes == 0 {
        return "-".to_string();
    }

    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < SIZE_UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }

    let text = format!("{value:.2}");
    let text = text.trim_end_matches('0').trim_end_matches('.');
    format!("{text} {}", SIZE_UNITS[unit])
}
