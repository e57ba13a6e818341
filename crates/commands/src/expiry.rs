//! Expiry classification for roster entries
//!
//! Expiry timestamps are naive local times in `YYYY-MM-DD HH:MM` form. An
//! empty or malformed timestamp is a valid state and classifies as
//! [`ExpiryStatus::Unknown`].

use std::fmt;

use chrono::NaiveDateTime;

/// Format of the `expireTime` field
pub const EXPIRY_FORMAT: &str = "%Y-%m-%d %H:%M";

/// Lifetime classification of a credential
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExpiryStatus {
    /// No parsable expiry
    Unknown,
    /// Expiry is now or in the past
    Expired,
    /// Less than a full day remains
    Expiring,
    /// At least one full day remains
    Normal,
}

impl ExpiryStatus {
    /// Whether a smart refresh should pick this credential up
    pub const fn needs_refresh(self) -> bool {
        matches!(self, Self::Expired | Self::Expiring)
    }
}

impl fmt::Display for ExpiryStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Unknown => "unknown",
            Self::Expired => "expired",
            Self::Expiring => "expiring",
            Self::Normal => "normal",
        };
        f.write_str(label)
    }
}

/// Status plus a human readable remaining duration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Remaining {
    /// Classification
    pub status: ExpiryStatus,
    /// `"3d 4h"`, `"5h"`, `"<1h"`, `"expired"` or `"unknown"`
    pub description: String,
}

/// Parse an expiry timestamp, `None` when empty or malformed
pub fn parse_expiry(expires_at: &str) -> Option<NaiveDateTime> {
    NaiveDateTime::parse_from_str(expires_at.trim(), EXPIRY_FORMAT).ok()
}

/// Classify the remaining lifetime of `expires_at` relative to `now`
pub fn evaluate(expires_at: &str, now: NaiveDateTime) -> Remaining {
    let Some(expiry) = parse_expiry(expires_at) else {
        return Remaining {
            status: ExpiryStatus::Unknown,
            description: ExpiryStatus::Unknown.to_string(),
        };
    };

    let left = expiry - now;
    if left.num_seconds() <= 0 {
        return Remaining {
            status: ExpiryStatus::Expired,
            description: ExpiryStatus::Expired.to_string(),
        };
    }

    let days = left.num_days();
    let hours = left.num_hours() % 24;

    if days > 0 {
        Remaining {
            status: ExpiryStatus::Normal,
            description: format!("{days}d {hours}h"),
        }
    } else if hours > 0 {
        Remaining {
            status: ExpiryStatus::Expiring,
            description: format!("{hours}h"),
        }
    } else {
        Remaining {
            status: ExpiryStatus::Expiring,
            description: "<1h".to_string(),
        }
    }
}
