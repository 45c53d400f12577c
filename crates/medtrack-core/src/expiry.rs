//! Expiry classification.
//!
//! A medicine's status depends only on the number of whole days between the
//! current calendar date and its expiry date:
//!
//! | days until expiry | status          |
//! |-------------------|-----------------|
//! | `< 0`             | Expired         |
//! | `0 ..= 30`        | About to Expire |
//! | `> 30`            | Safe            |

use chrono::{Local, NaiveDate};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Days before expiry at which a medicine counts as about to expire.
pub const EXPIRY_WARNING_DAYS: i64 = 30;

/// Derived expiry status of a medicine.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, uniffi::Enum)]
pub enum ExpiryStatus {
    Expired,
    AboutToExpire,
    Safe,
}

impl ExpiryStatus {
    /// Display order of the categorized view.
    pub const ALL: [ExpiryStatus; 3] = [
        ExpiryStatus::Expired,
        ExpiryStatus::AboutToExpire,
        ExpiryStatus::Safe,
    ];

    /// Human-facing label.
    pub fn label(self) -> &'static str {
        match self {
            ExpiryStatus::Expired => "Expired",
            ExpiryStatus::AboutToExpire => "About to Expire",
            ExpiryStatus::Safe => "Safe",
        }
    }
}

impl fmt::Display for ExpiryStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// The local calendar date.
pub fn today() -> NaiveDate {
    Local::now().date_naive()
}

/// Whole days from `today` until `expiry`.
pub fn days_until(expiry: NaiveDate, today: NaiveDate) -> i64 {
    (expiry - today).num_days()
}

/// Classify an expiry date against `today`.
pub fn classify(expiry: NaiveDate, today: NaiveDate) -> ExpiryStatus {
    let days = days_until(expiry, today);
    if days < 0 {
        ExpiryStatus::Expired
    } else if days <= EXPIRY_WARNING_DAYS {
        ExpiryStatus::AboutToExpire
    } else {
        ExpiryStatus::Safe
    }
}
