//! Medicine models.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::expiry::{classify, days_until, today, ExpiryStatus};

/// A medicine tracked for expiry.
///
/// The expiry status is never stored: it depends on the current date and is
/// derived on every query.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Medicine {
    /// Unique ID (UUID v4)
    pub id: String,
    /// Display name (e.g., "Aspirin 81mg")
    pub name: String,
    /// Expiry date, no time component
    pub expiry_date: NaiveDate,
}

impl Medicine {
    /// Create a new medicine with a fresh ID.
    pub fn new(name: String, expiry_date: NaiveDate) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            name,
            expiry_date,
        }
    }

    /// Expiry status relative to the given date.
    pub fn status_on(&self, today: NaiveDate) -> ExpiryStatus {
        classify(self.expiry_date, today)
    }

    /// Expiry status relative to the local calendar date.
    pub fn status(&self) -> ExpiryStatus {
        self.status_on(today())
    }

    /// Whole days from `today` until expiry (negative once expired).
    pub fn days_until_expiry(&self, today: NaiveDate) -> i64 {
        days_until(self.expiry_date, today)
    }

    /// Long-form expiry date, e.g. "October 18, 2026".
    pub fn display_expiry(&self) -> String {
        self.expiry_date.format("%B %-d, %Y").to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_new_medicine() {
        let med = Medicine::new("Aspirin 81mg".into(), date(2026, 12, 1));
        assert_eq!(med.name, "Aspirin 81mg");
        assert_eq!(med.id.len(), 36); // UUID format
    }

    #[test]
    fn test_ids_are_unique() {
        let a = Medicine::new("A".into(), date(2026, 1, 1));
        let b = Medicine::new("A".into(), date(2026, 1, 1));
        assert_ne!(a.id, b.id);
    }

    #[test]
    fn test_status_on() {
        let med = Medicine::new("Ibuprofen".into(), date(2026, 10, 8));
        assert_eq!(med.status_on(date(2026, 10, 18)), ExpiryStatus::Expired);
        assert_eq!(med.days_until_expiry(date(2026, 10, 18)), -10);
    }

    #[test]
    fn test_display_expiry() {
        let med = Medicine::new("Paracetamol".into(), date(2026, 10, 8));
        assert_eq!(med.display_expiry(), "October 8, 2026");
    }
}
