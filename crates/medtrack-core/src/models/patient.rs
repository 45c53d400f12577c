//! Patient models.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::record::MedicalRecord;

/// A patient and the documents uploaded for them.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Patient {
    /// Unique ID (UUID v4)
    pub id: String,
    /// Patient name, compared case-insensitively when merging uploads
    pub name: String,
    /// Records in upload order
    pub records: Vec<MedicalRecord>,
    /// Creation timestamp
    pub created_at: DateTime<Utc>,
}

impl Patient {
    /// Create a patient holding its first record.
    pub fn new(name: String, first_record: MedicalRecord) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            name,
            records: vec![first_record],
            created_at: Utc::now(),
        }
    }

    /// Case-insensitive name comparison used to merge uploads.
    pub fn matches_name(&self, name: &str) -> bool {
        canonical_name(&self.name) == canonical_name(name)
    }

    /// Get a record by ID.
    pub fn record(&self, record_id: &str) -> Option<&MedicalRecord> {
        self.records.iter().find(|r| r.id == record_id)
    }

    pub fn record_count(&self) -> usize {
        self.records.len()
    }
}

/// Lowercased, trimmed form of a patient name.
pub fn canonical_name(name: &str) -> String {
    name.trim().to_lowercase()
}
