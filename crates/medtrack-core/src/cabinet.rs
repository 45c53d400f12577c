//! Medicine list management and the categorized expiry view.

use chrono::{Days, NaiveDate};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use thiserror::Error;

use crate::expiry::ExpiryStatus;
use crate::models::Medicine;

/// Medicine validation errors.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MedicineError {
    #[error("Medicine name is required")]
    MissingName,

    #[error("Expiry date is required")]
    MissingExpiryDate,

    #[error("Invalid expiry date '{0}': expected YYYY-MM-DD")]
    InvalidDate(String),
}

pub type MedicineResult<T> = Result<T, MedicineError>;

/// Parse a `YYYY-MM-DD` expiry date as entered by the user.
pub fn parse_expiry_date(input: &str) -> MedicineResult<NaiveDate> {
    let input = input.trim();
    if input.is_empty() {
        return Err(MedicineError::MissingExpiryDate);
    }
    NaiveDate::parse_from_str(input, "%Y-%m-%d")
        .map_err(|_| MedicineError::InvalidDate(input.to_string()))
}

/// Medicines grouped by expiry status.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct CategorizedMedicines {
    pub expired: Vec<Medicine>,
    pub about_to_expire: Vec<Medicine>,
    pub safe: Vec<Medicine>,
}

impl CategorizedMedicines {
    pub fn bucket(&self, status: ExpiryStatus) -> &[Medicine] {
        match status {
            ExpiryStatus::Expired => &self.expired,
            ExpiryStatus::AboutToExpire => &self.about_to_expire,
            ExpiryStatus::Safe => &self.safe,
        }
    }

    pub fn total(&self) -> usize {
        self.expired.len() + self.about_to_expire.len() + self.safe.len()
    }
}

/// One non-empty section of the rendered medicine list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CategorySection {
    pub status: ExpiryStatus,
    pub collapsed: bool,
    pub medicines: Vec<Medicine>,
}

impl CategorySection {
    /// Header text, e.g. "Expired (2)".
    pub fn title(&self) -> String {
        format!("{} ({})", self.status.label(), self.medicines.len())
    }
}

/// The medicine collection, kept sorted by expiry date.
#[derive(Debug, Clone, Default)]
pub struct MedicineCabinet {
    medicines: Vec<Medicine>,
    collapsed: HashSet<ExpiryStatus>,
}

impl MedicineCabinet {
    pub fn new() -> Self {
        Self::default()
    }

    /// A cabinet seeded with one medicine in each category.
    pub fn with_samples(today: NaiveDate) -> Self {
        let mut cabinet = Self::new();
        let samples = [
            ("Paracetamol 500mg", today.checked_add_days(Days::new(90))),
            ("Amoxicillin 250mg", today.checked_add_days(Days::new(20))),
            ("Ibuprofen 200mg", today.checked_sub_days(Days::new(10))),
        ];
        for (name, expiry) in samples {
            if let Some(expiry) = expiry {
                cabinet.insert(Medicine::new(name.to_string(), expiry));
            }
        }
        cabinet
    }

    /// Add a medicine from user input.
    ///
    /// Both fields are required; the date must be `YYYY-MM-DD`.
    pub fn add(&mut self, name: &str, expiry_date: &str) -> MedicineResult<&Medicine> {
        let name = validate_name(name)?;
        let expiry_date = parse_expiry_date(expiry_date)?;
        Ok(self.insert(Medicine::new(name, expiry_date)))
    }

    /// Add a medicine with an already-parsed expiry date.
    pub fn add_dated(&mut self, name: &str, expiry_date: NaiveDate) -> MedicineResult<&Medicine> {
        let name = validate_name(name)?;
        Ok(self.insert(Medicine::new(name, expiry_date)))
    }

    fn insert(&mut self, medicine: Medicine) -> &Medicine {
        let id = medicine.id.clone();
        self.medicines.push(medicine);
        // Stable: equal dates keep insertion order
        self.medicines.sort_by_key(|m| m.expiry_date);
        tracing::debug!(medicine_id = %id, count = self.medicines.len(), "medicine added");

        let idx = self
            .medicines
            .iter()
            .position(|m| m.id == id)
            .unwrap_or(self.medicines.len() - 1);
        &self.medicines[idx]
    }

    /// Delete a medicine. Returns false if the ID was not present.
    pub fn delete(&mut self, id: &str) -> bool {
        let before = self.medicines.len();
        self.medicines.retain(|m| m.id != id);
        let removed = self.medicines.len() != before;
        if removed {
            tracing::debug!(medicine_id = %id, "medicine deleted");
        }
        removed
    }

    pub fn get(&self, id: &str) -> Option<&Medicine> {
        self.medicines.iter().find(|m| m.id == id)
    }

    /// All medicines, ascending by expiry date.
    pub fn medicines(&self) -> &[Medicine] {
        &self.medicines
    }

    pub fn len(&self) -> usize {
        self.medicines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.medicines.is_empty()
    }

    /// Group the collection by expiry status relative to `today`.
    ///
    /// Recomputed from scratch on every call.
    pub fn categorize(&self, today: NaiveDate) -> CategorizedMedicines {
        let mut categorized = CategorizedMedicines::default();
        for medicine in &self.medicines {
            let bucket = match medicine.status_on(today) {
                ExpiryStatus::Expired => &mut categorized.expired,
                ExpiryStatus::AboutToExpire => &mut categorized.about_to_expire,
                ExpiryStatus::Safe => &mut categorized.safe,
            };
            bucket.push(medicine.clone());
        }
        categorized
    }

    /// Non-empty sections in display order, with their collapsed state.
    pub fn sections(&self, today: NaiveDate) -> Vec<CategorySection> {
        let categorized = self.categorize(today);
        ExpiryStatus::ALL
            .iter()
            .filter(|status| !categorized.bucket(**status).is_empty())
            .map(|&status| CategorySection {
                status,
                collapsed: self.is_collapsed(status),
                medicines: categorized.bucket(status).to_vec(),
            })
            .collect()
    }

    /// Flip a section's collapsed flag. Returns the new state.
    pub fn toggle_collapsed(&mut self, status: ExpiryStatus) -> bool {
        if self.collapsed.remove(&status) {
            false
        } else {
            self.collapsed.insert(status);
            true
        }
    }

    pub fn is_collapsed(&self, status: ExpiryStatus) -> bool {
        self.collapsed.contains(&status)
    }
}

fn validate_name(name: &str) -> MedicineResult<String> {
    let name = name.trim();
    if name.is_empty() {
        return Err(MedicineError::MissingName);
    }
    Ok(name.to_string())
}
