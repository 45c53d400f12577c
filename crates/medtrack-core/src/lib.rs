//! MedTrack Core Library
//!
//! Client-side medicine expiry tracking and patient-tagged medical documents.
//!
//! # Architecture
//!
//! ```text
//!  Medicines                              Medical records
//!  ─────────                              ───────────────
//!  add(name, expiry)                      file selected
//!        │                                      │
//!  MedicineCabinet (sorted by expiry)     targeted? ──yes──► append to patient
//!        │                                      │ no
//!  classify(expiry, today)                begin_upload (one at a time)
//!        │                                      │
//!  Expired / About to Expire / Safe       extraction call (medtrack-llm)
//!                                               │
//!                                 Found ──► match-or-create patient by name
//!                          NotFound/Failed ──► ask user for a name
//!                                               │
//!                                         download: PDF as-is, image → PDF
//! ```
//!
//! Everything lives in memory for the lifetime of the process.
//!
//! # Modules
//!
//! - [`models`]: Domain types (Medicine, Patient, MedicalRecord, UploadedFile)
//! - [`expiry`]: Expiry status classifier
//! - [`cabinet`]: Medicine list and categorized view
//! - [`records`]: Patient/record association and the upload guard
//! - [`export`]: Record download and image-to-PDF conversion
//! - [`config`]: Configuration file and environment handling

pub mod cabinet;
pub mod config;
pub mod expiry;
pub mod export;
pub mod models;
pub mod records;

// Re-export commonly used types
pub use cabinet::{CategorizedMedicines, CategorySection, MedicineCabinet, MedicineError};
pub use config::MedTrackConfig;
pub use expiry::{classify, ExpiryStatus};
pub use export::{prepare_download, Download, ExportError};
pub use models::{MedicalRecord, Medicine, Patient, UploadedFile};
pub use records::{
    Attachment, NameExtractor, NamePrompt, RecordBook, RecordError, RecordRemoval, UploadOutcome,
};

pub use medtrack_llm::{GeminiClient, NameExtraction};

// UniFFI setup - using proc macros
uniffi::setup_scaffolding!();

use std::path::Path;
use std::sync::{Arc, Mutex};

// =========================================================================
// FFI Error Type
// =========================================================================

#[derive(Debug, thiserror::Error, uniffi::Error)]
pub enum MedTrackError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Busy: {0}")]
    Busy(String),

    #[error("{0}")]
    Unsupported(String),

    #[error("{0}")]
    Conversion(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Runtime error: {0}")]
    Runtime(String),
}

impl From<MedicineError> for MedTrackError {
    fn from(e: MedicineError) -> Self {
        MedTrackError::InvalidInput(e.to_string())
    }
}

impl From<RecordError> for MedTrackError {
    fn from(e: RecordError) -> Self {
        match e {
            RecordError::PatientNotFound(_) => MedTrackError::NotFound(e.to_string()),
            RecordError::UploadInProgress => MedTrackError::Busy(e.to_string()),
            RecordError::UnsupportedFileType(_) => MedTrackError::Unsupported(e.to_string()),
            RecordError::NoPendingUpload
            | RecordError::MissingPatientName
            | RecordError::StaleTicket(_) => MedTrackError::InvalidInput(e.to_string()),
        }
    }
}

impl From<ExportError> for MedTrackError {
    fn from(e: ExportError) -> Self {
        match e {
            ExportError::Unsupported(_) => MedTrackError::Unsupported(e.to_string()),
            ExportError::ImageDecode(_) | ExportError::Render(_) => {
                MedTrackError::Conversion(e.to_string())
            }
        }
    }
}

impl From<config::ConfigError> for MedTrackError {
    fn from(e: config::ConfigError) -> Self {
        MedTrackError::Config(e.to_string())
    }
}

impl<T> From<std::sync::PoisonError<T>> for MedTrackError {
    fn from(e: std::sync::PoisonError<T>) -> Self {
        MedTrackError::Runtime(format!("Lock poisoned: {}", e))
    }
}

// =========================================================================
// Factory Functions (exported to FFI)
// =========================================================================

/// Create a core using the configuration file at `config_path`, or the
/// default location when `None`.
#[uniffi::export]
pub fn open_medtrack(
    config_path: Option<String>,
    with_samples: bool,
) -> Result<Arc<MedTrackCore>, MedTrackError> {
    let config = match config_path {
        Some(path) => MedTrackConfig::load_from(Path::new(&path))?,
        None => MedTrackConfig::load()?,
    };
    MedTrackCore::from_config(&config, with_samples).map(Arc::new)
}

// =========================================================================
// Main API Object
// =========================================================================

/// Thread-safe application state for FFI.
#[derive(uniffi::Object)]
pub struct MedTrackCore {
    cabinet: Mutex<MedicineCabinet>,
    records: Mutex<RecordBook>,
    extractor: GeminiClient,
    runtime: tokio::runtime::Runtime,
}

impl MedTrackCore {
    /// Build a core from loaded configuration.
    pub fn from_config(config: &MedTrackConfig, with_samples: bool) -> Result<Self, MedTrackError> {
        Self::with_extractor(GeminiClient::new(config.client_config()), with_samples)
    }

    /// Build a core around an already configured extraction client.
    pub fn with_extractor(extractor: GeminiClient, with_samples: bool) -> Result<Self, MedTrackError> {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(|e| MedTrackError::Runtime(e.to_string()))?;

        let cabinet = if with_samples {
            MedicineCabinet::with_samples(expiry::today())
        } else {
            MedicineCabinet::new()
        };

        if !extractor.has_credentials() {
            tracing::warn!("no API key configured; every upload will ask for a patient name");
        }

        Ok(Self {
            cabinet: Mutex::new(cabinet),
            records: Mutex::new(RecordBook::new()),
            extractor,
            runtime,
        })
    }
}

#[uniffi::export]
impl MedTrackCore {
    // =========================================================================
    // Medicine Operations
    // =========================================================================

    /// Add a medicine. `expiry_date` is `YYYY-MM-DD`.
    pub fn add_medicine(
        &self,
        name: String,
        expiry_date: String,
    ) -> Result<FfiMedicine, MedTrackError> {
        let mut cabinet = self.cabinet.lock()?;
        let medicine = cabinet.add(&name, &expiry_date)?;
        Ok(FfiMedicine::new(medicine, expiry::today()))
    }

    /// Delete a medicine. Returns false if it did not exist.
    pub fn delete_medicine(&self, id: String) -> Result<bool, MedTrackError> {
        Ok(self.cabinet.lock()?.delete(&id))
    }

    /// All medicines, ascending by expiry date.
    pub fn list_medicines(&self) -> Result<Vec<FfiMedicine>, MedTrackError> {
        let cabinet = self.cabinet.lock()?;
        let today = expiry::today();
        Ok(cabinet
            .medicines()
            .iter()
            .map(|m| FfiMedicine::new(m, today))
            .collect())
    }

    /// Non-empty categories in display order, computed for today.
    pub fn medicine_sections(&self) -> Result<Vec<FfiCategory>, MedTrackError> {
        let cabinet = self.cabinet.lock()?;
        let today = expiry::today();
        Ok(cabinet
            .sections(today)
            .into_iter()
            .map(|s| FfiCategory::new(s, today))
            .collect())
    }

    /// Collapse or expand a category. Returns the new collapsed state.
    pub fn toggle_category(&self, status: ExpiryStatus) -> Result<bool, MedTrackError> {
        Ok(self.cabinet.lock()?.toggle_collapsed(status))
    }

    // =========================================================================
    // Record Operations
    // =========================================================================

    /// All patients with their records.
    pub fn list_patients(&self) -> Result<Vec<FfiPatient>, MedTrackError> {
        let records = self.records.lock()?;
        Ok(records.patients().iter().map(FfiPatient::from).collect())
    }

    /// Whether an upload is extracting or waiting for a name.
    pub fn is_upload_in_progress(&self) -> Result<bool, MedTrackError> {
        Ok(self.records.lock()?.is_busy())
    }

    /// Upload a file and let the model pick the patient.
    ///
    /// Blocks for the duration of the extraction call. The record book is not
    /// locked meanwhile, so reads from other threads proceed.
    pub fn upload_record(
        &self,
        file_name: String,
        mime_type: String,
        bytes: Vec<u8>,
    ) -> Result<FfiUploadOutcome, MedTrackError> {
        let file = UploadedFile::new(file_name, mime_type, bytes);
        let ticket = self.records.lock()?.begin_upload(file)?;

        let extraction = self
            .runtime
            .block_on(self.extractor.extract_patient_name(ticket.file()));

        let outcome = self.records.lock()?.finish_upload(ticket, extraction)?;
        Ok(outcome.into())
    }

    /// Upload a file straight to a chosen patient.
    pub fn add_record_to_patient(
        &self,
        patient_id: String,
        file_name: String,
        mime_type: String,
        bytes: Vec<u8>,
    ) -> Result<FfiUploadOutcome, MedTrackError> {
        let file = UploadedFile::new(file_name, mime_type, bytes);
        let attachment = self.records.lock()?.attach_to_patient(&patient_id, file)?;
        Ok(UploadOutcome::Attached(attachment).into())
    }

    /// The upload waiting for a patient name, if any.
    pub fn pending_upload(&self) -> Result<Option<FfiUploadOutcome>, MedTrackError> {
        let records = self.records.lock()?;
        Ok(records
            .pending_prompt()
            .map(|p| UploadOutcome::NeedsPatientName(p).into()))
    }

    /// Assign the pending upload to a patient by name.
    pub fn submit_patient_name(&self, name: String) -> Result<FfiUploadOutcome, MedTrackError> {
        let attachment = self.records.lock()?.submit_patient_name(&name)?;
        Ok(UploadOutcome::Attached(attachment).into())
    }

    /// Discard the pending upload. Returns false if nothing was pending.
    pub fn cancel_pending_upload(&self) -> Result<bool, MedTrackError> {
        Ok(self.records.lock()?.cancel_pending().is_some())
    }

    /// Autocomplete for the patient-name prompt.
    pub fn patient_name_suggestions(&self, query: String) -> Result<Vec<String>, MedTrackError> {
        Ok(self.records.lock()?.patient_name_suggestions(&query))
    }

    /// Delete a patient and all its records.
    pub fn delete_patient(&self, patient_id: String) -> Result<bool, MedTrackError> {
        Ok(self.records.lock()?.delete_patient(&patient_id))
    }

    /// Delete one record; the patient goes too if it was the last one.
    pub fn delete_record(
        &self,
        patient_id: String,
        record_id: String,
    ) -> Result<RecordRemoval, MedTrackError> {
        Ok(self.records.lock()?.delete_record(&patient_id, &record_id))
    }

    /// Prepare a record for download (images are converted to PDF).
    pub fn download_record(
        &self,
        patient_id: String,
        record_id: String,
    ) -> Result<FfiDownload, MedTrackError> {
        // Clone the record so conversion runs without holding the lock
        let record = self
            .records
            .lock()?
            .record(&patient_id, &record_id)
            .cloned()
            .ok_or_else(|| MedTrackError::NotFound(format!("record {record_id}")))?;
        Ok(prepare_download(&record)?.into())
    }
}

// =========================================================================
// FFI Types
// =========================================================================

/// FFI-safe medicine with its status for today.
#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiMedicine {
    pub id: String,
    pub name: String,
    /// `YYYY-MM-DD`
    pub expiry_date: String,
    /// e.g. "October 18, 2026"
    pub display_expiry: String,
    pub status: ExpiryStatus,
    pub days_until_expiry: i64,
}

impl FfiMedicine {
    fn new(medicine: &Medicine, today: chrono::NaiveDate) -> Self {
        Self {
            id: medicine.id.clone(),
            name: medicine.name.clone(),
            expiry_date: medicine.expiry_date.format("%Y-%m-%d").to_string(),
            display_expiry: medicine.display_expiry(),
            status: medicine.status_on(today),
            days_until_expiry: medicine.days_until_expiry(today),
        }
    }
}

/// FFI-safe category section.
#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiCategory {
    pub status: ExpiryStatus,
    pub title: String,
    pub collapsed: bool,
    pub medicines: Vec<FfiMedicine>,
}

impl FfiCategory {
    fn new(section: CategorySection, today: chrono::NaiveDate) -> Self {
        Self {
            status: section.status,
            title: section.title(),
            collapsed: section.collapsed,
            medicines: section
                .medicines
                .iter()
                .map(|m| FfiMedicine::new(m, today))
                .collect(),
        }
    }
}

/// FFI-safe patient.
#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiPatient {
    pub id: String,
    pub name: String,
    pub records: Vec<FfiRecord>,
}

impl From<&Patient> for FfiPatient {
    fn from(patient: &Patient) -> Self {
        Self {
            id: patient.id.clone(),
            name: patient.name.clone(),
            records: patient.records.iter().map(FfiRecord::from).collect(),
        }
    }
}

/// FFI-safe record metadata (content is fetched via `download_record`).
#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiRecord {
    pub id: String,
    pub file_name: String,
    pub mime_type: String,
    pub uploaded_at: String,
}

impl From<&MedicalRecord> for FfiRecord {
    fn from(record: &MedicalRecord) -> Self {
        Self {
            id: record.id.clone(),
            file_name: record.file_name.clone(),
            mime_type: record.mime_type.clone(),
            uploaded_at: record.uploaded_at.to_rfc3339(),
        }
    }
}

/// FFI-safe upload outcome.
#[derive(Debug, Clone, uniffi::Enum)]
pub enum FfiUploadOutcome {
    Attached {
        patient_id: String,
        patient_name: String,
        record_id: String,
        created_patient: bool,
    },
    NeedsPatientName {
        file_name: String,
        advisory: Option<String>,
        suggestions: Vec<String>,
    },
}

impl From<UploadOutcome> for FfiUploadOutcome {
    fn from(outcome: UploadOutcome) -> Self {
        match outcome {
            UploadOutcome::Attached(a) => FfiUploadOutcome::Attached {
                patient_id: a.patient_id,
                patient_name: a.patient_name,
                record_id: a.record_id,
                created_patient: a.created_patient,
            },
            UploadOutcome::NeedsPatientName(p) => FfiUploadOutcome::NeedsPatientName {
                file_name: p.file_name,
                advisory: p.advisory,
                suggestions: p.suggestions,
            },
        }
    }
}

/// FFI-safe download.
#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiDownload {
    pub file_name: String,
    pub mime_type: String,
    pub bytes: Vec<u8>,
    pub converted: bool,
}

impl From<Download> for FfiDownload {
    fn from(download: Download) -> Self {
        Self {
            file_name: download.file_name,
            mime_type: download.mime_type,
            bytes: download.bytes,
            converted: download.converted,
        }
    }
}
