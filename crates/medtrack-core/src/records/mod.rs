//! Patient/record association.
//!
//! Flow for an untargeted upload:
//!
//! ```text
//! begin_upload ──► extraction call ──► finish_upload
//!                                         │
//!                     Found(name) ────────┼──► match-or-create patient
//!                                         │
//!                NotFound / Failed ───────┴──► NeedsPatientName
//!                                                   │
//!                          submit_patient_name ◄────┤
//!                               cancel_pending ◄────┘
//! ```
//!
//! Targeted uploads (`attach_to_patient`) skip extraction entirely.

mod extractor;
mod suggest;
mod upload;

pub use extractor::*;
pub use suggest::*;
pub use upload::*;

use medtrack_llm::NameExtraction;
use thiserror::Error;

use crate::models::{MedicalRecord, Patient, UploadedFile};

/// Record book errors.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RecordError {
    #[error("Unsupported file type '{0}': only PNG, JPEG and PDF files are accepted")]
    UnsupportedFileType(String),

    #[error("Patient not found: {0}")]
    PatientNotFound(String),

    #[error("Another upload is still in progress")]
    UploadInProgress,

    #[error("No upload is waiting for a patient name")]
    NoPendingUpload,

    #[error("Patient name is required")]
    MissingPatientName,

    #[error("Upload ticket {0} is not the upload in progress")]
    StaleTicket(String),
}

pub type RecordResult<T> = Result<T, RecordError>;

/// All patients and their records, plus the single upload slot.
#[derive(Debug, Default)]
pub struct RecordBook {
    patients: Vec<Patient>,
    upload: UploadState,
}

impl RecordBook {
    pub fn new() -> Self {
        Self::default()
    }

    /// Patients in creation order.
    pub fn patients(&self) -> &[Patient] {
        &self.patients
    }

    pub fn patient(&self, patient_id: &str) -> Option<&Patient> {
        self.patients.iter().find(|p| p.id == patient_id)
    }

    pub fn record(&self, patient_id: &str, record_id: &str) -> Option<&MedicalRecord> {
        self.patient(patient_id)?.record(record_id)
    }

    pub fn is_empty(&self) -> bool {
        self.patients.is_empty()
    }

    /// Whether an upload holds the slot (extracting or waiting for a name).
    pub fn is_busy(&self) -> bool {
        !matches!(self.upload, UploadState::Idle)
    }

    /// The file waiting for a patient name, if any.
    pub fn pending_upload(&self) -> Option<&UploadedFile> {
        match &self.upload {
            UploadState::AwaitingName { file, .. } => Some(file),
            _ => None,
        }
    }

    /// Append a file to a chosen patient, without name extraction.
    pub fn attach_to_patient(
        &mut self,
        patient_id: &str,
        file: UploadedFile,
    ) -> RecordResult<Attachment> {
        self.ensure_idle()?;
        ensure_accepted(&file)?;

        let patient = self
            .patients
            .iter_mut()
            .find(|p| p.id == patient_id)
            .ok_or_else(|| RecordError::PatientNotFound(patient_id.to_string()))?;

        let record = MedicalRecord::from_upload(&file);
        let attachment = Attachment {
            patient_id: patient.id.clone(),
            patient_name: patient.name.clone(),
            record_id: record.id.clone(),
            created_patient: false,
        };
        patient.records.push(record);

        tracing::debug!(
            patient_id = %attachment.patient_id,
            record_id = %attachment.record_id,
            "record attached to chosen patient"
        );
        Ok(attachment)
    }

    /// Claim the upload slot for a file that needs name extraction.
    pub fn begin_upload(&mut self, file: UploadedFile) -> RecordResult<UploadTicket> {
        self.ensure_idle()?;
        ensure_accepted(&file)?;

        let ticket = UploadTicket::new(file);
        self.upload = UploadState::Extracting {
            ticket_id: ticket.id.clone(),
        };
        tracing::debug!(ticket = %ticket.id, file = %ticket.file.file_name, "upload started");
        Ok(ticket)
    }

    /// Apply the extraction result for the upload in progress.
    pub fn finish_upload(
        &mut self,
        ticket: UploadTicket,
        extraction: NameExtraction,
    ) -> RecordResult<UploadOutcome> {
        match &self.upload {
            UploadState::Extracting { ticket_id } if *ticket_id == ticket.id => {}
            _ => return Err(RecordError::StaleTicket(ticket.id)),
        }

        // Found("Unknown") or a blank name from any extractor counts as no name
        let extraction = match extraction {
            NameExtraction::Found(name) => NameExtraction::from_name(&name),
            other => other,
        };

        let advisory = match extraction {
            NameExtraction::Found(name) => {
                self.upload = UploadState::Idle;
                return Ok(UploadOutcome::Attached(self.assign(&name, &ticket.file)));
            }
            NameExtraction::NotFound => None,
            NameExtraction::Failed(reason) => {
                tracing::warn!(file = %ticket.file.file_name, "name extraction failed: {reason}");
                Some(EXTRACTION_FAILED_ADVISORY.to_string())
            }
        };

        let prompt = NamePrompt {
            file_name: ticket.file.file_name.clone(),
            advisory: advisory.clone(),
            suggestions: self.patient_name_suggestions(""),
        };
        self.upload = UploadState::AwaitingName {
            file: ticket.file,
            advisory,
        };
        Ok(UploadOutcome::NeedsPatientName(prompt))
    }

    /// Run a complete untargeted upload through `extractor`.
    ///
    /// Dropping the future before extraction completes frees the upload slot.
    pub async fn upload<E: NameExtractor>(
        &mut self,
        file: UploadedFile,
        extractor: &E,
    ) -> RecordResult<UploadOutcome> {
        let ticket = self.begin_upload(file)?;
        let mut slot = ExtractingSlot { book: self };
        let extraction = extractor.extract_patient_name(ticket.file()).await;
        slot.book.finish_upload(ticket, extraction)
    }

    /// The prompt for the file waiting on a name, if any.
    pub fn pending_prompt(&self) -> Option<NamePrompt> {
        match &self.upload {
            UploadState::AwaitingName { file, advisory } => Some(NamePrompt {
                file_name: file.file_name.clone(),
                advisory: advisory.clone(),
                suggestions: self.patient_name_suggestions(""),
            }),
            _ => None,
        }
    }

    /// Resolve the pending file with a user-entered name.
    ///
    /// An empty name is rejected and the file stays pending.
    pub fn submit_patient_name(&mut self, name: &str) -> RecordResult<Attachment> {
        if !matches!(self.upload, UploadState::AwaitingName { .. }) {
            return Err(RecordError::NoPendingUpload);
        }
        let name = name.trim();
        if name.is_empty() {
            return Err(RecordError::MissingPatientName);
        }

        match std::mem::take(&mut self.upload) {
            UploadState::AwaitingName { file, .. } => Ok(self.assign(name, &file)),
            _ => Err(RecordError::NoPendingUpload),
        }
    }

    /// Discard the file waiting for a name. Returns it, if there was one.
    pub fn cancel_pending(&mut self) -> Option<UploadedFile> {
        match std::mem::take(&mut self.upload) {
            UploadState::AwaitingName { file, .. } => {
                tracing::debug!(file = %file.file_name, "pending upload discarded");
                Some(file)
            }
            other => {
                self.upload = other;
                None
            }
        }
    }

    /// Existing patient names ranked against a partially typed name.
    pub fn patient_name_suggestions(&self, query: &str) -> Vec<String> {
        rank_names(self.patients.iter().map(|p| p.name.as_str()), query)
    }

    /// Delete a patient with all records. Returns false if absent.
    pub fn delete_patient(&mut self, patient_id: &str) -> bool {
        let before = self.patients.len();
        self.patients.retain(|p| p.id != patient_id);
        let removed = self.patients.len() != before;
        if removed {
            tracing::info!(patient_id, "patient deleted");
        }
        removed
    }

    /// Delete one record.
    ///
    /// A patient left without records is removed as well; the result says
    /// which of the two happened.
    pub fn delete_record(&mut self, patient_id: &str, record_id: &str) -> RecordRemoval {
        let Some(idx) = self.patients.iter().position(|p| p.id == patient_id) else {
            return RecordRemoval::NotFound;
        };

        let patient = &mut self.patients[idx];
        let before = patient.records.len();
        patient.records.retain(|r| r.id != record_id);
        if patient.records.len() == before {
            return RecordRemoval::NotFound;
        }

        if patient.records.is_empty() {
            let patient = self.patients.remove(idx);
            tracing::info!(patient_id = %patient.id, "last record deleted, patient removed");
            RecordRemoval::PatientRemoved
        } else {
            tracing::debug!(patient_id, record_id, "record deleted");
            RecordRemoval::RecordRemoved
        }
    }

    /// Match-or-create by case-insensitive name.
    fn assign(&mut self, name: &str, file: &UploadedFile) -> Attachment {
        let record = MedicalRecord::from_upload(file);
        let record_id = record.id.clone();

        if let Some(patient) = self.patients.iter_mut().find(|p| p.matches_name(name)) {
            patient.records.push(record);
            tracing::debug!(patient_id = %patient.id, %record_id, "record appended to existing patient");
            return Attachment {
                patient_id: patient.id.clone(),
                patient_name: patient.name.clone(),
                record_id,
                created_patient: false,
            };
        }

        let patient = Patient::new(name.trim().to_string(), record);
        tracing::info!(patient_id = %patient.id, "patient created");
        let attachment = Attachment {
            patient_id: patient.id.clone(),
            patient_name: patient.name.clone(),
            record_id,
            created_patient: true,
        };
        self.patients.push(patient);
        attachment
    }

    fn ensure_idle(&self) -> RecordResult<()> {
        if self.is_busy() {
            return Err(RecordError::UploadInProgress);
        }
        Ok(())
    }
}

/// Returns the slot to idle if an upload is dropped mid-extraction.
struct ExtractingSlot<'a> {
    book: &'a mut RecordBook,
}

impl Drop for ExtractingSlot<'_> {
    fn drop(&mut self) {
        if matches!(self.book.upload, UploadState::Extracting { .. }) {
            tracing::warn!("upload dropped during extraction, slot released");
            self.book.upload = UploadState::Idle;
        }
    }
}

fn ensure_accepted(file: &UploadedFile) -> RecordResult<()> {
    if !file.is_accepted() {
        return Err(RecordError::UnsupportedFileType(file.mime_type.clone()));
    }
    Ok(())
}
