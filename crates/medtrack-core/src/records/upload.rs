//! Upload guard and outcomes.
//!
//! At most one untargeted upload is active at a time. It is either waiting on
//! the extraction call or waiting for the user to type a patient name.

use serde::{Deserialize, Serialize};

use crate::models::UploadedFile;

/// Advisory shown when the extraction call failed.
pub const EXTRACTION_FAILED_ADVISORY: &str =
    "Failed to process the document. Please enter the patient name manually.";

/// Proof that the caller holds the upload slot.
///
/// Returned by `RecordBook::begin_upload` and consumed by
/// `RecordBook::finish_upload`.
#[derive(Debug)]
pub struct UploadTicket {
    pub(crate) id: String,
    pub(crate) file: UploadedFile,
}

impl UploadTicket {
    pub(crate) fn new(file: UploadedFile) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            file,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    /// The file to send to the extraction call.
    pub fn file(&self) -> &UploadedFile {
        &self.file
    }
}

#[derive(Debug, Default)]
pub(crate) enum UploadState {
    #[default]
    Idle,
    Extracting {
        ticket_id: String,
    },
    AwaitingName {
        file: UploadedFile,
        advisory: Option<String>,
    },
}

/// Where a record ended up.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attachment {
    pub patient_id: String,
    pub patient_name: String,
    pub record_id: String,
    /// True when the upload created the patient
    pub created_patient: bool,
}

/// Request for a patient name after extraction found none.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NamePrompt {
    /// File waiting for a patient
    pub file_name: String,
    /// Set when the extraction call failed rather than finding no name
    pub advisory: Option<String>,
    /// Existing patient names for autocomplete
    pub suggestions: Vec<String>,
}

/// Result of an untargeted upload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum UploadOutcome {
    Attached(Attachment),
    NeedsPatientName(NamePrompt),
}

impl UploadOutcome {
    pub fn attachment(&self) -> Option<&Attachment> {
        match self {
            UploadOutcome::Attached(a) => Some(a),
            UploadOutcome::NeedsPatientName(_) => None,
        }
    }
}

/// Result of deleting a single record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, uniffi::Enum)]
pub enum RecordRemoval {
    /// The record was removed; the patient still has other records
    RecordRemoved,
    /// The record was the patient's last, so the patient was removed too
    PatientRemoved,
    /// No such patient or record
    NotFound,
}
