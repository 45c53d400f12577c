//! Record download: PDFs as-is, images converted to a one-page PDF.

mod pdf;

pub use pdf::*;

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::models::{MedicalRecord, PDF_MIME_TYPE};

/// Download errors. The display text is the advisory shown to the user.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ExportError {
    #[error("Sorry, download is only supported for PDF and image files, which will be converted to PDF.")]
    Unsupported(String),

    #[error("Could not load image to create PDF.")]
    ImageDecode(String),

    #[error("Could not create PDF: {0}")]
    Render(String),
}

pub type ExportResult<T> = Result<T, ExportError>;

/// A file ready to be saved by the user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Download {
    pub file_name: String,
    pub mime_type: String,
    pub bytes: Vec<u8>,
    /// True when an image was converted to PDF
    pub converted: bool,
}

impl Download {
    /// Write the download into `dir`, returning the full path.
    pub fn write_to_dir(&self, dir: &Path) -> std::io::Result<PathBuf> {
        let path = dir.join(&self.file_name);
        std::fs::write(&path, &self.bytes)?;
        Ok(path)
    }
}

/// Replace the last extension of `file_name` with `.pdf`.
///
/// A name without an extension gets `.pdf` appended.
pub fn pdf_file_name(file_name: &str) -> String {
    let stem = match file_name.rfind('.') {
        Some(idx) if idx > 0 => &file_name[..idx],
        _ => file_name,
    };
    format!("{stem}.pdf")
}

/// Prepare a record for download.
pub fn prepare_download(record: &MedicalRecord) -> ExportResult<Download> {
    if record.is_pdf() {
        return Ok(Download {
            file_name: record.file_name.clone(),
            mime_type: PDF_MIME_TYPE.to_string(),
            bytes: record.content.as_bytes().to_vec(),
            converted: false,
        });
    }

    if record.is_image() {
        let file_name = pdf_file_name(&record.file_name);
        let title = file_name.trim_end_matches(".pdf");
        let bytes = image_to_pdf(title, record.content.as_bytes()).map_err(|e| {
            tracing::warn!(record_id = %record.id, "image conversion failed: {e:?}");
            e
        })?;
        tracing::debug!(record_id = %record.id, bytes = bytes.len(), "image converted to PDF");
        return Ok(Download {
            file_name,
            mime_type: PDF_MIME_TYPE.to_string(),
            bytes,
            converted: true,
        });
    }

    Err(ExportError::Unsupported(record.mime_type.clone()))
}
