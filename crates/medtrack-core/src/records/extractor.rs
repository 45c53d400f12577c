//! Seam between the record book and the name extraction call.

use std::future::Future;

use medtrack_llm::{GeminiClient, NameExtraction};

use crate::models::UploadedFile;

/// Something that can read a patient name out of an uploaded document.
///
/// Implementations absorb their own failures into
/// [`NameExtraction::Failed`]; the record book never sees an error.
pub trait NameExtractor {
    fn extract_patient_name(
        &self,
        file: &UploadedFile,
    ) -> impl Future<Output = NameExtraction> + Send;
}

impl NameExtractor for GeminiClient {
    fn extract_patient_name(
        &self,
        file: &UploadedFile,
    ) -> impl Future<Output = NameExtraction> + Send {
        self.extract_name(&file.mime_type, file.content.as_bytes())
    }
}
