//! Medical record and uploaded file models.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use std::sync::Arc;

pub const PDF_MIME_TYPE: &str = "application/pdf";

/// MIME types accepted for upload.
pub const ACCEPTED_MIME_TYPES: &[&str] = &["image/png", "image/jpeg", "image/jpg", PDF_MIME_TYPE];

/// Guess the MIME type of a file from its extension.
pub fn mime_type_for_path(path: &Path) -> Option<&'static str> {
    let ext = path.extension()?.to_str()?.to_ascii_lowercase();
    match ext.as_str() {
        "png" => Some("image/png"),
        "jpg" | "jpeg" => Some("image/jpeg"),
        "pdf" => Some(PDF_MIME_TYPE),
        _ => None,
    }
}

/// Shared handle to file bytes.
///
/// Cloning is cheap; the bytes are freed once the last record or pending
/// upload referencing them is dropped.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct FileContent(Arc<Vec<u8>>);

impl FileContent {
    pub fn new(bytes: Vec<u8>) -> Self {
        Self(Arc::new(bytes))
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Debug for FileContent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "FileContent({} bytes)", self.0.len())
    }
}

impl From<Vec<u8>> for FileContent {
    fn from(bytes: Vec<u8>) -> Self {
        Self::new(bytes)
    }
}

/// A file selected by the user, not yet attached to a patient.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadedFile {
    /// Original file name
    pub file_name: String,
    /// MIME type as reported by the picker
    pub mime_type: String,
    /// File bytes
    pub content: FileContent,
}

impl UploadedFile {
    pub fn new(file_name: impl Into<String>, mime_type: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            file_name: file_name.into(),
            mime_type: mime_type.into(),
            content: FileContent::new(bytes),
        }
    }

    /// Read a file from disk, inferring its MIME type from the extension.
    ///
    /// Unknown extensions get `application/octet-stream`, which the record
    /// book rejects.
    pub fn from_path(path: &Path) -> std::io::Result<Self> {
        let bytes = std::fs::read(path)?;
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        let mime_type = mime_type_for_path(path).unwrap_or("application/octet-stream");
        Ok(Self::new(file_name, mime_type, bytes))
    }

    /// Whether the file type is accepted for upload.
    pub fn is_accepted(&self) -> bool {
        ACCEPTED_MIME_TYPES.contains(&self.mime_type.to_ascii_lowercase().as_str())
    }
}

/// A single uploaded document owned by a patient.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct MedicalRecord {
    /// Unique ID (UUID v4)
    pub id: String,
    /// Original file name
    pub file_name: String,
    /// MIME type of the content
    pub mime_type: String,
    /// Upload timestamp
    pub uploaded_at: DateTime<Utc>,
    /// File bytes, kept in memory for the lifetime of the process
    #[serde(skip)]
    pub content: FileContent,
}

impl MedicalRecord {
    /// Create a record from an uploaded file.
    pub fn from_upload(file: &UploadedFile) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            file_name: file.file_name.clone(),
            mime_type: file.mime_type.clone(),
            uploaded_at: Utc::now(),
            content: file.content.clone(),
        }
    }

    pub fn is_image(&self) -> bool {
        self.mime_type.to_ascii_lowercase().starts_with("image/")
    }

    pub fn is_pdf(&self) -> bool {
        self.mime_type.eq_ignore_ascii_case(PDF_MIME_TYPE)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_mime_type_for_path() {
        assert_eq!(mime_type_for_path(&PathBuf::from("scan.PNG")), Some("image/png"));
        assert_eq!(mime_type_for_path(&PathBuf::from("a/b/photo.jpeg")), Some("image/jpeg"));
        assert_eq!(mime_type_for_path(&PathBuf::from("photo.jpg")), Some("image/jpeg"));
        assert_eq!(mime_type_for_path(&PathBuf::from("report.pdf")), Some("application/pdf"));
        assert_eq!(mime_type_for_path(&PathBuf::from("notes.txt")), None);
        assert_eq!(mime_type_for_path(&PathBuf::from("README")), None);
    }

    #[test]
    fn test_accepted_types() {
        assert!(UploadedFile::new("a.png", "image/png", vec![]).is_accepted());
        assert!(UploadedFile::new("a.jpg", "image/jpg", vec![]).is_accepted());
        assert!(UploadedFile::new("a.pdf", "APPLICATION/PDF", vec![]).is_accepted());
        assert!(!UploadedFile::new("a.gif", "image/gif", vec![]).is_accepted());
        assert!(!UploadedFile::new("a.txt", "text/plain", vec![]).is_accepted());
    }

    #[test]
    fn test_record_shares_content() {
        let file = UploadedFile::new("scan.png", "image/png", vec![1, 2, 3]);
        let record = MedicalRecord::from_upload(&file);

        assert_eq!(record.file_name, "scan.png");
        assert_eq!(record.content.as_bytes(), &[1, 2, 3]);
        assert!(record.is_image());
        assert!(!record.is_pdf());
        assert_eq!(format!("{:?}", record.content), "FileContent(3 bytes)");
    }

    #[test]
    fn test_record_ids_do_not_collide() {
        let file = UploadedFile::new("scan.png", "image/png", vec![]);
        let a = MedicalRecord::from_upload(&file);
        let b = MedicalRecord::from_upload(&file);
        assert_ne!(a.id, b.id);
    }

    #[test]
    fn test_from_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("letter.pdf");
        std::fs::write(&path, b"%PDF-1.4").unwrap();

        let file = UploadedFile::from_path(&path).unwrap();
        assert_eq!(file.file_name, "letter.pdf");
        assert_eq!(file.mime_type, "application/pdf");
        assert_eq!(file.content.len(), 8);
    }

    #[test]
    fn test_serialization_skips_content() {
        let file = UploadedFile::new("scan.png", "image/png", vec![9; 16]);
        let record = MedicalRecord::from_upload(&file);

        let json = serde_json::to_string(&record).unwrap();
        assert!(!json.contains("content"));

        let back: MedicalRecord = serde_json::from_str(&json).unwrap();
        assert_eq!(back.id, record.id);
        assert!(back.content.is_empty());
    }
}
