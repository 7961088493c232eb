use crate::callback::ProgressCallback;
use crate::error::{Result, UploadError};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;

/// Whether a blob is a named file (like a user-selected file) or a raw byte blob
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BlobKind {
    File,
    Raw,
}

/// Binary content to upload
#[derive(Clone, PartialEq, Eq)]
pub struct Blob {
    data: Vec<u8>,
    name: Option<String>,
    content_type: Option<String>,
    kind: BlobKind,
}

impl Blob {
    /// A named file blob, eligible for the structured multipart transport
    pub fn file(name: impl Into<String>, data: impl Into<Vec<u8>>) -> Self {
        Self {
            data: data.into(),
            name: Some(name.into()),
            content_type: None,
            kind: BlobKind::File,
        }
    }

    /// A raw byte blob without file identity
    pub fn raw(data: impl Into<Vec<u8>>) -> Self {
        Self {
            data: data.into(),
            name: None,
            content_type: None,
            kind: BlobKind::Raw,
        }
    }

    /// Read a file from the filesystem into a file blob
    #[cfg(feature = "http")]
    pub async fn from_path(path: impl AsRef<std::path::Path>) -> Result<Self> {
        let path = path.as_ref();
        let name = path
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or_else(|| {
                UploadError::invalid_parameter(
                    "path",
                    format!("Path has no file name: {}", path.display()),
                )
            })?
            .to_string();
        let data = tokio::fs::read(path).await?;
        Ok(Self::file(name, data))
    }

    pub fn content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = Some(content_type.into());
        self
    }

    pub fn kind(&self) -> BlobKind {
        self.kind
    }

    pub fn is_file(&self) -> bool {
        self.kind == BlobKind::File
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn mime_type(&self) -> Option<&str> {
        self.content_type.as_deref()
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

impl std::fmt::Debug for Blob {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Blob")
            .field("kind", &self.kind)
            .field("name", &self.name)
            .field("content_type", &self.content_type)
            .field("size", &bytesize::ByteSize(self.data.len() as u64))
            .finish()
    }
}

/// Handle to a file-input element living in a frame host document
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileInput {
    element_id: String,
    files: Option<Vec<Blob>>,
}

impl FileInput {
    /// An input whose selected-file list is not exposed by the host
    pub fn new(element_id: impl Into<String>) -> Self {
        Self {
            element_id: element_id.into(),
            files: None,
        }
    }

    /// An input exposing its selected-file list
    pub fn with_files(element_id: impl Into<String>, files: Vec<Blob>) -> Self {
        Self {
            element_id: element_id.into(),
            files: Some(files),
        }
    }

    pub fn element_id(&self) -> &str {
        &self.element_id
    }

    pub fn files(&self) -> Option<&[Blob]> {
        self.files.as_deref()
    }
}

/// What the caller hands to [`crate::Uploader::upload`]
#[derive(Debug, Clone)]
pub enum FileSource {
    Input(FileInput),
    Blob(Blob),
}

impl From<Blob> for FileSource {
    fn from(blob: Blob) -> Self {
        FileSource::Blob(blob)
    }
}

impl From<FileInput> for FileSource {
    fn from(input: FileInput) -> Self {
        FileSource::Input(input)
    }
}

/// Which transport carried an upload
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransportKind {
    Structured,
    Frame,
}

impl std::fmt::Display for TransportKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TransportKind::Structured => write!(f, "structured"),
            TransportKind::Frame => write!(f, "frame"),
        }
    }
}

/// Normalized outcome of a server response, whichever transport produced it
#[derive(Debug, Clone, PartialEq)]
pub enum TransportResult {
    Success(Value),
    Warning { code: String, payload: Value },
    Failure { code: String, payload: Value },
}

impl TransportResult {
    /// Classify a server payload.
    ///
    /// `error` fails. Without an error, top-level `warnings` or nested
    /// `upload.warnings` make it a warning.
    pub fn classify(payload: Value) -> Self {
        if let Some(error) = payload.get("error") {
            let code = error_code(error);
            return TransportResult::Failure { code, payload };
        }

        let warnings = payload
            .get("warnings")
            .or_else(|| payload.pointer("/upload/warnings"));
        if let Some(warnings) = warnings {
            let code = first_warning_key(warnings);
            return TransportResult::Warning { code, payload };
        }

        TransportResult::Success(payload)
    }

    pub fn is_success(&self) -> bool {
        matches!(self, TransportResult::Success(_))
    }

    /// Warnings and failures both reject
    pub fn into_result(self) -> Result<Value> {
        match self {
            TransportResult::Success(payload) => Ok(payload),
            TransportResult::Warning { code, payload }
            | TransportResult::Failure { code, payload } => {
                Err(UploadError::server_rejected(code, payload))
            }
        }
    }
}

/// Error code carried in an `error` object, or `unknown`
pub(crate) fn error_code(error: &Value) -> String {
    error
        .get("code")
        .and_then(Value::as_str)
        .unwrap_or("unknown")
        .to_string()
}

/// First key of a `warnings` object, or `warning`
pub(crate) fn first_warning_key(warnings: &Value) -> String {
    warnings
        .as_object()
        .and_then(|map| map.keys().next().cloned())
        .unwrap_or_else(|| "warning".to_string())
}

#[derive(Debug, Clone)]
pub struct UploadProgress {
    pub bytes_uploaded: u64,
    pub total_bytes: Option<u64>,
    /// Fraction in `[0, 1]`
    pub fraction: f64,
}

impl UploadProgress {
    pub fn new(bytes_uploaded: u64, total_bytes: Option<u64>) -> Self {
        let fraction = match total_bytes {
            Some(total) if total > 0 => bytes_uploaded as f64 / total as f64,
            _ => 0.0,
        };

        Self {
            bytes_uploaded,
            total_bytes,
            fraction: fraction.clamp(0.0, 1.0),
        }
    }

    pub fn complete() -> Self {
        Self {
            bytes_uploaded: 0,
            total_bytes: None,
            fraction: 1.0,
        }
    }

    pub fn is_complete(&self) -> bool {
        self.fraction >= 1.0
    }
}

#[derive(Clone, Default)]
pub struct UploadOptions {
    pub on_progress: Option<ProgressCallback>,
}

impl std::fmt::Debug for UploadOptions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UploadOptions")
            .field("on_progress", &self.on_progress.is_some())
            .finish()
    }
}

impl UploadOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on_progress<F>(mut self, callback: F) -> Self
    where
        F: Fn(UploadProgress) + Send + Sync + 'static,
    {
        self.on_progress = Some(Arc::new(callback));
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_classify_responses() {
        let ok = TransportResult::classify(json!({"upload": {"result": "Success"}}));
        assert!(ok.is_success());

        let failed = TransportResult::classify(json!({"error": {"code": "badtoken"}}));
        assert!(matches!(failed, TransportResult::Failure { ref code, .. } if code == "badtoken"));

        let top = TransportResult::classify(json!({"warnings": {"main": {"*": "Unrecognized"}}}));
        assert!(matches!(top, TransportResult::Warning { ref code, .. } if code == "main"));

        let nested = TransportResult::classify(json!({
            "upload": {"result": "Warning", "warnings": {"exists": "a.png"}, "filekey": "k"}
        }));
        assert!(matches!(nested, TransportResult::Warning { ref code, .. } if code == "exists"));

        let error_wins =
            TransportResult::classify(json!({"error": {"code": "badtoken"}, "warnings": {}}));
        assert!(matches!(
            error_wins,
            TransportResult::Failure { ref code, .. } if code == "badtoken"
        ));
    }

    #[test]
    fn test_upload_progress() {
        let progress = UploadProgress::new(500, Some(1000));
        assert_eq!(progress.bytes_uploaded, 500);
        assert_eq!(progress.total_bytes, Some(1000));
        assert_eq!(progress.fraction, 0.5);
        assert!(!progress.is_complete());

        let unknown = UploadProgress::new(500, None);
        assert_eq!(unknown.fraction, 0.0);

        assert!(UploadProgress::complete().is_complete());
    }

    #[test]
    fn test_blob_kinds() {
        let file = Blob::file("cat.png", vec![1, 2, 3]).content_type("image/png");
        assert!(file.is_file());
        assert_eq!(file.name(), Some("cat.png"));
        assert_eq!(file.mime_type(), Some("image/png"));
        assert_eq!(file.len(), 3);

        let raw = Blob::raw(Vec::new());
        assert_eq!(raw.kind(), BlobKind::Raw);
        assert!(raw.name().is_none());
        assert!(raw.is_empty());
    }

    #[test]
    fn test_blob_debug_omits_content() {
        let blob = Blob::file("a.txt", vec![0u8; 2048]);
        let rendered = format!("{:?}", blob);
        assert!(rendered.contains("a.txt"));
        assert!(!rendered.contains("[0, 0"));
    }

    #[test]
    fn test_file_input() {
        let legacy = FileInput::new("wpUploadFile");
        assert!(legacy.files().is_none());

        let modern = FileInput::with_files("wpUploadFile", vec![Blob::file("a.png", vec![1])]);
        assert_eq!(modern.files().map(|f| f.len()), Some(1));
        assert_eq!(modern.element_id(), "wpUploadFile");
    }

    #[test]
    fn test_transport_result_into_result() {
        let ok = TransportResult::Success(json!({"upload": {"result": "Success"}}));
        assert!(ok.is_success());
        assert!(ok.into_result().is_ok());

        let warned = TransportResult::Warning {
            code: "duplicate".to_string(),
            payload: json!({"warnings": {}}),
        };
        let err = warned.into_result().unwrap_err();
        assert_eq!(err.code(), Some("duplicate"));
    }

    #[test]
    fn test_codes() {
        assert_eq!(error_code(&json!({"code": "badtoken"})), "badtoken");
        assert_eq!(error_code(&json!({})), "unknown");
        assert_eq!(first_warning_key(&json!({"exists": "a.png"})), "exists");
        assert_eq!(first_warning_key(&json!("x")), "warning");
    }

    #[test]
    fn test_upload_options_debug() {
        let options = UploadOptions::new().on_progress(|_| {});
        assert!(format!("{:?}", options).contains("true"));
    }
}
