//! Two-phase stash/finish uploads
//!
//! The file is first uploaded into the server's stash, which answers with an
//! opaque `filekey`. Committing the stashed file happens in a separate finish
//! request that may amend the metadata, through [`FinishUpload`].

use crate::api::{ApiClient, ApiRequest, TokenGate};
use crate::error::{Result, UploadError};
use crate::upload::dispatch::Uploader;
use crate::upload::fields::{prepare_fields, UploadFields};
use crate::upload::types::{error_code, first_warning_key, FileSource, UploadOptions};
use log::{debug, info};
use serde_json::Value;
use std::sync::Arc;

/// Commits a stashed file. Only obtainable once the stash phase produced a
/// `filekey`.
#[derive(Clone)]
pub struct FinishUpload {
    api: Arc<dyn ApiClient>,
    gate: TokenGate,
    filekey: String,
    fields: UploadFields,
}

impl FinishUpload {
    /// The stash handle the server assigned
    pub fn filekey(&self) -> &str {
        &self.filekey
    }

    /// The fields every finish request starts from
    pub fn fields(&self) -> &UploadFields {
        &self.fields
    }

    /// Commit the stashed file.
    ///
    /// `more` is merged over the fields given to the stash call for this
    /// request only. The captured `filekey` always wins.
    pub async fn finish(&self, more: UploadFields) -> Result<Value> {
        let merged = self.fields.clone().merged(&more.filtered());
        let mut fields = prepare_fields(&self.api.default_parameters(), merged);
        fields.remove("stash");
        fields.insert("filekey", self.filekey.clone());

        if !fields.has("filename") {
            return Err(UploadError::MissingFilename);
        }

        debug!("finishing stashed upload {}", self.filekey);
        let payload = self.gate.post(ApiRequest::new(fields), None).await?;
        check_finish(payload)
    }
}

impl std::fmt::Debug for FinishUpload {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FinishUpload")
            .field("filekey", &self.filekey)
            .field("fields", &self.fields)
            .finish()
    }
}

impl Uploader {
    /// Upload a file into the stash, resolving with a handle that commits it
    pub async fn upload_to_stash(
        &self,
        source: impl Into<FileSource>,
        fields: UploadFields,
        options: &UploadOptions,
    ) -> Result<FinishUpload> {
        let fields = fields.filtered();
        let filename = match fields.get("filename") {
            Some(name) if !name.is_empty() => name.to_string(),
            _ => return Err(UploadError::MissingFilename),
        };

        let stash_fields = UploadFields::new()
            .flag("stash", true)
            .set("filename", filename);
        let payload = self.upload(source, stash_fields, options).await?;
        let filekey = capture_filekey(payload)?;
        info!("stashed upload as {}", filekey);

        Ok(FinishUpload {
            gate: TokenGate::new(self.api.clone()),
            api: self.api.clone(),
            filekey,
            fields,
        })
    }
}

/// `upload.filekey`, or the outer error/warning the stash answered with
fn capture_filekey(payload: Value) -> Result<String> {
    if let Some(key) = payload.pointer("/upload/filekey").and_then(Value::as_str) {
        return Ok(key.to_string());
    }

    if let Some(error) = payload.get("error") {
        let code = error_code(error);
        return Err(UploadError::server_rejected(code, payload));
    }

    if let Some(warning) = payload.get("warning").or_else(|| payload.get("warnings")) {
        let code = first_warning_key(warning);
        return Err(UploadError::server_rejected(code, payload));
    }

    Err(UploadError::EmptyResponse)
}

fn check_finish(payload: Value) -> Result<Value> {
    if let Some(error) = payload.get("error") {
        let code = error_code(error);
        return Err(UploadError::server_rejected(code, payload));
    }

    let upload = payload.get("upload");
    if let Some(error) = upload.and_then(|u| u.get("error")) {
        let code = error_code(error);
        let error = error.clone();
        return Err(UploadError::server_rejected(code, error));
    }
    if let Some(warnings) = upload.and_then(|u| u.get("warnings")) {
        let code = first_warning_key(warnings);
        let warnings = warnings.clone();
        return Err(UploadError::server_rejected(code, warnings));
    }

    Ok(payload)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_capture_filekey() {
        let key = capture_filekey(json!({"upload": {"result": "Success", "filekey": "abc"}}));
        assert_eq!(key.unwrap(), "abc");

        let err = capture_filekey(json!({"error": {"code": "stashfailed"}})).unwrap_err();
        assert_eq!(err.code(), Some("stashfailed"));

        let err = capture_filekey(json!({"warning": {"duplicate": ["a.png"]}})).unwrap_err();
        assert_eq!(err.code(), Some("duplicate"));

        let err = capture_filekey(json!({"upload": {"result": "Success"}})).unwrap_err();
        assert!(matches!(err, UploadError::EmptyResponse));
    }

    #[test]
    fn test_check_finish() {
        let ok = json!({"upload": {"result": "Success", "filename": "X.png"}});
        assert_eq!(check_finish(ok.clone()).unwrap(), ok);

        let err = check_finish(json!({"upload": {"error": {"code": "verification-error"}}}))
            .unwrap_err();
        assert_eq!(err.code(), Some("verification-error"));
        assert_eq!(err.payload(), Some(&json!({"code": "verification-error"})));

        let err = check_finish(json!({"upload": {"warnings": {"exists": "X.png"}}})).unwrap_err();
        assert_eq!(err.code(), Some("exists"));
        assert_eq!(err.payload(), Some(&json!({"exists": "X.png"})));

        let err = check_finish(json!({"error": {"code": "badtoken"}})).unwrap_err();
        assert!(err.is_bad_token());
    }
}
