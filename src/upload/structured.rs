//! Structured multipart transport
//!
//! Serializes the prepared fields and the blob into one multipart request
//! and sends it through the token gate, forwarding byte-level progress.

use crate::api::{ApiClient, ApiRequest, TokenGate};
use crate::callback::ProgressNotifier;
use crate::error::{Result, UploadError};
use crate::upload::fields::{prepare_fields, UploadFields};
use crate::upload::transport::Transport;
use crate::upload::types::{Blob, TransportResult};
use async_trait::async_trait;
use bytesize::ByteSize;
use log::{debug, warn};
use serde_json::Value;
use std::sync::Arc;

#[derive(Clone)]
pub struct StructuredTransport {
    api: Arc<dyn ApiClient>,
    gate: TokenGate,
}

impl StructuredTransport {
    pub fn new(api: Arc<dyn ApiClient>) -> Self {
        let gate = TokenGate::new(api.clone());
        Self { api, gate }
    }
}

#[async_trait]
impl Transport for StructuredTransport {
    type Payload = Blob;

    async fn send(
        &self,
        blob: Blob,
        fields: UploadFields,
        progress: &ProgressNotifier,
    ) -> Result<Value> {
        let fields = prepare_fields(&self.api.default_parameters(), fields);
        if !fields.has_target() {
            return Err(UploadError::MissingFilename);
        }

        debug!(
            "structured upload of {} ({})",
            blob.name().unwrap_or("blob"),
            ByteSize(blob.len() as u64)
        );

        let request = ApiRequest::new(fields).with_file(blob);
        let payload = self
            .gate
            .post(request, progress.sink())
            .await
            .map_err(below_protocol)?;

        match classify(payload)? {
            TransportResult::Success(payload) => {
                progress.complete();
                Ok(payload)
            }
            rejected => {
                warn!("structured upload rejected: {:?}", rejected);
                rejected.into_result()
            }
        }
    }
}

/// Encoding and I/O failures below the API layer are transport failures
fn below_protocol(err: UploadError) -> UploadError {
    match err {
        UploadError::Io(e) => UploadError::transport_failure(e.to_string()),
        UploadError::Json(e) => UploadError::transport_failure(e.to_string()),
        other => other,
    }
}

/// A null payload means the server said nothing at all
fn classify(payload: Value) -> Result<TransportResult> {
    if payload.is_null() {
        return Err(UploadError::EmptyResponse);
    }
    Ok(TransportResult::classify(payload))
}
