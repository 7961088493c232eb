//! Top-level upload entry point and transport routing

use crate::api::ApiClient;
use crate::callback::ProgressNotifier;
use crate::error::{Result, UploadError};
use crate::upload::capabilities::{binary_multipart_available, Capabilities, CapabilitySource};
use crate::upload::fields::UploadFields;
use crate::upload::frame::{FrameHost, FrameTransport};
use crate::upload::structured::StructuredTransport;
use crate::upload::transport::Transport;
use crate::upload::types::{Blob, FileInput, FileSource, TransportKind, UploadOptions};
use log::debug;
use serde_json::Value;
use std::sync::Arc;

/// Where a file source goes, decided once per upload
#[derive(Debug, Clone)]
pub enum Route {
    Structured(Blob),
    /// The input and the frame transport that will submit it
    Frame(FileInput, FrameTransport),
}

impl Route {
    pub fn kind(&self) -> TransportKind {
        match self {
            Route::Structured(_) => TransportKind::Structured,
            Route::Frame(..) => TransportKind::Frame,
        }
    }
}

/// Uploads files to an API endpoint through whichever transport the
/// environment supports.
#[derive(Clone)]
pub struct Uploader {
    pub(crate) api: Arc<dyn ApiClient>,
    capabilities: Arc<dyn CapabilitySource>,
    structured: StructuredTransport,
    frame: Option<FrameTransport>,
}

impl Uploader {
    /// An uploader with native capabilities and no frame host
    pub fn new(api: Arc<dyn ApiClient>) -> Self {
        Self {
            structured: StructuredTransport::new(api.clone()),
            api,
            capabilities: Arc::new(Capabilities::native()),
            frame: None,
        }
    }

    pub fn with_capabilities(mut self, capabilities: impl CapabilitySource + 'static) -> Self {
        self.capabilities = Arc::new(capabilities);
        self
    }

    /// Enable the hidden-frame transport on the given host document
    pub fn with_frame_host(mut self, host: Arc<dyn FrameHost>) -> Self {
        self.frame = Some(FrameTransport::new(self.api.clone(), host));
        self
    }

    pub fn api(&self) -> &Arc<dyn ApiClient> {
        &self.api
    }

    /// Decide which transport carries `source`.
    ///
    /// A file input exposing its selection is unwrapped to the first
    /// selected file when the structured transport is available. File blobs
    /// go structured when possible; anything else needs the frame transport,
    /// which only works with an actual file input.
    pub fn route(&self, source: FileSource) -> Result<Route> {
        let native = binary_multipart_available(self.capabilities.as_ref());

        let (input, blob) = match source {
            FileSource::Input(input) if native && input.files().is_some() => {
                let first = input.files().and_then(|files| files.first()).cloned();
                match first {
                    Some(blob) => (Some(input), Some(blob)),
                    None => return Err(UploadError::NoFileSelected),
                }
            }
            FileSource::Input(input) => (Some(input), None),
            FileSource::Blob(blob) => (None, Some(blob)),
        };

        if let Some(blob) = blob {
            if native && blob.is_file() {
                return Ok(Route::Structured(blob));
            }
        }

        match (input, &self.frame) {
            (Some(input), Some(transport)) => Ok(Route::Frame(input, transport.clone())),
            (Some(_), None) => Err(UploadError::unsupported_argument(
                "frame transport needed but no frame host is configured",
            )),
            (None, _) => Err(UploadError::unsupported_argument(
                "binary multipart transport unavailable and source is not a file input",
            )),
        }
    }

    /// Upload a file with the given fields, resolving with the server payload
    pub async fn upload(
        &self,
        source: impl Into<FileSource>,
        fields: UploadFields,
        options: &UploadOptions,
    ) -> Result<Value> {
        let route = self.route(source.into())?;
        debug!("upload routed to {} transport", route.kind());

        let progress = ProgressNotifier::new(options);
        match route {
            Route::Structured(blob) => self.structured.send(blob, fields, &progress).await,
            Route::Frame(input, transport) => transport.send(input, fields, &progress).await,
        }
    }
}

impl std::fmt::Debug for Uploader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Uploader")
            .field("endpoint", &self.api.endpoint())
            .field(
                "binary_multipart",
                &binary_multipart_available(self.capabilities.as_ref()),
            )
            .field("frame_host", &self.frame.is_some())
            .finish()
    }
}
