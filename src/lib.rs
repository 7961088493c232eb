pub mod api;
pub mod callback;
pub mod config;
pub mod error;
pub mod upload;

pub use api::{ApiClient, ApiRequest, FilePart, TokenGate, TokenKind};

#[cfg(feature = "http")]
pub use api::HttpApiClient;

pub use callback::{ProgressNotifier, ProgressSink};

pub use config::{LogLevel, UploadConfig};

pub use error::{Result, UploadError};

pub use upload::{
    binary_multipart_available, Blob, BlobKind, Capabilities, CapabilitySource, FileInput,
    FileSource, FinishUpload, FormSpec, FrameDocument, FrameEvent, FrameEvents, FrameHost,
    Route, TransportKind, TransportResult, UploadFields, UploadOptions, UploadProgress, Uploader,
};
