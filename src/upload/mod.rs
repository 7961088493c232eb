//! Upload operations
//!
//! This module routes uploads to one of two transports, depending on what
//! the environment supports, and implements the stash/finish protocol on
//! top of them.

pub mod capabilities;
pub mod dispatch;
pub mod fields;
pub mod frame;
pub mod stash;
pub mod structured;
pub mod transport;
pub mod types;

pub use capabilities::{binary_multipart_available, Capabilities, CapabilitySource};
pub use dispatch::{Route, Uploader};
pub use fields::{prepare_fields, UploadFields, ALLOWED_FIELDS};
pub use frame::{
    FormSpec, FrameDocument, FrameEvent, FrameEvents, FrameHost, FrameState, FrameTransport,
};
pub use stash::FinishUpload;
pub use transport::Transport;
pub use types::{
    Blob, BlobKind, FileInput, FileSource, TransportKind, TransportResult, UploadOptions,
    UploadProgress,
};
