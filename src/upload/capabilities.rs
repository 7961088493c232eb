//! Detection of the binary multipart transport

use serde::{Deserialize, Serialize};

/// What the running environment can do with binary content
pub trait CapabilitySource: Send + Sync {
    /// Structured form-data bodies can be constructed
    fn form_data(&self) -> bool;

    /// Binary files can be represented as objects
    fn binary_file(&self) -> bool;

    /// Binary file objects can be sliced
    fn blob_slice(&self) -> bool;
}

/// Whether the structured multipart transport can be used.
///
/// All three capabilities are required; any missing one forces the frame
/// transport.
pub fn binary_multipart_available(source: &dyn CapabilitySource) -> bool {
    source.form_data() && source.binary_file() && source.blob_slice()
}

/// A fixed capability report
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct Capabilities {
    pub form_data: bool,
    pub binary_file: bool,
    pub blob_slice: bool,
}

impl Capabilities {
    /// Everything available, as in a native process
    pub fn native() -> Self {
        Self {
            form_data: true,
            binary_file: true,
            blob_slice: true,
        }
    }

    /// Nothing available; only the frame transport can be used
    pub fn none() -> Self {
        Self {
            form_data: false,
            binary_file: false,
            blob_slice: false,
        }
    }
}

impl Default for Capabilities {
    fn default() -> Self {
        Self::native()
    }
}

impl CapabilitySource for Capabilities {
    fn form_data(&self) -> bool {
        self.form_data
    }

    fn binary_file(&self) -> bool {
        self.binary_file
    }

    fn blob_slice(&self) -> bool {
        self.blob_slice
    }
}
