//! Error handling for the upload client
//!
//! This module defines the error type shared by both transports, the token
//! gate and the stash/finish protocol. Every failure is local to one upload
//! attempt; none of them is fatal to the process.

use serde_json::Value;
use thiserror::Error;

/// Result type alias for convenience
pub type Result<T> = std::result::Result<T, UploadError>;

/// Error code the API reports when the attached token is stale
pub const BAD_TOKEN_CODE: &str = "badtoken";

/// Error types that can occur while uploading
#[derive(Error, Debug)]
pub enum UploadError {
    /// A file input was given but nothing is selected in it
    #[error("No file selected")]
    NoFileSelected,

    /// The file source cannot be handled by any available transport
    #[error("Unsupported argument: {message}")]
    UnsupportedArgument { message: String },

    /// Neither `filename` nor `stash` was supplied
    #[error("Filename not included in file data")]
    MissingFilename,

    /// The authorization token could not be fetched
    #[error("Token acquisition failed: {message}")]
    TokenAcquisitionFailed { message: String },

    /// The hidden frame failed to load its target
    #[error("Frame load failed: {message}")]
    FrameLoadFailed { message: String },

    /// The server answered with nothing usable
    #[error("No response from API on upload attempt")]
    EmptyResponse,

    /// The server answered with an error or warnings
    #[error("Server rejected upload: {code}")]
    ServerRejected { code: String, payload: Value },

    /// Network or serialization failure below the protocol layer
    #[error("Transport failure: {message}")]
    TransportFailure { message: String },

    /// Invalid parameter
    #[error("Invalid parameter: {parameter} - {message}")]
    InvalidParameter { parameter: String, message: String },

    /// Configuration error
    #[error("Configuration error: {message}")]
    Config { message: String },

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl UploadError {
    /// Create a new unsupported argument error
    pub fn unsupported_argument(message: impl Into<String>) -> Self {
        UploadError::UnsupportedArgument {
            message: message.into(),
        }
    }

    /// Create a new token acquisition error
    pub fn token_acquisition_failed(message: impl Into<String>) -> Self {
        UploadError::TokenAcquisitionFailed {
            message: message.into(),
        }
    }

    /// Create a new frame load error
    pub fn frame_load_failed(message: impl Into<String>) -> Self {
        UploadError::FrameLoadFailed {
            message: message.into(),
        }
    }

    /// Create a new server rejection carrying the response payload
    pub fn server_rejected(code: impl Into<String>, payload: Value) -> Self {
        UploadError::ServerRejected {
            code: code.into(),
            payload,
        }
    }

    /// Create a new transport failure
    pub fn transport_failure(message: impl Into<String>) -> Self {
        UploadError::TransportFailure {
            message: message.into(),
        }
    }

    /// Create a new invalid parameter error
    pub fn invalid_parameter(parameter: impl Into<String>, message: impl Into<String>) -> Self {
        UploadError::InvalidParameter {
            parameter: parameter.into(),
            message: message.into(),
        }
    }

    /// Create a new configuration error
    pub fn config_error(message: impl Into<String>) -> Self {
        UploadError::Config {
            message: message.into(),
        }
    }

    /// The server-side error code, if this is a server rejection
    pub fn code(&self) -> Option<&str> {
        match self {
            UploadError::ServerRejected { code, .. } => Some(code),
            _ => None,
        }
    }

    /// The server payload, if this is a server rejection
    pub fn payload(&self) -> Option<&Value> {
        match self {
            UploadError::ServerRejected { payload, .. } => Some(payload),
            _ => None,
        }
    }

    /// Whether the server rejected the request because of a stale token
    pub fn is_bad_token(&self) -> bool {
        self.code() == Some(BAD_TOKEN_CODE)
    }
}

#[cfg(feature = "http")]
impl From<reqwest::Error> for UploadError {
    fn from(err: reqwest::Error) -> Self {
        UploadError::transport_failure(err.to_string())
    }
}

impl Clone for UploadError {
    fn clone(&self) -> Self {
        match self {
            UploadError::NoFileSelected => UploadError::NoFileSelected,
            UploadError::UnsupportedArgument { message } => UploadError::UnsupportedArgument {
                message: message.clone(),
            },
            UploadError::MissingFilename => UploadError::MissingFilename,
            UploadError::TokenAcquisitionFailed { message } => {
                UploadError::TokenAcquisitionFailed {
                    message: message.clone(),
                }
            }
            UploadError::FrameLoadFailed { message } => UploadError::FrameLoadFailed {
                message: message.clone(),
            },
            UploadError::EmptyResponse => UploadError::EmptyResponse,
            UploadError::ServerRejected { code, payload } => UploadError::ServerRejected {
                code: code.clone(),
                payload: payload.clone(),
            },
            UploadError::TransportFailure { message } => UploadError::TransportFailure {
                message: message.clone(),
            },
            UploadError::InvalidParameter { parameter, message } => {
                UploadError::InvalidParameter {
                    parameter: parameter.clone(),
                    message: message.clone(),
                }
            }
            UploadError::Config { message } => UploadError::Config {
                message: message.clone(),
            },
            UploadError::Io(e) => UploadError::transport_failure(format!("I/O error: {}", e)),
            UploadError::Json(e) => UploadError::transport_failure(format!("JSON error: {}", e)),
        }
    }
}
