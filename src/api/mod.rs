//! The API client collaborator the upload protocol is built on
//!
//! [`ApiClient`] is the seam between the upload protocol and whatever issues
//! requests to the remote endpoint. [`TokenGate`] layers token handling on top
//! of it, and [`HttpApiClient`] is the bundled implementation over HTTP.

pub mod client;
#[cfg(feature = "http")]
pub mod http;
pub mod token;

pub use client::{ApiClient, ApiRequest, FilePart, TokenKind};
#[cfg(feature = "http")]
pub use http::HttpApiClient;
pub use token::TokenGate;
