use crate::callback::ProgressSink;
use crate::error::Result;
use crate::upload::fields::{UploadFields, FILE_FIELD};
use crate::upload::types::Blob;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Kind of authorization token requested from the API
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenKind {
    Csrf,
    Login,
}

impl TokenKind {
    pub fn as_str(self) -> &'static str {
        match self {
            TokenKind::Csrf => "csrf",
            TokenKind::Login => "login",
        }
    }
}

impl std::fmt::Display for TokenKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Binary content attached to a request under a form field name
#[derive(Debug, Clone)]
pub struct FilePart {
    pub field_name: String,
    pub blob: Blob,
}

impl FilePart {
    /// The blob under the standard `file` field
    pub fn new(blob: Blob) -> Self {
        Self {
            field_name: FILE_FIELD.to_string(),
            blob,
        }
    }
}

/// A POST request against the API endpoint, encoded as multipart form data
#[derive(Debug, Clone, Default)]
pub struct ApiRequest {
    pub fields: UploadFields,
    pub file: Option<FilePart>,
}

impl ApiRequest {
    pub fn new(fields: UploadFields) -> Self {
        Self { fields, file: None }
    }

    pub fn with_file(mut self, blob: Blob) -> Self {
        self.file = Some(FilePart::new(blob));
        self
    }
}

/// Issues requests against the remote API and manages authorization tokens.
///
/// Implementations own the connection details; the upload protocol only
/// composes fields and reads the shape of the returned payload. `post`
/// returns whatever structured payload the server answered with, including
/// payloads carrying `error` or `warnings`. Only failures below the API
/// layer (network, encoding) are errors.
#[async_trait]
pub trait ApiClient: Send + Sync {
    /// URL of the API endpoint, used as the frame transport's form action
    fn endpoint(&self) -> &str;

    /// Parameters merged under every request's fields
    fn default_parameters(&self) -> UploadFields;

    /// Whether mutating requests need a token attached
    fn requires_token(&self) -> bool {
        true
    }

    /// POST a request; byte-level progress goes to `progress` when the
    /// underlying transfer can report it.
    async fn post(&self, request: ApiRequest, progress: Option<ProgressSink>) -> Result<Value>;

    /// Fetch (possibly from cache) a token of the given kind
    async fn auth_token(&self, kind: TokenKind) -> Result<String>;

    /// Drop a cached token so the next `auth_token` call fetches a fresh one
    fn invalidate_auth_token(&self, kind: TokenKind);
}
