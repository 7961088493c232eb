//! Token handling for authorized requests
//!
//! The gate attaches a token to every mutating request and reacts to a
//! `badtoken` answer by invalidating the cached token once. It never retries
//! the rejected request itself: the next caller-initiated attempt picks up a
//! fresh token.

use crate::api::client::{ApiClient, ApiRequest, TokenKind};
use crate::callback::ProgressSink;
use crate::error::{Result, UploadError, BAD_TOKEN_CODE};
use crate::upload::fields::TOKEN_FIELD;
use log::{debug, warn};
use serde_json::Value;
use std::sync::Arc;

#[derive(Clone)]
pub struct TokenGate {
    api: Arc<dyn ApiClient>,
    kind: TokenKind,
}

impl TokenGate {
    pub fn new(api: Arc<dyn ApiClient>) -> Self {
        Self {
            api,
            kind: TokenKind::Csrf,
        }
    }

    pub fn kind(&self) -> TokenKind {
        self.kind
    }

    /// Fetch the token to attach, or `None` when the API needs none
    pub async fn acquire(&self) -> Result<Option<String>> {
        if !self.api.requires_token() {
            return Ok(None);
        }

        match self.api.auth_token(self.kind).await {
            Ok(token) => {
                debug!("acquired {} token", self.kind);
                Ok(Some(token))
            }
            Err(err @ UploadError::TokenAcquisitionFailed { .. }) => Err(err),
            Err(err) => Err(UploadError::token_acquisition_failed(err.to_string())),
        }
    }

    /// Invalidate the cached token if `outcome` reports a stale token.
    /// Returns whether an invalidation happened.
    pub fn observe(&self, outcome: &Result<Value>) -> bool {
        let stale = match outcome {
            Ok(payload) => reports_bad_token(payload),
            Err(err) => err.is_bad_token(),
        };

        if stale {
            warn!("server reported a stale {} token, invalidating", self.kind);
            self.api.invalidate_auth_token(self.kind);
        }
        stale
    }

    /// POST `request` with a token attached, observing the result
    pub async fn post(
        &self,
        mut request: ApiRequest,
        progress: Option<ProgressSink>,
    ) -> Result<Value> {
        if let Some(token) = self.acquire().await? {
            request.fields.insert(TOKEN_FIELD, token);
        }

        let outcome = self.api.post(request, progress).await;
        self.observe(&outcome);
        outcome
    }
}

impl std::fmt::Debug for TokenGate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenGate")
            .field("endpoint", &self.api.endpoint())
            .field("kind", &self.kind)
            .finish()
    }
}

/// Whether a response payload carries a top-level `badtoken` error
pub fn reports_bad_token(payload: &Value) -> bool {
    payload
        .get("error")
        .and_then(|e| e.get("code"))
        .and_then(Value::as_str)
        == Some(BAD_TOKEN_CODE)
}
