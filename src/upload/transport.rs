use crate::callback::ProgressNotifier;
use crate::error::Result;
use crate::upload::fields::UploadFields;
use async_trait::async_trait;
use serde_json::Value;

/// One way of getting a file and its fields to the API endpoint.
///
/// The dispatcher picks an implementation once per upload; everything past
/// that point is transport-specific. Implementations receive the caller's
/// unfiltered fields and resolve with the server payload, rejecting on
/// errors and warnings alike.
#[async_trait]
pub trait Transport: Send + Sync {
    /// What this transport carries the binary content as
    type Payload: Send + 'static;

    async fn send(
        &self,
        payload: Self::Payload,
        fields: UploadFields,
        progress: &ProgressNotifier,
    ) -> Result<Value>;
}
