//! HTTP implementation of [`ApiClient`]
//!
//! Requests go out as multipart form posts. A file part is streamed in
//! fixed-size pieces so byte-level progress can be reported while the body
//! is being sent. Tokens are cached per kind until invalidated.

use crate::api::client::{ApiClient, ApiRequest, FilePart, TokenKind};
use crate::callback::ProgressSink;
use crate::config::{UploadConfig, DEFAULT_PROGRESS_CHUNK_SIZE, DEFAULT_TIMEOUT_SECS};
use crate::error::{Result, UploadError};
use crate::upload::fields::UploadFields;
use crate::upload::types::{error_code, Blob};
use async_trait::async_trait;
use bytesize::ByteSize;
use log::{debug, info};
use reqwest::multipart::{Form, Part};
use reqwest::{Body, Client};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};
use std::time::Duration;

pub struct HttpApiClient {
    client: Client,
    config: UploadConfig,
    tokens: Mutex<HashMap<TokenKind, String>>,
}

impl HttpApiClient {
    pub fn new(config: UploadConfig) -> Result<Self> {
        config.validate()?;

        let mut builder = Client::builder()
            .cookie_store(true)
            .timeout(Duration::from_secs(
                config.timeout_secs.unwrap_or(DEFAULT_TIMEOUT_SECS),
            ));
        if let Some(agent) = &config.user_agent {
            builder = builder.user_agent(agent.clone());
        }
        let client = builder.build()?;

        Ok(Self {
            client,
            config,
            tokens: Mutex::new(HashMap::new()),
        })
    }

    pub fn config(&self) -> &UploadConfig {
        &self.config
    }

    /// Log in with a username and (bot) password, keeping the session in
    /// the client's cookie store.
    pub async fn login(&self, username: &str, password: &str) -> Result<Value> {
        let token = self.auth_token(TokenKind::Login).await?;
        let fields = self
            .default_parameters()
            .set("action", "login")
            .set("lgname", username)
            .set("lgpassword", password)
            .set("lgtoken", token);

        let payload = self.post(ApiRequest::new(fields), None).await;

        // login tokens are single use, and a new session needs new csrf tokens
        self.invalidate_auth_token(TokenKind::Login);
        self.invalidate_auth_token(TokenKind::Csrf);

        let payload = payload?;
        check_login(&payload)?;
        info!("logged in as {}", username);
        Ok(payload)
    }

    fn chunk_size(&self) -> usize {
        self.config
            .progress_chunk_size
            .unwrap_or(DEFAULT_PROGRESS_CHUNK_SIZE)
            .max(1)
    }

    fn cached_token(&self, kind: TokenKind) -> Option<String> {
        self.tokens
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&kind)
            .cloned()
    }

    fn build_form(&self, request: ApiRequest, progress: Option<ProgressSink>) -> Result<Form> {
        let mut form = Form::new();
        for (key, value) in request.fields {
            form = form.text(key, value);
        }

        if let Some(FilePart { field_name, blob }) = request.file {
            let part = self.file_part(&blob, progress)?;
            form = form.part(field_name, part);
        }

        Ok(form)
    }

    fn file_part(&self, blob: &Blob, progress: Option<ProgressSink>) -> Result<Part> {
        let file_name = blob.name().unwrap_or("blob").to_string();
        let total = blob.len() as u64;

        let part = match progress {
            Some(sink) => {
                let chunks: Vec<Vec<u8>> = blob
                    .data()
                    .chunks(self.chunk_size())
                    .map(<[u8]>::to_vec)
                    .collect();
                let mut sent = 0u64;
                let stream = futures::stream::iter(chunks.into_iter().map(move |chunk| {
                    sent += chunk.len() as u64;
                    sink(sent, Some(total));
                    Ok::<_, std::io::Error>(chunk)
                }));
                Part::stream_with_length(Body::wrap_stream(stream), total)
            }
            None => Part::bytes(blob.data().to_vec()),
        };

        let part = part.file_name(file_name);
        match blob.mime_type() {
            Some(mime) => Ok(part.mime_str(mime)?),
            None => Ok(part),
        }
    }
}

#[async_trait]
impl ApiClient for HttpApiClient {
    fn endpoint(&self) -> &str {
        &self.config.endpoint
    }

    fn default_parameters(&self) -> UploadFields {
        UploadFields::from(self.config.default_parameters.clone())
    }

    async fn post(&self, request: ApiRequest, progress: Option<ProgressSink>) -> Result<Value> {
        debug!(
            "POST {} action={} file={}",
            self.config.endpoint,
            request.fields.get("action").unwrap_or("-"),
            request
                .file
                .as_ref()
                .map(|f| ByteSize(f.blob.len() as u64).to_string())
                .unwrap_or_else(|| "none".to_string())
        );

        let form = self.build_form(request, progress)?;
        let response = self
            .client
            .post(&self.config.endpoint)
            .multipart(form)
            .send()
            .await?
            .error_for_status()?;

        Ok(response.json::<Value>().await?)
    }

    async fn auth_token(&self, kind: TokenKind) -> Result<String> {
        if let Some(token) = self.cached_token(kind) {
            return Ok(token);
        }

        let mut query: Vec<(String, String)> = self.default_parameters().into_iter().collect();
        query.push(("action".to_string(), "query".to_string()));
        query.push(("meta".to_string(), "tokens".to_string()));
        query.push(("type".to_string(), kind.to_string()));

        let payload = self
            .client
            .get(&self.config.endpoint)
            .query(&query)
            .send()
            .await
            .map_err(|e| UploadError::token_acquisition_failed(e.to_string()))?
            .json::<Value>()
            .await
            .map_err(|e| UploadError::token_acquisition_failed(e.to_string()))?;

        let token = parse_token(&payload, kind)?;
        debug!("fetched fresh {} token", kind);
        self.tokens
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(kind, token.clone());
        Ok(token)
    }

    fn invalidate_auth_token(&self, kind: TokenKind) {
        self.tokens
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&kind);
    }
}

impl std::fmt::Debug for HttpApiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpApiClient")
            .field("endpoint", &self.config.endpoint)
            .finish()
    }
}

/// Extract `query.tokens.<kind>token` from a token query response
fn parse_token(payload: &Value, kind: TokenKind) -> Result<String> {
    if let Some(error) = payload.get("error") {
        return Err(UploadError::token_acquisition_failed(error_code(error)));
    }

    let key = format!("{}token", kind);
    payload
        .get("query")
        .and_then(|q| q.get("tokens"))
        .and_then(|t| t.get(&key))
        .and_then(Value::as_str)
        .map(str::to_string)
        .ok_or_else(|| UploadError::token_acquisition_failed(format!("response has no {}", key)))
}

fn check_login(payload: &Value) -> Result<()> {
    if let Some(error) = payload.get("error") {
        return Err(UploadError::server_rejected(error_code(error), payload.clone()));
    }

    match payload
        .get("login")
        .and_then(|l| l.get("result"))
        .and_then(Value::as_str)
    {
        Some("Success") => Ok(()),
        Some(result) => Err(UploadError::server_rejected(
            format!("login-{}", result.to_lowercase()),
            payload.clone(),
        )),
        None => Err(UploadError::EmptyResponse),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn client() -> HttpApiClient {
        HttpApiClient::new(UploadConfig::new("https://example.org/w/api.php")).unwrap()
    }

    #[test]
    fn test_rejects_invalid_config() {
        let err = HttpApiClient::new(UploadConfig::default()).unwrap_err();
        assert!(matches!(err, UploadError::InvalidParameter { .. }));
    }

    #[test]
    fn test_default_parameters_from_config() {
        let api = HttpApiClient::new(
            UploadConfig::new("https://example.org/w/api.php").default_parameter("assert", "user"),
        )
        .unwrap();
        let defaults = api.default_parameters();
        assert_eq!(defaults.get("format"), Some("json"));
        assert_eq!(defaults.get("assert"), Some("user"));
        assert_eq!(api.endpoint(), "https://example.org/w/api.php");
    }

    #[test]
    fn test_parse_token() {
        let payload = json!({"query": {"tokens": {"csrftoken": "abc+\\"}}});
        assert_eq!(parse_token(&payload, TokenKind::Csrf).unwrap(), "abc+\\");

        let err = parse_token(&payload, TokenKind::Login).unwrap_err();
        assert!(matches!(err, UploadError::TokenAcquisitionFailed { .. }));

        let err = parse_token(&json!({"error": {"code": "readapidenied"}}), TokenKind::Csrf)
            .unwrap_err();
        assert!(err.to_string().contains("readapidenied"));
    }

    #[test]
    fn test_check_login() {
        assert!(check_login(&json!({"login": {"result": "Success"}})).is_ok());

        let err = check_login(&json!({"login": {"result": "Failed"}})).unwrap_err();
        assert_eq!(err.code(), Some("login-failed"));

        assert!(matches!(check_login(&json!({})), Err(UploadError::EmptyResponse)));
    }

    #[tokio::test]
    async fn test_cached_token_and_invalidation() {
        let api = client();
        api.tokens
            .lock()
            .unwrap()
            .insert(TokenKind::Csrf, "cached".to_string());

        assert_eq!(api.auth_token(TokenKind::Csrf).await.unwrap(), "cached");

        api.invalidate_auth_token(TokenKind::Csrf);
        assert!(api.cached_token(TokenKind::Csrf).is_none());
    }

    #[test]
    fn test_build_form_with_progress_stream() {
        let api = HttpApiClient::new(
            UploadConfig::new("https://example.org/w/api.php").progress_chunk_size(4),
        )
        .unwrap();
        let request = ApiRequest::new(UploadFields::new().set("filename", "a.png"))
            .with_file(Blob::file("a.png", vec![0u8; 10]).content_type("image/png"));
        let sink: ProgressSink = std::sync::Arc::new(|_, _| {});

        let form = api.build_form(request, Some(sink)).unwrap();
        assert!(!form.boundary().is_empty());
    }
}
