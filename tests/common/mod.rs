//! Scriptable API client and frame host shared by the integration tests

#![allow(dead_code)]

use async_trait::async_trait;
use futures::channel::mpsc::{unbounded, UnboundedSender};
use serde_json::Value;
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use upload_client::{
    ApiClient, ApiRequest, FormSpec, FrameDocument, FrameEvent, FrameEvents, FrameHost,
    ProgressSink, Result, TokenKind, UploadError, UploadFields,
};

pub const ENDPOINT: &str = "https://example.org/w/api.php";

pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// API client answering posts from a queue of scripted responses
pub struct MockApiClient {
    responses: Mutex<VecDeque<Result<Value>>>,
    requests: Mutex<Vec<ApiRequest>>,
    token_error: Mutex<Option<String>>,
    requires_token: bool,
    generation: AtomicUsize,
    pub token_fetches: AtomicUsize,
    pub invalidations: AtomicUsize,
}

impl MockApiClient {
    pub fn new() -> Self {
        Self {
            responses: Mutex::new(VecDeque::new()),
            requests: Mutex::new(Vec::new()),
            token_error: Mutex::new(None),
            requires_token: true,
            generation: AtomicUsize::new(0),
            token_fetches: AtomicUsize::new(0),
            invalidations: AtomicUsize::new(0),
        }
    }

    pub fn without_tokens() -> Self {
        Self {
            requires_token: false,
            ..Self::new()
        }
    }

    pub fn respond(self, payload: Value) -> Self {
        self.responses.lock().unwrap().push_back(Ok(payload));
        self
    }

    pub fn fail(self, err: UploadError) -> Self {
        self.responses.lock().unwrap().push_back(Err(err));
        self
    }

    pub fn failing_tokens(self, message: &str) -> Self {
        *self.token_error.lock().unwrap() = Some(message.to_string());
        self
    }

    pub fn requests(&self) -> Vec<ApiRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub fn token_fetches(&self) -> usize {
        self.token_fetches.load(Ordering::SeqCst)
    }

    pub fn invalidations(&self) -> usize {
        self.invalidations.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ApiClient for MockApiClient {
    fn endpoint(&self) -> &str {
        ENDPOINT
    }

    fn default_parameters(&self) -> UploadFields {
        UploadFields::new().set("format", "json")
    }

    fn requires_token(&self) -> bool {
        self.requires_token
    }

    async fn post(&self, request: ApiRequest, progress: Option<ProgressSink>) -> Result<Value> {
        if let (Some(sink), Some(file)) = (&progress, &request.file) {
            let total = file.blob.len() as u64;
            sink(total / 4, Some(total));
            sink(total / 2, None);
            sink(total, Some(total));
        }
        self.requests.lock().unwrap().push(request);
        self.responses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(Ok(Value::Null))
    }

    async fn auth_token(&self, _kind: TokenKind) -> Result<String> {
        self.token_fetches.fetch_add(1, Ordering::SeqCst);
        if let Some(message) = self.token_error.lock().unwrap().clone() {
            return Err(UploadError::transport_failure(message));
        }
        Ok(format!("token-{}", self.generation.load(Ordering::SeqCst)))
    }

    fn invalidate_auth_token(&self, _kind: TokenKind) {
        self.invalidations.fetch_add(1, Ordering::SeqCst);
        self.generation.fetch_add(1, Ordering::SeqCst);
    }
}

/// What the host document does once the form is submitted
#[derive(Debug, Clone)]
pub enum FrameResponse {
    /// The response loads into the frame
    Document(FrameDocument),
    /// Loading the form target fails
    LoadError(String),
    /// Nothing happens until the test fires events itself
    Silent,
}

#[derive(Debug, Clone, PartialEq)]
pub enum HostCall {
    CreateFrame(String),
    CreateForm {
        id: String,
        target: String,
        action: String,
        fields: UploadFields,
        input: String,
        file_field: String,
    },
    Attach(String),
    AppendHidden {
        form: String,
        name: String,
        value: String,
    },
    Submit(String),
    Document(String),
    Detach(String),
}

pub struct MockFrameHost {
    calls: Mutex<Vec<HostCall>>,
    senders: Mutex<HashMap<String, UnboundedSender<FrameEvent>>>,
    forms: Mutex<HashMap<String, String>>,
    documents: Mutex<HashMap<String, FrameDocument>>,
    blank_load: Mutex<Option<FrameEvent>>,
    response: Mutex<FrameResponse>,
}

impl MockFrameHost {
    pub fn new(response: FrameResponse) -> Self {
        Self {
            calls: Mutex::new(Vec::new()),
            senders: Mutex::new(HashMap::new()),
            forms: Mutex::new(HashMap::new()),
            documents: Mutex::new(HashMap::new()),
            blank_load: Mutex::new(Some(FrameEvent::Load)),
            response: Mutex::new(response),
        }
    }

    pub fn responding_json(json: &str) -> Self {
        Self::new(FrameResponse::Document(FrameDocument::Body {
            pre_text: Some(json.to_string()),
        }))
    }

    /// Replace the event the blank document produces; `None` means it never loads
    pub fn blank_load(self, event: Option<FrameEvent>) -> Self {
        *self.blank_load.lock().unwrap() = event;
        self
    }

    pub fn calls(&self) -> Vec<HostCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn frames(&self) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                HostCall::CreateFrame(name) => Some(name),
                _ => None,
            })
            .collect()
    }

    pub fn detach_count(&self, frame: &str) -> usize {
        self.calls()
            .iter()
            .filter(|call| matches!(call, HostCall::Detach(f) if f == frame))
            .count()
    }

    pub fn submitted(&self) -> bool {
        self.calls()
            .iter()
            .any(|call| matches!(call, HostCall::Submit(_)))
    }

    /// Load `document` into `frame` and emit its load event
    pub fn deliver(&self, frame: &str, document: FrameDocument) {
        self.documents
            .lock()
            .unwrap()
            .insert(frame.to_string(), document);
        self.fire(frame, FrameEvent::Load);
    }

    pub fn fire(&self, frame: &str, event: FrameEvent) {
        if let Some(sender) = self.senders.lock().unwrap().get(frame) {
            let _ = sender.unbounded_send(event);
        }
    }

    fn record(&self, call: HostCall) {
        self.calls.lock().unwrap().push(call);
    }
}

impl FrameHost for MockFrameHost {
    fn create_frame(&self, name: &str) -> Result<FrameEvents> {
        let (sender, receiver) = unbounded();
        self.senders
            .lock()
            .unwrap()
            .insert(name.to_string(), sender);
        self.record(HostCall::CreateFrame(name.to_string()));
        Ok(receiver)
    }

    fn create_form(&self, form: &FormSpec) -> Result<()> {
        self.forms
            .lock()
            .unwrap()
            .insert(form.id.clone(), form.target.clone());
        self.record(HostCall::CreateForm {
            id: form.id.clone(),
            target: form.target.clone(),
            action: form.action.clone(),
            fields: form.hidden_fields.clone(),
            input: form.file_input.element_id().to_string(),
            file_field: form.file_field.to_string(),
        });
        Ok(())
    }

    fn attach(&self, frame: &str, _form_id: &str) -> Result<()> {
        self.record(HostCall::Attach(frame.to_string()));
        if let Some(event) = self.blank_load.lock().unwrap().clone() {
            self.fire(frame, event);
        }
        Ok(())
    }

    fn append_hidden_field(&self, form_id: &str, name: &str, value: &str) -> Result<()> {
        self.record(HostCall::AppendHidden {
            form: form_id.to_string(),
            name: name.to_string(),
            value: value.to_string(),
        });
        Ok(())
    }

    fn submit(&self, form_id: &str) -> Result<()> {
        self.record(HostCall::Submit(form_id.to_string()));
        let frame = self
            .forms
            .lock()
            .unwrap()
            .get(form_id)
            .cloned()
            .ok_or_else(|| UploadError::frame_load_failed("unknown form"))?;

        let response = self.response.lock().unwrap().clone();
        match response {
            FrameResponse::Document(document) => self.deliver(&frame, document),
            FrameResponse::LoadError(detail) => self.fire(&frame, FrameEvent::Error(detail)),
            FrameResponse::Silent => {}
        }
        Ok(())
    }

    fn document(&self, frame: &str) -> Result<FrameDocument> {
        self.record(HostCall::Document(frame.to_string()));
        self.documents
            .lock()
            .unwrap()
            .get(frame)
            .cloned()
            .ok_or_else(|| UploadError::frame_load_failed("no document"))
    }

    fn detach(&self, frame: &str, _form_id: &str) {
        self.record(HostCall::Detach(frame.to_string()));
        self.senders.lock().unwrap().remove(frame);
    }
}
