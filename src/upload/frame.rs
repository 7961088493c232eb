//! Hidden-frame transport
//!
//! For hosts that cannot build multipart bodies themselves, the upload is
//! performed by a hidden form submitted into a hidden frame. The host
//! document does the encoding; this module drives the attempt as a state
//! machine:
//!
//! ```text
//! Init -> FrameLoaded -> Submitted -> ResponseParsed -> Resolved | Rejected
//!   \-----------------------------------------------------> Rejected
//! ```
//!
//! Submission waits for both the frame's blank load and the token. The
//! second load carries the response. Frame and form are detached exactly
//! once when the attempt ends, however it ends.

use crate::api::token::TokenGate;
use crate::api::ApiClient;
use crate::callback::ProgressNotifier;
use crate::error::{Result, UploadError};
use crate::upload::fields::{prepare_fields, UploadFields, FILE_FIELD, TOKEN_FIELD};
use crate::upload::transport::Transport;
use crate::upload::types::{FileInput, TransportResult};
use async_trait::async_trait;
use futures::channel::mpsc::UnboundedReceiver;
use futures::StreamExt;
use log::{debug, warn};
use serde_json::Value;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

static NEXT_FRAME_ID: AtomicU64 = AtomicU64::new(0);

/// Allocate a frame name unique within this process
pub fn next_frame_name() -> String {
    format!("uploadframe-{}", NEXT_FRAME_ID.fetch_add(1, Ordering::SeqCst))
}

/// Events a host frame emits
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FrameEvent {
    Load,
    Error(String),
}

/// Receiving end of a frame's event subscription
pub type FrameEvents = UnboundedReceiver<FrameEvent>;

/// The document rendered in a frame after the response arrived
#[derive(Debug, Clone, PartialEq)]
pub enum FrameDocument {
    /// The document exposes a native XML document
    Xml(Value),
    /// An ordinary rendered body; `pre_text` is its preformatted text, if any
    Body { pre_text: Option<String> },
    /// Neither of the above; the document itself
    Raw(Value),
}

/// Description of the hidden form the host has to build
#[derive(Debug, Clone)]
pub struct FormSpec {
    pub id: String,
    /// Name of the frame the form submits into
    pub target: String,
    pub action: String,
    pub method: &'static str,
    pub enctype: &'static str,
    /// One hidden input per entry
    pub hidden_fields: UploadFields,
    /// The file input, moved into the form and renamed to `file_field`
    pub file_input: FileInput,
    pub file_field: &'static str,
}

/// A document able to host hidden frames and forms.
///
/// `create_frame` must subscribe to the frame's events before anything can
/// load in it, so the blank document's load is never missed.
pub trait FrameHost: Send + Sync {
    fn create_frame(&self, name: &str) -> Result<FrameEvents>;

    fn create_form(&self, form: &FormSpec) -> Result<()>;

    /// Insert frame and form into the document; the frame starts loading a
    /// blank page
    fn attach(&self, frame: &str, form_id: &str) -> Result<()>;

    fn append_hidden_field(&self, form_id: &str, name: &str, value: &str) -> Result<()>;

    fn submit(&self, form_id: &str) -> Result<()>;

    fn document(&self, frame: &str) -> Result<FrameDocument>;

    /// Remove frame and form from the document
    fn detach(&self, frame: &str, form_id: &str);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameState {
    Init,
    FrameLoaded,
    Submitted,
    ResponseParsed,
    Resolved,
    Rejected,
}

/// Frame and form of one attempt. Dropping the session detaches both.
struct FrameSession {
    host: Arc<dyn FrameHost>,
    frame: String,
    form_id: String,
    state: FrameState,
}

impl FrameSession {
    fn new(host: Arc<dyn FrameHost>, frame: String) -> Self {
        let form_id = format!("{}-form", frame);
        Self {
            host,
            frame,
            form_id,
            state: FrameState::Init,
        }
    }

    fn advance(&mut self, next: FrameState) {
        debug!("{}: {:?} -> {:?}", self.frame, self.state, next);
        self.state = next;
    }
}

impl Drop for FrameSession {
    fn drop(&mut self) {
        if !matches!(self.state, FrameState::Resolved | FrameState::Rejected) {
            debug!("{}: abandoned in {:?}", self.frame, self.state);
        }
        self.host.detach(&self.frame, &self.form_id);
    }
}

#[derive(Clone)]
pub struct FrameTransport {
    api: Arc<dyn ApiClient>,
    host: Arc<dyn FrameHost>,
    gate: TokenGate,
}

impl FrameTransport {
    pub fn new(api: Arc<dyn ApiClient>, host: Arc<dyn FrameHost>) -> Self {
        let gate = TokenGate::new(api.clone());
        Self { api, host, gate }
    }

    async fn run(
        &self,
        session: &mut FrameSession,
        mut events: FrameEvents,
        input: FileInput,
        fields: UploadFields,
        progress: &ProgressNotifier,
    ) -> Result<Value> {
        let form = FormSpec {
            id: session.form_id.clone(),
            target: session.frame.clone(),
            action: self.api.endpoint().to_string(),
            method: "POST",
            enctype: "multipart/form-data",
            hidden_fields: fields,
            file_input: input,
            file_field: FILE_FIELD,
        };
        self.host.create_form(&form)?;
        self.host.attach(&session.frame, &session.form_id)?;

        let ((), token) =
            futures::future::try_join(next_load(&mut events), self.gate.acquire()).await?;
        session.advance(FrameState::FrameLoaded);

        if let Some(token) = token {
            self.host
                .append_hidden_field(&session.form_id, TOKEN_FIELD, &token)?;
        }
        self.host.submit(&session.form_id)?;
        session.advance(FrameState::Submitted);

        next_load(&mut events).await?;
        session.advance(FrameState::ResponseParsed);
        progress.complete();

        let payload = parse_document(self.host.document(&session.frame)?)?;
        self.gate.observe(&Ok(payload.clone()));
        TransportResult::classify(payload).into_result()
    }
}

impl std::fmt::Debug for FrameTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FrameTransport")
            .field("endpoint", &self.api.endpoint())
            .finish()
    }
}

#[async_trait]
impl Transport for FrameTransport {
    type Payload = FileInput;

    async fn send(
        &self,
        input: FileInput,
        fields: UploadFields,
        progress: &ProgressNotifier,
    ) -> Result<Value> {
        let fields = prepare_fields(&self.api.default_parameters(), fields);
        if !fields.has_target() {
            return Err(UploadError::MissingFilename);
        }

        let name = next_frame_name();
        let events = self.host.create_frame(&name)?;
        let mut session = FrameSession::new(self.host.clone(), name);
        debug!(
            "frame upload from input {} via {}",
            input.element_id(),
            session.frame
        );

        let result = self.run(&mut session, events, input, fields, progress).await;
        match &result {
            Ok(_) => session.advance(FrameState::Resolved),
            Err(err) => {
                warn!("{}: upload rejected: {}", session.frame, err);
                session.advance(FrameState::Rejected);
            }
        }
        result
    }
}

async fn next_load(events: &mut FrameEvents) -> Result<()> {
    match events.next().await {
        Some(FrameEvent::Load) => Ok(()),
        Some(FrameEvent::Error(detail)) => Err(UploadError::frame_load_failed(detail)),
        None => Err(UploadError::frame_load_failed(
            "frame went away before loading",
        )),
    }
}

/// Turn the frame's document into a response payload.
///
/// Rendering engines deliver a JSON response loaded into a frame
/// differently: as an XML document, as text inside a `<pre>` element, or
/// as the document itself.
pub fn parse_document(document: FrameDocument) -> Result<Value> {
    let payload = match document {
        FrameDocument::Xml(value) => value,
        FrameDocument::Body { pre_text } => match pre_text.as_deref().map(str::trim) {
            Some(text) if !text.is_empty() => {
                serde_json::from_str(text).map_err(|_| UploadError::EmptyResponse)?
            }
            _ => return Err(UploadError::EmptyResponse),
        },
        FrameDocument::Raw(value) => value,
    };

    let empty = match &payload {
        Value::Null => true,
        Value::Object(map) => map.is_empty(),
        _ => false,
    };
    if empty {
        return Err(UploadError::EmptyResponse);
    }
    Ok(payload)
}
