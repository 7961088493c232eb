//! Progress notification for in-flight uploads
//!
//! An upload reports intermediate progress through the same options value
//! that configures it. Transports feed raw byte counts into a
//! [`ProgressSink`], and the [`ProgressNotifier`] turns them into fractional
//! [`UploadProgress`] values for the caller's callback.

use crate::upload::types::{UploadOptions, UploadProgress};
use log::trace;
use std::sync::Arc;

/// Raw progress callback handed to the API client: `(bytes_sent, bytes_total)`
pub type ProgressSink = Arc<dyn Fn(u64, Option<u64>) + Send + Sync>;

/// Caller-facing progress callback
pub type ProgressCallback = Arc<dyn Fn(UploadProgress) + Send + Sync>;

/// Delivers progress notifications for one upload operation
#[derive(Clone, Default)]
pub struct ProgressNotifier {
    callback: Option<ProgressCallback>,
}

impl ProgressNotifier {
    /// Create a notifier forwarding to the options' progress callback, if any
    pub fn new(options: &UploadOptions) -> Self {
        Self {
            callback: options.on_progress.clone(),
        }
    }

    /// Whether anyone listens to the notifications
    pub fn is_active(&self) -> bool {
        self.callback.is_some()
    }

    /// Report raw byte counts. Counts with an unknown total are dropped since
    /// no meaningful fraction can be computed from them.
    pub fn notify_bytes(&self, bytes_sent: u64, bytes_total: Option<u64>) {
        if bytes_total.is_none() {
            return;
        }
        self.emit(UploadProgress::new(bytes_sent, bytes_total));
    }

    /// Report completion of the transfer
    pub fn complete(&self) {
        self.emit(UploadProgress::complete());
    }

    /// A sink suitable for passing to [`crate::api::ApiClient::post`], or
    /// `None` when nobody listens
    pub fn sink(&self) -> Option<ProgressSink> {
        if !self.is_active() {
            return None;
        }
        let notifier = self.clone();
        Some(Arc::new(move |sent, total| notifier.notify_bytes(sent, total)))
    }

    fn emit(&self, progress: UploadProgress) {
        trace!(
            "upload progress: {:.3} ({} bytes)",
            progress.fraction,
            progress.bytes_uploaded
        );
        if let Some(callback) = &self.callback {
            callback(progress);
        }
    }
}

impl std::fmt::Debug for ProgressNotifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProgressNotifier")
            .field("active", &self.is_active())
            .finish()
    }
}
