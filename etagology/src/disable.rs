//! Opting out of ETag processing from within a handler.

use std::sync::{
    Arc,
    atomic::{AtomicBool, Ordering},
};

use tracing::debug;

/// A per-request capability that disables ETag processing for that request.
///
/// The middleware stores one in the request extensions before calling the wrapped handler, so any
/// code holding the request can get to it, however deep in the call stack. Use it when a handler
/// wants to stream its response as it is produced rather than have it buffered and hashed.
///
/// Disabling makes the response writer flush what it buffered so far and forward everything
/// after that untouched. The writer switches before its next operation takes effect, so what the
/// client receives is ordered as if the switch happened right away. No ETag is set and no `304`
/// can be returned for the request.
///
/// When the middleware is nested, the handle a request carries also disables every outer layer.
#[derive(Debug, Clone, Default)]
pub struct DisableEtag {
    requested: Arc<AtomicBool>,
    outer: Option<Arc<DisableEtag>>,
}

impl DisableEtag {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Make disabling this handle disable `outer` too.
    pub(crate) fn within(mut self, outer: DisableEtag) -> Self {
        self.outer = Some(Arc::new(outer));
        self
    }

    /// Get the capability attached to a request, if the request is going through the middleware.
    pub fn from_request<B>(request: &http::Request<B>) -> Option<&Self> {
        request.extensions().get()
    }

    /// Disable ETag processing.
    ///
    /// Calling this more than once has no further effect.
    pub fn disable(&self) {
        if !self.requested.swap(true, Ordering::AcqRel) {
            debug!("ETag processing disabled by the handler.");
        }

        if let Some(outer) = &self.outer {
            outer.disable();
        }
    }

    /// Whether ETag processing was disabled.
    pub fn is_disabled(&self) -> bool {
        self.requested.load(Ordering::Acquire)
    }
}

/// Disable ETag processing for the specified request.
///
/// Returns `false` if the request is not going through the ETag middleware, in which case this
/// does nothing.
pub fn disable<B>(request: &http::Request<B>) -> bool {
    match DisableEtag::from_request(request) {
        Some(handle) => {
            handle.disable();

            true
        }
        None => {
            debug!("Not disabling ETag processing: request is not handled by the ETag middleware.");

            false
        }
    }
}
