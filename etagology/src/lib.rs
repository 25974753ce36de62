//! Etagology
//!
//! Content-derived ETags for writer-style HTTP handlers.
//!
//! The [`Etag`] middleware buffers and hashes whatever a handler writes to its [`ResponseSink`],
//! then sends the response with an `ETag` header, or a bodiless `304 Not Modified` if the client
//! already holds a copy with that exact ETag. Handlers need no change to benefit from it, and can
//! still stream their responses by flushing or by calling [`disable()`].
//!
//! The [`server`] module runs such handlers behind an axum router.
//!
//! # Features
//!
//! - `examples`: Dependencies for the bundled examples. **Not enabled by default.**

pub mod server;

mod buffer;
mod decision;
mod disable;
mod handler;
mod hasher;
mod sink;
mod writer;

pub use buffer::ResponseBuffer;
pub use decision::Outcome;
pub use disable::{DisableEtag, disable};
pub use handler::{Etag, Handler, HandlerExt, HandlerFn, handler_fn};
pub use hasher::{ContentHasher, DIGEST_LEN};
pub use sink::{ResponseRecorder, ResponseSink, SinkEvent};
pub use writer::EtagWriter;
