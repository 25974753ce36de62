//! The end-of-request decision.

use http::{HeaderMap, HeaderValue, Method, StatusCode};

/// What happened to a response once its handler returned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// The response was already streamed to the client: nothing was left to do.
    Streamed,

    /// The client's copy is current: a `304 Not Modified` was sent instead of the body.
    NotModified,

    /// The response was sent with its ETag and the buffered body.
    Emitted,
}

impl std::fmt::Display for Outcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Outcome::Streamed => write!(f, "streamed"),
            Outcome::NotModified => write!(f, "not modified"),
            Outcome::Emitted => write!(f, "emitted"),
        }
    }
}

/// The validator of a buffered response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Validator {
    /// Set by the handler.
    Explicit(HeaderValue),

    /// Computed from the response body.
    Derived(HeaderValue),
}

impl Validator {
    pub(crate) fn value(&self) -> &HeaderValue {
        match self {
            Validator::Explicit(value) | Validator::Derived(value) => value,
        }
    }
}

/// Get the ETag a handler set on its response, if any.
///
/// An empty value counts as unset.
pub(crate) fn explicit_etag(headers: &HeaderMap) -> Option<&HeaderValue> {
    headers
        .get(http::header::ETAG)
        .filter(|value| !value.is_empty())
}

/// Get the conditional token of a request, if any.
///
/// An empty value counts as no condition.
pub(crate) fn if_none_match(headers: &HeaderMap) -> Option<&HeaderValue> {
    headers
        .get(http::header::IF_NONE_MATCH)
        .filter(|value| !value.is_empty())
}

/// Whether a pending status counts as successful. No status means `200 OK`.
pub(crate) fn is_successful(status: Option<StatusCode>) -> bool {
    status.is_none_or(|status| status.is_success())
}

/// Whether a `304 Not Modified` may be returned for the method.
pub(crate) fn is_conditional_method(method: &Method) -> bool {
    method == Method::GET || method == Method::HEAD
}

/// Whether the response should be collapsed into a `304 Not Modified`.
///
/// The token must be byte-for-byte equal to the validator: no list parsing, no weak comparison.
pub(crate) fn is_not_modified(
    method: &Method,
    if_none_match: Option<&HeaderValue>,
    status: Option<StatusCode>,
    validator: &HeaderValue,
) -> bool {
    if_none_match.is_some_and(|token| token.as_bytes() == validator.as_bytes())
        && is_successful(status)
        && is_conditional_method(method)
}
