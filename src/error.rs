//! Error types for the rendering engine.
//!
//! This module centralizes the error kinds a render call can fail with: a
//! fatal parse error, or a failure reading/parsing the JSON data a template
//! is rendered against. Everything else (missing keys, missing partials) is
//! absorbed into silent/empty rendering per the engine's propagation policy.
//!
//! The error type implements `std::error::Error`, `Debug`, and `Display` by
//! hand rather than via a derive macro, carrying a message and, where it is
//! meaningful, the byte offset in the template where the problem was found.
//! `From` conversions are provided for the std/serde_json error types the
//! crate's I/O paths can produce, so callers can propagate with `?`.

use std::error::Error;
use std::fmt;

/// The canonical result type used across the rendering engine.
pub type Result<T> = std::result::Result<T, RenderError>;

/// A fatal error encountered while rendering a template.
///
/// - `UnterminatedTag` - a `{{` (or the current opening delimiter) was found
///   with no matching closing delimiter before the end of input.
/// - `MalformedSetDelimiter` - a `{{=...=}}` tag did not contain exactly two
///   whitespace-separated, non-empty delimiter runs.
/// - `MissingTripleClose` - a `{{{name}}` triple-mustache tag was missing its
///   extra closing brace.
/// - `KeyTooLong` - a tag's key exceeded the 1024-byte cap.
/// - `DepthExceeded` - section nesting (or partial recursion) exceeded the
///   256-frame cap.
/// - `SectionMismatch` - an end-section tag's key did not match the
///   innermost open section's key.
/// - `Data` - the JSON data a template is rendered against could not be read
///   or parsed. Not a template parse error, but reported through the same
///   type since it is just as fatal to a render call.
#[derive(Debug)]
pub enum RenderError {
    UnterminatedTag { offset: usize },
    MalformedSetDelimiter { offset: usize, msg: String },
    MissingTripleClose { offset: usize },
    KeyTooLong { offset: usize, len: usize },
    DepthExceeded { offset: usize },
    SectionMismatch { offset: usize, expected: String, found: String },
    Data { msg: String, source: Option<Box<dyn Error + Send + Sync + 'static>> },
}

impl RenderError {
    pub fn unterminated_tag(offset: usize) -> Self {
        RenderError::UnterminatedTag { offset }
    }

    pub fn malformed_set_delimiter<S: Into<String>>(offset: usize, msg: S) -> Self {
        RenderError::MalformedSetDelimiter { offset, msg: msg.into() }
    }

    pub fn missing_triple_close(offset: usize) -> Self {
        RenderError::MissingTripleClose { offset }
    }

    pub fn key_too_long(offset: usize, len: usize) -> Self {
        RenderError::KeyTooLong { offset, len }
    }

    pub fn depth_exceeded(offset: usize) -> Self {
        RenderError::DepthExceeded { offset }
    }

    pub fn section_mismatch<S: Into<String>>(offset: usize, expected: S, found: S) -> Self {
        RenderError::SectionMismatch {
            offset,
            expected: expected.into(),
            found: found.into(),
        }
    }

    pub fn data_error<S: Into<String>>(msg: S) -> Self {
        RenderError::Data { msg: msg.into(), source: None }
    }

    fn data_with_source<E: Error + Send + Sync + 'static>(msg: impl Into<String>, source: E) -> Self {
        RenderError::Data { msg: msg.into(), source: Some(Box::new(source)) }
    }

    /// A short, user-friendly description of the error kind.
    pub fn kind(&self) -> &'static str {
        match self {
            RenderError::UnterminatedTag { .. } => "UnterminatedTag",
            RenderError::MalformedSetDelimiter { .. } => "MalformedSetDelimiter",
            RenderError::MissingTripleClose { .. } => "MissingTripleClose",
            RenderError::KeyTooLong { .. } => "KeyTooLong",
            RenderError::DepthExceeded { .. } => "DepthExceeded",
            RenderError::SectionMismatch { .. } => "SectionMismatch",
            RenderError::Data { .. } => "Data",
        }
    }

    /// The byte offset in the template where the problem was detected, if
    /// the error is tied to one.
    pub fn offset(&self) -> usize {
        match self {
            RenderError::UnterminatedTag { offset }
            | RenderError::MalformedSetDelimiter { offset, .. }
            | RenderError::MissingTripleClose { offset }
            | RenderError::KeyTooLong { offset, .. }
            | RenderError::DepthExceeded { offset }
            | RenderError::SectionMismatch { offset, .. } => *offset,
            RenderError::Data { .. } => 0,
        }
    }
}

impl fmt::Display for RenderError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RenderError::UnterminatedTag { offset } => {
                write!(f, "unterminated tag at byte {offset}")
            }
            RenderError::MalformedSetDelimiter { offset, msg } => {
                write!(f, "malformed set-delimiter tag at byte {offset}: {msg}")
            }
            RenderError::MissingTripleClose { offset } => {
                write!(f, "triple-mustache tag missing closing brace at byte {offset}")
            }
            RenderError::KeyTooLong { offset, len } => {
                write!(f, "key of length {len} at byte {offset} exceeds the maximum key length")
            }
            RenderError::DepthExceeded { offset } => {
                write!(f, "section nesting or partial recursion too deep at byte {offset}")
            }
            RenderError::SectionMismatch { offset, expected, found } => {
                write!(
                    f,
                    "end-section tag at byte {offset} closes '{found}' but '{expected}' is still open"
                )
            }
            RenderError::Data { msg, source } => {
                if let Some(s) = source {
                    write!(f, "{msg} (cause: {s})")
                } else {
                    write!(f, "{msg}")
                }
            }
        }
    }
}

impl Error for RenderError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            RenderError::Data { source, .. } => source.as_deref().map(|e| e as &(dyn Error + 'static)),
            _ => None,
        }
    }
}

impl From<std::io::Error> for RenderError {
    fn from(e: std::io::Error) -> Self {
        RenderError::data_with_source("failed to read data file", e)
    }
}

impl From<serde_json::Error> for RenderError {
    fn from(e: serde_json::Error) -> Self {
        RenderError::data_with_source("invalid JSON data", e)
    }
}
