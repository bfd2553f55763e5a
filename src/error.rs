//! Centralized error handling for Graphcode.
//!
//! Every failure in the encoder, the wire codec and the reconstructor is
//! reported through [`GraphcodeError`]. Nothing in the library panics on bad
//! input: a failed call yields no byte stream and no object graph.
//!
//! ## Error Categories
//!
//! - **Unsupported values** ([`GraphcodeError::UnsupportedValue`]): the encoder met a value it
//!   cannot represent (for example an integer outside the wire range).
//! - **Malformed streams** ([`GraphcodeError::Format`]): the bytes do not parse as a valid
//!   slot table (truncated input, invalid tag, invalid UTF-8, dangling reference).
//! - **Type mismatches** ([`GraphcodeError::TypeMismatch`], [`GraphcodeError::MissingField`]):
//!   a resolved value is not what the requesting field expected.
//! - **Polymorphism** ([`GraphcodeError::UnknownTypeIdentifier`],
//!   [`GraphcodeError::UnidentifiableType`], [`GraphcodeError::IdentifiableTypeMismatch`],
//!   [`GraphcodeError::DuplicateTypeIdentifier`]).
//!
//! ## Usage
//!
//! ```rust
//! use graphcode::{Arena, Graphcode, GraphcodeError, TypeRegistry};
//!
//! let registry = TypeRegistry::new();
//! match Graphcode::deserialize::<i64>(&[], &registry) {
//!     Err(GraphcodeError::Format(msg)) => println!("bad stream: {msg}"),
//!     other => println!("unexpected: {other:?}"),
//! }
//! # let _ = Arena::new();
//! ```

use std::io;
use std::sync::Arc;

use thiserror::Error;

/// A specialized `Result` type for Graphcode operations.
pub type Result<T> = std::result::Result<T, GraphcodeError>;

/// The master error enum covering all failure domains in Graphcode.
///
/// This type is `Clone`; I/O errors are wrapped in `Arc` for that purpose.
#[derive(Debug, Clone, Error)]
pub enum GraphcodeError {
    /// Low-level I/O failure while writing a stream or opening a file.
    #[error("I/O Error: {0}")]
    Io(#[source] Arc<io::Error>),

    /// The encoder was asked to index a value it has no wire representation for.
    ///
    /// This is a programming error on the caller's side and aborts the serialize call.
    #[error("Unsupported Value: {0}")]
    UnsupportedValue(String),

    /// The byte stream is not a valid slot table.
    ///
    /// ## Common Causes
    ///
    /// - Truncated input or an empty stream
    /// - Unknown wire tag
    /// - Invalid UTF-8 inside a string
    /// - A reference number pointing outside the table
    #[error("Format Error: {0}")]
    Format(String),

    /// A resolved value does not have the kind the requesting field expected.
    #[error("Type Mismatch: expected {expected}, found {found}")]
    TypeMismatch {
        /// What the decoder asked for.
        expected: String,
        /// What the stream actually contained.
        found: String,
    },

    /// A record or object mapping has no entry for a required key.
    #[error("Missing Field: '{0}'")]
    MissingField(String),

    /// A polymorphic type descriptor is not present in the caller's registry.
    #[error("Unknown Type Identifier: '{0}'")]
    UnknownTypeIdentifier(String),

    /// A type was used polymorphically but declares no type identifier.
    #[error("Unidentifiable Type: {0} declares no type identifier")]
    UnidentifiableType(String),

    /// A type descriptor names a known type, but not one the slot can hold.
    #[error("Identifiable Type Mismatch: '{identifier}' cannot be decoded as {expected}")]
    IdentifiableTypeMismatch {
        /// The descriptor found in the stream.
        identifier: String,
        /// What the slot required.
        expected: String,
    },

    /// Two different types were registered under the same identifier.
    #[error("Duplicate Type Identifier: '{identifier}' is already bound to {existing}")]
    DuplicateTypeIdentifier {
        /// The contested identifier.
        identifier: String,
        /// Rust type name of the type registered first.
        existing: String,
    },

    /// Nesting went deeper than the configured `max_depth`.
    #[error("Depth Limit Exceeded: graph nests deeper than {0} levels")]
    DepthLimitExceeded(usize),

    /// Logic error in the table builder or linearizer.
    ///
    /// This should not occur in production; it indicates a bug in the library.
    #[error("Internal Logic Error: {0}")]
    Internal(String),
}

impl GraphcodeError {
    pub(crate) fn mismatch(expected: impl Into<String>, found: impl std::fmt::Display) -> Self {
        Self::TypeMismatch {
            expected: expected.into(),
            found: found.to_string(),
        }
    }
}

impl From<io::Error> for GraphcodeError {
    fn from(err: io::Error) -> Self {
        Self::Io(Arc::new(err))
    }
}
