//! # Graphcode
//!
//! A binary serialization engine for arbitrary object graphs: shared
//! references stay shared, cycles survive the round trip, and interface-typed
//! slots are rebuilt as the concrete type that was written.
//!
//! ## Overview
//!
//! Tree serializers duplicate a value every time it is reachable and loop
//! forever on a cycle. Graphcode instead tracks object identity while
//! encoding: every arena object is written exactly once, and every further
//! encounter becomes a `Reference` to the slot that holds it.
//!
//! ## Architecture
//!
//! ### Encoding
//!
//! Serialization runs in two steps.
//!
//! 1. The [`Indexer`](graph::Indexer) walks the graph once and flattens it
//!    into an [`ObjectTable`](graph::ObjectTable). Containers reserve their
//!    slot before their children are visited, so the root is `#0` and children always receive
//!    larger ids than the parent that discovered them. Objects are registered
//!    under their arena identity before their fields are walked, which is what
//!    terminates cycles.
//! 2. The [linearizer](graph::linearize()) fixes the write order (descending id
//!    by default) and turns every child id into a `Reference` carrying the
//!    target's position in the stream.
//!
//! ### Stream Format
//!
//! The stream is a plain concatenation of tagged values:
//! ```text
//! [Slot 0] [Slot 1] ... [Slot n-1 = Root]
//! ```
//! A reader locates any slot by position; the root is always the last one.
//! Integers use variable-length encoding, floats keep their precision tag,
//! and strings are length-prefixed UTF-8. See [`format`] for the tag table.
//!
//! ### Decoding
//!
//! The [`Decoder`](reader::Decoder) is pull-based: nothing is materialized
//! until the root, or a field being populated, asks for it. Objects are built
//! in two phases. An empty shell is inserted into the result [`Arena`] and
//! cached under its reference number first, then its fields are decoded, so a
//! field leading back to the object receives the same handle. Shells are
//! populated from a queue, and the encoder walks an explicit stack, so long
//! chains of objects never deepen the call stack.
//!
//! ## Core Concepts
//!
//! - [`Arena`], [`Handle`], [`ObjectRef`]: the owner of every object that can
//!   be shared or take part in a cycle, and the handles that refer into it.
//! - [`Encode`] / [`Decode`]: implemented by every serializable type.
//! - [`Record`]: value-typed composites (derive [`GraphRecord`]).
//! - [`Object`]: arena-resident composites (derive [`GraphObject`]).
//! - [`TypeRegistry`]: the concrete types a polymorphic slot may decode to.
//! - [`Polymorphic`]: an interface-typed slot holding either an object or a
//!   boxed record.
//!
//! ## Usage
//!
//! ```rust
//! use graphcode::{Arena, Graphcode, GraphObject, Handle, TypeRegistry};
//!
//! #[derive(Debug, Default, GraphObject)]
//! struct Node {
//!     label: String,
//!     next: Option<Handle<Node>>,
//! }
//!
//! # fn main() -> graphcode::Result<()> {
//! let mut arena = Arena::new();
//! let a = arena.insert(Node { label: "a".into(), next: None });
//! let b = arena.insert(Node { label: "b".into(), next: Some(a) });
//! if let Some(node) = arena.get_mut(a) {
//!     node.next = Some(b); // a -> b -> a
//! }
//!
//! let bytes = Graphcode::serialize(&arena, &a)?;
//! let decoded = Graphcode::deserialize::<Handle<Node>>(&bytes, &TypeRegistry::new())?;
//!
//! let a2 = decoded.root;
//! let b2 = decoded.arena.get(a2).and_then(|n| n.next).expect("a.next");
//! assert_eq!(decoded.arena.get(b2).and_then(|n| n.next), Some(a2));
//! # Ok(())
//! # }
//! ```
//!
//! ### Safety and Error Handling
//!
//! * **Encapsulated Unsafe:** the only `unsafe` block memory-maps a file in
//!   [`GraphReader::open`].
//! * **No Panics:** No `unwrap()` or `panic!()` calls in the library (enforced by clippy lints).
//! * **Comprehensive Errors:** All failures correspond to a [`GraphcodeError`] type.

#![deny(unsafe_code)]
#![deny(clippy::unwrap_used)]
#![deny(clippy::panic)]
#![warn(missing_docs)]

// Lets the derive output (which names `::graphcode`) compile inside this crate.
extern crate self as graphcode;

// --- PUBLIC API MODULES ---
pub mod api;
pub mod arena;
pub mod config;
pub mod error;
pub mod format;
pub mod inspector;
pub mod object;
pub mod polymorphic;
pub mod reader;
pub mod registry;
pub mod value;

// --- INTERNAL IMPLEMENTATION MODULES (Hidden from Docs) ---
#[doc(hidden)]
pub mod graph;
#[doc(hidden)]
pub mod io;

// Private modules
mod impls;

// --- RE-EXPORTS ---

pub use api::Graphcode;
pub use arena::{Arena, Handle, ObjectRef};
pub use config::{Config, IdPolicy};
pub use error::{GraphcodeError, Result};
pub use graph::Mapper;
pub use inspector::{DebugReport, Inspector, SlotInfo};
pub use object::{Decode, Encode, EncodeFields, Encoding, Object, Record, TYPE_KEY};
pub use polymorphic::{BoxedRecord, Polymorphic};
pub use reader::{Decoded, Decoder, Fields, GraphReader, SlotNode};
pub use registry::TypeRegistry;
pub use value::{Float, Kind, Value};

// Re-export the derive macros so they are accessible as `graphcode::GraphRecord` etc.
pub use graphcode_derive::{GraphObject, GraphRecord};

/// Constants used throughout the library.
pub mod constants {
    pub use crate::config::DEFAULT_MAX_DEPTH;
    pub use crate::format::MAX_INLINE_DEPTH;
    pub use crate::object::TYPE_KEY;
    pub use crate::value::{INTEGER_MAX, INTEGER_MIN};
}
