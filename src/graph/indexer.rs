//! The encoder front-end.
//!
//! The [`Indexer`] walks an object graph once and flattens it into an
//! [`ObjectTable`]. Containers reserve their slot before their children are
//! visited so that children receive larger ids than the parent, and arena
//! objects register their identity before their fields are walked, which is
//! what breaks cycles.
//!
//! The walk runs on an explicit stack of frames rather than the call
//! stack. Each frame is the in-progress accumulator of one container, record
//! or object; a composite's [`Mapper`] only collects borrowed pairs, which
//! are then visited from the frame in order.

use std::borrow::Cow;
use std::collections::HashMap;

use tracing::trace;

use super::id::SlotId;
use super::table::{ObjectTable, Slot};
use crate::arena::{Arena, ObjectRef};
use crate::config::Config;
use crate::error::{GraphcodeError, Result};
use crate::object::{Encode, Encoding, TYPE_KEY};
use crate::value::Value;

/// One value waiting to be indexed.
pub(crate) enum Pending<'a> {
    /// A value that picks its own encoding.
    Value(&'a dyn Encode),
    /// A string key, written as a scalar.
    Key(Cow<'a, str>),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Shape {
    Sequence,
    Mapping,
}

/// A container whose slot is reserved but whose children are still being visited.
struct Frame<'a> {
    id: SlotId,
    shape: Shape,
    pending: std::vec::IntoIter<Pending<'a>>,
    children: Vec<SlotId>,
    /// Containers and records open inside the nearest object, this one included.
    depth: usize,
}

impl Frame<'_> {
    fn into_slot(self) -> Result<Slot> {
        match self.shape {
            Shape::Sequence => Ok(Slot::Sequence(self.children)),
            Shape::Mapping => {
                if self.children.len() % 2 != 0 {
                    return Err(GraphcodeError::Internal(format!(
                        "Slot {} closed with an unpaired key",
                        self.id
                    )));
                }
                let pairs = self
                    .children
                    .chunks_exact(2)
                    .map(|pair| (pair[0], pair[1]))
                    .collect();
                Ok(Slot::Mapping(pairs))
            }
        }
    }
}

enum Visited<'a> {
    /// The value already has its final slot.
    Done(SlotId),
    /// The value reserved a slot and its children still have to be visited.
    Open(Frame<'a>),
}

/// Builds the object table for one serialize call.
///
/// An indexer must not be reused across calls: its identity map is only
/// valid for a single traversal.
pub struct Indexer<'a> {
    arena: &'a Arena,
    table: ObjectTable,
    identities: HashMap<usize, SlotId>,
    stack: Vec<Frame<'a>>,
    max_depth: usize,
}

impl<'a> Indexer<'a> {
    /// Creates an indexer that resolves handles against `arena`.
    pub fn new(arena: &'a Arena, config: &Config) -> Self {
        Self {
            arena,
            table: ObjectTable::new(),
            identities: HashMap::new(),
            stack: Vec::new(),
            max_depth: config.max_depth,
        }
    }

    /// Indexes `value` and everything reachable from it. Returns its slot id.
    pub fn index(&mut self, value: &'a dyn Encode) -> Result<SlotId> {
        let base = self.stack.len();
        let root = match self.visit(Pending::Value(value), 0)? {
            Visited::Done(id) => return Ok(id),
            Visited::Open(frame) => {
                let id = frame.id;
                self.stack.push(frame);
                id
            }
        };

        while self.stack.len() > base {
            let Some(top) = self.stack.last_mut() else {
                break;
            };
            let depth = top.depth;
            match top.pending.next() {
                Some(item) => match self.visit(item, depth)? {
                    Visited::Done(id) => self.push_child(id)?,
                    Visited::Open(frame) => {
                        self.push_child(frame.id)?;
                        self.stack.push(frame);
                    }
                },
                None => {
                    let frame = self
                        .stack
                        .pop()
                        .ok_or_else(|| GraphcodeError::Internal("frame stack underflow".into()))?;
                    let id = frame.id;
                    self.table.fill(id, frame.into_slot()?)?;
                }
            }
        }
        Ok(root)
    }

    fn push_child(&mut self, id: SlotId) -> Result<()> {
        self.stack
            .last_mut()
            .ok_or_else(|| GraphcodeError::Internal("child without an open frame".into()))?
            .children
            .push(id);
        Ok(())
    }

    /// Appends a scalar, or reserves a slot and opens a frame for a composite.
    ///
    /// `depth` is the nesting of the frame the value belongs to.
    fn visit(&mut self, item: Pending<'a>, depth: usize) -> Result<Visited<'a>> {
        let encoding = match item {
            Pending::Key(key) => {
                let id = self.table.push(Slot::Scalar(Value::String(key.into_owned())))?;
                return Ok(Visited::Done(id));
            }
            Pending::Value(value) => value.encoding()?,
        };

        match encoding {
            Encoding::Scalar(value) => Ok(Visited::Done(self.table.push(Slot::Scalar(value))?)),
            Encoding::Sequence(items) => {
                let pending = items.into_iter().map(Pending::Value).collect();
                self.open(Shape::Sequence, pending, depth + 1)
            }
            Encoding::Map(pairs) => {
                let pending = pairs
                    .into_iter()
                    .flat_map(|(key, value)| [Pending::Value(key), Pending::Value(value)])
                    .collect();
                self.open(Shape::Mapping, pending, depth + 1)
            }
            Encoding::Record {
                fields,
                type_identifier,
            } => {
                let mut mapper = Mapper::begin(type_identifier);
                fields.encode_fields(&mut mapper)?;
                self.open(Shape::Mapping, mapper.end(), depth + 1)
            }
            Encoding::Object {
                object,
                polymorphic,
            } => self.visit_object(object, polymorphic),
        }
    }

    fn visit_object(&mut self, object: ObjectRef, polymorphic: bool) -> Result<Visited<'a>> {
        // Copy the arena reference out so the borrow is independent of `self`.
        let arena = self.arena;
        let instance = arena.get_dyn(object).ok_or_else(|| {
            GraphcodeError::UnsupportedValue(format!(
                "{object:?} does not belong to the arena being serialized"
            ))
        })?;
        let descriptor = instance.dyn_type_identifier();
        if polymorphic && descriptor.is_none() {
            return Err(GraphcodeError::UnidentifiableType(
                instance.dyn_type_name().to_owned(),
            ));
        }

        if let Some(id) = self.identities.get(&object.index()) {
            return Ok(Visited::Done(*id));
        }

        let mut mapper = Mapper::begin(descriptor);
        instance.encode_fields(&mut mapper)?;

        // Objects start a fresh depth count: chains of them live on the heap.
        let visited = self.open(Shape::Mapping, mapper.end(), 1)?;
        if let Visited::Open(frame) = &visited {
            // Registered before the fields are walked so that a field pointing
            // back at this object resolves to the same id.
            self.identities.insert(object.index(), frame.id);
            trace!(slot = %frame.id, object = object.index(), ty = instance.dyn_type_name(), "indexing object");
        }
        Ok(visited)
    }

    fn open(&mut self, shape: Shape, pending: Vec<Pending<'a>>, depth: usize) -> Result<Visited<'a>> {
        if depth > self.max_depth {
            return Err(GraphcodeError::DepthLimitExceeded(self.max_depth));
        }
        let id = self.table.reserve()?;
        Ok(Visited::Open(Frame {
            id,
            shape,
            children: Vec::with_capacity(pending.len()),
            pending: pending.into_iter(),
            depth,
        }))
    }

    /// Number of distinct arena objects indexed so far.
    pub fn identity_count(&self) -> usize {
        self.identities.len()
    }

    /// Read-only view of the table built so far.
    pub fn table(&self) -> &ObjectTable {
        &self.table
    }

    /// Consumes the indexer and returns the finished table.
    ///
    /// Fails if a container is still open.
    pub fn finish(self) -> Result<ObjectTable> {
        if !self.stack.is_empty() {
            return Err(GraphcodeError::Internal(format!(
                "{} containers still open at end of indexing",
                self.stack.len()
            )));
        }
        Ok(self.table)
    }
}

impl std::fmt::Debug for Indexer<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Indexer")
            .field("slots", &self.table.len())
            .field("objects", &self.identities.len())
            .field("open", &self.stack.len())
            .finish()
    }
}

/// Per-composite recording surface handed to [`EncodeFields::encode_fields`].
///
/// [`Mapper::begin`] opens the accumulator (seeded with the type descriptor,
/// if any), every [`Mapper::put`] appends a key and a value, and
/// [`Mapper::end`] hands the pairs to the indexer. Nothing is indexed while
/// the mapper is recording, so a composite's fields may lead anywhere in the
/// graph without growing the call stack.
///
/// [`EncodeFields::encode_fields`]: crate::EncodeFields::encode_fields
pub struct Mapper<'a> {
    entries: Vec<Pending<'a>>,
}

impl<'a> Mapper<'a> {
    pub(crate) fn begin(type_identifier: Option<Cow<'static, str>>) -> Self {
        let mut entries = Vec::new();
        if let Some(identifier) = type_identifier {
            entries.push(Pending::Key(Cow::Borrowed(TYPE_KEY)));
            entries.push(Pending::Key(identifier));
        }
        Self { entries }
    }

    /// Records a field under a string key.
    pub fn field<T: Encode>(&mut self, name: &'a str, value: &'a T) {
        self.entries.push(Pending::Key(Cow::Borrowed(name)));
        self.entries.push(Pending::Value(value));
    }

    /// Records a pair with an arbitrary (possibly structured) key.
    pub fn put(&mut self, key: &'a dyn Encode, value: &'a dyn Encode) {
        self.entries.push(Pending::Value(key));
        self.entries.push(Pending::Value(value));
    }

    /// Number of pairs recorded so far, the descriptor included.
    pub fn len(&self) -> usize {
        self.entries.len() / 2
    }

    /// Returns true if nothing was recorded.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub(crate) fn end(self) -> Vec<Pending<'a>> {
        self.entries
    }
}

impl std::fmt::Debug for Mapper<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Mapper(pairs={})", self.len())
    }
}
