//! The Read-Side Engine.
//!
//! [`GraphReader`] parses a byte source into the slot table. [`Decoder`]
//! reconstructs values from that table on demand: nothing is materialized
//! until the root, or a field of an object being populated, asks for it.
//!
//! Arena objects are rebuilt in two phases. The shell is inserted into the
//! arena and cached under its reference number before any field is resolved,
//! so a field that leads back to the object (directly or through a cycle of
//! other objects) receives the same handle instead of a duplicate.
//!
//! Population is queued rather than nested: decoding a handle only creates
//! the shell, and [`Decoder::populate_pending`] fills the queued shells one
//! after another. A chain of objects therefore costs queue entries, not call
//! stack frames.

use std::any::type_name;
use std::collections::{HashMap, VecDeque};
use std::fs::File;
use std::path::Path;

use memmap2::Mmap;
use tracing::{debug, trace};

use crate::arena::{Arena, Handle, ObjectRef};
use crate::config::Config;
use crate::error::{GraphcodeError, Result};
use crate::format::ValueReader;
use crate::object::{Decode, Factory, Object, ObjectFactory, Record, TYPE_KEY};
use crate::polymorphic::Polymorphic;
use crate::registry::TypeRegistry;
use crate::value::{Kind, Value};

/// The result of a deserialize call: the root value and the arena that owns
/// every object reachable from it.
#[derive(Debug)]
pub struct Decoded<T> {
    /// The decoded root.
    pub root: T,
    /// Objects materialized while decoding.
    pub arena: Arena,
}

/// A parsed stream, held as its table of slots.
#[derive(Debug, Clone)]
pub struct GraphReader {
    slots: Vec<Value>,
    byte_len: usize,
}

impl GraphReader {
    /// Parses an in-memory stream.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let mut reader = ValueReader::new(bytes);
        let mut slots = Vec::new();
        while let Some(slot) = reader.read_next()? {
            slots.push(slot);
        }
        if slots.is_empty() {
            return Err(GraphcodeError::Format("Empty input".into()));
        }
        debug!(slots = slots.len(), bytes = bytes.len(), "parsed slot table");
        Ok(Self {
            slots,
            byte_len: bytes.len(),
        })
    }

    /// Memory-maps a file and parses it.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = File::open(path)?;
        if file.metadata()?.len() == 0 {
            return Err(GraphcodeError::Format("Empty input".into()));
        }
        // Safety: Mmap is fundamentally unsafe as external processes could modify the file.
        // The mapping only lives for the duration of the parse below.
        #[allow(unsafe_code)]
        let mmap = unsafe { Mmap::map(&file)? };
        Self::from_bytes(&mmap)
    }

    /// All slots, in stream order.
    pub fn slots(&self) -> &[Value] {
        &self.slots
    }

    /// Number of slots in the stream.
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    /// Always false for a successfully parsed stream.
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Size of the parsed stream in bytes.
    pub fn byte_len(&self) -> usize {
        self.byte_len
    }

    /// Position of the root slot (always the last one).
    pub fn root_position(&self) -> u64 {
        self.slots.len().saturating_sub(1) as u64
    }

    /// Creates a decoder over this table.
    pub fn decoder<'t>(&'t self, registry: &'t TypeRegistry, config: &Config) -> Decoder<'t> {
        Decoder::new(&self.slots, registry, config)
    }

    /// Decodes the root slot as a `T`.
    pub fn decode_root<T: Decode>(
        &self,
        registry: &TypeRegistry,
        config: &Config,
    ) -> Result<Decoded<T>> {
        let mut decoder = self.decoder(registry, config);
        let node = decoder.root()?;
        let root = decoder.decode_node::<T>(node)?;
        decoder.populate_pending()?;
        debug!(
            objects = decoder.arena().len(),
            cached = decoder.cache.len(),
            "decoded root"
        );
        Ok(Decoded {
            root,
            arena: decoder.into_arena(),
        })
    }
}

/// A resolved table entry: the value plus the reference number it was
/// reached through, if any.
///
/// Inline values (container elements that are not references) have no
/// reference number and therefore no identity.
#[derive(Debug, Clone, Copy)]
pub struct SlotNode<'t> {
    value: &'t Value,
    reference: Option<u64>,
}

impl<'t> SlotNode<'t> {
    /// The resolved value.
    pub fn value(&self) -> &'t Value {
        self.value
    }

    /// The reference number this node was reached through.
    pub fn reference(&self) -> Option<u64> {
        self.reference
    }

    /// Kind of the resolved value.
    pub fn kind(&self) -> Kind {
        self.value.kind()
    }

    /// Builds the error for a decoder that expected `expected` here.
    pub fn mismatch(&self, expected: impl Into<String>) -> GraphcodeError {
        let found = match self.reference {
            Some(position) => format!("{} at slot {position}", self.kind()),
            None => self.kind().to_string(),
        };
        GraphcodeError::mismatch(expected, found)
    }

    /// The elements of a sequence.
    pub fn sequence(&self) -> Result<&'t [Value]> {
        match self.value {
            Value::Sequence(items) => Ok(items),
            _ => Err(self.mismatch("sequence")),
        }
    }

    /// The pairs of a mapping.
    pub fn mapping(&self) -> Result<&'t [(Value, Value)]> {
        match self.value {
            Value::Mapping(pairs) => Ok(pairs),
            _ => Err(self.mismatch("mapping")),
        }
    }
}

/// Reconstructs values from a slot table for a single deserialize call.
pub struct Decoder<'t> {
    table: &'t [Value],
    registry: &'t TypeRegistry,
    arena: Arena,
    /// Reference number -> object, including shells still being populated.
    cache: HashMap<u64, ObjectRef>,
    /// Shells waiting for their populate phase, in creation order.
    pending: VecDeque<(ObjectRef, &'t [(Value, Value)])>,
    depth: usize,
    max_depth: usize,
}

impl<'t> Decoder<'t> {
    /// Creates a decoder with an empty arena and cache.
    pub fn new(table: &'t [Value], registry: &'t TypeRegistry, config: &Config) -> Self {
        Self {
            table,
            registry,
            arena: Arena::new(),
            cache: HashMap::new(),
            pending: VecDeque::new(),
            depth: 0,
            max_depth: config.max_depth,
        }
    }

    /// The slot at `position`, reached by reference.
    pub fn slot(&self, position: u64) -> Result<SlotNode<'t>> {
        let value = usize::try_from(position)
            .ok()
            .and_then(|i| self.table.get(i))
            .ok_or_else(|| {
                GraphcodeError::Format(format!(
                    "Reference {position} points outside a table of {} slots",
                    self.table.len()
                ))
            })?;
        if let Value::Reference(target) = value {
            return Err(GraphcodeError::Format(format!(
                "Slot {position} is a bare reference to {target}"
            )));
        }
        Ok(SlotNode {
            value,
            reference: Some(position),
        })
    }

    /// The root slot.
    pub fn root(&self) -> Result<SlotNode<'t>> {
        let last = self
            .table
            .len()
            .checked_sub(1)
            .ok_or_else(|| GraphcodeError::Format("Empty input".into()))?;
        self.slot(last as u64)
    }

    /// Resolves a table entry, following it if it is a reference.
    pub fn node(&self, entry: &'t Value) -> Result<SlotNode<'t>> {
        match entry {
            Value::Reference(position) => self.slot(*position),
            inline => Ok(SlotNode {
                value: inline,
                reference: None,
            }),
        }
    }

    /// Resolves and decodes a table entry.
    pub fn decode<T: Decode>(&mut self, entry: &'t Value) -> Result<T> {
        let node = self.node(entry)?;
        self.decode_node(node)
    }

    /// Decodes an already resolved node.
    pub fn decode_node<T: Decode>(&mut self, node: SlotNode<'t>) -> Result<T> {
        if self.depth >= self.max_depth {
            return Err(GraphcodeError::DepthLimitExceeded(self.max_depth));
        }
        self.depth += 1;
        let result = T::decode(node, self);
        self.depth -= 1;
        result
    }

    /// Single-phase construction of a value-typed record.
    pub fn decode_record<T: Record>(&mut self, node: SlotNode<'t>) -> Result<T> {
        let pairs = node
            .mapping()
            .map_err(|_| node.mismatch(format!("record {}", type_name::<T>())))?;
        self.check_descriptor(pairs, T::type_identifier().as_deref(), type_name::<T>())?;
        let mut fields = Fields::new(self, pairs)?;
        T::from_fields(&mut fields)
    }

    /// Two-phase construction of a statically typed object.
    ///
    /// Returns as soon as the shell exists; its fields are filled in by
    /// [`Decoder::populate_pending`].
    pub fn decode_object<T: Object>(&mut self, node: SlotNode<'t>) -> Result<Handle<T>> {
        if let Some(cached) = self.cached(node) {
            return cached.downcast::<T>().ok_or_else(|| {
                GraphcodeError::mismatch(
                    type_name::<T>(),
                    self.arena.type_name(cached).unwrap_or("unknown object"),
                )
            });
        }
        let pairs = node
            .mapping()
            .map_err(|_| node.mismatch(format!("object {}", type_name::<T>())))?;
        self.check_descriptor(pairs, T::type_identifier().as_deref(), type_name::<T>())?;
        let object = self.shell(node, pairs, ObjectFactory::of::<T>())?;
        Ok(Handle::new(object.index()))
    }

    /// Two-phase construction of an object whose type is named by its descriptor.
    pub fn decode_polymorphic(&mut self, node: SlotNode<'t>) -> Result<ObjectRef> {
        if let Some(cached) = self.cached(node) {
            return Ok(cached);
        }
        let pairs = node.mapping().map_err(|_| node.mismatch("polymorphic object"))?;
        let descriptor = self.require_descriptor(node, pairs)?;
        let registry = self.registry;
        match *registry.lookup(descriptor)? {
            Factory::Object(factory) => self.shell(node, pairs, factory),
            Factory::Record(factory) => Err(GraphcodeError::IdentifiableTypeMismatch {
                identifier: descriptor.to_owned(),
                expected: format!("an arena object (registered as record {})", factory.type_name()),
            }),
        }
    }

    /// Decodes an interface-typed slot into whichever kind its descriptor was
    /// registered as: a shelled object or a fully built record.
    pub fn decode_any(&mut self, node: SlotNode<'t>) -> Result<Polymorphic> {
        if let Some(cached) = self.cached(node) {
            return Ok(Polymorphic::Object(cached));
        }
        let pairs = node.mapping().map_err(|_| node.mismatch("polymorphic value"))?;
        let descriptor = self.require_descriptor(node, pairs)?;
        let registry = self.registry;
        match *registry.lookup(descriptor)? {
            Factory::Object(factory) => self.shell(node, pairs, factory).map(Polymorphic::Object),
            Factory::Record(factory) => (factory.decode)(node, self).map(Polymorphic::Record),
        }
    }

    /// Resolves every reference below `node` into a self-contained [`Value`] tree.
    ///
    /// Runs on an explicit stack. A cyclic subgraph has no tree form and fails
    /// with [`GraphcodeError::DepthLimitExceeded`].
    pub fn decode_value(&mut self, node: SlotNode<'t>) -> Result<Value> {
        let Some(first) = TreeFrame::open(node.value()) else {
            return leaf(node);
        };
        let mut stack = vec![first];
        loop {
            let Some(top) = stack.last_mut() else {
                return Err(GraphcodeError::Internal("value stack underflow".into()));
            };
            match top.entries.next() {
                Some(entry) => {
                    let child = self.node(entry)?;
                    match TreeFrame::open(child.value()) {
                        Some(frame) => {
                            if self.depth + stack.len() >= self.max_depth {
                                return Err(GraphcodeError::DepthLimitExceeded(self.max_depth));
                            }
                            stack.push(frame);
                        }
                        None => top.built.push(leaf(child)?),
                    }
                }
                None => {
                    let finished = stack
                        .pop()
                        .ok_or_else(|| GraphcodeError::Internal("value stack underflow".into()))?
                        .finish();
                    match stack.last_mut() {
                        Some(parent) => parent.built.push(finished),
                        None => return Ok(finished),
                    }
                }
            }
        }
    }

    /// Populates every shell created so far, including the ones created while
    /// populating.
    ///
    /// [`GraphReader::decode_root`] calls this after decoding the root. Callers
    /// driving a decoder by hand must call it before reading objects out of
    /// the arena.
    pub fn populate_pending(&mut self) -> Result<()> {
        while let Some((object, pairs)) = self.pending.pop_front() {
            let mut instance = self.arena.take(object)?;
            let populated =
                Fields::new(self, pairs).and_then(|mut fields| instance.dyn_populate(&mut fields));
            self.arena.restore(object, instance)?;
            populated?;
            trace!(object = object.index(), remaining = self.pending.len(), "populated object");
        }
        Ok(())
    }

    fn cached(&self, node: SlotNode<'t>) -> Option<ObjectRef> {
        node.reference().and_then(|r| self.cache.get(&r).copied())
    }

    fn find_descriptor(&self, pairs: &'t [(Value, Value)]) -> Result<Option<&'t str>> {
        for (key, value) in pairs {
            if self.node(key)?.value().as_str() == Some(TYPE_KEY) {
                let value = self.node(value)?;
                return value
                    .value()
                    .as_str()
                    .map(Some)
                    .ok_or_else(|| value.mismatch("string type descriptor"));
            }
        }
        Ok(None)
    }

    fn require_descriptor(
        &self,
        node: SlotNode<'t>,
        pairs: &'t [(Value, Value)],
    ) -> Result<&'t str> {
        self.find_descriptor(pairs)?.ok_or_else(|| {
            GraphcodeError::Format(format!(
                "Polymorphic value at slot {:?} carries no type descriptor",
                node.reference()
            ))
        })
    }

    /// A statically typed slot accepts a descriptor only if it names its own type.
    fn check_descriptor(
        &self,
        pairs: &'t [(Value, Value)],
        expected: Option<&str>,
        expected_type: &str,
    ) -> Result<()> {
        match (self.find_descriptor(pairs)?, expected) {
            (Some(found), Some(expected)) if found != expected => {
                Err(GraphcodeError::IdentifiableTypeMismatch {
                    identifier: found.to_owned(),
                    expected: format!("{expected_type} ('{expected}')"),
                })
            }
            _ => Ok(()),
        }
    }

    /// Shell phase: the object is visible to cyclic references from here on.
    fn shell(
        &mut self,
        node: SlotNode<'t>,
        pairs: &'t [(Value, Value)],
        factory: ObjectFactory,
    ) -> Result<ObjectRef> {
        let object =
            self.arena
                .insert_boxed(factory.type_id, factory.type_name, (factory.create_shell)());
        if let Some(reference) = node.reference() {
            self.cache.insert(reference, object);
        }
        self.pending.push_back((object, pairs));
        trace!(slot = ?node.reference(), object = object.index(), ty = factory.type_name, "created shell");
        Ok(object)
    }

    /// Registry of concrete types used for polymorphic slots.
    pub fn registry(&self) -> &'t TypeRegistry {
        self.registry
    }

    /// Objects materialized so far.
    pub fn arena(&self) -> &Arena {
        &self.arena
    }

    /// Consumes the decoder and returns its arena.
    pub fn into_arena(self) -> Arena {
        self.arena
    }
}

impl std::fmt::Debug for Decoder<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Decoder")
            .field("slots", &self.table.len())
            .field("objects", &self.arena.len())
            .field("pending", &self.pending.len())
            .field("depth", &self.depth)
            .finish()
    }
}

/// One container of a [`Value`] tree under construction.
struct TreeFrame<'t> {
    mapping: bool,
    /// Elements, or keys and values interleaved.
    entries: std::vec::IntoIter<&'t Value>,
    built: Vec<Value>,
}

impl<'t> TreeFrame<'t> {
    fn open(value: &'t Value) -> Option<Self> {
        let (mapping, entries): (bool, Vec<&'t Value>) = match value {
            Value::Sequence(items) => (false, items.iter().collect()),
            Value::Mapping(pairs) => (true, pairs.iter().flat_map(|(k, v)| [k, v]).collect()),
            _ => return None,
        };
        Some(Self {
            mapping,
            built: Vec::with_capacity(entries.len()),
            entries: entries.into_iter(),
        })
    }

    fn finish(self) -> Value {
        if !self.mapping {
            return Value::Sequence(self.built);
        }
        let mut pairs = Vec::with_capacity(self.built.len() / 2);
        let mut built = self.built.into_iter();
        while let (Some(key), Some(value)) = (built.next(), built.next()) {
            pairs.push((key, value));
        }
        Value::Mapping(pairs)
    }
}

fn leaf(node: SlotNode<'_>) -> Result<Value> {
    match node.value() {
        Value::Reference(n) => Err(GraphcodeError::Format(format!("unresolved reference {n}"))),
        scalar => Ok(scalar.clone()),
    }
}

/// Keyed access to the fields of a record or object being decoded.
///
/// Only string keys are addressable by name; the reserved type descriptor
/// key is exposed separately through [`Fields::type_descriptor`].
pub struct Fields<'d, 't> {
    decoder: &'d mut Decoder<'t>,
    named: Vec<(&'t str, &'t Value)>,
    type_descriptor: Option<&'t str>,
}

impl<'d, 't> Fields<'d, 't> {
    fn new(decoder: &'d mut Decoder<'t>, pairs: &'t [(Value, Value)]) -> Result<Self> {
        let mut named = Vec::with_capacity(pairs.len());
        let mut type_descriptor = None;
        for (key, value) in pairs {
            let Some(name) = decoder.node(key)?.value().as_str() else {
                continue;
            };
            if name == TYPE_KEY {
                type_descriptor = decoder.node(value)?.value().as_str();
            } else {
                named.push((name, value));
            }
        }
        Ok(Self {
            decoder,
            named,
            type_descriptor,
        })
    }

    fn lookup(&self, key: &str) -> Option<&'t Value> {
        self.named
            .iter()
            .find(|(name, _)| *name == key)
            .map(|(_, value)| *value)
    }

    /// Decodes a required field.
    pub fn get<T: Decode>(&mut self, key: &str) -> Result<T> {
        let entry = self
            .lookup(key)
            .ok_or_else(|| GraphcodeError::MissingField(key.to_owned()))?;
        self.decoder.decode(entry).map_err(|e| match e {
            GraphcodeError::TypeMismatch { expected, found } => GraphcodeError::TypeMismatch {
                expected: format!("{expected} for field '{key}'"),
                found,
            },
            other => other,
        })
    }

    /// Decodes a field that may be absent.
    pub fn get_optional<T: Decode>(&mut self, key: &str) -> Result<Option<T>> {
        if self.contains(key) {
            self.get(key).map(Some)
        } else {
            Ok(None)
        }
    }

    /// Decodes a field, falling back to `T::default()` when it is absent.
    pub fn get_or_default<T: Decode + Default>(&mut self, key: &str) -> Result<T> {
        Ok(self.get_optional(key)?.unwrap_or_default())
    }

    /// Returns true if a field named `key` is present.
    pub fn contains(&self, key: &str) -> bool {
        self.lookup(key).is_some()
    }

    /// Field names in stream order.
    pub fn keys(&self) -> impl Iterator<Item = &'t str> + '_ {
        self.named.iter().map(|(name, _)| *name)
    }

    /// Number of named fields.
    pub fn len(&self) -> usize {
        self.named.len()
    }

    /// Returns true if there are no named fields.
    pub fn is_empty(&self) -> bool {
        self.named.is_empty()
    }

    /// The type descriptor stored with this mapping, if any.
    pub fn type_descriptor(&self) -> Option<&'t str> {
        self.type_descriptor
    }

    /// The underlying decoder, for custom field handling.
    pub fn decoder(&mut self) -> &mut Decoder<'t> {
        &mut *self.decoder
    }
}

impl std::fmt::Debug for Fields<'_, '_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Fields")
            .field("keys", &self.named.iter().map(|(k, _)| *k).collect::<Vec<_>>())
            .field("type_descriptor", &self.type_descriptor)
            .finish()
    }
}
