//! The serializable type contract.
//!
//! Each type picks exactly one encoding strategy through [`Encode::encoding`]:
//! a scalar projection, a homogeneous collection, a value-typed record, or an
//! arena-resident object. The choice is made by the type, once, with static
//! dispatch; the encoder never inspects runtime types.
//!
//! On the decode side, records are built in a single phase from their fields
//! ([`Record::from_fields`]), while objects go through shell creation and
//! in-place population ([`Object::create_shell`], [`Object::populate`]) so
//! that cycles can point back at an object before its fields are known.

use std::any::{Any, TypeId};
use std::borrow::Cow;

use crate::arena::ObjectRef;
use crate::error::Result;
use crate::graph::Mapper;
use crate::polymorphic::BoxedRecord;
use crate::reader::{Decoder, Fields, SlotNode};
use crate::value::Value;

/// Reserved mapping key under which an object's type descriptor is stored.
pub const TYPE_KEY: &str = "@type";

/// The encoding strategy a value presents to the indexer.
pub enum Encoding<'a> {
    /// A leaf value, stored as-is in its own slot.
    Scalar(Value),
    /// A homogeneous collection of values.
    Sequence(Vec<&'a dyn Encode>),
    /// A key/value collection. Keys may be any encodable value.
    Map(Vec<(&'a dyn Encode, &'a dyn Encode)>),
    /// A value-typed composite without identity. Indexed fresh on every encounter.
    Record {
        /// Source of the record's key/value pairs.
        fields: &'a dyn EncodeFields,
        /// Written as the `"@type"` descriptor when present.
        type_identifier: Option<Cow<'static, str>>,
    },
    /// An arena-resident composite. Indexed once per identity.
    Object {
        /// The object being referenced.
        object: ObjectRef,
        /// True when the slot is interface-typed and needs a type descriptor.
        polymorphic: bool,
    },
}

/// A type that can be written into a Graphcode stream.
pub trait Encode {
    /// Selects the encoding strategy for this value.
    fn encoding(&self) -> Result<Encoding<'_>>;
}

/// A type that can be read back from a Graphcode stream.
pub trait Decode: Sized {
    /// Builds a value from a resolved slot.
    fn decode<'t>(node: SlotNode<'t>, decoder: &mut Decoder<'t>) -> Result<Self>;
}

/// Emits a composite's named fields through a [`Mapper`].
///
/// The mapper only borrows what it is given; the indexer walks the recorded
/// values after `encode_fields` returns.
pub trait EncodeFields {
    /// Records every field with [`Mapper::field`] or [`Mapper::put`].
    fn encode_fields<'a>(&'a self, mapper: &mut Mapper<'a>) -> Result<()>;
}

/// A value-typed composite, rebuilt in a single phase.
///
/// Records have no identity and cannot take part in cycles.
pub trait Record: EncodeFields + Sized {
    /// Stable identifier used for polymorphic decoding.
    ///
    /// Records stored through a [`Polymorphic`](crate::Polymorphic) slot must return `Some`.
    fn type_identifier() -> Option<Cow<'static, str>> {
        None
    }

    /// Constructs the value once all of its fields can be resolved.
    fn from_fields(fields: &mut Fields<'_, '_>) -> Result<Self>;
}

/// A reference-typed composite living in an [`Arena`](crate::Arena).
///
/// Objects are rebuilt in two phases: an empty shell is registered first so
/// that fields pointing back at the object (directly or through other
/// objects) resolve to the same handle, then its fields are populated.
pub trait Object: EncodeFields + Any {
    /// Stable identifier used for polymorphic decoding.
    ///
    /// Types stored through [`ObjectRef`] slots must return `Some`.
    fn type_identifier() -> Option<Cow<'static, str>>
    where
        Self: Sized,
    {
        None
    }

    /// Creates an empty instance to be populated later.
    fn create_shell() -> Self
    where
        Self: Sized;

    /// Writes the decoded fields into the shell.
    fn populate(&mut self, fields: &mut Fields<'_, '_>) -> Result<()>;
}

/// Object-safe view of an [`Object`], as stored inside the arena.
pub trait ErasedObject: EncodeFields + Any {
    /// The type identifier of the concrete type.
    fn dyn_type_identifier(&self) -> Option<Cow<'static, str>>;

    /// Rust type name of the concrete type, for diagnostics.
    fn dyn_type_name(&self) -> &'static str;

    /// Forwards to [`Object::populate`].
    fn dyn_populate(&mut self, fields: &mut Fields<'_, '_>) -> Result<()>;

    /// Upcast for downcasting to the concrete type.
    fn as_any(&self) -> &dyn Any;

    /// Mutable upcast for downcasting to the concrete type.
    fn as_any_mut(&mut self) -> &mut dyn Any;
}

impl<T: Object> ErasedObject for T {
    fn dyn_type_identifier(&self) -> Option<Cow<'static, str>> {
        T::type_identifier()
    }

    fn dyn_type_name(&self) -> &'static str {
        std::any::type_name::<T>()
    }

    fn dyn_populate(&mut self, fields: &mut Fields<'_, '_>) -> Result<()> {
        self.populate(fields)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

/// Object-safe view of a [`Record`], as stored inside a [`BoxedRecord`].
pub trait ErasedRecord: EncodeFields + Any {
    /// The type identifier of the concrete type.
    fn dyn_type_identifier(&self) -> Option<Cow<'static, str>>;

    /// Rust type name of the concrete type, for diagnostics.
    fn dyn_type_name(&self) -> &'static str;

    /// Upcast used when encoding.
    fn as_fields(&self) -> &dyn EncodeFields;

    /// Upcast for downcasting to the concrete type.
    fn as_any(&self) -> &dyn Any;

    /// Mutable upcast for downcasting to the concrete type.
    fn as_any_mut(&mut self) -> &mut dyn Any;

    /// Owning upcast for unboxing the concrete type.
    fn into_any(self: Box<Self>) -> Box<dyn Any>;
}

impl<T: Record + 'static> ErasedRecord for T {
    fn dyn_type_identifier(&self) -> Option<Cow<'static, str>> {
        T::type_identifier()
    }

    fn dyn_type_name(&self) -> &'static str {
        std::any::type_name::<T>()
    }

    fn as_fields(&self) -> &dyn EncodeFields {
        self
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }

    fn into_any(self: Box<Self>) -> Box<dyn Any> {
        self
    }
}

/// Shell factory for one concrete object type.
#[derive(Clone, Copy)]
pub struct ObjectFactory {
    pub(crate) type_id: TypeId,
    pub(crate) type_name: &'static str,
    pub(crate) create_shell: fn() -> Box<dyn ErasedObject>,
}

fn boxed_shell<T: Object>() -> Box<dyn ErasedObject> {
    Box::new(T::create_shell())
}

impl ObjectFactory {
    /// The factory for `T`.
    pub fn of<T: Object>() -> Self {
        Self {
            type_id: TypeId::of::<T>(),
            type_name: std::any::type_name::<T>(),
            create_shell: boxed_shell::<T>,
        }
    }

    /// Rust type name of the produced objects.
    pub fn type_name(&self) -> &'static str {
        self.type_name
    }
}

impl std::fmt::Debug for ObjectFactory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "ObjectFactory({})", self.type_name)
    }
}

/// Single-phase decoder for one concrete record type.
#[derive(Clone, Copy)]
pub struct RecordFactory {
    pub(crate) type_id: TypeId,
    pub(crate) type_name: &'static str,
    pub(crate) decode: for<'t> fn(SlotNode<'t>, &mut Decoder<'t>) -> Result<BoxedRecord>,
}

fn boxed_record<'t, T: Record + 'static>(
    node: SlotNode<'t>,
    decoder: &mut Decoder<'t>,
) -> Result<BoxedRecord> {
    decoder.decode_record::<T>(node).map(BoxedRecord::new)
}

impl RecordFactory {
    /// The factory for `T`.
    pub fn of<T: Record + 'static>() -> Self {
        Self {
            type_id: TypeId::of::<T>(),
            type_name: std::any::type_name::<T>(),
            decode: boxed_record::<T>,
        }
    }

    /// Rust type name of the produced records.
    pub fn type_name(&self) -> &'static str {
        self.type_name
    }
}

impl std::fmt::Debug for RecordFactory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "RecordFactory({})", self.type_name)
    }
}

/// What a registered type identifier resolves to.
#[derive(Debug, Clone, Copy)]
pub enum Factory {
    /// A two-phase arena object.
    Object(ObjectFactory),
    /// A single-phase record.
    Record(RecordFactory),
}

impl Factory {
    pub(crate) fn type_id(&self) -> TypeId {
        match self {
            Self::Object(f) => f.type_id,
            Self::Record(f) => f.type_id,
        }
    }

    /// Rust type name of the registered type.
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Object(f) => f.type_name,
            Self::Record(f) => f.type_name,
        }
    }
}
