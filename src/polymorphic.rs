//! Values stored through interface-typed slots.
//!
//! An [`ObjectRef`] covers the case where every candidate is an arena
//! object. [`Polymorphic`] also admits value-typed records, boxed behind
//! [`BoxedRecord`], so one heterogeneous sequence can mix both kinds.

use std::any::Any;
use std::borrow::Cow;
use std::fmt;

use crate::arena::{Handle, ObjectRef};
use crate::error::{GraphcodeError, Result};
use crate::object::{Decode, Encode, Encoding, ErasedRecord, Object, Record};
use crate::reader::{Decoder, SlotNode};

/// A record whose concrete type is only known at runtime.
pub struct BoxedRecord(Box<dyn ErasedRecord>);

impl BoxedRecord {
    /// Boxes `record`.
    pub fn new<T: Record + 'static>(record: T) -> Self {
        Self(Box::new(record))
    }

    /// Returns true if the boxed record is a `T`.
    pub fn is<T: Any>(&self) -> bool {
        self.0.as_any().is::<T>()
    }

    /// Borrows the record as a `T`.
    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        self.0.as_any().downcast_ref::<T>()
    }

    /// Mutably borrows the record as a `T`.
    pub fn downcast_mut<T: Any>(&mut self) -> Option<&mut T> {
        self.0.as_any_mut().downcast_mut::<T>()
    }

    /// Unboxes the record if it is a `T`.
    pub fn downcast<T: Any>(self) -> Option<T> {
        self.0.into_any().downcast::<T>().ok().map(|record| *record)
    }

    /// The type identifier of the concrete type.
    pub fn type_identifier(&self) -> Option<Cow<'static, str>> {
        self.0.dyn_type_identifier()
    }

    /// Rust type name of the concrete type.
    pub fn type_name(&self) -> &'static str {
        self.0.dyn_type_name()
    }
}

impl fmt::Debug for BoxedRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "BoxedRecord({})", self.type_name())
    }
}

impl Encode for BoxedRecord {
    fn encoding(&self) -> Result<Encoding<'_>> {
        let type_identifier = self
            .type_identifier()
            .ok_or_else(|| GraphcodeError::UnidentifiableType(self.type_name().to_owned()))?;
        Ok(Encoding::Record {
            fields: self.0.as_fields(),
            type_identifier: Some(type_identifier),
        })
    }
}

/// An interface-typed slot: either an arena object or a boxed record.
///
/// Decoding resolves the `"@type"` descriptor against the registry and
/// produces whichever kind the identifier was registered as.
#[derive(Debug)]
pub enum Polymorphic {
    /// A two-phase arena object.
    Object(ObjectRef),
    /// A single-phase record.
    Record(BoxedRecord),
}

impl Polymorphic {
    /// Wraps a record.
    pub fn record<T: Record + 'static>(record: T) -> Self {
        Self::Record(BoxedRecord::new(record))
    }

    /// The erased handle, if this is an object.
    pub fn as_object(&self) -> Option<ObjectRef> {
        match self {
            Self::Object(object) => Some(*object),
            Self::Record(_) => None,
        }
    }

    /// The boxed record, if this is a record.
    pub fn as_record(&self) -> Option<&BoxedRecord> {
        match self {
            Self::Object(_) => None,
            Self::Record(record) => Some(record),
        }
    }

    /// Borrows the record as a `T`, if this is a `T` record.
    pub fn record_ref<T: Any>(&self) -> Option<&T> {
        self.as_record()?.downcast_ref::<T>()
    }
}

impl From<ObjectRef> for Polymorphic {
    fn from(object: ObjectRef) -> Self {
        Self::Object(object)
    }
}

impl<T: Object> From<Handle<T>> for Polymorphic {
    fn from(handle: Handle<T>) -> Self {
        Self::Object(handle.erase())
    }
}

impl From<BoxedRecord> for Polymorphic {
    fn from(record: BoxedRecord) -> Self {
        Self::Record(record)
    }
}

impl Encode for Polymorphic {
    fn encoding(&self) -> Result<Encoding<'_>> {
        match self {
            Self::Object(object) => object.encoding(),
            Self::Record(record) => record.encoding(),
        }
    }
}

impl Decode for Polymorphic {
    fn decode<'t>(node: SlotNode<'t>, decoder: &mut Decoder<'t>) -> Result<Self> {
        decoder.decode_any(node)
    }
}
