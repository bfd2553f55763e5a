//! Arena storage for objects that take part in graph archiving.
//!
//! Objects that may be shared or cyclic live in an [`Arena`] and are referred
//! to by small integer handles. A handle is the object's identity: two fields
//! holding the same handle point at the same object, and a field can refer to
//! an ancestor without owning it.

use std::any::TypeId;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::marker::PhantomData;

use crate::error::{GraphcodeError, Result};
use crate::object::{ErasedObject, Object};

/// A typed, non-owning reference to an object stored in an [`Arena`].
pub struct Handle<T> {
    index: usize,
    _marker: PhantomData<fn() -> T>,
}

impl<T> Handle<T> {
    pub(crate) fn new(index: usize) -> Self {
        Self {
            index,
            _marker: PhantomData,
        }
    }

    /// Returns the raw arena index.
    pub fn index(&self) -> usize {
        self.index
    }
}

impl<T: Object> Handle<T> {
    /// Forgets the static type, for storage in polymorphic slots.
    pub fn erase(self) -> ObjectRef {
        ObjectRef {
            index: self.index,
            type_id: TypeId::of::<T>(),
        }
    }
}

// Manual impls avoid the `T: Clone`/`T: PartialEq` bounds a derive would add.
impl<T> Clone for Handle<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for Handle<T> {}

impl<T> PartialEq for Handle<T> {
    fn eq(&self, other: &Self) -> bool {
        self.index == other.index
    }
}

impl<T> Eq for Handle<T> {}

impl<T> Hash for Handle<T> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.index.hash(state);
    }
}

impl<T> fmt::Debug for Handle<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Handle({})", self.index)
    }
}

/// A type-erased handle, used where the concrete type is only known at runtime.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct ObjectRef {
    index: usize,
    type_id: TypeId,
}

impl ObjectRef {
    /// Returns the raw arena index.
    pub fn index(&self) -> usize {
        self.index
    }

    /// Returns true if the referenced object is a `T`.
    pub fn is<T: Object>(&self) -> bool {
        self.type_id == TypeId::of::<T>()
    }

    /// Recovers the typed handle if the referenced object is a `T`.
    pub fn downcast<T: Object>(self) -> Option<Handle<T>> {
        self.is::<T>().then(|| Handle::new(self.index))
    }
}

impl fmt::Debug for ObjectRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ObjectRef({})", self.index)
    }
}

struct Entry {
    type_id: TypeId,
    type_name: &'static str,
    /// `None` while the object is checked out for population.
    object: Option<Box<dyn ErasedObject>>,
}

/// Owner of every graph object.
///
/// Handles are never invalidated: objects are only appended.
#[derive(Default)]
pub struct Arena {
    entries: Vec<Entry>,
}

impl Arena {
    /// Creates an empty arena.
    pub fn new() -> Self {
        Self::default()
    }

    /// Moves `object` into the arena and returns its handle.
    pub fn insert<T: Object>(&mut self, object: T) -> Handle<T> {
        let object_ref = self.insert_boxed(
            TypeId::of::<T>(),
            std::any::type_name::<T>(),
            Box::new(object),
        );
        Handle::new(object_ref.index)
    }

    pub(crate) fn insert_boxed(
        &mut self,
        type_id: TypeId,
        type_name: &'static str,
        object: Box<dyn ErasedObject>,
    ) -> ObjectRef {
        let index = self.entries.len();
        self.entries.push(Entry {
            type_id,
            type_name,
            object: Some(object),
        });
        ObjectRef { index, type_id }
    }

    /// Borrows the object behind `handle`.
    pub fn get<T: Object>(&self, handle: Handle<T>) -> Option<&T> {
        self.entries
            .get(handle.index)?
            .object
            .as_deref()?
            .as_any()
            .downcast_ref::<T>()
    }

    /// Mutably borrows the object behind `handle`.
    pub fn get_mut<T: Object>(&mut self, handle: Handle<T>) -> Option<&mut T> {
        self.entries
            .get_mut(handle.index)?
            .object
            .as_deref_mut()?
            .as_any_mut()
            .downcast_mut::<T>()
    }

    /// Borrows the object behind an erased handle.
    pub fn get_dyn(&self, object: ObjectRef) -> Option<&dyn ErasedObject> {
        self.entries.get(object.index)?.object.as_deref()
    }

    /// Borrows the object behind an erased handle as a concrete type.
    pub fn get_as<T: Object>(&self, object: ObjectRef) -> Option<&T> {
        self.get(object.downcast::<T>()?)
    }

    /// Returns the erased handle for the object stored at `index`.
    pub fn object_ref(&self, index: usize) -> Option<ObjectRef> {
        let entry = self.entries.get(index)?;
        Some(ObjectRef {
            index,
            type_id: entry.type_id,
        })
    }

    /// Rust type name of the object stored at `object`.
    pub fn type_name(&self, object: ObjectRef) -> Option<&'static str> {
        self.entries.get(object.index).map(|e| e.type_name)
    }

    /// Checks an object out so it can be populated while the arena keeps growing.
    pub(crate) fn take(&mut self, object: ObjectRef) -> Result<Box<dyn ErasedObject>> {
        self.entries
            .get_mut(object.index)
            .and_then(|e| e.object.take())
            .ok_or_else(|| {
                GraphcodeError::Internal(format!("{object:?} is missing or already checked out"))
            })
    }

    pub(crate) fn restore(&mut self, object: ObjectRef, value: Box<dyn ErasedObject>) -> Result<()> {
        let entry = self.entries.get_mut(object.index).ok_or_else(|| {
            GraphcodeError::Internal(format!("{object:?} does not exist in this arena"))
        })?;
        entry.object = Some(value);
        Ok(())
    }

    /// Number of objects stored.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if no object was inserted.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterates over the erased handles of all stored objects, in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = ObjectRef> + '_ {
        self.entries
            .iter()
            .enumerate()
            .map(|(index, e)| ObjectRef {
                index,
                type_id: e.type_id,
            })
    }
}

impl fmt::Debug for Arena {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list()
            .entries(self.entries.iter().map(|e| e.type_name))
            .finish()
    }
}
