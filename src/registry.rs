//! The registry of concrete types available to polymorphic slots.

use std::borrow::Cow;
use std::collections::HashMap;

use crate::error::{GraphcodeError, Result};
use crate::object::{Factory, Object, ObjectFactory, Record, RecordFactory};

/// Maps type identifiers to the factories of their concrete types.
///
/// A registry is the `candidateTypes` argument of a deserialize call: any
/// polymorphic slot whose descriptor is not registered fails to decode.
/// Objects and records share one identifier namespace.
#[derive(Debug, Default, Clone)]
pub struct TypeRegistry {
    entries: HashMap<String, Factory>,
}

impl TypeRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers the object type `T` under its type identifier.
    ///
    /// Registering the same type twice is a no-op. A type without an
    /// identifier, or a different type claiming an identifier that is already
    /// taken, is rejected.
    pub fn register<T: Object>(&mut self) -> Result<&mut Self> {
        let identifier = T::type_identifier();
        self.insert::<T>(identifier, Factory::Object(ObjectFactory::of::<T>()))
    }

    /// Registers the record type `T` under its type identifier.
    ///
    /// Same rules as [`TypeRegistry::register`].
    pub fn register_record<T: Record + 'static>(&mut self) -> Result<&mut Self> {
        let identifier = T::type_identifier();
        self.insert::<T>(identifier, Factory::Record(RecordFactory::of::<T>()))
    }

    fn insert<T>(
        &mut self,
        identifier: Option<Cow<'static, str>>,
        factory: Factory,
    ) -> Result<&mut Self> {
        let identifier = identifier
            .ok_or_else(|| {
                GraphcodeError::UnidentifiableType(std::any::type_name::<T>().to_owned())
            })?
            .into_owned();

        if let Some(existing) = self.entries.get(&identifier) {
            if existing.type_id() != factory.type_id() {
                return Err(GraphcodeError::DuplicateTypeIdentifier {
                    identifier,
                    existing: existing.type_name().to_owned(),
                });
            }
            return Ok(self);
        }
        self.entries.insert(identifier, factory);
        Ok(self)
    }

    /// Builder-style variant of [`TypeRegistry::register`].
    pub fn with<T: Object>(mut self) -> Result<Self> {
        self.register::<T>()?;
        Ok(self)
    }

    /// Builder-style variant of [`TypeRegistry::register_record`].
    pub fn with_record<T: Record + 'static>(mut self) -> Result<Self> {
        self.register_record::<T>()?;
        Ok(self)
    }

    /// Looks up the factory for a type descriptor.
    pub fn lookup(&self, identifier: &str) -> Result<&Factory> {
        self.entries
            .get(identifier)
            .ok_or_else(|| GraphcodeError::UnknownTypeIdentifier(identifier.to_owned()))
    }

    /// Returns true if `identifier` is registered.
    pub fn contains(&self, identifier: &str) -> bool {
        self.entries.contains_key(identifier)
    }

    /// Number of registered types.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if nothing is registered.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterates over the registered identifiers, in no particular order.
    pub fn identifiers(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }
}
