//! [`Encode`] and [`Decode`] for the standard library types.
//!
//! Scalars map onto their wire kind, collections onto sequences and
//! mappings, and arena handles onto objects. Wrapper types (`Option`,
//! `Box`, references) are transparent.

use std::collections::{BTreeMap, HashMap, VecDeque};
use std::hash::{BuildHasher, Hash};

use bytes::Bytes;

use crate::arena::{Handle, ObjectRef};
use crate::error::{GraphcodeError, Result};
use crate::format;
use crate::object::{Decode, Encode, Encoding, Object};
use crate::reader::{Decoder, SlotNode};
use crate::value::{Float, Value, INTEGER_MAX, INTEGER_MIN};

fn integer(n: i128, ty: &str) -> Result<Encoding<'static>> {
    if (INTEGER_MIN..=INTEGER_MAX).contains(&n) {
        Ok(Encoding::Scalar(Value::Integer(n)))
    } else {
        Err(GraphcodeError::UnsupportedValue(format!(
            "{ty} value {n} is outside the encodable integer range"
        )))
    }
}

macro_rules! impl_integer {
    ($($t:ty),*) => {
        $(
            impl Encode for $t {
                fn encoding(&self) -> Result<Encoding<'_>> {
                    let n = i128::try_from(*self).map_err(|_| {
                        GraphcodeError::UnsupportedValue(format!(
                            "{} value {} is outside the encodable integer range",
                            stringify!($t),
                            self
                        ))
                    })?;
                    integer(n, stringify!($t))
                }
            }

            impl Decode for $t {
                fn decode<'t>(node: SlotNode<'t>, _decoder: &mut Decoder<'t>) -> Result<Self> {
                    match node.value() {
                        Value::Integer(n) => <$t>::try_from(*n).map_err(|_| {
                            GraphcodeError::mismatch(stringify!($t), format!("integer {n}"))
                        }),
                        _ => Err(node.mismatch(stringify!($t))),
                    }
                }
            }
        )*
    };
}

impl_integer!(i8, i16, i32, i64, i128, isize, u8, u16, u32, u64, u128, usize);

impl Encode for bool {
    fn encoding(&self) -> Result<Encoding<'_>> {
        Ok(Encoding::Scalar(Value::Boolean(*self)))
    }
}

impl Decode for bool {
    fn decode<'t>(node: SlotNode<'t>, _decoder: &mut Decoder<'t>) -> Result<Self> {
        match node.value() {
            Value::Boolean(b) => Ok(*b),
            _ => Err(node.mismatch("bool")),
        }
    }
}

impl Encode for f32 {
    fn encoding(&self) -> Result<Encoding<'_>> {
        Ok(Encoding::Scalar(Value::Float(Float::F32(*self))))
    }
}

impl Decode for f32 {
    fn decode<'t>(node: SlotNode<'t>, _decoder: &mut Decoder<'t>) -> Result<Self> {
        match node.value() {
            Value::Float(Float::F32(v)) => Ok(*v),
            // Narrowing is lossy but the caller asked for single precision.
            Value::Float(Float::F64(v)) => Ok(*v as f32),
            _ => Err(node.mismatch("f32")),
        }
    }
}

impl Encode for f64 {
    fn encoding(&self) -> Result<Encoding<'_>> {
        Ok(Encoding::Scalar(Value::Float(Float::F64(*self))))
    }
}

impl Decode for f64 {
    fn decode<'t>(node: SlotNode<'t>, _decoder: &mut Decoder<'t>) -> Result<Self> {
        match node.value() {
            Value::Float(float) => Ok(float.as_f64()),
            _ => Err(node.mismatch("f64")),
        }
    }
}

impl Encode for str {
    fn encoding(&self) -> Result<Encoding<'_>> {
        Ok(Encoding::Scalar(Value::String(self.to_owned())))
    }
}

impl Encode for String {
    fn encoding(&self) -> Result<Encoding<'_>> {
        self.as_str().encoding()
    }
}

impl Decode for String {
    fn decode<'t>(node: SlotNode<'t>, _decoder: &mut Decoder<'t>) -> Result<Self> {
        node.value()
            .as_str()
            .map(str::to_owned)
            .ok_or_else(|| node.mismatch("string"))
    }
}

impl Encode for Bytes {
    fn encoding(&self) -> Result<Encoding<'_>> {
        Ok(Encoding::Scalar(Value::Bytes(self.clone())))
    }
}

impl Decode for Bytes {
    fn decode<'t>(node: SlotNode<'t>, _decoder: &mut Decoder<'t>) -> Result<Self> {
        match node.value() {
            Value::Bytes(bytes) => Ok(bytes.clone()),
            _ => Err(node.mismatch("bytes")),
        }
    }
}

impl Encode for () {
    fn encoding(&self) -> Result<Encoding<'_>> {
        Ok(Encoding::Scalar(Value::Nil))
    }
}

impl Decode for () {
    fn decode<'t>(node: SlotNode<'t>, _decoder: &mut Decoder<'t>) -> Result<Self> {
        match node.value() {
            Value::Nil => Ok(()),
            _ => Err(node.mismatch("nil")),
        }
    }
}

// --- Raw values ---

impl Encode for Value {
    fn encoding(&self) -> Result<Encoding<'_>> {
        match self {
            Value::Sequence(items) => Ok(Encoding::Sequence(
                items.iter().map(|item| item as &dyn Encode).collect(),
            )),
            Value::Mapping(pairs) => Ok(Encoding::Map(
                pairs
                    .iter()
                    .map(|(k, v)| (k as &dyn Encode, v as &dyn Encode))
                    .collect(),
            )),
            Value::Reference(n) => Err(GraphcodeError::UnsupportedValue(format!(
                "a raw Reference({n}) has no meaning outside a decoded table"
            ))),
            scalar => Ok(Encoding::Scalar(scalar.clone())),
        }
    }
}

impl Decode for Value {
    /// Resolves every reference, producing a self-contained tree.
    ///
    /// A cyclic subgraph has no tree form and fails with
    /// [`GraphcodeError::DepthLimitExceeded`].
    fn decode<'t>(node: SlotNode<'t>, decoder: &mut Decoder<'t>) -> Result<Self> {
        decoder.decode_value(node)
    }
}

// --- Transparent wrappers ---

impl<T: Encode + ?Sized> Encode for &T {
    fn encoding(&self) -> Result<Encoding<'_>> {
        (**self).encoding()
    }
}

impl<T: Encode + ?Sized> Encode for Box<T> {
    fn encoding(&self) -> Result<Encoding<'_>> {
        (**self).encoding()
    }
}

impl<T: Decode> Decode for Box<T> {
    fn decode<'t>(node: SlotNode<'t>, decoder: &mut Decoder<'t>) -> Result<Self> {
        T::decode(node, decoder).map(Box::new)
    }
}

/// `None` is `Nil`. A `Some` whose content is itself `Nil` would read back as
/// `None`, so it is rejected.
impl<T: Encode> Encode for Option<T> {
    fn encoding(&self) -> Result<Encoding<'_>> {
        match self {
            Some(value) => match value.encoding()? {
                Encoding::Scalar(Value::Nil) => Err(GraphcodeError::UnsupportedValue(format!(
                    "Some({}) encodes as nil and cannot be told apart from None",
                    std::any::type_name::<T>()
                ))),
                encoding => Ok(encoding),
            },
            None => Ok(Encoding::Scalar(Value::Nil)),
        }
    }
}

impl<T: Decode> Decode for Option<T> {
    fn decode<'t>(node: SlotNode<'t>, decoder: &mut Decoder<'t>) -> Result<Self> {
        match node.value() {
            Value::Nil => Ok(None),
            _ => T::decode(node, decoder).map(Some),
        }
    }
}

// --- Sequences ---

impl<T: Encode> Encode for [T] {
    fn encoding(&self) -> Result<Encoding<'_>> {
        Ok(Encoding::Sequence(
            self.iter().map(|item| item as &dyn Encode).collect(),
        ))
    }
}

impl<T: Encode, const N: usize> Encode for [T; N] {
    fn encoding(&self) -> Result<Encoding<'_>> {
        self.as_slice().encoding()
    }
}

impl<T: Encode> Encode for Vec<T> {
    fn encoding(&self) -> Result<Encoding<'_>> {
        self.as_slice().encoding()
    }
}

impl<T: Decode> Decode for Vec<T> {
    fn decode<'t>(node: SlotNode<'t>, decoder: &mut Decoder<'t>) -> Result<Self> {
        node.sequence()?
            .iter()
            .map(|item| decoder.decode(item))
            .collect()
    }
}

impl<T: Encode> Encode for VecDeque<T> {
    fn encoding(&self) -> Result<Encoding<'_>> {
        Ok(Encoding::Sequence(
            self.iter().map(|item| item as &dyn Encode).collect(),
        ))
    }
}

impl<T: Decode> Decode for VecDeque<T> {
    fn decode<'t>(node: SlotNode<'t>, decoder: &mut Decoder<'t>) -> Result<Self> {
        node.sequence()?
            .iter()
            .map(|item| decoder.decode(item))
            .collect()
    }
}

// --- Mappings ---

/// Entries are sorted by the wire bytes of their keys when every key is a
/// scalar, so equal maps encode identically whatever their hasher state.
/// Structured keys keep iteration order.
impl<K: Encode, V: Encode, S> Encode for HashMap<K, V, S> {
    fn encoding(&self) -> Result<Encoding<'_>> {
        let mut entries = Vec::with_capacity(self.len());
        for (k, v) in self {
            let sort_key = match k.encoding()? {
                Encoding::Scalar(value) => Some(format::to_bytes(&value)?),
                _ => None,
            };
            entries.push((sort_key, k as &dyn Encode, v as &dyn Encode));
        }
        if entries.iter().all(|(sort_key, ..)| sort_key.is_some()) {
            entries.sort_by(|a, b| a.0.cmp(&b.0));
        }
        Ok(Encoding::Map(
            entries.into_iter().map(|(_, k, v)| (k, v)).collect(),
        ))
    }
}

impl<K, V, S> Decode for HashMap<K, V, S>
where
    K: Decode + Eq + Hash,
    V: Decode,
    S: BuildHasher + Default,
{
    fn decode<'t>(node: SlotNode<'t>, decoder: &mut Decoder<'t>) -> Result<Self> {
        node.mapping()?
            .iter()
            .map(|(k, v)| Ok((decoder.decode(k)?, decoder.decode(v)?)))
            .collect()
    }
}

impl<K: Encode, V: Encode> Encode for BTreeMap<K, V> {
    fn encoding(&self) -> Result<Encoding<'_>> {
        Ok(Encoding::Map(
            self.iter()
                .map(|(k, v)| (k as &dyn Encode, v as &dyn Encode))
                .collect(),
        ))
    }
}

impl<K: Decode + Ord, V: Decode> Decode for BTreeMap<K, V> {
    fn decode<'t>(node: SlotNode<'t>, decoder: &mut Decoder<'t>) -> Result<Self> {
        node.mapping()?
            .iter()
            .map(|(k, v)| Ok((decoder.decode(k)?, decoder.decode(v)?)))
            .collect()
    }
}

// --- Arena handles ---

impl<T: Object> Encode for Handle<T> {
    fn encoding(&self) -> Result<Encoding<'_>> {
        Ok(Encoding::Object {
            object: self.erase(),
            polymorphic: false,
        })
    }
}

impl<T: Object> Decode for Handle<T> {
    fn decode<'t>(node: SlotNode<'t>, decoder: &mut Decoder<'t>) -> Result<Self> {
        decoder.decode_object::<T>(node)
    }
}

impl Encode for ObjectRef {
    fn encoding(&self) -> Result<Encoding<'_>> {
        Ok(Encoding::Object {
            object: *self,
            polymorphic: true,
        })
    }
}

impl Decode for ObjectRef {
    fn decode<'t>(node: SlotNode<'t>, decoder: &mut Decoder<'t>) -> Result<Self> {
        decoder.decode_polymorphic(node)
    }
}
