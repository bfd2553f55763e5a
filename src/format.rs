//! Defines the physical binary layout of a Graphcode stream.
//!
//! # Layout
//! A stream is a plain concatenation of slots. Each slot is one tagged
//! [`Value`]; the root object is always the last slot.
//!
//! Stream: `[Slot 0] [Slot 1] ... [Root Slot]`
//!
//! ## Value Anatomy
//! `[Tag(1)] [Payload]`
//!
//! | Tag | Payload |
//! |-----|---------|
//! | `Nil`, `False`, `True` | none |
//! | `Integer` | zig-zag varint (`i128`) |
//! | `F32` / `F64` | 4 / 8 bytes little endian |
//! | `String` / `Bytes` | varint length + raw bytes |
//! | `Sequence` | varint count + `count` values |
//! | `Mapping` | varint pair count + interleaved key/value values |
//! | `Reference` | varint slot position |
//!
//! Varints use bincode's standard configuration: values below 251 take a
//! single byte, larger values a marker byte followed by a fixed-width
//! little-endian integer. Small reference numbers are therefore the cheapest.

use std::io::Write;

use bytes::Bytes;
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::{GraphcodeError, Result};
use crate::value::{Float, Value, INTEGER_MAX, INTEGER_MIN};

/// Nesting limit for inline containers while reading.
pub const MAX_INLINE_DEPTH: usize = 256;

/// Wire tag, stored as the first byte of every value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum Tag {
    /// `Value::Nil`
    Nil = 0x00,
    /// `Value::Boolean(false)`
    False = 0x01,
    /// `Value::Boolean(true)`
    True = 0x02,
    /// `Value::Integer`
    Integer = 0x03,
    /// `Value::Float(Float::F32)`
    F32 = 0x04,
    /// `Value::Float(Float::F64)`
    F64 = 0x05,
    /// `Value::String`
    String = 0x06,
    /// `Value::Bytes`
    Bytes = 0x07,
    /// `Value::Sequence`
    Sequence = 0x08,
    /// `Value::Mapping`
    Mapping = 0x09,
    /// `Value::Reference`
    Reference = 0x0A,
}

impl Tag {
    /// Decodes a tag byte.
    pub fn from_byte(byte: u8) -> Result<Self> {
        Ok(match byte {
            0x00 => Self::Nil,
            0x01 => Self::False,
            0x02 => Self::True,
            0x03 => Self::Integer,
            0x04 => Self::F32,
            0x05 => Self::F64,
            0x06 => Self::String,
            0x07 => Self::Bytes,
            0x08 => Self::Sequence,
            0x09 => Self::Mapping,
            0x0A => Self::Reference,
            other => {
                return Err(GraphcodeError::Format(format!(
                    "Invalid tag byte 0x{other:02x}"
                )))
            }
        })
    }

    /// Returns the raw byte representation.
    pub fn as_u8(self) -> u8 {
        self as u8
    }

    /// The tag a value is written with.
    pub fn of(value: &Value) -> Self {
        match value {
            Value::Nil => Self::Nil,
            Value::Boolean(false) => Self::False,
            Value::Boolean(true) => Self::True,
            Value::Integer(_) => Self::Integer,
            Value::Float(Float::F32(_)) => Self::F32,
            Value::Float(Float::F64(_)) => Self::F64,
            Value::String(_) => Self::String,
            Value::Bytes(_) => Self::Bytes,
            Value::Sequence(_) => Self::Sequence,
            Value::Mapping(_) => Self::Mapping,
            Value::Reference(_) => Self::Reference,
        }
    }
}

fn encode_varint<T: Serialize, W: Write>(value: T, writer: &mut W) -> Result<usize> {
    bincode::serde::encode_into_std_write(value, writer, bincode::config::standard())
        .map_err(|e| match e {
            bincode::error::EncodeError::Io { inner, .. } => GraphcodeError::from(inner),
            other => GraphcodeError::Internal(format!("varint encoding failed: {other}")),
        })
}

fn len_u64(len: usize) -> Result<u64> {
    u64::try_from(len).map_err(|_| GraphcodeError::Internal(format!("length {len} overflows u64")))
}

/// Writes one value (recursively, for inline containers).
///
/// Returns the number of bytes appended to `writer`.
pub fn write_value<W: Write>(writer: &mut W, value: &Value) -> Result<usize> {
    writer.write_all(&[Tag::of(value).as_u8()])?;
    let mut written = 1;
    match value {
        Value::Nil | Value::Boolean(_) => {}
        Value::Integer(n) => {
            if !(INTEGER_MIN..=INTEGER_MAX).contains(n) {
                return Err(GraphcodeError::UnsupportedValue(format!(
                    "integer {n} is outside the wire range"
                )));
            }
            written += encode_varint(*n, writer)?;
        }
        Value::Float(Float::F32(f)) => {
            writer.write_all(&f.to_le_bytes())?;
            written += 4;
        }
        Value::Float(Float::F64(f)) => {
            writer.write_all(&f.to_le_bytes())?;
            written += 8;
        }
        Value::String(s) => {
            written += encode_varint(len_u64(s.len())?, writer)?;
            writer.write_all(s.as_bytes())?;
            written += s.len();
        }
        Value::Bytes(b) => {
            written += encode_varint(len_u64(b.len())?, writer)?;
            writer.write_all(b)?;
            written += b.len();
        }
        Value::Sequence(items) => {
            written += encode_varint(len_u64(items.len())?, writer)?;
            for item in items {
                written += write_value(writer, item)?;
            }
        }
        Value::Mapping(pairs) => {
            written += encode_varint(len_u64(pairs.len())?, writer)?;
            for (key, val) in pairs {
                written += write_value(writer, key)?;
                written += write_value(writer, val)?;
            }
        }
        Value::Reference(n) => {
            written += encode_varint(*n, writer)?;
        }
    }
    Ok(written)
}

/// Sequential reader over an in-memory stream.
///
/// Mirrors the codec's `readNext(source)` contract: [`ValueReader::read_next`]
/// yields `Ok(None)` once the source is exhausted at a value boundary.
#[derive(Debug, Clone)]
pub struct ValueReader<'a> {
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> ValueReader<'a> {
    /// Creates a reader positioned at the start of `bytes`.
    pub fn new(bytes: &'a [u8]) -> Self {
        Self { bytes, pos: 0 }
    }

    /// Current byte offset.
    pub fn position(&self) -> usize {
        self.pos
    }

    /// Returns true once every byte has been consumed.
    pub fn is_exhausted(&self) -> bool {
        self.pos >= self.bytes.len()
    }

    /// Reads the next top-level value, or `None` at end of input.
    pub fn read_next(&mut self) -> Result<Option<Value>> {
        if self.is_exhausted() {
            return Ok(None);
        }
        self.read_value(0).map(Some)
    }

    fn remaining(&self) -> usize {
        self.bytes.len().saturating_sub(self.pos)
    }

    fn take(&mut self, len: usize) -> Result<&'a [u8]> {
        let end = self
            .pos
            .checked_add(len)
            .filter(|end| *end <= self.bytes.len())
            .ok_or_else(|| {
                GraphcodeError::Format(format!(
                    "Truncated stream: need {len} bytes at offset {}, have {}",
                    self.pos,
                    self.remaining()
                ))
            })?;
        let slice = &self.bytes[self.pos..end];
        self.pos = end;
        Ok(slice)
    }

    fn decode_varint<T: DeserializeOwned>(&mut self) -> Result<T> {
        let (value, consumed) = bincode::serde::decode_from_slice::<T, _>(
            &self.bytes[self.pos..],
            bincode::config::standard(),
        )
        .map_err(|e| {
            GraphcodeError::Format(format!("Invalid varint at offset {}: {e}", self.pos))
        })?;
        self.pos += consumed;
        Ok(value)
    }

    fn read_len(&mut self) -> Result<usize> {
        let len: u64 = self.decode_varint()?;
        usize::try_from(len)
            .map_err(|_| GraphcodeError::Format(format!("Length {len} does not fit in memory")))
    }

    fn read_value(&mut self, depth: usize) -> Result<Value> {
        if depth > MAX_INLINE_DEPTH {
            return Err(GraphcodeError::Format(format!(
                "Inline nesting deeper than {MAX_INLINE_DEPTH} at offset {}",
                self.pos
            )));
        }
        let tag = Tag::from_byte(self.take(1)?[0])?;
        let value = match tag {
            Tag::Nil => Value::Nil,
            Tag::False => Value::Boolean(false),
            Tag::True => Value::Boolean(true),
            Tag::Integer => {
                let n: i128 = self.decode_varint()?;
                if !(INTEGER_MIN..=INTEGER_MAX).contains(&n) {
                    return Err(GraphcodeError::Format(format!(
                        "Integer {n} outside the wire range"
                    )));
                }
                Value::Integer(n)
            }
            Tag::F32 => {
                let raw = self.take(4)?;
                let mut buf = [0u8; 4];
                buf.copy_from_slice(raw);
                Value::Float(Float::F32(f32::from_le_bytes(buf)))
            }
            Tag::F64 => {
                let raw = self.take(8)?;
                let mut buf = [0u8; 8];
                buf.copy_from_slice(raw);
                Value::Float(Float::F64(f64::from_le_bytes(buf)))
            }
            Tag::String => {
                let len = self.read_len()?;
                let start = self.pos;
                let raw = self.take(len)?;
                let s = std::str::from_utf8(raw).map_err(|e| {
                    GraphcodeError::Format(format!("Invalid UTF-8 in string at offset {start}: {e}"))
                })?;
                Value::String(s.to_owned())
            }
            Tag::Bytes => {
                let len = self.read_len()?;
                Value::Bytes(Bytes::copy_from_slice(self.take(len)?))
            }
            Tag::Sequence => {
                let count = self.read_len()?;
                // Every element takes at least one byte.
                let mut items = Vec::with_capacity(count.min(self.remaining()));
                for _ in 0..count {
                    items.push(self.read_value(depth + 1)?);
                }
                Value::Sequence(items)
            }
            Tag::Mapping => {
                let count = self.read_len()?;
                let mut pairs = Vec::with_capacity(count.min(self.remaining() / 2));
                for _ in 0..count {
                    let key = self.read_value(depth + 1)?;
                    let val = self.read_value(depth + 1)?;
                    pairs.push((key, val));
                }
                Value::Mapping(pairs)
            }
            Tag::Reference => Value::Reference(self.decode_varint()?),
        };
        Ok(value)
    }
}

/// Encodes a single value into a fresh buffer.
pub fn to_bytes(value: &Value) -> Result<Vec<u8>> {
    let mut buffer = Vec::new();
    write_value(&mut buffer, value)?;
    Ok(buffer)
}

/// Decodes exactly one value from `bytes`; trailing bytes are an error.
pub fn from_bytes(bytes: &[u8]) -> Result<Value> {
    let mut reader = ValueReader::new(bytes);
    let value = reader
        .read_next()?
        .ok_or_else(|| GraphcodeError::Format("Empty input".into()))?;
    if !reader.is_exhausted() {
        return Err(GraphcodeError::Format(format!(
            "Trailing bytes after value at offset {}",
            reader.position()
        )));
    }
    Ok(value)
}
