use std::fmt;

use crate::error::{GraphcodeError, Result};

/// A strong type representing the index of a slot in the object table.
/// Slot ids are assigned in discovery order and never reused within one table.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SlotId(u32); // u32 is sufficient for 4 billion slots per stream.

impl SlotId {
    /// Creates a new SlotId.
    /// Restrict visibility to the graph module to prevent arbitrary creation.
    pub(crate) fn new(id: u32) -> Self {
        Self(id)
    }

    /// Converts a table length into the id the next slot will receive.
    pub(crate) fn from_len(len: usize) -> Result<Self> {
        u32::try_from(len)
            .map(Self)
            .map_err(|_| GraphcodeError::Internal(format!("object table overflow at {len} slots")))
    }

    /// Returns the raw numeric value.
    pub fn as_u32(&self) -> u32 {
        self.0
    }

    /// Returns the value as a table index.
    pub fn as_usize(&self) -> usize {
        self.0 as usize
    }
}

impl fmt::Debug for SlotId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SlotId({})", self.0)
    }
}

impl fmt::Display for SlotId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}
