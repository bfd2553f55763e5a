use super::id::SlotId;
use crate::error::{GraphcodeError, Result};
use crate::value::Value;

/// A single entry in the object table.
///
/// Container entries hold `SlotId`s of their children. Those ids are
/// unresolved: they name table positions, not final stream positions.
#[derive(Debug, Clone, PartialEq)]
pub enum Slot {
    /// Reserved, not yet filled. Lets children refer to their parent's id
    /// before the parent's content is known.
    Placeholder,
    /// A leaf value.
    Scalar(Value),
    /// Ordered children.
    Sequence(Vec<SlotId>),
    /// Key/value children.
    Mapping(Vec<(SlotId, SlotId)>),
}

impl Slot {
    /// Iterates over the unresolved child ids of this slot, keys before values.
    pub fn children(&self) -> Box<dyn Iterator<Item = SlotId> + '_> {
        match self {
            Self::Placeholder | Self::Scalar(_) => Box::new(std::iter::empty()),
            Self::Sequence(items) => Box::new(items.iter().copied()),
            Self::Mapping(pairs) => Box::new(pairs.iter().flat_map(|(k, v)| [*k, *v])),
        }
    }
}

/// The flat, append-only table produced by one indexing pass.
///
/// Acts as an arena for slots: ids are handed out in discovery order, so the
/// root is always `#0` and every other slot has a larger id than the object
/// that first reached it.
#[derive(Debug, Default, Clone)]
pub struct ObjectTable {
    slots: Vec<Slot>,
}

impl ObjectTable {
    /// Creates a new, empty table.
    pub fn new() -> Self {
        Self { slots: Vec::new() }
    }

    /// Appends a finished slot and returns its id.
    pub fn push(&mut self, slot: Slot) -> Result<SlotId> {
        let id = SlotId::from_len(self.slots.len())?;
        self.slots.push(slot);
        Ok(id)
    }

    /// Reserves an id whose content will be supplied later with [`ObjectTable::fill`].
    pub fn reserve(&mut self) -> Result<SlotId> {
        self.push(Slot::Placeholder)
    }

    /// Fills a previously reserved slot.
    ///
    /// Filling a slot that is not a placeholder is an internal error.
    pub fn fill(&mut self, id: SlotId, slot: Slot) -> Result<()> {
        let entry = self.slots.get_mut(id.as_usize()).ok_or_else(|| {
            GraphcodeError::Internal(format!("Slot {id} out of bounds for fill"))
        })?;
        if !matches!(entry, Slot::Placeholder) {
            return Err(GraphcodeError::Internal(format!("Slot {id} filled twice")));
        }
        *entry = slot;
        Ok(())
    }

    /// Retrieves a slot by id.
    pub fn get(&self, id: SlotId) -> Option<&Slot> {
        self.slots.get(id.as_usize())
    }

    /// The root slot id, if anything was indexed.
    pub fn root(&self) -> Option<SlotId> {
        (!self.slots.is_empty()).then(|| SlotId::new(0))
    }

    /// Returns true if the table has no slots.
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Returns the number of slots in the table.
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    /// Returns a slice containing all slots in id order.
    pub fn slots(&self) -> &[Slot] {
        &self.slots
    }

    /// Counts how many container entries point at each slot.
    pub fn incoming_references(&self) -> Vec<usize> {
        let mut counts = vec![0usize; self.slots.len()];
        for slot in &self.slots {
            for child in slot.children() {
                if let Some(count) = counts.get_mut(child.as_usize()) {
                    *count += 1;
                }
            }
        }
        counts
    }
}
