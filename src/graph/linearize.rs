//! The encoder back-end.
//!
//! Turns an [`ObjectTable`] into the final slot order and rewrites every
//! unresolved child id into a wire `Reference` whose number is the target's
//! position in that order.

use std::cmp::Reverse;

use super::id::SlotId;
use super::table::{ObjectTable, Slot};
use crate::config::IdPolicy;
use crate::error::{GraphcodeError, Result};
use crate::value::Value;

/// Computes the write order: `order[position] = id`.
///
/// The root (`#0`) is always last.
pub fn write_order(table: &ObjectTable, policy: IdPolicy) -> Result<Vec<SlotId>> {
    let len = table.len();
    let mut order = (0..len)
        .rev()
        .map(SlotId::from_len)
        .collect::<Result<Vec<_>>>()?;

    if policy == IdPolicy::ReferenceCount && len > 1 {
        let counts = table.incoming_references();
        // The root sits at the end of the descending order; keep it there.
        let (others, _root) = order.split_at_mut(len - 1);
        others.sort_by_key(|id| (Reverse(counts[id.as_usize()]), Reverse(*id)));
    }
    Ok(order)
}

/// Resolves the table into stream-ready values, in write order.
pub fn linearize(table: &ObjectTable, policy: IdPolicy) -> Result<Vec<Value>> {
    if table.is_empty() {
        return Err(GraphcodeError::Internal("cannot linearize an empty table".into()));
    }
    let order = write_order(table, policy)?;

    // position[id] = write position of slot `id`
    let mut position = vec![0u64; table.len()];
    for (pos, id) in order.iter().enumerate() {
        position[id.as_usize()] = pos as u64;
    }
    let reference = |id: &SlotId| -> Result<Value> {
        position
            .get(id.as_usize())
            .map(|pos| Value::Reference(*pos))
            .ok_or_else(|| GraphcodeError::Internal(format!("Unresolved {id} points outside the table")))
    };

    order
        .iter()
        .map(|id| {
            let slot = table
                .get(*id)
                .ok_or_else(|| GraphcodeError::Internal(format!("Slot {id} vanished")))?;
            Ok(match slot {
                Slot::Placeholder => {
                    return Err(GraphcodeError::Internal(format!(
                        "Slot {id} was reserved but never filled"
                    )))
                }
                Slot::Scalar(value) => value.clone(),
                Slot::Sequence(items) => {
                    Value::Sequence(items.iter().map(reference).collect::<Result<_>>()?)
                }
                Slot::Mapping(pairs) => Value::Mapping(
                    pairs
                        .iter()
                        .map(|(k, v)| Ok((reference(k)?, reference(v)?)))
                        .collect::<Result<_>>()?,
                ),
            })
        })
        .collect()
}
