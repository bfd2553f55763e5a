//! Core graph definitions for the Graphcode encoder.
//!
//! This module defines the `ObjectTable`, the `Indexer` that fills it, and
//! the linearizer that turns it into the final slot order.

/// Defines the `Indexer` and `Mapper`.
pub mod indexer;
/// Defines the `SlotId` type.
pub mod id;
/// Reference numbering and final write order.
pub mod linearize;
/// Defines the `ObjectTable` and `Slot` structures.
pub mod table;

pub use id::SlotId;
pub use indexer::{Indexer, Mapper};
pub use linearize::{linearize, write_order};
pub use table::{ObjectTable, Slot};
