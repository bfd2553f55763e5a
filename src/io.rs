//! Low-level sequential writing of finalized slots.
//!
//! The writer appends slots one after another and tracks both the byte
//! offset and the slot count, so the caller can report what was written.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use crate::error::Result;
use crate::format::write_value;
use crate::value::Value;

/// An append-only sink for slots that tracks the current offset.
#[derive(Debug)]
pub struct SlotWriter<W: Write> {
    writer: W,
    current_offset: u64,
    slots_written: usize,
}

impl<W: Write> SlotWriter<W> {
    /// Wraps any `Write` implementation.
    pub fn new(writer: W) -> Self {
        Self {
            writer,
            current_offset: 0,
            slots_written: 0,
        }
    }

    /// Writes one slot. Returns the offset where the slot starts.
    pub fn write_slot(&mut self, slot: &Value) -> Result<u64> {
        let start_offset = self.current_offset;
        let written = write_value(&mut self.writer, slot)?;
        self.current_offset += written as u64;
        self.slots_written += 1;
        Ok(start_offset)
    }

    /// Flushes the underlying sink.
    pub fn flush(&mut self) -> Result<()> {
        self.writer.flush()?;
        Ok(())
    }

    /// Returns the number of bytes written so far.
    pub fn current_offset(&self) -> u64 {
        self.current_offset
    }

    /// Returns the number of slots written so far.
    pub fn slots_written(&self) -> usize {
        self.slots_written
    }

    /// Flushes and returns the inner sink.
    pub fn into_inner(mut self) -> Result<W> {
        self.flush()?;
        Ok(self.writer)
    }
}

impl SlotWriter<BufWriter<File>> {
    /// Creates a buffered writer over a new file.
    /// The file is truncated on creation.
    pub fn create(path: &Path) -> Result<Self> {
        let file = File::create(path)?;
        Ok(Self::new(BufWriter::new(file)))
    }
}
