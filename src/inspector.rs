//! Tools for inspecting the physical structure of Graphcode streams.
//! Useful for checking how a graph was numbered and shared.

use std::collections::HashSet;
use std::fmt;
use std::path::Path;

use serde::Serialize;

use crate::error::Result;
use crate::object::TYPE_KEY;
use crate::reader::GraphReader;
use crate::value::{Float, Kind, Value};

/// Tree rendering stops descending past this depth.
const MAX_DISPLAY_DEPTH: usize = 64;
/// Longest string payload shown verbatim in a summary.
const MAX_SUMMARY_CHARS: usize = 32;

/// A structural report of a Graphcode stream.
#[derive(Debug, Serialize)]
pub struct DebugReport {
    /// Total size of the stream in bytes.
    pub stream_size: u64,
    /// Number of slots in the table.
    pub slot_count: usize,
    /// Position of the root slot.
    pub root_position: u64,
    /// Positions of slots holding a reference outside the table.
    pub dangling: Vec<u64>,
    /// One entry per slot, in stream order.
    pub slots: Vec<SlotInfo>,
}

/// Metadata for a single slot.
#[derive(Debug, Serialize)]
pub struct SlotInfo {
    /// Zero-based position in the stream, which is also its reference number.
    pub position: u64,
    /// Wire kind.
    pub kind: Kind,
    /// Elements or pairs held by a container.
    pub child_count: usize,
    /// Reference numbers appearing in this slot, in order.
    pub references: Vec<u64>,
    /// Number of references pointing at this slot.
    pub referenced_by: usize,
    /// Whether this is the root slot.
    pub is_root: bool,
    /// Short human-readable description.
    pub summary: String,
}

/// The Graphcode Inspector tool.
#[derive(Debug)]
pub struct Inspector;

impl Inspector {
    /// Analyzes an in-memory stream and returns a structural report.
    pub fn inspect(bytes: &[u8]) -> Result<DebugReport> {
        Ok(Self::inspect_reader(&GraphReader::from_bytes(bytes)?))
    }

    /// Analyzes a file.
    pub fn inspect_file<P: AsRef<Path>>(path: P) -> Result<DebugReport> {
        Ok(Self::inspect_reader(&GraphReader::open(path)?))
    }

    /// Analyzes an already parsed stream.
    pub fn inspect_reader(reader: &GraphReader) -> DebugReport {
        let table = reader.slots();
        let root_position = reader.root_position();

        let mut slots: Vec<SlotInfo> = table
            .iter()
            .enumerate()
            .map(|(position, value)| SlotInfo {
                position: position as u64,
                kind: value.kind(),
                child_count: value.child_count(),
                references: references_in(value),
                referenced_by: 0,
                is_root: position as u64 == root_position,
                summary: summarize(value, table),
            })
            .collect();

        let mut dangling = Vec::new();
        for position in 0..slots.len() {
            let mut is_dangling = false;
            for target in slots[position].references.clone() {
                match usize::try_from(target).ok().and_then(|t| slots.get_mut(t)) {
                    Some(info) => info.referenced_by += 1,
                    None => is_dangling = true,
                }
            }
            if is_dangling {
                dangling.push(position as u64);
            }
        }

        DebugReport {
            stream_size: reader.byte_len() as u64,
            slot_count: slots.len(),
            root_position,
            dangling,
            slots,
        }
    }
}

fn references_in(value: &Value) -> Vec<u64> {
    let mut out = Vec::new();
    collect_references(value, &mut out);
    out
}

fn collect_references(value: &Value, out: &mut Vec<u64>) {
    match value {
        Value::Reference(n) => out.push(*n),
        Value::Sequence(items) => items.iter().for_each(|v| collect_references(v, out)),
        Value::Mapping(pairs) => pairs.iter().for_each(|(k, v)| {
            collect_references(k, out);
            collect_references(v, out);
        }),
        _ => {}
    }
}

/// Follows at most one reference.
fn resolve<'a>(value: &'a Value, table: &'a [Value]) -> &'a Value {
    match value {
        Value::Reference(n) => usize::try_from(*n)
            .ok()
            .and_then(|i| table.get(i))
            .unwrap_or(value),
        other => other,
    }
}

fn summarize(value: &Value, table: &[Value]) -> String {
    match value {
        Value::Nil => "nil".to_string(),
        Value::Boolean(b) => b.to_string(),
        Value::Integer(n) => n.to_string(),
        Value::Float(Float::F32(v)) => format!("{v}f32"),
        Value::Float(Float::F64(v)) => format!("{v}f64"),
        Value::String(s) if s.chars().count() > MAX_SUMMARY_CHARS => {
            let head: String = s.chars().take(MAX_SUMMARY_CHARS).collect();
            format!("{head:?}...")
        }
        Value::String(s) => format!("{s:?}"),
        Value::Bytes(b) => format!("{} bytes", b.len()),
        Value::Sequence(items) => format!("[{} items]", items.len()),
        Value::Mapping(pairs) => {
            let descriptor = pairs.iter().find_map(|(k, v)| {
                (resolve(k, table).as_str() == Some(TYPE_KEY))
                    .then(|| resolve(v, table).as_str())
                    .flatten()
            });
            match descriptor {
                Some(ty) => format!("{ty} {{{} fields}}", pairs.len() - 1),
                None => format!("{{{} pairs}}", pairs.len()),
            }
        }
        Value::Reference(n) => format!("-> {n}"),
    }
}

impl fmt::Display for DebugReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "=== GRAPHCODE INSPECTOR REPORT ===")?;
        writeln!(f, "Stream Size:    {}b", self.stream_size)?;
        writeln!(f, "Slots:          {}", self.slot_count)?;
        writeln!(f, "Root Position:  {}", self.root_position)?;
        if !self.dangling.is_empty() {
            writeln!(f, "Dangling:       {:?}", self.dangling)?;
        }
        writeln!(f, "\n[GRAPH LAYOUT]")?;
        let mut seen = HashSet::new();
        self.fmt_recursive(f, self.root_position, "", true, &mut seen, 0)
    }
}

impl DebugReport {
    fn fmt_recursive(
        &self,
        f: &mut fmt::Formatter<'_>,
        position: u64,
        prefix: &str,
        is_last: bool,
        seen: &mut HashSet<u64>,
        depth: usize,
    ) -> fmt::Result {
        let connector = if is_last { "└── " } else { "├── " };
        let child_prefix = if is_last { "    " } else { "│   " };

        let Some(info) = usize::try_from(position)
            .ok()
            .and_then(|p| self.slots.get(p))
        else {
            return writeln!(f, "{prefix}{connector}#{position} <dangling>");
        };

        if !seen.insert(position) {
            return writeln!(f, "{prefix}{connector}#{position} (seen)");
        }

        writeln!(
            f,
            "{}{}#{} [{}] {} | Refs In: {}",
            prefix, connector, info.position, info.kind, info.summary, info.referenced_by
        )?;

        if depth >= MAX_DISPLAY_DEPTH {
            if !info.references.is_empty() {
                writeln!(f, "{prefix}{child_prefix}└── ...")?;
            }
            return Ok(());
        }

        let nested = format!("{prefix}{child_prefix}");
        for (i, child) in info.references.iter().enumerate() {
            let is_last_child = i + 1 == info.references.len();
            self.fmt_recursive(f, *child, &nested, is_last_child, seen, depth + 1)?;
        }
        Ok(())
    }
}
