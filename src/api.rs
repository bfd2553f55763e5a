//! The public entry points.

use std::io::Write;
use std::path::Path;

use tracing::debug;

use crate::arena::Arena;
use crate::config::Config;
use crate::error::Result;
use crate::graph::{linearize, Indexer, ObjectTable};
use crate::io::SlotWriter;
use crate::object::{Decode, Encode};
use crate::reader::{Decoded, GraphReader};
use crate::registry::TypeRegistry;

/// The main entry point for serializing and deserializing object graphs.
#[derive(Debug)]
pub struct Graphcode;

impl Graphcode {
    /// Serializes the graph reachable from `root` into a byte stream.
    ///
    /// # Arguments
    /// * `arena`: Owner of every object `root` can reach.
    /// * `root`: The value to archive. Any [`Encode`] type works, including
    ///   plain collections and arena handles.
    pub fn serialize<T: Encode + ?Sized>(arena: &Arena, root: &T) -> Result<Vec<u8>> {
        Self::serialize_with_config(arena, root, &Config::default())
    }

    /// [`Graphcode::serialize`] with explicit settings.
    pub fn serialize_with_config<T: Encode + ?Sized>(
        arena: &Arena,
        root: &T,
        config: &Config,
    ) -> Result<Vec<u8>> {
        let mut buffer = Vec::new();
        Self::write_with_config(&mut buffer, arena, root, config)?;
        Ok(buffer)
    }

    /// Serializes into any writer and returns the number of bytes written.
    pub fn write<W: Write, T: Encode + ?Sized>(writer: W, arena: &Arena, root: &T) -> Result<u64> {
        Self::write_with_config(writer, arena, root, &Config::default())
    }

    /// [`Graphcode::write`] with explicit settings.
    pub fn write_with_config<W: Write, T: Encode + ?Sized>(
        writer: W,
        arena: &Arena,
        root: &T,
        config: &Config,
    ) -> Result<u64> {
        Self::emit(SlotWriter::new(writer), arena, root, config)
    }

    fn emit<W: Write, T: Encode + ?Sized>(
        mut writer: SlotWriter<W>,
        arena: &Arena,
        root: &T,
        config: &Config,
    ) -> Result<u64> {
        // 1. Discovery: flatten the graph into a table of slots.
        let table = Self::index_with_config(arena, root, config)?;

        // 2. Linearize: fix the write order and resolve child ids to references.
        let slots = linearize(&table, config.id_policy)?;

        // 3. Emit every slot; the root comes last.
        for slot in &slots {
            writer.write_slot(slot)?;
        }
        writer.flush()?;

        let written = writer.current_offset();
        debug!(slots = slots.len(), bytes = written, policy = ?config.id_policy, "serialized graph");
        Ok(written)
    }

    /// Serializes to a file, creating or truncating it.
    pub fn save<P: AsRef<Path>, T: Encode + ?Sized>(path: P, arena: &Arena, root: &T) -> Result<()> {
        Self::save_with_config(path, arena, root, &Config::default())
    }

    /// [`Graphcode::save`] with explicit settings.
    pub fn save_with_config<P: AsRef<Path>, T: Encode + ?Sized>(
        path: P,
        arena: &Arena,
        root: &T,
        config: &Config,
    ) -> Result<()> {
        let path = path.as_ref();
        let written = Self::emit(SlotWriter::create(path)?, arena, root, config)?;
        debug!(path = %path.display(), bytes = written, "saved graph");
        Ok(())
    }

    /// Builds the object table for `root` without linearizing it.
    ///
    /// Useful for inspecting how a graph is flattened: ids are in discovery
    /// order, with the root at `#0`.
    pub fn index<T: Encode + ?Sized>(arena: &Arena, root: &T) -> Result<ObjectTable> {
        Self::index_with_config(arena, root, &Config::default())
    }

    /// [`Graphcode::index`] with explicit settings.
    pub fn index_with_config<T: Encode + ?Sized>(
        arena: &Arena,
        root: &T,
        config: &Config,
    ) -> Result<ObjectTable> {
        let mut indexer = Indexer::new(arena, config);
        let root_id = indexer.index(&root)?;
        debug!(
            root = %root_id,
            slots = indexer.table().len(),
            objects = indexer.identity_count(),
            "indexed graph"
        );
        indexer.finish()
    }

    /// Reconstructs a `T` from a byte stream.
    ///
    /// `registry` lists the concrete types that polymorphic ([`ObjectRef`](crate::ObjectRef))
    /// slots may decode to. It can be empty when the graph has none.
    pub fn deserialize<T: Decode>(bytes: &[u8], registry: &TypeRegistry) -> Result<Decoded<T>> {
        Self::deserialize_with_config(bytes, registry, &Config::default())
    }

    /// [`Graphcode::deserialize`] with explicit settings.
    pub fn deserialize_with_config<T: Decode>(
        bytes: &[u8],
        registry: &TypeRegistry,
        config: &Config,
    ) -> Result<Decoded<T>> {
        GraphReader::from_bytes(bytes)?.decode_root(registry, config)
    }

    /// Memory-maps a file written by [`Graphcode::save`] and reconstructs a `T`.
    pub fn load<T: Decode, P: AsRef<Path>>(path: P, registry: &TypeRegistry) -> Result<Decoded<T>> {
        Self::load_with_config(path, registry, &Config::default())
    }

    /// [`Graphcode::load`] with explicit settings.
    pub fn load_with_config<T: Decode, P: AsRef<Path>>(
        path: P,
        registry: &TypeRegistry,
        config: &Config,
    ) -> Result<Decoded<T>> {
        let path = path.as_ref();
        debug!(path = %path.display(), "loading graph");
        GraphReader::open(path)?.decode_root(registry, config)
    }
}
