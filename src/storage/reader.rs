//! Graph reader - загрузка фабрики из binary format

use std::fs::File;
use std::path::{Path, PathBuf};

use memmap2::Mmap;
use rayon::prelude::*;

use crate::config::CodecConfig;
use crate::error::{GraphError, Result};
use crate::graph::{AttrValue, EdgeSlot, Factory, Node, NodeId, ParentLink, Range, NULL_ID, ROOT_ID};
use crate::schema::{AttrType, EdgeDef, NodeKind};
use super::format::{ByteReader, GraphHeader, CHECKSUM_LEN, NODES_TAG};
use super::string_table::{Key, StringTable};

/// Result of a load: the rebuilt factory and the file header
#[derive(Debug)]
pub struct LoadedGraph {
    pub factory: Factory,
    pub header: GraphHeader,
}

/// Load into a fresh string table
pub fn load_from_slice(buf: &[u8], config: &CodecConfig) -> Result<LoadedGraph> {
    load_with_table(buf, StringTable::new(), config)
}

/// Load, interning every string into `strings`.
///
/// Keys in the file are file-local; they are re-resolved through `strings`,
/// so the loaded factory shares the key space of that table.
pub fn load_with_table(buf: &[u8], mut strings: StringTable, config: &CodecConfig) -> Result<LoadedGraph> {
    if buf.len() < CHECKSUM_LEN {
        return Err(GraphError::Truncated(buf.len()));
    }
    let (payload, trailer) = buf.split_at(buf.len() - CHECKSUM_LEN);
    // nothing in a corrupt payload is trusted, sizes included
    if config.verify_checksum && blake3::hash(payload).as_bytes() != trailer {
        return Err(GraphError::ChecksumMismatch);
    }
    let mut reader = ByteReader::new(payload);

    let header = GraphHeader::read_from(&mut reader)?;
    let file_table = StringTable::read_from(&mut reader)?;

    let keys: Vec<Key> = (0..file_table.len() as Key)
        .map(|k| strings.set(file_table.get(k).unwrap_or_default()))
        .collect();

    let tag = reader.bytes(NODES_TAG.len())?;
    if tag != NODES_TAG {
        return Err(GraphError::InvalidFormat("missing node block".into()));
    }
    let slots = reader.u32()?;
    if slots <= ROOT_ID {
        return Err(GraphError::InvalidFormat(format!("slot count {} leaves no root", slots)));
    }

    let mut factory = Factory::try_from_parts(strings, slots as usize)?;
    let mut prev: NodeId = NULL_ID;
    loop {
        let id = reader.u32()?;
        if id == NULL_ID {
            break;
        }
        if id >= slots || id <= prev {
            return Err(GraphError::InvalidFormat(format!(
                "node id {} out of order (previous {}, slots {})",
                id, prev, slots
            )));
        }
        prev = id;
        let node = read_node(&mut reader, &mut factory, id, slots, &keys)?;
        factory.place_node(node);
    }

    if !reader.is_at_end() {
        return Err(GraphError::InvalidFormat(format!(
            "{} trailing bytes after node block",
            payload.len() - reader.position()
        )));
    }
    validate(&factory)?;

    tracing::info!(
        "Loaded graph: {} nodes, {} strings, generator {:?}",
        factory.node_count(),
        keys.len(),
        header.get("generator")
    );
    Ok(LoadedGraph { factory, header })
}

/// Range-check a stored target and set its ownership back-link right away
fn link_target(factory: &mut Factory, src: NodeId, def: &EdgeDef, t: NodeId, slots: u32) -> Result<()> {
    if t >= slots {
        return Err(GraphError::EdgeOutOfRange { target: t, max: slots - 1 });
    }
    if def.tree && !factory.place_parent(t, ParentLink { parent: src, edge: def.kind }) {
        return Err(GraphError::InvalidFormat(format!("node {} has two tree parents", t)));
    }
    Ok(())
}

fn read_node(
    reader: &mut ByteReader<'_>,
    factory: &mut Factory,
    id: NodeId,
    slots: u32,
    keys: &[Key],
) -> Result<Node> {
    let tag = reader.u16()?;
    let kind = NodeKind::from_tag(tag)
        .ok_or_else(|| GraphError::InvalidFormat(format!("unknown kind tag {} on node {}", tag, id)))?;
    let layout = kind.layout();
    let mut node = Node::new(id, kind);

    let key = |k: u32| keys.get(k as usize).copied().ok_or(GraphError::UnknownStringKey(k));

    for (i, attr) in layout.attrs.iter().enumerate() {
        node.attrs[i] = match attr.value_type() {
            AttrType::Int => AttrValue::Int(reader.i64()?),
            AttrType::Bool => match reader.u8()? {
                0 => AttrValue::Bool(false),
                1 => AttrValue::Bool(true),
                b => return Err(GraphError::InvalidFormat(format!("bad bool {} on node {}", b, id))),
            },
            AttrType::Float => AttrValue::Float(reader.f64()?),
            AttrType::Str => AttrValue::Str(key(reader.u32()?)?),
            AttrType::Range => {
                let path = key(reader.u32()?)?;
                let mut fields = [0u32; 8];
                for f in fields.iter_mut() {
                    *f = reader.u32()?;
                }
                AttrValue::Range(Range::from_fields(path, fields))
            }
        };
    }

    for (i, def) in layout.edges.iter().enumerate() {
        if def.multi {
            let mut targets = Vec::new();
            loop {
                let t = reader.u32()?;
                if t == NULL_ID {
                    break;
                }
                link_target(factory, id, def, t, slots)?;
                targets.push(t);
            }
            node.edges[i] = EdgeSlot::Multi(targets);
        } else {
            let t = reader.u32()?;
            if t != NULL_ID {
                link_target(factory, id, def, t, slots)?;
            }
            node.edges[i] = EdgeSlot::Single(t);
        }
    }
    Ok(node)
}

/// Targets must exist and satisfy their constraints once every node is in
fn validate(factory: &Factory) -> Result<()> {
    if factory.kind_of(ROOT_ID) != Some(NodeKind::Package) {
        return Err(GraphError::InvalidFormat("root package missing".into()));
    }
    for node in factory.iter_all() {
        let chain = factory.ancestors(node.id());
        if chain.last().is_some_and(|&top| factory.parent(top).is_some()) {
            return Err(GraphError::InvalidFormat(format!("ownership cycle through node {}", node.id())));
        }
        for (def, slot) in node.kind().layout().edges.iter().zip(node.edge_slots()) {
            for &t in slot.ids() {
                let Some(found) = factory.kind_of(t) else {
                    return Err(GraphError::InvalidFormat(format!(
                        "node {} points at missing node {}",
                        node.id(),
                        t
                    )));
                };
                if !def.target.accepts(found) {
                    return Err(GraphError::InvalidTargetKind { edge: def.kind, target: t, found });
                }
                if def.tree && (t == ROOT_ID || t == node.id()) {
                    return Err(GraphError::InvalidFormat(format!("node {} cannot own {}", node.id(), t)));
                }
            }
        }
    }
    Ok(())
}

/// Map a graph file and load it
pub fn load_from_file(path: &Path, config: &CodecConfig) -> Result<LoadedGraph> {
    let file = File::open(path)?;
    if file.metadata()?.len() == 0 {
        return Err(GraphError::Truncated(0));
    }
    let mmap = unsafe { Mmap::map(&file)? };
    let loaded = load_from_slice(&mmap[..], config)?;
    tracing::debug!("Loaded {:?} ({} bytes)", path, mmap.len());
    Ok(loaded)
}

/// Load independent graph files in parallel, each with its own string table
pub fn load_all(paths: &[PathBuf], config: &CodecConfig) -> Result<Vec<LoadedGraph>> {
    paths.par_iter().map(|p| load_from_file(p, config)).collect()
}
