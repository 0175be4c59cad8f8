//! Graph writer - запись фабрики в binary format

use std::collections::{BTreeMap, HashMap};
use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::Path;

use crate::config::CodecConfig;
use crate::error::Result;
use crate::graph::{AttrValue, EdgeSlot, Factory, Node, NodeId, NULL_ID};
use super::format::{GraphHeader, NODES_TAG};
use super::string_table::{Key, StrType, StringTable, EMPTY_KEY};

/// Writer that feeds every byte into a blake3 hasher
struct HashingWriter<W: Write> {
    inner: W,
    hasher: blake3::Hasher,
}

impl<W: Write> Write for HashingWriter<W> {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        let n = self.inner.write(buf)?;
        self.hasher.update(&buf[..n]);
        Ok(n)
    }

    fn flush(&mut self) -> std::io::Result<()> {
        self.inner.flush()
    }
}

/// Writes a whole factory with its referenced strings
pub struct GraphWriter {
    config: CodecConfig,
    props: BTreeMap<String, String>,
}

impl GraphWriter {
    pub fn new(config: CodecConfig) -> Self {
        Self { config, props: BTreeMap::new() }
    }

    /// Extra header property; `generator` and `node-count` are always written
    pub fn set_property(&mut self, key: &str, value: impl Into<String>) {
        self.props.insert(key.to_string(), value.into());
    }

    pub fn write_to_file(&self, factory: &mut Factory, path: &Path) -> Result<()> {
        let file: File = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(true)
            .open(path)?;
        let mut writer = BufWriter::new(file);
        self.write(factory, &mut writer)?;
        writer.flush()?;

        tracing::info!(
            "Saved graph to {:?}: {} nodes, {} strings",
            path,
            factory.node_count(),
            factory.strings().len()
        );
        Ok(())
    }

    pub fn write_to_vec(&self, factory: &mut Factory) -> Result<Vec<u8>> {
        let mut buf = Vec::new();
        self.write(factory, &mut buf)?;
        Ok(buf)
    }

    /// Write header, string block, node block and checksum trailer.
    ///
    /// Only strings referenced by live nodes are written, renumbered in first
    /// use order, so equal graphs always produce equal bytes.
    pub fn write<W: Write>(&self, factory: &mut Factory, writer: &mut W) -> Result<()> {
        mark_strings(factory);
        let (file_table, keys) = build_file_table(factory);
        factory.strings_mut().clear_save_marks();

        let mut header = GraphHeader::new();
        header.props = self.props.clone();
        header.set("generator", self.config.generator.clone());
        header.set("node-count", factory.node_count().to_string());

        let mut out = HashingWriter { inner: writer, hasher: blake3::Hasher::new() };
        header.write_to(&mut out)?;
        file_table.write_to(&mut out)?;

        out.write_all(&NODES_TAG)?;
        out.write_all(&(factory.slot_count() as u32).to_le_bytes())?;
        for node in factory.iter_all() {
            write_node(&mut out, factory, node, &keys)?;
        }
        out.write_all(&NULL_ID.to_le_bytes())?;

        let checksum = out.hasher.finalize();
        out.inner.write_all(checksum.as_bytes())?;
        Ok(())
    }
}

/// Mark every string used by a live node as to be saved
fn mark_strings(factory: &mut Factory) {
    let used: Vec<Key> = factory
        .iter_all()
        .flat_map(|n| n.attrs().iter().filter_map(AttrValue::string_key))
        .filter(|&k| k != EMPTY_KEY)
        .collect();
    let strings = factory.strings_mut();
    for k in used {
        strings.set_type(k, StrType::ToSave);
    }
}

/// File-local table of the marked strings in first use order
fn build_file_table(factory: &Factory) -> (StringTable, HashMap<Key, Key>) {
    let strings = factory.strings();
    let mut table = StringTable::new();
    let mut keys = HashMap::new();
    keys.insert(EMPTY_KEY, EMPTY_KEY);

    for node in factory.iter_all() {
        for k in node.attrs().iter().filter_map(AttrValue::string_key) {
            if keys.contains_key(&k) || strings.str_type(k) != Some(StrType::ToSave) {
                continue;
            }
            if let Some(s) = strings.get(k) {
                keys.insert(k, table.set(s));
            }
        }
    }
    (table, keys)
}

fn write_node<W: Write>(
    out: &mut W,
    factory: &Factory,
    node: &Node,
    keys: &HashMap<Key, Key>,
) -> Result<()> {
    let key = |k: Key| keys.get(&k).copied().unwrap_or(EMPTY_KEY);

    out.write_all(&node.id().to_le_bytes())?;
    out.write_all(&node.kind().tag().to_le_bytes())?;

    for value in node.attrs() {
        match value {
            AttrValue::Int(v) => out.write_all(&v.to_le_bytes())?,
            AttrValue::Bool(v) => out.write_all(&[u8::from(*v)])?,
            AttrValue::Float(v) => out.write_all(&v.to_le_bytes())?,
            AttrValue::Str(k) => out.write_all(&key(*k).to_le_bytes())?,
            AttrValue::Range(r) => {
                out.write_all(&key(r.path).to_le_bytes())?;
                for f in r.fields() {
                    out.write_all(&f.to_le_bytes())?;
                }
            }
        }
    }

    // stale ids of deleted nodes are written as absent
    let live = |t: NodeId| factory.get_exist(t);
    for slot in node.edge_slots() {
        match slot {
            EdgeSlot::Single(t) => {
                let t = if live(*t) { *t } else { NULL_ID };
                out.write_all(&t.to_le_bytes())?;
            }
            EdgeSlot::Multi(v) => {
                for &t in v.iter().filter(|&&t| live(t)) {
                    out.write_all(&t.to_le_bytes())?;
                }
                out.write_all(&NULL_ID.to_le_bytes())?;
            }
        }
    }
    Ok(())
}

/// Save with a default [`GraphWriter`]
pub fn save_to_file(factory: &mut Factory, path: &Path, config: &CodecConfig) -> Result<()> {
    GraphWriter::new(config.clone()).write_to_file(factory, path)
}

pub fn save_to_vec(factory: &mut Factory, config: &CodecConfig) -> Result<Vec<u8>> {
    GraphWriter::new(config.clone()).write_to_vec(factory)
}
