//! String table: interns names and paths to integer keys
//!
//! Key 0 is always the empty string. Keys are dense and never reused, so a key
//! handed out by [`StringTable::set`] stays valid for the lifetime of the table.

use std::collections::HashMap;
use std::io::Write;

use crate::error::{GraphError, Result};
use super::format::ByteReader;

/// Interned string key
pub type Key = u32;

/// Key of the empty string
pub const EMPTY_KEY: Key = 0;

const STRTBL_TAG: [u8; 6] = *b"STRTBL";

/// Persistence class of an entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StrType {
    /// Scratch value, never persisted
    Tmp,
    #[default]
    Default,
    /// Referenced by a node that is about to be saved
    ToSave,
}

#[derive(Debug, Clone)]
struct Entry {
    value: String,
    ty: StrType,
}

#[derive(Debug, Clone)]
pub struct StringTable {
    entries: Vec<Entry>,
    index: HashMap<String, Key>,
}

impl Default for StringTable {
    fn default() -> Self {
        Self::new()
    }
}

impl StringTable {
    pub fn new() -> Self {
        let mut index = HashMap::new();
        index.insert(String::new(), EMPTY_KEY);
        Self {
            entries: vec![Entry { value: String::new(), ty: StrType::Default }],
            index,
        }
    }

    /// Intern `s`, returning its key
    pub fn set(&mut self, s: &str) -> Key {
        if let Some(&key) = self.index.get(s) {
            return key;
        }
        let key = self.entries.len() as Key;
        self.entries.push(Entry { value: s.to_string(), ty: StrType::Default });
        self.index.insert(s.to_string(), key);
        key
    }

    pub fn get(&self, key: Key) -> Option<&str> {
        self.entries.get(key as usize).map(|e| e.value.as_str())
    }

    /// Returns false for an unknown key
    pub fn set_type(&mut self, key: Key, ty: StrType) -> bool {
        match self.entries.get_mut(key as usize) {
            Some(e) => {
                e.ty = ty;
                true
            }
            None => false,
        }
    }

    pub fn str_type(&self, key: Key) -> Option<StrType> {
        self.entries.get(key as usize).map(|e| e.ty)
    }

    /// Сбросить пометки ToSave после записи
    pub fn clear_save_marks(&mut self) {
        for e in &mut self.entries {
            if e.ty == StrType::ToSave {
                e.ty = StrType::Default;
            }
        }
    }

    /// Keys currently marked [`StrType::ToSave`], ascending
    pub fn marked_keys(&self) -> impl Iterator<Item = Key> + '_ {
        self.entries
            .iter()
            .enumerate()
            .filter(|(_, e)| e.ty == StrType::ToSave)
            .map(|(k, _)| k as Key)
    }

    /// Number of entries including the empty string
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.len() == 1
    }

    /// Write every entry after key 0 as a string block.
    ///
    /// Layout: tag, count u32, then `len u32 + utf8 bytes` per entry in key order.
    pub fn write_to<W: Write>(&self, writer: &mut W) -> Result<()> {
        writer.write_all(&STRTBL_TAG)?;
        writer.write_all(&((self.entries.len() - 1) as u32).to_le_bytes())?;
        for e in &self.entries[1..] {
            writer.write_all(&(e.value.len() as u32).to_le_bytes())?;
            writer.write_all(e.value.as_bytes())?;
        }
        Ok(())
    }

    /// Read a string block written by [`StringTable::write_to`]
    pub fn read_from(reader: &mut ByteReader<'_>) -> Result<Self> {
        let tag = reader.bytes(STRTBL_TAG.len())?;
        if tag != STRTBL_TAG {
            return Err(GraphError::InvalidFormat("missing string table block".into()));
        }
        let count = reader.u32()?;
        let mut table = Self::new();
        for _ in 0..count {
            let len = reader.u32()? as usize;
            let raw = reader.bytes(len)?;
            let s = std::str::from_utf8(raw)
                .map_err(|e| GraphError::InvalidFormat(format!("string table entry: {}", e)))?;
            let expected = table.entries.len() as Key;
            if table.set(s) != expected {
                return Err(GraphError::InvalidFormat(format!("duplicate string {:?}", s)));
            }
        }
        Ok(table)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_set_is_idempotent() {
        let mut st = StringTable::new();
        let a = st.set("main");
        let b = st.set("main");
        assert_eq!(a, b);
        assert_eq!(st.get(a), Some("main"));
        assert_eq!(st.set(""), EMPTY_KEY);
        assert!(st.get(99).is_none());
    }

    #[test]
    fn test_marks() {
        let mut st = StringTable::new();
        let a = st.set("a");
        let b = st.set("b");
        assert!(st.set_type(b, StrType::ToSave));
        assert!(!st.set_type(77, StrType::ToSave));
        assert_eq!(st.marked_keys().collect::<Vec<_>>(), vec![b]);
        st.clear_save_marks();
        assert_eq!(st.str_type(a), Some(StrType::Default));
        assert_eq!(st.marked_keys().count(), 0);
    }

    #[test]
    fn test_block_roundtrip() {
        let mut st = StringTable::new();
        st.set("java/lang");
        st.set("Object");

        let mut buf = Vec::new();
        st.write_to(&mut buf).unwrap();

        let mut reader = ByteReader::new(&buf);
        let loaded = StringTable::read_from(&mut reader).unwrap();
        assert_eq!(loaded.len(), 3);
        assert_eq!(loaded.get(1), Some("java/lang"));
        assert_eq!(loaded.get(2), Some("Object"));
        assert!(reader.is_at_end());
    }

    #[test]
    fn test_truncated_block() {
        let mut st = StringTable::new();
        st.set("abcdef");
        let mut buf = Vec::new();
        st.write_to(&mut buf).unwrap();
        buf.truncate(buf.len() - 2);

        let mut reader = ByteReader::new(&buf);
        assert!(matches!(StringTable::read_from(&mut reader), Err(GraphError::Truncated(_))));
    }
}
