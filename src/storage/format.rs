//! On-disk layout of a saved graph
//!
//! ```text
//! header        MAGIC, FORMAT_VERSION u16, property count u32, (key, value)*
//! string block  see StringTable::write_to
//! node block    NODES_TAG, slot count u32, record*, end mark u32 = 0
//! trailer       blake3 hash of everything above (32 bytes)
//! ```
//!
//! All integers are little-endian. A record is `id u32, kind u16`, the
//! attribute slots of the kind in layout order, then its edge slots: one id
//! for a single edge, a run of non-zero ids closed by 0 for a multiple edge.

use std::collections::BTreeMap;
use std::io::Write;

use crate::error::{GraphError, Result};

/// Магическое число для валидации формата
pub const MAGIC: [u8; 4] = *b"ASGF"; // Abstract Semantic Graph Format

/// Версия формата
pub const FORMAT_VERSION: u16 = 1;

pub const NODES_TAG: [u8; 6] = *b"NODBLK";

pub const CHECKSUM_LEN: usize = 32;

/// File header: format marker plus free-form string properties
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GraphHeader {
    pub version: u16,
    pub props: BTreeMap<String, String>,
}

impl GraphHeader {
    pub fn new() -> Self {
        Self { version: FORMAT_VERSION, props: BTreeMap::new() }
    }

    pub fn set(&mut self, key: &str, value: impl Into<String>) {
        self.props.insert(key.to_string(), value.into());
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.props.get(key).map(String::as_str)
    }

    pub fn write_to<W: Write>(&self, writer: &mut W) -> Result<()> {
        writer.write_all(&MAGIC)?;
        writer.write_all(&self.version.to_le_bytes())?;
        writer.write_all(&(self.props.len() as u32).to_le_bytes())?;
        for (k, v) in &self.props {
            write_str(writer, k)?;
            write_str(writer, v)?;
        }
        Ok(())
    }

    pub fn read_from(reader: &mut ByteReader<'_>) -> Result<Self> {
        let magic = reader.bytes(MAGIC.len())?;
        if magic != MAGIC {
            return Err(GraphError::InvalidFormat(format!(
                "Неверное магическое число: {:?}",
                magic
            )));
        }
        let version = reader.u16()?;
        if version != FORMAT_VERSION {
            return Err(GraphError::InvalidFormat(format!(
                "Неподдерживаемая версия формата: {}",
                version
            )));
        }
        let count = reader.u32()?;
        let mut props = BTreeMap::new();
        for _ in 0..count {
            let k = reader.string()?;
            let v = reader.string()?;
            props.insert(k, v);
        }
        Ok(Self { version, props })
    }
}

fn write_str<W: Write>(writer: &mut W, s: &str) -> Result<()> {
    writer.write_all(&(s.len() as u32).to_le_bytes())?;
    writer.write_all(s.as_bytes())?;
    Ok(())
}

/// Bounds-checked little-endian cursor over a byte slice
pub struct ByteReader<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> ByteReader<'a> {
    pub fn new(buf: &'a [u8]) -> Self {
        Self { buf, pos: 0 }
    }

    pub fn position(&self) -> usize {
        self.pos
    }

    pub fn is_at_end(&self) -> bool {
        self.pos == self.buf.len()
    }

    pub fn bytes(&mut self, n: usize) -> Result<&'a [u8]> {
        let end = self.pos.checked_add(n).ok_or(GraphError::Truncated(self.pos))?;
        if end > self.buf.len() {
            return Err(GraphError::Truncated(self.pos));
        }
        let out = &self.buf[self.pos..end];
        self.pos = end;
        Ok(out)
    }

    fn array<const N: usize>(&mut self) -> Result<[u8; N]> {
        let mut out = [0u8; N];
        out.copy_from_slice(self.bytes(N)?);
        Ok(out)
    }

    pub fn u8(&mut self) -> Result<u8> {
        Ok(self.array::<1>()?[0])
    }

    pub fn u16(&mut self) -> Result<u16> {
        Ok(u16::from_le_bytes(self.array()?))
    }

    pub fn u32(&mut self) -> Result<u32> {
        Ok(u32::from_le_bytes(self.array()?))
    }

    pub fn i64(&mut self) -> Result<i64> {
        Ok(i64::from_le_bytes(self.array()?))
    }

    pub fn f64(&mut self) -> Result<f64> {
        Ok(f64::from_le_bytes(self.array()?))
    }

    pub fn string(&mut self) -> Result<String> {
        let len = self.u32()? as usize;
        let raw = self.bytes(len)?;
        String::from_utf8(raw.to_vec())
            .map_err(|e| GraphError::InvalidFormat(format!("invalid utf8: {}", e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_header_roundtrip() {
        let mut h = GraphHeader::new();
        h.set("generator", "asgdb");
        h.set("language", "java");

        let mut buf = Vec::new();
        h.write_to(&mut buf).unwrap();

        let mut r = ByteReader::new(&buf);
        let loaded = GraphHeader::read_from(&mut r).unwrap();
        assert_eq!(loaded, h);
        assert!(r.is_at_end());
    }

    #[test]
    fn test_bad_magic() {
        let buf = b"XXXX\x01\x00\x00\x00\x00\x00".to_vec();
        let mut r = ByteReader::new(&buf);
        assert!(matches!(GraphHeader::read_from(&mut r), Err(GraphError::InvalidFormat(_))));
    }

    #[test]
    fn test_reader_truncation() {
        let buf = [1u8, 2, 3];
        let mut r = ByteReader::new(&buf);
        assert_eq!(r.u16().unwrap(), 0x0201);
        assert!(matches!(r.u32(), Err(GraphError::Truncated(2))));
    }
}
