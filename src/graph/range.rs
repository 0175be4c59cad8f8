//! Source position attribute

use crate::storage::string_table::Key;

/// Position of a node in its source file.
///
/// `wide_*` fields are the tab-expanded column variants of the plain ones.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct Range {
    pub path: Key,
    pub line: u32,
    pub col: u32,
    pub end_line: u32,
    pub end_col: u32,
    pub wide_line: u32,
    pub wide_col: u32,
    pub wide_end_line: u32,
    pub wide_end_col: u32,
}

impl Range {
    /// Range whose wide variant equals the plain one
    pub fn new(path: Key, line: u32, col: u32, end_line: u32, end_col: u32) -> Self {
        Self {
            path,
            line,
            col,
            end_line,
            end_col,
            wide_line: line,
            wide_col: col,
            wide_end_line: end_line,
            wide_end_col: end_col,
        }
    }

    /// The eight integer fields after the path, in on-disk order
    pub fn fields(&self) -> [u32; 8] {
        [
            self.line,
            self.col,
            self.end_line,
            self.end_col,
            self.wide_line,
            self.wide_col,
            self.wide_end_line,
            self.wide_end_col,
        ]
    }

    pub fn from_fields(path: Key, f: [u32; 8]) -> Self {
        Self {
            path,
            line: f[0],
            col: f[1],
            end_line: f[2],
            end_col: f[3],
            wide_line: f[4],
            wide_col: f[5],
            wide_end_line: f[6],
            wide_end_col: f[7],
        }
    }
}
