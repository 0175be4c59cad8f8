//! Binary persistence of a factory and its string table

pub mod format;
pub mod reader;
pub mod string_table;
pub mod writer;

pub use format::{GraphHeader, FORMAT_VERSION, MAGIC};
pub use reader::{load_all, load_from_file, load_from_slice, load_with_table, LoadedGraph};
pub use writer::{save_to_file, save_to_vec, GraphWriter};
