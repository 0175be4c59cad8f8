//! asgdb - in-memory abstract semantic graph engine
//!
//! # Architecture
//!
//! - **Factory**: arena of typed nodes, tree and reference edges, single-parent invariant
//! - **Catalogue**: static node kinds composed from capabilities (`schema`)
//! - **Reverse edges**: optional incoming-edge index kept in sync by every mutation
//! - **Preorder traversal**: visitor-driven walk with filtering, cross edges and safe mode
//! - **Binary codec**: deterministic save/load with a string table block and blake3 trailer
//!
//! # Usage example
//!
//! ```no_run
//! use asgdb::{Factory, NodeKind, EdgeKind, ROOT_ID};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let mut factory = Factory::new();
//!
//! let cu = factory.create(NodeKind::CompilationUnit);
//! let class = factory.create(NodeKind::Class);
//! factory.set_name(class, "Main")?;
//! factory.add_edge(ROOT_ID, EdgeKind::PackageHasMembers, cu)?;
//! factory.add_edge(cu, EdgeKind::CompilationUnitHasTypes, class)?;
//!
//! asgdb::storage::save_to_file(&mut factory, "main.asg".as_ref(), &Default::default())?;
//! let loaded = asgdb::storage::load_from_file("main.asg".as_ref(), &Default::default())?;
//! println!("Loaded {} nodes", loaded.factory.node_count());
//! # Ok(())
//! # }
//! ```

pub mod algorithm;
pub mod config;
pub mod error;
pub mod graph;
pub mod index;
pub mod schema;
pub mod storage;
pub mod visitor;

pub use algorithm::PreorderTraversal;
pub use config::{CodecConfig, EngineConfig, TraversalConfig};
pub use error::{GraphError, Result};
pub use graph::{AttrValue, Factory, FilterState, Node, NodeId, Range, NULL_ID, ROOT_ID};
pub use index::ReverseEdges;
pub use schema::{AttrKind, Capability, EdgeKind, NodeKind};
pub use storage::string_table::{Key, StringTable, StrType};
pub use visitor::{VisitContext, Visitor};
