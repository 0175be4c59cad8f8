//! Граф API: arena of nodes, edges and filter state

pub mod factory;
pub mod filter;
pub mod node;
pub mod range;
pub mod traversal;

pub use factory::{Factory, FactoryId, FilterGuard, NodeRef, ParentLink, ROOT_ID};
pub use filter::{Filter, FilterState};
pub use node::{AttrValue, EdgeSlot, Node, NodeId, NULL_ID};
pub use range::Range;
