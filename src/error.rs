//! Error types for the ASG engine

use thiserror::Error;

use crate::graph::NodeId;
use crate::schema::{EdgeKind, NodeKind, AttrKind};

pub type Result<T> = std::result::Result<T, GraphError>;

#[derive(Error, Debug)]
pub enum GraphError {
    // === schema violations ===

    #[error("Unknown node: {0}")]
    UnknownNode(NodeId),

    #[error("Invalid target kind for {edge:?}: node {target} is {found:?}")]
    InvalidTargetKind { edge: EdgeKind, target: NodeId, found: NodeKind },

    #[error("Node {0} belongs to another factory")]
    ForeignFactory(NodeId),

    #[error("Cannot clear populated edge {edge:?} on node {node} to null, use remove_edge")]
    CannotClearEdgeToNull { node: NodeId, edge: EdgeKind },

    #[error("Edge {edge:?} is not declared on {kind:?}")]
    InvalidEdgeKind { kind: NodeKind, edge: EdgeKind },

    #[error("Edge {0:?} is not a multiple edge")]
    NotMultiEdge(EdgeKind),

    #[error("Attribute {attr:?} is not declared on {kind:?}")]
    InvalidAttribute { kind: NodeKind, attr: AttrKind },

    #[error("Attribute {attr:?} has a different value type")]
    AttributeType { attr: AttrKind },

    #[error("Edge not found: {src} -{edge:?}-> {dst}")]
    EdgeNotFound { src: NodeId, edge: EdgeKind, dst: NodeId },

    #[error("Setting {edge:?} from {src} to {dst} would create an ownership cycle")]
    OwnershipCycle { src: NodeId, edge: EdgeKind, dst: NodeId },

    #[error("Root node {0} cannot be deleted or owned")]
    RootNode(NodeId),

    // === setup errors ===

    #[error("Reverse edges are not enabled")]
    ReverseEdgesNotEnabled,

    #[error("Traversal has no visitor")]
    NoVisitor,

    #[error("Traversal has no factory")]
    NoFactory,

    #[error("Filter size {found} does not match factory size {expected}")]
    FilterMismatch { expected: usize, found: usize },

    // === codec errors ===

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] bincode::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid file format: {0}")]
    InvalidFormat(String),

    #[error("Truncated stream at offset {0}")]
    Truncated(usize),

    #[error("Edge target {target} is out of range (max id {max})")]
    EdgeOutOfRange { target: NodeId, max: NodeId },

    #[error("String key {0} has no entry")]
    UnknownStringKey(u32),

    #[error("Checksum mismatch")]
    ChecksumMismatch,
}
