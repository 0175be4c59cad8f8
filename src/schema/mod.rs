//! Node catalogue: kinds, capabilities, attributes and edges
//!
//! The catalogue is static data. Every concrete [`NodeKind`] composes a fixed,
//! ordered set of [`Capability`] values plus its own attributes and edges.
//! [`Layout`] flattens that into the slot order used by the factory, the
//! traversal and the codec.

mod catalogue;
mod layout;

pub use layout::Layout;

use serde::{Deserialize, Serialize};
use strum::{EnumCount, EnumIter, FromRepr, IntoStaticStr};

/// Concrete node kind. The discriminant is the on-disk kind tag.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord,
    FromRepr, EnumIter, EnumCount, IntoStaticStr, Serialize, Deserialize,
)]
#[repr(u16)]
pub enum NodeKind {
    Package = 0,
    CompilationUnit,
    Class,
    Method,
    Parameter,
    Variable,
    Block,
    ExpressionStatement,
    Return,
    If,
    While,
    Identifier,
    IntegerLiteral,
    FloatLiteral,
    StringLiteral,
    BooleanLiteral,
    BinaryExpression,
    UnaryExpression,
    MethodCall,
    Assignment,
    Comment,
    IntType,
    FloatType,
    BooleanType,
    VoidType,
    ClassType,
    ArrayType,
}

/// Orthogonal interface a kind may satisfy, each with its own attribute and
/// edge namespace. Declaration order is the dispatch order.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord,
    FromRepr, EnumIter, EnumCount, IntoStaticStr, Serialize, Deserialize,
)]
#[repr(u8)]
pub enum Capability {
    Positioned = 0,
    Commentable,
    Named,
    Member,
    Statement,
    Expression,
    Type,
}

/// Edge kind, scoped to the node kind or capability that declares it.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord,
    FromRepr, EnumIter, EnumCount, IntoStaticStr, Serialize, Deserialize,
)]
#[repr(u16)]
pub enum EdgeKind {
    // capabilities
    CommentableHasComments = 0,
    ExpressionHasType,

    PackageHasMembers,
    CompilationUnitHasTypes,
    ClassHasMembers,
    ClassHasSuperClass,
    MethodHasParameters,
    MethodHasBody,
    MethodHasReturnType,
    MethodOverrides,
    ParameterHasType,
    VariableHasType,
    VariableHasInitializer,
    BlockHasStatements,
    ExpressionStatementHasExpression,
    ReturnHasExpression,
    IfHasCondition,
    IfHasThen,
    IfHasElse,
    WhileHasCondition,
    WhileHasBody,
    IdentifierRefersTo,
    BinaryHasLeftOperand,
    BinaryHasRightOperand,
    UnaryHasOperand,
    MethodCallHasTarget,
    MethodCallHasArguments,
    MethodCallInvokes,
    AssignmentHasLeft,
    AssignmentHasRight,
    ClassTypeRefersTo,
    ArrayTypeHasComponent,
}

/// Attribute kind, scoped like [`EdgeKind`].
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord,
    FromRepr, EnumIter, EnumCount, IntoStaticStr, Serialize, Deserialize,
)]
#[repr(u16)]
pub enum AttrKind {
    Position = 0,
    Name,
    IsStatic,
    IsAbstract,
    IntValue,
    FloatValue,
    StringValue,
    BoolValue,
    Operator,
    CommentText,
}

/// Value type of an attribute slot
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttrType {
    Int,
    Bool,
    Float,
    Str,
    Range,
}

/// Declared target constraint of an edge
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Target {
    Kind(NodeKind),
    Capability(Capability),
}

impl Target {
    pub fn accepts(self, kind: NodeKind) -> bool {
        match self {
            Target::Kind(k) => k == kind,
            Target::Capability(c) => kind.is_a(c),
        }
    }
}

/// Static definition of one edge kind
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EdgeDef {
    pub kind: EdgeKind,
    pub multi: bool,
    pub tree: bool,
    pub target: Target,
}

impl NodeKind {
    pub fn from_tag(tag: u16) -> Option<Self> {
        Self::from_repr(tag)
    }

    pub fn tag(self) -> u16 {
        self as u16
    }

    pub fn name(self) -> &'static str {
        self.into()
    }

    /// Does this kind compose capability `cap`?
    pub fn is_a(self, cap: Capability) -> bool {
        self.capabilities().contains(&cap)
    }

    /// Resolved slot layout (cached)
    pub fn layout(self) -> &'static Layout {
        layout::layout_of(self)
    }
}

impl EdgeKind {
    pub fn is_tree(self) -> bool {
        self.def().tree
    }

    pub fn is_multi(self) -> bool {
        self.def().multi
    }

    pub fn name(self) -> &'static str {
        self.into()
    }
}

impl AttrKind {
    pub fn name(self) -> &'static str {
        self.into()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use strum::IntoEnumIterator;

    #[test]
    fn test_kind_tags_roundtrip() {
        for kind in NodeKind::iter() {
            assert_eq!(NodeKind::from_tag(kind.tag()), Some(kind));
        }
        assert_eq!(NodeKind::from_tag(NodeKind::COUNT as u16), None);
    }

    #[test]
    fn test_target_accepts_capability() {
        let t = Target::Capability(Capability::Expression);
        assert!(t.accepts(NodeKind::BinaryExpression));
        assert!(t.accepts(NodeKind::Identifier));
        assert!(!t.accepts(NodeKind::Block));

        let k = Target::Kind(NodeKind::Class);
        assert!(k.accepts(NodeKind::Class));
        assert!(!k.accepts(NodeKind::Method));
    }

    #[test]
    fn test_every_edge_is_declared_once() {
        for edge in EdgeKind::iter() {
            let owners: Vec<NodeKind> = NodeKind::iter()
                .filter(|k| k.own_edges().contains(&edge))
                .collect();
            let caps: Vec<Capability> = Capability::iter()
                .filter(|c| c.edges().contains(&edge))
                .collect();
            assert_eq!(owners.len() + caps.len(), 1, "{:?}", edge);
        }
    }
}
