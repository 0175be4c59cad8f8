//! Static catalogue tables

use super::{AttrKind, AttrType, Capability, EdgeDef, EdgeKind, NodeKind, Target};
use Capability::*;

const fn edge(kind: EdgeKind, multi: bool, tree: bool, target: Target) -> EdgeDef {
    EdgeDef { kind, multi, tree, target }
}

const EXPR: Target = Target::Capability(Expression);
const STMT: Target = Target::Capability(Statement);
const TYPE: Target = Target::Capability(Type);

impl Capability {
    pub fn attrs(self) -> &'static [AttrKind] {
        match self {
            Positioned => &[AttrKind::Position],
            Named => &[AttrKind::Name],
            Member => &[AttrKind::IsStatic],
            Commentable | Statement | Expression | Type => &[],
        }
    }

    pub fn edges(self) -> &'static [EdgeKind] {
        match self {
            Commentable => &[EdgeKind::CommentableHasComments],
            Expression => &[EdgeKind::ExpressionHasType],
            Positioned | Named | Member | Statement | Type => &[],
        }
    }
}

impl NodeKind {
    /// Composed capabilities, in dispatch order
    pub fn capabilities(self) -> &'static [Capability] {
        use NodeKind as K;
        match self {
            K::Package => &[Positioned, Named],
            K::CompilationUnit => &[Positioned, Commentable],
            K::Class | K::Method => &[Positioned, Commentable, Named, Member],
            K::Parameter => &[Positioned, Named],
            K::Variable => &[Positioned, Commentable, Named, Member, Statement],
            K::Block | K::ExpressionStatement | K::Return | K::If | K::While => {
                &[Positioned, Statement]
            }
            K::Identifier | K::MethodCall => &[Positioned, Named, Expression],
            K::IntegerLiteral
            | K::FloatLiteral
            | K::StringLiteral
            | K::BooleanLiteral
            | K::BinaryExpression
            | K::UnaryExpression
            | K::Assignment => &[Positioned, Expression],
            K::Comment => &[Positioned],
            K::IntType
            | K::FloatType
            | K::BooleanType
            | K::VoidType
            | K::ClassType
            | K::ArrayType => &[Type],
        }
    }

    pub fn own_attrs(self) -> &'static [AttrKind] {
        use NodeKind as K;
        match self {
            K::Class | K::Method => &[AttrKind::IsAbstract],
            K::IntegerLiteral => &[AttrKind::IntValue],
            K::FloatLiteral => &[AttrKind::FloatValue],
            K::StringLiteral => &[AttrKind::StringValue],
            K::BooleanLiteral => &[AttrKind::BoolValue],
            K::BinaryExpression | K::UnaryExpression => &[AttrKind::Operator],
            K::Comment => &[AttrKind::CommentText],
            _ => &[],
        }
    }

    pub fn own_edges(self) -> &'static [EdgeKind] {
        use EdgeKind as E;
        use NodeKind as K;
        match self {
            K::Package => &[E::PackageHasMembers],
            K::CompilationUnit => &[E::CompilationUnitHasTypes],
            K::Class => &[E::ClassHasMembers, E::ClassHasSuperClass],
            K::Method => &[
                E::MethodHasParameters,
                E::MethodHasBody,
                E::MethodHasReturnType,
                E::MethodOverrides,
            ],
            K::Parameter => &[E::ParameterHasType],
            K::Variable => &[E::VariableHasType, E::VariableHasInitializer],
            K::Block => &[E::BlockHasStatements],
            K::ExpressionStatement => &[E::ExpressionStatementHasExpression],
            K::Return => &[E::ReturnHasExpression],
            K::If => &[E::IfHasCondition, E::IfHasThen, E::IfHasElse],
            K::While => &[E::WhileHasCondition, E::WhileHasBody],
            K::Identifier => &[E::IdentifierRefersTo],
            K::BinaryExpression => &[E::BinaryHasLeftOperand, E::BinaryHasRightOperand],
            K::UnaryExpression => &[E::UnaryHasOperand],
            K::MethodCall => &[
                E::MethodCallHasTarget,
                E::MethodCallHasArguments,
                E::MethodCallInvokes,
            ],
            K::Assignment => &[E::AssignmentHasLeft, E::AssignmentHasRight],
            K::ClassType => &[E::ClassTypeRefersTo],
            K::ArrayType => &[E::ArrayTypeHasComponent],
            K::IntegerLiteral
            | K::FloatLiteral
            | K::StringLiteral
            | K::BooleanLiteral
            | K::Comment
            | K::IntType
            | K::FloatType
            | K::BooleanType
            | K::VoidType => &[],
        }
    }

    /// Special nodes never get a tree parent (comments, types)
    pub fn is_special(self) -> bool {
        self == NodeKind::Comment || self.is_a(Type)
    }
}

impl EdgeKind {
    pub fn def(self) -> EdgeDef {
        use EdgeKind as E;
        use NodeKind as K;
        match self {
            E::CommentableHasComments => edge(self, true, false, Target::Kind(K::Comment)),
            E::ExpressionHasType => edge(self, false, false, TYPE),

            E::PackageHasMembers => edge(self, true, true, Target::Kind(K::CompilationUnit)),
            E::CompilationUnitHasTypes => edge(self, true, true, Target::Kind(K::Class)),
            E::ClassHasMembers => edge(self, true, true, Target::Capability(Member)),
            E::ClassHasSuperClass => edge(self, false, false, Target::Kind(K::Class)),
            E::MethodHasParameters => edge(self, true, true, Target::Kind(K::Parameter)),
            E::MethodHasBody => edge(self, false, true, Target::Kind(K::Block)),
            E::MethodHasReturnType => edge(self, false, false, TYPE),
            E::MethodOverrides => edge(self, true, false, Target::Kind(K::Method)),
            E::ParameterHasType => edge(self, false, false, TYPE),
            E::VariableHasType => edge(self, false, false, TYPE),
            E::VariableHasInitializer => edge(self, false, true, EXPR),
            E::BlockHasStatements => edge(self, true, true, STMT),
            E::ExpressionStatementHasExpression => edge(self, false, true, EXPR),
            E::ReturnHasExpression => edge(self, false, true, EXPR),
            E::IfHasCondition => edge(self, false, true, EXPR),
            E::IfHasThen => edge(self, false, true, STMT),
            E::IfHasElse => edge(self, false, true, STMT),
            E::WhileHasCondition => edge(self, false, true, EXPR),
            E::WhileHasBody => edge(self, false, true, STMT),
            E::IdentifierRefersTo => edge(self, false, false, Target::Capability(Named)),
            E::BinaryHasLeftOperand => edge(self, false, true, EXPR),
            E::BinaryHasRightOperand => edge(self, false, true, EXPR),
            E::UnaryHasOperand => edge(self, false, true, EXPR),
            E::MethodCallHasTarget => edge(self, false, true, EXPR),
            E::MethodCallHasArguments => edge(self, true, true, EXPR),
            E::MethodCallInvokes => edge(self, false, false, Target::Kind(K::Method)),
            E::AssignmentHasLeft => edge(self, false, true, EXPR),
            E::AssignmentHasRight => edge(self, false, true, EXPR),
            E::ClassTypeRefersTo => edge(self, false, false, Target::Kind(K::Class)),
            E::ArrayTypeHasComponent => edge(self, false, false, TYPE),
        }
    }
}

impl AttrKind {
    pub fn value_type(self) -> AttrType {
        match self {
            AttrKind::Position => AttrType::Range,
            AttrKind::Name | AttrKind::StringValue | AttrKind::CommentText => AttrType::Str,
            AttrKind::IsStatic | AttrKind::IsAbstract | AttrKind::BoolValue => AttrType::Bool,
            AttrKind::IntValue | AttrKind::Operator => AttrType::Int,
            AttrKind::FloatValue => AttrType::Float,
        }
    }
}
