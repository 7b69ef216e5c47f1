use super::{SourceFile, intern::Symbol};
use crate::frontend::lexer::Span;

pub mod visit;

#[derive(Debug)]
pub struct Module<'source> {
    pub source_file: &'source SourceFile,
    /// Top level items in the module (function literals are in the tree and
    /// not in this list)
    pub items: Vec<Item>,
}

impl Module<'_> {
    pub fn function(&self, name: &str) -> Option<&FunctionDefinition> {
        self.items.iter().find_map(|item| match &item.kind {
            ItemKind::FunctionDefinition(function) if function.name.symbol.value() == name => {
                Some(function.as_ref())
            }
            _ => None,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NodeId(pub u32);

#[derive(Debug)]
pub struct Item {
    pub id: NodeId,
    pub span: Span,
    pub kind: ItemKind,
}

#[derive(Debug)]
pub enum ItemKind {
    FunctionDefinition(Box<FunctionDefinition>),
}

#[derive(Debug)]
pub struct FunctionDefinition {
    pub id: NodeId,
    pub span: Span,
    pub return_type: Option<Identifier>,
    pub name: Identifier,
    pub parameters: FunctionParameterList,
    pub body: Block,
}

#[derive(Debug)]
pub struct FunctionParameterList {
    pub id: NodeId,
    pub span: Span,
    pub parameters: Vec<FunctionParameter>,
}

#[derive(Debug)]
pub struct FunctionParameter {
    pub id: NodeId,
    pub span: Span,
    pub ty: Option<Identifier>,
    pub name: Identifier,
}

#[derive(Debug)]
pub struct Identifier {
    pub id: NodeId,
    pub span: Span,
    pub symbol: Symbol,
}

#[derive(Debug)]
pub struct Block {
    pub id: NodeId,
    pub span: Span,
    pub statements: Vec<Statement>,
}

#[derive(Debug)]
pub struct Statement {
    pub id: NodeId,
    pub span: Span,
    pub kind: StatementKind,
}

#[derive(Debug)]
pub enum StatementKind {
    // Local variable declaration
    Local(Box<Local>),
    // Expression terminated with a semicolon
    Expression(Box<Expression>),
    If {
        condition: Box<Expression>,
        positive: Box<Statement>,
        negative: Option<Box<Statement>>,
    },
    While {
        condition: Box<Expression>,
        body: Box<Statement>,
    },
    Return(Option<Box<Expression>>),
    Block(Box<Block>),
    /// Empty statement (just a semicolon)
    Empty,
}

#[derive(Debug)]
pub struct Local {
    pub id: NodeId,
    pub span: Span,
    pub declarator: Declarator,
    pub ty: Option<Identifier>,
    pub name: Identifier,
    pub initializer: Option<Box<Expression>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Declarator {
    Var,   // var x
    Final, // final x
    Const, // const x
    Typed, // int x
}

impl Declarator {
    pub fn is_mutable(self) -> bool {
        matches!(self, Self::Var | Self::Typed)
    }
}

#[derive(Debug)]
pub struct Expression {
    pub id: NodeId,
    pub span: Span,
    pub kind: ExpressionKind,
}

impl Expression {
    /// Looks through any parentheses around the expression.
    pub fn without_grouping(&self) -> &Expression {
        match &self.kind {
            ExpressionKind::Grouping(inner) => inner.without_grouping(),
            _ => self,
        }
    }

    pub fn as_function_literal(&self) -> Option<&FunctionLiteral> {
        match &self.without_grouping().kind {
            ExpressionKind::FunctionLiteral(literal) => Some(literal),
            _ => None,
        }
    }

    pub fn as_identifier(&self) -> Option<&Identifier> {
        match &self.kind {
            ExpressionKind::Identifier(identifier) => Some(identifier),
            _ => None,
        }
    }
}

#[derive(Debug)]
pub enum ExpressionKind {
    Literal(Box<Literal>),
    Identifier(Box<Identifier>),
    Grouping(Box<Expression>),
    List(Box<[Expression]>),
    Map(Box<[MapEntry]>),
    StringInterpolation(Box<[StringPart]>),
    FunctionLiteral(Box<FunctionLiteral>),
    FunctionCall {
        target: Box<Expression>,
        arguments: Box<FunctionCallArgumentList>,
    },
    Binary {
        lhs: Box<Expression>,
        operator: BinaryOperator,
        rhs: Box<Expression>,
    },
    Unary {
        operator: UnaryOperator,
        operand: Box<Expression>,
    },
    Assignment {
        target: Box<Identifier>,
        rhs: Box<Expression>,
    },
    OperatorAssignment {
        operator: AssignmentOperator,
        target: Box<Identifier>,
        rhs: Box<Expression>,
    },
}

#[derive(Debug)]
pub struct MapEntry {
    pub id: NodeId,
    pub span: Span,
    pub key: Expression,
    pub value: Expression,
}

#[derive(Debug)]
pub enum StringPart {
    Fragment(String),
    Expression(Expression),
}

#[derive(Debug)]
pub struct FunctionLiteral {
    pub id: NodeId,
    pub span: Span,
    pub parameters: FunctionParameterList,
    /// Arrow bodies (`=> e`) are stored as a block holding `return e;`
    pub body: Block,
}

#[derive(Debug)]
pub struct FunctionCallArgumentList {
    pub id: NodeId,
    pub span: Span,
    pub arguments: Vec<Expression>,
}

#[derive(Debug)]
pub struct BinaryOperator {
    pub id: NodeId,
    pub span: Span,
    pub kind: BinaryOperatorKind,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOperatorKind {
    Add,                  // +
    Subtract,             // -
    Multiply,             // *
    Divide,               // /
    Modulus,              // %
    Equals,               // ==
    NotEquals,            // !=
    LessThan,             // <
    LessThanOrEqualTo,    // <=
    GreaterThan,          // >
    GreaterThanOrEqualTo, // >=
    LogicalAnd,           // &&
    LogicalOr,            // ||
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOperatorClass {
    Arithmetic,
    Comparison,
    Logical,
    Equality,
}

impl BinaryOperatorKind {
    pub fn class(self) -> BinaryOperatorClass {
        match self {
            Self::Add | Self::Subtract | Self::Multiply | Self::Divide | Self::Modulus => {
                BinaryOperatorClass::Arithmetic
            }
            Self::LessThan
            | Self::LessThanOrEqualTo
            | Self::GreaterThan
            | Self::GreaterThanOrEqualTo => BinaryOperatorClass::Comparison,
            Self::LogicalAnd | Self::LogicalOr => BinaryOperatorClass::Logical,
            Self::Equals | Self::NotEquals => BinaryOperatorClass::Equality,
        }
    }
}

#[derive(Debug)]
pub struct UnaryOperator {
    pub id: NodeId,
    pub span: Span,
    pub kind: UnaryOperatorKind,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOperatorKind {
    LogicalNot, // !
    Negate,     // -
}

impl core::fmt::Display for UnaryOperatorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::LogicalNot => write!(f, "!"),
            Self::Negate => write!(f, "-"),
        }
    }
}

#[derive(Debug)]
pub struct Literal {
    pub id: NodeId,
    pub span: Span,
    pub kind: LiteralKind,
    /// Source text for numbers and booleans, decoded contents for strings
    pub symbol: Symbol,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LiteralKind {
    Null,    // null
    Boolean, // true
    Integer, // 1
    Double,  // 1.0
    String,  // 'hello, world'
}

#[derive(Debug)]
pub struct AssignmentOperator {
    pub id: NodeId,
    pub span: Span,
    pub kind: AssignmentOperatorKind,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssignmentOperatorKind {
    Add,      // +=
    Subtract, // -=
    Multiply, // *=
    Divide,   // /=
    Modulus,  // %=
}

impl AssignmentOperatorKind {
    /// The binary operator applied between the old value and the right hand side
    pub fn binary(self) -> BinaryOperatorKind {
        match self {
            Self::Add => BinaryOperatorKind::Add,
            Self::Subtract => BinaryOperatorKind::Subtract,
            Self::Multiply => BinaryOperatorKind::Multiply,
            Self::Divide => BinaryOperatorKind::Divide,
            Self::Modulus => BinaryOperatorKind::Modulus,
        }
    }
}
