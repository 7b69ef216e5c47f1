//! Coarse static types, just precise enough to pick a stringification entry
//! point for interpolated values and printed arguments.

use strum::Display;

use crate::frontend::ast::{
    BinaryOperatorClass, BinaryOperatorKind, Expression, ExpressionKind, Identifier, LiteralKind,
    UnaryOperatorKind,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display)]
pub enum StaticType {
    Null,
    #[strum(serialize = "bool")]
    Bool,
    #[strum(serialize = "int")]
    Int,
    #[strum(serialize = "double")]
    Double,
    #[strum(serialize = "num")]
    Number,
    String,
    List,
    Map,
    Function,
    #[strum(serialize = "dynamic")]
    Dynamic,
}

impl StaticType {
    /// The type named by a source annotation; unknown names are `dynamic`.
    pub fn from_annotation(name: &str) -> Self {
        match name {
            "bool" => Self::Bool,
            "int" => Self::Int,
            "double" => Self::Double,
            "num" => Self::Number,
            "String" => Self::String,
            "List" => Self::List,
            "Map" => Self::Map,
            "Function" => Self::Function,
            "Null" => Self::Null,
            _ => Self::Dynamic,
        }
    }

    pub fn is_numeric(self) -> bool {
        matches!(self, Self::Int | Self::Double | Self::Number)
    }

    /// Least upper bound of two types.
    pub fn join(self, other: Self) -> Self {
        if self == other {
            self
        } else if self.is_numeric() && other.is_numeric() {
            Self::Number
        } else {
            Self::Dynamic
        }
    }
}

/// Supplies the types of names while typing an expression.
pub trait TypeEnvironment {
    fn type_of_identifier(&self, identifier: &Identifier) -> StaticType;
}

pub fn type_of(expression: &Expression, environment: &impl TypeEnvironment) -> StaticType {
    match &expression.kind {
        ExpressionKind::Literal(literal) => match literal.kind {
            LiteralKind::Null => StaticType::Null,
            LiteralKind::Boolean => StaticType::Bool,
            LiteralKind::Integer => StaticType::Int,
            LiteralKind::Double => StaticType::Double,
            LiteralKind::String => StaticType::String,
        },
        ExpressionKind::Identifier(identifier) => environment.type_of_identifier(identifier),
        ExpressionKind::Grouping(inner) => type_of(inner, environment),
        ExpressionKind::List(_) => StaticType::List,
        ExpressionKind::Map(_) => StaticType::Map,
        ExpressionKind::StringInterpolation(_) => StaticType::String,
        ExpressionKind::FunctionLiteral(_) => StaticType::Function,
        ExpressionKind::FunctionCall { .. } => StaticType::Dynamic,
        ExpressionKind::Binary { lhs, operator, rhs } => binary_result_type(
            operator.kind,
            type_of(lhs, environment),
            type_of(rhs, environment),
        ),
        ExpressionKind::Unary { operator, operand } => {
            unary_result_type(operator.kind, type_of(operand, environment))
        }
        ExpressionKind::Assignment { rhs, .. } => type_of(rhs, environment),
        ExpressionKind::OperatorAssignment {
            operator,
            target,
            rhs,
        } => binary_result_type(
            operator.kind.binary(),
            environment.type_of_identifier(target),
            type_of(rhs, environment),
        ),
    }
}

pub fn binary_result_type(
    operator: BinaryOperatorKind,
    lhs: StaticType,
    rhs: StaticType,
) -> StaticType {
    match operator.class() {
        BinaryOperatorClass::Comparison
        | BinaryOperatorClass::Logical
        | BinaryOperatorClass::Equality => StaticType::Bool,
        BinaryOperatorClass::Arithmetic => match (operator, lhs, rhs) {
            (BinaryOperatorKind::Add, StaticType::String, StaticType::String) => {
                StaticType::String
            }
            _ if !(lhs.is_numeric() && rhs.is_numeric()) => StaticType::Dynamic,
            (BinaryOperatorKind::Divide, _, _) => StaticType::Double,
            (_, StaticType::Int, StaticType::Int) => StaticType::Int,
            (_, StaticType::Double, StaticType::Int | StaticType::Double)
            | (_, StaticType::Int, StaticType::Double) => StaticType::Double,
            _ => StaticType::Number,
        },
    }
}

pub fn unary_result_type(operator: UnaryOperatorKind, operand: StaticType) -> StaticType {
    match operator {
        UnaryOperatorKind::LogicalNot => StaticType::Bool,
        UnaryOperatorKind::Negate if operand.is_numeric() => operand,
        UnaryOperatorKind::Negate => StaticType::Dynamic,
    }
}
