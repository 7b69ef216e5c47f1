//! The JavaScript subset the backend emits.

use strum::Display;

pub mod pretty_print;

/// One emitted unit: a nullary `function() { ... }`.
#[derive(Debug, Clone, PartialEq)]
pub struct Program {
    pub body: Vec<Statement>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct VariableDeclarator {
    pub name: String,
    pub initializer: Option<Expression>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Statement {
    Var(Vec<VariableDeclarator>),
    Expression(Expression),
    Return(Option<Expression>),
    If {
        condition: Expression,
        positive: Box<Statement>,
        negative: Option<Box<Statement>>,
    },
    While {
        condition: Expression,
        body: Box<Statement>,
    },
    Block(Vec<Statement>),
    Throw(Expression),
}

impl Statement {
    pub fn var(name: impl Into<String>, initializer: Option<Expression>) -> Self {
        Self::Var(vec![VariableDeclarator {
            name: name.into(),
            initializer,
        }])
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Expression {
    Integer(i64),
    Double(f64),
    String(String),
    Boolean(bool),
    Null,
    Identifier(String),
    Member {
        object: Box<Expression>,
        property: String,
    },
    Array(Vec<Expression>),
    Object(Vec<(String, Expression)>),
    Function {
        parameters: Vec<String>,
        body: Vec<Statement>,
    },
    Call {
        callee: Box<Expression>,
        arguments: Vec<Expression>,
    },
    Unary {
        operator: UnaryOperator,
        operand: Box<Expression>,
    },
    Binary {
        operator: BinaryOperator,
        lhs: Box<Expression>,
        rhs: Box<Expression>,
    },
    Assign {
        target: Box<Expression>,
        value: Box<Expression>,
    },
}

impl Expression {
    pub fn identifier(name: impl Into<String>) -> Self {
        Self::Identifier(name.into())
    }

    pub fn string(value: impl Into<String>) -> Self {
        Self::String(value.into())
    }

    pub fn member(object: Expression, property: impl Into<String>) -> Self {
        Self::Member {
            object: Box::new(object),
            property: property.into(),
        }
    }

    /// A dotted path such as `P.print` or `console.log`.
    pub fn path(path: &str) -> Self {
        let mut segments = path.split('.');
        let first = Self::identifier(segments.next().unwrap_or_default());

        segments.fold(first, Self::member)
    }

    pub fn call(callee: Expression, arguments: Vec<Expression>) -> Self {
        Self::Call {
            callee: Box::new(callee),
            arguments,
        }
    }

    pub fn unary(operator: UnaryOperator, operand: Expression) -> Self {
        Self::Unary {
            operator,
            operand: Box::new(operand),
        }
    }

    pub fn binary(operator: BinaryOperator, lhs: Expression, rhs: Expression) -> Self {
        Self::Binary {
            operator,
            lhs: Box::new(lhs),
            rhs: Box::new(rhs),
        }
    }

    pub fn assign(target: Expression, value: Expression) -> Self {
        Self::Assign {
            target: Box::new(target),
            value: Box::new(value),
        }
    }

    /// `typeof name == "kind"`
    pub fn type_of_is(name: &str, kind: &str) -> Self {
        Self::binary(
            BinaryOperator::LooseEquals,
            Self::unary(UnaryOperator::TypeOf, Self::identifier(name)),
            Self::string(kind),
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum UnaryOperator {
    #[strum(serialize = "!")]
    Not,
    #[strum(serialize = "-")]
    Negate,
    #[strum(serialize = "typeof")]
    TypeOf,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum BinaryOperator {
    #[strum(serialize = "+")]
    Add,
    #[strum(serialize = "-")]
    Subtract,
    #[strum(serialize = "*")]
    Multiply,
    #[strum(serialize = "/")]
    Divide,
    #[strum(serialize = "%")]
    Modulus,
    #[strum(serialize = "==")]
    LooseEquals,
    #[strum(serialize = "!=")]
    LooseNotEquals,
    #[strum(serialize = "===")]
    StrictEquals,
    #[strum(serialize = "!==")]
    StrictNotEquals,
    #[strum(serialize = "<")]
    LessThan,
    #[strum(serialize = "<=")]
    LessThanOrEqualTo,
    #[strum(serialize = ">")]
    GreaterThan,
    #[strum(serialize = ">=")]
    GreaterThanOrEqualTo,
    #[strum(serialize = "&&")]
    LogicalAnd,
    #[strum(serialize = "||")]
    LogicalOr,
}
