//! Symbolic evaluation of the entry function. Values that flow into the single
//! `print` of a program are tracked as [`Folded`] trees; closures are real
//! closures over shared cells so capture-then-mutate behaves like at run time.

use std::{cell::RefCell, rc::Rc};

use hashbrown::HashMap;
use log::debug;
use strum::Display;

use crate::{
    frontend::ast::{
        BinaryOperatorKind, Block, Expression, ExpressionKind, FunctionDefinition,
        FunctionLiteral, Identifier, Literal, LiteralKind, Statement, StatementKind, StringPart,
        UnaryOperatorKind,
    },
    middle::{
        capture::{CaptureAnalysis, Resolution, VariableId},
        ty::{StaticType, binary_result_type, unary_result_type},
    },
};

pub const STEP_BUDGET: usize = 10_000;
const MAX_CALL_DEPTH: usize = 256;

#[derive(Debug, Clone, PartialEq)]
pub enum Constant {
    Null,
    Bool(bool),
    Int(i64),
    Double(f64),
    String(Rc<str>),
}

impl Constant {
    pub fn from_literal(literal: &Literal) -> Self {
        let text = literal.symbol.value();

        // Number literals were range checked by the parser
        match literal.kind {
            LiteralKind::Null => Self::Null,
            LiteralKind::Boolean => Self::Bool(text == "true"),
            LiteralKind::Integer => Self::Int(text.parse().unwrap_or_default()),
            LiteralKind::Double => Self::Double(text.parse().unwrap_or(f64::NAN)),
            LiteralKind::String => Self::String(text.into()),
        }
    }

    /// The value of an expression that is exactly a scalar literal.
    pub fn from_expression(expression: &Expression) -> Option<Self> {
        match &expression.kind {
            ExpressionKind::Literal(literal) => Some(Self::from_literal(literal)),
            _ => None,
        }
    }

    pub fn static_type(&self) -> StaticType {
        match self {
            Self::Null => StaticType::Null,
            Self::Bool(_) => StaticType::Bool,
            Self::Int(_) => StaticType::Int,
            Self::Double(_) => StaticType::Double,
            Self::String(_) => StaticType::String,
        }
    }

    /// The text `toString` produces for the value.
    pub fn to_display_string(&self) -> String {
        match self {
            Self::Null => "null".to_string(),
            Self::Bool(value) => value.to_string(),
            Self::Int(value) => value.to_string(),
            Self::Double(value) if value.is_nan() => "NaN".to_string(),
            Self::Double(value) if value.is_infinite() => {
                if value.is_sign_negative() {
                    "-Infinity".to_string()
                } else {
                    "Infinity".to_string()
                }
            }
            Self::Double(value) if value.fract() == 0.0 && value.abs() < 1e21 => {
                format!("{value:.1}")
            }
            Self::Double(value) => value.to_string(),
            Self::String(value) => value.to_string(),
        }
    }
}

/// A closure-free value whose arithmetic is kept symbolic.
#[derive(Debug, Clone, PartialEq)]
pub enum Folded {
    Constant(Constant),
    Unary {
        operator: UnaryOperatorKind,
        operand: Box<Folded>,
    },
    Binary {
        operator: BinaryOperatorKind,
        lhs: Box<Folded>,
        rhs: Box<Folded>,
    },
    /// An interpolation with at least one non-constant part
    Concatenation(Vec<Folded>),
}

impl Folded {
    pub fn static_type(&self) -> StaticType {
        match self {
            Self::Constant(constant) => constant.static_type(),
            Self::Unary { operator, operand } => {
                unary_result_type(*operator, operand.static_type())
            }
            Self::Binary { operator, lhs, rhs } => {
                binary_result_type(*operator, lhs.static_type(), rhs.static_type())
            }
            Self::Concatenation(_) => StaticType::String,
        }
    }

    pub fn as_constant(&self) -> Option<&Constant> {
        match self {
            Self::Constant(constant) => Some(constant),
            _ => None,
        }
    }

    /// Joins interpolated parts, turning constants into text and merging
    /// adjacent text.
    fn concatenate(parts: Vec<Folded>) -> Self {
        let mut merged: Vec<Folded> = Vec::new();

        for part in parts {
            match part {
                Self::Constant(constant) => {
                    let text = constant.to_display_string();

                    if text.is_empty() {
                        continue;
                    }

                    if let Some(Self::Constant(Constant::String(previous))) = merged.last_mut() {
                        *previous = format!("{previous}{text}").into();
                    } else {
                        merged.push(Self::Constant(Constant::String(text.into())));
                    }
                }
                other => merged.push(other),
            }
        }

        match merged.len() {
            0 => Self::Constant(Constant::String("".into())),
            1 if matches!(merged[0], Self::Constant(_)) => merged.remove(0),
            _ => Self::Concatenation(merged),
        }
    }
}

/// Why the entry function could not be reduced to a single printed value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum Unfoldable {
    #[strum(serialize = "the entry point takes parameters")]
    EntryParameters,
    #[strum(serialize = "the program contains a loop")]
    Loop,
    #[strum(serialize = "the program allocates a list or map")]
    Allocation,
    #[strum(serialize = "a branch condition is not a boolean literal")]
    NonConstantCondition,
    #[strum(serialize = "a call target is not a function literal value")]
    DynamicCall,
    #[strum(serialize = "`print` is used as a value")]
    BuiltinAsValue,
    #[strum(serialize = "a call passes the wrong number of arguments")]
    ArityMismatch,
    #[strum(serialize = "a closure flows into an operation")]
    ClosureValue,
    #[strum(serialize = "a variable is read before it is bound")]
    UnboundVariable,
    #[strum(serialize = "the program prints more than once")]
    MultiplePrints,
    #[strum(serialize = "the program never prints")]
    NoPrint,
    #[strum(serialize = "calls are nested too deeply")]
    CallDepthExceeded,
    #[strum(serialize = "the step budget was exceeded")]
    StepBudgetExceeded,
}

#[derive(Debug, Clone)]
pub enum Value<'ast> {
    Data(Folded),
    Closure(Rc<Closure<'ast>>),
}

impl Value<'_> {
    fn null() -> Self {
        Self::Data(Folded::Constant(Constant::Null))
    }

    fn into_data(self) -> Result<Folded, Unfoldable> {
        match self {
            Self::Data(folded) => Ok(folded),
            Self::Closure(_) => Err(Unfoldable::ClosureValue),
        }
    }
}

#[derive(Debug)]
pub struct Closure<'ast> {
    literal: &'ast FunctionLiteral,
    frame: Rc<Frame<'ast>>,
}

/// Cells for the variables of one activation, chained to the frame the
/// function literal was created in.
#[derive(Debug, Default)]
struct Frame<'ast> {
    cells: RefCell<HashMap<VariableId, Value<'ast>>>,
    parent: Option<Rc<Frame<'ast>>>,
}

impl<'ast> Frame<'ast> {
    fn child(parent: Rc<Frame<'ast>>) -> Rc<Self> {
        Rc::new(Self {
            cells: RefCell::new(HashMap::new()),
            parent: Some(parent),
        })
    }

    fn define(&self, id: VariableId, value: Value<'ast>) {
        self.cells.borrow_mut().insert(id, value);
    }

    fn lookup(&self, id: VariableId) -> Option<Value<'ast>> {
        if let Some(value) = self.cells.borrow().get(&id) {
            return Some(value.clone());
        }

        self.parent.as_ref().and_then(|parent| parent.lookup(id))
    }

    fn assign(&self, id: VariableId, value: Value<'ast>) -> Result<(), Unfoldable> {
        if let Some(cell) = self.cells.borrow_mut().get_mut(&id) {
            *cell = value;
            return Ok(());
        }

        match &self.parent {
            Some(parent) => parent.assign(id, value),
            None => Err(Unfoldable::UnboundVariable),
        }
    }
}

enum Flow<'ast> {
    Normal,
    Return(Value<'ast>),
}

type EvalResult<T> = Result<T, Unfoldable>;

/// Runs `main` symbolically and returns the one value it prints.
pub fn evaluate_program(
    function: &FunctionDefinition,
    analysis: &CaptureAnalysis,
) -> Result<Folded, Unfoldable> {
    if !function.parameters.parameters.is_empty() {
        return Err(Unfoldable::EntryParameters);
    }

    let mut evaluator = Evaluator {
        analysis,
        steps: 0,
        depth: 0,
        printed: None,
    };

    let frame = Rc::new(Frame::default());
    let result = evaluator
        .execute_block(&function.body, &frame)
        .and_then(|_| evaluator.printed.take().ok_or(Unfoldable::NoPrint));

    match &result {
        Ok(value) => debug!("`main` reduces to printing {value:?} ({} steps)", evaluator.steps),
        Err(reason) => debug!("`main` is not foldable: {reason}"),
    }

    result
}

struct Evaluator<'a> {
    analysis: &'a CaptureAnalysis,
    steps: usize,
    depth: usize,
    printed: Option<Folded>,
}

impl<'ast> Evaluator<'_> {
    fn step(&mut self) -> EvalResult<()> {
        self.steps += 1;

        if self.steps > STEP_BUDGET {
            return Err(Unfoldable::StepBudgetExceeded);
        }

        Ok(())
    }

    fn execute_block(&mut self, block: &'ast Block, frame: &Rc<Frame<'ast>>) -> EvalResult<Flow<'ast>> {
        for statement in &block.statements {
            if let Flow::Return(value) = self.execute_statement(statement, frame)? {
                return Ok(Flow::Return(value));
            }
        }

        Ok(Flow::Normal)
    }

    fn execute_statement(
        &mut self,
        statement: &'ast Statement,
        frame: &Rc<Frame<'ast>>,
    ) -> EvalResult<Flow<'ast>> {
        self.step()?;

        match &statement.kind {
            StatementKind::Local(local) => {
                let value = match &local.initializer {
                    Some(initializer) => self.evaluate(initializer, frame)?,
                    None => Value::null(),
                };

                frame.define(self.analysis.declared_variable(local.id), value);
            }
            StatementKind::Expression(expression) => {
                self.evaluate(expression, frame)?;
            }
            StatementKind::If {
                condition,
                positive,
                negative,
            } => {
                if self.evaluate_condition(condition, frame)? {
                    return self.execute_statement(positive, frame);
                } else if let Some(negative) = negative {
                    return self.execute_statement(negative, frame);
                }
            }
            StatementKind::While { .. } => return Err(Unfoldable::Loop),
            StatementKind::Return(expression) => {
                let value = match expression {
                    Some(expression) => self.evaluate(expression, frame)?,
                    None => Value::null(),
                };

                return Ok(Flow::Return(value));
            }
            StatementKind::Block(block) => return self.execute_block(block, frame),
            StatementKind::Empty => {}
        }

        Ok(Flow::Normal)
    }

    fn evaluate_condition(
        &mut self,
        condition: &'ast Expression,
        frame: &Rc<Frame<'ast>>,
    ) -> EvalResult<bool> {
        match self.evaluate(condition, frame)? {
            Value::Data(Folded::Constant(Constant::Bool(value))) => Ok(value),
            _ => Err(Unfoldable::NonConstantCondition),
        }
    }

    fn evaluate_data(
        &mut self,
        expression: &'ast Expression,
        frame: &Rc<Frame<'ast>>,
    ) -> EvalResult<Folded> {
        self.evaluate(expression, frame)?.into_data()
    }

    fn evaluate(
        &mut self,
        expression: &'ast Expression,
        frame: &Rc<Frame<'ast>>,
    ) -> EvalResult<Value<'ast>> {
        self.step()?;

        match &expression.kind {
            ExpressionKind::Literal(literal) => {
                Ok(Value::Data(Folded::Constant(Constant::from_literal(literal))))
            }
            ExpressionKind::Identifier(identifier) => match self.analysis.resolution(identifier) {
                Resolution::Variable(id) => frame.lookup(id).ok_or(Unfoldable::UnboundVariable),
                Resolution::Print => Err(Unfoldable::BuiltinAsValue),
            },
            ExpressionKind::Grouping(inner) => self.evaluate(inner, frame),
            ExpressionKind::List(_) | ExpressionKind::Map(_) => Err(Unfoldable::Allocation),
            ExpressionKind::StringInterpolation(parts) => {
                let mut folded = Vec::with_capacity(parts.len());

                for part in parts {
                    folded.push(match part {
                        StringPart::Fragment(text) => {
                            Folded::Constant(Constant::String(text.as_str().into()))
                        }
                        StringPart::Expression(expression) => {
                            self.evaluate_data(expression, frame)?
                        }
                    });
                }

                Ok(Value::Data(Folded::concatenate(folded)))
            }
            ExpressionKind::FunctionLiteral(literal) => Ok(Value::Closure(Rc::new(Closure {
                literal,
                frame: Rc::clone(frame),
            }))),
            ExpressionKind::FunctionCall { target, arguments } => {
                let is_print = target.as_identifier().is_some_and(|identifier| {
                    self.analysis.resolution(identifier) == Resolution::Print
                });

                if is_print {
                    let [argument] = arguments.arguments.as_slice() else {
                        return Err(Unfoldable::ArityMismatch);
                    };

                    let value = self.evaluate_data(argument, frame)?;

                    if self.printed.replace(value).is_some() {
                        return Err(Unfoldable::MultiplePrints);
                    }

                    return Ok(Value::null());
                }

                let Value::Closure(closure) = self.evaluate(target, frame)? else {
                    return Err(Unfoldable::DynamicCall);
                };

                let literal = closure.literal;
                let parameters = &literal.parameters.parameters;

                if parameters.len() != arguments.arguments.len() {
                    return Err(Unfoldable::ArityMismatch);
                }

                let activation = Frame::child(Rc::clone(&closure.frame));

                for (parameter, argument) in parameters.iter().zip(&arguments.arguments) {
                    let value = self.evaluate(argument, frame)?;

                    activation.define(self.analysis.declared_variable(parameter.id), value);
                }

                self.depth += 1;

                if self.depth > MAX_CALL_DEPTH {
                    return Err(Unfoldable::CallDepthExceeded);
                }

                let flow = self.execute_block(&literal.body, &activation)?;

                self.depth -= 1;

                Ok(match flow {
                    Flow::Return(value) => value,
                    Flow::Normal => Value::null(),
                })
            }
            ExpressionKind::Binary { lhs, operator, rhs } => match operator.kind {
                BinaryOperatorKind::LogicalAnd | BinaryOperatorKind::LogicalOr => {
                    let short_circuit = operator.kind == BinaryOperatorKind::LogicalOr;

                    if self.evaluate_condition(lhs, frame)? == short_circuit {
                        Ok(Value::Data(Folded::Constant(Constant::Bool(short_circuit))))
                    } else {
                        self.evaluate(rhs, frame)
                    }
                }
                kind => {
                    let lhs = self.evaluate_data(lhs, frame)?;
                    let rhs = self.evaluate_data(rhs, frame)?;

                    Ok(Value::Data(Folded::Binary {
                        operator: kind,
                        lhs: Box::new(lhs),
                        rhs: Box::new(rhs),
                    }))
                }
            },
            ExpressionKind::Unary { operator, operand } => {
                let operand = self.evaluate_data(operand, frame)?;

                Ok(Value::Data(match (operator.kind, operand) {
                    (UnaryOperatorKind::LogicalNot, Folded::Constant(Constant::Bool(value))) => {
                        Folded::Constant(Constant::Bool(!value))
                    }
                    (kind, operand) => Folded::Unary {
                        operator: kind,
                        operand: Box::new(operand),
                    },
                }))
            }
            ExpressionKind::Assignment { target, rhs } => {
                let value = self.evaluate(rhs, frame)?;

                self.assign(target, value.clone(), frame)?;

                Ok(value)
            }
            ExpressionKind::OperatorAssignment {
                operator,
                target,
                rhs,
            } => {
                let current = match self.analysis.resolution(target) {
                    Resolution::Variable(id) => {
                        frame.lookup(id).ok_or(Unfoldable::UnboundVariable)?
                    }
                    Resolution::Print => return Err(Unfoldable::BuiltinAsValue),
                };
                let rhs = self.evaluate_data(rhs, frame)?;
                let value = Value::Data(Folded::Binary {
                    operator: operator.kind.binary(),
                    lhs: Box::new(current.into_data()?),
                    rhs: Box::new(rhs),
                });

                self.assign(target, value.clone(), frame)?;

                Ok(value)
            }
        }
    }

    fn assign(
        &self,
        target: &Identifier,
        value: Value<'ast>,
        frame: &Rc<Frame<'ast>>,
    ) -> EvalResult<()> {
        match self.analysis.resolution(target) {
            Resolution::Variable(id) => frame.assign(id, value),
            Resolution::Print => Err(Unfoldable::BuiltinAsValue),
        }
    }
}
