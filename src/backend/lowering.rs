//! Shared state for lowering one unit: variable naming, the body currently
//! being emitted, and the statement/expression lowering that the literal,
//! closure and print lowerers plug into.

use hashbrown::{HashMap, HashSet};
use log::trace;
use once_cell::sync::Lazy;

use super::{
    assemble, closure,
    js::{self, BinaryOperator, UnaryOperator, VariableDeclarator},
    literal, print,
};
use crate::{
    error::LoweringError,
    frontend::ast::{
        BinaryOperatorKind, Expression, ExpressionKind, Identifier, Local, Statement,
        StatementKind, UnaryOperatorKind,
    },
    middle::{
        capture::{CaptureAnalysis, FunctionId, Resolution, VariableId},
        eval::Constant,
        ty::{StaticType, type_of},
    },
    options::CompilerOptions,
};

pub type LoweringResult<T> = Result<T, LoweringError>;

static RESERVED_WORDS: Lazy<HashSet<&'static str>> = Lazy::new(|| {
    [
        "arguments", "await", "break", "case", "catch", "class", "const", "continue", "debugger",
        "default", "delete", "do", "else", "enum", "eval", "export", "extends", "false",
        "finally", "for", "function", "if", "implements", "import", "in", "Infinity",
        "instanceof", "interface", "let", "NaN", "new", "null", "package", "private",
        "protected", "public", "return", "static", "super", "switch", "this", "throw", "true",
        "try", "typeof", "undefined", "var", "void", "while", "with", "yield",
    ]
    .into_iter()
    .collect()
});

/// Hands out unit-wide unique JavaScript names: `x`, then `x0`, `x1`, ...
#[derive(Debug, Default)]
pub struct NameAllocator {
    used: HashSet<String>,
    reserved: HashSet<String>,
}

impl NameAllocator {
    pub fn new<'a>(reserved: impl IntoIterator<Item = &'a str>) -> Self {
        Self {
            used: HashSet::new(),
            reserved: reserved.into_iter().map(str::to_string).collect(),
        }
    }

    fn is_available(&self, name: &str) -> bool {
        !RESERVED_WORDS.contains(name) && !self.reserved.contains(name) && !self.used.contains(name)
    }

    pub fn allocate(&mut self, base: &str) -> String {
        let name = if self.is_available(base) {
            base.to_string()
        } else {
            (0..)
                .map(|suffix| format!("{base}{suffix}"))
                .find(|candidate| self.is_available(candidate))
                .unwrap_or_default()
        };

        self.used.insert(name.clone());
        name
    }
}

/// The function body currently being emitted.
#[derive(Debug)]
pub struct BodyFrame {
    pub function: FunctionId,
    /// Stack locals declared after the leading declarations, hoisted
    /// uninitialized into the body's `var` statement
    pub stack_locals: Vec<String>,
}

impl BodyFrame {
    pub fn new(function: FunctionId) -> Self {
        Self {
            function,
            stack_locals: Vec::new(),
        }
    }
}

pub struct LoweringContext<'a> {
    pub analysis: &'a CaptureAnalysis,
    pub options: &'a CompilerOptions,
    names: NameAllocator,
    variable_names: HashMap<VariableId, String>,
    body: BodyFrame,
}

impl<'a> LoweringContext<'a> {
    pub fn new(analysis: &'a CaptureAnalysis, options: &'a CompilerOptions) -> Self {
        Self {
            analysis,
            options,
            names: NameAllocator::new(options.runtime.namespaces()),
            variable_names: HashMap::new(),
            body: BodyFrame::new(FunctionId::UNIT),
        }
    }

    /// Makes `function` the body being emitted, returning the enclosing one.
    pub fn enter_body(&mut self, function: FunctionId) -> BodyFrame {
        std::mem::replace(&mut self.body, BodyFrame::new(function))
    }

    /// Restores the enclosing body, returning the finished one.
    pub fn exit_body(&mut self, previous: BodyFrame) -> BodyFrame {
        std::mem::replace(&mut self.body, previous)
    }

    /// Name of the source function being lowered, for diagnostics.
    pub fn function_name(&self) -> String {
        self.analysis.function(self.body.function).name.to_string()
    }

    pub fn variable_name(&mut self, id: VariableId) -> String {
        if let Some(name) = self.variable_names.get(&id) {
            return name.clone();
        }

        let variable = self.analysis.variable(id);
        let name = self.names.allocate(variable.name.value());

        trace!("`{}` ({id:?}) is emitted as `{name}`", variable.name);

        self.variable_names.insert(id, name.clone());
        name
    }

    /// The literal every use of a constant local folds to.
    pub fn folded_constant(&self, id: VariableId) -> Option<&'a Constant> {
        if !self.options.fold_constants {
            return None;
        }

        self.analysis.variable(id).constant_value()
    }

    pub fn static_type(&self, expression: &Expression) -> StaticType {
        type_of(expression, self.analysis)
    }

    /// The scalar value of an expression that folds at compile time.
    pub fn constant_of(&self, expression: &Expression) -> Option<Constant> {
        if !self.options.fold_constants {
            return None;
        }

        match &expression.without_grouping().kind {
            ExpressionKind::Literal(literal) => Some(Constant::from_literal(literal)),
            ExpressionKind::Identifier(identifier) => match self.analysis.resolution(identifier) {
                Resolution::Variable(id) => self.folded_constant(id).cloned(),
                Resolution::Print => None,
            },
            _ => None,
        }
    }

    /// Lowers one of the declarations that open a body into a declarator of
    /// the merged `var` statement.
    pub fn lower_leading_local(
        &mut self,
        local: &Local,
    ) -> LoweringResult<Option<VariableDeclarator>> {
        let Some((name, initializer)) = self.lower_declaration(local)? else {
            return Ok(None);
        };

        Ok(Some(VariableDeclarator {
            name,
            initializer: Some(initializer),
        }))
    }

    /// Lowers a declaration anywhere else: stack locals become assignments,
    /// boxed locals allocate their box in place.
    fn lower_local(&mut self, local: &Local) -> LoweringResult<Option<js::Statement>> {
        let id = self.analysis.declared_variable(local.id);
        let Some((name, initializer)) = self.lower_declaration(local)? else {
            return Ok(None);
        };

        if self.analysis.variable(id).is_boxed() {
            return Ok(Some(js::Statement::var(name, Some(initializer))));
        }

        self.body.stack_locals.push(name.clone());

        Ok(Some(js::Statement::Expression(js::Expression::assign(
            js::Expression::Identifier(name),
            initializer,
        ))))
    }

    /// The emitted name and initial value of a declaration, or `None` when the
    /// declaration folds away.
    fn lower_declaration(&mut self, local: &Local) -> LoweringResult<Option<(String, js::Expression)>> {
        let id = self.analysis.declared_variable(local.id);
        let variable = self.analysis.variable(id);

        if self.folded_constant(id).is_some() {
            trace!("dropping constant local `{}`", variable.name);
            return Ok(None);
        }

        let name = self.variable_name(id);
        let initializer = match &local.initializer {
            Some(initializer) => self.lower_expression(initializer)?,
            None => js::Expression::Null,
        };

        if variable.is_boxed() {
            return Ok(Some((name, closure::allocate_box(initializer))));
        }

        Ok(Some((name, initializer)))
    }

    pub fn lower_statements(&mut self, statements: &[Statement]) -> LoweringResult<Vec<js::Statement>> {
        let mut lowered = Vec::with_capacity(statements.len());

        for statement in statements {
            if let Some(statement) = self.lower_statement(statement)? {
                lowered.push(statement);
            }
        }

        Ok(lowered)
    }

    fn lower_nested_statement(&mut self, statement: &Statement) -> LoweringResult<js::Statement> {
        Ok(self
            .lower_statement(statement)?
            .unwrap_or_else(|| js::Statement::Block(Vec::new())))
    }

    pub fn lower_statement(&mut self, statement: &Statement) -> LoweringResult<Option<js::Statement>> {
        let lowered = match &statement.kind {
            StatementKind::Local(local) => return self.lower_local(local),
            StatementKind::Expression(expression) => {
                js::Statement::Expression(self.lower_expression(expression)?)
            }
            StatementKind::If {
                condition,
                positive,
                negative,
            } => js::Statement::If {
                condition: self.lower_expression(condition)?,
                positive: Box::new(self.lower_nested_statement(positive)?),
                negative: match negative {
                    Some(negative) => Some(Box::new(self.lower_nested_statement(negative)?)),
                    None => None,
                },
            },
            StatementKind::While { condition, body } => js::Statement::While {
                condition: self.lower_expression(condition)?,
                body: Box::new(self.lower_nested_statement(body)?),
            },
            StatementKind::Return(expression) => js::Statement::Return(match expression {
                Some(expression) => Some(self.lower_expression(expression)?),
                None => None,
            }),
            StatementKind::Block(block) => {
                js::Statement::Block(self.lower_statements(&block.statements)?)
            }
            StatementKind::Empty => return Ok(None),
        };

        Ok(Some(lowered))
    }

    pub fn lower_expression(&mut self, expression: &Expression) -> LoweringResult<js::Expression> {
        Ok(match &expression.kind {
            ExpressionKind::Literal(literal) => {
                literal::lower_constant(&Constant::from_literal(literal))
            }
            ExpressionKind::Identifier(identifier) => self.lower_variable_read(identifier)?,
            ExpressionKind::Grouping(inner) => self.lower_expression(inner)?,
            ExpressionKind::List(elements) => literal::lower_list(self, elements)?,
            ExpressionKind::Map(entries) => literal::lower_map(self, entries)?,
            ExpressionKind::StringInterpolation(parts) => {
                literal::lower_interpolation(self, parts)?
            }
            ExpressionKind::FunctionLiteral(function) => {
                closure::lower_function_literal(self, function)?
            }
            ExpressionKind::FunctionCall { target, arguments } => {
                let is_print = target.as_identifier().is_some_and(|identifier| {
                    self.analysis.resolution(identifier) == Resolution::Print
                });

                if is_print {
                    print::lower_print_call(self, expression.span, &arguments.arguments)?
                } else {
                    let callee = self.lower_expression(target)?;
                    let arguments = arguments
                        .arguments
                        .iter()
                        .map(|argument| self.lower_expression(argument))
                        .collect::<LoweringResult<Vec<_>>>()?;

                    js::Expression::call(callee, arguments)
                }
            }
            ExpressionKind::Binary { lhs, operator, rhs } => js::Expression::binary(
                lower_binary_operator(operator.kind),
                self.lower_expression(lhs)?,
                self.lower_expression(rhs)?,
            ),
            ExpressionKind::Unary { operator, operand } => js::Expression::unary(
                lower_unary_operator(operator.kind),
                self.lower_expression(operand)?,
            ),
            ExpressionKind::Assignment { target, rhs } => {
                let value = self.lower_expression(rhs)?;

                js::Expression::assign(self.lower_variable_write(target)?, value)
            }
            ExpressionKind::OperatorAssignment {
                operator,
                target,
                rhs,
            } => {
                let current = self.lower_variable_read(target)?;
                let rhs = self.lower_expression(rhs)?;
                let value = js::Expression::binary(
                    lower_binary_operator(operator.kind.binary()),
                    current,
                    rhs,
                );

                js::Expression::assign(self.lower_variable_write(target)?, value)
            }
        })
    }

    fn lower_variable_read(&mut self, identifier: &Identifier) -> LoweringResult<js::Expression> {
        let id = self.variable_of(identifier)?;

        if let Some(constant) = self.folded_constant(id) {
            return Ok(literal::lower_constant(constant));
        }

        Ok(self.lower_variable_access(id))
    }

    fn lower_variable_write(&mut self, identifier: &Identifier) -> LoweringResult<js::Expression> {
        let id = self.variable_of(identifier)?;

        Ok(self.lower_variable_access(id))
    }

    /// `x`, or `x.value` when `x` is boxed.
    fn lower_variable_access(&mut self, id: VariableId) -> js::Expression {
        let name = js::Expression::Identifier(self.variable_name(id));

        if self.analysis.variable(id).is_boxed() {
            closure::box_value(name)
        } else {
            name
        }
    }

    fn variable_of(&self, identifier: &Identifier) -> LoweringResult<VariableId> {
        match self.analysis.resolution(identifier) {
            Resolution::Variable(id) => Ok(id),
            Resolution::Print => Err(LoweringError::UnsupportedBuiltinUse {
                function: self.function_name(),
                span: identifier.span,
            }),
        }
    }

    /// Lowers a nested function body with its own hoisting.
    pub fn lower_body(
        &mut self,
        function: FunctionId,
        statements: &[Statement],
    ) -> LoweringResult<Vec<js::Statement>> {
        assemble::assemble_body(self, function, statements)
    }
}

pub fn lower_binary_operator(operator: BinaryOperatorKind) -> BinaryOperator {
    match operator {
        BinaryOperatorKind::Add => BinaryOperator::Add,
        BinaryOperatorKind::Subtract => BinaryOperator::Subtract,
        BinaryOperatorKind::Multiply => BinaryOperator::Multiply,
        BinaryOperatorKind::Divide => BinaryOperator::Divide,
        BinaryOperatorKind::Modulus => BinaryOperator::Modulus,
        BinaryOperatorKind::Equals => BinaryOperator::StrictEquals,
        BinaryOperatorKind::NotEquals => BinaryOperator::StrictNotEquals,
        BinaryOperatorKind::LessThan => BinaryOperator::LessThan,
        BinaryOperatorKind::LessThanOrEqualTo => BinaryOperator::LessThanOrEqualTo,
        BinaryOperatorKind::GreaterThan => BinaryOperator::GreaterThan,
        BinaryOperatorKind::GreaterThanOrEqualTo => BinaryOperator::GreaterThanOrEqualTo,
        BinaryOperatorKind::LogicalAnd => BinaryOperator::LogicalAnd,
        BinaryOperatorKind::LogicalOr => BinaryOperator::LogicalOr,
    }
}

pub fn lower_unary_operator(operator: UnaryOperatorKind) -> UnaryOperator {
    match operator {
        UnaryOperatorKind::LogicalNot => UnaryOperator::Not,
        UnaryOperatorKind::Negate => UnaryOperator::Negate,
    }
}

#[cfg(test)]
mod tests {
    use super::NameAllocator;

    #[test]
    fn allocates_suffixed_names() {
        let mut names = NameAllocator::new(["P", "H"]);

        assert_eq!(names.allocate("x"), "x");
        assert_eq!(names.allocate("x"), "x0");
        assert_eq!(names.allocate("x"), "x1");
        assert_eq!(names.allocate("x0"), "x00");
    }

    #[test]
    fn avoids_reserved_words_and_namespaces() {
        let mut names = NameAllocator::new(["P", "H"]);

        assert_eq!(names.allocate("P"), "P0");
        assert_eq!(names.allocate("function"), "function0");
        assert_eq!(names.allocate("this"), "this0");
        assert_eq!(names.allocate("value"), "value");
    }
}
