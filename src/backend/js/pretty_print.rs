use itertools::Itertools;

use super::{BinaryOperator, Expression, Program, Statement, UnaryOperator, VariableDeclarator};

const INDENT: &str = "  ";

mod precedence {
    pub const ASSIGNMENT: u8 = 1;
    pub const LOGICAL_OR: u8 = 3;
    pub const LOGICAL_AND: u8 = 4;
    pub const EQUALITY: u8 = 8;
    pub const RELATIONAL: u8 = 9;
    pub const ADDITIVE: u8 = 11;
    pub const MULTIPLICATIVE: u8 = 12;
    pub const UNARY: u8 = 14;
    pub const CALL: u8 = 17;
    pub const PRIMARY: u8 = 20;
}

/// Renders a unit as `function() {\n...}\n`.
pub fn print_program(program: &Program) -> String {
    let mut printer = Printer::new();

    printer.output.push_str("function() {\n");
    printer.indent += 1;

    for statement in &program.body {
        printer.statement(statement);
    }

    printer.indent -= 1;
    printer.output.push_str("}\n");

    printer.into_output()
}

struct Printer {
    output: String,
    indent: usize,
}

impl Printer {
    fn new() -> Self {
        Self {
            output: String::new(),
            indent: 0,
        }
    }

    fn into_output(self) -> String {
        self.output
    }

    fn push(&mut self, string: impl AsRef<str>) {
        self.output.push_str(string.as_ref());
    }

    fn push_indent(&mut self) {
        for _ in 0..self.indent {
            self.output.push_str(INDENT);
        }
    }

    /// Prints a statement on its own line(s) at the current indentation.
    fn statement(&mut self, statement: &Statement) {
        self.push_indent();
        self.statement_inline(statement);
    }

    fn nested_statement(&mut self, statement: &Statement) {
        self.indent += 1;
        self.statement(statement);
        self.indent -= 1;
    }

    fn block_contents(&mut self, statements: &[Statement]) {
        self.push("{\n");
        self.indent += 1;

        for statement in statements {
            self.statement(statement);
        }

        self.indent -= 1;
        self.push_indent();
        self.push("}");
    }

    /// Prints a statement assuming the indentation has already been written.
    fn statement_inline(&mut self, statement: &Statement) {
        match statement {
            Statement::Var(declarators) => {
                self.push("var ");

                for (index, VariableDeclarator { name, initializer }) in
                    declarators.iter().enumerate()
                {
                    if index > 0 {
                        self.push(", ");
                    }

                    self.push(name);

                    if let Some(initializer) = initializer {
                        self.push(" = ");
                        self.expression(initializer, precedence::ASSIGNMENT);
                    }
                }

                self.push(";\n");
            }
            Statement::Expression(expression) => {
                if starts_ambiguously(expression) {
                    self.push("(");
                    self.expression(expression, precedence::ASSIGNMENT);
                    self.push(")");
                } else {
                    self.expression(expression, precedence::ASSIGNMENT);
                }

                self.push(";\n");
            }
            Statement::Return(expression) => {
                self.push("return");

                if let Some(expression) = expression {
                    self.push(" ");
                    self.expression(expression, precedence::ASSIGNMENT);
                }

                self.push(";\n");
            }
            Statement::If {
                condition,
                positive,
                negative,
            } => self.if_statement(condition, positive, negative.as_deref()),
            Statement::While { condition, body } => {
                self.push("while (");
                self.expression(condition, precedence::ASSIGNMENT);
                self.push(")");
                self.body(body);

                if is_block(body) {
                    self.push("\n");
                }
            }
            Statement::Block(statements) => {
                self.block_contents(statements);
                self.push("\n");
            }
            Statement::Throw(expression) => {
                self.push("throw ");
                self.expression(expression, precedence::ASSIGNMENT);
                self.push(";\n");
            }
        }
    }

    /// Prints the body of an `if`/`while`. Blocks stay on the header line and
    /// leave the cursor after `}`; single statements go on the next line.
    fn body(&mut self, body: &Statement) {
        match body {
            Statement::Block(statements) => {
                self.push(" ");
                self.block_contents(statements);
            }
            other => {
                self.push("\n");
                self.nested_statement(other);
            }
        }
    }

    fn if_statement(
        &mut self,
        condition: &Expression,
        positive: &Statement,
        negative: Option<&Statement>,
    ) {
        self.push("if (");
        self.expression(condition, precedence::ASSIGNMENT);
        self.push(")");

        let braced;
        let positive = match (positive, negative) {
            // `if (a) if (b) x; else y;` would rebind the else
            (Statement::If { .. }, Some(_)) => {
                braced = Statement::Block(vec![positive.clone()]);
                &braced
            }
            _ => positive,
        };

        self.body(positive);

        let Some(negative) = negative else {
            if is_block(positive) {
                self.push("\n");
            }
            return;
        };

        if is_block(positive) {
            self.push(" else");
        } else {
            self.push_indent();
            self.push("else");
        }

        match negative {
            Statement::If {
                condition,
                positive,
                negative,
            } => {
                self.push(" ");
                self.if_statement(condition, positive, negative.as_deref());
            }
            other => {
                self.body(other);

                if is_block(other) {
                    self.push("\n");
                }
            }
        }
    }

    fn expression(&mut self, expression: &Expression, minimum: u8) {
        let needs_parentheses = precedence_of(expression) < minimum;

        if needs_parentheses {
            self.push("(");
        }

        self.expression_unparenthesized(expression);

        if needs_parentheses {
            self.push(")");
        }
    }

    fn expression_unparenthesized(&mut self, expression: &Expression) {
        match expression {
            Expression::Integer(value) => self.push(value.to_string()),
            Expression::Double(value) => self.push(format_double(*value)),
            Expression::String(value) => self.push(quote_string(value)),
            Expression::Boolean(value) => self.push(value.to_string()),
            Expression::Null => self.push("null"),
            Expression::Identifier(name) => self.push(name),
            Expression::Member { object, property } => {
                self.callee(object);
                self.push(".");
                self.push(property);
            }
            Expression::Array(elements) => {
                self.push("[");
                self.expression_list(elements);
                self.push("]");
            }
            Expression::Object(properties) => {
                self.push("{");

                for (index, (key, value)) in properties.iter().enumerate() {
                    if index > 0 {
                        self.push(", ");
                    }

                    if is_identifier_name(key) {
                        self.push(key);
                    } else {
                        self.push(quote_string(key));
                    }

                    self.push(": ");
                    self.expression(value, precedence::ASSIGNMENT);
                }

                self.push("}");
            }
            Expression::Function { parameters, body } => {
                self.push(format!("function({}) ", parameters.iter().join(", ")));
                self.block_contents(body);
            }
            Expression::Call { callee, arguments } => {
                self.callee(callee);
                self.push("(");
                self.expression_list(arguments);
                self.push(")");
            }
            Expression::Unary { operator, operand } => {
                self.push(operator.to_string());

                match operator {
                    UnaryOperator::TypeOf => {
                        self.push(" ");
                        self.expression(operand, precedence::UNARY);
                    }
                    UnaryOperator::Negate if starts_with_minus(operand) => {
                        self.push("(");
                        self.expression(operand, precedence::ASSIGNMENT);
                        self.push(")");
                    }
                    _ => self.expression(operand, precedence::UNARY),
                }
            }
            Expression::Binary { operator, lhs, rhs } => {
                let precedence = binary_precedence(*operator);

                self.expression(lhs, precedence);
                self.push(format!(" {operator} "));
                self.expression(rhs, precedence + 1);
            }
            Expression::Assign { target, value } => {
                self.expression(target, precedence::ASSIGNMENT + 1);
                self.push(" = ");
                self.expression(value, precedence::ASSIGNMENT);
            }
        }
    }

    /// The object of a member access or the target of a call.
    fn callee(&mut self, callee: &Expression) {
        if matches!(
            callee,
            Expression::Function { .. } | Expression::Integer(_) | Expression::Double(_)
        ) {
            self.push("(");
            self.expression_unparenthesized(callee);
            self.push(")");
        } else {
            self.expression(callee, precedence::CALL);
        }
    }

    fn expression_list(&mut self, expressions: &[Expression]) {
        for (index, expression) in expressions.iter().enumerate() {
            if index > 0 {
                self.push(", ");
            }

            self.expression(expression, precedence::ASSIGNMENT);
        }
    }
}

fn is_block(statement: &Statement) -> bool {
    matches!(statement, Statement::Block(_))
}

fn binary_precedence(operator: BinaryOperator) -> u8 {
    match operator {
        BinaryOperator::LogicalOr => precedence::LOGICAL_OR,
        BinaryOperator::LogicalAnd => precedence::LOGICAL_AND,
        BinaryOperator::LooseEquals
        | BinaryOperator::LooseNotEquals
        | BinaryOperator::StrictEquals
        | BinaryOperator::StrictNotEquals => precedence::EQUALITY,
        BinaryOperator::LessThan
        | BinaryOperator::LessThanOrEqualTo
        | BinaryOperator::GreaterThan
        | BinaryOperator::GreaterThanOrEqualTo => precedence::RELATIONAL,
        BinaryOperator::Add | BinaryOperator::Subtract => precedence::ADDITIVE,
        BinaryOperator::Multiply | BinaryOperator::Divide | BinaryOperator::Modulus => {
            precedence::MULTIPLICATIVE
        }
    }
}

fn precedence_of(expression: &Expression) -> u8 {
    match expression {
        Expression::Integer(value) if *value < 0 => precedence::UNARY,
        Expression::Double(value) if value.is_sign_negative() && !value.is_nan() => {
            precedence::UNARY
        }
        Expression::Member { .. } | Expression::Call { .. } => precedence::CALL,
        Expression::Unary { .. } => precedence::UNARY,
        Expression::Binary { operator, .. } => binary_precedence(*operator),
        Expression::Assign { .. } => precedence::ASSIGNMENT,
        _ => precedence::PRIMARY,
    }
}

fn starts_with_minus(expression: &Expression) -> bool {
    match expression {
        Expression::Integer(value) => *value < 0,
        Expression::Double(value) => value.is_sign_negative() && !value.is_nan(),
        Expression::Unary {
            operator: UnaryOperator::Negate,
            ..
        } => true,
        _ => false,
    }
}

/// Whether an expression statement would be read as a declaration or block.
fn starts_ambiguously(expression: &Expression) -> bool {
    match expression {
        Expression::Function { .. } | Expression::Object(_) => true,
        Expression::Member { object, .. } => starts_ambiguously(object),
        Expression::Call { callee, .. } => {
            !matches!(**callee, Expression::Function { .. }) && starts_ambiguously(callee)
        }
        Expression::Binary { lhs, .. } => starts_ambiguously(lhs),
        Expression::Assign { target, .. } => starts_ambiguously(target),
        _ => false,
    }
}

fn is_identifier_name(name: &str) -> bool {
    let mut chars = name.chars();

    chars
        .next()
        .is_some_and(|c| c.is_ascii_alphabetic() || c == '_' || c == '$')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '$')
}

fn format_double(value: f64) -> String {
    if value.is_nan() {
        "NaN".to_string()
    } else if value.is_infinite() {
        if value.is_sign_negative() {
            "-Infinity".to_string()
        } else {
            "Infinity".to_string()
        }
    } else if value.fract() == 0.0 && value.abs() < 1e21 {
        format!("{value:.0}")
    } else {
        value.to_string()
    }
}

fn quote_string(value: &str) -> String {
    let mut quoted = String::with_capacity(value.len() + 2);

    quoted.push('"');

    for c in value.chars() {
        match c {
            '"' => quoted.push_str("\\\""),
            '\\' => quoted.push_str("\\\\"),
            '\n' => quoted.push_str("\\n"),
            '\r' => quoted.push_str("\\r"),
            '\t' => quoted.push_str("\\t"),
            '\u{8}' => quoted.push_str("\\b"),
            '\u{c}' => quoted.push_str("\\f"),
            '\u{b}' => quoted.push_str("\\v"),
            '\u{2028}' => quoted.push_str("\\u2028"),
            '\u{2029}' => quoted.push_str("\\u2029"),
            c if c.is_control() => quoted.push_str(&format!("\\x{:02X}", c as u32)),
            c => quoted.push(c),
        }
    }

    quoted.push('"');
    quoted
}

#[cfg(test)]
mod tests {
    use indoc::indoc;

    use super::{print_program, quote_string};
    use crate::backend::js::{BinaryOperator, Expression, Program, Statement, UnaryOperator};

    fn print_expression(expression: Expression) -> String {
        let output = print_program(&Program {
            body: vec![Statement::Expression(expression)],
        });

        output
            .strip_prefix("function() {\n  ")
            .and_then(|rest| rest.strip_suffix(";\n}\n"))
            .unwrap()
            .to_string()
    }

    fn int(value: i64) -> Expression {
        Expression::Integer(value)
    }

    #[test]
    fn parenthesizes_by_precedence() {
        use BinaryOperator::*;

        let sum = Expression::binary(Add, int(1), int(2));

        assert_eq!(
            print_expression(Expression::binary(Multiply, sum.clone(), int(3))),
            "(1 + 2) * 3"
        );
        assert_eq!(
            print_expression(Expression::binary(Add, sum.clone(), int(3))),
            "1 + 2 + 3"
        );
        assert_eq!(
            print_expression(Expression::binary(Subtract, int(3), sum)),
            "3 - (1 + 2)"
        );
        assert_eq!(
            print_expression(Expression::unary(
                UnaryOperator::Not,
                Expression::type_of_is("window", "object")
            )),
            "!(typeof window == \"object\")"
        );
        assert_eq!(
            print_expression(Expression::unary(UnaryOperator::Negate, int(-1))),
            "-(-1)"
        );
    }

    #[test]
    fn function_callee_and_statement_are_wrapped() {
        let function = Expression::Function {
            parameters: vec![],
            body: vec![Statement::Return(Some(int(1)))],
        };

        assert_eq!(
            print_expression(Expression::call(function, vec![])),
            "(function() {\n    return 1;\n  })()"
        );
    }

    #[test]
    fn lays_out_nested_functions_and_else_chains() {
        let program = Program {
            body: vec![
                Statement::var(
                    "a",
                    Some(Expression::Function {
                        parameters: vec!["b".to_string()],
                        body: vec![Statement::Return(Some(Expression::member(
                            Expression::identifier("b"),
                            "value",
                        )))],
                    }),
                ),
                Statement::If {
                    condition: Expression::identifier("c"),
                    positive: Box::new(Statement::Expression(Expression::call(
                        Expression::identifier("f"),
                        vec![],
                    ))),
                    negative: Some(Box::new(Statement::If {
                        condition: Expression::identifier("d"),
                        positive: Box::new(Statement::Block(vec![Statement::Throw(
                            Expression::string("x"),
                        )])),
                        negative: Some(Box::new(Statement::Return(None))),
                    })),
                },
            ],
        };

        assert_eq!(
            print_program(&program),
            indoc! {r#"
                function() {
                  var a = function(b) {
                    return b.value;
                  };
                  if (c)
                    f();
                  else if (d) {
                    throw "x";
                  } else
                    return;
                }
            "#}
        );
    }

    #[test]
    fn escapes_strings() {
        assert_eq!(quote_string("a\"b\\c\nd"), r#""a\"b\\c\nd""#);
        assert_eq!(quote_string("it's"), r#""it's""#);
    }
}
