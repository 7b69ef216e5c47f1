//! Lowering of the `print` built-in, either to a runtime-library call or, for
//! programs that reduce to a single print, to an inline probe of the host's
//! output facilities.

use super::{
    js::{self, BinaryOperator, Expression, Statement, UnaryOperator},
    literal::{self, Piece},
    lowering::{LoweringContext, LoweringResult, lower_binary_operator, lower_unary_operator},
    runtime::{RuntimeEntry, RuntimeLibrary},
};
use crate::{
    error::LoweringError,
    frontend::{ast, lexer::Span},
    middle::eval::Folded,
    options::CompilerOptions,
};

const LINE: &str = "line";
const PROBE_FAILURE: &str = "Unable to print message: ";

/// How a print site is emitted. Chosen once per site.
#[derive(Debug, Clone, PartialEq)]
pub enum PrintSite {
    RuntimeCall(Expression),
    InlineProbe(Expression),
}

impl PrintSite {
    pub fn into_expression(self, runtime: &RuntimeLibrary) -> Expression {
        match self {
            PrintSite::RuntimeCall(argument) => runtime.call(RuntimeEntry::Print, vec![argument]),
            PrintSite::InlineProbe(line) => Expression::call(
                Expression::Function {
                    parameters: Vec::new(),
                    body: inline_probe(line),
                },
                Vec::new(),
            ),
        }
    }

    /// Statements for a site that makes up a whole body.
    pub fn into_statements(self, runtime: &RuntimeLibrary) -> Vec<Statement> {
        match self {
            PrintSite::InlineProbe(line) => inline_probe(line),
            site => vec![Statement::Expression(site.into_expression(runtime))],
        }
    }
}

pub fn lower_print_call(
    context: &mut LoweringContext,
    span: Span,
    arguments: &[ast::Expression],
) -> LoweringResult<Expression> {
    let [argument] = arguments else {
        return Err(LoweringError::PrintArity {
            found: arguments.len(),
            function: context.function_name(),
            span,
        });
    };

    let argument = lower_print_argument(context, argument)?;

    Ok(PrintSite::RuntimeCall(argument).into_expression(&context.options.runtime))
}

fn lower_print_argument(
    context: &mut LoweringContext,
    argument: &ast::Expression,
) -> LoweringResult<Expression> {
    if let Some(constant) = context.constant_of(argument) {
        return Ok(js::Expression::String(constant.to_display_string()));
    }

    let ty = context.static_type(argument);
    let lowered = context.lower_expression(argument)?;

    Ok(literal::stringify(&context.options.runtime, lowered, ty))
}

/// The probe's `line` value for a program that prints `value`.
pub fn printed_line(value: &Folded, options: &CompilerOptions) -> Expression {
    if options.fold_constants {
        if let Some(constant) = value.as_constant() {
            return js::Expression::String(constant.to_display_string());
        }
    }

    literal::stringify(&options.runtime, lower_folded(value, options), value.static_type())
}

fn lower_folded(value: &Folded, options: &CompilerOptions) -> Expression {
    match value {
        Folded::Constant(constant) => literal::lower_constant(constant),
        Folded::Unary { operator, operand } => {
            js::Expression::unary(lower_unary_operator(*operator), lower_folded(operand, options))
        }
        Folded::Binary { operator, lhs, rhs } => js::Expression::binary(
            lower_binary_operator(*operator),
            lower_folded(lhs, options),
            lower_folded(rhs, options),
        ),
        Folded::Concatenation(parts) => literal::concatenate(parts.iter().map(|part| match part {
            Folded::Constant(constant) if options.fold_constants => {
                Piece::Text(constant.to_display_string())
            }
            part => Piece::Value(literal::stringify(
                &options.runtime,
                lower_folded(part, options),
                part.static_type(),
            )),
        })),
    }
}

/// Tries the host print hook, then the console, then a global `print`, and
/// throws with the message when none exists. Browser-like hosts without a
/// console drop the message.
fn inline_probe(line: Expression) -> Vec<Statement> {
    let line_name = || Expression::identifier(LINE);
    let call_with_line = |callee: &str| {
        Statement::Expression(Expression::call(Expression::path(callee), vec![line_name()]))
    };
    let not = |expression| Expression::unary(UnaryOperator::Not, expression);

    let raw_print = Statement::Block(vec![
        Statement::If {
            condition: not(Expression::type_of_is("print", "function")),
            positive: Box::new(Statement::Throw(Expression::binary(
                BinaryOperator::Add,
                Expression::string(PROBE_FAILURE),
                Expression::call(Expression::identifier("String"), vec![line_name()]),
            ))),
            negative: None,
        },
        call_with_line("print"),
    ]);

    let console_available = Expression::binary(
        BinaryOperator::LogicalAnd,
        Expression::type_of_is("console", "object"),
        Expression::binary(
            BinaryOperator::LooseNotEquals,
            Expression::unary(UnaryOperator::TypeOf, Expression::path("console.log")),
            Expression::string("undefined"),
        ),
    );

    vec![
        Statement::var(LINE, Some(line)),
        Statement::If {
            condition: Expression::type_of_is("dartPrint", "function"),
            positive: Box::new(call_with_line("dartPrint")),
            negative: Some(Box::new(Statement::If {
                condition: console_available,
                positive: Box::new(call_with_line("console.log")),
                negative: Some(Box::new(Statement::If {
                    condition: not(Expression::type_of_is("window", "object")),
                    positive: Box::new(raw_print),
                    negative: None,
                })),
            })),
        },
    ]
}

#[cfg(test)]
mod tests {
    use indoc::indoc;

    use super::{PrintSite, printed_line};
    use crate::{
        backend::js::{
            BinaryOperator, Expression, Program, Statement, UnaryOperator,
            pretty_print::print_program,
        },
        driver::compile_source,
        error::{CompileError, LoweringError},
        frontend::SourceFile,
        middle::eval::{Constant, Folded},
        options::CompilerOptions,
    };

    fn probe_for(line: Expression) -> String {
        let options = CompilerOptions::default();

        print_program(&Program {
            body: PrintSite::InlineProbe(line).into_statements(&options.runtime),
        })
    }

    #[test]
    fn probe_tries_each_sink_in_order() {
        assert_eq!(
            probe_for(Expression::string("hi")),
            indoc! {r#"
                function() {
                  var line = "hi";
                  if (typeof dartPrint == "function")
                    dartPrint(line);
                  else if (typeof console == "object" && typeof console.log != "undefined")
                    console.log(line);
                  else if (!(typeof window == "object")) {
                    if (!(typeof print == "function"))
                      throw "Unable to print message: " + String(line);
                    print(line);
                  }
                }
            "#}
        );
    }

    #[test]
    fn probe_failure_embeds_the_message() {
        let output = probe_for(Expression::string("lost"));

        assert!(output.contains(r#"var line = "lost";"#));
        assert!(output.contains(r#"throw "Unable to print message: " + String(line);"#));
    }

    #[test]
    fn probe_throws_when_no_sink_exists_outside_a_browser() {
        let runtime = CompilerOptions::default().runtime;
        let statements = PrintSite::InlineProbe(Expression::string("lost")).into_statements(&runtime);

        let Statement::If {
            negative: Some(console_check),
            ..
        } = &statements[1]
        else {
            panic!("expected the host hook check, got {:?}", statements[1]);
        };
        let Statement::If {
            negative: Some(window_check),
            ..
        } = &**console_check
        else {
            panic!("expected the console check, got {console_check:?}");
        };
        let Statement::If {
            condition,
            positive,
            negative: None,
        } = &**window_check
        else {
            panic!("expected the window check, got {window_check:?}");
        };

        assert_eq!(
            *condition,
            Expression::unary(
                UnaryOperator::Not,
                Expression::type_of_is("window", "object")
            )
        );

        let Statement::Block(raw_print) = &**positive else {
            panic!("expected a block, got {positive:?}");
        };
        let Statement::If {
            positive: missing_print,
            ..
        } = &raw_print[0]
        else {
            panic!("expected the print check, got {:?}", raw_print[0]);
        };

        assert_eq!(
            **missing_print,
            Statement::Throw(Expression::binary(
                BinaryOperator::Add,
                Expression::string("Unable to print message: "),
                Expression::call(
                    Expression::identifier("String"),
                    vec![Expression::identifier("line")]
                ),
            ))
        );
    }

    #[test]
    fn probe_as_expression_is_called_in_place() {
        let runtime = CompilerOptions::default().runtime;
        let site = PrintSite::InlineProbe(Expression::string("x"));

        assert!(matches!(
            site.into_expression(&runtime),
            Expression::Call { ref callee, ref arguments }
                if arguments.is_empty() && matches!(**callee, Expression::Function { .. })
        ));
    }

    #[test]
    fn constant_lines_fold_to_text() {
        let options = CompilerOptions::default();

        assert_eq!(
            printed_line(&Folded::Constant(Constant::Int(3)), &options),
            Expression::string("3")
        );

        let unfolded = CompilerOptions {
            fold_constants: false,
            ..CompilerOptions::default()
        };

        assert_eq!(
            printed_line(&Folded::Constant(Constant::Int(3)), &unfolded),
            Expression::call(Expression::path("H.S"), vec![Expression::Integer(3)])
        );
    }

    #[test]
    fn single_constant_print_uses_the_probe() {
        let output = compile_source(
            &SourceFile::from_memory("main() { var who = 'world'; print('hello $who'); }"),
            &CompilerOptions::default(),
        )
        .unwrap();

        assert!(output.starts_with("function() {\n  var line = \"hello world\";\n"));
    }

    #[test]
    fn extra_effects_keep_the_runtime_call() {
        let output = compile_source(
            &SourceFile::from_memory("main() { var l = [1]; print(l); }"),
            &CompilerOptions::default(),
        )
        .unwrap();

        assert_eq!(output, "function() {\n  var l = [1];\n  P.print(H.S(l));\n}\n");
    }

    #[test]
    fn print_arity_and_value_use_are_rejected() {
        let arity = compile_source(
            &SourceFile::from_memory("main() { print(1, 2); }"),
            &CompilerOptions::default(),
        )
        .unwrap_err();

        assert!(matches!(
            arity,
            CompileError::Lowering(LoweringError::PrintArity { found: 2, .. })
        ));

        let value = compile_source(
            &SourceFile::from_memory("main() { var p = print; }"),
            &CompilerOptions::default(),
        )
        .unwrap_err();

        assert!(matches!(
            value,
            CompileError::Lowering(LoweringError::UnsupportedBuiltinUse { .. })
        ));
    }
}
