//! Closure conversion: function literals become JavaScript function
//! expressions, and captured variables live in `{value: ...}` boxes that every
//! capturing closure shares. Boxes declared in a loop body are fresh per
//! iteration, so closures bind them as parameters when they are created.

use log::debug;

use super::{
    js,
    lowering::{LoweringContext, LoweringResult},
};
use crate::frontend::ast::FunctionLiteral;

const BOX_FIELD: &str = "value";

/// `{value: initial}`
pub fn allocate_box(initial: js::Expression) -> js::Expression {
    js::Expression::Object(vec![(BOX_FIELD.to_string(), initial)])
}

/// `cell.value`
pub fn box_value(cell: js::Expression) -> js::Expression {
    js::Expression::member(cell, BOX_FIELD)
}

/// `p = {value: p};`, emitted at entry for every boxed parameter.
pub fn rebind_parameter(name: &str) -> js::Statement {
    js::Statement::Expression(js::Expression::assign(
        js::Expression::identifier(name),
        allocate_box(js::Expression::identifier(name)),
    ))
}

pub fn lower_function_literal(
    context: &mut LoweringContext,
    literal: &FunctionLiteral,
) -> LoweringResult<js::Expression> {
    let info = context.analysis.function_literal(literal);

    debug!(
        "lowering closure `{}` ({:?}): captures [{}], {}",
        info.name,
        info.id,
        info.captures
            .iter()
            .map(|&id| context.analysis.variable(id).name.value())
            .collect::<Vec<_>>()
            .join(", "),
        if info.escapes { "escapes" } else { "called in place" }
    );

    let parameters = info
        .parameters
        .iter()
        .map(|&id| context.variable_name(id))
        .collect();
    let body = context.lower_body(info.id, &literal.body.statements)?;
    let function = js::Expression::Function { parameters, body };

    if info.iteration_captures.is_empty() {
        return Ok(function);
    }

    let bound = info
        .iteration_captures
        .iter()
        .map(|&id| context.variable_name(id))
        .collect();

    Ok(bind_on_creation(bound, function))
}

/// `(function(x) { return f; })(x)`, so `f` keeps the boxes current when it
/// was created.
fn bind_on_creation(names: Vec<String>, function: js::Expression) -> js::Expression {
    let arguments = names.iter().map(js::Expression::identifier).collect();

    js::Expression::call(
        js::Expression::Function {
            parameters: names,
            body: vec![js::Statement::Return(Some(function))],
        },
        arguments,
    )
}

#[cfg(test)]
mod tests {
    use indoc::indoc;

    use crate::{driver::compile_source, frontend::SourceFile, options::CompilerOptions};

    fn compile(source: &str) -> String {
        let options = CompilerOptions {
            inline_print_probe: false,
            ..CompilerOptions::default()
        };

        compile_source(&SourceFile::from_memory(source), &options).unwrap()
    }

    #[test]
    fn captured_variable_is_shared_through_one_box() {
        assert_eq!(
            compile(indoc! {"
                main() {
                  var count = 0;
                  var increment = () { count += 1; };
                  var read = () => count;
                  increment();
                  print(read());
                }
            "}),
            indoc! {"
                function() {
                  var count = {value: 0}, increment = function() {
                    count.value = count.value + 1;
                  }, read = function() {
                    return count.value;
                  };
                  increment();
                  P.print(H.S(read()));
                }
            "}
        );
    }

    #[test]
    fn boxed_parameters_are_rebound_on_entry() {
        assert_eq!(
            compile(indoc! {"
                main() {
                  var make = (n) {
                    var get = () => n;
                    n = n + 1;
                    return get;
                  };
                  print(make(1)());
                }
            "}),
            indoc! {"
                function() {
                  var make = function(n) {
                    n = {value: n};
                    var get = function() {
                      return n.value;
                    };
                    n.value = n.value + 1;
                    return get;
                  };
                  P.print(H.S(make(1)()));
                }
            "}
        );
    }

    #[test]
    fn immediately_invoked_literal_reads_plain_locals() {
        assert_eq!(
            compile(indoc! {"
                main() {
                  var total = 0;
                  (() { total = total + 2; })();
                  print(total);
                }
            "}),
            indoc! {"
                function() {
                  var total = 0;
                  (function() {
                    total = total + 2;
                  })();
                  P.print(H.S(total));
                }
            "}
        );
    }

    #[test]
    fn late_boxed_declaration_allocates_in_place() {
        assert_eq!(
            compile(indoc! {"
                main() {
                  var a = 1;
                  a = a + 1;
                  var b = a;
                  var c = 2;
                  c = c + b;
                  var f = () => b;
                  print(f());
                }
            "}),
            indoc! {"
                function() {
                  var a = 1, c, f;
                  a = a + 1;
                  var b = {value: a};
                  c = 2;
                  c = c + b.value;
                  f = function() {
                    return b.value;
                  };
                  P.print(H.S(f()));
                }
            "}
        );
    }

    #[test]
    fn loop_closures_keep_their_own_iteration() {
        assert_eq!(
            compile(indoc! {"
                main() {
                  var first;
                  var i = 0;
                  while (i < 2) {
                    var x = i;
                    if (i == 0) first = () => x;
                    i = i + 1;
                  }
                  print(first());
                }
            "}),
            indoc! {"
                function() {
                  var first = null, i = 0;
                  while (i < 2) {
                    var x = {value: i};
                    if (i === 0)
                      first = (function(x) {
                        return function() {
                          return x.value;
                        };
                      })(x);
                    i = i + 1;
                  }
                  P.print(H.S(first()));
                }
            "}
        );
    }

    #[test]
    fn nested_loop_closure_binds_only_at_the_outermost_escape() {
        let output = compile(indoc! {"
            main() {
              var i = 0;
              var last;
              while (i < 2) {
                var x = i;
                last = () { return () => x; };
                i = i + 1;
              }
              print(last()());
            }
        "});

        assert_eq!(output.matches("(function(x) {").count(), 1);
        assert!(output.contains("return x.value;"));
    }

    #[test]
    fn stale_types_still_get_stringified() {
        let output = compile(indoc! {"
            main() {
              var a = 'x';
              var b = a;
              var f = () { b = a; };
              a = 1;
              f();
              print(b);
            }
        "});

        assert!(output.contains("P.print(H.S(b.value));"));
    }

    #[test]
    fn shadowed_names_get_suffixes() {
        assert_eq!(
            compile(indoc! {"
                main() {
                  var x = 1;
                  x = 3;
                  {
                    var x = 2;
                    x = x + 1;
                    print(x);
                  }
                }
            "}),
            indoc! {"
                function() {
                  var x = 1, x0;
                  x = 3;
                  {
                    x0 = 2;
                    x0 = x0 + 1;
                    P.print(H.S(x0));
                  }
                }
            "}
        );
    }
}
