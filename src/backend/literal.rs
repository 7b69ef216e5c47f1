//! Lowering of list, map, scalar and interpolated string literals.

use super::{
    js::{self, BinaryOperator},
    lowering::{LoweringContext, LoweringResult},
    runtime::{RuntimeEntry, RuntimeLibrary},
};
use crate::{
    error::LoweringError,
    frontend::ast::{Expression, MapEntry, StringPart},
    middle::{eval::Constant, ty::StaticType},
};

/// One operand of a string concatenation.
#[derive(Debug, Clone, PartialEq)]
pub enum Piece {
    Text(String),
    /// An expression that already evaluates to a string
    Value(js::Expression),
}

pub fn lower_constant(constant: &Constant) -> js::Expression {
    match constant {
        Constant::Null => js::Expression::Null,
        Constant::Bool(value) => js::Expression::Boolean(*value),
        Constant::Int(value) => js::Expression::Integer(*value),
        Constant::Double(value) => js::Expression::Double(*value),
        Constant::String(value) => js::Expression::string(value.as_ref()),
    }
}

pub fn lower_list(
    context: &mut LoweringContext,
    elements: &[Expression],
) -> LoweringResult<js::Expression> {
    let elements = elements
        .iter()
        .map(|element| context.lower_expression(element))
        .collect::<LoweringResult<Vec<_>>>()?;

    Ok(js::Expression::Array(elements))
}

/// `{k1: v1, k2: v2}` becomes `mapBuilder([k1, v1, k2, v2])`. Duplicate keys
/// are left for the runtime to resolve.
pub fn lower_map(
    context: &mut LoweringContext,
    entries: &[MapEntry],
) -> LoweringResult<js::Expression> {
    let mut flattened = Vec::with_capacity(entries.len() * 2);

    for entry in entries {
        flattened.push(context.lower_expression(&entry.key)?);
        flattened.push(context.lower_expression(&entry.value)?);
    }

    Ok(context.options.runtime.call(
        RuntimeEntry::MapBuilder,
        vec![js::Expression::Array(flattened)],
    ))
}

pub fn lower_interpolation(
    context: &mut LoweringContext,
    parts: &[StringPart],
) -> LoweringResult<js::Expression> {
    let mut pieces = Vec::with_capacity(parts.len());

    for part in parts {
        pieces.push(match part {
            StringPart::Fragment(text) => Piece::Text(text.clone()),
            StringPart::Expression(expression) => lower_embedded(context, expression)?,
        });
    }

    Ok(concatenate(pieces))
}

fn lower_embedded(context: &mut LoweringContext, expression: &Expression) -> LoweringResult<Piece> {
    let ty = context.static_type(expression);

    if ty == StaticType::Function {
        return Err(LoweringError::UnsupportedInterpolation {
            ty,
            function: context.function_name(),
            span: expression.span,
        });
    }

    if let Some(constant) = context.constant_of(expression) {
        return Ok(Piece::Text(constant.to_display_string()));
    }

    let lowered = context.lower_expression(expression)?;

    Ok(Piece::Value(stringify(
        &context.options.runtime,
        lowered,
        ty,
    )))
}

/// Converts a value to its string form according to its static type.
pub fn stringify(runtime: &RuntimeLibrary, value: js::Expression, ty: StaticType) -> js::Expression {
    let entry = match ty {
        StaticType::String => return value,
        StaticType::Map => RuntimeEntry::MapToString,
        StaticType::List => RuntimeEntry::ListToString,
        _ => RuntimeEntry::Stringify,
    };

    runtime.call(entry, vec![value])
}

/// Builds a left-nested `+` chain, merging adjacent text and dropping empty
/// text. No pieces at all gives `""`.
pub fn concatenate(pieces: impl IntoIterator<Item = Piece>) -> js::Expression {
    let mut merged: Vec<Piece> = Vec::new();

    for piece in pieces {
        match piece {
            Piece::Text(text) if text.is_empty() => {}
            Piece::Text(text) => match merged.last_mut() {
                Some(Piece::Text(previous)) => previous.push_str(&text),
                _ => merged.push(Piece::Text(text)),
            },
            value => merged.push(value),
        }
    }

    merged
        .into_iter()
        .map(|piece| match piece {
            Piece::Text(text) => js::Expression::String(text),
            Piece::Value(value) => value,
        })
        .reduce(|lhs, rhs| js::Expression::binary(BinaryOperator::Add, lhs, rhs))
        .unwrap_or_else(|| js::Expression::string(""))
}

#[cfg(test)]
mod tests {
    use indoc::indoc;

    use super::{Piece, concatenate};
    use crate::{
        backend::js::{BinaryOperator, Expression},
        driver::compile_source,
        error::{CompileError, LoweringError},
        frontend::SourceFile,
        options::CompilerOptions,
    };

    fn compile(source: &str) -> Result<String, CompileError> {
        let options = CompilerOptions {
            inline_print_probe: false,
            ..CompilerOptions::default()
        };

        compile_source(&SourceFile::from_memory(source), &options)
    }

    #[test]
    fn concatenation_merges_and_drops_text() {
        let value = Expression::identifier("x");

        assert_eq!(
            concatenate([
                Piece::Text("a".to_string()),
                Piece::Text(String::new()),
                Piece::Text("b".to_string()),
                Piece::Value(value.clone()),
                Piece::Text(String::new()),
            ]),
            Expression::binary(BinaryOperator::Add, Expression::string("ab"), value)
        );
        assert_eq!(concatenate([]), Expression::string(""));
    }

    #[test]
    fn empty_interpolation_is_a_plain_string() {
        assert_eq!(
            compile("main() { print('()'); print(''); }").unwrap(),
            indoc! {r#"
                function() {
                  P.print("()");
                  P.print("");
                }
            "#}
        );
    }

    #[test]
    fn map_entries_keep_insertion_order() {
        assert_eq!(
            compile("main() { var m = {'b': 1, 'a': 'x', 'b': 2.5}; print(m); }").unwrap(),
            indoc! {r#"
                function() {
                  var m = P.LinkedHashMap__makeLiteral(["b", 1, "a", "x", "b", 2.5]);
                  P.print(P.Maps_mapToString(m));
                }
            "#}
        );
    }

    #[test]
    fn interpolation_is_type_directed() {
        assert_eq!(
            compile(indoc! {"
                main() {
                  var s = 'a';
                  var n = 1;
                  s = s + 'b';
                  n = n * 2;
                  print('$s/$n/${null}/${[s]}');
                }
            "})
            .unwrap(),
            indoc! {r#"
                function() {
                  var s = "a", n = 1;
                  s = s + "b";
                  n = n * 2;
                  P.print(s + "/" + H.S(n) + "/null/" + H.S([s]));
                }
            "#}
        );
    }

    #[test]
    fn unfolded_scalars_are_stringified() {
        let options = CompilerOptions {
            fold_constants: false,
            inline_print_probe: false,
            ..CompilerOptions::default()
        };

        assert_eq!(
            compile_source(&SourceFile::from_memory("main() { print('(${1})'); }"), &options)
                .unwrap(),
            "function() {\n  P.print(\"(\" + H.S(1) + \")\");\n}\n"
        );
    }

    #[test]
    fn interpolating_a_function_is_rejected() {
        let error = compile("main() { var f = () => 1; print('$f'); }").unwrap_err();

        assert!(matches!(
            error,
            CompileError::Lowering(LoweringError::UnsupportedInterpolation { ref function, .. })
                if function == "main"
        ));
    }
}
