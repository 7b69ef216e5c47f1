use log::{debug, info};

use super::{
    closure, js,
    lowering::{LoweringContext, LoweringResult},
    print::{self, PrintSite},
};
use crate::{
    error::{CompileError, LoweringError},
    frontend::ast::{ItemKind, Module, Statement, StatementKind},
    middle::{
        capture::{CaptureAnalysis, FunctionId},
        eval::evaluate_program,
    },
    options::CompilerOptions,
};

const ENTRY_POINT: &str = "main";

/// Lowers `main` into the nullary unit that runs the program.
pub fn assemble_program(
    module: &Module,
    options: &CompilerOptions,
) -> Result<js::Program, CompileError> {
    for item in &module.items {
        match &item.kind {
            ItemKind::FunctionDefinition(function) if function.name.symbol.value() != ENTRY_POINT => {
                return Err(LoweringError::UnsupportedItem {
                    name: function.name.symbol.to_string(),
                    span: function.name.span,
                }
                .into());
            }
            ItemKind::FunctionDefinition(_) => {}
        }
    }

    let main = module
        .function(ENTRY_POINT)
        .ok_or(LoweringError::MissingEntryPoint)?;

    if let Some(parameter) = main.parameters.parameters.first() {
        return Err(LoweringError::EntryPointParameters {
            span: parameter.span,
        }
        .into());
    }

    info!("assembling `{ENTRY_POINT}` from {}", module.source_file.origin);

    let analysis = CaptureAnalysis::analyze(main)?;
    let mut context = LoweringContext::new(&analysis, options);
    let mut body = assemble_body(&mut context, FunctionId::UNIT, &main.body.statements)?;

    if options.inline_print_probe {
        match evaluate_program(main, &analysis) {
            Ok(value) => {
                debug!("inlining the print probe");

                let line = print::printed_line(&value, options);
                body = PrintSite::InlineProbe(line).into_statements(&options.runtime);
            }
            Err(reason) => debug!("keeping runtime print calls: {reason}"),
        }
    }

    info!("assembled {} top-level statement(s)", body.len());

    Ok(js::Program { body })
}

/// Lowers one function body. Declarations that open the body merge into a
/// single `var`; stack locals declared later join it uninitialized and are
/// assigned in place, boxed ones allocate their box in place.
pub fn assemble_body(
    context: &mut LoweringContext,
    function: FunctionId,
    statements: &[Statement],
) -> LoweringResult<Vec<js::Statement>> {
    let analysis = context.analysis;
    let previous = context.enter_body(function);
    let leading = statements
        .iter()
        .take_while(|statement| matches!(statement.kind, StatementKind::Local(_)))
        .count();

    let mut lowered = Vec::new();

    for &parameter in &analysis.function(function).parameters {
        if analysis.variable(parameter).is_boxed() {
            let name = context.variable_name(parameter);

            lowered.push(closure::rebind_parameter(&name));
        }
    }

    let mut declarators = Vec::new();

    for statement in &statements[..leading] {
        if let StatementKind::Local(local) = &statement.kind {
            declarators.extend(context.lower_leading_local(local)?);
        }
    }

    let rest = context.lower_statements(&statements[leading..])?;
    let frame = context.exit_body(previous);

    declarators.extend(
        frame
            .stack_locals
            .into_iter()
            .map(|name| js::VariableDeclarator {
                name,
                initializer: None,
            }),
    );

    if !declarators.is_empty() {
        lowered.push(js::Statement::Var(declarators));
    }

    lowered.extend(rest);

    Ok(lowered)
}

#[cfg(test)]
mod tests {
    use crate::{
        driver::compile_source,
        error::{CompileError, LoweringError},
        frontend::SourceFile,
        options::CompilerOptions,
    };

    fn compile(source: &str) -> Result<String, CompileError> {
        compile_source(&SourceFile::from_memory(source), &CompilerOptions::default())
    }

    #[test]
    fn requires_a_parameterless_main() {
        assert!(matches!(
            compile("helper() {}"),
            Err(CompileError::Lowering(LoweringError::UnsupportedItem { .. }))
        ));
        assert!(matches!(
            compile(""),
            Err(CompileError::Lowering(LoweringError::MissingEntryPoint))
        ));
        assert!(matches!(
            compile("main(args) {}"),
            Err(CompileError::Lowering(LoweringError::EntryPointParameters { .. }))
        ));
    }

    #[test]
    fn uninitialized_locals_start_as_null() {
        assert_eq!(
            compile("main() { var a; var b; a = 1; b = a; print(b); print(a); }").unwrap(),
            "function() {\n  var a = null, b = null;\n  a = 1;\n  b = a;\n  P.print(H.S(b));\n  P.print(H.S(a));\n}\n"
        );
    }

    #[test]
    fn control_flow_is_preserved() {
        assert_eq!(
            compile("main() { var i = 0; while (i < 3) { i += 1; if (i == 2) print(i); } }")
                .unwrap(),
            "function() {\n  var i = 0;\n  while (i < 3) {\n    i = i + 1;\n    if (i === 2)\n      P.print(H.S(i));\n  }\n}\n"
        );
    }
}
