use log::info;

use crate::{
    backend::{assemble::assemble_program, js::pretty_print::print_program},
    error::CompileError,
    frontend::{SourceFile, parser::Parser},
    options::CompilerOptions,
};

/// Compiles one source file into the text of its emitted unit.
pub fn compile_source(
    source_file: &SourceFile,
    options: &CompilerOptions,
) -> Result<String, CompileError> {
    let module = Parser::parse_module(source_file)?;
    let program = assemble_program(&module, options)?;

    info!("compiled {}", source_file.origin);

    Ok(print_program(&program))
}

#[cfg(test)]
mod tests {
    use indoc::indoc;

    use super::compile_source;
    use crate::{frontend::SourceFile, options::CompilerOptions};

    const BASIC_1: &str = indoc! {"
        main() {
          var e = 1;
          var l = [1, 2, 3];
          var m = {'s': 1};

          print('(' ')');
          print('(${true})');
          print('(${1})');
          print('(${[1, 2, 3]})');
          print('(${{'s': 1}})');
          print('($e)');
          print('($l)');
          print('($m)');
        }
    "};

    const CLOSURES_7: &str = indoc! {"
        main() {
          var x = 122;
          var a = () {
            var y = x;
            return () => y;
          };
          x = x + 1;
          print(a()());
        }
    "};

    fn compile(source: &str, options: &CompilerOptions) -> String {
        compile_source(&SourceFile::from_memory(source), options).unwrap()
    }

    /// Collapses runs of whitespace so layout differences do not matter.
    fn normalize(text: &str) -> String {
        text.split_whitespace().collect::<Vec<_>>().join(" ")
    }

    #[test]
    fn basic_1() {
        assert_eq!(
            compile(BASIC_1, &CompilerOptions::default()),
            indoc! {r#"
                function() {
                  var l = [1, 2, 3], m = P.LinkedHashMap__makeLiteral(["s", 1]);
                  P.print("()");
                  P.print("(true)");
                  P.print("(1)");
                  P.print("(" + H.S([1, 2, 3]) + ")");
                  P.print("(" + P.Maps_mapToString(P.LinkedHashMap__makeLiteral(["s", 1])) + ")");
                  P.print("(1)");
                  P.print("(" + H.S(l) + ")");
                  P.print("(" + P.Maps_mapToString(m) + ")");
                }
            "#}
        );
    }

    #[test]
    fn closures_7() {
        assert_eq!(
            compile(CLOSURES_7, &CompilerOptions::default()),
            indoc! {r#"
                function() {
                  var line = H.S(122 + 1);
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
    fn closures_7_with_runtime_print() {
        let options = CompilerOptions {
            inline_print_probe: false,
            ..CompilerOptions::default()
        };

        assert_eq!(
            normalize(&compile(CLOSURES_7, &options)),
            normalize(indoc! {"
                function() {
                  var x = {value: 122}, a = function() {
                    var y = {value: x.value};
                    return function() {
                      return y.value;
                    };
                  };
                  x.value = x.value + 1;
                  P.print(H.S(a()()));
                }
            "})
        );
    }

    #[test]
    fn basic_1_without_folding() {
        let options = CompilerOptions {
            fold_constants: false,
            ..CompilerOptions::default()
        };

        let output = compile(BASIC_1, &options);

        assert!(output.starts_with("function() {\n  var e = 1, l = [1, 2, 3], m = "));
        assert!(output.contains(r#"P.print("(" + H.S(true) + ")");"#));
        assert!(output.contains(r#"P.print("(" + H.S(e) + ")");"#));
    }

    #[test]
    fn syntax_errors_produce_no_output() {
        let error = compile_source(
            &SourceFile::from_memory("main() { print(1) }"),
            &CompilerOptions::default(),
        )
        .unwrap_err();

        assert!(error.span().is_some());
    }
}
