use std::{path::PathBuf, process::ExitCode};

use clap::{CommandFactory, Parser as ClapParser, error::ErrorKind};
use colored::Colorize;
use log::error;

use crate::{
    backend::runtime::{RuntimeEntry, RuntimeLibrary},
    driver::compile_source,
    error::CompileError,
    frontend::{SourceFile, SourceFileOrigin, parser::Parser},
    options::CompilerOptions,
};

mod backend;
mod driver;
mod error;
mod frontend;
mod index;
mod middle;
mod options;

#[derive(Debug, ClapParser)]
#[command(version, about, long_about = None)]
pub struct Args {
    source_files: Vec<PathBuf>,

    /// Keep scalar literals and constant locals as runtime values
    #[arg(long)]
    no_fold: bool,

    /// Always print through the runtime library, never inline the host probe
    #[arg(long)]
    no_inline_print: bool,

    /// Dump the parsed module instead of compiling it
    #[arg(long)]
    ast: bool,

    /// Runtime entry point used for `print`
    #[arg(long, value_name = "PATH")]
    print: Option<String>,

    /// Runtime entry point used to stringify scalars
    #[arg(long, value_name = "PATH")]
    stringify: Option<String>,

    /// Runtime entry point that builds a map from flattened entries
    #[arg(long, value_name = "PATH")]
    map_builder: Option<String>,

    /// Runtime entry point that stringifies a map
    #[arg(long, value_name = "PATH")]
    map_to_string: Option<String>,

    /// Runtime entry point that stringifies a list
    #[arg(long, value_name = "PATH")]
    list_to_string: Option<String>,
}

impl Args {
    fn compiler_options(&self) -> CompilerOptions {
        let mut runtime = RuntimeLibrary::default();

        for (entry, path) in [
            (RuntimeEntry::Print, &self.print),
            (RuntimeEntry::Stringify, &self.stringify),
            (RuntimeEntry::MapBuilder, &self.map_builder),
            (RuntimeEntry::MapToString, &self.map_to_string),
            (RuntimeEntry::ListToString, &self.list_to_string),
        ] {
            if let Some(path) = path {
                runtime.set_path(entry, path);
            }
        }

        CompilerOptions {
            runtime,
            fold_constants: !self.no_fold,
            inline_print_probe: !self.no_inline_print,
        }
    }
}

fn main() -> ExitCode {
    env_logger::Builder::from_default_env()
        .format_timestamp(None)
        .init();

    let args = Args::parse();

    if args.source_files.is_empty() {
        Args::command()
            .error(ErrorKind::MissingRequiredArgument, "Missing source files!")
            .exit();
    }

    for source_file in &args.source_files {
        if !source_file.exists() {
            Args::command()
                .error(
                    ErrorKind::InvalidValue,
                    format!("Source file '{}' does not exist!", source_file.display()),
                )
                .exit()
        }

        if !source_file.is_file() {
            Args::command()
                .error(
                    ErrorKind::InvalidValue,
                    format!("Input path '{}' is not a file!", source_file.display()),
                )
                .exit()
        }
    }

    let options = args.compiler_options();
    let mut failed = false;

    for path in &args.source_files {
        let contents = match std::fs::read_to_string(path) {
            Ok(contents) => contents,
            Err(err) => {
                error!("failed to read {}: {err}", path.display());
                eprintln!(
                    "{}: could not read '{}': {err}",
                    "error".red().bold(),
                    path.display()
                );
                failed = true;
                continue;
            }
        };

        let source_file = SourceFile {
            contents,
            origin: SourceFileOrigin::File(path.clone()),
        };

        if args.ast {
            match Parser::parse_module(&source_file) {
                Ok(module) => println!("{module:#?}"),
                Err(err) => {
                    report_error(&source_file, &err.into());
                    failed = true;
                }
            }

            continue;
        }

        match compile_source(&source_file, &options) {
            Ok(output) => {
                println!("// {}", source_file.origin);
                print!("{output}");
            }
            Err(err) => {
                report_error(&source_file, &err);
                failed = true;
            }
        }
    }

    if failed {
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    }
}

fn report_error(source_file: &SourceFile, err: &CompileError) {
    eprintln!("{}: {}", "error".red().bold(), err.to_string().bold());

    match err.span() {
        Some(span) => {
            eprintln!(
                " {} {}:{}:{}",
                "-->".blue().bold(),
                source_file.origin,
                source_file.line_number_for_position(span.start),
                source_file.column_for_position(span.start)
            );
            eprint!("{}", source_file.highlight_span(span));
        }
        None => eprintln!(" {} {}", "-->".blue().bold(), source_file.origin),
    }
}
