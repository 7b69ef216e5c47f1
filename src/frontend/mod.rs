use std::path::PathBuf;

use colored::Colorize;

use self::lexer::Span;

pub mod ast;
pub mod intern;
pub mod lexer;
pub mod parser;

#[derive(Debug)]
pub struct SourceFile {
    pub contents: String,
    pub origin: SourceFileOrigin,
}

impl SourceFile {
    pub fn from_memory(contents: impl Into<String>) -> Self {
        Self {
            contents: contents.into(),
            origin: SourceFileOrigin::Memory,
        }
    }

    pub fn value_of_span(&self, span: Span) -> &str {
        &self.contents[span.start..span.end]
    }

    /// 1-based line of the byte `position`
    pub fn line_number_for_position(&self, position: usize) -> usize {
        let position = position.min(self.contents.len());

        self.contents[..position].matches('\n').count() + 1
    }

    /// 1-based column of the byte `position`
    pub fn column_for_position(&self, position: usize) -> usize {
        let position = position.min(self.contents.len());
        let line_start = self.contents[..position]
            .rfind('\n')
            .map_or(0, |newline| newline + 1);

        self.contents[line_start..position].chars().count() + 1
    }

    /// Renders the line containing the start of `span` with the spanned text underlined.
    pub fn highlight_span(&self, span: Span) -> String {
        let start = span.start.min(self.contents.len());
        let line_start = self.contents[..start]
            .rfind('\n')
            .map_or(0, |newline| newline + 1);
        let line_end = self.contents[start..]
            .find('\n')
            .map_or(self.contents.len(), |newline| start + newline);
        let line = &self.contents[line_start..line_end];

        let line_number = self.line_number_for_position(start).to_string();
        let gutter = " ".repeat(line_number.len());
        let padding = " ".repeat(self.contents[line_start..start].chars().count());
        let underline_length = self.contents[start..span.end.clamp(start, line_end)]
            .chars()
            .count()
            .max(1);

        format!(
            "{gutter} {bar}\n{number} {bar} {line}\n{gutter} {bar} {padding}{underline}\n",
            bar = "|".blue().bold(),
            number = line_number.blue().bold(),
            underline = "^".repeat(underline_length).red().bold(),
        )
    }
}

#[derive(Debug)]
pub enum SourceFileOrigin {
    Memory,
    File(PathBuf),
}

impl core::fmt::Display for SourceFileOrigin {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SourceFileOrigin::Memory => f.write_str("<memory>"),
            SourceFileOrigin::File(path) => f.write_fmt(format_args!("{}", path.display())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{SourceFile, lexer::Span};

    #[test]
    fn positions_are_one_based() {
        let source_file = SourceFile::from_memory("main() {\n  print(x);\n}\n");
        let position = source_file.contents.find('x').unwrap();

        assert_eq!(source_file.line_number_for_position(position), 2);
        assert_eq!(source_file.column_for_position(position), 9);
        assert_eq!(source_file.line_number_for_position(0), 1);
        assert_eq!(source_file.column_for_position(0), 1);
    }

    #[test]
    fn highlight_contains_offending_line() {
        colored::control::set_override(false);

        let source_file = SourceFile::from_memory("main() {\n  print(x);\n}\n");
        let position = source_file.contents.find('x').unwrap();
        let highlighted = source_file.highlight_span(Span::new(position, position + 1));

        assert!(highlighted.contains("2 |   print(x);"));
        assert!(highlighted.contains(&format!("|{}^\n", " ".repeat(9))));
    }
}
