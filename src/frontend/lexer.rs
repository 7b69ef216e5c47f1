use std::{
    collections::{BTreeMap, VecDeque},
    iter::Peekable,
    str::Chars,
};

use itertools::{PeekNth, peek_nth};
use once_cell::sync::Lazy;
use strum::EnumString;

use crate::{error::SyntaxError, frontend::SourceFile};

#[derive(Debug)]
pub struct Lexer<'source> {
    source: &'source SourceFile,
    position: usize,
    end: usize,
    chars: PeekNth<Chars<'source>>,
    peek_buffer: VecDeque<Token>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Token {
    pub kind: TokenKind,
    pub span: Span,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    /* Words */
    Keyword(Keyword), // var
    Identifier,       // main

    /* Literals */
    BooleanLiteral, // true
    NullLiteral,    // null
    IntegerLiteral, // 1
    DoubleLiteral,  // 1.0
    StringLiteral,  // 'hello, $name'

    /* Delimiters */
    OpenParen,    // (
    CloseParen,   // )
    OpenBracket,  // [
    CloseBracket, // ]
    OpenBrace,    // {
    CloseBrace,   // }
    Semicolon,    // ;
    Comma,        // ,

    /* Other */
    Colon,    // :
    FatArrow, // =>

    /* Unary Ops */
    Bang, // !

    /* Unary + Binary Ops */
    Minus, // -

    /* Binary Ops */
    Plus,                 // +
    Asterisk,             // *
    Divide,               // /
    Modulus,              // %
    LogicalAnd,           // &&
    LogicalOr,            // ||
    DoubleEquals,         // ==
    NotEquals,            // !=
    LessThan,             // <
    LessThanOrEqualTo,    // <=
    GreaterThan,          // >
    GreaterThanOrEqualTo, // >=

    /* Assignment */
    Equals,         // =
    PlusEquals,     // +=
    MinusEquals,    // -=
    MultiplyEquals, // *=
    DivideEquals,   // /=
    ModulusEquals,  // %=
}

impl TokenKind {
    pub fn is_assignment_operator(&self) -> bool {
        matches!(
            self,
            Self::Equals
                | Self::PlusEquals
                | Self::MinusEquals
                | Self::MultiplyEquals
                | Self::DivideEquals
                | Self::ModulusEquals
        )
    }

    pub fn is_literal(&self) -> bool {
        matches!(
            self,
            Self::BooleanLiteral
                | Self::NullLiteral
                | Self::IntegerLiteral
                | Self::DoubleLiteral
                | Self::StringLiteral
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumString)]
#[strum(serialize_all = "snake_case")]
pub enum Keyword {
    Var,
    Final,
    Const,
    If,
    Else,
    While,
    Return,
}

/// Table of single char tokens (matched after longer sequences are checked for)
static SINGLE_TOKENS: Lazy<BTreeMap<char, TokenKind>> = Lazy::new(|| {
    BTreeMap::from([
        ('(', TokenKind::OpenParen),
        (')', TokenKind::CloseParen),
        ('[', TokenKind::OpenBracket),
        (']', TokenKind::CloseBracket),
        ('{', TokenKind::OpenBrace),
        ('}', TokenKind::CloseBrace),
        (';', TokenKind::Semicolon),
        (',', TokenKind::Comma),
        ('!', TokenKind::Bang),
        (':', TokenKind::Colon),
        ('*', TokenKind::Asterisk),
        ('-', TokenKind::Minus),
        ('=', TokenKind::Equals),
        ('+', TokenKind::Plus),
        ('/', TokenKind::Divide),
        ('%', TokenKind::Modulus),
        ('<', TokenKind::LessThan),
        ('>', TokenKind::GreaterThan),
    ])
});

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Span {
    pub start: usize,
    pub end: usize,
}

impl Span {
    pub fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }

    pub fn to(self, other: Span) -> Span {
        Span::new(self.start, other.end)
    }
}

/// One piece of a string literal as written in the source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RawStringPart {
    /// Text with escapes already decoded
    Fragment(String),
    /// `$name`
    Identifier(Span),
    /// The inside of `${...}`
    Expression(Span),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScannedString {
    pub parts: Vec<RawStringPart>,
    /// Byte position just past the closing quote
    pub end: usize,
}

/// Scans the string literal whose opening quote is at `start`, descending into
/// `${...}` interpolations (and any strings nested inside them) to find its end.
pub fn scan_string(contents: &str, start: usize) -> Result<ScannedString, SyntaxError> {
    let mut chars = contents[start..]
        .char_indices()
        .map(|(offset, c)| (start + offset, c))
        .peekable();

    let quote = match chars.next() {
        Some((_, quote @ ('\'' | '"'))) => quote,
        _ => return Err(SyntaxError::new("expected a string literal", Span::new(start, start))),
    };

    let mut parts = Vec::new();
    let mut fragment = String::new();

    while let Some((position, c)) = chars.next() {
        match c {
            c if c == quote => {
                if !fragment.is_empty() {
                    parts.push(RawStringPart::Fragment(fragment));
                }

                return Ok(ScannedString {
                    parts,
                    end: position + 1,
                });
            }
            '\n' => {
                return Err(SyntaxError::new(
                    "reached end of line while reading string literal",
                    Span::new(start, position),
                ));
            }
            '\\' => {
                let Some((_, escaped)) = chars.next() else {
                    break;
                };

                fragment.push(match escaped {
                    'n' => '\n',
                    'r' => '\r',
                    't' => '\t',
                    'b' => '\u{8}',
                    'f' => '\u{c}',
                    'v' => '\u{b}',
                    other => other,
                });
            }
            '$' => match chars.peek().copied() {
                Some((open, '{')) => {
                    chars.next();
                    let close = skip_interpolation(&mut chars, contents, open)?;

                    if !fragment.is_empty() {
                        parts.push(RawStringPart::Fragment(std::mem::take(&mut fragment)));
                    }
                    parts.push(RawStringPart::Expression(Span::new(open + 1, close)));
                }
                Some((name_start, c)) if c.is_ascii_alphabetic() || c == '_' => {
                    let mut name_end = name_start;

                    while let Some(&(offset, c)) = chars.peek() {
                        if !(c.is_ascii_alphanumeric() || c == '_') {
                            break;
                        }

                        name_end = offset + 1;
                        chars.next();
                    }

                    if !fragment.is_empty() {
                        parts.push(RawStringPart::Fragment(std::mem::take(&mut fragment)));
                    }
                    parts.push(RawStringPart::Identifier(Span::new(name_start, name_end)));
                }
                _ => {
                    return Err(SyntaxError::new(
                        "expected an identifier or `{` after `$` in string literal",
                        Span::new(position, position + 1),
                    ));
                }
            },
            other => fragment.push(other),
        }
    }

    Err(SyntaxError::new(
        "reached end of file while reading string literal",
        Span::new(start, contents.len()),
    ))
}

/// Consumes up to and including the `}` matching the `{` at `open`, returning its position.
fn skip_interpolation<I: Iterator<Item = (usize, char)>>(
    chars: &mut Peekable<I>,
    contents: &str,
    open: usize,
) -> Result<usize, SyntaxError> {
    let mut depth = 1usize;

    while let Some((position, c)) = chars.next() {
        match c {
            '{' => depth += 1,
            '}' => {
                depth -= 1;

                if depth == 0 {
                    return Ok(position);
                }
            }
            '\'' | '"' => {
                let nested = scan_string(contents, position)?;

                while chars.next_if(|&(offset, _)| offset < nested.end).is_some() {}
            }
            _ => {}
        }
    }

    Err(SyntaxError::new(
        "unterminated `${` in string literal",
        Span::new(open - 1, contents.len()),
    ))
}

impl<'source> Lexer<'source> {
    pub fn new(source: &'source SourceFile) -> Self {
        Self::with_range(source, 0, source.contents.len())
    }

    /// A lexer over `source.contents[start..end]` that reports spans relative to the whole file.
    pub fn with_range(source: &'source SourceFile, start: usize, end: usize) -> Self {
        Self {
            source,
            chars: peek_nth(source.contents[start..end].chars()),
            position: start,
            end,
            peek_buffer: VecDeque::new(),
        }
    }

    pub fn source(&self) -> &'source SourceFile {
        self.source
    }

    /// A zero-width span at the current end of input.
    pub fn end_span(&self) -> Span {
        Span::new(self.end, self.end)
    }

    fn advance(&mut self) -> Option<char> {
        let c = self.chars.next()?;
        self.position += c.len_utf8();

        Some(c)
    }

    fn peek_is(&mut self, n: usize, expected: char) -> bool {
        self.chars.peek_nth(n).is_some_and(|c| *c == expected)
    }

    fn ignore_line(&mut self) {
        while let Some(c) = self.chars.peek().copied() {
            if c == '\n' {
                break;
            }

            self.advance();
        }
    }

    fn ignore_block_comment(&mut self) -> Result<(), SyntaxError> {
        let start_position = self.position;

        self.advance();
        self.advance();

        while let Some(c) = self.advance() {
            if c == '*' && self.chars.peek().is_some_and(|c| *c == '/') {
                self.advance();
                return Ok(());
            }
        }

        Err(SyntaxError::new(
            "reached end of file while reading block comment",
            self.new_span(start_position),
        ))
    }

    fn read_string(&mut self) -> Result<Token, SyntaxError> {
        let start_position = self.position;
        let scanned = scan_string(&self.source.contents[..self.end], start_position)?;

        while self.position < scanned.end && self.advance().is_some() {}

        Ok(Token {
            kind: TokenKind::StringLiteral,
            span: self.new_span(start_position),
        })
    }

    // Keyword, identifier, boolean or null literal
    fn read_word(&mut self) -> Token {
        let start_position = self.position;

        while let Some(c) = self.chars.peek().copied() {
            if !(c.is_ascii_alphanumeric() || c == '_') {
                break;
            }

            self.advance();
        }

        let span = self.new_span(start_position);
        let value = self.source.value_of_span(span);

        let kind = if let Ok(keyword) = value.parse() {
            TokenKind::Keyword(keyword)
        } else {
            match value {
                "true" | "false" => TokenKind::BooleanLiteral,
                "null" => TokenKind::NullLiteral,
                _ => TokenKind::Identifier,
            }
        };

        Token { kind, span }
    }

    fn read_number(&mut self) -> Token {
        let start_position = self.position;
        let mut kind = TokenKind::IntegerLiteral;

        self.read_digits();

        if self.peek_is(0, '.') && self.chars.peek_nth(1).is_some_and(|c| c.is_ascii_digit()) {
            kind = TokenKind::DoubleLiteral;

            self.advance();
            self.read_digits();
        }

        let has_exponent = matches!(self.chars.peek(), Some('e' | 'E'))
            && match self.chars.peek_nth(1) {
                Some('+' | '-') => self.chars.peek_nth(2).is_some_and(|c| c.is_ascii_digit()),
                Some(c) => c.is_ascii_digit(),
                None => false,
            };

        if has_exponent {
            kind = TokenKind::DoubleLiteral;

            self.advance();
            if matches!(self.chars.peek(), Some('+' | '-')) {
                self.advance();
            }
            self.read_digits();
        }

        Token {
            kind,
            span: self.new_span(start_position),
        }
    }

    fn read_digits(&mut self) {
        while self.chars.peek().is_some_and(|c| c.is_ascii_digit()) {
            self.advance();
        }
    }

    fn read_single(&mut self, kind: TokenKind) -> Token {
        let start_position = self.position;

        self.advance();

        Token {
            kind,
            span: self.new_span(start_position),
        }
    }

    fn read_double(&mut self, kind: TokenKind) -> Token {
        let start_position = self.position;

        self.advance();
        self.advance();

        Token {
            kind,
            span: self.new_span(start_position),
        }
    }

    fn new_span(&self, start: usize) -> Span {
        Span {
            start,
            end: self.position,
        }
    }

    pub fn peek(&mut self) -> Result<Option<Token>, SyntaxError> {
        self.peek_nth(0)
    }

    pub fn peek_nth(&mut self, n: usize) -> Result<Option<Token>, SyntaxError> {
        while self.peek_buffer.len() <= n {
            match self.read_token()? {
                Some(token) => self.peek_buffer.push_back(token),
                None => break,
            }
        }

        Ok(self.peek_buffer.get(n).copied())
    }

    pub fn next(&mut self) -> Result<Option<Token>, SyntaxError> {
        if let Some(token) = self.peek_buffer.pop_front() {
            return Ok(Some(token));
        }

        self.read_token()
    }

    fn read_token(&mut self) -> Result<Option<Token>, SyntaxError> {
        while let Some(c) = self.chars.peek().copied() {
            let token = match c {
                // Ignore whitespace
                c if c.is_whitespace() => {
                    self.advance();
                    continue;
                }
                // Ignore comments
                '/' if self.peek_is(1, '/') => {
                    self.ignore_line();
                    continue;
                }
                '/' if self.peek_is(1, '*') => {
                    self.ignore_block_comment()?;
                    continue;
                }

                // String literals, interpolations included
                '\'' | '"' => self.read_string()?,

                // Integer and double literals
                n if n.is_ascii_digit() => self.read_number(),

                // Identifiers, keywords, boolean and null literals
                a if a.is_ascii_alphabetic() || a == '_' => self.read_word(),

                // Fat arrow (=>)
                '=' if self.peek_is(1, '>') => self.read_double(TokenKind::FatArrow),
                // Double Equals (==)
                '=' if self.peek_is(1, '=') => self.read_double(TokenKind::DoubleEquals),
                // Not Equals (!=)
                '!' if self.peek_is(1, '=') => self.read_double(TokenKind::NotEquals),
                // Less than or equal (<=)
                '<' if self.peek_is(1, '=') => self.read_double(TokenKind::LessThanOrEqualTo),
                // Greater than or equal (>=)
                '>' if self.peek_is(1, '=') => {
                    self.read_double(TokenKind::GreaterThanOrEqualTo)
                }

                // Plus equals (+=)
                '+' if self.peek_is(1, '=') => self.read_double(TokenKind::PlusEquals),
                // Minus equals (-=)
                '-' if self.peek_is(1, '=') => self.read_double(TokenKind::MinusEquals),
                // Multiply equals (*=)
                '*' if self.peek_is(1, '=') => self.read_double(TokenKind::MultiplyEquals),
                // Divide equals (/=)
                '/' if self.peek_is(1, '=') => self.read_double(TokenKind::DivideEquals),
                // Modulus equals (%=)
                '%' if self.peek_is(1, '=') => self.read_double(TokenKind::ModulusEquals),

                // Logical And (&&)
                '&' if self.peek_is(1, '&') => self.read_double(TokenKind::LogicalAnd),
                // Logical Or (||)
                '|' if self.peek_is(1, '|') => self.read_double(TokenKind::LogicalOr),

                s if SINGLE_TOKENS.contains_key(&s) => self.read_single(SINGLE_TOKENS[&s]),
                c => {
                    return Err(SyntaxError::new(
                        format!("unexpected character `{c}`"),
                        Span::new(self.position, self.position + c.len_utf8()),
                    ));
                }
            };

            return Ok(Some(token));
        }

        Ok(None)
    }
}

#[cfg(test)]
mod tests {
    use super::{Keyword, Lexer, RawStringPart, Span, TokenKind, scan_string};
    use crate::frontend::SourceFile;

    fn kinds(source: &str) -> Vec<TokenKind> {
        let source_file = SourceFile::from_memory(source);
        let mut lexer = Lexer::new(&source_file);
        let mut kinds = Vec::new();

        while let Some(token) = lexer.next().unwrap() {
            kinds.push(token.kind);
        }

        kinds
    }

    #[test]
    fn lexes_declaration_and_closure() {
        assert_eq!(
            kinds("var a = () => x + 1; // trailing\n/* block */ a();"),
            vec![
                TokenKind::Keyword(Keyword::Var),
                TokenKind::Identifier,
                TokenKind::Equals,
                TokenKind::OpenParen,
                TokenKind::CloseParen,
                TokenKind::FatArrow,
                TokenKind::Identifier,
                TokenKind::Plus,
                TokenKind::IntegerLiteral,
                TokenKind::Semicolon,
                TokenKind::Identifier,
                TokenKind::OpenParen,
                TokenKind::CloseParen,
                TokenKind::Semicolon,
            ]
        );
    }

    #[test]
    fn lexes_numbers_and_operators() {
        assert_eq!(
            kinds("1.5 2e3 3 x += 1 == != <= && ||"),
            vec![
                TokenKind::DoubleLiteral,
                TokenKind::DoubleLiteral,
                TokenKind::IntegerLiteral,
                TokenKind::Identifier,
                TokenKind::PlusEquals,
                TokenKind::IntegerLiteral,
                TokenKind::DoubleEquals,
                TokenKind::NotEquals,
                TokenKind::LessThanOrEqualTo,
                TokenKind::LogicalAnd,
                TokenKind::LogicalOr,
            ]
        );
    }

    #[test]
    fn interpolated_string_is_one_token() {
        let source = "print('(${{'s': 1}})');";
        let source_file = SourceFile::from_memory(source);
        let mut lexer = Lexer::new(&source_file);

        lexer.next().unwrap();
        lexer.next().unwrap();
        let string = lexer.next().unwrap().unwrap();

        assert_eq!(string.kind, TokenKind::StringLiteral);
        assert_eq!(source_file.value_of_span(string.span), "'(${{'s': 1}})'");
        assert_eq!(lexer.next().unwrap().unwrap().kind, TokenKind::CloseParen);
    }

    #[test]
    fn scans_string_parts() {
        let source = r"'a\'b $name ${x + 1}!'";
        let scanned = scan_string(source, 0).unwrap();

        assert_eq!(scanned.end, source.len());
        assert_eq!(
            scanned.parts,
            vec![
                RawStringPart::Fragment("a'b ".to_owned()),
                RawStringPart::Identifier(Span::new(7, 11)),
                RawStringPart::Fragment(" ".to_owned()),
                RawStringPart::Expression(Span::new(14, 19)),
                RawStringPart::Fragment("!".to_owned()),
            ]
        );
    }

    #[test]
    fn unterminated_string_is_an_error() {
        let source_file = SourceFile::from_memory("'abc\n'");
        let mut lexer = Lexer::new(&source_file);

        let error = lexer.next().unwrap_err();

        assert!(error.message.contains("end of line"));
    }

    #[test]
    fn ranged_lexer_keeps_file_positions() {
        let source_file = SourceFile::from_memory("abc + def");
        let mut lexer = Lexer::with_range(&source_file, 6, 9);

        let token = lexer.next().unwrap().unwrap();

        assert_eq!(token.span, Span::new(6, 9));
        assert!(lexer.next().unwrap().is_none());
    }
}
