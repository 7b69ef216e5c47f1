use super::{
    ast::{AssignmentOperator, Item, ItemKind, NodeId},
    intern::Symbol,
};
use crate::{
    error::SyntaxError,
    frontend::{
        SourceFile,
        ast::{
            AssignmentOperatorKind, BinaryOperator, BinaryOperatorKind, Block, Declarator,
            Expression, ExpressionKind, FunctionCallArgumentList, FunctionDefinition,
            FunctionLiteral, FunctionParameter, FunctionParameterList, Identifier, Literal,
            LiteralKind, Local, MapEntry, Module, Statement, StatementKind, StringPart,
            UnaryOperator, UnaryOperatorKind,
        },
        lexer::{Keyword, Lexer, RawStringPart, Span, Token, TokenKind, scan_string},
    },
};

type ParseResult<T> = Result<T, SyntaxError>;

#[derive(Debug)]
pub struct Parser<'source> {
    lexer: Lexer<'source>,
    next_node_id: u32,
}

impl<'source> Parser<'source> {
    pub fn parse_module(source_file: &'source SourceFile) -> ParseResult<Module<'source>> {
        let mut parser = Self {
            lexer: Lexer::new(source_file),
            next_node_id: 0,
        };

        let mut module = Module {
            source_file,
            items: Vec::new(),
        };

        while parser.lexer.peek()?.is_some() {
            module.items.push(parser.parse_module_item()?);
        }

        Ok(module)
    }

    fn create_node_id(&mut self) -> NodeId {
        let id = NodeId(self.next_node_id);
        self.next_node_id += 1;
        id
    }

    fn source(&self) -> &'source SourceFile {
        self.lexer.source()
    }

    fn peek_kind(&mut self) -> ParseResult<Option<TokenKind>> {
        Ok(self.lexer.peek()?.map(|token| token.kind))
    }

    fn peek_nth_kind(&mut self, n: usize) -> ParseResult<Option<TokenKind>> {
        Ok(self.lexer.peek_nth(n)?.map(|token| token.kind))
    }

    fn peek_is(&mut self, kind: TokenKind) -> ParseResult<bool> {
        Ok(self.peek_kind()? == Some(kind))
    }

    fn unexpected(&self, token: Token, expecting: &str) -> SyntaxError {
        SyntaxError::new(
            format!(
                "expected {expecting} but found `{}`",
                self.source().value_of_span(token.span)
            ),
            token.span,
        )
    }

    fn expect_peek(&mut self, expecting: &str) -> ParseResult<Token> {
        match self.lexer.peek()? {
            Some(token) => Ok(token),
            None => Err(SyntaxError::new(
                format!("expected {expecting} but reached end of input"),
                self.lexer.end_span(),
            )),
        }
    }

    fn expect_next(&mut self, expecting: &str) -> ParseResult<Token> {
        match self.lexer.next()? {
            Some(token) => Ok(token),
            None => Err(SyntaxError::new(
                format!("expected {expecting} but reached end of input"),
                self.lexer.end_span(),
            )),
        }
    }

    fn expect_next_to_be(&mut self, kind: TokenKind, expecting: &str) -> ParseResult<Token> {
        let token = self.expect_next(expecting)?;

        if token.kind != kind {
            return Err(self.unexpected(token, expecting));
        }

        Ok(token)
    }

    fn parse_module_item(&mut self) -> ParseResult<Item> {
        let peeked = self.expect_peek("function definition")?;

        match peeked.kind {
            TokenKind::Identifier => {
                let function = Box::new(self.parse_function_definition()?);

                Ok(Item {
                    id: self.create_node_id(),
                    span: function.span,
                    kind: ItemKind::FunctionDefinition(function),
                })
            }
            _ => Err(self.unexpected(peeked, "function definition")),
        }
    }

    /// [ReturnType] name(params) { body }
    fn parse_function_definition(&mut self) -> ParseResult<FunctionDefinition> {
        let first = self.parse_identifier()?;

        let (return_type, name) = if self.peek_is(TokenKind::Identifier)? {
            (Some(first), self.parse_identifier()?)
        } else {
            (None, first)
        };

        let parameters = self.parse_function_parameter_list()?;
        let body = self.parse_function_body(true)?;

        Ok(FunctionDefinition {
            id: self.create_node_id(),
            span: Span::new(
                return_type.as_ref().unwrap_or(&name).span.start,
                body.span.end,
            ),
            return_type,
            name,
            parameters,
            body,
        })
    }

    /// `{ ... }` or `=> expression`, the latter terminated by a semicolon in
    /// function definitions
    fn parse_function_body(&mut self, arrow_needs_semicolon: bool) -> ParseResult<Block> {
        let peeked = self.expect_peek("function body")?;

        match peeked.kind {
            TokenKind::OpenBrace => self.parse_block(),
            TokenKind::FatArrow => {
                let arrow = self.expect_next_to_be(TokenKind::FatArrow, "`=>`")?;
                let expression = self.parse_expression()?;
                let mut end = expression.span.end;

                if arrow_needs_semicolon {
                    end = self
                        .expect_next_to_be(TokenKind::Semicolon, "`;`")?
                        .span
                        .end;
                }

                let span = Span::new(arrow.span.start, end);
                let statement = Statement {
                    id: self.create_node_id(),
                    span,
                    kind: StatementKind::Return(Some(Box::new(expression))),
                };

                Ok(Block {
                    id: self.create_node_id(),
                    span,
                    statements: vec![statement],
                })
            }
            _ => Err(self.unexpected(peeked, "`{` or `=>`")),
        }
    }

    // main
    fn parse_identifier(&mut self) -> ParseResult<Identifier> {
        let token = self.expect_next_to_be(TokenKind::Identifier, "identifier")?;

        Ok(self.identifier_from_span(token.span))
    }

    fn identifier_from_span(&mut self, span: Span) -> Identifier {
        Identifier {
            id: self.create_node_id(),
            span,
            symbol: Symbol::intern(self.source().value_of_span(span)),
        }
    }

    // (int count, name)
    fn parse_function_parameter_list(&mut self) -> ParseResult<FunctionParameterList> {
        let mut parameters = Vec::new();

        let open_paren = self.expect_next_to_be(TokenKind::OpenParen, "`(`")?;

        // If the next token is not a closing paren, there MUST be at least one
        // parameter
        if self.expect_peek("function parameter or `)`")?.kind != TokenKind::CloseParen {
            parameters.push(self.parse_function_parameter()?);

            while self.peek_is(TokenKind::Comma)? {
                self.expect_next_to_be(TokenKind::Comma, "`,`")?;

                if self.peek_is(TokenKind::CloseParen)? {
                    break;
                }

                parameters.push(self.parse_function_parameter()?);
            }
        }

        let close_paren = self.expect_next_to_be(TokenKind::CloseParen, "`)`")?;

        Ok(FunctionParameterList {
            id: self.create_node_id(),
            span: Span::new(open_paren.span.start, close_paren.span.end),
            parameters,
        })
    }

    // [int] count
    fn parse_function_parameter(&mut self) -> ParseResult<FunctionParameter> {
        let first = self.parse_identifier()?;

        let (ty, name) = if self.peek_is(TokenKind::Identifier)? {
            (Some(first), self.parse_identifier()?)
        } else {
            (None, first)
        };

        Ok(FunctionParameter {
            id: self.create_node_id(),
            span: Span::new(ty.as_ref().unwrap_or(&name).span.start, name.span.end),
            ty,
            name,
        })
    }

    fn parse_block(&mut self) -> ParseResult<Block> {
        let mut statements = Vec::new();

        let open_brace = self.expect_next_to_be(TokenKind::OpenBrace, "`{`")?;

        while self.expect_peek("statement or `}`")?.kind != TokenKind::CloseBrace {
            statements.push(self.parse_statement()?);
        }

        let close_brace = self.expect_next_to_be(TokenKind::CloseBrace, "`}`")?;

        Ok(Block {
            id: self.create_node_id(),
            span: Span::new(open_brace.span.start, close_brace.span.end),
            statements,
        })
    }

    fn parse_statement(&mut self) -> ParseResult<Statement> {
        let peeked = self.expect_peek("statement")?;

        let is_typed_local = peeked.kind == TokenKind::Identifier
            && self.peek_nth_kind(1)? == Some(TokenKind::Identifier);

        match peeked.kind {
            TokenKind::Keyword(Keyword::Var | Keyword::Final | Keyword::Const) => {
                self.parse_local_statement()
            }
            TokenKind::Identifier if is_typed_local => self.parse_local_statement(),
            TokenKind::Keyword(Keyword::If) => self.parse_if_statement(),
            TokenKind::Keyword(Keyword::While) => self.parse_while_statement(),
            TokenKind::Keyword(Keyword::Return) => self.parse_return_statement(),
            TokenKind::OpenBrace => {
                let block = self.parse_block()?;

                Ok(Statement {
                    id: self.create_node_id(),
                    span: block.span,
                    kind: StatementKind::Block(Box::new(block)),
                })
            }
            TokenKind::Semicolon => {
                let semicolon = self.expect_next_to_be(TokenKind::Semicolon, "`;`")?;

                Ok(Statement {
                    id: self.create_node_id(),
                    span: semicolon.span,
                    kind: StatementKind::Empty,
                })
            }
            _ => {
                let expression = self.parse_expression()?;
                let semicolon =
                    self.expect_next_to_be(TokenKind::Semicolon, "`;` after expression")?;

                Ok(Statement {
                    id: self.create_node_id(),
                    span: Span::new(expression.span.start, semicolon.span.end),
                    kind: StatementKind::Expression(Box::new(expression)),
                })
            }
        }
    }

    fn parse_local_statement(&mut self) -> ParseResult<Statement> {
        let local = self.parse_local()?;

        Ok(Statement {
            id: self.create_node_id(),
            span: local.span,
            kind: StatementKind::Local(Box::new(local)),
        })
    }

    /// var x = 1; | final [T] x = 1; | const [T] x = 1; | T x;
    fn parse_local(&mut self) -> ParseResult<Local> {
        let first = self.expect_peek("local declaration")?;

        let declarator = match first.kind {
            TokenKind::Keyword(Keyword::Var) => Declarator::Var,
            TokenKind::Keyword(Keyword::Final) => Declarator::Final,
            TokenKind::Keyword(Keyword::Const) => Declarator::Const,
            _ => Declarator::Typed,
        };

        if declarator != Declarator::Typed {
            self.expect_next("declarator keyword")?;
        }

        let has_type = match declarator {
            Declarator::Typed => true,
            Declarator::Var => false,
            Declarator::Final | Declarator::Const => {
                self.peek_is(TokenKind::Identifier)?
                    && self.peek_nth_kind(1)? == Some(TokenKind::Identifier)
            }
        };

        let ty = if has_type {
            Some(self.parse_identifier()?)
        } else {
            None
        };
        let name = self.parse_identifier()?;

        let initializer = if self.peek_is(TokenKind::Equals)? {
            self.expect_next_to_be(TokenKind::Equals, "`=`")?;
            Some(Box::new(self.parse_expression()?))
        } else {
            None
        };

        let semicolon = self.expect_next_to_be(TokenKind::Semicolon, "`;` after declaration")?;

        Ok(Local {
            id: self.create_node_id(),
            span: Span::new(first.span.start, semicolon.span.end),
            declarator,
            ty,
            name,
            initializer,
        })
    }

    /// if (condition) statement [else statement]
    fn parse_if_statement(&mut self) -> ParseResult<Statement> {
        let if_keyword = self.expect_next_to_be(TokenKind::Keyword(Keyword::If), "`if`")?;

        self.expect_next_to_be(TokenKind::OpenParen, "`(` after `if`")?;
        let condition = self.parse_expression()?;
        self.expect_next_to_be(TokenKind::CloseParen, "`)` after condition")?;

        let positive = self.parse_statement()?;
        let mut end = positive.span.end;

        let negative = if self.peek_is(TokenKind::Keyword(Keyword::Else))? {
            self.expect_next("`else`")?;

            let negative = self.parse_statement()?;
            end = negative.span.end;

            Some(Box::new(negative))
        } else {
            None
        };

        Ok(Statement {
            id: self.create_node_id(),
            span: Span::new(if_keyword.span.start, end),
            kind: StatementKind::If {
                condition: Box::new(condition),
                positive: Box::new(positive),
                negative,
            },
        })
    }

    /// while (condition) statement
    fn parse_while_statement(&mut self) -> ParseResult<Statement> {
        let while_keyword =
            self.expect_next_to_be(TokenKind::Keyword(Keyword::While), "`while`")?;

        self.expect_next_to_be(TokenKind::OpenParen, "`(` after `while`")?;
        let condition = self.parse_expression()?;
        self.expect_next_to_be(TokenKind::CloseParen, "`)` after condition")?;

        let body = self.parse_statement()?;

        Ok(Statement {
            id: self.create_node_id(),
            span: Span::new(while_keyword.span.start, body.span.end),
            kind: StatementKind::While {
                condition: Box::new(condition),
                body: Box::new(body),
            },
        })
    }

    /// return [expression];
    fn parse_return_statement(&mut self) -> ParseResult<Statement> {
        let return_keyword =
            self.expect_next_to_be(TokenKind::Keyword(Keyword::Return), "`return`")?;

        let expression = if self.peek_is(TokenKind::Semicolon)? {
            None
        } else {
            Some(Box::new(self.parse_expression()?))
        };

        let semicolon = self.expect_next_to_be(TokenKind::Semicolon, "`;` after return")?;

        Ok(Statement {
            id: self.create_node_id(),
            span: Span::new(return_keyword.span.start, semicolon.span.end),
            kind: StatementKind::Return(expression),
        })
    }

    pub fn parse_expression(&mut self) -> ParseResult<Expression> {
        self.parse_assignment_expression()
    }

    /// Right associative; the target must be a plain name
    fn parse_assignment_expression(&mut self) -> ParseResult<Expression> {
        let expression = self.parse_logical_or_expression()?;

        let Some(peeked) = self.lexer.peek()? else {
            return Ok(expression);
        };

        if !peeked.kind.is_assignment_operator() {
            return Ok(expression);
        }

        let operator = self.parse_assignment_operator()?;

        let ExpressionKind::Identifier(target) = expression.kind else {
            return Err(SyntaxError::new(
                "invalid assignment target, only local names can be assigned",
                expression.span,
            ));
        };

        let rhs = self.parse_assignment_expression()?;
        let span = Span::new(expression.span.start, rhs.span.end);

        // `parse_assignment_operator` returns None for a plain "="
        let kind = match operator {
            Some(operator) => ExpressionKind::OperatorAssignment {
                operator,
                target,
                rhs: Box::new(rhs),
            },
            None => ExpressionKind::Assignment {
                target,
                rhs: Box::new(rhs),
            },
        };

        Ok(Expression {
            id: self.create_node_id(),
            span,
            kind,
        })
    }

    fn parse_assignment_operator(&mut self) -> ParseResult<Option<AssignmentOperator>> {
        let operator = self.expect_next("assignment operator")?;

        let kind = match operator.kind {
            TokenKind::PlusEquals => AssignmentOperatorKind::Add,
            TokenKind::MinusEquals => AssignmentOperatorKind::Subtract,
            TokenKind::MultiplyEquals => AssignmentOperatorKind::Multiply,
            TokenKind::DivideEquals => AssignmentOperatorKind::Divide,
            TokenKind::ModulusEquals => AssignmentOperatorKind::Modulus,
            _ => return Ok(None),
        };

        Ok(Some(AssignmentOperator {
            id: self.create_node_id(),
            span: operator.span,
            kind,
        }))
    }

    /// Parses a left associative chain of operands produced by `operand`
    /// joined by the operators `operator_for` recognises.
    fn parse_binary_chain(
        &mut self,
        operand: fn(&mut Self) -> ParseResult<Expression>,
        operator_for: fn(TokenKind) -> Option<BinaryOperatorKind>,
    ) -> ParseResult<Expression> {
        let mut expression = operand(self)?;

        while let Some(kind) = self.peek_kind()?.and_then(operator_for) {
            let operator = self.expect_next("binary operator")?;
            let rhs = operand(self)?;

            expression = Expression {
                id: self.create_node_id(),
                span: Span::new(expression.span.start, rhs.span.end),
                kind: ExpressionKind::Binary {
                    lhs: Box::new(expression),
                    operator: BinaryOperator {
                        id: self.create_node_id(),
                        span: operator.span,
                        kind,
                    },
                    rhs: Box::new(rhs),
                },
            }
        }

        Ok(expression)
    }

    fn parse_logical_or_expression(&mut self) -> ParseResult<Expression> {
        self.parse_binary_chain(Self::parse_logical_and_expression, |kind| match kind {
            TokenKind::LogicalOr => Some(BinaryOperatorKind::LogicalOr),
            _ => None,
        })
    }

    fn parse_logical_and_expression(&mut self) -> ParseResult<Expression> {
        self.parse_binary_chain(Self::parse_equality_expression, |kind| match kind {
            TokenKind::LogicalAnd => Some(BinaryOperatorKind::LogicalAnd),
            _ => None,
        })
    }

    fn parse_equality_expression(&mut self) -> ParseResult<Expression> {
        self.parse_binary_chain(Self::parse_relational_expression, |kind| match kind {
            TokenKind::DoubleEquals => Some(BinaryOperatorKind::Equals),
            TokenKind::NotEquals => Some(BinaryOperatorKind::NotEquals),
            _ => None,
        })
    }

    fn parse_relational_expression(&mut self) -> ParseResult<Expression> {
        self.parse_binary_chain(Self::parse_term_expression, |kind| match kind {
            TokenKind::LessThan => Some(BinaryOperatorKind::LessThan),
            TokenKind::LessThanOrEqualTo => Some(BinaryOperatorKind::LessThanOrEqualTo),
            TokenKind::GreaterThan => Some(BinaryOperatorKind::GreaterThan),
            TokenKind::GreaterThanOrEqualTo => Some(BinaryOperatorKind::GreaterThanOrEqualTo),
            _ => None,
        })
    }

    fn parse_term_expression(&mut self) -> ParseResult<Expression> {
        self.parse_binary_chain(Self::parse_factor_expression, |kind| match kind {
            TokenKind::Plus => Some(BinaryOperatorKind::Add),
            TokenKind::Minus => Some(BinaryOperatorKind::Subtract),
            _ => None,
        })
    }

    fn parse_factor_expression(&mut self) -> ParseResult<Expression> {
        self.parse_binary_chain(Self::parse_unary_expression, |kind| match kind {
            TokenKind::Asterisk => Some(BinaryOperatorKind::Multiply),
            TokenKind::Divide => Some(BinaryOperatorKind::Divide),
            TokenKind::Modulus => Some(BinaryOperatorKind::Modulus),
            _ => None,
        })
    }

    fn parse_unary_expression(&mut self) -> ParseResult<Expression> {
        let peeked = self.expect_peek("expression")?;

        let kind = match peeked.kind {
            TokenKind::Bang => UnaryOperatorKind::LogicalNot,
            TokenKind::Minus => UnaryOperatorKind::Negate,
            _ => return self.parse_function_call_expression(),
        };

        let operator = self.expect_next("unary operator")?;
        let operand = self.parse_unary_expression()?;

        Ok(Expression {
            id: self.create_node_id(),
            span: Span::new(operator.span.start, operand.span.end),
            kind: ExpressionKind::Unary {
                operator: UnaryOperator {
                    id: self.create_node_id(),
                    span: operator.span,
                    kind,
                },
                operand: Box::new(operand),
            },
        })
    }

    /// target(arguments)(arguments)...
    fn parse_function_call_expression(&mut self) -> ParseResult<Expression> {
        let mut expression = self.parse_atomic_expression()?;

        while self.peek_is(TokenKind::OpenParen)? {
            let arguments = self.parse_function_call_arguments()?;

            expression = Expression {
                id: self.create_node_id(),
                span: Span::new(expression.span.start, arguments.span.end),
                kind: ExpressionKind::FunctionCall {
                    target: Box::new(expression),
                    arguments: Box::new(arguments),
                },
            };
        }

        Ok(expression)
    }

    fn parse_function_call_arguments(&mut self) -> ParseResult<FunctionCallArgumentList> {
        let open_paren = self.expect_next_to_be(TokenKind::OpenParen, "`(`")?;
        let (arguments, close_paren) =
            self.parse_comma_separated(TokenKind::CloseParen, Self::parse_expression)?;

        Ok(FunctionCallArgumentList {
            id: self.create_node_id(),
            span: Span::new(open_paren.span.start, close_paren.span.end),
            arguments,
        })
    }

    /// Parses `element (, element)* [,]` up to and including `close`
    fn parse_comma_separated<T>(
        &mut self,
        close: TokenKind,
        element: fn(&mut Self) -> ParseResult<T>,
    ) -> ParseResult<(Vec<T>, Token)> {
        let mut elements = Vec::new();

        while self.expect_peek("element or closing delimiter")?.kind != close {
            elements.push(element(self)?);

            if !self.peek_is(TokenKind::Comma)? {
                break;
            }

            self.expect_next("`,`")?;
        }

        let closing = self.expect_next_to_be(close, "closing delimiter")?;

        Ok((elements, closing))
    }

    fn parse_atomic_expression(&mut self) -> ParseResult<Expression> {
        let peeked = self.expect_peek("expression")?;

        match peeked.kind {
            TokenKind::StringLiteral => self.parse_string_expression(),
            kind if kind.is_literal() => {
                let literal = self.parse_literal()?;

                Ok(Expression {
                    id: self.create_node_id(),
                    span: literal.span,
                    kind: ExpressionKind::Literal(Box::new(literal)),
                })
            }
            TokenKind::Identifier => {
                let identifier = self.parse_identifier()?;

                Ok(Expression {
                    id: self.create_node_id(),
                    span: identifier.span,
                    kind: ExpressionKind::Identifier(Box::new(identifier)),
                })
            }
            TokenKind::OpenParen if self.is_function_literal_ahead()? => {
                self.parse_function_literal()
            }
            TokenKind::OpenParen => self.parse_grouping_expression(),
            TokenKind::OpenBracket => self.parse_list_expression(),
            TokenKind::OpenBrace => self.parse_map_expression(),
            _ => Err(self.unexpected(peeked, "expression")),
        }
    }

    /// Looks past `( name, [Type] name, ... )` for the `{` or `=>` that turns
    /// parentheses into a function literal.
    fn is_function_literal_ahead(&mut self) -> ParseResult<bool> {
        let mut n = 1;

        loop {
            match self.peek_nth_kind(n)? {
                Some(TokenKind::Identifier | TokenKind::Comma) => n += 1,
                Some(TokenKind::CloseParen) => {
                    return Ok(matches!(
                        self.peek_nth_kind(n + 1)?,
                        Some(TokenKind::OpenBrace | TokenKind::FatArrow)
                    ));
                }
                _ => return Ok(false),
            }
        }
    }

    /// (params) { body } | (params) => expression
    fn parse_function_literal(&mut self) -> ParseResult<Expression> {
        let parameters = self.parse_function_parameter_list()?;
        let body = self.parse_function_body(false)?;
        let span = Span::new(parameters.span.start, body.span.end);

        let literal = FunctionLiteral {
            id: self.create_node_id(),
            span,
            parameters,
            body,
        };

        Ok(Expression {
            id: self.create_node_id(),
            span,
            kind: ExpressionKind::FunctionLiteral(Box::new(literal)),
        })
    }

    fn parse_grouping_expression(&mut self) -> ParseResult<Expression> {
        let open_paren = self.expect_next_to_be(TokenKind::OpenParen, "`(`")?;
        let expression = self.parse_expression()?;
        let close_paren = self.expect_next_to_be(TokenKind::CloseParen, "`)`")?;

        Ok(Expression {
            id: self.create_node_id(),
            span: Span::new(open_paren.span.start, close_paren.span.end),
            kind: ExpressionKind::Grouping(Box::new(expression)),
        })
    }

    /// [e1, e2, ...]
    fn parse_list_expression(&mut self) -> ParseResult<Expression> {
        let open_bracket = self.expect_next_to_be(TokenKind::OpenBracket, "`[`")?;
        let (elements, close_bracket) =
            self.parse_comma_separated(TokenKind::CloseBracket, Self::parse_expression)?;

        Ok(Expression {
            id: self.create_node_id(),
            span: Span::new(open_bracket.span.start, close_bracket.span.end),
            kind: ExpressionKind::List(elements.into_boxed_slice()),
        })
    }

    /// {k1: v1, k2: v2, ...}
    fn parse_map_expression(&mut self) -> ParseResult<Expression> {
        let open_brace = self.expect_next_to_be(TokenKind::OpenBrace, "`{`")?;
        let (entries, close_brace) =
            self.parse_comma_separated(TokenKind::CloseBrace, Self::parse_map_entry)?;

        Ok(Expression {
            id: self.create_node_id(),
            span: Span::new(open_brace.span.start, close_brace.span.end),
            kind: ExpressionKind::Map(entries.into_boxed_slice()),
        })
    }

    fn parse_map_entry(&mut self) -> ParseResult<MapEntry> {
        let key = self.parse_expression()?;
        self.expect_next_to_be(TokenKind::Colon, "`:` after map key")?;
        let value = self.parse_expression()?;

        Ok(MapEntry {
            id: self.create_node_id(),
            span: Span::new(key.span.start, value.span.end),
            key,
            value,
        })
    }

    /// One or more adjacent string literals, concatenated. Without any
    /// interpolated parts the result is a plain string literal.
    fn parse_string_expression(&mut self) -> ParseResult<Expression> {
        let first = self.expect_next_to_be(TokenKind::StringLiteral, "string literal")?;
        let mut span = first.span;
        let mut parts = self.parse_string_parts(first)?;

        while self.peek_is(TokenKind::StringLiteral)? {
            let next = self.expect_next("string literal")?;

            span = span.to(next.span);
            parts.extend(self.parse_string_parts(next)?);
        }

        let mut merged: Vec<StringPart> = Vec::with_capacity(parts.len());

        for part in parts {
            match (merged.last_mut(), part) {
                (Some(StringPart::Fragment(previous)), StringPart::Fragment(text)) => {
                    previous.push_str(&text)
                }
                (_, part) => merged.push(part),
            }
        }

        let is_plain = merged
            .iter()
            .all(|part| matches!(part, StringPart::Fragment(_)));

        if is_plain {
            let text = match merged.first() {
                Some(StringPart::Fragment(text)) => text.as_str(),
                _ => "",
            };

            let literal = Literal {
                id: self.create_node_id(),
                span,
                kind: LiteralKind::String,
                symbol: Symbol::intern(text),
            };

            return Ok(Expression {
                id: self.create_node_id(),
                span,
                kind: ExpressionKind::Literal(Box::new(literal)),
            });
        }

        Ok(Expression {
            id: self.create_node_id(),
            span,
            kind: ExpressionKind::StringInterpolation(merged.into_boxed_slice()),
        })
    }

    fn parse_string_parts(&mut self, token: Token) -> ParseResult<Vec<StringPart>> {
        let scanned = scan_string(&self.source().contents[..token.span.end], token.span.start)?;

        scanned
            .parts
            .into_iter()
            .map(|part| match part {
                RawStringPart::Fragment(text) => Ok(StringPart::Fragment(text)),
                RawStringPart::Identifier(span) => {
                    let identifier = self.identifier_from_span(span);

                    Ok(StringPart::Expression(Expression {
                        id: self.create_node_id(),
                        span,
                        kind: ExpressionKind::Identifier(Box::new(identifier)),
                    }))
                }
                RawStringPart::Expression(span) => {
                    self.parse_embedded_expression(span).map(StringPart::Expression)
                }
            })
            .collect()
    }

    /// Parses the inside of `${...}` with a lexer limited to that range.
    fn parse_embedded_expression(&mut self, span: Span) -> ParseResult<Expression> {
        let nested = Lexer::with_range(self.source(), span.start, span.end);
        let outer = std::mem::replace(&mut self.lexer, nested);

        let result = self.parse_expression().and_then(|expression| {
            match self.lexer.peek()? {
                Some(trailing) => Err(self.unexpected(trailing, "`}` closing the interpolation")),
                None => Ok(expression),
            }
        });

        self.lexer = outer;
        result
    }

    fn parse_literal(&mut self) -> ParseResult<Literal> {
        let token = self.expect_next("literal")?;
        let text = self.source().value_of_span(token.span);

        let kind = match token.kind {
            TokenKind::NullLiteral => LiteralKind::Null,
            TokenKind::BooleanLiteral => LiteralKind::Boolean,
            TokenKind::IntegerLiteral => {
                if text.parse::<i64>().is_err() {
                    return Err(SyntaxError::new(
                        format!("integer literal `{text}` is out of range"),
                        token.span,
                    ));
                }

                LiteralKind::Integer
            }
            TokenKind::DoubleLiteral => LiteralKind::Double,
            _ => return Err(self.unexpected(token, "literal")),
        };

        Ok(Literal {
            id: self.create_node_id(),
            span: token.span,
            kind,
            symbol: Symbol::intern(text),
        })
    }
}

#[cfg(test)]
mod tests {
    use indoc::indoc;

    use super::Parser;
    use crate::frontend::{
        SourceFile,
        ast::{Declarator, ExpressionKind, LiteralKind, StatementKind, StringPart},
    };

    fn parse_main_statements(source: &str) -> Vec<StatementKind> {
        let source_file = SourceFile::from_memory(source);
        let module = Parser::parse_module(&source_file).unwrap();
        let mut items = module.items;

        assert_eq!(items.len(), 1);

        let crate::frontend::ast::ItemKind::FunctionDefinition(function) = items.remove(0).kind;

        function
            .body
            .statements
            .into_iter()
            .map(|statement| statement.kind)
            .collect()
    }

    fn expression_of(statement: StatementKind) -> ExpressionKind {
        match statement {
            StatementKind::Expression(expression) => expression.kind,
            other => panic!("expected an expression statement, found {other:?}"),
        }
    }

    fn print_argument(statement: StatementKind) -> ExpressionKind {
        match expression_of(statement) {
            ExpressionKind::FunctionCall { mut arguments, .. } => {
                arguments.arguments.remove(0).kind
            }
            other => panic!("expected a call, found {other:?}"),
        }
    }

    #[test]
    fn adjacent_strings_concatenate_into_one_literal() {
        let mut statements = parse_main_statements("main() { print('(' ')'); }");

        match print_argument(statements.remove(0)) {
            ExpressionKind::Literal(literal) => {
                assert_eq!(literal.kind, LiteralKind::String);
                assert_eq!(literal.symbol.value(), "()");
            }
            other => panic!("expected a string literal, found {other:?}"),
        }
    }

    #[test]
    fn interpolation_parts_are_parsed() {
        let mut statements = parse_main_statements("main() { print('($e and ${{'s': 1}})'); }");

        let ExpressionKind::StringInterpolation(parts) = print_argument(statements.remove(0))
        else {
            panic!("expected an interpolation");
        };

        assert_eq!(parts.len(), 5);
        assert!(matches!(&parts[0], StringPart::Fragment(text) if text == "("));
        assert!(matches!(
            &parts[1],
            StringPart::Expression(expression)
                if matches!(&expression.kind, ExpressionKind::Identifier(identifier) if identifier.symbol.value() == "e")
        ));
        assert!(matches!(&parts[2], StringPart::Fragment(text) if text == " and "));
        assert!(matches!(
            &parts[3],
            StringPart::Expression(expression)
                if matches!(&expression.kind, ExpressionKind::Map(entries) if entries.len() == 1)
        ));
        assert!(matches!(&parts[4], StringPart::Fragment(text) if text == ")"));
    }

    #[test]
    fn function_literals_and_groupings_are_distinguished() {
        let source = indoc! {"
            main() {
              var a = () {
                var y = x;
                return () => y;
              };
              var b = (x);
              final int c = (p, int q) => p + q;
            }
        "};

        let statements = parse_main_statements(source);

        let initializers: Vec<_> = statements
            .into_iter()
            .map(|statement| match statement {
                StatementKind::Local(local) => (local.declarator, local.initializer.unwrap().kind),
                other => panic!("expected a local, found {other:?}"),
            })
            .collect();

        assert!(matches!(
            &initializers[0],
            (Declarator::Var, ExpressionKind::FunctionLiteral(literal)) if literal.body.statements.len() == 2
        ));
        assert!(matches!(&initializers[1], (Declarator::Var, ExpressionKind::Grouping(_))));
        assert!(matches!(
            &initializers[2],
            (Declarator::Final, ExpressionKind::FunctionLiteral(literal))
                if literal.parameters.parameters.len() == 2
                    && matches!(literal.body.statements[0].kind, StatementKind::Return(Some(_)))
        ));
    }

    #[test]
    fn assignment_is_right_associative_and_targets_names() {
        let mut statements = parse_main_statements("main() { x = y += 1; }");

        match expression_of(statements.remove(0)) {
            ExpressionKind::Assignment { target, rhs } => {
                assert_eq!(target.symbol.value(), "x");
                assert!(matches!(rhs.kind, ExpressionKind::OperatorAssignment { .. }));
            }
            other => panic!("expected an assignment, found {other:?}"),
        }
    }

    #[test]
    fn invalid_assignment_target_is_a_syntax_error() {
        let source_file = SourceFile::from_memory("main() { f() = 1; }");

        let error = Parser::parse_module(&source_file).unwrap_err();

        assert!(error.message.contains("invalid assignment target"));
        assert_eq!(source_file.value_of_span(error.span), "f()");
    }

    #[test]
    fn missing_semicolon_is_reported_with_span() {
        let source_file = SourceFile::from_memory("main() { print(1) }");

        let error = Parser::parse_module(&source_file).unwrap_err();

        assert!(error.message.contains("`;` after expression"));
        assert_eq!(source_file.value_of_span(error.span), "}");
    }

    #[test]
    fn control_flow_statements_parse() {
        let source = indoc! {"
            void main() {
              var i = 0;
              while (i < 3) i += 1;
              if (i == 3) { print('done'); } else print('odd');
              return;
            }
        "};

        let statements = parse_main_statements(source);

        assert!(matches!(statements[1], StatementKind::While { .. }));
        assert!(matches!(
            &statements[2],
            StatementKind::If { negative: Some(_), .. }
        ));
        assert!(matches!(statements[3], StatementKind::Return(None)));
    }
}
