use crate::Span;
use crate::ast::{
    BlockStatement, Expression, Identifier, InfixOperator, PrefixOperator, Program, Statement,
};
use crate::lexer::{Lexer, Token, TokenKind};
use crate::stack::ensure_sufficient_stack;
use std::rc::Rc;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ParseError {
    #[error("expected next token to be {expected}, got {found}")]
    UnexpectedToken {
        expected: TokenKind,
        found: TokenKind,
        span: Span,
    },
    #[error("no parsing rule for token {kind}")]
    NoPrefixRule { kind: TokenKind, span: Span },
    #[error("illegal token '{literal}'")]
    IllegalToken { literal: String, span: Span },
    #[error("could not parse {literal} as integer")]
    InvalidInteger { literal: String, span: Span },
    #[error("invalid assignment target: {target}")]
    InvalidAssignmentTarget { target: String, span: Span },
}

impl ParseError {
    /// Location of the offending token.
    pub fn span(&self) -> Span {
        match self {
            ParseError::UnexpectedToken { span, .. }
            | ParseError::NoPrefixRule { span, .. }
            | ParseError::IllegalToken { span, .. }
            | ParseError::InvalidInteger { span, .. }
            | ParseError::InvalidAssignmentTarget { span, .. } => *span,
        }
    }
}

// Result type alias for convenience
type ParseResult<T> = Result<T, ParseError>;

/// Binding power of infix operators, lowest first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
enum Precedence {
    Lowest,
    Assign,      // =
    Equals,      // == !=
    LessGreater, // < > <= >=
    Sum,         // + -
    Product,     // * /
    Prefix,      // -x !x
    Call,        // f(x)
    Index,       // a[i]
}

type PrefixParseFn = fn(&mut Parser) -> ParseResult<Expression>;
type InfixParseFn = fn(&mut Parser, Expression) -> ParseResult<Expression>;

// Tokens that can begin an expression.
fn prefix_rule(kind: TokenKind) -> Option<PrefixParseFn> {
    let rule: PrefixParseFn = match kind {
        TokenKind::Ident => Parser::parse_identifier,
        TokenKind::Int => Parser::parse_integer_literal,
        TokenKind::String => Parser::parse_string_literal,
        TokenKind::True | TokenKind::False => Parser::parse_boolean,
        TokenKind::Bang | TokenKind::Minus => Parser::parse_prefix_expression,
        TokenKind::LParen => Parser::parse_grouped_expression,
        TokenKind::If => Parser::parse_if_expression,
        TokenKind::While => Parser::parse_while_expression,
        TokenKind::Function => Parser::parse_function_literal,
        TokenKind::LBracket => Parser::parse_array_literal,
        TokenKind::LBrace => Parser::parse_hash_literal,
        _ => return None,
    };
    Some(rule)
}

// Tokens that can continue an expression, with their binding precedence.
fn infix_rule(kind: TokenKind) -> Option<(InfixParseFn, Precedence)> {
    let rule: (InfixParseFn, Precedence) = match kind {
        TokenKind::Assign => (Parser::parse_assign_expression, Precedence::Assign),
        TokenKind::Eq | TokenKind::NotEq => (Parser::parse_infix_expression, Precedence::Equals),
        TokenKind::Lt | TokenKind::Gt | TokenKind::LtEq | TokenKind::GtEq => {
            (Parser::parse_infix_expression, Precedence::LessGreater)
        }
        TokenKind::Plus | TokenKind::Minus => (Parser::parse_infix_expression, Precedence::Sum),
        TokenKind::Asterisk | TokenKind::Slash => {
            (Parser::parse_infix_expression, Precedence::Product)
        }
        TokenKind::LParen => (Parser::parse_call_expression, Precedence::Call),
        TokenKind::LBracket => (Parser::parse_index_expression, Precedence::Index),
        _ => return None,
    };
    Some(rule)
}

fn infix_operator(kind: TokenKind) -> Option<InfixOperator> {
    let operator = match kind {
        TokenKind::Plus => InfixOperator::Plus,
        TokenKind::Minus => InfixOperator::Minus,
        TokenKind::Asterisk => InfixOperator::Multiply,
        TokenKind::Slash => InfixOperator::Divide,
        TokenKind::Lt => InfixOperator::Lt,
        TokenKind::Gt => InfixOperator::Gt,
        TokenKind::LtEq => InfixOperator::LtEq,
        TokenKind::GtEq => InfixOperator::GtEq,
        TokenKind::Eq => InfixOperator::Eq,
        TokenKind::NotEq => InfixOperator::NotEq,
        _ => return None,
    };
    Some(operator)
}

/// Pratt parser over a token buffer.
///
/// Syntax errors never abort the parse: each failing statement is recorded,
/// skipped up to the next statement boundary, and parsing carries on.
pub struct Parser {
    tokens: Vec<Token>,
    position: usize,
    errors: Vec<ParseError>,
    block_depth: usize,
}

impl Parser {
    pub fn new(mut lexer: Lexer<'_>) -> Self {
        let mut tokens: Vec<Token> = lexer.by_ref().collect();
        tokens.push(lexer.next_token());
        Parser::from_tokens(tokens)
    }

    /// Builds a parser over pre-lexed tokens, appending `Eof` when missing.
    pub fn from_tokens(mut tokens: Vec<Token>) -> Self {
        if tokens.last().is_none_or(|token| token.kind != TokenKind::Eof) {
            let end = tokens.last().map_or(0, |token| token.span.end);
            tokens.push(Token::new(TokenKind::Eof, "", Span::new(end, end)));
        }
        Parser {
            tokens,
            position: 0,
            errors: Vec::new(),
            block_depth: 0,
        }
    }

    /// Syntax errors collected so far, in source order.
    pub fn errors(&self) -> &[ParseError] {
        &self.errors
    }

    pub fn into_errors(self) -> Vec<ParseError> {
        self.errors
    }

    pub fn parse_program(&mut self) -> Program {
        let mut statements = Vec::new();
        while !self.cur_is(TokenKind::Eof) {
            match self.parse_statement() {
                Ok(statement) => statements.push(statement),
                Err(error) => self.record(error),
            }
            self.next_token();
        }
        Program { statements }
    }

    // --- Token cursor ---

    fn cur(&self) -> &Token {
        &self.tokens[self.position]
    }

    fn peek(&self) -> &Token {
        let last = self.tokens.len() - 1;
        &self.tokens[(self.position + 1).min(last)]
    }

    fn next_token(&mut self) {
        if self.position + 1 < self.tokens.len() {
            self.position += 1;
        }
    }

    fn cur_is(&self, kind: TokenKind) -> bool {
        self.cur().kind == kind
    }

    fn peek_is(&self, kind: TokenKind) -> bool {
        self.peek().kind == kind
    }

    // Advances only when the next token has the expected kind.
    fn expect_peek(&mut self, kind: TokenKind) -> ParseResult<()> {
        if self.peek_is(kind) {
            self.next_token();
            Ok(())
        } else {
            Err(self.peek_error(kind))
        }
    }

    fn peek_error(&self, expected: TokenKind) -> ParseError {
        ParseError::UnexpectedToken {
            expected,
            found: self.peek().kind,
            span: self.peek().span,
        }
    }

    fn peek_precedence(&self) -> Precedence {
        infix_rule(self.peek().kind).map_or(Precedence::Lowest, |(_, precedence)| precedence)
    }

    fn cur_precedence(&self) -> Precedence {
        infix_rule(self.cur().kind).map_or(Precedence::Lowest, |(_, precedence)| precedence)
    }

    // --- Error recovery ---

    fn record(&mut self, error: ParseError) {
        tracing::debug!(%error, span = %error.span(), "syntax error");
        self.errors.push(error);
        self.synchronize();
    }

    /// Skips the rest of a failed statement. Stops on a `;` at the statement's
    /// own brace depth, or on the last token before the `}` closing the
    /// enclosing block, so the caller's `next_token` lands on the boundary.
    fn synchronize(&mut self) {
        let mut depth = 0usize;
        loop {
            match self.cur().kind {
                TokenKind::Eof => return,
                TokenKind::Semicolon if depth == 0 => return,
                TokenKind::LBrace => depth += 1,
                TokenKind::RBrace if depth == 0 => {
                    // The failing token closes the enclosing block: hand it back
                    if self.block_depth > 0 {
                        self.position -= 1;
                    }
                    return;
                }
                TokenKind::RBrace => depth -= 1,
                _ => {}
            }
            if depth == 0 && self.block_depth > 0 && self.peek_is(TokenKind::RBrace) {
                return;
            }
            self.next_token();
        }
    }

    // --- Statements ---

    fn parse_statement(&mut self) -> ParseResult<Statement> {
        let statement = match self.cur().kind {
            TokenKind::Let => self.parse_let_statement()?,
            TokenKind::Return => self.parse_return_statement()?,
            _ => Statement::Expression(self.parse_expression(Precedence::Lowest)?),
        };
        self.expect_terminator()?;
        Ok(statement)
    }

    // `;` may only be left out after a `}` or before the end of a block or input.
    fn expect_terminator(&mut self) -> ParseResult<()> {
        if self.peek_is(TokenKind::Semicolon) {
            self.next_token();
            return Ok(());
        }
        if self.cur_is(TokenKind::RBrace)
            || self.peek_is(TokenKind::RBrace)
            || self.peek_is(TokenKind::Eof)
        {
            return Ok(());
        }
        Err(self.peek_error(TokenKind::Semicolon))
    }

    fn parse_let_statement(&mut self) -> ParseResult<Statement> {
        self.expect_peek(TokenKind::Ident)?;
        let name = Identifier(self.cur().literal.clone());
        self.expect_peek(TokenKind::Assign)?;
        self.next_token();
        let value = self.parse_expression(Precedence::Lowest)?;
        Ok(Statement::Let { name, value })
    }

    fn parse_return_statement(&mut self) -> ParseResult<Statement> {
        if self.peek_is(TokenKind::Semicolon)
            || self.peek_is(TokenKind::RBrace)
            || self.peek_is(TokenKind::Eof)
        {
            return Ok(Statement::Return(None));
        }
        self.next_token();
        let value = self.parse_expression(Precedence::Lowest)?;
        Ok(Statement::Return(Some(value)))
    }

    fn parse_block_statement(&mut self) -> ParseResult<BlockStatement> {
        self.block_depth += 1;
        let block = self.parse_block_body();
        self.block_depth -= 1;
        block
    }

    // Expects the current token to be `{`; leaves the cursor on the matching `}`.
    fn parse_block_body(&mut self) -> ParseResult<BlockStatement> {
        let mut statements = Vec::new();
        self.next_token();
        while !self.cur_is(TokenKind::RBrace) {
            if self.cur_is(TokenKind::Eof) {
                return Err(ParseError::UnexpectedToken {
                    expected: TokenKind::RBrace,
                    found: TokenKind::Eof,
                    span: self.cur().span,
                });
            }
            match self.parse_statement() {
                Ok(statement) => statements.push(statement),
                Err(error) => self.record(error),
            }
            self.next_token();
        }
        Ok(BlockStatement { statements })
    }

    // --- Expressions ---

    fn parse_expression(&mut self, precedence: Precedence) -> ParseResult<Expression> {
        ensure_sufficient_stack(|| self.parse_expression_inner(precedence))
    }

    fn parse_expression_inner(&mut self, precedence: Precedence) -> ParseResult<Expression> {
        let prefix = prefix_rule(self.cur().kind).ok_or_else(|| self.no_prefix_error())?;
        let mut left = prefix(self)?;

        while !self.peek_is(TokenKind::Semicolon) && precedence < self.peek_precedence() {
            let Some((infix, _)) = infix_rule(self.peek().kind) else {
                return Ok(left);
            };
            self.next_token();
            left = infix(self, left)?;
        }
        Ok(left)
    }

    fn no_prefix_error(&self) -> ParseError {
        let token = self.cur();
        match token.kind {
            TokenKind::Illegal => ParseError::IllegalToken {
                literal: token.literal.clone(),
                span: token.span,
            },
            kind => ParseError::NoPrefixRule {
                kind,
                span: token.span,
            },
        }
    }

    fn parse_identifier(&mut self) -> ParseResult<Expression> {
        Ok(Expression::Identifier(Identifier(
            self.cur().literal.clone(),
        )))
    }

    fn parse_integer_literal(&mut self) -> ParseResult<Expression> {
        let token = self.cur();
        token
            .literal
            .parse::<i64>()
            .map(Expression::Integer)
            .map_err(|_| ParseError::InvalidInteger {
                literal: token.literal.clone(),
                span: token.span,
            })
    }

    fn parse_string_literal(&mut self) -> ParseResult<Expression> {
        Ok(Expression::String(self.cur().literal.clone()))
    }

    fn parse_boolean(&mut self) -> ParseResult<Expression> {
        Ok(Expression::Boolean(self.cur_is(TokenKind::True)))
    }

    fn parse_prefix_expression(&mut self) -> ParseResult<Expression> {
        let operator = match self.cur().kind {
            TokenKind::Bang => PrefixOperator::Bang,
            _ => PrefixOperator::Minus,
        };
        self.next_token();
        let right = self.parse_expression(Precedence::Prefix)?;
        Ok(Expression::Prefix {
            operator,
            right: Box::new(right),
        })
    }

    fn parse_grouped_expression(&mut self) -> ParseResult<Expression> {
        self.next_token();
        let expression = self.parse_expression(Precedence::Lowest)?;
        self.expect_peek(TokenKind::RParen)?;
        Ok(expression)
    }

    // Parses `(condition)` and leaves the cursor on the closing paren.
    fn parse_condition(&mut self) -> ParseResult<Expression> {
        self.expect_peek(TokenKind::LParen)?;
        self.next_token();
        let condition = self.parse_expression(Precedence::Lowest)?;
        self.expect_peek(TokenKind::RParen)?;
        Ok(condition)
    }

    fn parse_if_expression(&mut self) -> ParseResult<Expression> {
        let condition = self.parse_condition()?;
        self.expect_peek(TokenKind::LBrace)?;
        let consequence = self.parse_block_statement()?;

        let alternative = if self.peek_is(TokenKind::Else) {
            self.next_token();
            self.expect_peek(TokenKind::LBrace)?;
            Some(self.parse_block_statement()?)
        } else {
            None
        };

        Ok(Expression::If {
            condition: Box::new(condition),
            consequence,
            alternative,
        })
    }

    fn parse_while_expression(&mut self) -> ParseResult<Expression> {
        let condition = self.parse_condition()?;
        self.expect_peek(TokenKind::LBrace)?;
        let body = self.parse_block_statement()?;
        Ok(Expression::While {
            condition: Box::new(condition),
            body,
        })
    }

    fn parse_function_literal(&mut self) -> ParseResult<Expression> {
        self.expect_peek(TokenKind::LParen)?;
        let parameters = self.parse_function_parameters()?;
        self.expect_peek(TokenKind::LBrace)?;
        let body = self.parse_block_statement()?;
        Ok(Expression::Function {
            parameters,
            body: Rc::new(body),
        })
    }

    fn parse_function_parameters(&mut self) -> ParseResult<Vec<Identifier>> {
        let mut parameters = Vec::new();
        if self.peek_is(TokenKind::RParen) {
            self.next_token();
            return Ok(parameters);
        }

        self.expect_peek(TokenKind::Ident)?;
        parameters.push(Identifier(self.cur().literal.clone()));
        while self.peek_is(TokenKind::Comma) {
            self.next_token();
            self.expect_peek(TokenKind::Ident)?;
            parameters.push(Identifier(self.cur().literal.clone()));
        }
        self.expect_peek(TokenKind::RParen)?;
        Ok(parameters)
    }

    fn parse_array_literal(&mut self) -> ParseResult<Expression> {
        let elements = self.parse_expression_list(TokenKind::RBracket)?;
        Ok(Expression::Array(elements))
    }

    fn parse_hash_literal(&mut self) -> ParseResult<Expression> {
        let mut pairs = Vec::new();
        while !self.peek_is(TokenKind::RBrace) {
            self.next_token();
            let key = self.parse_expression(Precedence::Lowest)?;
            self.expect_peek(TokenKind::Colon)?;
            self.next_token();
            let value = self.parse_expression(Precedence::Lowest)?;
            pairs.push((key, value));

            if !self.peek_is(TokenKind::RBrace) {
                self.expect_peek(TokenKind::Comma)?;
            }
        }
        self.expect_peek(TokenKind::RBrace)?;
        Ok(Expression::Hash(pairs))
    }

    // Comma-separated expressions up to `end`; the opening token is current.
    fn parse_expression_list(&mut self, end: TokenKind) -> ParseResult<Vec<Expression>> {
        let mut list = Vec::new();
        if self.peek_is(end) {
            self.next_token();
            return Ok(list);
        }

        self.next_token();
        list.push(self.parse_expression(Precedence::Lowest)?);
        while self.peek_is(TokenKind::Comma) {
            self.next_token();
            self.next_token();
            list.push(self.parse_expression(Precedence::Lowest)?);
        }
        self.expect_peek(end)?;
        Ok(list)
    }

    fn parse_infix_expression(&mut self, left: Expression) -> ParseResult<Expression> {
        let token = self.cur();
        let operator = infix_operator(token.kind).ok_or(ParseError::NoPrefixRule {
            kind: token.kind,
            span: token.span,
        })?;
        let precedence = self.cur_precedence();
        self.next_token();
        let right = self.parse_expression(precedence)?;
        Ok(Expression::Infix {
            left: Box::new(left),
            operator,
            right: Box::new(right),
        })
    }

    // Right-associative: `a = b = c` assigns `c` to both.
    fn parse_assign_expression(&mut self, target: Expression) -> ParseResult<Expression> {
        let name = match target {
            Expression::Identifier(name) => name,
            other => {
                return Err(ParseError::InvalidAssignmentTarget {
                    target: other.to_string(),
                    span: self.cur().span,
                });
            }
        };
        self.next_token();
        let value = self.parse_expression(Precedence::Lowest)?;
        Ok(Expression::Assign {
            name,
            value: Box::new(value),
        })
    }

    fn parse_call_expression(&mut self, function: Expression) -> ParseResult<Expression> {
        let arguments = self.parse_expression_list(TokenKind::RParen)?;
        Ok(Expression::Call {
            function: Box::new(function),
            arguments,
        })
    }

    fn parse_index_expression(&mut self, left: Expression) -> ParseResult<Expression> {
        self.next_token();
        let index = self.parse_expression(Precedence::Lowest)?;
        self.expect_peek(TokenKind::RBracket)?;
        Ok(Expression::Index {
            left: Box::new(left),
            index: Box::new(index),
        })
    }
}

/// Lexes and parses `source`, returning the (possibly partial) program and
/// every syntax error found.
pub fn parse(source: &str) -> (Program, Vec<ParseError>) {
    let mut parser = Parser::new(Lexer::new(source));
    let program = parser.parse_program();
    (program, parser.into_errors())
}
