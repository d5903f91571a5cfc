//! The main parser implementation.

use crate::ast::*;
use crate::error::SyntaxError;
use crate::lexer::{Scanner, Span, Token, TokenKind};

/// A recursive descent parser for Quill.
///
/// Each binary precedence level has its own function, from loosest to
/// tightest: equality, comparison, additive, multiplicative, unary, postfix.
pub struct Parser<'a> {
    scanner: Scanner<'a>,
    current: Token,
}

impl<'a> Parser<'a> {
    /// Creates a new parser for the given source code.
    pub fn new(source: &'a str) -> Self {
        let mut scanner = Scanner::new(source);
        let current = scanner.next_token();
        Self { scanner, current }
    }

    /// Parses the source code into a Program AST node.
    pub fn parse_program(&mut self) -> Result<Program, SyntaxError> {
        let mut body = Vec::new();

        while !self.is_at_end() {
            body.push(self.parse_statement()?);
        }

        Ok(Program { body })
    }

    /// Parses a single statement, consuming an optional trailing semicolon.
    pub fn parse_statement(&mut self) -> Result<Statement, SyntaxError> {
        let stmt = match &self.current.kind {
            TokenKind::Let => self.parse_let_statement()?,
            TokenKind::Return => self.parse_return_statement()?,
            TokenKind::Identifier(_) if self.peek_kind() == TokenKind::Assign => {
                self.parse_assign_statement()?
            }
            _ => Statement::Expression(self.parse_expression()?),
        };

        if self.check(&TokenKind::Semicolon) {
            self.advance();
        }

        Ok(stmt)
    }

    fn parse_let_statement(&mut self) -> Result<Statement, SyntaxError> {
        self.advance(); // consume 'let'
        let name = self.expect_identifier()?;
        self.expect(&TokenKind::Assign)?;

        let mut value = self.parse_expression()?;
        if let Expression::Function(func) = &mut value {
            func.name = Some(name.name.clone());
        }

        Ok(Statement::Let(LetStatement { name, value }))
    }

    fn parse_assign_statement(&mut self) -> Result<Statement, SyntaxError> {
        let name = self.expect_identifier()?;
        self.expect(&TokenKind::Assign)?;
        let value = self.parse_expression()?;
        Ok(Statement::Assign(AssignStatement { name, value }))
    }

    fn parse_return_statement(&mut self) -> Result<Statement, SyntaxError> {
        self.advance(); // consume 'return'

        if self.check(&TokenKind::Semicolon)
            || self.check(&TokenKind::RightBrace)
            || self.is_at_end()
        {
            return Ok(Statement::Return(None));
        }

        Ok(Statement::Return(Some(self.parse_expression()?)))
    }

    fn parse_block(&mut self) -> Result<BlockStatement, SyntaxError> {
        self.expect(&TokenKind::LeftBrace)?;

        let mut body = Vec::new();
        while !self.check(&TokenKind::RightBrace) {
            if self.is_at_end() {
                return Err(self.unexpected("}"));
            }
            body.push(self.parse_statement()?);
        }
        self.advance(); // consume '}'

        Ok(BlockStatement { body })
    }

    // ========================================================================
    // Expressions
    // ========================================================================

    /// Parses an expression.
    pub fn parse_expression(&mut self) -> Result<Expression, SyntaxError> {
        self.parse_equality()
    }

    fn parse_equality(&mut self) -> Result<Expression, SyntaxError> {
        let mut left = self.parse_comparison()?;

        loop {
            let operator = match &self.current.kind {
                TokenKind::EqualEqual => BinaryOperator::Equal,
                TokenKind::NotEqual => BinaryOperator::NotEqual,
                _ => break,
            };
            self.advance();
            let right = self.parse_comparison()?;
            left = binary(operator, left, right);
        }

        Ok(left)
    }

    fn parse_comparison(&mut self) -> Result<Expression, SyntaxError> {
        let mut left = self.parse_additive()?;

        loop {
            let operator = match &self.current.kind {
                TokenKind::LessThan => BinaryOperator::LessThan,
                TokenKind::GreaterThan => BinaryOperator::GreaterThan,
                _ => break,
            };
            self.advance();
            let right = self.parse_additive()?;
            left = binary(operator, left, right);
        }

        Ok(left)
    }

    fn parse_additive(&mut self) -> Result<Expression, SyntaxError> {
        let mut left = self.parse_multiplicative()?;

        loop {
            let operator = match &self.current.kind {
                TokenKind::Plus => BinaryOperator::Add,
                TokenKind::Minus => BinaryOperator::Subtract,
                _ => break,
            };
            self.advance();
            let right = self.parse_multiplicative()?;
            left = binary(operator, left, right);
        }

        Ok(left)
    }

    fn parse_multiplicative(&mut self) -> Result<Expression, SyntaxError> {
        let mut left = self.parse_unary()?;

        loop {
            let operator = match &self.current.kind {
                TokenKind::Star => BinaryOperator::Multiply,
                TokenKind::Slash => BinaryOperator::Divide,
                _ => break,
            };
            self.advance();
            let right = self.parse_unary()?;
            left = binary(operator, left, right);
        }

        Ok(left)
    }

    fn parse_unary(&mut self) -> Result<Expression, SyntaxError> {
        let operator = match &self.current.kind {
            TokenKind::Minus => UnaryOperator::Minus,
            TokenKind::Plus => UnaryOperator::Plus,
            TokenKind::Bang => UnaryOperator::Not,
            _ => return self.parse_postfix(),
        };
        self.advance();
        let argument = self.parse_unary()?;

        Ok(Expression::Unary(UnaryExpression {
            operator,
            argument: Box::new(argument),
        }))
    }

    fn parse_postfix(&mut self) -> Result<Expression, SyntaxError> {
        let mut expr = self.parse_primary()?;

        loop {
            match &self.current.kind {
                TokenKind::LeftParen => {
                    self.advance();
                    let arguments = self.parse_expression_list(&TokenKind::RightParen)?;
                    expr = Expression::Call(CallExpression {
                        callee: Box::new(expr),
                        arguments,
                    });
                }
                TokenKind::LeftBracket => {
                    self.advance();
                    let index = self.parse_expression()?;
                    self.expect(&TokenKind::RightBracket)?;
                    expr = Expression::Index(IndexExpression {
                        object: Box::new(expr),
                        index: Box::new(index),
                    });
                }
                _ => break,
            }
        }

        Ok(expr)
    }

    fn parse_primary(&mut self) -> Result<Expression, SyntaxError> {
        let expr = match &self.current.kind {
            TokenKind::Integer(text) => {
                let value = text.parse::<i64>().map_err(|_| SyntaxError::InvalidInteger {
                    literal: text.clone(),
                    offset: self.current.span.start,
                })?;
                Expression::Integer(value)
            }
            TokenKind::String(s) => Expression::String(s.clone()),
            TokenKind::True => Expression::Boolean(true),
            TokenKind::False => Expression::Boolean(false),
            TokenKind::Identifier(name) => Expression::Identifier(Identifier::new(name.clone())),
            TokenKind::LeftParen => {
                self.advance();
                let expr = self.parse_expression()?;
                self.expect(&TokenKind::RightParen)?;
                return Ok(expr);
            }
            TokenKind::LeftBracket => {
                self.advance();
                let elements = self.parse_expression_list(&TokenKind::RightBracket)?;
                return Ok(Expression::Array(elements));
            }
            TokenKind::LeftBrace => return self.parse_hash_literal(),
            TokenKind::If => return self.parse_if_expression(),
            TokenKind::Function => return self.parse_function_literal(),
            _ => return Err(self.unexpected("expression")),
        };

        self.advance();
        Ok(expr)
    }

    fn parse_if_expression(&mut self) -> Result<Expression, SyntaxError> {
        self.advance(); // consume 'if'
        let condition = self.parse_expression()?;
        let consequent = self.parse_block()?;

        let alternate = if self.check(&TokenKind::Else) {
            self.advance();
            Some(self.parse_block()?)
        } else {
            None
        };

        Ok(Expression::If(IfExpression {
            condition: Box::new(condition),
            consequent,
            alternate,
        }))
    }

    fn parse_function_literal(&mut self) -> Result<Expression, SyntaxError> {
        self.advance(); // consume 'fn'
        self.expect(&TokenKind::LeftParen)?;

        let mut params = Vec::new();
        if !self.check(&TokenKind::RightParen) {
            loop {
                params.push(self.expect_identifier()?);
                if !self.check(&TokenKind::Comma) {
                    break;
                }
                self.advance();
            }
        }
        self.expect(&TokenKind::RightParen)?;

        let body = self.parse_block()?;

        Ok(Expression::Function(FunctionLiteral {
            name: None,
            params,
            body,
        }))
    }

    fn parse_hash_literal(&mut self) -> Result<Expression, SyntaxError> {
        self.advance(); // consume '{'

        let mut pairs = Vec::new();
        while !self.check(&TokenKind::RightBrace) {
            let key = self.parse_expression()?;
            self.expect(&TokenKind::Colon)?;
            let value = self.parse_expression()?;
            pairs.push((key, value));

            if !self.check(&TokenKind::Comma) {
                break;
            }
            self.advance();
        }
        self.expect(&TokenKind::RightBrace)?;

        Ok(Expression::Hash(pairs))
    }

    /// Parses comma-separated expressions up to and including `end`.
    fn parse_expression_list(&mut self, end: &TokenKind) -> Result<Vec<Expression>, SyntaxError> {
        let mut items = Vec::new();

        if self.check(end) {
            self.advance();
            return Ok(items);
        }

        loop {
            items.push(self.parse_expression()?);
            if !self.check(&TokenKind::Comma) {
                break;
            }
            self.advance();
        }
        self.expect(end)?;

        Ok(items)
    }

    // ========================================================================
    // Helper Methods
    // ========================================================================

    fn advance(&mut self) {
        self.current = self.scanner.next_token();
    }

    fn peek_kind(&self) -> TokenKind {
        self.scanner.clone().next_token().kind
    }

    fn check(&self, kind: &TokenKind) -> bool {
        std::mem::discriminant(&self.current.kind) == std::mem::discriminant(kind)
    }

    fn expect(&mut self, kind: &TokenKind) -> Result<(), SyntaxError> {
        if self.check(kind) {
            self.advance();
            Ok(())
        } else {
            Err(self.unexpected(&kind.to_string()))
        }
    }

    fn expect_identifier(&mut self) -> Result<Identifier, SyntaxError> {
        if let TokenKind::Identifier(name) = &self.current.kind {
            let id = Identifier::new(name.clone());
            self.advance();
            Ok(id)
        } else {
            Err(self.unexpected("identifier"))
        }
    }

    /// Builds the error for the current token, surfacing lexical errors first.
    fn unexpected(&self, expected: &str) -> SyntaxError {
        let Span { start: offset, .. } = self.current.span;
        match &self.current.kind {
            TokenKind::UnterminatedString => SyntaxError::UnterminatedString { offset },
            TokenKind::Invalid(ch) => SyntaxError::IllegalCharacter { ch: *ch, offset },
            found => SyntaxError::UnexpectedToken {
                expected: expected.to_string(),
                found: found.to_string(),
                offset,
            },
        }
    }

    fn is_at_end(&self) -> bool {
        matches!(self.current.kind, TokenKind::Eof)
    }
}

fn binary(operator: BinaryOperator, left: Expression, right: Expression) -> Expression {
    Expression::Binary(BinaryExpression {
        operator,
        left: Box::new(left),
        right: Box::new(right),
    })
}
