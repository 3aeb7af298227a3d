//! Expression parser
//!
//! Parses formula source text into Expression AST nodes.
//!
//! Supported syntax, loosest binding first:
//! - Local definitions: `f'(x, y) = body; continuation`
//! - Or family: `|`, `~|`, `^^`, `~^`
//! - And family: `&`, `~&`
//! - Comparisons (non-chaining): `=`, `~=`, `<`, `>`, `<=`, `>=`
//! - Additive: `+`, `-`
//! - Multiplicative: `*`, `/`, `%`
//! - Prefix: `-`, `~`
//! - Power (right-associative): `^`
//! - Postfix: `!`, `.member`
//! - Primary: `42`, `0.5`, `1e-3`, `"string"`, `x`, `sqrt(x)`, `f'(x)`, `(a + b)`

use crate::error::{ParseError, Result};
use crate::lexer::{tokenize, Token, TokenKind};
use crate::source_map::{SourceMap, Span};
use formula_core::ast::{Expression, Operator, UnaryOperator};

/// Expression parser
pub struct ExpressionParser;

impl ExpressionParser {
    /// Parse an expression from a string
    pub fn parse(input: &str) -> Result<Expression> {
        Self::parse_with_source_map(input).map(|(expression, _)| expression)
    }

    /// Parse an expression and record the span of every subtree
    pub fn parse_with_source_map(input: &str) -> Result<(Expression, SourceMap)> {
        let tokens = tokenize(input)?;
        if tokens.len() == 1 {
            return Err(ParseError::EmptyExpression);
        }

        let mut parser = Parser {
            tokens,
            pos: 0,
            source_map: SourceMap::new(),
        };
        let expression = parser.statement()?;
        parser.expect(TokenKind::Eof, "end of input")?;

        tracing::debug!(
            "Parsed expression with {} nodes ({} distinct spans)",
            expression.node_count(),
            parser.source_map.len()
        );
        Ok((expression, parser.source_map))
    }
}

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
    source_map: SourceMap,
}

impl Parser {
    fn peek(&self) -> &Token {
        // tokenize always ends with Eof, and Eof is never consumed
        &self.tokens[self.pos.min(self.tokens.len() - 1)]
    }

    fn peek_at(&self, offset: usize) -> &TokenKind {
        let index = (self.pos + offset).min(self.tokens.len() - 1);
        &self.tokens[index].kind
    }

    fn advance(&mut self) -> Token {
        let token = self.peek().clone();
        if token.kind != TokenKind::Eof {
            self.pos += 1;
        }
        token
    }

    fn check(&self, kind: &TokenKind) -> bool {
        &self.peek().kind == kind
    }

    fn eat(&mut self, kind: &TokenKind) -> bool {
        if self.check(kind) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn expect(&mut self, kind: TokenKind, expected: &str) -> Result<Token> {
        if self.check(&kind) {
            Ok(self.advance())
        } else {
            Err(self.unexpected(expected))
        }
    }

    fn unexpected(&self, expected: &str) -> ParseError {
        let token = self.peek();
        ParseError::UnexpectedToken {
            expected: expected.to_string(),
            found: token.kind.to_string(),
            position: token.span.start,
        }
    }

    /// End offset of the last consumed token
    fn last_end(&self) -> usize {
        self.pos
            .checked_sub(1)
            .map_or(0, |index| self.tokens[index].span.end)
    }

    fn finish(&mut self, expression: Expression, start: usize) -> Expression {
        let span = Span::new(start, self.last_end());
        self.source_map.record(&expression, span);
        expression
    }

    /// Definition or plain expression
    fn statement(&mut self) -> Result<Expression> {
        let start = self.peek().span.start;
        if let Some(definition) = self.try_definition(start)? {
            return Ok(definition);
        }
        self.or_expression()
    }

    /// `name'(params) = body; continuation`, or `None` (with the position
    /// restored) when the tokens turn out to be an ordinary expression such
    /// as the comparison `f'(1) = 2`
    fn try_definition(&mut self, start: usize) -> Result<Option<Expression>> {
        let name = match (self.peek_at(0), self.peek_at(1), self.peek_at(2)) {
            (TokenKind::Ident(name), TokenKind::Prime, TokenKind::LParen) => name.clone(),
            _ => return Ok(None),
        };

        let checkpoint = self.pos;
        self.pos += 3;
        let parameters = match self.arguments() {
            Ok(parameters) => parameters,
            Err(_) => {
                self.pos = checkpoint;
                return Ok(None);
            }
        };
        if !self.eat(&TokenKind::Eq) {
            self.pos = checkpoint;
            return Ok(None);
        }
        let body = match self.or_expression() {
            Ok(body) if self.check(&TokenKind::Semicolon) => body,
            _ => {
                self.pos = checkpoint;
                return Ok(None);
            }
        };
        self.advance();

        let value = self.statement()?;
        let definition = Expression::custom_definition(name, parameters, body, value)
            .map_err(|source| ParseError::InvalidDefinition {
                position: start,
                source,
            })?;
        Ok(Some(self.finish(definition, start)))
    }

    /// Comma-separated arguments after an opening parenthesis, through the
    /// closing one
    fn arguments(&mut self) -> Result<Vec<Expression>> {
        let mut args = Vec::new();
        if self.eat(&TokenKind::RParen) {
            return Ok(args);
        }
        loop {
            args.push(self.statement()?);
            if self.eat(&TokenKind::Comma) {
                continue;
            }
            self.expect(TokenKind::RParen, "',' or ')'")?;
            return Ok(args);
        }
    }

    fn binary_level(
        &mut self,
        operand: fn(&mut Self) -> Result<Expression>,
        operator: fn(&TokenKind) -> Option<Operator>,
    ) -> Result<Expression> {
        let start = self.peek().span.start;
        let mut left = operand(self)?;
        while let Some(op) = operator(&self.peek().kind) {
            self.advance();
            let right = operand(self)?;
            left = self.finish(Expression::binary(left, op, right), start);
        }
        Ok(left)
    }

    fn or_expression(&mut self) -> Result<Expression> {
        self.binary_level(Self::and_expression, |kind| match kind {
            TokenKind::Pipe => Some(Operator::Or),
            TokenKind::TildePipe => Some(Operator::NOr),
            TokenKind::CaretCaret => Some(Operator::Xor),
            TokenKind::TildeCaret => Some(Operator::XNor),
            _ => None,
        })
    }

    fn and_expression(&mut self) -> Result<Expression> {
        self.binary_level(Self::comparison, |kind| match kind {
            TokenKind::Amp => Some(Operator::And),
            TokenKind::TildeAmp => Some(Operator::NAnd),
            _ => None,
        })
    }

    fn comparison(&mut self) -> Result<Expression> {
        let start = self.peek().span.start;
        let left = self.additive()?;
        let Some(op) = comparison_operator(&self.peek().kind) else {
            return Ok(left);
        };
        self.advance();
        let right = self.additive()?;

        if comparison_operator(&self.peek().kind).is_some() {
            return Err(ParseError::ChainedComparison {
                position: self.peek().span.start,
            });
        }
        Ok(self.finish(Expression::binary(left, op, right), start))
    }

    fn additive(&mut self) -> Result<Expression> {
        self.binary_level(Self::multiplicative, |kind| match kind {
            TokenKind::Plus => Some(Operator::Add),
            TokenKind::Minus => Some(Operator::Sub),
            _ => None,
        })
    }

    fn multiplicative(&mut self) -> Result<Expression> {
        self.binary_level(Self::prefix, |kind| match kind {
            TokenKind::Star => Some(Operator::Mul),
            TokenKind::Slash => Some(Operator::Div),
            TokenKind::Percent => Some(Operator::Mod),
            _ => None,
        })
    }

    fn prefix(&mut self) -> Result<Expression> {
        let start = self.peek().span.start;
        let op = match self.peek().kind {
            TokenKind::Minus => UnaryOperator::Negate,
            TokenKind::Tilde => UnaryOperator::Not,
            _ => return self.power(),
        };
        self.advance();
        let operand = self.prefix()?;
        Ok(self.finish(Expression::unary(op, operand), start))
    }

    fn power(&mut self) -> Result<Expression> {
        let start = self.peek().span.start;
        let base = self.postfix()?;
        if !self.eat(&TokenKind::Caret) {
            return Ok(base);
        }
        // right-associative; the exponent may carry its own sign
        let exponent = self.prefix()?;
        Ok(self.finish(Expression::binary(base, Operator::Power, exponent), start))
    }

    fn postfix(&mut self) -> Result<Expression> {
        let start = self.peek().span.start;
        let mut expression = self.primary()?;
        loop {
            if self.eat(&TokenKind::Bang) {
                expression = Expression::unary(UnaryOperator::Factorial, expression);
            } else if self.eat(&TokenKind::Dot) {
                let TokenKind::Ident(name) = self.peek().kind.clone() else {
                    return Err(self.unexpected("member name"));
                };
                self.advance();
                expression = Expression::member(expression, name);
            } else {
                return Ok(expression);
            }
            expression = self.finish(expression, start);
        }
    }

    fn primary(&mut self) -> Result<Expression> {
        let start = self.peek().span.start;
        let expression = match self.peek().kind.clone() {
            TokenKind::Number(value) => {
                self.advance();
                Expression::literal(value)
            }
            TokenKind::Str(text) => {
                self.advance();
                Expression::string(text)
            }
            TokenKind::Ident(name) => {
                self.advance();
                if self.eat(&TokenKind::LParen) {
                    Expression::call(name, self.arguments()?)
                } else if self.check(&TokenKind::Prime) {
                    self.advance();
                    self.expect(TokenKind::LParen, "'(' after prime")?;
                    Expression::prime_call(name, self.arguments()?)
                } else {
                    Expression::variable(name)
                }
            }
            TokenKind::LParen => {
                self.advance();
                let inner = self.statement()?;
                self.expect(TokenKind::RParen, "')'")?;
                inner
            }
            _ => return Err(self.unexpected("expression")),
        };
        Ok(self.finish(expression, start))
    }
}

fn comparison_operator(kind: &TokenKind) -> Option<Operator> {
    match kind {
        TokenKind::Eq => Some(Operator::Eq),
        TokenKind::TildeEq => Some(Operator::Neq),
        TokenKind::Lt => Some(Operator::Lt),
        TokenKind::Gt => Some(Operator::Gt),
        TokenKind::Le => Some(Operator::Le),
        TokenKind::Ge => Some(Operator::Ge),
        _ => None,
    }
}
