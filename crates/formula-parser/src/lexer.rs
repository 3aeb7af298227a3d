//! Tokenizer
//!
//! Multi-character operators are matched longest first, so `^^` is never
//! read as two powers and `<=` never as `<` followed by `=`.

use crate::error::{ParseError, Result};
use crate::source_map::Span;
use bigdecimal::BigDecimal;
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, PartialEq)]
pub enum TokenKind {
    Number(BigDecimal),
    Str(String),
    Ident(String),
    Plus,
    Minus,
    Star,
    Slash,
    Percent,
    Caret,
    CaretCaret,
    Amp,
    TildeAmp,
    Pipe,
    TildePipe,
    TildeCaret,
    Eq,
    TildeEq,
    Lt,
    Gt,
    Le,
    Ge,
    Tilde,
    Bang,
    Dot,
    Comma,
    Semicolon,
    Prime,
    LParen,
    RParen,
    Eof,
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let symbol = match self {
            TokenKind::Number(n) => return write!(f, "number {}", n),
            TokenKind::Str(s) => return write!(f, "string \"{}\"", s),
            TokenKind::Ident(name) => return write!(f, "identifier `{}`", name),
            TokenKind::Eof => return f.write_str("end of input"),
            TokenKind::Plus => "+",
            TokenKind::Minus => "-",
            TokenKind::Star => "*",
            TokenKind::Slash => "/",
            TokenKind::Percent => "%",
            TokenKind::Caret => "^",
            TokenKind::CaretCaret => "^^",
            TokenKind::Amp => "&",
            TokenKind::TildeAmp => "~&",
            TokenKind::Pipe => "|",
            TokenKind::TildePipe => "~|",
            TokenKind::TildeCaret => "~^",
            TokenKind::Eq => "=",
            TokenKind::TildeEq => "~=",
            TokenKind::Lt => "<",
            TokenKind::Gt => ">",
            TokenKind::Le => "<=",
            TokenKind::Ge => ">=",
            TokenKind::Tilde => "~",
            TokenKind::Bang => "!",
            TokenKind::Dot => ".",
            TokenKind::Comma => ",",
            TokenKind::Semicolon => ";",
            TokenKind::Prime => "'",
            TokenKind::LParen => "(",
            TokenKind::RParen => ")",
        };
        write!(f, "'{}'", symbol)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    pub span: Span,
}

/// Symbols ordered so that longer spellings are tried first
const SYMBOLS: &[&str] = &[
    "^^",
    "~&",
    "~|",
    "~^",
    "~=",
    "<=",
    ">=",
    "+",
    "-",
    "*",
    "/",
    "%",
    "^",
    "&",
    "|",
    "=",
    "<",
    ">",
    "~",
    "!",
    ".",
    ",",
    ";",
    "'",
    "(",
    ")",
];

fn symbol(spelling: &str) -> Option<TokenKind> {
    Some(match spelling {
        "^^" => TokenKind::CaretCaret,
        "~&" => TokenKind::TildeAmp,
        "~|" => TokenKind::TildePipe,
        "~^" => TokenKind::TildeCaret,
        "~=" => TokenKind::TildeEq,
        "<=" => TokenKind::Le,
        ">=" => TokenKind::Ge,
        "+" => TokenKind::Plus,
        "-" => TokenKind::Minus,
        "*" => TokenKind::Star,
        "/" => TokenKind::Slash,
        "%" => TokenKind::Percent,
        "^" => TokenKind::Caret,
        "&" => TokenKind::Amp,
        "|" => TokenKind::Pipe,
        "=" => TokenKind::Eq,
        "<" => TokenKind::Lt,
        ">" => TokenKind::Gt,
        "~" => TokenKind::Tilde,
        "!" => TokenKind::Bang,
        "." => TokenKind::Dot,
        "," => TokenKind::Comma,
        ";" => TokenKind::Semicolon,
        "'" => TokenKind::Prime,
        "(" => TokenKind::LParen,
        ")" => TokenKind::RParen,
        _ => return None,
    })
}

/// Split source text into tokens, ending with `Eof`
pub fn tokenize(input: &str) -> Result<Vec<Token>> {
    Lexer::new(input).run()
}

struct Lexer<'a> {
    input: &'a str,
    pos: usize,
    tokens: Vec<Token>,
}

impl<'a> Lexer<'a> {
    fn new(input: &'a str) -> Self {
        Self {
            input,
            pos: 0,
            tokens: Vec::new(),
        }
    }

    fn rest(&self) -> &'a str {
        &self.input[self.pos..]
    }

    fn peek(&self) -> Option<char> {
        self.rest().chars().next()
    }

    fn push(&mut self, kind: TokenKind, start: usize) {
        self.tokens.push(Token {
            kind,
            span: Span::new(start, self.pos),
        });
    }

    fn run(mut self) -> Result<Vec<Token>> {
        while let Some(c) = self.peek() {
            let start = self.pos;
            if c.is_whitespace() {
                self.pos += c.len_utf8();
            } else if c.is_ascii_digit() || (c == '.' && self.digit_at(1)) {
                let kind = self.number()?;
                self.push(kind, start);
            } else if c.is_alphabetic() || c == '_' {
                let ident = self.identifier();
                self.push(TokenKind::Ident(ident), start);
            } else if c == '"' {
                let text = self.string()?;
                self.push(TokenKind::Str(text), start);
            } else {
                let spelling = SYMBOLS
                    .iter()
                    .find(|spelling| self.rest().starts_with(**spelling))
                    .ok_or(ParseError::UnexpectedCharacter {
                        character: c,
                        position: start,
                    })?;
                let kind = symbol(spelling).ok_or(ParseError::UnexpectedCharacter {
                    character: c,
                    position: start,
                })?;
                self.pos += spelling.len();
                self.push(kind, start);
            }
        }

        let end = self.pos;
        self.push(TokenKind::Eof, end);
        Ok(self.tokens)
    }

    fn digit_at(&self, offset: usize) -> bool {
        self.rest()
            .as_bytes()
            .get(offset)
            .map_or(false, |b| b.is_ascii_digit())
    }

    fn skip_digits(&mut self) {
        while self.digit_at(0) {
            self.pos += 1;
        }
    }

    fn number(&mut self) -> Result<TokenKind> {
        let start = self.pos;
        self.skip_digits();
        if self.rest().starts_with('.') && self.digit_at(1) {
            self.pos += 1;
            self.skip_digits();
        }

        // Exponent only when digits follow, so `2e` stays `2` then `e`
        let bytes = self.rest().as_bytes();
        if matches!(bytes.first(), Some(b'e') | Some(b'E')) {
            let sign = matches!(bytes.get(1), Some(b'+') | Some(b'-')) as usize;
            if self.digit_at(1 + sign) {
                self.pos += 1 + sign;
                self.skip_digits();
            }
        }

        let text = &self.input[start..self.pos];
        BigDecimal::from_str(text)
            .map(TokenKind::Number)
            .map_err(|_| ParseError::InvalidNumber {
                text: text.to_string(),
                position: start,
            })
    }

    fn identifier(&mut self) -> String {
        let start = self.pos;
        while let Some(c) = self.peek() {
            if c.is_alphanumeric() || c == '_' {
                self.pos += c.len_utf8();
            } else {
                break;
            }
        }
        self.input[start..self.pos].to_string()
    }

    fn string(&mut self) -> Result<String> {
        let start = self.pos;
        self.pos += 1;
        let mut text = String::new();
        let mut escaped = false;
        while let Some(c) = self.peek() {
            self.pos += c.len_utf8();
            match (escaped, c) {
                (true, 'n') => {
                    text.push('\n');
                    escaped = false;
                }
                (true, 't') => {
                    text.push('\t');
                    escaped = false;
                }
                (true, other) => {
                    text.push(other);
                    escaped = false;
                }
                (false, '\\') => escaped = true,
                (false, '"') => return Ok(text),
                (false, other) => text.push(other),
            }
        }
        Err(ParseError::UnterminatedString { position: start })
    }
}
