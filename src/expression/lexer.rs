//! Expression Lexer
//!
//! Splits an expression into tokens. Dotted references are read greedily,
//! empty segments included, so a malformed reference stays a single token
//! and gets a single diagnostic from the parser.

use std::fmt;
use std::iter::Peekable;
use std::str::CharIndices;

use super::ExpressionError;

/// Characters that start an operator
const OPERATOR_CHARS: &str = "+-*/%^<>=!&|";

/// Operators made of two characters
const TWO_CHAR_OPERATORS: [&str; 7] = ["==", "!=", "<=", ">=", "&&", "||", "**"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    Number,
    Ident,
    /// `data.<ident>...`
    DataRef,
    /// `c.<ident>...`
    ConstRef,
    /// `node.<name>.<output>`
    NodeRef,
    /// `this.<output>`
    ThisRef,
    /// `sim.<variable>`
    SimRef,
    Operator,
    LParen,
    RParen,
    Comma,
    Eof,
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            TokenKind::Number => "NUMBER",
            TokenKind::Ident => "IDENT",
            TokenKind::DataRef => "DATA_REF",
            TokenKind::ConstRef => "CONST_REF",
            TokenKind::NodeRef => "NODE_REF",
            TokenKind::ThisRef => "THIS_REF",
            TokenKind::SimRef => "SIM_REF",
            TokenKind::Operator => "OPERATOR",
            TokenKind::LParen => "LPAREN",
            TokenKind::RParen => "RPAREN",
            TokenKind::Comma => "COMMA",
            TokenKind::Eof => "EOF",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Token<'a> {
    pub kind: TokenKind,
    pub text: &'a str,
    /// Offset of the first character
    pub position: usize,
}

/// Tokenize a whole expression
///
/// The returned list always ends with an [`TokenKind::Eof`] token.
pub fn tokenize(input: &str) -> Result<Vec<Token<'_>>, ExpressionError> {
    let mut tokens = Vec::new();
    let mut chars = input.char_indices().peekable();

    while let Some(&(start, ch)) = chars.peek() {
        let kind = match ch {
            c if c.is_whitespace() => {
                chars.next();
                continue;
            }
            '(' => {
                chars.next();
                TokenKind::LParen
            }
            ')' => {
                chars.next();
                TokenKind::RParen
            }
            ',' => {
                chars.next();
                TokenKind::Comma
            }
            c if c.is_ascii_digit() || (c == '.' && next_is_digit(input, start + 1)) => {
                read_number(input, &mut chars)?;
                TokenKind::Number
            }
            c if c.is_ascii_alphabetic() || c == '_' => read_word(input, &mut chars)?,
            c if OPERATOR_CHARS.contains(c) => {
                chars.next();
                let two = input.get(start..start + 2);
                if two.is_some_and(|op| TWO_CHAR_OPERATORS.contains(&op)) {
                    chars.next();
                }
                TokenKind::Operator
            }
            c => {
                return Err(ExpressionError::UnexpectedCharacter {
                    position: start,
                    ch: c,
                });
            }
        };

        let end = chars.peek().map(|&(idx, _)| idx).unwrap_or(input.len());
        tokens.push(Token {
            kind,
            text: &input[start..end],
            position: start,
        });
    }

    tokens.push(Token {
        kind: TokenKind::Eof,
        text: "",
        position: input.len(),
    });

    Ok(tokens)
}

fn next_is_digit(input: &str, idx: usize) -> bool {
    input
        .as_bytes()
        .get(idx)
        .is_some_and(|b| b.is_ascii_digit())
}

fn consume_while(chars: &mut Peekable<CharIndices<'_>>, pred: impl Fn(char) -> bool) {
    while chars.next_if(|&(_, c)| pred(c)).is_some() {}
}

/// Digits, optional fraction, optional exponent
fn read_number(input: &str, chars: &mut Peekable<CharIndices<'_>>) -> Result<(), ExpressionError> {
    let start = chars.peek().map(|&(idx, _)| idx).unwrap_or(input.len());

    consume_while(chars, |c| c.is_ascii_digit());
    if chars.next_if(|&(_, c)| c == '.').is_some() {
        consume_while(chars, |c| c.is_ascii_digit());
    }
    if chars.next_if(|&(_, c)| c == 'e' || c == 'E').is_some() {
        chars.next_if(|&(_, c)| c == '+' || c == '-');
        consume_while(chars, |c| c.is_ascii_digit());
    }

    let end = chars.peek().map(|&(idx, _)| idx).unwrap_or(input.len());
    let text = &input[start..end];
    text.parse::<f64>()
        .map(|_| ())
        .map_err(|_| ExpressionError::InvalidNumber(text.to_string()))
}

/// Identifier, or a dotted reference when the word is a reference prefix
fn read_word(
    input: &str,
    chars: &mut Peekable<CharIndices<'_>>,
) -> Result<TokenKind, ExpressionError> {
    let start = chars.peek().map(|&(idx, _)| idx).unwrap_or(input.len());
    consume_while(chars, is_ident_char);
    let end = chars.peek().map(|&(idx, _)| idx).unwrap_or(input.len());

    let kind = match &input[start..end] {
        "data" => TokenKind::DataRef,
        "c" => TokenKind::ConstRef,
        "node" => TokenKind::NodeRef,
        "this" => TokenKind::ThisRef,
        "sim" => TokenKind::SimRef,
        _ => return Ok(TokenKind::Ident),
    };

    if !matches!(chars.peek(), Some(&(_, '.'))) {
        return Ok(TokenKind::Ident);
    }

    while chars.next_if(|&(_, c)| c == '.').is_some() {
        consume_while(chars, is_ident_char);
    }

    let bracketed = matches!(
        kind,
        TokenKind::DataRef | TokenKind::NodeRef | TokenKind::ThisRef
    );
    if bracketed && let Some(&(open, '[')) = chars.peek() {
        chars.next();
        consume_while(chars, |c| c != ']');
        if chars.next_if(|&(_, c)| c == ']').is_none() {
            return Err(ExpressionError::UnclosedBracket { position: open });
        }
    }

    Ok(kind)
}

fn is_ident_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}
