//! Tokenizer for production-rule files.
//!
//! Splits grammar source into `(kind, text)` pairs. Whitespace and `//` or
//! `/* */` comments are skipped. Token text keeps its source spelling, so a
//! string literal still carries its quotes; the literal constructors in
//! [`crate::builtin`] are responsible for unquoting.

use std::fmt;
use std::iter::Peekable;
use std::num::ParseIntError;
use std::str::Chars;
use std::sync::OnceLock;

use regex::Regex;

use crate::utils::{GrammarError, Result};

/// Category of a token, used by the parser and the literal registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TokenKind {
    Ident,
    String,
    Char,
    Int,
    Float,
    Punct,
    Eof,
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            TokenKind::Ident => "Ident",
            TokenKind::String => "String",
            TokenKind::Char => "Char",
            TokenKind::Int => "Int",
            TokenKind::Float => "Float",
            TokenKind::Punct => "Punct",
            TokenKind::Eof => "EOF",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    pub text: String,
    /// 1-based source line the token starts on
    pub line: usize,
}

impl Token {
    pub fn is_punct(&self, ch: char) -> bool {
        self.kind == TokenKind::Punct
            && self.text.len() == ch.len_utf8()
            && self.text.starts_with(ch)
    }

    pub fn is_eof(&self) -> bool {
        self.kind == TokenKind::Eof
    }
}

fn token_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    // Alternation order matters: floats before ints, comments before punctuation.
    RE.get_or_init(|| {
        Regex::new(
            r#"(?x)^(?:
                (?P<space>\s+)
              | (?P<line_comment>//[^\n]*)
              | (?P<block_comment>/\*(?s:.*?)\*/)
              | (?P<float>[0-9]+\.[0-9]+(?:[eE][+-]?[0-9]+)?|[0-9]+[eE][+-]?[0-9]+)
              | (?P<int>0[xX][0-9A-Fa-f]+|0[oO][0-7]+|0[bB][01]+|[0-9]+)
              | (?P<ident>[\p{L}_][\p{L}\p{N}_]*)
              | (?P<string>"(?:[^"\\\n]|\\.)*")
              | (?P<raw>`[^`]*`)
              | (?P<char>'(?:[^'\\\n]
                  |\\(?:x[0-9A-Fa-f]{2}|u[0-9A-Fa-f]{4}|U[0-9A-Fa-f]{8}|[0-7]{1,3}|.))')
              | (?P<punct>.)
            )"#,
        )
        .expect("token regex is valid")
    })
}

/// Streaming tokenizer with one token of lookahead.
pub struct Lexer<'a> {
    src: &'a str,
    pos: usize,
    line: usize,
    peeked: Option<Token>,
}

impl<'a> Lexer<'a> {
    pub fn new(src: &'a str) -> Self {
        Lexer {
            src,
            pos: 0,
            line: 1,
            peeked: None,
        }
    }

    /// Current line number, used for error reporting.
    pub fn line(&self) -> usize {
        self.peeked.as_ref().map_or(self.line, |tok| tok.line)
    }

    pub fn next_token(&mut self) -> Result<Token> {
        if let Some(tok) = self.peeked.take() {
            return Ok(tok);
        }
        self.scan()
    }

    pub fn peek(&mut self) -> Result<&Token> {
        let tok = match self.peeked.take() {
            Some(tok) => tok,
            None => self.scan()?,
        };
        Ok(&*self.peeked.insert(tok))
    }

    fn scan(&mut self) -> Result<Token> {
        loop {
            let rest = &self.src[self.pos..];
            if rest.is_empty() {
                return Ok(Token {
                    kind: TokenKind::Eof,
                    text: String::new(),
                    line: self.line,
                });
            }

            let caps = token_regex()
                .captures(rest)
                .ok_or_else(|| GrammarError::parse_at(self.line, "unreadable input"))?;
            let whole = caps.get(0).map_or("", |m| m.as_str());
            let line = self.line;
            self.pos += whole.len();
            self.line += whole.matches('\n').count();

            let kind = if caps.name("space").is_some()
                || caps.name("line_comment").is_some()
                || caps.name("block_comment").is_some()
            {
                continue;
            } else if caps.name("float").is_some() {
                TokenKind::Float
            } else if caps.name("int").is_some() {
                TokenKind::Int
            } else if caps.name("ident").is_some() {
                TokenKind::Ident
            } else if caps.name("string").is_some() || caps.name("raw").is_some() {
                TokenKind::String
            } else if caps.name("char").is_some() {
                TokenKind::Char
            } else {
                match whole {
                    "\"" | "`" => {
                        return Err(GrammarError::parse_at(line, "unterminated string literal"));
                    }
                    "'" => {
                        return Err(GrammarError::parse_at(line, "malformed char literal"));
                    }
                    "/" if rest.starts_with("/*") => {
                        return Err(GrammarError::parse_at(line, "unterminated block comment"));
                    }
                    _ => TokenKind::Punct,
                }
            };

            return Ok(Token {
                kind,
                text: whole.to_string(),
                line,
            });
        }
    }
}

/// Parse an integer token, honouring `0x`, `0o` and `0b` prefixes after
/// an optional leading `-`.
pub fn parse_int(text: &str) -> std::result::Result<i64, ParseIntError> {
    let (sign, digits) = match text.strip_prefix('-') {
        Some(rest) => ("-", rest),
        None => ("", text),
    };
    let (radix, digits) = match digits.get(..2) {
        Some("0x" | "0X") => (16, &digits[2..]),
        Some("0o" | "0O") => (8, &digits[2..]),
        Some("0b" | "0B") => (2, &digits[2..]),
        _ => (10, digits),
    };
    i64::from_str_radix(&format!("{}{}", sign, digits), radix)
}

/// Strip quotes from a string or char token and process escapes.
///
/// Back-quoted strings are raw and returned verbatim. Recognised escapes are
/// `\a \b \f \n \r \t \v \\ \" \'`, octal `\NNN` (one to three digits),
/// `\xNN`, `\uNNNN` and `\UNNNNNNNN`.
pub fn unquote(text: &str) -> Result<String> {
    if let Some(raw) = text.strip_prefix('`').and_then(|t| t.strip_suffix('`')) {
        return Ok(raw.to_string());
    }
    let inner = text
        .strip_prefix('"')
        .and_then(|t| t.strip_suffix('"'))
        .or_else(|| text.strip_prefix('\'').and_then(|t| t.strip_suffix('\'')))
        .ok_or_else(|| GrammarError::Parse(format!("not a quoted literal: {}", text)))?;

    let mut out = String::with_capacity(inner.len());
    let mut chars = inner.chars().peekable();
    while let Some(ch) = chars.next() {
        if ch != '\\' {
            out.push(ch);
            continue;
        }
        let escaped = match chars.next() {
            Some('a') => '\u{07}',
            Some('b') => '\u{08}',
            Some('f') => '\u{0C}',
            Some('n') => '\n',
            Some('r') => '\r',
            Some('t') => '\t',
            Some('v') => '\u{0B}',
            Some(c @ ('\\' | '"' | '\'')) => c,
            Some('x') => hex_escape(&mut chars, 2)?,
            Some('u') => hex_escape(&mut chars, 4)?,
            Some('U') => hex_escape(&mut chars, 8)?,
            Some(c @ '0'..='7') => {
                let mut code = c.to_digit(8).unwrap_or(0);
                for _ in 0..2 {
                    match chars.next_if(|d| d.is_digit(8)).and_then(|d| d.to_digit(8)) {
                        Some(d) => code = code * 8 + d,
                        None => break,
                    }
                }
                char::from_u32(code)
                    .ok_or_else(|| GrammarError::Parse(format!("bad octal escape {:o}", code)))?
            }
            Some(c) => {
                return Err(GrammarError::Parse(format!("unknown escape `\\{}`", c)));
            }
            None => return Err(GrammarError::Parse("dangling escape".to_string())),
        };
        out.push(escaped);
    }
    Ok(out)
}

/// Read exactly `len` hex digits and turn them into a char.
fn hex_escape(chars: &mut Peekable<Chars<'_>>, len: usize) -> Result<char> {
    let mut digits = String::with_capacity(len);
    while digits.len() < len {
        match chars.next_if(|d| d.is_ascii_hexdigit()) {
            Some(d) => digits.push(d),
            None => {
                return Err(GrammarError::Parse(format!(
                    "escape needs {} hex digits, found `{}`",
                    len, digits
                )));
            }
        }
    }
    u32::from_str_radix(&digits, 16)
        .ok()
        .and_then(char::from_u32)
        .ok_or_else(|| GrammarError::Parse(format!("`{}` is not a valid code point", digits)))
}
