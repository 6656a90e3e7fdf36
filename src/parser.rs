//! Recursive-descent parser for production-rule files, and the pass that
//! resolves nonterminal references once every name has been declared.
//!
//! ```text
//! stmt     : select " " from .
//! select   : "SELECT " column ;
//!          | "SELECT * " .
//! column   : "id" ; | "name" .
//! from     : "FROM " $table " LIMIT " range(1, 4) .
//! expr ! 5 : expr "+" expr ; | "1" .
//!
//! Context .
//! from : table = "users", limit = 10 .
//! ```
//!
//! A nonterminal is a name, an optional recursion hint (`!` or `#` and an
//! integer), and rules introduced by `:` then `|`. A rule ends with `;` when
//! more rules follow or `.` when it is the last. An optional `Context` block
//! at the end attaches default bindings to nonterminals.

use std::collections::{BTreeMap, HashMap};

use crate::context::Value;
use crate::grammar::{Grammar, Node, NonTerminal, NtId};
use crate::lexer::{Lexer, Token, TokenKind, parse_int, unquote};
use crate::registry::Registry;
use crate::utils::{GrammarError, OptionExt, Result};

/// Header word that opens the context block.
pub const CONTEXT_KEYWORD: &str = "Context";

/// Nonterminals as parsed, before references are resolved.
#[derive(Debug, Default)]
pub struct SymbolTable {
    pub(crate) nonterminals: Vec<NonTerminal>,
    pub(crate) index: HashMap<String, NtId>,
    pub(crate) start: Option<String>,
}

impl SymbolTable {
    fn insert(&mut self, nt: NonTerminal) {
        if self.start.is_none() {
            self.start = Some(nt.name.clone());
        }
        // A later declaration of the same name replaces the earlier one.
        match self.index.get(&nt.name) {
            Some(&id) => self.nonterminals[id.0] = nt,
            None => {
                self.index.insert(nt.name.clone(), NtId(self.nonterminals.len()));
                self.nonterminals.push(nt);
            }
        }
    }

    fn get_mut(&mut self, name: &str) -> Option<&mut NonTerminal> {
        let id = *self.index.get(name)?;
        self.nonterminals.get_mut(id.0)
    }

    pub fn len(&self) -> usize {
        self.nonterminals.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nonterminals.is_empty()
    }
}

/// Parser state handed to builtin constructors so they can read their arguments.
pub struct Parser<'a> {
    lexer: Lexer<'a>,
    registry: &'a Registry,
}

impl<'a> Parser<'a> {
    pub fn new(src: &'a str, registry: &'a Registry) -> Self {
        Parser {
            lexer: Lexer::new(src),
            registry,
        }
    }

    pub fn next_token(&mut self) -> Result<Token> {
        self.lexer.next_token()
    }

    pub fn peek(&mut self) -> Result<&Token> {
        self.lexer.peek()
    }

    pub fn line(&self) -> usize {
        self.lexer.line()
    }

    /// Consume the next token, which must be the punctuation `ch`.
    pub fn expect_punct(&mut self, ch: char) -> Result<Token> {
        let tok = self.next_token()?;
        if tok.is_punct(ch) {
            Ok(tok)
        } else {
            Err(self.unexpected(&tok, &format!("`{}`", ch)))
        }
    }

    /// Next token, folding a leading `-` into a following number.
    pub fn next_signed(&mut self) -> Result<Token> {
        let tok = self.next_token()?;
        if !tok.is_punct('-') {
            return Ok(tok);
        }
        if matches!(self.peek()?.kind, TokenKind::Int | TokenKind::Float) {
            let mut num = self.next_token()?;
            num.text.insert(0, '-');
            num.line = tok.line;
            return Ok(num);
        }
        Ok(tok)
    }

    pub fn error(&self, message: impl AsRef<str>) -> GrammarError {
        GrammarError::parse_at(self.line(), message)
    }

    fn unexpected(&self, tok: &Token, expected: &str) -> GrammarError {
        let found = if tok.is_eof() {
            "end of input".to_string()
        } else {
            format!("`{}`", tok.text)
        };
        GrammarError::parse_at(tok.line, format!("expected {}, found {}", expected, found))
    }

    /// Parse every nonterminal and the optional context block.
    pub fn parse_table(&mut self) -> Result<SymbolTable> {
        let mut table = SymbolTable::default();

        while let Some((name, hint)) = self.parse_header()? {
            if name == CONTEXT_KEYWORD {
                self.parse_context(&mut table)?;
                break;
            }
            let alternatives = self.parse_rules()?;
            table.insert(NonTerminal {
                name,
                alternatives,
                context: BTreeMap::new(),
                recursion_hint: hint,
            });
        }

        Ok(table)
    }

    /// Name and optional recursion hint, or `None` at end of input.
    fn parse_header(&mut self) -> Result<Option<(String, Option<u32>)>> {
        let tok = self.next_token()?;
        if tok.is_eof() {
            return Ok(None);
        }
        if tok.kind != TokenKind::Ident {
            return Err(self.unexpected(&tok, "a nonterminal name"));
        }

        let peeked = self.peek()?;
        let hint = if peeked.is_punct('!') || peeked.is_punct('#') {
            self.next_token()?;
            let num = self.next_token()?;
            if num.kind != TokenKind::Int {
                return Err(self.unexpected(&num, "a recursion depth"));
            }
            let depth = parse_int(&num.text)
                .ok()
                .and_then(|n| u32::try_from(n).ok())
                .ok_or_else(|| {
                    GrammarError::parse_at(num.line, format!("bad recursion depth `{}`", num.text))
                })?;
            Some(depth)
        } else {
            None
        };

        Ok(Some((tok.text, hint)))
    }

    fn parse_rules(&mut self) -> Result<Vec<Vec<Node>>> {
        let mut alternatives = Vec::new();
        loop {
            let tok = self.next_token()?;
            let opener = if alternatives.is_empty() { ':' } else { '|' };
            if !tok.is_punct(opener) {
                return Err(self.unexpected(&tok, &format!("a rule starting with `{}`", opener)));
            }
            let (nodes, more) = self.parse_nodes()?;
            alternatives.push(nodes);
            if !more {
                return Ok(alternatives);
            }
        }
    }

    /// One rule body. The flag is true when the rule ended with `;`.
    fn parse_nodes(&mut self) -> Result<(Vec<Node>, bool)> {
        let registry = self.registry;
        let mut nodes = Vec::new();

        loop {
            let tok = self.next_token()?;
            if tok.is_eof() || tok.is_punct('.') {
                return Ok((nodes, false));
            }
            if tok.is_punct(';') {
                return Ok((nodes, true));
            }

            let node = if let Some(literal) = registry.literal(tok.kind) {
                Node::Leaf(literal(&tok.text).map_err(|e| e.at_line(tok.line))?)
            } else if let Some(terminal) = registry.terminal(&tok.text) {
                Node::Leaf(terminal().map_err(|e| e.at_line(tok.line))?)
            } else if let Some(bnf) = registry.bnf(&tok.text) {
                Node::Leaf(bnf(self).map_err(|e| e.at_line(tok.line))?)
            } else if tok.is_punct('$') {
                let name = self.next_token()?;
                if name.kind != TokenKind::Ident {
                    return Err(self.unexpected(&name, "a variable name after `$`"));
                }
                let reference = registry.reference().ok_or_else(|| {
                    GrammarError::parse_at(tok.line, "no constructor registered for `$` references")
                })?;
                Node::Leaf(reference(&name.text).map_err(|e| e.at_line(name.line))?)
            } else {
                Node::Unresolved(tok.text)
            };
            nodes.push(node);
        }
    }

    fn parse_context(&mut self, table: &mut SymbolTable) -> Result<()> {
        if self.peek()?.is_punct('.') {
            self.next_token()?;
        }

        loop {
            let tok = self.next_token()?;
            if tok.is_eof() {
                return Ok(());
            }
            if tok.kind != TokenKind::Ident {
                return Err(self.unexpected(&tok, "a nonterminal name in the context block"));
            }
            self.expect_punct(':')?;

            let line = tok.line;
            let nt = table.get_mut(&tok.text).ok_or_else(|| {
                let msg = format!("context given for unknown nonterminal `{}`", tok.text);
                GrammarError::parse_at(line, msg)
            })?;

            loop {
                let key = self.next_token()?;
                if key.kind != TokenKind::Ident {
                    let expected = format!("a variable name in the context of `{}`", nt.name);
                    return Err(self.unexpected(&key, &expected));
                }
                self.expect_punct('=')?;
                let value = self.context_value()?;
                nt.context.insert(key.text, value);

                let sep = self.next_token()?;
                if sep.is_punct('.') {
                    break;
                }
                if !sep.is_punct(',') {
                    return Err(self.unexpected(&sep, "`,` or `.`"));
                }
            }
        }
    }

    fn context_value(&mut self) -> Result<Value> {
        let tok = self.next_signed()?;
        let line = tok.line;
        let bad = |e: &dyn std::fmt::Display| {
            GrammarError::parse_at(line, format!("bad {} literal `{}`: {}", tok.kind, tok.text, e))
        };
        match tok.kind {
            TokenKind::String => Ok(Value::Str(unquote(&tok.text).map_err(|e| e.at_line(line))?)),
            TokenKind::Char => {
                let text = unquote(&tok.text).map_err(|e| e.at_line(line))?;
                Ok(Value::Int(text.chars().next().unwrap_or('\0') as i64))
            }
            TokenKind::Int => parse_int(&tok.text).map(Value::Int).map_err(|e| bad(&e)),
            TokenKind::Float => tok.text.parse::<f64>().map(Value::Float).map_err(|e| bad(&e)),
            _ => Err(self.unexpected(&tok, "a string, char, int or float literal")),
        }
    }
}

/// Parse grammar source into a symbol table and resolve it.
pub fn parse(src: &str, registry: &Registry) -> Result<Grammar> {
    let table = Parser::new(src, registry).parse_table()?;
    build_ast(table)
}

/// Replace every unresolved reference with a link to its nonterminal.
pub fn build_ast(mut table: SymbolTable) -> Result<Grammar> {
    let start = table
        .start
        .take()
        .ok_or_parse_err(|| "grammar declares no nonterminals".to_string())?;

    for nt in &mut table.nonterminals {
        for rule in &mut nt.alternatives {
            for node in rule.iter_mut() {
                if let Node::Unresolved(name) = node {
                    let id = table.index.get(name.as_str()).copied().ok_or_else(|| {
                        let msg = format!("unknown reference `{}` in rules of `{}`", name, nt.name);
                        GrammarError::Parse(msg)
                    })?;
                    *node = Node::NonTerminal(id);
                }
            }
        }
    }

    Ok(Grammar::from_parts(table.nonterminals, table.index, start))
}
