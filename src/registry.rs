//! Registries of leaf-node constructors consulted by the parser.
//!
//! A [`Registry`] is built by the caller before parsing and handed to
//! [`crate::parser::parse`] by reference. Three tables are kept:
//!
//! - literals, keyed by token category (`"text"`, `42`, `1.5`, `'c'`)
//! - terminals, keyed by identifier, built without arguments
//! - bnfs, keyed by identifier, which may read further tokens such as an
//!   argument list from the parser
//!
//! plus the constructor for `$name` named references. Lookup priority during
//! parsing is literal, terminal, bnf, then bare nonterminal reference.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use crate::context::Context;
use crate::lexer::TokenKind;
use crate::parser::Parser;
use crate::utils::Result;

/// Produces the text of a leaf node during generation.
pub type GeneratorFn = Arc<dyn Fn(&mut Context) -> Result<String> + Send + Sync>;
/// Builds a leaf from literal token text.
pub type LiteralFn = Arc<dyn Fn(&str) -> Result<Terminal> + Send + Sync>;
/// Builds a leaf from a bare identifier.
pub type TerminalFn = Arc<dyn Fn() -> Result<Terminal> + Send + Sync>;
/// Builds a leaf and may consume the tokens that follow it.
pub type BnfFn = Arc<dyn for<'p, 'a> Fn(&'p mut Parser<'a>) -> Result<Terminal> + Send + Sync>;

/// A leaf value node: fixed or computed text.
#[derive(Clone)]
pub struct Terminal {
    /// Registry entry or category that produced this leaf
    pub name: String,
    /// Source text, empty for purely computed leaves
    pub value: String,
    generator: GeneratorFn,
}

impl Terminal {
    pub fn new<F>(name: impl Into<String>, value: impl Into<String>, generator: F) -> Self
    where
        F: Fn(&mut Context) -> Result<String> + Send + Sync + 'static,
    {
        Terminal {
            name: name.into(),
            value: value.into(),
            generator: Arc::new(generator),
        }
    }

    /// A leaf that always yields `text`.
    pub fn constant(name: impl Into<String>, text: impl Into<String>) -> Self {
        let text = text.into();
        let out = text.clone();
        Terminal::new(name, text, move |_| Ok(out.clone()))
    }

    pub fn generate(&self, ctx: &mut Context) -> Result<String> {
        (self.generator)(ctx)
    }
}

impl fmt::Debug for Terminal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Terminal")
            .field("name", &self.name)
            .field("value", &self.value)
            .finish_non_exhaustive()
    }
}

impl fmt::Display for Terminal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}({})", self.name, self.value)
    }
}

/// Constructor tables for literals, terminals, builtins and references.
#[derive(Clone, Default)]
pub struct Registry {
    literals: HashMap<TokenKind, LiteralFn>,
    terminals: HashMap<String, TerminalFn>,
    bnfs: HashMap<String, BnfFn>,
    reference: Option<LiteralFn>,
}

impl Registry {
    /// Create a new empty registry
    pub fn new() -> Self {
        Registry::default()
    }

    /// Registry with the default literals, `$name` references and the `range` builtin.
    pub fn with_defaults() -> Self {
        let mut registry = Registry::new();
        crate::builtin::register_defaults(&mut registry);
        registry
    }

    pub fn register_literal<F>(&mut self, kind: TokenKind, f: F) -> &mut Self
    where
        F: Fn(&str) -> Result<Terminal> + Send + Sync + 'static,
    {
        self.literals.insert(kind, Arc::new(f));
        self
    }

    pub fn register_reference<F>(&mut self, f: F) -> &mut Self
    where
        F: Fn(&str) -> Result<Terminal> + Send + Sync + 'static,
    {
        self.reference = Some(Arc::new(f));
        self
    }

    pub fn register_terminal<F>(&mut self, name: &str, f: F) -> &mut Self
    where
        F: Fn() -> Result<Terminal> + Send + Sync + 'static,
    {
        self.terminals.insert(name.to_string(), Arc::new(f));
        self
    }

    pub fn register_bnf<F>(&mut self, name: &str, f: F) -> &mut Self
    where
        F: for<'p, 'a> Fn(&'p mut Parser<'a>) -> Result<Terminal> + Send + Sync + 'static,
    {
        self.bnfs.insert(name.to_string(), Arc::new(f));
        self
    }

    pub fn literal(&self, kind: TokenKind) -> Option<&LiteralFn> {
        self.literals.get(&kind)
    }

    pub fn terminal(&self, name: &str) -> Option<&TerminalFn> {
        self.terminals.get(name)
    }

    pub fn bnf(&self, name: &str) -> Option<&BnfFn> {
        self.bnfs.get(name)
    }

    pub fn reference(&self) -> Option<&LiteralFn> {
        self.reference.as_ref()
    }

    /// Names of registered terminals and builtins, sorted.
    pub fn list_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .terminals
            .keys()
            .chain(self.bnfs.keys())
            .cloned()
            .collect();
        names.sort();
        names
    }
}

impl fmt::Debug for Registry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Registry")
            .field("literals", &self.literals.keys().collect::<Vec<_>>())
            .field("terminals", &self.terminals.keys().collect::<Vec<_>>())
            .field("bnfs", &self.bnfs.keys().collect::<Vec<_>>())
            .field("reference", &self.reference.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_constant_terminal() {
        let leaf = Terminal::constant("String", "hi");
        let mut ctx = Context::seeded(0);
        assert_eq!(leaf.generate(&mut ctx).unwrap(), "hi");
        assert_eq!(leaf.to_string(), "String(hi)");
    }

    #[test]
    fn test_register_and_lookup() {
        let mut registry = Registry::new();
        registry
            .register_terminal("NL", || Ok(Terminal::constant("NL", "\n")))
            .register_literal(TokenKind::Int, |text| Ok(Terminal::constant("Int", text)));

        assert!(registry.terminal("NL").is_some());
        assert!(registry.terminal("nl").is_none());
        assert!(registry.literal(TokenKind::Int).is_some());
        assert!(registry.literal(TokenKind::Float).is_none());
        assert!(registry.reference().is_none());
        assert_eq!(registry.list_names(), vec!["NL"]);
    }

    #[test]
    fn test_defaults() {
        let registry = Registry::with_defaults();
        for kind in [TokenKind::String, TokenKind::Char, TokenKind::Int, TokenKind::Float] {
            assert!(registry.literal(kind).is_some(), "missing literal {}", kind);
        }
        assert!(registry.reference().is_some());
        assert!(registry.bnf("range").is_some());
        assert_eq!(registry.list_names(), vec!["range"]);
    }
}
