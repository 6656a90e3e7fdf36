//! Prodgen generates random text from BNF-like production rules.
//!
//! A grammar file declares nonterminals with one or more alternative rules.
//! Generation starts at a nonterminal, picks one of its rules uniformly at
//! random and expands every node of it, concatenating the results. Leaves
//! are built by constructors held in a [`Registry`]: quoted literals,
//! numbers, `$name` references to context variables and builtins such as
//! `range(min, max)`.
//!
//! # Example
//!
//! ```rust
//! use prodgen::{Context, Grammar, Registry};
//!
//! let registry = Registry::with_defaults();
//! let grammar = Grammar::parse(
//!     r#"
//!     greeting : "Hello, " subject "!" .
//!     subject  : "world" ;
//!              | "user #" range(1, 100) .
//!     "#,
//!     &registry,
//! )
//! .unwrap();
//!
//! let mut ctx = Context::seeded(7);
//! let text = grammar.generate(&mut ctx).unwrap();
//! assert!(text.starts_with("Hello, "));
//! ```

pub mod builtin;
pub mod context;
pub mod grammar;
pub mod lexer;
pub mod parser;
pub mod registry;
pub mod utils;

pub use context::{Context, Value};
pub use grammar::{Grammar, GrammarConfig, GrammarDump, Node, NonTerminal, NtId};
pub use parser::{Parser, build_ast, parse};
pub use registry::{Registry, Terminal};
pub use utils::{GrammarError, Result};
