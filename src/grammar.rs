use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::fs;
use std::path::Path;
use std::str::FromStr;

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::context::{Context, Value};
use crate::parser;
use crate::registry::{Registry, Terminal};
use crate::utils::{GrammarError, Result};

/// Index of a nonterminal inside its [`Grammar`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NtId(pub(crate) usize);

/// One element of a rule.
#[derive(Debug, Clone)]
pub enum Node {
    /// Leaf producing text directly
    Leaf(Terminal),
    /// Link to a nonterminal of the same grammar
    NonTerminal(NtId),
    /// Bare name seen by the parser, replaced during reference resolution
    Unresolved(String),
}

/// A named grammar symbol and its alternative rules.
#[derive(Debug, Clone)]
pub struct NonTerminal {
    pub name: String,
    pub alternatives: Vec<Vec<Node>>,
    /// Default bindings from the `Context` block
    pub context: BTreeMap<String, Value>,
    /// Depth given with `!` or `#` in the header. Recorded only; generation
    /// is bounded by [`GrammarConfig::max_recursion_depth`] instead.
    pub recursion_hint: Option<u32>,
}

/// Configuration options for generation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GrammarConfig {
    /// Maximum nesting of nonterminal expansions before generation fails
    pub max_recursion_depth: usize,
}

impl Default for GrammarConfig {
    fn default() -> Self {
        GrammarConfig {
            max_recursion_depth: 200,
        }
    }
}

impl GrammarConfig {
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let text = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&text)?)
    }
}

/// A parsed grammar with every reference resolved.
///
/// The grammar is read-only once built and can be shared between threads;
/// each concurrent run needs its own [`Context`].
#[derive(Debug, Clone)]
pub struct Grammar {
    nonterminals: Vec<NonTerminal>,
    index: HashMap<String, NtId>,
    start_symbol: String,
    config: GrammarConfig,
}

impl Grammar {
    pub(crate) fn from_parts(
        nonterminals: Vec<NonTerminal>,
        index: HashMap<String, NtId>,
        start_symbol: String,
    ) -> Self {
        Grammar {
            nonterminals,
            index,
            start_symbol,
            config: GrammarConfig::default(),
        }
    }

    /// Parse grammar source using the constructors in `registry`
    pub fn parse(src: &str, registry: &Registry) -> Result<Self> {
        parser::parse(src, registry)
    }

    /// Parse a grammar from a file
    pub fn from_file<P: AsRef<Path>>(path: P, registry: &Registry) -> Result<Self> {
        let src = fs::read_to_string(path)?;
        Grammar::parse(&src, registry)
    }

    pub fn with_config(mut self, config: GrammarConfig) -> Self {
        self.config = config;
        self
    }

    pub fn set_config(&mut self, config: GrammarConfig) {
        self.config = config;
    }

    pub fn config(&self) -> &GrammarConfig {
        &self.config
    }

    /// The first nonterminal declared in the source
    pub fn start_symbol(&self) -> &str {
        &self.start_symbol
    }

    pub fn nonterminals(&self) -> &[NonTerminal] {
        &self.nonterminals
    }

    pub fn id(&self, name: &str) -> Option<NtId> {
        self.index.get(name).copied()
    }

    pub fn get(&self, name: &str) -> Option<&NonTerminal> {
        self.id(name).and_then(|id| self.nonterminal(id))
    }

    /// Look up the target of a [`Node::NonTerminal`] link. Ids from another
    /// grammar may be out of range and yield `None`.
    pub fn nonterminal(&self, id: NtId) -> Option<&NonTerminal> {
        self.nonterminals.get(id.0)
    }

    /// Ids held by this grammar's nodes always index its own arena.
    fn resolve(&self, id: NtId) -> &NonTerminal {
        &self.nonterminals[id.0]
    }

    pub fn has_non_terminal(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    /// Expand the start symbol.
    pub fn generate(&self, ctx: &mut Context) -> Result<String> {
        let id = self
            .id(&self.start_symbol)
            .ok_or_else(|| GrammarError::UnknownNonTerminal(self.start_symbol.clone()))?;
        self.expand(ctx, id, 0)
    }

    /// Expand the nonterminal called `name`.
    pub fn generate_from(&self, ctx: &mut Context, name: &str) -> Result<String> {
        let id = self
            .id(name)
            .ok_or_else(|| GrammarError::UnknownNonTerminal(name.to_string()))?;
        self.expand(ctx, id, 0)
    }

    /// Pick one alternative of `id` and expand it inside a fresh context frame.
    ///
    /// The frame carries the nonterminal's default bindings and the text of
    /// every nonterminal expanded by the chosen rule, so later siblings can
    /// read earlier ones. It is dropped on return, error or not.
    fn expand(&self, ctx: &mut Context, id: NtId, depth: usize) -> Result<String> {
        let nt = self.resolve(id);
        if depth >= self.config.max_recursion_depth {
            return Err(GrammarError::RecursionLimit {
                symbol: nt.name.clone(),
                limit: self.config.max_recursion_depth,
            });
        }
        if nt.alternatives.is_empty() {
            return Ok(String::new());
        }

        let choice = ctx.rng().gen_range(0..nt.alternatives.len());
        let rule = &nt.alternatives[choice];

        ctx.push_frame();
        for (name, value) in &nt.context {
            ctx.set(name.clone(), value.clone());
        }
        let result = self.expand_rule(ctx, rule, depth);
        ctx.pop_frame();
        result
    }

    fn expand_rule(&self, ctx: &mut Context, rule: &[Node], depth: usize) -> Result<String> {
        let mut result = String::new();
        for node in rule {
            match node {
                Node::Leaf(leaf) => result.push_str(&leaf.generate(ctx)?),
                Node::NonTerminal(id) => {
                    let text = self.expand(ctx, *id, depth + 1)?;
                    result.push_str(&text);
                    ctx.set(self.resolve(*id).name.clone(), text);
                }
                Node::Unresolved(name) => {
                    return Err(GrammarError::Parse(format!("unresolved reference `{}`", name)));
                }
            }
        }
        Ok(result)
    }

    fn describe(&self, node: &Node) -> String {
        match node {
            Node::Leaf(leaf) => leaf.to_string(),
            Node::NonTerminal(id) => self.resolve(*id).name.clone(),
            Node::Unresolved(name) => format!("?{}", name),
        }
    }

    /// Serializable view of the grammar for inspection.
    pub fn dump(&self) -> GrammarDump {
        GrammarDump {
            start: self.start_symbol.clone(),
            nonterminals: self
                .nonterminals
                .iter()
                .map(|nt| NonTerminalDump {
                    name: nt.name.clone(),
                    recursion_hint: nt.recursion_hint,
                    context: nt.context.clone(),
                    rules: nt
                        .alternatives
                        .iter()
                        .map(|rule| rule.iter().map(|node| self.describe(node)).collect())
                        .collect(),
                })
                .collect(),
        }
    }
}

impl FromStr for Grammar {
    type Err = GrammarError;

    /// Parse with [`Registry::with_defaults`].
    fn from_str(s: &str) -> Result<Self> {
        Grammar::parse(s, &Registry::with_defaults())
    }
}

impl fmt::Display for Grammar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for nt in &self.nonterminals {
            writeln!(f, "{}", nt.name)?;
            for rule in &nt.alternatives {
                let nodes: Vec<String> = rule.iter().map(|node| self.describe(node)).collect();
                writeln!(f, "    : {}", nodes.join(" . "))?;
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GrammarDump {
    pub start: String,
    pub nonterminals: Vec<NonTerminalDump>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NonTerminalDump {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub recursion_hint: Option<u32>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty", default)]
    pub context: BTreeMap<String, Value>,
    pub rules: Vec<Vec<String>>,
}
