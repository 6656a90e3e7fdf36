//! Variable context threaded through one generation run.
//!
//! Bindings live in a stack of frames. Each nonterminal expansion pushes a
//! frame for its default context and for the text of the nonterminals it
//! expands, and pops it on return, so nothing leaks to ancestors or to
//! unrelated subtrees. The pseudorandom source is owned here as well, which
//! makes a `Context` the unit of independence between concurrent runs.

use std::collections::HashMap;
use std::fmt;

use rand::SeedableRng;
use rand::rngs::StdRng;
use serde::{Deserialize, Serialize};

/// A dynamically typed context value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    Int(i64),
    Float(f64),
    Str(String),
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Int(n) => write!(f, "{}", n),
            Value::Float(x) => write!(f, "{}", x),
            Value::Str(s) => f.write_str(s),
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Str(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Str(s)
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Int(n)
    }
}

impl From<f64> for Value {
    fn from(x: f64) -> Self {
        Value::Float(x)
    }
}

type Frame = HashMap<String, Value>;

/// Mutable name/value environment plus the random source for one run.
#[derive(Debug, Clone)]
pub struct Context {
    rng: StdRng,
    // frames[0] holds caller-supplied bindings and is never popped
    frames: Vec<Frame>,
}

impl Context {
    pub fn new(rng: StdRng) -> Self {
        Context {
            rng,
            frames: vec![Frame::new()],
        }
    }

    /// Context with a deterministic random source.
    pub fn seeded(seed: u64) -> Self {
        Context::new(StdRng::seed_from_u64(seed))
    }

    pub fn from_entropy() -> Self {
        Context::new(StdRng::from_entropy())
    }

    pub fn rng(&mut self) -> &mut StdRng {
        &mut self.rng
    }

    /// Re-seed the random source in place, keeping bindings.
    pub fn reseed(&mut self, seed: u64) {
        self.rng = StdRng::seed_from_u64(seed);
    }

    /// Look a name up, innermost frame first.
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.frames.iter().rev().find_map(|frame| frame.get(name))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// Bind `name` in the innermost frame, shadowing outer bindings.
    pub fn set(&mut self, name: impl Into<String>, value: impl Into<Value>) {
        if let Some(frame) = self.frames.last_mut() {
            frame.insert(name.into(), value.into());
        }
    }

    /// Number of frames currently pushed, the caller's base frame included.
    pub fn depth(&self) -> usize {
        self.frames.len()
    }

    pub(crate) fn push_frame(&mut self) {
        self.frames.push(Frame::new());
    }

    pub(crate) fn pop_frame(&mut self) {
        if self.frames.len() > 1 {
            self.frames.pop();
        }
    }
}

impl Default for Context {
    fn default() -> Self {
        Context::from_entropy()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::Rng;

    #[test]
    fn test_frames_shadow_and_restore() {
        let mut ctx = Context::seeded(1);
        ctx.set("v", "outer");

        ctx.push_frame();
        ctx.set("v", 2i64);
        ctx.set("w", 1.5);
        assert_eq!(ctx.get("v"), Some(&Value::Int(2)));
        assert_eq!(ctx.depth(), 2);
        ctx.pop_frame();

        assert_eq!(ctx.get("v"), Some(&Value::Str("outer".to_string())));
        assert!(!ctx.contains("w"));
    }

    #[test]
    fn test_base_frame_is_never_popped() {
        let mut ctx = Context::seeded(1);
        ctx.set("keep", "me");
        ctx.pop_frame();
        assert_eq!(ctx.depth(), 1);
        assert!(ctx.contains("keep"));
    }

    #[test]
    fn test_reseed_is_deterministic() {
        let mut ctx = Context::seeded(9);
        let first: Vec<u32> = (0..8).map(|_| ctx.rng().gen_range(0..1000)).collect();
        ctx.reseed(9);
        let second: Vec<u32> = (0..8).map(|_| ctx.rng().gen_range(0..1000)).collect();
        assert_eq!(first, second);
    }

    #[test]
    fn test_value_display() {
        assert_eq!(Value::from("abc").to_string(), "abc");
        assert_eq!(Value::Int(-4).to_string(), "-4");
        assert_eq!(Value::Float(2.5).to_string(), "2.5");
    }
}
