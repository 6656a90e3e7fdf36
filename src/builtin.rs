//! Default literal constructors and builtin generators.
//!
//! `range(max)` and `range(min, max)` yield a random integer in `[0, max)`
//! or `[min, max)`, drawn from the context's random source.

use rand::Rng;

use crate::context::Context;
use crate::lexer::{TokenKind, parse_int, unquote};
use crate::parser::Parser;
use crate::registry::{Registry, Terminal};
use crate::utils::{GrammarError, Result};

/// Install the literals, `$name` references and `range` into `registry`.
pub fn register_defaults(registry: &mut Registry) {
    registry
        .register_literal(TokenKind::String, |text| quoted_literal("String", text))
        .register_literal(TokenKind::Char, |text| quoted_literal("Char", text))
        .register_literal(TokenKind::Int, |text| Ok(Terminal::constant("Int", text)))
        .register_literal(TokenKind::Float, |text| Ok(Terminal::constant("Float", text)))
        .register_reference(reference)
        .register_bnf("range", range_bnf);
}

fn quoted_literal(name: &str, text: &str) -> Result<Terminal> {
    Ok(Terminal::constant(name, unquote(text)?))
}

/// Leaf that prints the value bound to `name` in the context.
pub fn reference(name: &str) -> Result<Terminal> {
    let var = name.to_string();
    Ok(Terminal::new("Reference", name, move |ctx: &mut Context| {
        ctx.get(&var)
            .map(|value| value.to_string())
            .ok_or_else(|| GrammarError::UnboundVariable(var.clone()))
    }))
}

/// Parse a parenthesised, comma separated list of integers.
pub fn int_args(parser: &mut Parser<'_>) -> Result<Vec<i64>> {
    parser.expect_punct('(')?;
    let mut args = Vec::new();
    if parser.peek()?.is_punct(')') {
        parser.next_token()?;
        return Ok(args);
    }
    loop {
        let tok = parser.next_signed()?;
        if tok.kind != TokenKind::Int {
            return Err(GrammarError::parse_at(
                tok.line,
                format!("expected an integer argument, found `{}`", tok.text),
            ));
        }
        let n = parse_int(&tok.text).map_err(|e| {
            GrammarError::parse_at(tok.line, format!("bad integer `{}`: {}", tok.text, e))
        })?;
        args.push(n);

        let sep = parser.next_token()?;
        if sep.is_punct(')') {
            return Ok(args);
        }
        if !sep.is_punct(',') {
            return Err(GrammarError::parse_at(
                sep.line,
                format!("expected `,` or `)`, found `{}`", sep.text),
            ));
        }
    }
}

/// Check `range` arguments and turn them into a half-open `(min, max)`.
pub fn range_bounds(args: &[i64]) -> Result<(i64, i64)> {
    let (min, max) = match *args {
        [max] => (0, max),
        [min, max] => (min, max),
        _ => {
            return Err(GrammarError::Usage(format!(
                "range expects one or two arguments, got {}",
                args.len()
            )));
        }
    };
    if min >= max {
        return Err(GrammarError::Usage(format!("range({}, {}) is empty", min, max)));
    }
    Ok((min, max))
}

/// Random integer from `range(max)` or `range(min, max)`.
pub fn range(ctx: &mut Context, args: &[i64]) -> Result<i64> {
    let (min, max) = range_bounds(args)?;
    Ok(ctx.rng().gen_range(min..max))
}

fn range_bnf(parser: &mut Parser<'_>) -> Result<Terminal> {
    let args = int_args(parser)?;
    range_bounds(&args)?;
    let value = args.iter().map(|n| n.to_string()).collect::<Vec<_>>().join(", ");
    Ok(Terminal::new("Range", value, move |ctx: &mut Context| {
        range(ctx, &args).map(|n| n.to_string())
    }))
}
