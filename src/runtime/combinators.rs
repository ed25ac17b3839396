//! The primitive combinator library.
//!
//! Each public factory builds a labeled application of a primitive rule;
//! the primitive bodies below implement the matching semantics. Children
//! travel through the argument list as ground `Value::Comb` values so that
//! argument evaluation does not invoke them - only numeric bounds are
//! passed as `Arg::Call` and resolved eagerly.
//!
//! Backtracking discipline: a combinator that fails is responsible for
//! resetting the cursor to its entry position. `any` deliberately does not
//! reset between alternatives; its children own their own rollback.

use im::HashMap;

use crate::errors::{ErrorReporting, QuillError};
use crate::grammar::{Arg, Combinator, Kind, Step, Value};
use crate::runtime::parser::{Expect, Parser};

// ============================================================================
// ARGUMENT HELPERS
// ============================================================================

/// Call an argument slot as a sub-parser. Anything that is not a combinator
/// is a fatal misconfiguration, reported with the offending category.
fn call_value(p: &mut Parser, value: &Value, expect: Expect) -> Result<Value, QuillError> {
    match value {
        Value::Comb(c) => p.call(c, expect),
        other => Err(p.bad_call_target(other.type_name(), p.span_here())),
    }
}

fn call_match(p: &mut Parser, value: &Value) -> Result<bool, QuillError> {
    Ok(call_value(p, value, Expect::Bool)?.truthy())
}

fn int_arg(p: &Parser, args: &[Value], index: usize, combinator: &str) -> Result<i64, QuillError> {
    match args.get(index) {
        Some(Value::Int(n)) => Ok(*n),
        Some(other) => Err(p.type_mismatch("Int", other.type_name(), p.span_here())),
        None => Err(p.missing_child(combinator, p.span_here())),
    }
}

fn str_arg<'v>(
    p: &Parser,
    args: &'v [Value],
    index: usize,
    combinator: &str,
) -> Result<&'v str, QuillError> {
    match args.get(index) {
        Some(Value::Str(s)) => Ok(s),
        Some(other) => Err(p.type_mismatch("Str", other.type_name(), p.span_here())),
        None => Err(p.missing_child(combinator, p.span_here())),
    }
}

fn map_arg<'v>(
    p: &Parser,
    args: &'v [Value],
    index: usize,
    combinator: &str,
) -> Result<&'v HashMap<String, Value>, QuillError> {
    match args.get(index) {
        Some(Value::Map(m)) => Ok(m),
        Some(other) => Err(p.type_mismatch("Map", other.type_name(), p.span_here())),
        None => Err(p.missing_child(combinator, p.span_here())),
    }
}

fn children(combinators: Vec<Combinator>) -> Vec<Arg> {
    combinators
        .into_iter()
        .map(|c| Arg::Val(Value::Comb(c)))
        .collect()
}

// ============================================================================
// SEQUENCE AND CHOICE
// ============================================================================

/// Succeed iff all children succeed in order, consuming input cumulatively.
/// Resets the cursor on failure.
pub fn all(parts: Vec<Combinator>) -> Combinator {
    Combinator::apply("all", Combinator::rule("all", Kind::Bool, all_rule), children(parts))
}

fn all_rule(p: &mut Parser, args: &[Value]) -> Result<Step, QuillError> {
    if args.is_empty() {
        return Err(p.missing_child("all", p.span_here()));
    }
    let entry = p.state().pos;
    for part in args {
        if !call_match(p, part)? {
            p.set_pos(entry);
            return Ok(Step::done_bool(false));
        }
    }
    Ok(Step::done_bool(true))
}

/// Try children in order; the first success wins. Does not reset the cursor
/// between alternatives or on overall failure - children own their rollback.
pub fn any(parts: Vec<Combinator>) -> Combinator {
    Combinator::apply("any", Combinator::rule("any", Kind::Bool, any_rule), children(parts))
}

fn any_rule(p: &mut Parser, args: &[Value]) -> Result<Step, QuillError> {
    for part in args {
        if call_match(p, part)? {
            return Ok(Step::done_bool(true));
        }
    }
    Ok(Step::done_bool(false))
}

// ============================================================================
// REPETITION
// ============================================================================

/// Repeat `f` between `min` and `max` times; `max == 0` means unbounded.
/// A zero-progress success under `min == 0` short-circuits to success so
/// that repetition over an empty match terminates.
pub fn rep(min: i64, max: i64, f: Combinator) -> Combinator {
    Combinator::apply(
        format!("rep({},{})", min, max),
        Combinator::rule("rep", Kind::Bool, rep_rule),
        vec![
            Arg::Call(Combinator::Literal(min)),
            Arg::Call(Combinator::Literal(max)),
            Arg::Val(Value::Comb(f)),
        ],
    )
}

/// `rep` with computed bounds: `add`/`sub` expressions or literals, called
/// with an `any` expectation when the application is dispatched.
pub fn rep_bounds(min: Combinator, max: Combinator, f: Combinator) -> Combinator {
    let label = format!("rep({},{})", min, max);
    Combinator::apply(
        label,
        Combinator::rule("rep", Kind::Bool, rep_rule),
        vec![Arg::Call(min), Arg::Call(max), Arg::Val(Value::Comb(f))],
    )
}

fn rep_rule(p: &mut Parser, args: &[Value]) -> Result<Step, QuillError> {
    let min = int_arg(p, args, 0, "rep")?;
    let max = int_arg(p, args, 1, "rep")?;
    let f = match args.get(2) {
        Some(f) => f,
        None => return Err(p.missing_child("rep", p.span_here())),
    };
    let entry = p.state().pos;
    let mut count: i64 = 0;
    while p.pos() < p.len() && (max == 0 || count < max) {
        let before = p.pos();
        if !call_match(p, f)? {
            break;
        }
        count += 1;
        if min == 0 && p.pos() == before {
            return Ok(Step::done_bool(true));
        }
    }
    if count >= min && (max == 0 || count <= max) {
        Ok(Step::done_bool(true))
    } else {
        p.set_pos(entry);
        Ok(Step::done_bool(false))
    }
}

// ============================================================================
// TERMINAL MATCHERS
// ============================================================================

/// Match one exact char and advance.
pub fn chr(c: char) -> Combinator {
    Combinator::apply(
        format!("chr(0x{:x})", c as u32),
        Combinator::rule("chr", Kind::Bool, chr_rule),
        vec![Arg::Val(Value::Str(c.to_string()))],
    )
}

fn chr_rule(p: &mut Parser, args: &[Value]) -> Result<Step, QuillError> {
    let want = str_arg(p, args, 0, "chr")?.chars().next();
    let matched = matches!((p.peek(), want), (Some(c), Some(w)) if c == w);
    if matched {
        p.advance();
    }
    Ok(Step::done_bool(matched))
}

/// Match one char in the inclusive range `[lo, hi]` and advance.
pub fn rng(lo: char, hi: char) -> Combinator {
    Combinator::apply(
        format!("rng(0x{:x},0x{:x})", lo as u32, hi as u32),
        Combinator::rule("rng", Kind::Bool, rng_rule),
        vec![
            Arg::Val(Value::Str(lo.to_string())),
            Arg::Val(Value::Str(hi.to_string())),
        ],
    )
}

fn rng_rule(p: &mut Parser, args: &[Value]) -> Result<Step, QuillError> {
    let lo = str_arg(p, args, 0, "rng")?.chars().next();
    let hi = str_arg(p, args, 1, "rng")?.chars().next();
    let matched = match (p.peek(), lo, hi) {
        (Some(c), Some(lo), Some(hi)) => lo <= c && c <= hi,
        _ => false,
    };
    if matched {
        p.advance();
    }
    Ok(Step::done_bool(matched))
}

// ============================================================================
// LOOKAHEAD
// ============================================================================

/// Succeed iff the first child matches and none of the remaining children
/// would match at the same entry position. Consumes what the first child
/// consumed.
pub fn but(positive: Combinator, negatives: Vec<Combinator>) -> Combinator {
    let mut args = vec![Arg::Val(Value::Comb(positive))];
    args.extend(children(negatives));
    Combinator::apply("but", Combinator::rule("but", Kind::Bool, but_rule), args)
}

fn but_rule(p: &mut Parser, args: &[Value]) -> Result<Step, QuillError> {
    let positive = match args.first() {
        Some(f) => f,
        None => return Err(p.missing_child("but", p.span_here())),
    };
    let entry = p.state().pos;
    if !call_match(p, positive)? {
        p.set_pos(entry);
        return Ok(Step::done_bool(false));
    }
    let matched_pos = p.pos();
    p.set_pos(entry);
    for negative in &args[1..] {
        if call_match(p, negative)? {
            p.set_pos(entry);
            return Ok(Step::done_bool(false));
        }
        p.set_pos(entry);
    }
    p.set_pos(matched_pos);
    Ok(Step::done_bool(true))
}

/// Zero-width assertion. `"="` is positive lookahead, `"!"` negative
/// lookahead, `"<="` a one-char lookbehind (clamped at the start of input).
/// The cursor is always restored.
pub fn chk(kind: &str, expr: Combinator) -> Combinator {
    Combinator::apply(
        format!("chk({})", kind),
        Combinator::rule("chk", Kind::Bool, chk_rule),
        vec![
            Arg::Val(Value::Str(kind.to_string())),
            Arg::Val(Value::Comb(expr)),
        ],
    )
}

fn chk_rule(p: &mut Parser, args: &[Value]) -> Result<Step, QuillError> {
    let kind = str_arg(p, args, 0, "chk")?;
    match kind {
        "=" | "!" | "<=" => {}
        other => {
            let label = format!("chk kind '{}'", other);
            return Err(p.bad_call_target(&label, p.span_here()));
        }
    }
    let negate = kind == "!";
    let behind = kind == "<=";
    let expr = match args.get(1) {
        Some(e) => e,
        None => return Err(p.missing_child("chk", p.span_here())),
    };
    let entry = p.state().pos;
    if behind {
        p.set_pos(entry.saturating_sub(1));
    }
    let matched = call_match(p, expr)?;
    p.set_pos(entry);
    Ok(Step::done_bool(if negate { !matched } else { matched }))
}

// ============================================================================
// STATE-DRIVEN DISPATCH
// ============================================================================

/// Look up a rule-local variable and dispatch to the mapped rule. A missing
/// entry is fatal.
pub fn case(var: &str, entries: Vec<(&str, Combinator)>) -> Combinator {
    let map: HashMap<String, Value> = entries
        .into_iter()
        .map(|(k, v)| (k.to_string(), Value::Comb(v)))
        .collect();
    Combinator::apply(
        format!("case({})", var),
        Combinator::rule("case", Kind::Bool, case_rule),
        vec![
            Arg::Val(Value::Str(var.to_string())),
            Arg::Val(Value::Map(map)),
        ],
    )
}

fn case_rule(p: &mut Parser, args: &[Value]) -> Result<Step, QuillError> {
    let var = str_arg(p, args, 0, "case")?;
    let map = map_arg(p, args, 1, "case")?;
    let value = match p.lookup_var(var) {
        Some(v) => v,
        None => return Err(p.missing_key(var, "<unbound>", p.span_here())),
    };
    let key = value.as_key();
    match map.get(&key) {
        Some(Value::Comb(rule)) => Ok(Step::Tail(rule.clone())),
        Some(other) => Err(p.bad_call_target(other.type_name(), p.span_here())),
        None => Err(p.missing_key(var, &key, p.span_here())),
    }
}

/// Like `case`, but a mapped ground value (a string, a number) is returned
/// directly instead of being called. A falsy mapped value takes the
/// missing-key path.
pub fn flip(var: &str, entries: Vec<(&str, Value)>) -> Combinator {
    let map: HashMap<String, Value> = entries
        .into_iter()
        .map(|(k, v)| (k.to_string(), v))
        .collect();
    Combinator::apply(
        format!("flip({})", var),
        Combinator::rule("flip", Kind::Any, flip_rule),
        vec![
            Arg::Val(Value::Str(var.to_string())),
            Arg::Val(Value::Map(map)),
        ],
    )
}

fn flip_rule(p: &mut Parser, args: &[Value]) -> Result<Step, QuillError> {
    let var = str_arg(p, args, 0, "flip")?;
    let map = map_arg(p, args, 1, "flip")?;
    let value = match p.lookup_var(var) {
        Some(v) => v,
        None => return Err(p.missing_key(var, "<unbound>", p.span_here())),
    };
    let key = value.as_key();
    match map.get(&key) {
        Some(Value::Comb(rule)) => Ok(Step::Tail(rule.clone())),
        Some(ground) if ground.truthy() => Ok(Step::Done(ground.clone())),
        _ => Err(p.missing_key(var, &key, p.span_here())),
    }
}

/// Evaluate `expr` as a value and bind it under `var` in the enclosing
/// rule's frame. Always succeeds; the binding is visible to later children
/// of the same rule.
pub fn set(var: &str, expr: Combinator) -> Combinator {
    Combinator::apply(
        format!("set({})", var),
        Combinator::rule("set", Kind::Bool, set_rule),
        vec![Arg::Val(Value::Str(var.to_string())), Arg::Call(expr)],
    )
}

fn set_rule(p: &mut Parser, args: &[Value]) -> Result<Step, QuillError> {
    let var = str_arg(p, args, 0, "set")?.to_string();
    let value = match args.get(1) {
        Some(v) => v.clone(),
        None => return Err(p.missing_child("set", p.span_here())),
    };
    p.bind_enclosing(&var, value);
    Ok(Step::done_bool(true))
}

// ============================================================================
// ARITHMETIC
// ============================================================================

/// Sum of two numeric arguments, as a value-typed combinator.
pub fn add(x: Combinator, y: Combinator) -> Combinator {
    let label = format!("add({},{})", x, y);
    Combinator::apply(
        label,
        Combinator::rule("add", Kind::Any, add_rule),
        vec![Arg::Call(x), Arg::Call(y)],
    )
}

fn add_rule(p: &mut Parser, args: &[Value]) -> Result<Step, QuillError> {
    let x = int_arg(p, args, 0, "add")?;
    let y = int_arg(p, args, 1, "add")?;
    Ok(Step::Done(Value::Int(x + y)))
}

/// Difference of two numeric arguments, as a value-typed combinator.
pub fn sub(x: Combinator, y: Combinator) -> Combinator {
    let label = format!("sub({},{})", x, y);
    Combinator::apply(
        label,
        Combinator::rule("sub", Kind::Any, sub_rule),
        vec![Arg::Call(x), Arg::Call(y)],
    )
}

fn sub_rule(p: &mut Parser, args: &[Value]) -> Result<Step, QuillError> {
    let x = int_arg(p, args, 0, "sub")?;
    let y = int_arg(p, args, 1, "sub")?;
    Ok(Step::Done(Value::Int(x - y)))
}

/// A numeric literal combinator, for `rep` bounds and `set` expressions.
pub fn lit(n: i64) -> Combinator {
    Combinator::Literal(n)
}

// ============================================================================
// RESERVED PLACEHOLDERS
// ============================================================================

/// Reserved: not yet enforced by the engine; always succeeds.
pub fn max(n: i64) -> Combinator {
    Combinator::apply(
        format!("max({})", n),
        Combinator::rule("max", Kind::Bool, succeed_rule),
        vec![Arg::Val(Value::Int(n))],
    )
}

/// Reserved: not yet enforced by the engine; always succeeds. The excluded
/// rule is carried as data and never invoked.
pub fn exclude(rule: Combinator) -> Combinator {
    let label = format!("exclude({})", rule);
    Combinator::apply(
        label,
        Combinator::rule("exclude", Kind::Bool, succeed_rule),
        vec![Arg::Val(Value::Comb(rule))],
    )
}

fn succeed_rule(_p: &mut Parser, _args: &[Value]) -> Result<Step, QuillError> {
    Ok(Step::done_bool(true))
}

// ============================================================================
// BUILT-IN TERMINALS
// ============================================================================

/// True at the start of input or immediately after a newline.
pub fn start_of_line() -> Combinator {
    Combinator::rule("start_of_line", Kind::Bool, start_of_line_rule)
}

fn start_of_line_rule(p: &mut Parser, _args: &[Value]) -> Result<Step, QuillError> {
    let at_start = p.pos() == 0 || p.char_at(p.pos() - 1) == Some('\n');
    Ok(Step::done_bool(at_start))
}

/// True at or past the end of input.
pub fn end_of_stream() -> Combinator {
    Combinator::rule("end_of_stream", Kind::Bool, end_of_stream_rule)
}

fn end_of_stream_rule(p: &mut Parser, _args: &[Value]) -> Result<Step, QuillError> {
    Ok(Step::done_bool(p.pos() >= p.len()))
}

/// Always true; consumes nothing.
pub fn empty() -> Combinator {
    Combinator::rule("empty", Kind::Bool, empty_rule)
}

fn empty_rule(_p: &mut Parser, _args: &[Value]) -> Result<Step, QuillError> {
    Ok(Step::done_bool(true))
}

/// Placeholder indentation probe; returns the integer 1.
pub fn auto_detect_indent() -> Combinator {
    Combinator::rule("auto_detect_indent", Kind::Any, auto_detect_indent_rule)
}

fn auto_detect_indent_rule(_p: &mut Parser, _args: &[Value]) -> Result<Step, QuillError> {
    Ok(Step::Done(Value::Int(1)))
}

/// Reference to a named production, resolved through the grammar at call
/// time. This is how recursive productions are expressed in a combinator
/// tree that is built once.
pub fn refer(name: &str) -> Combinator {
    Combinator::rule(name, Kind::Bool, refer_rule)
}

fn refer_rule(p: &mut Parser, _args: &[Value]) -> Result<Step, QuillError> {
    let name = p.state().name.clone();
    match p.grammar_rule(&name) {
        Some(c) => Ok(Step::Tail(c)),
        None => Err(p.undefined_rule(&name, p.span_here())),
    }
}
