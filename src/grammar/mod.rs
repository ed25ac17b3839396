//! Grammar data model for the Quill engine.
//!
//! A grammar is a tree of [`Combinator`] values: numeric literals, named
//! rules wrapping a body function, and applications pairing a rule with a
//! fixed argument list. The engine interprets this tree; constructing it is
//! the job of the combinator factories in [`crate::runtime::combinators`]
//! and of the companion grammar consumed through the [`Grammar`] trait.

use std::fmt;
use std::rc::Rc;

use crate::errors::QuillError;
use crate::runtime::parser::Parser;

pub mod value;

pub use value::Value;

// ============================================================================
// CORE DATA STRUCTURES
// ============================================================================

/// Declared return kind of a rule. Boolean rules participate in match
/// dispatch and receiver events; `Any` rules produce values (`add`, `sub`,
/// `flip`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Kind {
    Bool,
    Any,
}

/// What a rule body hands back to the dispatcher: either a ground value, or
/// another combinator to continue with under the same activation frame.
pub enum Step {
    Done(Value),
    Tail(Combinator),
}

impl Step {
    /// Shorthand for a ground boolean result.
    pub fn done_bool(b: bool) -> Self {
        Step::Done(Value::Bool(b))
    }
}

/// Body function of a rule. Plain function pointers keep the model `Clone`
/// and comparable by rule identity.
pub type RuleFn = for<'a, 'p> fn(&'a mut Parser<'p>, &'a [Value]) -> Result<Step, QuillError>;

/// A deferred argument producer, invoked at dispatch time.
pub type ThunkFn = dyn Fn() -> Value;

/// A named parsing function with a declared return kind.
#[derive(Clone)]
pub struct Rule {
    /// Trace name; also the frame name when the rule is called bare.
    pub name: String,
    pub returns: Kind,
    pub func: RuleFn,
}

/// A combinator paired with a fixed argument list, resolved at call time.
/// The label is the factory's synthetic tag (`rep(0,5)`, `chr(0x61)`) and
/// names the activation frame.
pub struct ApplyNode {
    pub name: String,
    pub head: Combinator,
    pub args: Vec<Arg>,
}

/// An argument slot of an application.
#[derive(Clone)]
pub enum Arg {
    /// A combinator to be called eagerly (with an `any` expectation) when
    /// the application is dispatched. Numeric bounds travel this way.
    Call(Combinator),
    /// A ground value passed through unchanged. Sub-parsers travel this way
    /// so they are not invoked during argument evaluation.
    Val(Value),
    /// A thunk invoked at dispatch time to produce its value.
    Thunk(Rc<ThunkFn>),
}

/// A fragment of grammar: one of the three callable forms the dispatcher
/// understands.
#[derive(Clone)]
pub enum Combinator {
    /// A number returned verbatim by the dispatcher - no frame, no events.
    Literal(i64),
    /// A named parsing function.
    Rule(Rc<Rule>),
    /// A rule application with fixed arguments.
    Apply(Rc<ApplyNode>),
}

// ============================================================================
// PUBLIC API IMPLEMENTATION
// ============================================================================

impl Combinator {
    /// Construct a bare rule.
    pub fn rule(name: impl Into<String>, returns: Kind, func: RuleFn) -> Self {
        Combinator::Rule(Rc::new(Rule {
            name: name.into(),
            returns,
            func,
        }))
    }

    /// Construct an application with a display label.
    pub fn apply(name: impl Into<String>, head: Combinator, args: Vec<Arg>) -> Self {
        Combinator::Apply(Rc::new(ApplyNode {
            name: name.into(),
            head,
            args,
        }))
    }

    /// The frame/trace name of this combinator.
    pub fn name(&self) -> &str {
        match self {
            Combinator::Literal(_) => "literal",
            Combinator::Rule(r) => &r.name,
            Combinator::Apply(a) => &a.name,
        }
    }

    /// Re-label this combinator with a trace name, as grammars do when a
    /// named production is defined directly as a combinator expression.
    /// The result is a fresh node with its own dispatch identity.
    pub fn named(&self, label: impl Into<String>) -> Combinator {
        match self {
            Combinator::Literal(n) => Combinator::Literal(*n),
            Combinator::Rule(r) => Combinator::Rule(Rc::new(Rule {
                name: label.into(),
                returns: r.returns,
                func: r.func,
            })),
            Combinator::Apply(a) => Combinator::Apply(Rc::new(ApplyNode {
                name: label.into(),
                head: a.head.clone(),
                args: a.args.clone(),
            })),
        }
    }

    /// Stable identity for the receiver-hook cache. Literals have none;
    /// they never produce events.
    pub fn identity(&self) -> Option<usize> {
        match self {
            Combinator::Literal(_) => None,
            Combinator::Rule(r) => Some(Rc::as_ptr(r) as usize),
            Combinator::Apply(a) => Some(Rc::as_ptr(a) as usize),
        }
    }
}

impl fmt::Display for Combinator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Combinator::Literal(n) => write!(f, "{}", n),
            Combinator::Rule(r) => write!(f, "{}", r.name),
            Combinator::Apply(a) => write!(f, "{}", a.name),
        }
    }
}

impl fmt::Debug for Combinator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Combinator::Literal(n) => write!(f, "Literal({})", n),
            Combinator::Rule(r) => write!(f, "Rule({})", r.name),
            Combinator::Apply(a) => write!(f, "Apply({})", a.name),
        }
    }
}

/// Equality is identity for rules and applications, value for literals.
/// Dispatch caching and grammar sharing both rely on this.
impl PartialEq for Combinator {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Combinator::Literal(a), Combinator::Literal(b)) => a == b,
            (Combinator::Rule(a), Combinator::Rule(b)) => Rc::ptr_eq(a, b),
            (Combinator::Apply(a), Combinator::Apply(b)) => Rc::ptr_eq(a, b),
            _ => false,
        }
    }
}

// ============================================================================
// GRAMMAR INTERFACE
// ============================================================================

/// The companion grammar the engine consumes: a starting combinator and a
/// lookup for named productions. Production references created with
/// [`crate::runtime::combinators::refer`] resolve through `rule` at call
/// time, which is how recursive productions are expressed in a tree that is
/// built once.
pub trait Grammar {
    /// The starting combinator.
    fn top(&self) -> Combinator;

    /// Look up a named production.
    fn rule(&self, name: &str) -> Option<Combinator>;
}
