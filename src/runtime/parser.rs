//! The parser VM: input cursor, activation stack, and the call dispatcher
//! that interprets combinator trees.
//!
//! One `Parser` holds exactly one parse: one input, one cursor, one stack,
//! one receiver, one optional tracer. The dispatcher gives every callable
//! form a uniform invocation path; the combinators own all backtracking
//! decisions, so the dispatcher never touches the cursor itself.

use std::rc::Rc;

use miette::SourceSpan;

use crate::errors::{
    DiagnosticInfo, ErrorCategory, ErrorKind, ErrorReporting, QuillError, SourceContext, SourceInfo,
};
use crate::grammar::{Arg, Combinator, Grammar, Kind, Step, Value};
use crate::runtime::frame::Frame;
use crate::runtime::receiver::{Event, HookCache, HookNames, Receiver};
use crate::runtime::trace::{TraceKind, Tracer, TAIL_WIDTH};

/// What the caller of [`Parser::call`] expects back: a match verdict, or an
/// arbitrary value from a value-producing combinator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Expect {
    Bool,
    Any,
}

/// The parser VM for one parse over one input.
pub struct Parser<'a> {
    text: &'a str,
    chars: Vec<char>,
    /// Char index to byte offset, one extra entry for end-of-input.
    offsets: Vec<usize>,
    pos: usize,
    stack: Vec<Frame>,
    root: Frame,
    grammar: &'a dyn Grammar,
    receiver: &'a mut dyn Receiver,
    tracer: Option<Tracer<'a>>,
    hooks: HookCache,
    source: SourceContext,
}

impl<'a> Parser<'a> {
    pub fn new(grammar: &'a dyn Grammar, input: &'a str, receiver: &'a mut dyn Receiver) -> Self {
        let chars: Vec<char> = input.chars().collect();
        let mut offsets = Vec::with_capacity(chars.len() + 1);
        let mut byte = 0;
        for c in &chars {
            offsets.push(byte);
            byte += c.len_utf8();
        }
        offsets.push(byte);

        Self {
            text: input,
            chars,
            offsets,
            pos: 0,
            stack: Vec::new(),
            root: Frame::root(),
            grammar,
            receiver,
            tracer: None,
            hooks: HookCache::new(),
            source: SourceContext::from_input("input", input),
        }
    }

    pub fn set_tracer(&mut self, tracer: Tracer<'a>) {
        self.tracer = Some(tracer);
    }

    // ------------------------------------------------------------------------
    // Cursor and stack access
    // ------------------------------------------------------------------------

    pub fn pos(&self) -> usize {
        self.pos
    }

    pub fn len(&self) -> usize {
        self.chars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chars.is_empty()
    }

    /// Current stack depth, root frame excluded.
    pub fn depth(&self) -> usize {
        self.stack.len()
    }

    /// The top activation record, or the synthetic root when the stack is
    /// empty.
    pub fn state(&self) -> &Frame {
        self.stack.last().unwrap_or(&self.root)
    }

    pub(crate) fn set_pos(&mut self, pos: usize) {
        self.pos = pos;
    }

    pub(crate) fn advance(&mut self) {
        self.pos += 1;
    }

    pub(crate) fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    pub(crate) fn char_at(&self, index: usize) -> Option<char> {
        self.chars.get(index).copied()
    }

    pub(crate) fn grammar_rule(&self, name: &str) -> Option<Combinator> {
        self.grammar.rule(name)
    }

    /// Bind a rule-local variable in the frame enclosing the current one.
    /// `set` runs inside its own frame, which pops as soon as it returns;
    /// the binding belongs to the rule that invoked it.
    pub(crate) fn bind_enclosing(&mut self, var: &str, value: Value) {
        let n = self.stack.len();
        if n >= 2 {
            self.stack[n - 2].vars.insert(var.to_string(), value);
        } else {
            self.root.vars.insert(var.to_string(), value);
        }
    }

    /// Resolve a rule-local variable in the nearest enclosing frame.
    pub(crate) fn lookup_var(&self, var: &str) -> Option<Value> {
        for frame in self.stack.iter().rev() {
            if let Some(v) = frame.vars.get(var) {
                return Some(v.clone());
            }
        }
        self.root.vars.get(var).cloned()
    }

    // ------------------------------------------------------------------------
    // Spans for diagnostics
    // ------------------------------------------------------------------------

    /// A one-char span at the current cursor, for fatal diagnostics.
    pub fn span_here(&self) -> SourceSpan {
        self.span_at(self.pos)
    }

    fn span_at(&self, pos: usize) -> SourceSpan {
        let start = self.offsets[pos.min(self.chars.len())];
        let end = self.offsets[(pos + 1).min(self.chars.len())];
        SourceSpan::from(start..end)
    }

    fn span_rest(&self) -> SourceSpan {
        let start = self.offsets[self.pos.min(self.chars.len())];
        SourceSpan::from(start..self.text.len())
    }

    // ------------------------------------------------------------------------
    // Call dispatch
    // ------------------------------------------------------------------------

    /// Uniformly invoke a callable: literals return verbatim, applications
    /// evaluate their arguments eagerly, rules run the full call protocol.
    pub fn call(&mut self, target: &Combinator, expect: Expect) -> Result<Value, QuillError> {
        let identity = target.identity();
        let (mut rule, mut args, label) = match target {
            Combinator::Literal(n) => return Ok(Value::Int(*n)),
            Combinator::Rule(r) => (Rc::clone(r), Vec::new(), r.name.clone()),
            Combinator::Apply(node) => {
                let args = self.eval_args(&node.args)?;
                match &node.head {
                    Combinator::Rule(r) => (Rc::clone(r), args, node.name.clone()),
                    Combinator::Literal(n) => return Ok(Value::Int(*n)),
                    Combinator::Apply(_) => {
                        return Err(
                            self.bad_call_target("nested application head", self.span_here())
                        );
                    }
                }
            }
        };

        let entry = self.pos;
        let frame = Frame::child_of(self.state(), &label, entry);
        self.stack.push(frame);
        self.trace_event(TraceKind::Try, &label);

        // Receiver events belong to the boolean protocol only.
        let hooks: Option<HookNames> = if expect == Expect::Bool {
            identity.map(|key| self.hooks.resolve(key, &self.stack, &*self.receiver))
        } else {
            None
        };
        if let Some(hooks) = &hooks {
            if let Some(name) = &hooks.try_ {
                let event = self.event_at(entry);
                self.receiver.dispatch(name, &event);
            }
        }

        // Invoke the body; a rule returning another combinator continues
        // under the same frame until a ground value is produced.
        let value = loop {
            match (rule.func)(self, &args)? {
                Step::Done(v) => break v,
                Step::Tail(Combinator::Literal(n)) => break Value::Int(n),
                Step::Tail(Combinator::Rule(r)) => {
                    rule = r;
                    args = Vec::new();
                }
                Step::Tail(Combinator::Apply(node)) => {
                    args = self.eval_args(&node.args)?;
                    match &node.head {
                        Combinator::Rule(r) => rule = Rc::clone(r),
                        Combinator::Literal(n) => break Value::Int(*n),
                        Combinator::Apply(_) => {
                            return Err(
                                self.bad_call_target("nested application head", self.span_here())
                            );
                        }
                    }
                }
            }
        };

        // Enforce the declared return type of the rule that produced the
        // ground value.
        if rule.returns == Kind::Bool && value.as_bool().is_none() {
            return Err(self.type_mismatch("Bool", value.type_name(), self.span_here()));
        }
        if expect == Expect::Any && value.is_nil() {
            return Err(self.type_mismatch("a non-nil value", "Nil", self.span_here()));
        }

        // Value-typed calls end here: no outcome trace, no got/not events.
        if expect != Expect::Bool {
            self.stack.pop();
            return Ok(value);
        }

        let matched = value.truthy();
        let outcome = if matched {
            TraceKind::Got
        } else {
            TraceKind::Not
        };
        self.trace_event(outcome, &label);
        if let Some(hooks) = &hooks {
            let hook = if matched { &hooks.got } else { &hooks.not };
            if let Some(name) = hook {
                let event = self.event_at(entry);
                self.receiver.dispatch(name, &event);
            }
        }
        self.stack.pop();
        Ok(Value::Bool(matched))
    }

    /// Call a combinator for its match verdict.
    pub fn call_bool(&mut self, target: &Combinator) -> Result<bool, QuillError> {
        Ok(self.call(target, Expect::Bool)?.truthy())
    }

    fn eval_args(&mut self, args: &[Arg]) -> Result<Vec<Value>, QuillError> {
        let mut out = Vec::with_capacity(args.len());
        for arg in args {
            out.push(match arg {
                Arg::Call(c) => self.call(c, Expect::Any)?,
                Arg::Val(v) => v.clone(),
                Arg::Thunk(thunk) => thunk(),
            });
        }
        Ok(out)
    }

    fn event_at(&self, start: usize) -> Event {
        let frame = self.state();
        Event {
            text: self.chars[start..self.pos].iter().collect(),
            start,
            level: frame.lvl,
            vars: frame.vars.clone(),
        }
    }

    fn trace_event(&mut self, kind: TraceKind, call: &str) {
        if self.tracer.is_none() {
            return;
        }
        let lvl = self.state().lvl;
        let pos = self.pos;
        let tail: String = self.chars[self.pos..].iter().take(TAIL_WIDTH).collect();
        if let Some(tracer) = self.tracer.as_mut() {
            tracer.record(kind, lvl, call, pos, &tail);
        }
    }

    pub(crate) fn flush_trace(&mut self) {
        if let Some(tracer) = self.tracer.as_mut() {
            tracer.flush();
        }
    }

    // ------------------------------------------------------------------------
    // Top-level entry
    // ------------------------------------------------------------------------

    /// Run the parse from the grammar's top rule, or from `start` when
    /// given. Succeeds only when the rule matches and the whole input is
    /// consumed. The pending trace line is flushed on every exit path.
    pub fn run(&mut self, start: Option<&str>) -> Result<(), QuillError> {
        let top = match start {
            Some(name) => match self.grammar.rule(name) {
                Some(c) => c,
                None => {
                    let err = self.undefined_rule(name, self.span_here());
                    self.flush_trace();
                    return Err(err);
                }
            },
            None => self.grammar.top(),
        };

        let outcome = match self.call(&top, Expect::Bool) {
            Ok(value) => {
                if !value.truthy() {
                    Err(self.parse_failed(top.name(), self.span_here()))
                } else if self.pos < self.chars.len() {
                    Err(self.incomplete_parse(self.pos, self.chars.len(), self.span_rest()))
                } else {
                    Ok(())
                }
            }
            Err(e) => Err(e),
        };
        self.flush_trace();
        outcome
    }
}

impl ErrorReporting for Parser<'_> {
    fn report(&self, kind: ErrorKind, span: SourceSpan) -> QuillError {
        let phase = match kind.category() {
            ErrorCategory::Parse => "parse",
            ErrorCategory::Engine => "engine",
        };
        let error_code = format!("quill::{}::{}", phase, kind.code_suffix());

        QuillError {
            kind,
            source_info: SourceInfo {
                source: self.source.to_named_source(),
                primary_span: span,
                phase: phase.to_string(),
            },
            diagnostic_info: DiagnosticInfo {
                help: None,
                error_code,
            },
        }
    }
}
