//! Trace recording: the human-readable diagnostic stream of a parse.
//!
//! Each call event produces one line. A one-slot lookahead coalesces a
//! pending `?` with the `+`/`x` of the same call into a single `=`/`!`
//! line, which keeps leaf matches to one line each. Lines go to a
//! [`TraceSink`] so tests can capture the stream and tools can redirect it.

use std::collections::HashSet;

// ============================================================================
// SINK INTERFACE
// ============================================================================

/// Destination for finished trace lines. Line numbers increase
/// monotonically and are assigned when a line is flushed.
pub trait TraceSink {
    fn line(&mut self, number: usize, text: &str);
}

// ============================================================================
// EVENTS AND OPTIONS
// ============================================================================

/// The three call events the recorder observes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TraceKind {
    Try,
    Got,
    Not,
}

impl TraceKind {
    fn glyph(self) -> char {
        match self {
            TraceKind::Try => '?',
            TraceKind::Got => '+',
            TraceKind::Not => 'x',
        }
    }
}

/// Cosmetic trace configuration.
#[derive(Debug, Clone, Default)]
pub struct TraceOptions {
    /// Rule names whose subtree is suppressed in the stream. The rule's own
    /// entry and exit lines still appear.
    pub quiet: HashSet<String>,
    /// Defer tracing until this rule is first tried.
    pub start_at: Option<String>,
}

impl TraceOptions {
    pub fn quiet_rules<I, S>(rules: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            quiet: rules.into_iter().map(Into::into).collect(),
            start_at: None,
        }
    }
}

// ============================================================================
// RECORDER
// ============================================================================

const CALL_WIDTH: usize = 30;
pub(crate) const TAIL_WIDTH: usize = 30;

struct PendingLine {
    glyph: char,
    lvl: usize,
    call: String,
    pos: usize,
    tail: String,
}

/// The trace recorder. Holds at most one unflushed line so a success or
/// failure arriving immediately after its own `?` can rewrite it in place.
pub struct Tracer<'a> {
    sink: &'a mut dyn TraceSink,
    options: TraceOptions,
    pending: Option<PendingLine>,
    next_line: usize,
    quiet_depth: usize,
    active: bool,
}

impl<'a> Tracer<'a> {
    pub fn new(sink: &'a mut dyn TraceSink, options: TraceOptions) -> Self {
        let active = options.start_at.is_none();
        Self {
            sink,
            options,
            pending: None,
            next_line: 1,
            quiet_depth: 0,
            active,
        }
    }

    /// Record one call event. `pos` and `tail` are captured now; the glyph
    /// may still be rewritten by the next event.
    pub fn record(&mut self, kind: TraceKind, lvl: usize, call: &str, pos: usize, tail: &str) {
        if !self.active {
            match (&self.options.start_at, kind) {
                (Some(rule), TraceKind::Try) if rule.as_str() == call => self.active = true,
                _ => return,
            }
        }

        let quiet_rule = self.options.quiet.contains(call);
        let suppress = match kind {
            TraceKind::Try => {
                let suppress = self.quiet_depth > 0;
                if quiet_rule {
                    self.quiet_depth += 1;
                }
                suppress
            }
            TraceKind::Got | TraceKind::Not => {
                if quiet_rule && self.quiet_depth > 0 {
                    self.quiet_depth -= 1;
                }
                self.quiet_depth > 0
            }
        };
        if suppress {
            return;
        }

        // Coalesce: a '?' superseded by the matching '+'/'x' becomes '='/'!'
        // and the incoming line is redundant.
        if let Some(p) = &mut self.pending {
            if p.glyph == '?' && p.lvl == lvl && p.call == call && kind != TraceKind::Try {
                p.glyph = match kind {
                    TraceKind::Got => '=',
                    _ => '!',
                };
                return;
            }
        }

        self.flush_pending();
        self.pending = Some(PendingLine {
            glyph: kind.glyph(),
            lvl,
            call: call.to_string(),
            pos,
            tail: escape_tail(tail),
        });
    }

    /// Flush any residual line; called at end of parse and before a fatal
    /// error surfaces.
    pub fn flush(&mut self) {
        self.flush_pending();
    }

    fn flush_pending(&mut self) {
        if let Some(p) = self.pending.take() {
            let text = format!(
                "{}{} {:<call_w$}  {:>4} '{}'",
                indent(p.lvl),
                p.glyph,
                p.call,
                p.pos,
                p.tail,
                call_w = CALL_WIDTH,
            );
            self.sink.line(self.next_line, &text);
            self.next_line += 1;
        }
    }
}

/// Indentation is `lvl` spaces with the decimal digits of the level
/// overwriting the leading spaces.
fn indent(lvl: usize) -> String {
    if lvl == 0 {
        return String::new();
    }
    let digits = lvl.to_string();
    let mut s = String::with_capacity(lvl);
    let take = digits.len().min(lvl);
    s.push_str(&digits[..take]);
    while s.len() < lvl {
        s.push(' ');
    }
    s
}

/// The input window shown after each line: up to [`TAIL_WIDTH`] chars with
/// tabs and line breaks escaped.
fn escape_tail(tail: &str) -> String {
    let mut out = String::new();
    for c in tail.chars().take(TAIL_WIDTH) {
        match c {
            '\t' => out.push_str("\\t"),
            '\r' => out.push_str("\\r"),
            '\n' => out.push_str("\\n"),
            other => out.push(other),
        }
    }
    out
}
