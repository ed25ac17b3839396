//! Top-level parse orchestration.
//!
//! The engine owns nothing: it borrows a grammar, an input, a receiver and
//! optionally a trace sink, wires them into a [`Parser`], and enforces the
//! top-level failure modes (rule failed, input left over). Everything here
//! is a thin convenience over [`Parser::run`].

use crate::errors::QuillError;
use crate::grammar::Grammar;
use crate::runtime::parser::Parser;
use crate::runtime::receiver::Receiver;
use crate::runtime::trace::{TraceOptions, TraceSink, Tracer};

// ============================================================================
// ENTRY POINTS
// ============================================================================

/// Parse `input` from the grammar's top rule.
pub fn parse(
    grammar: &dyn Grammar,
    input: &str,
    receiver: &mut dyn Receiver,
) -> Result<(), QuillError> {
    Parser::new(grammar, input, receiver).run(None)
}

/// Parse `input` starting from the named production.
pub fn parse_rule(
    grammar: &dyn Grammar,
    input: &str,
    receiver: &mut dyn Receiver,
    rule: &str,
) -> Result<(), QuillError> {
    Parser::new(grammar, input, receiver).run(Some(rule))
}

/// Parse with the diagnostic trace enabled.
pub fn parse_traced(
    grammar: &dyn Grammar,
    input: &str,
    receiver: &mut dyn Receiver,
    sink: &mut dyn TraceSink,
    options: TraceOptions,
) -> Result<(), QuillError> {
    let mut parser = Parser::new(grammar, input, receiver);
    parser.set_tracer(Tracer::new(sink, options));
    parser.run(None)
}

// ============================================================================
// BUILT-IN TRACE SINKS
// ============================================================================

/// Collects trace lines in memory for tests or programmatic capture.
#[derive(Debug, Default)]
pub struct BufferTraceSink {
    pub lines: Vec<(usize, String)>,
}

impl BufferTraceSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// The whole trace as one numbered block.
    pub fn text(&self) -> String {
        self.lines
            .iter()
            .map(|(number, text)| format!("{:>4} {}", number, text))
            .collect::<Vec<_>>()
            .join("\n")
    }
}

impl TraceSink for BufferTraceSink {
    fn line(&mut self, number: usize, text: &str) {
        self.lines.push((number, text.to_string()));
    }
}

/// Writes trace lines to stdout for interactive debugging.
pub struct StdoutTraceSink;

impl TraceSink for StdoutTraceSink {
    fn line(&mut self, number: usize, text: &str) {
        println!("{:>4} {}", number, text);
    }
}
