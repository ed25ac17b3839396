//! Shared test harness: a table-backed grammar and receivers that record
//! the engine's lifecycle events.

#![allow(dead_code)]

use std::collections::{HashMap, HashSet};

use quill::prelude::*;

// ============================================================================
// GRAMMAR
// ============================================================================

/// A grammar backed by a name table. `define` tags the stored combinator
/// with the production name, so frames entered through `refer` or
/// `parse_rule` carry it.
pub struct TableGrammar {
    top: Combinator,
    rules: HashMap<String, Combinator>,
}

impl TableGrammar {
    pub fn new(top: Combinator) -> Self {
        Self {
            top,
            rules: HashMap::new(),
        }
    }

    pub fn define(&mut self, name: &str, rule: Combinator) {
        self.rules.insert(name.to_string(), rule.named(name));
    }
}

impl Grammar for TableGrammar {
    fn top(&self) -> Combinator {
        self.top.clone()
    }

    fn rule(&self, name: &str) -> Option<Combinator> {
        self.rules.get(name).cloned()
    }
}

/// Grammar whose top rule is `top` tagged as `TOP`.
pub fn top_grammar(top: Combinator) -> TableGrammar {
    TableGrammar::new(top.named("TOP"))
}

// ============================================================================
// RECEIVERS
// ============================================================================

/// Records every fired hook with its event payload, in order.
#[derive(Default)]
pub struct Recorder {
    pub events: Vec<(String, Event)>,
}

impl Recorder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn names(&self) -> Vec<String> {
        self.events.iter().map(|(name, _)| name.clone()).collect()
    }
}

impl Receiver for Recorder {
    fn has_hook(&self, name: &str) -> bool {
        name.starts_with("try__") || name.starts_with("got__") || name.starts_with("not__")
    }

    fn dispatch(&mut self, name: &str, event: &Event) {
        self.events.push((name.to_string(), event.clone()));
    }
}

/// Only has the hooks it was given; everything else must be skipped.
#[derive(Default)]
pub struct SelectiveRecorder {
    pub hooks: HashSet<String>,
    pub events: Vec<String>,
}

impl SelectiveRecorder {
    pub fn with_hooks<I, S>(hooks: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            hooks: hooks.into_iter().map(Into::into).collect(),
            events: Vec::new(),
        }
    }
}

impl Receiver for SelectiveRecorder {
    fn has_hook(&self, name: &str) -> bool {
        self.hooks.contains(name)
    }

    fn dispatch(&mut self, name: &str, _event: &Event) {
        self.events.push(name.to_string());
    }
}

// ============================================================================
// DRIVERS
// ============================================================================

/// Parse and return the ordered hook names; panics on a failed parse.
pub fn parse_events(grammar: &TableGrammar, input: &str) -> Vec<String> {
    let mut recorder = Recorder::new();
    quill::engine::parse(grammar, input, &mut recorder).expect("parse should succeed");
    recorder.names()
}

/// Parse for the verdict only.
pub fn run_parse(grammar: &TableGrammar, input: &str) -> Result<(), QuillError> {
    let mut receiver = NullReceiver;
    quill::engine::parse(grammar, input, &mut receiver)
}
