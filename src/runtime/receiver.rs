//! Receiver dispatch: deriving hook names from the rule-call path and
//! invoking the user-supplied receiver on rule lifecycle events.
//!
//! Rule names containing an underscore are the grammar's named productions;
//! anonymous combinators between a production and the current frame (`all`,
//! `rep(0,5)`, `chr(0x61)`) are sub-paths within it and become suffixes of
//! the derived name. A receiver distinguishes positions inside a production
//! by hooking the suffixed names.

use std::collections::HashMap;

use crate::grammar::Value;
use crate::runtime::frame::Frame;

// ============================================================================
// EVENT PAYLOAD
// ============================================================================

/// Payload handed to every receiver hook.
#[derive(Debug, Clone)]
pub struct Event {
    /// Input consumed by the frame so far: entry position up to the current
    /// cursor. Always empty for `try`.
    pub text: String,
    /// Cursor position at frame entry.
    pub start: usize,
    /// Level of the current frame.
    pub level: usize,
    /// Rule-local bindings of the current frame.
    pub vars: im::HashMap<String, Value>,
}

// ============================================================================
// RECEIVER INTERFACE
// ============================================================================

/// The user-supplied receiver. The engine probes `has_hook` once per
/// combinator for each of the three lifecycle names and only dispatches the
/// hooks that exist; a missing hook is silently skipped.
pub trait Receiver {
    fn has_hook(&self, name: &str) -> bool;
    fn dispatch(&mut self, name: &str, event: &Event);
}

/// A receiver with no hooks, for parses run only for their verdict.
pub struct NullReceiver;

impl Receiver for NullReceiver {
    fn has_hook(&self, _name: &str) -> bool {
        false
    }
    fn dispatch(&mut self, _name: &str, _event: &Event) {}
}

// ============================================================================
// HOOK RESOLUTION & CACHING
// ============================================================================

/// The memoized lifecycle-hook names of one combinator: present means the
/// receiver has that hook.
#[derive(Debug, Clone, Default)]
pub struct HookNames {
    pub try_: Option<String>,
    pub got: Option<String>,
    pub not: Option<String>,
}

/// Per-parse cache of resolved hook names, keyed by combinator identity.
#[derive(Default)]
pub struct HookCache {
    entries: HashMap<usize, HookNames>,
}

impl HookCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Resolve the hook names for the combinator identified by `key`, using
    /// the current stack to derive the base name on first sight.
    pub fn resolve(&mut self, key: usize, stack: &[Frame], receiver: &dyn Receiver) -> HookNames {
        self.entries
            .entry(key)
            .or_insert_with(|| {
                let base = derive_base(stack);
                let probe = |prefix: &str| {
                    let name = format!("{}__{}", prefix, base);
                    receiver.has_hook(&name).then_some(name)
                };
                HookNames {
                    try_: probe("try"),
                    got: probe("got"),
                    not: probe("not"),
                }
            })
            .clone()
    }
}

/// Derive the hook base name from the activation stack: walk from the top
/// downward collecting frame names, stopping with the first name that
/// contains an underscore (a named production), which becomes the prefix.
pub fn derive_base(stack: &[Frame]) -> String {
    let mut parts: Vec<&str> = Vec::new();
    for frame in stack.iter().rev() {
        parts.push(&frame.name);
        if frame.name.contains('_') {
            break;
        }
    }
    parts.reverse();
    let canonical: Vec<String> = parts.into_iter().map(canonical_name).collect();
    canonical.join("__")
}

/// Canonicalize a frame name for hook lookup: `chr(0x61)` becomes `chr_61`.
fn canonical_name(name: &str) -> String {
    if let Some(hex) = name
        .strip_prefix("chr(0x")
        .and_then(|rest| rest.strip_suffix(')'))
    {
        format!("chr_{}", hex)
    } else {
        name.to_string()
    }
}
