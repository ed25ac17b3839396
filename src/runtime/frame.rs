use im::HashMap;

use crate::grammar::Value;

/// One activation record per in-flight rule call.
///
/// `pos` is the cursor at call entry and is what the combinators rewind to
/// when they fail. `vars` holds rule-local bindings written by `set`; the
/// persistent map makes the snapshot handed to receiver events a cheap
/// clone.
#[derive(Debug, Clone)]
pub struct Frame {
    pub name: String,
    pub lvl: usize,
    pub pos: usize,
    pub vars: HashMap<String, Value>,
}

impl Frame {
    /// The synthetic root frame that stands in for an empty stack.
    pub fn root() -> Self {
        Self {
            name: String::new(),
            lvl: 0,
            pos: 0,
            vars: HashMap::new(),
        }
    }

    /// A new frame one level below `parent`, entered at `pos`.
    pub fn child_of(parent: &Frame, name: impl Into<String>, pos: usize) -> Self {
        Self {
            name: name.into(),
            lvl: parent.lvl + 1,
            pos,
            vars: HashMap::new(),
        }
    }
}
