//! # quill
//!
//! A grammar-driven, backtracking recursive-descent parser VM. Quill
//! interprets a grammar expressed as a tree of combinators (`all`, `any`,
//! `rep`, `chr`, `rng`, `but`, `chk`, `case`, `flip`, `set`, ...) and
//! reports rule lifecycle events (try/got/not) to a user-supplied receiver,
//! which accumulates whatever result the application needs. An optional
//! trace recorder renders a human-readable diagnostic stream of the parse.

pub use crate::errors::{ErrorKind, ErrorReporting, QuillError};

pub mod engine;
pub mod errors;
pub mod grammar;
pub mod runtime;

/// Everything a grammar author or embedder typically needs.
pub mod prelude {
    pub use crate::engine::{parse, parse_rule, parse_traced, BufferTraceSink, StdoutTraceSink};
    pub use crate::errors::{ErrorKind, ErrorReporting, QuillError};
    pub use crate::grammar::{Arg, Combinator, Grammar, Kind, Step, Value};
    pub use crate::runtime::combinators::{
        add, all, any, auto_detect_indent, but, case, chk, chr, empty, end_of_stream, exclude,
        flip, lit, max, refer, rep, rep_bounds, rng, set, start_of_line, sub,
    };
    pub use crate::runtime::parser::{Expect, Parser};
    pub use crate::runtime::receiver::{Event, NullReceiver, Receiver};
    pub use crate::runtime::trace::{TraceKind, TraceOptions, TraceSink, Tracer};
}
