//! The Quill parser VM: cursor and activation stack, call dispatcher,
//! primitive combinator library, receiver dispatch, and trace recording.

pub mod combinators;
pub mod frame;
pub mod parser;
pub mod receiver;
pub mod trace;
