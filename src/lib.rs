//! A tiny line-oriented shell.
//!
//! Each input line is split on whitespace into tokens. The first token names either a
//! builtin, executed in-process from a fixed table, or an external program, which is
//! spawned and waited for. The loop ends on `exit` or at the end of input.
//!
//! The main entry point is [`Interpreter`]. Line sources live in [`input`]; the
//! tokenizer is in [`lexer`] and process launching in [`external`].

pub mod builtin;
pub mod command;
pub mod external;
pub mod input;
mod interpreter;
pub mod lexer;
pub mod logging;

pub use command::Continuation;
/// Just a convenient re-export of the interactive command runner.
///
/// See [`Interpreter`] for the high-level API and examples.
pub use interpreter::{DEFAULT_PROMPT, Interpreter};
