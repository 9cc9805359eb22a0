//! Line sources for the read-eval loop.
//!
//! A [`LineSource`] shows the prompt and blocks until one line is available. The end
//! of input is an ordinary [`ReadOutcome`], so the loop decides how to shut down.

use rustyline::DefaultEditor;
use rustyline::error::ReadlineError;
use std::io::{self, BufRead, Write};
use thiserror::Error;

/// Result of asking a [`LineSource`] for one line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReadOutcome {
    /// A complete line, possibly still carrying its line terminator.
    Line(String),
    /// The user interrupted the line being typed (Ctrl-C); nothing to run.
    Interrupted,
    /// No more input will arrive.
    EndOfInput,
}

/// Failures that make further reading impossible. These terminate the shell.
#[derive(Debug, Error)]
pub enum ShellError {
    #[error("cannot read input: {0}")]
    Read(#[from] io::Error),

    #[error("line editor failed: {0}")]
    Editor(#[from] ReadlineError),
}

/// Anything the interpreter can read command lines from.
pub trait LineSource {
    /// Show `prompt` and block until a line, an interrupt or the end of input.
    fn read_line(&mut self, prompt: &str) -> Result<ReadOutcome, ShellError>;
}

/// Interactive source backed by `rustyline`, with in-memory history.
pub struct Editor {
    inner: DefaultEditor,
}

impl Editor {
    pub fn new() -> Result<Self, ShellError> {
        Ok(Self {
            inner: DefaultEditor::new()?,
        })
    }
}

impl LineSource for Editor {
    fn read_line(&mut self, prompt: &str) -> Result<ReadOutcome, ShellError> {
        match self.inner.readline(prompt) {
            Ok(line) => {
                if !line.trim().is_empty() {
                    self.inner.add_history_entry(line.as_str())?;
                }
                Ok(ReadOutcome::Line(line))
            }
            Err(ReadlineError::Interrupted) => Ok(ReadOutcome::Interrupted),
            Err(ReadlineError::Eof) => Ok(ReadOutcome::EndOfInput),
            Err(err) => Err(err.into()),
        }
    }
}

/// Plain source: writes the prompt to `prompt_out` and reads lines from `input`.
///
/// Used when standard input is not a terminal, and by tests.
pub struct Buffered<R, W> {
    input: R,
    prompt_out: W,
}

impl<R: BufRead, W: Write> Buffered<R, W> {
    pub fn new(input: R, prompt_out: W) -> Self {
        Self { input, prompt_out }
    }

    /// Gives back the prompt writer, e.g. to inspect captured prompts.
    pub fn into_prompt_out(self) -> W {
        self.prompt_out
    }
}

impl<R: BufRead, W: Write> LineSource for Buffered<R, W> {
    fn read_line(&mut self, prompt: &str) -> Result<ReadOutcome, ShellError> {
        write!(self.prompt_out, "{}", prompt)?;
        self.prompt_out.flush()?;

        let mut buf = Vec::new();
        if self.input.read_until(b'\n', &mut buf)? == 0 {
            return Ok(ReadOutcome::EndOfInput);
        }
        Ok(ReadOutcome::Line(String::from_utf8_lossy(&buf).into_owned()))
    }
}
