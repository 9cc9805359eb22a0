use std::io::Write;

/// Conventional process exit code type used by this crate.
///
/// A value of 0 indicates success; any non-zero value indicates failure.
/// This mirrors the convention used by POSIX shells and many command-line tools.
pub type ExitCode = i32;

/// What the read-eval loop should do after a command has been dispatched.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Continuation {
    /// Prompt for and read another line.
    Continue,
    /// Leave the loop and terminate the shell successfully.
    Stop,
}

/// Output streams handed to a builtin for one invocation.
///
/// `out` receives regular output (listings, the working directory, confirmations),
/// `err` receives diagnostics. Both are borrowed from the interpreter, so tests can
/// capture them with plain `Vec<u8>` buffers.
pub struct Streams<'a> {
    /// Standard output of the command.
    pub out: &'a mut dyn Write,
    /// Standard error of the command.
    pub err: &'a mut dyn Write,
}

impl<'a> Streams<'a> {
    pub fn new(out: &'a mut dyn Write, err: &'a mut dyn Write) -> Self {
        Self { out, err }
    }
}

/// In-process handler of a builtin command.
///
/// Receives the full token sequence (token 0 is the command name) and reports
/// whether the shell keeps running.
pub type Handler = fn(&[String], &mut Streams<'_>) -> Continuation;
