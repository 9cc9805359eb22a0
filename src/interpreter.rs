use crate::builtin;
use crate::command::{Continuation, Streams};
use crate::external::{self, LaunchOutcome};
use crate::input::{LineSource, ReadOutcome, ShellError};
use crate::lexer;
use std::io::{self, Write};
use tracing::{debug, trace};

/// Prompt shown before each line unless configured otherwise.
pub const DEFAULT_PROMPT: &str = "> ";

/// A minimal shell-like interpreter that can execute built-in and external commands.
///
/// Builtins come from the static table in [`crate::builtin`]; every other command name
/// is launched as an external program. Output of builtins and diagnostics are written
/// to `out` and `err`, which default to the process's standard streams.
///
/// Example
/// ```
/// use lsh::{Continuation, Interpreter};
/// let mut sh = Interpreter::new(Vec::<u8>::new(), Vec::<u8>::new());
/// let tokens = lsh::lexer::split_into_tokens("help");
/// assert_eq!(sh.dispatch(&tokens), Continuation::Continue);
/// assert!(String::from_utf8_lossy(sh.output()).contains("mkdir"));
/// ```
pub struct Interpreter<O = io::Stdout, E = io::Stderr> {
    out: O,
    err: E,
    prompt: String,
}

impl<O: Write, E: Write> Interpreter<O, E> {
    /// Create an interpreter writing to the given streams.
    pub fn new(out: O, err: E) -> Self {
        Self {
            out,
            err,
            prompt: DEFAULT_PROMPT.to_string(),
        }
    }

    pub fn with_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.prompt = prompt.into();
        self
    }

    pub fn prompt(&self) -> &str {
        &self.prompt
    }

    pub fn output(&self) -> &O {
        &self.out
    }

    pub fn errors(&self) -> &E {
        &self.err
    }

    /// Run one tokenized command line.
    ///
    /// Empty input does nothing. A builtin decides the continuation itself; an external
    /// command never stops the shell, whatever its outcome.
    pub fn dispatch(&mut self, tokens: &[String]) -> Continuation {
        let Some(name) = tokens.first() else {
            return Continuation::Continue;
        };

        if let Some(entry) = builtin::lookup(name) {
            trace!(command = %name, "dispatching to builtin");
            let flow = entry.invoke(tokens, &mut Streams::new(&mut self.out, &mut self.err));
            let _ = self.out.flush();
            return flow;
        }

        debug!(command = %name, "launching external command");
        // Keep earlier builtin output ahead of whatever the child prints.
        let _ = self.out.flush();
        match external::launch(tokens) {
            LaunchOutcome::NormalExit(code) => {
                debug!(command = %name, code, "external command exited");
            }
            LaunchOutcome::Signaled {
                signal,
                core_dumped,
            } => {
                let _ = writeln!(self.err, "{}", signal_report(name, signal, core_dumped));
            }
            LaunchOutcome::LaunchFailed(e) => {
                let _ = writeln!(self.err, "lsh: {}", e);
            }
        }
        Continuation::Continue
    }

    /// Read-eval loop: prompt, read, tokenize, dispatch, until `exit` or end of input.
    ///
    /// Returns `Ok(())` on normal termination. Only failures of the line source itself
    /// are returned as errors.
    pub fn repl(&mut self, source: &mut dyn LineSource) -> Result<(), ShellError> {
        loop {
            let line = match source.read_line(&self.prompt)? {
                ReadOutcome::Line(line) => line,
                ReadOutcome::Interrupted => continue,
                ReadOutcome::EndOfInput => {
                    debug!("end of input");
                    break;
                }
            };

            let tokens = lexer::split_into_tokens(&line);
            if self.dispatch(&tokens) == Continuation::Stop {
                debug!("exit requested");
                break;
            }
        }
        let _ = self.out.flush();
        Ok(())
    }
}

fn signal_report(name: &str, signal: i32, core_dumped: bool) -> String {
    let mut report = format!("lsh: {}: terminated by signal {}", name, signal);
    if core_dumped {
        report.push_str(" (core dumped)");
    }
    report
}

impl Default for Interpreter {
    /// Interpreter bound to the process's standard output and standard error.
    fn default() -> Self {
        Self::new(io::stdout(), io::stderr())
    }
}
