use anyhow::Result;
use argh::FromArgs;
use lsh::input::{Buffered, Editor};
use lsh::{DEFAULT_PROMPT, Interpreter};
use std::io::{self, IsTerminal};
use std::process::ExitCode;

#[derive(FromArgs)]
/// A line-oriented shell: runs builtins in-process and everything else as a child process.
struct Options {
    #[argh(option, default = "DEFAULT_PROMPT.to_string()")]
    /// text printed before each line.
    prompt: String,

    #[argh(option)]
    /// log filter such as "debug" or "lsh=trace"; overrides $LSH_LOG.
    log: Option<String>,

    #[argh(switch)]
    /// read plain lines without the line editor, even on a terminal.
    no_editor: bool,

    #[argh(switch, short = 'V')]
    /// print the version and exit.
    version: bool,
}

fn main() -> ExitCode {
    let options: Options = argh::from_env();
    if options.version {
        println!("lsh {}", env!("CARGO_PKG_VERSION"));
        return ExitCode::SUCCESS;
    }

    match run(options) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("lsh: {:#}", e);
            ExitCode::FAILURE
        }
    }
}

fn run(options: Options) -> Result<()> {
    lsh::logging::init(options.log.as_deref())?;

    let mut interpreter = Interpreter::new(io::stdout(), io::stderr()).with_prompt(options.prompt);
    if !options.no_editor && io::stdin().is_terminal() {
        let mut editor = Editor::new()?;
        interpreter.repl(&mut editor)?;
    } else {
        let mut source = Buffered::new(io::stdin().lock(), io::stdout());
        interpreter.repl(&mut source)?;
    }
    Ok(())
}
