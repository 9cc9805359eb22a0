use crate::command::ExitCode;
use std::borrow::Cow;
use std::ffi::{OsStr, OsString};
use std::io;
use std::path::{Path, PathBuf};
use std::process::{Command, ExitStatus};
use thiserror::Error;
use tracing::debug;

/// Search path used when `PATH` is not set, as `execvp` does.
const DEFAULT_SEARCH_PATH: &str = "/usr/bin:/bin";

/// Interpreter for executables the kernel refuses to run (no `#!` line).
#[cfg(unix)]
const FALLBACK_SHELL: &str = "/bin/sh";

/// "Exec format error" on Linux and the BSDs.
#[cfg(unix)]
const ENOEXEC: i32 = 8;

/// How a launched program ended.
#[derive(Debug)]
pub enum LaunchOutcome {
    /// The program exited on its own with this status code.
    NormalExit(ExitCode),
    /// The program was killed by a signal.
    Signaled { signal: i32, core_dumped: bool },
    /// The program could not be started, or its termination could not be observed.
    LaunchFailed(LaunchError),
}

#[derive(Debug, Error)]
pub enum LaunchError {
    #[error("{name}: command not found")]
    NotFound { name: String },

    #[error("{name}: cannot execute: {source}")]
    Spawn {
        name: String,
        #[source]
        source: io::Error,
    },

    #[error("{name}: cannot wait for process: {source}")]
    Wait {
        name: String,
        #[source]
        source: io::Error,
    },
}

/// Runs `args[0]` with the remaining tokens as arguments and waits for it to finish.
///
/// The program is looked up through `PATH`. The child shares this process's standard
/// streams, environment and working directory, and is always reaped before returning.
pub fn launch(args: &[String]) -> LaunchOutcome {
    let search_paths =
        std::env::var_os("PATH").unwrap_or_else(|| OsString::from(DEFAULT_SEARCH_PATH));
    launch_with_search_paths(args, &search_paths)
}

/// Same as [`launch`] but with an explicit executable search path.
pub fn launch_with_search_paths(args: &[String], search_paths: &OsStr) -> LaunchOutcome {
    let Some((program, rest)) = args.split_first() else {
        return LaunchOutcome::LaunchFailed(LaunchError::NotFound {
            name: String::new(),
        });
    };

    let Some(executable) = find_command_path(search_paths, Path::new(program)) else {
        return LaunchOutcome::LaunchFailed(LaunchError::NotFound {
            name: program.clone(),
        });
    };

    let spawned = command_for(executable.as_os_str(), program, rest).spawn();
    #[cfg(unix)]
    let spawned = match spawned {
        // Like `execvp`, hand scripts without an interpreter line to the shell.
        Err(e) if e.raw_os_error() == Some(ENOEXEC) => {
            debug!(program = %program, "not a binary, retrying with {}", FALLBACK_SHELL);
            let mut command = command_for(OsStr::new(FALLBACK_SHELL), program, &[]);
            command.arg(executable.as_os_str()).args(rest);
            command.spawn()
        }
        other => other,
    };

    let mut child = match spawned {
        Ok(child) => child,
        Err(source) => {
            return LaunchOutcome::LaunchFailed(LaunchError::Spawn {
                name: program.clone(),
                source,
            });
        }
    };
    debug!(program = %program, path = %executable.display(), pid = child.id(), "spawned child");

    // `wait` only returns once the child has exited or was killed; stops are not reported.
    match child.wait() {
        Ok(status) => {
            let outcome = classify(status);
            debug!(program = %program, ?outcome, "child terminated");
            outcome
        }
        Err(source) => LaunchOutcome::LaunchFailed(LaunchError::Wait {
            name: program.clone(),
            source,
        }),
    }
}

/// Command running `path` with `args`, showing `program` as argument zero.
fn command_for(path: &OsStr, program: &str, args: &[String]) -> Command {
    let mut command = Command::new(path);
    command.args(args);
    #[cfg(unix)]
    {
        use std::os::unix::process::CommandExt;
        command.arg0(program);
    }
    #[cfg(not(unix))]
    let _ = program;
    command
}

fn classify(status: ExitStatus) -> LaunchOutcome {
    match status.code() {
        Some(code) => LaunchOutcome::NormalExit(code),
        None => terminated_by_signal(status),
    }
}

#[cfg(unix)]
fn terminated_by_signal(status: ExitStatus) -> LaunchOutcome {
    use std::os::unix::process::ExitStatusExt;
    match status.signal() {
        Some(signal) => LaunchOutcome::Signaled {
            signal,
            core_dumped: status.core_dumped(),
        },
        None => LaunchOutcome::NormalExit(-1),
    }
}

#[cfg(not(unix))]
fn terminated_by_signal(_status: ExitStatus) -> LaunchOutcome {
    LaunchOutcome::NormalExit(-1)
}

/// Resolve a command path the way a typical shell would.
///
/// Behavior:
/// - Absolute path: returns it if it is an executable file.
/// - Relative with multiple components (e.g., `bin/sh` or `./foo`): returns it if it is
///   an executable file.
/// - Single path component (no separators): search each directory in `search_paths`
///   (PATH) and return the first executable match.
/// - Empty path: returns `None`.
///
/// Returns either a borrowed reference to the provided `path` or an owned `PathBuf`
/// when the result is discovered via PATH lookup.
pub fn find_command_path<'a>(search_paths: &OsStr, path: &'a Path) -> Option<Cow<'a, Path>> {
    if path.is_absolute() {
        return find_by_path(path).map(Cow::Borrowed);
    }

    if cfg!(not(unix)) && find_by_path(path).is_some() {
        return Some(Cow::Borrowed(path));
    }

    let mut components = path.components();
    let first = components.next();
    let second = components.next();
    match (first, second) {
        (None, None) => None,
        (Some(x), None) => find_in_path(search_paths, x.as_os_str()).map(Cow::Owned),
        _ => find_by_path(path).map(Cow::Borrowed),
    }
}

fn find_in_path(search_paths: &OsStr, cmd: &OsStr) -> Option<PathBuf> {
    std::env::split_paths(search_paths)
        .map(|dir| dir.join(cmd))
        .find(|candidate| find_by_path(candidate).is_some())
}

fn find_by_path(path: &Path) -> Option<&Path> {
    if is_executable(path) { Some(path) } else { None }
}

#[cfg(unix)]
fn is_executable(path: &Path) -> bool {
    use std::os::unix::fs::PermissionsExt;
    match path.metadata() {
        Ok(meta) => meta.is_file() && meta.permissions().mode() & 0o111 != 0,
        Err(_) => false,
    }
}

#[cfg(not(unix))]
fn is_executable(path: &Path) -> bool {
    path.is_file()
}
