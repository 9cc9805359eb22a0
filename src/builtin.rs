use crate::command::{Continuation, Handler, Streams};
use argh::{EarlyExit, FromArgs};
use std::env;
use std::fmt;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, trace};

/// Built-in commands known to the shell at compile time.
///
/// Builtins are parsed using the [`argh`] crate (`FromArgs`) and executed directly
/// in-process without spawning a child process.
pub(crate) trait BuiltinCommand: Sized + FromArgs {
    /// Canonical name of the command, e.g. "ls" or "cd".
    const NAME: &'static str;

    /// Executes the command, writing output and confirmations to `io.out`.
    ///
    /// Errors are reported by the caller on `io.err`; they never stop the shell.
    fn execute(self, io: &mut Streams<'_>) -> Result<(), BuiltinError>;
}

/// Failures of builtin commands. All of them are reported and the shell keeps going.
#[derive(Debug, Error)]
pub enum BuiltinError {
    #[error("expected argument to \"{command}\"")]
    MissingArgument { command: &'static str },

    #[error("{command}: {}: {source}", .path.display())]
    Filesystem {
        command: &'static str,
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("{command}: too many arguments")]
    TooManyArguments { command: &'static str },

    #[error("{command}: cannot determine current directory: {source}")]
    CurrentDir {
        command: &'static str,
        #[source]
        source: io::Error,
    },

    #[error("mv: {}: has no file name", .path.display())]
    NoFileName { path: PathBuf },

    #[error("mv: cannot move {} {destination}: {source}", .file.display())]
    Move {
        file: PathBuf,
        destination: Destination,
        #[source]
        source: io::Error,
    },

    #[error("cannot write output: {0}")]
    Output(#[from] io::Error),
}

impl BuiltinError {
    fn filesystem(command: &'static str, path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::Filesystem {
            command,
            path: path.into(),
            source,
        }
    }
}

/// One row of the builtin table: a command name bound to its handler.
pub struct BuiltinEntry {
    name: &'static str,
    handler: Handler,
}

impl BuiltinEntry {
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Runs the builtin with the full token sequence (token 0 is the name).
    pub fn invoke(&self, args: &[String], io: &mut Streams<'_>) -> Continuation {
        (self.handler)(args, io)
    }
}

static BUILTINS: [BuiltinEntry; 8] = [
    BuiltinEntry { name: Cd::NAME, handler: run::<Cd> },
    BuiltinEntry { name: Help::NAME, handler: run::<Help> },
    BuiltinEntry { name: EXIT, handler: exit_shell },
    BuiltinEntry { name: Pwd::NAME, handler: run::<Pwd> },
    BuiltinEntry { name: Touch::NAME, handler: run::<Touch> },
    BuiltinEntry { name: Ls::NAME, handler: run::<Ls> },
    BuiltinEntry { name: Mkdir::NAME, handler: run::<Mkdir> },
    BuiltinEntry { name: Mv::NAME, handler: run::<Mv> },
];

/// Find the builtin registered under exactly `name` (case-sensitive).
pub fn lookup(name: &str) -> Option<&'static BuiltinEntry> {
    BUILTINS.iter().find(|entry| entry.name == name)
}

/// Names of all builtins in registration order.
pub fn names() -> impl Iterator<Item = &'static str> {
    BUILTINS.iter().map(|entry| entry.name)
}

/// Parses the arguments of `T`, runs it and reports whatever went wrong.
///
/// `--help` output goes to standard output, argument errors to standard error.
fn run<T: BuiltinCommand>(args: &[String], io: &mut Streams<'_>) -> Continuation {
    let rest: Vec<&str> = args.iter().skip(1).map(String::as_str).collect();
    trace!(command = T::NAME, args = ?rest, "running builtin");

    match T::from_args(&[T::NAME], &rest) {
        Ok(cmd) => {
            if let Err(e) = cmd.execute(io) {
                debug!(command = T::NAME, error = %e, "builtin failed");
                let _ = writeln!(io.err, "lsh: {}", e);
            }
        }
        Err(EarlyExit { output, status }) => {
            let sink: &mut dyn Write = if status.is_ok() {
                &mut *io.out
            } else {
                &mut *io.err
            };
            let _ = writeln!(sink, "{}", output.trim_end());
        }
    }
    Continuation::Continue
}

const EXIT: &str = "exit";

/// `exit` ignores its arguments and never fails.
fn exit_shell(_args: &[String], _io: &mut Streams<'_>) -> Continuation {
    Continuation::Stop
}

#[derive(FromArgs)]
/// Change the current working directory.
pub struct Cd {
    #[argh(positional)]
    /// directory to switch to; absolute or relative to the current directory.
    pub target: Option<String>,
}

impl BuiltinCommand for Cd {
    const NAME: &'static str = "cd";

    fn execute(self, _io: &mut Streams<'_>) -> Result<(), BuiltinError> {
        let target = self.target.ok_or(BuiltinError::MissingArgument {
            command: Self::NAME,
        })?;
        env::set_current_dir(&target)
            .map_err(|source| BuiltinError::filesystem(Self::NAME, &target, source))?;
        debug!(dir = %target, "changed directory");
        Ok(())
    }
}

#[derive(FromArgs)]
/// List the commands built into the shell.
pub struct Help {}

impl BuiltinCommand for Help {
    const NAME: &'static str = "help";

    fn execute(self, io: &mut Streams<'_>) -> Result<(), BuiltinError> {
        writeln!(io.out, "LSH, a line-oriented shell")?;
        writeln!(io.out, "Type program names and arguments, and hit enter.")?;
        writeln!(io.out, "The following are built in:")?;
        for name in names() {
            writeln!(io.out, "  {}", name)?;
        }
        writeln!(io.out, "Use the man command for information on other programs.")?;
        Ok(())
    }
}

#[derive(FromArgs)]
/// Print the current working directory to standard output.
pub struct Pwd {}

impl BuiltinCommand for Pwd {
    const NAME: &'static str = "pwd";

    fn execute(self, io: &mut Streams<'_>) -> Result<(), BuiltinError> {
        let cwd = env::current_dir().map_err(|source| BuiltinError::CurrentDir {
            command: Self::NAME,
            source,
        })?;
        writeln!(io.out, "{}", cwd.display())?;
        Ok(())
    }
}

#[derive(FromArgs)]
/// Create an empty file, truncating it if it already exists.
pub struct Touch {
    #[argh(positional)]
    /// file to create or truncate.
    pub file: Option<String>,
}

impl BuiltinCommand for Touch {
    const NAME: &'static str = "touch";

    fn execute(self, _io: &mut Streams<'_>) -> Result<(), BuiltinError> {
        let file = self.file.ok_or(BuiltinError::MissingArgument {
            command: Self::NAME,
        })?;
        // The handle is closed as soon as it goes out of scope.
        fs::File::create(&file)
            .map_err(|source| BuiltinError::filesystem(Self::NAME, &file, source))?;
        Ok(())
    }
}

#[derive(FromArgs)]
/// List the entries of the current directory; directories end with '/'.
pub struct Ls {}

impl BuiltinCommand for Ls {
    const NAME: &'static str = "ls";

    fn execute(self, io: &mut Streams<'_>) -> Result<(), BuiltinError> {
        list_dir(Path::new("."), io)
    }
}

/// Writes the entries of `dir`, sorted, one per line; directories end with '/'.
fn list_dir(dir: &Path, io: &mut Streams<'_>) -> Result<(), BuiltinError> {
    let read_error = |source: io::Error| BuiltinError::filesystem(Ls::NAME, dir, source);

    let mut entries = Vec::new();
    for entry in fs::read_dir(dir).map_err(read_error)? {
        let entry = entry.map_err(read_error)?;
        let is_dir = entry.file_type().map(|t| t.is_dir()).unwrap_or(false);
        entries.push((entry.file_name().to_string_lossy().into_owned(), is_dir));
    }
    entries.sort();

    for (name, is_dir) in entries {
        if is_dir {
            writeln!(io.out, "{}/", name)?;
        } else {
            writeln!(io.out, "{}", name)?;
        }
    }
    Ok(())
}

#[derive(FromArgs)]
/// Create a directory with default permissions.
pub struct Mkdir {
    #[argh(positional)]
    /// directory to create.
    pub dir: Option<String>,
}

impl BuiltinCommand for Mkdir {
    const NAME: &'static str = "mkdir";

    fn execute(self, _io: &mut Streams<'_>) -> Result<(), BuiltinError> {
        let dir = self.dir.ok_or(BuiltinError::MissingArgument {
            command: Self::NAME,
        })?;
        fs::create_dir(&dir).map_err(|source| BuiltinError::filesystem(Self::NAME, &dir, source))?;
        Ok(())
    }
}

#[derive(FromArgs)]
/// Move or rename a file.
pub struct Mv {
    #[argh(positional, greedy)]
    /// the file to move, then an absolute directory, a directory in the current
    /// directory, or a new name.
    pub args: Vec<String>,
}

impl BuiltinCommand for Mv {
    const NAME: &'static str = "mv";

    fn execute(self, io: &mut Streams<'_>) -> Result<(), BuiltinError> {
        let (file, location) = match <[String; 2]>::try_from(self.args) {
            Ok([file, location]) => (file, location),
            Err(args) if args.len() < 2 => {
                return Err(BuiltinError::MissingArgument {
                    command: Self::NAME,
                });
            }
            Err(_) => {
                return Err(BuiltinError::TooManyArguments {
                    command: Self::NAME,
                });
            }
        };
        let cwd = env::current_dir().map_err(|source| BuiltinError::CurrentDir {
            command: Self::NAME,
            source,
        })?;

        let file = PathBuf::from(file);
        let destination = resolve_destination(&file, Path::new(&location), &cwd, Path::is_dir)?;
        debug!(file = %file.display(), destination = %destination, "moving");

        if let Err(source) = fs::rename(&file, destination.path()) {
            return Err(BuiltinError::Move {
                file,
                destination,
                source,
            });
        }
        writeln!(
            io.out,
            "mv: {} -> {}",
            file.display(),
            destination.path().display()
        )?;
        Ok(())
    }
}

/// Where `mv` puts a file, tagged with the interpretation of its location argument.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Destination {
    /// The location was an absolute path, taken as the target directory.
    AbsoluteDir(PathBuf),
    /// The location named an existing directory in the current directory.
    LocalDir(PathBuf),
    /// The location is the new name of the file in the current directory.
    Rename(PathBuf),
}

impl Destination {
    /// Full path the file is renamed to.
    pub fn path(&self) -> &Path {
        match self {
            Destination::AbsoluteDir(p) | Destination::LocalDir(p) | Destination::Rename(p) => p,
        }
    }
}

impl fmt::Display for Destination {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Destination::AbsoluteDir(p) | Destination::LocalDir(p) => {
                let dir = p.parent().unwrap_or(p);
                write!(f, "into directory {}", dir.display())
            }
            Destination::Rename(p) => write!(f, "to {}", p.display()),
        }
    }
}

/// Compute the destination path for moving `file` to `location`.
///
/// Interpretations are tried in order:
/// 1. `location` is absolute: the file keeps its name inside that directory.
/// 2. `cwd/location` is an existing directory (per `is_dir`): the file keeps its
///    name inside it.
/// 3. Otherwise `location` is the new name of the file, relative to `cwd`.
///
/// Only `is_dir` looks at the filesystem; nothing is modified.
pub fn resolve_destination(
    file: &Path,
    location: &Path,
    cwd: &Path,
    is_dir: impl Fn(&Path) -> bool,
) -> Result<Destination, BuiltinError> {
    let file_name = || {
        file.file_name().ok_or_else(|| BuiltinError::NoFileName {
            path: file.to_path_buf(),
        })
    };

    if location.is_absolute() {
        return Ok(Destination::AbsoluteDir(location.join(file_name()?)));
    }

    let local = cwd.join(location);
    if is_dir(&local) {
        Ok(Destination::LocalDir(local.join(file_name()?)))
    } else {
        Ok(Destination::Rename(local))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::CwdGuard;
    use std::collections::HashSet;

    fn invoke(tokens: &[&str]) -> (Continuation, String, String) {
        let args: Vec<String> = tokens.iter().map(|s| s.to_string()).collect();
        let entry = lookup(tokens[0]).expect("builtin should be registered");
        let mut out = Vec::new();
        let mut err = Vec::new();
        let flow = entry.invoke(&args, &mut Streams::new(&mut out, &mut err));
        (
            flow,
            String::from_utf8(out).unwrap(),
            String::from_utf8(err).unwrap(),
        )
    }

    #[test]
    fn test_registry_names_are_unique_and_complete() {
        let all: Vec<&str> = names().collect();
        let unique: HashSet<&str> = all.iter().copied().collect();

        assert_eq!(all.len(), unique.len());
        for name in ["cd", "help", "exit", "pwd", "touch", "ls", "mkdir", "mv"] {
            assert!(unique.contains(name), "missing builtin {}", name);
        }
    }

    #[test]
    fn test_lookup_is_exact_and_case_sensitive() {
        assert_eq!(lookup("cd").map(BuiltinEntry::name), Some("cd"));
        assert!(lookup("CD").is_none());
        assert!(lookup("cd ").is_none());
        assert!(lookup("mkdirmv").is_none());
    }

    #[test]
    fn test_exit_stops_regardless_of_arguments() {
        assert_eq!(invoke(&["exit"]).0, Continuation::Stop);

        let (flow, out, err) = invoke(&["exit", "3", "--help", "whatever"]);
        assert_eq!(flow, Continuation::Stop);
        assert!(out.is_empty());
        assert!(err.is_empty());
    }

    #[test]
    fn test_help_lists_every_builtin() {
        let (flow, out, err) = invoke(&["help"]);

        assert_eq!(flow, Continuation::Continue);
        assert!(err.is_empty());
        for name in names() {
            assert!(out.contains(&format!("  {}\n", name)), "help lacks {}", name);
        }
    }

    #[test]
    fn test_builtin_usage_goes_to_stdout() {
        let (flow, out, err) = invoke(&["cd", "--help"]);

        assert_eq!(flow, Continuation::Continue);
        assert!(out.contains("Usage: cd"), "unexpected usage: {:?}", out);
        assert!(err.is_empty());
    }

    #[test]
    fn test_bad_arguments_are_reported_not_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let _cwd = CwdGuard::enter(dir.path());

        let (flow, out, err) = invoke(&["ls", "-la"]);

        assert_eq!(flow, Continuation::Continue);
        assert!(out.is_empty());
        assert!(!err.is_empty());
    }

    #[test]
    fn test_cd_without_argument_reports_and_continues() {
        let dir = tempfile::tempdir().unwrap();
        let _cwd = CwdGuard::enter(dir.path());
        let before = env::current_dir().unwrap();

        let (flow, _, err) = invoke(&["cd"]);

        assert_eq!(flow, Continuation::Continue);
        assert_eq!(err, "lsh: expected argument to \"cd\"\n");
        assert_eq!(env::current_dir().unwrap(), before);
    }

    #[test]
    fn test_cd_changes_process_directory() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir(dir.path().join("sub")).unwrap();
        let _cwd = CwdGuard::enter(dir.path());
        let expected = fs::canonicalize(dir.path().join("sub")).unwrap();

        let (flow, _, err) = invoke(&["cd", "sub"]);

        assert_eq!(flow, Continuation::Continue);
        assert!(err.is_empty(), "unexpected error: {}", err);
        assert_eq!(fs::canonicalize(env::current_dir().unwrap()).unwrap(), expected);
    }

    #[test]
    fn test_cd_to_missing_directory_keeps_cwd() {
        let dir = tempfile::tempdir().unwrap();
        let _cwd = CwdGuard::enter(dir.path());
        let before = env::current_dir().unwrap();

        let (flow, _, err) = invoke(&["cd", "no_such_dir"]);

        assert_eq!(flow, Continuation::Continue);
        assert!(err.starts_with("lsh: cd: no_such_dir:"), "got {:?}", err);
        assert_eq!(env::current_dir().unwrap(), before);
    }

    #[test]
    fn test_pwd_prints_current_dir() {
        let dir = tempfile::tempdir().unwrap();
        let _cwd = CwdGuard::enter(dir.path());
        let cur = env::current_dir().unwrap();

        let (flow, out, _) = invoke(&["pwd"]);

        assert_eq!(flow, Continuation::Continue);
        assert_eq!(out, format!("{}\n", cur.display()));
    }

    #[test]
    fn test_touch_creates_then_truncates() {
        let dir = tempfile::tempdir().unwrap();
        let _cwd = CwdGuard::enter(dir.path());

        let (flow, _, err) = invoke(&["touch", "newfile"]);
        assert_eq!(flow, Continuation::Continue);
        assert!(err.is_empty());
        assert_eq!(fs::metadata("newfile").unwrap().len(), 0);

        fs::write("newfile", b"some content").unwrap();
        let (_, _, err) = invoke(&["touch", "newfile"]);
        assert!(err.is_empty());
        assert_eq!(fs::metadata("newfile").unwrap().len(), 0);
    }

    #[test]
    fn test_touch_without_argument() {
        let (flow, _, err) = invoke(&["touch"]);

        assert_eq!(flow, Continuation::Continue);
        assert_eq!(err, "lsh: expected argument to \"touch\"\n");
    }

    #[test]
    fn test_mkdir_creates_and_reports_existing() {
        let dir = tempfile::tempdir().unwrap();
        let _cwd = CwdGuard::enter(dir.path());

        let (_, _, err) = invoke(&["mkdir", "made"]);
        assert!(err.is_empty());
        assert!(Path::new("made").is_dir());

        let (flow, _, err) = invoke(&["mkdir", "made"]);
        assert_eq!(flow, Continuation::Continue);
        assert!(err.starts_with("lsh: mkdir: made:"), "got {:?}", err);

        let (_, _, err) = invoke(&["mkdir"]);
        assert_eq!(err, "lsh: expected argument to \"mkdir\"\n");
    }

    #[test]
    fn test_ls_marks_directories_and_sorts() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir(dir.path().join("b_dir")).unwrap();
        fs::write(dir.path().join("c.txt"), b"").unwrap();
        fs::write(dir.path().join("a.txt"), b"").unwrap();
        let _cwd = CwdGuard::enter(dir.path());

        let (flow, out, err) = invoke(&["ls"]);

        assert_eq!(flow, Continuation::Continue);
        assert!(err.is_empty());
        assert_eq!(out, "a.txt\nb_dir/\nc.txt\n");
    }

    #[test]
    fn test_mv_into_existing_directory_keeps_file_name() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir(dir.path().join("subdir")).unwrap();
        fs::write(dir.path().join("a.txt"), b"payload").unwrap();
        let _cwd = CwdGuard::enter(dir.path());

        let (flow, out, err) = invoke(&["mv", "a.txt", "subdir"]);

        assert_eq!(flow, Continuation::Continue);
        assert!(err.is_empty(), "unexpected error: {}", err);
        assert!(out.starts_with("mv: a.txt -> "));
        assert!(Path::new("subdir").is_dir());
        assert!(!Path::new("a.txt").exists());
        assert_eq!(fs::read("subdir/a.txt").unwrap(), b"payload");
    }

    #[test]
    fn test_mv_renames_in_current_directory() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("old.txt"), b"x").unwrap();
        let _cwd = CwdGuard::enter(dir.path());

        let (_, _, err) = invoke(&["mv", "old.txt", "new.txt"]);

        assert!(err.is_empty(), "unexpected error: {}", err);
        assert!(!Path::new("old.txt").exists());
        assert!(Path::new("new.txt").is_file());
    }

    #[test]
    fn test_mv_into_absolute_directory() {
        let dir = tempfile::tempdir().unwrap();
        let target = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("a.txt"), b"x").unwrap();
        let _cwd = CwdGuard::enter(dir.path());

        let location = target.path().to_string_lossy().into_owned();
        let (_, _, err) = invoke(&["mv", "a.txt", &location]);

        assert!(err.is_empty(), "unexpected error: {}", err);
        assert!(target.path().join("a.txt").is_file());
    }

    #[test]
    fn test_mv_failure_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let _cwd = CwdGuard::enter(dir.path());

        let (flow, out, err) = invoke(&["mv", "missing.txt", "other.txt"]);

        assert_eq!(flow, Continuation::Continue);
        assert!(out.is_empty());
        assert!(err.starts_with("lsh: mv: cannot move missing.txt to "), "got {:?}", err);
    }

    #[test]
    fn test_mv_requires_two_arguments() {
        let (_, _, err) = invoke(&["mv"]);
        assert_eq!(err, "lsh: expected argument to \"mv\"\n");

        let (_, _, err) = invoke(&["mv", "a.txt"]);
        assert_eq!(err, "lsh: expected argument to \"mv\"\n");
    }

    #[test]
    fn test_mv_rejects_surplus_arguments() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("a"), b"x").unwrap();
        let _cwd = CwdGuard::enter(dir.path());

        let (flow, out, err) = invoke(&["mv", "a", "b", "c"]);

        assert_eq!(flow, Continuation::Continue);
        assert!(out.is_empty());
        assert_eq!(err, "lsh: mv: too many arguments\n");
        assert!(Path::new("a").is_file());
        assert!(!Path::new("b").exists());
    }

    #[test]
    fn test_cd_rejects_surplus_arguments() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir(dir.path().join("a")).unwrap();
        let _cwd = CwdGuard::enter(dir.path());
        let before = env::current_dir().unwrap();

        let (flow, out, err) = invoke(&["cd", "a", "b"]);

        assert_eq!(flow, Continuation::Continue);
        assert!(out.is_empty());
        assert!(!err.is_empty());
        assert_eq!(env::current_dir().unwrap(), before);
    }

    #[test]
    fn test_ls_unreadable_directory_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("missing");
        let mut out = Vec::new();
        let mut err = Vec::new();

        let res = list_dir(&missing, &mut Streams::new(&mut out, &mut err));

        match res {
            Err(e @ BuiltinError::Filesystem { .. }) => {
                assert!(e.to_string().starts_with("ls: "), "got {}", e)
            }
            other => panic!("expected a filesystem error, got {:?}", other),
        }
        assert!(out.is_empty());
    }

    #[test]
    fn test_resolve_destination_cases() {
        let cwd = Path::new("/home/user");
        let only = |dir: &'static str| move |p: &Path| p == Path::new(dir);

        assert_eq!(
            resolve_destination(Path::new("a.txt"), Path::new("/srv/data"), cwd, only("")).unwrap(),
            Destination::AbsoluteDir(PathBuf::from("/srv/data/a.txt"))
        );
        assert_eq!(
            resolve_destination(
                Path::new("a.txt"),
                Path::new("subdir"),
                cwd,
                only("/home/user/subdir")
            )
            .unwrap(),
            Destination::LocalDir(PathBuf::from("/home/user/subdir/a.txt"))
        );
        assert_eq!(
            resolve_destination(Path::new("a.txt"), Path::new("b.txt"), cwd, only("")).unwrap(),
            Destination::Rename(PathBuf::from("/home/user/b.txt"))
        );
    }

    #[test]
    fn test_resolve_destination_uses_final_component_of_file() {
        let dest = resolve_destination(
            Path::new("nested/a.txt"),
            Path::new("subdir"),
            Path::new("/w"),
            |_| true,
        )
        .unwrap();

        assert_eq!(dest.path(), Path::new("/w/subdir/a.txt"));
    }

    #[test]
    fn test_resolve_destination_rejects_nameless_file() {
        let res = resolve_destination(Path::new(".."), Path::new("/tmp"), Path::new("/w"), |_| false);

        assert!(matches!(res, Err(BuiltinError::NoFileName { .. })));
    }
}
