/* 📖 # Why is the CLI minimal and hand-parsed?

The binary exists to poke at a single path from a shell: one command, one path, maybe one
argument. That does not need an argument-parsing dependency. Commands are dispatched against
`&dyn Path` and a path factory, so the same dispatch runs on `OsPath` here and on a
`MemoryFs` in the tests.

Exit codes:
- 0: Success
- 1: Usage error or failed operation
*/

use std::env;
use std::io::{self, Write};
use std::process;

use pathlib::tracing::init_tracing;
use pathlib::{Mode, OsPath, Path, PathHandle, PathlibError, PathlibResult};
use tracing::debug;

const USAGE: &str = "\
Usage: pathlib <command> <path> [args]

Commands:
  abs                 print the absolute path
  parent              print the parent directory
  join <segment>...   print the path joined with segments
  touch               create or truncate a file
  mkdir [-p]          create a directory (-p: with parents)
  rm                  remove a file
  rmdir               remove an empty directory
  cat                 print file contents
  write <text>        replace file contents with text
  mv <target>         rename to target
  chmod <octal>       change permission bits
  stat                print existence and type";

#[derive(Debug, Clone, PartialEq, Eq)]
enum Command {
    Abs,
    Parent,
    Join(Vec<String>),
    Touch,
    MkDir { parents: bool },
    Rm,
    RmDir,
    Cat,
    Write(String),
    Mv(String),
    Chmod(Mode),
    Stat,
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct Invocation {
    command: Command,
    path: String,
}

fn parse_args(args: &[String]) -> PathlibResult<Invocation> {
    let (name, rest) = args
        .split_first()
        .ok_or_else(|| pathlib::err!("missing command"))?;
    // `-p` is the only flag and belongs to `mkdir`; every other argument is positional.
    let parents = name == "mkdir" && rest.iter().any(|arg| arg == "-p");
    let positional: Vec<&String> = rest
        .iter()
        .filter(|arg| !(parents && arg.as_str() == "-p"))
        .collect();
    let (path, extra) = positional
        .split_first()
        .ok_or_else(|| pathlib::err!("missing path for '{}'", name))?;
    let extra: Vec<String> = extra.iter().map(|arg| arg.to_string()).collect();

    let single = |what: &str| -> PathlibResult<String> {
        match extra.as_slice() {
            [value] => Ok(value.clone()),
            _ => Err(pathlib::err!("'{}' expects exactly one {}", name, what)),
        }
    };

    let command = match name.as_str() {
        "abs" => Command::Abs,
        "parent" => Command::Parent,
        "join" => Command::Join(extra.clone()),
        "touch" => Command::Touch,
        "mkdir" => Command::MkDir { parents },
        "rm" => Command::Rm,
        "rmdir" => Command::RmDir,
        "cat" => Command::Cat,
        "write" => Command::Write(single("text")?),
        "mv" => Command::Mv(single("target")?),
        "chmod" => {
            let mode = single("mode")?;
            Command::Chmod(
                Mode::from_str_radix(&mode, 8)
                    .map_err(|e| pathlib::err!("invalid mode '{}': {}", mode, e))?,
            )
        }
        "stat" => Command::Stat,
        other => pathlib::bail!("unknown command '{}'", other),
    };
    Ok(Invocation {
        command,
        path: path.to_string(),
    })
}

fn emit(out: &mut dyn Write, bytes: &[u8]) -> PathlibResult<()> {
    out.write_all(bytes)
        .map_err(|e| Box::new(PathlibError::file("<stdout>", e)))
}

fn emit_line(out: &mut dyn Write, line: &str) -> PathlibResult<()> {
    emit(out, format!("{}\n", line).as_bytes())
}

/// Run one command against `path`. `make_path` builds a path of the same backend for
/// commands that take a second path.
fn run(
    invocation: &Invocation,
    path: &dyn Path,
    make_path: &dyn Fn(&str) -> PathHandle,
    out: &mut dyn Write,
) -> PathlibResult<()> {
    debug!(command = ?invocation.command, path = %path, "running command");
    match &invocation.command {
        Command::Abs => emit_line(out, path.absolute()?.as_str()),
        Command::Parent => emit_line(out, path.parent()?.as_str()),
        Command::Join(segments) => {
            let segments: Vec<&str> = segments.iter().map(String::as_str).collect();
            emit_line(out, path.join_path(&segments).as_str())
        }
        Command::Touch => path.touch(),
        Command::MkDir { parents } => path.mk_dir(0o777, *parents),
        Command::Rm => path.unlink(),
        Command::RmDir => path.rm_dir(),
        Command::Cat => emit(out, &path.read_bytes()?),
        Command::Write(text) => path.write_text(text),
        Command::Mv(target) => path.rename(&*make_path(target)),
        Command::Chmod(mode) => path.chmod(*mode),
        Command::Stat => {
            let kind = if path.is_dir() {
                "directory"
            } else if path.is_file() {
                "file"
            } else if path.exists() {
                "other"
            } else {
                "missing"
            };
            emit_line(out, &format!("{}: {}", path, kind))
        }
    }
}

fn main() {
    if let Err(e) = init_tracing() {
        eprintln!("Warning: {}", e);
    }

    let args: Vec<String> = env::args().skip(1).collect();
    let invocation = match parse_args(&args) {
        Ok(invocation) => invocation,
        Err(e) => {
            eprintln!("Error: {}\n\n{}", e, USAGE);
            process::exit(1);
        }
    };

    let path = OsPath::new(invocation.path.clone());
    let make_path = |p: &str| PathHandle::new(OsPath::new(p));
    let stdout = io::stdout();
    let mut out = stdout.lock();
    if let Err(e) = run(&invocation, &path, &make_path, &mut out) {
        debug!(error = ?e, "command failed");
        eprintln!("Error: {}", e);
        process::exit(1);
    }
}
