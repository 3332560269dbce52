//! Builtin shell commands and the session they act on.

use anyhow::{Context, Result, bail};
use linecmd::{Command, DeclareError, HandlerSet, Invocation, OptionValues, WILDCARD};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, PoisonError};

/// Per-shell state handed to every action as metadata.
#[derive(Debug)]
pub struct Session {
    cwd: Mutex<PathBuf>,
    exit: AtomicBool,
}

impl Session {
    pub fn new(cwd: PathBuf) -> Self {
        Self {
            cwd: Mutex::new(cwd),
            exit: AtomicBool::new(false),
        }
    }

    pub fn cwd(&self) -> PathBuf {
        self.cwd.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    fn set_cwd(&self, dir: PathBuf) {
        *self.cwd.lock().unwrap_or_else(PoisonError::into_inner) = dir;
    }

    /// `path` relative to the working directory.
    pub fn resolve(&self, path: &str) -> PathBuf {
        let path = Path::new(path);
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.cwd().join(path)
        }
    }

    pub fn request_exit(&self) {
        self.exit.store(true, Ordering::SeqCst);
    }

    pub fn exit_requested(&self) -> bool {
        self.exit.load(Ordering::SeqCst)
    }
}

type Handler = fn(&Invocation<'_, Session>) -> Result<()>;

const HANDLERS: &[(&str, Handler)] = &[
    ("ls", ls),
    ("cd", cd),
    ("pwd", pwd),
    ("cat", cat),
    ("echo", echo),
    ("exit", exit),
];

/// Builtins by name, for command modules to reference.
pub fn handlers() -> HandlerSet<Session> {
    let mut set = HandlerSet::new();
    for (name, handler) in HANDLERS {
        set.register(*name, wrap(*name, *handler));
    }
    set
}

/// Report handler errors through the command's sink, prefixed with the
/// handler name.
fn wrap(
    name: &'static str,
    handler: Handler,
) -> impl Fn(&Invocation<'_, Session>) + Send + Sync + 'static {
    move |inv: &Invocation<'_, Session>| {
        if let Err(err) = handler(inv) {
            tracing::debug!(command = name, error = %err, "command failed");
            inv.send(&format!("{name}: {err:#}"));
        }
    }
}

pub fn declare(root: &mut Command<Session>) -> Result<(), DeclareError> {
    root.command("ls [path]")?
        .description("List directory contents")
        .option("-F, --classify", "Append indicator (one of /@) to entries")
        .option("-a, --all", "Do not ignore entries starting with .")
        .option("-l", "Use a long listing format")
        .action(wrap("ls", ls));

    root.command("cd [dir]")?
        .description("Change the working directory")
        .action(wrap("cd", cd));

    root.command("pwd")?
        .description("Print the working directory")
        .action(wrap("pwd", pwd));

    root.command("cat <files...>")?
        .description("Print files")
        .option("-b, --number-nonblank", "Number nonempty output lines, overrides -n")
        .option("-E, --show-ends", "Display $ at end of each line")
        .option("-n, --number", "Number all output lines")
        .option("-s, --squeeze-blank", "Suppress repeated empty output lines")
        .action(wrap("cat", cat));

    root.command("echo [words...]")?
        .description("Display a line of text")
        .action(wrap("echo", echo));

    root.command("exit")?
        .alias("quit")
        .description("Exit program")
        .action(wrap("exit", exit));

    root.command_with(&format!("{WILDCARD} <name>"), true)?
        .allow_unknown_option(true)
        .show_help_on_error(false)
        .action(|inv| {
            if let Some(name) = inv.arg(0) {
                inv.send(&format!("command not found: {name}"));
            }
        });

    Ok(())
}

fn ls(inv: &Invocation<'_, Session>) -> Result<()> {
    let dir = inv.meta().resolve(inv.arg(0).unwrap_or("."));
    let opts = inv.opts();

    let mut names = Vec::new();
    for entry in
        fs::read_dir(&dir).with_context(|| format!("cannot access '{}'", dir.display()))?
    {
        let entry = entry.context("failed to read directory entry")?;
        let name = entry.file_name().to_string_lossy().into_owned();
        if name.starts_with('.') && !opts.flag("all") {
            continue;
        }
        names.push(name);
    }
    names.sort();

    let lines = names
        .iter()
        .map(|name| describe(&dir, name, opts))
        .collect::<Result<Vec<_>>>()?;
    inv.send(&lines.join("\n"));
    Ok(())
}

fn describe(dir: &Path, name: &str, opts: &OptionValues) -> Result<String> {
    let path = dir.join(name);
    let meta = fs::symlink_metadata(&path)
        .with_context(|| format!("cannot access '{}'", path.display()))?;

    let mut shown = name.to_string();
    if opts.flag("classify") {
        if meta.is_dir() {
            shown.push('/');
        } else if meta.file_type().is_symlink() {
            shown.push('@');
        }
    }
    if opts.flag("l") {
        shown = format!("{} {:>8} {shown}", mode_string(&meta), meta.len());
    }
    Ok(shown)
}

fn file_kind(meta: &fs::Metadata) -> char {
    if meta.is_dir() {
        'd'
    } else if meta.file_type().is_symlink() {
        'l'
    } else {
        '-'
    }
}

#[cfg(unix)]
fn mode_string(meta: &fs::Metadata) -> String {
    use std::os::unix::fs::PermissionsExt;

    let mode = meta.permissions().mode();
    let mut out = String::from(file_kind(meta));
    for shift in [6, 3, 0] {
        let bits = (mode >> shift) & 0o7;
        out.push(if bits & 0o4 != 0 { 'r' } else { '-' });
        out.push(if bits & 0o2 != 0 { 'w' } else { '-' });
        out.push(if bits & 0o1 != 0 { 'x' } else { '-' });
    }
    out
}

#[cfg(not(unix))]
fn mode_string(meta: &fs::Metadata) -> String {
    let access = if meta.permissions().readonly() { "r--" } else { "rw-" };
    format!("{}{}", file_kind(meta), access.repeat(3))
}

fn cd(inv: &Invocation<'_, Session>) -> Result<()> {
    let Some(dir) = inv.arg(0) else {
        return Ok(());
    };
    let session = inv.meta();
    let target = session.resolve(dir);
    if !target.is_dir() {
        bail!("{dir}: No such directory");
    }
    let target = fs::canonicalize(&target)
        .with_context(|| format!("failed to resolve {}", target.display()))?;
    session.set_cwd(target);
    Ok(())
}

fn pwd(inv: &Invocation<'_, Session>) -> Result<()> {
    inv.send(&inv.meta().cwd().display().to_string());
    Ok(())
}

fn cat(inv: &Invocation<'_, Session>) -> Result<()> {
    for file in inv.values(0) {
        let path = inv.meta().resolve(file);
        let text = fs::read_to_string(&path).with_context(|| file.clone())?;
        inv.send(&format_lines(&text, inv.opts()));
    }
    Ok(())
}

/// Apply cat's line options. Numbering starts at 1.
pub(crate) fn format_lines(text: &str, opts: &OptionValues) -> String {
    let number_nonblank = opts.flag("numberNonblank");
    let number = opts.flag("number") && !number_nonblank;
    let show_ends = opts.flag("showEnds");
    let squeeze = opts.flag("squeezeBlank");

    let mut out = Vec::new();
    let mut counter = 0;
    let mut previous_blank = false;
    for line in text.lines() {
        let blank = line.is_empty();
        if squeeze && blank && previous_blank {
            continue;
        }
        previous_blank = blank;

        let mut shown = String::new();
        if number || (number_nonblank && !blank) {
            counter += 1;
            shown.push_str(&format!("{counter:>6}\t"));
        }
        shown.push_str(line);
        if show_ends {
            shown.push('$');
        }
        out.push(shown);
    }
    out.join("\n")
}

fn echo(inv: &Invocation<'_, Session>) -> Result<()> {
    inv.send(&inv.values(0).join(" "));
    Ok(())
}

fn exit(inv: &Invocation<'_, Session>) -> Result<()> {
    inv.meta().request_exit();
    Ok(())
}
