mod settings;
mod shell;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use linecmd::{Command, Loader};
use serde_json::Value;
use std::{
    fs,
    io::{self, BufRead, IsTerminal, Write},
    path::PathBuf,
};
use tracing_subscriber::{EnvFilter, fmt};

use crate::settings::Settings;
use crate::shell::Session;

#[derive(Parser)]
#[command(name = "linecmd")]
#[command(version, about = "Interactive shell driven by linecmd command trees", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create linecmd.json and a starter command module
    Init(InitArgs),

    /// Read lines from stdin and dispatch them to the command tree
    Run(RunArgs),
}

#[derive(Parser)]
struct InitArgs {
    /// Project directory (default: current directory)
    #[arg(value_name = "DIR")]
    dir: Option<PathBuf>,

    /// Overwrite existing files
    #[arg(long)]
    overwrite: bool,
}

#[derive(Parser)]
struct RunArgs {
    /// Settings file (default: ./linecmd.json if present)
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Only handle lines starting with this prefix (repeatable)
    #[arg(short, long = "prefix", value_name = "PREFIX")]
    prefixes: Vec<String>,

    /// Command module file or directory to load (repeatable)
    #[arg(long = "commands", value_name = "PATH")]
    commands: Vec<PathBuf>,

    /// Starting working directory
    #[arg(long, value_name = "DIR")]
    root: Option<PathBuf>,

    /// Dispatch this line instead of reading stdin (repeatable)
    #[arg(short, long = "exec", value_name = "LINE")]
    exec: Vec<String>,
}

fn main() -> Result<()> {
    init_tracing();

    let cli = Cli::parse();

    match cli.command {
        Commands::Init(args) => init(args),
        Commands::Run(args) => run(args),
    }
}

fn init(args: InitArgs) -> Result<()> {
    tracing::debug!("executing init command");
    let dir = args.dir.unwrap_or_else(|| PathBuf::from("."));
    fs::create_dir_all(&dir).with_context(|| format!("failed to create {}", dir.display()))?;
    let dest = settings::write_default_settings(&dir, args.overwrite)?;
    println!("Wrote {}", dest.display());
    Ok(())
}

fn run(args: RunArgs) -> Result<()> {
    tracing::debug!("executing run command");

    let loaded = settings::load_settings(args.config.as_deref())?;
    let (mut settings, mut module_paths) = match loaded {
        Some(loaded) => {
            let paths = loaded.command_paths();
            (loaded.settings, paths)
        }
        None => (Settings::default(), Vec::new()),
    };
    if !args.prefixes.is_empty() {
        settings.prefixes = args.prefixes;
    }
    let cwd = std::env::current_dir().context("failed to get current directory")?;
    module_paths.extend(
        args.commands
            .iter()
            .map(|p| settings::resolve_against(&cwd, p)),
    );

    let start = args.root.unwrap_or_else(|| cwd.clone());
    let start = fs::canonicalize(&start)
        .with_context(|| format!("failed to resolve {}", start.display()))?;
    let session = Session::new(start);

    let shell = build_shell(&settings, &module_paths)?;

    if !args.exec.is_empty() {
        for line in &args.exec {
            shell.parse(line, &session);
            if session.exit_requested() {
                break;
            }
        }
        return Ok(());
    }
    repl(&shell, &session)
}

fn build_shell(settings: &Settings, module_paths: &[PathBuf]) -> Result<Command<Session>> {
    let mut root = Command::<Session>::new();
    settings.configure(&mut root);
    shell::declare(&mut root).context("failed to declare builtin commands")?;

    let loader = Loader::new(shell::handlers());
    for path in module_paths {
        loader
            .load(&mut root, path)
            .with_context(|| format!("failed to load commands from {}", path.display()))?;
        tracing::info!("loaded commands from {}", path.display());
    }

    root.set_send(|_: &Session, text: &str| {
        println!("{text}");
        Value::Null
    });
    Ok(root)
}

fn repl(shell: &Command<Session>, session: &Session) -> Result<()> {
    let stdin = io::stdin();
    let interactive = stdin.is_terminal();

    prompt(interactive)?;
    for line in stdin.lock().lines() {
        let line = line.context("failed to read from stdin")?;
        shell.parse(line.trim_end(), session);
        if session.exit_requested() {
            break;
        }
        prompt(interactive)?;
    }

    if interactive {
        println!("Have a great day!");
    }
    Ok(())
}

fn prompt(interactive: bool) -> Result<()> {
    if interactive {
        let mut stdout = io::stdout();
        write!(stdout, "> ").context("failed to write prompt")?;
        stdout.flush().context("failed to flush stdout")?;
    }
    Ok(())
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(false)
        .compact()
        .init();
}
