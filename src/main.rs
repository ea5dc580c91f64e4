// snipbox: run a snippet under a deadline and print its outcome

use std::fs;
use std::io::{self, Read};
use std::path::PathBuf;
use std::process;

use anyhow::{bail, Context, Result};
use clap::Parser;
use crossterm::{
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{backend::CrosstermBackend, Terminal};
use tracing_subscriber::EnvFilter;

use snipbox::ui::App;
use snipbox::{Engine, EngineConfig};

#[derive(Parser, Debug)]
#[command(name = "snipbox")]
#[command(about = "Run a snippet under a deadline and print its value, its output or a traceback")]
#[command(version)]
struct Args {
    /// Snippet file; reads stdin when neither a file nor -c is given
    #[arg(value_name = "FILE", conflicts_with = "code")]
    input: Option<PathBuf>,

    /// Snippet source passed inline
    #[arg(short = 'c', long = "code", value_name = "CODE")]
    code: Option<String>,

    /// Deadline in seconds; 0 disables it
    #[arg(short, long, value_name = "SECS", env = "SNIPBOX_TIMEOUT", default_value_t = 5.0)]
    timeout: f64,

    /// Maximum call depth inside the snippet
    #[arg(long, value_name = "N")]
    recursion_limit: Option<usize>,

    /// Append output printed before an error to the diagnostic
    #[arg(long)]
    keep_partial_output: bool,

    /// Print the outcome as JSON
    #[arg(long, conflicts_with = "tui")]
    json: bool,

    /// Open the terminal viewer
    #[arg(long)]
    tui: bool,

    /// Log engine events to stderr
    #[arg(short, long)]
    verbose: bool,
}

impl Args {
    fn engine_config(&self) -> EngineConfig {
        let mut builder = EngineConfig::builder()
            .timeout_secs(self.timeout)
            .keep_partial_output(self.keep_partial_output);
        if let Some(limit) = self.recursion_limit {
            builder = builder.recursion_limit(limit);
        }
        if let Some(path) = &self.input {
            builder = builder.filename(path.display().to_string());
        }
        builder.build()
    }

    fn read_source(&self) -> Result<String> {
        if let Some(code) = &self.code {
            return Ok(code.clone());
        }
        if let Some(path) = &self.input {
            if !path.exists() {
                bail!("file '{}' not found", path.display());
            }
            return fs::read_to_string(path)
                .with_context(|| format!("failed to read '{}'", path.display()));
        }
        let mut source = String::new();
        io::stdin()
            .read_to_string(&mut source)
            .context("failed to read snippet from stdin")?;
        Ok(source)
    }
}

fn init_logging(verbose: bool) {
    let default = if verbose { "info" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default)))
        .with_writer(io::stderr)
        .init();
}

fn run_tui(engine: Engine, source: String) -> Result<()> {
    enable_raw_mode().context("failed to enable raw mode")?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let mut app = App::new(engine, source);
    let res = app.run(&mut terminal);

    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    res.context("terminal viewer failed")
}

fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(args.verbose);

    let source = args.read_source()?;
    let engine = Engine::new(args.engine_config());
    tracing::info!(
        timeout_ms = engine.config().timeout.as_millis() as u64,
        source_len = source.len(),
        "running snippet"
    );

    if args.tui {
        return run_tui(engine, source);
    }

    let outcome = engine.run(&source);
    if args.json {
        println!("{}", serde_json::to_string_pretty(&outcome.report())?);
    } else {
        let text = outcome.text();
        if !text.is_empty() {
            println!("{}", text);
        }
    }

    if outcome.is_error() {
        process::exit(1);
    }
    Ok(())
}
