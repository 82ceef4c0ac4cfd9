use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use scoped_snippets::{EngineOptions, Environment, Result};
use serde_json::Value;
use tracing::Level;

/// Render a Liquid-style template with scoped snippets.
#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Args {
    /// Template file to render
    template: PathBuf,
    /// Assigns as a JSON object string
    #[arg(long, conflicts_with = "assigns_file")]
    assigns: Option<String>,
    /// Read assigns from a JSON file
    #[arg(long)]
    assigns_file: Option<PathBuf>,
    /// Engine options as a JSON file; flags below override it
    #[arg(long)]
    config: Option<PathBuf>,
    /// Directory holding `<name>.<ext>` snippet files
    #[arg(long)]
    snippets_dir: Option<PathBuf>,
    /// Snippet file extension
    #[arg(long)]
    extension: Option<String>,
    /// Keep leading and trailing whitespace of the output
    #[arg(long)]
    no_strip: bool,
    /// Debug logging on stderr
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> ExitCode {
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_max_level(if args.verbose { Level::DEBUG } else { Level::WARN })
        .init();

    match run(&args) {
        Ok(out) => {
            println!("{out}");
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("{e}");
            ExitCode::FAILURE
        }
    }
}

fn run(args: &Args) -> Result<String> {
    let mut opts = match &args.config {
        Some(path) => EngineOptions::from_json_file(path)?,
        None => EngineOptions::default(),
    };
    if let Some(dir) = &args.snippets_dir {
        opts.snippets_dir = dir.clone();
    }
    if let Some(ext) = &args.extension {
        opts.extension = ext.clone();
    }
    if args.no_strip {
        opts.strip_output = false;
    }

    let assigns: Value = match (&args.assigns, &args.assigns_file) {
        (Some(raw), _) => serde_json::from_str(raw)?,
        (None, Some(path)) => serde_json::from_str(&std::fs::read_to_string(path)?)?,
        (None, None) => Value::Null,
    };

    let env = Environment::new(opts);
    env.render_file(&args.template, &assigns)
}
