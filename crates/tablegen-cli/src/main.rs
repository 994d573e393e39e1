//! Tablegen CLI - generate source files from Jinja2 templates and a YAML data document

use clap::Parser;
use std::path::PathBuf;
use tablegen_core::GeneratorConfig;
use tracing_subscriber::EnvFilter;

mod commands;
mod display;
mod error;
mod exit_codes;

use error::{CliError, Result};

#[derive(Parser)]
#[command(name = "tablegen")]
#[command(version)]
#[command(about = "Render Jinja2 templates against a YAML data document", long_about = None)]
struct Cli {
    /// Directory relative locations are resolved against
    #[arg(short = 'C', long, env = "TABLEGEN_BASE_DIR", default_value = ".")]
    base_dir: PathBuf,

    /// Configuration file (default: tablegen.yaml in the base directory, if present)
    #[arg(short, long, env = "TABLEGEN_CONFIG")]
    config: Option<PathBuf>,

    /// YAML data document
    #[arg(short, long, env = "TABLEGEN_DATA")]
    data: Option<PathBuf>,

    /// Root of the template tree
    #[arg(short, long, env = "TABLEGEN_TEMPLATES")]
    templates: Option<PathBuf>,

    /// Root the generated tree is written under
    #[arg(short, long, env = "TABLEGEN_OUTPUT")]
    output: Option<PathBuf>,

    /// Render every template even after one fails
    #[arg(long, env = "TABLEGEN_KEEP_GOING")]
    keep_going: bool,

    /// Fail on undefined variables instead of rendering them empty
    #[arg(long, env = "TABLEGEN_STRICT")]
    strict: bool,

    /// List templates and their output paths without rendering
    #[arg(long)]
    list: bool,

    /// Verbosity level (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

impl Cli {
    /// Defaults, then the config file, then flags
    fn resolve_config(&self) -> Result<GeneratorConfig> {
        let base_dir = self.base_dir.as_path();
        let mut config = match &self.config {
            Some(path) => GeneratorConfig::load_from(&base_dir.join(path)),
            None => GeneratorConfig::load(base_dir),
        }
        .map_err(CliError::Config)?;

        if let Some(data) = &self.data {
            config.data = data.clone();
        }
        if let Some(templates) = &self.templates {
            config.templates = templates.clone();
        }
        if let Some(output) = &self.output {
            config.output = output.clone();
        }
        if self.keep_going {
            config.keep_going = true;
        }
        if self.strict {
            config.strict = true;
        }

        Ok(config.resolve(base_dir))
    }
}

fn init_tracing(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter = if verbose == 0 {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level))
    } else {
        EnvFilter::new(level)
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn run(cli: &Cli) -> Result<()> {
    let config = cli.resolve_config()?;
    tracing::debug!(?config, "resolved configuration");

    if cli.list {
        commands::list::run(&config)
    } else {
        commands::generate::run(&config)
    }
}

fn main() {
    // Setup miette for nice error display
    miette::set_panic_hook();

    let cli = Cli::parse();
    init_tracing(cli.verbose);

    if let Err(err) = run(&cli) {
        let code = err.exit_code();
        eprintln!("{:?}", miette::Report::new(err));
        std::process::exit(code);
    }
}
