//! CLI command definitions, routing, and tracing setup.

use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use color_eyre::eyre::{Result, eyre};
use folio_core::assembler::{load_manifest, validate_manifest};
use folio_core::pipeline::{BuildResult, ProgressReporter};
use folio_shared::{BuildConfig, config_file_path, init_config, load_config, to_toml};
use indicatif::{ProgressBar, ProgressStyle};
use tracing::info;

// ---------------------------------------------------------------------------
// CLI structure
// ---------------------------------------------------------------------------

/// Folio: turn a folder of writings into a structured JSON manifest.
#[derive(Parser)]
#[command(
    name = "folio",
    version,
    about = "Turn a directory of markup writings into a JSON manifest of sections and shareable blocks.",
    long_about = None,
)]
pub(crate) struct Cli {
    /// Config file (defaults to ./folio.toml).
    #[arg(long, global = true, env = "FOLIO_CONFIG")]
    pub config: Option<PathBuf>,

    /// Log format: text (default) or json.
    #[arg(long, default_value = "text", global = true)]
    pub log_format: LogFormat,

    /// Verbosity level (-v, -vv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Defaults to `build` with no overrides.
    #[command(subcommand)]
    pub command: Option<Command>,
}

/// Log output format.
#[derive(Clone, Debug, clap::ValueEnum)]
pub(crate) enum LogFormat {
    Text,
    Json,
}

/// Top-level CLI subcommands.
#[derive(Subcommand)]
pub(crate) enum Command {
    /// Extract every source file and write the manifest.
    Build {
        /// Source directory (overrides `input.dir`).
        #[arg(short, long)]
        input: Option<PathBuf>,

        /// Manifest path (overrides `output.path`).
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Check an existing manifest for structural problems.
    Verify {
        /// Manifest path (defaults to `output.path`).
        #[arg(short, long)]
        manifest: Option<PathBuf>,
    },

    /// Configuration management.
    Config {
        /// Config subcommand.
        #[command(subcommand)]
        action: ConfigAction,
    },
}

/// Config subcommands.
#[derive(Subcommand)]
pub(crate) enum ConfigAction {
    /// Initialize config file with defaults.
    Init,
    /// Show resolved configuration.
    Show,
}

// ---------------------------------------------------------------------------
// Tracing setup
// ---------------------------------------------------------------------------

/// Initialize tracing based on CLI flags.
pub(crate) fn init_tracing(cli: &Cli) {
    use tracing_subscriber::{EnvFilter, fmt};

    let filter = match cli.verbose {
        0 => "folio=info",
        1 => "folio=debug",
        _ => "folio=trace",
    };

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));

    match cli.log_format {
        LogFormat::Text => {
            fmt()
                .with_env_filter(env_filter)
                .with_target(false)
                .with_writer(std::io::stderr)
                .init();
        }
        LogFormat::Json => {
            fmt()
                .json()
                .with_env_filter(env_filter)
                .with_writer(std::io::stderr)
                .init();
        }
    }
}

// ---------------------------------------------------------------------------
// Command dispatch
// ---------------------------------------------------------------------------

/// Run the CLI command.
pub(crate) async fn run(cli: Cli) -> Result<()> {
    let config_path = cli.config.as_deref();

    match cli.command {
        None => cmd_build(config_path, None, None).await,
        Some(Command::Build { input, output }) => {
            cmd_build(config_path, input.as_deref(), output.as_deref()).await
        }
        Some(Command::Verify { manifest }) => cmd_verify(config_path, manifest.as_deref()).await,
        Some(Command::Config { action }) => match action {
            ConfigAction::Init => cmd_config_init(config_path),
            ConfigAction::Show => cmd_config_show(config_path),
        },
    }
}

// ---------------------------------------------------------------------------
// Command handlers
// ---------------------------------------------------------------------------

async fn cmd_build(
    config_path: Option<&Path>,
    input: Option<&Path>,
    output: Option<&Path>,
) -> Result<()> {
    let config = load_config(config_path)?;
    let build_config = BuildConfig::from(&config).with_overrides(input, output);

    info!(
        input = %build_config.input_dir.display(),
        output = %build_config.output_path.display(),
        "building manifest"
    );

    let reporter = CliProgress::new();
    let result = folio_core::build(&build_config, &reporter).await?;

    println!();
    println!("  Manifest written.");
    println!("  Path:     {}", result.output_path.display());
    println!("  Writings: {}", result.written);
    if result.skipped > 0 {
        println!("  Skipped:  {} (see log)", result.skipped);
    }
    println!("  SHA-256:  {}", result.items_sha256);
    println!("  Time:     {:.1}s", result.elapsed.as_secs_f64());
    println!();

    Ok(())
}

async fn cmd_verify(config_path: Option<&Path>, manifest: Option<&Path>) -> Result<()> {
    let path = match manifest {
        Some(p) => p.to_path_buf(),
        None => BuildConfig::from(&load_config(config_path)?).output_path,
    };

    let loaded = load_manifest(&path).await?;
    validate_manifest(&loaded).map_err(|e| eyre!("{} failed verification: {e}", path.display()))?;

    let sections: usize = loaded.items.iter().map(|w| w.sections.len()).sum();
    let blocks: usize = loaded
        .items
        .iter()
        .flat_map(|w| &w.sections)
        .map(|s| s.blocks.len())
        .sum();

    println!(
        "{} is valid: {} writings, {sections} sections, {blocks} blocks",
        path.display(),
        loaded.items.len()
    );
    Ok(())
}

fn cmd_config_init(config_path: Option<&Path>) -> Result<()> {
    let path = init_config(config_path)?;
    println!("Config initialized at: {}", path.display());
    Ok(())
}

fn cmd_config_show(config_path: Option<&Path>) -> Result<()> {
    let config = load_config(config_path)?;
    println!("# {}", config_file_path(config_path).display());
    println!("{}", to_toml(&config)?);
    Ok(())
}

// ---------------------------------------------------------------------------
// CLI progress reporter
// ---------------------------------------------------------------------------

/// CLI progress reporter using an indicatif spinner.
struct CliProgress {
    spinner: ProgressBar,
}

impl CliProgress {
    fn new() -> Self {
        let spinner = ProgressBar::new_spinner();
        spinner.set_style(
            ProgressStyle::with_template("{spinner:.cyan} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner())
                .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"]),
        );
        spinner.enable_steady_tick(std::time::Duration::from_millis(80));
        Self { spinner }
    }
}

impl ProgressReporter for CliProgress {
    fn phase(&self, name: &str) {
        self.spinner.set_message(name.to_string());
    }

    fn file_processed(&self, file_name: &str, current: usize, total: usize) {
        self.spinner
            .set_message(format!("Extracting [{current}/{total}] {file_name}"));
    }

    fn done(&self, _result: &BuildResult) {
        self.spinner.finish_and_clear();
    }
}
