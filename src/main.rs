use anyhow::{Context, Result};
use clap::Parser;
use colored::Colorize;
use tracing_subscriber::EnvFilter;

use s3bc::cleaner::{CleanOptions, CleanReport, Cleaner};
use s3bc::cli::args::{Cli, Commands, CompletionShell, ConfigAction, OutputFormat};
use s3bc::cli::output;
use s3bc::common::config::{Config, RunConfig};
use s3bc::common::BucketLocator;
use s3bc::store::S3Store;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    if cli.no_color {
        colored::control::set_override(false);
    }

    init_logging(cli.verbose);

    match cli.command {
        Commands::Clean {
            ref bucket,
            save_last,
            dry_run,
        } => cmd_clean(&cli, bucket.clone(), save_last, dry_run).await,

        Commands::Config { ref action } => cmd_config(&cli, action),

        Commands::Completions { ref shell } => {
            use clap::CommandFactory;
            let mut cmd = Cli::command();
            let shell = match shell {
                CompletionShell::Bash => clap_complete::Shell::Bash,
                CompletionShell::Zsh => clap_complete::Shell::Zsh,
                CompletionShell::Fish => clap_complete::Shell::Fish,
            };
            clap_complete::generate(shell, &mut cmd, "s3bc", &mut std::io::stdout());
            Ok(())
        }
    }
}

/// Logs go to stderr; `RUST_LOG` overrides the verbosity flag
fn init_logging(verbose: bool) {
    let default = if verbose { "s3bc=debug" } else { "s3bc=warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

// ─── Clean ────────────────────────────────────────────────────────────────────

async fn cmd_clean(
    cli: &Cli,
    bucket: Option<BucketLocator>,
    save_last: Option<usize>,
    dry_run: bool,
) -> Result<()> {
    let config = Config::load_from(&cli.config_path())?;
    let run = RunConfig::resolve(cli.run_inputs(bucket, save_last), &config)?;
    let format = cli.format.unwrap_or_else(|| config.output_format.into());

    let store = S3Store::new(&run.store_config()).context("can't create cleaner")?;
    let cleaner = Cleaner::new(store);

    let options = CleanOptions {
        save_last: run.save_last,
        dry_run,
    };
    let outcome = cleaner.clean(&run.bucket, options).await;

    // A partial failure still has a report worth printing before the error.
    let report = match &outcome {
        Ok(report) => Some(report),
        Err(e) => e.report(),
    };
    if let Some(report) = report {
        print_report(report, format, cli.verbose);
    }

    outcome.context("cleaning has failed")?;
    Ok(())
}

fn print_report(report: &CleanReport, format: OutputFormat, detailed: bool) {
    match format {
        OutputFormat::Human => output::print_clean_report(report, detailed),
        OutputFormat::Json => output::print_clean_json(report),
        OutputFormat::Quiet => output::print_clean_quiet(report),
    }
}

// ─── Config ───────────────────────────────────────────────────────────────────

fn cmd_config(cli: &Cli, action: &ConfigAction) -> Result<()> {
    let path = cli.config_path();
    match action {
        ConfigAction::Show => {
            let config = Config::load_from(&path)?;
            println!("{}", toml::to_string_pretty(&config)?);
            Ok(())
        }
        ConfigAction::Init => {
            if path.exists() {
                anyhow::bail!("Config already exists: {}", path.display());
            }
            Config::default().save_to(&path)?;
            println!("  {} Wrote default config to {}", "✓".green(), path.display());
            Ok(())
        }
        ConfigAction::Path => {
            println!("{}", path.display());
            Ok(())
        }
    }
}
