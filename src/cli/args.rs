use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

use crate::common::config::{self, RunInputs};
use crate::common::locator::BucketLocator;

/// s3bc — keep the last N backups in an S3-compatible bucket
#[derive(Parser, Debug)]
#[command(
    name = "s3bc",
    version,
    about = "Retention cleanup for backups in S3-compatible buckets",
    long_about = "s3bc deletes all but the N most recently modified objects in a bucket\n\
                   (optionally under a key prefix). Age comes from the store's\n\
                   last-modified timestamps only.",
    after_help = "EXAMPLES:\n  \
        s3bc clean --bucket s3://backups                       Keep the 5 newest objects\n  \
        s3bc clean --bucket s3://backups/mysql --save-last 10  Keep 10 under mysql/\n  \
        s3bc clean --bucket s3://backups --dry-run             Show what would be removed\n  \
        s3bc clean --bucket s3://backups --format json         Machine-readable report\n  \
        s3bc config show                                       Print effective config file"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// S3 access key
    #[arg(long, global = true, env = "AWS_ACCESS_KEY_ID", hide_env_values = true)]
    pub key: Option<String>,

    /// S3 secret key
    #[arg(long, global = true, env = "AWS_SECRET_ACCESS_KEY", hide_env_values = true)]
    pub secret: Option<String>,

    /// S3 endpoint, e.g. localhost:9000 or https://s3.amazonaws.com
    #[arg(long, global = true, env = "AWS_ENDPOINT_URL")]
    pub endpoint: Option<String>,

    /// Use HTTPS for API calls
    #[arg(long, global = true)]
    pub ssl: bool,

    /// Signing region
    #[arg(long, global = true, env = "AWS_REGION")]
    pub region: Option<String>,

    /// Config file to read defaults from
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Output format
    #[arg(long, global = true)]
    pub format: Option<OutputFormat>,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,

    /// Verbose output
    #[arg(long, short, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Delete all but the most recent backups in a bucket
    Clean {
        /// Bucket path in format s3://bucket or s3://bucket/folder
        #[arg(long, value_name = "s3://bucket[/prefix]")]
        bucket: Option<BucketLocator>,

        /// Number of backups to keep [default: 5]
        #[arg(long, value_name = "N")]
        save_last: Option<usize>,

        /// Show what would be removed without deleting anything
        #[arg(long)]
        dry_run: bool,
    },

    /// Manage the s3bc config file
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: CompletionShell,
    },
}

#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Show current configuration
    Show,

    /// Write a default config file
    Init,

    /// Print the config file location
    Path,
}

#[derive(Debug, Clone, Copy, ValueEnum, PartialEq)]
pub enum OutputFormat {
    Human,
    Json,
    Quiet,
}

impl From<config::OutputFormat> for OutputFormat {
    fn from(format: config::OutputFormat) -> Self {
        match format {
            config::OutputFormat::Human => OutputFormat::Human,
            config::OutputFormat::Json => OutputFormat::Json,
            config::OutputFormat::Quiet => OutputFormat::Quiet,
        }
    }
}

#[derive(Debug, Clone, ValueEnum)]
pub enum CompletionShell {
    Bash,
    Zsh,
    Fish,
}

impl Cli {
    /// Config file in effect: `--config` or the default location
    pub fn config_path(&self) -> PathBuf {
        self.config
            .clone()
            .unwrap_or_else(config::Config::config_path)
    }

    /// Collect the run inputs for `clean`
    pub fn run_inputs(&self, bucket: Option<BucketLocator>, save_last: Option<usize>) -> RunInputs {
        RunInputs {
            key: self.key.clone(),
            secret: self.secret.clone(),
            endpoint: self.endpoint.clone(),
            secure: self.ssl,
            region: self.region.clone(),
            bucket,
            save_last,
        }
    }
}
