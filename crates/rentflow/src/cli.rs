//! Clap derive structures for the `rentflow` CLI.
//!
//! Defines the complete command tree, global flags, and shared types.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

// ── Top-Level CLI ────────────────────────────────────────────────────

/// rentflow -- manage document templates with optimistic, offline-tolerant writes
#[derive(Debug, Parser)]
#[command(
    name = "rentflow",
    version,
    about = "Manage rentflow document templates from the command line",
    long_about = "Create, update and delete document templates against a rentflow backend.\n\n\
        Writes are applied optimistically and rolled back on failure. Operations\n\
        recorded while offline can be replayed with `rentflow sync`.",
    propagate_version = true,
    subcommand_required = true,
    arg_required_else_help = true
)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalOpts,

    #[command(subcommand)]
    pub command: Command,
}

// ── Global Options ───────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct GlobalOpts {
    /// Backend profile to use
    #[arg(long, short = 'p', env = "RENTFLOW_PROFILE", global = true)]
    pub profile: Option<String>,

    /// Backend base URL (overrides profile)
    #[arg(long, short = 'u', env = "RENTFLOW_URL", global = true)]
    pub url: Option<String>,

    /// Access token
    #[arg(long, env = "RENTFLOW_TOKEN", global = true, hide_env = true)]
    pub token: Option<String>,

    /// Output format
    #[arg(
        long,
        short = 'o',
        env = "RENTFLOW_OUTPUT",
        default_value = "table",
        global = true
    )]
    pub output: OutputFormat,

    /// When to use color output
    #[arg(long, default_value = "auto", global = true)]
    pub color: ColorMode,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(long, short = 'v', action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress non-error output
    #[arg(long, short = 'q', global = true)]
    pub quiet: bool,

    /// Skip confirmation prompts
    #[arg(long, short = 'y', global = true)]
    pub yes: bool,

    /// Accept self-signed TLS certificates
    #[arg(long, short = 'k', env = "RENTFLOW_INSECURE", global = true)]
    pub insecure: bool,

    /// Request timeout in seconds (overrides profile)
    #[arg(long, env = "RENTFLOW_TIMEOUT", global = true)]
    pub timeout: Option<u64>,
}

// ── Output & Color Enums ─────────────────────────────────────────────

#[derive(Debug, Clone, ValueEnum)]
pub enum OutputFormat {
    /// Pretty table (default, interactive)
    Table,
    /// Pretty-printed JSON
    Json,
    /// Compact single-line JSON
    JsonCompact,
    /// YAML
    Yaml,
    /// Plain text, one value per line (scripting)
    Plain,
}

#[derive(Debug, Clone, ValueEnum)]
pub enum ColorMode {
    /// Auto-detect (color if terminal is interactive)
    Auto,
    /// Always emit color codes
    Always,
    /// Never emit color codes
    Never,
}

// ── Top-Level Command Enum ───────────────────────────────────────────

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Manage document templates
    #[command(alias = "tpl", alias = "t")]
    Templates(TemplatesArgs),

    /// Probe the backend health endpoint
    Health,

    /// Classify an error message the way the pipeline does
    Classify(ClassifyArgs),

    /// Summarize batch endpoint responses
    Bulk(BulkArgs),

    /// Replay operations recorded while offline
    Sync(SyncArgs),

    /// Manage CLI configuration and profiles
    Config(ConfigArgs),

    /// Generate shell completions
    Completions(CompletionsArgs),
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  TEMPLATES
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Args)]
pub struct TemplatesArgs {
    #[command(subcommand)]
    pub command: TemplatesCommand,
}

#[derive(Debug, Subcommand)]
pub enum TemplatesCommand {
    /// List templates
    #[command(alias = "ls")]
    List,

    /// Get template details
    Get {
        /// Template ID
        id: String,
    },

    /// Create a template
    Create(TemplateFields),

    /// Update a template
    Update {
        /// Template ID
        id: String,

        #[command(flatten)]
        fields: TemplateFields,
    },

    /// Delete a template
    #[command(alias = "rm")]
    Delete {
        /// Template ID
        id: String,
    },
}

/// Field flags shared by create and update.
#[derive(Debug, Args)]
pub struct TemplateFields {
    /// Template title
    #[arg(long)]
    pub title: Option<String>,

    /// Template body (HTML)
    #[arg(long)]
    pub content: Option<String>,

    /// Category
    #[arg(long)]
    pub category: Option<String>,

    /// Context requirement (repeatable)
    #[arg(long = "requirement", value_name = "NAME")]
    pub requirements: Vec<String>,

    /// Read the fields from a JSON file instead
    #[arg(long, short = 'F', conflicts_with_all = ["title", "content", "category", "requirements"])]
    pub from_file: Option<PathBuf>,
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  CLASSIFY / BULK / SYNC
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Args)]
pub struct ClassifyArgs {
    /// Error message to classify
    pub message: String,

    /// HTTP status the response carried
    #[arg(long, short = 's')]
    pub status: Option<u16>,

    /// Treat the message as a transport (fetch) failure
    #[arg(long)]
    pub transport: bool,
}

#[derive(Debug, Args)]
pub struct BulkArgs {
    #[command(subcommand)]
    pub command: BulkCommand,
}

#[derive(Debug, Subcommand)]
pub enum BulkCommand {
    /// Summarize a batch response read from a file or stdin
    Summarize {
        /// JSON file, or `-` for stdin
        #[arg(value_name = "FILE")]
        input: String,

        /// Entries requested in total (defaults to updated + failed + skipped)
        #[arg(long)]
        total: Option<usize>,

        /// Entries skipped before the request
        #[arg(long, default_value = "0")]
        skipped: usize,
    },
}

#[derive(Debug, Args)]
pub struct SyncArgs {
    /// JSON file holding an array of pending operations
    #[arg(value_name = "FILE")]
    pub input: PathBuf,

    /// Give up waiting for scheduled retries after this many seconds
    #[arg(long, default_value = "60")]
    pub wait: u64,
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  CONFIG
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Args)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommand,
}

#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Create a profile (prompts for missing values)
    Init {
        /// Backend base URL
        #[arg(long)]
        url: Option<String>,

        /// Environment variable holding the access token
        #[arg(long)]
        token_env: Option<String>,
    },

    /// Show the current configuration (tokens redacted)
    Show,

    /// Print the config file path
    Path,

    /// Set a profile value
    Set {
        /// Key (url, token_env, ca_cert, insecure, timeout, max_retries,
        /// retry_delay_ms, offline_queue, serialize_same_id)
        key: String,

        /// Value
        value: String,
    },

    /// Store an access token for the active profile
    SetToken {
        /// Token value (prompted when omitted)
        #[arg(long)]
        value: Option<String>,

        /// Write the token into the config file instead of the keyring
        #[arg(long)]
        plaintext: bool,
    },
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  COMPLETIONS
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Args)]
pub struct CompletionsArgs {
    /// Shell to generate completions for
    pub shell: clap_complete::Shell,
}
