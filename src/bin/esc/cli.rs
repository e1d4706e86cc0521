//! esc cli interface

use clap::{Parser, Subcommand, ValueEnum};
use std::fmt::Formatter;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Service URL
    ///
    /// Overrides PULUMI_BACKEND_URL. The access token is always read from
    /// PULUMI_ACCESS_TOKEN.
    #[clap(long = "backend-url", global(true))]
    pub backend_url: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Manage environments
    #[command(subcommand)]
    Env(EnvCommand),
}

#[derive(Subcommand, Debug)]
pub enum EnvCommand {
    /// List every environment in an organization
    Ls { org: String },

    /// Create an empty environment
    Init { org: String, env: String },

    /// Print an environment's definition, or its evaluated values
    Get {
        org: String,
        env: String,

        /// Show secrets in plaintext
        #[clap(long = "show-secrets")]
        show_secrets: bool,

        /// Print the evaluated values in this format instead of the
        /// definition. Secrets are redacted without --show-secrets.
        #[arg(long = "value")]
        value: Option<OpenFormat>,
    },

    /// Replace an environment's definition with a YAML file
    ///
    /// Use `-` to read from stdin.
    Update { org: String, env: String, file: PathBuf },

    /// Check a YAML definition without storing it
    ///
    /// Use `-` to read from stdin.
    Check { org: String, file: PathBuf },

    /// Delete an environment
    Rm { org: String, env: String },

    /// Open an environment and print its values
    Open {
        org: String,
        env: String,

        /// Print a single property path, e.g. `pulumiConfig.foo`
        #[clap(short = 'p', long = "property")]
        property: Option<String>,

        #[arg(short = 'F', long = "format", default_value_t)]
        format: OpenFormat,

        /// Print `[unknown]` for `files` entries instead of writing them to
        /// temporary files
        #[clap(long = "pretend")]
        pretend: bool,
    },
}

#[derive(ValueEnum, Clone, Copy, Default, Debug, PartialEq, Eq)]
pub enum OpenFormat {
    #[default]
    Json,
    Yaml,
    /// environmentVariables and files as KEY="value" lines
    Dotenv,
    /// environmentVariables and files as `export KEY="value"` lines
    Shell,
}

impl std::fmt::Display for OpenFormat {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            OpenFormat::Json => f.write_str("json"),
            OpenFormat::Yaml => f.write_str("yaml"),
            OpenFormat::Dotenv => f.write_str("dotenv"),
            OpenFormat::Shell => f.write_str("shell"),
        }
    }
}
