//! CLI module for Voxa
//!
//! Provides command-line interface parsing for the `voxa` binary.
//! Uses clap for argument parsing and owo-colors for colored terminal output.

pub mod init;
pub mod output;

use crate::auth::guard::Navigator;
use clap::{Parser, Subcommand};
use parking_lot::Mutex;
use std::path::PathBuf;

/// Voxa - voice-AI dashboard
///
/// Live metrics and account management for Voxa voice agents, from the
/// terminal.
#[derive(Parser, Debug)]
#[command(
    name = "voxa",
    version,
    about = "Voxa - voice-AI dashboard",
    long_about = "Live call metrics and account management for Voxa voice agents.\n\n\
                  Sign in once with 'login'; protected commands reuse the stored session.",
    after_help = "EXAMPLES:\n    \
                  voxa init                      # Scaffold voxa.toml\n    \
                  voxa login --email me@co.com   # Sign in\n    \
                  voxa watch co_123              # Live dashboard for a company\n    \
                  voxa conversations --limit 5   # Recent calls"
)]
pub struct Cli {
    /// Path to the configuration file
    #[arg(short, long, default_value = "voxa.toml", global = true)]
    pub config: PathBuf,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Available CLI subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Create voxa.toml and .env.example
    Init {
        /// Directory to initialize (defaults to current directory)
        #[arg(default_value = ".")]
        path: PathBuf,

        /// Overwrite existing files without prompting
        #[arg(short, long)]
        force: bool,

        /// API endpoint to configure
        #[arg(long, default_value = "http://localhost:3000")]
        base_url: String,
    },

    /// Sign in and store the session token
    Login {
        #[arg(short, long)]
        email: String,

        /// Password (read from VOXA_PASSWORD when omitted)
        #[arg(short, long, env = "VOXA_PASSWORD", hide_env_values = true)]
        password: String,
    },

    /// Clear the stored session
    Logout,

    /// Show the signed-in user
    Whoami,

    /// Live dashboard metrics for a company
    Watch {
        /// Company identifier
        company: String,
    },

    /// List voice agents
    Agents,

    /// List phone numbers
    Numbers,

    /// List recent conversations
    Conversations {
        /// Only conversations handled by this agent
        #[arg(long)]
        agent: Option<String>,

        #[arg(short, long)]
        limit: Option<u32>,
    },

    /// List campaigns
    Campaigns,

    /// Recent account activity
    Activities {
        #[arg(short, long)]
        limit: Option<u32>,
    },

    /// Show configuration information
    Config {
        /// Validate the configuration file and exit
        #[arg(long)]
        validate: bool,
    },
}

impl Cli {
    /// Parse CLI arguments
    pub fn parse_args() -> Self {
        Self::parse()
    }
}

/// Navigator for the terminal: there is no page to move to, so a redirect
/// to the login path becomes a sign-in hint.
pub struct TerminalNavigator {
    colored: bool,
    visited: Mutex<Vec<String>>,
}

impl TerminalNavigator {
    pub fn new(colored: bool) -> Self {
        Self {
            colored,
            visited: Mutex::new(Vec::new()),
        }
    }

    /// Paths navigated to so far.
    pub fn visited(&self) -> Vec<String> {
        self.visited.lock().clone()
    }
}

impl Navigator for TerminalNavigator {
    fn navigate(&self, path: &str) {
        self.visited.lock().push(path.to_string());
        let out = if self.colored {
            output::Output::new()
        } else {
            output::Output::no_color()
        };
        out.warning(&format!("Not signed in (redirect to {})", path));
        out.command("voxa login --email <you@company.com>");
    }
}
