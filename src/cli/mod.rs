//! CLI argument definitions for Logpilot.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Logpilot - a personal work-log dashboard.
///
/// Daily markdown logs, a TODO list and your open GitHub work, committed to git
/// every hour. Run `logpilot serve` for the web dashboard.
#[derive(Parser, Debug)]
#[command(name = "logpilot")]
#[command(author, version, about = "A personal work-log dashboard backed by markdown and git", long_about = None)]
#[command(arg_required_else_help = true)]
pub struct Cli {
    /// Output in human-readable format instead of JSON
    #[arg(short = 'H', long = "human", global = true)]
    pub human_readable: bool,

    /// Data root holding logs/, data/ and summaries/.
    /// Overrides LOGPILOT_DATA_DIR and the settings file.
    #[arg(short = 'D', long = "data-dir", global = true)]
    pub data_dir: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

/// Top-level commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Create the data root layout and initialize its git repository
    Init,

    /// Run the web dashboard
    Serve {
        /// Host address to bind to (use 0.0.0.0 for network access)
        #[arg(long)]
        host: Option<String>,

        /// Port to listen on
        #[arg(short, long)]
        port: Option<u16>,

        /// Do not auto-commit the data root on a timer
        #[arg(long)]
        no_scheduler: bool,

        /// Serve the UI from this directory instead of the built-in page
        #[arg(long)]
        ui_dir: Option<PathBuf>,

        /// Serve sample pull requests and notifications instead of calling GitHub
        #[arg(long)]
        demo: bool,
    },

    /// Commit logs, data and summaries now (and push if a remote exists)
    Commit {
        /// Commit message (default: "Update work log <date> <time>")
        #[arg(short, long)]
        message: Option<String>,
    },

    /// Daily log commands
    Log {
        #[command(subcommand)]
        command: LogCommands,
    },

    /// TODO list commands
    Todo {
        #[command(subcommand)]
        command: TodoCommands,
    },

    /// Show settings or edit the app config
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },

    /// List your open pull requests with CI, review and merge queue state
    Prs,

    /// List notifications that need your attention
    Notifications,

    /// Write an enriched copy of a log with GitHub links expanded
    Enrich {
        /// Date (YYYY-MM-DD, default: today)
        date: Option<String>,
    },

    /// Replace bare GitHub URLs in a log with titled links
    Linkify {
        /// Date (YYYY-MM-DD, default: today)
        date: Option<String>,
    },

    /// Suggest follow-up TODO items from a log
    Suggest {
        /// Date (YYYY-MM-DD, default: today)
        date: Option<String>,
    },

    /// Summarize the logs of a date range
    Summary {
        /// First day (YYYY-MM-DD)
        #[arg(long)]
        from: String,

        /// Last day, inclusive (YYYY-MM-DD)
        #[arg(long)]
        to: String,

        /// Extra instructions for the summary
        #[arg(long)]
        prompt: Option<String>,

        /// Also save the summary as summaries/<NAME> (must end in .md)
        #[arg(long, value_name = "NAME")]
        save: Option<String>,
    },
}

/// Log subcommands
#[derive(Subcommand, Debug)]
pub enum LogCommands {
    /// Print a day's log
    Show {
        /// Date (YYYY-MM-DD, default: today)
        date: Option<String>,
    },

    /// Replace (or append to) a day's log
    Write {
        /// Date (YYYY-MM-DD, default: today)
        date: Option<String>,

        /// New content (read from stdin if omitted)
        #[arg(short, long, allow_hyphen_values = true)]
        content: Option<String>,

        /// Append to the existing log instead of replacing it
        #[arg(short, long)]
        append: bool,
    },

    /// List the days that have a log
    Dates,

    /// Print a day's enriched log
    Rich {
        /// Date (YYYY-MM-DD, default: today)
        date: Option<String>,
    },
}

/// TODO subcommands
#[derive(Subcommand, Debug)]
pub enum TodoCommands {
    /// List TODO items
    List {
        /// Only show items that are not done
        #[arg(long)]
        open: bool,
    },

    /// Add a TODO item
    Add {
        /// Title of the item
        title: String,

        /// Mark the item as accepted from a suggestion
        #[arg(long)]
        suggested: bool,
    },

    /// Mark an item as done
    Done {
        /// Item ID (a unique prefix is enough)
        id: String,
    },

    /// Mark an item as not done
    Undone {
        /// Item ID (a unique prefix is enough)
        id: String,
    },

    /// Remove an item
    Rm {
        /// Item ID (a unique prefix is enough)
        id: String,
    },
}

/// Config subcommands
#[derive(Subcommand, Debug)]
pub enum ConfigCommands {
    /// Show resolved settings (with their sources) and the app config
    Show,

    /// Manage ignored repositories
    Ignore {
        #[command(subcommand)]
        command: IgnoreCommands,
    },
}

/// Ignored repository subcommands
#[derive(Subcommand, Debug)]
pub enum IgnoreCommands {
    /// Hide a repository from PRs, notifications and link lookups
    Add {
        /// Repository name (without owner)
        repo: String,
    },

    /// Stop ignoring a repository
    Rm {
        /// Repository name (without owner)
        repo: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_global_flags_after_subcommand() {
        let cli = Cli::try_parse_from(["logpilot", "todo", "list", "-H", "--data-dir", "/tmp/x"]).unwrap();
        assert!(cli.human_readable);
        assert_eq!(cli.data_dir, Some(PathBuf::from("/tmp/x")));
        assert!(matches!(
            cli.command,
            Commands::Todo {
                command: TodoCommands::List { open: false }
            }
        ));
    }

    #[test]
    fn test_serve_flags() {
        let cli = Cli::try_parse_from([
            "logpilot", "serve", "--port", "8080", "--no-scheduler", "--demo",
        ])
        .unwrap();
        match cli.command {
            Commands::Serve {
                port,
                no_scheduler,
                demo,
                host,
                ui_dir,
            } => {
                assert_eq!(port, Some(8080));
                assert!(no_scheduler);
                assert!(demo);
                assert!(host.is_none());
                assert!(ui_dir.is_none());
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_log_write_content_may_start_with_dash() {
        let cli = Cli::try_parse_from([
            "logpilot", "log", "write", "2024-05-01", "-c", "- shipped the parser", "--append",
        ])
        .unwrap();
        match cli.command {
            Commands::Log {
                command: LogCommands::Write { content, append, .. },
            } => {
                assert_eq!(content.as_deref(), Some("- shipped the parser"));
                assert!(append);
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_summary_requires_range() {
        assert!(Cli::try_parse_from(["logpilot", "summary", "--from", "2024-01-01"]).is_err());
    }
}
