//! Command-line interface for roster.
//!
//! This module provides the CLI structure for the `roster` binary.

mod commands;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

pub use commands::{
    AddCommand, ConfigCommand, DeleteCommand, EditCommand, RemoteArgs, ServeCommand, ShowCommand,
};

use crate::logging::Verbosity;

/// roster - Manage student records
///
/// Runs the student records API, or talks to a running one to list, add,
/// edit and delete students.
#[derive(Debug, Parser)]
#[command(name = "roster")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Path to custom configuration file
    #[arg(short, long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Increase verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// The command to execute
    #[command(subcommand)]
    pub command: Command,
}

/// Available commands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Run the resource API
    Serve(ServeCommand),

    /// List all students
    List {
        /// API location
        #[command(flatten)]
        remote: RemoteArgs,
    },

    /// Show one student
    Show {
        /// API location
        #[command(flatten)]
        remote: RemoteArgs,
        /// Command arguments
        #[command(flatten)]
        cmd: ShowCommand,
    },

    /// Create a student
    Add {
        /// API location
        #[command(flatten)]
        remote: RemoteArgs,
        /// Command arguments
        #[command(flatten)]
        cmd: AddCommand,
    },

    /// Update fields of a student
    Edit {
        /// API location
        #[command(flatten)]
        remote: RemoteArgs,
        /// Command arguments
        #[command(flatten)]
        cmd: EditCommand,
    },

    /// Delete a student and show the remaining list
    Delete {
        /// API location
        #[command(flatten)]
        remote: RemoteArgs,
        /// Command arguments
        #[command(flatten)]
        cmd: DeleteCommand,
    },

    /// View configuration
    #[command(subcommand)]
    Config(ConfigCommand),
}

impl Cli {
    /// Get the verbosity level based on flags.
    #[must_use]
    pub fn verbosity(&self) -> Verbosity {
        Verbosity::from_flags(self.quiet, self.verbose)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    fn parse(args: &[&str]) -> Cli {
        Cli::try_parse_from(args).unwrap()
    }

    #[test]
    fn test_cli_name() {
        let cli = Cli::command();
        assert_eq!(cli.get_name(), "roster");
    }

    #[test]
    fn test_cli_verify() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_verbosity_flags() {
        assert_eq!(parse(&["roster", "-q", "list"]).verbosity(), Verbosity::Quiet);
        assert_eq!(parse(&["roster", "list"]).verbosity(), Verbosity::Normal);
        assert_eq!(parse(&["roster", "-v", "list"]).verbosity(), Verbosity::Verbose);
        assert_eq!(parse(&["roster", "-vv", "list"]).verbosity(), Verbosity::Trace);
    }

    #[test]
    fn test_parse_serve() {
        let cli = parse(&["roster", "serve", "--port", "8080", "-d", "/tmp/s.db"]);
        let Command::Serve(serve) = cli.command else {
            panic!("expected serve");
        };
        assert_eq!(serve.port, Some(8080));
        assert_eq!(serve.database, Some(PathBuf::from("/tmp/s.db")));
        assert!(serve.host.is_none());
    }

    #[test]
    fn test_parse_add() {
        let cli = parse(&["roster", "add", "--name", "Ana", "--level", "L1"]);
        let Command::Add { cmd, remote } = cli.command else {
            panic!("expected add");
        };
        assert!(remote.url.is_none());
        let new: crate::student::NewStudent = cmd.into();
        assert_eq!(new.name.as_deref(), Some("Ana"));
        assert_eq!(new.level.as_deref(), Some("L1"));
        assert!(new.position.is_none());
    }

    #[test]
    fn test_add_requires_name_and_level() {
        assert!(Cli::try_parse_from(["roster", "add", "--name", "Ana"]).is_err());
        assert!(Cli::try_parse_from(["roster", "add", "--level", "L1"]).is_err());
    }

    #[test]
    fn test_parse_edit_builds_patch() {
        let cli = parse(&["roster", "edit", "abc", "--level", "L2"]);
        let Command::Edit { cmd, .. } = cli.command else {
            panic!("expected edit");
        };
        assert_eq!(cmd.id, "abc");
        let patch = cmd.patch();
        assert_eq!(patch.level.as_deref(), Some("L2"));
        assert!(patch.name.is_none());
        assert!(patch.position.is_none());
    }

    #[test]
    fn test_parse_delete_with_url() {
        let cli = parse(&["roster", "delete", "abc", "--url", "http://example.test"]);
        let Command::Delete { cmd, remote } = cli.command else {
            panic!("expected delete");
        };
        assert_eq!(cmd.id, "abc");
        assert_eq!(remote.url.as_deref(), Some("http://example.test"));
    }

    #[test]
    fn test_parse_with_config() {
        let cli = parse(&["roster", "-c", "/custom/config.toml", "config", "path"]);
        assert_eq!(cli.config, Some(PathBuf::from("/custom/config.toml")));
        assert!(matches!(cli.command, Command::Config(ConfigCommand::Path)));
    }
}
