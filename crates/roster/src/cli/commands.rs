//! CLI command definitions.
//!
//! This module defines the structure of all CLI subcommands.

use std::path::PathBuf;

use clap::{Args, Subcommand};

use crate::student::{NewStudent, StudentPatch};

/// Start the resource API.
#[derive(Debug, Args)]
pub struct ServeCommand {
    /// Address to bind (overrides `server.host`)
    #[arg(long)]
    pub host: Option<String>,

    /// Port to listen on (overrides `server.port`)
    #[arg(short, long)]
    pub port: Option<u16>,

    /// Database file (overrides `store.database_path`)
    #[arg(short, long, value_name = "FILE")]
    pub database: Option<PathBuf>,
}

/// Options shared by every command that talks to the API.
#[derive(Debug, Args)]
pub struct RemoteArgs {
    /// Base URL of the API (overrides `client.base_url`)
    #[arg(long, value_name = "URL")]
    pub url: Option<String>,
}

/// Show one student.
#[derive(Debug, Args)]
pub struct ShowCommand {
    /// Student id
    pub id: String,

    /// Output as JSON
    #[arg(short, long)]
    pub json: bool,
}

/// Create a student.
#[derive(Debug, Args)]
pub struct AddCommand {
    /// Student name
    #[arg(short, long)]
    pub name: String,

    /// Student level
    #[arg(short, long)]
    pub level: String,

    /// Position or role
    #[arg(short, long)]
    pub position: Option<String>,
}

impl From<AddCommand> for NewStudent {
    fn from(cmd: AddCommand) -> Self {
        Self {
            name: Some(cmd.name),
            position: cmd.position,
            level: Some(cmd.level),
        }
    }
}

/// Update the supplied fields of a student.
#[derive(Debug, Args)]
pub struct EditCommand {
    /// Student id
    pub id: String,

    /// New name
    #[arg(short, long)]
    pub name: Option<String>,

    /// New position (empty string clears it)
    #[arg(short, long)]
    pub position: Option<String>,

    /// New level
    #[arg(short, long)]
    pub level: Option<String>,
}

impl EditCommand {
    /// The patch this command sends.
    #[must_use]
    pub fn patch(&self) -> StudentPatch {
        StudentPatch {
            name: self.name.clone(),
            position: self.position.clone(),
            level: self.level.clone(),
        }
    }
}

/// Delete a student.
#[derive(Debug, Args)]
pub struct DeleteCommand {
    /// Student id
    pub id: String,
}

/// Configuration commands.
#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Show current configuration
    Show {
        /// Output as JSON
        #[arg(short, long)]
        json: bool,
    },

    /// Show configuration file path
    Path,

    /// Validate a configuration file
    Validate {
        /// Path to config file (uses default if not specified)
        file: Option<PathBuf>,
    },
}
