//! CLI module - Command-line interface for authkeep
//!
//! This module provides a structured CLI using clap for argument parsing.

mod commands;

use clap::{Parser, Subcommand};

/// authkeep - session and token lifecycle service
#[derive(Parser)]
#[command(name = "authkeep")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Start the HTTP API and maintenance sweeper (default)
    #[command(alias = "daemon")]
    Serve,

    /// Create default config file
    #[command(alias = "--init")]
    Init,

    /// Manage user accounts
    User {
        #[command(subcommand)]
        command: UserCommands,
    },
}

#[derive(Subcommand)]
pub enum UserCommands {
    /// Create a new account
    Add {
        #[arg(long)]
        email: String,
        /// Display name
        #[arg(long)]
        name: String,
        #[arg(long)]
        password: String,
        /// USER, MANAGER, ADMIN or `SUPER_ADMIN`
        #[arg(long, default_value = "USER")]
        role: String,
    },
    /// List all accounts
    #[command(alias = "ls")]
    List,
    /// Disable an account and revoke its sessions
    Disable {
        email: String,
    },
    /// Re-enable a disabled account
    Enable {
        email: String,
    },
}

pub use commands::*;
