//! CLI interface for Photobook

pub mod commands;
mod output;

pub use output::*;

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "photobook")]
#[command(version)]
#[command(about = "Photo galleries with cookie sessions", long_about = None)]
pub struct Cli {
    /// Production mode: require photobook.toml and real secrets
    #[arg(long, global = true, env = "PHOTOBOOK_PROD")]
    pub prod: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Initialize a new photobook.toml configuration file
    Init,

    /// Migrate the schema and start the HTTP server
    Serve {
        /// Host to bind to (defaults to server.host from the config)
        #[arg(long)]
        host: Option<String>,

        /// Port to listen on (defaults to server.port from the config)
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Create any missing tables
    Migrate,

    /// Drop every table and rebuild the schema
    Reset {
        /// Skip the confirmation check
        #[arg(short, long)]
        force: bool,
    },
}
