use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Enable verbose logging
    #[arg(short, long)]
    pub verbose: bool,

    /// Configuration file path
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run the HTTP API and the background processing workers
    Serve {
        /// Bind address, overriding the configuration file
        #[arg(long)]
        host: Option<String>,

        /// Bind port, overriding the configuration file
        #[arg(long)]
        port: Option<u16>,
    },

    /// Write a configuration file populated with the defaults
    InitConfig {
        /// Where to write the file
        #[arg(short, long, default_value = "config.toml")]
        output: PathBuf,
    },

    /// Check that the audio transcoder is available
    Check,
}
