//! CLI interface for tonebox

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Keyboard, octapad and remixer sounds from the terminal
#[derive(Parser)]
#[command(name = "tonebox")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Play a saved sequence through the audio device
    Play {
        /// Configuration file path
        #[arg(short, long, default_value = "tonebox.yaml")]
        config: PathBuf,

        /// Sequence JSON file
        #[arg(short, long)]
        sequence: PathBuf,
    },

    /// Render a saved sequence to a WAV file
    Render {
        /// Configuration file path
        #[arg(short, long, default_value = "tonebox.yaml")]
        config: PathBuf,

        /// Sequence JSON file
        #[arg(short, long)]
        sequence: PathBuf,

        /// Output file path
        #[arg(short, long)]
        output: PathBuf,
    },

    /// Listen to a random pad pattern, then type it back
    Practice {
        /// Configuration file path
        #[arg(short, long, default_value = "tonebox.yaml")]
        config: PathBuf,

        /// Pattern length (4, 8 or 12)
        #[arg(short, long, default_value = "4")]
        level: usize,
    },

    /// List drum kits and their pads
    Kits {
        /// Configuration file path
        #[arg(short, long, default_value = "tonebox.yaml")]
        config: PathBuf,
    },

    /// List available audio output devices
    Devices,

    /// Validate a configuration file
    Check {
        /// Configuration file path
        #[arg(short, long, default_value = "tonebox.yaml")]
        config: PathBuf,
    },

    /// Generate an example configuration file
    Init,
}
