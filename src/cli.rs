use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "livedash")]
#[command(author, version, about = "Live H.264 timing and DASH manifest tool")]
pub struct Cli {
    /// Path to config file
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Print presentation and composition timestamps of an Annex B H.264 stream
    Timestamps {
        /// Raw H.264 elementary stream
        #[arg(required = true)]
        file: PathBuf,

        /// Frame rate, overriding config and SPS timing info
        #[arg(long)]
        fps: Option<u32>,
    },

    /// Segment an Annex B H.264 stream and print the live manifest
    Manifest {
        /// Raw H.264 elementary stream
        #[arg(required = true)]
        file: PathBuf,

        /// Frame rate, overriding config and SPS timing info
        #[arg(long)]
        fps: Option<u32>,

        /// Pictures per segment
        #[arg(long, default_value = "25")]
        segment_frames: u32,
    },

    /// Validate configuration file
    Validate {
        /// Config file to validate (uses default if not specified)
        config: Option<PathBuf>,
    },

    /// Display version information
    Version,
}
