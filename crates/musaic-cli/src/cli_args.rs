//! CLI argument definitions for the musaic command-line interface.
//!
//! All `#[derive(Parser)]` and `#[derive(Subcommand)]` types are defined here,
//! keeping `main.rs` focused on dispatch logic.

use clap::{Parser, Subcommand};
use musaic_cli::audio_io::BitDepth;

/// musaic - Audio mosaicing through concatenative synthesis
#[derive(Parser)]
#[command(name = "musaic")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub(crate) struct Cli {
    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub(crate) enum Commands {
    /// Analyze source sounds and write a corpus snapshot
    Corpus {
        /// WAV files or directories (searched recursively for .wav files)
        #[arg(required = true)]
        paths: Vec<String>,

        /// Output corpus file (JSON)
        #[arg(short, long)]
        output: String,

        /// Maximum number of grains per KD-tree leaf
        #[arg(long)]
        leaf_size: Option<usize>,

        /// Only analyze the first N seconds of every source
        #[arg(long)]
        max_duration: Option<f64>,

        /// Feature kinds, comma separated (timbre, pitch)
        #[arg(long, value_delimiter = ',')]
        features: Vec<String>,

        /// Number of cepstral coefficients for timbre features
        #[arg(long)]
        n_mfcc: Option<usize>,

        /// Distance between analysis frames in samples
        #[arg(long)]
        hop_length: Option<usize>,

        /// Embed source samples in the snapshot
        #[arg(long)]
        portable: bool,

        /// Seed for the KD-tree axis choice
        #[arg(long)]
        seed: Option<u32>,
    },

    /// Match a target sound against one or more corpora
    Mosaic {
        /// Target WAV file
        target: String,

        /// Corpus snapshots to match against (repeatable)
        #[arg(short, long = "corpus", required = true)]
        corpora: Vec<String>,

        /// Output mosaic file (JSON)
        #[arg(short, long)]
        output: String,

        /// Embed target and grain source samples in the snapshot
        #[arg(long)]
        portable: bool,
    },

    /// Render a mosaic to a WAV file
    Render {
        /// Mosaic snapshot to render
        mosaic: String,

        /// Output WAV file
        #[arg(short, long)]
        output: String,

        /// Synthesis parameter file (JSON); flags override its values
        #[arg(short, long)]
        params: Option<String>,

        /// Fidelity: a number, or a JSON control such as "[1, 0.2]"
        #[arg(long)]
        fidelity: Option<String>,

        /// Grain duration in seconds (number or JSON control)
        #[arg(long)]
        grain_dur: Option<String>,

        /// Time stretch factor (number or JSON control)
        #[arg(long)]
        stretch: Option<String>,

        /// Onset jitter in seconds (number or JSON control)
        #[arg(long)]
        onset_var: Option<String>,

        /// Pan spread (number or JSON control)
        #[arg(long)]
        pan_depth: Option<String>,

        /// Grain envelope window name (hann, tukey, ...) or JSON control
        #[arg(long)]
        envelope: Option<String>,

        /// Corpus weight (number, JSON control, or JSON list per source)
        #[arg(long)]
        corpus_weight: Option<String>,

        /// Number of output channels
        #[arg(long)]
        channels: Option<usize>,

        /// Output sample rate in Hz (default: the target's)
        #[arg(long)]
        sample_rate: Option<u32>,

        /// Random seed
        #[arg(long)]
        seed: Option<u32>,

        /// Output sample format
        #[arg(long, value_enum, default_value = "24")]
        bit_depth: BitDepth,
    },

    /// Print a summary of a corpus or mosaic snapshot
    Summarize {
        /// Snapshot file (JSON)
        file: String,
    },
}
