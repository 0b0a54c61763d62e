//! musaic CLI - Command-line interface for audio mosaicing
//!
//! This binary builds corpora from source sounds, matches targets against
//! them and renders the resulting mosaics to WAV files.

use clap::Parser;
use std::process::ExitCode;

use musaic_cli::commands;
use musaic_cli::commands::corpus::CorpusOptions;
use musaic_cli::commands::render::RenderOptions;
use musaic_cli::logging;

mod cli_args;

use cli_args::{Cli, Commands};

fn main() -> ExitCode {
    let cli = Cli::parse();
    logging::init(cli.verbose);

    let result = match cli.command {
        Commands::Corpus {
            paths,
            output,
            leaf_size,
            max_duration,
            features,
            n_mfcc,
            hop_length,
            portable,
            seed,
        } => commands::corpus::run(
            &paths,
            &output,
            &CorpusOptions {
                leaf_size,
                max_duration,
                features,
                n_mfcc,
                hop_length,
                portable,
                seed,
            },
        ),
        Commands::Mosaic {
            target,
            corpora,
            output,
            portable,
        } => commands::mosaic::run(&target, &corpora, &output, portable),
        Commands::Render {
            mosaic,
            output,
            params,
            fidelity,
            grain_dur,
            stretch,
            onset_var,
            pan_depth,
            envelope,
            corpus_weight,
            channels,
            sample_rate,
            seed,
            bit_depth,
        } => commands::render::run(
            &mosaic,
            &output,
            &RenderOptions {
                params,
                fidelity,
                grain_dur,
                stretch,
                onset_var,
                pan_depth,
                envelope,
                corpus_weight,
                channels,
                sample_rate,
                seed,
                bit_depth,
            },
        ),
        Commands::Summarize { file } => commands::summarize::run(&file),
    };

    match result {
        Ok(code) => code,
        Err(e) => {
            eprintln!("{}: {:#}", colored::Colorize::red("error"), e);
            ExitCode::from(1)
        }
    }
}
