//! musaic CLI library.
//!
//! This crate provides the functionality behind the `musaic` binary: WAV
//! file I/O, logging setup and the corpus, mosaic, render and summarize
//! commands.

pub mod audio_io;
pub mod commands;
pub mod logging;
