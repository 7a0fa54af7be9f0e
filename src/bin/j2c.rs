//! j2c CLI - inspect JPEG 2000 codestreams through the raster adapter.
//!
//! `info` reads only the main header; `probe` runs a full decode at a chosen
//! discard level and channel window and reports the raster it would produce.

use clap::{Parser, Subcommand};
use j2c_adapter::{Codestream, DecodeStatus, J2cCodec, Raster};
use std::fs;
use std::path::PathBuf;

/// Inspect JPEG 2000 codestreams
#[derive(Parser)]
#[command(name = "j2c")]
#[command(version)]
#[command(about = "Inspect and probe-decode raw JPEG 2000 codestreams", long_about = None)]
#[command(after_help = "EXAMPLES:
    j2c info -i image.j2c
    j2c probe -i image.j2c --discard 2
    j2c probe -i image.j2c --first-channel 1 --max-channels 1")]
struct Cli {
    /// Log engine messages and timings
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show image size, component count and the engine in use
    #[command(visible_alias = "i")]
    Info {
        /// Input codestream (.j2c / .j2k)
        #[arg(short, long, help = "Path to the codestream file")]
        input: PathBuf,
    },

    /// Decode a codestream and report the resulting raster
    ///
    /// Nothing is written; the decoded samples are discarded.
    #[command(visible_alias = "p")]
    Probe {
        /// Input codestream (.j2c / .j2k)
        #[arg(short, long, help = "Path to the codestream file")]
        input: PathBuf,

        /// Number of highest resolution levels to drop
        #[arg(short, long, default_value = "0")]
        discard: u32,

        /// First component copied into the raster
        #[arg(long, default_value = "0")]
        first_channel: usize,

        /// Upper bound on the number of raster channels
        #[arg(long, default_value = "4")]
        max_channels: usize,
    },
}

fn main() {
    let cli = Cli::parse();

    let subscriber = tracing_subscriber::fmt()
        .with_max_level(if cli.verbose {
            tracing::Level::DEBUG
        } else {
            tracing::Level::WARN
        })
        .with_target(false)
        .with_writer(std::io::stderr)
        .finish();
    let _ = tracing::subscriber::set_global_default(subscriber);

    let result = match cli.command {
        Commands::Info { input } => show_info(&input),
        Commands::Probe {
            input,
            discard,
            first_channel,
            max_channels,
        } => probe(&input, discard, first_channel, max_channels),
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

fn show_info(input: &PathBuf) -> Result<(), Box<dyn std::error::Error>> {
    let data = fs::read(input)?;
    println!("File: {:?}", input);
    println!("Size: {} bytes", data.len());

    let codec = J2cCodec::new();
    let mut codestream = Codestream::from_bytes(data);
    codec.get_metadata(&mut codestream)?;

    println!("  Dimensions: {}x{}", codestream.width(), codestream.height());
    println!("  Components: {}", codestream.components());
    println!("  Engine:     {}", codec.engine_info());
    Ok(())
}

fn probe(
    input: &PathBuf,
    discard: u32,
    first_channel: usize,
    max_channels: usize,
) -> Result<(), Box<dyn std::error::Error>> {
    let data = fs::read(input)?;
    let codec = J2cCodec::new();
    let mut codestream = Codestream::from_bytes(data);
    codestream.set_raw_discard_level(discard);

    // Decode only writes into a raster that already holds a buffer.
    let mut raster = Raster::new(1, 1, 1);
    match codec.decode(&mut codestream, &mut raster, 0.0, first_channel, max_channels)? {
        DecodeStatus::Decoded => {
            println!(
                "Decoded {}x{} raster with {} channel(s), {} bytes",
                raster.width(),
                raster.height(),
                raster.components(),
                raster.data_size()
            );
        }
        DecodeStatus::Discarded(reason) => {
            println!("Decode discarded: {}", reason);
        }
    }
    Ok(())
}
