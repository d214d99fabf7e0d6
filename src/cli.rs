use crate::swapper::{SwapPolicy, WidthAdjust};
use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// A fast scan-and-swap tool for marker-delimited binary records.
///
/// `blobswap` locates short, marker-bounded records inside large blob files
/// by their numeric lookup codes and exchanges the payloads of configured
/// code pairs, across one file or across two different files.
#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about = "Scan blob trees for marker-bounded records and swap their payloads",
    long_about = "blobswap (bswap) - A parallel scan-and-swap tool for marker-delimited binary records.

Designed for large trees of opaque blob files with:
  • SIMD-accelerated byte pattern search
  • Parallel chunked scanning with deterministic merge
  • Per-file locking with deadlock-free lock ordering
  • Atomic in-place payload writes

QUICK EXAMPLES:
  bswap swap -d unpacked/ -c swap.yaml          # Scan and swap configured pairs
  bswap swap -d unpacked/ -c swap.yaml --prune  # Also delete untouched files
  bswap locate -d unpacked/ -c swap.yaml        # Report record locations only

For detailed help on any command, use: bswap <command> --help"
)]
pub struct Args {
    #[command(subcommand)]
    pub command: Commands,
}

/// Pre-defined policy bundles for common record formats.
#[derive(clap::ValueEnum, Clone, Copy, Debug)]
pub enum Preset {
    /// Records store the payload twice; validate and update both copies.
    Mirrored,
    /// Records store the payload once; touch only the marker span.
    OneSided,
    /// One-sided records whose exchanged value gains two decimal digits.
    ScaledUp,
    /// One-sided records whose exchanged value loses two decimal digits.
    ScaledDown,
}

impl Preset {
    /// The policy and width adjustment this preset bundles.
    pub fn options(self) -> (SwapPolicy, WidthAdjust) {
        match self {
            Preset::Mirrored => (SwapPolicy::Symmetric, WidthAdjust::None),
            Preset::OneSided => (SwapPolicy::Asymmetric, WidthAdjust::None),
            Preset::ScaledUp => (SwapPolicy::Asymmetric, WidthAdjust::Append),
            Preset::ScaledDown => (SwapPolicy::Asymmetric, WidthAdjust::Strip),
        }
    }
}

/// The set of available commands for the `blobswap` CLI.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Scan a blob tree and exchange payloads for each configured code pair
    ///
    /// EXAMPLES:
    ///   bswap swap -d unpacked/ -c swap.yaml            # Swap with config policy
    ///   bswap swap -d unpacked/ -c swap.yaml --preset mirrored
    ///   bswap swap -d unpacked/ -c swap.yaml --prune    # Keep only patched files
    ///   bswap swap -d unpacked/ -c swap.yaml -f json -o report.json
    ///
    /// Config file format (swap.yaml):
    ///   swap_pairs:
    ///     - [333600100, 333600200]
    ///   hex_markers:
    ///     start: "aa78"
    ///     end: "9e78"
    ///   payload_width: 14
    Swap {
        /// Path to the YAML file defining pairs, markers, and payload width.
        #[arg(short, long, default_value = "swap.yaml")]
        config: PathBuf,

        /// The directory tree to scan and mutate.
        #[arg(short, long, required = true)]
        dir: PathBuf,

        /// Validation strictness; overrides the preset and the config file.
        #[arg(long, value_enum)]
        policy: Option<SwapPolicy>,

        /// Numeric width adjustment; overrides the preset and the config file.
        #[arg(long, value_enum)]
        scale: Option<WidthAdjust>,

        /// A policy bundle for a common record format.
        #[arg(long, value_enum)]
        preset: Option<Preset>,

        /// Delete scanned files the run never modified, then prune empty
        /// directories. Destructive.
        #[arg(long)]
        prune: bool,

        /// The number of parallel worker threads to use. Defaults to the
        /// host's available parallelism.
        #[arg(short = 'w', long = "workers", env = "BLOBSWAP_WORKERS")]
        workers: Option<usize>,

        /// The output format for the run report (`text`, `json`, `csv`).
        #[arg(short = 'f', long = "format", default_value = "text")]
        format: String,

        /// Path to the report file. If omitted, the report goes to stdout.
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Suppress the progress bar and incidental output.
        #[arg(short, long)]
        quiet: bool,
    },

    /// Scan a blob tree and report where each configured code's record lives
    ///
    /// EXAMPLES:
    ///   bswap locate -d unpacked/ -c swap.yaml          # Human-readable list
    ///   bswap locate -d unpacked/ -c swap.yaml -f json  # Machine-readable
    Locate {
        /// Path to the YAML file defining pairs, markers, and payload width.
        #[arg(short, long, default_value = "swap.yaml")]
        config: PathBuf,

        /// The directory tree to scan.
        #[arg(short, long, required = true)]
        dir: PathBuf,

        /// The number of parallel worker threads to use.
        #[arg(short = 'w', long = "workers", env = "BLOBSWAP_WORKERS")]
        workers: Option<usize>,

        /// The output format for the location report (`text`, `json`, `csv`).
        #[arg(short = 'f', long = "format", default_value = "text")]
        format: String,

        /// Path to the report file. If omitted, the report goes to stdout.
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Suppress the progress bar.
        #[arg(short, long)]
        quiet: bool,
    },
}

/// Parses command-line arguments and returns the populated `Args` struct.
pub fn parse_args() -> Args {
    Args::parse()
}
