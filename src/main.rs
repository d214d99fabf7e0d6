//! The main entry point for the `blobswap` command-line application.
//!
//! This file is responsible for parsing command-line arguments and dispatching
//! to the appropriate subcommand handler in the `blobswap` library.

use blobswap::cli::{self, Commands};
use blobswap::errors::Result;
use blobswap::{scanner, swapper};
use std::env;
use std::process;

/// The main function of the application.
///
/// It parses arguments and executes the corresponding command.
fn main() -> Result<()> {
    // Check if no arguments provided (just 'bswap')
    let args_vec: Vec<String> = env::args().collect();
    if args_vec.len() == 1 {
        println!("Parallel scan-and-swap for marker-bounded binary records\n");
        println!("QUICK START EXAMPLES:");
        println!("  bswap swap -d unpacked/ -c swap.yaml            # Swap configured pairs");
        println!("  bswap swap -d unpacked/ -c swap.yaml --prune    # Keep only patched files");
        println!("  bswap swap -d unpacked/ --preset scaled-up -c vehicle.yaml");
        println!("  bswap locate -d unpacked/ -c swap.yaml          # Report record locations\n");
        println!("Run 'bswap --help' for full command list");
        println!("Run 'bswap <command> --help' for detailed command help");
        process::exit(0);
    }

    // Check for specific commands with missing args and show examples
    if args_vec.len() == 2 {
        match args_vec[1].as_str() {
            "swap" => {
                eprintln!("Error: Missing required argument: --dir <DIR>\n");
                eprintln!("USAGE EXAMPLES:");
                eprintln!("  bswap swap -d unpacked/ -c swap.yaml            # Swap configured pairs");
                eprintln!("  bswap swap -d unpacked/ -c swap.yaml --prune    # Delete untouched files");
                eprintln!("  bswap swap -d unpacked/ -c swap.yaml -f json -o report.json");
                eprintln!("\nFor more options: bswap swap --help");
                process::exit(1);
            }
            "locate" => {
                eprintln!("Error: Missing required argument: --dir <DIR>\n");
                eprintln!("USAGE EXAMPLES:");
                eprintln!("  bswap locate -d unpacked/ -c swap.yaml          # Human-readable list");
                eprintln!("  bswap locate -d unpacked/ -c swap.yaml -f json  # Machine-readable");
                eprintln!("\nFor more options: bswap locate --help");
                process::exit(1);
            }
            _ => {}
        }
    }

    let args = cli::parse_args();

    match args.command {
        Commands::Swap {
            config,
            dir,
            policy,
            scale,
            preset,
            prune,
            workers,
            format,
            output,
            quiet,
        } => swapper::run_swap(
            config, dir, policy, scale, preset, prune, workers, format, output, quiet,
        ),
        Commands::Locate {
            config,
            dir,
            workers,
            format,
            output,
            quiet,
        } => scanner::run_locate(config, dir, workers, format, output, quiet),
    }
}
