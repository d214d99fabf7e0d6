//! `blobswap` is a library for locating marker-delimited binary records in
//! large blob files and exchanging payloads between record pairs.
//!
//! It provides the core logic for the `bswap` command-line tool but can also
//! be used as a standalone library. The main components are:
//!
//! - `matcher`: Byte pattern search with nearest-occurrence disambiguation.
//! - `codec`: Little-endian lookup-code encoding and hex text conversion.
//! - `record`: Payload extraction and in-place overwriting between markers.
//! - `scanner`: Parallel directory scanning that maps lookup codes to record
//!   locations, with a deterministic first-found-wins merge.
//! - `swapper`: Cross-file payload exchange under per-file locking with
//!   deadlock-avoiding lock ordering.
//! - `cleanup`: Removal of scanned-but-unmodified files after a run.
//!
//! The library is designed to be fast, using parallel processing with Rayon
//! and SIMD-accelerated byte search with `memchr`.

pub mod cleanup;
pub mod cli;
pub mod codec;
pub mod config;
pub mod errors;
pub mod matcher;
pub mod record;
pub mod report;
pub mod scanner;
pub mod swapper;

// Re-export main types for easier access by library users.
pub use errors::{Error, Result};
pub use record::MarkerPair;
pub use report::{ReportFormat, ReportWriter};
pub use scanner::{LocationMap, RecordLocation, ScanOutcome};
pub use swapper::{SwapCoordinator, SwapPolicy, SwapReport, SwapRequest, WidthAdjust};
