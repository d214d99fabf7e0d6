use crate::codec;
use crate::config::ConfigLoader;
use crate::errors::Result;
use crate::matcher;
use crate::record::{self, MarkerPair};
use crate::report::{ReportFormat, ReportWriter};
use ignore::WalkBuilder;
use indicatif::{ProgressBar, ProgressStyle};
use rayon::prelude::*;
use std::collections::{BTreeMap, BTreeSet};
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

/// Where a lookup code's record was found.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordLocation {
    /// The file containing the record.
    pub file: PathBuf,
    /// Position of the lookup-code pattern occurrence used to find the
    /// record. The payload lies between the closest enclosing markers to this
    /// anchor, not at the anchor itself.
    pub anchor: usize,
    /// The extracted payload as hex text.
    pub payload: String,
    /// Position of the next occurrence of the payload bytes after the marker
    /// span, for record formats that store the payload twice.
    pub echo: Option<usize>,
}

/// The merged scan result: lookup code to record location.
pub type LocationMap = BTreeMap<u32, RecordLocation>;

/// Result of one scan pass over a directory tree.
#[derive(Debug, Default)]
pub struct ScanOutcome {
    pub locations: LocationMap,
    pub files_scanned: usize,
    pub files_skipped: usize,
}

/// What one worker found in its chunk of the file list.
#[derive(Default)]
struct ChunkScan {
    locations: BTreeMap<u32, RecordLocation>,
    scanned: usize,
    skipped: usize,
}

/// Resolves the worker count: the caller's request, else the host's available
/// parallelism, floor 4 when undetectable.
pub(crate) fn worker_count(requested: Option<usize>) -> usize {
    requested
        .unwrap_or_else(|| {
            std::thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(4)
        })
        .max(1)
}

/// Enumerates every regular file under `root`, recursively.
///
/// Hidden files are included and ignore-files are not honored; blob trees are
/// not source trees. The list is sorted so chunk partitioning, and therefore
/// the first-found-wins merge, is reproducible across runs.
pub fn collect_files(root: &Path) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    let mut walker = WalkBuilder::new(root);
    walker.standard_filters(false).threads(num_cpus::get());

    for entry in walker.build() {
        let entry = entry?;
        let path = entry.path();
        if path.is_file() {
            files.push(path.to_path_buf());
        }
    }
    files.sort();
    Ok(files)
}

/// Scans a directory tree for every code in `codes`, in parallel.
///
/// The file list is partitioned into contiguous chunks of size
/// `ceil(total / workers)`, one per worker. Each worker loads each of its
/// files fully into memory and, for every code it has not yet resolved
/// itself, searches for the code's little-endian pattern; on the first match
/// it attempts record extraction at that anchor. A code found by several
/// workers is resolved at merge time: the first chunk's result wins, in chunk
/// index order, deterministically regardless of completion order.
///
/// Unreadable files are logged and counted as skipped, never fatal.
pub fn scan_tree(
    root: &Path,
    codes: &BTreeSet<u32>,
    markers: &MarkerPair,
    payload_width: usize,
    workers: Option<usize>,
    quiet: bool,
) -> Result<ScanOutcome> {
    let files = collect_files(root)?;
    let workers = worker_count(workers);
    let chunk_size = files.len().div_ceil(workers).max(1);

    let progress = if quiet {
        ProgressBar::hidden()
    } else {
        let pb = ProgressBar::new(files.len() as u64);
        pb.set_style(
            ProgressStyle::default_bar()
                .template("[{elapsed_precise}] {bar:40.cyan/blue} {pos}/{len} {msg}")
                .unwrap()
                .progress_chars("##-"),
        );
        pb
    };

    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(workers)
        .build()?;

    let chunk_results: Vec<ChunkScan> = pool.install(|| {
        files
            .par_chunks(chunk_size)
            .map(|chunk| scan_chunk(chunk, codes, markers, payload_width, &progress))
            .collect()
    });

    progress.finish_and_clear();

    let mut outcome = ScanOutcome::default();
    for chunk in chunk_results {
        outcome.files_scanned += chunk.scanned;
        outcome.files_skipped += chunk.skipped;
        for (code, location) in chunk.locations {
            // First worker's result wins, in chunk index order
            outcome.locations.entry(code).or_insert(location);
        }
    }
    Ok(outcome)
}

fn scan_chunk(
    chunk: &[PathBuf],
    codes: &BTreeSet<u32>,
    markers: &MarkerPair,
    payload_width: usize,
    progress: &ProgressBar,
) -> ChunkScan {
    let mut result = ChunkScan::default();

    for path in chunk {
        let content = match fs::read(path) {
            Ok(content) => content,
            Err(e) => {
                eprintln!("Error reading file {}: {}", path.display(), e);
                result.skipped += 1;
                progress.inc(1);
                continue;
            }
        };
        result.scanned += 1;

        for &code in codes {
            if result.locations.contains_key(&code) {
                continue;
            }
            let pattern = codec::encode_code(code);
            let Some(anchor) = matcher::find_first(&content, &pattern) else {
                continue;
            };
            let Some(span) = record::locate_record(&content, markers, anchor) else {
                continue;
            };
            if span.len() != payload_width {
                continue;
            }
            let payload = &content[span.start..span.end];
            let echo =
                matcher::find_first(&content[span.end..], payload).map(|pos| span.end + pos);
            result.locations.insert(
                code,
                RecordLocation {
                    file: path.clone(),
                    anchor,
                    payload: codec::to_hex(payload),
                    echo,
                },
            );
        }
        progress.inc(1);
    }
    result
}

/// The main entry point for the `locate` command.
///
/// Scans the tree for every code referenced by the configured pairs and
/// reports where each record was found, without modifying anything.
pub fn run_locate(
    config_path: PathBuf,
    dir: PathBuf,
    workers: Option<usize>,
    format: String,
    output: Option<PathBuf>,
    quiet: bool,
) -> Result<()> {
    let resolved = ConfigLoader::find_config(&config_path, &dir)?;
    let config = ConfigLoader::load(&resolved)?;
    let markers = config.markers()?;
    let codes = config.codes();

    let outcome = scan_tree(&dir, &codes, &markers, config.payload_width, workers, quiet)?;

    let mut writer: Box<dyn Write> = match output {
        Some(path) => Box::new(BufWriter::new(File::create(path)?)),
        None => Box::new(std::io::stdout()),
    };
    let formatter = ReportWriter::new(ReportFormat::from(format.as_str()));
    formatter.write_locations(&mut writer, &codes, &outcome)?;
    Ok(())
}
