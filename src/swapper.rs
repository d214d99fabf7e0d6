use crate::cleanup;
use crate::cli::Preset;
use crate::codec;
use crate::config::ConfigLoader;
use crate::errors::{Error, Result};
use crate::record::{self, MarkerPair};
use crate::report::{ReportFormat, ReportWriter, RunReport};
use crate::scanner::{self, LocationMap, RecordLocation};
use rayon::prelude::*;
use serde::Deserialize;
use std::collections::{BTreeSet, HashMap};
use std::fmt;
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tempfile::NamedTempFile;

/// How strictly a record is validated before its payload is exchanged.
///
/// Some record formats store the payload twice; for those the symmetric
/// policy checks and updates both copies. Formats that store it once use the
/// asymmetric policy, which touches only the marker span. The two are kept as
/// distinct, caller-selected strictness levels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SwapPolicy {
    /// Validate and update the marker span and the payload's echo occurrence.
    Symmetric,
    /// Validate and update only the marker span.
    Asymmetric,
}

/// Numeric width adjustment applied to the first code's payload before the
/// exchange.
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WidthAdjust {
    /// Exchange payloads unmodified.
    None,
    /// Append two trailing decimal digits (multiply the value by 100).
    Append,
    /// Strip two trailing decimal digits (divide the value by 100).
    Strip,
}

/// An unordered pair of lookup codes whose payloads are to be exchanged.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SwapRequest {
    pub first: u32,
    pub second: u32,
}

impl fmt::Display for SwapRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} <-> {}", self.first, self.second)
    }
}

/// Why a located pair was skipped without being applied.
///
/// Skips are distinct from unresolved pairs: the records were found, the
/// exchange just could not be applied safely.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// A payload span no longer holds the value read during the scan.
    StalePayload,
    /// The two payloads (after any width adjustment) differ in length.
    WidthMismatch,
    /// The numeric width adjustment overflowed or the payload is not numeric.
    NumericTransform,
    /// A participating file could not be read or written.
    Io,
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            SkipReason::StalePayload => "stale payload",
            SkipReason::WidthMismatch => "payload width mismatch",
            SkipReason::NumericTransform => "numeric transform failed",
            SkipReason::Io => "file unreadable or unwritable",
        };
        f.write_str(text)
    }
}

/// The accumulated outcome of one coordinator run.
///
/// Owned by the coordinator and returned to the caller; no global state.
#[derive(Debug, Default)]
pub struct SwapReport {
    /// Files that received at least one successful write.
    pub modified_files: BTreeSet<PathBuf>,
    /// Pairs for which one or both records were never located.
    pub unresolved: Vec<SwapRequest>,
    /// Pairs located but skipped before any write.
    pub skipped: Vec<(SwapRequest, SkipReason)>,
    /// Number of pairs fully applied.
    pub swapped: usize,
}

/// Exchanges payloads between located record pairs under per-file mutual
/// exclusion.
pub struct SwapCoordinator<'a> {
    markers: &'a MarkerPair,
    policy: SwapPolicy,
    adjust: WidthAdjust,
}

impl<'a> SwapCoordinator<'a> {
    pub fn new(markers: &'a MarkerPair, policy: SwapPolicy, adjust: WidthAdjust) -> Self {
        Self {
            markers,
            policy,
            adjust,
        }
    }

    /// Processes every request against the merged location map.
    ///
    /// Requests are partitioned into contiguous chunks across a fork-join
    /// worker pool. All writes to one file are serialized by that file's
    /// mutex; when a pair spans two files, the mutexes are acquired in
    /// lexicographic path order so that two pairs referencing the same files
    /// in opposite order cannot deadlock. The report is guarded by its own
    /// lock, acquired only for brief appends.
    pub fn execute(
        &self,
        locations: &LocationMap,
        requests: &[SwapRequest],
        workers: Option<usize>,
    ) -> Result<SwapReport> {
        // One mutex per file participating in at least one swap
        let mut file_mutexes: HashMap<&Path, Mutex<()>> = HashMap::new();
        for request in requests {
            if let (Some(a), Some(b)) = (
                locations.get(&request.first),
                locations.get(&request.second),
            ) {
                file_mutexes.entry(&a.file).or_default();
                file_mutexes.entry(&b.file).or_default();
            }
        }

        let report = Mutex::new(SwapReport::default());
        let workers = scanner::worker_count(workers);
        let chunk_size = requests.len().div_ceil(workers).max(1);

        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(workers)
            .build()?;

        pool.install(|| {
            requests.par_chunks(chunk_size).for_each(|chunk| {
                for request in chunk {
                    self.process_request(*request, locations, &file_mutexes, &report);
                }
            });
        });

        Ok(report.into_inner().unwrap())
    }

    fn process_request(
        &self,
        request: SwapRequest,
        locations: &LocationMap,
        file_mutexes: &HashMap<&Path, Mutex<()>>,
        report: &Mutex<SwapReport>,
    ) {
        let (Some(a), Some(b)) = (
            locations.get(&request.first),
            locations.get(&request.second),
        ) else {
            report.lock().unwrap().unresolved.push(request);
            return;
        };

        let outcome = if a.file == b.file {
            let _guard = file_mutexes[a.file.as_path()].lock().unwrap();
            self.swap_within_file(a, b)
        } else {
            // Lock ordering: always acquire in lexicographic path order,
            // regardless of which code came first in the request.
            let (first, second) = if a.file <= b.file {
                (&a.file, &b.file)
            } else {
                (&b.file, &a.file)
            };
            let _guard_first = file_mutexes[first.as_path()].lock().unwrap();
            let _guard_second = file_mutexes[second.as_path()].lock().unwrap();
            self.swap_across_files(a, b)
        };

        let mut report = report.lock().unwrap();
        match outcome {
            PairOutcome::Applied(touched) => {
                report.swapped += 1;
                report.modified_files.extend(touched);
            }
            PairOutcome::Skipped(reason, touched) => {
                report.skipped.push((request, reason));
                // Files persisted before the failure were still written
                report.modified_files.extend(touched);
            }
        }
    }

    /// Computes the byte sequences written into each record: the first
    /// record receives the second's payload, the second receives the first's
    /// payload after any numeric width adjustment.
    fn exchanged_payloads(
        &self,
        payload_a: &[u8],
        payload_b: &[u8],
    ) -> std::result::Result<(Vec<u8>, Vec<u8>), SkipReason> {
        let outgoing_a = match self.adjust {
            WidthAdjust::None => payload_a.to_vec(),
            WidthAdjust::Append => codec::append_decimal_digits(payload_a)
                .map_err(|_| SkipReason::NumericTransform)?,
            WidthAdjust::Strip => codec::strip_decimal_digits(payload_a)
                .map_err(|_| SkipReason::NumericTransform)?,
        };
        if outgoing_a.len() != payload_b.len() {
            return Err(SkipReason::WidthMismatch);
        }
        Ok((payload_b.to_vec(), outgoing_a))
    }

    /// Checks that a record still holds the payload read during the scan.
    ///
    /// The marker span is re-resolved fresh against the buffer; under the
    /// symmetric policy the echo occurrence must also still hold the payload.
    fn validate_record(
        &self,
        buffer: &[u8],
        location: &RecordLocation,
        expected: &[u8],
    ) -> std::result::Result<(), SkipReason> {
        let span = record::locate_record(buffer, self.markers, location.anchor)
            .ok_or(SkipReason::StalePayload)?;
        if span.len() != expected.len() || &buffer[span.start..span.end] != expected {
            return Err(SkipReason::StalePayload);
        }
        if self.policy == SwapPolicy::Symmetric {
            let echo = location.echo.ok_or(SkipReason::StalePayload)?;
            let end = echo + expected.len();
            if end > buffer.len() || &buffer[echo..end] != expected {
                return Err(SkipReason::StalePayload);
            }
        }
        Ok(())
    }

    /// Writes `new_payload` into a record: the marker span always, the echo
    /// occurrence as well under the symmetric policy. All overwrites preserve
    /// length, so recorded positions stay valid across writes by other pairs.
    fn write_record(
        &self,
        buffer: &mut [u8],
        location: &RecordLocation,
        new_payload: &[u8],
    ) -> std::result::Result<(), SkipReason> {
        match record::write_payload(buffer, self.markers, location.anchor, new_payload) {
            Ok(true) => {}
            Ok(false) => return Err(SkipReason::StalePayload),
            Err(_) => return Err(SkipReason::WidthMismatch),
        }
        if self.policy == SwapPolicy::Symmetric {
            // Existence and content were checked during validation
            if let Some(echo) = location.echo {
                buffer[echo..echo + new_payload.len()].copy_from_slice(new_payload);
            }
        }
        Ok(())
    }

    /// Builds the updated buffer for a pair living in one file: read,
    /// validate both spans, then write both, all before anything persists.
    fn patched_content_single(
        &self,
        a: &RecordLocation,
        b: &RecordLocation,
    ) -> std::result::Result<Vec<u8>, SkipReason> {
        let payload_a = codec::from_hex(&a.payload).map_err(|_| SkipReason::NumericTransform)?;
        let payload_b = codec::from_hex(&b.payload).map_err(|_| SkipReason::NumericTransform)?;
        let (new_a, new_b) = self.exchanged_payloads(&payload_a, &payload_b)?;

        let mut content = fs::read(&a.file).map_err(|e| {
            eprintln!("Error reading file {}: {}", a.file.display(), e);
            SkipReason::Io
        })?;

        self.validate_record(&content, a, &payload_a)?;
        self.validate_record(&content, b, &payload_b)?;

        self.write_record(&mut content, a, &new_a)?;
        self.write_record(&mut content, b, &new_b)?;
        Ok(content)
    }

    /// Builds both updated buffers for a cross-file pair. Both sides are
    /// validated before either is written, so a failed validation leaves
    /// neither file modified.
    fn patched_content_pair(
        &self,
        a: &RecordLocation,
        b: &RecordLocation,
    ) -> std::result::Result<(Vec<u8>, Vec<u8>), SkipReason> {
        let payload_a = codec::from_hex(&a.payload).map_err(|_| SkipReason::NumericTransform)?;
        let payload_b = codec::from_hex(&b.payload).map_err(|_| SkipReason::NumericTransform)?;
        let (new_a, new_b) = self.exchanged_payloads(&payload_a, &payload_b)?;

        let read = |path: &Path| {
            fs::read(path).map_err(|e| {
                eprintln!("Error reading file {}: {}", path.display(), e);
                SkipReason::Io
            })
        };
        let mut content_a = read(&a.file)?;
        let mut content_b = read(&b.file)?;

        self.validate_record(&content_a, a, &payload_a)?;
        self.validate_record(&content_b, b, &payload_b)?;

        self.write_record(&mut content_a, a, &new_a)?;
        self.write_record(&mut content_b, b, &new_b)?;
        Ok((content_a, content_b))
    }

    fn swap_within_file(&self, a: &RecordLocation, b: &RecordLocation) -> PairOutcome {
        let content = match self.patched_content_single(a, b) {
            Ok(content) => content,
            Err(reason) => return PairOutcome::Skipped(reason, Vec::new()),
        };
        match persist_buffer(&a.file, &content) {
            Ok(()) => PairOutcome::Applied(vec![a.file.clone()]),
            Err(e) => {
                eprintln!("Error writing file {}: {}", a.file.display(), e);
                PairOutcome::Skipped(SkipReason::Io, Vec::new())
            }
        }
    }

    fn swap_across_files(&self, a: &RecordLocation, b: &RecordLocation) -> PairOutcome {
        let (content_a, content_b) = match self.patched_content_pair(a, b) {
            Ok(contents) => contents,
            Err(reason) => return PairOutcome::Skipped(reason, Vec::new()),
        };

        // The two persists are not atomic as a unit; a crash between them can
        // leave one file updated and the other not
        if let Err(e) = persist_buffer(&a.file, &content_a) {
            eprintln!("Error writing file {}: {}", a.file.display(), e);
            return PairOutcome::Skipped(SkipReason::Io, Vec::new());
        }
        if let Err(e) = persist_buffer(&b.file, &content_b) {
            eprintln!("Error writing file {}: {}", b.file.display(), e);
            return PairOutcome::Skipped(SkipReason::Io, vec![a.file.clone()]);
        }
        PairOutcome::Applied(vec![a.file.clone(), b.file.clone()])
    }
}

/// What one request produced, and which files it actually persisted.
enum PairOutcome {
    /// The exchange was fully applied to the listed files.
    Applied(Vec<PathBuf>),
    /// The pair was skipped; files persisted before the failure are listed.
    Skipped(SkipReason, Vec<PathBuf>),
}

/// Atomically replaces `path` with `content`, preserving permissions.
fn persist_buffer(path: &Path, content: &[u8]) -> Result<()> {
    let parent = path
        .parent()
        .ok_or_else(|| Error::Config(format!("no parent directory for {}", path.display())))?;
    let mut temp_file = NamedTempFile::new_in(parent)?;
    temp_file.write_all(content)?;

    let perms = fs::metadata(path)?.permissions();
    fs::set_permissions(temp_file.path(), perms)?;

    temp_file.persist(path)?;
    Ok(())
}

/// The main entry point for the `swap` command.
///
/// This function orchestrates the entire run:
/// 1. It loads the configuration and resolves the effective policy
///    (explicit flags override a preset, which overrides the config file).
/// 2. It scans the directory tree for every referenced code.
/// 3. It exchanges payloads for each configured pair.
/// 4. Optionally it prunes files the run never modified.
/// 5. It writes the run report in the requested format.
pub fn run_swap(
    config_path: PathBuf,
    dir: PathBuf,
    policy: Option<SwapPolicy>,
    scale: Option<WidthAdjust>,
    preset: Option<Preset>,
    prune: bool,
    workers: Option<usize>,
    format: String,
    output: Option<PathBuf>,
    quiet: bool,
) -> Result<()> {
    let resolved = ConfigLoader::find_config(&config_path, &dir)?;
    if !quiet {
        println!("Using config file: {}", resolved.display());
    }
    let config = ConfigLoader::load(&resolved)?;
    let markers = config.markers()?;

    let (preset_policy, preset_scale) = preset.map(Preset::options).unzip();
    let policy = policy
        .or(preset_policy)
        .or(config.policy)
        .unwrap_or(SwapPolicy::Symmetric);
    let adjust = scale
        .or(preset_scale)
        .or(config.scale)
        .unwrap_or(WidthAdjust::None);

    let codes = config.codes();
    let outcome = scanner::scan_tree(&dir, &codes, &markers, config.payload_width, workers, quiet)?;

    let coordinator = SwapCoordinator::new(&markers, policy, adjust);
    let swap = coordinator.execute(&outcome.locations, &config.requests(), workers)?;

    let pruned = if prune {
        Some(cleanup::prune_unmodified(&dir, &swap.modified_files)?)
    } else {
        None
    };

    let run = RunReport {
        files_scanned: outcome.files_scanned,
        files_skipped: outcome.files_skipped,
        codes_located: outcome.locations.len(),
        swap,
        pruned,
    };

    let mut writer: Box<dyn Write> = match output {
        Some(path) => Box::new(BufWriter::new(File::create(path)?)),
        None => Box::new(std::io::stdout()),
    };
    let formatter = ReportWriter::new(ReportFormat::from(format.as_str()));
    formatter.write_run(&mut writer, &run)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::encode_code;
    use std::collections::BTreeSet;
    use tempfile::TempDir;

    const START: &[u8] = &[0xaa, 0x01];
    const END: &[u8] = &[0xbb, 0x02];
    const WIDTH: usize = 4;

    fn markers() -> MarkerPair {
        MarkerPair {
            start: START.to_vec(),
            end: END.to_vec(),
        }
    }

    fn record_bytes(code: u32, payload: &[u8], echo: bool) -> Vec<u8> {
        let mut buf = vec![0x11; 8];
        buf.extend_from_slice(&encode_code(code));
        buf.extend_from_slice(&[0x22; 4]);
        buf.extend_from_slice(START);
        buf.extend_from_slice(payload);
        buf.extend_from_slice(END);
        if echo {
            buf.extend_from_slice(&[0x33; 3]);
            buf.extend_from_slice(payload);
        }
        buf.extend_from_slice(&[0x44; 6]);
        buf
    }

    fn scan(dir: &TempDir, codes: &[u32]) -> LocationMap {
        let codes: BTreeSet<u32> = codes.iter().copied().collect();
        scanner::scan_tree(dir.path(), &codes, &markers(), WIDTH, Some(2), true)
            .unwrap()
            .locations
    }

    fn requests(pairs: &[(u32, u32)]) -> Vec<SwapRequest> {
        pairs
            .iter()
            .map(|&(first, second)| SwapRequest { first, second })
            .collect()
    }

    #[test]
    fn test_cross_file_swap_exchanges_only_payload_spans() {
        let dir = TempDir::new().unwrap();
        let payload_a = [0xa1, 0xa2, 0xa3, 0xa4];
        let payload_b = [0xb1, 0xb2, 0xb3, 0xb4];
        let original_a = record_bytes(10, &payload_a, false);
        let original_b = record_bytes(20, &payload_b, false);
        fs::write(dir.path().join("a.bin"), &original_a).unwrap();
        fs::write(dir.path().join("b.bin"), &original_b).unwrap();

        let locations = scan(&dir, &[10, 20]);
        let m = markers();
        let coordinator = SwapCoordinator::new(&m, SwapPolicy::Asymmetric, WidthAdjust::None);
        let report = coordinator
            .execute(&locations, &requests(&[(10, 20)]), Some(2))
            .unwrap();

        assert_eq!(report.swapped, 1);
        assert_eq!(report.modified_files.len(), 2);
        assert!(report.unresolved.is_empty());
        assert!(report.skipped.is_empty());

        let after_a = fs::read(dir.path().join("a.bin")).unwrap();
        let after_b = fs::read(dir.path().join("b.bin")).unwrap();
        // Payload spans exchanged (span is 18..22 in the fixture layout)
        assert_eq!(&after_a[18..22], &payload_b);
        assert_eq!(&after_b[18..22], &payload_a);
        // No unrelated byte changed
        assert_eq!(&after_a[..18], &original_a[..18]);
        assert_eq!(&after_a[22..], &original_a[22..]);
        assert_eq!(&after_b[..18], &original_b[..18]);
        assert_eq!(&after_b[22..], &original_b[22..]);
    }

    #[test]
    fn test_swap_twice_is_involution() {
        let dir = TempDir::new().unwrap();
        let original_a = record_bytes(10, &[0xa1, 0xa2, 0xa3, 0xa4], true);
        let original_b = record_bytes(20, &[0xb1, 0xb2, 0xb3, 0xb4], true);
        fs::write(dir.path().join("a.bin"), &original_a).unwrap();
        fs::write(dir.path().join("b.bin"), &original_b).unwrap();

        let m = markers();
        for _ in 0..2 {
            let locations = scan(&dir, &[10, 20]);
            let coordinator = SwapCoordinator::new(&m, SwapPolicy::Symmetric, WidthAdjust::None);
            let report = coordinator
                .execute(&locations, &requests(&[(10, 20)]), Some(2))
                .unwrap();
            assert_eq!(report.swapped, 1);
        }

        assert_eq!(fs::read(dir.path().join("a.bin")).unwrap(), original_a);
        assert_eq!(fs::read(dir.path().join("b.bin")).unwrap(), original_b);
    }

    #[test]
    fn test_same_file_swap() {
        let dir = TempDir::new().unwrap();
        let payload_a = [0xa1, 0xa2, 0xa3, 0xa4];
        let payload_b = [0xb1, 0xb2, 0xb3, 0xb4];
        let mut content = record_bytes(10, &payload_a, false);
        let second_start = content.len();
        content.extend_from_slice(&record_bytes(20, &payload_b, false));
        fs::write(dir.path().join("a.bin"), &content).unwrap();

        let locations = scan(&dir, &[10, 20]);
        let m = markers();
        let coordinator = SwapCoordinator::new(&m, SwapPolicy::Asymmetric, WidthAdjust::None);
        let report = coordinator
            .execute(&locations, &requests(&[(10, 20)]), Some(2))
            .unwrap();

        assert_eq!(report.swapped, 1);
        assert_eq!(report.modified_files.len(), 1);

        let after = fs::read(dir.path().join("a.bin")).unwrap();
        assert_eq!(&after[18..22], &payload_b);
        assert_eq!(
            &after[second_start + 18..second_start + 22],
            &payload_a
        );
    }

    #[test]
    fn test_missing_code_is_unresolved_with_zero_mutations() {
        let dir = TempDir::new().unwrap();
        let original = record_bytes(10, &[0xa1, 0xa2, 0xa3, 0xa4], false);
        fs::write(dir.path().join("a.bin"), &original).unwrap();

        let locations = scan(&dir, &[10, 99]);
        let m = markers();
        let coordinator = SwapCoordinator::new(&m, SwapPolicy::Asymmetric, WidthAdjust::None);
        let report = coordinator
            .execute(&locations, &requests(&[(10, 99)]), Some(2))
            .unwrap();

        assert_eq!(report.swapped, 0);
        assert_eq!(report.unresolved, requests(&[(10, 99)]));
        assert!(report.modified_files.is_empty());
        assert_eq!(fs::read(dir.path().join("a.bin")).unwrap(), original);
    }

    #[test]
    fn test_width_mismatch_is_validation_failure_not_unresolved() {
        let dir = TempDir::new().unwrap();
        fs::write(
            dir.path().join("a.bin"),
            record_bytes(10, &[0xa1, 0xa2, 0xa3, 0xa4], false),
        )
        .unwrap();

        // Handcraft a location map whose second payload is wider
        let mut locations = scan(&dir, &[10]);
        locations.insert(
            20,
            RecordLocation {
                file: dir.path().join("a.bin"),
                anchor: 8,
                payload: "b1b2b3b4b5b6".into(),
                echo: None,
            },
        );

        let m = markers();
        let coordinator = SwapCoordinator::new(&m, SwapPolicy::Asymmetric, WidthAdjust::None);
        let report = coordinator
            .execute(&locations, &requests(&[(10, 20)]), Some(2))
            .unwrap();

        assert_eq!(report.swapped, 0);
        assert!(report.unresolved.is_empty());
        assert_eq!(report.skipped.len(), 1);
        assert_eq!(report.skipped[0].1, SkipReason::WidthMismatch);
        assert!(report.modified_files.is_empty());
    }

    #[test]
    fn test_stale_payload_skips_without_modifying_either_file() {
        let dir = TempDir::new().unwrap();
        fs::write(
            dir.path().join("a.bin"),
            record_bytes(10, &[0xa1, 0xa2, 0xa3, 0xa4], false),
        )
        .unwrap();
        let original_b = record_bytes(20, &[0xb1, 0xb2, 0xb3, 0xb4], false);
        fs::write(dir.path().join("b.bin"), &original_b).unwrap();

        let locations = scan(&dir, &[10, 20]);
        // Concurrent modification after the scan
        let tampered = record_bytes(10, &[0xde, 0xad, 0xbe, 0xef], false);
        fs::write(dir.path().join("a.bin"), &tampered).unwrap();

        let m = markers();
        let coordinator = SwapCoordinator::new(&m, SwapPolicy::Asymmetric, WidthAdjust::None);
        let report = coordinator
            .execute(&locations, &requests(&[(10, 20)]), Some(2))
            .unwrap();

        assert_eq!(report.swapped, 0);
        assert_eq!(report.skipped.len(), 1);
        assert_eq!(report.skipped[0].1, SkipReason::StalePayload);
        assert_eq!(fs::read(dir.path().join("b.bin")).unwrap(), original_b);
    }

    #[test]
    fn test_symmetric_requires_echo() {
        let dir = TempDir::new().unwrap();
        // Records without a second payload occurrence
        fs::write(
            dir.path().join("a.bin"),
            record_bytes(10, &[0xa1, 0xa2, 0xa3, 0xa4], false),
        )
        .unwrap();
        fs::write(
            dir.path().join("b.bin"),
            record_bytes(20, &[0xb1, 0xb2, 0xb3, 0xb4], false),
        )
        .unwrap();

        let locations = scan(&dir, &[10, 20]);
        let m = markers();
        let coordinator = SwapCoordinator::new(&m, SwapPolicy::Symmetric, WidthAdjust::None);
        let report = coordinator
            .execute(&locations, &requests(&[(10, 20)]), Some(2))
            .unwrap();

        assert_eq!(report.swapped, 0);
        assert_eq!(report.skipped.len(), 1);
        assert_eq!(report.skipped[0].1, SkipReason::StalePayload);
    }

    #[test]
    fn test_symmetric_updates_both_occurrences() {
        let dir = TempDir::new().unwrap();
        let payload_a = [0xa1, 0xa2, 0xa3, 0xa4];
        let payload_b = [0xb1, 0xb2, 0xb3, 0xb4];
        fs::write(dir.path().join("a.bin"), record_bytes(10, &payload_a, true)).unwrap();
        fs::write(dir.path().join("b.bin"), record_bytes(20, &payload_b, true)).unwrap();

        let locations = scan(&dir, &[10, 20]);
        let echo_a = locations[&10].echo.unwrap();
        let m = markers();
        let coordinator = SwapCoordinator::new(&m, SwapPolicy::Symmetric, WidthAdjust::None);
        coordinator
            .execute(&locations, &requests(&[(10, 20)]), Some(2))
            .unwrap();

        let after_a = fs::read(dir.path().join("a.bin")).unwrap();
        assert_eq!(&after_a[18..22], &payload_b);
        assert_eq!(&after_a[echo_a..echo_a + WIDTH], &payload_b);
    }

    #[test]
    fn test_append_adjust_scales_first_payload() {
        let dir = TempDir::new().unwrap();
        let value_a = 1_234u32;
        let value_b = 9_876u32;
        fs::write(
            dir.path().join("a.bin"),
            record_bytes(10, &encode_code(value_a), false),
        )
        .unwrap();
        fs::write(
            dir.path().join("b.bin"),
            record_bytes(20, &encode_code(value_b), false),
        )
        .unwrap();

        let locations = scan(&dir, &[10, 20]);
        let m = markers();
        let coordinator = SwapCoordinator::new(&m, SwapPolicy::Asymmetric, WidthAdjust::Append);
        let report = coordinator
            .execute(&locations, &requests(&[(10, 20)]), Some(2))
            .unwrap();
        assert_eq!(report.swapped, 1);

        let after_a = fs::read(dir.path().join("a.bin")).unwrap();
        let after_b = fs::read(dir.path().join("b.bin")).unwrap();
        // A receives B's payload unmodified; B receives A's payload scaled
        assert_eq!(&after_a[18..22], &encode_code(value_b));
        assert_eq!(&after_b[18..22], &encode_code(value_a * 100));
    }

    #[test]
    fn test_append_adjust_overflow_skips_pair() {
        let dir = TempDir::new().unwrap();
        let original_a = record_bytes(10, &encode_code(u32::MAX / 50), false);
        let original_b = record_bytes(20, &encode_code(5), false);
        fs::write(dir.path().join("a.bin"), &original_a).unwrap();
        fs::write(dir.path().join("b.bin"), &original_b).unwrap();

        let locations = scan(&dir, &[10, 20]);
        let m = markers();
        let coordinator = SwapCoordinator::new(&m, SwapPolicy::Asymmetric, WidthAdjust::Append);
        let report = coordinator
            .execute(&locations, &requests(&[(10, 20)]), Some(2))
            .unwrap();

        assert_eq!(report.swapped, 0);
        assert_eq!(report.skipped.len(), 1);
        assert_eq!(report.skipped[0].1, SkipReason::NumericTransform);
        assert_eq!(fs::read(dir.path().join("a.bin")).unwrap(), original_a);
        assert_eq!(fs::read(dir.path().join("b.bin")).unwrap(), original_b);
    }

    #[test]
    fn test_many_pairs_shared_files_no_deadlock() {
        let dir = TempDir::new().unwrap();
        let mut content_a = Vec::new();
        let mut content_b = Vec::new();
        let mut pairs = Vec::new();
        for i in 0..8u32 {
            let code_a = 100 + i;
            let code_b = 200 + i;
            let payload_a = [0xa0 | i as u8, 0x51, 0x52, 0x53];
            let payload_b = [0xc0 | i as u8, 0x61, 0x62, 0x63];
            // Alternate which file holds which side so lock order differs
            // from request order for half the pairs
            if i % 2 == 0 {
                content_a.extend_from_slice(&record_bytes(code_a, &payload_a, false));
                content_b.extend_from_slice(&record_bytes(code_b, &payload_b, false));
            } else {
                content_b.extend_from_slice(&record_bytes(code_a, &payload_a, false));
                content_a.extend_from_slice(&record_bytes(code_b, &payload_b, false));
            }
            pairs.push((code_a, code_b));
        }
        fs::write(dir.path().join("a.bin"), &content_a).unwrap();
        fs::write(dir.path().join("b.bin"), &content_b).unwrap();

        let codes: Vec<u32> = pairs.iter().flat_map(|&(a, b)| [a, b]).collect();
        let locations = scan(&dir, &codes);
        assert_eq!(locations.len(), 16);

        let m = markers();
        let coordinator = SwapCoordinator::new(&m, SwapPolicy::Asymmetric, WidthAdjust::None);
        let report = coordinator
            .execute(&locations, &requests(&pairs), Some(4))
            .unwrap();
        assert_eq!(report.swapped, 8);
        assert!(report.skipped.is_empty());
    }
}
