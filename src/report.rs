use crate::cleanup::PruneStats;
use crate::errors::Result;
use crate::scanner::ScanOutcome;
use crate::swapper::SwapReport;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::BTreeSet;
use std::io::Write;

/// Defines the possible output formats for run reports.
#[derive(Debug, Clone)]
pub enum ReportFormat {
    /// A simple, human-readable text format.
    Text,
    /// JSON format, suitable for machine processing.
    Json,
    /// Comma-Separated Values format.
    Csv,
}

impl From<&str> for ReportFormat {
    fn from(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "json" => ReportFormat::Json,
            "csv" => ReportFormat::Csv,
            _ => ReportFormat::Text,
        }
    }
}

/// Everything one `swap` run produced, for reporting.
#[derive(Debug)]
pub struct RunReport {
    pub files_scanned: usize,
    pub files_skipped: usize,
    pub codes_located: usize,
    pub swap: SwapReport,
    pub pruned: Option<PruneStats>,
}

/// Handles the rendering of run and locate results.
pub struct ReportWriter {
    format: ReportFormat,
    tool_name: String,
    tool_version: String,
}

impl ReportWriter {
    pub fn new(format: ReportFormat) -> Self {
        Self {
            format,
            tool_name: "blobswap".to_string(),
            tool_version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }

    /// Writes the report of a full swap run to a given writer.
    pub fn write_run<W: Write>(&self, writer: &mut W, run: &RunReport) -> Result<()> {
        let output = match self.format {
            ReportFormat::Text => self.run_text(run),
            ReportFormat::Json => self.run_json(run)?,
            ReportFormat::Csv => self.run_csv(run)?,
        };
        writer.write_all(output.as_bytes())?;
        Ok(())
    }

    /// Writes the locations found by a scan-only run.
    ///
    /// Codes that were never located are reported explicitly so a missing
    /// record is visible, not silently absent.
    pub fn write_locations<W: Write>(
        &self,
        writer: &mut W,
        codes: &BTreeSet<u32>,
        outcome: &ScanOutcome,
    ) -> Result<()> {
        let output = match self.format {
            ReportFormat::Text => self.locations_text(codes, outcome),
            ReportFormat::Json => self.locations_json(codes, outcome)?,
            ReportFormat::Csv => self.locations_csv(codes, outcome)?,
        };
        writer.write_all(output.as_bytes())?;
        Ok(())
    }

    fn run_text(&self, run: &RunReport) -> String {
        let mut output = String::new();
        output.push_str(&format!("{}\n", "-".repeat(50)));
        output.push_str(&format!("Files scanned   : {}\n", run.files_scanned));
        output.push_str(&format!("Files skipped   : {}\n", run.files_skipped));
        output.push_str(&format!("Codes located   : {}\n", run.codes_located));
        output.push_str(&format!("Pairs swapped   : {}\n", run.swap.swapped));
        output.push_str(&format!("Pairs unresolved: {}\n", run.swap.unresolved.len()));
        output.push_str(&format!("Pairs skipped   : {}\n", run.swap.skipped.len()));
        output.push_str(&format!(
            "Files modified  : {}\n",
            run.swap.modified_files.len()
        ));
        if let Some(pruned) = &run.pruned {
            output.push_str(&format!("Files pruned    : {}\n", pruned.files_removed));
            output.push_str(&format!("Dirs pruned     : {}\n", pruned.dirs_removed));
        }

        if !run.swap.modified_files.is_empty() {
            output.push_str("\nModified files:\n");
            for path in &run.swap.modified_files {
                output.push_str(&format!("  {}\n", path.display()));
            }
        }
        if !run.swap.unresolved.is_empty() {
            output.push_str("\nUnresolved pairs:\n");
            for pair in &run.swap.unresolved {
                output.push_str(&format!("  {pair}\n"));
            }
        }
        if !run.swap.skipped.is_empty() {
            output.push_str("\nSkipped pairs:\n");
            for (pair, reason) in &run.swap.skipped {
                output.push_str(&format!("  {pair} ({reason})\n"));
            }
        }
        output
    }

    fn run_json(&self, run: &RunReport) -> Result<String> {
        #[derive(Serialize)]
        struct JsonOutput {
            tool: ToolInfo,
            generated_at: DateTime<Utc>,
            files_scanned: usize,
            files_skipped: usize,
            codes_located: usize,
            pairs_swapped: usize,
            modified_files: Vec<String>,
            unresolved_pairs: Vec<[u32; 2]>,
            skipped_pairs: Vec<JsonSkip>,
            files_pruned: Option<usize>,
            dirs_pruned: Option<usize>,
        }

        #[derive(Serialize)]
        struct ToolInfo {
            name: String,
            version: String,
        }

        #[derive(Serialize)]
        struct JsonSkip {
            first: u32,
            second: u32,
            reason: String,
        }

        let output = JsonOutput {
            tool: ToolInfo {
                name: self.tool_name.clone(),
                version: self.tool_version.clone(),
            },
            generated_at: Utc::now(),
            files_scanned: run.files_scanned,
            files_skipped: run.files_skipped,
            codes_located: run.codes_located,
            pairs_swapped: run.swap.swapped,
            modified_files: run
                .swap
                .modified_files
                .iter()
                .map(|p| p.display().to_string())
                .collect(),
            unresolved_pairs: run
                .swap
                .unresolved
                .iter()
                .map(|pair| [pair.first, pair.second])
                .collect(),
            skipped_pairs: run
                .swap
                .skipped
                .iter()
                .map(|(pair, reason)| JsonSkip {
                    first: pair.first,
                    second: pair.second,
                    reason: reason.to_string(),
                })
                .collect(),
            files_pruned: run.pruned.map(|p| p.files_removed),
            dirs_pruned: run.pruned.map(|p| p.dirs_removed),
        };

        Ok(serde_json::to_string_pretty(&output)?)
    }

    fn run_csv(&self, run: &RunReport) -> Result<String> {
        use csv::Writer;

        let mut wtr = Writer::from_writer(vec![]);
        wtr.write_record(["Kind", "First", "Second", "Detail"])?;

        for path in &run.swap.modified_files {
            wtr.write_record([
                "modified".to_string(),
                String::new(),
                String::new(),
                path.display().to_string(),
            ])?;
        }
        for pair in &run.swap.unresolved {
            wtr.write_record([
                "unresolved".to_string(),
                pair.first.to_string(),
                pair.second.to_string(),
                String::new(),
            ])?;
        }
        for (pair, reason) in &run.swap.skipped {
            wtr.write_record([
                "skipped".to_string(),
                pair.first.to_string(),
                pair.second.to_string(),
                reason.to_string(),
            ])?;
        }

        let data = wtr
            .into_inner()
            .map_err(|e| format!("CSV writer error: {}", e))?;
        Ok(String::from_utf8(data)?)
    }

    fn locations_text(&self, codes: &BTreeSet<u32>, outcome: &ScanOutcome) -> String {
        let mut output = String::new();
        for code in codes {
            match outcome.locations.get(code) {
                Some(location) => output.push_str(&format!(
                    "[{code}] {}:{}: {}\n",
                    location.file.display(),
                    location.anchor,
                    location.payload
                )),
                None => output.push_str(&format!("[{code}] not found\n")),
            }
        }
        output.push_str(&format!(
            "\n{} of {} codes located across {} files\n",
            outcome.locations.len(),
            codes.len(),
            outcome.files_scanned
        ));
        output
    }

    fn locations_json(&self, codes: &BTreeSet<u32>, outcome: &ScanOutcome) -> Result<String> {
        #[derive(Serialize)]
        struct JsonOutput {
            tool: ToolInfo,
            generated_at: DateTime<Utc>,
            files_scanned: usize,
            locations: Vec<JsonLocation>,
            missing_codes: Vec<u32>,
        }

        #[derive(Serialize)]
        struct ToolInfo {
            name: String,
            version: String,
        }

        #[derive(Serialize)]
        struct JsonLocation {
            code: u32,
            file: String,
            anchor: usize,
            payload: String,
            echo: Option<usize>,
        }

        let output = JsonOutput {
            tool: ToolInfo {
                name: self.tool_name.clone(),
                version: self.tool_version.clone(),
            },
            generated_at: Utc::now(),
            files_scanned: outcome.files_scanned,
            locations: outcome
                .locations
                .iter()
                .map(|(code, location)| JsonLocation {
                    code: *code,
                    file: location.file.display().to_string(),
                    anchor: location.anchor,
                    payload: location.payload.clone(),
                    echo: location.echo,
                })
                .collect(),
            missing_codes: codes
                .iter()
                .filter(|code| !outcome.locations.contains_key(code))
                .copied()
                .collect(),
        };

        Ok(serde_json::to_string_pretty(&output)?)
    }

    fn locations_csv(&self, codes: &BTreeSet<u32>, outcome: &ScanOutcome) -> Result<String> {
        use csv::Writer;

        let mut wtr = Writer::from_writer(vec![]);
        wtr.write_record(["Code", "File", "Anchor", "Payload", "Echo"])?;

        for code in codes {
            match outcome.locations.get(code) {
                Some(location) => wtr.write_record([
                    code.to_string(),
                    location.file.display().to_string(),
                    location.anchor.to_string(),
                    location.payload.clone(),
                    location.echo.map(|e| e.to_string()).unwrap_or_default(),
                ])?,
                None => wtr.write_record([
                    code.to_string(),
                    String::new(),
                    String::new(),
                    String::new(),
                    String::new(),
                ])?,
            }
        }

        let data = wtr
            .into_inner()
            .map_err(|e| format!("CSV writer error: {}", e))?;
        Ok(String::from_utf8(data)?)
    }
}
