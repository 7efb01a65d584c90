//! Line-by-line scanning of log files into a [`BucketAccumulator`].
//!
//! The scan mode picks one line handler up front; the read loop is shared by
//! all modes. Files are read one line at a time through a reused buffer, with
//! no line-length limit. Lines are classified as raw bytes; only bucket names
//! are decoded, lossily, since they are looked up in the backend by name.

use std::borrow::Cow;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};

use audit_core::{Error, Result, ScanMode};
use tracing::{info, warn};

use crate::accumulator::BucketAccumulator;
use crate::classify::{classify_size_listing, classify_slash, classify_url_path};

/// Per-file diagnostics. Not used in reconciliation math.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanOutcome {
    pub path: PathBuf,
    pub mode: ScanMode,
    /// Lines read.
    pub lines: u64,
    /// Lines the classifier attributed to a bucket.
    pub matched: u64,
    /// Keys new to their bucket (keyed mode) or sizes matched to a known key
    /// (size mode); equals `matched` in count-only mode. Size lines naming a
    /// bucket no log line produced are matched but never inserted.
    pub inserted: u64,
}

/// Outcome of scanning a batch of files.
#[derive(Debug, Default)]
pub struct ScanReport {
    pub outcomes: Vec<ScanOutcome>,
    /// Files that could not be opened or failed mid-read.
    pub failures: Vec<Error>,
}

impl ScanReport {
    #[must_use]
    pub fn total_matched(&self) -> u64 {
        self.outcomes
            .iter()
            .fold(0u64, |acc, o| acc.saturating_add(o.matched))
    }

    #[must_use]
    pub fn all_succeeded(&self) -> bool {
        self.failures.is_empty()
    }
}

#[derive(Debug, Default, Clone, Copy)]
struct Counters {
    lines: u64,
    matched: u64,
    inserted: u64,
}

/// Handles one line; returns `(matched, inserted)`.
type LineHandler = fn(&[u8], &mut BucketAccumulator) -> (bool, bool);

fn bucket_name(raw: &[u8]) -> Cow<'_, str> {
    String::from_utf8_lossy(raw)
}

fn count_line(line: &[u8], acc: &mut BucketAccumulator) -> (bool, bool) {
    classify_slash(line).map_or((false, false), |(bucket, _)| {
        acc.increment_count(&bucket_name(bucket));
        (true, true)
    })
}

fn insert_line(line: &[u8], acc: &mut BucketAccumulator) -> (bool, bool) {
    classify_url_path(line).map_or((false, false), |(bucket, key)| {
        (true, acc.insert(&bucket_name(bucket), key))
    })
}

fn match_size_line(line: &[u8], acc: &mut BucketAccumulator) -> (bool, bool) {
    classify_size_listing(line).map_or((false, false), |(bucket, key, size)| {
        (true, acc.match_size(&bucket_name(bucket), key, size))
    })
}

fn handler_for(mode: ScanMode) -> LineHandler {
    match mode {
        ScanMode::CountOnly => count_line,
        ScanMode::KeyedUrlPath => insert_line,
        ScanMode::SizeMatch => match_size_line,
    }
}

/// Feed every line of `reader` to the handler for `mode`.
///
/// On a read error the counters gathered so far are returned alongside it;
/// accumulator updates already applied are kept.
fn scan_lines<R: BufRead>(
    mut reader: R,
    mode: ScanMode,
    acc: &mut BucketAccumulator,
) -> (Counters, Option<std::io::Error>) {
    let handle = handler_for(mode);
    let mut counters = Counters::default();
    let mut buf = Vec::new();

    loop {
        buf.clear();
        match reader.read_until(b'\n', &mut buf) {
            Ok(0) => return (counters, None),
            Ok(_) => {
                counters.lines = counters.lines.saturating_add(1);

                let (matched, inserted) = handle(strip_line_ending(&buf), acc);
                if matched {
                    counters.matched = counters.matched.saturating_add(1);
                }
                if inserted {
                    counters.inserted = counters.inserted.saturating_add(1);
                }
            }
            Err(e) if e.kind() == std::io::ErrorKind::Interrupted => {}
            Err(e) => return (counters, Some(e)),
        }
    }
}

fn strip_line_ending(buf: &[u8]) -> &[u8] {
    let buf = buf.strip_suffix(b"\n").unwrap_or(buf);
    buf.strip_suffix(b"\r").unwrap_or(buf)
}

/// Scan an already opened reader. `path` only labels diagnostics.
///
/// # Errors
///
/// Returns `Error::Io` if a read fails mid-stream. Lines read before the
/// failure stay accumulated.
pub fn scan_reader<R: BufRead>(
    reader: R,
    path: &Path,
    mode: ScanMode,
    acc: &mut BucketAccumulator,
) -> Result<ScanOutcome> {
    let (counters, failure) = scan_lines(reader, mode, acc);

    if let Some(e) = failure {
        warn!(
            file = %path.display(),
            lines = counters.lines,
            matched = counters.matched,
            error = %e,
            "Read failed mid-file, keeping lines read so far"
        );
        return Err(Error::io(path, format!("read failed after {} lines: {e}", counters.lines)));
    }

    info!(
        file = %path.display(),
        mode = %mode,
        lines = counters.lines,
        matched = counters.matched,
        inserted = counters.inserted,
        "Scanned log file"
    );

    Ok(ScanOutcome {
        path: path.to_path_buf(),
        mode,
        lines: counters.lines,
        matched: counters.matched,
        inserted: counters.inserted,
    })
}

/// Open and scan one file. The file is closed before returning.
///
/// # Errors
///
/// Returns `Error::Io` if the file cannot be opened or a read fails.
pub fn scan_file(path: &Path, mode: ScanMode, acc: &mut BucketAccumulator) -> Result<ScanOutcome> {
    let file = File::open(path).map_err(|e| {
        warn!(file = %path.display(), error = %e, "Could not open log file");
        Error::io(path, format!("cannot open: {e}"))
    })?;

    scan_reader(BufReader::new(file), path, mode, acc)
}

/// Scan files in the given order, skipping and recording those that fail.
pub fn scan_files<I, P>(paths: I, mode: ScanMode, acc: &mut BucketAccumulator) -> ScanReport
where
    I: IntoIterator<Item = P>,
    P: AsRef<Path>,
{
    let mut report = ScanReport::default();

    for path in paths {
        match scan_file(path.as_ref(), mode, acc) {
            Ok(outcome) => report.outcomes.push(outcome),
            Err(e) => report.failures.push(e),
        }
    }

    report
}
