use crate::codec;
use crate::errors::{Error, Result};
use crate::matcher;

/// The two byte sequences bounding a record's payload.
///
/// Configured once per run from hex text and shared across all records of one
/// category.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MarkerPair {
    pub start: Vec<u8>,
    pub end: Vec<u8>,
}

impl MarkerPair {
    /// Builds a marker pair from hex text, validating both markers up front.
    pub fn from_hex(start_hex: &str, end_hex: &str) -> Result<Self> {
        let start = codec::from_hex(start_hex)?;
        let end = codec::from_hex(end_hex)?;
        if start.is_empty() || end.is_empty() {
            return Err(Error::Config("marker byte-strings must not be empty".into()));
        }
        Ok(Self { start, end })
    }
}

/// The byte range of a record payload, strictly between the resolved markers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RecordSpan {
    pub start: usize,
    pub end: usize,
}

impl RecordSpan {
    pub fn len(&self) -> usize {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }
}

/// Resolves the payload span nearest to `anchor`.
///
/// All occurrences of both markers are computed, and for each the occurrence
/// nearest the anchor is picked. If the picked start occurrence lies after the
/// picked end occurrence their roles are swapped; the two closest markers may
/// appear in file order reversed relative to marker role. The payload begins
/// after the start marker's width even when roles were swapped.
///
/// Returns `None` when either marker is absent or the resolved span falls
/// outside the buffer.
pub fn locate_record(buffer: &[u8], markers: &MarkerPair, anchor: usize) -> Option<RecordSpan> {
    let starts = matcher::find_all(buffer, &markers.start);
    let ends = matcher::find_all(buffer, &markers.end);
    let mut lo = matcher::find_nearest(&starts, anchor)?;
    let mut hi = matcher::find_nearest(&ends, anchor)?;
    if lo > hi {
        std::mem::swap(&mut lo, &mut hi);
    }
    let payload_start = lo + markers.start.len();
    if payload_start > hi || hi > buffer.len() {
        return None;
    }
    Some(RecordSpan {
        start: payload_start,
        end: hi,
    })
}

/// Extracts the payload of the record nearest to `anchor`.
///
/// Returns `None` ("not found", not fatal) when the markers cannot be
/// resolved or the gap between them does not equal `payload_width`.
pub fn extract_payload(
    buffer: &[u8],
    markers: &MarkerPair,
    anchor: usize,
    payload_width: usize,
) -> Option<Vec<u8>> {
    let span = locate_record(buffer, markers, anchor)?;
    if span.len() != payload_width {
        return None;
    }
    Some(buffer[span.start..span.end].to_vec())
}

/// Overwrites the payload of the record nearest to `anchor` in place.
///
/// Marker positions are recomputed fresh against the buffer as it currently
/// is; positions resolved against an earlier read of the file are never
/// reused. Returns `Ok(false)` when the markers cannot be resolved, and
/// [`Error::PayloadWidthMismatch`] when the new payload's length differs from
/// the existing gap — fatal for this single write only.
pub fn write_payload(
    buffer: &mut [u8],
    markers: &MarkerPair,
    anchor: usize,
    new_payload: &[u8],
) -> Result<bool> {
    let Some(span) = locate_record(buffer, markers, anchor) else {
        return Ok(false);
    };
    if new_payload.len() != span.len() {
        return Err(Error::PayloadWidthMismatch {
            expected: span.len(),
            actual: new_payload.len(),
        });
    }
    buffer[span.start..span.end].copy_from_slice(new_payload);
    Ok(true)
}
