use crate::boxes::BoxHeader;
use crate::parser::{ParseError, read_box_header};
use std::ops::Range;
use tracing::debug;

/// What a level handler wants the walker to do after seeing a box.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WalkControl {
    Continue,
    Stop,
}

/// Why a walk finished.
#[derive(Debug)]
pub enum WalkEnd {
    /// Reached the end of the range.
    Exhausted,
    /// The handler asked to stop.
    Stopped,
    /// A header could not be read; boxes seen before it are still valid.
    Cut(ParseError),
}

/// Iterate the sibling boxes in `range_start..range_end` of `data`.
///
/// `dispatch` gets each header and its payload range, clamped so it never
/// extends past `range_end` or the end of `data`. Offsets are absolute.
pub fn walk<F>(data: &[u8], range_start: u64, range_end: u64, mut dispatch: F) -> WalkEnd
where
    F: FnMut(&BoxHeader, Range<u64>) -> WalkControl,
{
    let limit = range_end.min(data.len() as u64);
    let bounded = &data[..limit as usize];
    let mut pos = range_start;

    while pos < range_end {
        let hdr = match read_box_header(bounded, pos) {
            Ok(h) => h,
            Err(e) => {
                debug!(offset = pos, error = %e, "stopping walk");
                return WalkEnd::Cut(e);
            }
        };

        let end = hdr.end_within(range_end);
        let payload = hdr.payload_start().min(limit)..end.min(limit);

        if dispatch(&hdr, payload) == WalkControl::Stop {
            return WalkEnd::Stopped;
        }

        pos = end;
    }

    WalkEnd::Exhausted
}

/// Borrow the bytes of an absolute range, or `None` if it is not resident.
pub fn slice(data: &[u8], range: Range<u64>) -> Option<&[u8]> {
    let start = usize::try_from(range.start).ok()?;
    let end = usize::try_from(range.end).ok()?;
    data.get(start..end)
}
