//! Errors reported to callers of [`Mp4Reader`](crate::Mp4Reader).
//!
//! Malformed or truncated metadata is never reported here: it only shrinks
//! the set of indexed tracks. What remains is source I/O and lookup misses.

use std::io;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    #[error("track {0} not found")]
    TrackNotFound(u32),

    #[error("sample {index} not found in track {track_id} ({count} samples)")]
    SampleNotFound { track_id: u32, index: u32, count: u32 },

    #[error("keyframe #{ordinal} not found in track {track_id} ({count} keyframes)")]
    KeyframeNotFound {
        track_id: u32,
        ordinal: u32,
        count: u32,
    },

    #[error("byte source: {0}")]
    Source(#[from] io::Error),
}

impl Error {
    /// True for lookup misses (unknown track, sample or keyframe).
    pub fn is_not_found(&self) -> bool {
        !matches!(self, Error::Source(_))
    }
}
