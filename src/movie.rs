//! The metadata parse pass: root → `moov` → `trak` → `mdia` → `minf` → `stbl`.
//!
//! Works over an in-memory prefix of the file and returns a plain value; no
//! state outlives the call.

use crate::boxes::BoxHeader;
use crate::known_boxes::KnownBox;
use crate::parser::Result;
use crate::sample_table::{self, SampleTableRaw};
use crate::track::{self, MediaHeader, MediaType, TrackRecord};
use crate::walker::{self, WalkControl, WalkEnd};
use serde::Serialize;
use std::collections::BTreeMap;
use std::ops::Range;
use tracing::{debug, warn};

/// Location of the first top-level `mdat` box.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct MdatInfo {
    /// Offset of the box header.
    pub offset: u64,
    /// Total box size including header.
    pub size: u64,
}

/// Result of parsing a file prefix.
#[derive(Debug, Clone, Default)]
pub struct Movie {
    /// Tracks that had both a `tkhd` id and an `stbl`, keyed by track id.
    pub tracks: BTreeMap<u32, TrackRecord>,
    pub mdat: Option<MdatInfo>,
    pub saw_moov: bool,
}

/// Parse the box tree held in `data` (bytes `0..data.len()` of a file that is
/// `file_len` bytes long).
///
/// The root scan stops for good at the first `mdat`. Truncation anywhere
/// ends the walk at that level and keeps what was already collected.
pub fn parse_movie(data: &[u8], file_len: u64) -> Movie {
    let mut movie = Movie::default();

    let end = walker::walk(data, 0, data.len() as u64, |hdr, body| {
        match KnownBox::from(hdr.typ) {
            KnownBox::Moov => {
                debug!(offset = hdr.start, size = hdr.size, "found moov");
                movie.saw_moov = true;
                parse_moov(data, body, &mut movie.tracks);
                WalkControl::Continue
            }
            KnownBox::Mdat => {
                let size = if hdr.size == 0 {
                    file_len.saturating_sub(hdr.start)
                } else {
                    hdr.size
                };
                debug!(offset = hdr.start, size, "found mdat");
                movie.mdat = Some(MdatInfo {
                    offset: hdr.start,
                    size,
                });
                WalkControl::Stop
            }
            _ => WalkControl::Continue,
        }
    });

    if let WalkEnd::Cut(e) = end {
        debug!(error = %e, "root scan ended early");
    }
    if !movie.saw_moov {
        warn!(
            prefix_len = data.len(),
            "no moov before mdat or end of prefix; no tracks indexed"
        );
    }

    movie
}

fn parse_moov(data: &[u8], body: Range<u64>, tracks: &mut BTreeMap<u32, TrackRecord>) {
    walker::walk(data, body.start, body.end, |hdr, body| {
        if KnownBox::from(hdr.typ) == KnownBox::Trak
            && let Some(track) = parse_trak(data, body)
        {
            debug!(track_id = track.id, media_type = track.media_type.as_str(), "registered track");
            if tracks.insert(track.id, track).is_some() {
                warn!(offset = hdr.start, "duplicate track id, keeping the later trak");
            }
        }
        WalkControl::Continue
    });
}

#[derive(Default)]
struct TrakScan {
    id: Option<u32>,
    media_type: Option<MediaType>,
    header: MediaHeader,
    sample_table: Option<SampleTableRaw>,
}

impl TrakScan {
    fn finish(self) -> Option<TrackRecord> {
        let (Some(id), Some(sample_table)) = (self.id, self.sample_table) else {
            debug!(track_id = ?self.id, "dropping trak without id or sample table");
            return None;
        };

        let description = sample_table.sample_description.as_ref();
        Some(TrackRecord {
            id,
            media_type: self.media_type.unwrap_or(MediaType::Text),
            timescale: self.header.timescale,
            duration: self.header.duration,
            codec: description.map(|d| d.codec),
            width: description.and_then(|d| d.width),
            height: description.and_then(|d| d.height),
            sample_table,
        })
    }
}

/// Decode a leaf payload. Errors stop the enclosing level.
fn decode_leaf<T>(
    data: &[u8],
    hdr: &BoxHeader,
    body: Range<u64>,
    decode: impl FnOnce(&[u8]) -> Result<T>,
) -> Option<T> {
    let payload = walker::slice(data, body)?;
    match decode(payload) {
        Ok(v) => Some(v),
        Err(e) => {
            warn!(
                box_type = %hdr.typ,
                name = KnownBox::from(hdr.typ).full_name(),
                offset = hdr.start,
                error = %e,
                "could not decode box"
            );
            None
        }
    }
}

fn parse_trak(data: &[u8], body: Range<u64>) -> Option<TrackRecord> {
    let mut scan = TrakScan::default();

    walker::walk(data, body.start, body.end, |hdr, body| {
        match KnownBox::from(hdr.typ) {
            KnownBox::Tkhd => match decode_leaf(data, hdr, body, track::parse_tkhd) {
                Some(id) => scan.id = Some(id),
                None => return WalkControl::Stop,
            },
            KnownBox::Mdia => parse_mdia(data, body, &mut scan),
            _ => {}
        }
        WalkControl::Continue
    });

    scan.finish()
}

fn parse_mdia(data: &[u8], body: Range<u64>, scan: &mut TrakScan) {
    walker::walk(data, body.start, body.end, |hdr, body| {
        match KnownBox::from(hdr.typ) {
            KnownBox::Mdhd => match decode_leaf(data, hdr, body, track::parse_mdhd) {
                Some(header) => scan.header = header,
                None => return WalkControl::Stop,
            },
            KnownBox::Hdlr => match decode_leaf(data, hdr, body, track::parse_hdlr) {
                Some(media_type) => scan.media_type = Some(media_type),
                None => return WalkControl::Stop,
            },
            KnownBox::Minf => parse_minf(data, body, scan),
            _ => {}
        }
        WalkControl::Continue
    });
}

fn parse_minf(data: &[u8], body: Range<u64>, scan: &mut TrakScan) {
    walker::walk(data, body.start, body.end, |hdr, body| {
        if KnownBox::from(hdr.typ) == KnownBox::Stbl {
            scan.sample_table = Some(sample_table::parse_stbl(data, body));
        }
        WalkControl::Continue
    });
}
