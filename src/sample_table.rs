//! Sample table decoding.
//!
//! The six `stbl` children are decoded into their on-disk run-length shape,
//! with only the 1-based to 0-based conversions applied:
//! - stsd: first sample entry (codec, dimensions, decoder config record)
//! - stts: sample durations as (count, duration) runs
//! - stss: sync sample numbers (keyframes)
//! - stsc: sample-to-chunk runs
//! - stsz: sample sizes, uniform or explicit
//! - stco/co64: chunk offsets
//!
//! Every decoder takes the box payload starting at the version byte.

use crate::boxes::FourCC;
use crate::known_boxes::KnownBox;
use crate::parser::{ParseError, Result};
use crate::walker::{self, WalkControl};
use byteorder::{BigEndian, ReadBytesExt};
use serde::Serialize;
use std::collections::HashSet;
use std::io::{Cursor, Read};
use std::ops::Range;
use tracing::{debug, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TimeToSampleRun {
    pub sample_count: u32,
    pub sample_duration: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SampleToChunkRun {
    /// 0-based; the run covers chunks up to the next run's `first_chunk`.
    pub first_chunk: u32,
    pub samples_per_chunk: u32,
    pub sample_description_index: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum SampleSizes {
    Uniform { size: u32, count: u32 },
    Explicit(Vec<u32>),
}

impl SampleSizes {
    pub fn count(&self) -> usize {
        match self {
            SampleSizes::Uniform { count, .. } => *count as usize,
            SampleSizes::Explicit(sizes) => sizes.len(),
        }
    }

    pub fn get(&self, index: usize) -> Option<u32> {
        match self {
            SampleSizes::Uniform { size, count } => (index < *count as usize).then_some(*size),
            SampleSizes::Explicit(sizes) => sizes.get(index).copied(),
        }
    }
}

/// A decoder configuration record (`avcC`, `hvcC`, `vpcC`, `av1C`) without its box header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CodecConfig {
    pub kind: FourCC,
    pub data: Vec<u8>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SampleDescription {
    pub codec: FourCC,
    pub width: Option<u16>,
    pub height: Option<u16>,
    pub config: Option<CodecConfig>,
}

/// The raw tables of one `stbl`. Each field is `None` when its box was absent.
#[derive(Debug, Clone, Default)]
pub struct SampleTableRaw {
    pub time_to_sample: Option<Vec<TimeToSampleRun>>,
    /// 0-based indices of sync samples.
    pub sync_samples: Option<HashSet<u32>>,
    pub sample_to_chunk: Option<Vec<SampleToChunkRun>>,
    pub sample_sizes: Option<SampleSizes>,
    pub chunk_offsets: Option<Vec<u64>>,
    pub sample_description: Option<SampleDescription>,
}

// Entry counts come straight from the file; never reserve more than the payload can hold.
fn bounded_capacity(count: u32, cur: &Cursor<&[u8]>, record_len: usize) -> usize {
    let remaining = cur.get_ref().len().saturating_sub(cur.position() as usize);
    (count as usize).min(remaining / record_len)
}

fn read_entry_count(cur: &mut Cursor<&[u8]>) -> Result<u32> {
    let _version_flags = cur.read_u32::<BigEndian>()?;
    Ok(cur.read_u32::<BigEndian>()?)
}

const VISUAL_PREFIXES: [&[u8]; 7] = [b"avc", b"hev", b"hvc", b"mp4v", b"vp08", b"vp09", b"av01"];

/// Does this sample entry tag carry a VisualSampleEntry layout?
pub fn is_visual_codec(codec: FourCC) -> bool {
    VISUAL_PREFIXES.iter().any(|p| codec.starts_with(p))
}

// size(4) type(4) reserved(6) data_reference_index(2) pre_defined/reserved(16)
const VISUAL_WIDTH_OFFSET: usize = 32;
// ... width(2) height(2) resolutions(8) reserved(4) frame_count(2) compressorname(32) depth(2) pre_defined(2)
const VISUAL_ENTRY_LEN: usize = 86;

/// First sample entry of `stsd`, or `None` when the box lists no entries.
pub fn parse_stsd(payload: &[u8]) -> Result<Option<SampleDescription>> {
    let mut cur = Cursor::new(payload);
    let entry_count = read_entry_count(&mut cur)?;
    if entry_count == 0 {
        return Ok(None);
    }

    let entry_start = cur.position() as usize;
    let entry_size = cur.read_u32::<BigEndian>()? as usize;
    let mut tag = [0u8; 4];
    cur.read_exact(&mut tag)?;
    let codec = FourCC(tag);

    let entry_end = entry_start.saturating_add(entry_size).min(payload.len());
    let entry = &payload[entry_start..entry_end];

    let mut description = SampleDescription {
        codec,
        width: None,
        height: None,
        config: None,
    };

    if is_visual_codec(codec) {
        let mut dims = Cursor::new(entry);
        dims.set_position(VISUAL_WIDTH_OFFSET as u64);
        description.width = Some(dims.read_u16::<BigEndian>()?);
        description.height = Some(dims.read_u16::<BigEndian>()?);
        description.config = find_codec_config(entry);
    }

    Ok(Some(description))
}

fn find_codec_config(entry: &[u8]) -> Option<CodecConfig> {
    let mut found = None;
    walker::walk(
        entry,
        VISUAL_ENTRY_LEN as u64,
        entry.len() as u64,
        |hdr, body| {
            if !KnownBox::from(hdr.typ).is_codec_config() {
                return WalkControl::Continue;
            }
            found = walker::slice(entry, body).map(|bytes| CodecConfig {
                kind: hdr.typ,
                data: bytes.to_vec(),
            });
            WalkControl::Stop
        },
    );
    found
}

pub fn parse_stts(payload: &[u8]) -> Result<Vec<TimeToSampleRun>> {
    let mut cur = Cursor::new(payload);
    let entry_count = read_entry_count(&mut cur)?;
    let mut runs = Vec::with_capacity(bounded_capacity(entry_count, &cur, 8));

    for _ in 0..entry_count {
        let sample_count = cur.read_u32::<BigEndian>()?;
        let sample_duration = cur.read_u32::<BigEndian>()?;
        runs.push(TimeToSampleRun {
            sample_count,
            sample_duration,
        });
    }

    Ok(runs)
}

pub fn parse_stss(payload: &[u8]) -> Result<HashSet<u32>> {
    let mut cur = Cursor::new(payload);
    let entry_count = read_entry_count(&mut cur)?;
    let mut sync = HashSet::with_capacity(bounded_capacity(entry_count, &cur, 4));

    for _ in 0..entry_count {
        let sample_number = cur.read_u32::<BigEndian>()?;
        match sample_number.checked_sub(1) {
            Some(index) => {
                sync.insert(index);
            }
            None => warn!("stss lists sample number 0, ignoring it"),
        }
    }

    Ok(sync)
}

pub fn parse_stsc(payload: &[u8]) -> Result<Vec<SampleToChunkRun>> {
    let mut cur = Cursor::new(payload);
    let entry_count = read_entry_count(&mut cur)?;
    let mut runs = Vec::with_capacity(bounded_capacity(entry_count, &cur, 12));

    for _ in 0..entry_count {
        let first_chunk = cur.read_u32::<BigEndian>()?.saturating_sub(1);
        let samples_per_chunk = cur.read_u32::<BigEndian>()?;
        let sample_description_index = cur.read_u32::<BigEndian>()?;
        runs.push(SampleToChunkRun {
            first_chunk,
            samples_per_chunk,
            sample_description_index,
        });
    }

    Ok(runs)
}

pub fn parse_stsz(payload: &[u8]) -> Result<SampleSizes> {
    let mut cur = Cursor::new(payload);
    let _version_flags = cur.read_u32::<BigEndian>()?;
    let sample_size = cur.read_u32::<BigEndian>()?;
    let sample_count = cur.read_u32::<BigEndian>()?;

    // A non-zero global size means no per-sample table follows.
    if sample_size != 0 {
        return Ok(SampleSizes::Uniform {
            size: sample_size,
            count: sample_count,
        });
    }

    let mut sizes = Vec::with_capacity(bounded_capacity(sample_count, &cur, 4));
    for _ in 0..sample_count {
        sizes.push(cur.read_u32::<BigEndian>()?);
    }
    Ok(SampleSizes::Explicit(sizes))
}

pub fn parse_stco(payload: &[u8]) -> Result<Vec<u64>> {
    let mut cur = Cursor::new(payload);
    let entry_count = read_entry_count(&mut cur)?;
    let mut offsets = Vec::with_capacity(bounded_capacity(entry_count, &cur, 4));

    for _ in 0..entry_count {
        offsets.push(cur.read_u32::<BigEndian>()? as u64);
    }

    Ok(offsets)
}

pub fn parse_co64(payload: &[u8]) -> Result<Vec<u64>> {
    let mut cur = Cursor::new(payload);
    let entry_count = read_entry_count(&mut cur)?;
    let mut offsets = Vec::with_capacity(bounded_capacity(entry_count, &cur, 8));

    for _ in 0..entry_count {
        offsets.push(cur.read_u64::<BigEndian>()?);
    }

    Ok(offsets)
}

/// Decode the children of one `stbl` box.
///
/// A table that runs past the available bytes ends the walk; tables decoded
/// before it are kept.
pub fn parse_stbl(data: &[u8], body: Range<u64>) -> SampleTableRaw {
    let mut table = SampleTableRaw::default();

    walker::walk(data, body.start, body.end, |hdr, payload_range| {
        let kind = KnownBox::from(hdr.typ);
        let Some(payload) = walker::slice(data, payload_range) else {
            return WalkControl::Stop;
        };

        let decoded = match kind {
            KnownBox::Stsd => parse_stsd(payload).map(|d| table.sample_description = d),
            KnownBox::Stts => parse_stts(payload).map(|t| table.time_to_sample = Some(t)),
            KnownBox::Stss => parse_stss(payload).map(|s| table.sync_samples = Some(s)),
            KnownBox::Stsc => parse_stsc(payload).map(|s| table.sample_to_chunk = Some(s)),
            KnownBox::Stsz => parse_stsz(payload).map(|s| table.sample_sizes = Some(s)),
            KnownBox::Stco | KnownBox::Co64 => {
                let offsets = if kind == KnownBox::Co64 {
                    parse_co64(payload)
                } else {
                    parse_stco(payload)
                };
                offsets.map(|o| {
                    if table.chunk_offsets.is_some() {
                        warn!(box_type = %hdr.typ, "stbl has both stco and co64, keeping the later one");
                    }
                    table.chunk_offsets = Some(o);
                })
            }
            _ => {
                debug!(box_type = %hdr.typ, "skipping stbl child");
                Ok(())
            }
        };

        match decoded {
            Ok(()) => WalkControl::Continue,
            Err(e) => {
                warn!(box_type = %hdr.typ, offset = hdr.start, error = %e, "sample table cut short");
                stop_or_skip(&e)
            }
        }
    });

    table
}

fn stop_or_skip(e: &ParseError) -> WalkControl {
    if e.is_truncation() {
        WalkControl::Stop
    } else {
        WalkControl::Continue
    }
}
