use crate::error::{Error, Result};
use crate::index::{SampleIndex, SampleIndexEntry, ticks_to_micros};
use crate::movie::{MdatInfo, parse_movie};
use crate::sample_table::SampleDescription;
use crate::source::{ByteSource, SeekSource, read_prefix};
use crate::track::{MediaType, TrackRecord};
use serde::Serialize;
use std::collections::BTreeMap;
use std::fs::File;
use std::path::Path;
use tracing::{debug, info, warn};

/// Bytes read from the start of the file to find `moov` when no other size is given.
pub const DEFAULT_METADATA_PREFIX: u64 = 10 * 1024 * 1024;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReaderOptions {
    /// How much of the file to read for metadata. The whole file is read when
    /// it is smaller. `moov` must fit inside this prefix to be indexed.
    pub metadata_prefix: u64,
}

impl Default for ReaderOptions {
    fn default() -> Self {
        Self {
            metadata_prefix: DEFAULT_METADATA_PREFIX,
        }
    }
}

/// A track's metadata together with its sample index.
#[derive(Debug, Clone, Serialize)]
pub struct Track {
    #[serde(flatten)]
    pub record: TrackRecord,
    #[serde(skip)]
    pub index: SampleIndex,
}

impl Track {
    pub fn id(&self) -> u32 {
        self.record.id
    }

    pub fn sample_count(&self) -> u32 {
        self.index.len() as u32
    }

    fn sample_description(&self) -> Option<&SampleDescription> {
        self.record.sample_table.sample_description.as_ref()
    }

    fn entry(&self, index: u32) -> Result<&SampleIndexEntry> {
        self.index.get(index).ok_or(Error::SampleNotFound {
            track_id: self.id(),
            index,
            count: self.sample_count(),
        })
    }
}

/// One sample's index entry and its raw bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sample {
    pub track_id: u32,
    pub entry: SampleIndexEntry,
    pub data: Vec<u8>,
}

/// What a decoder needs for one sample, with times in microseconds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EncodedSample {
    pub codec: String,
    pub width: Option<u16>,
    pub height: Option<u16>,
    #[serde(skip)]
    pub bytes: Vec<u8>,
    pub decode_time_micros: u64,
    pub duration_micros: u64,
    pub is_keyframe: bool,
}

/// Decoder setup for a track.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DecoderConfig {
    pub codec: String,
    pub coded_width: Option<u16>,
    pub coded_height: Option<u16>,
    /// The `avcC`/`hvcC`/`vpcC`/`av1C` payload, when the sample entry has one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<Vec<u8>>,
}

/// Samples from one keyframe up to (not including) the next, and the byte span holding them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SampleBlock {
    pub track_id: u32,
    pub start: u32,
    pub end: u32,
    pub byte_start: u64,
    pub byte_end: u64,
}

/// Codec string for a sample entry.
///
/// `avc1`/`avc3` gain the profile and level from their `avcC` (`avc1.64001f`),
/// `hvc1`/`hev1` the profile, compatibility, tier, level and constraint fields
/// from their `hvcC` (`hvc1.1.6.L93.B0`). VP8 entries are reported as `vp8`.
/// Every other entry, and any entry missing its config record, gives the bare tag.
pub fn codec_string(description: &SampleDescription) -> String {
    let tag = description.codec;

    if tag.starts_with(b"vp08") {
        return "vp8".to_string();
    }

    let config = description.config.as_ref();
    if tag.starts_with(b"avc")
        && let Some(config) = config
        && &config.kind.0 == b"avcC"
        && let Some(profile_level) = config.data.get(1..4)
    {
        return format!("{}.{}", tag, hex::encode(profile_level));
    }

    if (tag.starts_with(b"hvc") || tag.starts_with(b"hev"))
        && let Some(config) = config
        && &config.kind.0 == b"hvcC"
        && let Some(fields) = hevc_codec_fields(&config.data)
    {
        return format!("{}.{}", tag, fields);
    }

    tag.to_string()
}

// HEVCDecoderConfigurationRecord: version(1) profile_space/tier/profile_idc(1)
// compatibility_flags(4) constraint_flags(6) level_idc(1)
fn hevc_codec_fields(record: &[u8]) -> Option<String> {
    let general = *record.get(1)?;
    let compatibility = u32::from_be_bytes(record.get(2..6)?.try_into().ok()?);
    let constraints = record.get(6..12)?;
    let level = *record.get(12)?;

    let space = match general >> 6 {
        0 => "",
        1 => "A",
        2 => "B",
        _ => "C",
    };
    let tier = if general & 0x20 == 0 { 'L' } else { 'H' };

    let mut out = format!(
        "{}{}.{:x}.{}{}",
        space,
        general & 0x1f,
        compatibility.reverse_bits(),
        tier,
        level
    );

    let kept = constraints
        .iter()
        .rposition(|&b| b != 0)
        .map_or(0, |last| last + 1);
    for byte in &constraints[..kept] {
        out.push_str(&format!(".{:X}", byte));
    }
    Some(out)
}

/// Reads MP4 metadata once and serves samples by index or time.
///
/// Opening reads a bounded prefix of the source and indexes every track
/// found there. After that, each sample read is a single range request.
pub struct Mp4Reader<S> {
    source: S,
    tracks: BTreeMap<u32, Track>,
    mdat: Option<MdatInfo>,
}

impl Mp4Reader<SeekSource<File>> {
    pub fn open_path(path: impl AsRef<Path>) -> Result<Self> {
        let file = File::open(path)?;
        Self::open(SeekSource::new(file)?)
    }
}

impl<S: ByteSource> Mp4Reader<S> {
    pub fn open(source: S) -> Result<Self> {
        Self::open_with(source, ReaderOptions::default())
    }

    pub fn open_with(source: S, options: ReaderOptions) -> Result<Self> {
        let file_len = source.len()?;
        let prefix = read_prefix(&source, options.metadata_prefix)?;
        debug!(file_len, prefix_len = prefix.len(), "read metadata prefix");

        let movie = parse_movie(&prefix, file_len);

        let mut tracks = BTreeMap::new();
        for (id, record) in movie.tracks {
            match SampleIndex::build(&record.sample_table, file_len) {
                Ok(index) => {
                    tracks.insert(id, Track { record, index });
                }
                Err(e) => warn!(track_id = id, error = %e, "track not indexed"),
            }
        }

        info!(tracks = tracks.len(), mdat = ?movie.mdat, "opened mp4");
        Ok(Self {
            source,
            tracks,
            mdat: movie.mdat,
        })
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    /// Offset of the first top-level `mdat` header, if one was seen before the scan ended.
    pub fn mdat_offset(&self) -> Option<u64> {
        self.mdat.map(|m| m.offset)
    }

    /// Total size of that `mdat` box.
    pub fn mdat_size(&self) -> Option<u64> {
        self.mdat.map(|m| m.size)
    }

    pub fn track_ids(&self) -> impl Iterator<Item = u32> + '_ {
        self.tracks.keys().copied()
    }

    pub fn tracks(&self) -> impl Iterator<Item = &Track> {
        self.tracks.values()
    }

    pub fn track(&self, track_id: u32) -> Result<&Track> {
        self.tracks
            .get(&track_id)
            .ok_or(Error::TrackNotFound(track_id))
    }

    /// First video track, if any.
    pub fn video_track(&self) -> Option<&Track> {
        self.tracks
            .values()
            .find(|t| t.record.media_type == MediaType::Video)
    }

    /// Index entry and bytes of one sample, fetched with a single range read.
    pub fn get_sample(&self, track_id: u32, sample_index: u32) -> Result<Sample> {
        let entry = *self.track(track_id)?.entry(sample_index)?;
        let data = self.source.read_range(entry.byte_offset, entry.byte_end())?;
        Ok(Sample {
            track_id,
            entry,
            data,
        })
    }

    /// Samples `start..end` in order. Fails on the first sample that cannot be read.
    pub fn get_sample_range(&self, track_id: u32, start: u32, end: u32) -> Result<Vec<Sample>> {
        (start..end)
            .map(|i| self.get_sample(track_id, i))
            .collect()
    }

    /// The sample showing at `seconds`: the last one starting at or before it.
    pub fn get_sample_at_time(&self, track_id: u32, seconds: f64) -> Result<Sample> {
        let track = self.track(track_id)?;
        let index = track
            .index
            .index_at_time(seconds, track.record.timescale)
            .ok_or(Error::SampleNotFound {
                track_id,
                index: 0,
                count: 0,
            })?;
        self.get_sample(track_id, index)
    }

    pub fn get_keyframes(&self, track_id: u32) -> Result<Vec<SampleIndexEntry>> {
        Ok(self.track(track_id)?.index.keyframes().copied().collect())
    }

    /// Nearest keyframe at or before `sample_index` (0 if none is flagged).
    pub fn find_keyframe_before(&self, track_id: u32, sample_index: u32) -> Result<u32> {
        let track = self.track(track_id)?;
        track.entry(sample_index)?;
        Ok(track.index.keyframe_before(sample_index))
    }

    pub fn decoder_config(&self, track_id: u32) -> Result<DecoderConfig> {
        let track = self.track(track_id)?;
        let description = track.sample_description();

        Ok(DecoderConfig {
            codec: description.map_or_else(|| "unknown".to_string(), codec_string),
            coded_width: track.record.width,
            coded_height: track.record.height,
            description: description
                .and_then(|d| d.config.as_ref())
                .map(|c| c.data.clone()),
        })
    }

    /// A sample packaged for a decoder.
    pub fn encoded_sample(&self, track_id: u32, sample_index: u32) -> Result<EncodedSample> {
        let track = self.track(track_id)?;
        let sample = self.get_sample(track_id, sample_index)?;
        let timescale = track.record.timescale;

        Ok(EncodedSample {
            codec: track
                .sample_description()
                .map_or_else(|| "unknown".to_string(), codec_string),
            width: track.record.width,
            height: track.record.height,
            bytes: sample.data,
            decode_time_micros: ticks_to_micros(sample.entry.decode_time, timescale),
            duration_micros: ticks_to_micros(sample.entry.duration as u64, timescale),
            is_keyframe: sample.entry.is_keyframe,
        })
    }

    /// The run of samples starting at the `ordinal`-th keyframe (0-based) and
    /// ending before the following keyframe or at the end of the track.
    pub fn keyframe_block(&self, track_id: u32, ordinal: u32) -> Result<SampleBlock> {
        let track = self.track(track_id)?;
        let mut keyframes = track.index.keyframes().skip(ordinal as usize);

        let Some(first) = keyframes.next() else {
            return Err(Error::KeyframeNotFound {
                track_id,
                ordinal,
                count: track.index.keyframes().count() as u32,
            });
        };
        let start = first.index;
        let end = keyframes.next().map_or(track.sample_count(), |k| k.index);

        let entries = track.index.range(start, end).unwrap_or_default();
        let byte_start = entries.iter().map(|e| e.byte_offset).min().unwrap_or(0);
        let byte_end = entries.iter().map(|e| e.byte_end()).max().unwrap_or(0);

        Ok(SampleBlock {
            track_id,
            start,
            end,
            byte_start,
            byte_end,
        })
    }

    /// Fetch every sample of `block` with one range read covering its byte span.
    pub fn read_block(&self, block: &SampleBlock) -> Result<Vec<Sample>> {
        let track = self.track(block.track_id)?;
        let entries = track
            .index
            .range(block.start, block.end)
            .ok_or(Error::SampleNotFound {
                track_id: block.track_id,
                index: block.end,
                count: track.sample_count(),
            })?;

        let span = self.source.read_range(block.byte_start, block.byte_end)?;

        entries
            .iter()
            .map(|entry| {
                let from = entry
                    .byte_offset
                    .checked_sub(block.byte_start)
                    .map(|d| d as usize);
                let bytes = from.and_then(|f| span.get(f..f + entry.size as usize));
                match bytes {
                    Some(bytes) => Ok(Sample {
                        track_id: block.track_id,
                        entry: *entry,
                        data: bytes.to_vec(),
                    }),
                    None => Err(Error::SampleNotFound {
                        track_id: block.track_id,
                        index: entry.index,
                        count: track.sample_count(),
                    }),
                }
            })
            .collect()
    }
}

impl<S> std::fmt::Debug for Mp4Reader<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Mp4Reader")
            .field("tracks", &self.tracks.keys().collect::<Vec<_>>())
            .field("mdat", &self.mdat)
            .finish()
    }
}
