//! Sample index construction.
//!
//! Expands the run-length tables of one track into a flat list with one
//! entry per sample, in storage order:
//! 1. `stsc` runs are expanded into a per-chunk sample count.
//! 2. `stts` runs are walked with a forward-only cursor for per-sample durations.
//! 3. Chunks are visited in order; samples inside a chunk are laid out back to back.
//!
//! Decode and composition times are equal: reordered (B-frame) timelines are
//! not modelled.

use crate::sample_table::{SampleTableRaw, SampleToChunkRun, TimeToSampleRun};
use serde::Serialize;
use tracing::{debug, warn};

/// One sample's location and timing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SampleIndexEntry {
    /// 0-based sample number within the track.
    pub index: u32,
    /// Absolute offset of the first byte in the file.
    pub byte_offset: u64,
    pub size: u32,
    /// Duration in track timescale units.
    pub duration: u32,
    pub decode_time: u64,
    /// Always equal to `decode_time`.
    pub composition_time: u64,
    pub is_keyframe: bool,
}

impl SampleIndexEntry {
    /// End of the sample's byte range (exclusive).
    pub fn byte_end(&self) -> u64 {
        self.byte_offset.saturating_add(self.size as u64)
    }
}

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum IndexError {
    #[error("missing required atom: {0}")]
    MissingAtom(&'static str),
}

/// The ordered sample list of one track. Immutable once built.
#[derive(Debug, Clone, Default, Serialize)]
pub struct SampleIndex {
    pub(crate) entries: Vec<SampleIndexEntry>,
}

// Upper bound on the up-front reservation; counts come from the file.
const MAX_RESERVE: usize = 1 << 20;

impl SampleIndex {
    /// Build the index for one track's tables, in a file of `file_len` bytes.
    ///
    /// `stsc`, `stsz` and a chunk offset table are required. A missing `stts`
    /// gives every sample a zero duration; a missing `stss` marks every sample
    /// as a keyframe.
    ///
    /// The index ends at the first sample whose bytes run past `file_len`, or
    /// once the samples emitted so far add up to more bytes than the file holds.
    pub fn build(table: &SampleTableRaw, file_len: u64) -> Result<Self, IndexError> {
        let runs = table
            .sample_to_chunk
            .as_deref()
            .ok_or(IndexError::MissingAtom("stsc"))?;
        let sizes = table
            .sample_sizes
            .as_ref()
            .ok_or(IndexError::MissingAtom("stsz"))?;
        let offsets = table
            .chunk_offsets
            .as_deref()
            .ok_or(IndexError::MissingAtom("stco"))?;

        let time_to_sample = match table.time_to_sample.as_deref() {
            Some(t) => t,
            None => {
                warn!("no stts; sample durations default to 0");
                &[]
            }
        };

        let per_chunk = chunk_sample_counts(runs, offsets.len());
        let expanded: u64 = per_chunk.iter().map(|&n| n as u64).sum();
        let sized = sizes.count();
        if expanded != sized as u64 {
            warn!(
                stsc_samples = expanded,
                stsz_samples = sized,
                "stsc and stsz disagree on sample count; using the smaller"
            );
        }

        let mut durations = DurationCursor::new(time_to_sample);
        let planned = expanded.min(sized as u64).min(file_len);
        let mut entries = Vec::with_capacity((planned as usize).min(MAX_RESERVE));
        let mut time = 0u64;
        let mut total_bytes = 0u64;

        'chunks: for (&chunk_offset, &samples_in_chunk) in offsets.iter().zip(&per_chunk) {
            let mut into_chunk = 0u64;

            for _ in 0..samples_in_chunk {
                let index = entries.len();
                let Some(size) = sizes.get(index) else {
                    break 'chunks;
                };
                let byte_offset = chunk_offset.saturating_add(into_chunk);
                total_bytes = total_bytes.saturating_add(size as u64);
                if byte_offset.saturating_add(size as u64) > file_len || total_bytes > file_len {
                    warn!(
                        sample = index,
                        byte_offset,
                        file_len,
                        "sample lies past the end of the file; truncating index"
                    );
                    break 'chunks;
                }

                let duration = durations.duration_for(index as u64);
                let is_keyframe = match &table.sync_samples {
                    Some(sync) => sync.contains(&(index as u32)),
                    None => true,
                };

                entries.push(SampleIndexEntry {
                    index: index as u32,
                    byte_offset,
                    size,
                    duration,
                    decode_time: time,
                    composition_time: time,
                    is_keyframe,
                });

                into_chunk += size as u64;
                time += duration as u64;
            }
        }

        debug!(samples = entries.len(), chunks = offsets.len(), "built sample index");
        Ok(SampleIndex { entries })
    }
}

/// Samples per chunk, indexed by 0-based chunk number.
///
/// Chunk `c` takes the `samples_per_chunk` of the last run (in table order)
/// whose `first_chunk <= c`. Chunks before every run hold no samples. Runs
/// are recorded at their starting chunk and resolved with one running
/// maximum, so out-of-order runs cost no more than sorted ones.
pub fn chunk_sample_counts(runs: &[SampleToChunkRun], chunk_count: usize) -> Vec<u32> {
    let mut starting_here: Vec<Option<usize>> = vec![None; chunk_count];
    for (i, run) in runs.iter().enumerate() {
        if let Some(slot) = starting_here.get_mut(run.first_chunk as usize) {
            *slot = Some(i);
        }
    }

    let mut governing: Option<usize> = None;
    starting_here
        .into_iter()
        .map(|started| {
            governing = governing.max(started);
            governing.map_or(0, |i| runs[i].samples_per_chunk)
        })
        .collect()
}

/// Duration of sample `index`: the run whose cumulative count first exceeds it,
/// or the last run's duration when `index` is past the table.
pub fn sample_duration(runs: &[TimeToSampleRun], index: u64) -> u32 {
    DurationCursor::new(runs).duration_for(index)
}

/// Forward-only lookup over `stts` runs for monotonically increasing indices.
struct DurationCursor<'a> {
    runs: &'a [TimeToSampleRun],
    run: usize,
    run_start: u64,
}

impl<'a> DurationCursor<'a> {
    fn new(runs: &'a [TimeToSampleRun]) -> Self {
        Self {
            runs,
            run: 0,
            run_start: 0,
        }
    }

    fn duration_for(&mut self, index: u64) -> u32 {
        while let Some(run) = self.runs.get(self.run) {
            let run_end = self.run_start + run.sample_count as u64;
            if index < run_end {
                return run.sample_duration;
            }
            self.run_start = run_end;
            self.run += 1;
        }
        self.runs.last().map_or(0, |r| r.sample_duration)
    }
}

/// Convert track ticks to microseconds: `1_000_000 * ticks / timescale`.
pub fn ticks_to_micros(ticks: u64, timescale: u32) -> u64 {
    if timescale == 0 {
        return 0;
    }
    (ticks as u128 * 1_000_000 / timescale as u128).min(u64::MAX as u128) as u64
}
