//! Read-only lookups over a built [`SampleIndex`].

use crate::index::{SampleIndex, SampleIndexEntry};

impl SampleIndex {
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entries(&self) -> &[SampleIndexEntry] {
        &self.entries
    }

    pub fn iter(&self) -> impl Iterator<Item = &SampleIndexEntry> {
        self.entries.iter()
    }

    pub fn get(&self, index: u32) -> Option<&SampleIndexEntry> {
        self.entries.get(index as usize)
    }

    /// Entries `start..end`, or `None` if any part of the range is missing.
    pub fn range(&self, start: u32, end: u32) -> Option<&[SampleIndexEntry]> {
        self.entries.get(start as usize..end as usize)
    }

    /// Keyframes in sample order.
    pub fn keyframes(&self) -> impl Iterator<Item = &SampleIndexEntry> {
        self.entries.iter().filter(|e| e.is_keyframe)
    }

    /// Nearest keyframe at or before `index`, scanning backwards.
    ///
    /// Returns 0 when nothing earlier is flagged, even if sample 0 is not a keyframe.
    pub fn keyframe_before(&self, index: u32) -> u32 {
        let Some(last) = self.entries.len().checked_sub(1) else {
            return 0;
        };
        let from = (index as usize).min(last);

        self.entries[..=from]
            .iter()
            .rev()
            .find(|e| e.is_keyframe)
            .map_or(0, |e| e.index)
    }

    /// Greatest sample whose composition time is `<= ticks`, clamped to the first sample.
    ///
    /// Relies on composition times being non-decreasing, which holds because
    /// they equal decode times.
    pub fn index_at_ticks(&self, ticks: u64) -> Option<u32> {
        if self.entries.is_empty() {
            return None;
        }
        let after = self
            .entries
            .partition_point(|e| e.composition_time <= ticks);
        Some(after.saturating_sub(1) as u32)
    }

    /// [`index_at_ticks`](Self::index_at_ticks) for a time in seconds,
    /// rounded to the nearest tick of `timescale`.
    pub fn index_at_time(&self, seconds: f64, timescale: u32) -> Option<u32> {
        self.index_at_ticks(seconds_to_ticks(seconds, timescale))
    }

    /// Total of all sample durations, in track ticks.
    pub fn total_duration(&self) -> u64 {
        self.entries
            .last()
            .map_or(0, |e| e.decode_time + e.duration as u64)
    }
}

/// `round(seconds * timescale)`; negative and NaN inputs give 0.
pub fn seconds_to_ticks(seconds: f64, timescale: u32) -> u64 {
    let ticks = (seconds * timescale as f64).round();
    if ticks.is_nan() || ticks <= 0.0 {
        0
    } else {
        // `as` saturates at u64::MAX
        ticks as u64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn index(times_and_keys: &[(u64, bool)]) -> SampleIndex {
        let entries = times_and_keys
            .iter()
            .enumerate()
            .map(|(i, &(t, k))| SampleIndexEntry {
                index: i as u32,
                byte_offset: i as u64 * 10,
                size: 10,
                duration: 10,
                decode_time: t,
                composition_time: t,
                is_keyframe: k,
            })
            .collect();
        SampleIndex { entries }
    }

    #[test]
    fn time_search_picks_greatest_not_after() {
        let idx = index(&[(0, true), (512, false), (1024, false), (1536, false)]);
        assert_eq!(idx.index_at_ticks(0), Some(0));
        assert_eq!(idx.index_at_ticks(511), Some(0));
        assert_eq!(idx.index_at_ticks(512), Some(1));
        assert_eq!(idx.index_at_ticks(1024), Some(2));
        assert_eq!(idx.index_at_ticks(99_999), Some(3));
        assert_eq!(idx.index_at_time(1.024, 1000), Some(2));
        assert_eq!(idx.index_at_time(-3.0, 1000), Some(0));
        assert_eq!(idx.index_at_time(f64::NAN, 1000), Some(0));
        assert_eq!(SampleIndex::default().index_at_ticks(5), None);
    }

    #[test]
    fn time_search_with_equal_times_takes_last() {
        let idx = index(&[(0, true), (10, false), (10, false), (20, false)]);
        assert_eq!(idx.index_at_ticks(10), Some(2));
        assert_eq!(idx.index_at_ticks(15), Some(2));
    }

    #[test]
    fn keyframe_before_scans_backwards() {
        let idx = index(&[
            (0, false),
            (1, false),
            (2, true),
            (3, false),
            (4, false),
            (5, true),
        ]);
        assert_eq!(idx.keyframe_before(0), 0);
        assert_eq!(idx.keyframe_before(1), 0);
        assert_eq!(idx.keyframe_before(2), 2);
        assert_eq!(idx.keyframe_before(4), 2);
        assert_eq!(idx.keyframe_before(5), 5);
        assert_eq!(idx.keyframe_before(500), 5);
        assert_eq!(SampleIndex::default().keyframe_before(3), 0);
    }

    #[test]
    fn keyframe_before_never_passes_index() {
        let idx = index(&[(0, true), (1, false), (2, true), (3, false), (4, false)]);
        for i in 0..idx.len() as u32 {
            let j = idx.keyframe_before(i);
            assert!(j <= i);
            assert!(idx.get(j).unwrap().is_keyframe || j == 0);
        }
    }

    #[test]
    fn range_requires_every_index() {
        let idx = index(&[(0, true), (1, false), (2, false)]);
        assert_eq!(idx.range(1, 3).map(|r| r.len()), Some(2));
        assert_eq!(idx.range(0, 0).map(|r| r.len()), Some(0));
        assert!(idx.range(2, 4).is_none());
        assert!(idx.range(3, 1).is_none());
    }

    #[test]
    fn rounding_to_ticks() {
        assert_eq!(seconds_to_ticks(1.024, 1000), 1024);
        assert_eq!(seconds_to_ticks(0.0004, 1000), 0);
        assert_eq!(seconds_to_ticks(0.0005, 1000), 1);
        assert_eq!(seconds_to_ticks(1.0, 0), 0);
    }
}
