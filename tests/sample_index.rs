mod common;

use common::*;
use mp4index::sample_table::parse_stbl;
use mp4index::{IndexError, SampleIndex};

fn index_of(children: &[Vec<u8>]) -> Result<SampleIndex, IndexError> {
    let data = container(b"stbl", children);
    SampleIndex::build(&parse_stbl(&data, 8..data.len() as u64), u64::MAX)
}

#[test]
fn two_chunks_of_two_samples() {
    let index = index_of(&scenario_a_stbl()).unwrap();

    let offsets: Vec<u64> = index.iter().map(|e| e.byte_offset).collect();
    let times: Vec<u64> = index.iter().map(|e| e.decode_time).collect();
    assert_eq!(offsets, vec![1000, 1100, 1200, 1300]);
    assert_eq!(times, vec![0, 512, 1024, 1536]);
    assert!(index.iter().all(|e| e.size == 100 && e.duration == 512));
    assert_eq!(index.total_duration(), 2048);
}

#[test]
fn missing_stss_marks_everything_as_keyframe() {
    let index = index_of(&scenario_a_stbl()).unwrap();
    assert!(index.iter().all(|e| e.is_keyframe));
    assert_eq!(index.keyframes().count(), 4);
}

#[test]
fn empty_stss_marks_nothing_as_keyframe() {
    let mut children = scenario_a_stbl();
    children.push(stss(&[]));
    let index = index_of(&children).unwrap();
    assert_eq!(index.keyframes().count(), 0);
    assert_eq!(index.keyframe_before(3), 0);
}

#[test]
fn stss_flags_selected_samples() {
    let mut children = scenario_a_stbl();
    children.push(stss(&[1, 3]));
    let index = index_of(&children).unwrap();

    let keys: Vec<u32> = index.keyframes().map(|e| e.index).collect();
    assert_eq!(keys, vec![0, 2]);
    assert_eq!(index.keyframe_before(1), 0);
    assert_eq!(index.keyframe_before(3), 2);
}

#[test]
fn entries_are_dense_and_ordered() {
    let index = index_of(&[
        stts(&[(3, 10), (4, 20)]),
        stsc(&[(1, 3, 1), (2, 1, 1), (4, 2, 1)]),
        stsz(&[5, 6, 7, 8, 9, 10, 11]),
        stco(&[100, 200, 300, 400]),
    ])
    .unwrap();

    // chunks hold 3, 1, 1, 2 samples
    let offsets: Vec<u64> = index.iter().map(|e| e.byte_offset).collect();
    assert_eq!(offsets, vec![100, 105, 111, 200, 300, 400, 410]);

    for (i, e) in index.iter().enumerate() {
        assert_eq!(e.index as usize, i);
        assert_eq!(e.decode_time, e.composition_time);
    }
    for pair in index.entries().windows(2) {
        assert_eq!(pair[1].decode_time, pair[0].decode_time + pair[0].duration as u64);
    }
    let durations: Vec<u32> = index.iter().map(|e| e.duration).collect();
    assert_eq!(durations, vec![10, 10, 10, 20, 20, 20, 20]);
}

#[test]
fn stts_shorter_than_samples_repeats_last_duration() {
    let index = index_of(&[
        stts(&[(1, 40), (1, 25)]),
        stsc(&[(1, 4, 1)]),
        stsz_uniform(1, 4),
        stco(&[0]),
    ])
    .unwrap();
    let durations: Vec<u32> = index.iter().map(|e| e.duration).collect();
    assert_eq!(durations, vec![40, 25, 25, 25]);
}

#[test]
fn missing_stts_gives_zero_durations() {
    let index = index_of(&[stsc(&[(1, 2, 1)]), stsz_uniform(8, 2), stco(&[64])]).unwrap();
    assert_eq!(index.len(), 2);
    assert!(index.iter().all(|e| e.duration == 0 && e.decode_time == 0));
}

#[test]
fn size_table_caps_the_sample_count() {
    let index = index_of(&[
        stts(&[(10, 1)]),
        stsc(&[(1, 5, 1)]),
        stsz_uniform(4, 3),
        stco(&[0, 100]),
    ])
    .unwrap();
    assert_eq!(index.len(), 3);
}

#[test]
fn co64_offsets_are_used() {
    let index = index_of(&[
        stts(&[(2, 1)]),
        stsc(&[(1, 1, 1)]),
        stsz(&[3, 4]),
        co64(&[0x1_0000_0000, 0x2_0000_0000]),
    ])
    .unwrap();
    let offsets: Vec<u64> = index.iter().map(|e| e.byte_offset).collect();
    assert_eq!(offsets, vec![0x1_0000_0000, 0x2_0000_0000]);
}

#[test]
fn required_tables() {
    assert_eq!(
        index_of(&[stts(&[(1, 1)]), stsz_uniform(1, 1), stco(&[0])]).unwrap_err(),
        IndexError::MissingAtom("stsc")
    );
    assert_eq!(
        index_of(&[stsc(&[(1, 1, 1)]), stco(&[0])]).unwrap_err(),
        IndexError::MissingAtom("stsz")
    );
    assert_eq!(
        index_of(&[stsc(&[(1, 1, 1)]), stsz_uniform(1, 1)]).unwrap_err(),
        IndexError::MissingAtom("stco")
    );
}

#[test]
fn time_lookup_matches_exact_and_between_times() {
    let index = index_of(&scenario_a_stbl()).unwrap();
    assert_eq!(index.index_at_time(1.024, 1000), Some(2));
    assert_eq!(index.index_at_time(1.0, 1000), Some(1));
    assert_eq!(index.index_at_time(0.0, 1000), Some(0));
    assert_eq!(index.index_at_time(60.0, 1000), Some(3));
}
