//! Byte-level builders for small MP4 files.
#![allow(dead_code)]

pub fn bx(typ: &[u8; 4], payload: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(8 + payload.len());
    out.extend_from_slice(&(8 + payload.len() as u32).to_be_bytes());
    out.extend_from_slice(typ);
    out.extend_from_slice(payload);
    out
}

/// Box with a 64-bit extended size (`size == 1`).
pub fn large_bx(typ: &[u8; 4], payload: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(16 + payload.len());
    out.extend_from_slice(&1u32.to_be_bytes());
    out.extend_from_slice(typ);
    out.extend_from_slice(&(16 + payload.len() as u64).to_be_bytes());
    out.extend_from_slice(payload);
    out
}

pub fn container(typ: &[u8; 4], children: &[Vec<u8>]) -> Vec<u8> {
    bx(typ, &children.concat())
}

/// Full box with version 0 and zero flags.
pub fn full_bx(typ: &[u8; 4], body: &[u8]) -> Vec<u8> {
    let mut payload = vec![0u8; 4];
    payload.extend_from_slice(body);
    bx(typ, &payload)
}

fn be32(values: &[u32]) -> Vec<u8> {
    values.iter().flat_map(|v| v.to_be_bytes()).collect()
}

pub fn ftyp() -> Vec<u8> {
    bx(b"ftyp", b"isom\0\0\x02\0isomiso2avc1mp41")
}

pub fn tkhd(track_id: u32) -> Vec<u8> {
    // creation, modification, track_id, reserved, duration
    let mut body = be32(&[0, 0, track_id, 0, 0]);
    body.resize(80, 0);
    full_bx(b"tkhd", &body)
}

pub fn tkhd_v1(track_id: u32) -> Vec<u8> {
    let mut payload = vec![1, 0, 0, 0];
    payload.extend_from_slice(&[0u8; 16]);
    payload.extend_from_slice(&track_id.to_be_bytes());
    payload.resize(96, 0);
    bx(b"tkhd", &payload)
}

pub fn mdhd(timescale: u32, duration: u32) -> Vec<u8> {
    let mut body = be32(&[0, 0, timescale, duration]);
    body.extend_from_slice(&[0x55, 0xc4, 0, 0]);
    full_bx(b"mdhd", &body)
}

pub fn hdlr(handler: &[u8; 4]) -> Vec<u8> {
    let mut body = vec![0u8; 4];
    body.extend_from_slice(handler);
    body.extend_from_slice(&[0u8; 12]);
    body.extend_from_slice(b"Handler\0");
    full_bx(b"hdlr", &body)
}

/// `stsd` with one VisualSampleEntry and an optional codec config child.
pub fn stsd_visual(codec: &[u8; 4], width: u16, height: u16, config: Option<(&[u8; 4], &[u8])>) -> Vec<u8> {
    let mut fields = vec![0u8; 6];
    fields.extend_from_slice(&1u16.to_be_bytes());
    fields.extend_from_slice(&[0u8; 16]);
    fields.extend_from_slice(&width.to_be_bytes());
    fields.extend_from_slice(&height.to_be_bytes());
    fields.extend_from_slice(&[0u8; 50]);
    if let Some((typ, data)) = config {
        fields.extend_from_slice(&bx(typ, data));
    }
    let entry = bx(codec, &fields);

    let mut body = be32(&[1]);
    body.extend_from_slice(&entry);
    full_bx(b"stsd", &body)
}

/// `stsd` with one AudioSampleEntry.
pub fn stsd_audio(codec: &[u8; 4]) -> Vec<u8> {
    let mut fields = vec![0u8; 6];
    fields.extend_from_slice(&1u16.to_be_bytes());
    fields.extend_from_slice(&[0u8; 8]);
    fields.extend_from_slice(&[0, 2, 0, 16, 0, 0, 0, 0]);
    fields.extend_from_slice(&(48_000u32 << 16).to_be_bytes());
    let entry = bx(codec, &fields);

    let mut body = be32(&[1]);
    body.extend_from_slice(&entry);
    full_bx(b"stsd", &body)
}

pub fn stts(runs: &[(u32, u32)]) -> Vec<u8> {
    let mut body = be32(&[runs.len() as u32]);
    for &(count, duration) in runs {
        body.extend(be32(&[count, duration]));
    }
    full_bx(b"stts", &body)
}

/// Sample numbers are 1-based, as stored.
pub fn stss(sample_numbers: &[u32]) -> Vec<u8> {
    let mut body = be32(&[sample_numbers.len() as u32]);
    body.extend(be32(sample_numbers));
    full_bx(b"stss", &body)
}

/// `(first_chunk, samples_per_chunk, sample_description_index)`; `first_chunk` is 1-based.
pub fn stsc(runs: &[(u32, u32, u32)]) -> Vec<u8> {
    let mut body = be32(&[runs.len() as u32]);
    for &(first, per_chunk, sdi) in runs {
        body.extend(be32(&[first, per_chunk, sdi]));
    }
    full_bx(b"stsc", &body)
}

pub fn stsz_uniform(size: u32, count: u32) -> Vec<u8> {
    full_bx(b"stsz", &be32(&[size, count]))
}

pub fn stsz(sizes: &[u32]) -> Vec<u8> {
    let mut body = be32(&[0, sizes.len() as u32]);
    body.extend(be32(sizes));
    full_bx(b"stsz", &body)
}

pub fn stco(offsets: &[u32]) -> Vec<u8> {
    let mut body = be32(&[offsets.len() as u32]);
    body.extend(be32(offsets));
    full_bx(b"stco", &body)
}

pub fn co64(offsets: &[u64]) -> Vec<u8> {
    let mut body = be32(&[offsets.len() as u32]);
    for o in offsets {
        body.extend_from_slice(&o.to_be_bytes());
    }
    full_bx(b"co64", &body)
}

pub fn trak(track_id: u32, handler: &[u8; 4], timescale: u32, stbl_children: &[Vec<u8>]) -> Vec<u8> {
    container(
        b"trak",
        &[
            tkhd(track_id),
            container(
                b"mdia",
                &[
                    mdhd(timescale, 0),
                    hdlr(handler),
                    container(b"minf", &[container(b"stbl", stbl_children)]),
                ],
            ),
        ],
    )
}

/// The single-track table used across tests: two chunks of two 100-byte
/// samples at 1000 and 1200, 512 ticks each at timescale 1000, no `stss`.
pub fn scenario_a_stbl() -> Vec<Vec<u8>> {
    vec![
        stsd_visual(b"avc1", 640, 360, Some((b"avcC", &[1, 0x64, 0x00, 0x1f, 0xff]))),
        stts(&[(4, 512)]),
        stsc(&[(1, 2, 1)]),
        stsz_uniform(100, 4),
        stco(&[1000, 1200]),
    ]
}

/// Byte stored at absolute file position `pos` inside [`mdat_until`] payloads.
pub fn pattern(pos: u64) -> u8 {
    (pos % 251) as u8
}

/// Append an `mdat` so the file ends at `file_len`, filled with [`pattern`].
pub fn mdat_until(file: &mut Vec<u8>, file_len: u64) {
    let payload_start = file.len() as u64 + 8;
    assert!(payload_start <= file_len, "metadata is larger than the requested file");
    let payload: Vec<u8> = (payload_start..file_len).map(pattern).collect();
    file.extend(bx(b"mdat", &payload));
}

/// `ftyp`, `moov` with the given traks, then an `mdat` up to `file_len`.
pub fn movie(traks: &[Vec<u8>], file_len: u64) -> Vec<u8> {
    let mut file = ftyp();
    file.extend(container(b"moov", traks));
    mdat_until(&mut file, file_len);
    file
}

pub fn expected_bytes(offset: u64, size: u32) -> Vec<u8> {
    (offset..offset + size as u64).map(pattern).collect()
}
