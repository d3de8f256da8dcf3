//! Track header decoding: `tkhd`, `mdhd`, `hdlr`.
//!
//! Every decoder takes the box payload starting at the version byte.

use crate::boxes::FourCC;
use crate::parser::Result;
use crate::sample_table::SampleTableRaw;
use byteorder::{BigEndian, ReadBytesExt};
use serde::Serialize;
use std::io::{Cursor, Read};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaType {
    Video,
    Audio,
    Text,
}

impl MediaType {
    pub fn from_handler(handler: FourCC) -> Self {
        match &handler.0 {
            b"vide" => MediaType::Video,
            b"soun" => MediaType::Audio,
            _ => MediaType::Text,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            MediaType::Video => "video",
            MediaType::Audio => "audio",
            MediaType::Text => "text",
        }
    }
}

/// Timescale and duration from `mdhd`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct MediaHeader {
    pub timescale: u32,
    pub duration: u64,
}

/// Metadata for one `trak`, registered only when it has both an id and a sample table.
#[derive(Debug, Clone, Serialize)]
pub struct TrackRecord {
    pub id: u32,
    pub media_type: MediaType,
    pub timescale: u32,
    /// Duration in `timescale` units.
    pub duration: u64,
    pub codec: Option<FourCC>,
    pub width: Option<u16>,
    pub height: Option<u16>,
    #[serde(skip)]
    pub sample_table: SampleTableRaw,
}

impl TrackRecord {
    pub fn duration_secs(&self) -> f64 {
        if self.timescale == 0 {
            0.0
        } else {
            self.duration as f64 / self.timescale as f64
        }
    }
}

fn skip_version_flags(cur: &mut Cursor<&[u8]>) -> Result<u8> {
    let version = cur.read_u8()?;
    let mut flags = [0u8; 3];
    cur.read_exact(&mut flags)?;
    Ok(version)
}

/// Track id from `tkhd`. It is stored 1-based and returned unchanged.
pub fn parse_tkhd(payload: &[u8]) -> Result<u32> {
    let mut cur = Cursor::new(payload);
    let version = skip_version_flags(&mut cur)?;

    // creation_time, modification_time
    if version == 1 {
        cur.read_u64::<BigEndian>()?;
        cur.read_u64::<BigEndian>()?;
    } else {
        cur.read_u32::<BigEndian>()?;
        cur.read_u32::<BigEndian>()?;
    }

    Ok(cur.read_u32::<BigEndian>()?)
}

pub fn parse_mdhd(payload: &[u8]) -> Result<MediaHeader> {
    let mut cur = Cursor::new(payload);
    let version = skip_version_flags(&mut cur)?;

    let header = if version == 1 {
        let _creation = cur.read_u64::<BigEndian>()?;
        let _modification = cur.read_u64::<BigEndian>()?;
        let timescale = cur.read_u32::<BigEndian>()?;
        let duration = cur.read_u64::<BigEndian>()?;
        MediaHeader {
            timescale,
            duration,
        }
    } else {
        let _creation = cur.read_u32::<BigEndian>()?;
        let _modification = cur.read_u32::<BigEndian>()?;
        let timescale = cur.read_u32::<BigEndian>()?;
        let duration = cur.read_u32::<BigEndian>()? as u64;
        MediaHeader {
            timescale,
            duration,
        }
    };

    Ok(header)
}

pub fn parse_hdlr(payload: &[u8]) -> Result<MediaType> {
    let mut cur = Cursor::new(payload);
    skip_version_flags(&mut cur)?;
    let _pre_defined = cur.read_u32::<BigEndian>()?;
    let mut handler = [0u8; 4];
    cur.read_exact(&mut handler)?;
    Ok(MediaType::from_handler(FourCC(handler)))
}
