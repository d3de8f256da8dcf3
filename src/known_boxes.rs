use crate::boxes::FourCC;

/// Typed view over the boxes the sample indexer understands.
///
/// Anything not in this list becomes `KnownBox::Unknown(fourcc)` and is skipped
/// by every walk level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KnownBox {
    // File-level
    Moov,
    Mdat,

    // moov children
    Trak,

    // trak children
    Tkhd,
    Mdia,

    // mdia children
    Mdhd,
    Hdlr,
    Minf,

    // minf children
    Stbl,

    // stbl children
    Stsd,
    Stts,
    Stss,
    Stsc,
    Stsz,
    Stco,
    Co64,

    // visual sample entry children
    AvcC,
    HvcC,
    VpcC,
    Av1C,

    Unknown(FourCC),
}

impl From<FourCC> for KnownBox {
    fn from(cc: FourCC) -> Self {
        match &cc.0 {
            b"moov" => KnownBox::Moov,
            b"mdat" => KnownBox::Mdat,
            b"trak" => KnownBox::Trak,
            b"tkhd" => KnownBox::Tkhd,
            b"mdia" => KnownBox::Mdia,
            b"mdhd" => KnownBox::Mdhd,
            b"hdlr" => KnownBox::Hdlr,
            b"minf" => KnownBox::Minf,
            b"stbl" => KnownBox::Stbl,
            b"stsd" => KnownBox::Stsd,
            b"stts" => KnownBox::Stts,
            b"stss" => KnownBox::Stss,
            b"stsc" => KnownBox::Stsc,
            b"stsz" => KnownBox::Stsz,
            b"stco" => KnownBox::Stco,
            b"co64" => KnownBox::Co64,
            b"avcC" => KnownBox::AvcC,
            b"hvcC" => KnownBox::HvcC,
            b"vpcC" => KnownBox::VpcC,
            b"av1C" => KnownBox::Av1C,
            _ => KnownBox::Unknown(cc),
        }
    }
}

impl KnownBox {
    /// Decoder configuration records carried inside a visual sample entry.
    pub fn is_codec_config(&self) -> bool {
        matches!(
            self,
            KnownBox::AvcC | KnownBox::HvcC | KnownBox::VpcC | KnownBox::Av1C
        )
    }

    pub fn full_name(&self) -> &'static str {
        match self {
            KnownBox::Moov => "Movie Box",
            KnownBox::Mdat => "Media Data Box",
            KnownBox::Trak => "Track Box",
            KnownBox::Tkhd => "Track Header Box",
            KnownBox::Mdia => "Media Box",
            KnownBox::Mdhd => "Media Header Box",
            KnownBox::Hdlr => "Handler Reference Box",
            KnownBox::Minf => "Media Information Box",
            KnownBox::Stbl => "Sample Table Box",
            KnownBox::Stsd => "Sample Description Box",
            KnownBox::Stts => "Decoding Time to Sample Box",
            KnownBox::Stss => "Sync Sample Box",
            KnownBox::Stsc => "Sample To Chunk Box",
            KnownBox::Stsz => "Sample Size Box",
            KnownBox::Stco => "Chunk Offset Box",
            KnownBox::Co64 => "64-bit Chunk Offset Box",
            KnownBox::AvcC => "AVC Configuration Box",
            KnownBox::HvcC => "HEVC Configuration Box",
            KnownBox::VpcC => "VP Codec Configuration Box",
            KnownBox::Av1C => "AV1 Configuration Box",
            KnownBox::Unknown(_) => "Unknown Box",
        }
    }
}
