use crate::boxes::{BoxHeader, FourCC};

#[derive(thiserror::Error, Debug)]
pub enum ParseError {
    #[error("not enough data at offset {offset}: need {needed} bytes, have {available}")]
    NotEnoughData {
        offset: u64,
        needed: u64,
        available: u64,
    },
    #[error("invalid box size {size} at offset {offset} (header is {header_size} bytes)")]
    InvalidSize {
        offset: u64,
        size: u64,
        header_size: u64,
    },
    #[error("io: {0}")]
    Io(#[from] std::io::Error),
}

impl ParseError {
    /// True when the input simply ran out, as opposed to being malformed.
    pub fn is_truncation(&self) -> bool {
        match self {
            ParseError::NotEnoughData { .. } => true,
            ParseError::Io(e) => e.kind() == std::io::ErrorKind::UnexpectedEof,
            ParseError::InvalidSize { .. } => false,
        }
    }
}

pub type Result<T> = std::result::Result<T, ParseError>;

/// Read one box header at `offset` within `data`.
///
/// `data` is addressed with absolute offsets: byte `i` of the slice is file
/// offset `i`. A 32-bit size of 1 means a 64-bit size follows the tag.
pub fn read_box_header(data: &[u8], offset: u64) -> Result<BoxHeader> {
    let available = (data.len() as u64).saturating_sub(offset);
    if available < 8 {
        return Err(ParseError::NotEnoughData {
            offset,
            needed: 8,
            available,
        });
    }

    let pos = offset as usize;
    let size32 = read_u32_at(data, pos);
    let typ = FourCC([data[pos + 4], data[pos + 5], data[pos + 6], data[pos + 7]]);

    let (size, header_size) = if size32 == 1 {
        if available < 16 {
            return Err(ParseError::NotEnoughData {
                offset,
                needed: 16,
                available,
            });
        }
        (read_u64_at(data, pos + 8), 16u64)
    } else {
        (size32 as u64, 8u64)
    };

    if size != 0 && size < header_size {
        return Err(ParseError::InvalidSize {
            offset,
            size,
            header_size,
        });
    }

    Ok(BoxHeader {
        typ,
        start: offset,
        size,
        header_size,
    })
}

fn read_u32_at(data: &[u8], pos: usize) -> u32 {
    u32::from_be_bytes([data[pos], data[pos + 1], data[pos + 2], data[pos + 3]])
}

fn read_u64_at(data: &[u8], pos: usize) -> u64 {
    let mut b = [0u8; 8];
    b.copy_from_slice(&data[pos..pos + 8]);
    u64::from_be_bytes(b)
}
