use serde::{Serialize, Serializer};
use std::fmt;

#[derive(Copy, Clone, Eq, PartialEq, Hash)]
pub struct FourCC(pub [u8; 4]);

impl FourCC {
    pub fn as_str_lossy(&self) -> String {
        self.0
            .iter()
            .map(|&c| if (32..=126).contains(&c) { c as char } else { '.' })
            .collect()
    }

    pub fn starts_with(&self, prefix: &[u8]) -> bool {
        self.0.starts_with(prefix)
    }
}

impl fmt::Debug for FourCC {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str_lossy())
    }
}

impl fmt::Display for FourCC {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str_lossy())
    }
}

impl Serialize for FourCC {
    fn serialize<S: Serializer>(&self, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(&self.as_str_lossy())
    }
}

/// One box header as located by the cursor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BoxHeader {
    pub typ: FourCC,
    /// Absolute offset of the header's first byte.
    pub start: u64,
    /// Total size including header. `0` means "extends to the end of the enclosing range".
    pub size: u64,
    pub header_size: u64, // 8 or 16
}

impl BoxHeader {
    /// Offset of the first payload byte.
    pub fn payload_start(&self) -> u64 {
        self.start + self.header_size
    }

    /// End of the box, resolving size 0 against the enclosing range end.
    pub fn end_within(&self, range_end: u64) -> u64 {
        if self.size == 0 {
            range_end.max(self.payload_start())
        } else {
            self.start.saturating_add(self.size)
        }
    }
}
