/// GUID codec
///
/// Active Directory stores `objectGUID` as 16 raw bytes in the Windows layout:
/// the first three fields are little-endian, the trailing eight bytes are kept
/// as-is. The same value can also be laid out big-endian ("network" order).
/// Both layouts render to the canonical `xxxxxxxx-xxxx-xxxx-xxxx-xxxxxxxxxxxx`
/// string.
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Length of the canonical string form
pub const GUID_STRING_LEN: usize = 36;

const HYPHEN_OFFSETS: [usize; 4] = [8, 13, 18, 23];

/// Offsets of the eight tail bytes in the canonical string form
const TAIL_OFFSETS: [usize; 8] = [19, 21, 24, 26, 28, 30, 32, 34];

/// GUID parsing errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GuidError {
    #[error("invalid GUID {0:?}")]
    InvalidFormat(String),
}

/// Byte layout of a binary GUID
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ByteOrder {
    /// Canonical network order
    BigEndian,
    /// Native Windows / directory order
    LittleEndian,
}

/// A 128-bit GUID split in its four fields
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Guid {
    pub data1: u32,
    pub data2: u16,
    pub data3: u16,
    pub data4: [u8; 8],
}

impl Guid {
    /// Decode 16 bytes laid out in the given byte order
    pub fn from_bytes(b: [u8; 16], order: ByteOrder) -> Self {
        let d1 = [b[0], b[1], b[2], b[3]];
        let d2 = [b[4], b[5]];
        let d3 = [b[6], b[7]];
        let mut data4 = [0u8; 8];
        data4.copy_from_slice(&b[8..16]);

        match order {
            ByteOrder::BigEndian => Self {
                data1: u32::from_be_bytes(d1),
                data2: u16::from_be_bytes(d2),
                data3: u16::from_be_bytes(d3),
                data4,
            },
            ByteOrder::LittleEndian => Self {
                data1: u32::from_le_bytes(d1),
                data2: u16::from_le_bytes(d2),
                data3: u16::from_le_bytes(d3),
                data4,
            },
        }
    }

    /// Encode into 16 bytes using the given byte order
    pub fn to_bytes(&self, order: ByteOrder) -> [u8; 16] {
        let (d1, d2, d3) = match order {
            ByteOrder::BigEndian => (
                self.data1.to_be_bytes(),
                self.data2.to_be_bytes(),
                self.data3.to_be_bytes(),
            ),
            ByteOrder::LittleEndian => (
                self.data1.to_le_bytes(),
                self.data2.to_le_bytes(),
                self.data3.to_le_bytes(),
            ),
        };

        let mut b = [0u8; 16];
        b[0..4].copy_from_slice(&d1);
        b[4..6].copy_from_slice(&d2);
        b[6..8].copy_from_slice(&d3);
        b[8..16].copy_from_slice(&self.data4);
        b
    }

    /// Construct from a big-endian array
    pub fn from_array(b: [u8; 16]) -> Self {
        Self::from_bytes(b, ByteOrder::BigEndian)
    }

    /// Big-endian encoding
    pub fn to_array(&self) -> [u8; 16] {
        self.to_bytes(ByteOrder::BigEndian)
    }

    /// Construct from a Windows (little-endian) array
    pub fn from_windows_array(b: [u8; 16]) -> Self {
        Self::from_bytes(b, ByteOrder::LittleEndian)
    }

    /// Windows (little-endian) encoding
    pub fn to_windows_array(&self) -> [u8; 16] {
        self.to_bytes(ByteOrder::LittleEndian)
    }

    /// Decode the leading 16 bytes of a raw directory value (Windows order).
    ///
    /// Returns `None` when fewer than 16 bytes are available.
    pub fn from_windows_slice(raw: &[u8]) -> Option<Self> {
        let head: [u8; 16] = raw.get(..16)?.try_into().ok()?;
        Some(Self::from_windows_array(head))
    }

    /// Parse the canonical `8-4-4-4-12` form. Upper-case hex digits are accepted.
    pub fn parse(s: &str) -> Result<Self, GuidError> {
        let invalid = || GuidError::InvalidFormat(s.to_string());

        if s.len() != GUID_STRING_LEN || !s.is_ascii() {
            return Err(invalid());
        }
        let bytes = s.as_bytes();
        if HYPHEN_OFFSETS.iter().any(|&i| bytes[i] != b'-') {
            return Err(invalid());
        }

        let data1 = u32::from_str_radix(hex_field(s, 0, 8).ok_or_else(invalid)?, 16)
            .map_err(|_| invalid())?;
        let data2 = u16::from_str_radix(hex_field(s, 9, 4).ok_or_else(invalid)?, 16)
            .map_err(|_| invalid())?;
        let data3 = u16::from_str_radix(hex_field(s, 14, 4).ok_or_else(invalid)?, 16)
            .map_err(|_| invalid())?;

        let mut data4 = [0u8; 8];
        for (slot, &offset) in data4.iter_mut().zip(TAIL_OFFSETS.iter()) {
            *slot = u8::from_str_radix(hex_field(s, offset, 2).ok_or_else(invalid)?, 16)
                .map_err(|_| invalid())?;
        }

        Ok(Self {
            data1,
            data2,
            data3,
            data4,
        })
    }

    /// Render as a directory filter value: every byte of the Windows encoding
    /// as a backslash-escaped hex pair (`\xx`).
    pub fn to_filter_escaped(&self) -> String {
        self.to_windows_array()
            .iter()
            .map(|b| format!("\\{}", hex::encode([*b])))
            .collect()
    }
}

/// Slice a field that must consist of hex digits only.
///
/// `from_str_radix` tolerates a leading `+`, so the digits are checked first.
fn hex_field(s: &str, start: usize, len: usize) -> Option<&str> {
    let field = s.get(start..start + len)?;
    field
        .bytes()
        .all(|b| b.is_ascii_hexdigit())
        .then_some(field)
}

impl fmt::Display for Guid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:08x}-{:04x}-{:04x}-{}-{}",
            self.data1,
            self.data2,
            self.data3,
            hex::encode(&self.data4[..2]),
            hex::encode(&self.data4[2..]),
        )
    }
}

impl FromStr for Guid {
    type Err = GuidError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl Serialize for Guid {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Guid {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Self::parse(&s).map_err(serde::de::Error::custom)
    }
}
