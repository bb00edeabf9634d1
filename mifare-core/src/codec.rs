//! Byte/text conversion for block contents
//!
//! Block data is shown to the operator as text in one of three shapes, and
//! text typed by the operator is packed into a fixed-size block.
//!
//! The conversions are deliberately byte-oriented: every byte becomes the
//! character with the same code point (U+0000..=U+00FF), and every UTF-16
//! code unit of the input text is narrowed to its low byte.

use std::fmt;
use std::str::FromStr;

use crate::error::{Error, Result};

/// Output shape for [`encode`]
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum TextFormat {
    /// `"41 42 "`: two uppercase hex digits and a space per byte
    Hex = 0,
    
    /// `"AB"`: one character per byte
    Normal = 1,
    
    /// `"A  B  "`: one character and two spaces per byte
    Stretched = 2,
}

impl TextFormat {
    pub fn name(self) -> &'static str {
        match self {
            Self::Hex => "hex",
            Self::Normal => "normal",
            Self::Stretched => "stretched",
        }
    }
}

impl fmt::Display for TextFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for TextFormat {
    type Err = Error;
    
    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "hex" => Ok(Self::Hex),
            "normal" => Ok(Self::Normal),
            "stretched" => Ok(Self::Stretched),
            _ => Err(Error::InvalidFormat(s.to_string())),
        }
    }
}

impl TryFrom<u8> for TextFormat {
    type Error = Error;
    
    fn try_from(value: u8) -> Result<Self> {
        match value {
            0 => Ok(Self::Hex),
            1 => Ok(Self::Normal),
            2 => Ok(Self::Stretched),
            other => Err(Error::InvalidFormat(other.to_string())),
        }
    }
}

/// Render bytes as text
///
/// # Examples
///
/// ```
/// use mifare_core::codec::{encode, TextFormat};
///
/// assert_eq!(encode(&[0x41, 0x42], TextFormat::Hex), "41 42 ");
/// assert_eq!(encode(&[0x41, 0x42], TextFormat::Normal), "AB");
/// assert_eq!(encode(&[0x41, 0x42], TextFormat::Stretched), "A  B  ");
/// ```
pub fn encode(bytes: &[u8], format: TextFormat) -> String {
    let per_byte = match format {
        TextFormat::Hex | TextFormat::Stretched => 3,
        TextFormat::Normal => 1,
    };
    let mut text = String::with_capacity(bytes.len() * per_byte);
    
    for &b in bytes {
        match format {
            TextFormat::Hex => {
                text.push_str(&format!("{b:02X} "));
            }
            TextFormat::Normal => {
                text.push(char::from(b));
            }
            TextFormat::Stretched => {
                text.push(char::from(b));
                text.push_str("  ");
            }
        }
    }
    
    text
}

/// Render bytes using a format given by name
///
/// # Errors
///
/// Returns [`Error::InvalidFormat`] if `format` is not one of
/// `hex`, `normal` or `stretched`.
pub fn encode_named(bytes: &[u8], format: &str) -> Result<String> {
    let format = format.parse::<TextFormat>()?;
    Ok(encode(bytes, format))
}

/// Pack text into exactly `length` bytes
///
/// Shorter text is padded with NUL bytes, longer text is truncated. The
/// text is measured in UTF-16 code units and each unit keeps only its low
/// byte, so characters above U+00FF do not survive (`'€'` U+20AC becomes
/// `0xAC`).
///
/// # Examples
///
/// ```
/// use mifare_core::codec::decode_fixed;
///
/// assert_eq!(decode_fixed("HI", 4), vec![b'H', b'I', 0, 0]);
/// assert_eq!(decode_fixed("HELLO", 2), vec![b'H', b'E']);
/// ```
pub fn decode_fixed(text: &str, length: usize) -> Vec<u8> {
    let mut bytes: Vec<u8> = text
        .encode_utf16()
        .take(length)
        .map(|unit| (unit & 0xFF) as u8)
        .collect();
    
    bytes.resize(length, 0);
    bytes
}

/// Strip display whitespace from stretched text
///
/// Trims both ends, then removes every remaining space character. Other
/// inner whitespace (tabs, NULs) is kept.
pub fn compact(text: &str) -> String {
    text.trim().replace(' ', "")
}
