//! Reader presence and card status structures

use std::fmt;
use std::str::FromStr;

use crate::error::{Error, Result};

/// Reader/card presence as reported by the reader driver
///
/// The textual form (`Display`) is the variant name and is what gets shown
/// in the reader-state indicator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ReaderState {
    /// No reader attached
    NoReader,
    
    /// Reader attached, no card in the field
    ReaderPresentNoCard,
    
    /// Card present on a reader
    CardPresent,
    
    /// Driver could not determine the state
    Error,
}

impl ReaderState {
    /// Variant name, as displayed
    pub fn as_str(self) -> &'static str {
        match self {
            Self::NoReader => "NoReader",
            Self::ReaderPresentNoCard => "ReaderPresentNoCard",
            Self::CardPresent => "CardPresent",
            Self::Error => "Error",
        }
    }
    
    /// Check if a card can be talked to in this state
    pub fn has_card(self) -> bool {
        matches!(self, Self::CardPresent)
    }
}

impl fmt::Display for ReaderState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ReaderState {
    type Err = Error;
    
    fn from_str(s: &str) -> Result<Self> {
        match s {
            "NoReader" => Ok(Self::NoReader),
            "ReaderPresentNoCard" => Ok(Self::ReaderPresentNoCard),
            "CardPresent" => Ok(Self::CardPresent),
            "Error" => Ok(Self::Error),
            other => Err(Error::Parse(format!("unknown reader state: {other}"))),
        }
    }
}

/// Connection indicator color
///
/// Only two colors exist: one for a connected card, one for everything else.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StatusColor {
    /// MediumSeaGreen
    Connected,
    
    /// Red
    Disconnected,
}

impl StatusColor {
    /// RGB components
    pub fn rgb(self) -> (u8, u8, u8) {
        match self {
            Self::Connected => (0x3C, 0xB3, 0x71),
            Self::Disconnected => (0xFF, 0x00, 0x00),
        }
    }
    
    /// Named color
    pub fn name(self) -> &'static str {
        match self {
            Self::Connected => "MediumSeaGreen",
            Self::Disconnected => "Red",
        }
    }
    
    /// Pick the color for a connection outcome
    pub fn for_connected(connected: bool) -> Self {
        if connected {
            Self::Connected
        } else {
            Self::Disconnected
        }
    }
}

impl fmt::Display for StatusColor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (r, g, b) = self.rgb();
        write!(f, "{} (#{:02X}{:02X}{:02X})", self.name(), r, g, b)
    }
}

/// Snapshot of the card session as shown to the operator
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionStatus {
    /// Whether the last connect attempt succeeded
    pub connected: bool,
    
    /// Card UID (or the placeholder text)
    pub uid: String,
    
    /// Driver status line
    pub status: String,
    
    /// Driver sub-status line
    pub sub_status: String,
}

impl SessionStatus {
    pub fn connected(uid: String, status: String, sub_status: String) -> Self {
        Self {
            connected: true,
            uid,
            status,
            sub_status,
        }
    }
    
    /// All three fields set to the same placeholder
    pub fn not_connected(placeholder: &str) -> Self {
        Self {
            connected: false,
            uid: placeholder.to_string(),
            status: placeholder.to_string(),
            sub_status: placeholder.to_string(),
        }
    }
    
    /// Indicator color for this snapshot
    pub fn color(&self) -> StatusColor {
        StatusColor::for_connected(self.connected)
    }
}

impl fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Card[UID: {}, status: {}, sub-status: {}]",
            self.uid, self.status, self.sub_status
        )
    }
}
