//! Block addressing

use std::fmt;

use crate::error::{Error, Result};

/// Address of one 16-byte block
///
/// Card-layout rules (sector trailers, manufacturer block) are not checked
/// here; the only constraint is that the number fits the one-byte field of
/// the reader commands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct BlockAddress(u8);

impl BlockAddress {
    pub const fn new(block: u8) -> Self {
        Self(block)
    }
    
    pub const fn get(self) -> u8 {
        self.0
    }
}

impl From<u8> for BlockAddress {
    fn from(block: u8) -> Self {
        Self(block)
    }
}

impl From<BlockAddress> for u8 {
    fn from(block: BlockAddress) -> Self {
        block.0
    }
}

impl TryFrom<i64> for BlockAddress {
    type Error = Error;
    
    fn try_from(value: i64) -> Result<Self> {
        u8::try_from(value)
            .map(Self)
            .map_err(|_| Error::Validation(format!("block number {value} does not fit in one byte")))
    }
}

impl std::str::FromStr for BlockAddress {
    type Err = Error;
    
    fn from_str(s: &str) -> Result<Self> {
        let value: i64 = s
            .trim()
            .parse()
            .map_err(|e| Error::Parse(format!("block number {s:?}: {e}")))?;
        Self::try_from(value)
    }
}

impl fmt::Display for BlockAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    
    #[test]
    fn test_block_address_range() {
        assert_eq!(BlockAddress::try_from(0i64).unwrap().get(), 0);
        assert_eq!(BlockAddress::try_from(255i64).unwrap().get(), 255);
        assert!(matches!(BlockAddress::try_from(256i64), Err(Error::Validation(_))));
        assert!(matches!(BlockAddress::try_from(-1i64), Err(Error::Validation(_))));
    }
    
    #[test]
    fn test_block_address_parse() {
        assert_eq!(" 4 ".parse::<BlockAddress>().unwrap(), BlockAddress::new(4));
        assert!(matches!("four".parse::<BlockAddress>(), Err(Error::Parse(_))));
        assert!(matches!("300".parse::<BlockAddress>(), Err(Error::Validation(_))));
    }
}
