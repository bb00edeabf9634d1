//! Reader errors

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("No readers available")]
    NoReadersAvailable,
    
    #[error("No card present")]
    NoCard,
    
    #[error("Not connected")]
    NotConnected,
    
    #[error("Authentication failed for block {block}")]
    AuthenticationFailed {
        block: u8,
    },
    
    #[error("Block {block} out of range (card has {blocks} blocks)")]
    BlockOutOfRange {
        block: u8,
        blocks: usize,
    },
    
    #[error("Block data must be 16 bytes, got {len}")]
    InvalidBlockData {
        len: usize,
    },
    
    #[error("Block {0} is read-only")]
    ReadOnlyBlock(u8),
    
    #[error("PC/SC error: {0}")]
    Pcsc(#[from] pcsc::Error),
    
    #[error("Protocol error: {0}")]
    Core(#[from] mifare_core::Error),
    
    #[error("Presence monitor error: {0}")]
    Monitor(String),
}

impl Error {
    /// Check if the error means the card left the field
    pub fn is_card_gone(&self) -> bool {
        matches!(
            self,
            Self::NoCard
                | Self::Pcsc(pcsc::Error::NoSmartcard)
                | Self::Pcsc(pcsc::Error::RemovedCard)
                | Self::Pcsc(pcsc::Error::ResetCard)
        )
    }
}
