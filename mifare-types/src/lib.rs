//! Type definitions for mifare-rw

pub mod block;
pub mod error;
pub mod status;

pub use block::BlockAddress;
pub use error::{Error, Result};
pub use status::{ReaderState, SessionStatus, StatusColor};
