//! # mifare-rw
//!
//! Read and write MIFARE Classic blocks through a PC/SC reader while
//! tracking reader/card presence.
//!
//! ## Features
//!
//! - Authenticated 16-byte block reads and writes with the default key
//! - Text rendering of block contents (hex, plain, stretched)
//! - Live presence tracking marshalled onto the display thread
//! - Driver errors never escape; every call has a documented fallback
//!
//! ## Quick Start
//!
//! ```no_run
//! use std::sync::Arc;
//! use mifare_rw::presentation::{channel, DisplayState};
//! use mifare_rw::{Config, Console, PcscCardIo};
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let io = Arc::new(PcscCardIo::new()?);
//!     let (marshal, mut presenter) = channel(DisplayState::new());
//!
//!     let console = Console::new(io, marshal, Config::default());
//!     console.initialize();
//!
//!     if console.write_block_from_text("HELLO", 4) {
//!         println!("Block 4: {:?}", console.read_block_as_text(4));
//!     }
//!
//!     presenter.pump();
//!     presenter.with_sink(|display| println!("{}", display));
//!     Ok(())
//! }
//! ```

pub mod block_io;
pub mod config;
pub mod console;
pub mod error;
pub mod presentation;
pub mod session;
pub mod tracker;

#[cfg(test)]
mod mock;

// Re-exports
pub use block_io::BlockIo;
pub use config::Config;
pub use console::Console;
pub use error::{Error, Result};
pub use session::CardSession;
pub use tracker::ReaderStateTracker;

// Re-export lower layers
pub use mifare_core::{codec, AuthKey, TextFormat};
pub use mifare_reader::{CardIo, MemoryCardIo, PcscCardIo, SubscriptionHandle};
pub use mifare_types::{BlockAddress, ReaderState, SessionStatus, StatusColor};
