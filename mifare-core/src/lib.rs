//! # mifare-core
//!
//! Core primitives for MIFARE Classic block access.
//!
//! This crate provides:
//! - Byte/text codec used to present block contents
//! - ACR122U pseudo-APDU framing
//! - Protocol constants (authentication key, block size)

pub mod apdu;
pub mod codec;
pub mod constants;
pub mod error;

pub use apdu::{Apdu, Response};
pub use codec::{decode_fixed, encode, TextFormat};
pub use constants::AuthKey;
pub use error::{Error, Result};

/// Size of one data block in bytes
pub const BLOCK_SIZE: usize = 16;
