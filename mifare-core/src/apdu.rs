//! ACR122U pseudo-APDU framing
//!
//! The reader exposes MIFARE Classic operations through class `FF`
//! commands:
//!
//! ```text
//! GET DATA (UID)        FF CA 00 00 00
//! LOAD KEY              FF 82 00 <slot> 06 <key:6>
//! GENERAL AUTHENTICATE  FF 86 00 00 05 01 00 <block> <key type> <key slot>
//! READ BINARY           FF B0 00 <block> <len>
//! UPDATE BINARY         FF D6 00 <block> <len> <data>
//! ```
//!
//! Every response ends with a two byte status word; `90 00` is success.

use bytes::{BufMut, Bytes, BytesMut};
use std::fmt;
use tracing::trace;

use crate::{
    constants::{sw, AuthKey},
    error::{Error, Result},
};

/// Command APDU (short form)
#[derive(Clone, PartialEq, Eq)]
pub struct Apdu {
    pub cla: u8,
    pub ins: u8,
    pub p1: u8,
    pub p2: u8,
    
    /// Command data (Lc is derived from its length)
    pub data: Bytes,
    
    /// Expected response length
    pub le: Option<u8>,
}

impl Apdu {
    /// Pseudo-APDU class byte
    pub const CLA: u8 = 0xFF;
    
    /// Maximum command data length in a short APDU
    pub const MAX_DATA_SIZE: usize = 255;
    
    pub const INS_GET_DATA: u8 = 0xCA;
    pub const INS_LOAD_KEY: u8 = 0x82;
    pub const INS_AUTHENTICATE: u8 = 0x86;
    pub const INS_READ_BINARY: u8 = 0xB0;
    pub const INS_UPDATE_BINARY: u8 = 0xD6;
    
    /// Create a command without data
    pub fn new(ins: u8, p1: u8, p2: u8, le: Option<u8>) -> Self {
        Self {
            cla: Self::CLA,
            ins,
            p1,
            p2,
            data: Bytes::new(),
            le,
        }
    }
    
    /// Create a command carrying data
    ///
    /// # Errors
    ///
    /// Returns [`Error::PayloadTooLarge`] if `data` does not fit the Lc byte.
    pub fn with_data(ins: u8, p1: u8, p2: u8, data: impl Into<Bytes>) -> Result<Self> {
        let data = data.into();
        
        if data.len() > Self::MAX_DATA_SIZE {
            return Err(Error::PayloadTooLarge {
                size: data.len(),
                max: Self::MAX_DATA_SIZE,
            });
        }
        
        Ok(Self {
            cla: Self::CLA,
            ins,
            p1,
            p2,
            data,
            le: None,
        })
    }
    
    /// Read the card UID
    pub fn get_uid() -> Self {
        Self::new(Self::INS_GET_DATA, 0x00, 0x00, Some(0x00))
    }
    
    /// Load a 6-byte key into a volatile reader key slot
    pub fn load_key(slot: u8, key: [u8; 6]) -> Self {
        Self {
            cla: Self::CLA,
            ins: Self::INS_LOAD_KEY,
            p1: 0x00,
            p2: slot,
            data: Bytes::copy_from_slice(&key),
            le: None,
        }
    }
    
    /// Authenticate a block with a previously loaded key
    pub fn authenticate(block: u8, key: AuthKey) -> Self {
        Self {
            cla: Self::CLA,
            ins: Self::INS_AUTHENTICATE,
            p1: 0x00,
            p2: 0x00,
            data: Bytes::copy_from_slice(&[0x01, 0x00, block, key.key_type, key.key_index]),
            le: None,
        }
    }
    
    /// Read `len` bytes from a block
    pub fn read_binary(block: u8, len: u8) -> Self {
        Self::new(Self::INS_READ_BINARY, 0x00, block, Some(len))
    }
    
    /// Write data into a block
    pub fn update_binary(block: u8, data: &[u8]) -> Result<Self> {
        Self::with_data(Self::INS_UPDATE_BINARY, 0x00, block, Bytes::copy_from_slice(data))
    }
    
    /// Encode to wire bytes
    ///
    /// # Examples
    ///
    /// ```
    /// use mifare_core::Apdu;
    ///
    /// assert_eq!(&Apdu::read_binary(4, 16).encode()[..], &[0xFF, 0xB0, 0x00, 0x04, 0x10]);
    /// ```
    pub fn encode(&self) -> BytesMut {
        let mut buf = BytesMut::with_capacity(self.size());
        
        buf.put_u8(self.cla);
        buf.put_u8(self.ins);
        buf.put_u8(self.p1);
        buf.put_u8(self.p2);
        
        if !self.data.is_empty() {
            buf.put_u8(self.data.len() as u8);
            buf.put_slice(&self.data);
        }
        
        if let Some(le) = self.le {
            buf.put_u8(le);
        }
        
        buf
    }
    
    /// Encoded size in bytes
    pub fn size(&self) -> usize {
        let lc = if self.data.is_empty() { 0 } else { 1 + self.data.len() };
        4 + lc + usize::from(self.le.is_some())
    }
}

impl fmt::Debug for Apdu {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // key material stays out of logs
        let data = if self.ins == Self::INS_LOAD_KEY {
            "<redacted>".to_string()
        } else {
            hex::encode_upper(&self.data)
        };
        
        f.debug_struct("Apdu")
            .field("ins", &format!("0x{:02X}", self.ins))
            .field("p1", &format!("0x{:02X}", self.p1))
            .field("p2", &format!("0x{:02X}", self.p2))
            .field("data", &data)
            .field("le", &self.le)
            .finish()
    }
}

/// Response APDU
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    pub data: Bytes,
    pub sw1: u8,
    pub sw2: u8,
}

impl Response {
    /// Split raw response bytes into data and status word
    ///
    /// # Errors
    ///
    /// Returns [`Error::ResponseTooShort`] if fewer than 2 bytes were received.
    pub fn decode(raw: &[u8]) -> Result<Self> {
        if raw.len() < 2 {
            return Err(Error::ResponseTooShort { actual: raw.len() });
        }
        
        let (data, status) = raw.split_at(raw.len() - 2);
        let response = Self {
            data: Bytes::copy_from_slice(data),
            sw1: status[0],
            sw2: status[1],
        };
        
        trace!(
            data_len = response.data.len(),
            sw = format!("{:02X} {:02X}", response.sw1, response.sw2),
            "Decoded response"
        );
        
        Ok(response)
    }
    
    /// Check for `90 00`
    pub fn is_success(&self) -> bool {
        (self.sw1, self.sw2) == sw::OK
    }
    
    /// Data on success, status word error otherwise
    pub fn into_result(self) -> Result<Bytes> {
        if self.is_success() {
            Ok(self.data)
        } else {
            Err(Error::StatusWord {
                sw1: self.sw1,
                sw2: self.sw2,
            })
        }
    }
}

impl fmt::Display for Response {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SW {:02X} {:02X} ({} data bytes)", self.sw1, self.sw2, self.data.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::{DEFAULT_AUTH_KEY, FACTORY_KEY};
    use pretty_assertions::assert_eq;
    
    #[test]
    fn test_get_uid() {
        assert_eq!(&Apdu::get_uid().encode()[..], &[0xFF, 0xCA, 0x00, 0x00, 0x00]);
    }
    
    #[test]
    fn test_load_key() {
        let apdu = Apdu::load_key(0, FACTORY_KEY);
        assert_eq!(
            &apdu.encode()[..],
            &[0xFF, 0x82, 0x00, 0x00, 0x06, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF]
        );
        assert!(format!("{:?}", apdu).contains("<redacted>"));
    }
    
    #[test]
    fn test_authenticate() {
        let apdu = Apdu::authenticate(4, DEFAULT_AUTH_KEY);
        assert_eq!(
            &apdu.encode()[..],
            &[0xFF, 0x86, 0x00, 0x00, 0x05, 0x01, 0x00, 0x04, 0x60, 0x00]
        );
    }
    
    #[test]
    fn test_update_binary() {
        let apdu = Apdu::update_binary(8, &[0xAB; 16]).unwrap();
        let encoded = apdu.encode();
        
        assert_eq!(&encoded[..5], &[0xFF, 0xD6, 0x00, 0x08, 0x10]);
        assert_eq!(encoded.len(), 21);
        assert_eq!(apdu.size(), 21);
    }
    
    #[test]
    fn test_payload_too_large() {
        let result = Apdu::update_binary(1, &[0; 256]);
        assert!(matches!(result, Err(Error::PayloadTooLarge { size: 256, max: 255 })));
    }
    
    #[test]
    fn test_response_success() {
        let response = Response::decode(&[0x04, 0xA1, 0x90, 0x00]).unwrap();
        assert!(response.is_success());
        assert_eq!(response.into_result().unwrap().as_ref(), &[0x04, 0xA1]);
    }
    
    #[test]
    fn test_response_failure() {
        let err = Response::decode(&[0x63, 0x00]).unwrap().into_result().unwrap_err();
        assert!(err.is_auth_failure());
    }
    
    #[test]
    fn test_response_too_short() {
        assert!(matches!(Response::decode(&[0x90]), Err(Error::ResponseTooShort { actual: 1 })));
    }
}
