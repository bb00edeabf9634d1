//! Hardware-dependent integration tests
//!
//! These tests require an ACR122U-class reader and a MIFARE Classic card
//! with factory keys. They are ignored by default:
//!
//!     cargo test --package mifare-reader --test hardware_integration -- --ignored
//!
//! Set `MIFARE_READER` to pick a reader by name fragment.

use mifare_core::constants::DEFAULT_AUTH_KEY;
use mifare_reader::{CardIo, PcscCardIo};

fn reader() -> PcscCardIo {
    let io = PcscCardIo::new().expect("Failed to establish PC/SC context");
    match std::env::var("MIFARE_READER") {
        Ok(filter) => io.with_reader_filter(filter),
        Err(_) => io,
    }
}

/// **Requires**: card on the reader
#[test]
#[ignore = "requires hardware: card on reader"]
fn test_connect_and_uid() {
    let io = reader();
    
    assert!(io.connect_card().expect("connect failed"), "No card on the reader");
    
    let uid = io.card_uid().expect("UID failed");
    println!("UID: {}", uid);
    assert!(!uid.is_empty());
    assert!(io.status_text().starts_with("Connected to"));
}

/// **Requires**: MIFARE Classic card with factory keys
#[test]
#[ignore = "requires hardware: MIFARE Classic card"]
fn test_read_manufacturer_block() {
    let io = reader();
    assert!(io.connect_card().expect("connect failed"));
    
    let block = io
        .read_card_block(0, DEFAULT_AUTH_KEY.key_type, DEFAULT_AUTH_KEY.key_index)
        .expect("read failed");
    
    assert_eq!(block.len(), 16);
}

/// **Requires**: MIFARE Classic card with factory keys (overwrites block 4)
#[test]
#[ignore = "requires hardware: MIFARE Classic card, destructive"]
fn test_write_read_block() {
    let io = reader();
    assert!(io.connect_card().expect("connect failed"));
    
    let data = *b"mifare-rw test!\0";
    io.write_card_block(&data, 4, DEFAULT_AUTH_KEY.key_type, DEFAULT_AUTH_KEY.key_index)
        .expect("write failed");
    
    let read = io
        .read_card_block(4, DEFAULT_AUTH_KEY.key_type, DEFAULT_AUTH_KEY.key_index)
        .expect("read failed");
    assert_eq!(read.as_ref(), &data);
}

/// **Requires**: reader attached
#[test]
#[ignore = "requires hardware: card reader"]
fn test_presence_monitor_reports_initial_state() {
    let io = reader();
    let (tx, rx) = std::sync::mpsc::channel();
    
    let _handle = io
        .subscribe(Box::new(move |state| {
            let _ = tx.send(state);
        }))
        .expect("subscribe failed");
    
    let state = rx
        .recv_timeout(std::time::Duration::from_secs(5))
        .expect("no presence notification");
    println!("Initial state: {}", state);
}
