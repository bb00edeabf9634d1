//! Write text to one block
//!
//!     cargo run --example write_block -- <block> <text>
//!
//! The text is trimmed, then padded with NUL bytes (or truncated) to 16
//! bytes. Set `MIFARE_READER` to pick a reader by name fragment.

use std::sync::Arc;

use anyhow::Context;
use mifare_rw::presentation::{channel, DisplayState};
use mifare_rw::{BlockAddress, Config, Console, PcscCardIo};

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::DEBUG)
        .init();

    let mut args = std::env::args().skip(1);
    let block: BlockAddress = args
        .next()
        .context("usage: write_block <block> <text>")?
        .parse()?;
    let text = args.collect::<Vec<_>>().join(" ");

    let mut io = PcscCardIo::new()?;
    if let Ok(filter) = std::env::var("MIFARE_READER") {
        io = io.with_reader_filter(filter);
    }

    let (marshal, _presenter) = channel(DisplayState::new());
    let console = Console::new(Arc::new(io), marshal, Config::default());

    if console.write_block_from_text(text.trim(), block.get()) {
        println!("Ok");
        println!("Block {} now reads {:?}", block, console.read_block_as_text(block.get()));
    } else {
        println!("Error");
    }

    Ok(())
}
