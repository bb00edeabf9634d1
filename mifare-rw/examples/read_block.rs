//! Read one block
//!
//!     cargo run --example read_block -- <block> [hex|normal|stretched]
//!
//! Without a format the block is shown the way the console shows it (dense
//! text). Set `MIFARE_READER` to pick a reader by name fragment.

use std::sync::Arc;

use anyhow::Context;
use mifare_rw::presentation::{channel, DisplayState};
use mifare_rw::{BlockAddress, Config, Console, PcscCardIo};

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    let mut args = std::env::args().skip(1);
    let block: BlockAddress = args
        .next()
        .context("usage: read_block <block> [format]")?
        .parse()?;
    let format = args.next();

    let mut io = PcscCardIo::new()?;
    if let Ok(filter) = std::env::var("MIFARE_READER") {
        io = io.with_reader_filter(filter);
    }

    let (marshal, mut presenter) = channel(DisplayState::new());
    let console = Console::new(Arc::new(io), marshal, Config::default());
    console.refresh_status();

    let text = match format {
        Some(format) => console.read_block_named(block.get(), &format)?,
        None => console.read_block_as_text(block.get()),
    };

    presenter.pump();
    presenter.with_sink(|display| println!("{}\n", display));
    println!("Block {}: {:?}", block, text);

    Ok(())
}
