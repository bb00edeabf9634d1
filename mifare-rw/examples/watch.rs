//! Watch reader and card presence
//!
//!     cargo run --example watch -- [seconds]
//!
//! Presence notifications arrive on the driver's monitor thread; the main
//! thread owns the display and redraws it whenever updates arrive. Set
//! `MIFARE_SIMULATE=1` to run against an in-memory card that is presented
//! and removed every two seconds.

use std::sync::Arc;
use std::time::Duration;

use mifare_rw::presentation::{channel, DisplayState, Field, PresentationSink};
use mifare_rw::{CardIo, Config, Console, MemoryCardIo, PcscCardIo, StatusColor};

/// Prints every change as it is applied
struct PrintingSink(DisplayState);

impl PresentationSink for PrintingSink {
    fn set_text(&mut self, field: Field, text: &str) {
        if self.0.text(field) != Some(text) {
            println!("{:>10}: {}", field, text);
        }
        self.0.set_text(field, text);
    }

    fn set_color(&mut self, color: StatusColor) {
        if self.0.color() != Some(color) {
            println!("{:>10}: {}", "Indicator", color);
        }
        self.0.set_color(color);
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .init();

    let seconds: u64 = std::env::args()
        .nth(1)
        .and_then(|s| s.parse().ok())
        .unwrap_or(30);

    let simulated = std::env::var("MIFARE_SIMULATE").is_ok_and(|v| v == "1");
    let memory = Arc::new(MemoryCardIo::new());
    let io: Arc<dyn CardIo> = if simulated {
        memory.clone() as Arc<dyn CardIo>
    } else {
        Arc::new(PcscCardIo::new()?)
    };

    let (marshal, mut presenter) = channel(PrintingSink(DisplayState::new()));
    let console = Console::new(io, marshal, Config::default());
    console.initialize();

    if simulated {
        std::thread::spawn(move || {
            let uid = [0x04, 0xA2, 0x3B, 0x91];
            loop {
                std::thread::sleep(Duration::from_secs(2));
                memory.insert_card(&uid);
                std::thread::sleep(Duration::from_secs(2));
                memory.remove_card();
            }
        });
    }

    println!("Watching for {} seconds...", seconds);
    presenter
        .run_until(tokio::time::sleep(Duration::from_secs(seconds)))
        .await;

    Ok(())
}
