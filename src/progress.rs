//! Progress bars that share the terminal with log output
//!
//! All bars are registered with one [`MultiProgress`]; [`LogWriter`] is the
//! `env_logger` target that prints log lines above the active bars instead
//! of through them.

use indicatif::{MultiProgress, ProgressBar, ProgressStyle};
use std::io::{self, Write};
use std::sync::OnceLock;

static BARS: OnceLock<MultiProgress> = OnceLock::new();

pub fn bars() -> &'static MultiProgress {
    BARS.get_or_init(MultiProgress::new)
}

/// Counting bar for link units
pub fn unit_bar(total: u64, label: &str) -> ProgressBar {
    let style = ProgressStyle::with_template(
        "{prefix:>8} [{elapsed_precise}] {wide_bar} {pos}/{len} ({per_sec}) {msg}",
    )
    .unwrap_or_else(|_| ProgressStyle::default_bar());
    let bar = bars().add(ProgressBar::new(total));
    bar.set_style(style);
    bar.set_prefix(label.to_string());
    bar
}

/// Byte bar for archive downloads; `total` is unknown when the server omits Content-Length
pub fn byte_bar(total: Option<u64>, label: &str) -> ProgressBar {
    let bar = match total {
        Some(len) => {
            let style = ProgressStyle::with_template(
                "{prefix:>8} [{elapsed_precise}] {wide_bar} {bytes}/{total_bytes} ({bytes_per_sec}, {eta})",
            )
            .unwrap_or_else(|_| ProgressStyle::default_bar());
            ProgressBar::new(len).with_style(style)
        }
        None => {
            let style = ProgressStyle::with_template("{prefix:>8} {spinner} {bytes} ({bytes_per_sec})")
                .unwrap_or_else(|_| ProgressStyle::default_spinner());
            ProgressBar::new_spinner().with_style(style)
        }
    };
    let bar = bars().add(bar);
    bar.set_prefix(label.to_string());
    bar
}

/// `Write` adapter for the logger: suspends the bars while a line is written to stderr
pub struct LogWriter;

impl Write for LogWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        bars().suspend(|| io::stderr().write_all(buf))?;
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        io::stderr().flush()
    }
}
