//! Logging initialization from [`LoggingSettings`].
//!
//! Logs go to stderr so stdout only carries the report (or JSON state), or to a
//! daily-rolled file when `SP_ONCALL_LOG_FILE` is set. `SP_ONCALL_STRUCTURED_LOGGING`
//! switches the text format for JSON lines.

use std::io::Write;
use std::sync::Mutex;

use config::logging::LoggingSettings;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{Layer, Registry};

use crate::log_format::TextWithSpanIds;

type BoxedLayer = Box<dyn Layer<Registry> + Send + Sync>;

/// Installs the global subscriber. `verbose` turns on debug mode unless `RUST_LOG` is set.
pub fn init(settings: &LoggingSettings, verbose: bool) -> Result<(), Box<dyn std::error::Error>> {
    let mut settings = settings.clone();
    settings.debug_mode |= verbose;
    let filter = settings.env_filter();

    let layer: BoxedLayer = match settings.rolling_appender() {
        Some(appender) => {
            let writer = Mutex::new(StripAnsiWriter::new(appender));
            if settings.structured {
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_writer(writer)
                    .with_ansi(false)
                    .boxed()
            } else {
                tracing_subscriber::fmt::layer()
                    .event_format(TextWithSpanIds::new())
                    .with_writer(writer)
                    .with_ansi(false)
                    .boxed()
            }
        }
        None if settings.structured => tracing_subscriber::fmt::layer()
            .json()
            .with_writer(std::io::stderr)
            .boxed(),
        None => tracing_subscriber::fmt::layer()
            .event_format(TextWithSpanIds::new())
            .with_writer(std::io::stderr)
            .boxed(),
    };

    tracing_subscriber::registry()
        .with(layer.with_filter(filter))
        .try_init()?;
    if let Some(path) = settings.log_file.as_ref() {
        tracing::info!(path = %path.display(), structured = settings.structured, "sp-oncall logging to file");
    }
    Ok(())
}

/// Strips ANSI escape sequences so file logs are plain text.
///
/// CSI sequences (`ESC [ params final`) are dropped; any other escape is passed through.
pub(crate) struct StripAnsiWriter<W> {
    inner: W,
    pending: Vec<u8>,
}

impl<W: Write> StripAnsiWriter<W> {
    pub(crate) fn new(inner: W) -> Self {
        Self {
            inner,
            pending: Vec::with_capacity(16),
        }
    }

    #[cfg(test)]
    fn into_inner(self) -> W {
        self.inner
    }
}

const ESC: u8 = 0x1b;
/// Longest CSI sequence buffered before giving up and writing it out.
const MAX_CSI_LEN: usize = 64;

impl<W: Write> Write for StripAnsiWriter<W> {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        let mut rest = buf;
        while !rest.is_empty() {
            if self.pending.is_empty() {
                match rest.iter().position(|&b| b == ESC) {
                    Some(i) => {
                        self.inner.write_all(&rest[..i])?;
                        self.pending.push(ESC);
                        rest = &rest[i + 1..];
                    }
                    None => {
                        self.inner.write_all(rest)?;
                        break;
                    }
                }
                continue;
            }

            let b = rest[0];
            rest = &rest[1..];
            if self.pending.len() == 1 {
                self.pending.push(b);
                if b != b'[' {
                    self.inner.write_all(&self.pending)?;
                    self.pending.clear();
                }
            } else if (0x40..=0x7e).contains(&b) {
                self.pending.clear();
            } else if b.is_ascii_digit() || matches!(b, b';' | b'?' | b':') {
                self.pending.push(b);
                if self.pending.len() > MAX_CSI_LEN {
                    self.inner.write_all(&self.pending)?;
                    self.pending.clear();
                }
            } else {
                self.pending.push(b);
                self.inner.write_all(&self.pending)?;
                self.pending.clear();
            }
        }
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        if !self.pending.is_empty() {
            self.inner.write_all(&self.pending)?;
            self.pending.clear();
        }
        self.inner.flush()
    }
}
