//! Plain-text event format with span correlation: each line inside a span carries the
//! root span id (`trace_id`), the current span id and the current span's name, so the
//! lines of concurrent device investigations can be told apart in one log file.

use std::fmt;

use tracing_core::Subscriber;
use tracing_subscriber::fmt::format::{FormatEvent, FormatFields, Writer};
use tracing_subscriber::fmt::time::{FormatTime, SystemTime};
use tracing_subscriber::fmt::FmtContext;
use tracing_subscriber::registry::LookupSpan;

/// `TIMESTAMP [trace_id=X span_id=Y span=NAME] LEVEL: target: fields`
///
/// The bracketed part is only written when the event has a parent span.
pub struct TextWithSpanIds {
    timer: SystemTime,
    with_level: bool,
    with_target: bool,
    with_span_name: bool,
}

impl Default for TextWithSpanIds {
    fn default() -> Self {
        Self {
            timer: SystemTime,
            with_level: true,
            with_target: true,
            with_span_name: true,
        }
    }
}

impl TextWithSpanIds {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_level(mut self, on: bool) -> Self {
        self.with_level = on;
        self
    }

    pub fn with_target(mut self, on: bool) -> Self {
        self.with_target = on;
        self
    }

    pub fn with_span_name(mut self, on: bool) -> Self {
        self.with_span_name = on;
        self
    }
}

impl<S, N> FormatEvent<S, N> for TextWithSpanIds
where
    S: Subscriber + for<'a> LookupSpan<'a>,
    N: for<'a> FormatFields<'a> + 'static,
{
    fn format_event(
        &self,
        ctx: &FmtContext<'_, S, N>,
        mut writer: Writer<'_>,
        event: &tracing_core::Event<'_>,
    ) -> fmt::Result {
        self.timer.format_time(&mut writer)?;
        if let Some(span) = ctx.parent_span() {
            let span_id = span.id().into_u64();
            let trace_id = span
                .scope()
                .from_root()
                .next()
                .map(|root| root.id().into_u64())
                .unwrap_or(span_id);
            write!(writer, " trace_id={} span_id={}", trace_id, span_id)?;
            if self.with_span_name {
                write!(writer, " span={}", span.name())?;
            }
        }

        if self.with_level {
            write!(writer, " {}:", event.metadata().level())?;
        }
        if self.with_target {
            write!(writer, " {}:", event.metadata().target())?;
        }
        write!(writer, " ")?;

        ctx.field_format().format_fields(writer.by_ref(), event)?;
        writeln!(writer)
    }
}
