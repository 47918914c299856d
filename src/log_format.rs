//! Log line format: `<timestamp> [<level>]  <message>`, duplicated to
//! stdout and an append-mode log file.

use std::fmt;
use std::fs::OpenOptions;
use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::Utc;
use tracing::{Event, Subscriber};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt::FmtContext;
use tracing_subscriber::fmt::format::{self, FormatEvent, FormatFields};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::registry::LookupSpan;
use tracing_subscriber::util::SubscriberInitExt;

/// Event formatter producing `<timestamp> [<level>]  <message>` lines.
///
/// The level is left-padded to five columns so messages line up across
/// levels. No ANSI colors; the same format goes to the log file.
pub struct BracketedFormat;

impl<S, N> FormatEvent<S, N> for BracketedFormat
where
    S: Subscriber + for<'a> LookupSpan<'a>,
    N: for<'a> FormatFields<'a> + 'static,
{
    fn format_event(
        &self,
        ctx: &FmtContext<'_, S, N>,
        mut writer: format::Writer<'_>,
        event: &Event<'_>,
    ) -> fmt::Result {
        write!(
            writer,
            "{} [{:<5}]  ",
            Utc::now().format("%Y-%m-%dT%H:%M:%S%.3fZ"),
            event.metadata().level()
        )?;

        ctx.field_format().format_fields(writer.by_ref(), event)?;

        writeln!(writer)
    }
}

/// Install the global subscriber: one layer to stdout, one to the log
/// file, both using [`BracketedFormat`].
///
/// Defaults to DEBUG for this crate and INFO for dependencies; `RUST_LOG`
/// overrides.
pub fn init_logging(log_file: &Path) -> Result<()> {
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(log_file)
        .with_context(|| format!("open log file {}", log_file.display()))?;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,mapshare_relay=debug"));

    tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .event_format(BracketedFormat)
                .with_writer(std::io::stdout),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .event_format(BracketedFormat)
                .with_writer(Arc::new(file)),
        )
        .try_init()
        .context("install tracing subscriber")?;

    Ok(())
}
