// ============================================================
// Layer 6 — Per-fold Logging
// ============================================================
// Each fold gets its own tracing Dispatch with two sinks:
//
//   console  stderr            DEBUG and above
//   file     {run_dir}/log.txt INFO and above
//
// Both use the same line layout:
//
//   [<timestamp>] <fold>:<LEVEL>: <message>
//
// The dispatch is installed with tracing::dispatcher::with_default
// around the fold's work, so every tracing macro inside the fold
// lands in that fold's log without any global state.

use anyhow::{Context, Result};
use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use std::{
    fmt::{self, Write as _},
    fs::{File, OpenOptions},
    path::Path,
    sync::Mutex,
};
use tracing::{Dispatch, Event, Subscriber};
use tracing_subscriber::{
    filter::LevelFilter,
    fmt::{
        format::Writer,
        time::{FormatTime, SystemTime},
        FmtContext, FormatEvent, FormatFields,
    },
    layer::SubscriberExt,
    registry::LookupSpan,
    Layer,
};

/// What to do with an existing log.txt when a fold starts again.
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogMode {
    #[default]
    Append,
    Truncate,
}

/// `[<timestamp>] <fold>:<LEVEL>: <message>`
#[derive(Debug, Clone, Copy)]
pub struct FoldFormat {
    fold: usize,
}

impl FoldFormat {
    pub fn new(fold: usize) -> Self {
        Self { fold }
    }
}

impl<S, N> FormatEvent<S, N> for FoldFormat
where
    S: Subscriber + for<'a> LookupSpan<'a>,
    N: for<'a> FormatFields<'a> + 'static,
{
    fn format_event(
        &self,
        ctx:        &FmtContext<'_, S, N>,
        mut writer: Writer<'_>,
        event:      &Event<'_>,
    ) -> fmt::Result {
        write!(writer, "[")?;
        SystemTime.format_time(&mut writer)?;
        write!(writer, "] {}:{}: ", self.fold, event.metadata().level())?;
        ctx.field_format().format_fields(writer.by_ref(), event)?;
        writeln!(writer)
    }
}

fn open_log(path: &Path, mode: LogMode) -> Result<File> {
    let mut opts = OpenOptions::new();
    opts.create(true);
    match mode {
        LogMode::Append   => opts.append(true),
        LogMode::Truncate => opts.write(true).truncate(true),
    };
    opts.open(path)
        .with_context(|| format!("Cannot open log file '{}'", path.display()))
}

/// Build the logger for one fold, writing its file sink to `log_path`.
pub fn fold_dispatch(log_path: &Path, fold: usize, mode: LogMode) -> Result<Dispatch> {
    let file = open_log(log_path, mode)?;

    let console = tracing_subscriber::fmt::layer()
        .event_format(FoldFormat::new(fold))
        .with_writer(std::io::stderr)
        .with_filter(LevelFilter::DEBUG);

    let file_sink = tracing_subscriber::fmt::layer()
        .event_format(FoldFormat::new(fold))
        .with_ansi(false)
        .with_writer(Mutex::new(file))
        .with_filter(LevelFilter::INFO);

    let subscriber = tracing_subscriber::registry()
        .with(console)
        .with(file_sink);

    Ok(Dispatch::new(subscriber))
}
