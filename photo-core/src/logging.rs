use std::{
    fs,
    sync::OnceLock,
    sync::atomic::{AtomicUsize, Ordering},
};

use anyhow::{Context, Result};
use tracing::Metadata;
use tracing_appender::{
    non_blocking::WorkerGuard,
    rolling::{RollingFileAppender, daily},
};
use tracing_subscriber::{
    EnvFilter,
    fmt::{
        self, FmtContext,
        format::{FormatEvent, FormatFields, Writer},
    },
    prelude::*,
};

use crate::config::LoggingConfig;

pub struct Logger;

impl Logger {
    /// Call **once** near the start of `main`. Keep the returned guard alive
    /// for the whole process or buffered lines are lost on exit.
    pub fn init(config: &LoggingConfig) -> Result<WorkerGuard> {
        fs::create_dir_all(&config.log_dir).with_context(|| {
            format!("cannot create log dir {}", config.log_dir.display())
        })?;

        SEQ.get_or_init(|| AtomicUsize::new(1));

        // daily rolling file appender → <log_dir>/photo-drive.YYYY-MM-DD
        let file: RollingFileAppender = daily(&config.log_dir, "photo-drive");
        let (file_writer, guard) = tracing_appender::non_blocking(file);

        let file_layer = fmt::layer()
            .event_format(SeqFileMod)
            .with_writer(file_writer)
            .with_ansi(false)
            .with_filter(Self::filter(&config.level)?);

        // optional stderr layer for live debugging
        let stderr_layer = config.stderr.then(|| {
            fmt::layer()
                .event_format(SeqFileMod)
                .with_writer(std::io::stderr)
                .with_ansi(true)
        });
        let stderr_filter = Self::filter(&config.level)?;

        tracing_subscriber::registry()
            .with(file_layer)
            .with(stderr_layer.with_filter(stderr_filter))
            .try_init()
            .context("tracing subscriber already installed")?;

        Ok(guard)
    }

    fn filter(default_level: &str) -> Result<EnvFilter> {
        let directive = default_level
            .parse()
            .with_context(|| format!("invalid log level '{default_level}'"))?;
        Ok(EnvFilter::from_default_env().add_directive(directive))
    }
}

static SEQ: OnceLock<AtomicUsize> = OnceLock::new();

/// Custom formatter: `[SEQ] LEVEL [file:line mod::path] message`
struct SeqFileMod;

impl<S, N> FormatEvent<S, N> for SeqFileMod
where
    S: tracing::Subscriber + for<'lookup> tracing_subscriber::registry::LookupSpan<'lookup>,
    N: for<'a> FormatFields<'a> + 'static,
{
    fn format_event(
        &self,
        ctx: &FmtContext<'_, S, N>,
        mut w: Writer<'_>,
        ev: &tracing::Event<'_>,
    ) -> std::fmt::Result {
        // monotonically-increasing sequence number
        let seq: usize = SEQ
            .get_or_init(|| AtomicUsize::new(1))
            .fetch_add(1, Ordering::Relaxed);

        let meta: &'static Metadata<'static> = ev.metadata();
        write!(
            w,
            "{seq:06} {:5} [{}:{} {}] ",
            meta.level(),
            meta.file().unwrap_or("??"),
            meta.line().unwrap_or(0),
            meta.module_path().unwrap_or("???"),
        )?;

        // write all key-value pairs for this event (message plus fields)
        ctx.field_format().format_fields(w.by_ref(), ev)?;
        writeln!(w)
    }
}
