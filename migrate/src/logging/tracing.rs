use std::path::PathBuf;
use std::sync::atomic::{AtomicU8, Ordering};

use clap::ValueEnum;
use tracing::{Level, Metadata, Subscriber};
use tracing_subscriber::layer::{Context, SubscriberExt};
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{Layer, Registry};

use super::lazy_file_writer::LazyFileWriter;

const TRACE_FILE_NAME: &str = "studio_migrate_trace.log";

/// Third-party targets that only add HTTP connection noise
const SUPPRESSED_TARGETS: &[&str] = &["reqwest::", "hyper", "h2::", "rustls::", "want::", "sqlx::"];

static CURRENT_LEVEL: AtomicU8 = AtomicU8::new(TracingLevel::Warn.as_u8());

/// Level filter read on every event
#[derive(Clone)]
struct LevelFilter;

impl<S: Subscriber> Layer<S> for LevelFilter {
    fn enabled(&self, metadata: &Metadata<'_>, _ctx: Context<'_, S>) -> bool {
        let target = metadata.target();
        if SUPPRESSED_TARGETS.iter().any(|prefix| target.starts_with(prefix)) {
            return false;
        }
        TracingLevel::from_level(*metadata.level()).as_u8() <= CURRENT_LEVEL.load(Ordering::Relaxed)
    }
}

/// Verbosity of the trace log
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum TracingLevel {
    Error,
    #[default]
    Warn,
    Info,
    Debug,
    Trace,
}

impl TracingLevel {
    const fn as_u8(self) -> u8 {
        match self {
            Self::Error => 0,
            Self::Warn => 1,
            Self::Info => 2,
            Self::Debug => 3,
            Self::Trace => 4,
        }
    }

    const fn from_level(level: Level) -> Self {
        match level {
            Level::ERROR => Self::Error,
            Level::WARN => Self::Warn,
            Level::INFO => Self::Info,
            Level::DEBUG => Self::Debug,
            Level::TRACE => Self::Trace,
        }
    }

    /// Install the file subscriber at this level
    ///
    /// The file is only created once something is logged.
    pub fn init_file_tracing(self) {
        CURRENT_LEVEL.store(self.as_u8(), Ordering::Relaxed);

        let file_layer = tracing_subscriber::fmt::layer()
            .with_writer(LazyFileWriter::new(Self::trace_log_path()))
            .with_ansi(false)
            .with_target(true)
            .with_file(true)
            .with_line_number(true);

        Registry::default().with(LevelFilter).with(file_layer).init();
    }

    /// Where the trace log is written
    pub fn trace_log_path() -> PathBuf {
        std::env::temp_dir().join(TRACE_FILE_NAME)
    }
}
