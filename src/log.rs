//! Process wide logger with a global on/off switch.

use log::{LevelFilter, Log, Metadata, Record};
use std::sync::atomic::{AtomicBool, Ordering};

static ENABLED: AtomicBool = AtomicBool::new(true);

#[inline(always)]
pub fn is_enabled() -> bool {
    ENABLED.load(Ordering::SeqCst)
}

/// Mute all log output, used while the terminal is owned by an interactive prompt.
pub fn disable() {
    ENABLED.store(false, Ordering::SeqCst)
}

pub fn enable() {
    ENABLED.store(true, Ordering::SeqCst)
}

/// `env_logger` based logger that respects the global switch.
pub struct SwitchLogger {
    inner: env_logger::Logger,
}

impl SwitchLogger {
    /// Create logger, `RUST_LOG` takes precedence over `default_level`.
    pub fn new(default_level: LevelFilter) -> Self {
        let inner = env_logger::Builder::new()
            .filter_level(default_level)
            .parse_default_env()
            .build();
        Self { inner }
    }

    pub fn filter(&self) -> LevelFilter {
        self.inner.filter()
    }
}

impl Log for SwitchLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        is_enabled() && self.inner.enabled(metadata)
    }

    fn log(&self, record: &Record) {
        if is_enabled() {
            self.inner.log(record)
        }
    }

    fn flush(&self) {
        self.inner.flush()
    }
}

/// Install [`SwitchLogger`] as a global logger. Return error if logger already installed.
pub fn init(default_level: LevelFilter) -> Result<(), log::SetLoggerError> {
    let logger = SwitchLogger::new(default_level);
    let filter = logger.filter();
    log::set_boxed_logger(Box::new(logger))?;
    log::set_max_level(filter);
    Ok(())
}
