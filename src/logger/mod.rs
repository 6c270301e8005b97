use std::sync::atomic::{AtomicUsize, Ordering};

use lazy_static::lazy_static;
use slog::Drain;

pub use slog::Level;

static LOG_LEVEL: AtomicUsize = AtomicUsize::new(usize::MAX);

lazy_static! {
    static ref GLOBAL_LOG_GUARD: (slog_scope::GlobalLoggerGuard, Result<(), String>) = {
        let decorator = slog_term::TermDecorator::new().build();
        let drain = slog_term::FullFormat::new(decorator)
            .use_file_location()
            .build()
            .fuse();
        let drain = LevelFilter(drain).fuse();
        let drain = slog_async::Async::new(drain).build().fuse();
        let logger = slog::Logger::root(drain, slog::slog_o!());

        let scope_guard = slog_scope::set_global_logger(logger);
        let log_guard = slog_stdlog::init().map_err(|err| err.to_string());
        (scope_guard, log_guard)
    };
}

/// Installs the process-wide logger and routes the `log` macros into it.
/// Calling it more than once is harmless.
pub fn init() -> anyhow::Result<()> {
    if let Err(err) = &GLOBAL_LOG_GUARD.1 {
        anyhow::bail!("unable to bridge the log facade: {}", err);
    }
    Ok(())
}

pub fn get_log_level() -> Option<Level> {
    Level::from_usize(LOG_LEVEL.load(Ordering::Relaxed))
}

pub fn set_log_level(level: Level) {
    LOG_LEVEL.store(level.as_usize(), Ordering::SeqCst);
}

// Drops records less severe than the current log level; everything passes while unset.
struct LevelFilter<D>(D);

impl<D: Drain> Drain for LevelFilter<D> {
    type Ok = ();
    type Err = D::Err;

    fn log(
        &self,
        record: &slog::Record,
        values: &slog::OwnedKVList,
    ) -> Result<Self::Ok, Self::Err> {
        match get_log_level() {
            Some(level) if !record.level().is_at_least(level) => Ok(()),
            _ => self.0.log(record, values).map(|_| ()),
        }
    }
}
