use std::io::Write;

use chrono::Local;
use log::{LevelFilter, Record, SetLoggerError};
use serde::Serialize;

const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.3f";

/// A log record as forwarded to the web view.
#[derive(Debug, Serialize, Clone)]
pub struct LogMessage {
    level: String,
    message: String,
    timestamp: String,
}

impl LogMessage {
    pub fn from_record(record: &Record) -> Self {
        Self {
            level: record.level().to_string(),
            message: record.args().to_string(),
            timestamp: Local::now().to_rfc3339(),
        }
    }
}

/// Installs the stderr logger. `RUST_LOG` overrides `level`.
pub fn init(level: LevelFilter) -> Result<(), SetLoggerError> {
    env_logger::Builder::new()
        .filter_level(level)
        .parse_default_env()
        .format(|buf, record| {
            writeln!(
                buf,
                "{} [{}] {}: {}",
                Local::now().format(TIMESTAMP_FORMAT),
                record.level(),
                record.target(),
                record.args()
            )
        })
        .try_init()
}

#[cfg(feature = "tauri")]
pub use tauri_logger::TauriLogger;

#[cfg(feature = "tauri")]
mod tauri_logger {
    use log::{Level, Metadata, Record, SetLoggerError};
    use tauri::{AppHandle, Emitter, Runtime};

    use super::{LogMessage, TIMESTAMP_FORMAT};

    /// Mirrors records to stderr and emits them to the web view as `log-message`.
    pub struct TauriLogger<R: Runtime> {
        app_handle: AppHandle<R>,
        level: Level,
    }

    impl<R: Runtime> TauriLogger<R> {
        pub fn new(app_handle: AppHandle<R>, level: Level) -> Self {
            Self { app_handle, level }
        }

        /// Installs the logger process-wide. The `bluetooth` plugin calls this
        /// during setup; it fails when the host already installed a logger.
        pub fn init(app_handle: AppHandle<R>, level: Level) -> Result<(), SetLoggerError> {
            let logger: &'static TauriLogger<R> =
                Box::leak(Box::new(TauriLogger::new(app_handle, level)));
            log::set_logger(logger).map(|()| log::set_max_level(level.to_level_filter()))
        }

        fn emit_log(&self, record: &Record) {
            if let Err(e) = self
                .app_handle
                .emit("log-message", LogMessage::from_record(record))
            {
                eprintln!("Failed to emit log message: {}", e);
            }
        }
    }

    impl<R: Runtime> log::Log for TauriLogger<R> {
        fn enabled(&self, metadata: &Metadata) -> bool {
            metadata.level() <= self.level
        }

        fn log(&self, record: &Record) {
            if self.enabled(record.metadata()) {
                eprintln!(
                    "{} [{}] {}",
                    chrono::Local::now().format(TIMESTAMP_FORMAT),
                    record.level(),
                    record.args()
                );
                self.emit_log(record);
            }
        }

        fn flush(&self) {}
    }
}
