use std::path::Path;

use anyhow::Result;
use flexi_logger::{Cleanup, Criterion, Duplicate, FileSpec, Logger, LoggerHandle, Naming, WriteMode};

const LOG_FILE_BASENAME: &str = "combat_meter";
const LOG_FILE_SIZE: u64 = 10 * 1024 * 1024;
const LOG_FILES_KEPT: usize = 3;

/// Starts file logging in `directory`. `RUST_LOG` overrides the default `info` spec.
/// The handle must be kept alive for as long as logs should be written.
pub fn init_logger(directory: &Path) -> Result<LoggerHandle> {
    let handle = Logger::try_with_env_or_str("info")?
        .log_to_file(
            FileSpec::default()
                .directory(directory)
                .basename(LOG_FILE_BASENAME),
        )
        .write_mode(WriteMode::BufferAndFlush)
        .duplicate_to_stderr(Duplicate::Warn)
        .rotate(
            Criterion::Size(LOG_FILE_SIZE),
            Naming::Timestamps,
            Cleanup::KeepLogFiles(LOG_FILES_KEPT),
        )
        .start()?;

    Ok(handle)
}
