use crate::{Error, LogQueryLogger, Result, take_param};
use log::Level;
use std::{str::FromStr, thread};

/// Settings of a dispatcher, read by the drivers when connecting.
///
/// | URL parameter | Environment      | Default                    |
/// |---------------|------------------|----------------------------|
/// | `workers`     | `KEEL_WORKERS`   | available parallelism      |
/// | `log_binds`   | `KEEL_LOG_BINDS` | `true` in debug builds     |
/// | `log_level`   | `KEEL_LOG_LEVEL` | `debug`                    |
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DispatchConfig {
    /// Maximum number of statements running at the same time on blocking stores.
    pub workers: usize,
    pub log_bind_values: bool,
    pub log_level: Level,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            workers: thread::available_parallelism()
                .map(usize::from)
                .unwrap_or(4),
            log_bind_values: cfg!(debug_assertions),
            log_level: Level::Debug,
        }
    }
}

impl DispatchConfig {
    /// Read and remove the dispatcher parameters from the URL query pairs.
    pub fn take_from(pairs: &mut Vec<(String, String)>) -> Result<Self> {
        let mut result = Self::default();
        if let Some(workers) = take_param(pairs, "workers", "KEEL_WORKERS") {
            result.workers = match workers.trim().parse::<usize>() {
                Ok(v) if v > 0 => v,
                _ => {
                    let error = Error::Config(
                        format!("`workers` must be a positive integer, found `{workers}`").into(),
                    );
                    log::error!("{:#}", error);
                    return Err(error);
                }
            };
        }
        if let Some(binds) = take_param(pairs, "log_binds", "KEEL_LOG_BINDS") {
            result.log_bind_values = match binds.trim().to_ascii_lowercase().as_str() {
                "1" | "true" | "yes" | "on" => true,
                "0" | "false" | "no" | "off" => false,
                _ => {
                    let error = Error::Config(
                        format!("`log_binds` must be a boolean, found `{binds}`").into(),
                    );
                    log::error!("{:#}", error);
                    return Err(error);
                }
            };
        }
        if let Some(level) = take_param(pairs, "log_level", "KEEL_LOG_LEVEL") {
            result.log_level = Level::from_str(level.trim()).map_err(|_| {
                let error =
                    Error::Config(format!("`log_level` is not a log level: `{level}`").into());
                log::error!("{:#}", error);
                error
            })?;
        }
        Ok(result)
    }

    pub fn logger(&self) -> LogQueryLogger {
        LogQueryLogger {
            level: self.log_level,
            bind_values: self.log_bind_values,
        }
    }
}
