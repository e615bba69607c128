use crate::Query;
use log::Level;

/// Receives every statement right before it reaches the store.
///
/// A failing logger never affects the query outcome.
pub trait QueryLogger: Send + Sync {
    fn log_query(&self, query: &Query) -> anyhow::Result<()>;
}

/// Writes statements through the `log` facade, target `keel::query`.
#[derive(Debug, Clone)]
pub struct LogQueryLogger {
    pub level: Level,
    /// Also write the parameters, they can contain sensitive data.
    pub bind_values: bool,
}

impl Default for LogQueryLogger {
    fn default() -> Self {
        Self {
            level: Level::Debug,
            bind_values: cfg!(debug_assertions),
        }
    }
}

impl QueryLogger for LogQueryLogger {
    fn log_query(&self, query: &Query) -> anyhow::Result<()> {
        if !log::log_enabled!(target: "keel::query", self.level) {
            return Ok(());
        }
        if self.bind_values && !query.params.is_empty() {
            log::log!(target: "keel::query", self.level, "{} {:?}", query, query.params);
        } else {
            log::log!(target: "keel::query", self.level, "{}", query);
        }
        Ok(())
    }
}

/// Discards everything.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopQueryLogger;

impl QueryLogger for NoopQueryLogger {
    fn log_query(&self, _query: &Query) -> anyhow::Result<()> {
        Ok(())
    }
}
