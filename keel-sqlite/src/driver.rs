use crate::{SqliteSqlWriter, SqliteStore};
use keel_core::{
    DispatchConfig, Driver, Error, Result, ThreadOffload, Value, format_temporal, join_query,
    split_query,
};
use std::{borrow::Cow, future::Future, sync::Arc};

/// Sqlite statements run on the blocking pool, bounded by `workers`.
pub type SqliteConnection = ThreadOffload<SqliteStore>;

/// Parameter as handed to `sqlite3_bind_*`.
#[derive(Debug, Clone, PartialEq)]
pub enum SqliteBind {
    Null,
    Integer(i64),
    Real(f64),
    Text(String),
    Blob(Box<[u8]>),
}

#[derive(Debug, Default, Clone, Copy)]
pub struct SqliteDriver {
    writer: SqliteSqlWriter,
}

impl SqliteDriver {
    pub const fn new() -> Self {
        Self {
            writer: SqliteSqlWriter {},
        }
    }
}

impl Driver for SqliteDriver {
    type Connection = SqliteConnection;
    type SqlWriter = SqliteSqlWriter;
    type Bind = SqliteBind;

    const NAME: &'static str = "sqlite";

    fn sql_writer(&self) -> &SqliteSqlWriter {
        &self.writer
    }

    fn adapt(&self, value: &Value) -> Option<SqliteBind> {
        if value.is_null() {
            return Some(SqliteBind::Null);
        }
        Some(match value {
            Value::Boolean(Some(v)) => SqliteBind::Integer(*v as i64),
            Value::Int8(Some(v)) => SqliteBind::Integer(*v as i64),
            Value::Int16(Some(v)) => SqliteBind::Integer(*v as i64),
            Value::Int32(Some(v)) => SqliteBind::Integer(*v as i64),
            Value::Int64(Some(v)) => SqliteBind::Integer(*v),
            Value::Float32(Some(v)) => SqliteBind::Real(*v as f64),
            Value::Float64(Some(v)) => SqliteBind::Real(*v),
            Value::Varchar(Some(v)) | Value::Enum(Some(v)) => SqliteBind::Text(v.clone()),
            Value::Blob(Some(v)) => SqliteBind::Blob(v.clone()),
            Value::Uuid(Some(v)) => SqliteBind::Text(v.to_string()),
            Value::Json(Some(v)) => SqliteBind::Text(v.to_string()),
            Value::Date(..)
            | Value::Time(..)
            | Value::Timestamp(..)
            | Value::TimestampWithTimezone(..) => SqliteBind::Text(format_temporal(value)?),
            _ => return None,
        })
    }

    /// Accepts `sqlite://<path>[?params]`, `<path>` can be `:memory:`. The parameters not
    /// consumed by [`DispatchConfig`] are forwarded to sqlite as URI parameters (for
    /// instance `mode=ro`).
    fn connect(&self, url: Cow<'static, str>) -> impl Future<Output = Result<SqliteConnection>> + Send {
        let driver = *self;
        async move {
            let prefix = format!("{}://", Self::NAME);
            let Some(location) = url.strip_prefix(&prefix) else {
                let error = Error::Config(
                    format!("Expected sqlite connection url to start with `{prefix}`").into(),
                );
                log::error!("{:#}", error);
                return Err(error);
            };
            let (path, mut pairs) = split_query(location);
            let config = DispatchConfig::take_from(&mut pairs)?;
            let uri = join_query(&format!("file:{path}"), &pairs);
            let store = SqliteStore::open(driver, &uri)?;
            ThreadOffload::new(Arc::new(store), config)
        }
    }
}
