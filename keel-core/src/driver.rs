use crate::{Dispatcher, Result, SqlWriter, Value};
use std::{borrow::Cow, future::Future};

/// A store backend: its dialect, its bind value representation and how to connect.
pub trait Driver: Send + Sync + Sized + 'static {
    type Connection: Dispatcher<Driver = Self>;
    type SqlWriter: SqlWriter;
    /// Store native representation of one parameter.
    type Bind: Send + 'static;

    const NAME: &'static str;

    fn sql_writer(&self) -> &Self::SqlWriter;

    /// Convert a parameter to its bind value, `None` when the store has no representation
    /// for it.
    fn adapt(&self, value: &Value) -> Option<Self::Bind>;

    fn connect(
        &self,
        url: Cow<'static, str>,
    ) -> impl Future<Output = Result<Self::Connection>> + Send;
}
