use crate::{Error, Result, Value, truncate_long};
use std::{
    fmt::{self, Display},
    sync::Arc,
};

/// A statement together with its ordered parameters.
///
/// Immutable once built, the dispatcher only reads it.
#[derive(Debug, Clone, PartialEq)]
pub struct Query {
    pub sql: Arc<str>,
    pub params: Vec<Value>,
}

impl Query {
    pub fn new(sql: impl Into<Arc<str>>, params: Vec<Value>) -> Self {
        Self {
            sql: sql.into(),
            params,
        }
    }
}

impl From<&str> for Query {
    fn from(value: &str) -> Self {
        Query::new(value, Vec::new())
    }
}

impl From<String> for Query {
    fn from(value: String) -> Self {
        Query::new(value, Vec::new())
    }
}

impl Display for Query {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", truncate_long!(self.sql))
    }
}

/// Accumulates the statement text and its parameters while a [`SqlWriter`](crate::SqlWriter)
/// renders it.
#[derive(Debug, Default)]
pub struct QueryBuilder {
    pub sql: String,
    pub params: Vec<Value>,
}

impl QueryBuilder {
    pub fn new() -> Self {
        Self {
            sql: String::with_capacity(256),
            params: Vec::new(),
        }
    }
    pub fn push_str(&mut self, sql: &str) -> &mut Self {
        self.sql.push_str(sql);
        self
    }
    pub fn push(&mut self, c: char) -> &mut Self {
        self.sql.push(c);
        self
    }
    pub fn build(self) -> Query {
        Query::new(self.sql, self.params)
    }
}

/// Shared reference-counted column name list.
pub type RowNames = Arc<[String]>;
/// Owned row value slice matching `RowNames` length.
pub type Row = Box<[Value]>;

/// A result row with its corresponding column labels.
#[derive(Debug, Clone, PartialEq)]
pub struct RowLabeled {
    /// Column names.
    pub labels: RowNames,
    /// Data values (aligned by index with `labels`).
    pub values: Row,
}

impl RowLabeled {
    pub fn new(labels: RowNames, values: Row) -> Self {
        Self { labels, values }
    }
    pub fn names(&self) -> &[String] {
        &self.labels
    }
    pub fn values(&self) -> &[Value] {
        &self.values
    }
    pub fn get_column(&self, name: &str) -> Option<&Value> {
        self.labels
            .iter()
            .position(|v| v.eq_ignore_ascii_case(name))
            .and_then(|i| self.values.get(i))
    }
}

impl From<RowLabeled> for Row {
    fn from(value: RowLabeled) -> Self {
        value.values
    }
}

/// What the store returned for one statement.
#[derive(Debug, Clone, PartialEq)]
pub enum QueryResult {
    /// Rows in store order.
    Rows(Vec<RowLabeled>),
    /// Number of rows touched by a modify statement.
    Affected(u64),
}

impl QueryResult {
    pub fn rows_affected(&self) -> u64 {
        match self {
            QueryResult::Rows(rows) => rows.len() as u64,
            QueryResult::Affected(v) => *v,
        }
    }
    pub fn into_rows(self) -> Vec<RowLabeled> {
        match self {
            QueryResult::Rows(rows) => rows,
            QueryResult::Affected(..) => Vec::new(),
        }
    }
    /// `None` for zero rows, [`Error::TooManyRows`] for more than one.
    pub fn into_single_row(self) -> Result<Option<RowLabeled>> {
        let mut rows = self.into_rows();
        match rows.len() {
            0 | 1 => Ok(rows.pop()),
            count => Err(Error::TooManyRows(count)),
        }
    }
}
