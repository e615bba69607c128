use crate::{PostgresDriver, ValueHolder};
use keel_core::{
    AsyncStore, QueryResult, RowLabeled, StoreFailure, StoreFailureKind, Value,
    future::{BoxFuture, FutureExt},
    truncate_long,
};
use std::sync::Arc;
use tokio_postgres::{Client, error::SqlState, types::ToSql};

/// A tokio-postgres client shared by every dispatched statement.
///
/// The client pipelines the statements over its single connection, no worker bound applies.
pub struct PostgresStore {
    driver: PostgresDriver,
    client: Arc<Client>,
}

pub(crate) fn failure(e: tokio_postgres::Error) -> StoreFailure {
    let code = e.code().cloned();
    let kind = match &code {
        Some(c) if *c == SqlState::UNIQUE_VIOLATION => StoreFailureKind::DuplicateKey,
        Some(c) if c.code().starts_with("23") => StoreFailureKind::ConstraintViolation,
        Some(c) if *c == SqlState::SYNTAX_ERROR || c.code().starts_with("42") => {
            StoreFailureKind::Syntax
        }
        _ if e.is_closed() => StoreFailureKind::Connection,
        _ => StoreFailureKind::Other,
    };
    let failure = StoreFailure::new(kind, e);
    match code {
        Some(code) => failure.with_code(code.code().to_owned()),
        None => failure,
    }
}

impl PostgresStore {
    pub fn new(driver: PostgresDriver, client: Client) -> Self {
        Self {
            driver,
            client: Arc::new(client),
        }
    }

    pub fn client(&self) -> &Client {
        &self.client
    }

    async fn run(
        client: &Client,
        sql: &str,
        binds: Vec<ValueHolder>,
    ) -> Result<QueryResult, StoreFailure> {
        let sql = sql.trim_end().trim_end_matches(';');
        let statement = client.prepare(sql).await.map_err(failure)?;
        let params: Vec<&(dyn ToSql + Sync)> =
            binds.iter().map(|v| v as &(dyn ToSql + Sync)).collect();
        if statement.columns().is_empty() {
            let count = client.execute(&statement, &params).await.map_err(failure)?;
            return Ok(QueryResult::Affected(count));
        }
        let labels: Arc<[String]> = statement
            .columns()
            .iter()
            .map(|c| c.name().to_owned())
            .collect();
        let rows = client.query(&statement, &params).await.map_err(failure)?;
        rows.into_iter()
            .map(|row| {
                let values = (0..row.len())
                    .map(|i| row.try_get::<_, ValueHolder>(i).map(Value::from))
                    .collect::<Result<Box<[_]>, _>>()
                    .map_err(failure)?;
                Ok(RowLabeled::new(labels.clone(), values))
            })
            .collect::<Result<Vec<_>, _>>()
            .map(QueryResult::Rows)
    }
}

impl AsyncStore for PostgresStore {
    type Driver = PostgresDriver;

    fn driver(&self) -> &PostgresDriver {
        &self.driver
    }

    fn execute(
        &self,
        sql: Arc<str>,
        binds: Vec<ValueHolder>,
    ) -> BoxFuture<'static, Result<QueryResult, StoreFailure>> {
        let client = self.client.clone();
        async move {
            Self::run(&client, &sql, binds).await.inspect_err(|e| {
                log::error!("{:#}\nWhile executing the query:\n{}", e, truncate_long!(sql));
            })
        }
        .boxed()
    }
}
