#[cfg(test)]
mod tests {
    use keel_core::{
        AsValue, ColumnDef, ColumnType, Dao, Deferred, Dispatcher, Driver, Entity, Error, Query,
        QueryResult, Result, Row, TableRef, Value,
    };
    use std::sync::Arc;
    use keel_sqlite::SqliteDriver;
    use keel_tests::{init_logs, silent_logs};
    use std::{env, sync::Mutex};
    use tokio::fs;

    static MUTEX: Mutex<()> = Mutex::new(());

    #[tokio::test]
    async fn create_database() {
        init_logs();
        let path = env::temp_dir().join("keel_creation.sqlite");
        let _guard = MUTEX.lock().unwrap();
        if path.exists() {
            fs::remove_file(&path)
                .await
                .expect(format!("Failed to remove test database file {}", path.display()).as_str());
        }
        assert!(!path.exists(), "Database file should not exist before test");
        SqliteDriver::new()
            .connect(format!("sqlite://{}?mode=rwc", path.display()).into())
            .await
            .expect("Could not open the database");
        assert!(
            path.exists(),
            "Database file should be created after connection"
        );
        SqliteDriver::new()
            .connect(format!("sqlite://{}?mode=ro", path.display()).into())
            .await
            .expect("Could not open the database");
        fs::remove_file(&path).await.expect(
            format!("Failed to remove existing test database file {}", path.display()).as_str(),
        );
        silent_logs! {
            let error = SqliteDriver::new()
                .connect(format!("sqlite://{}?mode=ro", path.display()).into())
                .await
                .expect_err("Should not be able to open in read only unexisting database");
            assert_eq!(
                error.store_failure().map(|v| v.kind),
                Some(keel_core::StoreFailureKind::Connection)
            );
        }
    }

    #[tokio::test]
    async fn wrong_url() {
        silent_logs! {
            assert!(matches!(
                SqliteDriver::new().connect("duckdb://some_value".into()).await,
                Err(Error::Config(..))
            ));
            assert!(matches!(
                SqliteDriver::new().connect("sqlite://:memory:?workers=0".into()).await,
                Err(Error::Config(..))
            ));
            assert!(matches!(
                SqliteDriver::new().connect("sqlite://:memory:?log_level=loud".into()).await,
                Err(Error::Config(..))
            ));
        };
    }

    #[tokio::test]
    async fn dispatcher_parameters() {
        let connection = SqliteDriver::new()
            .connect("sqlite://:memory:?workers=3&log_binds=off&log_level=trace".into())
            .await
            .expect("Could not open the in memory database");
        assert_eq!(connection.config().workers, 3);
        assert!(!connection.config().log_bind_values);
        assert_eq!(connection.config().log_level, log::Level::Trace);
    }

    #[tokio::test]
    async fn multiple_statements() {
        init_logs();
        let connection = SqliteDriver::new()
            .connect("sqlite://:memory:".into())
            .await
            .unwrap();
        let result = connection
            .dispatch(Query::new(
                "CREATE TABLE numbers (n INTEGER, label TEXT);
                INSERT INTO numbers VALUES (?, ?);
                INSERT INTO numbers VALUES (?, ?), (?, ?);",
                vec![
                    1i64.into(),
                    "one".into(),
                    2i64.into(),
                    "two".into(),
                    3i64.into(),
                    Value::Varchar(None),
                ],
            ))
            .await
            .expect("Could not run the statements");
        assert_eq!(result, QueryResult::Affected(3));
        let rows = connection
            .fetch("SELECT n, label FROM numbers ORDER BY n".into())
            .await
            .unwrap();
        assert_eq!(rows.len(), 3);
        assert_eq!(rows[0].names(), ["n", "label"]);
        assert_eq!(
            rows[2].values(),
            [Value::Int64(Some(3)), Value::Null]
        );
        silent_logs! {
            connection
                .execute(Query::new("INSERT INTO numbers VALUES (?, ?)", vec![4i64.into()]))
                .await
                .expect_err("A missing parameter must fail");
            connection
                .execute(Query::new("SELECT 1", vec![4i64.into()]))
                .await
                .expect_err("An extra parameter must fail");
            let error = connection
                .execute("SELEC 1".into())
                .await
                .expect_err("A malformed statement must fail");
            assert_eq!(
                error.store_failure().map(|v| v.kind),
                Some(keel_core::StoreFailureKind::Syntax)
            );
        }
    }

    #[tokio::test]
    async fn unmappable_parameter() {
        let connection = SqliteDriver::new()
            .connect("sqlite://:memory:".into())
            .await
            .unwrap();
        silent_logs! {
            let deferred = connection.dispatch(Query::new(
                "SELECT ?",
                vec![Value::list([1i32, 2, 3])],
            ));
            assert!(deferred.is_settled(), "Must fail before reaching the store");
            match deferred.await {
                Err(Error::UnmappableColumn { column, type_name }) => {
                    assert_eq!(column, "parameter #1");
                    assert_eq!(type_name, "LIST");
                }
                other => panic!("Unexpected result {other:?}"),
            }
        }
    }

    #[tokio::test]
    async fn bounded_workers() {
        let connection = SqliteDriver::new()
            .connect("sqlite://:memory:?workers=1".into())
            .await
            .unwrap();
        connection
            .execute("CREATE TABLE counter (n INTEGER)".into())
            .await
            .unwrap();
        let inserts = (0..20i64).map(|n| {
            connection.execute(Query::new("INSERT INTO counter VALUES (?)", vec![n.into()]))
        });
        let counts = Deferred::all(inserts).await.expect("Every insert must succeed");
        assert_eq!(counts, vec![1; 20]);
        let rows = connection
            .fetch("SELECT COUNT(*) AS total, SUM(n) AS sum FROM counter".into())
            .await
            .unwrap();
        assert_eq!(rows[0].get_column("TOTAL"), Some(&Value::Int64(Some(20))));
        assert_eq!(rows[0].get_column("sum"), Some(&Value::Int64(Some(190))));
    }

    #[derive(Debug, Default, PartialEq)]
    struct Ticket {
        id: Option<i64>,
    }

    static TICKETS: TableRef = TableRef::new("tickets");
    static TICKET_COLUMNS: [ColumnDef; 1] = [ColumnDef::new("id", ColumnType::Long)
        .primary_key()
        .auto_increment()];

    impl Entity for Ticket {
        type PrimaryKey = i64;
        fn table_ref() -> &'static TableRef {
            &TICKETS
        }
        fn columns() -> &'static [ColumnDef] {
            &TICKET_COLUMNS
        }
        fn from_values(values: Row) -> Result<Self> {
            Ok(Self {
                id: AsValue::try_from_value(values.into_vec().pop().unwrap_or_default())?,
            })
        }
        fn row_full(&self) -> Row {
            Box::new([self.id.as_value()])
        }
        fn primary_key(&self) -> i64 {
            self.id.unwrap_or_default()
        }
    }

    #[tokio::test]
    async fn generated_key_only() {
        let connection = SqliteDriver::new()
            .connect("sqlite://:memory:".into())
            .await
            .unwrap();
        let dao = Dao::<Ticket, _>::new(Arc::new(connection));
        dao.create_table(false).await.expect("Could not create the table");
        assert_eq!(dao.insert(&Ticket::default()).await.unwrap(), 1);
        let id = dao
            .insert_returning_primary_key(&Ticket::default())
            .await
            .expect("Could not insert with the default values");
        assert_eq!(id, 2);
        assert_eq!(dao.insert_many([&Ticket::default(), &Ticket::default()]).await.unwrap(), 2);
        assert_eq!(dao.find_all().await.unwrap().len(), 4);
        let error = dao
            .update(&Ticket { id: Some(1) })
            .await
            .expect_err("Nothing to update besides the key");
        assert!(error.store_failure().is_none(), "{error:?}");
    }
}
