
#[cfg(test)]
mod tests {
    use super::init::init;
    use keel_core::{Dispatcher, Driver, Error, Query};
    use keel_postgres::PostgresDriver;
    use keel_tests::{execute_tests, init_logs, silent_logs};
    use std::sync::{Arc, Mutex};

    static MUTEX: Mutex<()> = Mutex::new(());

    #[tokio::test]
    async fn postgres() {
        init_logs();
        let _guard = MUTEX.lock().unwrap();
        let (url, _container) = init().await;
        let error_msg = format!("Could not connect to `{url}`");
        let connection = PostgresDriver::new()
            .connect(url.into())
            .await
            .expect(&error_msg);
        execute_tests(Arc::new(connection)).await;
    }

    #[tokio::test]
    async fn dispatcher_parameters_are_not_forwarded() {
        init_logs();
        let _guard = MUTEX.lock().unwrap();
        let (url, _container) = init().await;
        let separator = if url.contains('?') { '&' } else { '?' };
        let url = format!("{url}{separator}workers=3&log_binds=false");
        let connection = PostgresDriver::new()
            .connect(url.into())
            .await
            .expect("The dispatcher parameters must be removed from the url");
        assert_eq!(connection.config().workers, 3);
        assert!(!connection.config().log_bind_values);
        let rows = connection
            .fetch(Query::new("SELECT $1::INT4 + 1 AS result", vec![41i32.into()]))
            .await
            .expect("Could not run a parametrized select");
        assert_eq!(rows.len(), 1);
        assert_eq!(
            rows[0].get_column("result").cloned(),
            Some(keel_core::Value::Int32(Some(42)))
        );
    }

    #[tokio::test]
    async fn syntax_error_is_classified() {
        init_logs();
        let _guard = MUTEX.lock().unwrap();
        let (url, _container) = init().await;
        let connection = PostgresDriver::new()
            .connect(url.into())
            .await
            .expect("Could not connect");
        silent_logs! {
            let error = connection
                .execute("SELEC 1".into())
                .await
                .expect_err("A malformed statement must fail");
            let failure = error.store_failure().expect("Expected a store failure");
            assert_eq!(failure.kind, keel_core::StoreFailureKind::Syntax);
            assert_eq!(failure.code.as_deref(), Some("42601"));
        }
    }

    #[tokio::test]
    async fn wrong_url() {
        silent_logs! {
            assert!(matches!(
                PostgresDriver::new().connect("mysql://some_url".into()).await,
                Err(Error::Config(..))
            ));
            assert!(matches!(
                PostgresDriver::new()
                    .connect("postgres://user@localhost/db?sslmode=sometimes".into())
                    .await,
                Err(Error::Config(..))
            ));
        }
    }
}
