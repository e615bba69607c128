#[cfg(test)]
mod tests {
    use keel_core::Driver;
    use keel_sqlite::SqliteDriver;
    use keel_tests::{execute_tests, init_logs};
    use std::{env, path::PathBuf, sync::Arc, sync::Mutex};
    use tokio::fs;

    static MUTEX: Mutex<()> = Mutex::new(());

    #[tokio::test]
    async fn sqlite() {
        init_logs();
        let path: PathBuf = env::temp_dir().join("keel_tests.sqlite");
        let _guard = MUTEX.lock().unwrap();
        if path.exists() {
            fs::remove_file(&path).await.expect(
                format!("Failed to remove existing test database file {}", path.display())
                    .as_str(),
            );
        }
        assert!(!path.exists(), "Database file should not exist before test");
        let url = format!("sqlite://{}?mode=rwc", path.display());
        let connection = SqliteDriver::new()
            .connect(url.into())
            .await
            .expect("Could not open the database");
        execute_tests(Arc::new(connection)).await;
        assert!(path.exists(), "Database file should be created");
    }

    #[tokio::test]
    async fn sqlite_memory() {
        init_logs();
        let connection = SqliteDriver::new()
            .connect("sqlite://:memory:?workers=2".into())
            .await
            .expect("Could not open the in memory database");
        execute_tests(Arc::new(connection)).await;
    }
}
