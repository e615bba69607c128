use crate::{
    DispatchConfig, Deferred, Driver, Error, Promise, Query, QueryLogger, QueryResult, Result,
    RowLabeled, StoreFailure, deferred::panic_message, extract_bind_values,
};
use futures::{FutureExt, future::BoxFuture};
use std::{
    any, fmt,
    panic::{self, AssertUnwindSafe},
    sync::Arc,
};
use tokio::{runtime::Handle, sync::Semaphore};

/// Submits queries without blocking the caller.
///
/// Every dispatch returns a pending [`Deferred`] right away, failures (including a parameter
/// the driver cannot bind) arrive through it and never synchronously.
pub trait Dispatcher: Send + Sync + 'static {
    type Driver: Driver;

    fn driver(&self) -> &Self::Driver;

    fn dispatch(&self, query: Query) -> Deferred<QueryResult>;

    /// Dispatch and keep the rows.
    fn fetch(&self, query: Query) -> Deferred<Vec<RowLabeled>> {
        self.dispatch(query).map(QueryResult::into_rows)
    }

    /// Dispatch and keep the only row, [`Error::TooManyRows`] if there are more.
    fn fetch_one(&self, query: Query) -> Deferred<Option<RowLabeled>> {
        self.dispatch(query).and_then(QueryResult::into_single_row)
    }

    /// Dispatch and keep the affected rows count.
    fn execute(&self, query: Query) -> Deferred<u64> {
        self.dispatch(query).map(|v| v.rows_affected())
    }
}

/// A store whose calls block the current thread.
pub trait BlockingStore: Send + Sync + 'static {
    type Driver: Driver;
    fn driver(&self) -> &Self::Driver;
    fn execute(
        &self,
        sql: &str,
        binds: Vec<<Self::Driver as Driver>::Bind>,
    ) -> Result<QueryResult, StoreFailure>;
}

/// A store with its own non blocking client.
pub trait AsyncStore: Send + Sync + 'static {
    type Driver: Driver;
    fn driver(&self) -> &Self::Driver;
    fn execute(
        &self,
        sql: Arc<str>,
        binds: Vec<<Self::Driver as Driver>::Bind>,
    ) -> BoxFuture<'static, Result<QueryResult, StoreFailure>>;
}

fn prepare<D: Driver>(query: &Query, driver: &D, logger: &dyn QueryLogger) -> Result<Vec<D::Bind>> {
    let binds = extract_bind_values(query, driver).inspect_err(|e| {
        log::error!("{:#}", e);
    })?;
    match panic::catch_unwind(AssertUnwindSafe(|| logger.log_query(query))) {
        Ok(Ok(())) => {}
        Ok(Err(e)) => log::warn!("The query logger failed: {:#}", e),
        Err(payload) => log::warn!("The query logger panicked: {}", panic_message(payload)),
    }
    Ok(binds)
}

fn runtime() -> Result<Handle> {
    Handle::try_current().map_err(|e| {
        let error = Error::Config(format!("A dispatcher needs a tokio runtime: {e}").into());
        log::error!("{:#}", error);
        error
    })
}

/// Runs a [`BlockingStore`] on tokio's blocking pool, at most `workers` statements at a time.
pub struct ThreadOffload<S: BlockingStore> {
    store: Arc<S>,
    permits: Arc<Semaphore>,
    handle: Handle,
    logger: Arc<dyn QueryLogger>,
    config: DispatchConfig,
}

impl<S: BlockingStore> ThreadOffload<S> {
    /// Must be called from within a tokio runtime, the tasks are spawned there.
    pub fn new(store: Arc<S>, config: DispatchConfig) -> Result<Self> {
        Ok(Self {
            store,
            permits: Arc::new(Semaphore::new(config.workers.max(1))),
            handle: runtime()?,
            logger: Arc::new(config.logger()),
            config,
        })
    }
    pub fn with_logger(mut self, logger: Arc<dyn QueryLogger>) -> Self {
        self.logger = logger;
        self
    }
    pub fn store(&self) -> &Arc<S> {
        &self.store
    }
    pub fn config(&self) -> &DispatchConfig {
        &self.config
    }
}

impl<S: BlockingStore> fmt::Debug for ThreadOffload<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ThreadOffload")
            .field("store", &any::type_name::<S>())
            .field("available_workers", &self.permits.available_permits())
            .field("config", &self.config)
            .finish()
    }
}

impl<S: BlockingStore> Dispatcher for ThreadOffload<S> {
    type Driver = S::Driver;

    fn driver(&self) -> &Self::Driver {
        self.store.driver()
    }

    fn dispatch(&self, query: Query) -> Deferred<QueryResult> {
        let binds = match prepare(&query, self.store.driver(), &*self.logger) {
            Ok(binds) => binds,
            Err(e) => return Deferred::failed(e),
        };
        let (promise, deferred) = Promise::new();
        let store = self.store.clone();
        let permits = self.permits.clone();
        self.handle.spawn(async move {
            let Ok(_permit) = permits.acquire_owned().await else {
                promise.fail(Error::Abandoned);
                return;
            };
            let sql = query.sql;
            let result = tokio::task::spawn_blocking(move || store.execute(&sql, binds)).await;
            promise.settle(match result {
                Ok(result) => result.map_err(Error::from),
                Err(e) if e.is_panic() => Err(Error::Panicked(panic_message(e.into_panic()))),
                Err(..) => Err(Error::Abandoned),
            });
        });
        deferred
    }
}

/// Runs an [`AsyncStore`] future as a task on the runtime captured at construction.
pub struct NativeAsync<S: AsyncStore> {
    store: Arc<S>,
    handle: Handle,
    logger: Arc<dyn QueryLogger>,
    config: DispatchConfig,
}

impl<S: AsyncStore> NativeAsync<S> {
    /// Must be called from within a tokio runtime, the tasks are spawned there.
    pub fn new(store: Arc<S>, config: DispatchConfig) -> Result<Self> {
        Ok(Self {
            store,
            handle: runtime()?,
            logger: Arc::new(config.logger()),
            config,
        })
    }
    pub fn with_logger(mut self, logger: Arc<dyn QueryLogger>) -> Self {
        self.logger = logger;
        self
    }
    pub fn store(&self) -> &Arc<S> {
        &self.store
    }
    pub fn config(&self) -> &DispatchConfig {
        &self.config
    }
}

impl<S: AsyncStore> fmt::Debug for NativeAsync<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NativeAsync")
            .field("store", &any::type_name::<S>())
            .field("config", &self.config)
            .finish()
    }
}

impl<S: AsyncStore> Dispatcher for NativeAsync<S> {
    type Driver = S::Driver;

    fn driver(&self) -> &Self::Driver {
        self.store.driver()
    }

    fn dispatch(&self, query: Query) -> Deferred<QueryResult> {
        let binds = match prepare(&query, self.store.driver(), &*self.logger) {
            Ok(binds) => binds,
            Err(e) => return Deferred::failed(e),
        };
        let (promise, deferred) = Promise::new();
        let store = self.store.clone();
        self.handle.spawn(async move {
            let result = AssertUnwindSafe(async move { store.execute(query.sql, binds).await })
                .catch_unwind()
                .await;
            promise.settle(match result {
                Ok(result) => result.map_err(Error::from),
                Err(payload) => Err(Error::Panicked(panic_message(payload))),
            });
        });
        deferred
    }
}
