#![allow(dead_code)]

use keel_core::{
    AsValue, AsyncStore, BlockingStore, ColumnDef, ColumnType, DispatchConfig, Driver, Entity,
    GenericSqlWriter, NativeAsync, QueryResult, Result, Row, RowLabeled, StoreFailure, TableRef,
    TemporalKind, ThreadOffload, Value, future::BoxFuture, split_query,
};
use futures::FutureExt;
use std::{
    borrow::Cow,
    collections::VecDeque,
    future::Future,
    sync::{
        Arc, Mutex,
        atomic::{AtomicUsize, Ordering},
    },
    time::Duration,
};
use time::Date;

/// Store double: records every call and replies with the queued answers.
#[derive(Default)]
pub struct Script {
    calls: Mutex<Vec<(String, Vec<Value>)>>,
    answers: Mutex<VecDeque<Result<QueryResult, StoreFailure>>>,
    pub delay: Option<Duration>,
    running: AtomicUsize,
    max_running: AtomicUsize,
}

impl Script {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn with_delay(delay: Duration) -> Arc<Self> {
        Arc::new(Self {
            delay: Some(delay),
            ..Default::default()
        })
    }

    /// Queue the reply of the next call, unanswered calls get `Affected(0)`.
    pub fn answer(&self, answer: Result<QueryResult, StoreFailure>) -> &Self {
        self.answers.lock().unwrap().push_back(answer);
        self
    }

    pub fn calls(&self) -> Vec<(String, Vec<Value>)> {
        self.calls.lock().unwrap().clone()
    }

    pub fn max_running(&self) -> usize {
        self.max_running.load(Ordering::SeqCst)
    }

    fn enter(&self, sql: &str, binds: Vec<Value>) {
        if sql == "PANIC" {
            panic!("scripted panic");
        }
        self.calls.lock().unwrap().push((sql.to_owned(), binds));
        let now = self.running.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_running.fetch_max(now, Ordering::SeqCst);
    }

    fn leave(&self) -> Result<QueryResult, StoreFailure> {
        self.running.fetch_sub(1, Ordering::SeqCst);
        self.answers
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(Ok(QueryResult::Affected(0)))
    }
}

fn adapt(value: &Value) -> Option<Value> {
    match value {
        Value::List(..) => None,
        v => Some(v.clone()),
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct BlockingDriver {
    writer: GenericSqlWriter,
}

pub struct ScriptedBlocking {
    pub driver: BlockingDriver,
    pub script: Arc<Script>,
}

impl Driver for BlockingDriver {
    type Connection = ThreadOffload<ScriptedBlocking>;
    type SqlWriter = GenericSqlWriter;
    type Bind = Value;

    const NAME: &'static str = "blocking";

    fn sql_writer(&self) -> &GenericSqlWriter {
        &self.writer
    }

    fn adapt(&self, value: &Value) -> Option<Value> {
        adapt(value)
    }

    fn connect(
        &self,
        url: Cow<'static, str>,
    ) -> impl Future<Output = Result<Self::Connection>> + Send {
        let driver = *self;
        async move {
            let (_, mut pairs) = split_query(&url);
            let config = DispatchConfig::take_from(&mut pairs)?;
            let store = ScriptedBlocking {
                driver,
                script: Script::new(),
            };
            ThreadOffload::new(Arc::new(store), config)
        }
    }
}

impl BlockingStore for ScriptedBlocking {
    type Driver = BlockingDriver;

    fn driver(&self) -> &BlockingDriver {
        &self.driver
    }

    fn execute(&self, sql: &str, binds: Vec<Value>) -> Result<QueryResult, StoreFailure> {
        self.script.enter(sql, binds);
        if let Some(delay) = self.script.delay {
            std::thread::sleep(delay);
        }
        self.script.leave()
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct AsyncDriver {
    writer: GenericSqlWriter,
}

pub struct ScriptedAsync {
    pub driver: AsyncDriver,
    pub script: Arc<Script>,
}

impl Driver for AsyncDriver {
    type Connection = NativeAsync<ScriptedAsync>;
    type SqlWriter = GenericSqlWriter;
    type Bind = Value;

    const NAME: &'static str = "async";

    fn sql_writer(&self) -> &GenericSqlWriter {
        &self.writer
    }

    fn adapt(&self, value: &Value) -> Option<Value> {
        adapt(value)
    }

    fn connect(
        &self,
        url: Cow<'static, str>,
    ) -> impl Future<Output = Result<Self::Connection>> + Send {
        let driver = *self;
        async move {
            let (_, mut pairs) = split_query(&url);
            let config = DispatchConfig::take_from(&mut pairs)?;
            let store = ScriptedAsync {
                driver,
                script: Script::new(),
            };
            NativeAsync::new(Arc::new(store), config)
        }
    }
}

impl AsyncStore for ScriptedAsync {
    type Driver = AsyncDriver;

    fn driver(&self) -> &AsyncDriver {
        &self.driver
    }

    fn execute(
        &self,
        sql: Arc<str>,
        binds: Vec<Value>,
    ) -> BoxFuture<'static, Result<QueryResult, StoreFailure>> {
        let script = self.script.clone();
        async move {
            script.enter(&sql, binds);
            if let Some(delay) = script.delay {
                tokio::time::sleep(delay).await;
            }
            script.leave()
        }
        .boxed()
    }
}

pub fn init_logs() {
    let _ = env_logger::builder()
        .is_test(true)
        .filter_level(log::LevelFilter::Debug)
        .try_init();
}

/// Must be called inside a tokio runtime.
pub fn blocking(script: Arc<Script>, workers: usize) -> Arc<ThreadOffload<ScriptedBlocking>> {
    let store = ScriptedBlocking {
        driver: BlockingDriver::default(),
        script,
    };
    let config = DispatchConfig {
        workers,
        ..Default::default()
    };
    Arc::new(ThreadOffload::new(Arc::new(store), config).unwrap())
}

/// Must be called inside a tokio runtime.
pub fn native(script: Arc<Script>) -> Arc<NativeAsync<ScriptedAsync>> {
    let store = ScriptedAsync {
        driver: AsyncDriver::default(),
        script,
    };
    Arc::new(NativeAsync::new(Arc::new(store), DispatchConfig::default()).unwrap())
}

pub fn rows(labels: &[&str], rows: Vec<Vec<Value>>) -> QueryResult {
    let labels: Arc<[String]> = labels.iter().map(|v| v.to_string()).collect();
    QueryResult::Rows(
        rows.into_iter()
            .map(|v| RowLabeled::new(labels.clone(), v.into_boxed_slice()))
            .collect(),
    )
}

#[derive(Debug, Default, Clone, PartialEq)]
pub struct Gadget {
    pub id: Option<i64>,
    pub label: String,
    pub weight: Option<f32>,
    pub kind: Option<String>,
    pub made: Option<Date>,
    /// Kept as the store returned it.
    pub shape: Value,
}

pub const GADGET_KINDS: &[&str] = &["SMALL", "LARGE"];

static TABLE: TableRef = TableRef::new("gadgets");
static COLUMNS: [ColumnDef; 6] = [
    ColumnDef::new("id", ColumnType::Long)
        .primary_key()
        .auto_increment(),
    ColumnDef::new("label", ColumnType::String).unique(),
    ColumnDef::new("weight", ColumnType::Float).nullable(),
    ColumnDef::new("kind", ColumnType::Enum(GADGET_KINDS)).nullable(),
    ColumnDef::new("made", ColumnType::Temporal(TemporalKind::Date)).nullable(),
    ColumnDef::new("shape", ColumnType::Unrecognized("geometry")).nullable(),
];

impl Entity for Gadget {
    type PrimaryKey = i64;

    fn table_ref() -> &'static TableRef {
        &TABLE
    }

    fn columns() -> &'static [ColumnDef] {
        &COLUMNS
    }

    fn from_values(values: Row) -> Result<Self> {
        let mut values = values.into_vec().into_iter();
        let mut next = || values.next().unwrap_or_default();
        Ok(Self {
            id: AsValue::try_from_value(next())?,
            label: AsValue::try_from_value(next())?,
            weight: AsValue::try_from_value(next())?,
            kind: AsValue::try_from_value(next())?,
            made: AsValue::try_from_value(next())?,
            shape: next(),
        })
    }

    fn row_full(&self) -> Row {
        Box::new([
            self.id.as_value(),
            self.label.clone().as_value(),
            self.weight.as_value(),
            match &self.kind {
                Some(v) => Value::Enum(Some(v.clone())),
                None => Value::Enum(None),
            },
            self.made.as_value(),
            self.shape.clone(),
        ])
    }

    fn primary_key(&self) -> i64 {
        self.id.unwrap_or_default()
    }
}

impl Gadget {
    pub fn labeled(label: &str) -> Self {
        Self {
            label: label.into(),
            ..Default::default()
        }
    }
}
