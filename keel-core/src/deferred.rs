use crate::{Error, Result};
use std::{
    any::Any,
    fmt,
    future::{Future, IntoFuture},
    mem,
    panic::{self, AssertUnwindSafe},
    pin::Pin,
    sync::{
        Arc, Mutex, MutexGuard, PoisonError,
        atomic::{AtomicBool, Ordering},
    },
    task::{Context, Poll, Waker},
    time::Duration,
};
use tokio::runtime::Handle;

type Observer<T> = Box<dyn FnOnce(&Result<T>) + Send>;
type Callback<T> = Box<dyn FnOnce(Result<T>) + Send>;

enum Consumer<T> {
    Waker(Waker),
    Callback(Callback<T>),
}

struct State<T> {
    result: Option<Result<T>>,
    observers: Vec<Observer<T>>,
    consumer: Option<Consumer<T>>,
}

/// Single assignment cell shared by a [`Promise`] and its [`Deferred`].
struct Cell<T> {
    settled: AtomicBool,
    state: Mutex<State<T>>,
}

pub(crate) fn panic_message(payload: Box<dyn Any + Send>) -> Arc<str> {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).into()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.as_str().into()
    } else {
        "unknown panic payload".into()
    }
}

fn notify<T>(observer: Observer<T>, result: &Result<T>) {
    if let Err(payload) = panic::catch_unwind(AssertUnwindSafe(|| observer(result))) {
        log::error!(
            "An observer of a deferred result panicked: {}",
            panic_message(payload)
        );
    }
}

fn run_consumer<T>(callback: Callback<T>, result: Result<T>) {
    if let Err(payload) = panic::catch_unwind(AssertUnwindSafe(|| callback(result))) {
        log::error!(
            "The consumer of a deferred result panicked: {}",
            panic_message(payload)
        );
    }
}

impl<T: Send + 'static> Cell<T> {
    fn new() -> Self {
        Self {
            settled: AtomicBool::new(false),
            state: Mutex::new(State {
                result: None,
                observers: Vec::new(),
                consumer: None,
            }),
        }
    }

    fn lock(&self) -> MutexGuard<'_, State<T>> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn settle(&self, result: Result<T>) -> bool {
        if self
            .settled
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return false;
        }
        let mut state = self.lock();
        for observer in mem::take(&mut state.observers) {
            notify(observer, &result);
        }
        match state.consumer.take() {
            Some(Consumer::Callback(callback)) => {
                drop(state);
                run_consumer(callback, result);
            }
            Some(Consumer::Waker(waker)) => {
                state.result = Some(result);
                drop(state);
                waker.wake();
            }
            None => state.result = Some(result),
        }
        true
    }

    fn observe(&self, observer: Observer<T>) {
        let mut state = self.lock();
        match &state.result {
            Some(result) => notify(observer, result),
            None => state.observers.push(observer),
        }
    }

    fn consume(&self, callback: Callback<T>) {
        let mut state = self.lock();
        match state.result.take() {
            Some(result) => {
                drop(state);
                run_consumer(callback, result);
            }
            None => state.consumer = Some(Consumer::Callback(callback)),
        }
    }

    fn poll_result(&self, cx: &mut Context<'_>) -> Poll<Result<T>> {
        let mut state = self.lock();
        match state.result.take() {
            Some(result) => Poll::Ready(result),
            None => {
                state.consumer = Some(Consumer::Waker(cx.waker().clone()));
                Poll::Pending
            }
        }
    }
}

struct PromiseGuard<T: Send + 'static> {
    cell: Arc<Cell<T>>,
}

impl<T: Send + 'static> Drop for PromiseGuard<T> {
    fn drop(&mut self) {
        if !self.cell.settled.load(Ordering::Acquire) {
            self.cell.settle(Err(Error::Abandoned));
        }
    }
}

/// Write side of a [`Deferred`], the first settlement wins.
///
/// Dropping every clone of a pending promise fails the result with [`Error::Abandoned`].
pub struct Promise<T: Send + 'static> {
    guard: Arc<PromiseGuard<T>>,
}

impl<T: Send + 'static> Clone for Promise<T> {
    fn clone(&self) -> Self {
        Self {
            guard: self.guard.clone(),
        }
    }
}

impl<T: Send + 'static> Promise<T> {
    #[allow(clippy::new_ret_no_self)]
    pub fn new() -> (Promise<T>, Deferred<T>) {
        let cell = Arc::new(Cell::new());
        (
            Promise {
                guard: Arc::new(PromiseGuard { cell: cell.clone() }),
            },
            Deferred { cell },
        )
    }
    /// Returns `false` when the result was already settled.
    pub fn complete(&self, value: T) -> bool {
        self.settle(Ok(value))
    }
    pub fn fail(&self, error: Error) -> bool {
        self.settle(Err(error))
    }
    pub fn settle(&self, result: Result<T>) -> bool {
        self.guard.cell.settle(result)
    }
    pub fn is_settled(&self) -> bool {
        self.guard.cell.settled.load(Ordering::Acquire)
    }
}

impl<T: Send + 'static> fmt::Debug for Promise<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Promise")
            .field("settled", &self.is_settled())
            .finish()
    }
}

/// Read side of an asynchronous outcome: pending, then exactly once either a value or an
/// [`Error`].
///
/// Observers attached with [`Deferred::inspect`] all run, before or after settlement. The
/// value itself goes to a single consumer: a combinator, [`Deferred::on_complete`] or
/// `.await`. Dropping the handle does not cancel the work that settles it.
#[must_use = "a deferred result does nothing unless consumed"]
pub struct Deferred<T: Send + 'static> {
    cell: Arc<Cell<T>>,
}

impl<T: Send + 'static> Deferred<T> {
    pub fn pending() -> (Promise<T>, Deferred<T>) {
        Promise::new()
    }

    pub fn succeeded(value: T) -> Self {
        let (promise, deferred) = Promise::new();
        promise.complete(value);
        deferred
    }

    pub fn failed(error: Error) -> Self {
        let (promise, deferred) = Promise::new();
        promise.fail(error);
        deferred
    }

    /// Drive `future` as a task on the current tokio runtime.
    pub fn from_future<F>(future: F) -> Self
    where
        F: Future<Output = Result<T>> + Send + 'static,
    {
        let handle = match Handle::try_current() {
            Ok(handle) => handle,
            Err(e) => return Deferred::failed(Error::Config(e.to_string().into())),
        };
        let (promise, deferred) = Promise::new();
        handle.spawn(async move {
            promise.settle(future.await);
        });
        deferred
    }

    pub fn is_settled(&self) -> bool {
        self.cell.settled.load(Ordering::Acquire)
    }

    /// Attach an observer, it runs right away when the result is already settled.
    pub fn inspect<F>(&self, f: F) -> &Self
    where
        F: FnOnce(&Result<T>) + Send + 'static,
    {
        self.cell.observe(Box::new(f));
        self
    }

    /// Terminal consumer of the result.
    pub fn on_complete<F>(self, f: F)
    where
        F: FnOnce(Result<T>) + Send + 'static,
    {
        self.cell.consume(Box::new(f));
    }

    pub fn map<U, F>(self, f: F) -> Deferred<U>
    where
        U: Send + 'static,
        F: FnOnce(T) -> U + Send + 'static,
    {
        self.and_then(move |v| Ok(f(v)))
    }

    pub fn and_then<U, F>(self, f: F) -> Deferred<U>
    where
        U: Send + 'static,
        F: FnOnce(T) -> Result<U> + Send + 'static,
    {
        let (promise, deferred) = Promise::new();
        self.on_complete(move |result| {
            promise.settle(result.and_then(|v| guarded(move || f(v))));
        });
        deferred
    }

    /// Chain a dependent operation, `f` is only invoked after a success.
    pub fn compose<U, F>(self, f: F) -> Deferred<U>
    where
        U: Send + 'static,
        F: FnOnce(T) -> Deferred<U> + Send + 'static,
    {
        let (promise, deferred) = Promise::new();
        self.on_complete(move |result| match result {
            Ok(v) => match panic::catch_unwind(AssertUnwindSafe(move || f(v))) {
                Ok(next) => next.on_complete(move |result| {
                    promise.settle(result);
                }),
                Err(payload) => {
                    promise.fail(Error::Panicked(panic_message(payload)));
                }
            },
            Err(e) => {
                promise.fail(e);
            }
        });
        deferred
    }

    /// Recover from a failure (`Ok`) or raise another one (`Err`).
    pub fn otherwise<F>(self, f: F) -> Deferred<T>
    where
        F: FnOnce(Error) -> Result<T> + Send + 'static,
    {
        let (promise, deferred) = Promise::new();
        self.on_complete(move |result| {
            promise.settle(result.or_else(|e| guarded(move || f(e))));
        });
        deferred
    }

    /// Fails with [`Error::Timeout`] unless the result settles within `duration`.
    ///
    /// The operation keeps running after the deadline, its outcome is discarded.
    pub fn timeout(self, duration: Duration) -> Deferred<T> {
        let handle = match Handle::try_current() {
            Ok(handle) => handle,
            Err(e) => return Deferred::failed(Error::Config(e.to_string().into())),
        };
        let (promise, deferred) = Promise::new();
        let timer = promise.clone();
        let task = handle.spawn(async move {
            tokio::time::sleep(duration).await;
            if timer.fail(Error::Timeout(duration)) {
                log::debug!("A deferred result did not settle within {duration:?}");
            }
        });
        self.on_complete(move |result| {
            promise.settle(result);
            task.abort();
        });
        deferred
    }
}

impl<T: Send + 'static> Deferred<Vec<T>> {
    /// Settles with every value in child order, or with the first failure.
    ///
    /// Outcomes arriving after the first failure do not change the result.
    pub fn all<It>(children: It) -> Deferred<Vec<T>>
    where
        It: IntoIterator<Item = Deferred<T>>,
    {
        let children: Vec<_> = children.into_iter().collect();
        if children.is_empty() {
            return Deferred::succeeded(Vec::new());
        }
        let (promise, deferred) = Promise::new();
        let slots = Arc::new(Mutex::new((
            children.iter().map(|_| None).collect::<Vec<Option<T>>>(),
            children.len(),
        )));
        for (index, child) in children.into_iter().enumerate() {
            let promise = promise.clone();
            let slots = slots.clone();
            child.on_complete(move |result| match result {
                Ok(value) => {
                    let values = {
                        let mut slots = slots.lock().unwrap_or_else(PoisonError::into_inner);
                        slots.0[index] = Some(value);
                        slots.1 -= 1;
                        if slots.1 == 0 {
                            Some(mem::take(&mut slots.0))
                        } else {
                            None
                        }
                    };
                    if let Some(values) = values {
                        promise.complete(values.into_iter().flatten().collect());
                    }
                }
                Err(e) => {
                    if !promise.fail(Error::ConcurrentChildFailure {
                        index,
                        cause: Box::new(e.clone()),
                    }) {
                        log::debug!(
                            "Child {index} failed after the combined result settled: {e:#}"
                        );
                    }
                }
            });
        }
        deferred
    }
}

fn guarded<U>(f: impl FnOnce() -> Result<U>) -> Result<U> {
    match panic::catch_unwind(AssertUnwindSafe(f)) {
        Ok(result) => result,
        Err(payload) => Err(Error::Panicked(panic_message(payload))),
    }
}

impl<T: Send + 'static> fmt::Debug for Deferred<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Deferred")
            .field("settled", &self.is_settled())
            .finish()
    }
}

/// Future returned by `Deferred::into_future`.
pub struct DeferredFuture<T: Send + 'static> {
    cell: Arc<Cell<T>>,
}

impl<T: Send + 'static> Future for DeferredFuture<T> {
    type Output = Result<T>;
    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        self.cell.poll_result(cx)
    }
}

impl<T: Send + 'static> IntoFuture for Deferred<T> {
    type Output = Result<T>;
    type IntoFuture = DeferredFuture<T>;
    fn into_future(self) -> Self::IntoFuture {
        DeferredFuture { cell: self.cell }
    }
}
