use crate::{
    Something,
    crud::{MUTEX, full_record, setup},
};
use keel::{Condition, Deferred, Dispatcher, DocumentMapper, Error};
use std::{
    sync::{
        Arc,
        atomic::{AtomicUsize, Ordering},
    },
    time::Duration,
};

pub async fn chained<D: Dispatcher>(dispatcher: &Arc<D>) {
    let _lock = MUTEX.lock().await;
    let dao = setup(dispatcher).await;

    // Insert, then read back the generated key in sequence
    let reader = dao.clone();
    let found = dao
        .insert_returning_primary_key(&Something::named("chained", 7))
        .compose(move |id| reader.find_one_by_id(id))
        .map(|v| v.map(|v| v.name))
        .await
        .expect("Failed to run the chain");
    assert_eq!(found.as_deref(), Some("chained"));

    // A failure skips the following steps
    let calls = Arc::new(AtomicUsize::new(0));
    let counter = calls.clone();
    let error = dao
        .find_one_by_condition(&Condition::always())
        .and_then(|_| Err::<(), _>(Error::msg("stop here")))
        .compose(move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
            Deferred::succeeded(())
        })
        .await
        .expect_err("The chain must fail");
    assert!(error.to_string().contains("stop here"));
    assert_eq!(calls.load(Ordering::SeqCst), 0);

    // Recover from a singular fetch matching too many rows
    dao.insert(&Something::named("twin", 7)).await.unwrap();
    let recovered = dao
        .find_one_by_condition(&Condition::eq("age", 7))
        .otherwise(|e| match e {
            Error::TooManyRows(..) => Ok(None),
            e => Err(e),
        })
        .await
        .expect("The failure must be recovered");
    assert_eq!(recovered, None);

    // Observers see the outcome without consuming it
    let seen = Arc::new(AtomicUsize::new(0));
    let observer = seen.clone();
    let deferred = dao.find_all();
    deferred.inspect(move |result| {
        if let Ok(v) = result {
            observer.store(v.len(), Ordering::SeqCst);
        }
    });
    let all = deferred.await.expect("Failed to query every record");
    assert_eq!(all.len(), 2);
    assert_eq!(seen.load(Ordering::SeqCst), 2);

    // Quick statements settle before a generous deadline
    let count = dao
        .find_all()
        .timeout(Duration::from_secs(30))
        .await
        .expect("The query must settle before the deadline")
        .len();
    assert_eq!(count, 2);
}

pub async fn concurrent<D: Dispatcher>(dispatcher: &Arc<D>) {
    let _lock = MUTEX.lock().await;
    let dao = setup(dispatcher).await;

    // Independent inserts, combined
    let counts = Deferred::all([
        dao.insert(&Something::named("left", 1)),
        dao.insert(&Something::named("right", 2)),
    ])
    .await
    .expect("Both inserts must succeed");
    assert_eq!(counts, [1, 1]);
    assert_eq!(dao.find_all().await.unwrap().len(), 2);

    // The first failure wins, reported with its position
    let error = Deferred::all([
        dao.find_many_by_condition(&Condition::always()),
        dao.fetch_by("missing_column", ["x"]),
    ])
    .await
    .expect_err("A failing child must fail the combination");
    match &error {
        Error::ConcurrentChildFailure { index, .. } => assert_eq!(*index, 1),
        e => panic!("Unexpected error {e:?}"),
    }

    // Nothing to wait for
    let empty = Deferred::<Vec<u64>>::all(Vec::<Deferred<u64>>::new())
        .await
        .unwrap();
    assert!(empty.is_empty());
}

pub async fn documents<D: Dispatcher>(dispatcher: &Arc<D>) {
    let _lock = MUTEX.lock().await;
    let dao = setup(dispatcher).await;
    let id = dao.insert_returning_primary_key(&full_record()).await.unwrap();
    let stored = dao.find_one_by_id(id).await.unwrap().unwrap();

    let mapper = DocumentMapper::default();
    let document = mapper.to_document(&stored);
    assert_eq!(document["name"], "Ada");
    assert_eq!(document["mood"], "CALM");
    assert_eq!(document["avatar"], "AAEC/v8=");
    assert_eq!(document["birthday"], "1815-12-10");
    assert_eq!(document["settings"]["theme"], "dark");

    let decoded: Something = mapper
        .from_document(&document)
        .expect("Failed to decode the document");
    assert_eq!(decoded, stored);

    // Decoded records can be written back as they are
    dao.delete_by_id(id).await.unwrap();
    dao.insert(&decoded).await.unwrap();
    assert_eq!(dao.find_one_by_id(id).await.unwrap(), Some(stored));
}
