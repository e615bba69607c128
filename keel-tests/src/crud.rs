use crate::{Mood, Something};
use keel::{AsValue, Condition, Dao, Dispatcher, Error};
use std::sync::{Arc, LazyLock};
use time::macros::{date, datetime};
use tokio::sync::Mutex;
use uuid::Uuid;

pub(crate) static MUTEX: LazyLock<Mutex<()>> = LazyLock::new(|| Mutex::new(()));

pub(crate) async fn setup<D: Dispatcher>(dispatcher: &Arc<D>) -> Dao<Something, D> {
    let dao = Dao::<Something, D>::new(dispatcher.clone());
    dao.drop_table(true)
        .await
        .expect("Failed to drop the Something table");
    dao.create_table(true)
        .await
        .expect("Failed to create the Something table");
    dao
}

pub(crate) fn full_record() -> Something {
    Something {
        id: None,
        name: "Ada".into(),
        age: 36,
        nickname: Some("countess".into()),
        score: 87.5,
        flag: true,
        mood: Mood::Calm,
        avatar: Some(vec![0, 1, 2, 254, 255]),
        created: Some(datetime!(2024-03-01 10:15:30)),
        birthday: Some(date!(1815 - 12 - 10)),
        token: Some(Uuid::parse_str("5e915574-bb30-4430-98cf-c5854f61fbbd").unwrap()),
        settings: Some(serde_json::json!({ "theme": "dark", "size": 12 })),
    }
}

pub async fn insert_and_find<D: Dispatcher>(dispatcher: &Arc<D>) {
    let _lock = MUTEX.lock().await;
    let dao = setup(dispatcher).await;

    // Insert returning the generated key, then read it back
    let record = full_record();
    let id = dao
        .insert_returning_primary_key(&record)
        .await
        .expect("Failed to insert the full record");
    let found = dao
        .find_one_by_id(id)
        .await
        .expect("Failed to query the full record")
        .expect("The inserted record must be found");
    assert_eq!(
        found,
        Something {
            id: Some(id),
            ..record.clone()
        }
    );

    // Unknown key
    let missing = dao
        .find_one_by_id(id + 1000)
        .await
        .expect("Querying a missing key must not fail");
    assert_eq!(missing, None);

    // Nullable columns left empty
    let sparse = Something::named("Bob", 20);
    dao.insert(&sparse).await.expect("Failed to insert Bob");
    let bob = dao
        .fetch_one_by("name", "Bob")
        .await
        .expect("Failed to query Bob")
        .expect("Bob must be found");
    assert!(bob.id.is_some());
    assert_eq!(bob.nickname, None);
    assert_eq!(bob.avatar, None);
    assert_eq!(bob.created, None);
    assert_eq!(bob.birthday, None);
    assert_eq!(bob.token, None);
    assert_eq!(bob.settings, None);
    assert_eq!(bob.mood, Mood::Happy);
    assert!(!bob.flag);

    // Whole row returned by the insert
    let (name, age) = dao
        .insert_returning(&Something::named("Carol", 41), |row| {
            let name = String::try_from_value(row.get_column("name").cloned().unwrap_or_default())?;
            let age = i32::try_from_value(row.get_column("age").cloned().unwrap_or_default())?;
            Ok((name, age))
        })
        .await
        .expect("Failed to insert Carol");
    assert_eq!(name, "Carol");
    assert_eq!(age, 41);

    let all = dao.find_all().await.expect("Failed to query every record");
    assert_eq!(all.len(), 3);
}

pub async fn singular_fetch<D: Dispatcher>(dispatcher: &Arc<D>) {
    let _lock = MUTEX.lock().await;
    let dao = setup(dispatcher).await;
    let inserted = dao
        .insert_many(&[
            Something::named("one", 30),
            Something::named("two", 30),
            Something::named("three", 31),
        ])
        .await
        .expect("Failed to insert the batch");
    assert_eq!(inserted, 3);

    // Exactly one
    let three = dao
        .find_one_by_condition(&Condition::eq("age", 31))
        .await
        .expect("Failed to query age 31")
        .expect("One record has age 31");
    assert_eq!(three.name, "three");

    // None
    let none = dao
        .find_one_by_condition(&Condition::eq("age", 99))
        .await
        .expect("No match is not a failure");
    assert_eq!(none, None);

    // Too many
    let error = dao
        .find_one_by_condition(&Condition::eq("age", 30))
        .await
        .expect_err("Two matches must fail a singular fetch");
    assert!(matches!(error, Error::TooManyRows(2)), "{error:?}");
    assert_eq!(error.to_string(), "Found more than one row: 2");

    // Many with no match
    let empty = dao
        .find_many_by_condition(&Condition::gt("age", 100))
        .await
        .expect("Failed to query an empty match");
    assert!(empty.is_empty());

    // Empty batch never reaches the store
    let nothing = dao
        .insert_many(std::iter::empty())
        .await
        .expect("An empty batch must succeed");
    assert_eq!(nothing, 0);
    assert_eq!(dao.find_all().await.unwrap().len(), 3);
}

pub async fn update_and_delete<D: Dispatcher>(dispatcher: &Arc<D>) {
    let _lock = MUTEX.lock().await;
    let dao = setup(dispatcher).await;
    let first = dao
        .insert_returning_primary_key(&Something::named("first", 1))
        .await
        .expect("Failed to insert first");
    let second = dao
        .insert_returning_primary_key(&Something::named("second", 2))
        .await
        .expect("Failed to insert second");
    let third = dao
        .insert_returning_primary_key(&Something::named("third", 3))
        .await
        .expect("Failed to insert third");

    // Update by primary key
    let mut record = dao
        .find_one_by_id(first)
        .await
        .unwrap()
        .expect("first must exist");
    record.age = 11;
    record.nickname = Some("uno".into());
    record.mood = Mood::Sad;
    let updated = dao.update(&record).await.expect("Failed to update first");
    assert_eq!(updated, 1);
    let reloaded = dao.find_one_by_id(first).await.unwrap().unwrap();
    assert_eq!(reloaded, record);

    // Many by ids
    let mut found = dao
        .find_many_by_ids([first, third])
        .await
        .expect("Failed to query by ids");
    found.sort_by_key(|v| v.id);
    assert_eq!(
        found.iter().map(|v| v.name.as_str()).collect::<Vec<_>>(),
        ["first", "third"]
    );
    assert!(dao.find_many_by_ids([]).await.unwrap().is_empty());

    // Delete by ids
    let deleted = dao
        .delete_by_ids([first, second])
        .await
        .expect("Failed to delete by ids");
    assert_eq!(deleted, 2);
    assert_eq!(dao.find_one_by_id(first).await.unwrap(), None);

    // Deleting twice affects nothing the second time
    let condition = Condition::eq("name", "third");
    assert_eq!(dao.delete_by_condition(&condition).await.unwrap(), 1);
    assert_eq!(dao.delete_by_condition(&condition).await.unwrap(), 0);
    assert_eq!(dao.delete_by_id(third).await.unwrap(), 0);
    assert!(dao.find_all().await.unwrap().is_empty());
}

pub async fn duplicate_key<D: Dispatcher>(dispatcher: &Arc<D>) {
    let _lock = MUTEX.lock().await;
    let dao = setup(dispatcher).await;
    let record = Something {
        id: Some(1_000_001),
        ..Something::named("unique", 5)
    };
    assert_eq!(dao.insert(&record).await.unwrap(), 1);

    // Same primary key
    let error = dao
        .insert(&Something {
            name: "other".into(),
            ..record.clone()
        })
        .await
        .expect_err("A duplicate primary key must fail");
    assert!(error.is_duplicate_key(), "{error:?}");
    assert!(error.store_failure().is_some());

    // Same unique column
    let error = dao
        .insert(&Something {
            id: Some(1_000_002),
            ..record.clone()
        })
        .await
        .expect_err("A duplicate unique column must fail");
    assert!(error.is_duplicate_key(), "{error:?}");

    // The failure does not poison the connection
    assert_eq!(dao.find_all().await.unwrap(), vec![record]);
}

pub async fn conditions<D: Dispatcher>(dispatcher: &Arc<D>) {
    let _lock = MUTEX.lock().await;
    let dao = setup(dispatcher).await;
    dao.insert_many(&[
        Something {
            nickname: Some("a".into()),
            ..Something::named("alpha", 10)
        },
        Something::named("bravo", 20),
        Something {
            nickname: Some("c".into()),
            ..Something::named("charlie", 30)
        },
        Something::named("delta", 40),
    ])
    .await
    .expect("Failed to insert the batch");

    let names = |mut records: Vec<Something>| {
        records.sort_by(|a, b| a.name.cmp(&b.name));
        records.into_iter().map(|v| v.name).collect::<Vec<_>>()
    };

    let found = dao
        .find_many_by_condition(&Condition::ge("age", 20).and(Condition::lt("age", 40)))
        .await
        .unwrap();
    assert_eq!(names(found), ["bravo", "charlie"]);

    let found = dao
        .find_many_by_condition(&Condition::eq("name", "alpha").or(Condition::eq("age", 40)))
        .await
        .unwrap();
    assert_eq!(names(found), ["alpha", "delta"]);

    let found = dao
        .find_many_by_condition(&Condition::is_null("nickname"))
        .await
        .unwrap();
    assert_eq!(names(found), ["bravo", "delta"]);

    let found = dao
        .find_many_by_condition(&Condition::is_not_null("nickname").not())
        .await
        .unwrap();
    assert_eq!(names(found), ["bravo", "delta"]);

    let found = dao
        .find_many_by_condition(
            &Condition::raw(r#""age" > ? AND "age" <> ?"#, vec![15i32.into(), 30i32.into()]).unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(names(found), ["bravo", "delta"]);

    let found = dao
        .fetch_by("name", ["charlie", "delta", "echo"])
        .await
        .unwrap();
    assert_eq!(names(found), ["charlie", "delta"]);

    assert!(
        dao.find_many_by_condition(&Condition::never())
            .await
            .unwrap()
            .is_empty()
    );
    dao.fetch_by("no_such_column", [1i32])
        .await
        .expect_err("An unknown column must fail");
}
