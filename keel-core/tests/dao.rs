mod common;

#[cfg(test)]
mod tests {
    use crate::common::{Gadget, Script, blocking, native, rows};
    use indoc::indoc;
    use keel_core::{
        AsValue, ColumnDef, ColumnType, Condition, Dao, Entity, Error, Materializer, QueryResult,
        Result, Row, TableRef, Value, ConversionKey, Conversions,
    };
    use std::sync::Arc;

    const LABELS: &[&str] = &["id", "label", "weight", "kind", "made", "shape"];

    fn row(id: i64, label: &str) -> Vec<Value> {
        vec![
            Value::Int64(Some(id)),
            Value::Varchar(Some(label.into())),
            Value::Null,
            Value::Null,
            Value::Null,
            Value::Null,
        ]
    }

    #[tokio::test]
    async fn find_one_renders_one_select() {
        let script = Script::new();
        script.answer(Ok(rows(LABELS, vec![row(3, "lamp")])));
        let dao = Dao::<Gadget, _>::new(blocking(script.clone(), 1));
        let found = dao.find_one_by_id(3).await.unwrap().unwrap();
        assert_eq!(found.label, "lamp");
        let calls = script.calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(
            calls[0].0,
            indoc! {r#"
                SELECT "id", "label", "weight", "kind", "made", "shape"
                FROM "gadgets"
                WHERE "id" = ?;
            "#}
            .trim()
        );
        assert_eq!(calls[0].1, [Value::Int64(Some(3))]);
    }

    #[tokio::test]
    async fn singular_fetch_with_two_rows() {
        let script = Script::new();
        script.answer(Ok(rows(LABELS, vec![row(1, "a"), row(2, "b")])));
        let dao = Dao::<Gadget, _>::new(native(script.clone()));
        let error = dao
            .fetch_one_by("kind", "SMALL")
            .await
            .unwrap_err();
        assert!(matches!(error, Error::TooManyRows(2)), "{error:?}");
        let calls = script.calls();
        assert!(calls[0].0.ends_with(r#"WHERE "kind" = ?;"#), "{}", calls[0].0);
        assert_eq!(calls[0].1, [Value::Varchar(Some("SMALL".into()))]);
    }

    #[tokio::test]
    async fn many() {
        let script = Script::new();
        script
            .answer(Ok(rows(LABELS, vec![row(1, "a"), row(2, "b")])))
            .answer(Ok(rows(LABELS, vec![])))
            .answer(Ok(rows(LABELS, vec![row(7, "g")])));
        let dao = Dao::<Gadget, _>::new(blocking(script.clone(), 1));
        let found = dao.find_all().await.unwrap();
        assert_eq!(found.iter().map(|v| v.id).collect::<Vec<_>>(), [Some(1), Some(2)]);
        assert!(dao.find_many_by_ids([]).await.unwrap().is_empty());
        let found = dao.fetch_by("LABEL", ["g", "h"]).await.unwrap();
        assert_eq!(found.len(), 1);
        let calls = script.calls();
        assert!(calls[0].0.ends_with("WHERE TRUE;"), "{}", calls[0].0);
        // An empty key list still reaches the store, matching nothing
        assert!(calls[1].0.ends_with("WHERE FALSE;"), "{}", calls[1].0);
        assert!(calls[2].0.ends_with(r#"WHERE "label" IN (?, ?);"#), "{}", calls[2].0);
    }

    #[tokio::test]
    async fn unknown_column_fails_before_dispatch() {
        let script = Script::new();
        let dao = Dao::<Gadget, _>::new(blocking(script.clone(), 1));
        let error = dao.fetch_one_by("colour", "red").await.unwrap_err();
        assert!(
            error.to_string().contains("has no column `colour`"),
            "{error}"
        );
        assert!(script.calls().is_empty());
    }

    #[tokio::test]
    async fn inserts() {
        let script = Script::new();
        script
            .answer(Ok(QueryResult::Affected(1)))
            .answer(Ok(rows(&["id"], vec![vec![Value::Int32(Some(41))]])))
            .answer(Ok(rows(LABELS, vec![row(42, "echo")])))
            .answer(Ok(QueryResult::Affected(1)));
        let dao = Dao::<Gadget, _>::new(blocking(script.clone(), 1));
        assert_eq!(dao.insert(&Gadget::labeled("first")).await.unwrap(), 1);

        // The generated key goes through the primary key conversion
        let id = dao
            .insert_returning_primary_key(&Gadget::labeled("second"))
            .await
            .unwrap();
        assert_eq!(id, 41);

        let label = dao
            .insert_returning(&Gadget::labeled("echo"), |row| {
                String::try_from_value(row.get_column("label").cloned().unwrap_or_default())
            })
            .await
            .unwrap();
        assert_eq!(label, "echo");

        // Nothing comes back from the store
        let error = dao
            .insert_returning_primary_key(&Gadget::labeled("third"))
            .await
            .unwrap_err();
        assert!(error.to_string().contains("did not return any row"), "{error}");

        assert_eq!(dao.insert_many([]).await.unwrap(), 0);

        let calls = script.calls();
        assert_eq!(calls.len(), 4);
        assert_eq!(
            calls[0].0,
            indoc! {r#"
                INSERT INTO "gadgets" ("label", "weight", "kind", "made", "shape") VALUES
                (?, ?, ?, ?, ?);
            "#}
            .trim()
        );
        assert!(calls[1].0.ends_with("RETURNING \"id\";"), "{}", calls[1].0);
        assert!(
            calls[2]
                .0
                .ends_with(r#"RETURNING "id", "label", "weight", "kind", "made", "shape";"#),
            "{}",
            calls[2].0
        );
    }

    #[tokio::test]
    async fn update_and_delete() {
        let script = Script::new();
        script
            .answer(Ok(QueryResult::Affected(1)))
            .answer(Ok(QueryResult::Affected(2)));
        let dao = Dao::<Gadget, _>::new(native(script.clone()));
        let gadget = Gadget {
            id: Some(5),
            weight: Some(1.5),
            ..Gadget::labeled("desk")
        };
        assert_eq!(dao.update(&gadget).await.unwrap(), 1);
        assert_eq!(dao.delete_by_ids([5, 6]).await.unwrap(), 2);
        assert_eq!(dao.delete_by_condition(&Condition::never()).await.unwrap(), 0);
        let calls = script.calls();
        assert!(calls[0].0.starts_with("UPDATE \"gadgets\" SET\n\"label\" = ?"), "{}", calls[0].0);
        assert_eq!(calls[0].1.len(), 6);
        assert_eq!(calls[0].1[5], Value::Int64(Some(5)));
        assert_eq!(calls[0].1[1], Value::Float32(Some(1.5)));
        assert_eq!(
            calls[1].0,
            "DELETE FROM \"gadgets\"\nWHERE \"id\" IN (?, ?);"
        );
        assert_eq!(calls[2].0, "DELETE FROM \"gadgets\"\nWHERE FALSE;");
    }

    #[tokio::test]
    async fn store_failures_reach_the_caller() {
        let script = Script::new();
        script.answer(Err(keel_core::StoreFailure::msg(
            keel_core::StoreFailureKind::DuplicateKey,
            "duplicate key",
        )));
        let dao = Dao::<Gadget, _>::new(blocking(script.clone(), 1));
        let error = dao.insert(&Gadget::labeled("twice")).await.unwrap_err();
        assert!(error.is_duplicate_key());
    }

    #[tokio::test]
    async fn custom_materializer() {
        let script = Script::new();
        script.answer(Ok(rows(LABELS, vec![row(1, "quiet")])));
        let materializer = Materializer::new(Conversions::default().with(
            ConversionKey::String,
            |value, _| Ok(String::try_from_value(value)?.to_uppercase().as_value()),
        ));
        let dao = Dao::<Gadget, _>::with_materializer(blocking(script, 1), Arc::new(materializer));
        assert_eq!(dao.find_all().await.unwrap()[0].label, "QUIET");
    }

    #[tokio::test]
    async fn tables() {
        let script = Script::new();
        let dao = Dao::<Gadget, _>::new(blocking(script.clone(), 1));
        dao.create_table(true).await.unwrap();
        dao.drop_table(false).await.unwrap();
        let calls = script.calls();
        assert!(calls[0].0.starts_with("CREATE TABLE IF NOT EXISTS \"gadgets\" ("), "{}", calls[0].0);
        assert_eq!(calls[1].0, "DROP TABLE \"gadgets\";");
    }

    /// Table without a primary key.
    struct Note {
        text: String,
    }

    static NOTES: TableRef = TableRef::new("notes");
    static NOTE_COLUMNS: [ColumnDef; 1] = [ColumnDef::new("text", ColumnType::String)];

    impl Entity for Note {
        type PrimaryKey = String;
        fn table_ref() -> &'static TableRef {
            &NOTES
        }
        fn columns() -> &'static [ColumnDef] {
            &NOTE_COLUMNS
        }
        fn from_values(values: Row) -> Result<Self> {
            Ok(Self {
                text: AsValue::try_from_value(values.into_vec().pop().unwrap_or_default())?,
            })
        }
        fn row_full(&self) -> Row {
            Box::new([self.text.clone().as_value()])
        }
        fn primary_key(&self) -> String {
            self.text.clone()
        }
    }

    #[tokio::test]
    async fn key_operations_need_a_primary_key() {
        let script = Script::new();
        let dao = Dao::<Note, _>::new(blocking(script.clone(), 1));
        let note = Note { text: "hi".into() };
        for error in [
            dao.find_one_by_id("hi".into()).await.map(|_| ()).unwrap_err(),
            dao.update(&note).await.map(|_| ()).unwrap_err(),
            dao.delete_by_ids(["hi".to_string()]).await.map(|_| ()).unwrap_err(),
            dao.insert_returning_primary_key(&note).await.map(|_| ()).unwrap_err(),
        ] {
            assert!(
                error.to_string().contains("does not declare a primary key"),
                "{error}"
            );
        }
        assert!(script.calls().is_empty());
        // Everything else works
        dao.insert(&note).await.unwrap();
        assert_eq!(script.calls().len(), 1);
    }
}
