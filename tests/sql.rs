#[cfg(test)]
mod tests {
    use indoc::indoc;
    use keel::{
        AsValue, ColumnDef, ColumnType, Condition, Entity, GenericSqlWriter, QueryBuilder,
        Result, Returning, Row, SqlWriter, TableRef, Value,
    };
    use keel_postgres::PostgresSqlWriter;
    use keel_sqlite::SqliteSqlWriter;

    const WRITER: GenericSqlWriter = GenericSqlWriter;

    #[derive(Debug, Clone, PartialEq)]
    struct Item {
        id: Option<i64>,
        name: Option<String>,
        price: f64,
        kind: String,
    }

    static TABLE: TableRef = TableRef {
        name: "items",
        schema: "shop",
    };
    static COLUMNS: [ColumnDef; 4] = [
        ColumnDef::new("id", ColumnType::Long)
            .primary_key()
            .auto_increment(),
        ColumnDef::new("name", ColumnType::String)
            .nullable()
            .unique(),
        ColumnDef::new("price", ColumnType::Double),
        ColumnDef::new("kind", ColumnType::Enum(&["TOOL", "FOOD"])),
    ];

    impl Entity for Item {
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
                name: AsValue::try_from_value(next())?,
                price: AsValue::try_from_value(next())?,
                kind: AsValue::try_from_value(next())?,
            })
        }
        fn row_full(&self) -> Row {
            Box::new([
                self.id.as_value(),
                self.name.clone().as_value(),
                self.price.as_value(),
                Value::Enum(Some(self.kind.clone())),
            ])
        }
        fn primary_key(&self) -> i64 {
            self.id.unwrap_or_default()
        }
    }

    fn hammer() -> Item {
        Item {
            id: None,
            name: Some("hammer".into()),
            price: 9.5,
            kind: "TOOL".into(),
        }
    }

    #[test]
    fn create_and_drop() {
        let mut out = String::new();
        WRITER.write_create_table::<Item>(&mut out, true);
        assert_eq!(
            out,
            indoc! {r#"
                CREATE TABLE IF NOT EXISTS "shop"."items" (
                "id" BIGINT GENERATED BY DEFAULT AS IDENTITY PRIMARY KEY,
                "name" VARCHAR UNIQUE,
                "price" DOUBLE NOT NULL,
                "kind" VARCHAR NOT NULL
                );
            "#}
            .trim()
        );

        let mut out = String::new();
        SqliteSqlWriter {}.write_create_table::<Item>(&mut out, false);
        assert_eq!(
            out,
            indoc! {r#"
                CREATE TABLE "shop"."items" (
                "id" INTEGER PRIMARY KEY,
                "name" TEXT UNIQUE,
                "price" REAL NOT NULL,
                "kind" TEXT NOT NULL
                );
            "#}
            .trim()
        );

        let mut out = String::new();
        PostgresSqlWriter {}.write_create_table::<Item>(&mut out, false);
        assert!(out.contains(r#""price" DOUBLE PRECISION NOT NULL"#), "{out}");
        assert!(out.contains(r#""kind" TEXT NOT NULL"#), "{out}");

        let mut out = String::new();
        WRITER.write_drop_table::<Item>(&mut out, true);
        assert_eq!(out, r#"DROP TABLE IF EXISTS "shop"."items";"#);
    }

    #[test]
    fn select() {
        let mut query = QueryBuilder::new();
        WRITER.write_select::<Item>(
            &mut query,
            &Condition::eq("price", 9.5).and(Condition::is_null("name")),
        );
        let query = query.build();
        assert_eq!(
            &*query.sql,
            indoc! {r#"
                SELECT "id", "name", "price", "kind"
                FROM "shop"."items"
                WHERE ("price" = ? AND "name" IS NULL);
            "#}
            .trim()
        );
        assert_eq!(query.params, [Value::Float64(Some(9.5))]);

        let mut query = QueryBuilder::new();
        PostgresSqlWriter {}.write_select::<Item>(
            &mut query,
            &Condition::eq("kind", "TOOL").and(
                Condition::raw(r#""price" BETWEEN ? AND ?"#, vec![1i32.into(), 2i32.into()])
                    .unwrap(),
            ),
        );
        let query = query.build();
        assert!(
            query
                .sql
                .ends_with(r#"WHERE ("kind" = $1 AND "price" BETWEEN $2 AND $3);"#),
            "{}",
            query.sql
        );
        assert_eq!(query.params.len(), 3);
    }

    #[test]
    fn conditions() {
        let render = |condition: Condition| {
            let mut query = QueryBuilder::new();
            WRITER.write_condition(&mut query, &condition);
            query.build()
        };
        assert_eq!(&*render(Condition::always()).sql, "TRUE");
        assert_eq!(&*render(Condition::never()).sql, "FALSE");
        assert_eq!(
            &*render(Condition::is_in("id", Vec::<i64>::new())).sql,
            "FALSE"
        );
        let query = render(Condition::is_in("id", [1i64, 2, 3]));
        assert_eq!(&*query.sql, r#""id" IN (?, ?, ?)"#);
        assert_eq!(query.params.len(), 3);
        assert_eq!(&*render(Condition::And(vec![])).sql, "TRUE");
        assert_eq!(&*render(Condition::Or(vec![])).sql, "FALSE");
        assert_eq!(
            &*render(Condition::is_null("name").not()).sql,
            r#"NOT ("name" IS NULL)"#
        );
        assert_eq!(
            &*render(
                Condition::eq("a", 1)
                    .or(Condition::ne("b", 2))
                    .or(Condition::le("c", 3))
            )
            .sql,
            r#"("a" = ? OR "b" <> ? OR "c" <= ?)"#
        );
        assert!(Condition::raw("a = ? AND b = ?", vec![1i32.into()]).is_err());
    }

    #[test]
    fn insert() {
        let mut query = QueryBuilder::new();
        WRITER.write_insert(&mut query, [&hammer()], Returning::Nothing);
        let query = query.build();
        assert_eq!(
            &*query.sql,
            indoc! {r#"
                INSERT INTO "shop"."items" ("name", "price", "kind") VALUES
                (?, ?, ?);
            "#}
            .trim()
        );
        assert_eq!(
            query.params,
            [
                Value::Varchar(Some("hammer".into())),
                Value::Float64(Some(9.5)),
                Value::Enum(Some("TOOL".into())),
            ]
        );

        let mut query = QueryBuilder::new();
        WRITER.write_insert(&mut query, [&hammer()], Returning::PrimaryKey);
        assert!(query.sql.ends_with("(?, ?, ?)\nRETURNING \"id\";"), "{}", query.sql);

        let explicit = Item {
            id: Some(5),
            name: None,
            ..hammer()
        };
        let mut query = QueryBuilder::new();
        WRITER.write_insert(&mut query, [&hammer(), &explicit], Returning::Nothing);
        let query = query.build();
        assert_eq!(
            &*query.sql,
            indoc! {r#"
                INSERT INTO "shop"."items" ("id", "name", "price", "kind") VALUES
                (DEFAULT, ?, ?, ?),
                (?, ?, ?, ?);
            "#}
            .trim()
        );
        assert_eq!(query.params.len(), 7);
        assert_eq!(query.params[3], Value::Int64(Some(5)));
        assert_eq!(query.params[4], Value::Varchar(None));

        let mut query = QueryBuilder::new();
        SqliteSqlWriter {}.write_insert(&mut query, [&hammer(), &explicit], Returning::All);
        assert!(query.sql.contains("(NULL, ?, ?, ?)"), "{}", query.sql);
        assert!(
            query
                .sql
                .ends_with("RETURNING \"id\", \"name\", \"price\", \"kind\";"),
            "{}",
            query.sql
        );

        let mut query = QueryBuilder::new();
        WRITER.write_insert(&mut query, Vec::<&Item>::new(), Returning::Nothing);
        assert!(query.sql.is_empty());
        assert!(query.params.is_empty());
    }

    #[test]
    fn update_and_delete() {
        let item = Item {
            id: Some(3),
            ..hammer()
        };
        let mut query = QueryBuilder::new();
        PostgresSqlWriter {}
            .write_update(&mut query, &item, Item::primary_key_def().unwrap())
            .unwrap();
        let query = query.build();
        assert_eq!(
            &*query.sql,
            indoc! {r#"
                UPDATE "shop"."items" SET
                "name" = $1,
                "price" = $2,
                "kind" = $3
                WHERE "id" = $4;
            "#}
            .trim()
        );
        assert_eq!(query.params[3], Value::Int64(Some(3)));

        let mut query = QueryBuilder::new();
        WRITER.write_delete::<Item>(&mut query, &Condition::is_in("id", Vec::<i64>::new()));
        assert_eq!(
            query.sql,
            indoc! {r#"
                DELETE FROM "shop"."items"
                WHERE FALSE;
            "#}
            .trim()
        );
    }

    /// Only a generated key.
    #[derive(Debug, Default)]
    struct Counter {
        id: Option<i64>,
    }

    static COUNTERS: TableRef = TableRef::new("counters");
    static COUNTER_COLUMNS: [ColumnDef; 1] = [ColumnDef::new("id", ColumnType::Long)
        .primary_key()
        .auto_increment()];

    impl Entity for Counter {
        type PrimaryKey = i64;
        fn table_ref() -> &'static TableRef {
            &COUNTERS
        }
        fn columns() -> &'static [ColumnDef] {
            &COUNTER_COLUMNS
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

    #[test]
    fn key_only_table() {
        let mut query = QueryBuilder::new();
        WRITER.write_insert(&mut query, [&Counter::default()], Returning::Nothing);
        assert_eq!(query.sql, r#"INSERT INTO "counters" DEFAULT VALUES;"#);
        assert!(query.params.is_empty());

        let mut query = QueryBuilder::new();
        PostgresSqlWriter {}.write_insert(&mut query, [&Counter::default()], Returning::PrimaryKey);
        assert_eq!(
            query.sql,
            "INSERT INTO \"counters\" DEFAULT VALUES\nRETURNING \"id\";"
        );

        // An explicit key is still written
        let mut query = QueryBuilder::new();
        WRITER.write_insert(&mut query, [&Counter { id: Some(4) }], Returning::Nothing);
        assert_eq!(query.sql, "INSERT INTO \"counters\" (\"id\") VALUES\n(?);");

        let mut query = QueryBuilder::new();
        let error = WRITER
            .write_update(
                &mut query,
                &Counter { id: Some(4) },
                Counter::primary_key_def().unwrap(),
            )
            .unwrap_err();
        assert!(
            error.to_string().contains("no column to update besides the primary key"),
            "{error}"
        );
        assert!(query.sql.is_empty());
    }

    #[test]
    fn identifiers_are_escaped() {
        let mut out = String::new();
        WRITER.write_identifier_quoted(&mut out, r#"we"ird"#);
        assert_eq!(out, r#""we""ird""#);
        let mut out = String::new();
        WRITER.write_table_ref(&mut out, &TableRef::new("plain"));
        assert_eq!(out, r#""plain""#);
    }
}
