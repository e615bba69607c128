use crate::{
    ColumnDef, ColumnType, Condition, Entity, Error, QueryBuilder, Result, TableRef,
    TemporalKind, Value, separated_by,
};
use std::fmt::Write;

/// Columns an insert statement reads back.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Returning {
    Nothing,
    PrimaryKey,
    All,
}

/// Dialect specific rendering of the statements issued by [`Dao`](crate::Dao).
///
/// Every method has a default producing standard SQL, drivers override what differs.
/// Parameters never end up in the text, they are appended to the builder and replaced by a
/// placeholder.
pub trait SqlWriter: Send + Sync {
    fn write_escaped(&self, out: &mut String, value: &str, search: char, replace: &str) {
        let mut position = 0;
        for (i, c) in value.char_indices() {
            if c == search {
                out.push_str(&value[position..i]);
                out.push_str(replace);
                position = i + c.len_utf8();
            }
        }
        out.push_str(&value[position..]);
    }

    fn write_identifier_quoted(&self, out: &mut String, value: &str) {
        out.push('"');
        self.write_escaped(out, value, '"', r#""""#);
        out.push('"');
    }

    fn write_table_ref(&self, out: &mut String, value: &TableRef) {
        if !value.schema.is_empty() {
            self.write_identifier_quoted(out, value.schema);
            out.push('.');
        }
        self.write_identifier_quoted(out, value.name);
    }

    /// Placeholder of the parameter at `index` (1 based).
    fn write_placeholder(&self, out: &mut String, _index: usize) {
        out.push('?');
    }

    fn write_param(&self, out: &mut QueryBuilder, value: Value) {
        out.params.push(value);
        let index = out.params.len();
        self.write_placeholder(&mut out.sql, index);
    }

    fn write_column_type(&self, out: &mut String, value: &ColumnType) {
        match value {
            ColumnType::Boolean => out.push_str("BOOLEAN"),
            ColumnType::Byte => out.push_str("TINYINT"),
            ColumnType::Short => out.push_str("SMALLINT"),
            ColumnType::Integer => out.push_str("INTEGER"),
            ColumnType::Long => out.push_str("BIGINT"),
            ColumnType::Float => out.push_str("FLOAT"),
            ColumnType::Double => out.push_str("DOUBLE"),
            ColumnType::String => out.push_str("VARCHAR"),
            ColumnType::Binary => out.push_str("BLOB"),
            ColumnType::Temporal(TemporalKind::Date) => out.push_str("DATE"),
            ColumnType::Temporal(TemporalKind::Time) => out.push_str("TIME"),
            ColumnType::Temporal(TemporalKind::Timestamp) => out.push_str("TIMESTAMP"),
            ColumnType::Temporal(TemporalKind::TimestampWithTimezone) => {
                out.push_str("TIMESTAMP WITH TIME ZONE")
            }
            ColumnType::Uuid => out.push_str("UUID"),
            ColumnType::Enum(..) => out.push_str("VARCHAR"),
            ColumnType::Custom(name) | ColumnType::Unrecognized(name) => {
                out.push_str(&name.to_uppercase())
            }
        }
    }

    fn write_auto_increment(&self, out: &mut String, _column: &ColumnDef) {
        out.push_str(" GENERATED BY DEFAULT AS IDENTITY");
    }

    /// Stand-in for a value left to the store in a multi row insert.
    fn write_insert_missing(&self, out: &mut String) {
        out.push_str("DEFAULT");
    }

    fn write_create_table_column_fragment(&self, out: &mut String, column: &ColumnDef) {
        self.write_identifier_quoted(out, column.name);
        out.push(' ');
        self.write_column_type(out, &column.column_type);
        if column.auto_increment {
            self.write_auto_increment(out, column);
        }
        if !column.nullable && !column.primary_key {
            out.push_str(" NOT NULL");
        }
        if column.primary_key {
            out.push_str(" PRIMARY KEY");
        }
        if column.unique && !column.primary_key {
            out.push_str(" UNIQUE");
        }
    }

    fn write_create_table<E: Entity>(&self, out: &mut String, if_not_exists: bool)
    where
        Self: Sized,
    {
        out.push_str("CREATE TABLE ");
        if if_not_exists {
            out.push_str("IF NOT EXISTS ");
        }
        self.write_table_ref(out, E::table_ref());
        out.push_str(" (\n");
        separated_by(
            out,
            E::columns(),
            |out, v| self.write_create_table_column_fragment(out, v),
            ",\n",
        );
        out.push_str("\n);");
    }

    fn write_drop_table<E: Entity>(&self, out: &mut String, if_exists: bool)
    where
        Self: Sized,
    {
        out.push_str("DROP TABLE ");
        if if_exists {
            out.push_str("IF EXISTS ");
        }
        self.write_table_ref(out, E::table_ref());
        out.push(';');
    }

    fn write_column_list(&self, out: &mut String, columns: &[ColumnDef]) {
        separated_by(
            out,
            columns,
            |out, v| self.write_identifier_quoted(out, v.name),
            ", ",
        );
    }

    fn write_select<E: Entity>(&self, out: &mut QueryBuilder, condition: &Condition)
    where
        Self: Sized,
    {
        out.push_str("SELECT ");
        self.write_column_list(&mut out.sql, E::columns());
        out.push_str("\nFROM ");
        self.write_table_ref(&mut out.sql, E::table_ref());
        out.push_str("\nWHERE ");
        self.write_condition(out, condition);
        out.push(';');
    }

    /// Nothing is written when `entities` is empty.
    fn write_insert<'a, E, It>(&self, out: &mut QueryBuilder, entities: It, returning: Returning)
    where
        Self: Sized,
        E: Entity + 'a,
        It: IntoIterator<Item = &'a E>,
    {
        let mut rows = entities.into_iter().peekable();
        let Some(first) = rows.next() else {
            return;
        };
        out.push_str("INSERT INTO ");
        self.write_table_ref(&mut out.sql, E::table_ref());
        let single = rows.peek().is_none().then(|| first.row_filtered());
        match single {
            // Every column is generated by the store
            Some(row) if row.is_empty() => {
                out.push_str(" DEFAULT VALUES");
            }
            // A single row lists only the columns it carries
            Some(row) => {
                out.push_str(" (");
                separated_by(
                    &mut out.sql,
                    row.iter(),
                    |out, (c, _)| self.write_identifier_quoted(out, c.name),
                    ", ",
                );
                out.push_str(") VALUES\n(");
                let mut separate = false;
                for (_, value) in row {
                    if separate {
                        out.push_str(", ");
                    }
                    self.write_param(out, value);
                    separate = true;
                }
                out.push(')');
            }
            None => {
                out.push_str(" (");
                self.write_column_list(&mut out.sql, E::columns());
                out.push_str(") VALUES\n");
                let mut separate_rows = false;
                for entity in std::iter::once(first).chain(rows) {
                    if separate_rows {
                        out.push_str(",\n");
                    }
                    out.push('(');
                    let mut separate = false;
                    for (column, value) in E::columns().iter().zip(entity.row_full()) {
                        if separate {
                            out.push_str(", ");
                        }
                        if column.auto_increment && value.is_null() {
                            self.write_insert_missing(&mut out.sql);
                        } else {
                            self.write_param(out, value);
                        }
                        separate = true;
                    }
                    out.push(')');
                    separate_rows = true;
                }
            }
        }
        self.write_returning::<E>(&mut out.sql, returning);
        out.push(';');
    }

    fn write_returning<E: Entity>(&self, out: &mut String, returning: Returning)
    where
        Self: Sized,
    {
        match returning {
            Returning::Nothing => {}
            Returning::PrimaryKey => {
                if let Some(pk) = E::primary_key_def() {
                    out.push_str("\nRETURNING ");
                    self.write_identifier_quoted(out, pk.name);
                }
            }
            Returning::All => {
                out.push_str("\nRETURNING ");
                self.write_column_list(out, E::columns());
            }
        }
    }

    /// Update every non key column of the row identified by the primary key.
    ///
    /// Fails without writing anything when the key is the only column.
    fn write_update<E: Entity>(
        &self,
        out: &mut QueryBuilder,
        entity: &E,
        primary_key: &ColumnDef,
    ) -> Result<()>
    where
        Self: Sized,
    {
        if E::columns().iter().all(|c| c.name == primary_key.name) {
            return Err(Error::msg(format!(
                "Table `{}` has no column to update besides the primary key",
                E::table_ref().full_name()
            )));
        }
        out.push_str("UPDATE ");
        self.write_table_ref(&mut out.sql, E::table_ref());
        out.push_str(" SET\n");
        let mut key = Value::Null;
        let mut separate = false;
        for (column, value) in E::columns().iter().zip(entity.row_full()) {
            if column.name == primary_key.name {
                key = value;
                continue;
            }
            if separate {
                out.push_str(",\n");
            }
            self.write_identifier_quoted(&mut out.sql, column.name);
            out.push_str(" = ");
            self.write_param(out, value);
            separate = true;
        }
        out.push_str("\nWHERE ");
        self.write_condition(
            out,
            &Condition::Compare {
                column: primary_key.name.into(),
                op: crate::CompareOp::Eq,
                value: key,
            },
        );
        out.push(';');
        Ok(())
    }

    fn write_delete<E: Entity>(&self, out: &mut QueryBuilder, condition: &Condition)
    where
        Self: Sized,
    {
        out.push_str("DELETE FROM ");
        self.write_table_ref(&mut out.sql, E::table_ref());
        out.push_str("\nWHERE ");
        self.write_condition(out, condition);
        out.push(';');
    }

    fn write_condition(&self, out: &mut QueryBuilder, condition: &Condition) {
        match condition {
            Condition::True => {
                out.push_str("TRUE");
            }
            Condition::False => {
                out.push_str("FALSE");
            }
            Condition::Compare { column, op, value } => {
                self.write_identifier_quoted(&mut out.sql, column);
                let _ = write!(out.sql, " {} ", op.as_sql());
                self.write_param(out, value.clone());
            }
            Condition::In { values, .. } if values.is_empty() => {
                out.push_str("FALSE");
            }
            Condition::In { column, values } => {
                self.write_identifier_quoted(&mut out.sql, column);
                out.push_str(" IN (");
                let mut separate = false;
                for value in values {
                    if separate {
                        out.push_str(", ");
                    }
                    self.write_param(out, value.clone());
                    separate = true;
                }
                out.push(')');
            }
            Condition::IsNull(column) => {
                self.write_identifier_quoted(&mut out.sql, column);
                out.push_str(" IS NULL");
            }
            Condition::IsNotNull(column) => {
                self.write_identifier_quoted(&mut out.sql, column);
                out.push_str(" IS NOT NULL");
            }
            Condition::And(v) if v.is_empty() => {
                out.push_str("TRUE");
            }
            Condition::Or(v) if v.is_empty() => {
                out.push_str("FALSE");
            }
            Condition::And(v) | Condition::Or(v) => {
                let separator = if matches!(condition, Condition::And(..)) {
                    " AND "
                } else {
                    " OR "
                };
                out.push('(');
                let mut separate = false;
                for c in v {
                    if separate {
                        out.push_str(separator);
                    }
                    self.write_condition(out, c);
                    separate = true;
                }
                out.push(')');
            }
            Condition::Not(inner) => {
                out.push_str("NOT (");
                self.write_condition(out, inner);
                out.push(')');
            }
            Condition::Raw { sql, params } => {
                // Placeholder count was checked when the condition was built
                let mut params = params.iter();
                let mut position = 0;
                for (i, _) in sql.match_indices('?') {
                    out.push_str(&sql[position..i]);
                    if let Some(value) = params.next() {
                        self.write_param(out, value.clone());
                    }
                    position = i + 1;
                }
                out.push_str(&sql[position..]);
            }
        }
    }
}

/// Standard SQL with `?` placeholders.
#[derive(Default, Debug, Clone, Copy)]
pub struct GenericSqlWriter;

impl GenericSqlWriter {
    pub fn new() -> Self {
        Self
    }
}

impl SqlWriter for GenericSqlWriter {}
