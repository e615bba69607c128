use keel_core::{ColumnDef, ColumnType, SqlWriter};

#[derive(Debug, Default, Clone, Copy)]
pub struct SqliteSqlWriter {}

impl SqlWriter for SqliteSqlWriter {
    fn write_column_type(&self, out: &mut String, value: &ColumnType) {
        match value {
            ColumnType::Boolean
            | ColumnType::Byte
            | ColumnType::Short
            | ColumnType::Integer
            | ColumnType::Long => out.push_str("INTEGER"),
            ColumnType::Float | ColumnType::Double => out.push_str("REAL"),
            ColumnType::Binary => out.push_str("BLOB"),
            ColumnType::String
            | ColumnType::Temporal(..)
            | ColumnType::Uuid
            | ColumnType::Enum(..)
            | ColumnType::Custom(..) => out.push_str("TEXT"),
            ColumnType::Unrecognized(name) => out.push_str(name),
        }
    }

    // An INTEGER PRIMARY KEY is an alias of the rowid and gets assigned when NULL
    fn write_auto_increment(&self, _out: &mut String, _column: &ColumnDef) {}

    fn write_insert_missing(&self, out: &mut String) {
        out.push_str("NULL");
    }
}
