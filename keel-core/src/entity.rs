use crate::{AsValue, ColumnDef, Result, Row, TableRef, Value};

/// A record type produced by the generator.
///
/// Values exchanged through `from_values` and `row_full` are aligned by index with
/// [`Entity::columns`].
pub trait Entity: Sized + Send + Sync + 'static {
    type PrimaryKey: AsValue + Clone + Send + 'static;

    fn table_ref() -> &'static TableRef;
    fn columns() -> &'static [ColumnDef];

    fn primary_key_def() -> Option<&'static ColumnDef> {
        Self::columns().iter().find(|c| c.primary_key)
    }
    fn unique_defs() -> impl Iterator<Item = &'static ColumnDef> {
        Self::columns().iter().filter(|c| c.unique)
    }

    /// Build the record, the values are already converted to the column types.
    fn from_values(values: Row) -> Result<Self>;
    fn row_full(&self) -> Row;
    fn primary_key(&self) -> Self::PrimaryKey;

    /// Columns to write on insert: auto increment columns left empty are omitted so the
    /// store can assign them.
    fn row_filtered(&self) -> Vec<(&'static ColumnDef, Value)> {
        Self::columns()
            .iter()
            .zip(self.row_full())
            .filter(|(c, v)| !(c.auto_increment && v.is_null()))
            .collect()
    }
}
