use keel_core::{ColumnType, SqlWriter, TemporalKind};
use std::fmt::Write;

#[derive(Debug, Default, Clone, Copy)]
pub struct PostgresSqlWriter {}

impl SqlWriter for PostgresSqlWriter {
    fn write_placeholder(&self, out: &mut String, index: usize) {
        let _ = write!(out, "${index}");
    }

    fn write_column_type(&self, out: &mut String, value: &ColumnType) {
        match value {
            ColumnType::Boolean => out.push_str("BOOLEAN"),
            ColumnType::Byte | ColumnType::Short => out.push_str("SMALLINT"),
            ColumnType::Integer => out.push_str("INTEGER"),
            ColumnType::Long => out.push_str("BIGINT"),
            ColumnType::Float => out.push_str("REAL"),
            ColumnType::Double => out.push_str("DOUBLE PRECISION"),
            ColumnType::String | ColumnType::Enum(..) => out.push_str("TEXT"),
            ColumnType::Binary => out.push_str("BYTEA"),
            ColumnType::Temporal(TemporalKind::Date) => out.push_str("DATE"),
            ColumnType::Temporal(TemporalKind::Time) => out.push_str("TIME"),
            ColumnType::Temporal(TemporalKind::Timestamp) => out.push_str("TIMESTAMP"),
            ColumnType::Temporal(TemporalKind::TimestampWithTimezone) => {
                out.push_str("TIMESTAMP WITH TIME ZONE")
            }
            ColumnType::Uuid => out.push_str("UUID"),
            ColumnType::Custom("json") => out.push_str("JSONB"),
            ColumnType::Custom(name) | ColumnType::Unrecognized(name) => {
                out.push_str(&name.to_uppercase())
            }
        }
    }
}
