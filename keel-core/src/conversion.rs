use crate::{
    AsValue, ColumnDef, ColumnType, ConversionKey, Error, Result, TemporalKind, Value,
};
use anyhow::Context;
use std::{collections::HashMap, fmt, sync::Arc};
use time::{Date, OffsetDateTime, PrimitiveDateTime, Time};
use uuid::Uuid;

pub type ConversionFn = Arc<dyn Fn(Value, &ColumnDef) -> anyhow::Result<Value> + Send + Sync>;

/// Conversion applied to every non NULL value read from the store, selected by the column
/// type.
///
/// `Conversions::default()` knows every [`ColumnType`] except the custom ones other than
/// `json`, overrides are layered on top with [`Conversions::with`]. A value whose key has
/// no entry is passed through unchanged with a warning.
#[derive(Clone)]
pub struct Conversions {
    table: HashMap<ConversionKey, ConversionFn>,
}

macro_rules! native {
    ($ty:ty) => {
        Arc::new(|value: Value, _: &ColumnDef| -> anyhow::Result<Value> {
            Ok(<$ty>::try_from_value(value)?.as_value())
        }) as ConversionFn
    };
}

fn enum_variant(value: Value, column: &ColumnDef) -> anyhow::Result<Value> {
    let name = String::try_from_value(value)?;
    if let ColumnType::Enum(variants) = column.column_type {
        if !variants.is_empty() && !variants.contains(&name.as_str()) {
            return Err(anyhow::anyhow!(
                "`{name}` is not one of the variants {variants:?}"
            ));
        }
    }
    Ok(Value::Enum(Some(name)))
}

impl Default for Conversions {
    fn default() -> Self {
        let table: HashMap<ConversionKey, ConversionFn> = [
            (ConversionKey::Boolean, native!(bool)),
            (ConversionKey::Byte, native!(i8)),
            (ConversionKey::Short, native!(i16)),
            (ConversionKey::Integer, native!(i32)),
            (ConversionKey::Long, native!(i64)),
            (ConversionKey::Float, native!(f32)),
            (ConversionKey::Double, native!(f64)),
            (ConversionKey::String, native!(String)),
            (ConversionKey::Binary, native!(Box<[u8]>)),
            (ConversionKey::Temporal(TemporalKind::Date), native!(Date)),
            (ConversionKey::Temporal(TemporalKind::Time), native!(Time)),
            (
                ConversionKey::Temporal(TemporalKind::Timestamp),
                native!(PrimitiveDateTime),
            ),
            (
                ConversionKey::Temporal(TemporalKind::TimestampWithTimezone),
                native!(OffsetDateTime),
            ),
            (ConversionKey::Uuid, native!(Uuid)),
            (ConversionKey::Enum, Arc::new(enum_variant) as ConversionFn),
            (ConversionKey::Custom("json".into()), native!(serde_json::Value)),
        ]
        .into_iter()
        .collect();
        Self { table }
    }
}

impl Conversions {
    /// A table without any entry, every value passes through.
    pub fn empty() -> Self {
        Self {
            table: HashMap::new(),
        }
    }

    pub fn with<F>(mut self, key: ConversionKey, f: F) -> Self
    where
        F: Fn(Value, &ColumnDef) -> anyhow::Result<Value> + Send + Sync + 'static,
    {
        self.table.insert(key, Arc::new(f));
        self
    }

    pub fn get(&self, key: &ConversionKey) -> Option<&ConversionFn> {
        self.table.get(key)
    }

    pub fn convert(&self, value: Value, column: &ColumnDef) -> Result<Value> {
        if value.is_null() {
            return Ok(match column.column_type.empty_value() {
                Value::Null => value,
                empty => empty,
            });
        }
        let key = column.column_type.key();
        let Some(f) = self.table.get(&key) else {
            log::warn!(
                "No conversion for column `{}` of type {:?}, the value is kept as {}",
                column.name,
                column.column_type,
                value.type_name(),
            );
            return Ok(value);
        };
        f(value, column)
            .with_context(|| format!("Cannot convert the value of column `{}`", column.name))
            .map_err(|e| Error::Conversion(Arc::new(e)))
    }
}

impl fmt::Debug for Conversions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Conversions")
            .field("keys", &self.table.keys().collect::<Vec<_>>())
            .finish()
    }
}
