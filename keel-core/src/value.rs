use crate::AsValue;
use time::{Date, OffsetDateTime, PrimitiveDateTime, Time};
use uuid::Uuid;

/// Store-native value, used both for query parameters and for decoded columns.
///
/// Each variant but `Null` carries an `Option`: `None` is a NULL that still knows its type,
/// which lets drivers bind typed NULLs and lets empty values describe a column shape.
#[derive(Default, Debug, Clone, PartialEq)]
pub enum Value {
    #[default]
    Null,
    Boolean(Option<bool>),
    Int8(Option<i8>),
    Int16(Option<i16>),
    Int32(Option<i32>),
    Int64(Option<i64>),
    Float32(Option<f32>),
    Float64(Option<f64>),
    Varchar(Option<String>),
    Blob(Option<Box<[u8]>>),
    Date(Option<Date>),
    Time(Option<Time>),
    Timestamp(Option<PrimitiveDateTime>),
    TimestampWithTimezone(Option<OffsetDateTime>),
    Uuid(Option<Uuid>),
    /// Enum variant name.
    Enum(Option<String>),
    Json(Option<serde_json::Value>),
    List(Option<Vec<Value>>, /* type: */ Box<Value>),
}

impl Value {
    pub fn is_null(&self) -> bool {
        match self {
            Value::Null
            | Value::Boolean(None)
            | Value::Int8(None)
            | Value::Int16(None)
            | Value::Int32(None)
            | Value::Int64(None)
            | Value::Float32(None)
            | Value::Float64(None)
            | Value::Varchar(None)
            | Value::Blob(None)
            | Value::Date(None)
            | Value::Time(None)
            | Value::Timestamp(None)
            | Value::TimestampWithTimezone(None)
            | Value::Uuid(None)
            | Value::Enum(None)
            | Value::Json(None)
            | Value::List(None, ..) => true,
            _ => false,
        }
    }

    /// The same variant with its payload removed.
    pub fn as_empty(&self) -> Value {
        match self {
            Value::Null => Value::Null,
            Value::Boolean(..) => Value::Boolean(None),
            Value::Int8(..) => Value::Int8(None),
            Value::Int16(..) => Value::Int16(None),
            Value::Int32(..) => Value::Int32(None),
            Value::Int64(..) => Value::Int64(None),
            Value::Float32(..) => Value::Float32(None),
            Value::Float64(..) => Value::Float64(None),
            Value::Varchar(..) => Value::Varchar(None),
            Value::Blob(..) => Value::Blob(None),
            Value::Date(..) => Value::Date(None),
            Value::Time(..) => Value::Time(None),
            Value::Timestamp(..) => Value::Timestamp(None),
            Value::TimestampWithTimezone(..) => Value::TimestampWithTimezone(None),
            Value::Uuid(..) => Value::Uuid(None),
            Value::Enum(..) => Value::Enum(None),
            Value::Json(..) => Value::Json(None),
            Value::List(.., inner) => Value::List(None, inner.clone()),
        }
    }

    pub fn same_type(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::List(.., l), Self::List(.., r)) => l.same_type(r),
            _ => std::mem::discriminant(self) == std::mem::discriminant(other),
        }
    }

    /// Name of the variant, used in diagnostics.
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Null => "NULL",
            Value::Boolean(..) => "BOOLEAN",
            Value::Int8(..) => "INT8",
            Value::Int16(..) => "INT16",
            Value::Int32(..) => "INT32",
            Value::Int64(..) => "INT64",
            Value::Float32(..) => "FLOAT32",
            Value::Float64(..) => "FLOAT64",
            Value::Varchar(..) => "VARCHAR",
            Value::Blob(..) => "BLOB",
            Value::Date(..) => "DATE",
            Value::Time(..) => "TIME",
            Value::Timestamp(..) => "TIMESTAMP",
            Value::TimestampWithTimezone(..) => "TIMESTAMP WITH TIME ZONE",
            Value::Uuid(..) => "UUID",
            Value::Enum(..) => "ENUM",
            Value::Json(..) => "JSON",
            Value::List(..) => "LIST",
        }
    }

    /// Build a `List` out of a sequence of convertible values.
    pub fn list<T: AsValue>(values: impl IntoIterator<Item = T>) -> Value {
        Value::List(
            Some(values.into_iter().map(AsValue::as_value).collect()),
            Box::new(T::as_empty_value()),
        )
    }
}
