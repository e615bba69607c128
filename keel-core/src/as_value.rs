use crate::{Error, Result, Value, truncate_long};
use std::any;
use time::{
    Date, OffsetDateTime, PrimitiveDateTime, Time,
    format_description::{BorrowedFormatItem, well_known::Rfc3339},
    macros::format_description,
};
use uuid::Uuid;

const DATE_FORMAT: &[BorrowedFormatItem<'static>] = format_description!("[year]-[month]-[day]");
const TIME_FORMAT: &[BorrowedFormatItem<'static>] =
    format_description!("[hour]:[minute]:[second].[subsecond]");
const TIMESTAMP_FORMAT: &[BorrowedFormatItem<'static>] =
    format_description!("[year]-[month]-[day]T[hour]:[minute]:[second].[subsecond]");

/// Conversion between native Rust types and the dynamically typed [`Value`].
///
/// # Contract
/// - `as_empty_value` returns the typed NULL for the type, it must not allocate.
/// - `as_value` is never lossy.
/// - `try_from_value` accepts the canonical variant and, where it makes sense, other
///   widths and textual forms (stores like sqlite return temporal values as text).
///   Range checks happen before any numeric narrowing.
///
/// # Examples
/// ```rust
/// use keel_core::{AsValue, Value};
/// let v = 42i32.as_value();
/// assert!(matches!(v, Value::Int32(Some(42))));
/// let n: i16 = AsValue::try_from_value(v).unwrap();
/// assert_eq!(n, 42);
/// ```
pub trait AsValue {
    fn as_empty_value() -> Value;
    fn as_value(self) -> Value;
    fn try_from_value(value: Value) -> Result<Self>
    where
        Self: Sized;
    /// Parse the textual representation.
    fn parse(input: &str) -> Result<Self>
    where
        Self: Sized,
    {
        Err(Error::msg(format!(
            "Cannot parse `{}` as {}",
            truncate_long!(input),
            any::type_name::<Self>()
        )))
    }
}

impl<T: AsValue> From<T> for Value {
    fn from(value: T) -> Self {
        value.as_value()
    }
}

fn mismatch<T>(value: &Value) -> Error {
    Error::msg(format!(
        "Cannot convert {value:?} to {}",
        any::type_name::<T>()
    ))
}

macro_rules! impl_as_value_integer {
    ($source:ty, $destination:path) => {
        impl AsValue for $source {
            fn as_empty_value() -> Value {
                $destination(None)
            }
            fn as_value(self) -> Value {
                $destination(Some(self))
            }
            fn try_from_value(value: Value) -> Result<Self> {
                let wide: i64 = match value {
                    Value::Int8(Some(v)) => v as i64,
                    Value::Int16(Some(v)) => v as i64,
                    Value::Int32(Some(v)) => v as i64,
                    Value::Int64(Some(v)) => v,
                    Value::Boolean(Some(v)) => v as i64,
                    Value::Varchar(Some(ref v)) => return Self::parse(v),
                    _ => return Err(mismatch::<Self>(&value)),
                };
                <$source>::try_from(wide).map_err(|_| {
                    Error::msg(format!(
                        "Value {wide} is out of range for {}",
                        any::type_name::<Self>()
                    ))
                })
            }
            fn parse(input: &str) -> Result<Self> {
                input.trim().parse::<$source>().map_err(|e| {
                    Error::msg(format!(
                        "Cannot parse `{}` as {}: {e}",
                        truncate_long!(input),
                        any::type_name::<Self>()
                    ))
                })
            }
        }
    };
}
impl_as_value_integer!(i8, Value::Int8);
impl_as_value_integer!(i16, Value::Int16);
impl_as_value_integer!(i32, Value::Int32);
impl_as_value_integer!(i64, Value::Int64);

macro_rules! impl_as_value_float {
    ($source:ty, $destination:path) => {
        impl AsValue for $source {
            fn as_empty_value() -> Value {
                $destination(None)
            }
            fn as_value(self) -> Value {
                $destination(Some(self))
            }
            fn try_from_value(value: Value) -> Result<Self> {
                Ok(match value {
                    Value::Float32(Some(v)) => v as _,
                    Value::Float64(Some(v)) => v as _,
                    Value::Int8(Some(v)) => v as _,
                    Value::Int16(Some(v)) => v as _,
                    Value::Int32(Some(v)) => v as _,
                    Value::Int64(Some(v)) => v as _,
                    Value::Varchar(Some(ref v)) => return Self::parse(v),
                    _ => return Err(mismatch::<Self>(&value)),
                })
            }
            fn parse(input: &str) -> Result<Self> {
                input.trim().parse::<$source>().map_err(|e| {
                    Error::msg(format!(
                        "Cannot parse `{}` as {}: {e}",
                        truncate_long!(input),
                        any::type_name::<Self>()
                    ))
                })
            }
        }
    };
}
impl_as_value_float!(f32, Value::Float32);
impl_as_value_float!(f64, Value::Float64);

impl AsValue for bool {
    fn as_empty_value() -> Value {
        Value::Boolean(None)
    }
    fn as_value(self) -> Value {
        Value::Boolean(Some(self))
    }
    fn try_from_value(value: Value) -> Result<Self> {
        match value {
            Value::Boolean(Some(v)) => Ok(v),
            Value::Int8(Some(v)) => Ok(v != 0),
            Value::Int16(Some(v)) => Ok(v != 0),
            Value::Int32(Some(v)) => Ok(v != 0),
            Value::Int64(Some(v)) => Ok(v != 0),
            Value::Varchar(Some(ref v)) => Self::parse(v),
            _ => Err(mismatch::<Self>(&value)),
        }
    }
    fn parse(input: &str) -> Result<Self> {
        match input.trim() {
            v if v.eq_ignore_ascii_case("true") || v == "1" => Ok(true),
            v if v.eq_ignore_ascii_case("false") || v == "0" => Ok(false),
            _ => Err(Error::msg(format!(
                "Cannot parse `{}` as bool",
                truncate_long!(input)
            ))),
        }
    }
}

impl AsValue for String {
    fn as_empty_value() -> Value {
        Value::Varchar(None)
    }
    fn as_value(self) -> Value {
        Value::Varchar(Some(self))
    }
    fn try_from_value(value: Value) -> Result<Self> {
        match value {
            Value::Varchar(Some(v)) | Value::Enum(Some(v)) => Ok(v),
            Value::Json(Some(serde_json::Value::String(v))) => Ok(v),
            _ => Err(mismatch::<Self>(&value)),
        }
    }
    fn parse(input: &str) -> Result<Self> {
        Ok(input.to_owned())
    }
}

/// Write only, a borrowed string cannot be read back out of a [`Value`].
impl AsValue for &str {
    fn as_empty_value() -> Value {
        Value::Varchar(None)
    }
    fn as_value(self) -> Value {
        Value::Varchar(Some(self.to_owned()))
    }
    fn try_from_value(value: Value) -> Result<Self> {
        Err(mismatch::<Self>(&value))
    }
}

impl AsValue for Box<[u8]> {
    fn as_empty_value() -> Value {
        Value::Blob(None)
    }
    fn as_value(self) -> Value {
        Value::Blob(Some(self))
    }
    fn try_from_value(value: Value) -> Result<Self> {
        match value {
            Value::Blob(Some(v)) => Ok(v),
            _ => Err(mismatch::<Self>(&value)),
        }
    }
}

impl AsValue for Vec<u8> {
    fn as_empty_value() -> Value {
        Value::Blob(None)
    }
    fn as_value(self) -> Value {
        Value::Blob(Some(self.into_boxed_slice()))
    }
    fn try_from_value(value: Value) -> Result<Self> {
        Box::<[u8]>::try_from_value(value).map(Into::into)
    }
}

macro_rules! parse_temporal {
    ($ty:ty, $input:expr, $($format:expr),+ $(,)?) => {{
        let input: &str = $input.trim();
        None
            $(.or_else(|| <$ty>::parse(input, $format).ok()))+
            .ok_or_else(|| {
                Error::msg(format!(
                    "Cannot parse `{}` as {}",
                    truncate_long!(input),
                    any::type_name::<$ty>()
                ))
            })
    }};
}

macro_rules! impl_as_value_temporal {
    ($source:ty, $destination:path $(, $pat_rest:pat => $expr_rest:expr)* $(,)?) => {
        impl AsValue for $source {
            fn as_empty_value() -> Value {
                $destination(None)
            }
            fn as_value(self) -> Value {
                $destination(Some(self))
            }
            fn try_from_value(value: Value) -> Result<Self> {
                match value {
                    $destination(Some(v)) => Ok(v),
                    Value::Varchar(Some(ref v)) => <Self as AsValue>::parse(v),
                    $($pat_rest => $expr_rest,)*
                    _ => Err(mismatch::<Self>(&value)),
                }
            }
            fn parse(input: &str) -> Result<Self> {
                parse_temporal_value(input)
            }
        }
    };
}

trait ParseTemporal: Sized {
    fn parse_temporal(input: &str) -> Result<Self>;
}

fn parse_temporal_value<T: ParseTemporal>(input: &str) -> Result<T> {
    T::parse_temporal(input)
}

impl ParseTemporal for Date {
    fn parse_temporal(input: &str) -> Result<Self> {
        parse_temporal!(Date, input, DATE_FORMAT)
    }
}

impl ParseTemporal for Time {
    fn parse_temporal(input: &str) -> Result<Self> {
        parse_temporal!(
            Time,
            input,
            TIME_FORMAT,
            format_description!("[hour]:[minute]:[second]"),
            format_description!("[hour]:[minute]"),
        )
    }
}

impl ParseTemporal for PrimitiveDateTime {
    fn parse_temporal(input: &str) -> Result<Self> {
        parse_temporal!(
            PrimitiveDateTime,
            input,
            TIMESTAMP_FORMAT,
            format_description!("[year]-[month]-[day]T[hour]:[minute]:[second]"),
            format_description!("[year]-[month]-[day] [hour]:[minute]:[second].[subsecond]"),
            format_description!("[year]-[month]-[day] [hour]:[minute]:[second]"),
        )
    }
}

impl ParseTemporal for OffsetDateTime {
    fn parse_temporal(input: &str) -> Result<Self> {
        parse_temporal!(
            OffsetDateTime,
            input,
            &Rfc3339,
            format_description!(
                "[year]-[month]-[day] [hour]:[minute]:[second].[subsecond][offset_hour sign:mandatory]:[offset_minute]"
            ),
            format_description!(
                "[year]-[month]-[day] [hour]:[minute]:[second][offset_hour sign:mandatory]:[offset_minute]"
            ),
            format_description!(
                "[year]-[month]-[day] [hour]:[minute]:[second][offset_hour sign:mandatory]"
            ),
        )
    }
}

impl_as_value_temporal!(Date, Value::Date);
impl_as_value_temporal!(Time, Value::Time);
impl_as_value_temporal!(PrimitiveDateTime, Value::Timestamp);
impl_as_value_temporal!(
    OffsetDateTime,
    Value::TimestampWithTimezone,
    Value::Timestamp(Some(v)) => Ok(v.assume_utc()),
);

/// Canonical text form of a temporal value, `None` for any other variant or a NULL.
///
/// Text produced here is always accepted back by [`AsValue::parse`].
pub fn format_temporal(value: &Value) -> Option<String> {
    match value {
        Value::Date(Some(v)) => v.format(DATE_FORMAT).ok(),
        Value::Time(Some(v)) => v.format(TIME_FORMAT).ok(),
        Value::Timestamp(Some(v)) => v.format(TIMESTAMP_FORMAT).ok(),
        Value::TimestampWithTimezone(Some(v)) => v.format(&Rfc3339).ok(),
        _ => None,
    }
}

impl AsValue for Uuid {
    fn as_empty_value() -> Value {
        Value::Uuid(None)
    }
    fn as_value(self) -> Value {
        Value::Uuid(Some(self))
    }
    fn try_from_value(value: Value) -> Result<Self> {
        match value {
            Value::Uuid(Some(v)) => Ok(v),
            Value::Varchar(Some(ref v)) => Self::parse(v),
            Value::Blob(Some(ref v)) => Uuid::from_slice(v).map_err(|e| {
                Error::msg(format!("Cannot convert a {} bytes blob to Uuid: {e}", v.len()))
            }),
            _ => Err(mismatch::<Self>(&value)),
        }
    }
    fn parse(input: &str) -> Result<Self> {
        Uuid::parse_str(input.trim()).map_err(|e| {
            Error::msg(format!(
                "Cannot parse `{}` as Uuid: {e}",
                truncate_long!(input)
            ))
        })
    }
}

impl AsValue for serde_json::Value {
    fn as_empty_value() -> Value {
        Value::Json(None)
    }
    fn as_value(self) -> Value {
        Value::Json(Some(self))
    }
    fn try_from_value(value: Value) -> Result<Self> {
        match value {
            Value::Json(Some(v)) => Ok(v),
            Value::Varchar(Some(ref v)) => Self::parse(v),
            _ => Err(mismatch::<Self>(&value)),
        }
    }
    fn parse(input: &str) -> Result<Self> {
        serde_json::from_str(input).map_err(|e| {
            Error::msg(format!(
                "Cannot parse `{}` as json: {e}",
                truncate_long!(input)
            ))
        })
    }
}

impl<T: AsValue> AsValue for Option<T> {
    fn as_empty_value() -> Value {
        T::as_empty_value()
    }
    fn as_value(self) -> Value {
        match self {
            Some(v) => v.as_value(),
            None => T::as_empty_value(),
        }
    }
    fn try_from_value(value: Value) -> Result<Self> {
        Ok(if value.is_null() {
            None
        } else {
            Some(T::try_from_value(value)?)
        })
    }
    fn parse(input: &str) -> Result<Self> {
        if input.trim().eq_ignore_ascii_case("null") {
            return Ok(None);
        }
        T::parse(input).map(Some)
    }
}
