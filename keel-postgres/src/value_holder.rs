use bytes::BytesMut;
use keel_core::Value;
use postgres_types::{FromSql, IsNull, ToSql, Type, to_sql_checked};
use serde_json::Value as Json;
use std::{error::Error, io::Read};
use time::{Date, OffsetDateTime, PrimitiveDateTime, Time, UtcOffset};
use uuid::Uuid;

type BoxError = Box<dyn Error + Sync + Send>;

/// Bridges [`Value`] and the binary protocol of tokio-postgres.
///
/// When binding, the value is coerced to the type the server inferred for the placeholder,
/// so for instance an `Int32` can be compared against a `BIGINT` column.
#[derive(Debug, Clone, PartialEq)]
pub struct ValueHolder(pub Value);

impl From<Value> for ValueHolder {
    fn from(value: Value) -> Self {
        ValueHolder(value)
    }
}

impl From<ValueHolder> for Value {
    fn from(value: ValueHolder) -> Self {
        value.0
    }
}

fn is_text(ty: &Type) -> bool {
    matches!(*ty, Type::TEXT | Type::VARCHAR | Type::BPCHAR | Type::NAME)
}

fn integer_to_sql(v: i64, ty: &Type, out: &mut BytesMut) -> Result<IsNull, BoxError> {
    match *ty {
        Type::BOOL => (v != 0).to_sql(ty, out),
        Type::CHAR => i8::try_from(v)?.to_sql(ty, out),
        Type::INT2 => i16::try_from(v)?.to_sql(ty, out),
        Type::INT4 => i32::try_from(v)?.to_sql(ty, out),
        Type::FLOAT4 => (v as f32).to_sql(ty, out),
        Type::FLOAT8 => (v as f64).to_sql(ty, out),
        _ if is_text(ty) => v.to_string().to_sql(ty, out),
        _ => v.to_sql(ty, out),
    }
}

fn float_to_sql(v: f64, ty: &Type, out: &mut BytesMut) -> Result<IsNull, BoxError> {
    match *ty {
        Type::FLOAT4 => (v as f32).to_sql(ty, out),
        _ if is_text(ty) => v.to_string().to_sql(ty, out),
        _ => v.to_sql(ty, out),
    }
}

fn text_to_sql(v: &str, ty: &Type, out: &mut BytesMut) -> Result<IsNull, BoxError> {
    match *ty {
        Type::UUID => Uuid::parse_str(v)?.to_sql(ty, out),
        Type::JSON | Type::JSONB => serde_json::from_str::<Json>(v)
            .unwrap_or_else(|_| Json::String(v.to_owned()))
            .to_sql(ty, out),
        _ => v.to_sql(ty, out),
    }
}

impl ToSql for ValueHolder {
    fn to_sql(&self, ty: &Type, out: &mut BytesMut) -> Result<IsNull, BoxError>
    where
        Self: Sized,
    {
        match &self.0 {
            v if v.is_null() => Ok(IsNull::Yes),
            Value::Boolean(Some(v)) if *ty == Type::BOOL => v.to_sql(ty, out),
            Value::Boolean(Some(v)) => integer_to_sql(*v as i64, ty, out),
            Value::Int8(Some(v)) => integer_to_sql(*v as i64, ty, out),
            Value::Int16(Some(v)) => integer_to_sql(*v as i64, ty, out),
            Value::Int32(Some(v)) => integer_to_sql(*v as i64, ty, out),
            Value::Int64(Some(v)) => integer_to_sql(*v, ty, out),
            Value::Float32(Some(v)) => float_to_sql(*v as f64, ty, out),
            Value::Float64(Some(v)) => float_to_sql(*v, ty, out),
            Value::Varchar(Some(v)) | Value::Enum(Some(v)) => text_to_sql(v, ty, out),
            Value::Blob(Some(v)) => {
                let v: &[u8] = v;
                v.to_sql(ty, out)
            }
            Value::Date(Some(v)) => v.to_sql(ty, out),
            Value::Time(Some(v)) => v.to_sql(ty, out),
            Value::Timestamp(Some(v)) if *ty == Type::TIMESTAMPTZ => {
                v.assume_utc().to_sql(ty, out)
            }
            Value::Timestamp(Some(v)) => v.to_sql(ty, out),
            Value::TimestampWithTimezone(Some(v)) if *ty == Type::TIMESTAMP => {
                let v = v.to_offset(UtcOffset::UTC);
                PrimitiveDateTime::new(v.date(), v.time()).to_sql(ty, out)
            }
            Value::TimestampWithTimezone(Some(v)) => v.to_sql(ty, out),
            Value::Uuid(Some(v)) if is_text(ty) => v.to_string().to_sql(ty, out),
            Value::Uuid(Some(v)) => v.to_sql(ty, out),
            Value::Json(Some(v)) if is_text(ty) => v.to_string().to_sql(ty, out),
            Value::Json(Some(v)) => v.to_sql(ty, out),
            Value::List(Some(v), ..) => v
                .iter()
                .cloned()
                .map(ValueHolder)
                .collect::<Vec<_>>()
                .to_sql(ty, out),
            v => Err(format!(
                "keel::Value variant `{}` is not supported by Postgres",
                v.type_name()
            )
            .into()),
        }
    }

    fn accepts(_ty: &Type) -> bool
    where
        Self: Sized,
    {
        true
    }

    to_sql_checked!();
}

impl<'a> FromSql<'a> for ValueHolder {
    fn from_sql(ty: &Type, raw: &'a [u8]) -> Result<Self, BoxError> {
        Self::from_sql_nullable(ty, Some(raw))
    }
    fn from_sql_null(ty: &Type) -> Result<Self, BoxError> {
        Self::from_sql_nullable(ty, None)
    }
    fn from_sql_nullable(ty: &Type, raw: Option<&'a [u8]>) -> Result<Self, BoxError> {
        macro_rules! to_value {
            ($ty_var:ident, $raw:ident, $($($ty:path)|+ => ( $value:path, $source:ty $(, $additional:expr)* ) ,)+) => {
                match *$ty_var {
                    $($($ty)|+ => $value(if let Some($raw) = $raw { Some(<$source>::from_sql($ty_var, $raw)?.into()) } else { None } $(, $additional)*),)+
                    _ => {
                        if let Some(mut raw) = $raw {
                            let mut buf = String::new();
                            let _ = raw.read_to_string(&mut buf);
                            return Err(format!("Cannot decode sql type: `{}`, value: `{}`", $ty_var, buf).into());
                        }
                        Value::Null
                    }
                }
            };
        }
        let value = to_value!(ty, raw,
            Type::BOOL => (Value::Boolean, bool),
            Type::CHAR => (Value::Int8, i8),
            Type::INT2 => (Value::Int16, i16),
            Type::INT4 => (Value::Int32, i32),
            Type::INT8 => (Value::Int64, i64),
            Type::OID => (Value::Int64, u32),
            Type::FLOAT4 => (Value::Float32, f32),
            Type::FLOAT8 => (Value::Float64, f64),
            Type::VARCHAR
            | Type::TEXT
            | Type::NAME
            | Type::BPCHAR
            | Type::XML => (Value::Varchar, String),
            Type::JSON | Type::JSONB => (Value::Json, Json),
            Type::BYTEA => (Value::Blob, Vec<u8>),
            Type::DATE => (Value::Date, Date),
            Type::TIME => (Value::Time, Time),
            Type::TIMESTAMP => (Value::Timestamp, PrimitiveDateTime),
            Type::TIMESTAMPTZ => (Value::TimestampWithTimezone, OffsetDateTime),
            Type::UUID => (Value::Uuid, Uuid),
            Type::BOOL_ARRAY => (Value::List, VecWrap<ValueHolder>, Box::new(Value::Boolean(None))),
            Type::INT2_ARRAY => (Value::List, VecWrap<ValueHolder>, Box::new(Value::Int16(None))),
            Type::INT4_ARRAY => (Value::List, VecWrap<ValueHolder>, Box::new(Value::Int32(None))),
            Type::INT8_ARRAY => (Value::List, VecWrap<ValueHolder>, Box::new(Value::Int64(None))),
            Type::FLOAT4_ARRAY => (Value::List, VecWrap<ValueHolder>, Box::new(Value::Float32(None))),
            Type::FLOAT8_ARRAY => (Value::List, VecWrap<ValueHolder>, Box::new(Value::Float64(None))),
            Type::TEXT_ARRAY | Type::VARCHAR_ARRAY => (Value::List, VecWrap<ValueHolder>, Box::new(Value::Varchar(None))),
            Type::UUID_ARRAY => (Value::List, VecWrap<ValueHolder>, Box::new(Value::Uuid(None))),
        );
        Ok(value.into())
    }

    fn accepts(_ty: &Type) -> bool {
        true
    }
}

struct VecWrap<T>(pub Vec<T>);

impl<'a, T: FromSql<'a>> FromSql<'a> for VecWrap<T> {
    fn from_sql_null(ty: &Type) -> Result<Self, BoxError> {
        Vec::<T>::from_sql_null(ty).map(VecWrap)
    }
    fn from_sql_nullable(ty: &Type, raw: Option<&'a [u8]>) -> Result<Self, BoxError> {
        Vec::<T>::from_sql_nullable(ty, raw).map(VecWrap)
    }
    fn from_sql(ty: &Type, raw: &'a [u8]) -> Result<Self, BoxError> {
        Vec::<T>::from_sql(ty, raw).map(VecWrap)
    }
    fn accepts(ty: &Type) -> bool {
        Vec::<T>::accepts(ty)
    }
}

impl From<VecWrap<ValueHolder>> for Vec<Value> {
    fn from(value: VecWrap<ValueHolder>) -> Self {
        value.0.into_iter().map(|v| v.0).collect()
    }
}
