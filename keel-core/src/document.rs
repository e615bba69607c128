use crate::{
    ColumnDef, ColumnType, ConversionKey, Conversions, Entity, Error, Result, Value,
    format_temporal,
};
use base64::{Engine, engine::general_purpose::STANDARD};
use serde_json::{Map, Number, Value as Json};
use std::{collections::HashMap, sync::Arc};

pub type Document = Map<String, Json>;

type Encode = Arc<dyn Fn(&Value) -> Json + Send + Sync>;
type Decode = Arc<dyn Fn(&Json, &ColumnDef) -> anyhow::Result<Value> + Send + Sync>;

#[derive(Clone)]
struct Codec {
    encode: Encode,
    decode: Decode,
}

/// Flat JSON representation of records, keyed by column name.
///
/// Enums are written by variant name, binary columns as base64, temporal values in ISO 8601
/// and UUIDs as strings. Columns of an unrecognized type are skipped with a warning.
#[derive(Clone, Default)]
pub struct DocumentMapper {
    conversions: Conversions,
    codecs: HashMap<ConversionKey, Codec>,
}

impl DocumentMapper {
    pub fn new(conversions: Conversions) -> Self {
        Self {
            conversions,
            codecs: HashMap::new(),
        }
    }

    /// Replace the JSON form of the columns selected by `key`.
    pub fn with_codec<Enc, Dec>(mut self, key: ConversionKey, encode: Enc, decode: Dec) -> Self
    where
        Enc: Fn(&Value) -> Json + Send + Sync + 'static,
        Dec: Fn(&Json, &ColumnDef) -> anyhow::Result<Value> + Send + Sync + 'static,
    {
        self.codecs.insert(
            key,
            Codec {
                encode: Arc::new(encode),
                decode: Arc::new(decode),
            },
        );
        self
    }

    pub fn to_document<E: Entity>(&self, entity: &E) -> Document {
        let mut result = Map::new();
        for (column, value) in E::columns().iter().zip(entity.row_full()) {
            if let Some(codec) = self.codecs.get(&column.column_type.key()) {
                result.insert(column.name.into(), (codec.encode)(&value));
                continue;
            }
            if let ColumnType::Unrecognized(name) = column.column_type {
                log::warn!(
                    "Column `{}` has the unrecognized type `{name}` and is left out of the document",
                    column.name
                );
                continue;
            }
            result.insert(column.name.into(), encode(&value));
        }
        result
    }

    pub fn from_document<E: Entity>(&self, document: &Document) -> Result<E> {
        let values = E::columns()
            .iter()
            .map(|column| self.decode_column(document, column))
            .collect::<Result<Box<[Value]>>>()?;
        E::from_values(values)
    }

    fn decode_column(&self, document: &Document, column: &ColumnDef) -> Result<Value> {
        let json = document.get(column.name).unwrap_or(&Json::Null);
        if let Some(codec) = self.codecs.get(&column.column_type.key()) {
            return (codec.decode)(json, column).map_err(|e| {
                Error::Conversion(Arc::new(
                    e.context(format!("Cannot decode the field `{}`", column.name)),
                ))
            });
        }
        let value = match column.column_type {
            ColumnType::Unrecognized(name) => {
                log::warn!(
                    "Column `{}` has the unrecognized type `{name}` and is not read from the document",
                    column.name
                );
                return Ok(Value::Null);
            }
            _ if json.is_null() => Value::Null,
            ColumnType::Binary => match json {
                Json::String(v) => Value::Blob(Some(
                    STANDARD
                        .decode(v)
                        .map_err(|e| {
                            Error::msg(format!(
                                "The field `{}` is not valid base64: {e}",
                                column.name
                            ))
                        })?
                        .into_boxed_slice(),
                )),
                _ => {
                    return Err(Error::msg(format!(
                        "The field `{}` must be a base64 string",
                        column.name
                    )));
                }
            },
            ColumnType::Custom("json") => Value::Json(Some(json.clone())),
            _ => decode(json),
        };
        self.conversions.convert(value, column)
    }
}

fn encode(value: &Value) -> Json {
    match value {
        v if v.is_null() => Json::Null,
        Value::Boolean(Some(v)) => Json::Bool(*v),
        Value::Int8(Some(v)) => Json::from(*v),
        Value::Int16(Some(v)) => Json::from(*v),
        Value::Int32(Some(v)) => Json::from(*v),
        Value::Int64(Some(v)) => Json::from(*v),
        // JSON numbers are finite, NaN and infinities are written as text
        Value::Float32(Some(v)) => Number::from_f64(*v as f64)
            .map_or_else(|| Json::String(v.to_string()), Json::Number),
        Value::Float64(Some(v)) => {
            Number::from_f64(*v).map_or_else(|| Json::String(v.to_string()), Json::Number)
        }
        Value::Varchar(Some(v)) | Value::Enum(Some(v)) => Json::String(v.clone()),
        Value::Blob(Some(v)) => Json::String(STANDARD.encode(v)),
        Value::Uuid(Some(v)) => Json::String(v.to_string()),
        Value::Json(Some(v)) => v.clone(),
        Value::List(Some(v), ..) => Json::Array(v.iter().map(encode).collect()),
        v => format_temporal(v).map_or(Json::Null, Json::String),
    }
}

fn decode(json: &Json) -> Value {
    match json {
        Json::Null => Value::Null,
        Json::Bool(v) => Value::Boolean(Some(*v)),
        Json::Number(v) => match v.as_i64() {
            Some(v) => Value::Int64(Some(v)),
            None => Value::Float64(v.as_f64()),
        },
        Json::String(v) => Value::Varchar(Some(v.clone())),
        Json::Array(v) => Value::List(
            Some(v.iter().map(decode).collect()),
            Box::new(Value::Null),
        ),
        Json::Object(..) => Value::Json(Some(json.clone())),
    }
}
