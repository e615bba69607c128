use crate::Value;
use std::borrow::Cow;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TableRef {
    pub name: &'static str,
    /// Empty when the table lives in the default schema.
    pub schema: &'static str,
}

impl TableRef {
    pub const fn new(name: &'static str) -> Self {
        Self { name, schema: "" }
    }
    pub fn full_name(&self) -> String {
        let mut result = String::new();
        if !self.schema.is_empty() {
            result.push_str(self.schema);
            result.push('.');
        }
        result.push_str(self.name);
        result
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TemporalKind {
    Date,
    Time,
    Timestamp,
    TimestampWithTimezone,
}

/// Declared type of a column, as emitted by the generator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnType {
    Boolean,
    Byte,
    Short,
    Integer,
    Long,
    Float,
    Double,
    String,
    Binary,
    Temporal(TemporalKind),
    Uuid,
    /// Names of the declared variants.
    Enum(&'static [&'static str]),
    /// Type handled by a named converter (for instance `json`).
    Custom(&'static str),
    /// A type the generator did not know about, carried by name.
    Unrecognized(&'static str),
}

/// Key selecting the conversion function of a column.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ConversionKey {
    Boolean,
    Byte,
    Short,
    Integer,
    Long,
    Float,
    Double,
    String,
    Binary,
    Temporal(TemporalKind),
    Uuid,
    Enum,
    Custom(Cow<'static, str>),
    Unrecognized,
}

impl ColumnType {
    pub fn key(&self) -> ConversionKey {
        match self {
            ColumnType::Boolean => ConversionKey::Boolean,
            ColumnType::Byte => ConversionKey::Byte,
            ColumnType::Short => ConversionKey::Short,
            ColumnType::Integer => ConversionKey::Integer,
            ColumnType::Long => ConversionKey::Long,
            ColumnType::Float => ConversionKey::Float,
            ColumnType::Double => ConversionKey::Double,
            ColumnType::String => ConversionKey::String,
            ColumnType::Binary => ConversionKey::Binary,
            ColumnType::Temporal(kind) => ConversionKey::Temporal(*kind),
            ColumnType::Uuid => ConversionKey::Uuid,
            ColumnType::Enum(..) => ConversionKey::Enum,
            ColumnType::Custom(name) => ConversionKey::Custom(Cow::Borrowed(*name)),
            ColumnType::Unrecognized(..) => ConversionKey::Unrecognized,
        }
    }

    /// Typed NULL of the value this column holds.
    pub fn empty_value(&self) -> Value {
        match self {
            ColumnType::Boolean => Value::Boolean(None),
            ColumnType::Byte => Value::Int8(None),
            ColumnType::Short => Value::Int16(None),
            ColumnType::Integer => Value::Int32(None),
            ColumnType::Long => Value::Int64(None),
            ColumnType::Float => Value::Float32(None),
            ColumnType::Double => Value::Float64(None),
            ColumnType::String => Value::Varchar(None),
            ColumnType::Binary => Value::Blob(None),
            ColumnType::Temporal(TemporalKind::Date) => Value::Date(None),
            ColumnType::Temporal(TemporalKind::Time) => Value::Time(None),
            ColumnType::Temporal(TemporalKind::Timestamp) => Value::Timestamp(None),
            ColumnType::Temporal(TemporalKind::TimestampWithTimezone) => {
                Value::TimestampWithTimezone(None)
            }
            ColumnType::Uuid => Value::Uuid(None),
            ColumnType::Enum(..) => Value::Enum(None),
            ColumnType::Custom("json") => Value::Json(None),
            ColumnType::Custom(..) | ColumnType::Unrecognized(..) => Value::Null,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ColumnDef {
    pub name: &'static str,
    pub column_type: ColumnType,
    pub nullable: bool,
    pub primary_key: bool,
    pub unique: bool,
    /// The store assigns the value when the insert leaves it out.
    pub auto_increment: bool,
}

impl ColumnDef {
    pub const fn new(name: &'static str, column_type: ColumnType) -> Self {
        Self {
            name,
            column_type,
            nullable: false,
            primary_key: false,
            unique: false,
            auto_increment: false,
        }
    }
    pub const fn nullable(mut self) -> Self {
        self.nullable = true;
        self
    }
    pub const fn primary_key(mut self) -> Self {
        self.primary_key = true;
        self
    }
    pub const fn unique(mut self) -> Self {
        self.unique = true;
        self
    }
    pub const fn auto_increment(mut self) -> Self {
        self.auto_increment = true;
        self
    }
}
