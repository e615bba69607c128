use keel::{AsValue, ColumnDef, ColumnType, Entity, Error, Result, Row, TableRef, TemporalKind};
use time::{Date, PrimitiveDateTime};
use uuid::Uuid;

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum Mood {
    #[default]
    Happy,
    Sad,
    Calm,
}

impl Mood {
    pub const VARIANTS: &'static [&'static str] = &["HAPPY", "SAD", "CALM"];

    pub fn as_str(&self) -> &'static str {
        match self {
            Mood::Happy => "HAPPY",
            Mood::Sad => "SAD",
            Mood::Calm => "CALM",
        }
    }

    pub fn from_name(name: &str) -> Result<Self> {
        Ok(match name {
            "HAPPY" => Mood::Happy,
            "SAD" => Mood::Sad,
            "CALM" => Mood::Calm,
            _ => return Err(Error::msg(format!("Unknown mood `{name}`"))),
        })
    }
}

/// Record with one column of every supported type, shaped like generated code.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct Something {
    pub id: Option<i64>,
    pub name: String,
    pub age: i32,
    pub nickname: Option<String>,
    pub score: f64,
    pub flag: bool,
    pub mood: Mood,
    pub avatar: Option<Vec<u8>>,
    pub created: Option<PrimitiveDateTime>,
    pub birthday: Option<Date>,
    pub token: Option<Uuid>,
    pub settings: Option<serde_json::Value>,
}

static TABLE: TableRef = TableRef::new("keel_something");

static COLUMNS: [ColumnDef; 12] = [
    ColumnDef::new("id", ColumnType::Long)
        .primary_key()
        .auto_increment(),
    ColumnDef::new("name", ColumnType::String).unique(),
    ColumnDef::new("age", ColumnType::Integer),
    ColumnDef::new("nickname", ColumnType::String).nullable(),
    ColumnDef::new("score", ColumnType::Double),
    ColumnDef::new("flag", ColumnType::Boolean),
    ColumnDef::new("mood", ColumnType::Enum(Mood::VARIANTS)),
    ColumnDef::new("avatar", ColumnType::Binary).nullable(),
    ColumnDef::new("created", ColumnType::Temporal(TemporalKind::Timestamp)).nullable(),
    ColumnDef::new("birthday", ColumnType::Temporal(TemporalKind::Date)).nullable(),
    ColumnDef::new("token", ColumnType::Uuid).nullable(),
    ColumnDef::new("settings", ColumnType::Custom("json")).nullable(),
];

impl Entity for Something {
    type PrimaryKey = i64;

    fn table_ref() -> &'static TableRef {
        &TABLE
    }

    fn columns() -> &'static [ColumnDef] {
        &COLUMNS
    }

    fn from_values(values: Row) -> Result<Self> {
        let mut values = values.into_vec().into_iter();
        let mut next = || values.next().unwrap_or_default();
        Ok(Self {
            id: AsValue::try_from_value(next())?,
            name: AsValue::try_from_value(next())?,
            age: AsValue::try_from_value(next())?,
            nickname: AsValue::try_from_value(next())?,
            score: AsValue::try_from_value(next())?,
            flag: AsValue::try_from_value(next())?,
            mood: Mood::from_name(&String::try_from_value(next())?)?,
            avatar: AsValue::try_from_value(next())?,
            created: AsValue::try_from_value(next())?,
            birthday: AsValue::try_from_value(next())?,
            token: AsValue::try_from_value(next())?,
            settings: AsValue::try_from_value(next())?,
        })
    }

    fn row_full(&self) -> Row {
        vec![
            self.id.as_value(),
            self.name.clone().as_value(),
            self.age.as_value(),
            self.nickname.clone().as_value(),
            self.score.as_value(),
            self.flag.as_value(),
            keel::Value::Enum(Some(self.mood.as_str().into())),
            self.avatar.clone().as_value(),
            self.created.as_value(),
            self.birthday.as_value(),
            self.token.as_value(),
            self.settings.clone().as_value(),
        ]
        .into_boxed_slice()
    }

    fn primary_key(&self) -> i64 {
        self.id.unwrap_or_default()
    }
}

impl Something {
    pub fn named(name: &str, age: i32) -> Self {
        Self {
            name: name.into(),
            age,
            ..Default::default()
        }
    }
}
