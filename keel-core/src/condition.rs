use crate::{AsValue, Error, Result, Value};
use std::borrow::Cow;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareOp {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
}

impl CompareOp {
    pub fn as_sql(&self) -> &'static str {
        match self {
            CompareOp::Eq => "=",
            CompareOp::Ne => "<>",
            CompareOp::Lt => "<",
            CompareOp::Le => "<=",
            CompareOp::Gt => ">",
            CompareOp::Ge => ">=",
        }
    }
}

/// Predicate passed to the data access operations.
///
/// The facade never inspects it, it is handed as is to the [`SqlWriter`](crate::SqlWriter).
#[derive(Debug, Clone, PartialEq)]
pub enum Condition {
    True,
    False,
    Compare {
        column: Cow<'static, str>,
        op: CompareOp,
        value: Value,
    },
    In {
        column: Cow<'static, str>,
        values: Vec<Value>,
    },
    IsNull(Cow<'static, str>),
    IsNotNull(Cow<'static, str>),
    And(Vec<Condition>),
    Or(Vec<Condition>),
    Not(Box<Condition>),
    /// Verbatim SQL with `?` placeholders, one per parameter.
    Raw {
        sql: Cow<'static, str>,
        params: Vec<Value>,
    },
}

macro_rules! compare {
    ($name:ident, $op:path) => {
        pub fn $name(column: impl Into<Cow<'static, str>>, value: impl AsValue) -> Self {
            Condition::Compare {
                column: column.into(),
                op: $op,
                value: value.as_value(),
            }
        }
    };
}

impl Condition {
    pub fn always() -> Self {
        Condition::True
    }
    pub fn never() -> Self {
        Condition::False
    }
    compare!(eq, CompareOp::Eq);
    compare!(ne, CompareOp::Ne);
    compare!(lt, CompareOp::Lt);
    compare!(le, CompareOp::Le);
    compare!(gt, CompareOp::Gt);
    compare!(ge, CompareOp::Ge);

    pub fn is_in<T: AsValue>(
        column: impl Into<Cow<'static, str>>,
        values: impl IntoIterator<Item = T>,
    ) -> Self {
        Condition::In {
            column: column.into(),
            values: values.into_iter().map(AsValue::as_value).collect(),
        }
    }
    pub fn is_null(column: impl Into<Cow<'static, str>>) -> Self {
        Condition::IsNull(column.into())
    }
    pub fn is_not_null(column: impl Into<Cow<'static, str>>) -> Self {
        Condition::IsNotNull(column.into())
    }
    pub fn and(self, other: Condition) -> Self {
        match self {
            Condition::And(mut v) => {
                v.push(other);
                Condition::And(v)
            }
            _ => Condition::And(vec![self, other]),
        }
    }
    pub fn or(self, other: Condition) -> Self {
        match self {
            Condition::Or(mut v) => {
                v.push(other);
                Condition::Or(v)
            }
            _ => Condition::Or(vec![self, other]),
        }
    }
    #[allow(clippy::should_implement_trait)]
    pub fn not(self) -> Self {
        Condition::Not(Box::new(self))
    }
    /// Verbatim predicate, fails when the `?` count differs from the parameters count.
    pub fn raw(sql: impl Into<Cow<'static, str>>, params: Vec<Value>) -> Result<Self> {
        let sql = sql.into();
        let placeholders = sql.matches('?').count();
        if placeholders != params.len() {
            return Err(Error::msg(format!(
                "The condition `{sql}` has {placeholders} placeholders but {} parameters",
                params.len()
            )));
        }
        Ok(Condition::Raw { sql, params })
    }
}
