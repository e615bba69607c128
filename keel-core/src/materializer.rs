use crate::{Conversions, Entity, Error, QueryResult, Result, RowLabeled, Value};
use std::fmt;

/// Reads a generated key out of the row returned by an insert.
pub type KeyMapper<K> = Box<dyn FnOnce(RowLabeled) -> Result<K> + Send>;

/// How the raw result of a statement must be interpreted.
pub enum FetchKind<K> {
    Many,
    /// At most one row.
    One,
    RowCount,
    GeneratedKey(KeyMapper<K>),
}

impl<K> fmt::Debug for FetchKind<K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            FetchKind::Many => "Many",
            FetchKind::One => "One",
            FetchKind::RowCount => "RowCount",
            FetchKind::GeneratedKey(..) => "GeneratedKey",
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum FetchOutcome<E, K> {
    Many(Vec<E>),
    One(Option<E>),
    RowCount(u64),
    GeneratedKey(K),
}

/// Turns raw rows into records.
///
/// Rows are matched to [`Entity::columns`] by label, case insensitive. A position without a
/// label maps to the column declared at the same position. Labels matching no column are
/// ignored and columns missing from the row are NULL.
#[derive(Debug, Clone, Default)]
pub struct Materializer {
    conversions: Conversions,
}

impl Materializer {
    pub fn new(conversions: Conversions) -> Self {
        Self { conversions }
    }

    pub fn conversions(&self) -> &Conversions {
        &self.conversions
    }

    pub fn map_row<E: Entity>(&self, row: RowLabeled) -> Result<E> {
        let columns = E::columns();
        let mut values: Vec<Option<Value>> = vec![None; columns.len()];
        for (i, value) in row.values.into_vec().into_iter().enumerate() {
            let target = match row.labels.get(i).filter(|v| !v.is_empty()) {
                Some(label) => columns
                    .iter()
                    .position(|c| c.name.eq_ignore_ascii_case(label)),
                None => (i < columns.len()).then_some(i),
            };
            if let Some(target) = target {
                values[target] = Some(value);
            }
        }
        let values = columns
            .iter()
            .zip(values)
            .map(|(column, value)| {
                self.conversions
                    .convert(value.unwrap_or_default(), column)
            })
            .collect::<Result<Box<[Value]>>>()?;
        E::from_values(values)
    }

    pub fn many<E: Entity>(&self, raw: QueryResult) -> Result<Vec<E>> {
        raw.into_rows()
            .into_iter()
            .map(|row| self.map_row(row))
            .collect()
    }

    /// `None` for zero rows, [`Error::TooManyRows`] for more than one.
    pub fn one<E: Entity>(&self, raw: QueryResult) -> Result<Option<E>> {
        raw.into_single_row()?
            .map(|row| self.map_row(row))
            .transpose()
    }

    pub fn affected(&self, raw: QueryResult) -> Result<u64> {
        Ok(raw.rows_affected())
    }

    pub fn returning<K>(
        &self,
        raw: QueryResult,
        key_mapper: impl FnOnce(RowLabeled) -> Result<K>,
    ) -> Result<K> {
        let Some(row) = raw.into_rows().into_iter().next() else {
            return Err(Error::msg("The insert did not return any row"));
        };
        key_mapper(row)
    }

    pub fn materialize<E: Entity, K>(
        &self,
        kind: FetchKind<K>,
        raw: QueryResult,
    ) -> Result<FetchOutcome<E, K>> {
        Ok(match kind {
            FetchKind::Many => FetchOutcome::Many(self.many(raw)?),
            FetchKind::One => FetchOutcome::One(self.one(raw)?),
            FetchKind::RowCount => FetchOutcome::RowCount(self.affected(raw)?),
            FetchKind::GeneratedKey(key_mapper) => {
                FetchOutcome::GeneratedKey(self.returning(raw, key_mapper)?)
            }
        })
    }
}
