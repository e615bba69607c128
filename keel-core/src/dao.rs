use crate::{
    AsValue, ColumnDef, Condition, Deferred, Dispatcher, Driver, Entity, Error, Materializer,
    Query, QueryBuilder, Result, Returning, RowLabeled, SqlWriter,
};
use std::{marker::PhantomData, sync::Arc};

/// Data access object of the records `E`, stateless apart from the injected dispatcher and
/// materializer.
///
/// Every operation renders exactly one statement, dispatches it once and returns the pending
/// outcome. Nothing blocks the caller.
///
/// ```ignore
/// let dao = Dao::<Something, _>::new(connection);
/// let id = dao.insert_returning_primary_key(&record).await?;
/// let found = dao.find_one_by_id(id).await?;
/// ```
pub struct Dao<E: Entity, D: Dispatcher> {
    dispatcher: Arc<D>,
    materializer: Arc<Materializer>,
    _entity: PhantomData<fn() -> E>,
}

impl<E: Entity, D: Dispatcher> Clone for Dao<E, D> {
    fn clone(&self) -> Self {
        Self {
            dispatcher: self.dispatcher.clone(),
            materializer: self.materializer.clone(),
            _entity: PhantomData,
        }
    }
}

fn primary_key_def<E: Entity>() -> Result<&'static ColumnDef> {
    E::primary_key_def().ok_or_else(|| {
        Error::msg(format!(
            "Table `{}` does not declare a primary key",
            E::table_ref().full_name()
        ))
    })
}

impl<E: Entity, D: Dispatcher> Dao<E, D> {
    pub fn new(dispatcher: Arc<D>) -> Self {
        Self::with_materializer(dispatcher, Arc::new(Materializer::default()))
    }

    pub fn with_materializer(dispatcher: Arc<D>, materializer: Arc<Materializer>) -> Self {
        Self {
            dispatcher,
            materializer,
            _entity: PhantomData,
        }
    }

    pub fn dispatcher(&self) -> &Arc<D> {
        &self.dispatcher
    }

    fn writer(&self) -> &<D::Driver as Driver>::SqlWriter {
        self.dispatcher.driver().sql_writer()
    }

    fn select(&self, condition: &Condition) -> Query {
        let mut query = QueryBuilder::new();
        self.writer().write_select::<E>(&mut query, condition);
        query.build()
    }

    fn key_condition(&self, id: E::PrimaryKey) -> Result<Condition> {
        let pk = primary_key_def::<E>()?;
        Ok(Condition::eq(pk.name, id))
    }

    fn keys_condition(&self, ids: impl IntoIterator<Item = E::PrimaryKey>) -> Result<Condition> {
        let pk = primary_key_def::<E>()?;
        Ok(Condition::is_in(pk.name, ids))
    }

    fn column(&self, name: &str) -> Result<&'static ColumnDef> {
        E::columns()
            .iter()
            .find(|c| c.name.eq_ignore_ascii_case(name))
            .ok_or_else(|| {
                Error::msg(format!(
                    "Table `{}` has no column `{name}`",
                    E::table_ref().full_name()
                ))
            })
    }

    pub fn find_one_by_id(&self, id: E::PrimaryKey) -> Deferred<Option<E>> {
        match self.key_condition(id) {
            Ok(condition) => self.find_one_by_condition(&condition),
            Err(e) => Deferred::failed(e),
        }
    }

    pub fn find_many_by_ids(
        &self,
        ids: impl IntoIterator<Item = E::PrimaryKey>,
    ) -> Deferred<Vec<E>> {
        match self.keys_condition(ids) {
            Ok(condition) => self.find_many_by_condition(&condition),
            Err(e) => Deferred::failed(e),
        }
    }

    /// Fails with [`Error::TooManyRows`] when more than one record matches.
    pub fn find_one_by_condition(&self, condition: &Condition) -> Deferred<Option<E>> {
        let materializer = self.materializer.clone();
        self.dispatcher
            .dispatch(self.select(condition))
            .and_then(move |raw| materializer.one(raw))
    }

    pub fn find_many_by_condition(&self, condition: &Condition) -> Deferred<Vec<E>> {
        let materializer = self.materializer.clone();
        self.dispatcher
            .dispatch(self.select(condition))
            .and_then(move |raw| materializer.many(raw))
    }

    pub fn find_all(&self) -> Deferred<Vec<E>> {
        self.find_many_by_condition(&Condition::True)
    }

    /// Records whose `column` is one of `values`.
    pub fn fetch_by<T: AsValue>(
        &self,
        column: &str,
        values: impl IntoIterator<Item = T>,
    ) -> Deferred<Vec<E>> {
        match self.column(column) {
            Ok(column) => self.find_many_by_condition(&Condition::is_in(column.name, values)),
            Err(e) => Deferred::failed(e),
        }
    }

    /// Single record by a unique column.
    pub fn fetch_one_by(&self, column: &str, value: impl AsValue) -> Deferred<Option<E>> {
        match self.column(column) {
            Ok(column) => self.find_one_by_condition(&Condition::eq(column.name, value)),
            Err(e) => Deferred::failed(e),
        }
    }

    pub fn insert(&self, entity: &E) -> Deferred<u64> {
        self.insert_many([entity])
    }

    /// All the records in one statement, an empty batch settles with 0 without reaching the
    /// store.
    pub fn insert_many<'a>(&self, entities: impl IntoIterator<Item = &'a E>) -> Deferred<u64> {
        let mut query = QueryBuilder::new();
        self.writer()
            .write_insert(&mut query, entities, Returning::Nothing);
        if query.sql.is_empty() {
            return Deferred::succeeded(0);
        }
        self.dispatcher.execute(query.build())
    }

    /// Insert and read back the primary key assigned by the store.
    pub fn insert_returning_primary_key(&self, entity: &E) -> Deferred<E::PrimaryKey> {
        let pk = match primary_key_def::<E>() {
            Ok(pk) => pk,
            Err(e) => return Deferred::failed(e),
        };
        let materializer = self.materializer.clone();
        self.insert_with(entity, Returning::PrimaryKey, move |row: RowLabeled| {
            let value = row
                .get_column(pk.name)
                .or_else(|| row.values.first())
                .cloned()
                .unwrap_or_default();
            let value = materializer.conversions().convert(value, pk)?;
            <E::PrimaryKey as AsValue>::try_from_value(value)
        })
    }

    /// Insert and apply `key_mapper` to the inserted row as returned by the store.
    pub fn insert_returning<K, F>(&self, entity: &E, key_mapper: F) -> Deferred<K>
    where
        K: Send + 'static,
        F: FnOnce(RowLabeled) -> Result<K> + Send + 'static,
    {
        self.insert_with(entity, Returning::All, key_mapper)
    }

    fn insert_with<K, F>(&self, entity: &E, returning: Returning, key_mapper: F) -> Deferred<K>
    where
        K: Send + 'static,
        F: FnOnce(RowLabeled) -> Result<K> + Send + 'static,
    {
        let mut query = QueryBuilder::new();
        self.writer().write_insert(&mut query, [entity], returning);
        let materializer = self.materializer.clone();
        self.dispatcher
            .dispatch(query.build())
            .and_then(move |raw| materializer.returning(raw, key_mapper))
    }

    /// Update every column of the record identified by its primary key.
    pub fn update(&self, entity: &E) -> Deferred<u64> {
        let pk = match primary_key_def::<E>() {
            Ok(pk) => pk,
            Err(e) => return Deferred::failed(e),
        };
        let mut query = QueryBuilder::new();
        if let Err(e) = self.writer().write_update(&mut query, entity, pk) {
            return Deferred::failed(e);
        }
        self.dispatcher.execute(query.build())
    }

    pub fn delete_by_id(&self, id: E::PrimaryKey) -> Deferred<u64> {
        match self.key_condition(id) {
            Ok(condition) => self.delete_by_condition(&condition),
            Err(e) => Deferred::failed(e),
        }
    }

    pub fn delete_by_ids(&self, ids: impl IntoIterator<Item = E::PrimaryKey>) -> Deferred<u64> {
        match self.keys_condition(ids) {
            Ok(condition) => self.delete_by_condition(&condition),
            Err(e) => Deferred::failed(e),
        }
    }

    pub fn delete_by_condition(&self, condition: &Condition) -> Deferred<u64> {
        let mut query = QueryBuilder::new();
        self.writer().write_delete::<E>(&mut query, condition);
        self.dispatcher.execute(query.build())
    }

    pub fn create_table(&self, if_not_exists: bool) -> Deferred<u64> {
        let mut sql = String::with_capacity(256);
        self.writer().write_create_table::<E>(&mut sql, if_not_exists);
        self.dispatcher.execute(sql.into())
    }

    pub fn drop_table(&self, if_exists: bool) -> Deferred<u64> {
        let mut sql = String::with_capacity(64);
        self.writer().write_drop_table::<E>(&mut sql, if_exists);
        self.dispatcher.execute(sql.into())
    }
}
