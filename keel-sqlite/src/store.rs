use crate::{
    CBox, SqliteBind, SqliteDriver, error_message_from_ptr,
    extract::{extract_name, extract_value},
};
use keel_core::{
    BlockingStore, Error, QueryResult, Result, RowLabeled, StoreFailure, StoreFailureKind,
    truncate_long,
};
use libsqlite3_sys::{
    SQLITE_BUSY, SQLITE_CANTOPEN, SQLITE_CONSTRAINT, SQLITE_CONSTRAINT_PRIMARYKEY,
    SQLITE_CONSTRAINT_UNIQUE, SQLITE_DONE, SQLITE_OK, SQLITE_OPEN_CREATE, SQLITE_OPEN_FULLMUTEX,
    SQLITE_OPEN_READWRITE, SQLITE_OPEN_URI, SQLITE_ROW, SQLITE_TRANSIENT, sqlite3,
    sqlite3_bind_blob, sqlite3_bind_double, sqlite3_bind_int64, sqlite3_bind_null,
    sqlite3_bind_parameter_count, sqlite3_bind_text, sqlite3_close, sqlite3_column_count,
    sqlite3_errmsg, sqlite3_errstr, sqlite3_extended_errcode, sqlite3_extended_result_codes,
    sqlite3_finalize, sqlite3_open_v2, sqlite3_prepare_v2, sqlite3_step, sqlite3_stmt,
    sqlite3_total_changes,
};
use std::{
    ffi::{CString, c_char, c_int, c_void},
    ptr,
    sync::{Arc, Mutex, PoisonError},
};

/// One sqlite database handle, statements are executed one at a time.
pub struct SqliteStore {
    driver: SqliteDriver,
    connection: Mutex<CBox<sqlite3>>,
}

fn failure(connection: *mut sqlite3, default: StoreFailureKind) -> StoreFailure {
    let (code, message) = unsafe {
        (
            sqlite3_extended_errcode(connection),
            error_message_from_ptr(sqlite3_errmsg(connection)),
        )
    };
    let kind = match code {
        SQLITE_CONSTRAINT_PRIMARYKEY | SQLITE_CONSTRAINT_UNIQUE => StoreFailureKind::DuplicateKey,
        c if c & 0xff == SQLITE_CONSTRAINT => StoreFailureKind::ConstraintViolation,
        c if c & 0xff == SQLITE_CANTOPEN => StoreFailureKind::Connection,
        _ => default,
    };
    StoreFailure::msg(kind, message).with_code(code.to_string())
}

impl SqliteStore {
    pub fn open(driver: SqliteDriver, uri: &str) -> Result<Self> {
        let c_uri = CString::new(uri).map_err(|e| {
            let error = Error::Config(format!("Invalid sqlite uri `{uri}`: {e}").into());
            log::error!("{:#}", error);
            error
        })?;
        let mut connection = CBox::<sqlite3>::new(ptr::null_mut(), |p| unsafe {
            sqlite3_close(p);
        });
        let rc = unsafe {
            sqlite3_open_v2(
                c_uri.as_ptr(),
                &mut *connection,
                SQLITE_OPEN_READWRITE | SQLITE_OPEN_CREATE | SQLITE_OPEN_URI | SQLITE_OPEN_FULLMUTEX,
                ptr::null(),
            )
        };
        if rc != SQLITE_OK {
            let message = if connection.is_null() {
                error_message_from_ptr(unsafe { sqlite3_errstr(rc) })
            } else {
                error_message_from_ptr(unsafe { sqlite3_errmsg(*connection) })
            };
            let error = Error::from(
                StoreFailure::msg(
                    StoreFailureKind::Connection,
                    format!("Could not open the sqlite database `{uri}`: {message}"),
                )
                .with_code(rc.to_string()),
            );
            log::error!("{:#}", error);
            return Err(error);
        }
        unsafe {
            sqlite3_extended_result_codes(*connection, 1);
        }
        Ok(Self {
            driver,
            connection: Mutex::new(connection),
        })
    }

    fn bind(
        connection: *mut sqlite3,
        statement: *mut sqlite3_stmt,
        index: c_int,
        value: SqliteBind,
    ) -> Result<(), StoreFailure> {
        let rc = unsafe {
            match value {
                SqliteBind::Null => sqlite3_bind_null(statement, index),
                SqliteBind::Integer(v) => sqlite3_bind_int64(statement, index, v),
                SqliteBind::Real(v) => sqlite3_bind_double(statement, index, v),
                SqliteBind::Text(v) => sqlite3_bind_text(
                    statement,
                    index,
                    v.as_ptr() as *const c_char,
                    v.len() as c_int,
                    SQLITE_TRANSIENT(),
                ),
                SqliteBind::Blob(v) => sqlite3_bind_blob(
                    statement,
                    index,
                    v.as_ptr() as *const c_void,
                    v.len() as c_int,
                    SQLITE_TRANSIENT(),
                ),
            }
        };
        if rc != SQLITE_OK {
            return Err(failure(connection, StoreFailureKind::Other));
        }
        Ok(())
    }

    fn run_statement(
        connection: *mut sqlite3,
        statement: *mut sqlite3_stmt,
    ) -> Result<QueryResult, StoreFailure> {
        unsafe {
            let count = sqlite3_column_count(statement);
            let changes = sqlite3_total_changes(connection);
            let labels: Arc<[String]> = (0..count).map(|i| extract_name(statement, i)).collect();
            let mut rows = Vec::new();
            loop {
                match sqlite3_step(statement) {
                    SQLITE_BUSY => continue,
                    SQLITE_DONE => break,
                    SQLITE_ROW => {
                        let values = (0..count)
                            .map(|i| extract_value(statement, i))
                            .collect::<Result<Box<[_]>, _>>()
                            .map_err(|e| StoreFailure::msg(StoreFailureKind::Other, e))?;
                        rows.push(RowLabeled::new(labels.clone(), values));
                    }
                    _ => return Err(failure(connection, StoreFailureKind::Other)),
                }
            }
            Ok(if count > 0 {
                QueryResult::Rows(rows)
            } else {
                QueryResult::Affected((sqlite3_total_changes(connection) - changes).max(0) as u64)
            })
        }
    }

    fn run(&self, sql: &str, binds: Vec<SqliteBind>) -> Result<QueryResult, StoreFailure> {
        let connection = self.connection.lock().unwrap_or_else(PoisonError::into_inner);
        let connection = **connection;
        let mut binds = binds.into_iter();
        let mut result = QueryResult::Affected(0);
        let mut tail = sql.as_ptr() as *const c_char;
        let end = unsafe { tail.add(sql.len()) };
        while tail < end {
            let mut statement = CBox::<sqlite3_stmt>::new(ptr::null_mut(), |p| unsafe {
                sqlite3_finalize(p);
            });
            let mut next = ptr::null();
            let rc = unsafe {
                sqlite3_prepare_v2(
                    connection,
                    tail,
                    end.offset_from(tail) as c_int,
                    &mut *statement,
                    &mut next,
                )
            };
            if rc != SQLITE_OK {
                return Err(failure(connection, StoreFailureKind::Syntax));
            }
            if next.is_null() || next <= tail {
                tail = end;
            } else {
                tail = next;
            }
            if statement.is_null() {
                // Whitespace or comment
                continue;
            }
            let parameters = unsafe { sqlite3_bind_parameter_count(*statement) };
            for index in 1..=parameters {
                let Some(value) = binds.next() else {
                    return Err(StoreFailure::msg(
                        StoreFailureKind::Other,
                        format!("Missing the value of parameter #{index}"),
                    ));
                };
                Self::bind(connection, *statement, index, value)?;
            }
            result = match (result, Self::run_statement(connection, *statement)?) {
                (QueryResult::Affected(a), QueryResult::Affected(b)) => QueryResult::Affected(a + b),
                (_, current) => current,
            };
        }
        if binds.next().is_some() {
            return Err(StoreFailure::msg(
                StoreFailureKind::Other,
                "More values than parameters in the statement",
            ));
        }
        Ok(result)
    }
}

impl BlockingStore for SqliteStore {
    type Driver = SqliteDriver;

    fn driver(&self) -> &SqliteDriver {
        &self.driver
    }

    fn execute(&self, sql: &str, binds: Vec<SqliteBind>) -> Result<QueryResult, StoreFailure> {
        self.run(sql, binds).inspect_err(|e| {
            log::error!("{:#}\nWhile executing the query:\n{}", e, truncate_long!(sql));
        })
    }
}
