use libsqlite3_sys::*;
use std::{
    ffi::{CStr, c_int},
    slice,
};
use keel_core::{AsValue, Value};

pub(crate) fn extract_value(statement: *mut sqlite3_stmt, index: c_int) -> Result<Value, String> {
    unsafe {
        let column_type = sqlite3_column_type(statement, index);
        Ok(match column_type {
            SQLITE_NULL => Value::Null,
            SQLITE_INTEGER => sqlite3_column_int64(statement, index).as_value(),
            SQLITE_FLOAT => sqlite3_column_double(statement, index).as_value(),
            SQLITE_BLOB => {
                let ptr = sqlite3_column_blob(statement, index) as *const u8;
                let len = sqlite3_column_bytes(statement, index) as usize;
                Value::Blob(Some(if ptr.is_null() {
                    Box::default()
                } else {
                    slice::from_raw_parts(ptr, len).into()
                }))
            }
            SQLITE_TEXT => {
                let ptr = sqlite3_column_text(statement, index);
                let len = sqlite3_column_bytes(statement, index) as usize;
                Value::Varchar(Some(if ptr.is_null() {
                    String::new()
                } else {
                    String::from_utf8_lossy(slice::from_raw_parts(ptr, len)).into_owned()
                }))
            }
            _ => return Err(format!("Unexpected column type {}", column_type)),
        })
    }
}

pub(crate) fn extract_name(statement: *mut sqlite3_stmt, index: c_int) -> String {
    unsafe {
        let name = sqlite3_column_name(statement, index);
        if name.is_null() {
            return String::new();
        }
        CStr::from_ptr(name).to_string_lossy().into_owned()
    }
}
