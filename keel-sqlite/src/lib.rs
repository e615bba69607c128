mod cbox;
mod driver;
mod extract;
mod sql_writer;
mod store;

use std::ffi::{CStr, c_char};

pub(crate) use cbox::*;
pub use driver::*;
pub use sql_writer::*;
pub use store::*;

pub(crate) fn error_message_from_ptr(ptr: *const c_char) -> String {
    if ptr.is_null() {
        return "Unknown error (could not extract the error message)".into();
    }
    unsafe { CStr::from_ptr(ptr).to_string_lossy().into_owned() }
}
