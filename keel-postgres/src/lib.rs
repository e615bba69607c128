mod driver;
mod sql_writer;
mod store;
mod value_holder;

pub use driver::*;
pub use sql_writer::*;
pub use store::*;
pub use value_holder::*;
