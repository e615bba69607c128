mod as_value;
mod bind;
mod column;
mod condition;
mod config;
mod conversion;
mod dao;
mod deferred;
mod dispatcher;
mod document;
mod driver;
mod entity;
mod error;
mod logger;
mod materializer;
mod query;
mod sql_writer;
mod util;
mod value;

pub use ::anyhow::Context;
pub use as_value::*;
pub use bind::*;
pub use column::*;
pub use condition::*;
pub use config::*;
pub use conversion::*;
pub use dao::*;
pub use deferred::{Deferred, DeferredFuture, Promise};
pub use dispatcher::*;
pub use document::*;
pub use driver::*;
pub use entity::*;
pub use error::*;
pub use logger::*;
pub use materializer::*;
pub use query::*;
pub use sql_writer::*;
pub use util::*;
pub use value::*;
pub use ::futures::future;
