#[macro_export]
macro_rules! silent_logs {
    ($($code:tt)+) => {{
        let level = log::max_level();
        log::set_max_level(log::LevelFilter::Off);
        $($code)+
        log::set_max_level(level);
    }};
}

mod combinators;
mod crud;
mod something;

pub use something::*;

use crate::{
    combinators::{chained, concurrent, documents},
    crud::{conditions, duplicate_key, insert_and_find, singular_fetch, update_and_delete},
};
use keel::Dispatcher;
use log::LevelFilter;
use std::{env, sync::Arc};

pub fn init_logs() {
    let mut logger = env_logger::builder();
    logger
        .is_test(true)
        .format_file(true)
        .format_line_number(true);
    if env::var("RUST_LOG").is_err() {
        logger.filter_level(LevelFilter::Warn);
    }
    let _ = logger.try_init();
}

pub async fn execute_tests<D: Dispatcher>(dispatcher: Arc<D>) {
    insert_and_find(&dispatcher).await;
    singular_fetch(&dispatcher).await;
    update_and_delete(&dispatcher).await;
    silent_logs! {
        duplicate_key(&dispatcher).await;
    }
    conditions(&dispatcher).await;
    chained(&dispatcher).await;
    concurrent(&dispatcher).await;
    documents(&dispatcher).await;
}
