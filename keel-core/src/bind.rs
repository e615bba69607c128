use crate::{Driver, Error, Query, Result};

/// Flatten the parameters of `query` into the driver's bind values, one per parameter and
/// in the same order.
///
/// Fails on the first parameter the driver cannot represent.
pub fn extract_bind_values<D: Driver>(query: &Query, driver: &D) -> Result<Vec<D::Bind>> {
    query
        .params
        .iter()
        .enumerate()
        .map(|(i, value)| {
            driver
                .adapt(value)
                .ok_or_else(|| Error::UnmappableColumn {
                    column: format!("parameter #{}", i + 1).into(),
                    type_name: value.type_name().into(),
                })
        })
        .collect()
}
