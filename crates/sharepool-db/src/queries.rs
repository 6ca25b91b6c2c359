//! Database query functions organized by table.
//!
//! Every function takes a plain `&Connection`; a `rusqlite::Transaction`
//! derefs to one, so the same functions compose inside [`crate::immediate`].

pub mod access;
pub mod platforms;
pub mod rate_limits;
pub mod reports;
pub mod settings;
pub mod stats;
pub mod subscriptions;
pub mod topups;
pub mod transactions;
pub mod users;

use std::str::FromStr;

use rusqlite::types::Type;
use rusqlite::Row;
use sharepool_types::{CommissionRate, Money, Timestamp, TypeError};

use crate::DbError;

/// Read a TEXT column into one of the domain's text enums.
pub(crate) fn text_enum<T>(row: &Row<'_>, idx: usize) -> rusqlite::Result<T>
where
    T: FromStr<Err = TypeError>,
{
    let text: String = row.get(idx)?;
    text.parse()
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

pub(crate) fn money(row: &Row<'_>, idx: usize) -> rusqlite::Result<Money> {
    Ok(Money::from_cents(row.get(idx)?))
}

pub(crate) fn opt_money(row: &Row<'_>, idx: usize) -> rusqlite::Result<Option<Money>> {
    Ok(row.get::<_, Option<i64>>(idx)?.map(Money::from_cents))
}

pub(crate) fn rate(row: &Row<'_>, idx: usize) -> rusqlite::Result<CommissionRate> {
    let bp: u32 = row.get(idx)?;
    CommissionRate::from_basis_points(bp)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Integer, Box::new(e)))
}

pub(crate) fn opt_rate(row: &Row<'_>, idx: usize) -> rusqlite::Result<Option<CommissionRate>> {
    match row.get::<_, Option<u32>>(idx)? {
        Some(bp) => CommissionRate::from_basis_points(bp).map(Some).map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(idx, Type::Integer, Box::new(e))
        }),
        None => Ok(None),
    }
}

pub(crate) fn ts(row: &Row<'_>, idx: usize) -> rusqlite::Result<Timestamp> {
    Ok(row.get::<_, i64>(idx)? as u64)
}

pub(crate) fn opt_ts(row: &Row<'_>, idx: usize) -> rusqlite::Result<Option<Timestamp>> {
    Ok(row.get::<_, Option<i64>>(idx)?.map(|t| t as u64))
}

/// Map `QueryReturnedNoRows` to [`DbError::NotFound`].
pub(crate) fn not_found(what: impl FnOnce() -> String) -> impl FnOnce(rusqlite::Error) -> DbError {
    move |e| match e {
        rusqlite::Error::QueryReturnedNoRows => DbError::NotFound(what()),
        other => DbError::Sqlite(other),
    }
}
