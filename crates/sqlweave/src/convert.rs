//! Value-to-declared-type coercion.
//!
//! When a parameter is created, its runtime value is converted into the
//! canonical representation of its declared [`DbType`] (for example the string
//! `"2011-01-01"` declared as `DateTime` becomes a `NaiveDateTime`). The mapping
//! is pluggable per declared type through [`TypeMap::with`].

use crate::error::{SqlError, SqlResult};
use crate::value::{DbType, SqlValue};
use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, NaiveTime};
use rust_decimal::Decimal;
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use uuid::Uuid;

/// A conversion from any runtime value to one declared type.
pub type Coercion = Arc<dyn Fn(SqlValue) -> SqlResult<SqlValue> + Send + Sync>;

/// Per-declared-type coercion table.
#[derive(Clone)]
pub struct TypeMap {
    coercions: HashMap<DbType, Coercion>,
}

impl TypeMap {
    /// A table with no conversions at all (values pass through unchanged).
    pub fn identity() -> Self {
        Self {
            coercions: HashMap::new(),
        }
    }

    /// Override the conversion for one declared type.
    pub fn with<F>(mut self, db_type: DbType, f: F) -> Self
    where
        F: Fn(SqlValue) -> SqlResult<SqlValue> + Send + Sync + 'static,
    {
        self.coercions.insert(db_type, Arc::new(f));
        self
    }

    /// Convert `value` into the canonical representation of `db_type`.
    ///
    /// `NULL` is never converted.
    pub fn coerce(&self, value: SqlValue, db_type: DbType) -> SqlResult<SqlValue> {
        if value.is_null() {
            return Ok(value);
        }
        match self.coercions.get(&db_type) {
            Some(f) => f(value),
            None => Ok(value),
        }
    }
}

impl Default for TypeMap {
    fn default() -> Self {
        let mut map = Self::identity();
        for db_type in [
            DbType::AnsiString,
            DbType::String,
            DbType::AnsiStringFixedLength,
            DbType::StringFixedLength,
            DbType::Xml,
        ] {
            map = map.with(db_type, to_string);
        }
        map.with(DbType::Boolean, to_bool)
            .with(DbType::Byte, to_byte)
            .with(DbType::Int16, to_i16)
            .with(DbType::Int32, to_i32)
            .with(DbType::Int64, to_i64)
            .with(DbType::Single, to_single)
            .with(DbType::Double, to_double)
            .with(DbType::Decimal, to_decimal)
            .with(DbType::Currency, to_decimal)
            .with(DbType::Date, to_date)
            .with(DbType::DateTime, to_date_time)
            .with(DbType::DateTime2, to_date_time)
            .with(DbType::DateTimeOffset, to_date_time_offset)
            .with(DbType::Time, to_time)
            .with(DbType::Guid, to_guid)
            .with(DbType::Binary, to_binary)
    }
}

impl fmt::Debug for TypeMap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut keys: Vec<_> = self.coercions.keys().collect();
        keys.sort_by_key(|k| format!("{k:?}"));
        f.debug_struct("TypeMap").field("types", &keys).finish()
    }
}

fn mismatch(value: &SqlValue, to: DbType) -> SqlError {
    SqlError::Coercion {
        from: value.kind_name(),
        to,
    }
}

fn to_string(value: SqlValue) -> SqlResult<SqlValue> {
    match value {
        SqlValue::String(_) => Ok(value),
        other => Ok(SqlValue::String(other.to_text())),
    }
}

fn to_bool(value: SqlValue) -> SqlResult<SqlValue> {
    match value {
        SqlValue::Bool(_) => Ok(value),
        SqlValue::String(s) => {
            let s = s.trim();
            match s {
                "1" => Ok(SqlValue::Bool(true)),
                "0" => Ok(SqlValue::Bool(false)),
                _ => Ok(SqlValue::Bool(s.to_ascii_lowercase().parse()?)),
            }
        }
        other => integral(&other)
            .map(|v| SqlValue::Bool(v != 0))
            .ok_or_else(|| mismatch(&other, DbType::Boolean)),
    }
}

/// Integer view of an integral value.
fn integral(value: &SqlValue) -> Option<i64> {
    match value {
        SqlValue::Bool(b) => Some(i64::from(*b)),
        SqlValue::Byte(v) => Some(i64::from(*v)),
        SqlValue::Int16(v) => Some(i64::from(*v)),
        SqlValue::Int32(v) => Some(i64::from(*v)),
        SqlValue::Int64(v) => Some(*v),
        SqlValue::Decimal(d) if d.fract().is_zero() => i64::try_from(*d).ok(),
        _ => None,
    }
}

macro_rules! integer_coercion {
    ($name:ident, $ty:ty, $variant:ident) => {
        fn $name(value: SqlValue) -> SqlResult<SqlValue> {
            match value {
                SqlValue::$variant(_) => Ok(value),
                SqlValue::String(s) => Ok(SqlValue::$variant(s.trim().parse::<$ty>()?)),
                other => integral(&other)
                    .and_then(|v| <$ty>::try_from(v).ok())
                    .map(SqlValue::$variant)
                    .ok_or_else(|| mismatch(&other, DbType::$variant)),
            }
        }
    };
}

integer_coercion!(to_byte, u8, Byte);
integer_coercion!(to_i16, i16, Int16);
integer_coercion!(to_i32, i32, Int32);
integer_coercion!(to_i64, i64, Int64);

fn floating(value: &SqlValue) -> Option<f64> {
    match value {
        SqlValue::Single(v) => Some(f64::from(*v)),
        SqlValue::Double(v) => Some(*v),
        SqlValue::Decimal(d) => d.to_string().parse().ok(),
        other => integral(other).map(|v| v as f64),
    }
}

fn to_single(value: SqlValue) -> SqlResult<SqlValue> {
    match value {
        SqlValue::Single(_) => Ok(value),
        SqlValue::String(s) => Ok(SqlValue::Single(s.trim().parse()?)),
        other => floating(&other)
            .map(|v| SqlValue::Single(v as f32))
            .ok_or_else(|| mismatch(&other, DbType::Single)),
    }
}

fn to_double(value: SqlValue) -> SqlResult<SqlValue> {
    match value {
        SqlValue::Double(_) => Ok(value),
        SqlValue::String(s) => Ok(SqlValue::Double(s.trim().parse()?)),
        other => floating(&other)
            .map(SqlValue::Double)
            .ok_or_else(|| mismatch(&other, DbType::Double)),
    }
}

fn to_decimal(value: SqlValue) -> SqlResult<SqlValue> {
    match value {
        SqlValue::Decimal(_) => Ok(value),
        SqlValue::String(s) => Ok(SqlValue::Decimal(Decimal::from_str(s.trim())?)),
        SqlValue::Single(v) => Ok(SqlValue::Decimal(Decimal::try_from(v)?)),
        SqlValue::Double(v) => Ok(SqlValue::Decimal(Decimal::try_from(v)?)),
        other => integral(&other)
            .map(|v| SqlValue::Decimal(Decimal::from(v)))
            .ok_or_else(|| mismatch(&other, DbType::Decimal)),
    }
}

/// Parse the date/time text forms accepted for `DateTime` declared values.
fn parse_date_time(s: &str) -> Result<NaiveDateTime, chrono::ParseError> {
    let s = s.trim();
    NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%.f")
        .or_else(|_| NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S%.f"))
        .or_else(|_| NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M"))
        .or_else(|_| NaiveDate::parse_from_str(s, "%Y-%m-%d").map(|d| d.and_time(NaiveTime::MIN)))
}

fn to_date(value: SqlValue) -> SqlResult<SqlValue> {
    match value {
        SqlValue::Date(_) => Ok(value),
        SqlValue::DateTime(dt) => Ok(SqlValue::Date(dt.date())),
        SqlValue::DateTimeOffset(dt) => Ok(SqlValue::Date(dt.date_naive())),
        SqlValue::String(s) => Ok(SqlValue::Date(parse_date_time(&s)?.date())),
        other => Err(mismatch(&other, DbType::Date)),
    }
}

fn to_date_time(value: SqlValue) -> SqlResult<SqlValue> {
    match value {
        SqlValue::DateTime(_) => Ok(value),
        SqlValue::Date(d) => Ok(SqlValue::DateTime(d.and_time(NaiveTime::MIN))),
        SqlValue::DateTimeOffset(dt) => Ok(SqlValue::DateTime(dt.naive_local())),
        SqlValue::String(s) => Ok(SqlValue::DateTime(parse_date_time(&s)?)),
        other => Err(mismatch(&other, DbType::DateTime)),
    }
}

fn to_date_time_offset(value: SqlValue) -> SqlResult<SqlValue> {
    match value {
        SqlValue::DateTimeOffset(_) => Ok(value),
        SqlValue::DateTime(dt) => Ok(SqlValue::DateTimeOffset(dt.and_utc().fixed_offset())),
        SqlValue::Date(d) => Ok(SqlValue::DateTimeOffset(
            d.and_time(NaiveTime::MIN).and_utc().fixed_offset(),
        )),
        SqlValue::String(s) => {
            let s = s.trim();
            let parsed = DateTime::<FixedOffset>::parse_from_rfc3339(s).or_else(|_| {
                DateTime::<FixedOffset>::parse_from_str(s, "%Y-%m-%d %H:%M:%S%.f%:z")
            })?;
            Ok(SqlValue::DateTimeOffset(parsed))
        }
        other => Err(mismatch(&other, DbType::DateTimeOffset)),
    }
}

fn to_time(value: SqlValue) -> SqlResult<SqlValue> {
    match value {
        SqlValue::Time(_) => Ok(value),
        SqlValue::DateTime(dt) => Ok(SqlValue::Time(dt.time())),
        SqlValue::String(s) => Ok(SqlValue::Time(NaiveTime::parse_from_str(
            s.trim(),
            "%H:%M:%S%.f",
        )?)),
        other => Err(mismatch(&other, DbType::Time)),
    }
}

fn to_guid(value: SqlValue) -> SqlResult<SqlValue> {
    match value {
        SqlValue::Guid(_) => Ok(value),
        SqlValue::String(s) => Ok(SqlValue::Guid(Uuid::parse_str(s.trim())?)),
        other => Err(mismatch(&other, DbType::Guid)),
    }
}

fn to_binary(value: SqlValue) -> SqlResult<SqlValue> {
    match value {
        SqlValue::Binary(_) => Ok(value),
        SqlValue::String(s) => Ok(SqlValue::Binary(s.into_bytes())),
        SqlValue::Guid(g) => Ok(SqlValue::Binary(g.as_bytes().to_vec())),
        other => Err(mismatch(&other, DbType::Binary)),
    }
}
