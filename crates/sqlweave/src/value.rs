//! Runtime values, declared database types, and literal formatting.

use crate::error::{SqlError, SqlResult};
use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Abstract database type tag attached to a parameter or comparison.
///
/// This is independent of the Rust type of the value: a `String` value may be
/// declared as `Int32`, in which case it is coerced when the parameter is created.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DbType {
    AnsiString,
    String,
    AnsiStringFixedLength,
    StringFixedLength,
    Boolean,
    Byte,
    Int16,
    Int32,
    Int64,
    Single,
    Double,
    Decimal,
    Currency,
    Date,
    DateTime,
    DateTime2,
    DateTimeOffset,
    Time,
    Guid,
    Binary,
    Xml,
    Object,
}

impl DbType {
    /// String family: always parameterized in list filters.
    pub fn is_string(self) -> bool {
        matches!(
            self,
            DbType::AnsiString
                | DbType::String
                | DbType::AnsiStringFixedLength
                | DbType::StringFixedLength
                | DbType::Xml
        )
    }

    /// Integer family: may be rendered as bare literals in list filters.
    pub fn is_integer(self) -> bool {
        matches!(
            self,
            DbType::Byte | DbType::Int16 | DbType::Int32 | DbType::Int64
        )
    }

    pub fn is_boolean(self) -> bool {
        self == DbType::Boolean
    }

    /// The declared type a value gets when the caller does not name one.
    pub fn infer(value: &SqlValue) -> DbType {
        match value {
            SqlValue::Null => DbType::Object,
            SqlValue::Bool(_) => DbType::Boolean,
            SqlValue::Byte(_) => DbType::Byte,
            SqlValue::Int16(_) => DbType::Int16,
            SqlValue::Int32(_) => DbType::Int32,
            SqlValue::Int64(_) => DbType::Int64,
            SqlValue::Single(_) => DbType::Single,
            SqlValue::Double(_) => DbType::Double,
            SqlValue::Decimal(_) => DbType::Decimal,
            SqlValue::String(_) => DbType::String,
            SqlValue::Date(_) => DbType::Date,
            SqlValue::DateTime(_) => DbType::DateTime,
            SqlValue::DateTimeOffset(_) => DbType::DateTimeOffset,
            SqlValue::Time(_) => DbType::Time,
            SqlValue::Guid(_) => DbType::Guid,
            SqlValue::Binary(_) => DbType::Binary,
        }
    }
}

/// A parameter or literal value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum SqlValue {
    Null,
    Bool(bool),
    Byte(u8),
    Int16(i16),
    Int32(i32),
    Int64(i64),
    Single(f32),
    Double(f64),
    Decimal(Decimal),
    String(String),
    Date(NaiveDate),
    DateTime(NaiveDateTime),
    DateTimeOffset(DateTime<FixedOffset>),
    Time(NaiveTime),
    Guid(Uuid),
    Binary(Vec<u8>),
}

const DATE_TIME_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.f";
const DATE_TIME_OFFSET_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.f%:z";
const TIME_FORMAT: &str = "%H:%M:%S%.f";

impl SqlValue {
    /// Short name of the value kind, used in error messages.
    pub fn kind_name(&self) -> &'static str {
        match self {
            SqlValue::Null => "null",
            SqlValue::Bool(_) => "bool",
            SqlValue::Byte(_) => "byte",
            SqlValue::Int16(_) => "int16",
            SqlValue::Int32(_) => "int32",
            SqlValue::Int64(_) => "int64",
            SqlValue::Single(_) => "single",
            SqlValue::Double(_) => "double",
            SqlValue::Decimal(_) => "decimal",
            SqlValue::String(_) => "string",
            SqlValue::Date(_) => "date",
            SqlValue::DateTime(_) => "datetime",
            SqlValue::DateTimeOffset(_) => "datetimeoffset",
            SqlValue::Time(_) => "time",
            SqlValue::Guid(_) => "guid",
            SqlValue::Binary(_) => "binary",
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, SqlValue::Null)
    }

    /// Render the value as SQL literal text.
    ///
    /// Strings are single-quoted with embedded quotes doubled, booleans become
    /// `1`/`0`, temporal values and guids are quoted ISO text, binary is `0x..`.
    pub fn to_literal(&self) -> String {
        let mut out = String::new();
        self.write_literal(&mut out);
        out
    }

    /// Reject values whose text is not a valid SQL literal (NaN and infinities).
    pub(crate) fn ensure_literal(&self) -> SqlResult<()> {
        let finite = match self {
            SqlValue::Single(v) => v.is_finite(),
            SqlValue::Double(v) => v.is_finite(),
            _ => true,
        };
        if finite {
            Ok(())
        } else {
            Err(SqlError::Coercion {
                from: "non-finite float",
                to: DbType::infer(self),
            })
        }
    }

    pub(crate) fn write_literal(&self, out: &mut String) {
        match self {
            SqlValue::Null => out.push_str("NULL"),
            SqlValue::Bool(b) => out.push(if *b { '1' } else { '0' }),
            SqlValue::String(s) => push_quoted(out, s),
            SqlValue::Date(_)
            | SqlValue::DateTime(_)
            | SqlValue::DateTimeOffset(_)
            | SqlValue::Time(_)
            | SqlValue::Guid(_) => push_quoted(out, &self.to_text()),
            SqlValue::Binary(bytes) => {
                out.push_str("0x");
                for b in bytes {
                    out.push_str(&format!("{b:02X}"));
                }
            }
            _ => out.push_str(&self.to_text()),
        }
    }

    /// Default string form of the value.
    pub fn to_text(&self) -> String {
        match self {
            SqlValue::Null => String::new(),
            SqlValue::Bool(b) => b.to_string(),
            SqlValue::Byte(v) => v.to_string(),
            SqlValue::Int16(v) => v.to_string(),
            SqlValue::Int32(v) => v.to_string(),
            SqlValue::Int64(v) => v.to_string(),
            SqlValue::Single(v) => v.to_string(),
            SqlValue::Double(v) => v.to_string(),
            SqlValue::Decimal(v) => v.to_string(),
            SqlValue::String(s) => s.clone(),
            SqlValue::Date(d) => d.format("%Y-%m-%d").to_string(),
            SqlValue::DateTime(dt) => dt.format(DATE_TIME_FORMAT).to_string(),
            SqlValue::DateTimeOffset(dt) => dt.format(DATE_TIME_OFFSET_FORMAT).to_string(),
            SqlValue::Time(t) => t.format(TIME_FORMAT).to_string(),
            SqlValue::Guid(g) => g.hyphenated().to_string(),
            SqlValue::Binary(bytes) => bytes.iter().map(|b| format!("{b:02X}")).collect(),
        }
    }
}

fn push_quoted(out: &mut String, s: &str) {
    out.push('\'');
    for ch in s.chars() {
        if ch == '\'' {
            out.push('\'');
        }
        out.push(ch);
    }
    out.push('\'');
}

impl fmt::Display for SqlValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_text())
    }
}

macro_rules! impl_from_value {
    ($($ty:ty => $variant:ident),* $(,)?) => {
        $(
            impl From<$ty> for SqlValue {
                fn from(v: $ty) -> Self {
                    SqlValue::$variant(v)
                }
            }
        )*
    };
}

impl_from_value! {
    bool => Bool,
    u8 => Byte,
    i16 => Int16,
    i32 => Int32,
    i64 => Int64,
    f32 => Single,
    f64 => Double,
    Decimal => Decimal,
    String => String,
    NaiveDate => Date,
    NaiveDateTime => DateTime,
    DateTime<FixedOffset> => DateTimeOffset,
    NaiveTime => Time,
    Uuid => Guid,
    Vec<u8> => Binary,
}

impl From<&str> for SqlValue {
    fn from(v: &str) -> Self {
        SqlValue::String(v.to_string())
    }
}

impl From<&String> for SqlValue {
    fn from(v: &String) -> Self {
        SqlValue::String(v.clone())
    }
}

impl From<DateTime<Utc>> for SqlValue {
    fn from(v: DateTime<Utc>) -> Self {
        SqlValue::DateTimeOffset(v.fixed_offset())
    }
}

impl<T: Into<SqlValue>> From<Option<T>> for SqlValue {
    fn from(v: Option<T>) -> Self {
        v.map_or(SqlValue::Null, Into::into)
    }
}

/// Maps a Rust type to the declared type used when none is given explicitly.
///
/// Typed filters use this to infer their [`DbType`] from the value's type.
pub trait SqlType: Into<SqlValue> {
    fn db_type() -> DbType;
}

macro_rules! impl_sql_type {
    ($($ty:ty => $db:ident),* $(,)?) => {
        $(
            impl SqlType for $ty {
                fn db_type() -> DbType {
                    DbType::$db
                }
            }
        )*
    };
}

impl_sql_type! {
    bool => Boolean,
    u8 => Byte,
    i16 => Int16,
    i32 => Int32,
    i64 => Int64,
    f32 => Single,
    f64 => Double,
    Decimal => Decimal,
    String => String,
    &String => String,
    &str => String,
    NaiveDate => Date,
    NaiveDateTime => DateTime,
    DateTime<FixedOffset> => DateTimeOffset,
    DateTime<Utc> => DateTimeOffset,
    NaiveTime => Time,
    Uuid => Guid,
    Vec<u8> => Binary,
}

impl<T: SqlType> SqlType for Option<T> {
    fn db_type() -> DbType {
        T::db_type()
    }
}
