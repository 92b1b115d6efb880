//! SQL dialect seam.
//!
//! The engine renders through a [`Dialect`] for everything that differs between
//! databases: identifier quoting, parameter prefix, paging syntax, operator text
//! and type names. Only [`SqlServerDialect`] ships.

use crate::error::{SqlError, SqlResult};
use crate::filter::CompareOp;
use crate::ident;
use crate::value::DbType;
use std::fmt;

pub trait Dialect: Send + Sync + fmt::Debug {
    /// Placeholder prefix written before parameter names.
    fn parameter_prefix(&self) -> char;

    /// Append one quoted identifier part. `name` is undecorated.
    fn quote_identifier(&self, out: &mut String, name: &str, force_double_quotes: bool);

    /// Append the paging clause (leading space included) for a statement that
    /// already has an ORDER BY. Zero means "not set" for both values.
    fn write_paging(&self, out: &mut String, limit: u64, offset: u64);

    fn operator_symbol(&self, op: CompareOp) -> &'static str;

    /// Declared type name for `DECLARE` scripts.
    fn type_name(&self, db_type: DbType, size: Option<usize>) -> SqlResult<String>;

    fn statement_terminator(&self) -> &'static str {
        ";"
    }
}

/// T-SQL: `[bracket]` quoting, `@` parameters, `OFFSET … FETCH NEXT …` paging.
#[derive(Debug, Clone, Copy, Default)]
pub struct SqlServerDialect;

impl Dialect for SqlServerDialect {
    fn parameter_prefix(&self) -> char {
        '@'
    }

    fn quote_identifier(&self, out: &mut String, name: &str, force_double_quotes: bool) {
        ident::write_quoted(out, name, force_double_quotes);
    }

    fn write_paging(&self, out: &mut String, limit: u64, offset: u64) {
        if offset > 0 {
            out.push_str(&format!(" OFFSET {offset} ROWS"));
        }
        if limit > 0 {
            out.push_str(&format!(" FETCH NEXT {limit} ROWS ONLY"));
        }
    }

    fn operator_symbol(&self, op: CompareOp) -> &'static str {
        match op {
            CompareOp::Eq => "=",
            CompareOp::Ne => "<>",
            CompareOp::Gt => ">",
            CompareOp::Ge => ">=",
            CompareOp::Lt => "<",
            CompareOp::Le => "<=",
        }
    }

    fn type_name(&self, db_type: DbType, size: Option<usize>) -> SqlResult<String> {
        let sized = |name: &str, default: usize| match size {
            Some(n) => format!("{name}({n})"),
            None => format!("{name}({default})"),
        };
        let name = match db_type {
            DbType::AnsiString => sized("VARCHAR", 8000),
            DbType::String => sized("NVARCHAR", 4000),
            DbType::AnsiStringFixedLength => sized("CHAR", 8000),
            DbType::StringFixedLength => sized("NCHAR", 4000),
            DbType::Xml => "XML".to_string(),
            DbType::Boolean => "BIT".to_string(),
            DbType::Byte => "TINYINT".to_string(),
            DbType::Int16 => "SMALLINT".to_string(),
            DbType::Int32 => "INT".to_string(),
            DbType::Int64 => "BIGINT".to_string(),
            DbType::Single => "REAL".to_string(),
            DbType::Double => "FLOAT".to_string(),
            DbType::Decimal => "DECIMAL(38,10)".to_string(),
            DbType::Currency => "MONEY".to_string(),
            DbType::Date => "DATE".to_string(),
            DbType::DateTime => "DATETIME".to_string(),
            DbType::DateTime2 => "DATETIME2".to_string(),
            DbType::DateTimeOffset => "DATETIMEOFFSET".to_string(),
            DbType::Time => "TIME".to_string(),
            DbType::Guid => "UNIQUEIDENTIFIER".to_string(),
            DbType::Binary => match size {
                Some(n) => format!("VARBINARY({n})"),
                None => "VARBINARY(MAX)".to_string(),
            },
            DbType::Object => return Err(SqlError::UnsupportedType(db_type)),
        };
        Ok(name)
    }
}
