//! Error types for sqlweave

use crate::value::DbType;
use thiserror::Error;

/// Result type alias for sqlweave operations
pub type SqlResult<T> = Result<T, SqlError>;

/// Errors raised while building or rendering a statement.
///
/// Rendering is all-or-nothing: any error aborts the render and no partial
/// SQL is returned.
#[derive(Debug, Error)]
pub enum SqlError {
    /// Paging was requested on a builder without any ORDER BY entry
    #[error("Paging requires at least one ORDER BY column")]
    PagingWithoutOrderBy,

    /// Paging values out of range
    #[error("Invalid paging: {0}")]
    InvalidPaging(String),

    /// An alias was requested for a table that was never registered
    #[error("Table '{0}' has no alias in this render pass")]
    UnregisteredTable(String),

    /// IN / NOT IN over an empty value sequence
    #[error("List filter on column '{0}' has no values")]
    EmptyList(String),

    /// Column expression that is neither `name` nor `name AS alias`
    #[error("Invalid column expression: '{0}'")]
    InvalidColumnExpression(String),

    /// Identifier that cannot be parsed
    #[error("Invalid identifier: {0}")]
    InvalidIdentifier(String),

    /// Two parameters with the same name in one statement or batch
    #[error("Parameter '{0}' is declared more than once")]
    DuplicateParameter(String),

    /// Malformed `{n}` template
    #[error("Invalid template: {0}")]
    InvalidTemplate(String),

    /// The dialect has no type name for this declared type
    #[error("Unsupported type for this dialect: {0:?}")]
    UnsupportedType(DbType),

    /// A value kind that cannot be converted to the declared type at all
    #[error("Cannot convert {from} value to {to:?}")]
    Coercion { from: &'static str, to: DbType },

    #[error(transparent)]
    ParseInt(#[from] std::num::ParseIntError),

    #[error(transparent)]
    ParseFloat(#[from] std::num::ParseFloatError),

    #[error(transparent)]
    ParseBool(#[from] std::str::ParseBoolError),

    #[error(transparent)]
    ParseDate(#[from] chrono::ParseError),

    #[error(transparent)]
    ParseGuid(#[from] uuid::Error),

    #[error(transparent)]
    ParseDecimal(#[from] rust_decimal::Error),

    /// Configuration load/parse error
    #[error("Configuration error: {0}")]
    Config(String),
}

impl SqlError {
    /// Create an unregistered-table error
    pub fn unregistered(table: impl Into<String>) -> Self {
        Self::UnregisteredTable(table.into())
    }

    /// Create an identifier error
    pub fn identifier(message: impl Into<String>) -> Self {
        Self::InvalidIdentifier(message.into())
    }

    /// Create a template error
    pub fn template(message: impl Into<String>) -> Self {
        Self::InvalidTemplate(message.into())
    }

    /// Create a configuration error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// Check if this error is a caller mistake (as opposed to bad input data)
    pub fn is_usage_error(&self) -> bool {
        matches!(
            self,
            Self::PagingWithoutOrderBy
                | Self::InvalidPaging(_)
                | Self::UnregisteredTable(_)
                | Self::EmptyList(_)
                | Self::InvalidColumnExpression(_)
                | Self::InvalidIdentifier(_)
                | Self::InvalidTemplate(_)
                | Self::DuplicateParameter(_)
                | Self::UnsupportedType(_)
        )
    }

    /// Check if this error came from converting a value to its declared type
    pub fn is_coercion_error(&self) -> bool {
        matches!(
            self,
            Self::Coercion { .. }
                | Self::ParseInt(_)
                | Self::ParseFloat(_)
                | Self::ParseBool(_)
                | Self::ParseDate(_)
                | Self::ParseGuid(_)
                | Self::ParseDecimal(_)
        )
    }
}

impl From<toml::de::Error> for SqlError {
    fn from(err: toml::de::Error) -> Self {
        Self::Config(err.to_string())
    }
}
