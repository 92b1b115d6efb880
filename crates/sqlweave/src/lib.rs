//! # sqlweave
//!
//! Build SELECT statements as an object graph of tables, joins, columns and
//! filters, then render them to parameterized T-SQL.
//!
//! ## Features
//!
//! - **Deterministic output**: tables are aliased `t0, t1, …` and parameters named
//!   `p0, p1, …` in render order, so the same graph always renders the same text
//! - **Persistent builders**: every fluent call returns a fork; the original is untouched
//! - **Composable filters**: nested AND/OR groups, EXISTS, sub-query IN and COUNT,
//!   column-to-column comparisons, templates
//! - **Injection-safe by default**: values become parameters unless a literal is
//!   explicitly requested
//! - **Pluggable value coercion**: declared types convert values once, when the
//!   parameter is created
//!
//! ## Example
//!
//! ```
//! use sqlweave::prelude::*;
//!
//! let stmt = select_from("dbo.Contact")?
//!     .select_columns(["LastName", "FirstName"])?
//!     .where_all(|w| {
//!         w.eq("LastName", "Buchanan").gt("FirstName", "a");
//!     })?
//!     .order_by("LastName", SortDirection::Asc)?
//!     .order_by("FirstName", SortDirection::Desc)?
//!     .render()?;
//!
//! assert_eq!(stmt.parameters().len(), 2);
//! assert_eq!(stmt.parameters()[0].value, SqlValue::from("Buchanan"));
//! # Ok::<(), sqlweave::SqlError>(())
//! ```

pub mod args;
pub mod column;
pub mod command;
pub mod config;
pub mod convert;
pub mod dialect;
pub mod element;
pub mod error;
pub mod filter;
pub mod ident;
pub mod prelude;
pub mod select;
pub mod statement;
pub mod table;
pub mod template;
pub mod value;
pub mod writer;

pub use args::{BuildArguments, Parameter};
pub use column::{Aggregate, Column, ColumnKind};
pub use command::{CommandFactory, execute_with};
pub use config::{RenderConfig, RenderOptions};
pub use convert::{Coercion, TypeMap};
pub use dialect::{Dialect, SqlServerDialect};
pub use element::RenderElement;
pub use error::{SqlError, SqlResult};
pub use filter::{
    ColumnRef, CompareOp, DateRangeFilter, Filter, FilterGroup, Logic, WildcardMode,
};
pub use ident::Ident;
pub use select::{Join, JoinKind, OrderBy, Paging, SelectBuilder, SortDirection, WhereBuilder};
pub use statement::{SqlStatement, render_batch};
pub use table::{Table, TableRef};
pub use template::{Template, TemplateArg};
pub use value::{DbType, SqlType, SqlValue};
pub use writer::SqlWriter;

use std::sync::Arc;

/// Builder over `table` with the default configuration.
///
/// `table` is parsed with [`TableRef::parse`]: text containing a `SELECT` token
/// becomes a derived table.
pub fn select_from(table: &str) -> SqlResult<SelectBuilder> {
    SelectBuilder::from_table(table, Arc::new(RenderConfig::default()))
}

/// Builder over a raw SQL string; see [`SelectBuilder::parse`].
pub fn select_sql(sql: &str) -> SqlResult<SelectBuilder> {
    SelectBuilder::parse(sql, Arc::new(RenderConfig::default()))
}
