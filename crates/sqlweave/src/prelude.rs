//! Convenient imports for typical `sqlweave` usage.
//!
//! ```
//! use sqlweave::prelude::*;
//! ```

pub use crate::{
    Aggregate, Column, CompareOp, DbType, Filter, FilterGroup, JoinKind, Logic, RenderConfig,
    SelectBuilder, SortDirection, SqlError, SqlResult, SqlStatement, SqlValue, TableRef,
    TemplateArg, WhereBuilder, WildcardMode, render_batch, select_from, select_sql,
};
