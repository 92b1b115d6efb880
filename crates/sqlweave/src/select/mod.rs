//! SELECT statement builder.
//!
//! [`SelectBuilder`] is a persistent value: every fluent method takes `&self`
//! and returns a modified fork, leaving the original untouched. Rendering walks
//! the graph once, in clause order:
//!
//! prefix → SELECT → FROM → JOIN → WHERE → GROUP BY → ORDER BY → paging → `;` → suffix
//!
//! ```
//! use sqlweave::prelude::*;
//!
//! let stmt = select_from("dbo.Contact")?
//!     .select_columns(["LastName", "FirstName"])?
//!     .where_all(|w| {
//!         w.eq("LastName", "Buchanan");
//!     })?
//!     .order_by("LastName", SortDirection::Asc)?
//!     .render()?;
//!
//! assert_eq!(
//!     stmt.command_text(),
//!     "SELECT [t0].[LastName],[t0].[FirstName] FROM [dbo].[Contact] AS [t0] \
//!      WHERE ([t0].[LastName]=@p0) ORDER BY [LastName] ASC;"
//! );
//! # Ok::<(), sqlweave::SqlError>(())
//! ```

mod where_builder;

#[cfg(test)]
mod tests;

pub use where_builder::WhereBuilder;

use crate::args::BuildArguments;
use crate::column::Column;
use crate::config::RenderConfig;
use crate::element::RenderElement;
use crate::error::{SqlError, SqlResult};
use crate::filter::{Filter, FilterGroup, Logic};
use crate::ident::Ident;
use crate::statement::SqlStatement;
use crate::table::TableRef;
use crate::value::{DbType, SqlValue};
use crate::writer::SqlWriter;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::{Arc, OnceLock};
use std::time::Duration;

fn order_by_token() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?i)\bORDER\s+BY\b").expect("invalid built-in ORDER BY regex")
    })
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SortDirection {
    Asc,
    Desc,
}

impl SortDirection {
    fn keyword(self) -> &'static str {
        match self {
            SortDirection::Asc => "ASC",
            SortDirection::Desc => "DESC",
        }
    }
}

#[derive(Debug, Clone)]
pub enum OrderExpr {
    Column(Ident),
    Raw(String),
}

/// One ORDER BY entry; the direction is omitted when unset.
#[derive(Debug, Clone)]
pub struct OrderBy {
    expr: OrderExpr,
    direction: Option<SortDirection>,
}

impl OrderBy {
    pub fn column(name: &str, direction: Option<SortDirection>) -> SqlResult<Self> {
        Ok(Self {
            expr: OrderExpr::Column(Ident::parse(name)?),
            direction,
        })
    }

    pub fn raw(text: impl Into<String>, direction: Option<SortDirection>) -> Self {
        Self {
            expr: OrderExpr::Raw(text.into()),
            direction,
        }
    }

    pub fn expr(&self) -> &OrderExpr {
        &self.expr
    }

    pub fn direction(&self) -> Option<SortDirection> {
        self.direction
    }

    /// Parse the text after `ORDER BY` into entries.
    fn parse_clause(clause: &str) -> SqlResult<Vec<Self>> {
        let clause = clause.trim().trim_end_matches(';').trim_end();
        let mut entries = Vec::new();
        for item in split_top_level(clause) {
            let item = item.trim();
            if item.is_empty() {
                continue;
            }
            let (body, direction) = split_direction(item);
            let entry = if is_expression(body) {
                Self::raw(body, direction)
            } else {
                match Ident::parse(body) {
                    Ok(name) => Self {
                        expr: OrderExpr::Column(name),
                        direction,
                    },
                    Err(_) => Self::raw(body, direction),
                }
            };
            entries.push(entry);
        }
        Ok(entries)
    }
}

fn split_direction(item: &str) -> (&str, Option<SortDirection>) {
    let upper = item.to_ascii_uppercase();
    for (suffix, direction) in [(" DESC", SortDirection::Desc), (" ASC", SortDirection::Asc)] {
        if upper.ends_with(suffix) {
            return (item[..item.len() - suffix.len()].trim_end(), Some(direction));
        }
    }
    (item, None)
}

/// Characters of `text` outside identifier decoration and string literals,
/// each with the parenthesis depth in effect before it.
fn bare_chars(text: &str) -> impl Iterator<Item = (usize, char, usize)> + '_ {
    let mut depth = 0usize;
    let mut close: Option<char> = None;
    text.char_indices().filter_map(move |(i, c)| {
        if let Some(closer) = close {
            if c == closer {
                close = None;
            }
            return None;
        }
        let before = depth;
        match c {
            '[' => close = Some(']'),
            '"' => close = Some('"'),
            '\'' => close = Some('\''),
            '(' => depth += 1,
            ')' => depth = depth.saturating_sub(1),
            _ => {}
        }
        Some((i, c, before))
    })
}

/// Split on commas outside parentheses and identifier decoration.
fn split_top_level(text: &str) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut start = 0;
    for (i, c, depth) in bare_chars(text) {
        if c == ',' && depth == 0 {
            parts.push(&text[start..i]);
            start = i + 1;
        }
    }
    parts.push(&text[start..]);
    parts
}

/// An ORDER BY item that is more than a (possibly dotted) name.
fn is_expression(body: &str) -> bool {
    bare_chars(body).any(|(_, c, _)| c == '(' || c == ')' || c.is_whitespace())
}

/// Whether byte offset `pos` of `sql` sits outside every parenthesis, literal
/// and decorated identifier.
fn is_top_level(sql: &str, pos: usize) -> bool {
    bare_chars(sql)
        .find(|&(i, _, _)| i == pos)
        .is_some_and(|(_, _, depth)| depth == 0)
}

impl RenderElement for OrderBy {
    fn render(&self, w: &mut SqlWriter, _args: &mut BuildArguments) -> SqlResult<()> {
        match &self.expr {
            OrderExpr::Column(name) => {
                w.table_name(name);
            }
            OrderExpr::Raw(text) => {
                w.raw(text);
            }
        }
        if let Some(direction) = self.direction {
            w.char(' ').raw(direction.keyword());
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum JoinKind {
    Inner,
    Left,
    Right,
    Full,
    Cross,
}

impl JoinKind {
    fn keyword(self) -> &'static str {
        match self {
            JoinKind::Inner => "INNER JOIN ",
            JoinKind::Left => "LEFT JOIN ",
            JoinKind::Right => "RIGHT JOIN ",
            JoinKind::Full => "FULL JOIN ",
            JoinKind::Cross => "CROSS JOIN ",
        }
    }
}

/// `KIND JOIN table [ON conditions]`
#[derive(Debug, Clone)]
pub struct Join {
    kind: JoinKind,
    table: TableRef,
    on: FilterGroup,
}

impl Join {
    pub fn new(kind: JoinKind, table: TableRef, on: FilterGroup) -> Self {
        Self { kind, table, on }
    }

    pub fn kind(&self) -> JoinKind {
        self.kind
    }

    pub fn table(&self) -> &TableRef {
        &self.table
    }

    pub fn on(&self) -> &FilterGroup {
        &self.on
    }
}

impl RenderElement for Join {
    fn render(&self, w: &mut SqlWriter, args: &mut BuildArguments) -> SqlResult<()> {
        w.line().raw(self.kind.keyword());
        self.table.render(w, args)?;
        if self.kind != JoinKind::Cross && !self.on.is_empty() {
            w.raw(" ON ");
            self.on.write_members(w, args)?;
        }
        Ok(())
    }
}

/// Row window applied after ORDER BY. Zero means unset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Paging {
    pub limit: u64,
    pub offset: u64,
}

#[derive(Debug, Clone)]
struct NamedParameter {
    name: String,
    value: SqlValue,
    db_type: DbType,
}

/// SELECT statement graph.
#[derive(Debug, Clone)]
pub struct SelectBuilder {
    config: Arc<RenderConfig>,
    table: TableRef,
    joins: Vec<Join>,
    columns: Vec<Column>,
    filters: FilterGroup,
    order_by: Vec<OrderBy>,
    paging: Option<Paging>,
    distinct: bool,
    prefix: Option<String>,
    suffix: Option<String>,
    pretty: Option<bool>,
    parameters: Vec<NamedParameter>,
    timeout: Option<Duration>,
    terminated: bool,
}

impl SelectBuilder {
    pub fn new(table: TableRef, config: Arc<RenderConfig>) -> Self {
        Self {
            config,
            table,
            joins: Vec::new(),
            columns: Vec::new(),
            filters: FilterGroup::and(),
            order_by: Vec::new(),
            paging: None,
            distinct: false,
            prefix: None,
            suffix: None,
            pretty: None,
            parameters: Vec::new(),
            timeout: None,
            terminated: true,
        }
    }

    /// Builder over a table parsed with [`TableRef::parse`].
    pub fn from_table(table: &str, config: Arc<RenderConfig>) -> SqlResult<Self> {
        Ok(Self::new(TableRef::parse(table)?, config))
    }

    /// Wrap raw SQL as a derived table, lifting a trailing `ORDER BY` clause
    /// into the builder's sort list.
    ///
    /// Only an `ORDER BY` outside parentheses and string literals is lifted;
    /// one inside a sub-query stays in the derived table. Comments are not
    /// recognized, so an `ORDER BY` inside a comment may still be split on.
    pub fn parse(sql: &str, config: Arc<RenderConfig>) -> SqlResult<Self> {
        let lifted = order_by_token()
            .find_iter(sql)
            .filter(|m| is_top_level(sql, m.start()))
            .last();
        let (body, clause) = match lifted {
            Some(m) => (&sql[..m.start()], Some(&sql[m.end()..])),
            None => (sql, None),
        };
        let mut builder = Self::new(TableRef::parse(body)?, config);
        if let Some(clause) = clause {
            builder.order_by = OrderBy::parse_clause(clause)?;
        }
        Ok(builder)
    }

    // ==================== accessors ====================

    pub fn table(&self) -> &TableRef {
        &self.table
    }

    pub fn config(&self) -> &Arc<RenderConfig> {
        &self.config
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn joins(&self) -> &[Join] {
        &self.joins
    }

    pub fn filters(&self) -> &FilterGroup {
        &self.filters
    }

    pub fn order_by_entries(&self) -> &[OrderBy] {
        &self.order_by
    }

    pub fn paging(&self) -> Option<Paging> {
        self.paging
    }

    pub fn is_distinct(&self) -> bool {
        self.distinct
    }

    pub fn timeout_value(&self) -> Option<Duration> {
        self.timeout
    }

    /// Use this builder as a sub-query table source.
    pub fn as_table(&self) -> TableRef {
        TableRef::sub_query(self.clone())
    }

    // ==================== SELECT list ====================

    /// Add one `name [AS alias]` column of the root table.
    pub fn select(&self, expr: &str) -> SqlResult<Self> {
        let column = Column::parse(expr)?;
        Ok(self.column(column))
    }

    pub fn select_columns<I, S>(&self, exprs: I) -> SqlResult<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut next = self.clone();
        for expr in exprs {
            next.columns
                .push(Column::parse(expr.as_ref())?.or_table(&self.table));
        }
        Ok(next)
    }

    /// Add a prebuilt column; columns without a table are bound to the root table.
    pub fn column(&self, column: Column) -> Self {
        let mut next = self.clone();
        next.columns.push(column.or_table(&self.table));
        next
    }

    pub fn distinct(&self) -> Self {
        let mut next = self.clone();
        next.distinct = true;
        next
    }

    // ==================== JOIN ====================

    /// Add a join; conditions built in `on` default to the joined table.
    pub fn join<F>(&self, kind: JoinKind, table: &TableRef, on: F) -> SqlResult<Self>
    where
        F: FnOnce(&mut WhereBuilder),
    {
        let mut wb = WhereBuilder::new(table);
        on(&mut wb);
        let conditions = wb.finish(Logic::And)?;
        let mut next = self.clone();
        next.joins.push(Join::new(kind, table.clone(), conditions));
        Ok(next)
    }

    pub fn cross_join(&self, table: &TableRef) -> Self {
        let mut next = self.clone();
        next.joins
            .push(Join::new(JoinKind::Cross, table.clone(), FilterGroup::and()));
        next
    }

    // ==================== WHERE ====================

    /// AND the filters built in `f` into the WHERE clause.
    pub fn where_all<F>(&self, f: F) -> SqlResult<Self>
    where
        F: FnOnce(&mut WhereBuilder),
    {
        let mut wb = WhereBuilder::new(&self.table);
        f(&mut wb);
        let group = wb.finish(Logic::And)?;
        let mut next = self.clone();
        for filter in group.filters() {
            next.filters.push(filter.clone());
        }
        Ok(next)
    }

    /// AND one OR-group built in `f` into the WHERE clause.
    pub fn where_any<F>(&self, f: F) -> SqlResult<Self>
    where
        F: FnOnce(&mut WhereBuilder),
    {
        let mut wb = WhereBuilder::new(&self.table);
        f(&mut wb);
        let group = wb.finish(Logic::Or)?;
        Ok(self.filter(Filter::Group(group)))
    }

    /// One AND-group per item, ORed together.
    pub fn where_any_each<I, F>(&self, items: I, mut f: F) -> SqlResult<Self>
    where
        I: IntoIterator,
        F: FnMut(&mut WhereBuilder, I::Item),
    {
        let mut any = FilterGroup::or();
        for item in items {
            let mut wb = WhereBuilder::new(&self.table);
            f(&mut wb, item);
            any.push(Filter::Group(wb.finish(Logic::And)?));
        }
        Ok(self.filter(Filter::Group(any)))
    }

    pub fn filter(&self, filter: Filter) -> Self {
        let mut next = self.clone();
        next.filters.push(filter);
        next
    }

    // ==================== ORDER BY / paging ====================

    pub fn order_by(
        &self,
        column: &str,
        direction: impl Into<Option<SortDirection>>,
    ) -> SqlResult<Self> {
        let entry = OrderBy::column(column, direction.into())?;
        let mut next = self.clone();
        next.order_by.push(entry);
        Ok(next)
    }

    pub fn order_by_raw(
        &self,
        expr: &str,
        direction: impl Into<Option<SortDirection>>,
    ) -> Self {
        let mut next = self.clone();
        next.order_by.push(OrderBy::raw(expr, direction.into()));
        next
    }

    /// Restrict to `limit` rows after skipping `offset`. Requires ORDER BY.
    pub fn limit(&self, limit: i64, offset: i64) -> SqlResult<Self> {
        if self.order_by.is_empty() {
            return Err(SqlError::PagingWithoutOrderBy);
        }
        if limit < 0 || offset < 0 {
            return Err(SqlError::InvalidPaging(format!(
                "limit {limit} and offset {offset} must not be negative"
            )));
        }
        let mut next = self.clone();
        next.paging = Some(Paging {
            limit: limit as u64,
            offset: offset as u64,
        });
        Ok(next)
    }

    // ==================== statement options ====================

    /// Command timeout carried on the rendered statement.
    pub fn timeout(&self, timeout: Duration) -> Self {
        let mut next = self.clone();
        next.timeout = Some(timeout);
        next
    }

    /// Statement written (and terminated) before the SELECT.
    pub fn prefix(&self, sql: &str) -> Self {
        let mut next = self.clone();
        next.prefix = Some(sql.to_string());
        next
    }

    /// Statement written (and terminated) after the SELECT.
    pub fn suffix(&self, sql: &str) -> Self {
        let mut next = self.clone();
        next.suffix = Some(sql.to_string());
        next
    }

    /// Declare a caller-named parameter (for raw SQL that references `@name`).
    pub fn add_parameter(&self, name: &str, value: impl Into<SqlValue>, db_type: DbType) -> Self {
        let mut next = self.clone();
        next.parameters.push(NamedParameter {
            name: name.to_string(),
            value: value.into(),
            db_type,
        });
        next
    }

    pub fn pretty(&self, pretty: bool) -> Self {
        let mut next = self.clone();
        next.pretty = Some(pretty);
        next
    }

    /// Render without the trailing statement terminator.
    pub fn without_terminator(&self) -> Self {
        let mut next = self.clone();
        next.terminated = false;
        next
    }

    // ==================== rendering ====================

    /// Render with fresh arguments: parameters from `p0`, aliases from `t0`.
    pub fn render(&self) -> SqlResult<SqlStatement> {
        let mut args = BuildArguments::new(self.config.type_map());
        let mut w = self.writer();
        self.render_statement(&mut w, &mut args)?;

        #[cfg(feature = "tracing")]
        let table_count = args.table_count();

        let statement = SqlStatement::new(w.finish(), args.into_parameters(), self.timeout);

        #[cfg(feature = "tracing")]
        crate::statement::log_render(&self.config, &statement, table_count);

        Ok(statement)
    }

    pub(crate) fn writer(&self) -> SqlWriter {
        let mut w = SqlWriter::new(Arc::clone(&self.config));
        if let Some(pretty) = self.pretty {
            w.set_pretty(pretty);
        }
        w
    }

    /// Full statement: prefix, query, terminator, suffix.
    pub(crate) fn render_statement(
        &self,
        w: &mut SqlWriter,
        args: &mut BuildArguments,
    ) -> SqlResult<()> {
        for p in &self.parameters {
            args.add_named_parameter(&p.name, p.value.clone(), p.db_type, None)?;
        }
        if let Some(prefix) = &self.prefix {
            w.raw(prefix.trim_end().trim_end_matches(';'))
                .terminator()
                .line();
        }
        self.write_query(w, args)?;
        if self.terminated {
            w.terminator();
        }
        if let Some(suffix) = &self.suffix {
            w.line()
                .raw(suffix.trim_end().trim_end_matches(';'))
                .terminator();
        }
        Ok(())
    }

    /// Register the root table and every joined table, in declaration order.
    fn compile(&self, args: &mut BuildArguments) {
        self.table.compile(args);
        for join in &self.joins {
            join.table.compile(args);
        }
    }

    /// Unterminated query text, as used for nested rendering.
    pub(crate) fn write_query(&self, w: &mut SqlWriter, args: &mut BuildArguments) -> SqlResult<()> {
        self.compile(args);

        w.raw("SELECT ");
        if self.distinct {
            w.raw("DISTINCT ");
        }
        if self.columns.is_empty() {
            w.char('*');
        } else {
            for (i, column) in self.columns.iter().enumerate() {
                if i > 0 {
                    w.comma();
                }
                column.render(w, args)?;
            }
        }

        w.line().raw("FROM ");
        self.table.render(w, args)?;

        for join in &self.joins {
            join.render(w, args)?;
        }

        if !self.filters.is_empty() {
            w.line().raw("WHERE ");
            self.filters.write_members(w, args)?;
        }

        if self.columns.iter().any(Column::is_aggregate) {
            let grouped: Vec<&Column> =
                self.columns.iter().filter(|c| !c.is_aggregate()).collect();
            if !grouped.is_empty() {
                w.line().raw("GROUP BY ");
                for (i, column) in grouped.into_iter().enumerate() {
                    if i > 0 {
                        w.comma();
                    }
                    column.render_value(w, args)?;
                }
            }
        }

        if !self.order_by.is_empty() {
            w.line().raw("ORDER BY ");
            for (i, entry) in self.order_by.iter().enumerate() {
                if i > 0 {
                    w.comma();
                }
                entry.render(w, args)?;
            }
            if let Some(paging) = self.paging {
                w.paging(paging.limit, paging.offset);
            }
        }

        Ok(())
    }
}

impl RenderElement for SelectBuilder {
    fn render(&self, w: &mut SqlWriter, args: &mut BuildArguments) -> SqlResult<()> {
        self.write_query(w, args)
    }
}
