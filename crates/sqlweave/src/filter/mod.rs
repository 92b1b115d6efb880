//! WHERE / ON predicates.
//!
//! [`Filter`] is a closed set of predicate kinds; [`FilterGroup`] joins filters
//! with AND or OR and is itself a filter. Single-column filters always render
//! inside one pair of parentheses. Groups add parentheses only when more than
//! one member produces output, and an empty group produces nothing at all.
//!
//! ```
//! use sqlweave::filter::{CompareOp, Filter, FilterGroup, Logic};
//! use sqlweave::table::TableRef;
//!
//! let t = TableRef::physical("dbo.Contact")?;
//! let group = FilterGroup::new(Logic::Or)
//!     .with(Filter::compare(&t, "LastName", CompareOp::Eq, "Buchanan")?)
//!     .with(Filter::is_null(&t, "LastName")?);
//! assert_eq!(group.len(), 2);
//! # Ok::<(), sqlweave::SqlError>(())
//! ```

use crate::args::BuildArguments;
use crate::element::RenderElement;
use crate::error::{SqlError, SqlResult};
use crate::ident::Ident;
use crate::select::SelectBuilder;
use crate::table::TableRef;
use crate::template::{Template, TemplateArg};
use crate::value::{DbType, SqlType, SqlValue};
use crate::writer::SqlWriter;
use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};


/// Comparison operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CompareOp {
    Eq,
    Ne,
    Gt,
    Ge,
    Lt,
    Le,
}

/// How members of a [`FilterGroup`] are joined.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Logic {
    And,
    Or,
}

impl Logic {
    fn separator(self) -> &'static str {
        match self {
            Logic::And => " AND ",
            Logic::Or => " OR ",
        }
    }
}

/// Wildcard decoration applied to LIKE patterns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum WildcardMode {
    #[default]
    None,
    BeginsWith,
    Contains,
    EndsWith,
}

impl WildcardMode {
    /// Patterns that already contain `*` or `%` only get `*` translated to `%`.
    pub fn decorate(self, pattern: &str) -> String {
        if pattern.contains('*') || pattern.contains('%') {
            return pattern.replace('*', "%");
        }
        match self {
            WildcardMode::None => pattern.to_string(),
            WildcardMode::BeginsWith => format!("{pattern}%"),
            WildcardMode::Contains => format!("%{pattern}%"),
            WildcardMode::EndsWith => format!("%{pattern}"),
        }
    }
}

/// A column referenced by a filter: `[t0].[Name]`.
#[derive(Debug, Clone)]
pub struct ColumnRef {
    table: Option<TableRef>,
    name: Ident,
}

impl ColumnRef {
    pub fn new(table: &TableRef, name: &str) -> SqlResult<Self> {
        Ok(Self {
            table: Some(table.clone()),
            name: Ident::single(name)?,
        })
    }

    /// Column written without a table alias.
    pub fn unqualified(name: &str) -> SqlResult<Self> {
        Ok(Self {
            table: None,
            name: Ident::single(name)?,
        })
    }

    pub fn table(&self) -> Option<&TableRef> {
        self.table.as_ref()
    }

    pub fn name(&self) -> &str {
        self.name.name()
    }

    fn write(&self, w: &mut SqlWriter, args: &BuildArguments) -> SqlResult<()> {
        let alias = self.table.as_ref().map(|t| args.alias_of(t)).transpose()?;
        w.qualified_column(alias.as_deref(), &self.name, None);
        Ok(())
    }
}

/// Inclusive range over a date or date-time column.
///
/// A date-only range truncates both bounds to midnight as soon as they are set.
#[derive(Debug, Clone)]
pub struct DateRangeFilter {
    column: ColumnRef,
    begin: NaiveDateTime,
    end: NaiveDateTime,
    date_only: bool,
}

impl DateRangeFilter {
    pub fn new(column: ColumnRef, begin: NaiveDateTime, end: NaiveDateTime) -> Self {
        Self {
            column,
            begin,
            end,
            date_only: false,
        }
    }

    pub fn date_only(column: ColumnRef, begin: NaiveDateTime, end: NaiveDateTime) -> Self {
        Self {
            column,
            begin: midnight(begin.date()),
            end: midnight(end.date()),
            date_only: true,
        }
    }

    pub fn begin(&self) -> NaiveDateTime {
        self.begin
    }

    pub fn end(&self) -> NaiveDateTime {
        self.end
    }

    pub fn is_date_only(&self) -> bool {
        self.date_only
    }

    pub fn column(&self) -> &ColumnRef {
        &self.column
    }

    pub fn set_begin(&mut self, begin: NaiveDateTime) {
        self.begin = if self.date_only {
            midnight(begin.date())
        } else {
            begin
        };
    }

    pub fn set_end(&mut self, end: NaiveDateTime) {
        self.end = if self.date_only {
            midnight(end.date())
        } else {
            end
        };
    }

    fn render(&self, w: &mut SqlWriter, args: &mut BuildArguments) -> SqlResult<()> {
        let (begin, end, db_type) = if self.date_only {
            (
                SqlValue::Date(self.begin.date()),
                SqlValue::Date(self.end.date()),
                DbType::Date,
            )
        } else {
            (
                SqlValue::DateTime(self.begin),
                SqlValue::DateTime(self.end),
                DbType::DateTime,
            )
        };
        w.open_group();
        self.column.write(w, args)?;
        let p = args.create_parameter(begin, db_type, None)?;
        w.raw(">=").parameter(&p).raw(" AND ");
        self.column.write(w, args)?;
        let p = args.create_parameter(end, db_type, None)?;
        w.raw("<=").parameter(&p).close_group();
        Ok(())
    }
}

fn midnight(date: NaiveDate) -> NaiveDateTime {
    date.and_time(chrono::NaiveTime::MIN)
}

/// Ordered AND/OR group of filters.
#[derive(Debug, Clone)]
pub struct FilterGroup {
    logic: Logic,
    filters: Vec<Filter>,
}

impl Default for FilterGroup {
    fn default() -> Self {
        Self::new(Logic::And)
    }
}

impl FilterGroup {
    pub fn new(logic: Logic) -> Self {
        Self {
            logic,
            filters: Vec::new(),
        }
    }

    pub fn and() -> Self {
        Self::new(Logic::And)
    }

    pub fn or() -> Self {
        Self::new(Logic::Or)
    }

    pub fn from_filters(logic: Logic, filters: Vec<Filter>) -> Self {
        Self { logic, filters }
    }

    pub fn with(mut self, filter: Filter) -> Self {
        self.filters.push(filter);
        self
    }

    pub fn push(&mut self, filter: Filter) {
        self.filters.push(filter);
    }

    pub fn logic(&self) -> Logic {
        self.logic
    }

    pub fn filters(&self) -> &[Filter] {
        &self.filters
    }

    pub fn len(&self) -> usize {
        self.filters.len()
    }

    /// True when rendering would produce no text.
    pub fn is_empty(&self) -> bool {
        self.filters.iter().all(Filter::is_empty)
    }

    /// Members joined by the group's logic, without surrounding parentheses.
    pub(crate) fn write_members(
        &self,
        w: &mut SqlWriter,
        args: &mut BuildArguments,
    ) -> SqlResult<()> {
        let mut first = true;
        for filter in self.filters.iter().filter(|f| !f.is_empty()) {
            if !first {
                w.raw(self.logic.separator());
            }
            first = false;
            filter.render(w, args)?;
        }
        Ok(())
    }
}

impl RenderElement for FilterGroup {
    fn render(&self, w: &mut SqlWriter, args: &mut BuildArguments) -> SqlResult<()> {
        let active = self.filters.iter().filter(|f| !f.is_empty()).count();
        match active {
            0 => Ok(()),
            1 => self.write_members(w, args),
            _ => {
                w.open_group();
                self.write_members(w, args)?;
                w.close_group();
                Ok(())
            }
        }
    }
}

/// A predicate node.
#[derive(Debug, Clone)]
pub enum Filter {
    /// `(col OP @p)` or `(col OP literal)`
    Compare {
        column: ColumnRef,
        op: CompareOp,
        value: SqlValue,
        db_type: DbType,
        literal: bool,
    },
    /// `(col [NOT] IN (…))`
    List {
        column: ColumnRef,
        values: Vec<SqlValue>,
        db_type: DbType,
        negated: bool,
        literal_numbers: bool,
    },
    /// `(col IS [NOT] NULL)`
    Null { column: ColumnRef, negated: bool },
    /// `(col [NOT] LIKE @p)`
    Like {
        column: ColumnRef,
        pattern: String,
        mode: WildcardMode,
        negated: bool,
    },
    DateRange(DateRangeFilter),
    /// `(left OP right)`, no parameter.
    ColumnCompare {
        left: ColumnRef,
        op: CompareOp,
        right: ColumnRef,
    },
    /// `([NOT] EXISTS (SELECT …))`
    Exists {
        builder: Box<SelectBuilder>,
        negated: bool,
    },
    /// `(col [NOT] IN (SELECT sub FROM table WHERE …))`
    SubQueryIn {
        column: ColumnRef,
        table: TableRef,
        sub_column: Ident,
        filters: FilterGroup,
        negated: bool,
    },
    /// `((SELECT COUNT(col) AS Cnt FROM table WHERE …) OP @p)`
    SubQueryCount {
        table: TableRef,
        count_column: Ident,
        filters: FilterGroup,
        op: CompareOp,
        count: i32,
    },
    Template {
        template: Template,
        args: Vec<TemplateArg>,
    },
    /// Caller SQL, parenthesized.
    Raw(String),
    Group(FilterGroup),
}

impl Filter {
    /// Typed comparison; the declared type comes from `T`.
    pub fn compare<T: SqlType>(
        table: &TableRef,
        column: &str,
        op: CompareOp,
        value: T,
    ) -> SqlResult<Self> {
        Self::compare_as(table, column, op, value, T::db_type())
    }

    /// Comparison with an explicit declared type.
    pub fn compare_as(
        table: &TableRef,
        column: &str,
        op: CompareOp,
        value: impl Into<SqlValue>,
        db_type: DbType,
    ) -> SqlResult<Self> {
        Ok(Filter::Compare {
            column: ColumnRef::new(table, column)?,
            op,
            value: value.into(),
            db_type,
            literal: false,
        })
    }

    /// Comparison written inline; only for trusted constant values.
    pub fn compare_literal<T: SqlType>(
        table: &TableRef,
        column: &str,
        op: CompareOp,
        value: T,
    ) -> SqlResult<Self> {
        Ok(Filter::Compare {
            column: ColumnRef::new(table, column)?,
            op,
            value: value.into(),
            db_type: T::db_type(),
            literal: true,
        })
    }

    pub fn in_list<T: SqlType>(
        table: &TableRef,
        column: &str,
        values: impl IntoIterator<Item = T>,
    ) -> SqlResult<Self> {
        Self::list(table, column, values, false, false)
    }

    pub fn not_in_list<T: SqlType>(
        table: &TableRef,
        column: &str,
        values: impl IntoIterator<Item = T>,
    ) -> SqlResult<Self> {
        Self::list(table, column, values, true, false)
    }

    /// IN list; integer values are written as bare literals when `literal_numbers` is set.
    pub fn list<T: SqlType>(
        table: &TableRef,
        column: &str,
        values: impl IntoIterator<Item = T>,
        negated: bool,
        literal_numbers: bool,
    ) -> SqlResult<Self> {
        Ok(Filter::List {
            column: ColumnRef::new(table, column)?,
            values: values.into_iter().map(Into::into).collect(),
            db_type: T::db_type(),
            negated,
            literal_numbers,
        })
    }

    pub fn is_null(table: &TableRef, column: &str) -> SqlResult<Self> {
        Ok(Filter::Null {
            column: ColumnRef::new(table, column)?,
            negated: false,
        })
    }

    pub fn is_not_null(table: &TableRef, column: &str) -> SqlResult<Self> {
        Ok(Filter::Null {
            column: ColumnRef::new(table, column)?,
            negated: true,
        })
    }

    pub fn like(
        table: &TableRef,
        column: &str,
        pattern: &str,
        mode: WildcardMode,
    ) -> SqlResult<Self> {
        Ok(Filter::Like {
            column: ColumnRef::new(table, column)?,
            pattern: pattern.to_string(),
            mode,
            negated: false,
        })
    }

    pub fn not_like(
        table: &TableRef,
        column: &str,
        pattern: &str,
        mode: WildcardMode,
    ) -> SqlResult<Self> {
        Ok(Filter::Like {
            column: ColumnRef::new(table, column)?,
            pattern: pattern.to_string(),
            mode,
            negated: true,
        })
    }

    pub fn date_range(
        table: &TableRef,
        column: &str,
        begin: NaiveDateTime,
        end: NaiveDateTime,
    ) -> SqlResult<Self> {
        Ok(Filter::DateRange(DateRangeFilter::new(
            ColumnRef::new(table, column)?,
            begin,
            end,
        )))
    }

    pub fn date_only_range(
        table: &TableRef,
        column: &str,
        begin: NaiveDateTime,
        end: NaiveDateTime,
    ) -> SqlResult<Self> {
        Ok(Filter::DateRange(DateRangeFilter::date_only(
            ColumnRef::new(table, column)?,
            begin,
            end,
        )))
    }

    pub fn column_compare(left: ColumnRef, op: CompareOp, right: ColumnRef) -> Self {
        Filter::ColumnCompare { left, op, right }
    }

    pub fn exists(builder: SelectBuilder) -> Self {
        Filter::Exists {
            builder: Box::new(builder),
            negated: false,
        }
    }

    pub fn not_exists(builder: SelectBuilder) -> Self {
        Filter::Exists {
            builder: Box::new(builder),
            negated: true,
        }
    }

    pub fn template(
        template: &str,
        args: impl IntoIterator<Item = TemplateArg>,
    ) -> SqlResult<Self> {
        Ok(Filter::Template {
            template: Template::parse(template)?,
            args: args.into_iter().collect(),
        })
    }

    pub fn raw(sql: impl Into<String>) -> Self {
        Filter::Raw(sql.into())
    }

    /// Only groups with no rendering members are empty.
    pub fn is_empty(&self) -> bool {
        match self {
            Filter::Group(group) => group.is_empty(),
            _ => false,
        }
    }
}

impl From<FilterGroup> for Filter {
    fn from(group: FilterGroup) -> Self {
        Filter::Group(group)
    }
}

impl From<DateRangeFilter> for Filter {
    fn from(range: DateRangeFilter) -> Self {
        Filter::DateRange(range)
    }
}

/// ` WHERE …` for a sub-query filter set; nothing when empty.
fn write_sub_where(
    filters: &FilterGroup,
    w: &mut SqlWriter,
    args: &mut BuildArguments,
) -> SqlResult<()> {
    if !filters.is_empty() {
        w.raw(" WHERE ");
        filters.write_members(w, args)?;
    }
    Ok(())
}

impl RenderElement for Filter {
    fn render(&self, w: &mut SqlWriter, args: &mut BuildArguments) -> SqlResult<()> {
        match self {
            Filter::Compare {
                column,
                op,
                value,
                db_type,
                literal,
            } => {
                w.open_group();
                column.write(w, args)?;
                w.operator(*op);
                if *literal {
                    let value = args.coerce(value.clone(), *db_type)?;
                    w.literal(&value)?;
                } else {
                    let name = args.create_parameter(value.clone(), *db_type, None)?;
                    w.parameter(&name);
                }
                w.close_group();
            }
            Filter::List {
                column,
                values,
                db_type,
                negated,
                literal_numbers,
            } => {
                if values.is_empty() {
                    return Err(SqlError::EmptyList(column.name().to_string()));
                }
                w.open_group();
                column.write(w, args)?;
                w.raw(if *negated { " NOT IN (" } else { " IN (" });
                for (i, value) in values.iter().enumerate() {
                    if i > 0 {
                        w.char(',');
                    }
                    if db_type.is_string() {
                        let name = args.create_parameter(value.clone(), *db_type, None)?;
                        w.parameter(&name);
                    } else if db_type.is_boolean() || (db_type.is_integer() && *literal_numbers) {
                        let value = args.coerce(value.clone(), *db_type)?;
                        w.literal(&value)?;
                    } else {
                        let name = args.create_parameter(value.clone(), *db_type, None)?;
                        w.parameter(&name);
                    }
                }
                w.close_group().close_group();
            }
            Filter::Null { column, negated } => {
                w.open_group();
                column.write(w, args)?;
                w.raw(if *negated { " IS NOT NULL" } else { " IS NULL" });
                w.close_group();
            }
            Filter::Like {
                column,
                pattern,
                mode,
                negated,
            } => {
                w.open_group();
                column.write(w, args)?;
                w.raw(if *negated { " NOT LIKE " } else { " LIKE " });
                let value = SqlValue::String(mode.decorate(pattern));
                let name = args.create_parameter(value, DbType::String, None)?;
                w.parameter(&name).close_group();
            }
            Filter::DateRange(range) => range.render(w, args)?,
            Filter::ColumnCompare { left, op, right } => {
                w.open_group();
                left.write(w, args)?;
                w.operator(*op);
                right.write(w, args)?;
                w.close_group();
            }
            Filter::Exists { builder, negated } => {
                w.raw(if *negated { "(NOT EXISTS (" } else { "(EXISTS (" });
                builder.write_query(w, args)?;
                w.close_group().close_group();
            }
            Filter::SubQueryIn {
                column,
                table,
                sub_column,
                filters,
                negated,
            } => {
                w.open_group();
                column.write(w, args)?;
                w.raw(if *negated { " NOT IN (SELECT " } else { " IN (SELECT " });
                table.compile(args);
                let alias = args.alias_of(table)?;
                w.qualified_column(Some(&alias), sub_column, None);
                w.raw(" FROM ");
                table.render(w, args)?;
                write_sub_where(filters, w, args)?;
                w.close_group().close_group();
            }
            Filter::SubQueryCount {
                table,
                count_column,
                filters,
                op,
                count,
            } => {
                w.raw("((SELECT COUNT(");
                table.compile(args);
                let alias = args.alias_of(table)?;
                w.qualified_column(Some(&alias), count_column, None);
                w.raw(") AS Cnt FROM ");
                table.render(w, args)?;
                write_sub_where(filters, w, args)?;
                w.close_group().operator(*op);
                let name = args.create_parameter(SqlValue::Int32(*count), DbType::Int32, None)?;
                w.parameter(&name).close_group();
            }
            Filter::Template {
                template,
                args: template_args,
            } => {
                template.check_args(template_args.len())?;
                w.open_group();
                template.write(w, args, |i, w, args| template_args[i].write(w, args))?;
                w.close_group();
            }
            Filter::Raw(sql) => {
                w.open_group().raw(sql).close_group();
            }
            Filter::Group(group) => group.render(w, args)?,
        }
        Ok(())
    }
}
