//! Callback context for building filter groups.
//!
//! Helpers record the first construction error (bad identifier, bad template)
//! and keep chaining; the error is returned when the group is finished.

use super::SelectBuilder;
use crate::error::{SqlError, SqlResult};
use crate::filter::{ColumnRef, CompareOp, Filter, FilterGroup, Logic, WildcardMode};
use crate::ident::Ident;
use crate::table::TableRef;
use crate::template::TemplateArg;
use crate::value::{DbType, SqlType, SqlValue};
use chrono::NaiveDateTime;

/// Collects filters for one group; column names resolve against the current table.
#[derive(Debug)]
pub struct WhereBuilder {
    table: TableRef,
    filters: Vec<Filter>,
    error: Option<SqlError>,
}

impl WhereBuilder {
    pub fn new(table: &TableRef) -> Self {
        Self {
            table: table.clone(),
            filters: Vec::new(),
            error: None,
        }
    }

    /// Resolve subsequent column names against `table`.
    pub fn on(&mut self, table: &TableRef) -> &mut Self {
        self.table = table.clone();
        self
    }

    pub fn table(&self) -> &TableRef {
        &self.table
    }

    fn push(&mut self, filter: SqlResult<Filter>) -> &mut Self {
        match filter {
            Ok(filter) => self.filters.push(filter),
            Err(e) => {
                if self.error.is_none() {
                    self.error = Some(e);
                }
            }
        }
        self
    }

    /// Add a prebuilt filter.
    pub fn filter(&mut self, filter: Filter) -> &mut Self {
        self.push(Ok(filter))
    }

    // ==================== comparisons ====================

    pub fn compare<T: SqlType>(&mut self, column: &str, op: CompareOp, value: T) -> &mut Self {
        let filter = Filter::compare(&self.table, column, op, value);
        self.push(filter)
    }

    /// Comparison with an explicit declared type; the value is coerced when bound.
    pub fn compare_as(
        &mut self,
        column: &str,
        op: CompareOp,
        value: impl Into<SqlValue>,
        db_type: DbType,
    ) -> &mut Self {
        let filter = Filter::compare_as(&self.table, column, op, value, db_type);
        self.push(filter)
    }

    /// Inline comparison; only for trusted constants.
    pub fn compare_literal<T: SqlType>(
        &mut self,
        column: &str,
        op: CompareOp,
        value: T,
    ) -> &mut Self {
        let filter = Filter::compare_literal(&self.table, column, op, value);
        self.push(filter)
    }

    pub fn eq<T: SqlType>(&mut self, column: &str, value: T) -> &mut Self {
        self.compare(column, CompareOp::Eq, value)
    }

    pub fn ne<T: SqlType>(&mut self, column: &str, value: T) -> &mut Self {
        self.compare(column, CompareOp::Ne, value)
    }

    pub fn gt<T: SqlType>(&mut self, column: &str, value: T) -> &mut Self {
        self.compare(column, CompareOp::Gt, value)
    }

    pub fn ge<T: SqlType>(&mut self, column: &str, value: T) -> &mut Self {
        self.compare(column, CompareOp::Ge, value)
    }

    pub fn lt<T: SqlType>(&mut self, column: &str, value: T) -> &mut Self {
        self.compare(column, CompareOp::Lt, value)
    }

    pub fn le<T: SqlType>(&mut self, column: &str, value: T) -> &mut Self {
        self.compare(column, CompareOp::Le, value)
    }

    // ==================== lists / null / like ====================

    pub fn in_list<T: SqlType>(
        &mut self,
        column: &str,
        values: impl IntoIterator<Item = T>,
    ) -> &mut Self {
        let filter = Filter::in_list(&self.table, column, values);
        self.push(filter)
    }

    pub fn not_in_list<T: SqlType>(
        &mut self,
        column: &str,
        values: impl IntoIterator<Item = T>,
    ) -> &mut Self {
        let filter = Filter::not_in_list(&self.table, column, values);
        self.push(filter)
    }

    /// IN list with integer values written as bare literals.
    pub fn in_literal_numbers<T: SqlType>(
        &mut self,
        column: &str,
        values: impl IntoIterator<Item = T>,
    ) -> &mut Self {
        let filter = Filter::list(&self.table, column, values, false, true);
        self.push(filter)
    }

    pub fn is_null(&mut self, column: &str) -> &mut Self {
        let filter = Filter::is_null(&self.table, column);
        self.push(filter)
    }

    pub fn is_not_null(&mut self, column: &str) -> &mut Self {
        let filter = Filter::is_not_null(&self.table, column);
        self.push(filter)
    }

    pub fn like(&mut self, column: &str, pattern: &str, mode: WildcardMode) -> &mut Self {
        let filter = Filter::like(&self.table, column, pattern, mode);
        self.push(filter)
    }

    pub fn not_like(&mut self, column: &str, pattern: &str, mode: WildcardMode) -> &mut Self {
        let filter = Filter::not_like(&self.table, column, pattern, mode);
        self.push(filter)
    }

    pub fn starts_with(&mut self, column: &str, prefix: &str) -> &mut Self {
        self.like(column, prefix, WildcardMode::BeginsWith)
    }

    pub fn contains(&mut self, column: &str, text: &str) -> &mut Self {
        self.like(column, text, WildcardMode::Contains)
    }

    pub fn ends_with(&mut self, column: &str, suffix: &str) -> &mut Self {
        self.like(column, suffix, WildcardMode::EndsWith)
    }

    // ==================== ranges ====================

    pub fn date_range(
        &mut self,
        column: &str,
        begin: NaiveDateTime,
        end: NaiveDateTime,
    ) -> &mut Self {
        let filter = Filter::date_range(&self.table, column, begin, end);
        self.push(filter)
    }

    /// Range over whole days; both bounds are truncated to midnight.
    pub fn date_only_range(
        &mut self,
        column: &str,
        begin: NaiveDateTime,
        end: NaiveDateTime,
    ) -> &mut Self {
        let filter = Filter::date_only_range(&self.table, column, begin, end);
        self.push(filter)
    }

    // ==================== column / sub-query predicates ====================

    /// `current.column OP other.other_column`
    pub fn column_compare(
        &mut self,
        column: &str,
        op: CompareOp,
        other: &TableRef,
        other_column: &str,
    ) -> &mut Self {
        let filter = ColumnRef::new(&self.table, column).and_then(|left| {
            let right = ColumnRef::new(other, other_column)?;
            Ok(Filter::column_compare(left, op, right))
        });
        self.push(filter)
    }

    pub fn exists(&mut self, query: &SelectBuilder) -> &mut Self {
        self.push(Ok(Filter::exists(query.clone())))
    }

    pub fn not_exists(&mut self, query: &SelectBuilder) -> &mut Self {
        self.push(Ok(Filter::not_exists(query.clone())))
    }

    /// `column IN (SELECT sub_column FROM table WHERE …)`; `f` builds the
    /// sub-query filters against `table`.
    pub fn in_sub_query<F>(
        &mut self,
        column: &str,
        table: &TableRef,
        sub_column: &str,
        f: F,
    ) -> &mut Self
    where
        F: FnOnce(&mut WhereBuilder),
    {
        let filter = self.sub_query_in(column, table, sub_column, false, f);
        self.push(filter)
    }

    pub fn not_in_sub_query<F>(
        &mut self,
        column: &str,
        table: &TableRef,
        sub_column: &str,
        f: F,
    ) -> &mut Self
    where
        F: FnOnce(&mut WhereBuilder),
    {
        let filter = self.sub_query_in(column, table, sub_column, true, f);
        self.push(filter)
    }

    fn sub_query_in<F>(
        &self,
        column: &str,
        table: &TableRef,
        sub_column: &str,
        negated: bool,
        f: F,
    ) -> SqlResult<Filter>
    where
        F: FnOnce(&mut WhereBuilder),
    {
        let mut inner = WhereBuilder::new(table);
        f(&mut inner);
        Ok(Filter::SubQueryIn {
            column: ColumnRef::new(&self.table, column)?,
            table: table.clone(),
            sub_column: Ident::single(sub_column)?,
            filters: inner.finish(Logic::And)?,
            negated,
        })
    }

    /// `(SELECT COUNT(count_column) … WHERE …) OP count`
    pub fn count<F>(
        &mut self,
        table: &TableRef,
        count_column: &str,
        op: CompareOp,
        count: i32,
        f: F,
    ) -> &mut Self
    where
        F: FnOnce(&mut WhereBuilder),
    {
        let mut inner = WhereBuilder::new(table);
        f(&mut inner);
        let filter = Ident::single(count_column).and_then(|count_column| {
            Ok(Filter::SubQueryCount {
                table: table.clone(),
                count_column,
                filters: inner.finish(Logic::And)?,
                op,
                count,
            })
        });
        self.push(filter)
    }

    // ==================== raw ====================

    /// `{n}` template resolved against `args`.
    pub fn template(
        &mut self,
        template: &str,
        args: impl IntoIterator<Item = TemplateArg>,
    ) -> &mut Self {
        let filter = Filter::template(template, args);
        self.push(filter)
    }

    pub fn raw(&mut self, sql: &str) -> &mut Self {
        self.push(Ok(Filter::raw(sql)))
    }

    // ==================== nesting ====================

    /// Nested AND group.
    pub fn all<F>(&mut self, f: F) -> &mut Self
    where
        F: FnOnce(&mut WhereBuilder),
    {
        self.group(Logic::And, f)
    }

    /// Nested OR group.
    pub fn any<F>(&mut self, f: F) -> &mut Self
    where
        F: FnOnce(&mut WhereBuilder),
    {
        self.group(Logic::Or, f)
    }

    fn group<F>(&mut self, logic: Logic, f: F) -> &mut Self
    where
        F: FnOnce(&mut WhereBuilder),
    {
        let mut inner = WhereBuilder::new(&self.table);
        f(&mut inner);
        let group = inner.finish(logic).map(Filter::Group);
        self.push(group)
    }

    /// Close the group, surfacing the first recorded error.
    pub fn finish(self, logic: Logic) -> SqlResult<FilterGroup> {
        match self.error {
            Some(e) => Err(e),
            None => Ok(FilterGroup::from_filters(logic, self.filters)),
        }
    }
}
