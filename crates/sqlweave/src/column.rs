//! Select-list columns.
//!
//! Every column has two renderings: the select-list form (value plus optional
//! `AS [alias]`) via [`RenderElement::render`], and the bare value form via
//! [`Column::render_value`] used by GROUP BY and sub-query projections.

use crate::args::BuildArguments;
use crate::element::RenderElement;
use crate::error::{SqlError, SqlResult};
use crate::ident::Ident;
use crate::table::TableRef;
use crate::template::Template;
use crate::value::SqlValue;
use crate::writer::SqlWriter;
use serde::{Deserialize, Serialize};

/// Aggregate function applied to a column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Aggregate {
    Count,
    CountDistinct,
    Sum,
    Avg,
    Min,
    Max,
    StDev,
    Var,
}

impl Aggregate {
    pub fn function(self) -> &'static str {
        match self {
            Aggregate::Count | Aggregate::CountDistinct => "COUNT",
            Aggregate::Sum => "SUM",
            Aggregate::Avg => "AVG",
            Aggregate::Min => "MIN",
            Aggregate::Max => "MAX",
            Aggregate::StDev => "STDEV",
            Aggregate::Var => "VAR",
        }
    }

    /// Output name of `AGG(*)` when no alias is given.
    fn default_alias(self) -> &'static str {
        match self {
            Aggregate::Count | Aggregate::CountDistinct => "Count",
            Aggregate::Sum => "Sum",
            Aggregate::Avg => "Avg",
            Aggregate::Min => "Min",
            Aggregate::Max => "Max",
            Aggregate::StDev => "StDev",
            Aggregate::Var => "Var",
        }
    }

    fn open(self, w: &mut SqlWriter) {
        w.raw(self.function()).open_group();
        if self == Aggregate::CountDistinct {
            w.raw("DISTINCT ");
        }
    }
}

#[derive(Debug, Clone)]
pub enum ColumnKind {
    /// Column reference: `[t0].[Name]`
    Simple(Ident),
    /// Raw SQL with `{0}` (owning table) and `{1}…` (reference tables) placeholders.
    Expression {
        template: Template,
        references: Vec<TableRef>,
    },
    /// `RANK() OVER (ORDER BY AGG(col) [DESC])`
    Rank { name: Ident, descending: bool },
    /// Constant projection, written as a literal.
    Literal(SqlValue),
    /// Unescaped caller text.
    Raw(String),
}

#[derive(Debug, Clone)]
pub struct Column {
    kind: ColumnKind,
    table: Option<TableRef>,
    alias: Option<String>,
    aggregate: Option<Aggregate>,
}

impl Column {
    fn from_kind(kind: ColumnKind) -> Self {
        Self {
            kind,
            table: None,
            alias: None,
            aggregate: None,
        }
    }

    /// Plain column reference. Dots are part of the name.
    pub fn new(name: &str) -> SqlResult<Self> {
        Ok(Self::from_kind(ColumnKind::Simple(Ident::single(name)?)))
    }

    /// Parse `name` or `name AS alias`.
    pub fn parse(expr: &str) -> SqlResult<Self> {
        let invalid = || SqlError::InvalidColumnExpression(expr.to_string());
        let tokens = split_tokens(expr).ok_or_else(invalid)?;
        match tokens.as_slice() {
            [name] => Self::new(name),
            [name, kw, alias] if kw.eq_ignore_ascii_case("AS") => {
                Ok(Self::new(name)?.with_alias(&crate::ident::unquote(alias)))
            }
            _ => Err(invalid()),
        }
    }

    pub fn expression(template: &str) -> SqlResult<Self> {
        Ok(Self::from_kind(ColumnKind::Expression {
            template: Template::parse(template)?,
            references: Vec::new(),
        }))
    }

    /// Rank column; always aliased.
    pub fn rank(name: &str, aggregate: Aggregate, descending: bool, alias: &str) -> SqlResult<Self> {
        Ok(Self::from_kind(ColumnKind::Rank {
            name: Ident::single(name)?,
            descending,
        })
        .with_aggregate(aggregate)
        .with_alias(alias))
    }

    pub fn literal(value: impl Into<SqlValue>) -> Self {
        Self::from_kind(ColumnKind::Literal(value.into()))
    }

    pub fn raw(text: impl Into<String>) -> Self {
        Self::from_kind(ColumnKind::Raw(text.into()))
    }

    /// Bind the owning table.
    pub fn of(mut self, table: &TableRef) -> Self {
        self.table = Some(table.clone());
        self
    }

    pub fn with_alias(mut self, alias: &str) -> Self {
        self.alias = Some(alias.to_string());
        self
    }

    pub fn with_aggregate(mut self, aggregate: Aggregate) -> Self {
        self.aggregate = Some(aggregate);
        self
    }

    /// Tables substituted for `{1}`, `{2}`, … in an expression column.
    pub fn with_references(mut self, tables: impl IntoIterator<Item = TableRef>) -> Self {
        if let ColumnKind::Expression { references, .. } = &mut self.kind {
            references.extend(tables);
        }
        self
    }

    pub(crate) fn or_table(mut self, table: &TableRef) -> Self {
        if self.table.is_none() {
            self.table = Some(table.clone());
        }
        self
    }

    pub fn kind(&self) -> &ColumnKind {
        &self.kind
    }

    pub fn table(&self) -> Option<&TableRef> {
        self.table.as_ref()
    }

    pub fn alias(&self) -> Option<&str> {
        self.alias.as_deref()
    }

    pub fn aggregate(&self) -> Option<Aggregate> {
        self.aggregate
    }

    /// Aggregate columns drive GROUP BY inference.
    pub fn is_aggregate(&self) -> bool {
        self.aggregate.is_some()
    }

    fn table_alias(&self, args: &BuildArguments) -> SqlResult<Option<String>> {
        self.table.as_ref().map(|t| args.alias_of(t)).transpose()
    }

    /// Value-only form.
    pub fn render_value(&self, w: &mut SqlWriter, args: &mut BuildArguments) -> SqlResult<()> {
        match &self.kind {
            ColumnKind::Simple(name) => {
                let alias = self.table_alias(args)?;
                match self.aggregate {
                    Some(agg) => {
                        agg.open(w);
                        w.qualified_column(alias.as_deref(), name, None);
                        w.close_group();
                    }
                    None => {
                        w.qualified_column(alias.as_deref(), name, None);
                    }
                }
            }
            ColumnKind::Expression {
                template,
                references,
            } => {
                let tables: Vec<&TableRef> = self.table.iter().chain(references.iter()).collect();
                template.check_args(tables.len())?;
                match self.aggregate {
                    Some(agg) => agg.open(w),
                    None => {
                        w.open_group();
                    }
                }
                template.write(w, args, |i, w, args| {
                    let alias = args.alias_of(tables[i])?;
                    w.alias(&alias);
                    Ok(())
                })?;
                w.close_group();
            }
            ColumnKind::Rank { name, descending } => {
                let alias = self.table_alias(args)?;
                w.raw("RANK() OVER (ORDER BY ");
                match self.aggregate {
                    Some(agg) => {
                        agg.open(w);
                        w.qualified_column(alias.as_deref(), name, None);
                        w.close_group();
                    }
                    None => {
                        w.qualified_column(alias.as_deref(), name, None);
                    }
                }
                if *descending {
                    w.raw(" DESC");
                }
                w.close_group();
                if let Some(output) = &self.alias {
                    w.as_alias(output);
                }
            }
            ColumnKind::Literal(value) => {
                w.literal(value)?;
            }
            ColumnKind::Raw(text) => {
                w.raw(text);
            }
        }
        Ok(())
    }
}

impl RenderElement for Column {
    fn render(&self, w: &mut SqlWriter, args: &mut BuildArguments) -> SqlResult<()> {
        self.render_value(w, args)?;
        match &self.kind {
            ColumnKind::Simple(name) => match (self.aggregate, &self.alias) {
                (_, Some(alias)) if alias != name.name() => {
                    w.as_alias(alias);
                }
                (Some(_), Some(alias)) => {
                    w.as_alias(alias);
                }
                (Some(agg), None) if name.name() == "*" => {
                    w.as_alias(agg.default_alias());
                }
                (Some(_), None) => {
                    w.as_alias(name.name());
                }
                _ => {}
            },
            // alias already written by the value form
            ColumnKind::Rank { .. } => {}
            ColumnKind::Expression { .. } | ColumnKind::Literal(_) | ColumnKind::Raw(_) => {
                if let Some(alias) = &self.alias {
                    w.as_alias(alias);
                }
            }
        }
        Ok(())
    }
}

/// Split on whitespace outside `[..]` and `".."`. `None` on unclosed decoration.
fn split_tokens(expr: &str) -> Option<Vec<&str>> {
    let mut tokens = Vec::new();
    let mut start: Option<usize> = None;
    let mut close: Option<char> = None;
    let mut chars = expr.char_indices().peekable();

    while let Some((i, c)) = chars.next() {
        if let Some(closer) = close {
            if c == closer {
                if chars.peek().map(|&(_, n)| n) == Some(closer) {
                    chars.next();
                } else {
                    close = None;
                }
            }
            continue;
        }
        match c {
            c if c.is_whitespace() => {
                if let Some(s) = start.take() {
                    tokens.push(&expr[s..i]);
                }
            }
            '[' | '"' => {
                start.get_or_insert(i);
                close = Some(if c == '[' { ']' } else { '"' });
            }
            _ => {
                start.get_or_insert(i);
            }
        }
    }
    if close.is_some() {
        return None;
    }
    if let Some(s) = start {
        tokens.push(&expr[s..]);
    }
    Some(tokens)
}
