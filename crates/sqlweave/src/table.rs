//! Table sources: physical tables, derived SQL text, and nested builders.
//!
//! Tables are shared through [`TableRef`], whose equality is identity. Two refs
//! to structurally equal tables are still two tables with two aliases; clone a
//! `TableRef` to refer to the same table from columns, filters and joins.

use crate::args::BuildArguments;
use crate::element::RenderElement;
use crate::error::SqlResult;
use crate::ident::Ident;
use crate::select::SelectBuilder;
use crate::writer::SqlWriter;
use regex::Regex;
use std::sync::{Arc, OnceLock};

fn select_token() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)\bSELECT\b").expect("invalid built-in SELECT regex"))
}

/// A row source in FROM or JOIN position.
#[derive(Debug, Clone)]
pub enum Table {
    /// Named table: `[schema].[name] AS [tN]`
    Physical { name: Ident },
    /// Inline SQL text: `(text) AS [tN]`
    Derived { command_text: String },
    /// Nested builder rendered in place.
    Select {
        builder: Box<SelectBuilder>,
        wrapped: bool,
        aliased: bool,
    },
}

impl Table {
    /// Physical table unless the text contains a `SELECT` token, in which case
    /// it is treated as derived SQL.
    pub fn parse(text: &str) -> SqlResult<Self> {
        if select_token().is_match(text) {
            Ok(Self::derived(text))
        } else {
            Ok(Self::Physical {
                name: Ident::parse(text)?,
            })
        }
    }

    /// Derived table; one trailing `;` is dropped.
    pub fn derived(command_text: &str) -> Self {
        let command_text = match command_text.trim_end().strip_suffix(';') {
            Some(rest) => rest.to_string(),
            None => command_text.to_string(),
        };
        Self::Derived { command_text }
    }
}

/// Shared, identity-compared handle to a [`Table`].
#[derive(Debug, Clone)]
pub struct TableRef {
    table: Arc<Table>,
    joined: Vec<TableRef>,
}

impl TableRef {
    pub fn new(table: Table) -> Self {
        Self {
            table: Arc::new(table),
            joined: Vec::new(),
        }
    }

    /// See [`Table::parse`].
    pub fn parse(text: &str) -> SqlResult<Self> {
        Ok(Self::new(Table::parse(text)?))
    }

    pub fn physical(name: &str) -> SqlResult<Self> {
        Ok(Self::new(Table::Physical {
            name: Ident::parse(name)?,
        }))
    }

    pub fn derived(command_text: &str) -> Self {
        Self::new(Table::derived(command_text))
    }

    /// Nested builder rendered as `(SELECT …) AS [tN]`.
    pub fn sub_query(builder: SelectBuilder) -> Self {
        Self::new(Table::Select {
            builder: Box::new(builder),
            wrapped: true,
            aliased: true,
        })
    }

    /// Nested builder with explicit wrapping flags.
    pub fn select(builder: SelectBuilder, wrapped: bool, aliased: bool) -> Self {
        Self::new(Table::Select {
            builder: Box::new(builder),
            wrapped,
            aliased,
        })
    }

    /// Record tables that must be aliased right after this one.
    pub fn with_joined(mut self, tables: impl IntoIterator<Item = TableRef>) -> Self {
        self.joined.extend(tables);
        self
    }

    pub fn table(&self) -> &Table {
        &self.table
    }

    pub fn joined(&self) -> &[TableRef] {
        &self.joined
    }

    /// Identity comparison.
    pub fn ptr_eq(&self, other: &TableRef) -> bool {
        Arc::ptr_eq(&self.table, &other.table)
    }

    /// Human-readable name for errors and logs.
    pub fn display_name(&self) -> String {
        match self.table.as_ref() {
            Table::Physical { name } => name.to_string(),
            Table::Derived { .. } => "(derived)".to_string(),
            Table::Select { .. } => "(sub-query)".to_string(),
        }
    }

    /// Register this table's alias, then every joined table's, depth first.
    pub fn compile(&self, args: &mut BuildArguments) {
        args.assign_alias(self);
        for joined in &self.joined {
            joined.compile(args);
        }
    }

    pub fn alias(&self, args: &BuildArguments) -> SqlResult<String> {
        args.alias_of(self)
    }
}

impl PartialEq for TableRef {
    fn eq(&self, other: &Self) -> bool {
        self.ptr_eq(other)
    }
}

impl Eq for TableRef {}

impl From<Table> for TableRef {
    fn from(table: Table) -> Self {
        Self::new(table)
    }
}

impl RenderElement for TableRef {
    fn render(&self, w: &mut SqlWriter, args: &mut BuildArguments) -> SqlResult<()> {
        self.compile(args);
        let alias = args.alias_of(self)?;
        match self.table.as_ref() {
            Table::Physical { name } => {
                w.table_name(name).raw(" AS ").alias(&alias);
            }
            Table::Derived { command_text } => {
                w.open_group().raw(command_text).close_group();
                w.raw(" AS ").alias(&alias);
            }
            Table::Select {
                builder,
                wrapped,
                aliased,
            } => {
                if *wrapped {
                    w.open_group();
                    builder.write_query(w, args)?;
                    w.close_group();
                    if *aliased {
                        w.raw(" AS ").alias(&alias);
                    }
                } else {
                    builder.write_query(w, args)?;
                }
            }
        }
        Ok(())
    }
}
