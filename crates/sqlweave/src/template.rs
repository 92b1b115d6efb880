//! `{n}` placeholder templates used by expression columns and templated filters.
//!
//! `{{` and `}}` write literal braces. Anything else inside braces is an error.

use crate::args::BuildArguments;
use crate::error::{SqlError, SqlResult};
use crate::table::TableRef;
use crate::value::{DbType, SqlValue};
use crate::writer::SqlWriter;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Piece {
    Text(String),
    Arg(usize),
}

/// A parsed template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Template {
    pieces: Vec<Piece>,
}

impl Template {
    pub fn parse(source: &str) -> SqlResult<Self> {
        let mut pieces = Vec::new();
        let mut text = String::new();
        let mut chars = source.chars().peekable();

        while let Some(c) = chars.next() {
            match c {
                '{' if chars.peek() == Some(&'{') => {
                    chars.next();
                    text.push('{');
                }
                '}' if chars.peek() == Some(&'}') => {
                    chars.next();
                    text.push('}');
                }
                '{' => {
                    let mut digits = String::new();
                    loop {
                        match chars.next() {
                            Some('}') => break,
                            Some(d) if d.is_ascii_digit() => digits.push(d),
                            Some(other) => {
                                return Err(SqlError::template(format!(
                                    "unexpected '{other}' in placeholder of '{source}'"
                                )));
                            }
                            None => {
                                return Err(SqlError::template(format!(
                                    "unclosed placeholder in '{source}'"
                                )));
                            }
                        }
                    }
                    let index = digits.parse::<usize>().map_err(|_| {
                        SqlError::template(format!("empty placeholder in '{source}'"))
                    })?;
                    if !text.is_empty() {
                        pieces.push(Piece::Text(std::mem::take(&mut text)));
                    }
                    pieces.push(Piece::Arg(index));
                }
                '}' => {
                    return Err(SqlError::template(format!(
                        "unmatched '}}' in '{source}'"
                    )));
                }
                _ => text.push(c),
            }
        }
        if !text.is_empty() {
            pieces.push(Piece::Text(text));
        }
        Ok(Self { pieces })
    }

    pub fn pieces(&self) -> &[Piece] {
        &self.pieces
    }

    /// Fail if any placeholder index is `>= arg_count`.
    pub fn check_args(&self, arg_count: usize) -> SqlResult<()> {
        for piece in &self.pieces {
            if let Piece::Arg(i) = piece {
                if *i >= arg_count {
                    return Err(SqlError::template(format!(
                        "placeholder {{{i}}} has no argument ({arg_count} given)"
                    )));
                }
            }
        }
        Ok(())
    }

    /// Write the template, resolving each placeholder through `resolve`.
    pub(crate) fn write<F>(
        &self,
        w: &mut SqlWriter,
        args: &mut BuildArguments,
        mut resolve: F,
    ) -> SqlResult<()>
    where
        F: FnMut(usize, &mut SqlWriter, &mut BuildArguments) -> SqlResult<()>,
    {
        for piece in &self.pieces {
            match piece {
                Piece::Text(text) => {
                    w.raw(text);
                }
                Piece::Arg(i) => resolve(*i, w, args)?,
            }
        }
        Ok(())
    }
}

/// Argument of a templated filter.
#[derive(Debug, Clone)]
pub enum TemplateArg {
    /// Resolves to the table's alias.
    Table(TableRef),
    /// Resolves to a new parameter of the declared type.
    Param { value: SqlValue, db_type: DbType },
    /// Written inline as a literal.
    Literal(SqlValue),
    /// Anything else: a string parameter of the value's text form.
    Value(SqlValue),
}

impl TemplateArg {
    pub fn table(table: &TableRef) -> Self {
        Self::Table(table.clone())
    }

    pub fn param(value: impl Into<SqlValue>, db_type: DbType) -> Self {
        Self::Param {
            value: value.into(),
            db_type,
        }
    }

    pub fn literal(value: impl Into<SqlValue>) -> Self {
        Self::Literal(value.into())
    }

    pub fn value(value: impl Into<SqlValue>) -> Self {
        Self::Value(value.into())
    }

    pub(crate) fn write(&self, w: &mut SqlWriter, args: &mut BuildArguments) -> SqlResult<()> {
        match self {
            TemplateArg::Table(table) => {
                let alias = args.alias_of(table)?;
                w.alias(&alias);
            }
            TemplateArg::Param { value, db_type } => {
                let name = args.create_parameter(value.clone(), *db_type, None)?;
                w.parameter(&name);
            }
            TemplateArg::Literal(value) => {
                w.literal(value)?;
            }
            TemplateArg::Value(value) => {
                let text = SqlValue::String(value.to_text());
                let name = args.create_parameter(text, DbType::String, None)?;
                w.parameter(&name);
            }
        }
        Ok(())
    }
}

impl From<TableRef> for TemplateArg {
    fn from(table: TableRef) -> Self {
        Self::Table(table)
    }
}

impl From<SqlValue> for TemplateArg {
    fn from(value: SqlValue) -> Self {
        Self::Value(value)
    }
}
