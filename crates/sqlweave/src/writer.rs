//! Text accumulator that turns structural render calls into dialect text.

use crate::config::RenderConfig;
use crate::error::SqlResult;
use crate::filter::CompareOp;
use crate::ident::{self, Ident};
use crate::value::SqlValue;
use std::sync::Arc;

/// SQL text buffer bound to one [`RenderConfig`].
#[derive(Debug)]
pub struct SqlWriter {
    buf: String,
    config: Arc<RenderConfig>,
    pretty: bool,
}

impl SqlWriter {
    pub fn new(config: Arc<RenderConfig>) -> Self {
        let pretty = config.pretty();
        Self {
            buf: String::with_capacity(256),
            config,
            pretty,
        }
    }

    /// Override the configured pretty flag for this writer.
    pub fn set_pretty(&mut self, pretty: bool) {
        self.pretty = pretty;
    }

    pub fn is_pretty(&self) -> bool {
        self.pretty
    }

    pub fn config(&self) -> &RenderConfig {
        &self.config
    }

    pub fn raw(&mut self, text: &str) -> &mut Self {
        self.buf.push_str(text);
        self
    }

    pub fn char(&mut self, c: char) -> &mut Self {
        self.buf.push(c);
        self
    }

    /// Clause separator: newline when pretty, one space otherwise.
    pub fn line(&mut self) -> &mut Self {
        self.buf.push(if self.pretty { '\n' } else { ' ' });
        self
    }

    /// List separator: `,` plus an indented line break when pretty.
    pub fn comma(&mut self) -> &mut Self {
        if self.pretty {
            self.buf.push_str(",\n    ");
        } else {
            self.buf.push(',');
        }
        self
    }

    /// Quote a single identifier, stripping one existing layer of decoration.
    pub fn identifier(&mut self, name: &str) -> &mut Self {
        let name = ident::unquote(name);
        self.quote_part(&name);
        self
    }

    /// Dotted name, each part quoted on its own.
    pub fn table_name(&mut self, name: &Ident) -> &mut Self {
        for (i, part) in name.parts().iter().enumerate() {
            if i > 0 {
                self.buf.push('.');
            }
            self.quote_part(part);
        }
        self
    }

    /// Table alias (`[t0]`).
    pub fn alias(&mut self, alias: &str) -> &mut Self {
        self.quote_part(alias);
        self
    }

    /// `[t0].[column]`, or `[column]` without a table alias, plus
    /// `AS [output]` when the output alias differs from the column name.
    pub fn qualified_column(
        &mut self,
        table_alias: Option<&str>,
        column: &Ident,
        output_alias: Option<&str>,
    ) -> &mut Self {
        if let Some(alias) = table_alias {
            self.alias(alias);
            self.buf.push('.');
        }
        if column.name() == "*" {
            self.buf.push('*');
        } else {
            self.table_name(column);
        }
        if let Some(output) = output_alias {
            if output != column.name() {
                self.as_alias(output);
            }
        }
        self
    }

    /// ` AS [alias]`
    pub fn as_alias(&mut self, alias: &str) -> &mut Self {
        self.buf.push_str(" AS ");
        self.identifier(alias)
    }

    pub fn operator(&mut self, op: CompareOp) -> &mut Self {
        let symbol = self.config.dialect().operator_symbol(op);
        self.buf.push_str(symbol);
        self
    }

    /// Parameter placeholder (`@p0`).
    pub fn parameter(&mut self, name: &str) -> &mut Self {
        self.buf.push(self.config.dialect().parameter_prefix());
        self.buf.push_str(name);
        self
    }

    /// Inline literal. Fails for values with no SQL literal form.
    pub fn literal(&mut self, value: &SqlValue) -> SqlResult<&mut Self> {
        value.ensure_literal()?;
        value.write_literal(&mut self.buf);
        Ok(self)
    }

    pub fn open_group(&mut self) -> &mut Self {
        self.buf.push('(');
        self
    }

    pub fn close_group(&mut self) -> &mut Self {
        self.buf.push(')');
        self
    }

    pub fn paging(&mut self, limit: u64, offset: u64) -> &mut Self {
        self.config
            .dialect()
            .write_paging(&mut self.buf, limit, offset);
        self
    }

    pub fn terminator(&mut self) -> &mut Self {
        self.buf
            .push_str(self.config.dialect().statement_terminator());
        self
    }

    pub fn len(&self) -> usize {
        self.buf.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    pub fn as_str(&self) -> &str {
        &self.buf
    }

    pub fn finish(self) -> String {
        self.buf
    }

    fn quote_part(&mut self, name: &str) {
        let force = self.config.quoted_identifiers();
        self.config
            .dialect()
            .quote_identifier(&mut self.buf, name, force);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn writer() -> SqlWriter {
        SqlWriter::new(Arc::new(RenderConfig::new()))
    }

    #[test]
    fn qualified_column_with_alias() {
        let mut w = writer();
        let col = Ident::single("LastName").unwrap();
        w.qualified_column(Some("t0"), &col, Some("Surname"));
        assert_eq!(w.finish(), "[t0].[LastName] AS [Surname]");
    }

    #[test]
    fn qualified_column_same_alias_is_omitted() {
        let mut w = writer();
        let col = Ident::single("LastName").unwrap();
        w.qualified_column(Some("t0"), &col, Some("LastName"));
        assert_eq!(w.finish(), "[t0].[LastName]");
    }

    #[test]
    fn identifier_strips_existing_brackets() {
        let mut w = writer();
        w.identifier("[Name]").comma().identifier("a]b");
        assert_eq!(w.finish(), r#"[Name],"a]b""#);
    }

    #[test]
    fn forced_double_quotes() {
        let config = RenderConfig::new().with_quoted_identifiers(true);
        let mut w = SqlWriter::new(Arc::new(config));
        let name = Ident::parse("dbo.Contact").unwrap();
        w.table_name(&name).as_alias("t0");
        assert_eq!(w.finish(), r#""dbo"."Contact" AS "t0""#);
    }

    #[test]
    fn pretty_separators() {
        let mut w = writer();
        w.set_pretty(true);
        w.raw("SELECT a").comma().raw("b").line().raw("FROM x");
        assert_eq!(w.finish(), "SELECT a,\n    b\nFROM x");
    }

    #[test]
    fn compact_separators() {
        let mut w = writer();
        w.raw("SELECT a").comma().raw("b").line().raw("FROM x");
        assert_eq!(w.finish(), "SELECT a,b FROM x");
    }

    #[test]
    fn parameter_and_literal() {
        let mut w = writer();
        w.parameter("p0")
            .operator(CompareOp::Ne)
            .literal(&SqlValue::from("it's"))
            .unwrap();
        assert_eq!(w.finish(), "@p0<>'it''s'");
    }

    #[test]
    fn non_finite_literal_fails() {
        let mut w = writer();
        let err = w.literal(&SqlValue::Double(f64::NAN)).unwrap_err();
        assert!(err.is_coercion_error());
        assert!(w.literal(&SqlValue::Single(f32::INFINITY)).is_err());
        assert_eq!(w.finish(), "");
    }
}
