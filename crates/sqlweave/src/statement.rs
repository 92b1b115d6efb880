//! Rendered statements and batches.

use crate::args::{BuildArguments, Parameter};
use crate::dialect::Dialect;
use crate::error::{SqlError, SqlResult};
use crate::select::SelectBuilder;
use crate::value::{DbType, SqlValue};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use std::time::Duration;

/// Command text plus its ordered parameters.
///
/// Placeholders in `command_text` appear in the same order as `parameters`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SqlStatement {
    command_text: String,
    parameters: Vec<Parameter>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    timeout: Option<Duration>,
}

impl SqlStatement {
    pub fn new(
        command_text: String,
        parameters: Vec<Parameter>,
        timeout: Option<Duration>,
    ) -> Self {
        Self {
            command_text,
            parameters,
            timeout,
        }
    }

    pub fn command_text(&self) -> &str {
        &self.command_text
    }

    pub fn parameters(&self) -> &[Parameter] {
        &self.parameters
    }

    /// Look up a parameter by bare name (`p0`, not `@p0`).
    pub fn parameter(&self, name: &str) -> Option<&Parameter> {
        self.parameters.iter().find(|p| p.name == name)
    }

    /// Value of a parameter by bare name.
    pub fn value(&self, name: &str) -> Option<&SqlValue> {
        self.parameter(name).map(|p| &p.value)
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout
    }

    pub fn into_parts(self) -> (String, Vec<Parameter>) {
        (self.command_text, self.parameters)
    }

    /// A script that declares every parameter and then runs the statement.
    ///
    /// Handy for pasting a rendered query into a SQL console.
    pub fn declare_script(&self, dialect: &dyn Dialect) -> SqlResult<String> {
        let mut out = String::new();
        for p in &self.parameters {
            let type_name = dialect.type_name(p.db_type, p.size)?;
            out.push_str("DECLARE ");
            out.push(dialect.parameter_prefix());
            out.push_str(&p.name);
            out.push(' ');
            out.push_str(&type_name);
            out.push_str(" = ");
            if !p.value.is_null() && is_unicode(p.db_type) {
                out.push('N');
            }
            p.value.write_literal(&mut out);
            out.push_str(";\n");
        }
        out.push_str(&self.command_text);
        Ok(out)
    }
}

fn is_unicode(db_type: DbType) -> bool {
    matches!(
        db_type,
        DbType::String | DbType::StringFixedLength | DbType::Xml
    )
}

impl fmt::Display for SqlStatement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.command_text)
    }
}

/// Render several builders into one statement.
///
/// Each member keeps its own aliases and terminator; parameter numbering
/// continues across members so sequential names never collide. A caller-named
/// parameter declared by two members is a [`SqlError::DuplicateParameter`].
/// The batch timeout is the largest member timeout.
pub fn render_batch(builders: &[SelectBuilder]) -> SqlResult<SqlStatement> {
    let mut command_text = String::new();
    let mut parameters: Vec<Parameter> = Vec::new();
    let mut timeout: Option<Duration> = None;
    let mut next_index = 0;
    let mut seen: HashSet<String> = HashSet::new();

    for builder in builders {
        let mut args = BuildArguments::continuing(builder.config().type_map(), next_index);
        let mut w = builder.writer();
        builder.render_statement(&mut w, &mut args)?;

        if !command_text.is_empty() {
            command_text.push(if w.is_pretty() { '\n' } else { ' ' });
        }
        command_text.push_str(w.as_str());
        next_index = args.next_index();
        for parameter in args.into_parameters() {
            if !seen.insert(parameter.name.clone()) {
                return Err(SqlError::DuplicateParameter(parameter.name));
            }
            parameters.push(parameter);
        }
        timeout = timeout.max(builder.timeout_value());
    }

    #[cfg(feature = "tracing")]
    tracing::debug!(
        target: "sqlweave.render",
        statement_count = builders.len(),
        param_count = parameters.len(),
        "rendered batch"
    );

    Ok(SqlStatement::new(command_text, parameters, timeout))
}

#[cfg(feature = "tracing")]
pub(crate) fn log_render(
    config: &crate::config::RenderConfig,
    statement: &SqlStatement,
    table_count: usize,
) {
    let sql = statement.command_text();
    let sql = match config.options().max_logged_sql {
        Some(max) if sql.len() > max => format!("{}...", truncate_bytes(sql, max)),
        _ => sql.to_string(),
    };
    tracing::debug!(
        target: "sqlweave.render",
        param_count = statement.parameters().len(),
        table_count,
        sql = %sql,
        "rendered statement"
    );
}

#[cfg(feature = "tracing")]
fn truncate_bytes(sql: &str, max_bytes: usize) -> &str {
    let mut end = max_bytes.min(sql.len());
    while end > 0 && !sql.is_char_boundary(end) {
        end -= 1;
    }
    &sql[..end]
}
