//! Per-render state: parameter sequence and table alias registry.
//!
//! One [`BuildArguments`] lives for exactly one top-level render. Parameters are
//! named `p0, p1, …` in creation order; tables are aliased `t0, t1, …` in
//! registration order. Both orders follow the render traversal, so the same
//! builder always renders the same numbering.

use crate::convert::TypeMap;
use crate::error::{SqlError, SqlResult};
use crate::table::TableRef;
use crate::value::{DbType, SqlValue};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// A bound parameter: name (without prefix), coerced value, declared type and size.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Parameter {
    pub name: String,
    pub value: SqlValue,
    pub db_type: DbType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<usize>,
}

impl Parameter {
    pub fn new(name: impl Into<String>, value: SqlValue, db_type: DbType) -> Self {
        Self {
            name: name.into(),
            value,
            db_type,
            size: None,
        }
    }

    /// Set the declared size (string/binary length).
    pub fn with_size(mut self, size: usize) -> Self {
        self.size = Some(size);
        self
    }
}

/// Parameter and alias tracker shared by every node of one render pass.
#[derive(Debug)]
pub struct BuildArguments {
    parameters: Vec<Parameter>,
    next_index: usize,
    tables: Vec<TableRef>,
    type_map: Arc<TypeMap>,
}

impl BuildArguments {
    /// Fresh arguments: parameters start at `p0`.
    pub fn new(type_map: Arc<TypeMap>) -> Self {
        Self::continuing(type_map, 0)
    }

    /// Arguments whose first parameter is `p{next_index}`.
    ///
    /// Used by batch renders so names stay unique across statements.
    pub fn continuing(type_map: Arc<TypeMap>, next_index: usize) -> Self {
        Self {
            parameters: Vec::new(),
            next_index,
            tables: Vec::new(),
            type_map,
        }
    }

    /// Coerce `value` to `db_type`, append it as the next sequential parameter
    /// and return its bare name.
    pub fn create_parameter(
        &mut self,
        value: SqlValue,
        db_type: DbType,
        size: Option<usize>,
    ) -> SqlResult<String> {
        let value = self.type_map.coerce(value, db_type)?;
        let name = format!("p{}", self.next_index);
        self.ensure_unique(&name)?;
        self.next_index += 1;

        #[cfg(feature = "tracing")]
        tracing::trace!(target: "sqlweave.render", name = %name, db_type = ?db_type, "parameter");

        self.parameters.push(Parameter {
            name: name.clone(),
            value,
            db_type,
            size,
        });
        Ok(name)
    }

    /// Append a caller-named parameter. Does not consume a sequence number.
    pub fn add_named_parameter(
        &mut self,
        name: &str,
        value: SqlValue,
        db_type: DbType,
        size: Option<usize>,
    ) -> SqlResult<()> {
        let name = name.trim_start_matches('@');
        self.ensure_unique(name)?;
        let value = self.type_map.coerce(value, db_type)?;
        self.parameters.push(Parameter {
            name: name.to_string(),
            value,
            db_type,
            size,
        });
        Ok(())
    }

    fn ensure_unique(&self, name: &str) -> SqlResult<()> {
        if self.parameters.iter().any(|p| p.name == name) {
            return Err(SqlError::DuplicateParameter(name.to_string()));
        }
        Ok(())
    }

    /// Coerce a value that will be rendered inline rather than bound.
    pub fn coerce(&self, value: SqlValue, db_type: DbType) -> SqlResult<SqlValue> {
        self.type_map.coerce(value, db_type)
    }

    /// Register `table` if it is not registered yet. Returns `true` on first registration.
    pub fn assign_alias(&mut self, table: &TableRef) -> bool {
        if self.position(table).is_some() {
            return false;
        }

        #[cfg(feature = "tracing")]
        tracing::trace!(
            target: "sqlweave.render",
            alias = %format_args!("t{}", self.tables.len()),
            table = %table.display_name(),
            "alias"
        );

        self.tables.push(table.clone());
        true
    }

    /// Positional alias (`t0`, `t1`, …) of a registered table.
    pub fn alias_of(&self, table: &TableRef) -> SqlResult<String> {
        self.position(table)
            .map(|i| format!("t{i}"))
            .ok_or_else(|| SqlError::unregistered(table.display_name()))
    }

    pub fn is_registered(&self, table: &TableRef) -> bool {
        self.position(table).is_some()
    }

    fn position(&self, table: &TableRef) -> Option<usize> {
        self.tables.iter().position(|t| t.ptr_eq(table))
    }

    pub fn table_count(&self) -> usize {
        self.tables.len()
    }

    pub fn parameters(&self) -> &[Parameter] {
        &self.parameters
    }

    /// Index the next sequential parameter would get.
    pub fn next_index(&self) -> usize {
        self.next_index
    }

    pub fn into_parameters(self) -> Vec<Parameter> {
        self.parameters
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::table::TableRef;

    fn args() -> BuildArguments {
        BuildArguments::new(Arc::new(TypeMap::default()))
    }

    #[test]
    fn parameters_are_sequential() {
        let mut args = args();
        assert_eq!(args.create_parameter("a".into(), DbType::String, None).unwrap(), "p0");
        assert_eq!(args.create_parameter(SqlValue::Int32(1), DbType::Int32, None).unwrap(), "p1");
        assert_eq!(args.create_parameter(SqlValue::Int32(2), DbType::Int32, None).unwrap(), "p2");
        let names: Vec<_> = args.parameters().iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, ["p0", "p1", "p2"]);
    }

    #[test]
    fn parameter_value_is_coerced_once() {
        let mut args = args();
        args.create_parameter("123".into(), DbType::Int32, None).unwrap();
        assert_eq!(args.parameters()[0].value, SqlValue::Int32(123));
    }

    #[test]
    fn coercion_failure_is_surfaced() {
        let mut args = args();
        let err = args
            .create_parameter("abc".into(), DbType::Int32, None)
            .unwrap_err();
        assert!(err.is_coercion_error());
        assert!(args.parameters().is_empty());
        assert_eq!(args.next_index(), 0);
    }

    #[test]
    fn continuing_starts_at_offset() {
        let mut args = BuildArguments::continuing(Arc::new(TypeMap::default()), 5);
        assert_eq!(args.create_parameter(SqlValue::Int32(1), DbType::Int32, None).unwrap(), "p5");
    }

    #[test]
    fn named_parameter_does_not_consume_sequence() {
        let mut args = args();
        args.add_named_parameter("@userId", SqlValue::Int32(7), DbType::Int32, None)
            .unwrap();
        assert_eq!(args.parameters()[0].name, "userId");
        assert_eq!(args.create_parameter(SqlValue::Int32(1), DbType::Int32, None).unwrap(), "p0");
    }

    #[test]
    fn repeated_named_parameter_fails() {
        let mut args = args();
        args.add_named_parameter("@region", "WA".into(), DbType::String, None)
            .unwrap();
        let err = args
            .add_named_parameter("region", "OR".into(), DbType::String, None)
            .unwrap_err();
        assert!(matches!(err, SqlError::DuplicateParameter(ref name) if name == "region"));
        assert!(err.is_usage_error());
        assert_eq!(args.parameters().len(), 1);
    }

    #[test]
    fn named_parameter_shadowing_sequence_fails() {
        let mut args = args();
        args.add_named_parameter("@p0", SqlValue::Int32(1), DbType::Int32, None)
            .unwrap();
        let err = args
            .create_parameter(SqlValue::Int32(2), DbType::Int32, None)
            .unwrap_err();
        assert!(matches!(err, SqlError::DuplicateParameter(ref name) if name == "p0"));
    }

    #[test]
    fn alias_registration_is_idempotent() {
        let mut args = args();
        let contact = TableRef::physical("dbo.Contact").unwrap();
        let orders = TableRef::physical("dbo.Orders").unwrap();
        assert!(args.assign_alias(&contact));
        assert!(args.assign_alias(&orders));
        assert!(!args.assign_alias(&contact.clone()));
        assert_eq!(args.alias_of(&contact).unwrap(), "t0");
        assert_eq!(args.alias_of(&orders).unwrap(), "t1");
        assert_eq!(args.table_count(), 2);
    }

    #[test]
    fn alias_uses_identity_not_structure() {
        let mut args = args();
        let a = TableRef::physical("dbo.Contact").unwrap();
        let b = TableRef::physical("dbo.Contact").unwrap();
        args.assign_alias(&a);
        args.assign_alias(&b);
        assert_eq!(args.alias_of(&b).unwrap(), "t1");
    }

    #[test]
    fn alias_of_unregistered_table_fails() {
        let args = args();
        let t = TableRef::physical("dbo.Contact").unwrap();
        let err = args.alias_of(&t).unwrap_err();
        assert!(matches!(err, SqlError::UnregisteredTable(ref name) if name == "dbo.Contact"));
        assert!(err.is_usage_error());
    }
}
