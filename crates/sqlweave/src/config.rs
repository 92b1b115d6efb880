use crate::convert::TypeMap;
use crate::dialect::{Dialect, SqlServerDialect};
use crate::error::{SqlError, SqlResult};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::Arc;

/// Serializable rendering options.
///
/// ```toml
/// pretty = true
/// quoted_identifiers = false
/// max_logged_sql = 500
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RenderOptions {
    /// Line breaks between clauses and after list commas.
    pub pretty: bool,
    /// Always quote identifiers with `"` instead of `[ ]`.
    pub quoted_identifiers: bool,
    /// Truncate SQL in render log events (bytes). `None` means no truncation.
    pub max_logged_sql: Option<usize>,
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self {
            pretty: false,
            quoted_identifiers: false,
            max_logged_sql: Some(200),
        }
    }
}

/// Everything a render needs besides the builder graph itself.
///
/// Passed explicitly to builders; there is no global default.
#[derive(Debug, Clone)]
pub struct RenderConfig {
    options: RenderOptions,
    dialect: Arc<dyn Dialect>,
    type_map: Arc<TypeMap>,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self::from_options(RenderOptions::default())
    }
}

impl RenderConfig {
    /// Compact output, bracket quoting, SQL Server dialect, canonical type map.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_options(options: RenderOptions) -> Self {
        Self {
            options,
            dialect: Arc::new(SqlServerDialect),
            type_map: Arc::new(TypeMap::default()),
        }
    }

    /// Parse options from TOML text.
    pub fn from_toml_str(raw: &str) -> SqlResult<Self> {
        let options: RenderOptions = toml::from_str(raw)?;
        Ok(Self::from_options(options))
    }

    /// Load options from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> SqlResult<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|e| {
            SqlError::config(format!("failed to read config file {}: {e}", path.display()))
        })?;
        Self::from_toml_str(&raw).map_err(|e| {
            SqlError::config(format!("failed to parse config file {}: {e}", path.display()))
        })
    }

    pub fn with_pretty(mut self, pretty: bool) -> Self {
        self.options.pretty = pretty;
        self
    }

    pub fn with_quoted_identifiers(mut self, quoted: bool) -> Self {
        self.options.quoted_identifiers = quoted;
        self
    }

    pub fn with_max_logged_sql(mut self, max: Option<usize>) -> Self {
        self.options.max_logged_sql = max;
        self
    }

    pub fn with_dialect(mut self, dialect: Arc<dyn Dialect>) -> Self {
        self.dialect = dialect;
        self
    }

    /// Replace the value coercion table used when parameters are created.
    pub fn with_type_map(mut self, type_map: TypeMap) -> Self {
        self.type_map = Arc::new(type_map);
        self
    }

    pub fn options(&self) -> &RenderOptions {
        &self.options
    }

    pub fn pretty(&self) -> bool {
        self.options.pretty
    }

    pub fn quoted_identifiers(&self) -> bool {
        self.options.quoted_identifiers
    }

    pub fn dialect(&self) -> &dyn Dialect {
        self.dialect.as_ref()
    }

    pub fn type_map(&self) -> Arc<TypeMap> {
        Arc::clone(&self.type_map)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_compact() {
        let config = RenderConfig::new();
        assert!(!config.pretty());
        assert!(!config.quoted_identifiers());
        assert_eq!(config.options().max_logged_sql, Some(200));
    }

    #[test]
    fn options_from_toml() {
        let config = RenderConfig::from_toml_str(
            r#"
pretty = true
quoted_identifiers = true
max_logged_sql = 64
"#,
        )
        .unwrap();
        assert!(config.pretty());
        assert!(config.quoted_identifiers());
        assert_eq!(config.options().max_logged_sql, Some(64));
    }

    #[test]
    fn missing_keys_take_defaults() {
        let config = RenderConfig::from_toml_str("pretty = true").unwrap();
        assert!(config.pretty());
        assert!(!config.quoted_identifiers());
    }

    #[test]
    fn unknown_key_is_config_error() {
        let err = RenderConfig::from_toml_str("colour = 1").unwrap_err();
        assert!(matches!(err, SqlError::Config(_)));
    }

    #[test]
    fn missing_file_is_config_error() {
        let err = RenderConfig::load("/nonexistent/sqlweave.toml").unwrap_err();
        assert!(matches!(err, SqlError::Config(ref m) if m.contains("failed to read")));
    }
}
