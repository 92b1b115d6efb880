//! Identifier parsing and quoting.
//!
//! [`Ident`] represents a possibly multi-part SQL identifier (`server.schema.table`).
//! Each dotted segment may arrive already decorated (`[dbo]`, `"dbo"`); parsing
//! strips that decoration so quoting can re-apply it canonically.
//!
//! - Bracketed parts unescape `]]` to `]`
//! - Double-quoted parts unescape `""` to `"`
//! - Dots inside decoration do not split segments
//!
//! Quoting rules:
//! - Default: wrap in `[ ]`
//! - If the name contains `[` or `]`, or double-quote mode is forced,
//!   wrap in `" "` and double embedded `"`
//!
//! # Example
//! ```
//! use sqlweave::ident::Ident;
//!
//! let t = Ident::parse("dbo.[Order Details]")?;
//! assert_eq!(t.to_sql(false), "[dbo].[Order Details]");
//! # Ok::<(), sqlweave::SqlError>(())
//! ```

use crate::error::{SqlError, SqlResult};

/// A SQL identifier (column, table, or schema name), stored undecorated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ident {
    parts: Vec<String>,
}

impl Ident {
    /// Parse a dotted identifier, recognizing `[..]` and `".."` decoration per part.
    pub fn parse(s: &str) -> SqlResult<Self> {
        let s = s.trim();
        if s.is_empty() {
            return Err(SqlError::identifier("identifier cannot be empty"));
        }
        if s.contains('\0') {
            return Err(SqlError::identifier("identifier cannot contain NUL character"));
        }

        let mut parts = Vec::new();
        let mut chars = s.chars().peekable();

        while chars.peek().is_some() {
            // Consume '.' between parts (but require there is a next part).
            if !parts.is_empty() {
                match chars.next() {
                    Some('.') => {
                        if chars.peek().is_none() {
                            return Err(SqlError::identifier(format!("trailing '.' in '{s}'")));
                        }
                    }
                    Some(c) => {
                        return Err(SqlError::identifier(format!(
                            "expected '.' between identifier parts of '{s}', got '{c}'"
                        )));
                    }
                    None => break,
                }
            }

            match chars.peek() {
                Some('[') => {
                    chars.next();
                    parts.push(read_decorated(&mut chars, ']', s)?);
                }
                Some('"') => {
                    chars.next();
                    parts.push(read_decorated(&mut chars, '"', s)?);
                }
                _ => {
                    let mut name = String::new();
                    while let Some(&c) = chars.peek() {
                        if c == '.' {
                            break;
                        }
                        name.push(c);
                        chars.next();
                    }
                    let name = name.trim();
                    if name.is_empty() {
                        return Err(SqlError::identifier(format!("empty segment in '{s}'")));
                    }
                    parts.push(name.to_string());
                }
            }
        }

        Ok(Self { parts })
    }

    /// Parse a single-part identifier: dots are part of the name.
    ///
    /// Decoration around the whole name is still stripped.
    pub fn single(s: &str) -> SqlResult<Self> {
        let name = unquote(s.trim());
        if name.is_empty() {
            return Err(SqlError::identifier("identifier cannot be empty"));
        }
        if name.contains('\0') {
            return Err(SqlError::identifier("identifier cannot contain NUL character"));
        }
        Ok(Self { parts: vec![name] })
    }

    /// Undecorated parts in order.
    pub fn parts(&self) -> &[String] {
        &self.parts
    }

    /// The last part (e.g. the table name of `schema.table`).
    pub fn name(&self) -> &str {
        self.parts.last().map(String::as_str).unwrap_or_default()
    }

    /// Render with each part quoted independently and re-joined with dots.
    pub fn to_sql(&self, force_double_quotes: bool) -> String {
        let mut out = String::new();
        self.write_sql(&mut out, force_double_quotes);
        out
    }

    pub(crate) fn write_sql(&self, out: &mut String, force_double_quotes: bool) {
        for (i, part) in self.parts.iter().enumerate() {
            if i > 0 {
                out.push('.');
            }
            write_quoted(out, part, force_double_quotes);
        }
    }
}

impl std::fmt::Display for Ident {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.parts.join("."))
    }
}

fn read_decorated(
    chars: &mut std::iter::Peekable<std::str::Chars<'_>>,
    close: char,
    source: &str,
) -> SqlResult<String> {
    let mut name = String::new();
    loop {
        match chars.next() {
            Some(c) if c == close => {
                // Escaped closer: ]] or ""
                if chars.peek() == Some(&close) {
                    chars.next();
                    name.push(close);
                } else {
                    break;
                }
            }
            Some(c) => name.push(c),
            None => {
                return Err(SqlError::identifier(format!(
                    "unclosed quoted identifier in '{source}'"
                )));
            }
        }
    }
    if name.is_empty() {
        return Err(SqlError::identifier(format!("empty quoted identifier in '{source}'")));
    }
    Ok(name)
}

/// Strip one layer of `[ ]` or `" "` decoration, unescaping the closer.
///
/// Text without surrounding decoration is returned unchanged.
pub fn unquote(s: &str) -> String {
    let (open, close) = match (s.chars().next(), s.chars().last()) {
        (Some('['), Some(']')) if s.len() >= 2 => ('[', ']'),
        (Some('"'), Some('"')) if s.len() >= 2 => ('"', '"'),
        _ => return s.to_string(),
    };
    let inner = &s[open.len_utf8()..s.len() - close.len_utf8()];
    let doubled: String = [close, close].iter().collect();
    inner.replace(&doubled, &close.to_string())
}

/// Quote a single undecorated name.
pub fn quote(name: &str, force_double_quotes: bool) -> String {
    let mut out = String::with_capacity(name.len() + 2);
    write_quoted(&mut out, name, force_double_quotes);
    out
}

/// Quote a name that may already carry one layer of decoration.
pub fn requote(name: &str, force_double_quotes: bool) -> String {
    quote(&unquote(name), force_double_quotes)
}

pub(crate) fn write_quoted(out: &mut String, name: &str, force_double_quotes: bool) {
    if force_double_quotes || name.contains('[') || name.contains(']') {
        out.push('"');
        for ch in name.chars() {
            if ch == '"' {
                out.push('"');
            }
            out.push(ch);
        }
        out.push('"');
    } else {
        out.push('[');
        out.push_str(name);
        out.push(']');
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ident_simple() {
        let ident = Ident::parse("Contact").unwrap();
        assert_eq!(ident.to_sql(false), "[Contact]");
    }

    #[test]
    fn ident_dotted() {
        let ident = Ident::parse("dbo.Contact").unwrap();
        assert_eq!(ident.to_sql(false), "[dbo].[Contact]");
    }

    #[test]
    fn ident_three_parts() {
        let ident = Ident::parse("server.dbo.Contact").unwrap();
        assert_eq!(ident.to_sql(false), "[server].[dbo].[Contact]");
    }

    #[test]
    fn ident_already_bracketed() {
        let ident = Ident::parse("[dbo].[Contact]").unwrap();
        assert_eq!(ident.to_sql(false), "[dbo].[Contact]");
    }

    #[test]
    fn ident_mixed_decoration() {
        let ident = Ident::parse(r#"[dbo]."Order Details".x"#).unwrap();
        assert_eq!(ident.to_sql(false), "[dbo].[Order Details].[x]");
    }

    #[test]
    fn ident_dot_inside_brackets() {
        let ident = Ident::parse("[my.schema].Contact").unwrap();
        assert_eq!(ident.parts(), &["my.schema".to_string(), "Contact".to_string()]);
        assert_eq!(ident.to_sql(false), "[my.schema].[Contact]");
    }

    #[test]
    fn ident_embedded_bracket_switches_to_double_quotes() {
        let ident = Ident::parse("[a]]b]").unwrap();
        assert_eq!(ident.name(), "a]b");
        assert_eq!(ident.to_sql(false), r#""a]b""#);
    }

    #[test]
    fn ident_forced_double_quotes() {
        let ident = Ident::parse("dbo.Contact").unwrap();
        assert_eq!(ident.to_sql(true), r#""dbo"."Contact""#);
    }

    #[test]
    fn ident_single_keeps_dots() {
        let ident = Ident::single("[Order.Total]").unwrap();
        assert_eq!(ident.to_sql(false), "[Order.Total]");
    }

    #[test]
    fn quote_doubles_embedded_double_quote() {
        assert_eq!(quote(r#"a"b"#, true), r#""a""b""#);
        assert_eq!(quote(r#"a"b"#, false), r#"[a"b]"#);
    }

    #[test]
    fn quote_round_trip() {
        for raw in ["Name", "[Name]", "a]b", "[a]]b]", r#"a"b"#, r#""a""b""#, "x[y", "Order Details"] {
            let once = requote(raw, false);
            assert_eq!(requote(&unquote(&once), false), once, "round trip of {raw}");
            let once = requote(raw, true);
            assert_eq!(requote(&unquote(&once), true), once, "forced round trip of {raw}");
        }
    }

    #[test]
    fn ident_rejects_empty() {
        assert!(Ident::parse("").is_err());
        assert!(Ident::parse("   ").is_err());
        assert!(Ident::single("[]").is_err());
    }

    #[test]
    fn ident_rejects_double_dot() {
        assert!(Ident::parse("dbo..Contact").is_err());
    }

    #[test]
    fn ident_rejects_trailing_dot() {
        assert!(Ident::parse("dbo.").is_err());
    }

    #[test]
    fn ident_rejects_unclosed_bracket() {
        assert!(Ident::parse("[dbo").is_err());
    }
}
