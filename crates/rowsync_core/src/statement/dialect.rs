//! SQL dialects: identifier quoting, parameter markers, identity fetch.

use crate::error::{SyncError, SyncResult};
use std::fmt;
use std::sync::Arc;

/// Maximum identifier length accepted by any dialect.
const MAX_IDENTIFIER_LENGTH: usize = 128;

/// Store-specific pieces of statement text.
///
/// Identifiers cannot be bound as parameters, so they are validated and
/// quoted here; everything else reaches the store as a parameter.
pub trait Dialect: Send + Sync + fmt::Debug {
    /// Short name, e.g. `sqlite`.
    fn name(&self) -> &'static str;

    /// Quotes an identifier, escaping the quote character.
    ///
    /// # Errors
    ///
    /// Returns a validation error for an empty identifier, one containing
    /// NUL, or one longer than 128 bytes.
    fn quote_identifier(&self, ident: &str) -> SyncResult<String>;

    /// Returns the marker of the parameter at `ordinal` (1-based).
    fn parameter_name(&self, ordinal: usize) -> String;

    /// Statement returning the last value generated by an insert.
    fn identity_fetch(&self) -> &'static str;
}

/// Rejects identifiers that cannot be quoted safely.
///
/// # Errors
///
/// Returns a validation error describing the problem.
pub fn validate_identifier(ident: &str) -> SyncResult<()> {
    if ident.is_empty() {
        return Err(SyncError::validation("identifier cannot be empty"));
    }
    if ident.contains('\0') {
        return Err(SyncError::validation(format!(
            "identifier contains a NUL byte: {ident:?}"
        )));
    }
    if ident.len() > MAX_IDENTIFIER_LENGTH {
        return Err(SyncError::validation(format!(
            "identifier exceeds {MAX_IDENTIFIER_LENGTH} bytes (got {}): {ident:?}",
            ident.len()
        )));
    }
    Ok(())
}

/// SQLite: `"ident"`, `:pN`, `last_insert_rowid()`.
#[derive(Debug, Clone, Copy, Default)]
pub struct SqliteDialect;

impl Dialect for SqliteDialect {
    fn name(&self) -> &'static str {
        "sqlite"
    }

    fn quote_identifier(&self, ident: &str) -> SyncResult<String> {
        validate_identifier(ident)?;
        Ok(format!("\"{}\"", ident.replace('"', "\"\"")))
    }

    fn parameter_name(&self, ordinal: usize) -> String {
        format!(":p{ordinal}")
    }

    fn identity_fetch(&self) -> &'static str {
        "SELECT last_insert_rowid()"
    }
}

/// SQL Server: `[ident]`, `@pN`, `SCOPE_IDENTITY()`.
#[derive(Debug, Clone, Copy, Default)]
pub struct SqlServerDialect;

impl Dialect for SqlServerDialect {
    fn name(&self) -> &'static str {
        "sqlserver"
    }

    fn quote_identifier(&self, ident: &str) -> SyncResult<String> {
        validate_identifier(ident)?;
        Ok(format!("[{}]", ident.replace(']', "]]")))
    }

    fn parameter_name(&self, ordinal: usize) -> String {
        format!("@p{ordinal}")
    }

    fn identity_fetch(&self) -> &'static str {
        "SELECT SCOPE_IDENTITY()"
    }
}

/// Looks a dialect up by its short name.
pub fn dialect_by_name(name: &str) -> Option<Arc<dyn Dialect>> {
    match name.to_ascii_lowercase().as_str() {
        "sqlite" => Some(Arc::new(SqliteDialect)),
        "sqlserver" | "mssql" => Some(Arc::new(SqlServerDialect)),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sqlite_quoting() {
        let d = SqliteDialect;
        assert_eq!(d.quote_identifier("Employee").unwrap(), "\"Employee\"");
        assert_eq!(d.quote_identifier("odd\"name").unwrap(), "\"odd\"\"name\"");
        assert_eq!(d.parameter_name(3), ":p3");
    }

    #[test]
    fn sqlserver_quoting() {
        let d = SqlServerDialect;
        assert_eq!(d.quote_identifier("Employee").unwrap(), "[Employee]");
        assert_eq!(d.quote_identifier("odd]name").unwrap(), "[odd]]name]");
        assert_eq!(d.parameter_name(1), "@p1");
    }

    #[test]
    fn suspicious_identifiers_are_rejected() {
        assert!(validate_identifier("").is_err());
        assert!(validate_identifier("a\0b").is_err());
        assert!(validate_identifier(&"x".repeat(129)).is_err());
        assert!(validate_identifier(&"x".repeat(128)).is_ok());
        assert!(SqliteDialect.quote_identifier("").is_err());
    }

    #[test]
    fn lookup_by_name() {
        assert_eq!(dialect_by_name("SQLite").map(|d| d.name()), Some("sqlite"));
        assert_eq!(dialect_by_name("mssql").map(|d| d.name()), Some("sqlserver"));
        assert!(dialect_by_name("oracle").is_none());
    }
}
