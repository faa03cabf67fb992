//! Schema registry (component B): parses `.def` files into [`Schema`]
//! values, holds them by logical name, and answers the index-matching and
//! pivoting questions the context/cursor machine (component D) needs.

pub mod builder;
pub mod matcher;
pub mod parser;

use crate::datatype::DataType;
use crate::value::ColumnValue;
use std::collections::HashMap;

/// One column of a schema (schema.h's `COLUMN`), plus the value most
/// recently extracted from (or destined for) a record -- the design note
/// in spec §9 replacing the original's backend-escaped-string storage
/// with a tagged union.
#[derive(Clone, Debug)]
pub struct Column {
    pub name: String,
    pub startpos: usize,
    pub length: usize,
    pub codelength: Option<usize>,
    pub datatype: DataType,
    pub params: Option<String>,
    pub is_phantom: bool,
    pub value: ColumnValue,
}

impl Column {
    pub fn new(
        name: impl Into<String>,
        startpos: usize,
        length: usize,
        datatype: DataType,
        codelength: Option<usize>,
        params: Option<String>,
        is_phantom: bool,
    ) -> Self {
        Column {
            name: name.into(),
            startpos,
            length,
            codelength,
            datatype,
            params,
            is_phantom,
            value: ColumnValue::Unset,
        }
    }
}

/// An index (schema.h's `INDEX`): an ordinal position and an ordered copy
/// of the columns that compose it.
#[derive(Clone, Debug)]
pub struct Index {
    pub name: String,
    pub is_unique: bool,
    pub num: usize,
    pub columns: Vec<Column>,
}

/// A raw SQL statement run once after `CREATE TABLE`, in file order.
#[derive(Clone, Debug)]
pub struct Modifier(pub String);

/// A parsed table definition.
#[derive(Clone, Debug)]
pub struct Schema {
    /// Logical name as seen by client code (the `.def` file's base name,
    /// collapsed to `rptmp` for any `rptmp*`-prefixed definition).
    pub name: String,
    /// Backend table name: an explicit `pgname=` directive, or
    /// `{prefix}{name}` with a `_conv` suffix when convertible.
    pub pgname: String,
    pub reclen: usize,
    pub columns: Vec<Column>,
    pub modifiers: Vec<Modifier>,
    pub indexes: Vec<Index>,
    pub nocreate: bool,
    pub is_convertible: bool,
    pub is_pivotable: bool,
    /// Backend table is created `TEMP` (every `rptmp*` definition).
    pub force_temp: bool,
}

impl Schema {
    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name == name)
    }
}

/// Holds every schema seen during a process lifetime. Append-only (spec
/// §5): `.def` files are read once and cached here.
#[derive(Default)]
pub struct SchemaRegistry {
    schemas: Vec<Schema>,
    by_name: HashMap<String, usize>,
}

impl SchemaRegistry {
    pub fn new() -> Self {
        SchemaRegistry {
            schemas: Vec::new(),
            by_name: HashMap::new(),
        }
    }

    /// Add a schema under its logical name. Idempotent: a second push of
    /// an already-registered name is a no-op and returns `false`.
    pub fn push(&mut self, schema: Schema) -> bool {
        if self.by_name.contains_key(&schema.name) {
            return false;
        }
        self.by_name.insert(schema.name.clone(), self.schemas.len());
        self.schemas.push(schema);
        true
    }

    pub fn get(&self, name: &str) -> Option<&Schema> {
        self.by_name.get(name).map(|&i| &self.schemas[i])
    }

    pub fn get_mut(&mut self, name: &str) -> Option<&mut Schema> {
        match self.by_name.get(name) {
            Some(&i) => Some(&mut self.schemas[i]),
            None => None,
        }
    }

    /// Resolve pivoting for a schema named `tables`: redirect to
    /// `tables_<xx>` where `xx` is the lowercased first two bytes of
    /// `record`, falling back to `schema` itself when there's no match
    /// or no sibling (spec §4.B).
    pub fn pivot<'a>(&'a self, schema: &'a Schema, record: &[u8]) -> &'a Schema {
        if !schema.is_pivotable || record.len() < 2 {
            return schema;
        }
        let suffix = String::from_utf8_lossy(&record[0..2]).to_lowercase();
        let candidate = format!("{}_{}", schema.name, suffix);
        self.get(&candidate).unwrap_or(schema)
    }
}

/// Collapse a raw definition name into its registry logical name, the
/// convertible flag, and whether the backend table must be `TEMP` (spec
/// §4.B: a trailing `*` marks convertible; any `rptmp`-prefixed name
/// collapses to the single shared logical name `rptmp`).
pub fn normalize_definition_name(raw_name: &str) -> (String, bool, bool) {
    let is_convertible = raw_name.ends_with('*');
    let trimmed = raw_name.trim_end_matches('*');
    if trimmed.starts_with("rptmp") {
        ("rptmp".to_string(), is_convertible, true)
    } else {
        (trimmed.to_string(), is_convertible, false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn push_is_idempotent() {
        let mut registry = SchemaRegistry::new();
        let schema = Schema {
            name: "acct".to_string(),
            pgname: "acct".to_string(),
            reclen: 20,
            columns: Vec::new(),
            modifiers: Vec::new(),
            indexes: Vec::new(),
            nocreate: false,
            is_convertible: false,
            is_pivotable: false,
            force_temp: false,
        };
        assert!(registry.push(schema.clone()));
        assert!(!registry.push(schema));
        assert_eq!(registry.schemas.len(), 1);
    }

    #[test]
    fn rptmp_names_collapse() {
        let (name, convertible, temp) = normalize_definition_name("rptmp_orders");
        assert_eq!(name, "rptmp");
        assert!(!convertible);
        assert!(temp);
    }

    #[test]
    fn convertible_marker_is_stripped() {
        let (name, convertible, temp) = normalize_definition_name("ledger*");
        assert_eq!(name, "ledger");
        assert!(convertible);
        assert!(!temp);
    }

    #[test]
    fn pivot_falls_back_when_no_sibling_matches() {
        let mut registry = SchemaRegistry::new();
        let default_tables = Schema {
            name: "tables".to_string(),
            pgname: "tables".to_string(),
            reclen: 4,
            columns: Vec::new(),
            modifiers: Vec::new(),
            indexes: Vec::new(),
            nocreate: false,
            is_convertible: false,
            is_pivotable: true,
            force_temp: false,
        };
        registry.push(default_tables.clone());
        let record = b"zz  ";
        let resolved = registry.pivot(&default_tables, record);
        assert_eq!(resolved.name, "tables");
    }
}
