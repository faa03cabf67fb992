//! A typed column value. Replaces the original's stringly-typed `c->value`
//! (every value carried around as a backend-escaped string) with a tagged
//! union; rendering to SQL text happens only at the query-builder boundary
//! (see `schema::builder`), not wherever a value happens to be produced.

/// A column's value, or the explicit absence of one.
///
/// `Boolean(None)` is distinct from `Unset`: it is what a blank BOOLEAN
/// byte decodes to (spec §4.A), and it still renders as an explicit SQL
/// `null` on INSERT/UPDATE, whereas `Unset` means the column is omitted
/// from the statement entirely.
#[derive(Clone, Debug, PartialEq)]
pub enum ColumnValue {
    Unset,
    Text(String),
    Decimal(String),
    Integer(i32),
    Binary(Vec<u8>),
    Boolean(Option<bool>),
}

impl ColumnValue {
    pub fn is_unset(&self) -> bool {
        matches!(self, ColumnValue::Unset)
    }

    /// True if a blank-byte slice for this value's datatype would compare
    /// as an "all `z`" sentinel (the reverse-sentinel check only applies
    /// to text-shaped values).
    pub fn as_text(&self) -> Option<&str> {
        match self {
            ColumnValue::Text(s) => Some(s.as_str()),
            _ => None,
        }
    }
}
