//! Context/cursor machine (component D). This module holds the pure,
//! easily-tested pieces — per-handle state, the handle pool, mode
//! translation, and SELECT construction — that the engine (which owns
//! the backend connection and issues the actual SQL) drives.
//!
//! Design note (spec §9): the original's "special case" flag and
//! `sql_temp` splice for the ISGREAT→ISNEXT transition are kept as
//! explicit fields rather than re-modelled as a separate state-machine
//! type; `Context` already *is* that state, one value per open handle.

use crate::codec;
use crate::datatype::DataType;
use crate::schema::{Index, Schema};
pub use crate::schema::matcher::KeyPart;
use crate::value::ColumnValue;
use constants::{ISAM_LOCK_MASK, ISCURR, ISEQUAL, ISFIRST, ISGREAT, ISGTEQ, ISLAST, ISNEXT, ISPREV};

/// Per-open-handle state (spec §3 "Context").
pub struct Context {
    pub handle: usize,
    /// Monotonic id assigned once at open/build time; part of the cursor
    /// name, so it must never change across repeated `start` calls on
    /// the same handle (spec §8 testable property 6).
    pub context_id: u64,
    /// The schema this handle was opened against.
    pub opened_schema: String,
    /// The schema currently in effect, which may differ from
    /// `opened_schema` after pivoting (spec §9 design note).
    pub current_schema: String,
    pub cursor_name: Option<String>,
    /// The index `start` matched the keydesc against, kept so `read` knows
    /// which columns the fetched row fills back into the record buffer.
    pub current_index: Option<Index>,
    pub last_oid: Option<String>,
    pub sql_last: Option<String>,
    pub sql_temp: Option<String>,
    pub mode: i32,
    pub in_read: bool,
    pub reverse_direction: bool,
    pub special_case: bool,
    pub trans_cursor: bool,
}

impl Context {
    pub fn new(handle: usize, context_id: u64, schema_name: &str) -> Self {
        Context {
            handle,
            context_id,
            opened_schema: schema_name.to_string(),
            current_schema: schema_name.to_string(),
            cursor_name: None,
            current_index: None,
            last_oid: None,
            sql_last: None,
            sql_temp: None,
            mode: 0,
            in_read: false,
            reverse_direction: false,
            special_case: false,
            trans_cursor: false,
        }
    }

    /// `<schema>_<context_id>_<pid>` (spec §4.D step 4).
    pub fn cursor_name_for(&self, pid: u32) -> String {
        format!("{}_{}_{pid}", self.current_schema, self.context_id)
    }
}

/// A bounded dense allocator for handle ids, `1..=MAXFDS` (0 is the
/// reserved invalid handle).
pub struct HandlePool {
    used: Vec<bool>,
}

impl HandlePool {
    pub fn new(capacity: usize) -> Self {
        HandlePool {
            used: vec![false; capacity],
        }
    }

    pub fn allocate(&mut self) -> Option<usize> {
        let slot = self.used.iter().position(|&u| !u)?;
        self.used[slot] = true;
        Some(slot + 1)
    }

    pub fn free(&mut self, handle: usize) {
        if handle >= 1 && handle <= self.used.len() {
            self.used[handle - 1] = false;
        }
    }
}

/// The FETCH direction a `read` mode translates to, independent of the
/// backend SQL text (spec §4.D mode table).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchDirection {
    First,
    Last,
    Backward1,
    Forward1,
}

/// Translate a `read` mode (with lock bits already present) into a FETCH
/// direction, swapping ISPREV/ISNEXT when `reverse_direction` is set.
pub fn translate_read_mode(mode: i32, reverse_direction: bool) -> Option<FetchDirection> {
    let mode = mode & !ISAM_LOCK_MASK;
    let mode = if reverse_direction {
        match mode {
            ISPREV => ISNEXT,
            ISNEXT => ISPREV,
            other => other,
        }
    } else {
        mode
    };

    match mode {
        ISFIRST => Some(FetchDirection::First),
        ISLAST => Some(FetchDirection::Last),
        ISPREV => Some(FetchDirection::Backward1),
        ISNEXT | ISCURR | ISEQUAL | ISGREAT | ISGTEQ => Some(FetchDirection::Forward1),
        _ => None,
    }
}

/// The SELECT a `start` call declares, plus the ISGREAT companion
/// fragment and whether a sentinel flipped the ordering.
pub struct SelectPlan {
    pub sql: String,
    pub sql_temp: Option<String>,
    pub reverse_direction: bool,
}

/// A value is the reverse-order sentinel when it is non-empty and every
/// character is `z` (spec §4.D, seed scenario S4).
fn is_all_z_sentinel(text: &str) -> bool {
    !text.is_empty() && text.chars().all(|c| c == 'z')
}

fn escape_regex(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        if "\\.^$|?*+()[]{}".contains(c) {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

/// Build the SELECT for `start(handle, key, length, record, mode)` (spec
/// §4.D "SELECT construction").
pub fn build_select(schema: &Schema, index: &Index, record: &[u8], mode: i32) -> SelectPlan {
    let filtered = matches!(mode, ISEQUAL | ISGREAT | ISGTEQ) && !index.columns.is_empty();

    let values: Vec<ColumnValue> = index
        .columns
        .iter()
        .map(|c| {
            codec::extract_value(c.datatype, c.startpos, c.length, c.codelength, record)
                .unwrap_or(ColumnValue::Unset)
        })
        .collect();

    let mut reverse_direction = false;
    if filtered {
        reverse_direction = values
            .iter()
            .any(|v| v.as_text().is_some_and(is_all_z_sentinel));
    }

    let mut where_clauses = Vec::new();
    let mut temp_clauses = Vec::new();

    if filtered {
        let operator = if reverse_direction {
            "="
        } else {
            match mode {
                ISGREAT => ">",
                ISGTEQ => ">=",
                _ => "=",
            }
        };

        for (column, value) in index.columns.iter().zip(values.iter()) {
            if mode == ISGTEQ && value.is_unset() {
                continue;
            }
            let Some(literal) = crate::schema::builder::literal_for_filter(column.datatype, value)
            else {
                continue;
            };
            where_clauses.push(format!("{}{operator}{literal}", column.name));

            if mode == ISGREAT {
                if let Some(text) = value.as_text() {
                    let lhs = if column.datatype == DataType::Binary {
                        format!("encode({}::bytea,'escape'::text)", column.name)
                    } else {
                        column.name.clone()
                    };
                    temp_clauses.push(format!("AND {lhs} !~ '^{}'", escape_regex(text)));
                }
            }
        }
    }

    let mut sql = format!("SELECT * FROM {}", schema.pgname);
    if where_clauses.is_empty() {
        sql.push_str(" WHERE phantom != true");
    } else {
        sql.push_str(" WHERE ");
        sql.push_str(&where_clauses.join(" AND "));
        sql.push_str(" AND phantom != true");
    }

    let order_direction = if reverse_direction { "DESC" } else { "ASC" };
    let order: Vec<String> = index
        .columns
        .iter()
        .map(|c| format!("{} {order_direction}", c.name))
        .collect();
    sql.push_str(" ORDER BY ");
    sql.push_str(&order.join(", "));

    SelectPlan {
        sql,
        sql_temp: if temp_clauses.is_empty() {
            None
        } else {
            Some(temp_clauses.join(" "))
        },
        reverse_direction,
    }
}

/// Splice `sql_temp` into `sql_last` just before its `ORDER BY`, for the
/// ISGREAT→ISNEXT re-declare (spec §4.D, §8 testable property 8).
pub fn splice_before_order_by(sql_last: &str, sql_temp: &str) -> String {
    match sql_last.find("ORDER BY") {
        Some(pos) => format!("{}{sql_temp} {}", &sql_last[..pos], &sql_last[pos..]),
        None => format!("{sql_last} {sql_temp}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{Column, Modifier};

    fn pk_index() -> Index {
        Index {
            name: "pk".to_string(),
            is_unique: true,
            num: 1,
            columns: vec![Column::new("id", 0, 5, DataType::Code, Some(5), None, false)],
        }
    }

    fn acct_schema() -> Schema {
        Schema {
            name: "acct".to_string(),
            pgname: "acct_acct".to_string(),
            reclen: 20,
            columns: vec![
                Column::new("id", 0, 5, DataType::Code, Some(5), None, false),
                Column::new("name", 5, 15, DataType::Char, None, None, false),
            ],
            modifiers: Vec::<Modifier>::new(),
            indexes: vec![pk_index()],
            nocreate: false,
            is_convertible: false,
            is_pivotable: false,
            force_temp: false,
        }
    }

    #[test]
    fn handle_pool_reuses_freed_slots() {
        let mut pool = HandlePool::new(2);
        let a = pool.allocate().unwrap();
        let b = pool.allocate().unwrap();
        assert!(pool.allocate().is_none());
        pool.free(a);
        assert_eq!(pool.allocate().unwrap(), a);
        let _ = b;
    }

    #[test]
    fn cursor_name_is_stable_across_calls() {
        let ctx = Context::new(1, 7, "acct");
        assert_eq!(ctx.cursor_name_for(42), ctx.cursor_name_for(42));
    }

    #[test]
    fn isnext_and_isprev_swap_under_reverse_direction() {
        assert_eq!(
            translate_read_mode(ISNEXT, true),
            Some(FetchDirection::Backward1)
        );
        assert_eq!(
            translate_read_mode(ISPREV, true),
            Some(FetchDirection::Forward1)
        );
        assert_eq!(
            translate_read_mode(ISNEXT, false),
            Some(FetchDirection::Forward1)
        );
    }

    #[test]
    fn lock_bits_are_stripped_before_translation() {
        assert_eq!(
            translate_read_mode(ISNEXT | constants::ISLOCK, false),
            Some(FetchDirection::Forward1)
        );
    }

    #[test]
    fn isequal_builds_equality_where_and_order_by() {
        let mut record = codec::blank_record(20);
        record[0..5].copy_from_slice(b"00042");
        let plan = build_select(&acct_schema(), &pk_index(), &record, ISEQUAL);
        assert!(plan.sql.contains("id=E'00042'"));
        assert!(plan.sql.contains("ORDER BY id ASC"));
        assert!(plan.sql_temp.is_none());
        assert!(!plan.reverse_direction);
    }

    #[test]
    fn isgreat_builds_companion_not_match_clause() {
        let narrow_index = Index {
            name: "pk".to_string(),
            is_unique: true,
            num: 1,
            columns: vec![Column::new("id", 0, 1, DataType::Code, Some(1), None, false)],
        };
        let mut record = codec::blank_record(1);
        record[0] = b'A';
        let plan = build_select(&acct_schema(), &narrow_index, &record, ISGREAT);
        assert!(plan.sql.contains("id>E'A'"));
        let temp = plan.sql_temp.unwrap();
        assert!(temp.contains("id !~ '^A'"));
    }

    #[test]
    fn sentinel_value_reverses_ordering() {
        let mut record = codec::blank_record(20);
        record[0..5].copy_from_slice(b"zzzzz");
        let plan = build_select(&acct_schema(), &pk_index(), &record, ISEQUAL);
        assert!(plan.reverse_direction);
        assert!(plan.sql.contains("ORDER BY id DESC"));
    }

    #[test]
    fn isfirst_has_no_where_filter_but_keeps_phantom_guard() {
        let record = codec::blank_record(20);
        let plan = build_select(&acct_schema(), &pk_index(), &record, ISFIRST);
        assert!(plan.sql.contains("WHERE phantom != true"));
        assert!(!plan.sql.contains("id="));
    }

    #[test]
    fn splice_inserts_before_order_by() {
        let sql_last = "SELECT * FROM t WHERE id>E'A' AND phantom != true ORDER BY id ASC";
        let spliced = splice_before_order_by(sql_last, "AND id !~ '^A'");
        assert!(spliced.contains("AND id !~ '^A' ORDER BY"));
    }
}
