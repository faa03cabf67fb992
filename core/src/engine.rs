//! The `Engine` (spec §9 design note: "wrap global mutable state in a
//! single Engine value"). Owns the schema registry, the handle/context
//! tables, and the default connection; its methods are the safe-Rust
//! counterpart of every legacy entry point in §4.E, one call each. The
//! `pgisam-bridge` crate is a thin `extern "C"` shim over these methods
//! plus the `iserrno`/`-1` collapsing the C ABI needs (spec §10.3).

use crate::codec;
use crate::conn::{Conn, ConnDefRow, QueryResult};
use crate::context::{self, Context, FetchDirection, HandlePool};
use crate::datatype::DataType;
use crate::err::{IsamError, Result};
use crate::schema::matcher::{self, KeyPart};
use crate::schema::{self, builder, parser, Schema};
use crate::value::ColumnValue;
use constants::{ISAM_LOCK_MASK, ISEQUAL, ISGREAT, ISGTEQ, ISNEXT, MAXFDS};

/// Mirrors the original's `pgisam_opt` enum / `set_pgisam_options` grammar:
/// a comma-separated list of `printonly`, `sql`.
#[derive(Default, Clone, Debug)]
pub struct PgIsamOptions {
    pub print_only: bool,
    pub sql_trace: bool,
}

impl PgIsamOptions {
    pub fn parse(spec: Option<&str>) -> Self {
        let mut options = PgIsamOptions::default();
        let Some(spec) = spec else {
            return options;
        };
        for token in spec.split(',') {
            match token.trim() {
                "printonly" => options.print_only = true,
                "sql" => options.sql_trace = true,
                _ => {}
            }
        }
        options
    }
}

pub struct Engine {
    schemas: schema::SchemaRegistry,
    handles: HandlePool,
    contexts: Vec<Option<Context>>,
    conn: Option<Conn>,
    next_context_id: u64,
    bridge_dir: String,
    edata: String,
    last_sql: Option<String>,
}

impl Engine {
    /// Connect using `conn.def`'s row for `edata`, issuing `SET
    /// search_path` (spec §4.C). `options` uses the `set_pgisam_options`
    /// grammar (`printonly`, `sql`).
    pub fn new(
        bridge_dir: impl Into<String>,
        edata: impl Into<String>,
        options: Option<&str>,
    ) -> Result<Engine> {
        let bridge_dir = bridge_dir.into();
        let edata = edata.into();
        let options = PgIsamOptions::parse(options);

        // Touch the logger before anything else so the rolling file
        // appender is installed even when nothing ever raises its level.
        let _ = logger::Logger::sql_trace_enabled();

        let conn_def_path = format!("{bridge_dir}/conn.def");
        let conn_def_text =
            std::fs::read_to_string(&conn_def_path).map_err(|_| IsamError::FileNotOpen)?;
        let row = ConnDefRow::lookup(&conn_def_text, &edata).ok_or(IsamError::FileNotOpen)?;
        let mut conn = Conn::open(&row).ok_or(IsamError::FileNotOpen)?;
        conn.print_only = options.print_only;
        if options.sql_trace {
            logger::Logger::set_log_level(log::LevelFilter::Trace);
        }

        Ok(Engine {
            schemas: schema::SchemaRegistry::new(),
            handles: HandlePool::new(MAXFDS),
            contexts: (0..MAXFDS).map(|_| None).collect(),
            conn: Some(conn),
            next_context_id: 1,
            bridge_dir,
            edata,
            last_sql: None,
        })
    }

    /// Build from the `BRIDGE`/`EDATA` environment variables (spec §6).
    pub fn from_env() -> Result<Engine> {
        let bridge_dir =
            std::env::var(constants::ENV_BRIDGE).map_err(|_| IsamError::NoSchemaDefinition)?;
        let edata =
            std::env::var(constants::ENV_EDATA).map_err(|_| IsamError::NoSchemaDefinition)?;
        let pgisam = std::env::var(constants::ENV_PGISAM).unwrap_or_default();
        let options = if pgisam.contains("sql") {
            Some("sql")
        } else {
            None
        };
        Engine::new(bridge_dir, edata, options)
    }

    /// The most recently executed SQL statement, for the bridge's own test
    /// tooling (`get_last_sql`, spec §11).
    pub fn last_sql(&self) -> Option<&str> {
        self.last_sql.as_deref()
    }

    pub fn edata(&self) -> &str {
        &self.edata
    }

    pub fn bridge_dir(&self) -> &str {
        &self.bridge_dir
    }

    /// Override the `print_only` flag set at connect time (the clone
    /// driver's `--dry-run`, spec §10.4 `PgIsamOptions`).
    pub fn set_print_only(&mut self, value: bool) -> Result<()> {
        self.conn.as_mut().ok_or(IsamError::FileNotOpen)?.print_only = value;
        Ok(())
    }

    /// The record length of the schema currently in effect on `handle`,
    /// so an FFI caller can size the raw record buffer it reads into.
    pub fn reclen_for(&self, handle: usize) -> Result<usize> {
        let schema_name = &self.ctx(handle)?.current_schema;
        Ok(self
            .schemas
            .get(schema_name)
            .ok_or(IsamError::NoSchemaDefinition)?
            .reclen)
    }

    /// Register every schema named in `preload.def`, one name per line
    /// (spec §10.4). A single schema's load failure is logged and skipped
    /// rather than aborting the rest of the list.
    pub fn preload(&mut self) -> Result<()> {
        let path = format!("{}/preload.def", self.bridge_dir);
        let text = std::fs::read_to_string(&path).map_err(|_| IsamError::NoSchemaDefinition)?;
        for line in text.lines() {
            let name = line.trim();
            if name.is_empty() || name.starts_with('#') {
                continue;
            }
            if let Err(error) = self.ensure_schema_loaded(name) {
                log::warn!("preload: failed to load {name}: {error}");
            }
        }
        Ok(())
    }

    fn ctx(&self, handle: usize) -> Result<&Context> {
        self.contexts
            .get(handle.wrapping_sub(1))
            .and_then(|c| c.as_ref())
            .ok_or(IsamError::FileNotOpen)
    }

    fn ctx_mut(&mut self, handle: usize) -> Result<&mut Context> {
        self.contexts
            .get_mut(handle.wrapping_sub(1))
            .and_then(|c| c.as_mut())
            .ok_or(IsamError::FileNotOpen)
    }

    /// Load `<name>.def` into the registry if it isn't there yet, and
    /// return the registry's logical name for it (the `.def` filename is
    /// the raw, possibly `*`/`rptmp`-prefixed name; the registry key is
    /// normalised, spec §4.B).
    fn ensure_schema_loaded(&mut self, name: &str) -> Result<String> {
        let (logical, _, _) = schema::normalize_definition_name(name);
        if self.schemas.get(&logical).is_some() {
            return Ok(logical);
        }
        let path = format!("{}/{name}.def", self.bridge_dir);
        let text = std::fs::read_to_string(&path).map_err(|_| IsamError::NoSchemaDefinition)?;
        let parsed = parser::parse_definition(name, &text)
            .map_err(|error| IsamError::Backend(error.to_string()))?;
        self.schemas.push(parsed);
        Ok(logical)
    }

    /// `isopen(path, mode)`. Registers the schema lazily if this is its
    /// first mention, then allocates a handle.
    pub fn open(&mut self, name: &str) -> Result<usize> {
        let logical = self.ensure_schema_loaded(name)?;
        let handle = self.handles.allocate().ok_or(IsamError::TooManyFilesOpen)?;
        let context_id = self.next_context_id;
        self.next_context_id += 1;
        self.contexts[handle - 1] = Some(Context::new(handle, context_id, &logical));
        Ok(handle)
    }

    /// `isbuild(path, reclen, keydesc, mode)`: emit DDL (unless
    /// `nocreate`), then open.
    pub fn build(&mut self, name: &str) -> Result<usize> {
        let logical = self.ensure_schema_loaded(name)?;
        let schema = self
            .schemas
            .get(&logical)
            .ok_or(IsamError::NoSchemaDefinition)?
            .clone();
        if !schema.nocreate {
            self.emit_ddl(&schema)?;
        }
        self.open(name)
    }

    /// `CREATE TABLE`, then modifiers in file order, then indexes (spec
    /// §11 "MODIFY list execution order"). A modifier failure aborts the
    /// rest of this table's DDL but is not itself an error returned to the
    /// caller, matching the original's "keep preloading later schemas"
    /// behaviour.
    fn emit_ddl(&mut self, schema: &Schema) -> Result<()> {
        let conn = self.conn.as_mut().ok_or(IsamError::FileNotOpen)?;
        conn.exec(&builder::build_create_table(schema))
            .ok_or_else(|| IsamError::Backend(format!("CREATE TABLE failed for {}", schema.name)))?;

        for stmt in builder::build_modifiers(schema) {
            if conn.exec(&stmt).is_none() {
                log::warn!("modifier failed for {}: {stmt}", schema.name);
                return Ok(());
            }
        }
        for stmt in builder::build_indexes(schema) {
            conn.exec(&stmt)
                .ok_or_else(|| IsamError::Backend(format!("index creation failed: {stmt}")))?;
        }
        Ok(())
    }

    /// `iserase(path)`: drop the backend table.
    pub fn erase(&mut self, name: &str) -> Result<()> {
        let logical = self.ensure_schema_loaded(name)?;
        let pgname = self
            .schemas
            .get(&logical)
            .ok_or(IsamError::NoSchemaDefinition)?
            .pgname
            .clone();
        let sql = format!("DROP TABLE IF EXISTS {pgname}");
        let conn = self.conn.as_mut().ok_or(IsamError::FileNotOpen)?;
        conn.exec(&sql)
            .ok_or_else(|| IsamError::Backend("DROP TABLE failed".to_string()))?;
        self.last_sql = Some(sql);
        Ok(())
    }

    /// `isstart(handle, keydesc, length, record, mode)` (spec §4.D).
    pub fn start(&mut self, handle: usize, parts: &[KeyPart], record: &[u8], mode: i32) -> Result<()> {
        let mode = mode & !ISAM_LOCK_MASK;
        let opened_name = self.ctx(handle)?.opened_schema.clone();
        let schema = self
            .schemas
            .get(&opened_name)
            .ok_or(IsamError::NoSchemaDefinition)?;
        let pivoted = self.schemas.pivot(schema, record).clone();
        let index = matcher::match_index(&pivoted, parts)
            .ok_or(IsamError::IllegalKeyDescriptor)?
            .clone();
        let plan = context::build_select(&pivoted, &index, record, mode);

        let pid = std::process::id();
        let cursor_name = self.ctx(handle)?.cursor_name_for(pid);
        let old_cursor = self.ctx_mut(handle)?.cursor_name.take();

        let conn = self.conn.as_mut().ok_or(IsamError::FileNotOpen)?;
        if let Some(old) = &old_cursor {
            conn.exec(&format!("CLOSE {old}"));
        }
        let with_hold = !conn.in_transaction;
        let declare = format!(
            "DECLARE {cursor_name} SCROLL CURSOR {} FOR {}",
            if with_hold { "WITH HOLD" } else { "WITHOUT HOLD" },
            plan.sql
        );
        let exec_sql = if with_hold {
            format!("BEGIN; {declare}; COMMIT")
        } else {
            declare.clone()
        };
        conn.exec(&exec_sql).ok_or(IsamError::NoRecordFound)?;
        self.last_sql = Some(exec_sql);

        let ctx = self.ctx_mut(handle)?;
        ctx.current_schema = pivoted.name.clone();
        ctx.current_index = Some(index);
        ctx.sql_last = Some(declare);
        ctx.sql_temp = plan.sql_temp;
        ctx.cursor_name = Some(cursor_name);
        ctx.reverse_direction = plan.reverse_direction;
        ctx.trans_cursor = !with_hold;
        ctx.in_read = false;
        ctx.special_case = false;
        ctx.mode = mode;
        ctx.last_oid = None;
        Ok(())
    }

    /// `isread(handle, record, mode)` (spec §4.D).
    pub fn read(&mut self, handle: usize, record: &mut [u8], mode: i32) -> Result<()> {
        if self.ctx(handle)?.cursor_name.is_none() {
            if matches!(mode & !ISAM_LOCK_MASK, ISEQUAL | ISGTEQ) {
                return self.auto_read(handle, record, mode);
            }
            return Err(IsamError::NoBeginWorkYet);
        }

        let start_mode = self.ctx(handle)?.mode;
        let special_case = self.ctx(handle)?.special_case;
        let stripped = mode & !ISAM_LOCK_MASK;
        if start_mode == ISGREAT && stripped == ISNEXT && !special_case {
            self.redeclare_with_sql_temp(handle)?;
        }

        let reverse_direction = self.ctx(handle)?.reverse_direction;
        let direction = context::translate_read_mode(mode, reverse_direction)
            .ok_or(IsamError::IllegalArgument)?;
        let cursor_name = self
            .ctx(handle)?
            .cursor_name
            .clone()
            .ok_or(IsamError::NoBeginWorkYet)?;
        let fetch_sql = fetch_sql_for(&cursor_name, direction);

        let conn = self.conn.as_mut().ok_or(IsamError::FileNotOpen)?;
        let result = conn.exec(&fetch_sql).ok_or(IsamError::NoRecordFound)?;
        self.last_sql = Some(fetch_sql);
        if result.rows() != 1 {
            return Err(IsamError::NoRecordFound);
        }
        self.fill_record_from_result(handle, &result, 0, record)?;
        self.ctx_mut(handle)?.in_read = true;
        Ok(())
    }

    /// ISEQUAL/ISGTEQ without an open cursor: a single-row `SELECT ...
    /// LIMIT 1` against the schema's first index (spec §4.D "read").
    fn auto_read(&mut self, handle: usize, record: &mut [u8], mode: i32) -> Result<()> {
        let schema_name = self.ctx(handle)?.current_schema.clone();
        let schema = self
            .schemas
            .get(&schema_name)
            .ok_or(IsamError::NoSchemaDefinition)?
            .clone();
        let index = schema
            .indexes
            .first()
            .cloned()
            .ok_or(IsamError::IllegalKeyDescriptor)?;
        let plan = context::build_select(&schema, &index, record, mode);
        let sql = format!("{} LIMIT 1", plan.sql);

        let conn = self.conn.as_mut().ok_or(IsamError::FileNotOpen)?;
        let result = conn.exec(&sql).ok_or(IsamError::NoRecordFound)?;
        self.last_sql = Some(sql);
        if result.rows() != 1 {
            return Err(IsamError::NoRecordFound);
        }
        self.ctx_mut(handle)?.current_index = Some(index);
        self.fill_record_from_result(handle, &result, 0, record)?;
        self.ctx_mut(handle)?.in_read = true;
        Ok(())
    }

    /// The ISGREAT->ISNEXT transition: re-declare the cursor with
    /// `sql_temp` spliced in before `ORDER BY` (spec §4.D).
    fn redeclare_with_sql_temp(&mut self, handle: usize) -> Result<()> {
        let (cursor_name, sql_last, sql_temp) = {
            let ctx = self.ctx(handle)?;
            (ctx.cursor_name.clone(), ctx.sql_last.clone(), ctx.sql_temp.clone())
        };
        let cursor_name = cursor_name.ok_or(IsamError::NoBeginWorkYet)?;
        let Some(sql_temp) = sql_temp else {
            self.ctx_mut(handle)?.special_case = true;
            return Ok(());
        };
        let sql_last = sql_last.ok_or(IsamError::NoBeginWorkYet)?;
        let redeclared = context::splice_before_order_by(&sql_last, &sql_temp);

        let conn = self.conn.as_mut().ok_or(IsamError::FileNotOpen)?;
        conn.exec(&format!("CLOSE {cursor_name}"));
        conn.exec(&redeclared).ok_or(IsamError::NoRecordFound)?;

        let ctx = self.ctx_mut(handle)?;
        ctx.sql_last = Some(redeclared);
        ctx.special_case = true;
        Ok(())
    }

    /// Blank-pad `record` to `reclen`, then fill every column the schema
    /// names from `result`'s row `row`, and capture the OID (spec §4.D
    /// "On exactly one returned row").
    fn fill_record_from_result(
        &mut self,
        handle: usize,
        result: &QueryResult,
        row: usize,
        record: &mut [u8],
    ) -> Result<()> {
        let schema_name = self.ctx(handle)?.current_schema.clone();
        let schema = self
            .schemas
            .get(&schema_name)
            .ok_or(IsamError::NoSchemaDefinition)?;

        let blanked = codec::blank_record(schema.reclen);
        let len = blanked.len().min(record.len());
        record[..len].copy_from_slice(&blanked[..len]);

        for column in &schema.columns {
            let Some(col_idx) = result.field_index(&column.name) else {
                continue;
            };
            let Some(text) = result.value(row, col_idx) else {
                continue;
            };
            let value = text_to_value(column.datatype, text);
            codec::write_value(
                column.datatype,
                column.startpos,
                column.length,
                column.codelength,
                &value,
                record,
            )
            .map_err(|error| IsamError::Backend(error.to_string()))?;
        }

        let oid = result.oid(row);
        self.ctx_mut(handle)?.last_oid = oid;
        Ok(())
    }

    /// Rewrite-current (`isrewrite`/`isrewcurr`): UPDATE the row last read
    /// on this handle's cursor.
    pub fn rewrite_current(&mut self, handle: usize, record: &[u8]) -> Result<()> {
        let (schema_name, cursor_open, last_oid) = {
            let ctx = self.ctx(handle)?;
            (
                ctx.current_schema.clone(),
                ctx.cursor_name.is_some(),
                ctx.last_oid.clone(),
            )
        };
        if !cursor_open {
            return Err(IsamError::NoCurrentRecord);
        }
        let last_oid = last_oid.ok_or(IsamError::NoCurrentRecord)?;
        let schema = self
            .schemas
            .get(&schema_name)
            .ok_or(IsamError::NoSchemaDefinition)?
            .clone();
        let values = extract_all(&schema, record)?;
        let sql = builder::build_update(&schema, &values, &last_oid);

        let conn = self.conn.as_mut().ok_or(IsamError::FileNotOpen)?;
        conn.exec(&sql)
            .ok_or_else(|| IsamError::Backend("UPDATE failed".to_string()))?;
        self.last_sql = Some(sql);
        Ok(())
    }

    /// `isdelcurr(handle)`: re-derive the cursor's current OID with a
    /// zero-row fetch (guards against drift), then delete it.
    pub fn delete_current(&mut self, handle: usize) -> Result<()> {
        let cursor_name = self
            .ctx(handle)?
            .cursor_name
            .clone()
            .ok_or(IsamError::NoCurrentRecord)?;

        let conn = self.conn.as_mut().ok_or(IsamError::FileNotOpen)?;
        let result = conn
            .exec(&format!("FETCH FORWARD 0 FROM {cursor_name}"))
            .ok_or(IsamError::NoCurrentRecord)?;
        let oid = result.oid(0).ok_or(IsamError::NoCurrentRecord)?;

        let schema_name = self.ctx(handle)?.current_schema.clone();
        let pgname = self
            .schemas
            .get(&schema_name)
            .ok_or(IsamError::NoSchemaDefinition)?
            .pgname
            .clone();
        let sql = format!("DELETE FROM {pgname} WHERE oid='{oid}'");

        let conn = self.conn.as_mut().ok_or(IsamError::FileNotOpen)?;
        conn.exec(&sql)
            .ok_or_else(|| IsamError::Backend("DELETE failed".to_string()))?;
        self.last_sql = Some(sql);
        Ok(())
    }

    /// `isdelete(handle, record)`: delete every row matching every
    /// column `record` has a value for. No cursor required.
    pub fn delete(&mut self, handle: usize, record: &[u8]) -> Result<()> {
        let schema_name = self.ctx(handle)?.current_schema.clone();
        let schema = self
            .schemas
            .get(&schema_name)
            .ok_or(IsamError::NoSchemaDefinition)?
            .clone();
        let values = extract_all(&schema, record)?;
        let where_clause =
            builder::build_equality_where(&schema, &values).ok_or(IsamError::IllegalArgument)?;
        let sql = format!("DELETE FROM {} WHERE {where_clause}", schema.pgname);

        let conn = self.conn.as_mut().ok_or(IsamError::FileNotOpen)?;
        conn.exec(&sql)
            .ok_or_else(|| IsamError::Backend("DELETE failed".to_string()))?;
        self.last_sql = Some(sql);
        Ok(())
    }

    /// `iswrite`/`iswrcurr`: codec-extract from `record`, then INSERT.
    pub fn write(&mut self, handle: usize, record: &[u8]) -> Result<()> {
        let schema_name = self.ctx(handle)?.current_schema.clone();
        let schema = self
            .schemas
            .get(&schema_name)
            .ok_or(IsamError::NoSchemaDefinition)?
            .clone();
        let values = extract_all(&schema, record)?;
        let sql = builder::build_insert(&schema, &values);

        let conn = self.conn.as_mut().ok_or(IsamError::FileNotOpen)?;
        conn.exec(&sql).ok_or(IsamError::DuplicateRecord)?;
        self.last_sql = Some(sql);
        Ok(())
    }

    /// `finish(handle)`: close the cursor if any, keep the context.
    pub fn finish(&mut self, handle: usize) -> Result<()> {
        let cursor_name = self.ctx_mut(handle)?.cursor_name.take();
        if let Some(cursor) = cursor_name {
            let conn = self.conn.as_mut().ok_or(IsamError::FileNotOpen)?;
            conn.exec(&format!("CLOSE {cursor}"));
        }
        Ok(())
    }

    /// `isclose(handle)`: close the cursor, drop the context, free the
    /// handle back to the pool.
    pub fn close(&mut self, handle: usize) -> Result<()> {
        let cursor_name = self.ctx(handle)?.cursor_name.clone();
        if let Some(cursor) = cursor_name {
            let conn = self.conn.as_mut().ok_or(IsamError::FileNotOpen)?;
            conn.exec(&format!("CLOSE {cursor}"));
        }
        self.contexts[handle - 1] = None;
        self.handles.free(handle);
        Ok(())
    }

    pub fn begin(&mut self) -> Result<()> {
        let conn = self.conn.as_mut().ok_or(IsamError::FileNotOpen)?;
        if conn.begin() {
            Ok(())
        } else {
            Err(IsamError::Backend("BEGIN failed".to_string()))
        }
    }

    /// `iscommit()`: commit, then close every `trans_cursor` cursor the
    /// backend auto-closed at transaction end (spec §4.D).
    pub fn commit(&mut self) -> Result<()> {
        {
            let conn = self.conn.as_mut().ok_or(IsamError::FileNotOpen)?;
            if !conn.in_transaction {
                return Err(IsamError::NoBeginWorkYet);
            }
            if !conn.commit() {
                return Err(IsamError::Backend("COMMIT failed".to_string()));
            }
        }
        self.close_transactional_cursors();
        Ok(())
    }

    pub fn rollback(&mut self) -> Result<()> {
        {
            let conn = self.conn.as_mut().ok_or(IsamError::FileNotOpen)?;
            if !conn.in_transaction {
                return Err(IsamError::NoBeginWorkYet);
            }
            if !conn.rollback() {
                return Err(IsamError::Backend("ROLLBACK failed".to_string()));
            }
        }
        self.close_transactional_cursors();
        Ok(())
    }

    fn close_transactional_cursors(&mut self) {
        for ctx in self.contexts.iter_mut().flatten() {
            if ctx.trans_cursor && ctx.cursor_name.is_some() {
                ctx.cursor_name = None;
                ctx.trans_cursor = false;
            }
        }
    }
}

fn fetch_sql_for(cursor: &str, direction: FetchDirection) -> String {
    match direction {
        FetchDirection::First => format!("FETCH FIRST FROM {cursor}"),
        FetchDirection::Last => format!("FETCH LAST FROM {cursor}"),
        FetchDirection::Backward1 => format!("FETCH BACKWARD 1 FROM {cursor}"),
        FetchDirection::Forward1 => format!("FETCH FORWARD 1 FROM {cursor}"),
    }
}

fn extract_all(schema: &Schema, record: &[u8]) -> Result<Vec<(String, ColumnValue)>> {
    schema
        .columns
        .iter()
        .filter(|c| !c.is_phantom)
        .map(|c| {
            let value = codec::extract_value(c.datatype, c.startpos, c.length, c.codelength, record)
                .map_err(|error| IsamError::Backend(error.to_string()))?;
            Ok((c.name.clone(), value))
        })
        .collect()
}

/// Parse one of `simple_query`'s text-rendered values back into a typed
/// [`ColumnValue`], the inverse of `schema::builder`'s literal rendering.
fn text_to_value(datatype: DataType, text: &str) -> ColumnValue {
    match datatype {
        DataType::Boolean => ColumnValue::Boolean(Some(text == "t")),
        DataType::Integer => text
            .parse()
            .map(ColumnValue::Integer)
            .unwrap_or(ColumnValue::Unset),
        DataType::Decimal => ColumnValue::Decimal(text.to_string()),
        DataType::Binary => ColumnValue::Binary(decode_bytea(text)),
        DataType::Char | DataType::Code | DataType::CodeBlank => ColumnValue::Text(text.to_string()),
    }
}

/// Decode Postgres's default `bytea` hex output (`\x0102...`).
fn decode_bytea(text: &str) -> Vec<u8> {
    let hex = text.strip_prefix("\\x").unwrap_or(text);
    let bytes = hex.as_bytes();
    let mut out = Vec::with_capacity(bytes.len() / 2);
    let mut i = 0;
    while i + 1 < bytes.len() {
        if let Ok(b) = u8::from_str_radix(&hex[i..i + 2], 16) {
            out.push(b);
        }
        i += 2;
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pgisam_options_parses_known_tokens() {
        let options = PgIsamOptions::parse(Some("printonly,sql"));
        assert!(options.print_only);
        assert!(options.sql_trace);
    }

    #[test]
    fn pgisam_options_defaults_are_off() {
        let options = PgIsamOptions::parse(None);
        assert!(!options.print_only);
        assert!(!options.sql_trace);
    }

    #[test]
    fn bytea_hex_round_trips() {
        assert_eq!(decode_bytea("\\x0102ff"), vec![0x01, 0x02, 0xff]);
    }

    #[test]
    fn integer_text_parses() {
        assert_eq!(
            text_to_value(DataType::Integer, "-17"),
            ColumnValue::Integer(-17)
        );
    }

    #[test]
    fn boolean_text_false_is_f() {
        assert_eq!(
            text_to_value(DataType::Boolean, "f"),
            ColumnValue::Boolean(Some(false))
        );
    }
}
