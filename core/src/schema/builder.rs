//! SQL string builders (spec §4.B DDL/INSERT/UPDATE emission). A typed
//! builder per statement kind, escaping values at this boundary rather
//! than wherever they happen to be produced (spec §9 design note).

use super::Schema;
use crate::datatype::DataType;
use crate::value::ColumnValue;

/// `CREATE [TEMP] TABLE <pgname> ( oid SERIAL UNIQUE PRIMARY KEY, phantom
/// BOOLEAN NOT NULL DEFAULT false, <col> <type>[ params], … ) WITHOUT OIDS`.
pub fn build_create_table(schema: &Schema) -> String {
    let temp = if schema.force_temp { "TEMP " } else { "" };

    let mut columns = vec![
        "oid SERIAL UNIQUE PRIMARY KEY".to_string(),
        "phantom BOOLEAN NOT NULL DEFAULT false".to_string(),
    ];
    for column in &schema.columns {
        let mut definition = format!(
            "{} {}",
            column.name,
            column.datatype.ddl_type(column.length, column.codelength)
        );
        if let Some(params) = &column.params {
            definition.push(' ');
            definition.push_str(params);
        }
        columns.push(definition);
    }

    format!(
        "CREATE {temp}TABLE {} ( {} ) WITHOUT OIDS",
        schema.pgname,
        columns.join(", ")
    )
}

/// Modifier statements to run, in file order, right after `CREATE TABLE`.
pub fn build_modifiers(schema: &Schema) -> Vec<String> {
    schema.modifiers.iter().map(|m| m.0.clone()).collect()
}

/// `CREATE [UNIQUE] INDEX <name> ON <pgname> ( col,col,… )`, one per index.
pub fn build_indexes(schema: &Schema) -> Vec<String> {
    schema
        .indexes
        .iter()
        .map(|index| {
            let unique = if index.is_unique { "UNIQUE " } else { "" };
            let columns: Vec<&str> = index.columns.iter().map(|c| c.name.as_str()).collect();
            format!(
                "CREATE {unique}INDEX {} ON {} ( {} )",
                index.name,
                schema.pgname,
                columns.join(", ")
            )
        })
        .collect()
}

/// `INSERT INTO <pgname> ( col,… ) VALUES ( v,… )`. Columns with no value
/// are omitted entirely, except an unset BOOLEAN which is always present
/// as an explicit `null` (spec §4.B INSERT emission).
pub fn build_insert(schema: &Schema, values: &[(String, ColumnValue)]) -> String {
    let mut columns = Vec::new();
    let mut literals = Vec::new();

    for column in schema.columns.iter().filter(|c| !c.is_phantom) {
        let value = value_for(values, &column.name);
        if let Some(literal) = sql_literal(column.datatype, value) {
            columns.push(column.name.as_str());
            literals.push(literal);
        }
    }

    format!(
        "INSERT INTO {} ( {} ) VALUES ( {} )",
        schema.pgname,
        columns.join(", "),
        literals.join(", ")
    )
}

/// `UPDATE <pgname> SET <col>=<v>, … WHERE oid='<last_oid>'`, used for
/// rewrite-current (spec §4.B UPDATE emission).
pub fn build_update(schema: &Schema, values: &[(String, ColumnValue)], last_oid: &str) -> String {
    let assignments: Vec<String> = schema
        .columns
        .iter()
        .filter(|c| !c.is_phantom)
        .filter_map(|column| {
            let value = value_for(values, &column.name);
            sql_literal(column.datatype, value).map(|literal| format!("{}={literal}", column.name))
        })
        .collect();

    format!(
        "UPDATE {} SET {} WHERE oid='{last_oid}'",
        schema.pgname,
        assignments.join(", ")
    )
}

/// `col=v AND col=v …` built from every column that has a value, used by
/// unconditional `delete(record)` (spec §4.D).
pub fn build_equality_where(schema: &Schema, values: &[(String, ColumnValue)]) -> Option<String> {
    let clauses: Vec<String> = schema
        .columns
        .iter()
        .filter(|c| !c.is_phantom)
        .filter_map(|column| {
            let value = value_for(values, &column.name);
            sql_literal(column.datatype, value).map(|literal| format!("{}={literal}", column.name))
        })
        .collect();

    if clauses.is_empty() {
        None
    } else {
        Some(clauses.join(" AND "))
    }
}

fn value_for<'a>(values: &'a [(String, ColumnValue)], name: &str) -> &'a ColumnValue {
    static UNSET: ColumnValue = ColumnValue::Unset;
    values
        .iter()
        .find(|(n, _)| n == name)
        .map(|(_, v)| v)
        .unwrap_or(&UNSET)
}

/// Render a value the way `start`'s WHERE-clause construction needs
/// (spec §4.D), reusing the same literal rules as INSERT/UPDATE.
pub fn literal_for_filter(datatype: DataType, value: &ColumnValue) -> Option<String> {
    sql_literal(datatype, value)
}

/// Render one value to its SQL literal, or `None` when the column should
/// be omitted from the statement entirely.
fn sql_literal(datatype: DataType, value: &ColumnValue) -> Option<String> {
    match value {
        ColumnValue::Unset => {
            if datatype == DataType::Boolean {
                Some("null".to_string())
            } else {
                None
            }
        }
        ColumnValue::Boolean(None) => Some("null".to_string()),
        ColumnValue::Boolean(Some(b)) => Some(format!("E'{}'", if *b { "true" } else { "false" })),
        ColumnValue::Decimal(ascii) => Some(ascii.clone()),
        ColumnValue::Text(text) => Some(format!("E'{}'", escape_text(text))),
        ColumnValue::Integer(n) => Some(format!("E'{n}'")),
        ColumnValue::Binary(bytes) => Some(format!("E'{}'", escape_bytes(bytes))),
    }
}

fn escape_text(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '\'' => out.push_str("\\'"),
            '\\' => out.push_str("\\\\"),
            _ => out.push(c),
        }
    }
    out
}

fn escape_bytes(bytes: &[u8]) -> String {
    let mut out = String::with_capacity(bytes.len());
    for &b in bytes {
        match b {
            b'\'' => out.push_str("\\'"),
            b'\\' => out.push_str("\\\\\\\\"),
            0x20..=0x7e => out.push(b as char),
            _ => out.push_str(&format!("\\\\{b:03o}")),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::datatype::DataType;
    use crate::schema::{Column, Index, Modifier};

    fn acct_schema() -> Schema {
        Schema {
            name: "acct".to_string(),
            pgname: "acct_acct".to_string(),
            reclen: 20,
            columns: vec![
                Column::new("id", 0, 5, DataType::Code, Some(5), None, false),
                Column::new("name", 5, 15, DataType::Char, None, None, false),
            ],
            modifiers: vec![Modifier("ALTER TABLE acct_acct OWNER TO app".to_string())],
            indexes: vec![Index {
                name: "pk".to_string(),
                is_unique: true,
                num: 1,
                columns: vec![Column::new("id", 0, 5, DataType::Code, Some(5), None, false)],
            }],
            nocreate: false,
            is_convertible: false,
            is_pivotable: false,
            force_temp: false,
        }
    }

    #[test]
    fn create_table_lists_oid_and_phantom_first() {
        let sql = build_create_table(&acct_schema());
        assert!(sql.starts_with("CREATE TABLE acct_acct ( oid SERIAL UNIQUE PRIMARY KEY, phantom BOOLEAN NOT NULL DEFAULT false"));
        assert!(sql.contains("id CHAR(5)"));
        assert!(sql.contains("name VARCHAR(15)"));
        assert!(sql.ends_with(") WITHOUT OIDS"));
    }

    #[test]
    fn rptmp_table_is_created_temp() {
        let mut schema = acct_schema();
        schema.force_temp = true;
        assert!(build_create_table(&schema).starts_with("CREATE TEMP TABLE"));
    }

    #[test]
    fn indexes_render_unique() {
        let sql = &build_indexes(&acct_schema())[0];
        assert_eq!(sql, "CREATE UNIQUE INDEX pk ON acct_acct ( id )");
    }

    #[test]
    fn insert_omits_unset_columns() {
        let values = vec![("id".to_string(), ColumnValue::Text("00042".to_string()))];
        let sql = build_insert(&acct_schema(), &values);
        assert_eq!(sql, "INSERT INTO acct_acct ( id ) VALUES ( E'00042' )");
    }

    #[test]
    fn insert_renders_unset_boolean_as_null() {
        let schema = Schema {
            columns: vec![Column::new(
                "flag",
                0,
                1,
                DataType::Boolean,
                None,
                None,
                false,
            )],
            ..acct_schema()
        };
        let sql = build_insert(&schema, &[]);
        assert_eq!(sql, "INSERT INTO acct_acct ( flag ) VALUES ( null )");
    }

    #[test]
    fn update_targets_last_oid() {
        let values = vec![("name".to_string(), ColumnValue::Text("Bob".to_string()))];
        let sql = build_update(&acct_schema(), &values, "17");
        assert_eq!(sql, "UPDATE acct_acct SET name=E'Bob' WHERE oid='17'");
    }

    #[test]
    fn text_values_escape_quotes() {
        let values = vec![("name".to_string(), ColumnValue::Text("O'Brien".to_string()))];
        let sql = build_insert(&acct_schema(), &values);
        assert!(sql.contains("E'O\\'Brien'"));
    }
}
