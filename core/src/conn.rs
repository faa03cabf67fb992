//! Connection & result wrapper (component C). Built on the synchronous
//! `postgres` client's simple-query protocol, which — like the `libpq`
//! surface the original bridge used — returns every column as text
//! regardless of its backend type, matching the minimal "execute string,
//! get rows, free result" surface the spec assumes.

use logger::Logger;
use postgres::{Client, NoTls, SimpleQueryMessage};

/// One row of `conn.def`: `host,port,database,schema,username,password`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ConnDefRow {
    pub host: String,
    pub port: String,
    pub database: String,
    pub schema: String,
    pub username: String,
    pub password: String,
}

impl ConnDefRow {
    /// Parse `conn.def`'s text and return the row keyed by `edata`, the
    /// value of the `EDATA` environment variable (spec §4.C). Each line
    /// is `<key>=<host>,<port>,<database>,<schema>,<username>,<password>`.
    pub fn lookup(text: &str, edata: &str) -> Option<ConnDefRow> {
        text.lines().find_map(|line| {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                return None;
            }
            let (key, rest) = line.split_once('=')?;
            if key.trim() != edata {
                return None;
            }
            Self::parse_fields(rest)
        })
    }

    fn parse_fields(rest: &str) -> Option<ConnDefRow> {
        let fields: Vec<&str> = rest.split(',').map(str::trim).collect();
        if fields.len() < 6 {
            return None;
        }
        Some(ConnDefRow {
            host: fields[0].to_string(),
            port: fields[1].to_string(),
            database: fields[2].to_string(),
            schema: fields[3].to_string(),
            username: fields[4].to_string(),
            password: fields[5].to_string(),
        })
    }

    pub fn connstr(&self) -> String {
        format!(
            "host={} port={} dbname={} user={} password={}",
            self.host, self.port, self.database, self.username, self.password
        )
    }
}

/// A backend connection plus the transaction flag the context machine
/// reads to decide `WITH HOLD` vs `WITHOUT HOLD` (spec §4.D).
pub struct Conn {
    client: Client,
    pub in_transaction: bool,
    /// "print-only" mode (spec §4.C): `exec` prints SQL to stdout and
    /// returns `None` without touching the backend. Used by the schema
    /// dump tool.
    pub print_only: bool,
}

impl Conn {
    /// Connect using `row`'s connection string, then `SET search_path TO
    /// <row.schema>`. Either step failing yields `None`.
    pub fn open(row: &ConnDefRow) -> Option<Conn> {
        let mut client = Client::connect(&row.connstr(), NoTls).ok()?;
        client
            .simple_query(&format!("SET search_path TO {}", row.schema))
            .ok()?;
        Some(Conn {
            client,
            in_transaction: false,
            print_only: false,
        })
    }

    pub fn begin(&mut self) -> bool {
        let ok = self.exec_control("BEGIN");
        self.in_transaction = ok;
        ok
    }

    pub fn commit(&mut self) -> bool {
        let ok = self.exec_control("COMMIT");
        self.in_transaction = false;
        ok
    }

    pub fn rollback(&mut self) -> bool {
        let ok = self.exec_control("ROLLBACK");
        self.in_transaction = false;
        ok
    }

    fn exec_control(&mut self, sql: &str) -> bool {
        if self.print_only {
            return true;
        }
        self.client.simple_query(sql).is_ok()
    }

    /// Execute `sql` and collect every returned row. Returns `None` on
    /// backend failure, or immediately (without touching the backend)
    /// when `print_only` is set.
    pub fn exec(&mut self, sql: &str) -> Option<QueryResult> {
        if Logger::sql_trace_enabled() {
            log::debug!("SQL {sql}");
        }
        if self.print_only {
            println!("{sql}");
            return None;
        }
        let messages = self.client.simple_query(sql).ok()?;
        Some(QueryResult::from_messages(messages))
    }
}

/// A query's rows, every value already rendered as text by the backend.
#[derive(Debug, Default)]
pub struct QueryResult {
    columns: Vec<String>,
    rows: Vec<Vec<Option<String>>>,
}

impl QueryResult {
    fn from_messages(messages: Vec<SimpleQueryMessage>) -> Self {
        let mut columns = Vec::new();
        let mut rows = Vec::new();
        for message in messages {
            if let SimpleQueryMessage::Row(row) = message {
                if columns.is_empty() {
                    columns = row.columns().iter().map(|c| c.name().to_string()).collect();
                }
                rows.push((0..row.len()).map(|i| row.get(i).map(str::to_string)).collect());
            }
        }
        QueryResult { columns, rows }
    }

    pub fn rows(&self) -> usize {
        self.rows.len()
    }

    pub fn fields(&self) -> usize {
        self.columns.len()
    }

    pub fn field_name(&self, index: usize) -> Option<&str> {
        self.columns.get(index).map(String::as_str)
    }

    pub fn field_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    pub fn value(&self, row: usize, col: usize) -> Option<&str> {
        self.rows.get(row)?.get(col)?.as_deref()
    }

    /// Convenience accessor for the `oid` column of `row`, used to anchor
    /// the context's "current record" after a fetch (spec §4.D).
    pub fn oid(&self, row: usize) -> Option<String> {
        let index = self.field_index("oid")?;
        self.value(row, index).map(str::to_string)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn conn_def_lookup_matches_key() {
        let text = "\
# comment
dev=localhost,5432,appdb,public,app,secret
prod=db.internal,5432,appdb,public,app,secret
";
        let row = ConnDefRow::lookup(text, "prod").unwrap();
        assert_eq!(row.host, "db.internal");
        assert_eq!(row.database, "appdb");
    }

    #[test]
    fn conn_def_lookup_missing_key_is_none() {
        let text = "dev=localhost,5432,appdb,public,app,secret\n";
        assert!(ConnDefRow::lookup(text, "missing").is_none());
    }

    #[test]
    fn connstr_has_libpq_keywords() {
        let row = ConnDefRow {
            host: "localhost".to_string(),
            port: "5432".to_string(),
            database: "appdb".to_string(),
            schema: "public".to_string(),
            username: "app".to_string(),
            password: "secret".to_string(),
        };
        assert_eq!(
            row.connstr(),
            "host=localhost port=5432 dbname=appdb user=app password=secret"
        );
    }

    #[test]
    fn empty_query_result_has_no_rows() {
        let result = QueryResult::default();
        assert_eq!(result.rows(), 0);
        assert_eq!(result.fields(), 0);
        assert!(result.value(0, 0).is_none());
    }
}
