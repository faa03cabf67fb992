//! `.def` file grammar (spec §4.B): one logical line per table directive
//! or column, `#`/blank/CR-only lines skipped.

use super::{normalize_definition_name, Column, Index, Modifier, Schema};
use crate::datatype::DataType;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum DefParseError {
    #[error("malformed column line: {0:?}")]
    MalformedColumn(String),
    #[error("index {0:?} references unknown column {1:?}")]
    UnknownIndexColumn(String, String),
    #[error("definition is missing a reclen= directive")]
    MissingReclen,
}

struct IndexSpec {
    name: String,
    column_names: Vec<String>,
    is_unique: bool,
}

/// Parse the text of one `.def` file into a [`Schema`]. `raw_name` is the
/// file's base name (before the `rptmp`/`*` normalisation spec §4.B
/// applies to the registry key).
pub fn parse_definition(raw_name: &str, text: &str) -> Result<Schema, DefParseError> {
    let (name, is_convertible, force_temp) = normalize_definition_name(raw_name);

    let mut reclen: Option<usize> = None;
    let mut pgname: Option<String> = None;
    let mut prefix = String::new();
    let mut nocreate = false;
    let mut modifiers = Vec::new();
    let mut index_specs = Vec::new();
    let mut columns: Vec<Column> = Vec::new();

    let mut next_startpos = 0usize;
    let mut pending_ignore = 0usize;

    for raw_line in text.lines() {
        let line = raw_line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        if let Some(value) = line.strip_prefix("reclen=") {
            reclen = value.trim().parse().ok();
            continue;
        }
        if let Some(value) = line.strip_prefix("pgname=") {
            pgname = Some(value.trim().to_string());
            continue;
        }
        if let Some(value) = line.strip_prefix("prefix=") {
            prefix = value.trim().to_string();
            continue;
        }
        if line == "nocreate" {
            nocreate = true;
            continue;
        }
        if let Some(value) = line.strip_prefix("modify=") {
            modifiers.push(value.to_string());
            continue;
        }
        if let Some(rest) = line.strip_prefix("index ") {
            index_specs.push(parse_index_line(rest)?);
            continue;
        }

        let (is_phantom, rest) = match line.strip_prefix("phantom ") {
            Some(rest) => (true, rest),
            None => (false, line),
        };

        let (field_text, params) = split_params(rest);
        let fields: Vec<&str> = field_text.split(':').collect();
        if fields.len() < 3 {
            return Err(DefParseError::MalformedColumn(raw_line.to_string()));
        }

        let col_name = fields[0].trim();
        if col_name == "IGNORE" {
            let length: usize = fields[2]
                .trim()
                .parse()
                .map_err(|_| DefParseError::MalformedColumn(raw_line.to_string()))?;
            pending_ignore += length;
            continue;
        }

        let startpos = if fields[1].trim().is_empty() {
            next_startpos + pending_ignore
        } else {
            fields[1]
                .trim()
                .parse()
                .map_err(|_| DefParseError::MalformedColumn(raw_line.to_string()))?
        };
        pending_ignore = 0;

        let length: usize = fields[2]
            .trim()
            .parse()
            .map_err(|_| DefParseError::MalformedColumn(raw_line.to_string()))?;
        let datatype = DataType::from_token(fields.get(3).copied().unwrap_or("").trim());
        let codelength = fields
            .get(4)
            .map(|s| s.trim())
            .filter(|s| !s.is_empty())
            .and_then(|s| s.parse().ok());

        next_startpos = startpos + length;

        columns.push(Column::new(
            col_name,
            startpos,
            length,
            datatype,
            codelength,
            params.clone(),
            is_phantom,
        ));
    }

    let reclen = reclen.ok_or(DefParseError::MissingReclen)?;

    let mut indexes = Vec::with_capacity(index_specs.len());
    for (num, spec) in index_specs.into_iter().enumerate() {
        let mut index_columns = Vec::with_capacity(spec.column_names.len());
        for col_name in &spec.column_names {
            let column = columns
                .iter()
                .find(|c| &c.name == col_name)
                .ok_or_else(|| {
                    DefParseError::UnknownIndexColumn(spec.name.clone(), col_name.clone())
                })?;
            index_columns.push(column.clone());
        }
        indexes.push(Index {
            name: spec.name,
            is_unique: spec.is_unique,
            num: num + 1,
            columns: index_columns,
        });
    }

    let resolved_pgname = pgname.unwrap_or_else(|| {
        let base = format!("{prefix}{name}");
        if is_convertible {
            format!("{base}_conv")
        } else {
            base
        }
    });

    Ok(Schema {
        is_pivotable: name == "tables",
        name,
        pgname: resolved_pgname,
        reclen,
        columns,
        modifiers: modifiers.into_iter().map(Modifier).collect(),
        indexes,
        nocreate,
        is_convertible,
        force_temp,
    })
}

fn split_params(rest: &str) -> (&str, Option<String>) {
    match rest.rfind('[') {
        Some(open) if rest.ends_with(']') => (&rest[..open], Some(rest[open + 1..rest.len() - 1].to_string())),
        _ => (rest, None),
    }
}

fn parse_index_line(rest: &str) -> Result<IndexSpec, DefParseError> {
    let (spec_text, modifier) = split_params(rest);
    let mut parts = spec_text.splitn(2, '=');
    let name = parts
        .next()
        .ok_or_else(|| DefParseError::MalformedColumn(rest.to_string()))?
        .trim()
        .to_string();
    let column_list = parts
        .next()
        .ok_or_else(|| DefParseError::MalformedColumn(rest.to_string()))?;
    let column_names = column_list
        .split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect();
    let is_unique = modifier
        .map(|m| m.eq_ignore_ascii_case("unique"))
        .unwrap_or(false);

    Ok(IndexSpec {
        name,
        column_names,
        is_unique,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const ACCT_DEF: &str = "
        # account master
        reclen=20
        prefix=acct_
        id:0:5:code:5
        name:5:15
        index pk=id[UNIQUE]
    ";

    #[test]
    fn parses_seed_schema() {
        let schema = parse_definition("acct", ACCT_DEF).unwrap();
        assert_eq!(schema.reclen, 20);
        assert_eq!(schema.pgname, "acct_acct");
        assert_eq!(schema.columns.len(), 2);
        assert_eq!(schema.columns[1].name, "name");
        assert_eq!(schema.columns[1].startpos, 5);
        assert_eq!(schema.columns[1].datatype, DataType::Char);
        assert_eq!(schema.indexes.len(), 1);
        assert!(schema.indexes[0].is_unique);
        assert_eq!(schema.indexes[0].num, 1);
    }

    #[test]
    fn ignore_pseudo_column_advances_startpos_without_materialising() {
        let def = "reclen=10\nid:0:4:integer\nIGNORE::2\nflag::1:boolean\n";
        let schema = parse_definition("widget", def).unwrap();
        assert_eq!(schema.columns.len(), 2);
        assert_eq!(schema.columns[1].name, "flag");
        assert_eq!(schema.columns[1].startpos, 6);
    }

    #[test]
    fn rptmp_definition_forces_temp_and_shared_name() {
        let def = "reclen=4\ncol:0:4\n";
        let schema = parse_definition("rptmp_scratch", def).unwrap();
        assert_eq!(schema.name, "rptmp");
        assert!(schema.force_temp);
    }

    #[test]
    fn convertible_marker_adds_conv_suffix() {
        let def = "reclen=4\nprefix=led_\ncol:0:4\n";
        let schema = parse_definition("ledger*", def).unwrap();
        assert!(schema.is_convertible);
        assert_eq!(schema.pgname, "led_ledger_conv");
    }

    #[test]
    fn phantom_column_is_flagged() {
        let def = "reclen=4\nphantom note:0:4\n";
        let schema = parse_definition("widget", def).unwrap();
        assert!(schema.columns[0].is_phantom);
    }

    #[test]
    fn unknown_index_column_is_rejected() {
        let def = "reclen=4\ncol:0:4\nindex pk=missing\n";
        assert!(matches!(
            parse_definition("widget", def),
            Err(DefParseError::UnknownIndexColumn(_, _))
        ));
    }
}
