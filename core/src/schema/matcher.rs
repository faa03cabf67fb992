//! Index-to-keydesc matching (spec §4.B "Index-to-keydesc matching").

use super::{Index, Schema};

/// One `(start, length)` part of a legacy keydesc.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct KeyPart {
    pub start: usize,
    pub length: usize,
}

/// Find the schema index that matches `parts`, or `None` if no index
/// does ("illegal key descriptor" at the call site).
pub fn match_index<'a>(schema: &'a Schema, parts: &[KeyPart]) -> Option<&'a Index> {
    schema.indexes.iter().find(|index| index_matches(index, parts))
}

fn index_matches(index: &Index, parts: &[KeyPart]) -> bool {
    if index.columns.is_empty() || parts.is_empty() {
        return false;
    }
    if index.columns[0].startpos != parts[0].start {
        return false;
    }

    let mut part_idx = 0usize;
    for column in &index.columns {
        let eff_len = column.datatype.key_match_length(column.length);
        let col_end = column.startpos + eff_len;
        loop {
            let Some(part) = parts.get(part_idx) else {
                return false;
            };
            let part_end = part.start + part.length;
            if column.startpos >= part.start && col_end <= part_end {
                break;
            }
            part_idx += 1;
        }
    }

    part_idx == parts.len() - 1
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::datatype::DataType;
    use crate::schema::Column;

    fn schema_with_index(columns: Vec<Column>) -> Schema {
        Schema {
            name: "acct".to_string(),
            pgname: "acct".to_string(),
            reclen: 20,
            indexes: vec![Index {
                name: "pk".to_string(),
                is_unique: true,
                num: 1,
                columns,
            }],
            columns: Vec::new(),
            modifiers: Vec::new(),
            nocreate: false,
            is_convertible: false,
            is_pivotable: false,
            force_temp: false,
        }
    }

    #[test]
    fn single_part_matches_single_column_index() {
        let col = Column::new("id", 0, 5, DataType::Code, Some(5), None, false);
        let schema = schema_with_index(vec![col]);
        let parts = [KeyPart { start: 0, length: 5 }];
        assert!(match_index(&schema, &parts).is_some());
    }

    #[test]
    fn mismatched_start_fails() {
        let col = Column::new("id", 5, 5, DataType::Code, Some(5), None, false);
        let schema = schema_with_index(vec![col]);
        let parts = [KeyPart { start: 0, length: 5 }];
        assert!(match_index(&schema, &parts).is_none());
    }

    #[test]
    fn integer_column_uses_two_byte_effective_length() {
        let col = Column::new("seq", 0, 4, DataType::Integer, None, None, false);
        let schema = schema_with_index(vec![col]);
        // a 2-byte keydesc part is still a legal match for a 4-byte INTEGER column
        let parts = [KeyPart { start: 0, length: 2 }];
        assert!(match_index(&schema, &parts).is_some());
    }

    #[test]
    fn multiple_columns_spanning_multiple_parts() {
        let first = Column::new("id", 0, 5, DataType::Code, Some(5), None, false);
        let second = Column::new("seq", 5, 4, DataType::Integer, None, None, false);
        let schema = schema_with_index(vec![first, second]);
        let parts = [
            KeyPart { start: 0, length: 5 },
            KeyPart { start: 5, length: 2 },
        ];
        assert!(match_index(&schema, &parts).is_some());
    }

    #[test]
    fn leftover_uncovered_part_fails() {
        let col = Column::new("id", 0, 5, DataType::Code, Some(5), None, false);
        let schema = schema_with_index(vec![col]);
        let parts = [
            KeyPart { start: 0, length: 5 },
            KeyPart { start: 5, length: 2 },
        ];
        assert!(match_index(&schema, &parts).is_none());
    }
}
