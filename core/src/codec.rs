//! The record codec (component A): marshals a fixed-width, blank-padded
//! byte record to and from typed [`ColumnValue`]s, one column at a time.
//! Deliberately decoupled from the schema registry — it knows nothing
//! about `.def` files or column lists, only the four numbers (`datatype`,
//! `startpos`, `length`, `codelength`) a schema column carries. Backend
//! string escaping is *not* done here (spec §9 design note: "escape
//! values at the builder boundary"); that happens in `schema::builder`.

use crate::datatype::{DataType, INTEGER_STORAGE_WIDTH};
use crate::decimal;
use crate::value::ColumnValue;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CodecError {
    #[error("value does not fit column: {0}")]
    DataMismatch(String),
    #[error("malformed value for column: {0}")]
    BadValue(String),
}

/// A fresh, blank-padded record buffer of `reclen` bytes.
pub fn blank_record(reclen: usize) -> Vec<u8> {
    vec![b' '; reclen]
}

/// Extract one column's value out of `record` (spec §4.A "Read side").
pub fn extract_value(
    datatype: DataType,
    startpos: usize,
    length: usize,
    codelength: Option<usize>,
    record: &[u8],
) -> Result<ColumnValue, CodecError> {
    let slice = record.get(startpos..startpos + length).ok_or_else(|| {
        CodecError::BadValue(format!(
            "column at {startpos}..{} exceeds record of {} bytes",
            startpos + length,
            record.len()
        ))
    })?;
    let all_blank = slice.iter().all(|&b| b == b' ');

    if all_blank {
        return Ok(match datatype {
            DataType::Boolean => ColumnValue::Boolean(None),
            DataType::CodeBlank => ColumnValue::Text(" ".repeat(length)),
            _ => ColumnValue::Unset,
        });
    }

    match datatype {
        DataType::Decimal => Ok(match decimal::unpack_decimal(slice) {
            Some(ascii) => ColumnValue::Decimal(ascii),
            None => ColumnValue::Unset,
        }),
        DataType::Integer => {
            let width = INTEGER_STORAGE_WIDTH.min(length);
            let mut bytes = [0u8; 4];
            bytes[..width].copy_from_slice(&slice[..width]);
            Ok(ColumnValue::Integer(i32::from_le_bytes(bytes)))
        }
        DataType::Binary => Ok(ColumnValue::Binary(slice.to_vec())),
        DataType::Boolean => Ok(ColumnValue::Boolean(match slice[0] {
            b'Y' => Some(true),
            b'N' => Some(false),
            _ => None,
        })),
        DataType::Code | DataType::CodeBlank => {
            let codelength = codelength.unwrap_or(length);
            let all_digits = slice.iter().all(|&b| b.is_ascii_digit());
            let copy_start = if all_digits {
                startpos + length - codelength
            } else {
                startpos
            };
            let copy_slice = record.get(copy_start..copy_start + codelength).ok_or_else(|| {
                CodecError::BadValue(format!("code column at {copy_start} overruns record"))
            })?;
            Ok(ColumnValue::Text(
                String::from_utf8_lossy(copy_slice).into_owned(),
            ))
        }
        DataType::Char => Ok(ColumnValue::Text(
            String::from_utf8_lossy(slice).trim_end_matches(' ').to_string(),
        )),
    }
}

/// Write one column's value into `record` (spec §4.A "Write side").
/// `record` is expected to already be blank-padded (see [`blank_record`]);
/// columns with [`ColumnValue::Unset`] are left untouched.
pub fn write_value(
    datatype: DataType,
    startpos: usize,
    length: usize,
    codelength: Option<usize>,
    value: &ColumnValue,
    record: &mut [u8],
) -> Result<(), CodecError> {
    if value.is_unset() {
        return Ok(());
    }

    match (datatype, value) {
        (DataType::Decimal, ColumnValue::Decimal(ascii)) => {
            let packed = decimal::pack_decimal(ascii, length).map_err(CodecError::DataMismatch)?;
            record[startpos..startpos + length].copy_from_slice(&packed);
        }
        (DataType::Integer, ColumnValue::Integer(n)) => {
            let bytes = n.to_le_bytes();
            let width = INTEGER_STORAGE_WIDTH.min(length);
            record[startpos..startpos + width].copy_from_slice(&bytes[..width]);
        }
        (DataType::Binary, ColumnValue::Binary(raw)) => {
            if raw.len() > length {
                return Err(CodecError::DataMismatch(format!(
                    "binary value of {} bytes exceeds column length {length}",
                    raw.len()
                )));
            }
            record[startpos..startpos + raw.len()].copy_from_slice(raw);
        }
        (DataType::Boolean, ColumnValue::Boolean(b)) => {
            record[startpos] = match b {
                Some(true) => b'Y',
                Some(false) => b'N',
                None => b' ',
            };
        }
        (DataType::Code | DataType::CodeBlank, ColumnValue::Text(text)) => {
            let codelength = codelength.unwrap_or(length);
            if text.len() > codelength {
                return Err(CodecError::DataMismatch(format!(
                    "code value {text:?} exceeds codelength {codelength}"
                )));
            }
            let all_digits = !text.is_empty() && text.bytes().all(|b| b.is_ascii_digit());
            let copy_start = if all_digits {
                startpos + length - codelength
            } else {
                startpos
            };
            record[copy_start..copy_start + text.len()].copy_from_slice(text.as_bytes());
        }
        (DataType::Char, ColumnValue::Text(text)) => {
            if text.len() > length {
                return Err(CodecError::DataMismatch(format!(
                    "value {text:?} exceeds column length {length}"
                )));
            }
            record[startpos..startpos + text.len()].copy_from_slice(text.as_bytes());
        }
        (dt, v) => {
            return Err(CodecError::BadValue(format!(
                "value {v:?} does not match column datatype {dt:?}"
            )))
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn char_round_trip_strips_trailing_blanks() {
        let mut record = blank_record(20);
        write_value(
            DataType::Char,
            5,
            15,
            None,
            &ColumnValue::Text("Alice".to_string()),
            &mut record,
        )
        .unwrap();
        let value = extract_value(DataType::Char, 5, 15, None, &record).unwrap();
        assert_eq!(value, ColumnValue::Text("Alice".to_string()));
    }

    #[test]
    fn code_all_digit_value_right_aligns() {
        let mut record = blank_record(5);
        write_value(
            DataType::Code,
            0,
            5,
            Some(5),
            &ColumnValue::Text("00042".to_string()),
            &mut record,
        )
        .unwrap();
        assert_eq!(&record, b"00042");
        let value = extract_value(DataType::Code, 0, 5, Some(5), &record).unwrap();
        assert_eq!(value, ColumnValue::Text("00042".to_string()));
    }

    #[test]
    fn integer_round_trips_negative() {
        let mut record = blank_record(4);
        write_value(
            DataType::Integer,
            0,
            4,
            None,
            &ColumnValue::Integer(-17),
            &mut record,
        )
        .unwrap();
        let value = extract_value(DataType::Integer, 0, 4, None, &record).unwrap();
        assert_eq!(value, ColumnValue::Integer(-17));
    }

    #[test]
    fn boolean_blank_is_none_not_unset() {
        let record = blank_record(1);
        let value = extract_value(DataType::Boolean, 0, 1, None, &record).unwrap();
        assert_eq!(value, ColumnValue::Boolean(None));
    }

    #[test]
    fn codeblank_blank_decodes_to_spaces() {
        let record = blank_record(4);
        let value = extract_value(DataType::CodeBlank, 0, 4, None, &record).unwrap();
        assert_eq!(value, ColumnValue::Text("    ".to_string()));
    }

    #[test]
    fn char_value_too_long_is_data_mismatch() {
        let mut record = blank_record(3);
        let err = write_value(
            DataType::Char,
            0,
            3,
            None,
            &ColumnValue::Text("toolong".to_string()),
            &mut record,
        )
        .unwrap_err();
        assert!(matches!(err, CodecError::DataMismatch(_)));
    }

    #[test]
    fn binary_value_exceeding_length_is_data_mismatch() {
        let mut record = blank_record(2);
        let err = write_value(
            DataType::Binary,
            0,
            2,
            None,
            &ColumnValue::Binary(vec![1, 2, 3]),
            &mut record,
        )
        .unwrap_err();
        assert!(matches!(err, CodecError::DataMismatch(_)));
    }
}
