//! Error mapping (component F): collapse every failure kind into the
//! legacy numeric code set, track the process-global last error, and
//! honour the suppression flag the client sets when probing (e.g. trying
//! an update before falling back to an insert).

use constants::error_description;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, IsamError>;

/// The subset of the legacy error table this bridge actually raises
/// (spec §4.F); `Backend` is this implementation's catch-all for SQL
/// failures the bridge doesn't otherwise classify, using the same `999`
/// sentinel the FFI boundary uses for caught panics.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum IsamError {
    #[error("duplicate record")]
    DuplicateRecord,
    #[error("file not open")]
    FileNotOpen,
    #[error("illegal argument")]
    IllegalArgument,
    #[error("illegal key descriptor")]
    IllegalKeyDescriptor,
    #[error("too many files open")]
    TooManyFilesOpen,
    #[error("no record found")]
    NoRecordFound,
    #[error("no current record")]
    NoCurrentRecord,
    #[error("no transaction")]
    NoTransaction,
    #[error("no begin work yet")]
    NoBeginWorkYet,
    #[error("no schema definition")]
    NoSchemaDefinition,
    #[error("backend error: {0}")]
    Backend(String),
}

impl IsamError {
    /// The legacy numeric code (iserrcodes.h).
    pub fn code(&self) -> i32 {
        match self {
            IsamError::DuplicateRecord => 100,
            IsamError::FileNotOpen => 101,
            IsamError::IllegalArgument => 102,
            IsamError::IllegalKeyDescriptor => 103,
            IsamError::TooManyFilesOpen => 104,
            IsamError::NoRecordFound => 111,
            IsamError::NoCurrentRecord => 112,
            IsamError::NoTransaction => 122,
            IsamError::NoBeginWorkYet => 124,
            IsamError::NoSchemaDefinition => 900,
            IsamError::Backend(_) => 999,
        }
    }

    /// `iserrno` as the client reads it: `code - 100` for codes ≥ 100,
    /// else the code itself (spec §4.F).
    pub fn isamerrno(&self) -> i32 {
        let code = self.code();
        if code >= 100 {
            code - 100
        } else {
            code
        }
    }

    pub fn description(&self) -> &'static str {
        error_description(self.code())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn isamerrno_subtracts_100() {
        assert_eq!(IsamError::NoRecordFound.isamerrno(), 11);
        assert_eq!(IsamError::IllegalArgument.isamerrno(), 2);
    }
}
