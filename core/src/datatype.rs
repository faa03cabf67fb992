use constants::{
    ISAM_TYPE_BINARY, ISAM_TYPE_BOOLEAN, ISAM_TYPE_CHAR, ISAM_TYPE_CODE, ISAM_TYPE_CODEBLANK,
    ISAM_TYPE_DECIMAL, ISAM_TYPE_INTEGER,
};

/// The on-disk datatype of a column, as named in a `.def` column line.
/// `Char` is the default when a `.def` line leaves the datatype token
/// empty.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum DataType {
    Char,
    Code,
    CodeBlank,
    Decimal,
    Integer,
    Binary,
    Boolean,
}

impl DataType {
    /// Parse a `.def` datatype token. Unrecognised tokens fall back to
    /// `Char`, matching the original parser's default-on-empty behaviour.
    pub fn from_token(token: &str) -> Self {
        match token.to_lowercase().as_str() {
            "code" => DataType::Code,
            "codeblank" => DataType::CodeBlank,
            "decimal" => DataType::Decimal,
            "integer" => DataType::Integer,
            "binary" => DataType::Binary,
            "bool" | "boolean" => DataType::Boolean,
            _ => DataType::Char,
        }
    }

    /// The historical `ISAM_TYPE_*` numeric tag for this datatype.
    pub fn tag(self) -> u32 {
        match self {
            DataType::Char => ISAM_TYPE_CHAR,
            DataType::Code => ISAM_TYPE_CODE,
            DataType::CodeBlank => ISAM_TYPE_CODEBLANK,
            DataType::Decimal => ISAM_TYPE_DECIMAL,
            DataType::Integer => ISAM_TYPE_INTEGER,
            DataType::Binary => ISAM_TYPE_BINARY,
            DataType::Boolean => ISAM_TYPE_BOOLEAN,
        }
    }

    /// The backend DDL type for a column of this datatype (schema.h
    /// `SCHEMA_build`'s type mapping table).
    pub fn ddl_type(self, length: usize, codelength: Option<usize>) -> String {
        match self {
            DataType::Char => format!("VARCHAR({length})"),
            DataType::Decimal => "NUMERIC".to_string(),
            DataType::Code | DataType::CodeBlank => {
                format!("CHAR({})", codelength.unwrap_or(length))
            }
            DataType::Binary => "BYTEA".to_string(),
            DataType::Integer => "INTEGER".to_string(),
            DataType::Boolean => "BOOLEAN".to_string(),
        }
    }

    /// The effective column length the key-descriptor matcher uses for
    /// containment checks. INTEGER columns use a 2-byte historical
    /// key-part width rather than the 4-byte on-disk storage width (spec
    /// §4.B / Open Questions: the on-disk width is pinned at 4 bytes
    /// little-endian here, but the matcher keeps the legacy 2-byte rule
    /// so existing `.def`/keydesc pairs built against it still match).
    pub fn key_match_length(self, storage_length: usize) -> usize {
        match self {
            DataType::Integer => 2,
            _ => storage_length,
        }
    }
}

/// Width in bytes of the on-disk INTEGER encoding. Pinned per the spec's
/// Open Question rather than left platform-dependent.
pub const INTEGER_STORAGE_WIDTH: usize = 4;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_known_tokens() {
        assert_eq!(DataType::from_token("decimal"), DataType::Decimal);
        assert_eq!(DataType::from_token("CODE"), DataType::Code);
        assert_eq!(DataType::from_token("boolean"), DataType::Boolean);
        assert_eq!(DataType::from_token("bool"), DataType::Boolean);
    }

    #[test]
    fn empty_token_defaults_to_char() {
        assert_eq!(DataType::from_token(""), DataType::Char);
        assert_eq!(DataType::from_token("garbage"), DataType::Char);
    }

    #[test]
    fn integer_key_match_length_is_two() {
        assert_eq!(DataType::Integer.key_match_length(INTEGER_STORAGE_WIDTH), 2);
        assert_eq!(DataType::Char.key_match_length(10), 10);
    }
}
