//! Pure logic for the clone driver, kept separate from `main.rs` so it is
//! testable without a live legacy engine or Postgres connection.

/// Parse a `clonelist.def`/`preload.def`-style list: one name per line,
/// `#`-prefixed and blank lines ignored.
pub fn parse_name_list(text: &str) -> Vec<String> {
    text.lines()
        .map(str::trim)
        .filter(|l| !l.is_empty() && !l.starts_with('#'))
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn skips_blank_lines_and_comments() {
        let text = "acct\n\n# a comment\nledger\n  \nrptmp_scratch\n";
        assert_eq!(parse_name_list(text), vec!["acct", "ledger", "rptmp_scratch"]);
    }

    #[test]
    fn trims_surrounding_whitespace() {
        assert_eq!(parse_name_list("  acct  \n"), vec!["acct"]);
    }

    #[test]
    fn empty_input_yields_empty_list() {
        assert!(parse_name_list("").is_empty());
        assert!(parse_name_list("# only comments\n").is_empty());
    }
}
