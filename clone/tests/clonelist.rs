//! Integration coverage for the clone driver's list parsing against an
//! on-disk `clonelist.def`-shaped fixture (spec §10.5).

use std::io::Write;

#[test]
fn parses_a_real_clonelist_file() {
    let mut path = std::env::temp_dir();
    path.push("pgisam_clone_test_clonelist.def");

    {
        let mut file = std::fs::File::create(&path).unwrap();
        writeln!(file, "# tables to clone, in dependency order").unwrap();
        writeln!(file, "acct").unwrap();
        writeln!(file).unwrap();
        writeln!(file, "ledger").unwrap();
    }

    let text = std::fs::read_to_string(&path).unwrap();
    let names = pgisam_clone::parse_name_list(&text);
    assert_eq!(names, vec!["acct", "ledger"]);

    std::fs::remove_file(&path).unwrap();
}
