use std::fs;

use crate::{
    batch::{default_hydride_cols, resolve_table, Couplings, Orientations},
    extract::ExtractError,
    table::Table,
};

const EFG_OUT: &str = "\
 -----------------------------------------------
 Nucleus   0H : A:ISTP=    1 I=  0.5 P=533.5514 MHz/au**3
 -----------------------------------------------
 Raw EFG matrix (all values in a.u.**-3):
             1.0000000    0.0000000    0.0000000
             0.0000000    2.0000000    0.0000000
             0.0000000    0.0000000   -5.0000000

 Quadrupole tensor eigenvalues (in MHz;Q= 0.0029 barn)
  e**2qQ            =   -0.168 MHz
  eta               =    0.9398
 -----------------------------------------------
 Nucleus   1H :
 -----------------------------------------------
 Raw EFG matrix (all values in a.u.**-3):
             0.1000000    0.2000000    0.3000000
             0.2000000    0.5000000    0.4000000
             0.3000000    0.4000000    0.6000000

  e**2qQ            =    0.221 MHz
  eta               =    0.1200
";

/// one row backed by an output file, one row with nothing behind it
fn setup(dir: &std::path::Path) -> Table {
    fs::write(dir.join("mu1_input.inp.out"), EFG_OUT).unwrap();
    let path = dir.join("idx.csv");
    fs::write(
        &path,
        "Filename,Hydrides - mu1H,Notes\n\
	 mu1.xyz,\"1,2;3\",ok\n\
	 missing.xyz,1,gone\n",
    )
    .unwrap();
    Table::load(&path).unwrap()
}

#[test]
fn couplings_resolve_through_a_hydride_table() {
    let dir = tempfile::tempdir().unwrap();
    let table = setup(dir.path());
    let cols = default_hydride_cols(&table);
    assert_eq!(cols, crate::string!["Hydrides - mu1H"]);
    let got = resolve_table(
        &table,
        &cols,
        dir.path(),
        &Couplings { with_eta: false },
    )
    .unwrap();
    // table index 3 is nucleus 2, which the file never prints
    insta::assert_snapshot!(got.to_string(), @r#"
    Filename,Hydrides - mu1H,Notes,Hydrides - mu1H_e2qQ
    mu1.xyz,"1,2;3",ok,"0.168000,0.221000;N/A"
    missing.xyz,1,gone,
    "#);
}

#[test]
fn orientations_resolve_through_a_hydride_table() {
    let dir = tempfile::tempdir().unwrap();
    let table = setup(dir.path());
    let got = resolve_table(
        &table,
        &crate::string!["Hydrides - mu1H"],
        dir.path(),
        &Orientations,
    )
    .unwrap();
    assert_eq!(got.headers.len(), 4);
    assert_eq!(got.headers[3], "Hydrides - mu1H_orientations");
    let cell = got.get(0, 3);
    assert!(cell.starts_with("X("));
    assert_eq!(cell.matches("X(").count(), 2);
    assert_eq!(cell.matches("Z(").count(), 2);
    // the lone ; between the groups survives the X(..);Y(..);Z(..) noise
    assert!(cell.ends_with(";N/A"));
    // the skipped row keeps an empty new cell
    assert_eq!(got.get(1, 3), "");
}

#[test]
fn eta_pairs_keep_their_own_sentinel() {
    let dir = tempfile::tempdir().unwrap();
    let table = setup(dir.path());
    let got = resolve_table(
        &table,
        &crate::string!["Hydrides - mu1H"],
        dir.path(),
        &Couplings { with_eta: true },
    )
    .unwrap();
    assert_eq!(
        got.get(0, 3),
        "(0.168000,0.939800),(0.221000,0.120000);(N/A,N/A)"
    );
}

#[test]
fn tables_without_a_filename_column_are_rejected() {
    let table = Table {
        headers: crate::string!["Structure", "Hydrides - mu1H"],
        rows: vec![],
    };
    let got = resolve_table(
        &table,
        &crate::string!["Hydrides - mu1H"],
        "testfiles/outs",
        &Couplings { with_eta: false },
    );
    assert!(matches!(got, Err(ExtractError::BadTable(_))));
}

#[test]
fn basename_headers_work_like_filename() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("mu1_input.inp.out"), EFG_OUT).unwrap();
    let path = dir.path().join("idx.csv");
    fs::write(&path, "Basename,Hydrides - mu1H\nmu1.xyz,2\n").unwrap();
    let table = Table::load(&path).unwrap();
    let got = resolve_table(
        &table,
        &crate::string!["Hydrides - mu1H"],
        dir.path(),
        &Couplings { with_eta: false },
    )
    .unwrap();
    assert_eq!(got.get(0, 2), "0.221000");
}
