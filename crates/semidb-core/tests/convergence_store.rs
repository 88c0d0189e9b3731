use semidb_core::convergence::ConvergenceDb;
use semidb_core::domain::{Dataset, DbError, SystemKey, TestType};
use std::fs;
use std::path::Path;
use tempfile::TempDir;

const HEADER: &str = "material,structure,functional,test_type,parameter,energy_total,energy_per_atom";

fn write_file(path: &Path, content: &str) {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).expect("parent directory should be created");
    }
    fs::write(path, content).expect("fixture should be written");
}

#[test]
fn directory_of_tables_answers_kpoint_and_cutoff_queries() {
    let temp = TempDir::new().expect("tempdir should be created");
    let root = temp.path().join("convergence");
    write_file(
        &root.join("gan.csv"),
        &format!(
            "{HEADER}\n\
             GaN,zb,PBE,kpt,k8x8x8,-24.40,-6.10\n\
             GaN,zb,PBE,kpt,k4x4x4,-24.00,-6.00\n\
             GaN,zb,PBE,kpt,k6x6x6,-24.32,-6.08\n\
             GaN,zb,PBE,encut,ENCUT500eV,-24.50,-6.125\n"
        ),
    );
    write_file(
        &root.join("gaas.csv"),
        &format!(
            "{HEADER}\n\
             GaAs,zb,HSE,encut,E400,-17.10,-8.55\n\
             GaAs,zb,PBE,encut,E400,-9.10,-4.55\n\
             GaAs,wz,PBE,kpt,k6x6x4,-18.40,-4.60\n"
        ),
    );
    write_file(&root.join("notes.txt"), "not a table\n");

    let db = ConvergenceDb::load(&root).expect("directory should load");
    assert_eq!(db.record_count(), 7);
    assert_eq!(db.load_report().loaded.len(), 2);
    assert!(db.load_report().skipped.is_empty());

    assert_eq!(db.materials(), ["GaAs", "GaN"]);
    assert_eq!(db.structures("GaAs"), ["wz", "zb"]);
    assert_eq!(db.functionals("GaAs", "zb"), ["HSE", "PBE"]);
    assert!(db.functionals("InN", "zb").is_empty());

    let kpt = db
        .query("GaN", "zb", "PBE", TestType::Kpt, true)
        .expect("GaN kpt series should exist");
    assert_eq!(kpt.axes(), [64.0, 216.0, 512.0]);
    assert_eq!(kpt.energies(), [-6.00, -6.08, -6.10]);

    let encut = db
        .query("GaN", "zb", "PBE", TestType::Encut, false)
        .expect("GaN encut series should exist");
    assert_eq!(encut.axes(), [500.0]);
    assert_eq!(encut.energies(), [-24.50]);

    let wurtzite = db
        .query("GaAs", "wz", "PBE", TestType::Kpt, true)
        .expect("GaAs wz kpt series should exist");
    assert_eq!(wurtzite.axes(), [144.0]);
}

#[test]
fn malformed_members_are_skipped_and_reported() {
    let temp = TempDir::new().expect("tempdir should be created");
    let root = temp.path().join("convergence");
    write_file(
        &root.join("a_good.csv"),
        &format!("{HEADER}\nAlN,wz,PBE,encut,E520,-29.0,-7.25\n"),
    );
    write_file(&root.join("b_bad.csv"), "material,structure\nAlN\n");
    write_file(
        &root.join("c_no_energy.csv"),
        "material,structure,functional,test_type,parameter\nAlN,wz,PBE,kpt,k4x4x4\n",
    );

    let db = ConvergenceDb::load(&root).expect("good member should load");
    assert_eq!(db.record_count(), 1);
    assert_eq!(db.load_report().loaded, [root.join("a_good.csv")]);
    let skipped: Vec<_> = db
        .load_report()
        .skipped
        .iter()
        .map(|source| source.path.clone())
        .collect();
    assert_eq!(skipped, [root.join("b_bad.csv"), root.join("c_no_energy.csv")]);
}

#[test]
fn unusable_locations_fail_with_source_errors() {
    let temp = TempDir::new().expect("tempdir should be created");

    let missing = temp.path().join("absent");
    assert!(matches!(
        ConvergenceDb::load(&missing),
        Err(DbError::SourceLoad {
            dataset: Dataset::Convergence,
            ..
        })
    ));

    let empty = temp.path().join("empty");
    fs::create_dir_all(&empty).expect("empty directory should be created");
    assert!(matches!(
        ConvergenceDb::load(&empty),
        Err(DbError::NoSources {
            dataset: Dataset::Convergence,
            ..
        })
    ));
}

#[test]
fn unknown_system_reports_the_requested_key() {
    let temp = TempDir::new().expect("tempdir should be created");
    let path = temp.path().join("single.csv");
    write_file(&path, &format!("{HEADER}\nGaN,zb,PBE,kpt,k4x4x4,-24.0,-6.0\n"));

    let db = ConvergenceDb::load(&path).expect("single table should load");
    let error = db
        .query("GaN", "zb", "PBE", TestType::Encut, true)
        .expect_err("no encut rows exist");

    assert_eq!(
        error,
        DbError::NoConvergenceData {
            key: SystemKey::new("GaN", "zb", "PBE"),
            test_type: TestType::Encut,
        }
    );
    assert_eq!(error.exit_code(), 4);
}

#[test]
fn test_type_cells_match_exactly() {
    let temp = TempDir::new().expect("tempdir should be created");
    let path = temp.path().join("gan.csv");
    write_file(
        &path,
        &format!(
            "{HEADER}\n\
             GaN,zb,PBE,kpt,k4x4x4,-24.00,-6.00\n\
             GaN,zb,PBE,KPT,k6x6x6,-24.32,-6.08\n\
             GaN,zb,PBE,Encut,E400,-24.10,-6.025\n"
        ),
    );

    let db = ConvergenceDb::load(&path).expect("table should load");
    assert_eq!(db.record_count(), 1);

    let kpt = db
        .query("GaN", "zb", "PBE", TestType::Kpt, true)
        .expect("lowercase kpt row should be kept");
    assert_eq!(kpt.axes(), [64.0]);
    assert!(matches!(
        db.query("GaN", "zb", "PBE", TestType::Encut, true),
        Err(DbError::NoConvergenceData { .. })
    ));
}
