use crate::workdir::{Workdir, WorkdirError};
use std::fs::{self, File};
use std::path::Path;
use tempfile::TempDir;

fn touch(dir: &Path, name: &str) {
    File::create(dir.join(name)).unwrap();
}

#[test]
pub fn construction_requires_an_existing_directory() {
    let tmp = TempDir::new().unwrap();

    let missing = tmp.path().join("nope");
    assert!(matches!(
        Workdir::new(&missing),
        Err(WorkdirError::InvalidPath { .. })
    ));

    // a plain file is not a working directory either
    touch(tmp.path(), "INCAR");
    assert!(Workdir::new(tmp.path().join("INCAR")).is_err());
}

#[test]
pub fn construction_is_idempotent() {
    let tmp = TempDir::new().unwrap();
    let first = Workdir::new(tmp.path()).unwrap();
    let second = Workdir::new(first.path()).unwrap();
    let third = Workdir::new(&first).unwrap();
    assert_eq!(first, second);
    assert_eq!(first, third);
}

#[test]
pub fn input_and_output_predicates() {
    assert!(Workdir::is_input("INCAR"));
    assert!(Workdir::is_input("POSCAR"));
    assert!(Workdir::is_input("Vasp.lock"));
    assert!(!Workdir::is_input("OSZICAR"));
    assert!(!Workdir::is_input("notes.txt"));

    assert!(Workdir::is_output("OUTCAR"));
    assert!(Workdir::is_output("vasprun.xml"));
    assert!(!Workdir::is_output("INCAR"));

    // CHGCAR is both written and restartable from
    assert!(Workdir::is_input("CHGCAR") && Workdir::is_output("CHGCAR"));

    // temp wavefunction scratch counts for both sides
    assert!(Workdir::is_input("W0001.tmp"));
    assert!(Workdir::is_input("WFULL0042.tmp"));
    assert!(Workdir::is_output("W0001.tmp"));
    assert!(!Workdir::is_input("W12345.tmp"));
    assert!(!Workdir::is_input("WFULL42.tmp"));

    // leading directories are stripped before matching
    assert!(Workdir::is_input("runs/0001/INCAR"));
}

#[test]
pub fn validity_needs_an_input_marker() {
    let tmp = TempDir::new().unwrap();
    let dir = tmp.path().join("run");
    fs::create_dir(&dir).unwrap();

    let workdir = Workdir::new(&dir).unwrap();
    assert!(!workdir.is_valid());

    // an output alone marks where data was produced, not where a
    // computation was configured
    touch(&dir, "OSZICAR");
    assert!(!workdir.is_valid());

    touch(&dir, "INCAR");
    assert!(workdir.is_valid());
}

#[test]
pub fn files_are_partitioned_by_kind() {
    let tmp = TempDir::new().unwrap();
    touch(tmp.path(), "INCAR");
    touch(tmp.path(), "OUTCAR");
    touch(tmp.path(), "CHGCAR");
    touch(tmp.path(), "notes.txt");
    fs::create_dir(tmp.path().join("subdir")).unwrap();

    let workdir = Workdir::new(tmp.path()).unwrap();

    let mut files = workdir.files().unwrap();
    files.sort();
    assert_eq!(files, ["CHGCAR", "INCAR", "OUTCAR", "notes.txt"]);

    let mut inputs = workdir.input_files().unwrap();
    inputs.sort();
    assert_eq!(inputs, ["CHGCAR", "INCAR"]);

    let mut outputs = workdir.output_files().unwrap();
    outputs.sort();
    assert_eq!(outputs, ["CHGCAR", "OUTCAR"]);

    assert_eq!(workdir.other_files().unwrap(), ["notes.txt"]);
}

#[test]
pub fn listings_are_read_fresh() {
    let tmp = TempDir::new().unwrap();
    let workdir = Workdir::new(tmp.path()).unwrap();
    assert!(workdir.files().unwrap().is_empty());

    touch(tmp.path(), "POSCAR");
    assert_eq!(workdir.files().unwrap(), ["POSCAR"]);
}
