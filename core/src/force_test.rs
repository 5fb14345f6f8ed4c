use crate::classify::Classify;
use crate::force::{last_force_sum, ForceConvergence};
use crate::status::WorkStatus;
use crate::workdir::Workdir;
use std::fs;
use std::path::Path;
use tempfile::TempDir;

fn force_block(rows: &[(f64, f64, f64)]) -> String {
    let mut text = String::from(
        " POSITION                                       TOTAL-FORCE (eV/Angst)\n \
         -----------------------------------------------------------------------------------\n",
    );
    for (x, y, z) in rows {
        text.push_str(&format!(
            "      1.00000      1.00000      1.00000   {x:>14.8}  {y:>14.8}  {z:>14.8}\n"
        ));
    }
    text.push_str(
        " -----------------------------------------------------------------------------------\n \
         total drift:                                0.000000      0.000000      0.000000\n",
    );
    text
}

fn write_artifact(dir: &Path, name: &str, text: &str) -> Workdir {
    fs::write(dir.join(name), text).unwrap();
    Workdir::new(dir).unwrap()
}

#[test]
pub fn missing_artifact_is_pending() {
    let tmp = TempDir::new().unwrap();
    let workdir = Workdir::new(tmp.path()).unwrap();

    let record = ForceConvergence::default().classify(&workdir).unwrap();
    assert_eq!(record.status, WorkStatus::Pending);
    assert_eq!(record.reason.as_deref(), Some("OUTCAR missing"));
}

#[test]
pub fn artifact_without_a_block_is_not_converged() {
    let tmp = TempDir::new().unwrap();
    let workdir = write_artifact(tmp.path(), "OUTCAR", "vasp 6.4.2 header\nno forces here\n");

    let record = ForceConvergence::default().classify(&workdir).unwrap();
    assert_eq!(record.status, WorkStatus::NotConverged);
    assert_eq!(record.reason.as_deref(), Some("no force block found"));
}

#[test]
pub fn forces_below_tolerance_are_done() {
    let tmp = TempDir::new().unwrap();
    // per-atom forces summing to [1e-8, -2e-8, 0]
    let text = force_block(&[(1e-8, 0.0, 0.0), (0.0, -2e-8, 0.0)]);
    let workdir = write_artifact(tmp.path(), "OUTCAR", &text);

    let record = ForceConvergence::default().classify(&workdir).unwrap();
    assert_eq!(record.status, WorkStatus::Done);
    assert_eq!(record.reason.as_deref(), Some("forces converged"));
    assert!(record.extra.contains_key("forces_sum"));
}

#[test]
pub fn forces_above_tolerance_embed_the_norm() {
    let tmp = TempDir::new().unwrap();
    let text = force_block(&[(1e-3, 0.0, 0.0)]);
    let workdir = write_artifact(tmp.path(), "OUTCAR", &text);

    let record = ForceConvergence::default().classify(&workdir).unwrap();
    assert_eq!(record.status, WorkStatus::NotConverged);
    let reason = record.reason.unwrap();
    assert!(reason.contains("1.000e-3"), "norm missing from '{reason}'");
    assert!(reason.contains("atol"));
}

#[test]
pub fn only_the_last_block_decides() {
    let tmp = TempDir::new().unwrap();
    let mut text = force_block(&[(0.5, 0.0, 0.0)]);
    text.push_str("ionic step 2\n");
    text.push_str(&force_block(&[(1e-9, 0.0, 0.0)]));
    let workdir = write_artifact(tmp.path(), "OUTCAR", &text);

    let record = ForceConvergence::default().classify(&workdir).unwrap();
    assert_eq!(record.status, WorkStatus::Done);
}

#[test]
pub fn malformed_numbers_are_absorbed_into_the_record() {
    let tmp = TempDir::new().unwrap();
    let text = " POSITION  TOTAL-FORCE\n ---\n      1.0 1.0 1.0 garbage 0.0 0.0\n total drift: 0 0 0\n";
    let workdir = write_artifact(tmp.path(), "OUTCAR", text);

    let record = ForceConvergence::default().classify(&workdir).unwrap();
    assert_eq!(record.status, WorkStatus::NotConverged);
    assert!(record.reason.unwrap().contains("malformed force value"));
}

#[test]
pub fn truncated_rows_are_absorbed_into_the_record() {
    let tmp = TempDir::new().unwrap();
    let text = " POSITION  TOTAL-FORCE\n ---\n      1.0 1.0\n total drift: 0 0 0\n";
    let workdir = write_artifact(tmp.path(), "OUTCAR", text);

    let record = ForceConvergence::default().classify(&workdir).unwrap();
    assert_eq!(record.status, WorkStatus::NotConverged);
    assert!(record.reason.unwrap().contains("truncated force row"));
}

#[test]
pub fn artifact_name_is_configurable() {
    let tmp = TempDir::new().unwrap();
    let text = force_block(&[(0.0, 0.0, 0.0)]);
    let workdir = write_artifact(tmp.path(), "relax.out", &text);

    let policy = ForceConvergence::with_artifact("relax.out", 1e-6);
    let record = policy.classify(&workdir).unwrap();
    assert_eq!(record.status, WorkStatus::Done);

    // the default policy still reports its own artifact as missing
    let record = ForceConvergence::default().classify(&workdir).unwrap();
    assert_eq!(record.status, WorkStatus::Pending);
}

#[test]
pub fn parser_sums_the_last_block() {
    let mut text = force_block(&[(1.0, 2.0, 3.0), (0.5, -2.0, -3.0)]);
    text.push_str(&force_block(&[(0.25, 0.0, 0.0)]));

    let sum = last_force_sum(&text).unwrap().unwrap();
    assert_eq!(sum, [0.25, 0.0, 0.0]);

    assert!(last_force_sum("no blocks at all").unwrap().is_none());
}
