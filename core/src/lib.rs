//! Bulk discovery and status classification for VASP working directories.
//!
//! The engine turns a tree of calculation folders into a queryable status
//! table: [`WorkdirFinder`] locates working directories by their input
//! files, [`Classifier`] fans a classification policy out over a local
//! thread pool and accumulates one record per directory, and
//! [`ForceConvergence`] is the canonical policy deciding
//! PENDING / DONE / NOT_CONVERGED from the final force block of an OUTCAR.

pub mod classify;
pub mod finder;
pub mod force;
pub mod status;
pub mod task;
pub mod workdir;

pub use classify::{Classifier, ClassifierError, Classify, ClassifyError, DumpError, KeyBy};
pub use finder::{FinderError, WorkdirFinder};
pub use force::ForceConvergence;
pub use status::{StatusRecord, WorkStatus};
pub use task::{TaskError, TaskFailure, TaskPool};
pub use workdir::{Workdir, WorkdirError};

#[cfg(test)]
mod force_test;
#[cfg(test)]
mod workdir_test;
