use crate::{
    finder::{FinderError, WorkdirFinder},
    status::{StatusRecord, WorkStatus},
    task::{TaskError, TaskFailure, TaskPool},
    workdir::{Workdir, WorkdirError},
};
use itertools::Itertools;
use parking_lot::Mutex;
use serde::Serialize;
use std::{
    collections::{BTreeMap, HashMap},
    fs, io,
    path::{Path, PathBuf},
};
use thiserror::Error;
use tracing::{debug, instrument};

/// Contract-level failure of a classification policy.
///
/// Domain conditions (missing artifacts, unparsable output) belong in the
/// returned record, never here; an error aborts the whole batch.
#[derive(Error, Debug)]
pub enum ClassifyError {
    #[error("policy violated its contract: {0}")]
    Contract(String),
    #[error(transparent)]
    Io(#[from] io::Error),
}

#[derive(Error, Debug)]
pub enum ClassifierError {
    #[error(transparent)]
    InvalidWorkdir(#[from] WorkdirError),
    #[error(transparent)]
    Finder(#[from] FinderError),
    #[error(transparent)]
    Pool(#[from] TaskError),
    #[error(transparent)]
    Task(#[from] TaskFailure<Workdir, ClassifyError>),
}

#[derive(Error, Debug)]
pub enum DumpError {
    #[error("unsupported status file extension '{0}', use .json, .yaml or .yml")]
    UnsupportedExtension(String),
    #[error("failed to write status file")]
    Io(#[from] io::Error),
    #[error("failed to serialize status map to JSON")]
    Json(#[from] serde_json::Error),
    #[error("failed to serialize status map to YAML")]
    Yaml(#[from] serde_yaml::Error),
}

/// Shape of a dumped status map.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyBy {
    /// `{dirname: STATUS}`
    Folder,
    /// `{STATUS: [dirname, ...]}`
    Status,
}

/// Classification policy for a single working directory.
///
/// Implementations must absorb their own domain failures (missing or
/// malformed artifacts, I/O trouble) into the record they return, so that
/// one bad directory cannot abort a batch of thousands. Returning `Err`
/// means the policy itself is broken and stops the batch, attributed to
/// the directory it was processing.
pub trait Classify: Sync {
    fn classify(&self, workdir: &Workdir) -> Result<StatusRecord, ClassifyError>;
}

impl<F> Classify for F
where
    F: Fn(&Workdir) -> Result<StatusRecord, ClassifyError> + Sync,
{
    fn classify(&self, workdir: &Workdir) -> Result<StatusRecord, ClassifyError> {
        self(workdir)
    }
}

/// Insertion-ordered map from working directory to its latest record.
/// Revisited directories overwrite in place and keep their original slot.
#[derive(Debug, Default)]
struct StatusBook {
    entries: Vec<(Workdir, StatusRecord)>,
    index: HashMap<PathBuf, usize>,
}

impl StatusBook {
    fn insert(&mut self, workdir: Workdir, record: StatusRecord) {
        match self.index.get(workdir.path()) {
            Some(&slot) => self.entries[slot].1 = record,
            None => {
                self.index
                    .insert(workdir.path().to_path_buf(), self.entries.len());
                self.entries.push((workdir, record));
            }
        }
    }
}

/// Accumulates classification results over one or more batches and offers
/// the query surface over them.
///
/// Successive `from_dirs`/`from_rootdir` calls merge into the same map:
/// revisited directories overwrite their previous record, directories not
/// part of the new batch keep their stale entry. Callers wanting a fresh
/// view should start from a fresh classifier.
#[derive(Debug, Default)]
pub struct Classifier {
    details: Mutex<StatusBook>,
}

impl Classifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Classify an explicit list of directories on a pool of `workers`
    /// threads and merge the results into the map. Every directory is
    /// validated up front; an invalid path fails the call before any
    /// classification starts.
    ///
    /// The policy runs unsynchronized and concurrently; only the insert of
    /// each finished record takes the map lock, and only for that insert.
    /// When one batch names the same directory twice, the record completing
    /// last wins.
    #[instrument(skip_all, level = "info")]
    pub fn from_dirs<I, P, C>(
        &self,
        dirs: I,
        policy: &C,
        workers: usize,
    ) -> Result<(), ClassifierError>
    where
        I: IntoIterator<Item = P>,
        P: AsRef<Path>,
        C: Classify,
    {
        let workdirs = dirs
            .into_iter()
            .map(Workdir::new)
            .collect::<Result<Vec<_>, WorkdirError>>()?;
        self.classify_batch(workdirs, policy, workers)
    }

    /// Discover working directories under `root` (see
    /// [`WorkdirFinder::find`]) and classify them.
    #[instrument(skip_all, level = "info")]
    pub fn from_rootdir<C: Classify>(
        &self,
        root: &Path,
        policy: &C,
        workers: usize,
        ignore_patterns: &[String],
    ) -> Result<(), ClassifierError> {
        let finder = if ignore_patterns.is_empty() {
            WorkdirFinder::new()
        } else {
            WorkdirFinder::with_ignore_patterns(ignore_patterns)?
        };
        self.classify_batch(finder.find(root), policy, workers)
    }

    fn classify_batch<C: Classify>(
        &self,
        workdirs: Vec<Workdir>,
        policy: &C,
        workers: usize,
    ) -> Result<(), ClassifierError> {
        if workdirs.is_empty() {
            debug!("nothing to classify");
            return Ok(());
        }
        let pool = TaskPool::new(workers)?;
        pool.run(workdirs, |workdir| {
            let record = policy.classify(workdir)?;
            self.details.lock().insert(workdir.clone(), record);
            Ok(())
        })?;
        Ok(())
    }

    /// Snapshot of all classified directories with their records, in
    /// insertion order.
    pub fn details(&self) -> Vec<(Workdir, StatusRecord)> {
        self.details.lock().entries.clone()
    }

    pub fn len(&self) -> usize {
        self.details.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Fraction of classified directories per status. All zeros while the
    /// map is empty, otherwise the fractions add up to one.
    pub fn summary(&self) -> BTreeMap<WorkStatus, f64> {
        let book = self.details.lock();
        let total = book.entries.len();
        let counts = book
            .entries
            .iter()
            .map(|(_, record)| record.status)
            .counts();
        WorkStatus::ALL
            .into_iter()
            .map(|status| {
                let count = counts.get(&status).copied().unwrap_or(0);
                let fraction = if total == 0 {
                    0.0
                } else {
                    count as f64 / total as f64
                };
                (status, fraction)
            })
            .collect()
    }

    /// Directories currently in `status`, in insertion order.
    pub fn list(&self, status: WorkStatus) -> Vec<Workdir> {
        self.details
            .lock()
            .entries
            .iter()
            .filter(|(_, record)| record.status == status)
            .map(|(workdir, _)| workdir.clone())
            .collect()
    }

    pub fn list_pending(&self) -> Vec<Workdir> {
        self.list(WorkStatus::Pending)
    }

    pub fn list_done(&self) -> Vec<Workdir> {
        self.list(WorkStatus::Done)
    }

    pub fn list_incomplete(&self) -> Vec<Workdir> {
        self.list(WorkStatus::NotConverged)
    }

    /// Directories whose last known status is not a successful terminal
    /// state, in insertion order. This is the canonical set downstream
    /// orchestration resubmits.
    pub fn to_rerun(&self) -> Vec<Workdir> {
        self.details
            .lock()
            .entries
            .iter()
            .filter(|(_, record)| {
                matches!(
                    record.status,
                    WorkStatus::Pending | WorkStatus::NotConverged
                )
            })
            .map(|(workdir, _)| workdir.clone())
            .collect()
    }

    /// Write the status map to `path` as JSON or YAML, chosen by the file
    /// extension. An unsupported extension fails before anything is
    /// written.
    pub fn dump(&self, path: &Path, key_by: KeyBy) -> Result<(), DumpError> {
        let format = DumpFormat::from_path(path)?;
        let serialized = {
            let book = self.details.lock();
            match key_by {
                KeyBy::Folder => {
                    let map: BTreeMap<String, WorkStatus> = book
                        .entries
                        .iter()
                        .map(|(workdir, record)| (workdir.name(), record.status))
                        .collect();
                    format.serialize(&map)?
                }
                KeyBy::Status => {
                    let mut map: BTreeMap<WorkStatus, Vec<String>> = BTreeMap::new();
                    for (workdir, record) in &book.entries {
                        map.entry(record.status).or_default().push(workdir.name());
                    }
                    format.serialize(&map)?
                }
            }
        };
        fs::write(path, serialized)?;
        Ok(())
    }
}

#[derive(Debug, Clone, Copy)]
enum DumpFormat {
    Json,
    Yaml,
}

impl DumpFormat {
    fn from_path(path: &Path) -> Result<Self, DumpError> {
        let extension = path
            .extension()
            .and_then(|extension| extension.to_str())
            .map(str::to_ascii_lowercase);
        match extension.as_deref() {
            Some("json") => Ok(Self::Json),
            Some("yaml") | Some("yml") => Ok(Self::Yaml),
            other => Err(DumpError::UnsupportedExtension(
                other.unwrap_or("").to_owned(),
            )),
        }
    }

    fn serialize<T: Serialize>(self, value: &T) -> Result<String, DumpError> {
        match self {
            Self::Json => Ok(serde_json::to_string_pretty(value)?),
            Self::Yaml => Ok(serde_yaml::to_string(value)?),
        }
    }
}
