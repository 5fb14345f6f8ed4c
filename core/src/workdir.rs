use globset::{Glob, GlobSet, GlobSetBuilder};
use once_cell::sync::Lazy;
use std::{
    collections::BTreeSet,
    fmt, fs, io,
    path::{Path, PathBuf},
};
use thiserror::Error;

/// Fixed-name VASP input files used for working directory detection.
/// Temporary files with running indices (WFULLxxxx.tmp, Wxxxx.tmp) are
/// matched separately via [`TMP_PATTERNS`].
pub static INPUT_FILES: Lazy<BTreeSet<&'static str>> = Lazy::new(|| {
    BTreeSet::from([
        "CHGCAR",
        "DYNMATFULL",
        "GAMMA",
        "ICONST",
        "INCAR",
        "KPOINTS",
        "KPOINTS_OPT",
        "KPOINTS_WAN",
        "ML_AB",
        "ML_FF",
        "PENALTYPOT",
        "POSCAR",
        "POTCAR",
        "QPOINTS",
        "Vasp.lock",
        "Vaspin.h5",
        "WANPROJ",
        "WAVECAR",
        "WAVEDER",
        "STOPCAR",
    ])
});

/// Fixed-name VASP output files.
/// See https://www.vasp.at/wiki/index.php/Category:Output_files
pub static OUTPUT_FILES: Lazy<BTreeSet<&'static str>> = Lazy::new(|| {
    BTreeSet::from([
        "BSEFATBAND",
        "CHG",
        "CHGCAR",
        "CONTCAR",
        "CONTCAR_ELPH",
        "DOSCAR",
        "DYNMATFULL",
        "EIGENVAL",
        "ELFCAR",
        "IBZKPT",
        "LOCPOT",
        "ML_ABN",
        "ML_EATOM",
        "ML_FFN",
        "ML_HEAT",
        "ML_HIS",
        "ML_LOGFILE",
        "ML_REG",
        "NMRCURBX",
        "OSZICAR",
        "OUTCAR",
        "Output",
        "PCDAT",
        "PARCHG",
        "Phelel_params.hdf5",
        "POT",
        "PRJCAR",
        "PROCAR",
        "PROCAR_OPT",
        "PROOUT",
        "REPORT",
        "TMPCAR",
        "UIJKL",
        "URijkl",
        "Vaspelph.h5",
        "Vaspout.h5",
        "Vaspwave.h5",
        "vasprun.xml",
        "VIJKL",
        "VRijkl",
        "WANPROJ",
        "WAVECAR",
        "WAVEDER",
        "XDATCAR",
    ])
});

/// Patterns for temporary wavefunction scratch files, counted as both
/// input and output.
static TMP_PATTERNS: Lazy<GlobSet> = Lazy::new(|| {
    let mut builder = GlobSetBuilder::new();
    for pattern in ["WFULL????.tmp", "W????.tmp"] {
        builder.add(Glob::new(pattern).expect("static temp file pattern"));
    }
    builder.build().expect("static temp file patterns")
});

#[derive(Error, Debug)]
pub enum WorkdirError {
    #[error("'{path}' does not exist or is not a directory")]
    InvalidPath {
        path: PathBuf,
        #[source]
        source: Option<io::Error>,
    },
}

/// A validated handle to one VASP working directory.
///
/// The path is resolved (symlinks followed) at construction time and never
/// changes afterwards; two handles are equal iff their resolved paths are.
/// File listings are read fresh on every call, callers that need a stable
/// snapshot must hold on to the returned vectors.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Workdir {
    path: PathBuf,
}

impl Workdir {
    /// Resolve `path` and validate that it names an existing directory.
    /// Re-constructing from an existing handle's path is idempotent.
    pub fn new(path: impl AsRef<Path>) -> Result<Self, WorkdirError> {
        let raw = path.as_ref();
        let path = raw
            .canonicalize()
            .map_err(|source| WorkdirError::InvalidPath {
                path: raw.to_path_buf(),
                source: Some(source),
            })?;
        if !path.is_dir() {
            return Err(WorkdirError::InvalidPath { path, source: None });
        }
        Ok(Self { path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Final path component, the key used in status dumps.
    pub fn name(&self) -> String {
        self.path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.path.display().to_string())
    }

    /// Whether `filename` is a recognized VASP input file (fixed names or
    /// temp patterns). Leading directories are stripped before matching.
    pub fn is_input(filename: &str) -> bool {
        let name = base_name(filename);
        INPUT_FILES.contains(name) || TMP_PATTERNS.is_match(name)
    }

    /// Whether `filename` is a recognized VASP output file.
    pub fn is_output(filename: &str) -> bool {
        let name = base_name(filename);
        OUTPUT_FILES.contains(name) || TMP_PATTERNS.is_match(name)
    }

    /// All regular file names in the directory, non-recursive.
    pub fn files(&self) -> io::Result<Vec<String>> {
        let mut files = Vec::new();
        for entry in fs::read_dir(&self.path)? {
            let entry = entry?;
            if entry.path().is_file() {
                files.push(entry.file_name().to_string_lossy().into_owned());
            }
        }
        Ok(files)
    }

    /// The input files currently present in the directory.
    pub fn input_files(&self) -> io::Result<Vec<String>> {
        Ok(self
            .files()?
            .into_iter()
            .filter(|file| Self::is_input(file))
            .collect())
    }

    /// The output files currently present in the directory.
    pub fn output_files(&self) -> io::Result<Vec<String>> {
        Ok(self
            .files()?
            .into_iter()
            .filter(|file| Self::is_output(file))
            .collect())
    }

    /// Files recognized as neither input nor output.
    pub fn other_files(&self) -> io::Result<Vec<String>> {
        Ok(self
            .files()?
            .into_iter()
            .filter(|file| !Self::is_input(file) && !Self::is_output(file))
            .collect())
    }

    /// A directory qualifies as a working directory when it holds at least
    /// one recognized input file. A folder with only outputs marks where a
    /// run produced data, not where one was configured, and does not count.
    /// Listing errors degrade to `false`.
    pub fn is_valid(&self) -> bool {
        match self.files() {
            Ok(files) => files.iter().any(|file| Self::is_input(file)),
            Err(_) => false,
        }
    }
}

impl AsRef<Path> for Workdir {
    fn as_ref(&self) -> &Path {
        &self.path
    }
}

impl fmt::Display for Workdir {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.path.display())
    }
}

fn base_name(filename: &str) -> &str {
    Path::new(filename)
        .file_name()
        .and_then(|name| name.to_str())
        .unwrap_or(filename)
}
