//! Local build output: wheels and their metadata sidecars.
//!
//! Nothing here is persisted. Every run rebuilds these values from the
//! directory, so the directory itself is the only source of truth.

use crate::error::{Error, IoContext, Result};
use crate::metadata::Descriptor;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use wheelhouse_schema::{METADATA_SUFFIX, PackageName, Sha256Digest, WHEEL_EXTENSION, WheelFilename};

/// A file in the local directory, with its content hash computed on demand.
#[derive(Debug)]
pub struct LocalFile {
    name: String,
    path: PathBuf,
    hash: OnceLock<Sha256Digest>,
}

impl LocalFile {
    /// Wrap a file path. The file name becomes the asset name.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Validation`] if the path has no UTF-8 file name.
    pub fn new(path: PathBuf) -> Result<Self> {
        let name = path
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or_else(|| Error::validation(format!("not a usable file name: {}", path.display())))?
            .to_string();
        Ok(Self {
            name,
            path,
            hash: OnceLock::new(),
        })
    }

    /// Asset name (the bare filename).
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Full path on disk.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// SHA-256 of the file bytes. Hashed on first call, memoized after.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Io`] if the file cannot be read.
    pub fn content_hash(&self) -> Result<&Sha256Digest> {
        if let Some(hash) = self.hash.get() {
            return Ok(hash);
        }
        let computed = Sha256Digest::compute_file(&self.path).at(&self.path)?;
        tracing::debug!("hashed {} -> {computed}", self.name);
        Ok(self.hash.get_or_init(|| computed))
    }

    /// Whether the hash has already been computed.
    pub fn is_hashed(&self) -> bool {
        self.hash.get().is_some()
    }
}

/// A locally built wheel with its parsed identity.
#[derive(Debug)]
pub struct Artifact {
    file: LocalFile,
    wheel: WheelFilename,
    descriptor: Option<Descriptor>,
}

impl Artifact {
    /// Parse the filename of `path` into an artifact.
    ///
    /// # Errors
    ///
    /// Returns [`Error::MalformedName`] if the name breaks the wheel grammar.
    pub fn from_path(path: PathBuf) -> Result<Self> {
        let file = LocalFile::new(path)?;
        let wheel = WheelFilename::parse(file.name())?;
        Ok(Self {
            file,
            wheel,
            descriptor: None,
        })
    }

    /// Original filename.
    pub fn raw_name(&self) -> &str {
        self.file.name()
    }

    /// Normalized package identity.
    pub fn package_identity(&self) -> &PackageName {
        self.wheel.name()
    }

    /// Parsed filename components.
    pub fn wheel(&self) -> &WheelFilename {
        &self.wheel
    }

    /// Underlying file.
    pub fn file(&self) -> &LocalFile {
        &self.file
    }

    /// Memoized SHA-256 of the wheel bytes.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Io`] if the file cannot be read.
    pub fn content_hash(&self) -> Result<&Sha256Digest> {
        self.file.content_hash()
    }

    /// Extracted metadata record, if one was attached.
    pub fn descriptor(&self) -> Option<&Descriptor> {
        self.descriptor.as_ref()
    }

    /// Attach the extracted metadata record.
    pub fn set_descriptor(&mut self, descriptor: Option<Descriptor>) {
        self.descriptor = descriptor;
    }

    /// Where the metadata sidecar for this wheel lives.
    pub fn sidecar_path(&self) -> PathBuf {
        sidecar_path(self.file.path())
    }
}

/// `<artifact>.metadata`, next to the artifact.
pub fn sidecar_path(artifact: &Path) -> PathBuf {
    let mut os = artifact.as_os_str().to_os_string();
    os.push(METADATA_SUFFIX);
    PathBuf::from(os)
}

/// Fail with [`Error::Validation`] unless `dir` is an existing directory.
///
/// # Errors
///
/// See above.
pub fn ensure_dir(dir: &Path) -> Result<()> {
    if dir.is_dir() {
        Ok(())
    } else if dir.exists() {
        Err(Error::validation(format!("not a directory: {}", dir.display())))
    } else {
        Err(Error::validation(format!("directory does not exist: {}", dir.display())))
    }
}

/// Files in `dir` (non-recursive) whose names match `pattern`, sorted by name.
fn glob_files(dir: &Path, pattern: &str) -> Result<Vec<PathBuf>> {
    let escaped = glob::Pattern::escape(&dir.to_string_lossy());
    let full = format!("{escaped}/{pattern}");
    let paths = glob::glob(&full).map_err(|e| Error::validation(format!("bad pattern {full}: {e}")))?;

    let mut out = Vec::new();
    for entry in paths {
        let path = entry.map_err(|e| Error::Io {
            path: e.path().to_path_buf(),
            source: e.into(),
        })?;
        if path.is_file() {
            out.push(path);
        }
    }
    out.sort();
    Ok(out)
}

/// Every `*.whl` in `dir`, parsed. The first malformed name aborts the scan.
///
/// # Errors
///
/// Returns [`Error::Validation`] for a bad directory and
/// [`Error::MalformedName`] for the first filename that fails to parse.
pub fn scan_wheels(dir: &Path) -> Result<Vec<Artifact>> {
    ensure_dir(dir)?;
    let artifacts = glob_files(dir, &format!("*{WHEEL_EXTENSION}"))?
        .into_iter()
        .map(Artifact::from_path)
        .collect::<Result<Vec<_>>>()?;
    tracing::debug!("found {} wheels in {}", artifacts.len(), dir.display());
    Ok(artifacts)
}

/// Every publishable file in `dir`: `*.whl` and `*.whl.metadata`.
///
/// # Errors
///
/// Returns [`Error::Validation`] for a bad directory.
pub fn scan_release_files(dir: &Path) -> Result<Vec<LocalFile>> {
    ensure_dir(dir)?;
    let mut paths = glob_files(dir, &format!("*{WHEEL_EXTENSION}"))?;
    paths.extend(glob_files(dir, &format!("*{WHEEL_EXTENSION}{METADATA_SUFFIX}"))?);
    paths.sort();
    paths.into_iter().map(LocalFile::new).collect()
}

/// Whether an asset name is one the synchronizer manages.
pub fn is_release_file(name: &str) -> bool {
    name.ends_with(WHEEL_EXTENSION) || name.ends_with(&format!("{WHEEL_EXTENSION}{METADATA_SUFFIX}"))
}
