//! Embedded metadata extraction.
//!
//! A wheel is a zip archive; its core metadata lives at
//! `<distribution>-<version>.dist-info/METADATA`. Index pages advertise the
//! digest of that record so installers can resolve dependencies without
//! downloading the whole wheel.

use crate::error::{Error, IoContext, Result};
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;
use wheelhouse_schema::Sha256Digest;
use zip::ZipArchive;

/// Case-sensitive suffix of the metadata entry.
pub const METADATA_ENTRY_SUFFIX: &str = ".dist-info/METADATA";

/// An extracted metadata record and its digest.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Descriptor {
    bytes: Vec<u8>,
    digest: Sha256Digest,
}

impl Descriptor {
    /// Wrap raw record bytes, hashing them.
    pub fn new(bytes: Vec<u8>) -> Self {
        let digest = Sha256Digest::compute(&bytes);
        Self { bytes, digest }
    }

    /// Raw record bytes, exactly as stored in the archive.
    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// SHA-256 of [`Self::bytes`].
    pub fn digest(&self) -> &Sha256Digest {
        &self.digest
    }

    /// Write the record to `path`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Io`] if the file cannot be written.
    pub fn write_sidecar(&self, path: &Path) -> Result<()> {
        std::fs::write(path, &self.bytes).at(path)
    }
}

/// Whether `entry` is a top-level `*.dist-info/METADATA` entry.
fn is_metadata_entry(entry: &str) -> bool {
    entry
        .strip_suffix(METADATA_ENTRY_SUFFIX)
        .is_some_and(|dir| !dir.is_empty() && !dir.contains('/'))
}

/// Read the first metadata record from the archive at `path`.
///
/// Entries are scanned in central-directory order and the first match wins.
/// Returns `Ok(None)` for a valid archive without a record.
///
/// # Errors
///
/// Returns [`Error::ArchiveRead`] naming `path` if the file is not a readable
/// zip archive or the matching entry cannot be decompressed, and
/// [`Error::Io`] if the file cannot be opened.
pub fn extract(path: &Path) -> Result<Option<Descriptor>> {
    let file = File::open(path).at(path)?;
    let mut archive = ZipArchive::new(BufReader::new(file)).map_err(|e| Error::archive(path, e))?;

    let Some(entry_name) = archive
        .file_names()
        .find(|name| is_metadata_entry(name))
        .map(str::to_string)
    else {
        tracing::debug!("no metadata record in {}", path.display());
        return Ok(None);
    };

    let mut entry = archive
        .by_name(&entry_name)
        .map_err(|e| Error::archive(path, e))?;
    // The declared size is untrusted; let the buffer grow with what decompresses.
    let mut bytes = Vec::new();
    entry
        .read_to_end(&mut bytes)
        .map_err(|e| Error::archive(path, format!("{entry_name}: {e}")))?;

    tracing::debug!("extracted {entry_name} ({} bytes) from {}", bytes.len(), path.display());
    Ok(Some(Descriptor::new(bytes)))
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use std::io::Write;
    use std::path::PathBuf;
    use zip::write::SimpleFileOptions;

    /// Write a zip at `dir/name` holding the given entries.
    pub(crate) fn write_wheel(dir: &Path, name: &str, entries: &[(&str, &[u8])]) -> PathBuf {
        let path = dir.join(name);
        let file = File::create(&path).unwrap();
        let mut zip = zip::ZipWriter::new(file);
        for (entry, data) in entries {
            zip.start_file(*entry, SimpleFileOptions::default()).unwrap();
            zip.write_all(data).unwrap();
        }
        zip.finish().unwrap();
        path
    }

    #[test]
    fn extracts_metadata_record() {
        let dir = tempfile::tempdir().unwrap();
        let body = b"Metadata-Version: 2.1\nName: pkg\nVersion: 1.0\n";
        let path = write_wheel(
            dir.path(),
            "pkg-1.0-py3-none-any.whl",
            &[
                ("pkg/__init__.py", b""),
                ("pkg-1.0.dist-info/METADATA", body),
                ("pkg-1.0.dist-info/RECORD", b""),
            ],
        );

        let desc = extract(&path).unwrap().unwrap();
        assert_eq!(desc.bytes(), body);
        assert_eq!(desc.digest(), &Sha256Digest::compute(body));
    }

    #[test]
    fn missing_record_is_absent_not_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_wheel(
            dir.path(),
            "pkg-1.0-py3-none-any.whl",
            &[("pkg/__init__.py", b"")],
        );
        assert!(extract(&path).unwrap().is_none());
    }

    #[test]
    fn match_is_case_sensitive_and_top_level() {
        assert!(is_metadata_entry("pkg-1.0.dist-info/METADATA"));
        assert!(!is_metadata_entry("pkg-1.0.dist-info/metadata"));
        assert!(!is_metadata_entry("vendored/x-1.0.dist-info/METADATA"));
        assert!(!is_metadata_entry(".dist-info/METADATA"));
    }

    #[test]
    fn corrupt_archive_names_the_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("pkg-1.0-py3-none-any.whl");
        std::fs::write(&path, b"definitely not a zip").unwrap();

        let err = extract(&path).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ArchiveRead);
        assert!(err.to_string().contains("pkg-1.0-py3-none-any.whl"));
    }

    /// A stored single-entry zip whose central directory declares, through a
    /// zip64 extra field, an uncompressed size of `declared` bytes.
    fn write_zip64_lie(path: &Path, entry: &str, data: &[u8], declared: u64) {
        let name = entry.as_bytes();
        let len = u32::try_from(data.len()).unwrap();
        let name_len = u16::try_from(name.len()).unwrap();

        let mut buf = Vec::new();
        buf.extend_from_slice(&0x0403_4b50u32.to_le_bytes());
        buf.extend_from_slice(&20u16.to_le_bytes()); // version needed
        buf.extend_from_slice(&0u16.to_le_bytes()); // flags
        buf.extend_from_slice(&0u16.to_le_bytes()); // stored
        buf.extend_from_slice(&[0; 4]); // mod time and date
        buf.extend_from_slice(&0u32.to_le_bytes()); // crc
        buf.extend_from_slice(&len.to_le_bytes());
        buf.extend_from_slice(&len.to_le_bytes());
        buf.extend_from_slice(&name_len.to_le_bytes());
        buf.extend_from_slice(&0u16.to_le_bytes());
        buf.extend_from_slice(name);
        buf.extend_from_slice(data);

        let cd_offset = u32::try_from(buf.len()).unwrap();
        buf.extend_from_slice(&0x0201_4b50u32.to_le_bytes());
        buf.extend_from_slice(&45u16.to_le_bytes()); // version made by
        buf.extend_from_slice(&45u16.to_le_bytes()); // version needed
        buf.extend_from_slice(&0u16.to_le_bytes());
        buf.extend_from_slice(&0u16.to_le_bytes());
        buf.extend_from_slice(&[0; 4]);
        buf.extend_from_slice(&0u32.to_le_bytes());
        buf.extend_from_slice(&len.to_le_bytes());
        buf.extend_from_slice(&u32::MAX.to_le_bytes()); // size lives in the zip64 field
        buf.extend_from_slice(&name_len.to_le_bytes());
        buf.extend_from_slice(&12u16.to_le_bytes()); // extra length
        buf.extend_from_slice(&0u16.to_le_bytes()); // comment length
        buf.extend_from_slice(&0u16.to_le_bytes()); // disk start
        buf.extend_from_slice(&0u16.to_le_bytes()); // internal attrs
        buf.extend_from_slice(&0u32.to_le_bytes()); // external attrs
        buf.extend_from_slice(&0u32.to_le_bytes()); // local header offset
        buf.extend_from_slice(name);
        buf.extend_from_slice(&0x0001u16.to_le_bytes());
        buf.extend_from_slice(&8u16.to_le_bytes());
        buf.extend_from_slice(&declared.to_le_bytes());
        let cd_size = u32::try_from(buf.len()).unwrap() - cd_offset;

        buf.extend_from_slice(&0x0605_4b50u32.to_le_bytes());
        buf.extend_from_slice(&0u16.to_le_bytes());
        buf.extend_from_slice(&0u16.to_le_bytes());
        buf.extend_from_slice(&1u16.to_le_bytes());
        buf.extend_from_slice(&1u16.to_le_bytes());
        buf.extend_from_slice(&cd_size.to_le_bytes());
        buf.extend_from_slice(&cd_offset.to_le_bytes());
        buf.extend_from_slice(&0u16.to_le_bytes());
        std::fs::write(path, buf).unwrap();
    }

    #[test]
    fn oversized_declared_entry_does_not_abort() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("pkg-1.0-py3-none-any.whl");
        let body = b"Name: pkg\n";
        write_zip64_lie(&path, "pkg-1.0.dist-info/METADATA", body, 1 << 62);

        // Either the record is read as stored or the archive is rejected;
        // the process must survive both.
        match extract(&path) {
            Ok(Some(desc)) => assert_eq!(desc.bytes(), body),
            Ok(None) => panic!("metadata entry not found"),
            Err(err) => {
                assert_eq!(err.kind(), ErrorKind::ArchiveRead);
                assert!(err.to_string().contains("pkg-1.0-py3-none-any.whl"));
            }
        }
    }

    #[test]
    fn sidecar_round_trips_bytes() {
        let dir = tempfile::tempdir().unwrap();
        let desc = Descriptor::new(b"Name: pkg\n".to_vec());
        let sidecar = dir.path().join("pkg.whl.metadata");
        desc.write_sidecar(&sidecar).unwrap();
        assert_eq!(std::fs::read(&sidecar).unwrap(), b"Name: pkg\n");
    }
}
