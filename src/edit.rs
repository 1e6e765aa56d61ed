use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use thiserror::Error;
use xxhash_rust::xxh3::xxh3_64;

/// The fundamental edit primitive: replace `[start, end)` of a buffer with `text`.
///
/// Every fix rule compiles down to exactly one replacement per violation.
/// Insertions are empty ranges, deletions carry empty text.
#[derive(Debug, Clone, PartialEq, Eq)]
#[must_use = "Replacement does nothing until splice_into() is called"]
pub struct Replacement {
    /// Starting byte offset (inclusive)
    pub start: usize,
    /// Ending byte offset (exclusive)
    pub end: usize,
    /// Text to put in place of `[start, end)`
    pub text: String,
}

#[derive(Error, Debug)]
pub enum EditError {
    #[error("Invalid byte range: [{start}, {end}) in text of length {len}")]
    InvalidRange { start: usize, end: usize, len: usize },

    #[error("Byte offset {offset} is not on a UTF-8 character boundary")]
    NotCharBoundary { offset: usize },

    #[error("I/O error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("{} is not valid UTF-8", path.display())]
    NotUtf8 { path: PathBuf },

    #[error("{} changed on disk since it was read", path.display())]
    ConcurrentModification { path: PathBuf },
}

impl Replacement {
    pub fn new(start: usize, end: usize, text: impl Into<String>) -> Self {
        Self {
            start,
            end,
            text: text.into(),
        }
    }

    pub fn insert(at: usize, text: impl Into<String>) -> Self {
        Self::new(at, at, text)
    }

    pub fn delete(start: usize, end: usize) -> Self {
        Self::new(start, end, String::new())
    }

    /// Check that `[start, end)` addresses whole characters of `buffer`.
    pub fn validate(&self, buffer: &str) -> Result<(), EditError> {
        check_range(buffer, self.start, self.end)
    }

    /// Splice this replacement into `buffer` in place.
    pub fn splice_into(&self, buffer: &mut String) -> Result<(), EditError> {
        self.validate(buffer)?;
        buffer.replace_range(self.start..self.end, &self.text);
        Ok(())
    }
}

/// Validate that `[start, end)` is an in-bounds range of `text` whose ends
/// fall on character boundaries.
pub fn check_range(text: &str, start: usize, end: usize) -> Result<(), EditError> {
    if start > end || end > text.len() {
        return Err(EditError::InvalidRange {
            start,
            end,
            len: text.len(),
        });
    }
    for offset in [start, end] {
        if !text.is_char_boundary(offset) {
            return Err(EditError::NotCharBoundary { offset });
        }
    }
    Ok(())
}

/// Result of writing a patched file back.
#[derive(Debug, Clone, PartialEq, Eq)]
#[must_use = "WriteOutcome should be checked to see whether the file was touched"]
pub enum WriteOutcome {
    /// New content was persisted
    Written { bytes: usize },
    /// New content equals the snapshot; the file was left alone
    Unchanged,
}

/// The full text of one file plus the xxh3 hash it had when it was read.
///
/// A snapshot is the unit of exclusive ownership for one patch batch: read
/// whole, patched in memory, written whole.
#[derive(Debug, Clone)]
pub struct FileSnapshot {
    path: PathBuf,
    text: String,
    hash: u64,
}

impl FileSnapshot {
    pub fn read(path: impl Into<PathBuf>) -> Result<Self, EditError> {
        let path = path.into();
        let bytes = fs::read(&path).map_err(|source| EditError::Io {
            path: path.clone(),
            source,
        })?;
        let hash = xxh3_64(&bytes);
        let text = String::from_utf8(bytes).map_err(|_| EditError::NotUtf8 { path: path.clone() })?;
        Ok(Self { path, text, hash })
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    /// Whether the file on disk still has the content this snapshot was taken from.
    pub fn is_current(&self) -> Result<bool, EditError> {
        let bytes = fs::read(&self.path).map_err(|source| EditError::Io {
            path: self.path.clone(),
            source,
        })?;
        Ok(xxh3_64(&bytes) == self.hash)
    }

    /// Replace the file's content with `new_text`.
    ///
    /// Nothing is written when `new_text` equals the snapshot. The write is
    /// refused if the file changed on disk after the snapshot was taken.
    pub fn write(&self, new_text: &str) -> Result<WriteOutcome, EditError> {
        if new_text == self.text {
            return Ok(WriteOutcome::Unchanged);
        }

        if !self.is_current()? {
            return Err(EditError::ConcurrentModification {
                path: self.path.clone(),
            });
        }

        atomic_write(&self.path, new_text.as_bytes()).map_err(|source| EditError::Io {
            path: self.path.clone(),
            source,
        })?;

        Ok(WriteOutcome::Written {
            bytes: new_text.len(),
        })
    }
}

/// Atomic file write: tempfile + fsync + rename.
///
/// Either the full write succeeds or the original file is left untouched.
/// The original file's permissions are carried over to the replacement.
fn atomic_write(path: &Path, content: &[u8]) -> std::io::Result<()> {
    // Same directory keeps the rename on one filesystem
    let parent = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        Some(_) => Path::new("."),
        None => {
            return Err(std::io::Error::new(
                std::io::ErrorKind::InvalidInput,
                "Path has no parent directory",
            ))
        }
    };

    let permissions = fs::metadata(path)?.permissions();
    let mut temp = tempfile::NamedTempFile::new_in(parent)?;

    temp.write_all(content)?;
    temp.as_file().sync_all()?;
    fs::set_permissions(temp.path(), permissions)?;

    temp.persist(path).map_err(|e| e.error)?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_splice_replace() {
        let mut buffer = "hello world".to_string();
        Replacement::new(0, 5, "HELLO").splice_into(&mut buffer).unwrap();
        assert_eq!(buffer, "HELLO world");
    }

    #[test]
    fn test_splice_insert_and_delete() {
        let mut buffer = "helloworld".to_string();
        Replacement::insert(5, " ").splice_into(&mut buffer).unwrap();
        assert_eq!(buffer, "hello world");
        Replacement::delete(5, 6).splice_into(&mut buffer).unwrap();
        assert_eq!(buffer, "helloworld");
    }

    #[test]
    fn test_invalid_range() {
        let mut buffer = "hello".to_string();
        let err = Replacement::new(3, 20, "x").splice_into(&mut buffer).unwrap_err();
        assert!(matches!(err, EditError::InvalidRange { len: 5, .. }));
        let err = Replacement::new(4, 2, "x").splice_into(&mut buffer).unwrap_err();
        assert!(matches!(err, EditError::InvalidRange { .. }));
        assert_eq!(buffer, "hello");
    }

    #[test]
    fn test_char_boundary_rejected() {
        let mut buffer = "aé".to_string();
        let err = Replacement::insert(2, "x").splice_into(&mut buffer).unwrap_err();
        assert!(matches!(err, EditError::NotCharBoundary { offset: 2 }));
    }

    #[test]
    fn test_snapshot_write_roundtrip() {
        let temp_dir = tempfile::tempdir().unwrap();
        let file_path = temp_dir.path().join("Program.cs");
        fs::write(&file_path, "int x = 1;   \n").unwrap();

        let snapshot = FileSnapshot::read(&file_path).unwrap();
        assert_eq!(snapshot.text(), "int x = 1;   \n");

        let outcome = snapshot.write("int x = 1;\n").unwrap();
        assert_eq!(outcome, WriteOutcome::Written { bytes: 11 });
        assert_eq!(fs::read_to_string(&file_path).unwrap(), "int x = 1;\n");
    }

    #[test]
    fn test_snapshot_unchanged_is_not_written() {
        let temp_dir = tempfile::tempdir().unwrap();
        let file_path = temp_dir.path().join("Program.cs");
        fs::write(&file_path, "class A {}\n").unwrap();

        let snapshot = FileSnapshot::read(&file_path).unwrap();
        // Modify behind the snapshot's back; an unchanged write must not notice or clobber it
        fs::write(&file_path, "class B {}\n").unwrap();
        assert_eq!(snapshot.write("class A {}\n").unwrap(), WriteOutcome::Unchanged);
        assert_eq!(fs::read_to_string(&file_path).unwrap(), "class B {}\n");
    }

    #[test]
    fn test_snapshot_detects_concurrent_modification() {
        let temp_dir = tempfile::tempdir().unwrap();
        let file_path = temp_dir.path().join("Program.cs");
        fs::write(&file_path, "a").unwrap();

        let snapshot = FileSnapshot::read(&file_path).unwrap();
        fs::write(&file_path, "b").unwrap();

        let err = snapshot.write("c").unwrap_err();
        assert!(matches!(err, EditError::ConcurrentModification { .. }));
        assert_eq!(fs::read_to_string(&file_path).unwrap(), "b");
    }

    #[test]
    fn test_snapshot_rejects_non_utf8() {
        let temp_dir = tempfile::tempdir().unwrap();
        let file_path = temp_dir.path().join("bin.cs");
        fs::write(&file_path, [0xff, 0xfe, 0x00]).unwrap();
        assert!(matches!(
            FileSnapshot::read(&file_path),
            Err(EditError::NotUtf8 { .. })
        ));
    }

    #[cfg(unix)]
    #[test]
    fn test_write_preserves_permissions() {
        use std::os::unix::fs::PermissionsExt;

        let temp_dir = tempfile::tempdir().unwrap();
        let file_path = temp_dir.path().join("script.cs");
        fs::write(&file_path, "x ").unwrap();
        fs::set_permissions(&file_path, fs::Permissions::from_mode(0o644)).unwrap();

        let snapshot = FileSnapshot::read(&file_path).unwrap();
        snapshot.write("x").unwrap();

        let mode = fs::metadata(&file_path).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o644);
    }
}
